use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use planeseg_core::PointCloud;
use planeseg_segmentation::{
    ransac_plane_seeded, segment_planes, Agglomerative, ClusterSplitter, Dbscan, NoProgress,
    Parameters, RansacPlaneFitter,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Floor and two walls of a `side` metre room sampled every `step`, with
/// millimetre noise.
fn room(side: f32, step: f32, seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = (side / step) as usize;
    let mut pts = Vec::with_capacity(3 * n * n);
    for i in 0..n {
        for j in 0..n {
            let (u, v) = (i as f32 * step, j as f32 * step);
            let mut e = || rng.gen_range(-0.002f32..0.002);
            pts.push([u, v, e()]);
            pts.push([u, e(), v + step]);
            pts.push([e(), u, v + step]);
        }
    }
    PointCloud::from_points(&pts)
}

fn bench_ransac(c: &mut Criterion) {
    let mut group = c.benchmark_group("ransac_plane_1000");
    for step in [0.05f32, 0.02] {
        let cloud = room(3.0, step, 1);
        group.bench_with_input(BenchmarkId::from_parameter(cloud.len()), &cloud, |b, cloud| {
            b.iter(|| ransac_plane_seeded(cloud, 0.02, 1000, 7))
        });
    }
    group.finish();
}

fn bench_segment_planes(c: &mut Criterion) {
    let cloud = room(3.0, 0.03, 2);
    let params = Parameters {
        seed: Some(3),
        ..Default::default()
    };
    let dbscan = Dbscan::new(params.dbscan_eps, params.dbscan_min_points);

    let mut group = c.benchmark_group("segment_planes");
    group.sample_size(10);
    group.bench_function("unclustered", |b| {
        b.iter(|| {
            let mut fitter = RansacPlaneFitter::seeded(3);
            segment_planes(cloud.clone(), &params, &mut fitter, None, &mut NoProgress)
        })
    });
    group.bench_function("dbscan", |b| {
        b.iter(|| {
            let mut fitter = RansacPlaneFitter::seeded(3);
            segment_planes(
                cloud.clone(),
                &params,
                &mut fitter,
                Some(&dbscan as &dyn ClusterSplitter),
                &mut NoProgress,
            )
        })
    });
    group.finish();
}

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_floor");
    group.sample_size(10);
    for step in [0.05f32, 0.03] {
        let floor = {
            let n = (3.0 / step) as usize;
            let pts: Vec<[f32; 3]> = (0..n * n)
                .map(|k| [(k / n) as f32 * step, (k % n) as f32 * step, 0.0])
                .collect();
            PointCloud::from_points(&pts)
        };
        group.bench_with_input(BenchmarkId::new("dbscan", floor.len()), &floor, |b, floor| {
            b.iter(|| Dbscan::new(0.1, 20).labels(floor))
        });
        group.bench_with_input(BenchmarkId::new("ward", floor.len()), &floor, |b, floor| {
            b.iter(|| Agglomerative::new(3).groups(floor))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ransac, bench_segment_planes, bench_clustering);
criterion_main!(benches);
