//! Properties of the plane-extraction loop, driven by synthetic fitters
//! and splitters so every decision is known up front.

use planeseg_core::PointCloud;
use planeseg_segmentation::{
    segment_planes, ClusterSplitter, ClusterStrategy, HaltReason, NoProgress, Parameters,
    Segmentation,
};
use proptest::prelude::*;
use rand::prelude::*;
use rand::Rng;
use std::collections::BTreeMap;

// ────────────────── helpers ──────────────────

/// Points whose x coordinate is their original index.
fn indexed_cloud(n: usize) -> PointCloud {
    let pts: Vec<[f32; 3]> = (0..n).map(|i| [i as f32, (i % 7) as f32, 0.0]).collect();
    PointCloud::from_points(&pts)
}

fn ids(cloud: &PointCloud) -> Vec<usize> {
    cloud.x.iter().map(|&x| x as usize).collect()
}

/// Every input id appears exactly once across planes and residual.
fn assert_partition(seg: &Segmentation, n: usize) {
    let mut all: Vec<usize> = seg.planes.iter().flat_map(ids).collect();
    all.extend(ids(&seg.residual));
    all.sort_unstable();
    assert_eq!(all, (0..n).collect::<Vec<_>>(), "planes + residual must cover the input once");
}

fn params(max_loops: usize, min_points: usize, min_ratio: f64) -> Parameters {
    Parameters {
        max_loops,
        min_points,
        min_ratio,
        ..Default::default()
    }
}

/// Fitter returning a random subset of the target, reproducible per seed.
fn random_fitter(
    seed: u64,
    max_take: usize,
) -> impl FnMut(&PointCloud, f32, usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    move |cloud: &PointCloud, _: f32, _: usize| {
        let n = cloud.len();
        if n == 0 {
            return Vec::new();
        }
        let k = rng.gen_range(0..=max_take.min(n));
        rand::seq::index::sample(&mut rng, n, k).into_vec()
    }
}

/// Splitter cutting the candidate into chunks of `chunk` points, the
/// last chunk labelled as noise.
fn chunk_splitter(chunk: usize) -> impl Fn(&PointCloud) -> BTreeMap<i32, Vec<usize>> {
    move |cloud: &PointCloud| {
        let n = cloud.len();
        let mut groups = BTreeMap::new();
        let chunks: Vec<Vec<usize>> = (0..n)
            .collect::<Vec<_>>()
            .chunks(chunk.max(1))
            .map(<[usize]>::to_vec)
            .collect();
        let last = chunks.len().saturating_sub(1);
        for (label, members) in chunks.into_iter().enumerate() {
            let label = if label == last && label > 0 { -1 } else { label as i32 };
            groups.insert(label, members);
        }
        groups
    }
}

// ────────────────── partition ──────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn partition_without_clustering(
        n in 0usize..300,
        seed in any::<u64>(),
        max_loops in 1usize..12,
        min_points in 0usize..60,
        min_ratio in 0.0f64..0.9,
    ) {
        let mut fitter = random_fitter(seed, 80);
        let seg = segment_planes(
            indexed_cloud(n),
            &params(max_loops, min_points, min_ratio),
            &mut fitter,
            None,
            &mut NoProgress,
        );
        assert_partition(&seg, n);
        prop_assert!(seg.iterations() <= max_loops);
    }

    #[test]
    fn partition_with_clustering(
        n in 0usize..300,
        seed in any::<u64>(),
        chunk in 1usize..40,
        max_loops in 1usize..12,
        min_points in 0usize..30,
    ) {
        let mut fitter = random_fitter(seed, 120);
        let splitter = chunk_splitter(chunk);
        let seg = segment_planes(
            indexed_cloud(n),
            &params(max_loops, min_points, 0.05),
            &mut fitter,
            Some(&splitter),
            &mut NoProgress,
        );
        assert_partition(&seg, n);
        for plane in &seg.planes[..seg.planes.len() - seg.fallback_emitted as usize] {
            prop_assert!(plane.len() >= min_points.max(1));
        }
    }

    #[test]
    fn target_shrinks_by_accepted_points(
        n in 1usize..300,
        seed in any::<u64>(),
        chunk in 1usize..40,
    ) {
        let mut fitter = random_fitter(seed, 100);
        let splitter = chunk_splitter(chunk);
        let seg = segment_planes(
            indexed_cloud(n),
            &params(10, 15, 0.05),
            &mut fitter,
            Some(&splitter),
            &mut NoProgress,
        );

        for pair in seg.steps.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            prop_assert_eq!(b.target_len, a.target_len - a.accepted);
            prop_assert_eq!(a.inliers, a.accepted + a.recycled);
        }
        if let Some(last) = seg.steps.last() {
            let after = last.target_len - last.accepted;
            let fallback = if seg.fallback_emitted {
                seg.planes.last().map_or(0, PointCloud::len)
            } else {
                0
            };
            prop_assert_eq!(after, seg.residual.len() + fallback);
        }
    }
}

// ────────────────── termination ──────────────────

#[test]
fn all_inliers_terminate_in_one_step() {
    let n = 500;
    let mut calls = 0;
    let mut fitter = |cloud: &PointCloud, _: f32, _: usize| {
        calls += 1;
        (0..cloud.len()).collect::<Vec<_>>()
    };
    let seg = segment_planes(
        indexed_cloud(n),
        &params(50, 100, 0.05),
        &mut fitter,
        None,
        &mut NoProgress,
    );

    assert_eq!(calls, 1);
    assert_eq!(seg.halt, HaltReason::Coverage);
    assert_eq!(seg.planes.len(), 1);
    assert_eq!(seg.planes[0].len(), n);
    assert!(seg.residual.is_empty());
}

#[test]
fn budget_bounds_fitter_calls() {
    for max_loops in [1, 3, 17] {
        let mut calls = 0;
        let mut fitter = |_: &PointCloud, _: f32, _: usize| {
            calls += 1;
            Vec::new()
        };
        let seg = segment_planes(
            indexed_cloud(50),
            &params(max_loops, 10, 0.0),
            &mut fitter,
            None,
            &mut NoProgress,
        );
        assert_eq!(calls, max_loops);
        assert_eq!(seg.halt, HaltReason::Budget);
        // Nothing was found, so the fallback holds everything.
        assert!(seg.fallback_emitted);
        assert_eq!(seg.planes.len(), 1);
        assert_eq!(seg.planes[0].len(), 50);
    }
}

#[test]
fn budget_fallback_holds_whole_residual() {
    let mut fitter =
        |cloud: &PointCloud, _: f32, _: usize| (0..cloud.len().min(10)).collect::<Vec<_>>();
    let seg = segment_planes(
        indexed_cloud(200),
        &params(1, 50, 0.05),
        &mut fitter,
        None,
        &mut NoProgress,
    );

    assert_eq!(seg.iterations(), 1);
    assert!(seg.fallback_emitted);
    assert_eq!(seg.planes.len(), 2);
    assert_eq!(ids(&seg.planes[0]), (0..10).collect::<Vec<_>>());
    assert_eq!(ids(&seg.planes[1]), (10..200).collect::<Vec<_>>());
    assert!(seg.residual.is_empty());
}

#[test]
fn coverage_halt_never_emits_fallback() {
    let mut fitter =
        |cloud: &PointCloud, _: f32, _: usize| (0..cloud.len().min(96)).collect::<Vec<_>>();
    let seg = segment_planes(
        indexed_cloud(100),
        &params(1, 1, 0.05),
        &mut fitter,
        None,
        &mut NoProgress,
    );
    assert_eq!(seg.halt, HaltReason::Coverage);
    assert!(!seg.fallback_emitted);
    assert_eq!(seg.residual.len(), 4);
}

// ────────────────── clustering policy ──────────────────

#[test]
fn small_cluster_returns_for_next_step() {
    // First call: everything is an inlier; clusters of 60 and 15 points.
    // Second call must see exactly the 15 recycled points.
    let mut seen: Vec<Vec<usize>> = Vec::new();
    let mut fitter = |cloud: &PointCloud, _: f32, _: usize| {
        seen.push(ids(cloud));
        (0..cloud.len()).collect::<Vec<_>>()
    };
    let splitter = |cloud: &PointCloud| {
        let mut groups = BTreeMap::new();
        if cloud.len() == 75 {
            groups.insert(0, (0..60).collect::<Vec<_>>());
            groups.insert(1, (60..75).collect());
        } else {
            groups.insert(0, (0..cloud.len()).collect());
        }
        groups
    };
    let seg = segment_planes(
        indexed_cloud(75),
        &params(2, 20, 0.0),
        &mut fitter,
        Some(&splitter),
        &mut NoProgress,
    );

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1], (60..75).collect::<Vec<_>>());
    assert_eq!(ids(&seg.planes[0]), (0..60).collect::<Vec<_>>());
    // The second step keeps recycling the 15 points; they stay unclassified.
    assert_eq!(seg.planes.len(), 1);
    assert_eq!(ids(&seg.residual), (60..75).collect::<Vec<_>>());
}

#[test]
fn accepted_order_follows_labels() {
    let mut fitter = |cloud: &PointCloud, _: f32, _: usize| (0..cloud.len()).collect::<Vec<_>>();
    let splitter = |_: &PointCloud| {
        let mut groups = BTreeMap::new();
        groups.insert(2, (0..10).collect::<Vec<_>>());
        groups.insert(0, (20..30).collect());
        groups.insert(1, (10..20).collect());
        groups
    };
    let seg = segment_planes(
        indexed_cloud(30),
        &params(1, 5, 0.0),
        &mut fitter,
        Some(&splitter),
        &mut NoProgress,
    );
    let firsts: Vec<usize> = seg.planes.iter().map(|p| ids(p)[0]).collect();
    assert_eq!(firsts, vec![20, 10, 0]);
}

#[test]
fn unrecognised_strategy_behaves_like_none() {
    let p = params(6, 20, 0.05);
    let run = |name: Option<&str>| {
        let strategy = ClusterStrategy::from_name(name);
        let splitter = strategy.splitter(&p);
        let mut fitter = random_fitter(77, 60);
        segment_planes(
            indexed_cloud(250),
            &p,
            &mut fitter,
            splitter.as_deref().map(|s| s as &dyn ClusterSplitter),
            &mut NoProgress,
        )
    };

    let baseline = run(None);
    for name in ["kmeans", "dbscan", "HDBSCAN", ""] {
        let other = run(Some(name));
        assert_eq!(other.planes, baseline.planes, "strategy {:?}", name);
        assert_eq!(other.residual, baseline.residual);
        assert_eq!(other.steps, baseline.steps);
    }
}

#[test]
fn empty_input_is_a_valid_run() {
    let mut fitter = random_fitter(1, 10);
    let seg = segment_planes(
        PointCloud::new(),
        &params(5, 10, 0.05),
        &mut fitter,
        None,
        &mut NoProgress,
    );
    assert!(seg.planes.is_empty());
    assert_eq!(seg.iterations(), 0);
    assert!(!seg.fallback_emitted);
}
