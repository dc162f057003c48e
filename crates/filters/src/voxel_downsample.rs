use hashbrown::HashMap;
use planeseg_core::{Aabb, Colors, PointCloud};

/// Running sums for one occupied voxel.
#[derive(Default)]
struct Cell {
    sum: [f64; 3],
    rgb: [u64; 3],
    count: u64,
}

impl Cell {
    fn mean(&self) -> [f32; 3] {
        let n = self.count as f64;
        self.sum.map(|s| (s / n) as f32)
    }

    fn mean_rgb(&self) -> [u8; 3] {
        self.rgb.map(|c| ((c + self.count / 2) / self.count) as u8)
    }
}

/// Replaces the points of every occupied voxel by their centroid.
///
/// The grid starts at the lower corner of the cloud's bounds. Colors are
/// averaged per voxel and non-finite points are dropped. Output follows
/// voxel order (x, then y, then z), so equal inputs give equal outputs.
///
/// # Panics
///
/// Panics when `voxel_size` is not a positive finite number.
pub fn voxel_downsample(cloud: &PointCloud, voxel_size: f32) -> PointCloud {
    assert!(
        voxel_size.is_finite() && voxel_size > 0.0,
        "voxel_size must be > 0 and finite"
    );
    let Some(Aabb { min: origin, .. }) = cloud.aabb() else {
        return PointCloud::new();
    };

    let size = f64::from(voxel_size);
    let mut cells: HashMap<[i64; 3], Cell> = HashMap::new();
    for (i, p) in cloud.iter_points().enumerate() {
        if !p.iter().all(|v| v.is_finite()) {
            continue;
        }
        let p = p.map(f64::from);
        let key = [0, 1, 2].map(|a| ((p[a] - f64::from(origin[a])) / size).floor() as i64);

        let cell = cells.entry(key).or_default();
        for a in 0..3 {
            cell.sum[a] += p[a];
        }
        if let Some(c) = &cloud.colors {
            cell.rgb[0] += u64::from(c.r[i]);
            cell.rgb[1] += u64::from(c.g[i]);
            cell.rgb[2] += u64::from(c.b[i]);
        }
        cell.count += 1;
    }

    let mut cells: Vec<([i64; 3], Cell)> = cells.into_iter().collect();
    cells.sort_unstable_by_key(|(key, _)| *key);

    let centroids: Vec<[f32; 3]> = cells.iter().map(|(_, c)| c.mean()).collect();
    let mut out = PointCloud::from_points(&centroids);
    if cloud.colors.is_some() {
        let mut colors = Colors {
            r: Vec::with_capacity(cells.len()),
            g: Vec::with_capacity(cells.len()),
            b: Vec::with_capacity(cells.len()),
        };
        for (_, cell) in &cells {
            let [r, g, b] = cell.mean_rgb();
            colors.r.push(r);
            colors.g.push(g);
            colors.b.push(b);
        }
        out.colors = Some(colors);
    }
    out
}
