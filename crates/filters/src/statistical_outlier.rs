use planeseg_core::PointCloud;
use planeseg_spatial::KdTree;

/// Drops points whose mean distance to their `k` nearest neighbours is
/// more than `std_ratio` standard deviations above the cloud-wide mean.
pub fn statistical_outlier_removal(cloud: &PointCloud, k: usize, std_ratio: f32) -> PointCloud {
    cloud.select(&statistical_outlier_indices(cloud, k, std_ratio))
}

/// Ascending indices of the points [`statistical_outlier_removal`] keeps.
///
/// `k == 0` keeps nothing and a lone point is kept. Non-finite points
/// never survive.
pub fn statistical_outlier_indices(cloud: &PointCloud, k: usize, std_ratio: f32) -> Vec<usize> {
    match (cloud.len(), k) {
        (0, _) | (_, 0) => return Vec::new(),
        (1, _) => {
            return if cloud.iter_points().all(|p| p.iter().all(|v| v.is_finite())) {
                vec![0]
            } else {
                Vec::new()
            }
        }
        _ => {}
    }

    let means = KdTree::build(cloud).mean_neighbour_distances(k);
    let (sum, sum_sq, n) = means
        .iter()
        .filter(|d| d.is_finite())
        .fold((0.0f64, 0.0f64, 0usize), |(s, s2, n), &d| {
            let d = f64::from(d);
            (s + d, s2 + d * d, n + 1)
        });
    if n == 0 {
        return Vec::new();
    }
    let mean = sum / n as f64;
    let std = (sum_sq / n as f64 - mean * mean).max(0.0).sqrt();
    let limit = mean + f64::from(std_ratio) * std;

    means
        .iter()
        .enumerate()
        .filter(|(_, &d)| f64::from(d) <= limit)
        .map(|(i, _)| i)
        .collect()
}
