use kiddo::float::distance::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use planeseg_core::PointCloud;
use rayon::prelude::*;
use std::num::NonZero;

/// One hit of a k-nearest query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    pub index: usize,
    /// Euclidean, not squared.
    pub distance: f32,
}

/// Static 3D index over a point set, answering nearest and radius queries
/// with indices into that set.
#[derive(Debug, Clone)]
pub struct KdTree {
    tree: ImmutableKdTree<f32, u32, 3, 32>,
    points: Vec<[f32; 3]>,
}

fn finite(p: &[f32; 3]) -> bool {
    p.iter().all(|v| v.is_finite())
}

impl KdTree {
    pub fn build(cloud: &PointCloud) -> Self {
        Self::from_points(cloud.to_points())
    }

    pub fn from_points(points: Vec<[f32; 3]>) -> Self {
        Self {
            tree: ImmutableKdTree::new_from_slice(&points),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[[f32; 3]] {
        &self.points
    }

    /// Up to `k` nearest points, closest first. A non-finite query finds
    /// nothing.
    pub fn knn(&self, query: &[f32; 3], k: usize) -> Vec<Neighbour> {
        let k = match NonZero::new(k) {
            Some(k) if !self.is_empty() && finite(query) => k,
            _ => return Vec::new(),
        };
        self.tree
            .nearest_n::<SquaredEuclidean>(query, k)
            .into_iter()
            .map(|nn| Neighbour {
                index: nn.item as usize,
                distance: nn.distance.sqrt(),
            })
            .collect()
    }

    /// Ascending indices of every point at distance `<= radius`.
    pub fn within_radius(&self, query: &[f32; 3], radius: f32) -> Vec<usize> {
        if self.is_empty() || !(radius > 0.0 && radius.is_finite()) || !finite(query) {
            return Vec::new();
        }
        let r2 = radius * radius;
        // kiddo compares with `<`; pad the bound and filter exactly.
        let padded = r2 + f32::EPSILON * r2.max(1.0);
        let mut hits: Vec<usize> = self
            .tree
            .within_unsorted::<SquaredEuclidean>(query, padded)
            .into_iter()
            .filter(|nn| nn.distance <= r2)
            .map(|nn| nn.item as usize)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// `within_radius` around every indexed point, itself included.
    pub fn neighbourhoods(&self, radius: f32) -> Vec<Vec<usize>> {
        self.points
            .par_iter()
            .map(|p| self.within_radius(p, radius))
            .collect()
    }

    /// Mean distance from every indexed point to its `k` nearest other
    /// points. Non-finite points, and points with no other neighbour,
    /// get `f32::INFINITY`.
    pub fn mean_neighbour_distances(&self, k: usize) -> Vec<f32> {
        self.points
            .par_iter()
            .map(|p| {
                // The point itself comes back first at distance zero.
                let hits = self.knn(p, k + 1);
                match hits.get(1..) {
                    Some(rest) if !rest.is_empty() => {
                        rest.iter().map(|n| n.distance).sum::<f32>() / rest.len() as f32
                    }
                    _ => f32::INFINITY,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::KdTree;
    use planeseg_core::PointCloud;
    use proptest::prelude::*;

    fn grid(n: usize, step: f32) -> Vec<[f32; 3]> {
        (0..n * n)
            .map(|k| [(k / n) as f32 * step, (k % n) as f32 * step, 0.0])
            .collect()
    }

    #[test]
    fn knn_is_sorted_by_distance() {
        let tree = KdTree::from_points(vec![[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [10.0, 0.0, 0.0]]);
        let hits = tree.knn(&[1.8, 0.0, 0.0], 3);
        let idx: Vec<usize> = hits.iter().map(|n| n.index).collect();
        assert_eq!(idx, vec![2, 1, 0]);
        assert!((hits[0].distance - 0.2).abs() < 1e-6);
    }

    #[test]
    fn degenerate_queries_find_nothing() {
        let empty = KdTree::build(&PointCloud::new());
        assert!(empty.is_empty());
        assert!(empty.knn(&[0.0; 3], 5).is_empty());
        assert!(empty.within_radius(&[0.0; 3], 1.0).is_empty());
        assert!(empty.neighbourhoods(1.0).is_empty());

        let tree = KdTree::from_points(vec![[1.0, 2.0, 3.0]]);
        assert!(tree.knn(&[0.0; 3], 0).is_empty());
        assert!(tree.knn(&[f32::NAN, 0.0, 0.0], 1).is_empty());
        assert!(tree.within_radius(&[1.0, 2.0, 3.0], 0.0).is_empty());
        assert!(tree.within_radius(&[1.0, 2.0, 3.0], -1.0).is_empty());
        assert!(tree.within_radius(&[1.0, 2.0, 3.0], f32::NAN).is_empty());
    }

    #[test]
    fn radius_is_inclusive() {
        let tree = KdTree::from_points(vec![[1.0, 0.0, 0.0], [5.0, 0.0, 0.0], [0.0, -1.0, 0.0]]);
        assert_eq!(tree.within_radius(&[0.0; 3], 1.0), vec![0, 2]);
    }

    #[test]
    fn grid_neighbourhoods() {
        // 4-neighbourhood plus the point itself at radius = step.
        let tree = KdTree::from_points(grid(5, 0.1));
        let hoods = tree.neighbourhoods(0.1001);
        assert_eq!(hoods[12], vec![7, 11, 12, 13, 17]);
        assert_eq!(hoods[0], vec![0, 1, 5]);
    }

    #[test]
    fn mean_distances_skip_self() {
        let tree = KdTree::from_points(vec![[0.0; 3], [1.0, 0.0, 0.0], [3.0, 0.0, 0.0]]);
        let means = tree.mean_neighbour_distances(1);
        assert_eq!(means, vec![1.0, 1.0, 2.0]);

        let lonely = KdTree::from_points(vec![[0.0; 3]]);
        assert_eq!(lonely.mean_neighbour_distances(3), vec![f32::INFINITY]);
    }

    proptest! {
        #[test]
        fn radius_hits_match_brute_force(
            pts in prop::collection::vec((-10.0f32..10.0, -10.0f32..10.0, -10.0f32..10.0), 1..150),
            radius in 0.5f32..8.0,
        ) {
            let pts: Vec<[f32; 3]> = pts.into_iter().map(|(x, y, z)| [x, y, z]).collect();
            let tree = KdTree::from_points(pts.clone());
            let q = pts[0];
            let brute: Vec<usize> = (0..pts.len())
                .filter(|&i| {
                    let d2: f32 = (0..3).map(|a| (pts[i][a] - q[a]).powi(2)).sum();
                    d2 <= radius * radius
                })
                .collect();
            prop_assert_eq!(tree.within_radius(&q, radius), brute);
        }

        #[test]
        fn knn_never_exceeds_k(
            pts in prop::collection::vec((-100.0f32..100.0, -100.0f32..100.0, -100.0f32..100.0), 1..200),
            k in 1usize..50,
        ) {
            let pts: Vec<[f32; 3]> = pts.into_iter().map(|(x, y, z)| [x, y, z]).collect();
            let n = pts.len();
            let tree = KdTree::from_points(pts);
            let hits = tree.knn(&[0.0; 3], k);
            prop_assert_eq!(hits.len(), k.min(n));
            prop_assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
    }
}
