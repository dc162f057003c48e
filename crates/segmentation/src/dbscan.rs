use crate::cluster::{group_labels, ClusterSplitter, NOISE_LABEL};
use planeseg_core::PointCloud;
use planeseg_spatial::KdTree;
use std::collections::BTreeMap;
use std::collections::VecDeque;

const UNVISITED: i32 = -2;

/// Density-based clustering.
///
/// A point is a core point when at least `min_points` points, itself
/// included, lie within `eps`. Clusters grow from core points through
/// their neighbourhoods; points reached only as neighbours are border
/// points. Everything else is labelled [`NOISE_LABEL`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dbscan {
    pub eps: f32,
    pub min_points: usize,
}

impl Dbscan {
    pub fn new(eps: f32, min_points: usize) -> Self {
        Self { eps, min_points }
    }

    /// Per-point labels. Clusters are numbered from 0 in the order their
    /// seeding core point appears in the cloud.
    pub fn labels(&self, cloud: &PointCloud) -> Vec<i32> {
        let n = cloud.len();
        if n == 0 {
            return Vec::new();
        }

        let neighbours = KdTree::build(cloud).neighbourhoods(self.eps);
        let is_core = |i: usize| neighbours[i].len() >= self.min_points;

        let mut labels = vec![UNVISITED; n];
        let mut next_label = 0;
        let mut queue = VecDeque::new();

        for seed in 0..n {
            if labels[seed] != UNVISITED {
                continue;
            }
            if !is_core(seed) {
                labels[seed] = NOISE_LABEL;
                continue;
            }

            let label = next_label;
            next_label += 1;
            labels[seed] = label;
            queue.extend(neighbours[seed].iter().copied());

            while let Some(j) = queue.pop_front() {
                match labels[j] {
                    NOISE_LABEL => labels[j] = label,
                    UNVISITED => {
                        labels[j] = label;
                        if is_core(j) {
                            queue.extend(neighbours[j].iter().copied());
                        }
                    }
                    _ => {}
                }
            }
        }

        labels
    }
}

impl ClusterSplitter for Dbscan {
    fn split(&self, points: &PointCloud) -> BTreeMap<i32, Vec<usize>> {
        group_labels(&self.labels(points))
    }
}
