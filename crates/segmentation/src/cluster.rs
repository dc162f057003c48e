use crate::agglomerative::Agglomerative;
use crate::dbscan::Dbscan;
use crate::params::Parameters;
use planeseg_core::PointCloud;
use std::collections::BTreeMap;
use std::fmt;

/// Label for points that belong to no cluster.
pub const NOISE_LABEL: i32 = -1;

/// Partitions a candidate plane into labelled groups.
///
/// Keys are cluster labels, values are ascending indices into `points`.
/// Negative labels such as [`NOISE_LABEL`] mark unclustered points.
pub trait ClusterSplitter {
    fn split(&self, points: &PointCloud) -> BTreeMap<i32, Vec<usize>>;
}

impl<F> ClusterSplitter for F
where
    F: Fn(&PointCloud) -> BTreeMap<i32, Vec<usize>>,
{
    fn split(&self, points: &PointCloud) -> BTreeMap<i32, Vec<usize>> {
        self(points)
    }
}

/// Groups a per-point label vector into the splitter output shape.
pub fn group_labels(labels: &[i32]) -> BTreeMap<i32, Vec<usize>> {
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(i);
    }
    groups
}

/// Which splitter, if any, refines each fitted plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterStrategy {
    #[default]
    None,
    Dbscan,
    Agglomerative,
}

impl ClusterStrategy {
    /// `"DBSCAN"` and `"Agglomerative"` select a splitter. Anything else,
    /// including a missing name, means no clustering.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("DBSCAN") => Self::Dbscan,
            Some("Agglomerative") => Self::Agglomerative,
            _ => Self::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Dbscan => "DBSCAN",
            Self::Agglomerative => "Agglomerative",
        }
    }

    pub fn splitter(self, params: &Parameters) -> Option<Box<dyn ClusterSplitter + Send>> {
        match self {
            Self::None => None,
            Self::Dbscan => Some(Box::new(Dbscan::new(
                params.dbscan_eps,
                params.dbscan_min_points,
            ))),
            Self::Agglomerative => Some(Box::new(Agglomerative::new(
                params.agglomerative_clusters,
            ))),
        }
    }
}

impl fmt::Display for ClusterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
