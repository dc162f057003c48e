#![forbid(unsafe_code)]

pub mod agglomerative;
pub mod cluster;
pub mod dbscan;
pub mod fitter;
pub mod params;
pub mod progress;
pub mod ransac_plane;
pub mod segment;

pub use agglomerative::Agglomerative;
pub use cluster::{ClusterSplitter, ClusterStrategy, NOISE_LABEL};
pub use dbscan::Dbscan;
pub use fitter::PlaneFitter;
pub use params::{ParameterError, Parameters};
pub use progress::{stage, LogProgress, NoProgress, ProgressSink};
pub use ransac_plane::{
    ransac_plane_search, ransac_plane_seeded, PlaneModel, RansacOutcome, RansacPlaneFitter,
};
pub use segment::{segment_planes, HaltReason, Segmentation, Step};
