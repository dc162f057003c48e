use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for one segmentation run, from preprocessing to acceptance.
///
/// Serialised with the key names of the settings file; `treshold` keeps
/// its historical spelling and also accepts `threshold` on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Voxel edge length for downsampling.
    pub voxel_size: f32,
    /// Neighbourhood size for statistical outlier removal.
    pub neighbours: usize,
    /// Standard-deviation multiplier for statistical outlier removal.
    pub min_std_ratio: f32,
    /// Max point-to-plane distance for a RANSAC inlier.
    #[serde(rename = "treshold", alias = "threshold")]
    pub threshold: f32,
    /// RANSAC trials per plane fit.
    pub iterations: usize,
    /// Plane fits attempted before the loop gives up.
    pub max_loops: usize,
    /// Fraction of points allowed to stay unclassified.
    pub min_ratio: f64,
    /// Smallest cluster accepted as a plane.
    pub min_points: usize,
    pub dbscan_eps: f32,
    pub dbscan_min_points: usize,
    pub agglomerative_clusters: usize,
    /// Fixed RANSAC seed; `None` draws one from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            voxel_size: 0.02,
            neighbours: 20,
            min_std_ratio: 2.0,
            threshold: 0.02,
            iterations: 1000,
            max_loops: 20,
            min_ratio: 0.05,
            min_points: 100,
            dbscan_eps: 0.1,
            dbscan_min_points: 20,
            agglomerative_clusters: 3,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("{name} must be {requirement}, got {value}")]
    OutOfRange {
        name: &'static str,
        requirement: &'static str,
        value: String,
    },
}

fn positive_f32(name: &'static str, value: f32) -> Result<(), ParameterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            name,
            requirement: "a positive finite number",
            value: value.to_string(),
        })
    }
}

fn nonzero(name: &'static str, value: usize) -> Result<(), ParameterError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            name,
            requirement: "greater than zero",
            value: value.to_string(),
        })
    }
}

impl Parameters {
    /// Checks every field; the first offending one is reported.
    pub fn validate(&self) -> Result<(), ParameterError> {
        positive_f32("voxel_size", self.voxel_size)?;
        nonzero("neighbours", self.neighbours)?;
        positive_f32("min_std_ratio", self.min_std_ratio)?;
        positive_f32("treshold", self.threshold)?;
        nonzero("iterations", self.iterations)?;
        nonzero("max_loops", self.max_loops)?;
        if !(0.0..1.0).contains(&self.min_ratio) {
            return Err(ParameterError::OutOfRange {
                name: "min_ratio",
                requirement: "in [0, 1)",
                value: self.min_ratio.to_string(),
            });
        }
        positive_f32("dbscan_eps", self.dbscan_eps)?;
        nonzero("agglomerative_clusters", self.agglomerative_clusters)?;
        Ok(())
    }
}
