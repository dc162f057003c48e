use crate::cluster::ClusterSplitter;
use crate::fitter::PlaneFitter;
use crate::params::Parameters;
use crate::progress::{stage, ProgressSink};
use log::{debug, info, warn};
use planeseg_core::PointCloud;

/// Fewest inliers that can describe a plane.
const MIN_PLANE_SUPPORT: usize = 3;

/// Why the fitting loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// At least `(1 - min_ratio)` of the input was classified.
    Coverage,
    /// `max_loops` fits were attempted first.
    Budget,
}

/// Bookkeeping for one fit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Target size when the fitter was called.
    pub target_len: usize,
    /// Inliers removed from the target (0 for a failed fit).
    pub inliers: usize,
    /// Points that became members of accepted planes.
    pub accepted: usize,
    /// Inliers returned to the target as too small or unclustered.
    pub recycled: usize,
    /// Planes accepted during this step.
    pub planes: usize,
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Accepted planes in acceptance order; a fallback plane comes last.
    pub planes: Vec<PointCloud>,
    /// Points left unclassified.
    pub residual: PointCloud,
    pub halt: HaltReason,
    pub fallback_emitted: bool,
    pub steps: Vec<Step>,
}

impl Segmentation {
    pub fn iterations(&self) -> usize {
        self.steps.len()
    }

    pub fn classified_points(&self) -> usize {
        self.planes.iter().map(PointCloud::len).sum()
    }
}

/// Repeatedly extracts the dominant plane from `target`.
///
/// Each step asks `fitter` for the inliers of one plane and removes them
/// from the target. Without a `splitter` the whole inlier set becomes a
/// plane. With one, the inliers are split into clusters; clusters of at
/// least `min_points` points become planes (ascending label order) and
/// the rest go back into the target for a later step.
///
/// The loop stops once `(1 - min_ratio)` of the input is classified or
/// after `max_loops` steps. Stopping on the budget with at least
/// `min_points` points left turns the leftover into one final plane.
///
/// Every input point ends up in exactly one plane or in the residual.
pub fn segment_planes<F, S>(
    target: PointCloud,
    params: &Parameters,
    fitter: &mut F,
    splitter: Option<&dyn ClusterSplitter>,
    sink: &mut S,
) -> Segmentation
where
    F: PlaneFitter + ?Sized,
    S: ProgressSink + ?Sized,
{
    let total = target.len();
    let coverage_goal = (1.0 - params.min_ratio) * total as f64;
    let mut target = target;
    let mut planes: Vec<PointCloud> = Vec::new();
    let mut steps = Vec::new();
    let mut classified = 0usize;
    let mut budget = params.max_loops;

    sink.report(stage::SEGMENTING);
    info!(
        "segmenting {} points (max_loops={}, min_points={}, clustering={})",
        total,
        params.max_loops,
        params.min_points,
        splitter.is_some()
    );

    let halt = loop {
        if classified as f64 >= coverage_goal {
            break HaltReason::Coverage;
        }
        if budget == 0 {
            break HaltReason::Budget;
        }
        budget -= 1;

        let target_len = target.len();
        let inliers = clean_indices(
            fitter.fit(&target, params.threshold, params.iterations),
            target_len,
        );

        if inliers.len() < MIN_PLANE_SUPPORT {
            warn!(
                "no plane in {} remaining points ({} inliers), {} attempts left",
                target_len,
                inliers.len(),
                budget
            );
            steps.push(Step {
                target_len,
                inliers: 0,
                accepted: 0,
                recycled: 0,
                planes: 0,
            });
            continue;
        }

        let candidate = target.select(&inliers);
        let (accepted, recycled) = match splitter {
            Some(splitter) => split_candidate(&candidate, splitter, params.min_points),
            None => (vec![candidate], PointCloud::new()),
        };

        target = target.select_inverse(&inliers);
        target.extend_from(&recycled);

        let accepted_points: usize = accepted.iter().map(PointCloud::len).sum();
        debug!(
            "step {}: {} inliers, {} planes ({} points), {} recycled, {} left",
            steps.len() + 1,
            inliers.len(),
            accepted.len(),
            accepted_points,
            recycled.len(),
            target.len()
        );
        steps.push(Step {
            target_len,
            inliers: inliers.len(),
            accepted: accepted_points,
            recycled: recycled.len(),
            planes: accepted.len(),
        });

        classified += accepted_points;
        for plane in accepted {
            planes.push(plane);
            sink.report(&stage::planes_detected(planes.len()));
        }
    };

    let fallback_emitted =
        halt == HaltReason::Budget && !target.is_empty() && target.len() >= params.min_points;
    if fallback_emitted {
        info!("budget exhausted, keeping {} leftover points as a plane", target.len());
        planes.push(std::mem::take(&mut target));
        sink.report(&stage::planes_detected(planes.len()));
    }

    info!(
        "{} planes after {} steps ({:?}), {} points unclassified",
        planes.len(),
        steps.len(),
        halt,
        target.len()
    );

    Segmentation {
        planes,
        residual: target,
        halt,
        fallback_emitted,
        steps,
    }
}

/// Sorted, unique, in-range indices.
fn clean_indices(mut indices: Vec<usize>, len: usize) -> Vec<usize> {
    indices.sort_unstable();
    indices.dedup();
    let valid = indices.partition_point(|&i| i < len);
    if valid < indices.len() {
        warn!("fitter returned {} out-of-range indices", indices.len() - valid);
        indices.truncate(valid);
    }
    indices
}

/// Accepted clusters, and the candidate points to put back.
///
/// Points the splitter labels negative, assigns twice or leaves out
/// entirely are put back with the small clusters.
fn split_candidate(
    candidate: &PointCloud,
    splitter: &dyn ClusterSplitter,
    min_points: usize,
) -> (Vec<PointCloud>, PointCloud) {
    let n = candidate.len();
    let mut claimed = vec![false; n];
    let mut accepted = Vec::new();
    let mut recycled = Vec::new();

    for (label, members) in splitter.split(candidate) {
        let members: Vec<usize> = members
            .into_iter()
            .filter(|&i| i < n && !std::mem::replace(&mut claimed[i], true))
            .collect();
        if members.is_empty() {
            continue;
        }
        if label >= 0 && members.len() >= min_points {
            accepted.push(candidate.select(&members));
        } else {
            debug!("cluster {} with {} points put back", label, members.len());
            recycled.extend(members);
        }
    }

    recycled.extend((0..n).filter(|&i| !claimed[i]));
    recycled.sort_unstable();
    (accepted, candidate.select(&recycled))
}
