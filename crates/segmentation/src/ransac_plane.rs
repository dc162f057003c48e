use crate::fitter::PlaneFitter;
use planeseg_core::PointCloud;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// A plane `n . p + d = 0` with unit normal `n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneModel {
    pub normal: [f32; 3],
    pub d: f32,
}

impl PlaneModel {
    /// Plane through three points; `None` when they are collinear or
    /// coincident.
    pub fn through(p0: &[f32; 3], p1: &[f32; 3], p2: &[f32; 3]) -> Option<Self> {
        let u = [p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]];
        let v = [p2[0] - p0[0], p2[1] - p0[1], p2[2] - p0[2]];
        let n = [
            u[1] * v[2] - u[2] * v[1],
            u[2] * v[0] - u[0] * v[2],
            u[0] * v[1] - u[1] * v[0],
        ];
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if !(len > 1e-10) {
            return None;
        }
        let normal = [n[0] / len, n[1] / len, n[2] / len];
        let d = -(normal[0] * p0[0] + normal[1] * p0[1] + normal[2] * p0[2]);
        Some(Self { normal, d })
    }

    #[inline]
    pub fn distance_to_point(&self, p: &[f32; 3]) -> f32 {
        (self.normal[0] * p[0] + self.normal[1] * p[1] + self.normal[2] * p[2] + self.d).abs()
    }
}

/// Probability that at least one all-inlier sample was drawn before the
/// search stops early.
const CONFIDENCE: f64 = 0.999;

/// Result of a RANSAC plane search.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacOutcome {
    pub model: PlaneModel,
    /// Sorted indices within the threshold of `model`.
    pub inliers: Vec<usize>,
    /// Hypotheses drawn before the search stopped.
    pub trials: usize,
}

/// Hypotheses needed to reach [`CONFIDENCE`] at inlier ratio `w`.
fn trials_needed(w: f64) -> f64 {
    let miss = (1.0 - w.powi(3)).ln();
    if miss < 0.0 {
        (1.0 - CONFIDENCE).ln() / miss
    } else {
        f64::INFINITY
    }
}

/// Best plane over at most `iterations` random three-point hypotheses.
///
/// Hypothesis `t` is sampled from its own generator keyed on `(seed, t)`,
/// so a seed reproduces the same plane whether or not scoring runs on the
/// rayon pool. Hypotheses are scored in batches (single ones for small
/// clouds) with ties going to the earlier hypothesis. After every batch the
/// search stops once enough hypotheses were drawn for 99.9% confidence at
/// the best inlier ratio so far. Returns `None` for clouds with fewer than
/// three points or when every sample was degenerate.
pub fn ransac_plane_search(
    cloud: &PointCloud,
    distance_threshold: f32,
    iterations: usize,
    seed: u64,
) -> Option<RansacOutcome> {
    let n = cloud.len();
    if n < 3 || iterations == 0 {
        return None;
    }

    let points = cloud.to_points();
    let hypothesis = |trial: usize| {
        let key = seed ^ (trial as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let mut rng = StdRng::seed_from_u64(key);
        let picks = index::sample(&mut rng, n, 3);
        PlaneModel::through(
            &points[picks.index(0)],
            &points[picks.index(1)],
            &points[picks.index(2)],
        )
    };
    let score = |model: &PlaneModel| {
        points
            .iter()
            .filter(|p| model.distance_to_point(p) <= distance_threshold)
            .count()
    };
    let pick = |a: (usize, usize, PlaneModel), b: (usize, usize, PlaneModel)| {
        if b.0 > a.0 || (b.0 == a.0 && b.1 < a.1) {
            b
        } else {
            a
        }
    };

    let batch = if n >= 10_000 { rayon::current_num_threads().max(1) * 4 } else { 1 };
    let mut best: Option<(usize, usize, PlaneModel)> = None;
    let mut trials = 0;
    while trials < iterations {
        let end = (trials + batch).min(iterations);
        let round = if batch > 1 {
            (trials..end)
                .into_par_iter()
                .filter_map(|t| hypothesis(t).map(|m| (score(&m), t, m)))
                .reduce_with(pick)
        } else {
            (trials..end)
                .filter_map(|t| hypothesis(t).map(|m| (score(&m), t, m)))
                .reduce(pick)
        };
        trials = end;
        best = match (best, round) {
            (Some(a), Some(b)) => Some(pick(a, b)),
            (a, b) => a.or(b),
        };

        if let Some((count, _, _)) = best {
            if trials as f64 >= trials_needed(count as f64 / n as f64) {
                break;
            }
        }
    }

    let (_, _, model) = best?;
    let inliers = (0..n)
        .filter(|&i| model.distance_to_point(&points[i]) <= distance_threshold)
        .collect();
    Some(RansacOutcome {
        model,
        inliers,
        trials,
    })
}

/// [`ransac_plane_search`] without the trial count.
pub fn ransac_plane_seeded(
    cloud: &PointCloud,
    distance_threshold: f32,
    iterations: usize,
    seed: u64,
) -> Option<(PlaneModel, Vec<usize>)> {
    ransac_plane_search(cloud, distance_threshold, iterations, seed)
        .map(|outcome| (outcome.model, outcome.inliers))
}

/// RANSAC plane search as a [`PlaneFitter`].
///
/// Each call draws a fresh seed from the fitter's own generator, so a
/// fitter built with [`RansacPlaneFitter::seeded`] replays the same run.
#[derive(Debug, Clone)]
pub struct RansacPlaneFitter {
    rng: StdRng,
}

impl RansacPlaneFitter {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Fixed seed when given, otherwise one from the thread RNG.
    pub fn from_seed(seed: Option<u64>) -> Self {
        Self::seeded(seed.unwrap_or_else(|| rand::thread_rng().gen()))
    }
}

impl PlaneFitter for RansacPlaneFitter {
    fn fit(&mut self, cloud: &PointCloud, threshold: f32, iterations: usize) -> Vec<usize> {
        let seed = self.rng.gen();
        ransac_plane_seeded(cloud, threshold, iterations, seed)
            .map(|(_, inliers)| inliers)
            .unwrap_or_default()
    }
}
