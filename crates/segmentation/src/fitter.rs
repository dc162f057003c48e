use planeseg_core::PointCloud;

/// Finds the inliers of one dominant plane.
///
/// Returns indices into `cloud`. An empty result means no plane was
/// found; the segmentation loop treats that as a spent attempt.
pub trait PlaneFitter {
    fn fit(&mut self, cloud: &PointCloud, threshold: f32, iterations: usize) -> Vec<usize>;
}

impl<F> PlaneFitter for F
where
    F: FnMut(&PointCloud, f32, usize) -> Vec<usize>,
{
    fn fit(&mut self, cloud: &PointCloud, threshold: f32, iterations: usize) -> Vec<usize> {
        self(cloud, threshold, iterations)
    }
}
