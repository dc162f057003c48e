use crate::assemble::{assemble, save_combined, save_planes};
use crate::error::PipelineError;
use crate::layout::OutputLayout;
use crate::report::{measure_surfaces, SurfaceReport};
use log::{debug, info};
use planeseg_core::PointCloud;
use planeseg_filters::{statistical_outlier_removal, voxel_downsample};
use planeseg_io::read_point_cloud;
use planeseg_segmentation::{
    segment_planes, stage, ClusterSplitter, ClusterStrategy, HaltReason, Parameters, ProgressSink,
    RansacPlaneFitter,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a detection run needs.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub source: PathBuf,
    pub layout: OutputLayout,
    pub params: Parameters,
    pub strategy: ClusterStrategy,
    /// Return the previous report when it was computed from `source`.
    pub reuse: bool,
}

impl DetectionRequest {
    pub fn new(source: impl Into<PathBuf>, layout: OutputLayout) -> Self {
        Self {
            source: source.into(),
            layout,
            params: Parameters::default(),
            strategy: ClusterStrategy::None,
            reuse: false,
        }
    }
}

/// Counts from a run that actually segmented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub loaded_points: usize,
    pub preprocessed_points: usize,
    pub iterations: usize,
    pub halt: HaltReason,
    pub fallback_emitted: bool,
    pub residual_points: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSummary {
    pub source: PathBuf,
    pub report: SurfaceReport,
    /// `None` when the previous report was reused.
    pub run: Option<RunStats>,
}

impl DetectionSummary {
    pub fn plane_count(&self) -> usize {
        self.report.len()
    }

    pub fn reused(&self) -> bool {
        self.run.is_none()
    }
}

/// Voxel downsampling followed by statistical outlier removal.
pub fn preprocess(cloud: &PointCloud, params: &Parameters) -> PointCloud {
    let down = voxel_downsample(cloud, params.voxel_size);
    statistical_outlier_removal(&down, params.neighbours, params.min_std_ratio)
}

fn same_source(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Loads `request.source`, extracts planes and writes every artifact of
/// `request.layout`.
///
/// Parameters are validated and the cloud loaded before any previous
/// output is touched, so a failed load leaves the last run intact.
pub fn detect_planes<S>(
    request: &DetectionRequest,
    sink: &mut S,
) -> Result<DetectionSummary, PipelineError>
where
    S: ProgressSink + ?Sized,
{
    let DetectionRequest {
        source,
        layout,
        params,
        strategy,
        reuse,
    } = request;
    params.validate()?;

    if *reuse {
        let cached = layout.read_recent().filter(|recent| same_source(recent, source));
        if cached.is_some() && layout.report_path().exists() {
            info!("reusing previous results for {}", source.display());
            let report = SurfaceReport::load(layout.report_path())?;
            sink.report(stage::DONE);
            return Ok(DetectionSummary {
                source: source.clone(),
                report,
                run: None,
            });
        }
    }

    sink.report(stage::LOADING);
    let cloud = read_point_cloud(source).map_err(|e| PipelineError::Load {
        path: source.clone(),
        source: e,
    })?;
    let loaded_points = cloud.len();
    if let Some(bounds) = cloud.aabb() {
        debug!(
            "bounds {:?} .. {:?}, diagonal {:.3}",
            bounds.min,
            bounds.max,
            bounds.diagonal()
        );
    }
    let cloud = preprocess(&cloud, params);
    info!(
        "loaded {} points from {}, {} after preprocessing",
        loaded_points,
        source.display(),
        cloud.len()
    );
    let preprocessed_points = cloud.len();

    let prepare = || -> std::io::Result<()> {
        layout.clean()?;
        layout.prepare()
    };
    prepare().map_err(PipelineError::write(layout.root()))?;

    let splitter = strategy.splitter(params);
    let mut fitter = RansacPlaneFitter::from_seed(params.seed);
    let segmentation = segment_planes(
        cloud,
        params,
        &mut fitter,
        splitter.as_deref().map(|s| s as &dyn ClusterSplitter),
        sink,
    );

    let stats = RunStats {
        loaded_points,
        preprocessed_points,
        iterations: segmentation.iterations(),
        halt: segmentation.halt,
        fallback_emitted: segmentation.fallback_emitted,
        residual_points: segmentation.residual.len(),
    };
    let planes = assemble(segmentation.planes);

    sink.report(stage::SAVING_PLANES);
    save_planes(&planes, layout)?;
    sink.report(stage::SAVING_RESULT);
    save_combined(&planes, layout)?;

    sink.report(stage::SURFACES);
    let report = measure_surfaces(&planes, layout)?;
    report.save(layout.report_path())?;

    let recorded = fs::canonicalize(source).unwrap_or_else(|_| source.clone());
    layout
        .write_recent(&recorded)
        .map_err(PipelineError::write(layout.recent_path()))?;

    info!(
        "{} planes, total surface {:.3}, {} points unclassified",
        planes.len(),
        report.total_area(),
        stats.residual_points
    );
    sink.report(stage::DONE);

    Ok(DetectionSummary {
        source: source.clone(),
        report,
        run: Some(stats),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use planeseg_io::write_ply;
    use planeseg_segmentation::NoProgress;
    use tempfile::tempdir;

    /// 2 m x 2 m floor plus a 2 m x 0.95 m wall along y = 0.
    fn room() -> PointCloud {
        let mut pts = Vec::new();
        for i in 0..=40 {
            for j in 0..=40 {
                pts.push([i as f32 * 0.05, j as f32 * 0.05, 0.0]);
            }
        }
        for i in 0..=40 {
            for k in 1..=19 {
                pts.push([i as f32 * 0.05, 0.0, k as f32 * 0.05]);
            }
        }
        PointCloud::from_points(&pts)
    }

    fn request(dir: &Path) -> DetectionRequest {
        let source = dir.join("room.ply");
        write_ply(&source, &room()).unwrap();
        let mut request = DetectionRequest::new(source, OutputLayout::new(dir.join("out")));
        request.params = Parameters {
            threshold: 0.01,
            iterations: 300,
            max_loops: 5,
            neighbours: 8,
            min_std_ratio: 3.0,
            seed: Some(1),
            ..Default::default()
        };
        request
    }

    #[test]
    fn full_run_then_reuse() {
        let dir = tempdir().unwrap();
        let mut request = request(dir.path());

        let mut stages: Vec<String> = Vec::new();
        let summary = detect_planes(&request, &mut stages).unwrap();
        assert_eq!(summary.plane_count(), 2);
        assert!(!summary.reused());
        assert_eq!(stages.first().map(String::as_str), Some(stage::LOADING));
        assert_eq!(stages.last().map(String::as_str), Some(stage::DONE));
        assert!(request.layout.plane_path(2).exists());
        assert!(request.layout.combined_path().exists());

        request.reuse = true;
        let mut stages: Vec<String> = Vec::new();
        let again = detect_planes(&request, &mut stages).unwrap();
        assert!(again.reused());
        assert_eq!(again.report, summary.report);
        assert_eq!(stages, vec![stage::DONE]);
    }

    #[test]
    fn failed_load_keeps_previous_outputs() {
        let dir = tempdir().unwrap();
        let mut request = request(dir.path());
        detect_planes(&request, &mut NoProgress).unwrap();

        request.source = dir.path().join("missing.ply");
        let err = detect_planes(&request, &mut NoProgress).unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
        assert!(request.layout.report_path().exists());
        assert!(request.layout.plane_path(1).exists());
    }

    #[test]
    fn invalid_parameters_fail_first() {
        let dir = tempdir().unwrap();
        let mut request =
            DetectionRequest::new(dir.path().join("x.ply"), OutputLayout::new(dir.path()));
        request.params.voxel_size = -1.0;
        let mut stages: Vec<String> = Vec::new();
        let err = detect_planes(&request, &mut stages).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameters(_)));
        assert!(stages.is_empty());
    }

    #[test]
    fn reuse_ignores_other_sources() {
        let dir = tempdir().unwrap();
        let mut request = request(dir.path());
        detect_planes(&request, &mut NoProgress).unwrap();

        let other = dir.path().join("other.ply");
        write_ply(&other, &room()).unwrap();
        request.source = other;
        request.reuse = true;
        let summary = detect_planes(&request, &mut NoProgress).unwrap();
        assert!(!summary.reused());
    }
}
