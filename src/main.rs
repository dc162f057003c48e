//! planeseg - split a point cloud into planar surfaces and measure them.
//!
//! Subcommands:
//! - `segment`: detect planes and write planes, meshes and the surface report
//! - `report`: print the surface report of the last run
//! - `params`: print the effective parameters as JSON

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use planeseg_pipeline::{
    load_parameters, save_parameters, spawn_detection, DetectionRequest, OutputLayout,
    SurfaceReport,
};
use planeseg_segmentation::{ClusterStrategy, Parameters};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "planeseg")]
#[command(about = "Detect planar surfaces in point clouds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect planes in a .ply, .pcd or .las file
    Segment(SegmentArgs),
    /// Print the surface areas of the last run
    Report(ReportArgs),
    /// Print (and optionally save) the effective parameters
    Params(ParamsArgs),
}

/// Settings file plus per-field overrides.
#[derive(Args, Debug)]
struct ParameterArgs {
    /// JSON settings file; missing file means defaults
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,

    #[arg(long)]
    voxel_size: Option<f32>,

    #[arg(long)]
    neighbours: Option<usize>,

    #[arg(long)]
    min_std_ratio: Option<f32>,

    /// Max point-to-plane distance for inliers
    #[arg(long)]
    threshold: Option<f32>,

    /// RANSAC trials per plane
    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long)]
    max_loops: Option<usize>,

    #[arg(long)]
    min_ratio: Option<f64>,

    #[arg(long)]
    min_points: Option<usize>,

    /// DBSCAN neighbourhood radius
    #[arg(long)]
    dbscan_eps: Option<f32>,

    #[arg(long)]
    dbscan_min_points: Option<usize>,

    /// Groups per plane for agglomerative clustering
    #[arg(long)]
    agglomerative_clusters: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,
}

impl ParameterArgs {
    fn resolve(&self) -> Result<Parameters> {
        let mut params = load_parameters(&self.settings)?;
        macro_rules! apply {
            ($($field:ident => $target:ident),* $(,)?) => {
                $(if let Some(v) = self.$field {
                    params.$target = v;
                })*
            };
        }
        apply!(
            voxel_size => voxel_size,
            neighbours => neighbours,
            min_std_ratio => min_std_ratio,
            threshold => threshold,
            iterations => iterations,
            max_loops => max_loops,
            min_ratio => min_ratio,
            min_points => min_points,
            dbscan_eps => dbscan_eps,
            dbscan_min_points => dbscan_min_points,
            agglomerative_clusters => agglomerative_clusters,
        );
        if self.seed.is_some() {
            params.seed = self.seed;
        }
        params.validate().context("invalid parameters")?;
        Ok(params)
    }
}

#[derive(Args, Debug)]
struct SegmentArgs {
    /// Input point cloud
    input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "data")]
    output: PathBuf,

    /// Clustering applied to each fitted plane: DBSCAN or Agglomerative
    #[arg(long)]
    cluster: Option<String>,

    /// Reuse the previous results if they came from the same input
    #[arg(long)]
    reuse: bool,

    #[command(flatten)]
    params: ParameterArgs,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Output directory of the run
    #[arg(short, long, default_value = "data")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct ParamsArgs {
    /// Write the effective parameters back to the settings file
    #[arg(long)]
    save: bool,

    #[command(flatten)]
    params: ParameterArgs,
}

fn run_segment(args: SegmentArgs) -> Result<()> {
    let params = args.params.resolve()?;
    let strategy = ClusterStrategy::from_name(args.cluster.as_deref());
    if let Some(name) = &args.cluster {
        if strategy == ClusterStrategy::None {
            log::warn!("unknown clustering '{}', segmenting without clustering", name);
        }
    }

    let request = DetectionRequest {
        source: args.input.clone(),
        layout: OutputLayout::new(&args.output),
        params,
        strategy,
        reuse: args.reuse,
    };
    let layout = request.layout.clone();

    let summary = spawn_detection(request)
        .wait_with(|stage| info!("{}", stage))
        .with_context(|| format!("plane detection failed for {}", args.input.display()))?;

    if let Some(run) = &summary.run {
        info!(
            "{} -> {} points after preprocessing, {} steps, halted by {:?}{}",
            run.loaded_points,
            run.preprocessed_points,
            run.iterations,
            run.halt,
            if run.fallback_emitted {
                ", leftover kept as last plane"
            } else {
                ""
            }
        );
    }
    print_report(&summary.report, &layout);
    Ok(())
}

fn print_report(report: &SurfaceReport, layout: &OutputLayout) {
    println!("{:>8}  {:>14}  {:>8}  plane", "Segment", "Surface area", "Points");
    for rec in &report.records {
        let points = rec.points.map(|p| p.to_string()).unwrap_or_default();
        let path = report
            .plane_path(layout, rec.segment)
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!(
            "{:>8}  {:>14.4}  {:>8}  {}",
            rec.segment, rec.area, points, path
        );
    }
    println!("{:>8}  {:>14.4}", "Total", report.total_area());
}

fn run_report(args: ReportArgs) -> Result<()> {
    let layout = OutputLayout::new(&args.output);
    let path = layout.report_path();
    if !path.exists() {
        bail!("no surface report at {}; run `planeseg segment` first", path.display());
    }
    let report = SurfaceReport::load(&path)?;
    print_report(&report, &layout);
    Ok(())
}

fn run_params(args: ParamsArgs) -> Result<()> {
    let params = args.params.resolve()?;
    println!("{}", serde_json::to_string_pretty(&params)?);
    if args.save {
        save_parameters(&args.params.settings, &params)?;
        info!("saved {}", args.params.settings.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Segment(args) => run_segment(args),
        Commands::Report(args) => run_report(args),
        Commands::Params(args) => run_params(args),
    }
}
