#![forbid(unsafe_code)]

pub mod assemble;
pub mod detect;
pub mod error;
pub mod layout;
pub mod palette;
pub mod report;
pub mod settings;
pub mod surface;
pub mod worker;

pub use assemble::{assemble, combined, Plane};
pub use detect::{detect_planes, preprocess, DetectionRequest, DetectionSummary, RunStats};
pub use error::PipelineError;
pub use layout::OutputLayout;
pub use palette::generate_colors;
pub use report::{measure_surfaces, SurfaceReport};
pub use settings::{load_parameters, save_parameters};
pub use surface::{plane_surface, SurfaceMesh};
pub use worker::{spawn_detection, DetectionHandle, RunEvent};
