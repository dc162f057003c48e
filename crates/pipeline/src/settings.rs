use crate::error::PipelineError;
use log::info;
use planeseg_segmentation::Parameters;
use std::fs;
use std::io;
use std::path::Path;

/// Reads parameters from a JSON settings file. Missing keys take their
/// defaults; a missing file gives [`Parameters::default`].
pub fn load_parameters(path: impl AsRef<Path>) -> Result<Parameters, PipelineError> {
    let path = path.as_ref();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("no settings at {}, using defaults", path.display());
            return Ok(Parameters::default());
        }
        Err(e) => {
            return Err(PipelineError::Settings {
                path: path.to_path_buf(),
                source: Box::new(e),
            })
        }
    };

    serde_json::from_str(&text).map_err(|e| PipelineError::Settings {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

pub fn save_parameters(path: impl AsRef<Path>, params: &Parameters) -> Result<(), PipelineError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(params).map_err(|e| PipelineError::Settings {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    fs::write(path, json + "\n").map_err(PipelineError::write(path))
}
