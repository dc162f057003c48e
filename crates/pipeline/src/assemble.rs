use crate::error::PipelineError;
use crate::layout::OutputLayout;
use crate::palette::generate_colors;
use planeseg_core::{PointCloud, Rgb};
use planeseg_io::write_ply;

/// An accepted plane, painted in its display color.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// 1-based id, in acceptance order.
    pub segment: usize,
    pub color: Rgb,
    pub cloud: PointCloud,
}

/// Numbers and paints accepted planes in acceptance order.
pub fn assemble(clouds: Vec<PointCloud>) -> Vec<Plane> {
    let colors = generate_colors(clouds.len());
    clouds
        .into_iter()
        .zip(colors)
        .enumerate()
        .map(|(i, (mut cloud, color))| {
            cloud.paint_uniform(color);
            Plane {
                segment: i + 1,
                color,
                cloud,
            }
        })
        .collect()
}

/// Union of all planes in segment order, each keeping its color.
pub fn combined(planes: &[Plane]) -> PointCloud {
    PointCloud::concat(planes.iter().map(|p| &p.cloud))
}

pub fn save_planes(planes: &[Plane], layout: &OutputLayout) -> Result<(), PipelineError> {
    for plane in planes {
        let path = layout.plane_path(plane.segment);
        write_ply(&path, &plane.cloud).map_err(PipelineError::write(path))?;
    }
    Ok(())
}

/// Writes the combined cloud; with no planes the file holds zero vertices.
pub fn save_combined(planes: &[Plane], layout: &OutputLayout) -> Result<(), PipelineError> {
    let path = layout.combined_path();
    write_ply(&path, &combined(planes)).map_err(PipelineError::write(path))
}
