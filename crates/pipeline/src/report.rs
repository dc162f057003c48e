use crate::assemble::Plane;
use crate::error::PipelineError;
use crate::layout::OutputLayout;
use crate::surface::plane_surface;
use log::debug;
use planeseg_io::{read_surface_csv, write_ply_mesh, write_surface_csv, SurfaceRecord};
use std::path::{Path, PathBuf};

/// Per-segment surface areas of one run, as stored in `output.csv`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SurfaceReport {
    pub records: Vec<SurfaceRecord>,
}

impl SurfaceReport {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let records = read_surface_csv(path).map_err(|source| PipelineError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { records })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let path = path.as_ref();
        write_surface_csv(path, &self.records).map_err(PipelineError::write(path))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_area(&self) -> f64 {
        self.records.iter().map(|r| r.area).sum()
    }

    pub fn get(&self, segment: usize) -> Option<&SurfaceRecord> {
        self.records.iter().find(|r| r.segment == segment)
    }

    /// Plane artifact behind a report row; `None` for unknown segments.
    pub fn plane_path(&self, layout: &OutputLayout, segment: usize) -> Option<PathBuf> {
        self.get(segment).map(|r| layout.plane_path(r.segment))
    }
}

/// Meshes every plane, writes `mesh_{i}.ply`, and returns the areas.
pub fn measure_surfaces(
    planes: &[Plane],
    layout: &OutputLayout,
) -> Result<SurfaceReport, PipelineError> {
    let mut records = Vec::with_capacity(planes.len());
    for plane in planes {
        let mesh = plane_surface(&plane.cloud);
        debug!(
            "segment {}: {} points, {} hull vertices, area {:.4}",
            plane.segment,
            plane.cloud.len(),
            mesh.vertices.len(),
            mesh.area
        );

        let mut vertices = mesh.vertices;
        vertices.paint_uniform(plane.color);
        let path = layout.mesh_path(plane.segment);
        write_ply_mesh(&path, &vertices, &mesh.triangles).map_err(PipelineError::write(path))?;

        records.push(SurfaceRecord {
            segment: plane.segment,
            area: mesh.area,
            points: Some(plane.cloud.len()),
        });
    }
    Ok(SurfaceReport { records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use approx::assert_relative_eq;
    use planeseg_core::PointCloud;
    use tempfile::tempdir;

    fn square(side: usize, z: f32) -> PointCloud {
        let mut pts = Vec::new();
        for i in 0..=side {
            for j in 0..=side {
                pts.push([i as f32 * 0.1, j as f32 * 0.1, z]);
            }
        }
        PointCloud::from_points(&pts)
    }

    #[test]
    fn measures_and_saves() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.prepare().unwrap();
        let planes = assemble(vec![square(10, 0.0), square(20, 1.0)]);

        let report = measure_surfaces(&planes, &layout).unwrap();
        assert_eq!(report.len(), 2);
        assert_relative_eq!(report.records[0].area, 1.0, epsilon = 1e-4);
        assert_relative_eq!(report.records[1].area, 4.0, epsilon = 1e-4);
        assert_relative_eq!(report.total_area(), 5.0, epsilon = 1e-3);
        assert_eq!(report.records[1].points, Some(441));
        assert!(layout.mesh_path(1).exists());

        report.save(layout.report_path()).unwrap();
        let loaded = SurfaceReport::load(layout.report_path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_relative_eq!(loaded.total_area(), report.total_area(), epsilon = 1e-9);
    }

    #[test]
    fn plane_path_for_known_rows_only() {
        let layout = OutputLayout::new("out");
        let report = SurfaceReport {
            records: vec![SurfaceRecord {
                segment: 2,
                area: 1.5,
                points: None,
            }],
        };
        assert_eq!(
            report.plane_path(&layout, 2),
            Some(PathBuf::from("out/planes/plane_2.ply"))
        );
        assert_eq!(report.plane_path(&layout, 1), None);
    }

    #[test]
    fn degenerate_plane_has_zero_area() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.prepare().unwrap();
        let line: Vec<[f32; 3]> = (0..5).map(|i| [i as f32, 0.0, 0.0]).collect();
        let planes = assemble(vec![PointCloud::from_points(&line)]);

        let report = measure_surfaces(&planes, &layout).unwrap();
        assert_eq!(report.records[0].area, 0.0);
        assert!(layout.mesh_path(1).exists());
    }

    #[test]
    fn missing_report_is_a_load_error() {
        let err = SurfaceReport::load("/nonexistent/output.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
    }
}
