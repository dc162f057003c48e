#![forbid(unsafe_code)]

pub mod las;
pub mod pcd;
pub mod ply;
pub mod surface_csv;

pub use las::read_las;
pub use pcd::read_pcd;
pub use ply::{read_ply, write_ply, write_ply_binary, write_ply_mesh};
pub use surface_csv::{read_surface_csv, write_surface_csv, SurfaceRecord};

use planeseg_core::PointCloud;
use std::io;
use std::path::Path;

/// Loads a point cloud, picking the reader from the file extension
/// (`ply`, `pcd`, `las`, `laz`; case-insensitive).
pub fn read_point_cloud(path: impl AsRef<Path>) -> io::Result<PointCloud> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("ply") => read_ply(path),
        Some("pcd") => read_pcd(path),
        Some("las") | Some("laz") => read_las(path),
        _ => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("unsupported point cloud format: {}", path.display()),
        )),
    }
}
