#![forbid(unsafe_code)]

pub mod bbox;
pub mod cloud;
pub mod color;

pub use bbox::Aabb;
pub use cloud::{Colors, Normals, PointCloud};
pub use color::Rgb;
