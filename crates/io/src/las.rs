use planeseg_core::{Colors, PointCloud};
use std::io;
use std::path::Path;

fn las_error(kind: io::ErrorKind, what: &str, e: las::Error) -> io::Error {
    io::Error::new(kind, format!("{}: {}", what, e))
}

/// Reads a LAS/LAZ scan. Colors are kept, reduced to 8 bits, only when
/// every point carries one.
pub fn read_las(path: impl AsRef<Path>) -> io::Result<PointCloud> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        ));
    }
    let mut reader = las::Reader::from_path(path)
        .map_err(|e| las_error(io::ErrorKind::InvalidData, "cannot open LAS file", e))?;

    let capacity = usize::try_from(reader.header().number_of_points()).unwrap_or(0);
    let mut points = Vec::with_capacity(capacity);
    let mut rgb: Option<Vec<[u8; 3]>> = Some(Vec::with_capacity(capacity));

    for point in reader.points() {
        let point =
            point.map_err(|e| las_error(io::ErrorKind::InvalidData, "bad LAS point record", e))?;
        points.push([point.x as f32, point.y as f32, point.z as f32]);
        rgb = match (rgb, point.color) {
            (Some(mut acc), Some(c)) => {
                acc.push([c.red, c.green, c.blue].map(|v| (v >> 8) as u8));
                Some(acc)
            }
            _ => None,
        };
    }

    let mut cloud = PointCloud::from_points(&points);
    if let Some(rgb) = rgb.filter(|c| !c.is_empty()) {
        cloud.colors = Some(Colors {
            r: rgb.iter().map(|c| c[0]).collect(),
            g: rgb.iter().map(|c| c[1]).collect(),
            b: rgb.iter().map(|c| c[2]).collect(),
        });
    }
    Ok(cloud)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_scan(path: &Path, format: u8, colored: &[bool]) {
        let mut builder = las::Builder::from((1, 2));
        builder.point_format = las::point::Format::new(format).unwrap();
        let mut writer = las::Writer::from_path(path, builder.into_header().unwrap()).unwrap();
        for (i, &has_color) in colored.iter().enumerate() {
            let f = i as f64;
            let point = las::point::Point {
                x: f,
                y: 2.0 * f,
                z: 0.5,
                color: has_color.then(|| las::Color::new(65535, 0, 32768)),
                ..Default::default()
            };
            writer.write(point).unwrap();
        }
        drop(writer);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let err = read_las(dir.path().join("absent.las")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn colored_scan() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.las");
        write_scan(&path, 2, &[true, true, true]);

        let cloud = read_las(&path).unwrap();
        assert_eq!(cloud.len(), 3);
        assert!((cloud.y[2] - 4.0).abs() < 0.01);
        assert!((cloud.z[0] - 0.5).abs() < 0.01);
        let colors = cloud.colors.expect("format 2 carries color");
        assert_eq!(colors.r, vec![255; 3]);
        assert_eq!(colors.g, vec![0; 3]);
        assert_eq!(colors.b, vec![128; 3]);
    }

    #[test]
    fn scan_without_color() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.las");
        write_scan(&path, 0, &[false, false]);
        let cloud = read_las(&path).unwrap();
        assert_eq!(cloud.len(), 2);
        assert!(cloud.colors.is_none());
    }

    #[test]
    fn garbage_is_invalid_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.las");
        std::fs::write(&path, b"LASF but not really").unwrap();
        assert_eq!(read_las(&path).unwrap_err().kind(), io::ErrorKind::InvalidData);
    }
}
