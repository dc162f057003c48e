use std::fs;
use std::io;
use std::path::Path;

pub const SEGMENT_COLUMN: &str = "Segment";
pub const AREA_COLUMN: &str = "Surface area";
pub const POINTS_COLUMN: &str = "Points";

/// One row of the surface report: a segment id (1-based, matching the
/// `plane_{id}.ply` artifact) and its measured area.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRecord {
    pub segment: usize,
    pub area: f64,
    /// Point count of the plane. Absent in reports that only carry the
    /// two required columns.
    pub points: Option<usize>,
}

/// Writes `Segment,Surface area,Points` rows.
pub fn write_surface_csv(path: impl AsRef<Path>, records: &[SurfaceRecord]) -> io::Result<()> {
    let mut out = format!("{},{},{}\n", SEGMENT_COLUMN, AREA_COLUMN, POINTS_COLUMN);
    for rec in records {
        let points = rec.points.map(|p| p.to_string()).unwrap_or_default();
        out.push_str(&format!("{},{},{}\n", rec.segment, rec.area, points));
    }
    fs::write(path, out)
}

/// Reads a surface report. `Segment` and `Surface area` columns are
/// required, in any position; other columns are ignored.
pub fn read_surface_csv(path: impl AsRef<Path>) -> io::Result<Vec<SurfaceRecord>> {
    let text = fs::read_to_string(path)?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "surface report is empty"))?
        .split(',')
        .map(str::trim)
        .collect();

    let column = |name: &str| header.iter().position(|h| *h == name);
    let (seg_col, area_col) = match (column(SEGMENT_COLUMN), column(AREA_COLUMN)) {
        (Some(s), Some(a)) => (s, a),
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "surface report needs '{}' and '{}' columns",
                    SEGMENT_COLUMN, AREA_COLUMN
                ),
            ))
        }
    };
    let points_col = column(POINTS_COLUMN);

    lines
        .enumerate()
        .map(|(row, line)| {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let field = |col: usize| {
                fields.get(col).copied().ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("row {} has only {} fields", row + 1, fields.len()),
                    )
                })
            };
            let bad = |what: &str, v: &str| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("row {}: invalid {} '{}'", row + 1, what, v),
                )
            };

            let seg = field(seg_col)?;
            let area = field(area_col)?;
            let points = match points_col.and_then(|c| fields.get(c).copied()) {
                Some(p) if !p.is_empty() => Some(p.parse().map_err(|_| bad(POINTS_COLUMN, p))?),
                _ => None,
            };

            Ok(SurfaceRecord {
                segment: seg.parse().map_err(|_| bad(SEGMENT_COLUMN, seg))?,
                area: area.parse().map_err(|_| bad(AREA_COLUMN, area))?,
                points,
            })
        })
        .collect()
}
