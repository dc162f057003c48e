use planeseg_core::PointCloud;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, PartialEq)]
enum DataFormat {
    Ascii,
    Binary,
}

#[derive(Debug)]
struct Field {
    name: String,
    size: usize,
    kind: char,
    count: usize,
}

#[derive(Debug)]
struct PcdHeader {
    fields: Vec<Field>,
    points: usize,
    format: DataFormat,
    data_offset: usize,
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn parse_header(raw: &[u8]) -> io::Result<PcdHeader> {
    let mut names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut kinds: Vec<char> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut points = None;
    let mut width = None;

    let mut offset = 0;
    while offset < raw.len() {
        let end = raw[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| offset + p + 1)
            .unwrap_or(raw.len());
        let line = std::str::from_utf8(&raw[offset..end])
            .map_err(|_| invalid("PCD header is not valid UTF-8"))?
            .trim();
        offset = end;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let key = parts.next().unwrap_or_default();
        let values: Vec<&str> = parts.collect();
        let parse_usize = |v: &str| {
            v.parse::<usize>()
                .map_err(|e| invalid(format!("invalid {} value '{}': {}", key, v, e)))
        };

        match key {
            "FIELDS" => names = values.iter().map(|s| s.to_string()).collect(),
            "SIZE" => sizes = values.iter().map(|&v| parse_usize(v)).collect::<io::Result<_>>()?,
            "TYPE" => kinds = values.iter().filter_map(|v| v.chars().next()).collect(),
            "COUNT" => counts = values.iter().map(|&v| parse_usize(v)).collect::<io::Result<_>>()?,
            "WIDTH" => width = values.first().map(|&v| parse_usize(v)).transpose()?,
            "POINTS" => points = values.first().map(|&v| parse_usize(v)).transpose()?,
            "DATA" => {
                let format = match values.first().copied() {
                    Some("ascii") => DataFormat::Ascii,
                    Some("binary") => DataFormat::Binary,
                    other => {
                        return Err(io::Error::new(
                            io::ErrorKind::Unsupported,
                            format!("unsupported PCD DATA format: {:?}", other),
                        ))
                    }
                };

                if counts.is_empty() {
                    counts = vec![1; names.len()];
                }
                if sizes.is_empty() {
                    sizes = vec![4; names.len()];
                }
                if kinds.is_empty() {
                    kinds = vec!['F'; names.len()];
                }
                if sizes.len() != names.len()
                    || kinds.len() != names.len()
                    || counts.len() != names.len()
                {
                    return Err(invalid("PCD FIELDS/SIZE/TYPE/COUNT lengths differ"));
                }

                let fields = names
                    .into_iter()
                    .zip(sizes)
                    .zip(kinds)
                    .zip(counts)
                    .map(|(((name, size), kind), count)| Field {
                        name,
                        size,
                        kind,
                        count,
                    })
                    .collect();

                return Ok(PcdHeader {
                    fields,
                    points: points
                        .or(width)
                        .ok_or_else(|| invalid("PCD file missing POINTS/WIDTH header"))?,
                    format,
                    data_offset: offset,
                });
            }
            _ => {}
        }
    }

    Err(invalid("PCD file missing DATA line"))
}

fn decode_binary(kind: char, bytes: &[u8]) -> io::Result<f32> {
    Ok(match (kind, bytes.len()) {
        ('F', 4) => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        ('F', 8) => f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]) as f32,
        ('I', 2) => i16::from_le_bytes([bytes[0], bytes[1]]) as f32,
        ('I', 4) => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
        ('U', 2) => u16::from_le_bytes([bytes[0], bytes[1]]) as f32,
        ('U', 4) => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
        (kind, size) => {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported PCD coordinate type {}{}", kind, size),
            ))
        }
    })
}

/// Reads the x/y/z fields of a PCD file (ASCII or binary).
pub fn read_pcd(path: impl AsRef<Path>) -> io::Result<PointCloud> {
    let raw = fs::read(path)?;
    let header = parse_header(&raw)?;

    // Column (ASCII) and byte offset (binary) of each field's first value.
    let mut columns = Vec::with_capacity(header.fields.len());
    let mut offsets = Vec::with_capacity(header.fields.len());
    let (mut column, mut offset) = (0usize, 0usize);
    for field in &header.fields {
        columns.push(column);
        offsets.push(offset);
        column = column
            .checked_add(field.count)
            .ok_or_else(|| invalid("PCD field counts overflow"))?;
        offset = field
            .size
            .checked_mul(field.count)
            .and_then(|width| offset.checked_add(width))
            .ok_or_else(|| invalid("PCD field sizes overflow"))?;
    }
    let stride = offset;

    let find = |name: &str| header.fields.iter().position(|f| f.name == name);
    let xyz = match (find("x"), find("y"), find("z")) {
        (Some(a), Some(b), Some(c)) => [a, b, c],
        _ => return Err(invalid("PCD file missing x, y, z fields")),
    };

    let n = header.points;
    let mut coords: [Vec<f32>; 3] = Default::default();

    match header.format {
        DataFormat::Ascii => {
            let body = std::str::from_utf8(&raw[header.data_offset..])
                .map_err(|e| invalid(format!("invalid UTF-8: {}", e)))?;
            // Every row takes at least two bytes, whatever POINTS claims.
            for axis in &mut coords {
                axis.reserve(n.min(body.len() / 2));
            }
            for line in body.lines().map(str::trim).filter(|l| !l.is_empty()).take(n) {
                let values: Vec<&str> = line.split_whitespace().collect();
                for (axis, &field) in xyz.iter().enumerate() {
                    let token = values
                        .get(columns[field])
                        .ok_or_else(|| invalid(format!("PCD row too short: '{}'", line)))?;
                    let v = token
                        .parse::<f32>()
                        .map_err(|e| invalid(format!("failed to parse '{}': {}", token, e)))?;
                    coords[axis].push(v);
                }
            }
            if coords[0].len() < n {
                return Err(invalid(format!(
                    "PCD body has {} points, header declares {}",
                    coords[0].len(),
                    n
                )));
            }
        }
        DataFormat::Binary => {
            let body = &raw[header.data_offset..];
            let needed = n
                .checked_mul(stride)
                .ok_or_else(|| invalid(format!("PCD point count {} is too large", n)))?;
            if body.len() < needed {
                return Err(invalid(format!(
                    "binary PCD data too short: have {} bytes, expected {}",
                    body.len(),
                    needed
                )));
            }
            for axis in &mut coords {
                axis.reserve(n);
            }
            for record in body.chunks_exact(stride.max(1)).take(n) {
                for (axis, &field) in xyz.iter().enumerate() {
                    let f = &header.fields[field];
                    let start = offsets[field];
                    coords[axis].push(decode_binary(f.kind, &record[start..start + f.size])?);
                }
            }
        }
    }

    let [x, y, z] = coords;
    Ok(PointCloud::from_xyz(x, y, z))
}
