use planeseg_core::{Colors, Normals, PointCloud};
use std::fs;
use std::io::{self, BufWriter, Write as _};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
}

/// Scalar property type as declared in the PLY header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropType {
    Char,
    Uchar,
    Short,
    Ushort,
    Int,
    Uint,
    Float,
    Double,
}

impl PropType {
    fn parse(name: &str) -> io::Result<Self> {
        Ok(match name {
            "char" | "int8" => PropType::Char,
            "uchar" | "uint8" => PropType::Uchar,
            "short" | "int16" => PropType::Short,
            "ushort" | "uint16" => PropType::Ushort,
            "int" | "int32" => PropType::Int,
            "uint" | "uint32" => PropType::Uint,
            "float" | "float32" => PropType::Float,
            "double" | "float64" => PropType::Double,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("unsupported property type: {}", other),
                ))
            }
        })
    }

    fn byte_size(self) -> usize {
        match self {
            PropType::Char | PropType::Uchar => 1,
            PropType::Short | PropType::Ushort => 2,
            PropType::Int | PropType::Uint | PropType::Float => 4,
            PropType::Double => 8,
        }
    }

    /// Decodes one little-endian value; `bytes` holds at least `byte_size`.
    fn read_le(self, bytes: &[u8]) -> f64 {
        match self {
            PropType::Char => bytes[0] as i8 as f64,
            PropType::Uchar => bytes[0] as f64,
            PropType::Short => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            PropType::Ushort => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            PropType::Int => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            PropType::Uint => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            PropType::Float => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            PropType::Double => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        }
    }
}

struct Property {
    name: String,
    ty: PropType,
    offset: usize,
}

struct PlyHeader {
    format: PlyFormat,
    vertex_count: usize,
    properties: Vec<Property>,
    stride: usize,
    body_offset: usize,
}

impl PlyHeader {
    fn find(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn parse_header(data: &[u8]) -> io::Result<PlyHeader> {
    let marker = b"end_header";
    let marker_pos = data
        .windows(marker.len())
        .position(|w| w == marker)
        .ok_or_else(|| invalid("missing end_header in PLY file"))?;

    // The body starts after the line terminator following end_header.
    let body_offset = data[marker_pos..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| marker_pos + p + 1)
        .unwrap_or(data.len());

    let header_text = std::str::from_utf8(&data[..marker_pos])
        .map_err(|_| invalid("PLY header not valid UTF-8"))?;

    let mut lines = header_text.lines().map(str::trim);
    if lines.next() != Some("ply") {
        return Err(invalid("file does not start with 'ply'"));
    }

    let mut format = None;
    let mut vertex_count = None;
    let mut properties = Vec::new();
    let mut stride = 0;
    let mut in_vertex_element = false;

    for line in lines {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["format", "ascii", ..] => format = Some(PlyFormat::Ascii),
            ["format", "binary_little_endian", ..] => {
                format = Some(PlyFormat::BinaryLittleEndian)
            }
            ["format", ..] => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("unsupported PLY format: {}", line),
                ))
            }
            ["element", "vertex", count] => {
                let count = count
                    .parse::<usize>()
                    .map_err(|e| invalid(format!("invalid vertex count: {}", e)))?;
                vertex_count = Some(count);
                in_vertex_element = true;
            }
            ["element", name, count] => {
                // Elements after the vertices are ignored; anything before
                // them would shift the vertex data.
                if vertex_count.is_none() && count.parse::<usize>().unwrap_or(0) > 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        format!("element '{}' precedes vertex data", name),
                    ));
                }
                in_vertex_element = false;
            }
            ["property", "list", ..] if in_vertex_element => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "list properties on vertices are not supported",
                ));
            }
            ["property", ty, name] if in_vertex_element => {
                let ty = PropType::parse(ty)?;
                properties.push(Property {
                    name: name.to_string(),
                    ty,
                    offset: stride,
                });
                stride += ty.byte_size();
            }
            _ => {}
        }
    }

    Ok(PlyHeader {
        format: format.ok_or_else(|| invalid("PLY format line missing"))?,
        vertex_count: vertex_count.unwrap_or(0),
        properties,
        stride,
        body_offset,
    })
}

/// Reads a PLY point cloud (ASCII or binary little endian).
///
/// `x`, `y`, `z` are required; `nx/ny/nz` and `red/green/blue` are picked up
/// when all three are present. Any numeric property type is accepted.
pub fn read_ply(path: impl AsRef<Path>) -> io::Result<PointCloud> {
    let data = fs::read(&path)?;
    let header = parse_header(&data)?;

    let xyz = match (header.find("x"), header.find("y"), header.find("z")) {
        (Some(ix), Some(iy), Some(iz)) => [ix, iy, iz],
        _ => return Err(invalid("PLY file missing required x, y, z properties")),
    };
    let normal_idx = match (header.find("nx"), header.find("ny"), header.find("nz")) {
        (Some(a), Some(b), Some(c)) => Some([a, b, c]),
        _ => None,
    };
    let color_idx = match (header.find("red"), header.find("green"), header.find("blue")) {
        (Some(a), Some(b), Some(c)) => Some([a, b, c]),
        _ => None,
    };

    let n = header.vertex_count;
    let mut rows: Vec<Vec<f64>>;

    match header.format {
        PlyFormat::Ascii => {
            let body = std::str::from_utf8(&data[header.body_offset..])
                .map_err(|_| invalid("PLY body not valid UTF-8"))?;
            // Every row takes at least two bytes, whatever the header claims.
            rows = Vec::with_capacity(n.min(body.len() / 2));
            for line in body.lines().map(str::trim).filter(|l| !l.is_empty()).take(n) {
                let row = line
                    .split_whitespace()
                    .zip(&header.properties)
                    .map(|(v, prop)| {
                        // Parse floats at their own width so written values
                        // read back bit-exact.
                        let parsed = if prop.ty == PropType::Float {
                            v.parse::<f32>().map(f64::from)
                        } else {
                            v.parse::<f64>()
                        };
                        parsed.map_err(|e| invalid(format!("failed to parse value '{}': {}", v, e)))
                    })
                    .collect::<io::Result<Vec<f64>>>()?;
                if row.len() < header.properties.len() {
                    return Err(invalid(format!(
                        "vertex line has {} fields, expected {}",
                        row.len(),
                        header.properties.len()
                    )));
                }
                rows.push(row);
            }
            if rows.len() < n {
                return Err(invalid(format!(
                    "PLY body has {} vertices, header declares {}",
                    rows.len(),
                    n
                )));
            }
        }
        PlyFormat::BinaryLittleEndian => {
            let body = &data[header.body_offset..];
            let needed = n
                .checked_mul(header.stride)
                .ok_or_else(|| invalid(format!("PLY vertex count {} is too large", n)))?;
            if body.len() < needed {
                return Err(invalid(format!(
                    "PLY binary body too short: need {} bytes, got {}",
                    needed,
                    body.len()
                )));
            }
            rows = Vec::with_capacity(n);
            for record in body.chunks_exact(header.stride.max(1)).take(n) {
                rows.push(
                    header
                        .properties
                        .iter()
                        .map(|p| p.ty.read_le(&record[p.offset..]))
                        .collect(),
                );
            }
        }
    }

    let column = |idx: usize| -> Vec<f32> { rows.iter().map(|r| r[idx] as f32).collect() };

    let mut cloud = PointCloud::from_xyz(column(xyz[0]), column(xyz[1]), column(xyz[2]));

    if let Some([a, b, c]) = normal_idx {
        cloud.normals = Some(Normals {
            nx: column(a),
            ny: column(b),
            nz: column(c),
        });
    }

    if let Some(idx) = color_idx {
        // Float colors are stored in [0, 1]; integer colors in [0, 255].
        let scale = if header.properties[idx[0]].ty == PropType::Float
            || header.properties[idx[0]].ty == PropType::Double
        {
            255.0
        } else {
            1.0
        };
        let channel = |i: usize| -> Vec<u8> {
            rows.iter()
                .map(|r| (r[i] * scale).round().clamp(0.0, 255.0) as u8)
                .collect()
        };
        cloud.colors = Some(Colors {
            r: channel(idx[0]),
            g: channel(idx[1]),
            b: channel(idx[2]),
        });
    }

    Ok(cloud)
}

fn vertex_header(out: &mut String, cloud: &PointCloud, format: &str) {
    out.push_str("ply\n");
    out.push_str(&format!("format {} 1.0\n", format));
    out.push_str(&format!("element vertex {}\n", cloud.len()));
    out.push_str("property float x\nproperty float y\nproperty float z\n");
    if cloud.normals.is_some() {
        out.push_str("property float nx\nproperty float ny\nproperty float nz\n");
    }
    if cloud.colors.is_some() {
        out.push_str("property uchar red\nproperty uchar green\nproperty uchar blue\n");
    }
}

fn ascii_vertex_rows(out: &mut String, cloud: &PointCloud) {
    for i in 0..cloud.len() {
        out.push_str(&format!("{} {} {}", cloud.x[i], cloud.y[i], cloud.z[i]));
        if let Some(normals) = &cloud.normals {
            out.push_str(&format!(
                " {} {} {}",
                normals.nx[i], normals.ny[i], normals.nz[i]
            ));
        }
        if let Some(colors) = &cloud.colors {
            out.push_str(&format!(" {} {} {}", colors.r[i], colors.g[i], colors.b[i]));
        }
        out.push('\n');
    }
}

/// Write a PLY file in ASCII format.
pub fn write_ply(path: impl AsRef<Path>, cloud: &PointCloud) -> io::Result<()> {
    let mut out = String::new();
    vertex_header(&mut out, cloud, "ascii");
    out.push_str("end_header\n");
    ascii_vertex_rows(&mut out, cloud);
    fs::write(path, out)
}

/// Write a PLY file in binary_little_endian format.
pub fn write_ply_binary(path: impl AsRef<Path>, cloud: &PointCloud) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let mut w = BufWriter::new(file);

    let mut header = String::new();
    vertex_header(&mut header, cloud, "binary_little_endian");
    header.push_str("end_header\n");
    w.write_all(header.as_bytes())?;

    for i in 0..cloud.len() {
        w.write_all(&cloud.x[i].to_le_bytes())?;
        w.write_all(&cloud.y[i].to_le_bytes())?;
        w.write_all(&cloud.z[i].to_le_bytes())?;

        if let Some(normals) = &cloud.normals {
            w.write_all(&normals.nx[i].to_le_bytes())?;
            w.write_all(&normals.ny[i].to_le_bytes())?;
            w.write_all(&normals.nz[i].to_le_bytes())?;
        }

        if let Some(colors) = &cloud.colors {
            w.write_all(&[colors.r[i], colors.g[i], colors.b[i]])?;
        }
    }

    w.flush()
}

/// Write an ASCII PLY triangle mesh: `vertices` plus one face per triangle.
///
/// Fails with `InvalidInput` when a face references a missing vertex.
pub fn write_ply_mesh(
    path: impl AsRef<Path>,
    vertices: &PointCloud,
    triangles: &[[u32; 3]],
) -> io::Result<()> {
    let n = vertices.len();
    if let Some(bad) = triangles
        .iter()
        .find(|t| t.iter().any(|&v| v as usize >= n))
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("triangle {:?} references a vertex beyond {}", bad, n),
        ));
    }

    let mut out = String::new();
    vertex_header(&mut out, vertices, "ascii");
    out.push_str(&format!("element face {}\n", triangles.len()));
    out.push_str("property list uchar int vertex_indices\n");
    out.push_str("end_header\n");
    ascii_vertex_rows(&mut out, vertices);
    for [a, b, c] in triangles {
        out.push_str(&format!("3 {} {} {}\n", a, b, c));
    }
    fs::write(path, out)
}
