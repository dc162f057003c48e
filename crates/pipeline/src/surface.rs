use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use planeseg_core::PointCloud;

/// A flat triangle fan over the convex outline of a plane's points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SurfaceMesh {
    pub vertices: PointCloud,
    pub triangles: Vec<[u32; 3]>,
    /// Area of the outline polygon.
    pub area: f64,
}

impl SurfaceMesh {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Least-squares plane frame of a point set: centroid plus two in-plane
/// axes, the first along the direction of largest spread.
struct PlaneFrame {
    origin: Vector3<f64>,
    u: Vector3<f64>,
    v: Vector3<f64>,
}

impl PlaneFrame {
    fn fit(points: &[Vector3<f64>]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let n = points.len() as f64;
        let origin = points.iter().sum::<Vector3<f64>>() / n;
        let cov = points.iter().fold(Matrix3::zeros(), |acc, p| {
            let d = p - origin;
            acc + d * d.transpose()
        }) / n;

        let eig = SymmetricEigen::new(cov);
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

        let u = eig.eigenvectors.column(order[0]).into_owned();
        let normal = eig.eigenvectors.column(order[2]).into_owned();
        let v = normal.cross(&u);
        let (u, v) = (u.try_normalize(1e-12)?, v.try_normalize(1e-12)?);
        Some(Self { origin, u, v })
    }

    fn project(&self, p: &Vector3<f64>) -> [f64; 2] {
        let d = p - self.origin;
        [d.dot(&self.u), d.dot(&self.v)]
    }

    fn lift(&self, q: [f64; 2]) -> [f32; 3] {
        let p = self.origin + self.u * q[0] + self.v * q[1];
        [p.x as f32, p.y as f32, p.z as f32]
    }
}

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Counter-clockwise convex hull (Andrew's monotone chain). Collinear
/// boundary points are dropped.
pub fn convex_hull(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut pts: Vec<[f64; 2]> = points
        .iter()
        .copied()
        .filter(|p| p.iter().all(|v| v.is_finite()))
        .collect();
    pts.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<[f64; 2]> = Vec::with_capacity(2 * pts.len());

    // Lower chain, then upper chain.
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Shoelace area of a simple polygon.
pub fn polygon_area(polygon: &[[f64; 2]]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let twice: f64 = (0..polygon.len())
        .map(|i| {
            let (a, b) = (polygon[i], polygon[(i + 1) % polygon.len()]);
            a[0] * b[1] - b[0] * a[1]
        })
        .sum();
    twice.abs() / 2.0
}

/// Meshes a plane as the fan triangulation of its convex outline in the
/// best-fit plane. Fewer than three non-collinear points give an empty
/// mesh with zero area.
pub fn plane_surface(cloud: &PointCloud) -> SurfaceMesh {
    let points: Vec<Vector3<f64>> = cloud
        .iter_points()
        .filter(|p| p.iter().all(|v| v.is_finite()))
        .map(|p| Vector3::new(p[0] as f64, p[1] as f64, p[2] as f64))
        .collect();

    let Some(frame) = PlaneFrame::fit(&points) else {
        return SurfaceMesh::default();
    };
    let projected: Vec<[f64; 2]> = points.iter().map(|p| frame.project(p)).collect();
    let hull = convex_hull(&projected);
    let area = polygon_area(&hull);
    let scale = cloud.aabb().map_or(0.0, |b| f64::from(b.diagonal()));
    // Rounding noise around a straight line still yields a sliver hull.
    if hull.len() < 3 || area <= 1e-9 * scale * scale {
        return SurfaceMesh::default();
    }

    let vertices: Vec<[f32; 3]> = hull.iter().map(|&q| frame.lift(q)).collect();
    let triangles = (1..hull.len() as u32 - 1).map(|i| [0, i, i + 1]).collect();

    SurfaceMesh {
        vertices: PointCloud::from_points(&vertices),
        triangles,
        area,
    }
}
