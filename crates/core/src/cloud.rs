use crate::{Aabb, Rgb};

/// Structure-of-arrays point cloud.
///
/// Optional per-point attributes always have the same length as `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub normals: Option<Normals>,
    pub colors: Option<Colors>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normals {
    pub nx: Vec<f32>,
    pub ny: Vec<f32>,
    pub nz: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Colors {
    pub r: Vec<u8>,
    pub g: Vec<u8>,
    pub b: Vec<u8>,
}

impl Normals {
    fn select(&self, indices: &[usize]) -> Self {
        Self {
            nx: indices.iter().map(|&idx| self.nx[idx]).collect(),
            ny: indices.iter().map(|&idx| self.ny[idx]).collect(),
            nz: indices.iter().map(|&idx| self.nz[idx]).collect(),
        }
    }

    fn extend(&mut self, other: &Normals) {
        self.nx.extend_from_slice(&other.nx);
        self.ny.extend_from_slice(&other.ny);
        self.nz.extend_from_slice(&other.nz);
    }
}

impl Colors {
    pub fn uniform(color: Rgb, n: usize) -> Self {
        let [r, g, b] = color.to_u8();
        Self {
            r: vec![r; n],
            g: vec![g; n],
            b: vec![b; n],
        }
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            r: indices.iter().map(|&idx| self.r[idx]).collect(),
            g: indices.iter().map(|&idx| self.g[idx]).collect(),
            b: indices.iter().map(|&idx| self.b[idx]).collect(),
        }
    }

    fn extend(&mut self, other: &Colors) {
        self.r.extend_from_slice(&other.r);
        self.g.extend_from_slice(&other.g);
        self.b.extend_from_slice(&other.b);
    }
}

impl PointCloud {
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            normals: None,
            colors: None,
        }
    }

    pub fn from_xyz(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>) -> Self {
        assert_eq!(x.len(), y.len(), "x and y must have same length");
        assert_eq!(x.len(), z.len(), "x and z must have same length");

        Self {
            x,
            y,
            z,
            normals: None,
            colors: None,
        }
    }

    pub fn from_points(points: &[[f32; 3]]) -> Self {
        let mut x = Vec::with_capacity(points.len());
        let mut y = Vec::with_capacity(points.len());
        let mut z = Vec::with_capacity(points.len());

        for p in points {
            x.push(p[0]);
            y.push(p[1]);
            z.push(p[2]);
        }

        Self::from_xyz(x, y, z)
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.x.len(), self.y.len());
        debug_assert_eq!(self.x.len(), self.z.len());
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Bounds of the finite points; `None` for a cloud without any.
    pub fn aabb(&self) -> Option<Aabb> {
        Aabb::of(self.iter_points())
    }

    pub fn point(&self, i: usize) -> [f32; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    pub fn iter_points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((x, y), z)| [*x, *y, *z])
    }

    pub fn to_points(&self) -> Vec<[f32; 3]> {
        self.iter_points().collect()
    }

    /// Points at the given indices, in index order. Attributes follow.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut x = Vec::with_capacity(indices.len());
        let mut y = Vec::with_capacity(indices.len());
        let mut z = Vec::with_capacity(indices.len());

        for &idx in indices {
            assert!(idx < self.len(), "index out of bounds in select");
            x.push(self.x[idx]);
            y.push(self.y[idx]);
            z.push(self.z[idx]);
        }

        Self {
            x,
            y,
            z,
            normals: self.normals.as_ref().map(|n| n.select(indices)),
            colors: self.colors.as_ref().map(|c| c.select(indices)),
        }
    }

    /// Select all points NOT in the given index set.
    ///
    /// This is the complement of [`select`](Self::select) and the `remove`
    /// step of the segmentation loop. The relative order of the retained
    /// points is preserved; duplicate indices count once.
    ///
    /// # Panics
    ///
    /// Panics if any index in `indices` is out of bounds.
    pub fn select_inverse(&self, indices: &[usize]) -> Self {
        let n = self.len();
        let mut exclude = vec![false; n];
        for &idx in indices {
            assert!(idx < n, "index out of bounds in select_inverse");
            exclude[idx] = true;
        }

        let kept: Vec<usize> = (0..n).filter(|&i| !exclude[i]).collect();
        self.select(&kept)
    }

    /// A new cloud holding `self` followed by `other`.
    ///
    /// An optional attribute survives only when both inputs carry it, or
    /// when one side is empty and the other carries it.
    pub fn append(&self, other: &PointCloud) -> Self {
        let mut out = self.clone();
        out.extend_from(other);
        out
    }

    /// In-place variant of [`append`](Self::append).
    pub fn extend_from(&mut self, other: &PointCloud) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other.clone();
            return;
        }

        self.x.extend_from_slice(&other.x);
        self.y.extend_from_slice(&other.y);
        self.z.extend_from_slice(&other.z);

        self.normals = match (self.normals.take(), &other.normals) {
            (Some(mut a), Some(b)) => {
                a.extend(b);
                Some(a)
            }
            _ => None,
        };
        self.colors = match (self.colors.take(), &other.colors) {
            (Some(mut a), Some(b)) => {
                a.extend(b);
                Some(a)
            }
            _ => None,
        };
    }

    /// Concatenates clouds in iteration order.
    pub fn concat<'a>(clouds: impl IntoIterator<Item = &'a PointCloud>) -> Self {
        let mut out = PointCloud::new();
        for cloud in clouds {
            out.extend_from(cloud);
        }
        out
    }

    /// Replaces any per-point colors with a single color.
    pub fn paint_uniform(&mut self, color: Rgb) {
        self.colors = Some(Colors::uniform(color, self.len()));
    }
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new()
    }
}
