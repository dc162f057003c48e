/// Axis-aligned bounds of the finite points of a cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    /// Bounds of `points`, skipping non-finite ones. `None` when nothing
    /// finite is left.
    pub fn of(points: impl IntoIterator<Item = [f32; 3]>) -> Option<Self> {
        points
            .into_iter()
            .filter(|p| p.iter().all(|v| v.is_finite()))
            .fold(None, |acc: Option<Self>, p| {
                Some(match acc {
                    None => Self { min: p, max: p },
                    Some(b) => Self {
                        min: [b.min[0].min(p[0]), b.min[1].min(p[1]), b.min[2].min(p[2])],
                        max: [b.max[0].max(p[0]), b.max[1].max(p[1]), b.max[2].max(p[2])],
                    },
                })
            })
    }

    pub fn contains(&self, p: &[f32; 3]) -> bool {
        (0..3).all(|a| p[a] >= self.min[a] && p[a] <= self.max[a])
    }

    pub fn extent(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Length of the box diagonal.
    pub fn diagonal(&self) -> f32 {
        let [dx, dy, dz] = self.extent();
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}
