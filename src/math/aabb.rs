use glam::{Mat4, Vec3};
use serde::Serialize;

use super::BoundingArea;

/// Axis-aligned bounding box in 3D
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing all points, `None` for an empty slice
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let bounds = rest.iter().fold(
            AABB::new(*first, *first),
            |acc, &p| AABB::new(acc.min.min(p), acc.max.max(p)),
        );
        Some(bounds)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corners, ordered by the bits of the index (x, y, z)
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    /// Maps all eight corners through `matrix` and re-fits an axis-aligned box
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        let corners = self.corners().map(|c| matrix.transform_point3(c));
        corners[1..].iter().fold(
            AABB::new(corners[0], corners[0]),
            |acc, &p| AABB::new(acc.min.min(p), acc.max.max(p)),
        )
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Projection onto the XY working plane
    pub fn project_xy(&self) -> BoundingArea {
        BoundingArea {
            min_x: self.min.x,
            max_x: self.max.x,
            min_y: self.min.y,
            max_y: self.max.y,
        }
    }
}
