use glam::Vec3;
use serde::Serialize;

/// Axis-aligned rectangle on the XY working plane
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct BoundingArea {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl BoundingArea {
    pub fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Closed-interval containment; z is ignored
    pub fn contains(&self, point: Vec3) -> bool {
        self.min_x <= point.x
            && point.x <= self.max_x
            && self.min_y <= point.y
            && point.y <= self.max_y
    }
}
