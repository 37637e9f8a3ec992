mod aabb;
mod area;
mod euler;

pub use aabb::AABB;
pub use area::BoundingArea;
pub use euler::{euler_to_quat, quat_to_euler};
