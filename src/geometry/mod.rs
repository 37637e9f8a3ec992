mod bounds;
mod collision;
mod deform;
mod distance;

pub use bounds::{bounding_area, world_bounds};
pub use collision::{objects_collide, point_in_area, CollisionStrategy, PlanarOverlap, VolumeOverlap};
pub use deform::{deformed_vertices, world_vertices};
pub use distance::min_distance;
