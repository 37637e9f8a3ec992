use crate::error::{Error, Result};
use crate::math::{BoundingArea, AABB};
use crate::scene::{EntityId, SceneContext};

/// World-space box of a rigid mesh: the eight corners of its local box mapped
/// through the current world matrix. Skeletal deformation is not included.
/// `None` for a mesh without vertices.
pub fn world_bounds(scene: &SceneContext, id: EntityId) -> Result<Option<AABB>> {
    let entity = scene.entity(id);
    let mesh = entity.as_mesh().ok_or_else(|| Error::NonMesh(entity.name.clone()))?;
    let world = scene.world_matrix(id)?;
    Ok(mesh.local_bounds().map(|local| local.transformed(&world)))
}

/// XY projection of [`world_bounds`]
pub fn bounding_area(scene: &SceneContext, id: EntityId) -> Result<Option<BoundingArea>> {
    Ok(world_bounds(scene, id)?.map(|bounds| bounds.project_xy()))
}
