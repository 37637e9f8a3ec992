use glam::Vec3;

use super::bounds::{bounding_area, world_bounds};
use crate::error::{Error, Result};
use crate::math::BoundingArea;
use crate::scene::{EntityId, SceneContext};

/// Closed-interval containment on the XY plane
pub fn point_in_area(point: Vec3, area: &BoundingArea) -> bool {
    area.contains(point)
}

/// True as soon as one world-space vertex of `probe` falls inside the XY
/// bounding area of `obstacle`. Height is ignored, and the test is one-sided:
/// a probe that fully covers a small obstacle without any probe vertex inside
/// the obstacle's area does not collide.
pub fn objects_collide(scene: &SceneContext, probe: EntityId, obstacle: EntityId) -> Result<bool> {
    PlanarOverlap.collides(scene, probe, obstacle)
}

/// Pluggable probe-versus-obstacle test used by the placement search
pub trait CollisionStrategy {
    fn collides(&self, scene: &SceneContext, probe: EntityId, obstacle: EntityId) -> Result<bool>;

    fn name(&self) -> &'static str {
        "collision"
    }
}

/// Probe vertices against the obstacle's XY bounding area
#[derive(Copy, Clone, Debug, Default)]
pub struct PlanarOverlap;

/// Probe vertices against the obstacle's full 3D world box
#[derive(Copy, Clone, Debug, Default)]
pub struct VolumeOverlap;

fn probe_vertices<'a>(
    scene: &'a SceneContext,
    probe: EntityId,
) -> Result<impl Iterator<Item = Vec3> + 'a> {
    let entity = scene.entity(probe);
    let mesh = entity.as_mesh().ok_or_else(|| Error::NonMesh(entity.name.clone()))?;
    let world = scene.world_matrix(probe)?;
    Ok(mesh.positions.iter().map(move |&p| world.transform_point3(p)))
}

impl CollisionStrategy for PlanarOverlap {
    fn collides(&self, scene: &SceneContext, probe: EntityId, obstacle: EntityId) -> Result<bool> {
        let mut vertices = probe_vertices(scene, probe)?;
        let Some(area) = bounding_area(scene, obstacle)? else {
            return Ok(false);
        };
        Ok(vertices.any(|v| point_in_area(v, &area)))
    }

    fn name(&self) -> &'static str {
        "planar-overlap"
    }
}

impl CollisionStrategy for VolumeOverlap {
    fn collides(&self, scene: &SceneContext, probe: EntityId, obstacle: EntityId) -> Result<bool> {
        let mut vertices = probe_vertices(scene, probe)?;
        let Some(bounds) = world_bounds(scene, obstacle)? else {
            return Ok(false);
        };
        Ok(vertices.any(|v| bounds.contains(v)))
    }

    fn name(&self) -> &'static str {
        "volume-overlap"
    }
}
