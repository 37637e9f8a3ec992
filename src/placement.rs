//! Rejection sampling of a movable object until it clears every obstacle.

use log::{debug, info};

use crate::config::WorkpieceConfig;
use crate::error::{Error, Result};
use crate::geometry::{CollisionStrategy, PlanarOverlap};
use crate::sampler::TransformSampler;
use crate::scene::{EntityId, SceneContext, Transform};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlacementState {
    /// `attempt` evaluations done so far
    Searching { attempt: u32 },
    Resolved { attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Result of a successful search
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placement {
    pub attempts: u32,
    pub transform: Transform,
}

/// Draws a full workpiece transform: planar scale, rotation about z, planar position
pub fn randomize_workpiece(
    sampler: &mut TransformSampler,
    transform: &mut Transform,
    config: &WorkpieceConfig,
) {
    sampler.sample_planar_scale(transform, &config.size_range);
    transform.rotation.z = sampler.sample_angle(&config.rotation_range);
    sampler.sample_planar_position(transform, &config.position_range);
}

pub struct PlacementResolver<S: CollisionStrategy = PlanarOverlap> {
    strategy: S,
    max_attempts: u32,
}

impl PlacementResolver<PlanarOverlap> {
    pub fn new(max_attempts: u32) -> Self {
        Self::with_strategy(PlanarOverlap, max_attempts)
    }
}

impl<S: CollisionStrategy> PlacementResolver<S> {
    pub fn with_strategy(strategy: S, max_attempts: u32) -> Self {
        Self {
            strategy,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Tests the current placement first; while any obstacle is hit the
    /// workpiece transform is resampled and re-tested, up to `max_attempts`
    /// evaluations in total. The resolved transform is left in the scene.
    pub fn resolve(
        &self,
        scene: &mut SceneContext,
        workpiece: EntityId,
        obstacles: &[EntityId],
        sampler: &mut TransformSampler,
        config: &WorkpieceConfig,
    ) -> Result<Placement> {
        let mut state = PlacementState::Searching { attempt: 0 };
        loop {
            state = match state {
                PlacementState::Searching { attempt } if attempt >= self.max_attempts => {
                    PlacementState::Exhausted { attempts: attempt }
                }
                PlacementState::Searching { attempt } => {
                    if attempt > 0 {
                        randomize_workpiece(sampler, scene.transform_mut(workpiece), config);
                    }
                    scene.synchronize();
                    match self.first_hit(scene, workpiece, obstacles)? {
                        Some(obstacle) => {
                            debug!(
                                "Placement attempt {} for `{}` hits `{}` ({})",
                                attempt + 1,
                                scene.name(workpiece),
                                scene.name(obstacle),
                                self.strategy.name()
                            );
                            PlacementState::Searching { attempt: attempt + 1 }
                        }
                        None => PlacementState::Resolved { attempts: attempt + 1 },
                    }
                }
                PlacementState::Resolved { attempts } => {
                    let transform = scene.entity(workpiece).transform;
                    info!(
                        "Placed `{}` at ({:.3}, {:.3}) after {} attempt(s)",
                        scene.name(workpiece),
                        transform.location.x,
                        transform.location.y,
                        attempts
                    );
                    return Ok(Placement { attempts, transform });
                }
                PlacementState::Exhausted { attempts } => {
                    return Err(Error::RetryExhausted {
                        entity: scene.name(workpiece).to_string(),
                        attempts,
                    });
                }
            };
        }
    }

    fn first_hit(
        &self,
        scene: &SceneContext,
        workpiece: EntityId,
        obstacles: &[EntityId],
    ) -> Result<Option<EntityId>> {
        for &obstacle in obstacles {
            if self.strategy.collides(scene, workpiece, obstacle)? {
                return Ok(Some(obstacle));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PlanarRange, RangeSpec};
    use crate::geometry::objects_collide;
    use crate::scene::{Mesh, SceneEntity};
    use glam::Vec3;

    fn config(x: RangeSpec, y: RangeSpec) -> WorkpieceConfig {
        WorkpieceConfig {
            size_range: PlanarRange {
                x: RangeSpec::fixed(1.0),
                y: RangeSpec::fixed(1.0),
            },
            position_range: PlanarRange { x, y },
            rotation_range: RangeSpec::fixed(0.0),
            subdivision_cuts: 0,
            max_placement_attempts: 100,
        }
    }

    fn scene() -> (SceneContext, EntityId, Vec<EntityId>) {
        let mut scene = SceneContext::new();
        let workpiece = scene.add(SceneEntity::mesh("workpiece", Mesh::plane(0.1, 0.1)));
        let a = scene.add(SceneEntity::mesh(
            "Ch17_Vest",
            Mesh::cuboid(Vec3::new(-0.5, -0.5, 0.0), Vec3::new(0.5, 0.5, 1.0)),
        ));
        let b = scene.add(SceneEntity::mesh(
            "Link-0",
            Mesh::cuboid(Vec3::new(1.0, -0.5, 0.0), Vec3::new(2.0, 0.5, 1.0)),
        ));
        (scene, workpiece, vec![a, b])
    }

    #[test]
    fn clear_start_resolves_on_first_attempt() {
        let (mut scene, workpiece, obstacles) = scene();
        scene.transform_mut(workpiece).location = Vec3::new(-3.0, 3.0, 0.0);
        let mut sampler = TransformSampler::seeded(1);
        let cfg = config(RangeSpec::new(-5.0, 5.0), RangeSpec::new(-5.0, 5.0));
        let placement = PlacementResolver::new(10)
            .resolve(&mut scene, workpiece, &obstacles, &mut sampler, &cfg)
            .unwrap();
        assert_eq!(placement.attempts, 1);
        assert_eq!(placement.transform.location, Vec3::new(-3.0, 3.0, 0.0));
    }

    #[test]
    fn colliding_start_is_resampled_clear() {
        let (mut scene, workpiece, obstacles) = scene();
        let mut sampler = TransformSampler::seeded(9);
        let cfg = config(RangeSpec::new(-3.0, 3.0), RangeSpec::new(-3.0, 3.0));
        let placement = PlacementResolver::new(500)
            .resolve(&mut scene, workpiece, &obstacles, &mut sampler, &cfg)
            .unwrap();
        assert!(placement.attempts > 1);
        for &obstacle in &obstacles {
            assert!(!objects_collide(&scene, workpiece, obstacle).unwrap());
        }
    }

    #[test]
    fn range_inside_obstacle_exhausts() {
        let (mut scene, workpiece, obstacles) = scene();
        let mut sampler = TransformSampler::seeded(2);
        let cfg = config(RangeSpec::new(-0.2, 0.2), RangeSpec::new(-0.2, 0.2));
        let err = PlacementResolver::new(25)
            .resolve(&mut scene, workpiece, &obstacles, &mut sampler, &cfg)
            .unwrap_err();
        match err {
            Error::RetryExhausted { entity, attempts } => {
                assert_eq!(entity, "workpiece");
                assert_eq!(attempts, 25);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn non_mesh_workpiece_fails() {
        let mut scene = SceneContext::new();
        let workpiece = scene.add(SceneEntity::empty("workpiece"));
        let obstacle = scene.add(SceneEntity::mesh("Link-0", Mesh::cuboid(Vec3::ZERO, Vec3::ONE)));
        let mut sampler = TransformSampler::seeded(2);
        let cfg = config(RangeSpec::fixed(0.0), RangeSpec::fixed(0.0));
        let result = PlacementResolver::new(5).resolve(&mut scene, workpiece, &[obstacle], &mut sampler, &cfg);
        assert!(matches!(result, Err(Error::NonMesh(_))));
    }
}
