use glam::{Mat4, Vec3};

use crate::error::{Error, Result};
use crate::scene::{EntityId, SceneContext};

/// Rest-pose vertices mapped through the entity's world matrix
pub fn world_vertices(scene: &SceneContext, id: EntityId) -> Result<Vec<Vec3>> {
    let entity = scene.entity(id);
    let mesh = entity.as_mesh().ok_or_else(|| Error::NonMesh(entity.name.clone()))?;
    let world = scene.world_matrix(id)?;
    Ok(mesh.positions.iter().map(|&p| world.transform_point3(p)).collect())
}

/// Vertices as currently posed: linear-blend skinned against the bound
/// armature when the mesh has a skin, rigidly transformed otherwise.
pub fn deformed_vertices(scene: &SceneContext, id: EntityId) -> Result<Vec<Vec3>> {
    let entity = scene.entity(id);
    let mesh = entity.as_mesh().ok_or_else(|| Error::NonMesh(entity.name.clone()))?;
    let world = scene.world_matrix(id)?;

    let Some(skin) = &mesh.skin else {
        return world_vertices(scene, id);
    };

    let skin_matrices = skin
        .joint_bones
        .iter()
        .zip(&skin.inverse_bind)
        .map(|(&bone, inverse_bind)| Ok(scene.bone_world_matrix(skin.armature, bone)? * *inverse_bind))
        .collect::<Result<Vec<Mat4>>>()?;

    let vertices = mesh
        .positions
        .iter()
        .enumerate()
        .map(|(i, &rest)| {
            let (Some(joints), Some(weights)) = (skin.joints.get(i), skin.weights.get(i)) else {
                return world.transform_point3(rest);
            };
            let mut total = 0.0;
            let mut blended = Vec3::ZERO;
            for (&joint, &weight) in joints.iter().zip(weights) {
                if weight <= 0.0 {
                    continue;
                }
                if let Some(matrix) = skin_matrices.get(joint as usize) {
                    blended += matrix.transform_point3(rest) * weight;
                    total += weight;
                }
            }
            if total > 0.0 {
                blended / total
            } else {
                world.transform_point3(rest)
            }
        })
        .collect();

    Ok(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Armature, Bone, EntityKind, Mesh, Parent, SceneEntity, SkinBinding};
    use std::f32::consts::FRAC_PI_2;

    fn skinned_scene() -> (SceneContext, EntityId, EntityId) {
        let mut scene = SceneContext::new();
        let shoulder = Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0));
        let armature = scene.add(SceneEntity::new(
            "Armature",
            EntityKind::Armature(Armature::new(vec![Bone::new("arm", None, shoulder)])),
        ));
        let mesh = Mesh::new(vec![Vec3::new(1.0, 0.0, 1.0)], vec![])
            .with_skin(SkinBinding::rigid(armature, 0, shoulder.inverse(), 1));
        let hand = scene.add(SceneEntity::mesh("Hand", mesh).with_parent(Parent::Entity(armature)));
        (scene, armature, hand)
    }

    #[test]
    fn rest_pose_matches_rigid_vertices() {
        let (mut scene, _, hand) = skinned_scene();
        scene.synchronize();
        let posed = deformed_vertices(&scene, hand).unwrap();
        assert!((posed[0] - Vec3::new(1.0, 0.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn pose_moves_skinned_vertex() {
        let (mut scene, armature, hand) = skinned_scene();
        scene.bone_pose_mut(armature, "arm").unwrap().rotation.z = FRAC_PI_2;
        scene.synchronize();
        let posed = deformed_vertices(&scene, hand).unwrap();
        assert!((posed[0] - Vec3::new(0.0, 1.0, 1.0)).length() < 1e-5);

        // Static geometry still reports the rest position
        let rigid = world_vertices(&scene, hand).unwrap();
        assert!((rigid[0] - Vec3::new(1.0, 0.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn armature_location_carries_skin() {
        let (mut scene, armature, hand) = skinned_scene();
        scene.transform_mut(armature).location = Vec3::new(0.0, -2.0, 0.0);
        scene.synchronize();
        let posed = deformed_vertices(&scene, hand).unwrap();
        assert!((posed[0] - Vec3::new(1.0, -2.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn stale_scene_is_rejected() {
        let (mut scene, armature, hand) = skinned_scene();
        scene.synchronize();
        scene.bone_pose_mut(armature, "arm").unwrap().rotation.x = 0.5;
        assert!(matches!(deformed_vertices(&scene, hand), Err(Error::Unsynchronized)));
    }

    #[test]
    fn non_mesh_is_rejected() {
        let (mut scene, armature, _) = skinned_scene();
        scene.synchronize();
        assert!(matches!(deformed_vertices(&scene, armature), Err(Error::NonMesh(_))));
    }
}
