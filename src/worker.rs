//! Human figure posing.

use glam::Vec3;

use crate::config::{ArmBoneNames, HumanConfig};
use crate::error::Result;
use crate::sampler::TransformSampler;
use crate::scene::{EntityId, SceneContext};

/// Fixed joint angles in degrees (XYZ); the arm's Z is replaced by the
/// sampled shoulder swing
#[derive(Copy, Clone, Debug)]
struct ArmChain {
    arm: [f32; 3],
    forearm: [f32; 3],
    hand: [f32; 3],
}

const RIGHT_CHAIN: ArmChain = ArmChain {
    arm: [70.0, 11.0, 0.0],
    forearm: [0.0, 19.0, -36.0],
    hand: [6.0, -67.0, 0.0],
};

const LEFT_CHAIN: ArmChain = ArmChain {
    arm: [70.0, -11.0, 0.0],
    forearm: [0.0, -19.0, 36.0],
    hand: [6.0, 67.0, 0.0],
};

/// Sampled shoulder swings, degrees
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WorkerPose {
    pub right_swing: f32,
    pub left_swing: f32,
    pub location: Vec3,
}

fn set_bone_rotation(scene: &mut SceneContext, armature: EntityId, bone: &str, degrees: [f32; 3]) -> Result<()> {
    let pose = scene.bone_pose_mut(armature, bone)?;
    pose.rotation = Vec3::from_array(degrees.map(f32::to_radians));
    Ok(())
}

fn pose_chain(
    scene: &mut SceneContext,
    armature: EntityId,
    bones: [&str; 3],
    chain: ArmChain,
    swing: f32,
) -> Result<()> {
    let [arm, forearm, hand] = bones;
    let [x, y, _] = chain.arm;
    set_bone_rotation(scene, armature, arm, [x, y, swing])?;
    set_bone_rotation(scene, armature, forearm, chain.forearm)?;
    set_bone_rotation(scene, armature, hand, chain.hand)
}

/// Swings both arms within their configured ranges, fixes the remaining arm
/// joints, then moves the whole figure within its position range
pub fn randomize_worker(
    scene: &mut SceneContext,
    armature: EntityId,
    sampler: &mut TransformSampler,
    config: &HumanConfig,
    bones: &ArmBoneNames,
) -> Result<WorkerPose> {
    let right_swing = sampler.sample(&config.arm_range_right);
    pose_chain(
        scene,
        armature,
        [bones.right_arm.as_str(), bones.right_forearm.as_str(), bones.right_hand.as_str()],
        RIGHT_CHAIN,
        right_swing,
    )?;

    let left_swing = sampler.sample(&config.arm_range_left);
    pose_chain(
        scene,
        armature,
        [bones.left_arm.as_str(), bones.left_forearm.as_str(), bones.left_hand.as_str()],
        LEFT_CHAIN,
        left_swing,
    )?;

    let transform = scene.transform_mut(armature);
    sampler.sample_planar_position(transform, &config.position_range);

    Ok(WorkerPose {
        right_swing,
        left_swing,
        location: transform.location,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PlanarRange, RangeSpec};
    use crate::error::Error;
    use crate::scene::{Armature, Bone, EntityKind, SceneEntity};
    use glam::Mat4;

    fn rig(names: &ArmBoneNames, skip: Option<&str>) -> (SceneContext, EntityId) {
        let bones = [
            &names.right_arm,
            &names.right_forearm,
            &names.right_hand,
            &names.left_arm,
            &names.left_forearm,
            &names.left_hand,
        ]
        .into_iter()
        .filter(|name| Some(name.as_str()) != skip)
        .map(|name| Bone::new(name.clone(), None, Mat4::IDENTITY))
        .collect();
        let mut scene = SceneContext::new();
        let armature = scene.add(SceneEntity::new("Armature", EntityKind::Armature(Armature::new(bones))));
        (scene, armature)
    }

    fn human() -> HumanConfig {
        HumanConfig {
            arm_range_left: RangeSpec::new(-30.0, -10.0),
            arm_range_right: RangeSpec::new(10.0, 30.0),
            position_range: PlanarRange {
                x: RangeSpec::new(-0.5, 0.5),
                y: RangeSpec::fixed(-1.0),
            },
        }
    }

    #[test]
    fn arms_are_posed_within_range() {
        let names = ArmBoneNames::default();
        let (mut scene, armature) = rig(&names, None);
        let mut sampler = TransformSampler::seeded(8);
        let pose = randomize_worker(&mut scene, armature, &mut sampler, &human(), &names).unwrap();
        assert!((10.0..=30.0).contains(&pose.right_swing));
        assert!((-30.0..=-10.0).contains(&pose.left_swing));
        assert_eq!(pose.location.y, -1.0);

        let armature_data = scene.entity(armature).as_armature().unwrap();
        let right = &armature_data.bones[armature_data.bone_index(&names.right_arm).unwrap()];
        assert!((right.pose.rotation.x - 70f32.to_radians()).abs() < 1e-6);
        assert!((right.pose.rotation.z - pose.right_swing.to_radians()).abs() < 1e-6);
        let left_hand = &armature_data.bones[armature_data.bone_index(&names.left_hand).unwrap()];
        assert!((left_hand.pose.rotation.y - 67f32.to_radians()).abs() < 1e-6);
        assert!(!scene.is_synchronized());
    }

    #[test]
    fn missing_bone_fails() {
        let names = ArmBoneNames::default();
        let (mut scene, armature) = rig(&names, Some("mixamorig:LeftForeArm"));
        let mut sampler = TransformSampler::seeded(8);
        let err = randomize_worker(&mut scene, armature, &mut sampler, &human(), &names).unwrap_err();
        assert!(matches!(err, Error::MissingEntity(name) if name.ends_with("mixamorig:LeftForeArm")));
    }
}
