use glam::{Mat4, Vec3};

use crate::config::RoleNames;
use crate::error::Result;
use crate::loaders::{SceneLoader, SceneTemplate};
use crate::scene::{
    Armature, Bone, EntityKind, Mesh, Parent, SceneContext, SceneEntity, SkinBinding, Transform,
};

pub const TABLE_HEIGHT: f32 = 0.8;
/// Workpiece plate edge length before scaling
pub const WORKPIECE_SIZE: f32 = 0.1;
pub const WORKER_START: Vec3 = Vec3::new(0.0, -1.0, 0.0);
pub const ROBOT_BASE: Vec3 = Vec3::new(0.7, 0.0, TABLE_HEIGHT);

/// Built-in reference workcell: a table with a workpiece plate, a robot arm
/// with gripper, and a rigged worker facing the table along +Y.
///
/// Entity names follow `names`, so role bindings hold for custom role tables.
pub fn create_workcell_template(names: &RoleNames) -> SceneTemplate {
    let mut template = SceneTemplate::new();

    template.push(SceneEntity::mesh(&names.environment, Mesh::plane(3.0, 3.0)));
    template.push(SceneEntity::mesh(
        &names.table,
        Mesh::cuboid(Vec3::new(-1.0, -0.6, 0.0), Vec3::new(1.0, 0.6, TABLE_HEIGHT)),
    ));
    template.push(
        SceneEntity::mesh(&names.workpiece, Mesh::plane(WORKPIECE_SIZE / 2.0, WORKPIECE_SIZE / 2.0))
            .with_transform(Transform::from_location(Vec3::new(0.0, 0.0, TABLE_HEIGHT))),
    );

    // Manipulator: base link and a tool point carrying gripper and glove
    let panda = template.push(
        SceneEntity::empty(&names.manipulator_group).with_transform(Transform::from_location(ROBOT_BASE)),
    );
    let base_link = names.obstacles.get(1).map_or("Link-0", String::as_str);
    template.push(
        SceneEntity::mesh(
            base_link,
            Mesh::cuboid(Vec3::new(-0.1, -0.1, 0.0), Vec3::new(0.1, 0.1, 0.15)),
        )
        .with_parent(Parent::Entity(panda)),
    );
    let tcp = template.push(
        SceneEntity::empty(&names.tool_point)
            .with_parent(Parent::Entity(panda))
            .with_transform(Transform::from_location(Vec3::new(0.0, 0.0, 0.5))),
    );
    template.push(
        SceneEntity::mesh(
            &names.gripper,
            Mesh::cuboid(Vec3::new(-0.04, -0.02, -0.1), Vec3::new(0.04, 0.02, 0.0)),
        )
        .with_parent(Parent::Entity(tcp)),
    );
    template.push(
        SceneEntity::mesh(
            &names.glove,
            Mesh::cuboid(Vec3::new(-0.05, -0.05, -0.14), Vec3::new(0.05, 0.05, -0.1)),
        )
        .with_parent(Parent::Entity(tcp)),
    );

    // Worker: armature with a Mixamo-named spine and arm chains
    let worker = template.push(SceneEntity::empty(&names.worker_group));
    let bones = &names.bones;
    let rig = vec![
        Bone::new("mixamorig:Hips", None, Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0))),
        Bone::new("mixamorig:Spine", Some(0), Mat4::from_translation(Vec3::new(0.0, 0.0, 0.25))),
        Bone::new(&bones.right_arm, Some(1), Mat4::from_translation(Vec3::new(0.2, 0.0, 0.2))),
        Bone::new(&bones.right_forearm, Some(2), Mat4::from_translation(Vec3::new(0.28, 0.0, 0.0))),
        Bone::new(&bones.right_hand, Some(3), Mat4::from_translation(Vec3::new(0.25, 0.0, 0.0))),
        Bone::new(&bones.left_arm, Some(1), Mat4::from_translation(Vec3::new(-0.2, 0.0, 0.2))),
        Bone::new(&bones.left_forearm, Some(5), Mat4::from_translation(Vec3::new(-0.28, 0.0, 0.0))),
        Bone::new(&bones.left_hand, Some(6), Mat4::from_translation(Vec3::new(-0.25, 0.0, 0.0))),
    ];
    let armature_rest = Armature::new(rig.clone()).pose_matrices();
    let spine_rest = armature_rest[1];
    let hand_rest = armature_rest[4];

    let armature = template.push(
        SceneEntity::new("Armature", EntityKind::Armature(Armature::new(rig)))
            .with_parent(Parent::Entity(worker))
            .with_transform(Transform::from_location(WORKER_START)),
    );

    // Vest and hand are modelled in armature space and skinned rigidly
    let vest_name = names.obstacles.first().map_or("Ch17_Vest", String::as_str);
    let vest = Mesh::cuboid(Vec3::new(-0.2, -0.12, 1.0), Vec3::new(0.2, 0.12, 1.5));
    let vest_count = vest.vertex_count();
    template.push(
        SceneEntity::mesh(
            vest_name,
            vest.with_skin(SkinBinding::rigid(armature, 1, spine_rest.inverse(), vest_count)),
        )
        .with_parent(Parent::Entity(armature)),
    );

    let hand_center = hand_rest.transform_point3(Vec3::ZERO);
    let hand = Mesh::cuboid(
        hand_center + Vec3::new(-0.03, -0.04, -0.04),
        hand_center + Vec3::new(0.09, 0.04, 0.04),
    );
    let hand_count = hand.vertex_count();
    template.push(
        SceneEntity::mesh(
            &names.hand,
            hand.with_skin(SkinBinding::rigid(armature, 4, hand_rest.inverse(), hand_count)),
        )
        .with_parent(Parent::Entity(armature)),
    );

    template
}

/// Scene loader for the built-in workcell
#[derive(Debug, Clone)]
pub struct ProceduralSceneLoader {
    template: SceneTemplate,
}

impl ProceduralSceneLoader {
    pub fn new(names: &RoleNames) -> Self {
        Self {
            template: create_workcell_template(names),
        }
    }
}

impl Default for ProceduralSceneLoader {
    fn default() -> Self {
        Self::new(&RoleNames::default())
    }
}

impl SceneLoader for ProceduralSceneLoader {
    fn populate(&mut self, scene: &mut SceneContext) -> Result<()> {
        self.template.instantiate(scene);
        Ok(())
    }
}

/// A fresh, unsynchronized copy of the built-in workcell
pub fn create_workcell_scene() -> SceneContext {
    let mut scene = SceneContext::new();
    create_workcell_template(&RoleNames::default()).instantiate(&mut scene);
    scene
}
