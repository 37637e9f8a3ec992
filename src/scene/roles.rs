use super::{EntityId, EntityKind, SceneContext};
use crate::config::RoleNames;
use crate::error::{Error, Result};

/// Typed role-to-entity mapping, validated once when a scene is bound
#[derive(Clone, Debug)]
pub struct SceneRoles {
    pub table: EntityId,
    pub workpiece: EntityId,
    /// Armature driving the human figure
    pub worker: EntityId,
    pub worker_parts: Vec<EntityId>,
    pub manipulator_parts: Vec<EntityId>,
    pub tool_point: EntityId,
    pub environment: EntityId,
    pub gripper: EntityId,
    /// Fixed obstacles for workpiece placement
    pub obstacles: Vec<EntityId>,
    pub hand: EntityId,
    pub glove: EntityId,
}

impl SceneRoles {
    /// Fails with [`Error::MissingEntity`] on the first absent role
    pub fn bind(scene: &SceneContext, names: &RoleNames) -> Result<Self> {
        let table = scene.require(&names.table)?;
        let workpiece = scene.require(&names.workpiece)?;

        let worker_group = scene.require(&names.worker_group)?;
        let worker_parts = scene.children(worker_group);
        let worker = std::iter::once(worker_group)
            .chain(worker_parts.iter().copied())
            .find(|&id| matches!(scene.entity(id).kind, EntityKind::Armature(_)))
            .ok_or_else(|| Error::MissingEntity(format!("{} armature", names.worker_group)))?;

        let manipulator_group = scene.require(&names.manipulator_group)?;
        let manipulator_parts = scene.children(manipulator_group);

        let obstacles = names
            .obstacles
            .iter()
            .map(|name| scene.require(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            table,
            workpiece,
            worker,
            worker_parts,
            manipulator_parts,
            tool_point: scene.require(&names.tool_point)?,
            environment: scene.require(&names.environment)?,
            gripper: scene.require(&names.gripper)?,
            obstacles,
            hand: scene.require(&names.hand)?,
            glove: scene.require(&names.glove)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Armature, Parent, SceneEntity};

    fn minimal_scene(skip: &str) -> SceneContext {
        let mut scene = SceneContext::new();
        let worker = scene.add(SceneEntity::empty("Worker"));
        scene.add(
            SceneEntity::new("Armature", EntityKind::Armature(Armature::default()))
                .with_parent(Parent::Entity(worker)),
        );
        for name in [
            "Table", "workpiece", "Panda", "TCP", "Environment", "Gripper", "Ch17_Vest",
            "Link-0", "Hand", "Gloves",
        ] {
            if name != skip {
                scene.add(SceneEntity::empty(name));
            }
        }
        scene
    }

    #[test]
    fn binds_all_roles() {
        let scene = minimal_scene("");
        let roles = SceneRoles::bind(&scene, &RoleNames::default()).unwrap();
        assert_eq!(scene.name(roles.worker), "Armature");
        assert_eq!(roles.obstacles.len(), 2);
        assert_eq!(scene.name(roles.glove), "Gloves");
    }

    #[test]
    fn missing_role_is_named() {
        for role in ["Table", "Hand", "Link-0", "TCP"] {
            let scene = minimal_scene(role);
            match SceneRoles::bind(&scene, &RoleNames::default()) {
                Err(Error::MissingEntity(name)) => assert_eq!(name, role),
                other => panic!("expected missing {role}, got {other:?}"),
            }
        }
    }

    #[test]
    fn worker_without_armature_is_missing() {
        let mut scene = SceneContext::new();
        scene.add(SceneEntity::empty("Table"));
        scene.add(SceneEntity::empty("workpiece"));
        scene.add(SceneEntity::empty("Worker"));
        let err = SceneRoles::bind(&scene, &RoleNames::default()).unwrap_err();
        assert!(matches!(err, Error::MissingEntity(name) if name.contains("armature")));
    }
}
