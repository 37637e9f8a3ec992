pub mod gltf;

pub use self::gltf::GltfSceneLoader;

use log::{debug, info};

use crate::config::SceneParameters;
use crate::error::Result;
use crate::scene::{EntityId, EntityKind, Parent, SceneContext, SceneEntity};
use crate::scenes::ProceduralSceneLoader;

/// Resets a scene to its baseline by appending fresh copies of the asset's
/// entities. Entities already in the scene (camera, light) are left alone.
pub trait SceneLoader {
    fn populate(&mut self, scene: &mut SceneContext) -> Result<()>;
}

impl<T: SceneLoader + ?Sized> SceneLoader for Box<T> {
    fn populate(&mut self, scene: &mut SceneContext) -> Result<()> {
        (**self).populate(scene)
    }
}

/// Loader for the configured `SceneSelection`: the built-in workcell or a glTF file
pub fn open_scene_loader(params: &SceneParameters) -> Result<Box<dyn SceneLoader>> {
    if params.is_builtin_scene() {
        info!("Using built-in workcell scene");
        return Ok(Box::new(ProceduralSceneLoader::new(&params.roles)));
    }
    Ok(Box::new(GltfSceneLoader::open(&params.scene_selection)?))
}

/// Parsed baseline entities. Ids inside the template (parents, skin
/// armatures) are template-local and get offset on instantiation.
#[derive(Clone, Debug, Default)]
pub struct SceneTemplate {
    entities: Vec<SceneEntity>,
}

impl SceneTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Template-local id of the pushed entity
    pub fn push(&mut self, entity: SceneEntity) -> EntityId {
        self.entities.push(entity);
        EntityId(self.entities.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[SceneEntity] {
        &self.entities
    }

    /// Appends a copy of every entity to `scene`; returns the first new id
    pub fn instantiate(&self, scene: &mut SceneContext) -> EntityId {
        let base = scene.len();
        for entity in &self.entities {
            let mut copy = entity.clone();
            copy.parent = copy.parent.map(|parent| match parent {
                Parent::Entity(id) => Parent::Entity(EntityId(id.0 + base)),
                Parent::Bone(id, bone) => Parent::Bone(EntityId(id.0 + base), bone),
            });
            if let EntityKind::Mesh(mesh) = &mut copy.kind {
                if let Some(skin) = mesh.skin.as_mut() {
                    skin.armature = EntityId(skin.armature.0 + base);
                }
            }
            scene.add(copy);
        }
        debug!("Instantiated {} template entities", self.entities.len());
        EntityId(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Armature, Mesh, SkinBinding};
    use glam::{Mat4, Vec3};

    #[test]
    fn instantiate_offsets_references() {
        let mut template = SceneTemplate::new();
        let armature = template.push(SceneEntity::new("Armature", EntityKind::Armature(Armature::default())));
        let mesh = Mesh::new(vec![Vec3::ZERO], vec![]).with_skin(SkinBinding::rigid(armature, 0, Mat4::IDENTITY, 1));
        template.push(SceneEntity::mesh("Hand", mesh).with_parent(Parent::Entity(armature)));

        let mut scene = SceneContext::new();
        scene.add(SceneEntity::empty("Camera"));
        let first = template.instantiate(&mut scene);
        assert_eq!(first, EntityId(1));

        let hand = scene.find("Hand").unwrap();
        let entity = scene.entity(hand);
        assert_eq!(entity.parent, Some(Parent::Entity(EntityId(1))));
        assert_eq!(entity.as_mesh().unwrap().skin.as_ref().unwrap().armature, EntityId(1));
    }
}
