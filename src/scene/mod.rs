//! Explicit scene state shared by every pipeline stage.
//!
//! All transform writes go through [`SceneContext`] and mark it stale; any
//! geometry read on a stale scene fails with [`Error::Unsynchronized`] until
//! [`SceneContext::synchronize`] has recomputed world and bone matrices.

mod armature;
mod entity;
mod mesh;
mod roles;
mod transform;

pub use armature::{Armature, Bone};
pub use entity::{CameraData, EntityId, EntityKind, LightData, LightKind, Parent, SceneEntity};
pub use mesh::{Mesh, SkinBinding, MAX_INFLUENCES};
pub use roles::SceneRoles;
pub use transform::Transform;

use glam::Mat4;
use log::{debug, warn};
use std::collections::HashMap;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct SceneContext {
    entities: Vec<SceneEntity>,
    names: HashMap<String, EntityId>,
    world: Vec<Mat4>,
    bones: Vec<Vec<Mat4>>,
    synchronized: bool,
}

impl SceneContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity, renaming it `name.001`, `name.002`, ... on a clash
    pub fn add(&mut self, mut entity: SceneEntity) -> EntityId {
        if self.names.contains_key(&entity.name) {
            let base = entity.name.clone();
            let unique = (1..)
                .map(|n| format!("{base}.{n:03}"))
                .find(|candidate| !self.names.contains_key(candidate))
                .unwrap_or(base);
            warn!("Entity name `{}` already in scene, renamed to `{}`", entity.name, unique);
            entity.name = unique;
        }
        let id = EntityId(self.entities.len());
        self.names.insert(entity.name.clone(), id);
        self.entities.push(entity);
        self.synchronized = false;
        id
    }

    /// Replaces the entity with the same name in place, or adds it
    pub fn upsert(&mut self, entity: SceneEntity) -> EntityId {
        match self.find(&entity.name) {
            Some(id) => {
                self.entities[id.0] = entity;
                self.synchronized = false;
                id
            }
            None => self.add(entity),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &SceneEntity)> {
        self.entities.iter().enumerate().map(|(i, e)| (EntityId(i), e))
    }

    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<EntityId> {
        self.find(name).ok_or_else(|| Error::MissingEntity(name.to_string()))
    }

    pub fn entity(&self, id: EntityId) -> &SceneEntity {
        &self.entities[id.0]
    }

    pub fn name(&self, id: EntityId) -> &str {
        &self.entities[id.0].name
    }

    /// Direct children, in insertion order
    pub fn children(&self, id: EntityId) -> Vec<EntityId> {
        self.iter()
            .filter(|(_, e)| e.parent.map(|p| p.entity()) == Some(id))
            .map(|(child, _)| child)
            .collect()
    }

    pub fn transform_mut(&mut self, id: EntityId) -> &mut Transform {
        self.synchronized = false;
        &mut self.entities[id.0].transform
    }

    /// Pose transform of a named bone of an armature entity
    pub fn bone_pose_mut(&mut self, id: EntityId, bone: &str) -> Result<&mut Transform> {
        let entity = &mut self.entities[id.0];
        let EntityKind::Armature(armature) = &mut entity.kind else {
            return Err(Error::MissingEntity(format!("{}/{}", entity.name, bone)));
        };
        let index = armature
            .bone_index(bone)
            .ok_or_else(|| Error::MissingEntity(format!("{}/{}", entity.name, bone)))?;
        self.synchronized = false;
        Ok(&mut armature.bones[index].pose)
    }

    /// Edit-time access to mesh data
    pub fn mesh_mut(&mut self, id: EntityId) -> Result<&mut Mesh> {
        let entity = &mut self.entities[id.0];
        match &mut entity.kind {
            EntityKind::Mesh(mesh) => {
                self.synchronized = false;
                Ok(mesh)
            }
            _ => Err(Error::NonMesh(entity.name.clone())),
        }
    }

    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    /// Re-evaluates bone poses and world matrices after transform writes
    pub fn synchronize(&mut self) {
        self.bones = self
            .entities
            .iter()
            .map(|e| e.as_armature().map(Armature::pose_matrices).unwrap_or_default())
            .collect();

        let mut resolved: Vec<Option<Mat4>> = vec![None; self.entities.len()];
        for index in 0..self.entities.len() {
            self.resolve_world(index, &mut resolved, 0);
        }
        self.world = resolved.into_iter().map(|m| m.unwrap_or(Mat4::IDENTITY)).collect();
        self.synchronized = true;
        debug!("Scene synchronized ({} entities)", self.entities.len());
    }

    fn resolve_world(&self, index: usize, resolved: &mut [Option<Mat4>], depth: usize) -> Mat4 {
        if let Some(matrix) = resolved[index] {
            return matrix;
        }
        let entity = &self.entities[index];
        let local = entity.transform.matrix();
        let parent_matrix = match entity.parent {
            Some(_) if depth >= self.entities.len() => None,
            Some(Parent::Entity(parent)) if parent.0 < self.entities.len() => {
                Some(self.resolve_world(parent.0, resolved, depth + 1))
            }
            Some(Parent::Bone(parent, bone)) if parent.0 < self.entities.len() => {
                let armature = self.resolve_world(parent.0, resolved, depth + 1);
                let bone_matrix = self.bones[parent.0].get(bone).copied().unwrap_or(Mat4::IDENTITY);
                Some(armature * bone_matrix)
            }
            _ => None,
        };
        let world = parent_matrix.map_or(local, |parent| parent * local);
        resolved[index] = Some(world);
        world
    }

    pub fn world_matrix(&self, id: EntityId) -> Result<Mat4> {
        if !self.synchronized {
            return Err(Error::Unsynchronized);
        }
        Ok(self.world[id.0])
    }

    /// World matrix of a posed bone of an armature entity
    pub fn bone_world_matrix(&self, id: EntityId, bone: usize) -> Result<Mat4> {
        let armature = self.world_matrix(id)?;
        let bone_matrix = self.bones[id.0]
            .get(bone)
            .copied()
            .ok_or_else(|| Error::MissingEntity(format!("{}/#{}", self.name(id), bone)))?;
        Ok(armature * bone_matrix)
    }

    /// Keeps only entities matching `keep`, remapping ids. Children of removed
    /// entities become roots; skins bound to a removed armature are dropped.
    /// Returns the number of removed entities.
    pub fn retain(&mut self, mut keep: impl FnMut(&SceneEntity) -> bool) -> usize {
        let mut remap: Vec<Option<EntityId>> = Vec::with_capacity(self.entities.len());
        let mut kept = Vec::with_capacity(self.entities.len());
        for entity in self.entities.drain(..) {
            if keep(&entity) {
                remap.push(Some(EntityId(kept.len())));
                kept.push(entity);
            } else {
                remap.push(None);
            }
        }
        let removed = remap.len() - kept.len();

        for entity in &mut kept {
            entity.parent = entity.parent.and_then(|parent| match parent {
                Parent::Entity(id) => remap[id.0].map(Parent::Entity),
                Parent::Bone(id, bone) => remap[id.0].map(|new| Parent::Bone(new, bone)),
            });
            if let EntityKind::Mesh(mesh) = &mut entity.kind {
                if let Some(skin) = mesh.skin.as_mut() {
                    match remap[skin.armature.0] {
                        Some(new) => skin.armature = new,
                        None => mesh.skin = None,
                    }
                }
            }
        }

        self.names = kept
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), EntityId(i)))
            .collect();
        self.entities = kept;
        self.world.clear();
        self.bones.clear();
        self.synchronized = false;
        removed
    }
}
