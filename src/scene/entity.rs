use serde::Serialize;

use super::{Armature, Mesh, Transform};

/// Index of an entity inside its [`super::SceneContext`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub usize);

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Parent {
    Entity(EntityId),
    /// Attached to a bone of an armature entity
    Bone(EntityId, usize),
}

impl Parent {
    pub fn entity(&self) -> EntityId {
        match *self {
            Parent::Entity(id) | Parent::Bone(id, _) => id,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct CameraData {
    pub focal_length: f32,
    pub resolution: [u32; 2],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LightKind {
    Point,
    Sun,
    Spot,
    Area,
}

impl LightKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "POINT" => Some(LightKind::Point),
            "SUN" => Some(LightKind::Sun),
            "SPOT" => Some(LightKind::Spot),
            "AREA" => Some(LightKind::Area),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct LightData {
    pub kind: LightKind,
    pub energy: f32,
}

#[derive(Clone, Debug)]
pub enum EntityKind {
    Mesh(Mesh),
    Armature(Armature),
    Camera(CameraData),
    Light(LightData),
    Empty,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Mesh(_) => "MESH",
            EntityKind::Armature(_) => "ARMATURE",
            EntityKind::Camera(_) => "CAMERA",
            EntityKind::Light(_) => "LIGHT",
            EntityKind::Empty => "EMPTY",
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneEntity {
    pub name: String,
    pub parent: Option<Parent>,
    pub transform: Transform,
    pub kind: EntityKind,
}

impl SceneEntity {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            parent: None,
            transform: Transform::IDENTITY,
            kind,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, EntityKind::Empty)
    }

    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self::new(name, EntityKind::Mesh(mesh))
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_parent(mut self, parent: Parent) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            EntityKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_armature(&self) -> Option<&Armature> {
        match &self.kind {
            EntityKind::Armature(armature) => Some(armature),
            _ => None,
        }
    }

    pub fn is_camera_or_light(&self) -> bool {
        matches!(self.kind, EntityKind::Camera(_) | EntityKind::Light(_))
    }
}
