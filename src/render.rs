//! Hand-off of finalized scenes to the external renderer and labeler.

use glam::Vec3;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::camera::{CameraPose, LightSetup};
use crate::error::Result;
use crate::geometry::{deformed_vertices, world_bounds};
use crate::math::{quat_to_euler, AABB};
use crate::safety::SafetyResult;
use crate::scene::SceneContext;

/// Category assigned to objects without an entry in the label map
pub const BACKGROUND_CATEGORY: u32 = 0;
pub const BACKGROUND_LABEL: &str = "background";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderSettings {
    pub max_samples: u32,
    pub color_format: String,
    pub jpg_quality: u8,
}

impl RenderSettings {
    pub fn new(max_samples: u32) -> Self {
        Self {
            max_samples,
            ..Self::default()
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_samples: 128,
            color_format: "JPEG".to_string(),
            jpg_quality: 100,
        }
    }
}

/// A finalized, synchronized scene ready to render
pub struct Frame<'a> {
    pub image_index: u64,
    pub image_name: String,
    pub scene: &'a SceneContext,
    pub camera: &'a CameraPose,
    pub light: &'a LightSetup,
    pub categories: &'a BTreeMap<String, u32>,
    pub render: &'a RenderSettings,
    pub safety: &'a SafetyResult,
}

impl Frame<'_> {
    pub fn category_of(&self, name: &str) -> u32 {
        self.categories.get(name).copied().unwrap_or(BACKGROUND_CATEGORY)
    }
}

/// Consumer of finalized frames
pub trait FrameSink {
    fn emit(&mut self, frame: &Frame<'_>) -> Result<()>;
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn emit(&mut self, frame: &Frame<'_>) -> Result<()> {
        (**self).emit(frame)
    }
}

/// Discards every frame
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn emit(&mut self, _frame: &Frame<'_>) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ObjectAnnotation {
    pub name: String,
    pub kind: &'static str,
    pub category_id: u32,
    pub class_label: String,
    pub location: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub world_bounds: Option<AABB>,
}

#[derive(Debug, Serialize)]
pub struct FrameAnnotation<'a> {
    pub image: &'a str,
    pub camera: &'a CameraPose,
    pub light: &'a LightSetup,
    pub render: &'a RenderSettings,
    pub safety: &'a SafetyResult,
    pub objects: Vec<ObjectAnnotation>,
}

/// World-space pose and label of every entity in the frame
pub fn annotate<'a>(frame: &'a Frame<'a>) -> Result<FrameAnnotation<'a>> {
    let scene = frame.scene;
    let mut objects = Vec::with_capacity(scene.len());
    for (id, entity) in scene.iter() {
        let (scale, rotation, location) = scene.world_matrix(id)?.to_scale_rotation_translation();
        let category_id = frame.category_of(&entity.name);
        // Skinned meshes are boxed as posed, not at rest
        let bounds = match entity.as_mesh() {
            Some(mesh) if mesh.skin.is_some() => AABB::from_points(&deformed_vertices(scene, id)?),
            Some(_) => world_bounds(scene, id)?,
            None => None,
        };
        objects.push(ObjectAnnotation {
            name: entity.name.clone(),
            kind: entity.kind.label(),
            category_id,
            class_label: if category_id == BACKGROUND_CATEGORY {
                BACKGROUND_LABEL.to_string()
            } else {
                entity.name.clone()
            },
            location,
            rotation: quat_to_euler(rotation),
            scale,
            world_bounds: bounds,
        });
    }
    Ok(FrameAnnotation {
        image: &frame.image_name,
        camera: frame.camera,
        light: frame.light,
        render: frame.render,
        safety: frame.safety,
        objects,
    })
}

/// Writes one JSON annotation per frame under `<output_dir>/annotations/`
#[derive(Debug)]
pub struct AnnotationWriter {
    dir: PathBuf,
}

impl AnnotationWriter {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: output_dir.as_ref().join("annotations"),
        }
    }

    /// Annotation path sharing the image's file stem
    pub fn path_for(&self, image_name: &str) -> PathBuf {
        self.dir.join(Path::new(image_name).with_extension("json"))
    }
}

impl FrameSink for AnnotationWriter {
    fn emit(&mut self, frame: &Frame<'_>) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let annotation = annotate(frame)?;
        let path = self.path_for(&frame.image_name);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, &annotation)?;
        debug!("Wrote annotation {:?} ({} objects)", path, annotation.objects.len());
        Ok(())
    }
}
