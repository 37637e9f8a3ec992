use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;
use std::path::{Path, PathBuf};

use super::{SceneLoader, SceneTemplate};
use crate::error::Error;
use crate::scene::{
    Armature, Bone, EntityId, EntityKind, Mesh, Parent, SceneContext, SceneEntity, SkinBinding,
    Transform, MAX_INFLUENCES,
};

/// Scene loader backed by a glTF asset. The file is parsed once; every
/// `populate` call clones the parsed baseline into the scene.
#[derive(Debug)]
pub struct GltfSceneLoader {
    path: PathBuf,
    template: SceneTemplate,
}

impl GltfSceneLoader {
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let template = load_gltf_template(path).map_err(|err| Error::Asset(format!("{err:#}")))?;
        info!("Loaded {} entities from {:?}", template.len(), path);
        Ok(Self {
            path: path.to_path_buf(),
            template,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn template(&self) -> &SceneTemplate {
        &self.template
    }
}

impl SceneLoader for GltfSceneLoader {
    fn populate(&mut self, scene: &mut SceneContext) -> crate::error::Result<()> {
        self.template.instantiate(scene);
        Ok(())
    }
}

/// glTF is Y-up; scenes here are Z-up
fn y_up_to_z_up() -> Mat4 {
    Mat4::from_rotation_x(FRAC_PI_2)
}

fn convert_matrix(matrix: Mat4) -> Mat4 {
    let basis = y_up_to_z_up();
    basis * matrix * basis.inverse()
}

#[derive(Copy, Clone, Debug)]
struct NodeInfo {
    parent: Option<usize>,
    local: Mat4,
    world: Mat4,
}

/// Parses nodes, meshes and skins of the default scene into a template
pub fn load_gltf_template(path: impl AsRef<Path>) -> Result<SceneTemplate> {
    let path = path.as_ref();
    let (document, buffers, _images) =
        gltf::import(path).with_context(|| format!("Failed to load glTF file: {:?}", path))?;

    let gltf_scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .context("glTF file has no scene")?;

    debug!(
        "glTF {:?}: {} nodes, {} meshes, {} skins",
        path,
        document.nodes().count(),
        document.meshes().count(),
        document.skins().count()
    );

    // Hierarchy of the nodes reachable from the scene, in depth-first order
    let mut infos: Vec<Option<NodeInfo>> = vec![None; document.nodes().count()];
    let mut order = Vec::new();
    for node in gltf_scene.nodes() {
        collect_node(&node, None, Mat4::IDENTITY, &mut infos, &mut order);
    }

    // Joint node -> (skin, bone index). A node shared by several skins stays
    // with the first one.
    let skins: Vec<gltf::Skin> = document.skins().collect();
    let mut joint_owner: HashMap<usize, (usize, usize)> = HashMap::new();
    for (skin_index, skin) in skins.iter().enumerate() {
        for (bone, joint) in skin.joints().enumerate() {
            joint_owner.entry(joint.index()).or_insert((skin_index, bone));
        }
    }

    // Ids: non-joint nodes first, in traversal order, then one armature per skin
    let mut node_entity: HashMap<usize, EntityId> = HashMap::new();
    for &node in &order {
        if !joint_owner.contains_key(&node) {
            node_entity.insert(node, EntityId(node_entity.len()));
        }
    }
    let armature_base = node_entity.len();
    let armature_entity = |skin: usize| EntityId(armature_base + skin);

    let parent_of = |node: Option<usize>| -> Option<Parent> {
        let node = node?;
        match joint_owner.get(&node) {
            Some(&(skin, bone)) => Some(Parent::Bone(armature_entity(skin), bone)),
            None => node_entity.get(&node).copied().map(Parent::Entity),
        }
    };

    let mut template = SceneTemplate::new();
    let nodes: Vec<gltf::Node> = document.nodes().collect();
    for &index in &order {
        if joint_owner.contains_key(&index) {
            continue;
        }
        let Some(info) = infos[index] else { continue };
        let node = &nodes[index];
        let name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node_{index}"));

        let kind = match node.mesh() {
            Some(mesh) => {
                let skin = node.skin().map(|skin| (armature_entity(skin.index()), skin));
                EntityKind::Mesh(read_mesh(&mesh, skin, &buffers)?)
            }
            None => EntityKind::Empty,
        };

        let mut entity = SceneEntity::new(name, kind)
            .with_transform(Transform::from_matrix(&convert_matrix(info.local)));
        entity.parent = parent_of(info.parent);
        template.push(entity);
    }

    for (skin_index, skin) in skins.iter().enumerate() {
        let (armature, parent) = build_armature(skin, skin_index, &infos, &joint_owner);
        let name = skin.name().map_or_else(|| "Armature".to_string(), str::to_string);
        let mut entity = SceneEntity::new(name, EntityKind::Armature(armature));
        entity.parent = parent_of(parent);
        let id = template.push(entity);
        debug_assert_eq!(id, armature_entity(skin_index));
    }

    if template.is_empty() {
        warn!("No entities found in glTF file {:?}", path);
    }
    Ok(template)
}

fn collect_node(
    node: &gltf::Node,
    parent: Option<usize>,
    parent_world: Mat4,
    infos: &mut [Option<NodeInfo>],
    order: &mut Vec<usize>,
) {
    let index = node.index();
    if infos[index].is_some() {
        return;
    }
    let local = Mat4::from_cols_array_2d(&node.transform().matrix());
    let world = parent_world * local;
    infos[index] = Some(NodeInfo { parent, local, world });
    order.push(index);
    for child in node.children() {
        collect_node(&child, Some(index), world, infos, order);
    }
}

/// Bones in skin joint order. Root bones are expressed relative to the node
/// the armature hangs from; returns that node as the armature's parent.
fn build_armature(
    skin: &gltf::Skin,
    skin_index: usize,
    infos: &[Option<NodeInfo>],
    joint_owner: &HashMap<usize, (usize, usize)>,
) -> (Armature, Option<usize>) {
    let joints: Vec<usize> = skin.joints().map(|joint| joint.index()).collect();
    let same_skin_bone = |node: usize| match joint_owner.get(&node) {
        Some(&(owner, bone)) if owner == skin_index => Some(bone),
        _ => None,
    };

    let anchor = joints
        .iter()
        .filter_map(|&joint| infos[joint])
        .find(|info| info.parent.and_then(same_skin_bone).is_none())
        .and_then(|info| info.parent);
    let anchor_inverse = anchor
        .and_then(|node| infos[node])
        .map_or(Mat4::IDENTITY, |info| info.world.inverse());

    let bones = joints
        .iter()
        .enumerate()
        .map(|(bone, &joint)| {
            let info = infos[joint].unwrap_or(NodeInfo {
                parent: None,
                local: Mat4::IDENTITY,
                world: Mat4::IDENTITY,
            });
            let name = skin
                .joints()
                .nth(bone)
                .and_then(|node| node.name().map(str::to_string))
                .unwrap_or_else(|| format!("joint_{joint}"));
            match info.parent.and_then(same_skin_bone) {
                Some(parent) => Bone::new(name, Some(parent), convert_matrix(info.local)),
                None => Bone::new(name, None, convert_matrix(anchor_inverse * info.world)),
            }
        })
        .collect();

    (Armature::new(bones), anchor)
}

/// Merges every primitive of a glTF mesh into one converted mesh
fn read_mesh(
    mesh: &gltf::Mesh,
    skin: Option<(EntityId, gltf::Skin)>,
    buffers: &[gltf::buffer::Data],
) -> Result<Mesh> {
    let basis = y_up_to_z_up();
    let mut positions = Vec::new();
    let mut triangles = Vec::new();
    let mut joints = Vec::new();
    let mut weights = Vec::new();

    for primitive in mesh.primitives() {
        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let base = positions.len() as u32;
        let primitive_positions: Vec<Vec3> = reader
            .read_positions()
            .with_context(|| format!("Mesh {:?} primitive has no positions", mesh.name()))?
            .map(|p| basis.transform_point3(Vec3::from_array(p)))
            .collect();
        let count = primitive_positions.len();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..count as u32).collect(),
        };
        triangles.extend(
            indices
                .chunks_exact(3)
                .map(|tri| [tri[0] + base, tri[1] + base, tri[2] + base]),
        );

        let mut primitive_joints: Vec<[u16; MAX_INFLUENCES]> = reader
            .read_joints(0)
            .map(|joints| joints.into_u16().collect())
            .unwrap_or_default();
        let mut primitive_weights: Vec<[f32; MAX_INFLUENCES]> = reader
            .read_weights(0)
            .map(|weights| weights.into_f32().collect())
            .unwrap_or_default();
        // Unweighted vertices fall back to the rigid mesh transform
        primitive_joints.resize(count, [0; MAX_INFLUENCES]);
        primitive_weights.resize(count, [0.0; MAX_INFLUENCES]);

        positions.extend(primitive_positions);
        joints.extend(primitive_joints);
        weights.extend(primitive_weights);
    }

    let mut result = Mesh::new(positions, triangles);
    if let Some((armature, skin)) = skin {
        let joint_count = skin.joints().count();
        let reader = skin.reader(|buffer| Some(&buffers[buffer.index()]));
        let mut inverse_bind: Vec<Mat4> = reader
            .read_inverse_bind_matrices()
            .map(|matrices| {
                matrices
                    .map(|m| convert_matrix(Mat4::from_cols_array_2d(&m)))
                    .collect()
            })
            .unwrap_or_default();
        inverse_bind.resize(joint_count, Mat4::IDENTITY);

        result = result.with_skin(SkinBinding {
            armature,
            joint_bones: (0..joint_count).collect(),
            inverse_bind,
            joints,
            weights,
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::deformed_vertices;
    use std::fs;
    use tempfile::TempDir;

    const WORKCELL_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0, 3] }],
        "nodes": [
            { "name": "Worker", "children": [1, 2] },
            { "name": "mixamorig:Hips", "translation": [0.0, 1.0, 0.0] },
            { "name": "Hand", "mesh": 0, "skin": 0 },
            { "name": "Table", "translation": [0.0, 0.0, 2.0] }
        ],
        "meshes": [{
            "primitives": [{ "attributes": { "POSITION": 0, "JOINTS_0": 1, "WEIGHTS_0": 2 } }]
        }],
        "skins": [{ "joints": [1], "inverseBindMatrices": 3 }],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 1.0, 0.0], "max": [1.0, 1.0, 1.0] },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "VEC4" },
            { "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC4" },
            { "bufferView": 3, "componentType": 5126, "count": 1, "type": "MAT4" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 24 },
            { "buffer": 0, "byteOffset": 60, "byteLength": 48 },
            { "buffer": 0, "byteOffset": 108, "byteLength": 64 }
        ],
        "buffers": [{ "uri": "workcell.bin", "byteLength": 172 }]
    }"#;

    fn workcell_buffer() -> Vec<u8> {
        let mut bytes = Vec::new();
        let positions = [0.0f32, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
        for value in positions {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        for _ in 0..3 {
            for joint in [0u16, 0, 0, 0] {
                bytes.extend_from_slice(&joint.to_le_bytes());
            }
        }
        for _ in 0..3 {
            for weight in [1.0f32, 0.0, 0.0, 0.0] {
                bytes.extend_from_slice(&weight.to_le_bytes());
            }
        }
        let inverse_bind = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0));
        for value in inverse_bind.to_cols_array() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    fn write_asset(dir: &TempDir) -> PathBuf {
        fs::write(dir.path().join("workcell.bin"), workcell_buffer()).unwrap();
        let path = dir.path().join("workcell.gltf");
        fs::write(&path, WORKCELL_GLTF).unwrap();
        path
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_nodes_are_converted_to_z_up() {
        let dir = TempDir::new().unwrap();
        let mut loader = GltfSceneLoader::open(write_asset(&dir)).unwrap();
        let mut scene = SceneContext::new();
        loader.populate(&mut scene).unwrap();
        scene.synchronize();

        let table = scene.require("Table").unwrap();
        let location = scene.world_matrix(table).unwrap().transform_point3(Vec3::ZERO);
        assert!(approx(location, Vec3::new(0.0, -2.0, 0.0)));
        assert!(scene.find("mixamorig:Hips").is_none());
    }

    #[test]
    fn test_skin_becomes_armature_under_worker() {
        let dir = TempDir::new().unwrap();
        let mut loader = GltfSceneLoader::open(write_asset(&dir)).unwrap();
        let mut scene = SceneContext::new();
        loader.populate(&mut scene).unwrap();

        let worker = scene.require("Worker").unwrap();
        let armature = scene.require("Armature").unwrap();
        assert_eq!(scene.entity(armature).parent, Some(Parent::Entity(worker)));
        let bones = &scene.entity(armature).as_armature().unwrap().bones;
        assert_eq!(bones.len(), 1);
        assert_eq!(bones[0].name, "mixamorig:Hips");

        scene.synchronize();
        let hand = scene.require("Hand").unwrap();
        let rest = deformed_vertices(&scene, hand).unwrap();
        assert!(approx(rest[0], Vec3::new(0.0, 0.0, 1.0)));
        assert!(approx(rest[2], Vec3::new(0.0, -1.0, 1.0)));

        scene.transform_mut(armature).location.x = 1.0;
        scene.synchronize();
        let moved = deformed_vertices(&scene, hand).unwrap();
        assert!(approx(moved[1], Vec3::new(2.0, 0.0, 1.0)));
    }

    #[test]
    fn test_populate_repeats_baseline() {
        let dir = TempDir::new().unwrap();
        let mut loader = GltfSceneLoader::open(write_asset(&dir)).unwrap();
        let mut scene = SceneContext::new();
        loader.populate(&mut scene).unwrap();
        let count = scene.len();
        scene.retain(|_| false);
        loader.populate(&mut scene).unwrap();
        assert_eq!(scene.len(), count);
        assert!(scene.find("Table.001").is_none());
    }

    #[test]
    fn test_missing_file_is_asset_error() {
        let dir = TempDir::new().unwrap();
        let err = GltfSceneLoader::open(dir.path().join("missing.gltf")).unwrap_err();
        assert!(matches!(err, Error::Asset(message) if message.contains("missing.gltf")));
    }
}
