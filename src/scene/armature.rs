use glam::Mat4;

use super::Transform;

/// A bone's rest matrix is relative to its parent bone (or to the armature
/// for roots); `pose` is applied on top of it in bone-local space.
#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub rest: Mat4,
    pub pose: Transform,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<usize>, rest: Mat4) -> Self {
        Self {
            name: name.into(),
            parent,
            rest,
            pose: Transform::IDENTITY,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Armature {
    pub bones: Vec<Bone>,
}

impl Armature {
    pub fn new(bones: Vec<Bone>) -> Self {
        Self { bones }
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Posed bone matrices in armature space. Parents are resolved on demand,
    /// so bones may be stored in any order.
    pub fn pose_matrices(&self) -> Vec<Mat4> {
        let mut resolved: Vec<Option<Mat4>> = vec![None; self.bones.len()];
        for index in 0..self.bones.len() {
            self.resolve(index, &mut resolved, 0);
        }
        resolved.into_iter().map(|m| m.unwrap_or(Mat4::IDENTITY)).collect()
    }

    fn resolve(&self, index: usize, resolved: &mut [Option<Mat4>], depth: usize) -> Mat4 {
        if let Some(matrix) = resolved[index] {
            return matrix;
        }
        let bone = &self.bones[index];
        let local = bone.rest * bone.pose.matrix();
        let matrix = match bone.parent {
            // Depth guard: a malformed cycle degrades to a root bone
            Some(parent) if parent < self.bones.len() && depth < self.bones.len() => {
                self.resolve(parent, resolved, depth + 1) * local
            }
            _ => local,
        };
        resolved[index] = Some(matrix);
        matrix
    }
}
