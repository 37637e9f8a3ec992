use glam::{Mat4, Vec3};
use serde::Serialize;

use crate::math::{euler_to_quat, quat_to_euler};

/// Location, XYZ Euler rotation (radians) and scale of an entity or bone,
/// relative to its parent
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Transform {
    pub location: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        location: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_location(location: Vec3) -> Self {
        Self {
            location,
            ..Self::IDENTITY
        }
    }

    /// Rotation given in degrees
    pub fn from_rotation_degrees(x: f32, y: f32, z: f32) -> Self {
        Self {
            rotation: Vec3::new(x.to_radians(), y.to_radians(), z.to_radians()),
            ..Self::IDENTITY
        }
    }

    /// Decomposes an affine matrix; shear is lost
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, rotation, location) = matrix.to_scale_rotation_translation();
        Self {
            location,
            rotation: quat_to_euler(rotation),
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, euler_to_quat(self.rotation), self.location)
    }
}
