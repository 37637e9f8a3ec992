use glam::{EulerRot, Quat, Vec3};

/// XYZ Euler angles (radians, X applied first) to a quaternion
pub fn euler_to_quat(angles: Vec3) -> Quat {
    Quat::from_euler(EulerRot::ZYX, angles.z, angles.y, angles.x)
}

/// Inverse of [`euler_to_quat`]
pub fn quat_to_euler(rotation: Quat) -> Vec3 {
    let (z, y, x) = rotation.to_euler(EulerRot::ZYX);
    Vec3::new(x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn x_is_applied_before_z() {
        // X quarter turn takes +Y to +Z, then Z quarter turn leaves +Z alone
        let q = euler_to_quat(Vec3::new(FRAC_PI_2, 0.0, FRAC_PI_2));
        let v = q * Vec3::Y;
        assert!((v - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn euler_survives_quat_conversion() {
        let angles = Vec3::new(0.3, -0.2, 1.1);
        let back = quat_to_euler(euler_to_quat(angles));
        assert!((back - angles).length() < 1e-5);
    }
}
