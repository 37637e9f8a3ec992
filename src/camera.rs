use glam::{Mat3, Quat, Vec3};
use serde::Serialize;

use crate::config::{CameraConfig, LightConfig, RangeSpec};
use crate::error::{Error, Result};
use crate::geometry::world_bounds;
use crate::math::quat_to_euler;
use crate::sampler::TransformSampler;
use crate::scene::{
    CameraData, EntityId, EntityKind, LightData, LightKind, SceneContext, SceneEntity, Transform,
};

pub const CAMERA_NAME: &str = "Camera";
pub const LIGHT_NAME: &str = "Light";

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct CameraPose {
    pub location: Vec3,
    /// XYZ Euler radians; the camera looks down its local -Z with +Y up
    pub rotation: Vec3,
    pub target: Vec3,
    pub focal_length: f32,
    pub resolution: [u32; 2],
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct LightSetup {
    pub location: Vec3,
    pub kind: LightKind,
    pub energy: f32,
}

/// Point in a spherical shell around `center`: radius uniform in volume,
/// elevation uniform in area, azimuth uniform. Angles in degrees.
pub fn sample_shell(
    sampler: &mut TransformSampler,
    center: Vec3,
    radius: &RangeSpec,
    elevation: &RangeSpec,
    azimuth: &RangeSpec,
) -> Vec3 {
    let cubed = RangeSpec::new(radius.min.powi(3), radius.max.powi(3));
    let r = sampler.sample(&cubed).cbrt();
    let sin_el = RangeSpec::new(
        elevation.min.to_radians().sin(),
        elevation.max.to_radians().sin(),
    );
    let el = sampler.sample(&sin_el).clamp(-1.0, 1.0).asin();
    let az = sampler.sample_angle(azimuth);
    center + r * Vec3::new(el.cos() * az.cos(), el.cos() * az.sin(), el.sin())
}

/// Orientation whose local -Z points along `forward`, keeping world Z up
pub fn rotation_from_forward(forward: Vec3) -> Quat {
    let forward = forward.normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let right = forward.cross(Vec3::Z);
    // Looking straight up or down: any horizontal right vector will do
    let right = if right.length_squared() < 1e-8 { Vec3::X } else { right.normalize() };
    let up = right.cross(forward);
    Quat::from_mat3(&Mat3::from_cols(right, up, -forward))
}

/// Centre of the table's top face: its location in XY, its world height in Z
pub fn table_top_center(scene: &SceneContext, table: EntityId) -> Result<Vec3> {
    let bounds = world_bounds(scene, table)?
        .ok_or_else(|| Error::NonMesh(scene.name(table).to_string()))?;
    let location = scene.world_matrix(table)?.transform_point3(Vec3::ZERO);
    Ok(Vec3::new(location.x, location.y, bounds.size().z))
}

/// Samples a camera looking at the table and a light offset from it, and
/// upserts both into the scene. Expects a synchronized scene.
pub fn randomize_camera_and_light(
    scene: &mut SceneContext,
    table: EntityId,
    sampler: &mut TransformSampler,
    camera: &CameraConfig,
    light: &LightConfig,
) -> Result<(CameraPose, LightSetup)> {
    let target = table_top_center(scene, table)?;
    let location = sample_shell(
        sampler,
        target,
        &camera.camera_distance,
        &camera.elevation,
        &camera.azimuth,
    );
    let rotation = quat_to_euler(rotation_from_forward(target - location));

    let pose = CameraPose {
        location,
        rotation,
        target,
        focal_length: camera.focal_length,
        resolution: camera.image_size,
    };
    let kind = LightKind::parse(&light.kind)
        .ok_or_else(|| Error::Configuration(format!("Light.Type: unknown light type `{}`", light.kind)))?;
    let setup = LightSetup {
        location: location + Vec3::from_array(light.offset),
        kind,
        energy: light.intensity,
    };

    scene.upsert(
        SceneEntity::new(
            CAMERA_NAME,
            EntityKind::Camera(CameraData {
                focal_length: pose.focal_length,
                resolution: pose.resolution,
            }),
        )
        .with_transform(Transform {
            location,
            rotation,
            scale: Vec3::ONE,
        }),
    );
    scene.upsert(
        SceneEntity::new(LIGHT_NAME, EntityKind::Light(LightData { kind, energy: light.intensity }))
            .with_transform(Transform::from_location(setup.location)),
    );

    Ok((pose, setup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::euler_to_quat;
    use crate::scene::Mesh;

    #[test]
    fn shell_samples_respect_radius_and_elevation() {
        let mut sampler = TransformSampler::seeded(11);
        let center = Vec3::new(1.0, -1.0, 0.8);
        for _ in 0..1000 {
            let p = sample_shell(
                &mut sampler,
                center,
                &RangeSpec::new(2.0, 3.0),
                &RangeSpec::new(10.0, 40.0),
                &RangeSpec::new(-180.0, 180.0),
            );
            let offset = p - center;
            let r = offset.length();
            assert!(r >= 2.0 - 1e-4 && r <= 3.0 + 1e-4);
            let elevation = (offset.z / r).asin().to_degrees();
            assert!(elevation >= 10.0 - 1e-2 && elevation <= 40.0 + 1e-2);
        }
    }

    #[test]
    fn camera_faces_forward() {
        let forward = Vec3::new(-1.0, 2.0, -0.5).normalize();
        let q = rotation_from_forward(forward);
        assert!((q * Vec3::NEG_Z - forward).length() < 1e-5);
        assert!((q * Vec3::Y).z > 0.0);
    }

    #[test]
    fn straight_down_is_defined() {
        let q = rotation_from_forward(Vec3::NEG_Z);
        assert!((q * Vec3::NEG_Z - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn camera_and_light_are_upserted() {
        let mut scene = SceneContext::new();
        let table = scene.add(SceneEntity::mesh(
            "Table",
            Mesh::cuboid(Vec3::new(-1.0, -0.5, 0.0), Vec3::new(1.0, 0.5, 0.75)),
        ));
        scene.synchronize();
        let camera = CameraConfig {
            camera_distance: RangeSpec::new(2.0, 3.0),
            image_size: [640, 480],
            focal_length: 35.0,
            elevation: RangeSpec::new(10.0, 40.0),
            azimuth: RangeSpec::new(-180.0, 180.0),
        };
        let light = LightConfig {
            intensity: 500.0,
            kind: "point".to_string(),
            offset: [1.0, -1.0, 2.0],
        };
        let mut sampler = TransformSampler::seeded(4);

        for _ in 0..3 {
            let (pose, setup) =
                randomize_camera_and_light(&mut scene, table, &mut sampler, &camera, &light).unwrap();
            assert_eq!(pose.target, Vec3::new(0.0, 0.0, 0.75));
            assert_eq!(setup.location, pose.location + Vec3::new(1.0, -1.0, 2.0));
            let look = euler_to_quat(pose.rotation) * Vec3::NEG_Z;
            assert!((look - (pose.target - pose.location).normalize()).length() < 1e-4);
            scene.synchronize();
        }
        assert_eq!(scene.len(), 3);
        assert!(scene.find(CAMERA_NAME).is_some());
        assert!(scene.find(LIGHT_NAME).is_some());
    }
}
