//! Randomization configuration, loaded once per run and read-only afterwards.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Closed `[min, max]` interval, written as a two-element array in JSON
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "[f32; 2]")]
pub struct RangeSpec {
    pub min: f32,
    pub max: f32,
}

impl RangeSpec {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub const fn fixed(value: f32) -> Self {
        Self::new(value, value)
    }

    pub fn contains(&self, value: f32) -> bool {
        self.min <= value && value <= self.max
    }

    fn validate(&self, key: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(Error::Configuration(format!("{key}: range bounds must be finite")));
        }
        if self.min > self.max {
            return Err(Error::Configuration(format!(
                "{key}: min {} is greater than max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl From<[f32; 2]> for RangeSpec {
    fn from([min, max]: [f32; 2]) -> Self {
        Self { min, max }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlanarRange {
    pub x: RangeSpec,
    pub y: RangeSpec,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpatialRange {
    pub x: RangeSpec,
    pub y: RangeSpec,
    pub z: RangeSpec,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RandomizationConfig {
    pub scene_parameters: SceneParameters,
    pub label_parameters: LabelParameters,
    pub rendering_parameters: RenderingParameters,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SceneParameters {
    /// Scene file, relative to the config file, or `builtin`
    pub scene_selection: String,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub manipulator: ManipulatorConfig,
    pub workpiece: WorkpieceConfig,
    pub human: HumanConfig,
    pub safety_zone: SafetyZoneConfig,
    #[serde(default)]
    pub roles: RoleNames,
}

impl SceneParameters {
    pub fn is_builtin_scene(&self) -> bool {
        self.scene_selection.eq_ignore_ascii_case(BUILTIN_SCENE)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CameraConfig {
    pub camera_distance: RangeSpec,
    pub image_size: [u32; 2],
    pub focal_length: f32,
    /// Degrees above the table plane
    #[serde(default = "default_elevation")]
    pub elevation: RangeSpec,
    /// Degrees around the table's vertical axis
    #[serde(default = "default_azimuth")]
    pub azimuth: RangeSpec,
}

fn default_elevation() -> RangeSpec {
    RangeSpec::new(10.0, 40.0)
}

fn default_azimuth() -> RangeSpec {
    RangeSpec::new(-180.0, 180.0)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LightConfig {
    pub intensity: f32,
    #[serde(rename = "Type")]
    pub kind: String,
    /// Light position relative to the camera
    #[serde(default = "default_light_offset")]
    pub offset: [f32; 3],
}

fn default_light_offset() -> [f32; 3] {
    [1.0, -1.0, 2.0]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManipulatorConfig {
    pub motion_range: SpatialRange,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkpieceConfig {
    pub size_range: PlanarRange,
    pub position_range: PlanarRange,
    /// Degrees about the vertical axis
    #[serde(default = "default_rotation_range")]
    pub rotation_range: RangeSpec,
    #[serde(default = "default_subdivision_cuts")]
    pub subdivision_cuts: u32,
    #[serde(default = "default_max_placement_attempts")]
    pub max_placement_attempts: u32,
}

fn default_rotation_range() -> RangeSpec {
    RangeSpec::new(0.0, 360.0)
}

fn default_subdivision_cuts() -> u32 {
    10
}

fn default_max_placement_attempts() -> u32 {
    1000
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HumanConfig {
    pub arm_range_left: RangeSpec,
    pub arm_range_right: RangeSpec,
    pub position_range: PlanarRange,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SafetyZoneConfig {
    pub distance: f32,
}

/// Entity names the orchestrator binds roles to
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RoleNames {
    pub table: String,
    pub workpiece: String,
    pub worker_group: String,
    pub manipulator_group: String,
    pub tool_point: String,
    pub environment: String,
    pub gripper: String,
    pub obstacles: Vec<String>,
    pub hand: String,
    pub glove: String,
    pub bones: ArmBoneNames,
}

impl Default for RoleNames {
    fn default() -> Self {
        Self {
            table: "Table".to_string(),
            workpiece: "workpiece".to_string(),
            worker_group: "Worker".to_string(),
            manipulator_group: "Panda".to_string(),
            tool_point: "TCP".to_string(),
            environment: "Environment".to_string(),
            gripper: "Gripper".to_string(),
            obstacles: vec!["Ch17_Vest".to_string(), "Link-0".to_string()],
            hand: "Hand".to_string(),
            glove: "Gloves".to_string(),
            bones: ArmBoneNames::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ArmBoneNames {
    pub right_arm: String,
    pub right_forearm: String,
    pub right_hand: String,
    pub left_arm: String,
    pub left_forearm: String,
    pub left_hand: String,
}

impl Default for ArmBoneNames {
    fn default() -> Self {
        Self {
            right_arm: "mixamorig:RightArm".to_string(),
            right_forearm: "mixamorig:RightForeArm".to_string(),
            right_hand: "mixamorig:RightHand".to_string(),
            left_arm: "mixamorig:LeftArm".to_string(),
            left_forearm: "mixamorig:LeftForeArm".to_string(),
            left_hand: "mixamorig:LeftHand".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelParameters {
    #[serde(rename = "CategoryIDs")]
    pub category_ids: BTreeMap<String, u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenderingParameters {
    pub output_dir: PathBuf,
    pub number_images: u32,
    #[serde(default = "default_max_samples")]
    pub max_samples: u32,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub stop_on_failure: bool,
}

fn default_max_samples() -> u32 {
    128
}

/// `SceneSelection` value for the built-in workcell
pub const BUILTIN_SCENE: &str = "builtin";

const LIGHT_TYPES: [&str; 4] = ["POINT", "SUN", "SPOT", "AREA"];

impl RandomizationConfig {
    /// Reads and validates a JSON config. Relative paths inside it are
    /// resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_json(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| Error::Configuration(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let output = &mut self.rendering_parameters.output_dir;
        if output.is_relative() {
            *output = base.join(&*output);
        }
        if self.scene_parameters.is_builtin_scene() {
            return;
        }
        let scene = &mut self.scene_parameters.scene_selection;
        if Path::new(scene.as_str()).is_relative() {
            *scene = base.join(scene.as_str()).to_string_lossy().into_owned();
        }
    }

    /// Fails on the first malformed entry, naming its key path
    pub fn validate(&self) -> Result<()> {
        let scene = &self.scene_parameters;

        let camera = &scene.camera;
        camera.camera_distance.validate("Camera.CameraDistance")?;
        if camera.camera_distance.min <= 0.0 {
            return Err(Error::Configuration(
                "Camera.CameraDistance: min must be positive".to_string(),
            ));
        }
        camera.elevation.validate("Camera.Elevation")?;
        if camera.elevation.min < -90.0 || camera.elevation.max > 90.0 {
            return Err(Error::Configuration(
                "Camera.Elevation: must lie within [-90, 90] degrees".to_string(),
            ));
        }
        camera.azimuth.validate("Camera.Azimuth")?;
        if camera.image_size.contains(&0) {
            return Err(Error::Configuration("Camera.ImageSize: zero dimension".to_string()));
        }
        if !(camera.focal_length > 0.0) {
            return Err(Error::Configuration("Camera.FocalLength must be positive".to_string()));
        }

        if !(scene.light.intensity >= 0.0) {
            return Err(Error::Configuration("Light.Intensity must be non-negative".to_string()));
        }
        if !LIGHT_TYPES.contains(&scene.light.kind.to_ascii_uppercase().as_str()) {
            return Err(Error::Configuration(format!(
                "Light.Type: unknown light type `{}`",
                scene.light.kind
            )));
        }

        let motion = &scene.manipulator.motion_range;
        motion.x.validate("Manipulator.MotionRange.x")?;
        motion.y.validate("Manipulator.MotionRange.y")?;
        motion.z.validate("Manipulator.MotionRange.z")?;

        let workpiece = &scene.workpiece;
        workpiece.size_range.x.validate("Workpiece.SizeRange.x")?;
        workpiece.size_range.y.validate("Workpiece.SizeRange.y")?;
        workpiece.position_range.x.validate("Workpiece.PositionRange.x")?;
        workpiece.position_range.y.validate("Workpiece.PositionRange.y")?;
        workpiece.rotation_range.validate("Workpiece.RotationRange")?;
        if workpiece.max_placement_attempts == 0 {
            return Err(Error::Configuration(
                "Workpiece.MaxPlacementAttempts must be at least 1".to_string(),
            ));
        }

        let human = &scene.human;
        human.arm_range_left.validate("Human.ArmRangeLeft")?;
        human.arm_range_right.validate("Human.ArmRangeRight")?;
        human.position_range.x.validate("Human.PositionRange.x")?;
        human.position_range.y.validate("Human.PositionRange.y")?;

        let threshold = scene.safety_zone.distance;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(Error::Configuration(
                "SafetyZone.Distance must be a finite, non-negative number".to_string(),
            ));
        }

        if self.rendering_parameters.number_images == 0 {
            return Err(Error::Configuration(
                "RenderingParameters.NumberImages must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
