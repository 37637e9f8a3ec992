//! Per-image randomization loop.
//!
//! Each iteration walks RESET → RANDOMIZE_GLOBAL → RANDOMIZE_ENTITIES →
//! RESOLVE_COLLISIONS → AUDIT_SAFETY → EMIT → CLEANUP against one shared
//! [`SceneContext`]. Iterations that lose a role, hit a non-mesh entity or
//! exhaust placement are recorded as failures and produce no image record.

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::camera::{randomize_camera_and_light, CameraPose, LightSetup};
use crate::config::RandomizationConfig;
use crate::dataset::DatasetLog;
use crate::error::Result;
use crate::geometry::{CollisionStrategy, PlanarOverlap};
use crate::loaders::SceneLoader;
use crate::placement::{randomize_workpiece, Placement, PlacementResolver};
use crate::render::{Frame, FrameSink, RenderSettings};
use crate::safety::{SafetyAuditor, SafetyResult};
use crate::sampler::TransformSampler;
use crate::scene::{SceneContext, SceneEntity, SceneRoles};
use crate::types::{image_name, ImageRecord, IterationFailure};
use crate::worker::{randomize_worker, WorkerPose};

pub const SUMMARY_FILE_NAME: &str = "run_summary.json";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Reset,
    RandomizeGlobal,
    RandomizeEntities,
    ResolveCollisions,
    AuditSafety,
    Emit,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Reset => "RESET",
            Stage::RandomizeGlobal => "RANDOMIZE_GLOBAL",
            Stage::RandomizeEntities => "RANDOMIZE_ENTITIES",
            Stage::ResolveCollisions => "RESOLVE_COLLISIONS",
            Stage::AuditSafety => "AUDIT_SAFETY",
            Stage::Emit => "EMIT",
            Stage::Cleanup => "CLEANUP",
        };
        f.write_str(name)
    }
}

fn enter(stage: Stage, iteration: u32) {
    debug!("[{}] {}", iteration, stage);
}

/// Everything sampled and measured for one emitted image
#[derive(Clone, Debug)]
pub struct IterationOutcome {
    pub record: ImageRecord,
    pub camera: CameraPose,
    pub light: LightSetup,
    pub worker: WorkerPose,
    pub placement: Placement,
    pub safety: SafetyResult,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub requested: u32,
    pub images_written: u32,
    pub violations: u32,
    pub aborted: bool,
    pub records: Vec<ImageRecord>,
    pub failures: Vec<IterationFailure>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.aborted
    }

    pub fn write(&self, output_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = output_dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(SUMMARY_FILE_NAME);
        serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), self)?;
        Ok(path)
    }
}

pub struct Pipeline<L: SceneLoader, S: FrameSink, C: CollisionStrategy = PlanarOverlap> {
    config: RandomizationConfig,
    loader: L,
    sink: S,
    sampler: TransformSampler,
    resolver: PlacementResolver<C>,
    auditor: SafetyAuditor,
    log: DatasetLog,
    render: RenderSettings,
    scene: SceneContext,
}

impl<L: SceneLoader, S: FrameSink> Pipeline<L, S, PlanarOverlap> {
    /// Validates the config; seeds the sampler from `Seed` when present
    pub fn new(config: RandomizationConfig, loader: L, sink: S) -> Result<Self> {
        config.validate()?;
        let sampler = match config.rendering_parameters.seed {
            Some(seed) => TransformSampler::seeded(seed),
            None => TransformSampler::from_entropy(),
        };
        let resolver = PlacementResolver::new(config.scene_parameters.workpiece.max_placement_attempts);
        let auditor = SafetyAuditor::new(config.scene_parameters.safety_zone.distance);
        let log = DatasetLog::in_dir(&config.rendering_parameters.output_dir);
        let render = RenderSettings::new(config.rendering_parameters.max_samples);
        Ok(Self {
            config,
            loader,
            sink,
            sampler,
            resolver,
            auditor,
            log,
            render,
            scene: SceneContext::new(),
        })
    }
}

impl<L: SceneLoader, S: FrameSink, C: CollisionStrategy> Pipeline<L, S, C> {
    pub fn with_sampler(mut self, sampler: TransformSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Swaps the collision test used during placement
    pub fn with_strategy<D: CollisionStrategy>(self, strategy: D) -> Pipeline<L, S, D> {
        let max_attempts = self.config.scene_parameters.workpiece.max_placement_attempts;
        Pipeline {
            config: self.config,
            loader: self.loader,
            sink: self.sink,
            sampler: self.sampler,
            resolver: PlacementResolver::with_strategy(strategy, max_attempts),
            auditor: self.auditor,
            log: self.log,
            render: self.render,
            scene: self.scene,
        }
    }

    pub fn config(&self) -> &RandomizationConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneContext {
        &self.scene
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn dataset_log(&self) -> &DatasetLog {
        &self.log
    }

    /// Runs every configured iteration. Fatal errors (I/O, configuration,
    /// asset) stop the run; iteration failures are collected in the summary,
    /// which is also written to the output directory.
    pub fn run(&mut self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let requested = self.config.rendering_parameters.number_images;
        let stop_on_failure = self.config.rendering_parameters.stop_on_failure;
        info!("Generating {} image(s) into {:?}", requested, self.config.rendering_parameters.output_dir);

        let mut records = Vec::new();
        let mut failures = Vec::new();
        let mut aborted = false;

        for iteration in 0..requested {
            let result = self.run_iteration(iteration);
            self.cleanup(iteration);
            match result {
                Ok(outcome) => records.push(outcome.record),
                Err(err) if err.is_iteration_failure() => {
                    error!("Iteration {} failed: {}", iteration, err);
                    failures.push(IterationFailure {
                        iteration,
                        reason: err.to_string(),
                    });
                    if stop_on_failure {
                        aborted = true;
                        break;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            requested,
            images_written: records.len() as u32,
            violations: records.iter().filter(|r| r.safety_violation).count() as u32,
            aborted,
            records,
            failures,
        };
        let path = summary.write(&self.config.rendering_parameters.output_dir)?;
        info!(
            "Run finished: {}/{} image(s), {} violation(s), {} failure(s); summary at {:?}",
            summary.images_written,
            summary.requested,
            summary.violations,
            summary.failures.len(),
            path
        );
        Ok(summary)
    }

    /// One pass from RESET to EMIT. The scene is left populated; call
    /// [`Pipeline::cleanup`] before the next iteration.
    pub fn run_iteration(&mut self, iteration: u32) -> Result<IterationOutcome> {
        let params = &self.config.scene_parameters;

        enter(Stage::Reset, iteration);
        self.loader.populate(&mut self.scene)?;
        let roles = SceneRoles::bind(&self.scene, &params.roles)?;
        self.scene
            .mesh_mut(roles.workpiece)?
            .subdivide(params.workpiece.subdivision_cuts);
        self.scene.synchronize();

        enter(Stage::RandomizeGlobal, iteration);
        let (camera, light) = randomize_camera_and_light(
            &mut self.scene,
            roles.table,
            &mut self.sampler,
            &params.camera,
            &params.light,
        )?;

        enter(Stage::RandomizeEntities, iteration);
        self.sampler
            .sample_spatial_position(self.scene.transform_mut(roles.tool_point), &params.manipulator.motion_range);
        randomize_workpiece(&mut self.sampler, self.scene.transform_mut(roles.workpiece), &params.workpiece);
        let worker = randomize_worker(
            &mut self.scene,
            roles.worker,
            &mut self.sampler,
            &params.human,
            &params.roles.bones,
        )?;

        enter(Stage::ResolveCollisions, iteration);
        let placement = self.resolver.resolve(
            &mut self.scene,
            roles.workpiece,
            &roles.obstacles,
            &mut self.sampler,
            &params.workpiece,
        )?;

        enter(Stage::AuditSafety, iteration);
        self.scene.synchronize();
        let safety = self.auditor.audit(&self.scene, roles.hand, roles.glove)?;

        enter(Stage::Emit, iteration);
        let image_index = self.log.next_index(u64::from(iteration))?;
        let frame = Frame {
            image_index,
            image_name: image_name(image_index),
            scene: &self.scene,
            camera: &camera,
            light: &light,
            categories: &self.config.label_parameters.category_ids,
            render: &self.render,
            safety: &safety,
        };
        self.sink.emit(&frame)?;
        let record = ImageRecord::new(image_index, &safety);
        self.log.append(&record)?;
        info!(
            "{}: distance {:.4}, violation {}",
            record.image_name(),
            record.min_distance,
            record.safety_violation
        );

        Ok(IterationOutcome {
            record,
            camera,
            light,
            worker,
            placement,
            safety,
        })
    }

    /// Drops everything but camera and light so the next RESET starts clean
    pub fn cleanup(&mut self, iteration: u32) {
        enter(Stage::Cleanup, iteration);
        let removed = self.scene.retain(SceneEntity::is_camera_or_light);
        debug!("Removed {} entities", removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NullSink;
    use crate::scenes::ProceduralSceneLoader;
    use tempfile::TempDir;

    fn config(dir: &Path, images: u32) -> RandomizationConfig {
        let text = format!(
            r#"{{
                "SceneParameters": {{
                    "SceneSelection": "builtin",
                    "Camera": {{ "CameraDistance": [2.0, 3.0], "ImageSize": [320, 240], "FocalLength": 35.0 }},
                    "Light": {{ "Intensity": 800.0, "Type": "SUN" }},
                    "Manipulator": {{ "MotionRange": {{ "x": [-0.2, 0.2], "y": [-0.2, 0.2], "z": [0.3, 0.6] }} }},
                    "Workpiece": {{
                        "SizeRange": {{ "x": [1.0, 2.0], "y": [1.0, 2.0] }},
                        "PositionRange": {{ "x": [-0.6, 0.2], "y": [-0.4, 0.4] }},
                        "SubdivisionCuts": 2
                    }},
                    "Human": {{
                        "ArmRangeLeft": [-20, 20],
                        "ArmRangeRight": [-20, 20],
                        "PositionRange": {{ "x": [-0.3, 0.3], "y": [-1.1, -0.9] }}
                    }},
                    "SafetyZone": {{ "Distance": 0.1 }}
                }},
                "LabelParameters": {{ "CategoryIDs": {{ "Table": 1, "workpiece": 2 }} }},
                "RenderingParameters": {{ "OutputDir": {:?}, "NumberImages": {}, "Seed": 3 }}
            }}"#,
            dir.join("out"),
            images
        );
        RandomizationConfig::from_json(&text).unwrap()
    }

    #[test]
    fn stages_display_in_upper_snake_case() {
        assert_eq!(Stage::ResolveCollisions.to_string(), "RESOLVE_COLLISIONS");
    }

    #[test]
    fn cleanup_keeps_camera_and_light() {
        let dir = TempDir::new().unwrap();
        let mut pipeline =
            Pipeline::new(config(dir.path(), 1), ProceduralSceneLoader::default(), NullSink).unwrap();
        pipeline.run_iteration(0).unwrap();
        assert!(pipeline.scene().len() > 2);
        pipeline.cleanup(0);
        let names: Vec<&str> = pipeline.scene().iter().map(|(_, e)| e.name.as_str()).collect();
        assert_eq!(names, vec!["Camera", "Light"]);
    }

    #[test]
    fn workpiece_is_subdivided_each_iteration() {
        let dir = TempDir::new().unwrap();
        let mut pipeline =
            Pipeline::new(config(dir.path(), 1), ProceduralSceneLoader::default(), NullSink).unwrap();
        pipeline.run_iteration(0).unwrap();
        let workpiece = pipeline.scene().require("workpiece").unwrap();
        // A quad cut twice per edge: 4x4 lattice
        assert_eq!(pipeline.scene().entity(workpiece).as_mesh().unwrap().vertex_count(), 16);
    }

    #[test]
    fn run_writes_summary() {
        let dir = TempDir::new().unwrap();
        let mut pipeline =
            Pipeline::new(config(dir.path(), 2), ProceduralSceneLoader::default(), NullSink).unwrap();
        let summary = pipeline.run().unwrap();
        assert!(summary.is_complete());
        assert_eq!(summary.images_written, 2);
        assert_eq!(summary.records[1].image_index, 1);
        assert!(dir.path().join("out").join(SUMMARY_FILE_NAME).exists());
    }
}
