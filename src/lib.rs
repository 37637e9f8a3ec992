pub mod camera;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod geometry;
pub mod loaders;
pub mod math;
pub mod pipeline;
pub mod placement;
pub mod render;
pub mod safety;
pub mod sampler;
pub mod scene;
pub mod scenes;
pub mod types;
pub mod worker;

pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunSummary};
pub use scene::{SceneContext, SceneRoles};
