// cli.rs - Command-line interface configuration
use clap::Parser;
use std::path::PathBuf;

use crate::config::RandomizationConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "workcell-synth")]
#[command(about = "Randomized human-robot workcell scenes with safety labels", long_about = None)]
pub struct Cli {
    /// Randomization config (JSON)
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Seed for reproducible runs; overrides RenderingParameters.Seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of images; overrides RenderingParameters.NumberImages
    #[arg(long = "num-images")]
    pub num_images: Option<u32>,

    /// glTF scene file or `builtin`; overrides SceneParameters.SceneSelection
    #[arg(long)]
    pub scene: Option<String>,

    /// Output directory; overrides RenderingParameters.OutputDir
    #[arg(long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Skip writing per-image annotation files
    #[arg(long = "no-annotations", default_value = "false")]
    pub no_annotations: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded config
    pub fn apply(&self, config: &mut RandomizationConfig) {
        if let Some(seed) = self.seed {
            config.rendering_parameters.seed = Some(seed);
        }
        if let Some(count) = self.num_images {
            config.rendering_parameters.number_images = count;
        }
        if let Some(scene) = &self.scene {
            config.scene_parameters.scene_selection = scene.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.rendering_parameters.output_dir = dir.clone();
        }
    }
}
