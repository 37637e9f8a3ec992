use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use workcell_synth::cli::Cli;
use workcell_synth::config::RandomizationConfig;
use workcell_synth::loaders::open_scene_loader;
use workcell_synth::pipeline::Pipeline;
use workcell_synth::render::{AnnotationWriter, FrameSink, NullSink};

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = RandomizationConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {:?}", cli.config))?;
    cli.apply(&mut config);

    let loader = open_scene_loader(&config.scene_parameters)
        .with_context(|| format!("Failed to open scene {:?}", config.scene_parameters.scene_selection))?;
    let sink: Box<dyn FrameSink> = if cli.no_annotations {
        Box::new(NullSink)
    } else {
        Box::new(AnnotationWriter::new(&config.rendering_parameters.output_dir))
    };

    let mut pipeline = Pipeline::new(config, loader, sink).context("Invalid configuration")?;
    let summary = pipeline.run().context("Dataset generation failed")?;

    println!(
        "Wrote {}/{} image record(s), {} safety violation(s)",
        summary.images_written, summary.requested, summary.violations
    );
    for failure in &summary.failures {
        eprintln!("  iteration {}: {}", failure.iteration, failure.reason);
    }

    Ok(if summary.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
