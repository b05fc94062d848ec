mod app;
mod cli;
mod experiment;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cli::Cli;
use experiment::{Experiment, ExperimentConfig};
use study_render::{RecordingSurface, SkiaSurface};
use study_timing::{HighPrecisionTimer, VirtualTimer};
use study_trial::TrialTypeRegistry;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // RUST_LOG=study_trial=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = ExperimentConfig::load(&cli.experiment)?;
    if let Some(font) = cli.font {
        config.font = Some(font);
    }
    let output = match cli.output {
        Some(path) => path,
        None => config.resolve(&config.output),
    };
    let font = config.font.as_deref().map(|path| config.resolve(path));

    let mut experiment = Experiment::new(config, TrialTypeRegistry::builtin())?;
    info!(
        trials = experiment.config().timeline.len(),
        output = %output.display(),
        "experiment loaded"
    );

    if cli.headless {
        let mut surface = RecordingSurface::new();
        if cli.virtual_clock {
            experiment.run_to_end(&mut VirtualTimer::new(), &mut surface)?;
        } else {
            experiment.run_to_end(&mut HighPrecisionTimer::new(), &mut surface)?;
        }
        info!(frames = surface.frames_rendered(), "headless run complete");
        return experiment.save_results(&output);
    }

    let assets = experiment.preload()?;
    let mut surface = SkiaSurface::new(1, 1, assets)?;
    if let Some(path) = font {
        let font = SkiaSurface::load_font(&path)
            .with_context(|| format!("cannot load font {}", path.display()))?;
        surface = surface.with_font(font);
    }
    App::new(experiment, surface, output).run()
}
