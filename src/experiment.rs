// experiment.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use study_core::TrialData;
use study_render::{ImageAssets, Surface};
use study_timing::Timer;
use study_trial::{poll_trial, start_trial, Step, TrialPlugin, TrialTypeRegistry};
use tracing::{info, warn};

/// One entry of the experiment timeline: a trial type and its parameters
#[derive(Debug, Clone, Deserialize)]
pub struct TrialDescriptor {
    #[serde(rename = "type")]
    pub trial_type: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl TrialDescriptor {
    pub fn params(&self) -> Value {
        Value::Object(self.params.clone())
    }
}

/// Experiment file contents
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    pub timeline: Vec<TrialDescriptor>,
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default = "ExperimentConfig::default_output")]
    pub output: PathBuf,
    /// Directory relative asset, font and output paths resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl ExperimentConfig {
    fn default_output() -> PathBuf {
        PathBuf::from("study_results.json")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read experiment file {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid experiment file {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }
}

/// Trial data as written to the results file
#[derive(Debug, Clone, Serialize)]
pub struct RecordedTrial {
    pub trial_index: usize,
    pub trial_type: String,
    #[serde(flatten)]
    pub data: TrialData,
}

/// Runs the experiment timeline one trial after another
pub struct Experiment {
    config: ExperimentConfig,
    registry: TrialTypeRegistry,
    current: Option<Box<dyn TrialPlugin>>,
    next_index: usize,
    results: Vec<RecordedTrial>,
}

impl Experiment {
    /// Checks every trial's type and parameters before anything is shown
    pub fn new(config: ExperimentConfig, registry: TrialTypeRegistry) -> Result<Self> {
        for (i, desc) in config.timeline.iter().enumerate() {
            registry
                .create(&desc.trial_type, &desc.params())
                .with_context(|| format!("trial {i} ({})", desc.trial_type))?;
        }
        Ok(Self {
            config,
            registry,
            current: None,
            next_index: 0,
            results: Vec::new(),
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn results(&self) -> &[RecordedTrial] {
        &self.results
    }

    pub fn is_complete(&self) -> bool {
        self.current.is_none() && self.next_index >= self.config.timeline.len()
    }

    /// Decodes every image the registered trial types declare for preloading
    pub fn preload(&self) -> Result<ImageAssets> {
        let mut assets = ImageAssets::new();
        for desc in &self.config.timeline {
            for token in self
                .registry
                .image_assets(&desc.trial_type, &desc.params())?
            {
                assets
                    .load(&token, &self.config.base_dir)
                    .with_context(|| format!("cannot preload image {token}"))?;
            }
        }
        info!(images = assets.len(), "assets preloaded");
        Ok(assets)
    }

    /// Starts or advances the active trial. A finished trial is recorded and
    /// the next one starts in the same call.
    pub fn poll<T: Timer>(&mut self, timer: &mut T, surface: &mut dyn Surface) -> Result<()> {
        loop {
            let step = if let Some(trial) = self.current.as_mut() {
                poll_trial(trial.as_mut(), timer, surface)?
            } else {
                match self.start_next(timer, surface)? {
                    Some(step) => step,
                    None => return Ok(()),
                }
            };
            match step {
                Step::Running => return Ok(()),
                Step::Finished(data) => self.record(data),
            }
        }
    }

    fn start_next<T: Timer>(
        &mut self,
        timer: &mut T,
        surface: &mut dyn Surface,
    ) -> Result<Option<Step>> {
        let Some(desc) = self.config.timeline.get(self.next_index) else {
            return Ok(None);
        };
        let mut trial = self.registry.create(&desc.trial_type, &desc.params())?;
        info!(
            trial_index = self.next_index,
            trial_type = desc.trial_type.as_str(),
            "trial started"
        );
        let step = start_trial(trial.as_mut(), timer, surface)?;
        self.current = Some(trial);
        Ok(Some(step))
    }

    fn record(&mut self, data: TrialData) {
        self.current = None;
        let trial_type = self
            .config
            .timeline
            .get(self.next_index)
            .map(|desc| desc.trial_type.clone())
            .unwrap_or_default();
        self.results.push(RecordedTrial {
            trial_index: self.next_index,
            trial_type,
            data,
        });
        self.next_index += 1;
    }

    /// Plays the remaining timeline, sleeping on `timer` between due events
    pub fn run_to_end<T: Timer>(&mut self, timer: &mut T, surface: &mut dyn Surface) -> Result<()> {
        while !self.is_complete() {
            self.poll(timer, surface)?;
            if let Some(due) = self.current.as_ref().and_then(|t| t.next_due()) {
                let now = timer.now_ms();
                if due > now {
                    timer.sleep(Duration::from_millis(due - now));
                }
            }
        }
        Ok(())
    }

    /// Cancels the active trial and skips the rest of the timeline
    pub fn abort(&mut self, surface: &mut dyn Surface) {
        if let Some(mut trial) = self.current.take() {
            warn!(trial_index = self.next_index, "trial aborted");
            trial.cancel(surface);
        }
        self.next_index = self.config.timeline.len();
    }

    pub fn save_results(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("cannot create result file {}", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &self.results)
            .context("failed to write results")?;
        info!(path = %path.display(), trials = self.results.len(), "results saved");
        Ok(())
    }
}
