use crate::error::TrialError;
use crate::registry::STUDY_ITEMS;
use crate::scheduler::{Action, FrameScheduler};
use serde_json::Value;
use std::time::Duration;
use study_core::{TrialConfig, TrialData, TrialState};
use study_render::{FrameRenderer, Surface};
use study_timing::Timer;
use tracing::info;

/// Outcome of driving a trial forward
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Running,
    Finished(TrialData),
}

/// A trial type the host runner can schedule
pub trait TrialPlugin {
    fn trial_type(&self) -> &'static str;
    fn start(&mut self, now_ms: u64, surface: &mut dyn Surface) -> Result<Step, TrialError>;
    /// When `advance` should next be called, if the trial is still running
    fn next_due(&self) -> Option<u64>;
    fn advance(&mut self, now_ms: u64, surface: &mut dyn Surface) -> Result<Step, TrialError>;
    /// Abandons the trial, disarming its timers and clearing the surface
    fn cancel(&mut self, surface: &mut dyn Surface);
}

/// Timed presentation of words, images and grouped items
pub struct StudyItemsTrial {
    scheduler: FrameScheduler,
    renderer: FrameRenderer,
}

impl StudyItemsTrial {
    pub fn new(config: TrialConfig) -> Self {
        Self {
            renderer: FrameRenderer::new(config.horizontal),
            scheduler: FrameScheduler::new(config),
        }
    }

    pub fn from_params(params: &Value) -> Result<Box<dyn TrialPlugin>, TrialError> {
        Ok(Box::new(Self::new(TrialConfig::from_value(params)?)))
    }

    pub fn state(&self) -> TrialState {
        self.scheduler.state()
    }

    fn apply(&self, actions: Vec<Action>, surface: &mut dyn Surface) -> Result<Step, TrialError> {
        for action in actions {
            match action {
                Action::Show(frame) => self.renderer.render(surface, frame.items()),
                Action::Hide => self.renderer.hide(surface),
                Action::Finish(result) => {
                    self.renderer.clear(surface);
                    return Ok(Step::Finished(result.to_data()?));
                }
            }
        }
        Ok(Step::Running)
    }
}

impl TrialPlugin for StudyItemsTrial {
    fn trial_type(&self) -> &'static str {
        STUDY_ITEMS
    }

    fn start(&mut self, now_ms: u64, surface: &mut dyn Surface) -> Result<Step, TrialError> {
        self.renderer.mount(surface);
        let actions = self.scheduler.start(now_ms);
        self.apply(actions, surface)
    }

    fn next_due(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    fn advance(&mut self, now_ms: u64, surface: &mut dyn Surface) -> Result<Step, TrialError> {
        let actions = self.scheduler.advance(now_ms);
        self.apply(actions, surface)
    }

    fn cancel(&mut self, surface: &mut dyn Surface) {
        self.scheduler.cancel();
        self.renderer.clear(surface);
    }
}

/// Starts `trial` at the timer's current time. Onset statistics restart so
/// the summary logged at the end covers this trial only.
pub fn start_trial<T: Timer>(
    trial: &mut dyn TrialPlugin,
    timer: &mut T,
    surface: &mut dyn Surface,
) -> Result<Step, TrialError> {
    timer.reset_stats();
    let step = trial.start(timer.now_ms(), surface)?;
    report_finished(trial, timer, &step);
    Ok(step)
}

/// Advances `trial` if an event is due, recording how late it was applied.
/// Returns `Step::Running` untouched when nothing is due yet.
pub fn poll_trial<T: Timer>(
    trial: &mut dyn TrialPlugin,
    timer: &mut T,
    surface: &mut dyn Surface,
) -> Result<Step, TrialError> {
    let due_ns = trial
        .next_due()
        .ok_or(TrialError::Stalled {
            trial_type: trial.trial_type(),
        })?
        .saturating_mul(1_000_000);
    let now_ns = timer.now();
    if now_ns < due_ns {
        return Ok(Step::Running);
    }
    timer.record_frame(Duration::from_nanos(now_ns - due_ns));
    let step = trial.advance(now_ns / 1_000_000, surface)?;
    report_finished(trial, timer, &step);
    Ok(step)
}

/// Drives `trial` to completion on `timer`, sleeping between due events
pub fn run_trial<T: Timer>(
    trial: &mut dyn TrialPlugin,
    timer: &mut T,
    surface: &mut dyn Surface,
) -> Result<TrialData, TrialError> {
    let mut step = start_trial(trial, timer, surface)?;
    loop {
        if let Step::Finished(data) = step {
            return Ok(data);
        }
        if let Some(due) = trial.next_due() {
            let now = timer.now_ms();
            if due > now {
                timer.sleep(Duration::from_millis(due - now));
            }
        }
        step = poll_trial(trial, timer, surface)?;
    }
}

fn report_finished<T: Timer>(trial: &dyn TrialPlugin, timer: &T, step: &Step) {
    if let Step::Finished(_) = step {
        let stats = timer.onset_stats();
        info!(
            trial_type = trial.trial_type(),
            events = stats.samples,
            mean_latency_ms = stats.mean_latency_ns / 1e6,
            jitter_ms = stats.jitter_ns / 1e6,
            max_latency_ms = stats.max_latency_ns / 1e6,
            "trial finished"
        );
    }
}
