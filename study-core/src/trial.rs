use crate::error::ConfigError;
use crate::stimulus::Frame;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Trial lifecycle: `Idle -> Running { index } -> Finished`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Idle,
    Running { index: usize },
    Finished,
}

impl TrialState {
    pub fn is_running(&self) -> bool {
        matches!(self, TrialState::Running { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TrialState::Finished)
    }
}

/// Which instant a timeline offset records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampMode {
    /// Clock reading when the state is applied, including scheduling latency
    #[default]
    Observed,
    /// Nominal due time of the event
    Scheduled,
}

/// Parameters of one study-items trial, read-only once the trial starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    pub stimuli: Vec<Frame>,
    #[serde(rename = "frame_time", default = "TrialConfig::default_frame_duration_ms")]
    pub frame_duration_ms: u64,
    #[serde(rename = "isi", default)]
    pub inter_stimulus_interval_ms: u64,
    #[serde(default)]
    pub horizontal: bool,
    #[serde(default)]
    pub timestamps: TimestampMode,
}

impl TrialConfig {
    fn default_frame_duration_ms() -> u64 {
        250
    }

    pub fn new(stimuli: Vec<Frame>) -> Self {
        Self {
            stimuli,
            frame_duration_ms: Self::default_frame_duration_ms(),
            inter_stimulus_interval_ms: 0,
            horizontal: false,
            timestamps: TimestampMode::default(),
        }
    }

    pub fn with_frame_duration(mut self, ms: u64) -> Self {
        self.frame_duration_ms = ms;
        self
    }

    pub fn with_isi(mut self, ms: u64) -> Self {
        self.inter_stimulus_interval_ms = ms;
        self
    }

    pub fn with_horizontal(mut self, horizontal: bool) -> Self {
        self.horizontal = horizontal;
        self
    }

    pub fn with_timestamps(mut self, mode: TimestampMode) -> Self {
        self.timestamps = mode;
        self
    }

    /// Parses the host runner's trial parameters. A missing `stimuli` field or
    /// durations too long for the timeline are rejected here rather than
    /// inside the scheduler.
    pub fn from_value(params: &Value) -> Result<Self, ConfigError> {
        if !params.is_object() {
            return Err(ConfigError::NotAnObject(json_kind(params)));
        }
        let config = Self::deserialize(params)?;
        config.check_span()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Onset-to-onset interval of the repeating frame tick
    pub fn period_ms(&self) -> u64 {
        self.frame_duration_ms
            .saturating_add(self.inter_stimulus_interval_ms)
    }

    /// Every tick of the trial, `len + 1` periods, must fit a nanosecond `u64` clock
    fn check_span(&self) -> Result<(), ConfigError> {
        let ticks = self.stimuli.len() as u64 + 1;
        let span_ns = self
            .frame_duration_ms
            .checked_add(self.inter_stimulus_interval_ms)
            .and_then(|period| period.checked_mul(ticks))
            .and_then(|ms| ms.checked_mul(1_000_000));
        match span_ns {
            Some(_) => Ok(()),
            None => Err(ConfigError::DurationOutOfRange {
                frame_time: self.frame_duration_ms,
                isi: self.inter_stimulus_interval_ms,
            }),
        }
    }

    pub fn has_gap(&self) -> bool {
        self.inter_stimulus_interval_ms > 0
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_apply_to_omitted_fields() {
        let config = TrialConfig::from_value(&json!({"stimuli": ["a", ["b", "c.png"]]})).unwrap();
        assert_eq!(config.frame_duration_ms, 250);
        assert_eq!(config.inter_stimulus_interval_ms, 0);
        assert!(!config.horizontal);
        assert_eq!(config.timestamps, TimestampMode::Observed);
        assert_eq!(config.stimuli.len(), 2);
        assert!(!config.has_gap());
    }

    #[test]
    fn host_field_names_are_accepted() {
        let config = TrialConfig::from_json(
            r#"{"stimuli": ["x"], "frame_time": 100, "isi": 20, "horizontal": true, "timestamps": "scheduled"}"#,
        )
        .unwrap();
        assert_eq!(config.period_ms(), 120);
        assert!(config.horizontal);
        assert_eq!(config.timestamps, TimestampMode::Scheduled);
    }

    #[test]
    fn missing_stimuli_is_an_error() {
        let err = TrialConfig::from_value(&json!({"frame_time": 100})).unwrap_err();
        assert!(err.to_string().contains("stimuli"), "{err}");
    }

    #[test]
    fn negative_durations_are_rejected() {
        assert!(TrialConfig::from_value(&json!({"stimuli": [], "isi": -5})).is_err());
    }

    #[test]
    fn durations_beyond_the_clock_range_are_rejected() {
        let err = TrialConfig::from_value(&json!({
            "stimuli": ["a"],
            "frame_time": 20_000_000_000_000u64
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DurationOutOfRange { frame_time: 20_000_000_000_000, isi: 0 }
        ));
        assert!(TrialConfig::from_value(&json!({
            "stimuli": [],
            "frame_time": u64::MAX,
            "isi": 1
        }))
        .is_err());
    }

    #[test]
    fn long_but_representable_durations_are_accepted() {
        // one hour per frame and gap over a long list still fits comfortably
        let stimuli: Vec<String> = (0..1000).map(|i| format!("w{i}")).collect();
        let config = TrialConfig::from_value(&json!({
            "stimuli": stimuli,
            "frame_time": 3_600_000,
            "isi": 3_600_000
        }))
        .unwrap();
        assert_eq!(config.period_ms(), 7_200_000);
    }

    #[test]
    fn period_saturates_for_unchecked_configs() {
        let config = TrialConfig::new(Vec::new())
            .with_frame_duration(u64::MAX)
            .with_isi(1);
        assert_eq!(config.period_ms(), u64::MAX);
    }

    #[test]
    fn non_object_parameters_are_rejected() {
        let err = TrialConfig::from_value(&json!(["a"])).unwrap_err();
        assert!(matches!(err, ConfigError::NotAnObject("an array")));
    }
}
