use crate::timeline::TimelineEntry;
use serde::{Deserialize, Serialize};

/// Terminal output of a trial, built once when the last frame has elapsed
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult {
    timeline: Vec<TimelineEntry>,
}

impl TrialResult {
    pub fn new(timeline: Vec<TimelineEntry>) -> Self {
        Self { timeline }
    }

    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    pub fn into_timeline(self) -> Vec<TimelineEntry> {
        self.timeline
    }

    /// Serializes the timeline into the host runner's recorded-data shape
    pub fn to_data(&self) -> Result<TrialData, serde_json::Error> {
        Ok(TrialData {
            study_sequence: serde_json::to_string(&self.timeline)?,
        })
    }
}

/// Recorded data handed to the host runner: the timeline as a JSON string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialData {
    pub study_sequence: String,
}

impl TrialData {
    pub fn timeline(&self) -> Result<Vec<TimelineEntry>, serde_json::Error> {
        serde_json::from_str(&self.study_sequence)
    }
}
