use study_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrialError {
    #[error("unknown trial type `{0}`")]
    UnknownTrialType(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to serialize trial data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("trial `{trial_type}` is running with nothing scheduled")]
    Stalled { trial_type: &'static str },
}
