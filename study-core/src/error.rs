use thiserror::Error;

/// Errors raised while ingesting trial parameters from the host runner
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("trial parameters must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("frame_time {frame_time} ms and isi {isi} ms overflow the trial timeline")]
    DurationOutOfRange { frame_time: u64, isi: u64 },

    #[error("invalid trial parameters: {0}")]
    Json(#[from] serde_json::Error),
}
