pub mod error;
pub mod result;
pub mod stimulus;
pub mod timeline;
pub mod trial;

pub use error::ConfigError;
pub use result::{TrialData, TrialResult};
pub use stimulus::{Frame, StimulusKind, StimulusToken, classify};
pub use timeline::{Shown, TimelineEntry};
pub use trial::{TimestampMode, TrialConfig, TrialState};
