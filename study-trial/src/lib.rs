pub mod error;
pub mod registry;
pub mod scheduler;
pub mod trial;
pub use error::TrialError;
pub use registry::{AssetKind, PreloadDecl, STUDY_ITEMS, TrialConstructor, TrialTypeRegistry};
pub use scheduler::{Action, FrameScheduler};
pub use trial::{Step, StudyItemsTrial, TrialPlugin, poll_trial, run_trial, start_trial};
