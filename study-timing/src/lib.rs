pub mod timer;

pub use timer::{HighPrecisionTimer, OnsetStats, Timer, VirtualTimer};
