use crate::stimulus::Frame;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const BLANK: &str = "blank";

/// What became visible at a timeline entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Frame(Frame),
    Blank,
}

impl Shown {
    pub fn is_blank(&self) -> bool {
        matches!(self, Shown::Blank)
    }

    pub fn frame(&self) -> Option<&Frame> {
        match self {
            Shown::Frame(frame) => Some(frame),
            Shown::Blank => None,
        }
    }
}

// The recorded data marks gaps with the bare string "blank", so a frame that is
// literally the single word "blank" reads back as a gap.
impl Serialize for Shown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Shown::Frame(frame) => frame.serialize(serializer),
            Shown::Blank => serializer.serialize_str(BLANK),
        }
    }
}

impl<'de> Deserialize<'de> for Shown {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Frame::deserialize(deserializer)? {
            Frame::Single(token) if token == BLANK => Shown::Blank,
            frame => Shown::Frame(frame),
        })
    }
}

/// One shown or blank event, offset in milliseconds from trial start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    #[serde(rename = "stimuli")]
    pub shown: Shown,
    #[serde(rename = "time")]
    pub offset_ms: u64,
}

impl TimelineEntry {
    pub fn frame(frame: Frame, offset_ms: u64) -> Self {
        Self {
            shown: Shown::Frame(frame),
            offset_ms,
        }
    }

    pub fn blank(offset_ms: u64) -> Self {
        Self {
            shown: Shown::Blank,
            offset_ms,
        }
    }
}
