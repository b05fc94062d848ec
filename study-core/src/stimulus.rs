use serde::{Deserialize, Serialize};

/// A bare word/phrase or a path-like reference to an image asset
pub type StimulusToken = String;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// How a single token is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StimulusKind {
    Image,
    Word,
    Phrase,
}

impl StimulusKind {
    pub fn is_image(&self) -> bool {
        matches!(self, StimulusKind::Image)
    }

    pub fn is_text(&self) -> bool {
        !self.is_image()
    }
}

/// Classifies a token by its extension, then by its word count.
///
/// Only `jpg`, `jpeg`, `png` and `gif` (any case) count as images. Anything
/// else, including `report.pdf` or a trailing dot, falls back to text.
pub fn classify(token: &str) -> StimulusKind {
    if has_image_extension(token) {
        return StimulusKind::Image;
    }
    // Any run of Unicode whitespace separates pieces and edge whitespace is
    // ignored, so " hello", "hello " and "a\tb" differ from a split on single spaces.
    match token.split_whitespace().count() {
        0 | 1 => StimulusKind::Word,
        _ => StimulusKind::Phrase,
    }
}

fn has_image_extension(token: &str) -> bool {
    let Some((_, extension)) = token.rsplit_once('.') else {
        return false;
    };
    let extension = extension.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&extension.as_str())
}

/// One entry of the stimulus sequence: a single token or a group shown together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    Single(StimulusToken),
    Group(Vec<StimulusToken>),
}

impl Frame {
    /// The frame's items, a single token viewed as a one-element list
    pub fn items(&self) -> &[StimulusToken] {
        match self {
            Frame::Single(token) => std::slice::from_ref(token),
            Frame::Group(tokens) => tokens,
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Tokens of this frame that reference image assets
    pub fn images(&self) -> impl Iterator<Item = &StimulusToken> {
        self.items().iter().filter(|t| classify(t).is_image())
    }
}

impl From<&str> for Frame {
    fn from(token: &str) -> Self {
        Frame::Single(token.to_string())
    }
}

impl From<Vec<&str>> for Frame {
    fn from(tokens: Vec<&str>) -> Self {
        Frame::Group(tokens.into_iter().map(str::to_string).collect())
    }
}
