/// A visual element appended to the display container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Image { src: String },
    /// `word` marks single-word tokens, which get their own styling
    Text { content: String, word: bool },
}

/// Main axis along which a frame's items share the container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

impl Orientation {
    pub fn from_horizontal(horizontal: bool) -> Self {
        if horizontal {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

/// Minimal display capabilities the frame renderer needs from the host UI
pub trait Surface {
    /// Removes every element from the container
    fn clear(&mut self);
    fn set_visible(&mut self, visible: bool);
    fn set_orientation(&mut self, orientation: Orientation);
    /// Appends an element and returns its index within the container
    fn append(&mut self, element: Element) -> usize;
    fn set_width_percent(&mut self, index: usize, percent: f32);
}
