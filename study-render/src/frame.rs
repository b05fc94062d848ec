use crate::surface::{Element, Orientation, Surface};
use study_core::{StimulusKind, StimulusToken, classify};
use tracing::trace;

/// An element together with its share of the container's main axis
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub element: Element,
    pub width_percent: f32,
}

pub fn element_for(token: &str) -> Element {
    match classify(token) {
        StimulusKind::Image => Element::Image {
            src: token.to_string(),
        },
        kind => Element::Text {
            content: token.to_string(),
            word: kind == StimulusKind::Word,
        },
    }
}

/// Lays out a frame's items so they partition the container evenly,
/// whatever the mix of images and text.
pub fn layout(items: &[StimulusToken]) -> Vec<Placement> {
    if items.is_empty() {
        return Vec::new();
    }
    let share = 100.0 / items.len() as f32;
    items
        .iter()
        .map(|token| Placement {
            element: element_for(token),
            width_percent: share,
        })
        .collect()
}

/// Paints frames onto a [`Surface`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameRenderer {
    orientation: Orientation,
}

impl FrameRenderer {
    pub fn new(horizontal: bool) -> Self {
        Self {
            orientation: Orientation::from_horizontal(horizontal),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Prepares an empty container for a new trial
    pub fn mount<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.clear();
        surface.set_orientation(self.orientation);
    }

    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S, items: &[StimulusToken]) {
        surface.clear();
        surface.set_visible(true);
        let placements = layout(items);
        let indices: Vec<usize> = placements
            .iter()
            .map(|p| surface.append(p.element.clone()))
            .collect();
        for (index, placement) in indices.into_iter().zip(&placements) {
            surface.set_width_percent(index, placement.width_percent);
        }
        trace!(items = items.len(), "frame rendered");
    }

    pub fn clear<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.clear();
    }

    /// Hides the container without discarding its content
    pub fn hide<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.set_visible(false);
    }

    pub fn show<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.set_visible(true);
    }
}
