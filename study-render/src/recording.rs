use crate::surface::{Element, Orientation, Surface};

/// Operation log entry of a [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    Clear,
    SetVisible(bool),
    SetOrientation(Orientation),
    Append(Element),
    SetWidth { index: usize, percent: f32 },
}

/// Headless surface that keeps the container state and every operation applied to it
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    ops: Vec<SurfaceOp>,
    elements: Vec<(Element, f32)>,
    visible: bool,
    orientation: Orientation,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    /// Elements currently in the container with their width percentage
    pub fn elements(&self) -> &[(Element, f32)] {
        &self.elements
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Number of times the container was refilled and shown
    pub fn frames_rendered(&self) -> usize {
        self.ops
            .windows(2)
            .filter(|w| matches!(w, [SurfaceOp::Clear, SurfaceOp::SetVisible(true)]))
            .count()
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self) {
        self.elements.clear();
        self.ops.push(SurfaceOp::Clear);
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.ops.push(SurfaceOp::SetVisible(visible));
    }

    fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
        self.ops.push(SurfaceOp::SetOrientation(orientation));
    }

    fn append(&mut self, element: Element) -> usize {
        self.ops.push(SurfaceOp::Append(element.clone()));
        self.elements.push((element, 100.0));
        self.elements.len() - 1
    }

    fn set_width_percent(&mut self, index: usize, percent: f32) {
        if let Some((_, width)) = self.elements.get_mut(index) {
            *width = percent;
        }
        self.ops.push(SurfaceOp::SetWidth { index, percent });
    }
}
