pub mod assets;
pub mod error;
pub mod frame;
pub mod recording;
pub mod render;
pub mod surface;

/// Interned stimulus token, the key of the image and text caches
pub type Atom = string_cache::DefaultAtom;

pub use assets::ImageAssets;
pub use error::RenderError;
pub use frame::{FrameRenderer, Placement, element_for, layout};
pub use recording::{RecordingSurface, SurfaceOp};
pub use render::SkiaSurface;
pub use surface::{Element, Orientation, Surface};
