use crate::Atom;
use crate::error::RenderError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{IntSize, Pixmap};
use tracing::debug;

/// Decoded image stimuli, keyed by the token that references them
#[derive(Debug, Clone, Default)]
pub struct ImageAssets {
    images: HashMap<Atom, Arc<Pixmap>>,
}

impl ImageAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: &str, pixmap: Pixmap) {
        self.images.insert(Atom::from(token), Arc::new(pixmap));
    }

    pub fn get(&self, token: &str) -> Option<Arc<Pixmap>> {
        self.images.get(&Atom::from(token)).cloned()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.images.contains_key(&Atom::from(token))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Reads and decodes `token`, resolved against `base_dir` when relative.
    /// Tokens already loaded are skipped.
    pub fn load(&mut self, token: &str, base_dir: &Path) -> Result<(), RenderError> {
        if self.contains(token) {
            return Ok(());
        }
        let path = base_dir.join(token);
        let bytes = std::fs::read(&path).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        let pixmap = decode_pixmap(token, &bytes)?;
        debug!(token, width = pixmap.width(), height = pixmap.height(), "image preloaded");
        self.insert(token, pixmap);
        Ok(())
    }
}

/// Decodes an encoded image into a premultiplied pixmap
pub fn decode_pixmap(token: &str, bytes: &[u8]) -> Result<Pixmap, RenderError> {
    let image = image::load_from_memory(bytes)
        .map_err(|source| RenderError::Image {
            token: token.to_string(),
            source,
        })?
        .into_rgba8();
    let (width, height) = image.dimensions();
    let mut data = image.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
    IntSize::from_wh(width, height)
        .and_then(|size| Pixmap::from_vec(data, size))
        .ok_or(RenderError::Canvas { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encoded_png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decoding_premultiplies_alpha() {
        let bytes = encoded_png(3, 2, [200, 100, 50, 128]);
        let pixmap = decode_pixmap("half.png", &bytes).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (3, 2));
        let px = pixmap.pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert_eq!(px.red(), 100);
    }

    #[test]
    fn corrupt_image_is_an_error() {
        let err = decode_pixmap("bad.png", b"not an image").unwrap_err();
        assert!(matches!(err, RenderError::Image { ref token, .. } if token == "bad.png"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut assets = ImageAssets::new();
        let err = assets
            .load("definitely-missing.png", Path::new("/nonexistent"))
            .unwrap_err();
        assert!(matches!(err, RenderError::Io { .. }));
        assert!(assets.is_empty());
    }

    #[test]
    fn inserted_assets_are_shared() {
        let mut assets = ImageAssets::new();
        assets.insert("cat.jpg", Pixmap::new(4, 4).unwrap());
        assert!(assets.contains("cat.jpg"));
        let a = assets.get("cat.jpg").unwrap();
        let b = assets.get("cat.jpg").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(assets.len(), 1);
    }
}
