use crate::Atom;
use crate::assets::ImageAssets;
use crate::error::RenderError;
use crate::surface::{Element, Orientation, Surface};
use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{
    Color, FilterQuality, Pixmap, PixmapPaint, PremultipliedColorU8, Rect, Transform,
};
use tracing::warn;

const WORD_SIZE_PX: f32 = 64.0;
const PHRASE_SIZE_PX: f32 = 40.0;
const IMAGE_FILL: f32 = 0.9;

struct TextCache {
    font: FontVec,
    // keyed by token and whether it is styled as a single word
    map: HashMap<(Atom, bool), Arc<Pixmap>>,
}

impl TextCache {
    fn new(font: FontVec) -> Self {
        Self {
            font,
            map: HashMap::new(),
        }
    }

    fn get_or_render(&mut self, content: &str, word: bool) -> Option<Arc<Pixmap>> {
        let key = (Atom::from(content), word);
        if let Some(p) = self.map.get(&key) {
            return Some(Arc::clone(p));
        }
        let size = if word { WORD_SIZE_PX } else { PHRASE_SIZE_PX };
        let pm = Arc::new(render_text_pixmap(
            content,
            size,
            &self.font,
            Color::from_rgba8(255, 255, 255, 255),
        )?);
        self.map.insert(key, Arc::clone(&pm));
        Some(pm)
    }
}

/// Rasterizes a line of text into a tightly cropped, premultiplied pixmap.
/// Returns `None` when no glyph has an outline (e.g. whitespace only).
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Color,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // 1) Layout with baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    // 2) Union pixel bounds from outlined glyphs
    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    if outlines.is_empty() {
        return None;
    }
    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;

    // 3) Transparent pixmap; coverage is accumulated per pixel
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.pixels_mut();
    let cu = color.to_color_u8();

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            // Porter-Duff over in premultiplied space
            let a_src = (cov * cu.alpha() as f32 / 255.0).clamp(0.0, 1.0);
            let bg = dst[i];
            let inv = 1.0 - a_src;
            let blend = |s: u8, d: u8| {
                (s as f32 * a_src + d as f32 * inv).round().clamp(0.0, 255.0) as u8
            };
            let a = blend(255, bg.alpha());
            let r = blend(cu.red(), bg.red()).min(a);
            let g = blend(cu.green(), bg.green()).min(a);
            let bl = blend(cu.blue(), bg.blue()).min(a);
            if let Some(px) = PremultipliedColorU8::from_rgba(r, g, bl, a) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}

/// Main-axis slots of `shares` (percentages) within a `width` x `height` container
pub fn slot_rects(width: u32, height: u32, orientation: Orientation, shares: &[f32]) -> Vec<Rect> {
    let (w, h) = (width as f32, height as f32);
    let main = match orientation {
        Orientation::Horizontal => w,
        Orientation::Vertical => h,
    };
    let mut offset = 0.0f32;
    shares
        .iter()
        .filter_map(|share| {
            let len = main * share / 100.0;
            let rect = match orientation {
                Orientation::Horizontal => Rect::from_xywh(offset, 0.0, len, h),
                Orientation::Vertical => Rect::from_xywh(0.0, offset, w, len),
            };
            offset += len;
            rect
        })
        .collect()
}

/// Software display surface backed by a tiny-skia canvas
pub struct SkiaSurface {
    width: u32,
    height: u32,
    canvas: Pixmap,
    text_cache: Option<TextCache>,
    assets: ImageAssets,

    elements: Vec<(Element, f32)>,
    visible: bool,
    orientation: Orientation,
    dirty: bool,
}

impl SkiaSurface {
    pub fn new(width: u32, height: u32, assets: ImageAssets) -> Result<Self, RenderError> {
        Ok(Self {
            width,
            height,
            canvas: Self::blank_canvas(width, height)?,
            text_cache: None,
            assets,
            elements: Vec::new(),
            visible: false,
            orientation: Orientation::default(),
            dirty: true,
        })
    }

    pub fn with_font(mut self, font: FontVec) -> Self {
        self.text_cache = Some(TextCache::new(font));
        self.dirty = true;
        self
    }

    pub fn load_font(path: &Path) -> Result<FontVec, RenderError> {
        let bytes = std::fs::read(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(FontVec::try_from_vec(bytes)?)
    }

    fn blank_canvas(width: u32, height: u32) -> Result<Pixmap, RenderError> {
        let mut canvas =
            Pixmap::new(width, height).ok_or(RenderError::Canvas { width, height })?;
        canvas.fill(Color::from_rgba8(0, 0, 0, 255));
        Ok(canvas)
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<(), RenderError> {
        self.canvas = Self::blank_canvas(new_width, new_height)?;
        self.width = new_width;
        self.height = new_height;
        self.dirty = true;
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Redraws the canvas if the container changed since the last call
    pub fn compose(&mut self) -> &Pixmap {
        if self.dirty {
            self.canvas.fill(Color::from_rgba8(0, 0, 0, 255));
            if self.visible {
                self.draw_elements();
            }
            self.dirty = false;
        }
        &self.canvas
    }

    fn draw_elements(&mut self) {
        let shares: Vec<f32> = self.elements.iter().map(|(_, share)| *share).collect();
        let slots = slot_rects(self.width, self.height, self.orientation, &shares);
        for ((element, _), slot) in self.elements.iter().zip(slots) {
            match element {
                Element::Image { src } => match self.assets.get(src) {
                    Some(pm) => draw_scaled(&mut self.canvas, &pm, slot),
                    None => warn!(src = src.as_str(), "image was not preloaded"),
                },
                Element::Text { content, word } => {
                    let Some(cache) = self.text_cache.as_mut() else {
                        warn!(content = content.as_str(), "no font loaded; text skipped");
                        continue;
                    };
                    if let Some(pm) = cache.get_or_render(content, *word) {
                        draw_centered(&mut self.canvas, &pm, slot);
                    }
                }
            }
        }
    }
}

fn draw_centered(canvas: &mut Pixmap, src: &Pixmap, slot: Rect) {
    let x = slot.x() + (slot.width() - src.width() as f32) * 0.5;
    let y = slot.y() + (slot.height() - src.height() as f32) * 0.5;
    canvas.draw_pixmap(
        x.round() as i32,
        y.round() as i32,
        src.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
}

// Fits the image inside its slot, preserving aspect ratio and never upscaling.
fn draw_scaled(canvas: &mut Pixmap, src: &Pixmap, slot: Rect) {
    let (iw, ih) = (src.width() as f32, src.height() as f32);
    let fit = (slot.width() * IMAGE_FILL / iw).min(slot.height() * IMAGE_FILL / ih);
    let scale = fit.min(1.0);
    if scale <= 0.0 {
        return;
    }
    let tx = slot.x() + (slot.width() - iw * scale) * 0.5;
    let ty = slot.y() + (slot.height() - ih * scale) * 0.5;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    canvas.draw_pixmap(
        0,
        0,
        src.as_ref(),
        &paint,
        Transform::from_scale(scale, scale).post_translate(tx, ty),
        None,
    );
}

impl Surface for SkiaSurface {
    fn clear(&mut self) {
        self.elements.clear();
        self.dirty = true;
    }

    fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.dirty = true;
        }
    }

    fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
        self.dirty = true;
    }

    fn append(&mut self, element: Element) -> usize {
        self.elements.push((element, 100.0));
        self.dirty = true;
        self.elements.len() - 1
    }

    fn set_width_percent(&mut self, index: usize, percent: f32) {
        if let Some((_, share)) = self.elements.get_mut(index) {
            *share = percent;
            self.dirty = true;
        }
    }
}
