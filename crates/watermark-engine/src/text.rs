//! Font lookup and single-line glyph rasterization.
//!
//! Text is rasterized once per layer into a coverage mask; every tile then
//! samples that mask through its own transform.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use image::{GrayImage, Luma};
use tracing::{debug, info, warn};

/// Family used when an identifier is not in the lookup table.
pub const DEFAULT_FAMILY: &str = "Inter";

/// Closed identifier -> family table.
pub const FONT_FAMILIES: &[(&str, &str)] = &[
    ("font-inter", "Inter"),
    ("font-montserrat", "Montserrat"),
    ("font-lobster", "Lobster"),
    ("font-roboto-mono", "Roboto Mono"),
    ("font-playfair-display", "Playfair Display"),
];

const VALID_EXTENSIONS: &[&str] = &["ttf", "otf"];

/// Largest shadow blur [`TextMask::blurred`] will apply.
pub const MAX_BLUR: f32 = 60.0;

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("Invalid font data in {0} (only TTF/OTF supported)")]
    InvalidFormat(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve a font identifier to its family name.
pub fn resolve_font_family(identifier: &str) -> &'static str {
    FONT_FAMILIES
        .iter()
        .find(|(id, _)| *id == identifier)
        .map(|(_, family)| *family)
        .unwrap_or(DEFAULT_FAMILY)
}

/// Parsed faces keyed by family name, plus a fallback face.
#[derive(Clone, Default)]
pub struct FontBook {
    faces: BTreeMap<String, FontArc>,
    fallback: Option<FontArc>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.faces.keys().collect::<Vec<_>>())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the (bold) face for a family.
    pub fn insert(&mut self, family: impl Into<String>, font: FontArc) {
        self.faces.insert(family.into(), font);
    }

    /// Builder: set the face used for families with no registered font.
    pub fn with_fallback(mut self, font: FontArc) -> Self {
        self.fallback = Some(font);
        self
    }

    pub fn set_fallback(&mut self, font: FontArc) {
        self.fallback = Some(font);
    }

    /// Parse a TTF/OTF file.
    pub fn load_file(path: &Path) -> Result<FontArc, FontError> {
        let data = std::fs::read(path)?;
        FontArc::try_from_vec(data).map_err(|_| FontError::InvalidFormat(path.to_path_buf()))
    }

    /// Register faces for every known family found in `dir`.
    ///
    /// A file belongs to a family when its compacted stem starts with the
    /// compacted family name (`RobotoMono-Bold.ttf` -> "Roboto Mono"). Bold
    /// files win over other weights. Returns the number of families loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, FontError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_font_extension(path))
            .collect();
        files.sort();

        let mut loaded = 0;
        for (_, family) in FONT_FAMILIES {
            let key = compact(family);
            let candidates: Vec<&PathBuf> = files
                .iter()
                .filter(|path| stem_of(path).starts_with(&key))
                .collect();
            let chosen = candidates
                .iter()
                .find(|path| stem_of(path).contains("bold"))
                .or_else(|| candidates.first());

            let Some(path) = chosen else {
                debug!(family, dir = %dir.display(), "No font file for family");
                continue;
            };
            match Self::load_file(path) {
                Ok(font) => {
                    info!(family, path = %path.display(), "Loaded watermark font");
                    self.insert(*family, font);
                    loaded += 1;
                }
                Err(e) => warn!(family, path = %path.display(), "Skipping font: {e}"),
            }
        }
        Ok(loaded)
    }

    /// Face for `family`, else the default family, else the fallback.
    pub fn face_for(&self, family: &str) -> Option<&FontArc> {
        self.faces
            .get(family)
            .or_else(|| self.faces.get(DEFAULT_FAMILY))
            .or(self.fallback.as_ref())
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.faces.contains_key(family)
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty() && self.fallback.is_none()
    }
}

fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VALID_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(compact)
        .unwrap_or_default()
}

/// Lowercase with everything but letters and digits removed.
fn compact(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Coverage mask of one line of text and the point that sits on the anchor.
///
/// The origin is the horizontal center of the advance width and the
/// middle of the em square (half the font size above the baseline), in
/// mask pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMask {
    coverage: GrayImage,
    origin_x: f32,
    origin_y: f32,
}

impl TextMask {
    /// Build a mask from raw coverage and an origin.
    pub fn from_coverage(coverage: GrayImage, origin_x: f32, origin_y: f32) -> Self {
        Self {
            coverage,
            origin_x,
            origin_y,
        }
    }

    /// Rasterize `text` with an em size of `px` pixels. Returns `None` when
    /// nothing would be visible (empty or whitespace-only text).
    pub fn rasterize(font: &impl Font, px: f32, text: &str) -> Option<Self> {
        let scale = em_scale(font, px);
        let scaled = font.as_scaled(scale);
        let ascent = scaled.ascent();

        let mut caret = 0.0f32;
        let mut prev: Option<GlyphId> = None;
        let mut outlined = Vec::new();
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = prev {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, ascent));
            caret += scaled.h_advance(id);
            prev = Some(id);
            if let Some(g) = font.outline_glyph(glyph) {
                outlined.push(g);
            }
        }

        let mut bounds = outlined.first()?.px_bounds();
        for g in &outlined[1..] {
            let b = g.px_bounds();
            bounds.min.x = bounds.min.x.min(b.min.x);
            bounds.min.y = bounds.min.y.min(b.min.y);
            bounds.max.x = bounds.max.x.max(b.max.x);
            bounds.max.y = bounds.max.y.max(b.max.y);
        }

        let width = (bounds.max.x - bounds.min.x).ceil().max(1.0) as u32;
        let height = (bounds.max.y - bounds.min.y).ceil().max(1.0) as u32;
        let mut coverage = GrayImage::new(width, height);

        for g in &outlined {
            let b = g.px_bounds();
            let ox = (b.min.x - bounds.min.x).round() as i64;
            let oy = (b.min.y - bounds.min.y).round() as i64;
            g.draw(|gx, gy, c| {
                let x = ox + i64::from(gx);
                let y = oy + i64::from(gy);
                if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
                    return;
                }
                let cell = coverage.get_pixel_mut(x as u32, y as u32);
                let sum = f32::from(cell.0[0]) + c.clamp(0.0, 1.0) * 255.0;
                cell.0[0] = sum.round().min(255.0) as u8;
            });
        }

        let origin_x = caret / 2.0 - bounds.min.x;
        // baseline sits at y = ascent in layout space
        let origin_y = ascent - px / 2.0 - bounds.min.y;

        debug!(
            chars = text.chars().count(),
            px,
            width,
            height,
            "Rasterized watermark text"
        );

        Some(Self {
            coverage,
            origin_x,
            origin_y,
        })
    }

    /// Gaussian-blurred copy for shadows, padded so the blur is not clipped.
    ///
    /// `blur` follows the canvas convention: sigma is half the blur value.
    /// Values above [`MAX_BLUR`] are treated as `MAX_BLUR`.
    pub fn blurred(&self, blur: f32) -> Self {
        if blur.is_nan() || blur <= 0.0 {
            return self.clone();
        }
        let sigma = blur.min(MAX_BLUR) / 2.0;
        let pad = (sigma * 3.0).ceil() as u32;
        let mut padded = GrayImage::from_pixel(
            self.coverage.width().saturating_add(pad.saturating_mul(2)),
            self.coverage.height().saturating_add(pad.saturating_mul(2)),
            Luma([0]),
        );
        image::imageops::replace(&mut padded, &self.coverage, i64::from(pad), i64::from(pad));
        let coverage = imageproc::filter::gaussian_blur_f32(&padded, sigma);

        Self {
            coverage,
            origin_x: self.origin_x + pad as f32,
            origin_y: self.origin_y + pad as f32,
        }
    }

    pub fn width(&self) -> u32 {
        self.coverage.width()
    }

    pub fn height(&self) -> u32 {
        self.coverage.height()
    }

    pub fn origin(&self) -> (f32, f32) {
        (self.origin_x, self.origin_y)
    }

    pub fn coverage(&self) -> &GrayImage {
        &self.coverage
    }

    /// Bilinear coverage (0..=1) at continuous mask coordinates, where
    /// pixel centers sit on integers. Zero outside the mask.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let at = |x: i64, y: i64| -> f32 {
            if x < 0 || y < 0 || x >= i64::from(self.width()) || y >= i64::from(self.height()) {
                0.0
            } else {
                f32::from(self.coverage.get_pixel(x as u32, y as u32).0[0]) / 255.0
            }
        };

        let top = at(x0, y0) * (1.0 - fx) + at(x0 + 1, y0) * fx;
        let bottom = at(x0, y0 + 1) * (1.0 - fx) + at(x0 + 1, y0 + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

/// `PxScale` whose em square is `px` pixels tall.
fn em_scale(font: &impl Font, px: f32) -> PxScale {
    match font.units_per_em() {
        Some(upem) if upem > 0.0 => PxScale::from(px * font.height_unscaled() / upem),
        _ => PxScale::from(px),
    }
}
