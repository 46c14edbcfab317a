//! RGBA drawing surface with an explicit save/restore state stack.
//!
//! The surface mirrors the subset of a 2D canvas the compositor needs:
//! a current transform, global alpha and shadow, pushed and popped around
//! each tile so nothing leaks from one tile to the next.

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::sizing::RenderSize;
use crate::text::TextMask;

/// 2D affine transform in canvas order: `x' = a*x + c*y + e`,
/// `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// `self * other`: `other` is applied to points first.
    pub fn then_local(&self, other: &Affine) -> Affine {
        Affine {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn translation(tx: f32, ty: f32) -> Affine {
        Affine {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    pub fn rotation(radians: f32) -> Affine {
        let (sin, cos) = radians.sin_cos();
        Affine {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn invert(&self) -> Option<Affine> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Affine {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            e: (self.c * self.f - self.d * self.e) * inv,
            f: (self.b * self.e - self.a * self.f) * inv,
        })
    }
}

/// Drop shadow parameters. Offsets are in device pixels and are not
/// affected by the current transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: Rgba<u8>,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Shadow {
    /// A shadow is only drawn when it could be visible.
    pub fn is_visible(&self) -> bool {
        self.color.0[3] > 0 && (self.blur > 0.0 || self.offset_x != 0.0 || self.offset_y != 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DrawState {
    transform: Affine,
    global_alpha: f32,
    shadow: Option<Shadow>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            global_alpha: 1.0,
            shadow: None,
        }
    }
}

/// Pixel buffer plus drawing state.
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
    state: DrawState,
    stack: Vec<DrawState>,
}

impl Surface {
    /// A fully transparent surface.
    pub fn new(size: RenderSize) -> Self {
        Self {
            pixels: RgbaImage::new(size.width, size.height),
            state: DrawState::default(),
            stack: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> RenderSize {
        RenderSize::new(self.width(), self.height())
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            pixel.0 = [0, 0, 0, 0];
        }
    }

    pub fn save(&mut self) {
        self.stack.push(self.state);
    }

    /// Pop the last saved state. Restoring with an empty stack is a no-op.
    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    /// Number of saved states.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn translate(&mut self, tx: f32, ty: f32) {
        self.state.transform = self
            .state
            .transform
            .then_local(&Affine::translation(tx, ty));
    }

    pub fn rotate(&mut self, radians: f32) {
        self.state.transform = self.state.transform.then_local(&Affine::rotation(radians));
    }

    pub fn transform(&self) -> Affine {
        self.state.transform
    }

    pub fn set_global_alpha(&mut self, alpha: f32) {
        self.state.global_alpha = if alpha.is_nan() {
            0.0
        } else {
            alpha.clamp(0.0, 1.0)
        };
    }

    pub fn global_alpha(&self) -> f32 {
        self.state.global_alpha
    }

    pub fn set_shadow(&mut self, shadow: Option<Shadow>) {
        self.state.shadow = shadow;
    }

    pub fn shadow(&self) -> Option<Shadow> {
        self.state.shadow
    }

    /// Draw an image of the same size at the origin, ignoring the transform.
    pub fn draw_image(&mut self, img: &RgbaImage) {
        let alpha = self.state.global_alpha;
        for (x, y, src) in img.enumerate_pixels() {
            if x < self.pixels.width() && y < self.pixels.height() {
                let sa = f32::from(src.0[3]) / 255.0 * alpha;
                let dst = self.pixels.get_pixel_mut(x, y);
                *dst = blend_over(dst, src, sa);
            }
        }
    }

    /// Draw the current shadow using `mask` (usually a blurred copy of the
    /// text mask). No-op when no visible shadow is set.
    pub fn draw_shadow(&mut self, mask: &TextMask) {
        let Some(shadow) = self.state.shadow.filter(Shadow::is_visible) else {
            return;
        };
        let mut transform = self.state.transform;
        transform.e += shadow.offset_x;
        transform.f += shadow.offset_y;
        self.composite(mask, &transform, shadow.color);
    }

    /// Fill `mask` with `color`, its origin placed at the local origin of
    /// the current transform.
    pub fn fill_mask(&mut self, mask: &TextMask, color: Rgba<u8>) {
        let transform = self.state.transform;
        self.composite(mask, &transform, color);
    }

    fn composite(&mut self, mask: &TextMask, transform: &Affine, color: Rgba<u8>) {
        let color_alpha = f32::from(color.0[3]) / 255.0 * self.state.global_alpha;
        if color_alpha <= 0.0 {
            return;
        }
        let Some(inverse) = transform.invert() else {
            debug!(?transform, "Skipping fill with a singular transform");
            return;
        };

        let (ox, oy) = mask.origin();
        let (w, h) = (mask.width() as f32, mask.height() as f32);
        let corners = [
            transform.apply(-ox, -oy),
            transform.apply(w - ox, -oy),
            transform.apply(-ox, h - oy),
            transform.apply(w - ox, h - oy),
        ];
        let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max);

        let x_start = min_x.floor().max(0.0) as u32;
        let y_start = min_y.floor().max(0.0) as u32;
        let x_end = (max_x.ceil().max(0.0) as u32).min(self.pixels.width());
        let y_end = (max_y.ceil().max(0.0) as u32).min(self.pixels.height());

        for y in y_start..y_end {
            for x in x_start..x_end {
                let (lx, ly) = inverse.apply(x as f32 + 0.5, y as f32 + 0.5);
                let coverage = mask.sample(lx + ox - 0.5, ly + oy - 0.5);
                if coverage <= 0.0 {
                    continue;
                }
                let dst = self.pixels.get_pixel_mut(x, y);
                *dst = blend_over(dst, &color, coverage * color_alpha);
            }
        }
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }
}

/// Source-over blend of `src` (its color channels, with effective alpha
/// `alpha`) onto `dst`.
fn blend_over(dst: &Rgba<u8>, src: &Rgba<u8>, alpha: f32) -> Rgba<u8> {
    if alpha <= 0.0 {
        return *dst;
    }
    if alpha >= 1.0 {
        return Rgba([src[0], src[1], src[2], 255]);
    }

    let da = f32::from(dst[3]) / 255.0;
    let inv = 1.0 - alpha;
    let out_a = alpha + da * inv;
    let channel = |s: u8, d: u8| {
        ((f32::from(s) * alpha + f32::from(d) * da * inv) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
