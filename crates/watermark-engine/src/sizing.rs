//! Render-target sizing and base image scaling.
//!
//! The target keeps the source aspect ratio and fits inside the container
//! on both axes. Width is tried first; if the derived height overflows,
//! height becomes the constraint instead.

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use tracing::debug;

/// Errors raised while sizing a render target.
#[derive(Debug, thiserror::Error)]
pub enum SizingError {
    #[error("Image has zero size ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Container has no usable area ({width}x{height})")]
    EmptyContainer { width: u32, height: u32 },
}

/// Pixel dimensions of the output raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Fit an `image_w` x `image_h` image into a `box_w` x `box_h` container.
///
/// Fractional pixels are truncated, and each side is at least 1.
pub fn fit_to_container(
    image_w: u32,
    image_h: u32,
    box_w: u32,
    box_h: u32,
) -> Result<RenderSize, SizingError> {
    if image_w == 0 || image_h == 0 {
        return Err(SizingError::EmptyImage {
            width: image_w,
            height: image_h,
        });
    }
    if box_w == 0 || box_h == 0 {
        return Err(SizingError::EmptyContainer {
            width: box_w,
            height: box_h,
        });
    }

    let (iw, ih) = (f64::from(image_w), f64::from(image_h));
    let mut width = f64::from(box_w);
    // Multiply before dividing so exact ratios stay exact.
    let mut height = width * ih / iw;

    if height > f64::from(box_h) {
        height = f64::from(box_h);
        width = height * iw / ih;
    }

    let size = RenderSize {
        width: (width.floor() as u32).max(1),
        height: (height.floor() as u32).max(1),
    };

    debug!(
        image_w,
        image_h,
        box_w,
        box_h,
        width = size.width,
        height = size.height,
        "Fitted render target to container"
    );

    Ok(size)
}

/// Scale an image to exactly fill `size`.
///
/// Uses Lanczos3 filtering. Returns a plain RGBA copy when the image
/// already has the target dimensions.
pub fn scale_to_surface(img: &DynamicImage, size: RenderSize) -> RgbaImage {
    let (orig_w, orig_h) = (img.width(), img.height());

    if orig_w == size.width && orig_h == size.height {
        debug!(
            width = size.width,
            height = size.height,
            "Image already at target size, skipping resize"
        );
        return img.to_rgba8();
    }

    debug!(
        orig_w,
        orig_h,
        new_width = size.width,
        new_height = size.height,
        "Scaling image to render target"
    );

    img.resize_exact(size.width, size.height, FilterType::Lanczos3)
        .to_rgba8()
}
