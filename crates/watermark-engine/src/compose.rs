//! Full render pass: filtered base image plus every watermark layer.
//!
//! `render` is a pure function of its inputs. Nothing is cached between
//! calls, so callers re-run it on every edit.

use image::{DynamicImage, RgbaImage};
use tracing::{debug, info};

use crate::filter::Filter;
use crate::layer::WatermarkLayer;
use crate::sizing::{RenderSize, scale_to_surface};
use crate::surface::{Shadow, Surface};
use crate::text::{FontBook, TextMask, resolve_font_family};
use crate::tiling::compute_tile_grid;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("No font available to draw '{family}' text")]
    NoFont { family: String },

    #[error("Render target has zero size ({width}x{height})")]
    EmptyTarget { width: u32, height: u32 },
}

/// Everything a render pass reads.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub image: &'a DynamicImage,
    pub size: RenderSize,
    pub layers: &'a [WatermarkLayer],
    pub filter: Filter,
    pub fonts: &'a FontBook,
}

/// Composite the base image and all layers into a new RGBA buffer of
/// exactly `request.size`.
pub fn render(request: &RenderRequest<'_>) -> Result<RgbaImage, RenderError> {
    let RenderSize { width, height } = request.size;
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyTarget { width, height });
    }

    let mut surface = Surface::new(request.size);
    surface.clear();

    {
        // The scaled copy lives only for this block.
        let mut base = scale_to_surface(request.image, request.size);
        request.filter.apply(&mut base);
        surface.draw_image(&base);
    }

    for (index, layer) in request.layers.iter().enumerate() {
        draw_layer(&mut surface, layer, request.fonts)?;
        debug!(index, id = %layer.id, "Layer composited");
    }

    info!(
        width,
        height,
        layers = request.layers.len(),
        filter = %request.filter,
        "Render pass complete"
    );
    Ok(surface.into_image())
}

fn draw_layer(
    surface: &mut Surface,
    layer: &WatermarkLayer,
    fonts: &FontBook,
) -> Result<(), RenderError> {
    if layer.text.is_empty() {
        debug!(id = %layer.id, "Empty watermark text, nothing to draw");
        return Ok(());
    }

    surface.set_global_alpha(layer.effective_opacity());

    let family = resolve_font_family(&layer.font_family);
    let font = fonts.face_for(family).ok_or_else(|| RenderError::NoFont {
        family: family.to_string(),
    })?;

    let Some(mask) = TextMask::rasterize(font, layer.effective_font_size() as f32, &layer.text)
    else {
        debug!(id = %layer.id, "Watermark text has no visible glyphs");
        return Ok(());
    };

    let shadow = layer.shadow_enabled.then(|| Shadow {
        color: layer.shadow_color.to_rgba(),
        blur: layer.effective_shadow_blur() as f32,
        offset_x: layer.shadow_offset_x as f32,
        offset_y: layer.shadow_offset_y as f32,
    });
    let shadow_mask = shadow
        .filter(Shadow::is_visible)
        .map(|s| mask.blurred(s.blur));

    let color = layer.color.to_rgba();
    let radians = (layer.effective_rotation() as f32).to_radians();
    let grid = compute_tile_grid(surface.width() as f32, surface.height() as f32, layer.density);

    debug!(
        id = %layer.id,
        family,
        tiles = grid.anchors.len(),
        step_x = grid.step_x,
        step_y = grid.step_y,
        "Drawing watermark tiles"
    );

    for anchor in &grid.anchors {
        surface.save();
        surface.translate(anchor.x, anchor.y);
        surface.rotate(radians);
        surface.set_shadow(shadow);
        if let Some(shadow_mask) = &shadow_mask {
            surface.draw_shadow(shadow_mask);
        }
        surface.fill_mask(&mask, color);
        surface.restore();
    }

    // Opacity belongs to this layer only.
    surface.set_global_alpha(1.0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn base_image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([200, 100, 50, 255])))
    }

    fn empty_text_layer() -> WatermarkLayer {
        WatermarkLayer::default().with_text("")
    }

    #[test]
    fn output_matches_render_size() {
        let image = base_image(80, 60);
        let fonts = FontBook::new();
        let layers = [empty_text_layer()];
        let out = render(&RenderRequest {
            image: &image,
            size: RenderSize::new(40, 30),
            layers: &layers,
            filter: Filter::None,
            fonts: &fonts,
        })
        .unwrap();
        assert_eq!(out.dimensions(), (40, 30));
    }

    #[test]
    fn empty_text_draws_only_the_base() {
        let image = base_image(10, 10);
        let fonts = FontBook::new();
        let layers = [empty_text_layer()];
        let out = render(&RenderRequest {
            image: &image,
            size: RenderSize::new(10, 10),
            layers: &layers,
            filter: Filter::None,
            fonts: &fonts,
        })
        .unwrap();
        assert!(out.pixels().all(|p| p.0 == [200, 100, 50, 255]));
    }

    #[test]
    fn filter_touches_the_base_image() {
        let image = base_image(10, 10);
        let fonts = FontBook::new();
        let layers = [empty_text_layer()];
        let out = render(&RenderRequest {
            image: &image,
            size: RenderSize::new(10, 10),
            layers: &layers,
            filter: Filter::Invert,
            fonts: &fonts,
        })
        .unwrap();
        assert_eq!(out.get_pixel(3, 3).0, [55, 155, 205, 255]);
    }

    #[test]
    fn missing_font_is_an_error() {
        let image = base_image(10, 10);
        let fonts = FontBook::new();
        let layers = [WatermarkLayer::default()];
        let err = render(&RenderRequest {
            image: &image,
            size: RenderSize::new(10, 10),
            layers: &layers,
            filter: Filter::None,
            fonts: &fonts,
        })
        .unwrap_err();
        assert!(matches!(err, RenderError::NoFont { ref family } if family == "Inter"));
    }

    #[test]
    fn zero_size_target_is_rejected() {
        let image = base_image(10, 10);
        let fonts = FontBook::new();
        let layers = [empty_text_layer()];
        let err = render(&RenderRequest {
            image: &image,
            size: RenderSize::new(0, 10),
            layers: &layers,
            filter: Filter::None,
            fonts: &fonts,
        })
        .unwrap_err();
        assert!(matches!(err, RenderError::EmptyTarget { .. }));
    }
}
