//! Tiled text watermark engine.
//!
//! Computes brick-laid tile grids, sizes the render target to the
//! container, and composites filtered base images with any number of
//! independently styled text layers.

pub mod compose;
pub mod export;
pub mod filter;
pub mod layer;
pub mod loader;
pub mod sizing;
pub mod surface;
pub mod text;
pub mod tiling;

// Re-exports for convenience
pub use compose::{RenderError, RenderRequest, render};
pub use export::{EXPORT_PREFIX, ExportError, encode_png, export_file_name, write_png};
pub use filter::Filter;
pub use layer::{Color, LayerError, LayerStack, LayerUpdate, RemoveOutcome, WatermarkLayer};
pub use loader::{DecodedImage, ImageLoader, LoadError, LoadOutcome, LoadTicket, decode_image};
pub use sizing::{RenderSize, SizingError, fit_to_container, scale_to_surface};
pub use surface::{Affine, Shadow, Surface};
pub use text::{DEFAULT_FAMILY, FontBook, FontError, TextMask, resolve_font_family};
pub use tiling::{TileAnchor, TileGrid, compute_tile_grid};
