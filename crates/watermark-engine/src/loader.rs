//! Image decoding and stale-result protection.
//!
//! Decoding may finish out of order when the user picks several files in
//! quick succession. Every request takes a [`LoadTicket`] from the
//! [`ImageLoader`]; only the ticket from the latest request is applied.

use std::sync::atomic::{AtomicU64, Ordering};

use image::DynamicImage;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Image data is empty")]
    Empty,

    #[error("Failed to decode image: {0}")]
    Decode(String),
}

/// Decode raw file bytes in any format the `image` crate recognises.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, LoadError> {
    if bytes.is_empty() {
        return Err(LoadError::Empty);
    }
    let img = image::load_from_memory(bytes).map_err(|e| LoadError::Decode(e.to_string()))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(LoadError::Decode(format!(
            "image has zero size ({}x{})",
            img.width(),
            img.height()
        )));
    }
    debug!(width = img.width(), height = img.height(), "Decoded image");
    Ok(img)
}

/// A decoded image and the file name it came from.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub name: Option<String>,
}

impl DecodedImage {
    pub fn decode(bytes: &[u8], name: Option<String>) -> Result<Self, LoadError> {
        Ok(Self {
            image: decode_image(bytes)?,
            name,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of handing a finished decode back to the loader.
#[derive(Debug)]
pub enum LoadOutcome {
    Ready(DecodedImage),
    Failed(LoadError),
    /// A newer request was started; the result must be dropped.
    Stale,
}

#[derive(Debug, Default)]
pub struct ImageLoader {
    generation: AtomicU64,
}

impl ImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier ticket.
    pub fn begin(&self) -> LoadTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Image load started");
        LoadTicket { generation }
    }

    /// Supersede outstanding requests without starting a new one.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    pub fn finish(
        &self,
        ticket: LoadTicket,
        result: Result<DecodedImage, LoadError>,
    ) -> LoadOutcome {
        if !self.is_current(ticket) {
            debug!(generation = ticket.generation, "Dropping stale image load");
            return LoadOutcome::Stale;
        }
        match result {
            Ok(decoded) => LoadOutcome::Ready(decoded),
            Err(e) => {
                warn!(generation = ticket.generation, "Image load failed: {e}");
                LoadOutcome::Failed(e)
            }
        }
    }
}
