//! Editor session: the image, filter and layers being edited, plus the
//! panel state that follows them.
//!
//! Every mutation leaves the session ready to render again. Rendering is
//! synchronous; decoding a newly selected file runs on a blocking worker
//! and is applied only if no newer selection started meanwhile.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use tokio::task::JoinHandle;
use watermark_engine::{
    Color, DecodedImage, ExportError, Filter, FontBook, ImageLoader, LayerError, LayerStack,
    LayerUpdate, LoadError, LoadOutcome, LoadTicket, RemoveOutcome, RenderError, RenderRequest,
    RenderSize, SizingError, WatermarkLayer, export_file_name, fit_to_container, render,
    write_png,
};

use crate::panel::{PanelEntry, PanelState};
use crate::settings::WatermarkSettings;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("'{name}' is not an image file ({mime})")]
    UnsupportedFile { name: String, mime: String },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Image decode worker failed: {0}")]
    Worker(String),

    #[error("No image selected")]
    NoImage,

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(transparent)]
    Sizing(#[from] SizingError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Outcome of applying a finished image load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Applied,
    /// A newer selection superseded this one; nothing changed.
    Stale,
}

/// A decode running on the blocking pool.
#[derive(Debug)]
pub struct PendingLoad {
    ticket: LoadTicket,
    handle: JoinHandle<Result<DecodedImage, LoadError>>,
}

impl PendingLoad {
    pub fn ticket(&self) -> LoadTicket {
        self.ticket
    }
}

/// Accept only files whose guessed MIME type is `image/*`.
pub fn check_image_file(name: &str) -> Result<(), SessionError> {
    let mime = mime_guess::from_path(name).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::IMAGE {
        Ok(())
    } else {
        Err(SessionError::UnsupportedFile {
            name: name.to_string(),
            mime: mime.essence_str().to_string(),
        })
    }
}

pub struct EditorSession {
    layers: LayerStack,
    filter: Filter,
    image: Option<DecodedImage>,
    container: RenderSize,
    default_color: Color,
    fonts: Arc<FontBook>,
    loader: ImageLoader,
    panel: PanelState,
}

impl EditorSession {
    pub fn new(container: RenderSize, default_color: Color, fonts: Arc<FontBook>) -> Self {
        let layers = LayerStack::single(WatermarkLayer::default().with_color(default_color));
        let panel = PanelState::new(&layers);
        Self {
            layers,
            filter: Filter::None,
            image: None,
            container,
            default_color,
            fonts,
            loader: ImageLoader::new(),
            panel,
        }
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn image(&self) -> Option<&DecodedImage> {
        self.image.as_ref()
    }

    pub fn container(&self) -> RenderSize {
        self.container
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn panel_entries(&self) -> Vec<PanelEntry> {
        self.panel.entries(&self.layers)
    }

    pub fn set_filter(&mut self, filter: Filter) {
        tracing::debug!(%filter, "Filter changed");
        self.filter = filter;
    }

    pub fn set_container(&mut self, container: RenderSize) {
        self.container = container;
    }

    /// Append a layer with the "add" defaults. Returns its id.
    pub fn add_layer(&mut self) -> String {
        let layer = WatermarkLayer::added().with_color(self.default_color);
        let id = self.layers.push(layer).id.clone();
        self.panel.sync(&self.layers);
        id
    }

    pub fn update_layer(&mut self, id: &str, update: LayerUpdate) -> Result<(), SessionError> {
        self.layers.update_layer(id, update)?;
        Ok(())
    }

    /// Edit a field by its settings name, e.g. `("fontSize", "64")`.
    pub fn update_field(
        &mut self,
        id: &str,
        field: &str,
        value: &str,
    ) -> Result<(), SessionError> {
        let update = LayerUpdate::parse(field, value)?;
        self.update_layer(id, update)
    }

    pub fn remove_layer(&mut self, id: &str) -> RemoveOutcome {
        let outcome = self.layers.remove_layer(id);
        self.panel.sync(&self.layers);
        outcome
    }

    pub fn toggle_panel(&mut self, id: &str) {
        self.panel.toggle(id);
    }

    /// Drop the image, clear the filter and start over with one layer.
    pub fn reset(&mut self) {
        self.loader.cancel();
        self.image = None;
        self.filter = Filter::None;
        self.layers =
            LayerStack::single(WatermarkLayer::reset_default().with_color(self.default_color));
        self.panel.sync(&self.layers);
        tracing::info!("Session reset");
    }

    pub fn settings(&self) -> WatermarkSettings {
        WatermarkSettings {
            filter: self.filter,
            layers: self.layers.as_slice().to_vec(),
        }
    }

    pub fn apply_settings(&mut self, settings: WatermarkSettings) -> Result<(), SessionError> {
        let (filter, layers) = settings.into_parts()?;
        self.filter = filter;
        self.layers = layers;
        self.panel = PanelState::new(&self.layers);
        Ok(())
    }

    /// Check the file type and start decoding on the blocking pool. Any
    /// load started earlier becomes stale.
    pub fn start_load(&self, name: &str, bytes: Vec<u8>) -> Result<PendingLoad, SessionError> {
        check_image_file(name)?;
        let ticket = self.loader.begin();
        let name = name.to_string();
        tracing::info!(
            name = %name,
            bytes = bytes.len(),
            generation = ticket.generation(),
            "Decoding selected image"
        );
        let handle =
            tokio::task::spawn_blocking(move || DecodedImage::decode(&bytes, Some(name)));
        Ok(PendingLoad { ticket, handle })
    }

    /// Wait for `pending` and apply it if it is still the latest load.
    ///
    /// A failed decode leaves the current image in place.
    pub async fn finish_load(&mut self, pending: PendingLoad) -> Result<LoadStatus, SessionError> {
        let result = pending
            .handle
            .await
            .map_err(|e| SessionError::Worker(e.to_string()))?;

        match self.loader.finish(pending.ticket, result) {
            LoadOutcome::Ready(decoded) => {
                let (width, height) = decoded.dimensions();
                tracing::info!(width, height, name = ?decoded.name, "Image selected");
                self.image = Some(decoded);
                Ok(LoadStatus::Applied)
            }
            LoadOutcome::Failed(e) => Err(e.into()),
            LoadOutcome::Stale => Ok(LoadStatus::Stale),
        }
    }

    pub async fn select_image(
        &mut self,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<LoadStatus, SessionError> {
        let pending = self.start_load(name, bytes)?;
        self.finish_load(pending).await
    }

    /// Surface size for the current image inside the container.
    pub fn render_size(&self) -> Result<Option<RenderSize>, SessionError> {
        let Some(decoded) = &self.image else {
            return Ok(None);
        };
        let (width, height) = decoded.dimensions();
        let size = fit_to_container(
            width,
            height,
            self.container.width,
            self.container.height,
        )?;
        Ok(Some(size))
    }

    /// Render the current state. `None` when no image is selected.
    pub fn render(&self) -> Result<Option<RgbaImage>, SessionError> {
        let (Some(decoded), Some(size)) = (&self.image, self.render_size()?) else {
            return Ok(None);
        };
        let surface = render(&RenderRequest {
            image: &decoded.image,
            size,
            layers: self.layers.as_slice(),
            filter: self.filter,
            fonts: &self.fonts,
        })?;
        Ok(Some(surface))
    }

    pub fn export_name(&self) -> String {
        export_file_name(self.image.as_ref().and_then(|d| d.name.as_deref()))
    }

    /// Render and write a PNG into `dir`. Returns the written path.
    pub fn export(&self, dir: &Path) -> Result<PathBuf, SessionError> {
        let surface = self.render()?.ok_or(SessionError::NoImage)?;
        let path = write_png(&surface, dir, &self.export_name())?;
        Ok(path)
    }
}
