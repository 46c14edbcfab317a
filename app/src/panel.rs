//! Which layer editor is expanded in the control panel.

use serde::Serialize;
use watermark_engine::LayerStack;

/// At most one layer is open at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    open: Option<String>,
}

/// One row of the layer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelEntry {
    pub id: String,
    pub title: String,
    pub open: bool,
    pub removable: bool,
}

impl PanelState {
    /// Starts with the first layer open.
    pub fn new(layers: &LayerStack) -> Self {
        Self {
            open: Some(layers.first().id.clone()),
        }
    }

    pub fn open_id(&self) -> Option<&str> {
        self.open.as_deref()
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.open.as_deref() == Some(id)
    }

    /// Open `id`, or close it when it is already open.
    pub fn toggle(&mut self, id: &str) {
        if self.is_open(id) {
            self.open = None;
        } else {
            self.open = Some(id.to_string());
        }
    }

    /// Re-check against the current layers after any collection change.
    pub fn sync(&mut self, layers: &LayerStack) {
        if let Some(id) = &self.open {
            if !layers.contains(id) {
                tracing::debug!(id = %id, "Open layer no longer exists, closing");
                self.open = None;
            }
        }
        if layers.len() == 1 {
            self.open = Some(layers.first().id.clone());
        }
    }

    /// Rows in layer order, titled by the layer text.
    pub fn entries(&self, layers: &LayerStack) -> Vec<PanelEntry> {
        let removable = layers.len() > 1;
        layers
            .iter()
            .map(|layer| PanelEntry {
                id: layer.id.clone(),
                title: layer.text.clone(),
                open: self.is_open(&layer.id),
                removable,
            })
            .collect()
    }
}
