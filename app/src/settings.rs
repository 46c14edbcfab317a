//! Serializable snapshot of everything the user can edit.

use std::path::Path;

use serde::{Deserialize, Serialize};
use watermark_engine::{Filter, LayerError, LayerStack, WatermarkLayer};

/// `{ "filter": "sepia", "layers": [ ... ] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkSettings {
    #[serde(default)]
    pub filter: Filter,
    pub layers: Vec<WatermarkLayer>,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            filter: Filter::None,
            layers: LayerStack::new().into_vec(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Layer(#[from] LayerError),
}

impl WatermarkSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        if settings.layers.is_empty() {
            return Err(LayerError::Empty.into());
        }
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Split into the filter and a (non-empty) layer stack.
    pub fn into_parts(self) -> Result<(Filter, LayerStack), LayerError> {
        Ok((self.filter, LayerStack::from_layers(self.layers)?))
    }
}
