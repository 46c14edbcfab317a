//! Runtime application configuration loaded from the environment.

use std::path::PathBuf;

use watermark_engine::{Color, RenderSize};

use super::ConfigError;
use super::defaults::get_default;
use super::validation::validate_setting;

/// Runtime configuration for the editor and CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub container_width: u32,
    pub container_height: u32,
    pub data_dir: PathBuf,
    pub font_dir: PathBuf,
    pub fallback_font: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub default_color: Color,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = super::data_dir();
        Self {
            container_width: 1280,
            container_height: 720,
            font_dir: data_dir.join("fonts"),
            data_dir,
            fallback_font: None,
            output_dir: PathBuf::from("."),
            default_color: Color::WHITE,
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(super::data_dir(), |key| std::env::var(key).ok())
    }

    /// Build a config from `lookup`, falling back to the defaults table for
    /// missing or empty keys. Every present value is validated.
    pub fn from_lookup(
        data_dir: PathBuf,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let g = |key: &str| -> Result<String, ConfigError> {
            let value = lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| get_default(key).unwrap_or_default().to_string());
            if !value.is_empty() {
                validate_setting(key, &value).map_err(|reason| ConfigError::Invalid {
                    key: key.to_string(),
                    reason,
                })?;
            }
            Ok(value)
        };

        let container_width =
            parse_side("WATERMARK_CONTAINER_WIDTH", &g("WATERMARK_CONTAINER_WIDTH")?)?;
        let container_height =
            parse_side("WATERMARK_CONTAINER_HEIGHT", &g("WATERMARK_CONTAINER_HEIGHT")?)?;

        let font_dir = match g("WATERMARK_FONT_DIR")? {
            dir if dir.is_empty() => data_dir.join("fonts"),
            dir => PathBuf::from(dir),
        };
        let fallback_font = Some(g("WATERMARK_FALLBACK_FONT")?)
            .filter(|f| !f.is_empty())
            .map(PathBuf::from);
        let output_dir = PathBuf::from(g("WATERMARK_OUTPUT_DIR")?);

        let color = g("WATERMARK_DEFAULT_COLOR")?;
        let default_color = color.parse::<Color>().map_err(|e| ConfigError::Invalid {
            key: "WATERMARK_DEFAULT_COLOR".into(),
            reason: format!("{e}"),
        })?;

        Ok(Self {
            container_width,
            container_height,
            data_dir,
            font_dir,
            fallback_font,
            output_dir,
            default_color,
        })
    }

    pub fn container(&self) -> RenderSize {
        RenderSize::new(self.container_width, self.container_height)
    }
}

fn parse_side(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        reason: "must be an integer".into(),
    })
}
