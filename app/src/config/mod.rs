//! Configuration: defaults, validation, loading from `.env` + environment.

pub mod app_config;
pub mod defaults;
pub mod validation;

pub use app_config::AppConfig;

use std::path::PathBuf;

/// Errors raised while building the runtime configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Load .env from multiple candidate paths.
pub fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// Determine the data directory for the application.
/// Priority: WATERMARKER_DATA_DIR env var > ~/.watermarker
pub fn data_dir() -> PathBuf {
    data_dir_from(std::env::var("WATERMARKER_DATA_DIR").ok())
}

fn data_dir_from(explicit: Option<String>) -> PathBuf {
    if let Some(dir) = explicit.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".watermarker")
}
