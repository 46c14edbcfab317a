//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

type DefTuple = (&'static str, &'static str, &'static str);

// An empty default means "derived at load time" (see `AppConfig`).
const DEFS: &[DefTuple] = &[
    ("WATERMARK_CONTAINER_WIDTH", "1280", "Width of the preview container in pixels"),
    ("WATERMARK_CONTAINER_HEIGHT", "720", "Height of the preview container in pixels"),
    ("WATERMARK_FONT_DIR", "", "Directory with watermark font files (default <data dir>/fonts)"),
    ("WATERMARK_FALLBACK_FONT", "", "Font file used when a family has no face"),
    ("WATERMARK_OUTPUT_DIR", ".", "Directory exported images are written to"),
    ("WATERMARK_DEFAULT_COLOR", "#ffffff", "Text color of newly created layers"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    description,
                },
            )
        })
        .collect()
});

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}

/// All keys in declaration order.
pub fn keys() -> impl Iterator<Item = &'static str> {
    DEFS.iter().map(|&(key, _, _)| key)
}
