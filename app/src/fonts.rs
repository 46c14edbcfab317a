//! Font discovery for the watermark renderer.
//!
//! Family faces come from the configured font directory. The fallback is
//! the configured fallback file, else the first usable system font.

use std::path::Path;

use watermark_engine::FontBook;

use crate::config::AppConfig;

/// Build the font book described by `config`. Missing directories and
/// unreadable files are logged and skipped.
pub fn load_fonts(config: &AppConfig) -> FontBook {
    let mut fonts = FontBook::new();

    if config.font_dir.is_dir() {
        match fonts.load_dir(&config.font_dir) {
            Ok(count) => tracing::info!(
                dir = %config.font_dir.display(),
                families = count,
                "Loaded font families"
            ),
            Err(e) => tracing::warn!(
                dir = %config.font_dir.display(),
                "Failed to scan font directory: {e}"
            ),
        }
    } else {
        tracing::debug!(dir = %config.font_dir.display(), "Font directory does not exist");
    }

    let explicit = config.fallback_font.as_deref();
    let fallback = explicit
        .into_iter()
        .chain(system_font_candidates().iter().map(Path::new))
        .find_map(|path| match FontBook::load_file(path) {
            Ok(font) => {
                tracing::info!(path = %path.display(), "Using fallback font");
                Some(font)
            }
            Err(e) => {
                if Some(path) == explicit {
                    tracing::warn!(
                        path = %path.display(),
                        "Configured fallback font unusable: {e}"
                    );
                }
                None
            }
        });

    match fallback {
        Some(font) => fonts.set_fallback(font),
        None if fonts.is_empty() => {
            tracing::warn!("No usable font found (set WATERMARK_FONT_DIR or WATERMARK_FALLBACK_FONT)")
        }
        None => {}
    }
    fonts
}

fn system_font_candidates() -> &'static [&'static str] {
    #[cfg(target_os = "macos")]
    {
        &[
            "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "/System/Library/Fonts/Helvetica.ttc",
        ]
    }
    #[cfg(target_os = "windows")]
    {
        &[
            "C:\\Windows\\Fonts\\arialbd.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config_with(font_dir: PathBuf, fallback: Option<PathBuf>) -> AppConfig {
        AppConfig {
            font_dir,
            fallback_font: fallback,
            ..AppConfig::default()
        }
    }

    #[test]
    fn missing_directory_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(dir.path().join("absent"), None);
        let fonts = load_fonts(&config);
        assert!(!fonts.has_family("Inter"));
    }

    #[test]
    fn broken_fallback_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("Broken-Bold.ttf");
        std::fs::write(&bogus, b"not a font").unwrap();
        let config = config_with(dir.path().to_path_buf(), Some(bogus));

        // The broken file is neither a family face nor the fallback.
        let fonts = load_fonts(&config);
        assert!(!fonts.has_family("Inter"));
        let any_system_font = system_font_candidates()
            .iter()
            .any(|p| FontBook::load_file(Path::new(p)).is_ok());
        assert_eq!(fonts.is_empty(), !any_system_font);
    }
}
