//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

static RE_HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{4}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").unwrap()
});
static RE_FONT_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(ttf|otf)$").unwrap());

/// Largest container side accepted from configuration.
pub const MAX_CONTAINER_SIDE: i64 = 16384;

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "WATERMARK_CONTAINER_WIDTH" | "WATERMARK_CONTAINER_HEIGHT" => {
            validate_int_range(value, 1, MAX_CONTAINER_SIDE)?
        }
        "WATERMARK_DEFAULT_COLOR" => {
            if !RE_HEX_COLOR.is_match(value) {
                return Err("must be a hex color like #ffffff".into());
            }
        }
        "WATERMARK_FALLBACK_FONT" => {
            if !value.is_empty() && !RE_FONT_FILE.is_match(value) {
                return Err("must be a .ttf or .otf file".into());
            }
        }
        "WATERMARK_FONT_DIR" | "WATERMARK_OUTPUT_DIR" => {
            if value.trim().is_empty() {
                return Err("must not be blank".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.trim().parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_sides() {
        assert!(validate_setting("WATERMARK_CONTAINER_WIDTH", "1280").is_ok());
        assert!(validate_setting("WATERMARK_CONTAINER_HEIGHT", "1").is_ok());
        assert!(validate_setting("WATERMARK_CONTAINER_HEIGHT", "16384").is_ok());
        assert!(validate_setting("WATERMARK_CONTAINER_WIDTH", "0").is_err());
        assert!(validate_setting("WATERMARK_CONTAINER_WIDTH", "16385").is_err());
        assert!(validate_setting("WATERMARK_CONTAINER_WIDTH", "wide").is_err());
    }

    #[test]
    fn test_default_color() {
        assert!(validate_setting("WATERMARK_DEFAULT_COLOR", "#fff").is_ok());
        assert!(validate_setting("WATERMARK_DEFAULT_COLOR", "#FF00AA80").is_ok());
        assert!(validate_setting("WATERMARK_DEFAULT_COLOR", "ffffff").is_err());
        assert!(validate_setting("WATERMARK_DEFAULT_COLOR", "#ggg").is_err());
    }

    #[test]
    fn test_fallback_font() {
        assert!(validate_setting("WATERMARK_FALLBACK_FONT", "").is_ok());
        assert!(validate_setting("WATERMARK_FALLBACK_FONT", "/fonts/Inter-Bold.TTF").is_ok());
        assert!(validate_setting("WATERMARK_FALLBACK_FONT", "/fonts/inter.woff2").is_err());
    }

    #[test]
    fn test_unknown_keys_pass() {
        assert!(validate_setting("SOMETHING_ELSE", "anything").is_ok());
    }
}
