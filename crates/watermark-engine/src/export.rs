//! PNG export of a finished render.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use tracing::info;

pub const EXPORT_PREFIX: &str = "watermarked-";

const FALLBACK_STEM: &str = "image";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Download name for an image originally called `source_name`.
///
/// `photo.jpg` becomes `watermarked-photo.png`; with no usable name the
/// result is `watermarked-image.png`.
pub fn export_file_name(source_name: Option<&str>) -> String {
    let stem = source_name
        .map(Path::new)
        .and_then(Path::file_stem)
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_STEM);

    format!("{EXPORT_PREFIX}{stem}.png")
}

/// Encode the surface as PNG bytes. Pixels are written unchanged.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}

/// Encode and write `img` to `dir/file_name`, returning the written path.
pub fn write_png(img: &RgbaImage, dir: &Path, file_name: &str) -> Result<PathBuf, ExportError> {
    let bytes = encode_png(img)?;
    let path = dir.join(file_name);
    std::fs::write(&path, &bytes).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;

    info!(
        path = %path.display(),
        width = img.width(),
        height = img.height(),
        bytes = bytes.len(),
        "Exported watermarked image"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn file_name_uses_prefix_and_stem() {
        assert_eq!(export_file_name(Some("photo.jpg")), "watermarked-photo.png");
        assert_eq!(
            export_file_name(Some("/tmp/shots/holiday.final.webp")),
            "watermarked-holiday.final.png"
        );
        assert_eq!(export_file_name(Some("noext")), "watermarked-noext.png");
    }

    #[test]
    fn file_name_without_source_is_generic() {
        assert_eq!(export_file_name(None), "watermarked-image.png");
        assert_eq!(export_file_name(Some("")), "watermarked-image.png");
    }

    #[test]
    fn encoded_png_round_trips() {
        let mut img = RgbaImage::from_pixel(7, 5, Rgba([10, 20, 30, 255]));
        img.put_pixel(3, 2, Rgba([250, 0, 0, 128]));

        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (7, 5));
        assert_eq!(decoded.get_pixel(3, 2).0, [250, 0, 0, 128]);
    }

    #[test]
    fn write_png_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(4, 3, Rgba([0, 0, 0, 255]));
        let path = write_png(&img, dir.path(), "watermarked-x.png").unwrap();
        assert_eq!(path, dir.path().join("watermarked-x.png"));
        assert_eq!(image::image_dimensions(&path).unwrap(), (4, 3));
    }

    #[test]
    fn write_png_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let err = write_png(&img, &dir.path().join("nope"), "a.png").unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }));
    }
}
