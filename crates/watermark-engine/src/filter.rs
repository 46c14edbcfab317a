//! Global color filters applied to the base image only.

use std::fmt;
use std::str::FromStr;

use image::{Pixel, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Filter selection for the base image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    None,
    Grayscale,
    Sepia,
    Invert,
}

impl Filter {
    pub const ALL: [Filter; 4] = [Filter::None, Filter::Grayscale, Filter::Sepia, Filter::Invert];

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::None => "none",
            Filter::Grayscale => "grayscale",
            Filter::Sepia => "sepia",
            Filter::Invert => "invert",
        }
    }

    /// Apply the filter at full strength in place. Alpha is left untouched.
    pub fn apply(&self, img: &mut RgbaImage) {
        debug!(filter = self.as_str(), "Applying base image filter");
        match self {
            Filter::None => {}
            Filter::Grayscale => {
                for pixel in img.pixels_mut() {
                    let l = pixel.to_luma().0[0];
                    pixel.0 = [l, l, l, pixel.0[3]];
                }
            }
            Filter::Sepia => {
                for pixel in img.pixels_mut() {
                    let [r, g, b, a] = pixel.0;
                    let (r, g, b) = sepia(r, g, b);
                    pixel.0 = [r, g, b, a];
                }
            }
            Filter::Invert => image::imageops::invert(img),
        }
    }
}

fn sepia(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    (
        channel(0.393 * r + 0.769 * g + 0.189 * b),
        channel(0.349 * r + 0.686 * g + 0.168 * b),
        channel(0.272 * r + 0.534 * g + 0.131 * b),
    )
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown filter '{0}' (expected none, grayscale, sepia or invert)")]
pub struct UnknownFilter(pub String);

impl FromStr for Filter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownFilter(s.to_string()))
    }
}
