//! Watermark layers and the collection that owns them.
//!
//! A [`LayerStack`] always holds at least one layer. Field edits go
//! through [`LayerUpdate`], which clamps numeric values into the ranges
//! the editor exposes.

use std::collections::HashSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use image::Rgba;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Font size limits in pixels.
pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 10..=120;

/// Tile density limits.
pub const DENSITY_RANGE: RangeInclusive<u32> = 1..=10;

/// Rotation limits in degrees.
pub const ROTATION_RANGE: RangeInclusive<i32> = -90..=90;

/// Shadow blur limits, matching the editor slider.
pub const SHADOW_BLUR_RANGE: RangeInclusive<u32> = 0..=30;

/// Font size used by [`LayerStack::reset`].
pub const RESET_FONT_SIZE: u32 = 48;

/// Errors raised while editing layers.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("Invalid color '{0}' (expected #rgb, #rgba, #rrggbb or #rrggbbaa)")]
    InvalidColor(String),

    #[error("Unknown layer field '{0}'")]
    UnknownField(String),

    #[error("Invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },

    #[error("No layer with id '{0}'")]
    NotFound(String),

    #[error("A layer stack needs at least one layer")]
    Empty,

    #[error("Duplicate layer id '{0}'")]
    DuplicateId(String),
}

/// RGBA color parsed from CSS hex notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl FromStr for Color {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LayerError::InvalidColor(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).map(|v| v * 17);
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);

        let parsed = match hex.len() {
            3 => (nibble(0), nibble(1), nibble(2), Ok(255)),
            4 => (nibble(0), nibble(1), nibble(2), nibble(3)),
            6 => (byte(0), byte(2), byte(4), Ok(255)),
            8 => (byte(0), byte(2), byte(4), byte(6)),
            _ => return Err(invalid()),
        };
        match parsed {
            (Ok(r), Ok(g), Ok(b), Ok(a)) => Ok(Self { r, g, b, a }),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = LayerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02x}{:02x}{:02x}{:02x}",
                self.r, self.g, self.b, self.a
            )
        }
    }
}

fn new_layer_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// One independently styled, tiled watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkLayer {
    #[serde(default = "new_layer_id")]
    pub id: String,
    pub text: String,
    pub color: Color,
    pub font_size: u32,
    pub font_family: String,
    pub opacity: f32,
    pub density: u32,
    pub rotation: i32,
    #[serde(default)]
    pub shadow_enabled: bool,
    #[serde(default = "default_shadow_color")]
    pub shadow_color: Color,
    #[serde(default = "default_shadow_blur")]
    pub shadow_blur: u32,
    #[serde(default = "default_shadow_offset")]
    pub shadow_offset_x: i32,
    #[serde(default = "default_shadow_offset")]
    pub shadow_offset_y: i32,
}

fn default_shadow_color() -> Color {
    Color::BLACK
}

fn default_shadow_blur() -> u32 {
    5
}

fn default_shadow_offset() -> i32 {
    5
}

impl Default for WatermarkLayer {
    fn default() -> Self {
        Self {
            id: new_layer_id(),
            text: "Your Watermark".into(),
            color: Color::WHITE,
            font_size: 24,
            font_family: "font-inter".into(),
            opacity: 0.5,
            density: 3,
            rotation: -30,
            shadow_enabled: false,
            shadow_color: default_shadow_color(),
            shadow_blur: default_shadow_blur(),
            shadow_offset_x: default_shadow_offset(),
            shadow_offset_y: default_shadow_offset(),
        }
    }
}

impl WatermarkLayer {
    /// Defaults for a layer created with "add".
    pub fn added() -> Self {
        Self {
            text: "New Text".into(),
            font_size: 32,
            density: 2,
            ..Self::default()
        }
    }

    /// The single layer left after a reset.
    pub fn reset_default() -> Self {
        Self {
            font_size: RESET_FONT_SIZE,
            ..Self::default()
        }
    }

    /// Builder: replace the fill color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Builder: replace the text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Apply a single field edit, clamping numeric values.
    pub fn apply(&mut self, update: LayerUpdate) {
        match update {
            LayerUpdate::Text(v) => self.text = v,
            LayerUpdate::Color(v) => self.color = v,
            LayerUpdate::FontSize(v) => {
                self.font_size = v.clamp(*FONT_SIZE_RANGE.start(), *FONT_SIZE_RANGE.end())
            }
            LayerUpdate::FontFamily(v) => self.font_family = v,
            LayerUpdate::Opacity(v) => self.opacity = clamp_opacity(v),
            LayerUpdate::Density(v) => {
                self.density = v.clamp(*DENSITY_RANGE.start(), *DENSITY_RANGE.end())
            }
            LayerUpdate::Rotation(v) => {
                self.rotation = v.clamp(*ROTATION_RANGE.start(), *ROTATION_RANGE.end())
            }
            LayerUpdate::ShadowEnabled(v) => self.shadow_enabled = v,
            LayerUpdate::ShadowColor(v) => self.shadow_color = v,
            LayerUpdate::ShadowBlur(v) => self.shadow_blur = v.min(*SHADOW_BLUR_RANGE.end()),
            LayerUpdate::ShadowOffsetX(v) => self.shadow_offset_x = v,
            LayerUpdate::ShadowOffsetY(v) => self.shadow_offset_y = v,
        }
    }

    /// Opacity clamped to 0..=1, with NaN treated as fully transparent.
    pub fn effective_opacity(&self) -> f32 {
        clamp_opacity(self.opacity)
    }

    pub fn effective_font_size(&self) -> u32 {
        self.font_size
            .clamp(*FONT_SIZE_RANGE.start(), *FONT_SIZE_RANGE.end())
    }

    pub fn effective_rotation(&self) -> i32 {
        self.rotation
            .clamp(*ROTATION_RANGE.start(), *ROTATION_RANGE.end())
    }

    pub fn effective_shadow_blur(&self) -> u32 {
        self.shadow_blur.min(*SHADOW_BLUR_RANGE.end())
    }
}

fn clamp_opacity(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// A single field edit, keyed the same way as the settings format.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerUpdate {
    Text(String),
    Color(Color),
    FontSize(u32),
    FontFamily(String),
    Opacity(f32),
    Density(u32),
    Rotation(i32),
    ShadowEnabled(bool),
    ShadowColor(Color),
    ShadowBlur(u32),
    ShadowOffsetX(i32),
    ShadowOffsetY(i32),
}

impl LayerUpdate {
    /// Build an update from a field name and its string value.
    ///
    /// Field names follow the settings format (`fontSize`, `shadowOffsetX`, ...).
    pub fn parse(field: &str, value: &str) -> Result<Self, LayerError> {
        let invalid = || LayerError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };
        let int = || value.trim().parse::<i64>().map_err(|_| invalid());
        let unsigned = || -> Result<u32, LayerError> {
            Ok(int()?.clamp(0, i64::from(u32::MAX)) as u32)
        };
        let signed = || -> Result<i32, LayerError> {
            Ok(int()?.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
        };

        let update = match field {
            "text" => Self::Text(value.to_string()),
            "color" => Self::Color(value.parse()?),
            "fontSize" => Self::FontSize(unsigned()?),
            "fontFamily" => Self::FontFamily(value.to_string()),
            "opacity" => Self::Opacity(value.trim().parse().map_err(|_| invalid())?),
            "density" => Self::Density(unsigned()?),
            "rotation" => Self::Rotation(signed()?),
            "shadowEnabled" => Self::ShadowEnabled(value.trim().parse().map_err(|_| invalid())?),
            "shadowColor" => Self::ShadowColor(value.parse()?),
            "shadowBlur" => Self::ShadowBlur(unsigned()?),
            "shadowOffsetX" => Self::ShadowOffsetX(signed()?),
            "shadowOffsetY" => Self::ShadowOffsetY(signed()?),
            other => return Err(LayerError::UnknownField(other.to_string())),
        };
        Ok(update)
    }
}

/// Result of a remove request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Rejected: the layer is the only one left.
    LastLayer,
    NotFound,
}

/// Ordered, never-empty collection of layers. Later layers draw on top.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStack {
    layers: Vec<WatermarkLayer>,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    /// A stack holding the initial default layer.
    pub fn new() -> Self {
        Self::single(WatermarkLayer::default())
    }

    pub fn single(layer: WatermarkLayer) -> Self {
        Self {
            layers: vec![layer],
        }
    }

    /// Wrap existing layers. Fails when `layers` is empty or two layers
    /// share an id.
    pub fn from_layers(layers: Vec<WatermarkLayer>) -> Result<Self, LayerError> {
        if layers.is_empty() {
            return Err(LayerError::Empty);
        }
        let mut seen = HashSet::with_capacity(layers.len());
        for layer in &layers {
            if !seen.insert(layer.id.as_str()) {
                return Err(LayerError::DuplicateId(layer.id.clone()));
            }
        }
        Ok(Self { layers })
    }

    /// Append a layer with the "add" defaults and return it.
    pub fn add_layer(&mut self) -> &WatermarkLayer {
        self.push(WatermarkLayer::added())
    }

    /// Append an already-built layer and return it.
    pub fn push(&mut self, layer: WatermarkLayer) -> &WatermarkLayer {
        info!(id = %layer.id, count = self.layers.len() + 1, "Watermark layer added");
        self.layers.push(layer);
        &self.layers[self.layers.len() - 1]
    }

    /// Apply `update` to the layer with the given id.
    pub fn update_layer(&mut self, id: &str, update: LayerUpdate) -> Result<(), LayerError> {
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| LayerError::NotFound(id.to_string()))?;
        debug!(id, ?update, "Updating watermark layer");
        layer.apply(update);
        Ok(())
    }

    /// Remove a layer unless it is the last one.
    pub fn remove_layer(&mut self, id: &str) -> RemoveOutcome {
        let Some(index) = self.layers.iter().position(|l| l.id == id) else {
            return RemoveOutcome::NotFound;
        };
        if self.layers.len() <= 1 {
            debug!(id, "Refusing to remove the last watermark layer");
            return RemoveOutcome::LastLayer;
        }
        self.layers.remove(index);
        info!(id, count = self.layers.len(), "Watermark layer removed");
        RemoveOutcome::Removed
    }

    /// Replace everything with a single default layer at the reset font size.
    pub fn reset(&mut self) {
        self.layers = vec![WatermarkLayer::reset_default()];
    }

    pub fn get(&self, id: &str) -> Option<&WatermarkLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn first(&self) -> &WatermarkLayer {
        &self.layers[0]
    }

    pub fn as_slice(&self) -> &[WatermarkLayer] {
        &self.layers
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatermarkLayer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True when the stack holds no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn into_vec(self) -> Vec<WatermarkLayer> {
        self.layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parses_hex_forms() {
        assert_eq!("#ffffff".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!("#000".parse::<Color>().unwrap(), Color::BLACK);
        assert_eq!(
            "#11223380".parse::<Color>().unwrap(),
            Color::rgba(0x11, 0x22, 0x33, 0x80)
        );
        assert_eq!(
            "#f008".parse::<Color>().unwrap(),
            Color::rgba(255, 0, 0, 0x88)
        );
    }

    #[test]
    fn color_rejects_garbage() {
        assert!("ffffff".parse::<Color>().is_err());
        assert!("#ggg".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert!("#é12".parse::<Color>().is_err());
    }

    #[test]
    fn color_display_round_trips() {
        assert_eq!(Color::rgb(1, 2, 255).to_string(), "#0102ff");
        assert_eq!(Color::rgba(1, 2, 3, 4).to_string(), "#01020304");
    }

    #[test]
    fn layer_serializes_with_camel_case_fields() {
        let layer = WatermarkLayer::default();
        let json = serde_json::to_value(&layer).unwrap();
        assert_eq!(json["fontSize"], 24);
        assert_eq!(json["color"], "#ffffff");
        assert_eq!(json["shadowOffsetX"], 5);

        let back: WatermarkLayer = serde_json::from_value(json).unwrap();
        assert_eq!(back, layer);
    }

    #[test]
    fn layer_without_id_gets_one() {
        let json = serde_json::json!({
            "text": "A", "color": "#fff", "fontSize": 20, "fontFamily": "font-lobster",
            "opacity": 1.0, "density": 2, "rotation": 0
        });
        let layer: WatermarkLayer = serde_json::from_value(json).unwrap();
        assert!(!layer.id.is_empty());
        assert!(!layer.shadow_enabled);
    }

    #[test]
    fn added_layer_uses_add_defaults() {
        let layer = WatermarkLayer::added();
        assert_eq!(layer.text, "New Text");
        assert_eq!(layer.font_size, 32);
        assert_eq!(layer.density, 2);
        assert_eq!(layer.rotation, -30);
    }

    #[test]
    fn updates_are_clamped() {
        let mut layer = WatermarkLayer::default();
        layer.apply(LayerUpdate::Opacity(3.0));
        assert_eq!(layer.opacity, 1.0);
        layer.apply(LayerUpdate::Density(0));
        assert_eq!(layer.density, 1);
        layer.apply(LayerUpdate::Rotation(400));
        assert_eq!(layer.rotation, 90);
        layer.apply(LayerUpdate::FontSize(2));
        assert_eq!(layer.font_size, 10);
        layer.apply(LayerUpdate::ShadowBlur(u32::MAX));
        assert_eq!(layer.shadow_blur, 30);
        layer.apply(LayerUpdate::ShadowOffsetX(-500));
        assert_eq!(layer.shadow_offset_x, -500);
    }

    #[test]
    fn effective_shadow_blur_caps_raw_values() {
        let layer = WatermarkLayer {
            shadow_blur: 100_000,
            ..WatermarkLayer::default()
        };
        assert_eq!(layer.effective_shadow_blur(), 30);
        assert_eq!(WatermarkLayer::default().effective_shadow_blur(), 5);
    }

    #[test]
    fn parse_update_by_field_name() {
        assert_eq!(
            LayerUpdate::parse("fontSize", "64").unwrap(),
            LayerUpdate::FontSize(64)
        );
        assert_eq!(
            LayerUpdate::parse("shadowEnabled", "true").unwrap(),
            LayerUpdate::ShadowEnabled(true)
        );
        assert_eq!(
            LayerUpdate::parse("density", "-4").unwrap(),
            LayerUpdate::Density(0)
        );
        assert!(matches!(
            LayerUpdate::parse("bogus", "1"),
            Err(LayerError::UnknownField(_))
        ));
        assert!(matches!(
            LayerUpdate::parse("rotation", "abc"),
            Err(LayerError::InvalidValue { .. })
        ));
        assert!(matches!(
            LayerUpdate::parse("color", "red"),
            Err(LayerError::InvalidColor(_))
        ));
    }

    #[test]
    fn stack_add_update_remove() {
        let mut stack = LayerStack::new();
        let id = stack.add_layer().id.clone();
        assert_eq!(stack.len(), 2);

        stack
            .update_layer(&id, LayerUpdate::Text("Hello".into()))
            .unwrap();
        assert_eq!(stack.get(&id).unwrap().text, "Hello");

        assert_eq!(stack.remove_layer(&id), RemoveOutcome::Removed);
        assert_eq!(stack.len(), 1);
        assert!(!stack.contains(&id));
    }

    #[test]
    fn removing_the_only_layer_is_rejected() {
        let mut stack = LayerStack::new();
        let id = stack.first().id.clone();
        assert_eq!(stack.remove_layer(&id), RemoveOutcome::LastLayer);
        assert_eq!(stack.len(), 1);
        assert!(stack.contains(&id));
    }

    #[test]
    fn remove_unknown_id_is_reported() {
        let mut stack = LayerStack::new();
        stack.add_layer();
        assert_eq!(stack.remove_layer("nope"), RemoveOutcome::NotFound);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn update_unknown_id_fails() {
        let mut stack = LayerStack::new();
        let err = stack
            .update_layer("nope", LayerUpdate::Density(3))
            .unwrap_err();
        assert!(matches!(err, LayerError::NotFound(_)));
    }

    #[test]
    fn reset_leaves_one_large_default_layer() {
        let mut stack = LayerStack::new();
        stack.add_layer();
        stack.add_layer();
        stack.reset();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.first().font_size, RESET_FONT_SIZE);
        assert_eq!(stack.first().text, "Your Watermark");
    }

    #[test]
    fn from_layers_rejects_empty() {
        assert!(matches!(
            LayerStack::from_layers(Vec::new()),
            Err(LayerError::Empty)
        ));
    }

    #[test]
    fn from_layers_rejects_duplicate_ids() {
        let a = WatermarkLayer {
            id: "dup".into(),
            ..WatermarkLayer::default()
        };
        let b = WatermarkLayer {
            id: "dup".into(),
            ..WatermarkLayer::added()
        };
        let err = LayerStack::from_layers(vec![a, b]).unwrap_err();
        assert!(matches!(err, LayerError::DuplicateId(id) if id == "dup"));
    }

    #[test]
    fn ids_are_unique() {
        let a = WatermarkLayer::default();
        let b = WatermarkLayer::default();
        assert_ne!(a.id, b.id);
    }
}
