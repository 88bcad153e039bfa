// ============================================================================
// PARAMETERS — filter values, text properties, crop rectangle, presets
// ============================================================================

use serde::{Deserialize, Serialize};

/// The ten tone/color filter values.
///
/// Two neutral-value conventions coexist, one fixed per filter:
///
/// * **100-centered** (value/100 is a gain, 100 = no-op): `brightness`,
///   `exposure`, `shadows`, `highlights`, `saturation`. UI range 0–200.
/// * **0-centered** (0 = no-op): `contrast` (classic 259-formula multiplier),
///   `warmth` (sepia blend factor /100), `vibrance` (push-to-max factor /100),
///   `sharpness` (edge-response gain /100), `hue` (degrees, −180..180).
///
/// Out-of-range values are accepted and fed to the formulas as-is; only
/// channel outputs are clamped to [0, 255].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub brightness: f32,
    pub contrast: f32,
    pub exposure: f32,
    pub shadows: f32,
    pub highlights: f32,
    pub sharpness: f32,
    pub saturation: f32,
    pub hue: f32,
    pub warmth: f32,
    pub vibrance: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 0.0,
            exposure: 100.0,
            shadows: 100.0,
            highlights: 100.0,
            sharpness: 0.0,
            saturation: 100.0,
            hue: 0.0,
            warmth: 0.0,
            vibrance: 0.0,
        }
    }
}

impl FilterParams {
    /// True when every filter sits at its neutral value, i.e. `apply` would
    /// be an identity transform.
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

/// Font weight for text overlays. CSS-style values, resolved through the
/// system font source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    /// Numeric weight used for system font selection (400/700).
    pub fn css_value(&self) -> u16 {
        match self {
            FontWeight::Normal => 400,
            FontWeight::Bold => 700,
        }
    }
}

/// Styled, positioned text overlay state.
///
/// `(x, y)` is the anchor in canvas coordinates (origin top-left); the text is
/// centered on the anchor both horizontally and vertically, then rotated by
/// `rotation_deg` about it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextProperties {
    pub content: String,
    pub x: f32,
    pub y: f32,
    pub rotation_deg: f32,
    /// 0.0–1.0, applied on top of the color's own alpha.
    pub opacity: f32,
    pub font_family: String,
    pub font_weight: FontWeight,
    pub font_size_px: u32,
    pub color: [u8; 4],
}

impl Default for TextProperties {
    fn default() -> Self {
        // The source editor draws "48px Arial" in white at 50% opacity,
        // centered on the canvas.
        Self {
            content: String::new(),
            x: 0.0,
            y: 0.0,
            rotation_deg: 0.0,
            opacity: 0.5,
            font_family: "Arial".to_string(),
            font_weight: FontWeight::Normal,
            font_size_px: 48,
            color: [255, 255, 255, 255],
        }
    }
}

/// Rectangular crop region in working-buffer coordinates.
///
/// Ephemeral: exists only while a crop interaction is active. Always clamped
/// to buffer bounds before the destructive commit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    /// Clamp to a `buf_w` × `buf_h` buffer, returning integer pixel bounds
    /// `(x, y, w, h)` guaranteed in-bounds and non-degenerate only when the
    /// rect overlaps the buffer at all (`w`/`h` may come back 0).
    pub fn clamped_to(&self, buf_w: u32, buf_h: u32) -> (u32, u32, u32, u32) {
        let x0 = self.x.max(0.0).min(buf_w as f32);
        let y0 = self.y.max(0.0).min(buf_h as f32);
        let x1 = (self.x + self.width).max(0.0).min(buf_w as f32);
        let y1 = (self.y + self.height).max(0.0).min(buf_h as f32);
        let x = x0.floor() as u32;
        let y = y0.floor() as u32;
        let w = (x1.floor() as u32).saturating_sub(x);
        let h = (y1.floor() as u32).saturating_sub(y);
        (x, y, w, h)
    }
}

// ============================================================================
// PRESETS — named constant parameter sets, no extra semantics
// ============================================================================

pub const PRESET_NAMES: &[&str] = &["original", "vivid", "mono", "warm", "cool", "crisp"];

/// Look up a built-in preset by name. `None` for unknown names.
pub fn preset(name: &str) -> Option<FilterParams> {
    let base = FilterParams::default();
    match name {
        "original" => Some(base),
        "vivid" => Some(FilterParams {
            saturation: 130.0,
            contrast: 15.0,
            vibrance: 20.0,
            ..base
        }),
        "mono" => Some(FilterParams {
            saturation: 0.0,
            contrast: 10.0,
            ..base
        }),
        "warm" => Some(FilterParams {
            warmth: 40.0,
            brightness: 105.0,
            ..base
        }),
        "cool" => Some(FilterParams {
            hue: 15.0,
            saturation: 90.0,
            ..base
        }),
        "crisp" => Some(FilterParams {
            sharpness: 60.0,
            contrast: 12.0,
            ..base
        }),
        _ => None,
    }
}
