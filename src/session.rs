// ============================================================================
// EDIT SESSION — parameter state + deterministic re-render orchestration
// ============================================================================
//
// The session owns the immutable original buffer and every editing parameter.
// Each render recomputes the working buffer from the original and the current
// parameter snapshot — never from a previously filtered buffer — so repeated
// or superseded renders can never compound filter error.
// ============================================================================

use crate::log_warn;
use crate::mask::Mask;
use crate::ops::{composite, filters, text, transform};
use crate::params::{CropRect, FilterParams, FontWeight, TextProperties};
use ab_glyph::FontArc;
use image::RgbaImage;

/// Observable session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No image loaded; renders and transforms no-op.
    Empty,
    /// Original loaded, no working buffer produced yet.
    Loaded,
    /// A working buffer exists for the current parameter snapshot.
    Rendered,
    /// A crop interaction is active on top of the rendered buffer.
    Cropping,
}

/// Active crop interaction: the adjustable rectangle plus the rendered buffer
/// it will be discarded back to.
struct CropFlow {
    rect: CropRect,
    before: RgbaImage,
}

/// Initial crop rectangle: 30% × 30% at the buffer origin.
const CROP_SEED_FRACTION: f32 = 0.3;

pub struct EditSession {
    original: Option<RgbaImage>,
    working: Option<RgbaImage>,
    pub filters: FilterParams,
    pub text: TextProperties,
    rotation_deg: f32,
    crop: Option<CropFlow>,
    /// Cached resolved font keyed by (family, weight).
    font: Option<(String, FontWeight, FontArc)>,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditSession {
    pub fn new() -> Self {
        Self {
            original: None,
            working: None,
            filters: FilterParams::default(),
            text: TextProperties::default(),
            rotation_deg: 0.0,
            crop: None,
            font: None,
        }
    }

    /// Load a decoded RGBA buffer as the session original and render once.
    /// The text anchor is seeded to the canvas center, as the source editor
    /// draws its overlay at `(width/2, height/2)`.
    pub fn load_image(&mut self, img: RgbaImage) {
        self.text.x = img.width() as f32 / 2.0;
        self.text.y = img.height() as f32 / 2.0;
        self.original = Some(img);
        self.working = None;
        self.crop = None;
        self.render();
    }

    pub fn state(&self) -> SessionState {
        if self.original.is_none() {
            SessionState::Empty
        } else if self.crop.is_some() {
            SessionState::Cropping
        } else if self.working.is_some() {
            SessionState::Rendered
        } else {
            SessionState::Loaded
        }
    }

    /// The original buffer, untouched since load (None when Empty).
    pub fn original(&self) -> Option<&RgbaImage> {
        self.original.as_ref()
    }

    /// The last rendered buffer (None until the first render).
    pub fn working(&self) -> Option<&RgbaImage> {
        self.working.as_ref()
    }

    pub fn rotation_deg(&self) -> f32 {
        self.rotation_deg
    }

    /// Set an arbitrary rotation angle, wrapped modulo 360, and re-render.
    pub fn set_rotation(&mut self, degrees: f32) -> Option<&RgbaImage> {
        self.rotation_deg = degrees.rem_euclid(360.0);
        self.render()
    }

    /// Step the rotation by `step` degrees (the UI steps ±90) and re-render.
    pub fn rotate_step(&mut self, step: f32) -> Option<&RgbaImage> {
        self.set_rotation(self.rotation_deg + step)
    }

    /// Re-render the working buffer from the original and the current
    /// parameter snapshot: rotation → tone filters → text overlay.
    ///
    /// Returns the new working buffer, or `None` (a silent no-op, leaving any
    /// previous working buffer in place) when no image is loaded.
    pub fn render(&mut self) -> Option<&RgbaImage> {
        let font = if self.original.is_some() && !self.text.content.is_empty() {
            self.resolve_font()
        } else {
            None
        };

        let original = self.original.as_ref()?;
        let mut img = if self.rotation_deg != 0.0 {
            transform::rotate(original, self.rotation_deg)
        } else {
            original.clone()
        };

        img = filters::apply(&img, &self.filters);

        if !self.text.content.is_empty() {
            match &font {
                Some(font) => text::draw_text(&mut img, &self.text, font),
                None => log_warn!(
                    "no usable font for family '{}'; text overlay skipped",
                    self.text.font_family
                ),
            }
        }

        self.working = Some(img);
        self.working.as_ref()
    }

    /// One-shot "place overlay behind subject": re-renders, then restores
    /// original pixels wherever `mask` marks foreground. Not part of the
    /// standing render loop — each call composites exactly once.
    ///
    /// Requires original-space alignment, so it no-ops (with a warning) while
    /// a rotation is active: the rotated bounding box no longer matches the
    /// mask's image space.
    pub fn composite_behind_subject(&mut self, mask: &Mask) -> Option<&RgbaImage> {
        if self.original.is_none() {
            return None;
        }
        if self.rotation_deg != 0.0 {
            log_warn!(
                "behind-subject composite skipped: rotation {}° changes buffer geometry",
                self.rotation_deg
            );
            return None;
        }
        self.render()?;
        let out = {
            let edited = self.working.as_ref()?;
            let original = self.original.as_ref()?;
            composite::composite_behind_mask(edited, original, mask)
        };
        self.working = Some(out);
        self.working.as_ref()
    }

    /// Restore all parameters to their defaults and re-render.
    pub fn reset(&mut self) -> Option<&RgbaImage> {
        self.filters = FilterParams::default();
        self.text = TextProperties::default();
        if let Some(img) = &self.original {
            self.text.x = img.width() as f32 / 2.0;
            self.text.y = img.height() as f32 / 2.0;
        }
        self.rotation_deg = 0.0;
        self.crop = None;
        self.render()
    }

    // ------------------------------------------------------------------
    //  Crop sub-flow
    // ------------------------------------------------------------------

    /// Enter the crop flow, seeding a 30%×30% rectangle at the buffer origin.
    /// No-op (returning `None`) when nothing has been rendered yet.
    pub fn begin_crop(&mut self) -> Option<CropRect> {
        if self.crop.is_some() {
            return self.crop.as_ref().map(|c| c.rect);
        }
        let before = self.working.clone()?;
        let rect = CropRect {
            x: 0.0,
            y: 0.0,
            width: before.width() as f32 * CROP_SEED_FRACTION,
            height: before.height() as f32 * CROP_SEED_FRACTION,
        };
        self.crop = Some(CropFlow { rect, before });
        Some(rect)
    }

    pub fn crop_rect(&self) -> Option<CropRect> {
        self.crop.as_ref().map(|c| c.rect)
    }

    /// Translate the active crop rectangle (the observed interaction moves,
    /// never resizes), keeping it inside the working buffer.
    pub fn move_crop(&mut self, dx: f32, dy: f32) -> Option<CropRect> {
        let crop = self.crop.as_mut()?;
        let max_x = (crop.before.width() as f32 - crop.rect.width).max(0.0);
        let max_y = (crop.before.height() as f32 - crop.rect.height).max(0.0);
        crop.rect.x = (crop.rect.x + dx).clamp(0.0, max_x);
        crop.rect.y = (crop.rect.y + dy).clamp(0.0, max_y);
        Some(crop.rect)
    }

    /// Commit the crop. The rectangle is clamped to bounds, the current
    /// geometry (original + accumulated rotation) is cropped, and the result
    /// becomes the new session original with rotation folded in at 0. Filters
    /// and text remain live parameters and re-apply on the render that
    /// follows. Destructive: the pre-crop original is not retained.
    ///
    /// Returns `false` (flow stays active) when the clamped rect is empty.
    pub fn commit_crop(&mut self) -> bool {
        let Some(crop) = self.crop.as_ref() else {
            return false;
        };
        let Some(original) = self.original.as_ref() else {
            return false;
        };

        let base = if self.rotation_deg != 0.0 {
            transform::rotate(original, self.rotation_deg)
        } else {
            original.clone()
        };
        let cropped = transform::crop(&base, &crop.rect);
        if cropped.width() == 0 || cropped.height() == 0 {
            log_warn!("crop rect collapsed to zero size; commit refused");
            return false;
        }

        self.original = Some(cropped);
        self.rotation_deg = 0.0;
        self.crop = None;
        self.render();
        true
    }

    /// Leave the crop flow without applying it, restoring the buffer rendered
    /// when the flow began.
    pub fn discard_crop(&mut self) {
        if let Some(crop) = self.crop.take() {
            self.working = Some(crop.before);
        }
    }

    // ------------------------------------------------------------------

    fn resolve_font(&mut self) -> Option<FontArc> {
        if let Some((family, weight, font)) = &self.font {
            if *family == self.text.font_family && *weight == self.text.font_weight {
                return Some(font.clone());
            }
        }
        let font = text::load_font(&self.text.font_family, self.text.font_weight)?;
        self.font = Some((self.text.font_family.clone(), self.text.font_weight, font.clone()));
        Some(font)
    }
}
