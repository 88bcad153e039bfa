// ============================================================================
// TEXT OVERLAY — glyph layout, rasterization, rotated alpha compositing
// ============================================================================

use crate::params::{FontWeight, TextProperties};
use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use image::RgbaImage;

/// Load a system font by family and weight. Falls back to the platform's
/// default sans-serif when the family is missing; `None` only when no usable
/// font exists at all.
pub fn load_font(family: &str, weight: FontWeight) -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::{Properties, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    props.weight = Weight(weight.css_value() as f32);

    let source = SystemSource::new();
    let handle = source
        .select_best_match(
            &[FamilyName::Title(family.to_string()), FamilyName::SansSerif],
            &props,
        )
        .ok()?;

    let font_data = handle.load().ok()?;
    let font_data_copy = font_data.copy_font_data()?;
    let bytes: Vec<u8> = (*font_data_copy).clone();
    FontArc::try_from_vec(bytes).ok()
}

/// A rasterized run of text: single-channel coverage plus its placement
/// relative to the anchor point.
struct CoveragePatch {
    coverage: Vec<f32>,
    width: usize,
    height: usize,
    /// Patch origin in anchor-local coordinates (anchor = (0,0)).
    min_x: f32,
    min_y: f32,
}

/// Draw `props.content` onto `buffer`, centered on `(props.x, props.y)` both
/// horizontally and vertically, rotated by `props.rotation_deg` about that
/// anchor, alpha-blended at `props.opacity`. No-op for empty content.
pub fn draw_text(buffer: &mut RgbaImage, props: &TextProperties, font: &FontArc) {
    if props.content.is_empty() {
        return;
    }
    let Some(patch) = rasterize(font, &props.content, props.font_size_px as f32) else {
        return;
    };

    let alpha_scale = props.opacity.clamp(0.0, 1.0) * (props.color[3] as f32 / 255.0);
    if alpha_scale <= 0.0 {
        return;
    }

    if props.rotation_deg.rem_euclid(360.0) == 0.0 {
        blend_axis_aligned(buffer, &patch, props, alpha_scale);
    } else {
        blend_rotated(buffer, &patch, props, alpha_scale);
    }
}

/// Lay out a single line left-aligned at x=0 with kerning, returning
/// positioned glyph advances and the total width.
fn layout_line(font: &FontArc, text: &str, font_size: f32) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(font_size);
    let mut glyphs = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    (glyphs, cursor_x)
}

/// Rasterize the line into a coverage patch positioned so the anchor sits at
/// the center of the text box: horizontally via a −width/2 offset, vertically
/// via the middle-baseline offset `(ascent + descent)/2`.
fn rasterize(font: &FontArc, text: &str, font_size: f32) -> Option<CoveragePatch> {
    let scaled = font.as_scaled(font_size);
    let (glyphs, total_width) = layout_line(font, text, font_size);
    if glyphs.is_empty() {
        return None;
    }

    let offset_x = -total_width * 0.5;
    let baseline_y = (scaled.ascent() + scaled.descent()) * 0.5;

    // Bounding box over outlined glyphs in anchor-local space.
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let mut outlined = Vec::with_capacity(glyphs.len());

    for &(glyph_id, advance) in &glyphs {
        let glyph = glyph_id
            .with_scale_and_position(font_size, point(offset_x + advance, baseline_y));
        if let Some(out) = font.outline_glyph(glyph) {
            let b = out.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
            outlined.push(out);
        }
    }
    if outlined.is_empty() || min_x >= max_x || min_y >= max_y {
        // Whitespace-only content draws nothing.
        return None;
    }

    let pad = 1.0;
    min_x -= pad;
    min_y -= pad;
    max_x += pad;
    max_y += pad;

    let width = (max_x - min_x).ceil() as usize;
    let height = (max_y - min_y).ceil() as usize;
    let mut coverage = vec![0.0f32; width * height];

    for out in &outlined {
        let b = out.px_bounds();
        let gx = (b.min.x - min_x).round() as i32;
        let gy = (b.min.y - min_y).round() as i32;
        out.draw(|px, py, cov| {
            let x = gx + px as i32;
            let y = gy + py as i32;
            if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
                let idx = y as usize * width + x as usize;
                coverage[idx] = coverage[idx].max(cov);
            }
        });
    }

    Some(CoveragePatch { coverage, width, height, min_x, min_y })
}

/// Fast path: no rotation, integer patch placement, straight source-over.
fn blend_axis_aligned(
    buffer: &mut RgbaImage,
    patch: &CoveragePatch,
    props: &TextProperties,
    alpha_scale: f32,
) {
    let ox = (props.x + patch.min_x).round() as i32;
    let oy = (props.y + patch.min_y).round() as i32;

    for py in 0..patch.height {
        let dy = oy + py as i32;
        if dy < 0 || dy >= buffer.height() as i32 {
            continue;
        }
        for px in 0..patch.width {
            let dx = ox + px as i32;
            if dx < 0 || dx >= buffer.width() as i32 {
                continue;
            }
            let cov = patch.coverage[py * patch.width + px];
            if cov <= 0.001 {
                continue;
            }
            blend_pixel(buffer, dx as u32, dy as u32, props.color, cov * alpha_scale);
        }
    }
}

/// Rotated path: walk the axis-aligned bounds of the rotated patch and
/// inverse-rotate each destination pixel into patch space, bilinear-sampling
/// coverage.
fn blend_rotated(
    buffer: &mut RgbaImage,
    patch: &CoveragePatch,
    props: &TextProperties,
    alpha_scale: f32,
) {
    let rad = props.rotation_deg.to_radians();
    let (sin, cos) = rad.sin_cos();

    // Rotate the patch corners forward to find the destination bounds.
    let corners = [
        (patch.min_x, patch.min_y),
        (patch.min_x + patch.width as f32, patch.min_y),
        (patch.min_x, patch.min_y + patch.height as f32),
        (patch.min_x + patch.width as f32, patch.min_y + patch.height as f32),
    ];
    let mut lo_x = f32::MAX;
    let mut lo_y = f32::MAX;
    let mut hi_x = f32::MIN;
    let mut hi_y = f32::MIN;
    for (cx, cy) in corners {
        let rx = props.x + cx * cos - cy * sin;
        let ry = props.y + cx * sin + cy * cos;
        lo_x = lo_x.min(rx);
        lo_y = lo_y.min(ry);
        hi_x = hi_x.max(rx);
        hi_y = hi_y.max(ry);
    }

    let x0 = (lo_x.floor() as i32).max(0);
    let y0 = (lo_y.floor() as i32).max(0);
    let x1 = (hi_x.ceil() as i32 + 1).min(buffer.width() as i32);
    let y1 = (hi_y.ceil() as i32 + 1).min(buffer.height() as i32);

    for dy in y0..y1 {
        for dx in x0..x1 {
            let lx = dx as f32 - props.x;
            let ly = dy as f32 - props.y;
            // Inverse rotation back into patch space.
            let ux = lx * cos + ly * sin - patch.min_x;
            let uy = -lx * sin + ly * cos - patch.min_y;
            let cov = sample_coverage(patch, ux, uy);
            if cov <= 0.001 {
                continue;
            }
            blend_pixel(buffer, dx as u32, dy as u32, props.color, cov * alpha_scale);
        }
    }
}

/// Bilinear coverage sample, zero outside the patch.
fn sample_coverage(patch: &CoveragePatch, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    if x0 < -1 || y0 < -1 || x0 >= patch.width as i32 || y0 >= patch.height as i32 {
        return 0.0;
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let at = |px: i32, py: i32| -> f32 {
        if px < 0 || py < 0 || px >= patch.width as i32 || py >= patch.height as i32 {
            0.0
        } else {
            patch.coverage[py as usize * patch.width + px as usize]
        }
    };
    let top = at(x0, y0) + (at(x0 + 1, y0) - at(x0, y0)) * fx;
    let bot = at(x0, y0 + 1) + (at(x0 + 1, y0 + 1) - at(x0, y0 + 1)) * fx;
    top + (bot - top) * fy
}

/// Straight-alpha source-over of `color` at strength `alpha` onto one pixel.
fn blend_pixel(buffer: &mut RgbaImage, x: u32, y: u32, color: [u8; 4], alpha: f32) {
    let a = alpha.clamp(0.0, 1.0);
    let dst = buffer.get_pixel_mut(x, y);
    let da = dst[3] as f32 / 255.0;
    let out_a = a + da * (1.0 - a);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let s = color[c] as f32;
        let d = dst[c] as f32;
        dst[c] = ((s * a + d * da * (1.0 - a)) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
