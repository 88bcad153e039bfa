// ============================================================================
// MASK COMPOSITOR — restore original pixels where the mask marks foreground
// ============================================================================
//
// This is the "text behind subject" pass: after text/overlays are drawn onto
// the edited buffer, foreground-masked pixels are restored from the original,
// so the overlay appears occluded by the subject.
// ============================================================================

use crate::log_warn;
use crate::mask::Mask;
use image::RgbaImage;
use rayon::prelude::*;

/// How far the mask's aspect ratio may drift from the image's before the
/// engine logs a mismatch warning.
const ASPECT_WARN_FACTOR: f32 = 2.0;

/// For every pixel in `original`'s coordinate space, map into the mask by
/// nearest neighbor (`mx = x·mw/ow`, `my = y·mh/oh`, floored); where the mask
/// reads foreground, write `original`'s RGB with alpha forced to 255,
/// elsewhere keep `edited`'s pixel.
///
/// `edited` and `original` must share dimensions — the session aligns them
/// before calling. A mask whose aspect ratio is wildly off the image's still
/// composites (coordinates resolve in-bounds by construction) but logs a
/// warning, since it almost certainly belongs to a different image.
pub fn composite_behind_mask(edited: &RgbaImage, original: &RgbaImage, mask: &Mask) -> RgbaImage {
    debug_assert_eq!(edited.dimensions(), original.dimensions());
    let w = original.width() as usize;
    let h = original.height() as usize;
    if w == 0 || h == 0 {
        return edited.clone();
    }

    let image_aspect = w as f32 / h as f32;
    let ratio = mask.aspect_ratio() / image_aspect;
    if !(1.0 / ASPECT_WARN_FACTOR..=ASPECT_WARN_FACTOR).contains(&ratio) {
        log_warn!(
            "mask aspect {}x{} diverges from image {}x{}; composite will misalign",
            mask.width(),
            mask.height(),
            w,
            h
        );
    }

    let scale_x = mask.width() as f64 / w as f64;
    let scale_y = mask.height() as f64 / h as f64;
    let edit_raw = edited.as_raw();
    let orig_raw = original.as_raw();
    let stride = w * 4;
    let mut dst_raw = vec![0u8; w * h * 4];

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let my = (y as f64 * scale_y) as u32;
        let edit_row = &edit_raw[y * stride..(y + 1) * stride];
        let orig_row = &orig_raw[y * stride..(y + 1) * stride];
        for x in 0..w {
            let pi = x * 4;
            let mx = (x as f64 * scale_x) as u32;
            if mask.is_foreground(mx, my) {
                row_out[pi] = orig_row[pi];
                row_out[pi + 1] = orig_row[pi + 1];
                row_out[pi + 2] = orig_row[pi + 2];
                row_out[pi + 3] = 255;
            } else {
                row_out[pi..pi + 4].copy_from_slice(&edit_row[pi..pi + 4]);
            }
        }
    });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn all_ones_mask_restores_original_exactly() {
        let original = solid(6, 4, [10, 20, 30, 255]);
        let edited = solid(6, 4, [200, 200, 200, 255]);
        let mask = Mask::from_raw(6, 4, vec![1; 24]).unwrap();
        let out = composite_behind_mask(&edited, &original, &mask);
        assert_eq!(out, original);
    }

    #[test]
    fn all_zeros_mask_keeps_edited_unchanged() {
        let original = solid(6, 4, [10, 20, 30, 255]);
        let edited = solid(6, 4, [200, 200, 200, 128]);
        let mask = Mask::from_raw(6, 4, vec![0; 24]).unwrap();
        let out = composite_behind_mask(&edited, &original, &mask);
        assert_eq!(out, edited);
    }

    #[test]
    fn foreground_pixels_force_opaque_alpha() {
        let original = solid(2, 1, [10, 20, 30, 90]);
        let edited = solid(2, 1, [200, 200, 200, 255]);
        let mask = Mask::from_raw(2, 1, vec![1, 0]).unwrap();
        let out = composite_behind_mask(&edited, &original, &mask);
        assert_eq!(out.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [200, 200, 200, 255]);
    }

    #[test]
    fn coarse_mask_maps_nearest_neighbor() {
        // 2×2 mask over a 4×4 image: each mask cell covers a 2×2 quadrant.
        let original = solid(4, 4, [1, 2, 3, 255]);
        let edited = solid(4, 4, [99, 99, 99, 255]);
        let mask = Mask::from_raw(2, 2, vec![1, 0, 0, 1]).unwrap();
        let out = composite_behind_mask(&edited, &original, &mask);
        for (x, y, px) in out.enumerate_pixels() {
            let quadrant_fg = (x < 2 && y < 2) || (x >= 2 && y >= 2);
            if quadrant_fg {
                assert_eq!(px.0, [1, 2, 3, 255], "({x},{y})");
            } else {
                assert_eq!(px.0, [99, 99, 99, 255], "({x},{y})");
            }
        }
    }

    #[test]
    fn fine_mask_over_small_image_resolves_in_bounds() {
        // Mask finer than the image: scale factors keep lookups in range.
        let original = solid(3, 3, [5, 5, 5, 255]);
        let edited = solid(3, 3, [50, 50, 50, 255]);
        let mask = Mask::from_raw(9, 9, vec![1; 81]).unwrap();
        let out = composite_behind_mask(&edited, &original, &mask);
        assert_eq!(out, original);
    }
}
