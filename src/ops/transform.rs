// ============================================================================
// GEOMETRIC TRANSFORMS — rotation with bounding-box resize, rectangular crop
// ============================================================================

use crate::params::CropRect;
use image::{RgbaImage, imageops};
use rayon::prelude::*;

/// Rotate `src` by `angle_deg` about its center, recomputing the output
/// canvas as the axis-aligned bounding box of the rotated rectangle:
/// `newW = w·|cosθ| + h·|sinθ|`, `newH = w·|sinθ| + h·|cosθ|` (rounded).
///
/// The image lands centered in the new canvas; uncovered bounding-box pixels
/// stay fully transparent. Callers always pass the *original* buffer plus the
/// accumulated angle — rotating an already-rotated buffer compounds
/// resampling loss.
pub fn rotate(src: &RgbaImage, angle_deg: f32) -> RgbaImage {
    let src_w = src.width();
    let src_h = src.height();
    if src_w == 0 || src_h == 0 {
        return src.clone();
    }

    let rad = angle_deg.to_radians();
    let (sin, cos) = rad.sin_cos();
    let new_w = (src_w as f32 * cos.abs() + src_h as f32 * sin.abs()).round().max(1.0) as u32;
    let new_h = (src_w as f32 * sin.abs() + src_h as f32 * cos.abs()).round().max(1.0) as u32;

    let mut dst = RgbaImage::new(new_w, new_h);
    let dcx = new_w as f32 * 0.5;
    let dcy = new_h as f32 * 0.5;
    let scx = src_w as f32 * 0.5;
    let scy = src_h as f32 * 0.5;

    let sw = src_w as i32;
    let sh = src_h as i32;
    let src_stride = src_w as usize * 4;
    let src_raw = src.as_raw();
    let row_bytes = new_w as usize * 4;

    // Inverse mapping: rotate each destination coordinate back by −θ and
    // bilinear-sample the source, transparent outside.
    dst.as_mut().par_chunks_mut(row_bytes).enumerate().for_each(|(dy, row)| {
        let v = dy as f32 - dcy;
        for dx in 0..new_w as usize {
            let u = dx as f32 - dcx;
            let sx = u * cos + v * sin + scx;
            let sy = -u * sin + v * cos + scy;

            let x0 = sx.floor() as i32;
            let y0 = sy.floor() as i32;
            if x0 < -1 || y0 < -1 || x0 >= sw || y0 >= sh {
                continue;
            }

            let fx = sx - x0 as f32;
            let fy = sy - y0 as f32;

            let sample = |px: i32, py: i32| -> [f32; 4] {
                if px < 0 || py < 0 || px >= sw || py >= sh {
                    [0.0; 4]
                } else {
                    let idx = py as usize * src_stride + px as usize * 4;
                    [
                        src_raw[idx] as f32,
                        src_raw[idx + 1] as f32,
                        src_raw[idx + 2] as f32,
                        src_raw[idx + 3] as f32,
                    ]
                }
            };

            let tl = sample(x0, y0);
            let tr = sample(x0 + 1, y0);
            let bl = sample(x0, y0 + 1);
            let br = sample(x0 + 1, y0 + 1);

            let pi = dx * 4;
            for c in 0..4 {
                let top = tl[c] + (tr[c] - tl[c]) * fx;
                let bot = bl[c] + (br[c] - bl[c]) * fx;
                row[pi + c] = (top + (bot - top) * fy).round().clamp(0.0, 255.0) as u8;
            }
        }
    });

    dst
}

/// Crop `src` to `rect`, clamped to the buffer bounds first. The result's
/// dimensions equal the clamped rect's; a rect entirely outside the buffer
/// yields a 0×0 image (callers treat that as a refused crop).
pub fn crop(src: &RgbaImage, rect: &CropRect) -> RgbaImage {
    let (x, y, w, h) = rect.clamped_to(src.width(), src.height());
    imageops::crop_imm(src, x, y, w, h).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        let mut img = RgbaImage::new(w, h);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgba([(x * 11 % 256) as u8, (y * 23 % 256) as u8, 200, 255]);
        }
        img
    }

    #[test]
    fn rotate_zero_is_identity() {
        let img = gradient(7, 5);
        let out = rotate(&img, 0.0);
        assert_eq!(img, out);
    }

    #[test]
    fn rotate_90_swaps_dimensions() {
        let img = gradient(10, 4);
        let out = rotate(&img, 90.0);
        assert_eq!((out.width(), out.height()), (4, 10));
    }

    #[test]
    fn rotate_45_grows_bounding_box() {
        let img = gradient(10, 10);
        let out = rotate(&img, 45.0);
        // 10·√2 ≈ 14.14 per side
        assert_eq!((out.width(), out.height()), (14, 14));
        // Corners of the enlarged canvas fall outside the rotated square.
        assert_eq!(out.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn four_quarter_turns_restore_dimensions() {
        let img = gradient(9, 6);
        let mut out = img.clone();
        for _ in 0..4 {
            out = rotate(&out, 90.0);
        }
        assert!(out.width().abs_diff(img.width()) <= 1);
        assert!(out.height().abs_diff(img.height()) <= 1);
    }

    #[test]
    fn crop_copies_exact_region() {
        let img = gradient(12, 8);
        let rect = CropRect { x: 3.0, y: 2.0, width: 5.0, height: 4.0 };
        let out = crop(&img, &rect);
        assert_eq!((out.width(), out.height()), (5, 4));
        for (x, y, px) in out.enumerate_pixels() {
            assert_eq!(px, img.get_pixel(x + 3, y + 2));
        }
    }

    #[test]
    fn crop_clamps_overhanging_rect() {
        let img = gradient(10, 10);
        let rect = CropRect { x: 6.0, y: -2.0, width: 100.0, height: 8.0 };
        let out = crop(&img, &rect);
        assert_eq!((out.width(), out.height()), (4, 6));
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(6, 0));
    }

    #[test]
    fn crop_fully_outside_is_empty() {
        let img = gradient(10, 10);
        let rect = CropRect { x: 50.0, y: 50.0, width: 5.0, height: 5.0 };
        let out = crop(&img, &rect);
        assert_eq!((out.width(), out.height()), (0, 0));
    }
}
