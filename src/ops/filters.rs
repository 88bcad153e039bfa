// ============================================================================
// TONE FILTERS — the ten per-pixel (and one per-neighborhood) color operators
// ============================================================================
//
// All operators are pure functions of (buffer, value) and are applied in a
// fixed order by `apply`. Channel outputs clamp to [0, 255]; alpha passes
// through untouched. Operations are parallelized via rayon by pixel row.
// ============================================================================

use crate::params::FilterParams;
use image::RgbaImage;
use rayon::prelude::*;

/// Apply the full filter stack in its canonical order:
/// brightness → contrast → exposure → shadows → highlights → sharpness →
/// saturation → hue → warmth → vibrance.
///
/// Operators at their neutral value are skipped. The order is part of the
/// output contract; re-ordering changes results.
pub fn apply(src: &RgbaImage, params: &FilterParams) -> RgbaImage {
    let mut img = src.clone();
    if params.brightness != 100.0 {
        img = brightness(&img, params.brightness);
    }
    if params.contrast != 0.0 {
        img = contrast(&img, params.contrast);
    }
    if params.exposure != 100.0 {
        img = exposure(&img, params.exposure);
    }
    if params.shadows != 100.0 {
        img = shadows(&img, params.shadows);
    }
    if params.highlights != 100.0 {
        img = highlights(&img, params.highlights);
    }
    if params.sharpness != 0.0 {
        img = sharpness(&img, params.sharpness);
    }
    if params.saturation != 100.0 {
        img = saturation(&img, params.saturation);
    }
    if params.hue != 0.0 {
        img = hue_rotate(&img, params.hue);
    }
    if params.warmth != 0.0 {
        img = warmth(&img, params.warmth);
    }
    if params.vibrance != 0.0 {
        img = vibrance(&img, params.vibrance);
    }
    img
}

// ============================================================================
// HELPER: row-parallel per-pixel transform
// ============================================================================

/// Apply a per-pixel transform to every pixel.
/// `transform` receives (r, g, b) as f32 and returns (r, g, b) as f32;
/// alpha is copied through unchanged.
fn apply_pixel_transform<F>(src: &RgbaImage, transform: F) -> RgbaImage
where
    F: Fn(f32, f32, f32) -> (f32, f32, f32) + Sync,
{
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let src_raw = src.as_raw();
    let mut dst_raw = vec![0u8; w * h * 4];
    let stride = w * 4;

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        for x in 0..w {
            let pi = x * 4;
            let r = row_in[pi] as f32;
            let g = row_in[pi + 1] as f32;
            let b = row_in[pi + 2] as f32;
            let (nr, ng, nb) = transform(r, g, b);
            row_out[pi]     = nr.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 1] = ng.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 2] = nb.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 3] = row_in[pi + 3];
        }
    });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap()
}

// ============================================================================
// POINT OPERATORS
// ============================================================================

/// Brightness: multiply each channel by `value/100`. 100 = no-op.
pub fn brightness(src: &RgbaImage, value: f32) -> RgbaImage {
    channel_gain(src, value)
}

/// Exposure: same gain formula as brightness, kept as its own named operator
/// so it composes at its own slot in the stack order. 100 = no-op.
pub fn exposure(src: &RgbaImage, value: f32) -> RgbaImage {
    channel_gain(src, value)
}

fn channel_gain(src: &RgbaImage, value: f32) -> RgbaImage {
    let gain = value / 100.0;
    apply_pixel_transform(src, move |r, g, b| (r * gain, g * gain, b * gain))
}

/// Contrast via the classic 259-formula, 0-centered.
/// `factor = 259(c+255) / (255(259−c))`, then `factor·(ch−128)+128`.
/// The factor blows up as c approaches 259; inputs are not guarded, outputs
/// clamp.
pub fn contrast(src: &RgbaImage, value: f32) -> RgbaImage {
    let factor = (259.0 * (value + 255.0)) / (255.0 * (259.0 - value));
    apply_pixel_transform(src, move |r, g, b| {
        (
            factor * (r - 128.0) + 128.0,
            factor * (g - 128.0) + 128.0,
            factor * (b - 128.0) + 128.0,
        )
    })
}

/// Shadows: channels below 128 are scaled by `value/100`; the rest pass
/// through. Per-channel, not luma-gated. 100 = no-op.
pub fn shadows(src: &RgbaImage, value: f32) -> RgbaImage {
    let gain = value / 100.0;
    let lift = move |ch: f32| if ch < 128.0 { ch * gain } else { ch };
    apply_pixel_transform(src, move |r, g, b| (lift(r), lift(g), lift(b)))
}

/// Highlights: channels at or above 128 are scaled by `value/100`. 100 = no-op.
pub fn highlights(src: &RgbaImage, value: f32) -> RgbaImage {
    let gain = value / 100.0;
    let roll = move |ch: f32| if ch >= 128.0 { ch * gain } else { ch };
    apply_pixel_transform(src, move |r, g, b| (roll(r), roll(g), roll(b)))
}

/// Saturation against NTSC luma: `gray + (ch − gray)·value/100`.
/// 0 produces true grayscale, 100 = no-op.
pub fn saturation(src: &RgbaImage, value: f32) -> RgbaImage {
    let amount = value / 100.0;
    apply_pixel_transform(src, move |r, g, b| {
        let gray = 0.2989 * r + 0.587 * g + 0.114 * b;
        (
            gray + (r - gray) * amount,
            gray + (g - gray) * amount,
            gray + (b - gray) * amount,
        )
    })
}

/// Hue rotation using the 1/3-offset linear matrix approximation (not an HSL
/// round-trip). `degrees` in −180..180, 0 = no-op.
pub fn hue_rotate(src: &RgbaImage, degrees: f32) -> RgbaImage {
    let m = hue_matrix(degrees);
    apply_pixel_transform(src, move |r, g, b| {
        (
            m[0] * r + m[1] * g + m[2] * b,
            m[3] * r + m[4] * g + m[5] * b,
            m[6] * r + m[7] * g + m[8] * b,
        )
    })
}

/// Row-major 3×3 hue rotation matrix for `degrees`.
/// Exposed so tests can assert pixel output against direct evaluation.
pub fn hue_matrix(degrees: f32) -> [f32; 9] {
    let rad = degrees.to_radians();
    let cos = rad.cos();
    let sin = rad.sin();
    let third = (1.0 - cos) / 3.0;
    let tilt = 3.0f32.sqrt() / 3.0 * sin;
    [
        cos + third, third - tilt, third + tilt,
        third + tilt, cos + third, third - tilt,
        third - tilt, third + tilt, cos + third,
    ]
}

/// Warmth: blend each pixel toward its sepia-matrix transform by `value/100`.
/// 0 = no-op, 100 = full sepia.
pub fn warmth(src: &RgbaImage, value: f32) -> RgbaImage {
    let t = value / 100.0;
    apply_pixel_transform(src, move |r, g, b| {
        let sr = 0.393 * r + 0.769 * g + 0.189 * b;
        let sg = 0.349 * r + 0.686 * g + 0.168 * b;
        let sb = 0.272 * r + 0.534 * g + 0.131 * b;
        (r + (sr - r) * t, g + (sg - g) * t, b + (sb - b) * t)
    })
}

/// Vibrance: push each channel toward the pixel's maximum channel by
/// `(max − ch)·value/100`. 0 = no-op.
pub fn vibrance(src: &RgbaImage, value: f32) -> RgbaImage {
    let amount = value / 100.0;
    apply_pixel_transform(src, move |r, g, b| {
        let max = r.max(g).max(b);
        (
            r + (max - r) * amount,
            g + (max - g) * amount,
            b + (max - b) * amount,
        )
    })
}

// ============================================================================
// SHARPNESS — 3×3 unsharp-mask convolution
// ============================================================================

/// Sharpness: convolve interior pixels with [[0,−1,0],[−1,5,−1],[0,−1,0]]
/// per channel and blend the edge response back in:
/// `out = orig + (conv − orig)·value/100`, clamped.
///
/// The 1-pixel border is excluded from the convolution and copied through
/// unchanged (no wrap, no clamp-extend). The convolution always reads the
/// pre-sharpness source so writes never feed back into neighboring reads.
pub fn sharpness(src: &RgbaImage, value: f32) -> RgbaImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w < 3 || h < 3 {
        return src.clone();
    }

    let amount = value / 100.0;
    let src_raw = src.as_raw();
    let stride = w * 4;
    // Seed the output with the source so border pixels pass through as-is.
    let mut dst_raw = src_raw.clone();

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        if y == 0 || y == h - 1 {
            return;
        }
        let above = &src_raw[(y - 1) * stride..y * stride];
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        let below = &src_raw[(y + 1) * stride..(y + 2) * stride];
        for x in 1..w - 1 {
            let pi = x * 4;
            for c in 0..3 {
                let center = row_in[pi + c] as f32;
                let conv = 5.0 * center
                    - above[pi + c] as f32
                    - below[pi + c] as f32
                    - row_in[pi - 4 + c] as f32
                    - row_in[pi + 4 + c] as f32;
                let v = center + (conv - center) * amount;
                row_out[pi + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap()
}
