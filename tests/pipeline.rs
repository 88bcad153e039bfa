// End-to-end checks of the edit pipeline through the public API: every render
// derives from the immutable original plus the current parameter snapshot.

use image::{Rgba, RgbaImage};
use instaedit::{EditSession, FilterParams, Mask, SessionState};

fn gradient(w: u32, h: u32) -> RgbaImage {
    let mut img = RgbaImage::new(w, h);
    for (x, y, px) in img.enumerate_pixels_mut() {
        *px = Rgba([
            ((x * 255) / w.max(1)) as u8,
            ((y * 255) / h.max(1)) as u8,
            ((x + y) % 256) as u8,
            255,
        ]);
    }
    img
}

fn max_channel_diff(a: &RgbaImage, b: &RgbaImage) -> u8 {
    a.as_raw()
        .iter()
        .zip(b.as_raw().iter())
        .map(|(&x, &y)| x.abs_diff(y))
        .max()
        .unwrap_or(0)
}

#[test]
fn neutral_render_reproduces_the_original() {
    let img = gradient(32, 24);
    let mut session = EditSession::new();
    session.load_image(img.clone());
    let out = session.working().unwrap();
    assert!(max_channel_diff(&img, out) <= 1);
}

#[test]
fn renders_are_deterministic_for_a_snapshot() {
    let mut a = EditSession::new();
    let mut b = EditSession::new();
    for s in [&mut a, &mut b] {
        s.load_image(gradient(20, 20));
        s.filters = FilterParams {
            brightness: 120.0,
            contrast: 25.0,
            saturation: 140.0,
            hue: -60.0,
            sharpness: 75.0,
            vibrance: 15.0,
            ..FilterParams::default()
        };
        s.render();
    }
    assert_eq!(a.working().unwrap(), b.working().unwrap());
}

#[test]
fn parameter_changes_never_compound() {
    let mut session = EditSession::new();
    session.load_image(gradient(16, 16));

    session.filters.brightness = 150.0;
    session.render();
    let bright = session.working().unwrap().clone();

    // Slam through intermediate values; only the final snapshot matters.
    for value in [40.0, 180.0, 90.0, 150.0] {
        session.filters.brightness = value;
        session.render();
    }
    assert_eq!(session.working().unwrap(), &bright);
}

#[test]
fn white_buffer_scenario() {
    // 4×4 all-white at brightness 50 renders mid-gray; desaturating the gray
    // result changes nothing.
    let mut session = EditSession::new();
    session.load_image(RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255])));
    session.filters.brightness = 50.0;
    session.render();
    for px in session.working().unwrap().pixels() {
        assert!(px[0].abs_diff(128) <= 1);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert_eq!(px[3], 255);
    }

    session.filters.saturation = 0.0;
    let gray = session.working().unwrap().clone();
    session.render();
    assert_eq!(session.working().unwrap(), &gray);
}

#[test]
fn four_rotation_steps_return_to_original_dimensions() {
    let img = gradient(30, 18);
    let mut session = EditSession::new();
    session.load_image(img.clone());

    for step in 1..=4 {
        session.rotate_step(90.0);
        let out = session.working().unwrap();
        if step % 2 == 1 {
            assert!(out.width().abs_diff(18) <= 1, "step {step}");
            assert!(out.height().abs_diff(30) <= 1, "step {step}");
        }
    }
    // The accumulated angle wrapped to 0: the render is an exact reproduction,
    // not a four-times-resampled one.
    assert_eq!(session.rotation_deg(), 0.0);
    assert_eq!(session.working().unwrap(), &img);
}

#[test]
fn crop_commit_shrinks_both_buffers() {
    let img = gradient(50, 40);
    let mut session = EditSession::new();
    session.load_image(img.clone());

    session.begin_crop().unwrap();
    assert_eq!(session.state(), SessionState::Cropping);
    session.move_crop(10.0, 5.0);
    assert!(session.commit_crop());

    let out = session.working().unwrap();
    assert_eq!(out.dimensions(), (15, 12)); // 30% of 50×40
    // Every cropped pixel equals the source region pixel.
    for (x, y, px) in out.enumerate_pixels() {
        assert_eq!(px, img.get_pixel(x + 10, y + 5), "({x},{y})");
    }
}

#[test]
fn discarded_crop_restores_the_rendered_buffer() {
    let mut session = EditSession::new();
    session.load_image(gradient(40, 40));
    let before = session.working().unwrap().clone();
    session.begin_crop().unwrap();
    session.move_crop(3.0, 3.0);
    session.discard_crop();
    assert_eq!(session.state(), SessionState::Rendered);
    assert_eq!(session.working().unwrap(), &before);
}

#[test]
fn all_ones_mask_composite_restores_original() {
    let img = gradient(12, 12);
    let mut session = EditSession::new();
    session.load_image(img.clone());
    session.filters.brightness = 60.0;
    session.filters.hue = 120.0;

    let mask = Mask::from_raw(12, 12, vec![1; 144]).unwrap();
    let out = session.composite_behind_subject(&mask).unwrap();
    assert_eq!(out, &img);
}

#[test]
fn all_zeros_mask_composite_keeps_the_edit() {
    let mut session = EditSession::new();
    session.load_image(gradient(12, 12));
    session.filters.brightness = 60.0;
    session.render();
    let edited = session.working().unwrap().clone();

    let mask = Mask::from_raw(12, 12, vec![0; 144]).unwrap();
    let out = session.composite_behind_subject(&mask).unwrap();
    assert_eq!(out, &edited);
}

#[test]
fn coarse_service_mask_composites_against_full_resolution() {
    // The segmentation service returns a fixed-size mask regardless of the
    // image size; nearest-neighbor mapping covers the full image.
    let img = gradient(64, 48);
    let mut session = EditSession::new();
    session.load_image(img.clone());
    session.filters.saturation = 0.0;

    // Left half foreground at 16×16.
    let rows: Vec<Vec<u8>> = (0..16)
        .map(|_| (0..16).map(|x| u8::from(x < 8)).collect())
        .collect();
    let mask = Mask::from_rows(&rows).unwrap();

    let out = session.composite_behind_subject(&mask).unwrap().clone();
    // Foreground (left half): original colors restored.
    assert_eq!(out.get_pixel(2, 10), img.get_pixel(2, 10));
    // Background (right half): desaturated gray survives.
    let px = out.get_pixel(60, 10);
    assert_eq!(px[0], px[1]);
    assert_eq!(px[1], px[2]);
}

#[test]
fn reset_returns_to_a_pristine_render() {
    let img = gradient(25, 25);
    let mut session = EditSession::new();
    session.load_image(img.clone());
    session.filters.contrast = 50.0;
    session.filters.warmth = 80.0;
    session.set_rotation(90.0);
    session.render();
    assert_ne!(session.working().unwrap(), &img);

    session.reset();
    assert_eq!(session.working().unwrap(), &img);
    assert!(session.filters.is_neutral());
}
