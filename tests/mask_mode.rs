// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Masking composition must hold globally, not just on touched pixels.

use scanfill::color::palette::css;
use scanfill::color::PremulRgba8;
use scanfill::kurbo::Affine;
use scanfill::peniko::{BlendMode, Compose, Fill, Mix};
use scanfill::{fill_path, fill_path_mask, Mask, Paint, Path, Pixmap};

fn masking() -> BlendMode {
    BlendMode::new(Mix::Normal, Compose::DestIn)
}

#[test]
fn masking_a_mask_clears_everything_outside_the_fill() {
    let mut mask = Mask::from_parts(vec![200; 20 * 20], 20, 20);
    let path: Path = "M5 5 L15 5 L15 15 L5 15 Z".parse().unwrap();
    fill_path_mask(&mut mask, &path, Affine::IDENTITY, Fill::NonZero, masking());

    for y in 0..20_u16 {
        for x in 0..20_u16 {
            let inside = (5..15).contains(&x) && (5..15).contains(&y);
            let expected = u8::from(inside) * 200;
            assert_eq!(mask.sample(x, y), expected, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn an_unclosed_path_still_masks_globally() {
    let mut mask = Mask::from_parts(vec![255; 20 * 20], 20, 20);
    // Filling closes this into the triangle (5,5) (15,5) (15,15).
    let path: Path = "M5 5 L15 5 L15 15".parse().unwrap();
    fill_path_mask(&mut mask, &path, Affine::IDENTITY, Fill::NonZero, masking());

    // Inside the triangle.
    assert_eq!(mask.sample(13, 9), 255);
    // Inside the fill window but outside the triangle.
    assert_eq!(mask.sample(6, 13), 0);
    // Outside the fill window entirely.
    assert_eq!(mask.sample(1, 1), 0);
    assert_eq!(mask.sample(19, 19), 0);
}

#[test]
fn masking_with_an_empty_path_clears_the_whole_mask() {
    let mut mask = Mask::from_parts(vec![99; 8 * 8], 8, 8);
    fill_path_mask(
        &mut mask,
        &Path::new(),
        Affine::IDENTITY,
        Fill::NonZero,
        masking(),
    );
    assert!(mask.data().iter().all(|v| *v == 0));
}

#[test]
fn masking_an_image_keeps_only_the_covered_pixels() {
    let mut pixmap = Pixmap::new(16, 16);
    pixmap.fill(css::GREEN.premultiply().to_rgba8());

    let path: Path = "M4 4 L12 4 L12 12 L4 12 Z".parse().unwrap();
    fill_path(
        &mut pixmap,
        &path,
        &Paint::from(css::WHITE).with_blend_mode(masking()),
        Affine::IDENTITY,
        Fill::NonZero,
    );

    let green = css::GREEN.premultiply().to_rgba8();
    let transparent = PremulRgba8 { r: 0, g: 0, b: 0, a: 0 };
    assert_eq!(pixmap.sample(8, 8), green);
    assert_eq!(pixmap.sample(2, 8), transparent);
    assert_eq!(pixmap.sample(8, 14), transparent);
    assert_eq!(pixmap.sample(15, 15), transparent);
}
