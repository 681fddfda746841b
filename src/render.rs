// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The public rasterization entry points.
//!
//! Every draw runs the same pipeline: flatten the path (strokes are expanded
//! to their filled outline first), convert the shapes into winding segments,
//! rasterize per-scanline coverage, and composite that coverage into the
//! destination. All scratch state is per call; two draws never share
//! buffers.

use crate::blend;
use crate::coverage::{self, should_fill, Window};
use crate::fine::{self, Fine};
use crate::flatten::{flatten, Point, Shape};
use crate::mask::Mask;
use crate::paint::{Paint, PaintKind, PremulColor};
use crate::path::Path;
use crate::pixmap::Pixmap;
use crate::segment::{segments, Segment};
use crate::util::{norm_mul, pixel_scale, simd_level};
use alloc::vec::Vec;
use peniko::color::{AlphaColor, PremulRgba8, Srgb};
use peniko::kurbo::{self, Affine, Rect, Stroke};
use peniko::{BlendMode, Fill};

/// Fill a path into a pixmap.
pub fn fill_path(
    pixmap: &mut Pixmap,
    path: &Path,
    paint: &Paint,
    transform: Affine,
    fill_rule: Fill,
) {
    let shapes = fill_shapes(path, transform);
    draw(pixmap, &shapes, paint, fill_rule);
}

/// Stroke a path into a pixmap.
///
/// The stroke outline is produced in user space, so the stroke width scales
/// with the transform.
pub fn stroke_path(
    pixmap: &mut Pixmap,
    path: &Path,
    paint: &Paint,
    transform: Affine,
    stroke: &Stroke,
) {
    let shapes = stroke_shapes(path, transform, stroke);
    draw(pixmap, &shapes, paint, Fill::NonZero);
}

/// Fill a path into an alpha mask.
pub fn fill_path_mask(
    mask: &mut Mask,
    path: &Path,
    transform: Affine,
    fill_rule: Fill,
    blend_mode: BlendMode,
) {
    let shapes = fill_shapes(path, transform);
    draw_mask(mask, &shapes, fill_rule, blend_mode);
}

/// Stroke a path into an alpha mask.
pub fn stroke_path_mask(
    mask: &mut Mask,
    path: &Path,
    transform: Affine,
    stroke: &Stroke,
    blend_mode: BlendMode,
) {
    let shapes = stroke_shapes(path, transform, stroke);
    draw_mask(mask, &shapes, Fill::NonZero, blend_mode);
}

/// Fill a path into a fresh mask of the given size.
pub fn fill_mask(path: &Path, width: u16, height: u16, fill_rule: Fill) -> Mask {
    let mut mask = Mask::new(width, height);
    fill_path_mask(&mut mask, path, Affine::IDENTITY, fill_rule, BlendMode::default());
    mask
}

/// Fill a path into a fresh pixmap of the given size.
pub fn fill_image(
    path: &Path,
    width: u16,
    height: u16,
    color: AlphaColor<Srgb>,
    fill_rule: Fill,
) -> Pixmap {
    let mut pixmap = Pixmap::new(width, height);
    fill_path(
        &mut pixmap,
        path,
        &Paint::solid(color),
        Affine::IDENTITY,
        fill_rule,
    );
    pixmap
}

/// The bounding box of a path under a transform.
///
/// An empty (or NaN-carrying, and therefore ignored) path reports
/// [`Rect::ZERO`]; treat an empty rect as "no geometry".
pub fn compute_bounds(path: &Path, transform: Affine) -> Rect {
    let shapes = fill_shapes(path, transform);
    let mut min = Point::new(f32::INFINITY, f32::INFINITY);
    let mut max = Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
    for shape in &shapes {
        for p in &shape.points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
    }
    if min.x > max.x || min.y > max.y {
        return Rect::ZERO;
    }
    Rect::new(
        f64::from(min.x),
        f64::from(min.y),
        f64::from(max.x),
        f64::from(max.y),
    )
}

/// Whether the filled path covers the given point.
pub fn fill_overlaps(path: &Path, point: kurbo::Point, transform: Affine, fill_rule: Fill) -> bool {
    let shapes = fill_shapes(path, transform);
    overlaps(&segments(&shapes), point, fill_rule)
}

/// Whether the stroked path covers the given point.
pub fn stroke_overlaps(
    path: &Path,
    point: kurbo::Point,
    transform: Affine,
    stroke: &Stroke,
) -> bool {
    let shapes = stroke_shapes(path, transform, stroke);
    overlaps(&segments(&shapes), point, Fill::NonZero)
}

/// Cast a horizontal ray from the left and count winding of the crossings
/// left of the point.
fn overlaps(segments: &[Segment], point: kurbo::Point, fill_rule: Fill) -> bool {
    let (px, py) = (point.x as f32, point.y as f32);
    let mut winding = 0_i32;
    for segment in segments {
        if segment.at.y <= py && py < segment.to.y {
            let x = if segment.at.x == segment.to.x {
                segment.at.x
            } else {
                let m = (segment.to.y - segment.at.y) / (segment.to.x - segment.at.x);
                segment.at.x + (py - segment.at.y) / m
            };
            if x < px {
                winding += i32::from(segment.winding);
            }
        }
    }
    should_fill(fill_rule, winding)
}

/// Flatten for filling: sub-paths closed, device space.
fn fill_shapes(path: &Path, transform: Affine) -> Vec<Shape> {
    let mut shapes = flatten(path.commands(), true, pixel_scale(&transform));
    transform_shapes(&mut shapes, &transform);
    shapes
}

/// Flatten and expand for stroking: sub-paths stay open for the cap logic,
/// and the outline is built before the transform is applied.
fn stroke_shapes(path: &Path, transform: Affine, stroke: &Stroke) -> Vec<Shape> {
    let scale = pixel_scale(&transform);
    let flattened = flatten(path.commands(), false, scale);
    let mut shapes = crate::stroke::stroke(&flattened, stroke, scale);
    transform_shapes(&mut shapes, &transform);
    shapes
}

fn transform_shapes(shapes: &mut [Shape], transform: &Affine) {
    if *transform == Affine::IDENTITY {
        return;
    }
    for shape in shapes {
        for p in &mut shape.points {
            let q = *transform * kurbo::Point::new(f64::from(p.x), f64::from(p.y));
            *p = Point::new(q.x as f32, q.y as f32);
        }
    }
}

fn draw(pixmap: &mut Pixmap, shapes: &[Shape], paint: &Paint, fill_rule: Fill) {
    if paint.opacity <= 0.0 {
        return;
    }
    match &paint.kind {
        PaintKind::Solid(color) => {
            let color = PremulColor::from_alpha_color(color.multiply_alpha(paint.opacity));
            draw_solid(pixmap, shapes, color, paint.blend_mode, fill_rule);
        }
        PaintKind::Source(source) => {
            let (width, height) = (pixmap.width(), pixmap.height());
            // Non-solid paints are rendered to an intermediate, masked by
            // the path's coverage, and composited as a whole.
            let mut mask = Mask::new(width, height);
            draw_mask(&mut mask, shapes, fill_rule, BlendMode::default());
            let mut intermediate = source.render(width, height);
            debug_assert_eq!(
                (intermediate.width(), intermediate.height()),
                (width, height),
                "paint sources must render at the requested size"
            );
            apply_mask(&mut intermediate, &mask);
            fine::composite_pixmap(pixmap, &intermediate, paint.blend_mode, paint.opacity);
        }
    }
}

fn draw_solid(
    pixmap: &mut Pixmap,
    shapes: &[Shape],
    color: PremulColor,
    blend_mode: BlendMode,
    fill_rule: Fill,
) {
    let level = simd_level();
    let segments = segments(shapes);
    let fine = Fine::new(level, color, blend_mode);

    let Some(window) = Window::new(&segments, pixmap.width(), pixmap.height()) else {
        if blend::is_masking(blend_mode) {
            pixmap.fill(PremulRgba8::from_u32(0));
        }
        return;
    };

    let (left, right) = (usize::from(window.left), usize::from(window.right));
    coverage::rasterize(level, &segments, window, fill_rule, |y, cov| {
        fine.fill_row(&mut pixmap.row_mut(y)[left..right], cov);
    });

    if fine.masking() {
        clear_pixmap_outside(pixmap, window);
    }
}

fn draw_mask(mask: &mut Mask, shapes: &[Shape], fill_rule: Fill, blend_mode: BlendMode) {
    let level = simd_level();
    let segments = segments(shapes);
    let fine = Fine::new(
        level,
        PremulColor::from_alpha_color(peniko::color::palette::css::WHITE),
        blend_mode,
    );

    let Some(window) = Window::new(&segments, mask.width(), mask.height()) else {
        if blend::is_masking(blend_mode) {
            mask.data_mut().fill(0);
        }
        return;
    };

    let (left, right) = (usize::from(window.left), usize::from(window.right));
    coverage::rasterize(level, &segments, window, fill_rule, |y, cov| {
        fine.fill_mask_row(&mut mask.row_mut(y)[left..right], cov);
    });

    if fine.masking() {
        clear_mask_outside(mask, window);
    }
}

/// Multiply a pixmap by a coverage mask of the same size.
fn apply_mask(pixmap: &mut Pixmap, mask: &Mask) {
    for (pixel, &alpha) in pixmap.data_mut().iter_mut().zip(mask.data()) {
        *pixel = PremulRgba8 {
            r: norm_mul(pixel.r, alpha),
            g: norm_mul(pixel.g, alpha),
            b: norm_mul(pixel.b, alpha),
            a: norm_mul(pixel.a, alpha),
        };
    }
}

/// Masking composition holds globally: everything the fill window never
/// touched is cleared after the fill.
fn clear_pixmap_outside(pixmap: &mut Pixmap, window: Window) {
    let transparent = PremulRgba8::from_u32(0);
    for y in 0..pixmap.height() {
        let row = pixmap.row_mut(y);
        if y < window.top || y >= window.bottom {
            row.fill(transparent);
        } else {
            row[..usize::from(window.left)].fill(transparent);
            row[usize::from(window.right)..].fill(transparent);
        }
    }
}

fn clear_mask_outside(mask: &mut Mask, window: Window) {
    for y in 0..mask.height() {
        let row = mask.row_mut(y);
        if y < window.top || y >= window.bottom {
            row.fill(0);
        } else {
            row[..usize::from(window.left)].fill(0);
            row[usize::from(window.right)..].fill(0);
        }
    }
}
