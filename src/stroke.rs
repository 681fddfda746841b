// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Expanding polylines into filled stroke outlines.

use crate::flatten::{Point, Shape, PIXEL_ERROR_MARGIN};
use alloc::vec;
use alloc::vec::Vec;
use core::f32::consts::TAU;
use peniko::kurbo::{Cap, Join, Stroke};
#[cfg(not(feature = "std"))]
use peniko::kurbo::common::FloatFuncs as _;
use smallvec::SmallVec;

/// Expand flattened shapes into the filled outline of their stroke.
///
/// Every edge becomes a width-aligned quad; vertices get joins, open ends
/// get caps, and a dash pattern slices the polyline into capped pieces
/// first. The outline is a pile of overlapping closed shapes that fills
/// correctly under the non-zero rule.
///
/// A stroke width of zero (or less) produces nothing.
pub fn stroke(shapes: &[Shape], style: &Stroke, pixel_scale: f32) -> Vec<Shape> {
    let width = style.width as f32;
    if !(width > 0.0) {
        return vec![];
    }
    let half = width / 2.0;
    let tolerance = PIXEL_ERROR_MARGIN as f32 / pixel_scale;
    let dashes = normalize_dashes(style);

    let mut out = Vec::new();
    for shape in shapes {
        if dashes.is_empty() {
            stroke_polyline(
                &mut out,
                &shape.points,
                shape.is_closed(),
                style,
                half,
                tolerance,
            );
        } else {
            for piece in dash_polyline(&shape.points, &dashes, style.dash_offset as f32) {
                stroke_polyline(&mut out, &piece, false, style, half, tolerance);
            }
        }
    }
    out
}

/// Dash pattern in f32, odd patterns repeated to even length.
///
/// Returns an empty buffer when the pattern is absent or unusable (negative
/// or all-zero lengths), which turns dashing off.
fn normalize_dashes(style: &Stroke) -> SmallVec<[f32; 8]> {
    let mut dashes: SmallVec<[f32; 8]> =
        style.dash_pattern.iter().map(|d| *d as f32).collect();
    if dashes.iter().any(|d| *d < 0.0) || dashes.iter().sum::<f32>() <= 0.0 {
        dashes.clear();
        return dashes;
    }
    if dashes.len() % 2 == 1 {
        let repeat: SmallVec<[f32; 8]> = dashes.clone();
        dashes.extend(repeat);
    }
    dashes
}

/// Slice a polyline into its "on" pieces.
fn dash_polyline(points: &[Point], dashes: &[f32], offset: f32) -> Vec<Vec<Point>> {
    let total: f32 = dashes.iter().sum();
    let mut position = offset - total * (offset / total).floor();
    let mut index = 0;
    while position >= dashes[index] {
        position -= dashes[index];
        index = (index + 1) % dashes.len();
    }
    let mut on = index % 2 == 0;
    let mut remaining = dashes[index] - position;

    let mut pieces = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    if on {
        if let Some(&first) = points.first() {
            current.push(first);
        }
    }

    for edge in points.windows(2) {
        let (mut a, b) = (edge[0], edge[1]);
        let mut len = length(b - a);
        if len == 0.0 {
            continue;
        }
        let dir = (b - a) * (1.0 / len);

        while len >= remaining {
            let cut = a + dir * remaining;
            len -= remaining;
            a = cut;
            if on {
                push_vertex(&mut current, cut);
                pieces.push(core::mem::take(&mut current));
            } else {
                current = vec![cut];
            }
            on = !on;
            index = (index + 1) % dashes.len();
            remaining = dashes[index];
        }
        remaining -= len;
        if on {
            push_vertex(&mut current, b);
        }
    }
    if current.len() > 1 {
        pieces.push(current);
    }
    pieces.retain(|piece| piece.len() > 1);
    pieces
}

fn push_vertex(piece: &mut Vec<Point>, p: Point) {
    if piece.last() != Some(&p) {
        piece.push(p);
    }
}

fn stroke_polyline(
    out: &mut Vec<Shape>,
    points: &[Point],
    closed: bool,
    style: &Stroke,
    half: f32,
    tolerance: f32,
) {
    let points = if closed {
        &points[..points.len() - 1]
    } else {
        points
    };
    let n = points.len();
    if n < 2 {
        return;
    }
    let edge_count = if closed { n } else { n - 1 };

    let dir = |i: usize| {
        let a = points[i];
        let b = points[(i + 1) % n];
        let v = b - a;
        v * (1.0 / length(v))
    };

    for i in 0..edge_count {
        emit_rect(out, points[i], points[(i + 1) % n], half);
    }

    let join_range = if closed { 0..n } else { 1..n - 1 };
    for i in join_range {
        let incoming = dir((i + edge_count - 1) % edge_count);
        let outgoing = dir(i);
        emit_join(out, points[i], incoming, outgoing, half, style, tolerance);
    }

    if !closed {
        emit_cap(out, points[0], dir(0) * -1.0, style.start_cap, half, tolerance);
        emit_cap(
            out,
            points[n - 1],
            dir(n - 2),
            style.end_cap,
            half,
            tolerance,
        );
    }
}

/// A filled quad of the stroke width along the edge `a`→`b`.
fn emit_rect(out: &mut Vec<Shape>, a: Point, b: Point, half: f32) {
    let v = b - a;
    let len = length(v);
    if len == 0.0 {
        return;
    }
    let n = perp(v * (1.0 / len)) * half;
    out.push(Shape::new(vec![a + n, b + n, b - n, a - n, a + n]));
}

/// A cap at `p`, opening in the `outward` direction.
fn emit_cap(
    out: &mut Vec<Shape>,
    p: Point,
    outward: Point,
    cap: Cap,
    half: f32,
    tolerance: f32,
) {
    match cap {
        Cap::Butt => {}
        Cap::Square => emit_rect(out, p, p + outward * half, half),
        Cap::Round => emit_circle(out, p, half, tolerance),
    }
}

fn emit_join(
    out: &mut Vec<Shape>,
    v: Point,
    incoming: Point,
    outgoing: Point,
    half: f32,
    style: &Stroke,
    tolerance: f32,
) {
    let turn = cross(incoming, outgoing);
    // The gap between the two edge quads is a triangle on the outside of
    // the turn with this area. Joins below the pixel error margin are
    // skipped.
    let area = 0.5 * half * half * turn.abs();
    if area < tolerance {
        return;
    }

    let side = if turn > 0.0 { -1.0 } else { 1.0 };
    let o0 = v + perp(incoming) * (half * side);
    let o1 = v + perp(outgoing) * (half * side);

    match style.join {
        Join::Round => emit_circle(out, v, half, tolerance),
        Join::Bevel => out.push(Shape::new(vec![v, o0, o1, v])),
        Join::Miter => {
            let miter_limit = (style.miter_limit as f32).max(1.0);
            let miter_angle_limit = 2.0 * (1.0 / miter_limit).asin();
            let bend = dot(incoming * -1.0, outgoing).clamp(-1.0, 1.0).acos();
            if bend > miter_angle_limit {
                // The tip of the miter is where the two outer offset lines
                // meet.
                let t = cross(o1 - o0, outgoing) / turn;
                let tip = o0 + incoming * t;
                out.push(Shape::new(vec![v, o0, tip, o1, v]));
            } else {
                out.push(Shape::new(vec![v, o0, o1, v]));
            }
        }
    }
}

/// A filled polygonal circle, subdivided to the flattening tolerance.
fn emit_circle(out: &mut Vec<Shape>, center: Point, radius: f32, tolerance: f32) {
    let step = if radius > tolerance {
        2.0 * (1.0 - tolerance / radius).acos()
    } else {
        TAU / 8.0
    };
    let count = ((TAU / step) as usize + 1).max(8);
    let mut points = Vec::with_capacity(count + 1);
    for i in 0..count {
        let a = i as f32 * TAU / count as f32;
        points.push(Point::new(
            center.x + radius * a.cos(),
            center.y + radius * a.sin(),
        ));
    }
    points.push(points[0]);
    out.push(Shape::new(points));
}

fn length(v: Point) -> f32 {
    (v.x * v.x + v.y * v.y).sqrt()
}

fn dot(a: Point, b: Point) -> f32 {
    a.x * b.x + a.y * b.y
}

fn cross(a: Point, b: Point) -> f32 {
    a.x * b.y - a.y * b.x
}

/// The perpendicular on the clockwise side of `v` in y-down coordinates.
fn perp(v: Point) -> Point {
    Point::new(-v.y, v.x)
}
