// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flattening path commands into polygonal sub-shapes.

use crate::path::PathCommand;
use alloc::vec;
use alloc::vec::Vec;
use core::f64::consts::TAU;
use log::warn;
use peniko::kurbo::{self, Vec2};
#[cfg(not(feature = "std"))]
use peniko::kurbo::common::FloatFuncs as _;

/// The maximum deviation of a flattened segment from the true curve, in
/// user units, before accounting for the pixel scale.
pub(crate) const PIXEL_ERROR_MARGIN: f64 = 0.2;

/// Steps smaller than this are accepted regardless of error, so degenerate
/// curves cannot stall the subdivision.
const MIN_STEP: f64 = 1e-6;

/// A point in device-friendly f32 precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// The x coordinate of the point.
    pub x: f32,
    /// The y coordinate of the point.
    pub y: f32,
}

impl Point {
    /// The point `(0, 0)`.
    pub const ZERO: Self = Self::new(0., 0.);

    /// Create a new point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl core::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl core::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl core::ops::Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// A polygonal sub-shape: an ordered run of vertices.
///
/// The shape is closed when its first and last vertices are equal. The
/// flattener never emits zero-length edges or consecutive duplicate
/// vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    /// The vertices of the shape.
    pub points: Vec<Point>,
}

impl Shape {
    /// Create a shape from a vertex run.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Whether the first and last vertices coincide.
    pub fn is_closed(&self) -> bool {
        self.points.len() > 2 && self.points.first() == self.points.last()
    }
}

/// Flatten path commands into polygonal sub-shapes.
///
/// `pixel_scale` is the largest singular value of the transform that will be
/// applied to the output; the flattening tolerance shrinks by that factor so
/// the deviation stays below [`PIXEL_ERROR_MARGIN`] device pixels. With
/// `close_subpaths`, sub-paths left open by the command stream are closed,
/// which filling requires and stroking must not do.
///
/// A path containing NaN is ill-defined and flattens to nothing.
pub fn flatten(commands: &[PathCommand], close_subpaths: bool, pixel_scale: f32) -> Vec<Shape> {
    let margin = PIXEL_ERROR_MARGIN / f64::from(pixel_scale.max(1e-6));
    let mut flattener = Flattener {
        sq_tolerance: margin * margin,
        close_subpaths,
        shapes: vec![],
        points: vec![],
        start: kurbo::Point::ZERO,
        at: kurbo::Point::ZERO,
        cubic_ctrl: None,
        quad_ctrl: None,
        is_nan: false,
    };

    for command in commands {
        flattener.apply(command);
    }
    flattener.flush(close_subpaths);

    if flattener.is_nan {
        warn!("A path contains NaN, ignoring it.");
        return vec![];
    }
    flattener.shapes
}

/// The flattening state threaded through one traversal.
///
/// The smooth-curve carry (`cubic_ctrl`, `quad_ctrl`) lives here rather than
/// in the path: a reflection is only meaningful while walking consecutive
/// commands.
struct Flattener {
    sq_tolerance: f64,
    close_subpaths: bool,
    shapes: Vec<Shape>,
    points: Vec<Point>,
    start: kurbo::Point,
    at: kurbo::Point,
    cubic_ctrl: Option<kurbo::Point>,
    quad_ctrl: Option<kurbo::Point>,
    is_nan: bool,
}

impl Flattener {
    fn apply(&mut self, command: &PathCommand) {
        use PathCommand::*;

        let at = self.at;
        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;

        match *command {
            MoveTo(p) => self.begin(p),
            RelMoveTo(v) => self.begin(at + v),
            LineTo(p) => self.line_to(p),
            RelLineTo(v) => self.line_to(at + v),
            HorizTo(x) => self.line_to(kurbo::Point::new(x, at.y)),
            RelHorizTo(dx) => self.line_to(kurbo::Point::new(at.x + dx, at.y)),
            VertTo(y) => self.line_to(kurbo::Point::new(at.x, y)),
            RelVertTo(dy) => self.line_to(kurbo::Point::new(at.x, at.y + dy)),
            CubicTo(c1, c2, p) => {
                self.cubic_to(c1, c2, p);
                cubic_ctrl = Some(c2);
            }
            RelCubicTo(v1, v2, v) => {
                self.cubic_to(at + v1, at + v2, at + v);
                cubic_ctrl = Some(at + v2);
            }
            SmoothCubicTo(c2, p) => {
                self.cubic_to(self.reflected_cubic_ctrl(), c2, p);
                cubic_ctrl = Some(c2);
            }
            RelSmoothCubicTo(v2, v) => {
                self.cubic_to(self.reflected_cubic_ctrl(), at + v2, at + v);
                cubic_ctrl = Some(at + v2);
            }
            QuadTo(c, p) => {
                self.quad_to(c, p);
                quad_ctrl = Some(c);
            }
            RelQuadTo(vc, v) => {
                self.quad_to(at + vc, at + v);
                quad_ctrl = Some(at + vc);
            }
            SmoothQuadTo(p) => {
                let c = self.reflected_quad_ctrl();
                self.quad_to(c, p);
                quad_ctrl = Some(c);
            }
            RelSmoothQuadTo(v) => {
                let c = self.reflected_quad_ctrl();
                self.quad_to(c, at + v);
                quad_ctrl = Some(c);
            }
            ArcTo {
                radii,
                x_rotation,
                large_arc,
                sweep,
                to,
            } => self.arc_to(radii, x_rotation, large_arc, sweep, to),
            RelArcTo {
                radii,
                x_rotation,
                large_arc,
                sweep,
                to,
            } => self.arc_to(radii, x_rotation, large_arc, sweep, at + to),
            Close => self.close(),
        }

        self.cubic_ctrl = cubic_ctrl;
        self.quad_ctrl = quad_ctrl;
    }

    /// The implicit first control point of a smooth cubic: the previous
    /// cubic's trailing control mirrored about the pen, or the pen itself
    /// when the previous command was not a cubic.
    fn reflected_cubic_ctrl(&self) -> kurbo::Point {
        match self.cubic_ctrl {
            Some(c) => self.at + (self.at - c),
            None => self.at,
        }
    }

    fn reflected_quad_ctrl(&self) -> kurbo::Point {
        match self.quad_ctrl {
            Some(c) => self.at + (self.at - c),
            None => self.at,
        }
    }

    fn begin(&mut self, p: kurbo::Point) {
        self.flush(self.close_subpaths);
        self.start = p;
        self.at = p;
    }

    fn close(&mut self) {
        if !self.points.is_empty() {
            self.add_vertex(self.start);
        }
        self.flush(false);
        self.at = self.start;
    }

    /// Emit the current sub-shape, optionally closing it first.
    fn flush(&mut self, close: bool) {
        if self.points.len() > 1 {
            if close {
                let first = self.points[0];
                if self.points.last() != Some(&first) {
                    self.points.push(first);
                }
            }
            self.shapes.push(Shape::new(core::mem::take(&mut self.points)));
        } else {
            self.points.clear();
        }
    }

    /// Push a vertex, dropping consecutive duplicates.
    fn add_vertex(&mut self, p: kurbo::Point) {
        self.is_nan |= p.x.is_nan() || p.y.is_nan();
        let p = Point::new(p.x as f32, p.y as f32);
        if self.points.last() != Some(&p) {
            self.points.push(p);
        }
    }

    /// Make sure the sub-shape starts at the pen before edges are emitted.
    fn ensure_start(&mut self) {
        if self.points.is_empty() {
            self.add_vertex(self.at);
        }
    }

    fn line_to(&mut self, p: kurbo::Point) {
        self.ensure_start();
        self.add_vertex(p);
        self.at = p;
    }

    fn cubic_to(&mut self, c1: kurbo::Point, c2: kurbo::Point, to: kurbo::Point) {
        let p0 = self.at;
        self.subdivide(
            |t| {
                let mt = 1.0 - t;
                let w0 = mt * mt * mt;
                let w1 = 3.0 * mt * mt * t;
                let w2 = 3.0 * mt * t * t;
                let w3 = t * t * t;
                kurbo::Point::new(
                    w0 * p0.x + w1 * c1.x + w2 * c2.x + w3 * to.x,
                    w0 * p0.y + w1 * c1.y + w2 * c2.y + w3 * to.y,
                )
            },
            true,
        );
        self.at = to;
    }

    fn quad_to(&mut self, c: kurbo::Point, to: kurbo::Point) {
        let p0 = self.at;
        self.subdivide(
            |t| {
                let mt = 1.0 - t;
                let w0 = mt * mt;
                let w1 = 2.0 * mt * t;
                let w2 = t * t;
                kurbo::Point::new(
                    w0 * p0.x + w1 * c.x + w2 * to.x,
                    w0 * p0.y + w1 * c.y + w2 * to.y,
                )
            },
            false,
        );
        self.at = to;
    }

    /// Flatten an elliptical arc in SVG endpoint parameterization.
    fn arc_to(&mut self, radii: Vec2, x_rotation: f64, large_arc: bool, sweep: bool, to: kurbo::Point) {
        let from = self.at;
        let rx = radii.x.abs();
        let ry = radii.y.abs();
        if rx < 1e-12 || ry < 1e-12 || (to - from).hypot() < 1e-12 {
            self.line_to(to);
            return;
        }

        // Endpoint to center parameterization, per the SVG arc
        // implementation notes.
        let phi = x_rotation.to_radians();
        let (sin_phi, cos_phi) = (phi.sin(), phi.cos());
        let dx = (from.x - to.x) / 2.0;
        let dy = (from.y - to.y) / 2.0;
        let x1p = cos_phi * dx + sin_phi * dy;
        let y1p = -sin_phi * dx + cos_phi * dy;

        // Radii too small to span the endpoints are scaled up uniformly.
        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        let (rx, ry) = if lambda > 1.0 {
            let s = lambda.sqrt();
            (rx * s, ry * s)
        } else {
            (rx, ry)
        };

        let rx2 = rx * rx;
        let ry2 = ry * ry;
        let den = rx2 * y1p * y1p + ry2 * x1p * x1p;
        let num = rx2 * ry2 - den;
        let mut q = (num / den).max(0.0).sqrt();
        if large_arc == sweep {
            q = -q;
        }
        let cxp = q * rx * y1p / ry;
        let cyp = -q * ry * x1p / rx;
        let cx = cos_phi * cxp - sin_phi * cyp + (from.x + to.x) / 2.0;
        let cy = sin_phi * cxp + cos_phi * cyp + (from.y + to.y) / 2.0;

        let theta0 = ((y1p - cyp) / ry).atan2((x1p - cxp) / rx);
        let theta1 = ((-y1p - cyp) / ry).atan2((-x1p - cxp) / rx);
        let mut delta = theta1 - theta0;
        if sweep && delta < 0.0 {
            delta += TAU;
        } else if !sweep && delta > 0.0 {
            delta -= TAU;
        }

        self.subdivide(
            |t| {
                let a = theta0 + t * delta;
                let x = rx * a.cos();
                let y = ry * a.sin();
                kurbo::Point::new(
                    cx + cos_phi * x - sin_phi * y,
                    cy + sin_phi * x + cos_phi * y,
                )
            },
            true,
        );
        // Snap the final vertex to the requested end point.
        self.at = to;
    }

    /// Adaptive subdivision over `t ∈ [0, 1]`.
    ///
    /// The trial step is halved while the chord's midpoint strays from the
    /// true half-point by more than the tolerance, and doubled again after
    /// every accepted segment. Quadratics pass `redouble = false`: once a
    /// halving was forced they keep the step, which prevents the
    /// halve/double oscillation their flat error profile invites.
    fn subdivide(&mut self, eval: impl Fn(f64) -> kurbo::Point, redouble: bool) {
        self.ensure_start();

        let mut t: f64 = 0.0;
        let mut step: f64 = 1.0;
        let mut halved = false;
        let mut prev = eval(0.0);

        while 1.0 - t > 1e-12 {
            step = step.min(1.0 - t);
            let t_next = t + step;
            let (t_next, last) = if 1.0 - t_next < 1e-12 {
                (1.0, true)
            } else {
                (t_next, false)
            };

            let half = eval(t + (t_next - t) / 2.0);
            let next = eval(t_next);
            let mid = prev.midpoint(next);
            if mid.distance_squared(half) > self.sq_tolerance && step > MIN_STEP {
                step *= 0.5;
                halved = true;
                continue;
            }

            self.add_vertex(next);
            prev = next;
            if last {
                break;
            }
            t = t_next;
            if redouble || !halved {
                step *= 2.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;

    fn flatten_str(text: &str, close: bool) -> Vec<Shape> {
        let path: Path = text.parse().unwrap();
        flatten(path.commands(), close, 1.0)
    }

    /// Maximum distance from `p` to the polyline.
    fn distance_to_polyline(p: Point, points: &[Point]) -> f32 {
        let mut best = f32::INFINITY;
        for edge in points.windows(2) {
            let (a, b) = (edge[0], edge[1]);
            let (ex, ey) = (b.x - a.x, b.y - a.y);
            let len2 = ex * ex + ey * ey;
            let t = if len2 == 0.0 {
                0.0
            } else {
                (((p.x - a.x) * ex + (p.y - a.y) * ey) / len2).clamp(0.0, 1.0)
            };
            let (dx, dy) = (a.x + t * ex - p.x, a.y + t * ey - p.y);
            best = best.min((dx * dx + dy * dy).sqrt());
        }
        best
    }

    #[test]
    fn lines_pass_through() {
        let shapes = flatten_str("M0 0 L10 0 L10 10", false);
        assert_eq!(shapes.len(), 1);
        assert_eq!(
            shapes[0].points,
            [
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0)
            ]
        );
        assert!(!shapes[0].is_closed());
    }

    #[test]
    fn close_subpaths_closes_open_shapes() {
        let shapes = flatten_str("M0 0 L10 0 L10 10", true);
        assert!(shapes[0].is_closed());
    }

    #[test]
    fn duplicate_vertices_are_dropped() {
        let shapes = flatten_str("M0 0 L10 0 L10 0 L10 10", false);
        assert_eq!(shapes[0].points.len(), 3);
    }

    #[test]
    fn close_appends_the_missing_edge_only() {
        let closed = flatten_str("M0 0 L10 0 L10 10 L0 0 Z", false);
        assert_eq!(closed[0].points.len(), 4);
    }

    #[test]
    fn moves_split_shapes() {
        let shapes = flatten_str("M0 0 L1 0 M5 5 L6 5", false);
        assert_eq!(shapes.len(), 2);
    }

    #[test]
    fn cubic_deviation_stays_within_the_margin() {
        let path: Path = "M0 0 C0 40 100 40 100 0".parse().unwrap();
        for pixel_scale in [0.5_f32, 1.0, 4.0] {
            let shapes = flatten(path.commands(), false, pixel_scale);
            let points = &shapes[0].points;
            assert!(points.len() > 4);
            let margin = 0.2 / pixel_scale;
            for i in 0..=1000 {
                let t = f64::from(i) / 1000.0;
                let mt = 1.0 - t;
                let x = 3.0 * mt * t * t * 100.0 + t * t * t * 100.0;
                let y = 3.0 * mt * mt * t * 40.0 + 3.0 * mt * t * t * 40.0;
                let d = distance_to_polyline(Point::new(x as f32, y as f32), points);
                assert!(
                    d <= margin * 1.25 + 1e-3,
                    "deviation {d} exceeds {margin} at t = {t}"
                );
            }
        }
    }

    #[test]
    fn arc_lands_on_the_end_point_and_hugs_the_circle() {
        let shapes = flatten_str("M0 0 A5 5 0 0 1 10 0", false);
        let points = &shapes[0].points;
        assert_eq!(*points.first().unwrap(), Point::new(0.0, 0.0));
        let last = *points.last().unwrap();
        assert!((last.x - 10.0).abs() < 1e-3 && last.y.abs() < 1e-3);
        // Center form of this arc is (5, 0) with radius 5.
        for p in points {
            let r = ((p.x - 5.0) * (p.x - 5.0) + p.y * p.y).sqrt();
            assert!((r - 5.0).abs() <= 0.21, "vertex {p:?} strays to radius {r}");
        }
        // Sweep = 1 travels in the positive-angle direction, which runs
        // clockwise on screen: from (0, 0) the arc goes over the top.
        assert!(points.iter().any(|p| p.y < -2.0));
        assert!(points.iter().all(|p| p.y <= 1e-3));
    }

    #[test]
    fn undersized_arc_radii_are_scaled_up() {
        let shapes = flatten_str("M0 0 A1 1 0 0 1 10 0", false);
        let points = &shapes[0].points;
        let last = *points.last().unwrap();
        assert!((last.x - 10.0).abs() < 1e-3 && last.y.abs() < 1e-3);
    }

    #[test]
    fn smooth_cubic_matches_the_explicit_reflection() {
        let smooth = flatten_str("M0 0 C0 10 10 10 10 0 S20 -10 20 0", false);
        // The reflection of (10, 10) about (10, 0) is (10, -10).
        let explicit = flatten_str("M0 0 C0 10 10 10 10 0 C10 -10 20 -10 20 0", false);
        assert_eq!(smooth[0].points, explicit[0].points);
    }

    #[test]
    fn smooth_cubic_without_a_cubic_predecessor_uses_the_pen() {
        let smooth = flatten_str("M0 0 L5 0 S10 10 15 0", false);
        let explicit = flatten_str("M0 0 L5 0 C5 0 10 10 15 0", false);
        assert_eq!(smooth[0].points, explicit[0].points);
    }

    #[test]
    fn smooth_quad_reflects_the_previous_control() {
        let smooth = flatten_str("M0 0 Q5 10 10 0 T20 0", false);
        let explicit = flatten_str("M0 0 Q5 10 10 0 Q15 -10 20 0", false);
        assert_eq!(smooth[0].points, explicit[0].points);
    }

    #[test]
    fn nan_input_flattens_to_nothing() {
        let mut path = Path::new();
        path.move_to((0.0, 0.0));
        path.line_to((f64::NAN, 1.0));
        path.line_to((10.0, 10.0));
        assert!(flatten(path.commands(), true, 1.0).is_empty());
    }
}
