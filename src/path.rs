// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The path command model and builder operations.

use crate::Error;
use alloc::vec::Vec;
use core::f64::consts::{FRAC_PI_2, PI, TAU};
use peniko::kurbo::{Affine, Point, Rect, RoundedRectRadii, Vec2};
#[cfg(not(feature = "std"))]
use peniko::kurbo::common::FloatFuncs as _;

/// Distance below which two points are considered coincident.
pub(crate) const EPSILON: f64 = 1e-9;

/// Bézier handle length for a quarter circle, `4(√2 − 1)/3`.
const KAPPA: f64 = 0.552_284_749_830_793_4;

/// A single path command.
///
/// The absolute variants carry end points, the relative variants carry
/// offsets from the current pen position. Horizontal and vertical lines
/// store only the moving coordinate. Payloads are fixed-size, so commands
/// never allocate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    /// Begin a new sub-path.
    MoveTo(Point),
    /// Begin a new sub-path, relative to the pen.
    RelMoveTo(Vec2),
    /// A line segment.
    LineTo(Point),
    /// A line segment, relative to the pen.
    RelLineTo(Vec2),
    /// A horizontal line to the given x coordinate.
    HorizTo(f64),
    /// A horizontal line by the given x offset.
    RelHorizTo(f64),
    /// A vertical line to the given y coordinate.
    VertTo(f64),
    /// A vertical line by the given y offset.
    RelVertTo(f64),
    /// A cubic Bézier segment (two control points, end point).
    CubicTo(Point, Point, Point),
    /// A cubic Bézier segment, relative to the pen.
    RelCubicTo(Vec2, Vec2, Vec2),
    /// A cubic Bézier whose first control point reflects the previous one.
    SmoothCubicTo(Point, Point),
    /// A smooth cubic Bézier, relative to the pen.
    RelSmoothCubicTo(Vec2, Vec2),
    /// A quadratic Bézier segment (control point, end point).
    QuadTo(Point, Point),
    /// A quadratic Bézier segment, relative to the pen.
    RelQuadTo(Vec2, Vec2),
    /// A quadratic Bézier whose control point reflects the previous one.
    SmoothQuadTo(Point),
    /// A smooth quadratic Bézier, relative to the pen.
    RelSmoothQuadTo(Vec2),
    /// An elliptical arc segment in SVG endpoint parameterization.
    ArcTo {
        /// The x and y radii of the ellipse.
        radii: Vec2,
        /// Rotation of the ellipse's x axis, in degrees.
        x_rotation: f64,
        /// Pick the longer of the two candidate sweeps.
        large_arc: bool,
        /// Travel in the positive-angle direction.
        sweep: bool,
        /// The end point.
        to: Point,
    },
    /// An elliptical arc segment, end point relative to the pen.
    RelArcTo {
        /// The x and y radii of the ellipse.
        radii: Vec2,
        /// Rotation of the ellipse's x axis, in degrees.
        x_rotation: f64,
        /// Pick the longer of the two candidate sweeps.
        large_arc: bool,
        /// Travel in the positive-angle direction.
        sweep: bool,
        /// The end point offset.
        to: Vec2,
    },
    /// Close the current sub-path.
    Close,
}

/// A mutable sequence of path commands.
///
/// A path tracks two running points while it is built: the start of the
/// current sub-path and the pen position. Rasterizer entry points borrow
/// paths immutably, so a built path can be drawn any number of times.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    commands: Vec<PathCommand>,
    start: Point,
    at: Point,
}

impl Path {
    /// Create a new, empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// The commands of this path.
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    /// Whether the path contains no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The current pen position.
    pub fn current_point(&self) -> Point {
        self.at
    }

    /// Append a raw command, keeping the running points up to date.
    pub(crate) fn push(&mut self, command: PathCommand) {
        use PathCommand::*;
        match &command {
            MoveTo(p) => {
                self.start = *p;
                self.at = *p;
            }
            RelMoveTo(v) => {
                self.start = self.at + *v;
                self.at = self.start;
            }
            LineTo(p) => self.at = *p,
            RelLineTo(v) => self.at += *v,
            HorizTo(x) => self.at.x = *x,
            RelHorizTo(dx) => self.at.x += dx,
            VertTo(y) => self.at.y = *y,
            RelVertTo(dy) => self.at.y += dy,
            CubicTo(_, _, p) => self.at = *p,
            RelCubicTo(_, _, v) => self.at += *v,
            SmoothCubicTo(_, p) => self.at = *p,
            RelSmoothCubicTo(_, v) => self.at += *v,
            QuadTo(_, p) => self.at = *p,
            RelQuadTo(_, v) => self.at += *v,
            SmoothQuadTo(p) => self.at = *p,
            RelSmoothQuadTo(v) => self.at += *v,
            ArcTo { to, .. } => self.at = *to,
            RelArcTo { to, .. } => self.at += *to,
            Close => self.at = self.start,
        }
        self.commands.push(command);
    }

    /// Begin a new sub-path at the given point.
    pub fn move_to(&mut self, p: impl Into<Point>) {
        self.push(PathCommand::MoveTo(p.into()));
    }

    /// Draw a line from the pen to the given point.
    pub fn line_to(&mut self, p: impl Into<Point>) {
        self.push(PathCommand::LineTo(p.into()));
    }

    /// Draw a cubic Bézier from the pen to `to`.
    pub fn bezier_curve_to(
        &mut self,
        c1: impl Into<Point>,
        c2: impl Into<Point>,
        to: impl Into<Point>,
    ) {
        self.push(PathCommand::CubicTo(c1.into(), c2.into(), to.into()));
    }

    /// Draw a quadratic Bézier from the pen to `to`.
    pub fn quadratic_curve_to(&mut self, c: impl Into<Point>, to: impl Into<Point>) {
        self.push(PathCommand::QuadTo(c.into(), to.into()));
    }

    /// Draw an elliptical arc from the pen to `to`, SVG style.
    pub fn elliptical_arc_to(
        &mut self,
        radii: Vec2,
        x_rotation: f64,
        large_arc: bool,
        sweep: bool,
        to: impl Into<Point>,
    ) {
        self.push(PathCommand::ArcTo {
            radii,
            x_rotation,
            large_arc,
            sweep,
            to: to.into(),
        });
    }

    /// Draw a circular arc around `center` from `start_angle` to `end_angle`.
    ///
    /// Angles are in radians, measured in the positive-angle direction of the
    /// y-down coordinate system. With `ccw` the arc travels in the
    /// negative-angle direction instead. If the path is empty the arc begins
    /// with an implicit move; otherwise a line connects the pen to the arc's
    /// start unless it is already there. A sweep of a full turn or more
    /// produces the whole circle.
    ///
    /// A zero radius is a no-op; a negative radius is an error.
    pub fn arc(
        &mut self,
        center: impl Into<Point>,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        ccw: bool,
    ) -> Result<(), Error> {
        if radius < 0.0 {
            return Err(Error::NegativeRadius);
        }
        if radius == 0.0 {
            return Ok(());
        }
        let center = center.into();
        let start = center + radius * Vec2::from_angle(start_angle);

        if self.commands.is_empty() {
            self.move_to(start);
        } else if (self.at - start).hypot() > EPSILON {
            self.line_to(start);
        }

        let radii = Vec2::new(radius, radius);
        let sweep = end_angle - start_angle;
        if sweep.abs() >= TAU - EPSILON {
            // A full circle cannot be expressed as a single endpoint arc, so
            // split it at the antipode.
            let mid = center + radius * Vec2::from_angle(start_angle + PI);
            self.elliptical_arc_to(radii, 0.0, false, !ccw, mid);
            self.elliptical_arc_to(radii, 0.0, false, !ccw, start);
            return Ok(());
        }

        // Remainder in [0, 2π), negated for counterclockwise travel.
        let positive_mod = |x: f64| x - TAU * (x / TAU).floor();
        let delta = if ccw {
            -positive_mod(-sweep)
        } else {
            positive_mod(sweep)
        };
        if delta.abs() < EPSILON {
            return Ok(());
        }
        let end = center + radius * Vec2::from_angle(start_angle + delta);
        self.elliptical_arc_to(radii, 0.0, delta.abs() > PI, delta > 0.0, end);
        Ok(())
    }

    /// Draw a circular arc of the given radius tangent to the lines
    /// pen→`c1` and `c1`→`c2`.
    ///
    /// A zero radius or collinear control points degrade to a line to `c1`.
    /// A negative radius is an error.
    pub fn arc_to(
        &mut self,
        c1: impl Into<Point>,
        c2: impl Into<Point>,
        radius: f64,
    ) -> Result<(), Error> {
        if radius < 0.0 {
            return Err(Error::NegativeRadius);
        }
        let c1 = c1.into();
        let c2 = c2.into();
        if self.commands.is_empty() {
            self.move_to(c1);
            return Ok(());
        }

        let d0 = c1 - self.at;
        let d1 = c2 - c1;
        let cross = d0.cross(d1);
        if radius == 0.0 || d0.hypot() < EPSILON || d1.hypot() < EPSILON || cross.abs() < EPSILON {
            self.line_to(c1);
            return Ok(());
        }

        let u0 = (self.at - c1) / d0.hypot();
        let u1 = d1 / d1.hypot();
        let corner_angle = u0.dot(u1).clamp(-1.0, 1.0).acos();
        let tangent_dist = radius / (corner_angle / 2.0).tan();
        let t0 = c1 + u0 * tangent_dist;
        let t1 = c1 + u1 * tangent_dist;

        self.line_to(t0);
        // The sweep direction follows the turn, so the arc hugs the corner's
        // inside.
        self.elliptical_arc_to(Vec2::new(radius, radius), 0.0, false, cross > 0.0, t1);
        Ok(())
    }

    /// Add an axis-aligned rectangle as a closed sub-path.
    pub fn rect(&mut self, rect: &Rect) {
        self.move_to((rect.x0, rect.y0));
        self.line_to((rect.x1, rect.y0));
        self.line_to((rect.x1, rect.y1));
        self.line_to((rect.x0, rect.y1));
        self.close_path();
    }

    /// Add an axis-aligned rounded rectangle as a closed sub-path.
    ///
    /// Radii are clamped to half the shorter side; if all four end up zero
    /// this is a plain [`rect`](Self::rect). `clockwise` selects the winding
    /// direction of the emitted outline.
    pub fn rounded_rect(&mut self, rect: &Rect, radii: &RoundedRectRadii, clockwise: bool) {
        let limit = rect.width().min(rect.height()) / 2.0;
        let clamp = |r: f64| r.clamp(0.0, limit);
        let (tl, tr, br, bl) = (
            clamp(radii.top_left),
            clamp(radii.top_right),
            clamp(radii.bottom_right),
            clamp(radii.bottom_left),
        );
        if tl == 0.0 && tr == 0.0 && br == 0.0 && bl == 0.0 {
            if clockwise {
                self.rect(rect);
            } else {
                self.move_to((rect.x0, rect.y0));
                self.line_to((rect.x0, rect.y1));
                self.line_to((rect.x1, rect.y1));
                self.line_to((rect.x1, rect.y0));
                self.close_path();
            }
            return;
        }

        let (x0, y0, x1, y1) = (rect.x0, rect.y0, rect.x1, rect.y1);
        self.move_to((x0 + tl, y0));
        if clockwise {
            self.line_to((x1 - tr, y0));
            self.corner((x1 - tr, y0), (x1, y0), (x1, y0 + tr));
            self.line_to((x1, y1 - br));
            self.corner((x1, y1 - br), (x1, y1), (x1 - br, y1));
            self.line_to((x0 + bl, y1));
            self.corner((x0 + bl, y1), (x0, y1), (x0, y1 - bl));
            self.line_to((x0, y0 + tl));
            self.corner((x0, y0 + tl), (x0, y0), (x0 + tl, y0));
        } else {
            self.corner((x0 + tl, y0), (x0, y0), (x0, y0 + tl));
            self.line_to((x0, y1 - bl));
            self.corner((x0, y1 - bl), (x0, y1), (x0 + bl, y1));
            self.line_to((x1 - br, y1));
            self.corner((x1 - br, y1), (x1, y1), (x1, y1 - br));
            self.line_to((x1, y0 + tr));
            self.corner((x1, y0 + tr), (x1, y0), (x1 - tr, y0));
        }
        self.close_path();
    }

    /// A quarter-turn cubic from `from` to `to` around the corner point `via`.
    fn corner(&mut self, from: (f64, f64), via: (f64, f64), to: (f64, f64)) {
        let from = Point::new(from.0, from.1);
        let via = Point::new(via.0, via.1);
        let to = Point::new(to.0, to.1);
        let c1 = from + (via - from) * KAPPA;
        let c2 = to + (via - to) * KAPPA;
        self.bezier_curve_to(c1, c2, to);
    }

    /// Add an axis-aligned ellipse as a closed sub-path.
    pub fn ellipse(&mut self, center: impl Into<Point>, radii: Vec2) {
        let c = center.into();
        let (rx, ry) = (radii.x, radii.y);
        let (kx, ky) = (rx * KAPPA, ry * KAPPA);
        self.move_to((c.x + rx, c.y));
        self.bezier_curve_to((c.x + rx, c.y + ky), (c.x + kx, c.y + ry), (c.x, c.y + ry));
        self.bezier_curve_to((c.x - kx, c.y + ry), (c.x - rx, c.y + ky), (c.x - rx, c.y));
        self.bezier_curve_to((c.x - rx, c.y - ky), (c.x - kx, c.y - ry), (c.x, c.y - ry));
        self.bezier_curve_to((c.x + kx, c.y - ry), (c.x + rx, c.y - ky), (c.x + rx, c.y));
        self.close_path();
    }

    /// Add a circle as a closed sub-path.
    pub fn circle(&mut self, center: impl Into<Point>, radius: f64) {
        self.ellipse(center, Vec2::new(radius, radius));
    }

    /// Add a regular polygon with `sides` vertices on a circle of radius
    /// `size`, starting at the top. Fewer than three sides is a no-op.
    pub fn polygon(&mut self, center: impl Into<Point>, size: f64, sides: usize) {
        if sides < 3 {
            return;
        }
        let center = center.into();
        let step = TAU / sides as f64;
        self.move_to(center + size * Vec2::from_angle(-FRAC_PI_2));
        for i in 1..sides {
            self.line_to(center + size * Vec2::from_angle(-FRAC_PI_2 + i as f64 * step));
        }
        self.close_path();
    }

    /// Close the current sub-path.
    pub fn close_path(&mut self) {
        self.push(PathCommand::Close);
    }

    /// Append all commands of `other` to this path.
    pub fn add_path(&mut self, other: &Path) {
        for command in &other.commands {
            self.push(*command);
        }
    }

    /// Apply an affine transform to the path in place.
    ///
    /// Absolute commands are transformed fully; relative commands see only
    /// the linear part, since a translation must not move an offset. Arc
    /// radii scale by the transform's axis scales while arc end points
    /// transform like any other point. Horizontal and vertical lines cannot
    /// carry a sheared coordinate, so they come out as general line commands.
    /// A leading relative move is promoted to an absolute one first.
    pub fn transform(&mut self, transform: &Affine) {
        use PathCommand::*;

        if let Some(first) = self.commands.first_mut() {
            if let RelMoveTo(v) = *first {
                *first = MoveTo(v.to_point());
            }
        }

        let [a, b, c, d, _, _] = transform.as_coeffs();
        let linear = |v: Vec2| Vec2::new(a * v.x + c * v.y, b * v.x + d * v.y);
        let scale_radii = |r: Vec2| Vec2::new(r.x * a.abs(), r.y * d.abs());

        let mut pen = Point::ZERO;
        let mut start = Point::ZERO;
        for command in &mut self.commands {
            *command = match *command {
                MoveTo(p) => {
                    pen = p;
                    start = p;
                    MoveTo(*transform * p)
                }
                RelMoveTo(v) => {
                    pen += v;
                    start = pen;
                    RelMoveTo(linear(v))
                }
                LineTo(p) => {
                    pen = p;
                    LineTo(*transform * p)
                }
                RelLineTo(v) => {
                    pen += v;
                    RelLineTo(linear(v))
                }
                HorizTo(x) => {
                    pen.x = x;
                    LineTo(*transform * pen)
                }
                RelHorizTo(dx) => {
                    pen.x += dx;
                    RelLineTo(linear(Vec2::new(dx, 0.0)))
                }
                VertTo(y) => {
                    pen.y = y;
                    LineTo(*transform * pen)
                }
                RelVertTo(dy) => {
                    pen.y += dy;
                    RelLineTo(linear(Vec2::new(0.0, dy)))
                }
                CubicTo(c1, c2, p) => {
                    pen = p;
                    CubicTo(*transform * c1, *transform * c2, *transform * p)
                }
                RelCubicTo(v1, v2, v) => {
                    pen += v;
                    RelCubicTo(linear(v1), linear(v2), linear(v))
                }
                SmoothCubicTo(c2, p) => {
                    pen = p;
                    SmoothCubicTo(*transform * c2, *transform * p)
                }
                RelSmoothCubicTo(v2, v) => {
                    pen += v;
                    RelSmoothCubicTo(linear(v2), linear(v))
                }
                QuadTo(c1, p) => {
                    pen = p;
                    QuadTo(*transform * c1, *transform * p)
                }
                RelQuadTo(v1, v) => {
                    pen += v;
                    RelQuadTo(linear(v1), linear(v))
                }
                SmoothQuadTo(p) => {
                    pen = p;
                    SmoothQuadTo(*transform * p)
                }
                RelSmoothQuadTo(v) => {
                    pen += v;
                    RelSmoothQuadTo(linear(v))
                }
                ArcTo {
                    radii,
                    x_rotation,
                    large_arc,
                    sweep,
                    to,
                } => {
                    pen = to;
                    ArcTo {
                        radii: scale_radii(radii),
                        x_rotation,
                        large_arc,
                        sweep,
                        to: *transform * to,
                    }
                }
                RelArcTo {
                    radii,
                    x_rotation,
                    large_arc,
                    sweep,
                    to,
                } => {
                    pen += to;
                    RelArcTo {
                        radii: scale_radii(radii),
                        x_rotation,
                        large_arc,
                        sweep,
                        to: linear(to),
                    }
                }
                Close => {
                    pen = start;
                    Close
                }
            };
        }

        self.start = *transform * self.start;
        self.at = *transform * self.at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_radius_arc_is_a_no_op() {
        let mut path = Path::new();
        path.move_to((1.0, 1.0));
        path.arc((5.0, 5.0), 0.0, 0.0, 1.0, false).unwrap();
        assert_eq!(path.commands().len(), 1);
    }

    #[test]
    fn negative_radius_is_rejected() {
        let mut path = Path::new();
        assert_eq!(
            path.arc((0.0, 0.0), -1.0, 0.0, 1.0, false),
            Err(Error::NegativeRadius)
        );
        assert_eq!(
            path.arc_to((1.0, 0.0), (1.0, 1.0), -2.0),
            Err(Error::NegativeRadius)
        );
        assert!(path.is_empty());
    }

    #[test]
    fn arc_on_empty_path_starts_with_a_move() {
        let mut path = Path::new();
        path.arc((0.0, 0.0), 2.0, 0.0, FRAC_PI_2, false).unwrap();
        assert!(matches!(path.commands()[0], PathCommand::MoveTo(p) if (p.x - 2.0).abs() < 1e-9));
        assert!(matches!(path.commands()[1], PathCommand::ArcTo { .. }));
    }

    #[test]
    fn full_circle_arc_splits_in_two() {
        let mut path = Path::new();
        path.arc((0.0, 0.0), 1.0, 0.0, TAU, false).unwrap();
        let arcs = path
            .commands()
            .iter()
            .filter(|c| matches!(c, PathCommand::ArcTo { .. }))
            .count();
        assert_eq!(arcs, 2);
    }

    #[test]
    fn collinear_arc_to_degenerates_to_a_line() {
        let mut path = Path::new();
        path.move_to((0.0, 0.0));
        path.arc_to((50.0, 0.0), (100.0, 0.0), 25.0).unwrap();
        assert_eq!(
            path.commands(),
            &[
                PathCommand::MoveTo(Point::new(0.0, 0.0)),
                PathCommand::LineTo(Point::new(50.0, 0.0)),
            ]
        );
    }

    #[test]
    fn arc_to_emits_tangent_line_then_arc() {
        let mut path = Path::new();
        path.move_to((0.0, 0.0));
        path.arc_to((10.0, 0.0), (10.0, 10.0), 2.0).unwrap();
        assert!(matches!(path.commands()[1], PathCommand::LineTo(p) if (p.x - 8.0).abs() < 1e-9));
        assert!(
            matches!(path.commands()[2], PathCommand::ArcTo { sweep, to, .. } if sweep && (to.x - 10.0).abs() < 1e-9 && (to.y - 2.0).abs() < 1e-9)
        );
    }

    #[test]
    fn all_zero_radii_degenerate_to_a_rect() {
        let mut rounded = Path::new();
        rounded.rounded_rect(
            &Rect::new(0.0, 0.0, 10.0, 8.0),
            &RoundedRectRadii::from_single_radius(0.0),
            true,
        );
        let mut plain = Path::new();
        plain.rect(&Rect::new(0.0, 0.0, 10.0, 8.0));
        assert_eq!(rounded.commands(), plain.commands());
    }

    #[test]
    fn rounded_rect_radii_are_clamped() {
        let mut path = Path::new();
        path.rounded_rect(
            &Rect::new(0.0, 0.0, 10.0, 4.0),
            &RoundedRectRadii::from_single_radius(100.0),
            true,
        );
        // Clamped to half the shorter side: the first point is at x0 + 2.
        assert!(matches!(path.commands()[0], PathCommand::MoveTo(p) if (p.x - 2.0).abs() < 1e-9));
    }

    #[test]
    fn transform_promotes_a_leading_relative_move() {
        let mut path = Path::new();
        path.push(PathCommand::RelMoveTo(Vec2::new(3.0, 4.0)));
        path.transform(&Affine::translate((10.0, 0.0)));
        assert_eq!(
            path.commands()[0],
            PathCommand::MoveTo(Point::new(13.0, 4.0))
        );
    }

    #[test]
    fn relative_commands_ignore_translation() {
        let mut path = Path::new();
        path.move_to((0.0, 0.0));
        path.push(PathCommand::RelLineTo(Vec2::new(5.0, 0.0)));
        path.transform(&Affine::translate((100.0, 100.0)));
        assert_eq!(
            path.commands()[1],
            PathCommand::RelLineTo(Vec2::new(5.0, 0.0))
        );
    }

    #[test]
    fn transform_resolves_axis_lines() {
        let mut path = Path::new();
        path.move_to((1.0, 2.0));
        path.push(PathCommand::HorizTo(5.0));
        path.push(PathCommand::VertTo(7.0));
        path.transform(&Affine::rotate(FRAC_PI_2));
        assert!(matches!(path.commands()[1], PathCommand::LineTo(_)));
        assert!(matches!(path.commands()[2], PathCommand::LineTo(_)));
    }

    #[test]
    fn polygon_closes_after_sides_vertices() {
        let mut path = Path::new();
        path.polygon((0.0, 0.0), 10.0, 5);
        assert_eq!(path.commands().len(), 6);
        assert_eq!(path.commands().last(), Some(&PathCommand::Close));
    }
}
