// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Winding segments and their partitioning into horizontal strips.

use crate::flatten::{Point, Shape};
use alloc::vec;
use alloc::vec::Vec;
#[cfg(not(feature = "std"))]
use peniko::kurbo::common::FloatFuncs as _;

/// An oriented edge, endpoints ordered by ascending y.
///
/// The winding records the original direction: `+1` for an edge that ran
/// downward, `-1` for one that ran upward. Horizontal edges never become
/// segments; they cannot change a horizontal ray's crossing count.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// The upper endpoint.
    pub at: Point,
    /// The lower endpoint.
    pub to: Point,
    /// The crossing direction, `+1` or `-1`.
    pub winding: i8,
}

/// Convert shapes into segments.
///
/// Open shapes are treated as closed; the winding sum over every shape's
/// segments is zero.
pub fn segments(shapes: &[Shape]) -> Vec<Segment> {
    let mut out = Vec::new();
    for shape in shapes {
        let points = &shape.points;
        if points.len() < 2 {
            continue;
        }
        for edge in points.windows(2) {
            push_edge(&mut out, edge[0], edge[1]);
        }
        if points.first() != points.last() {
            push_edge(&mut out, *points.last().unwrap(), points[0]);
        }
    }
    out
}

fn push_edge(out: &mut Vec<Segment>, a: Point, b: Point) {
    if a.y == b.y {
        return;
    }
    out.push(if a.y < b.y {
        Segment {
            at: a,
            to: b,
            winding: 1,
        }
    } else {
        Segment {
            at: b,
            to: a,
            winding: -1,
        }
    });
}

/// The bounding box of a segment list, as `(min, max)` corners.
pub fn bounds(segments: &[Segment]) -> Option<(Point, Point)> {
    let first = segments.first()?;
    let mut min = first.at;
    let mut max = first.at;
    for segment in segments {
        for p in [segment.at, segment.to] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
    }
    Some((min, max))
}

/// A segment with its line equation cached for scanline queries.
///
/// For sloped edges `y = m·x + b`. Vertical edges cannot be written that
/// way, so they store `m = 0` and keep their x coordinate in `b`.
#[derive(Clone, Copy, Debug)]
pub struct PartitionEntry {
    /// The segment's upper endpoint.
    pub at: Point,
    /// The segment's lower endpoint.
    pub to: Point,
    /// The slope, or `0` for vertical edges.
    pub m: f32,
    /// The intercept, or the x coordinate for vertical edges.
    pub b: f32,
    /// The crossing direction.
    pub winding: i8,
}

impl PartitionEntry {
    fn new(segment: &Segment) -> Self {
        let (m, b) = if segment.at.x == segment.to.x {
            (0.0, segment.at.x)
        } else {
            let m = (segment.to.y - segment.at.y) / (segment.to.x - segment.at.x);
            (m, segment.at.y - m * segment.at.x)
        };
        Self {
            at: segment.at,
            to: segment.to,
            m,
            b,
            winding: segment.winding,
        }
    }

    /// Whether the underlying edge is vertical.
    #[inline]
    pub fn is_vertical(&self) -> bool {
        self.at.x == self.to.x
    }

    /// The x position where the edge crosses the horizontal line at `y`.
    #[inline]
    pub fn hit_x(&self, y: f32) -> f32 {
        if self.is_vertical() {
            self.b
        } else {
            (y - self.b) / self.m
        }
    }
}

/// One horizontal band of the partitioning.
#[derive(Clone, Debug)]
pub struct Strip {
    /// The entries whose y extent overlaps this strip.
    pub entries: Vec<PartitionEntry>,
    /// False only when every entry is vertical with integer-aligned
    /// endpoints; such a strip renders exactly with a single sample per
    /// scanline.
    pub requires_anti_aliasing: bool,
}

/// Segments binned into horizontal strips over a y range.
///
/// Entries are stored by copy, so the partitioning is independent of the
/// segment list it was built from.
#[derive(Clone, Debug)]
pub struct Partitioning {
    strips: Vec<Strip>,
    top: f32,
    strip_height: f32,
}

impl Partitioning {
    /// Bin `segments` into strips covering `[top, top + height)`.
    ///
    /// The strip count balances strip height (at most four pixels is worth
    /// splitting) against occupancy (no more strips than half the segment
    /// count).
    pub fn new(segments: &[Segment], top: f32, height: f32) -> Self {
        let by_height = (height / 4.0) as usize;
        let by_segments = segments.len() / 2;
        let strip_count = by_height.max(1).min(by_segments.max(1));
        let strip_height = height.max(1.0) / strip_count as f32;

        let mut strips = vec![
            Strip {
                entries: Vec::new(),
                requires_anti_aliasing: false,
            };
            strip_count
        ];

        for segment in segments {
            let entry = PartitionEntry::new(segment);
            // A scanline's supersamples reach up to one pixel below the
            // scanline itself, so entries spill one pixel into the strip
            // above.
            let first = (((segment.at.y - top - 1.0) / strip_height) as isize).max(0) as usize;
            let last = (((segment.to.y - top) / strip_height) as isize).max(0) as usize;
            for strip in strips.iter_mut().take(strip_count.min(last + 1)).skip(first) {
                strip.entries.push(entry);
            }
        }

        for strip in &mut strips {
            strip.requires_anti_aliasing = !strip.entries.iter().all(|e| {
                e.is_vertical() && e.b.fract() == 0.0 && e.at.y.fract() == 0.0 && e.to.y.fract() == 0.0
            });
        }

        Self {
            strips,
            top,
            strip_height,
        }
    }

    /// The strip containing the scanline at `y`.
    #[inline]
    pub fn strip_at(&self, y: f32) -> &Strip {
        let idx = (((y - self.top) / self.strip_height) as isize).max(0) as usize;
        &self.strips[idx.min(self.strips.len() - 1)]
    }

    /// The number of strips.
    pub fn strip_count(&self) -> usize {
        self.strips.len()
    }

    /// The largest per-strip entry count, which bounds the hit buffer.
    pub fn max_entries(&self) -> usize {
        self.strips.iter().map(|s| s.entries.len()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn square() -> Shape {
        Shape::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
        ])
    }

    #[test]
    fn horizontal_edges_are_discarded() {
        let segments = segments(&[square()]);
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.at.y < s.to.y));
    }

    #[test]
    fn winding_follows_the_original_direction() {
        let segments = segments(&[square()]);
        // Right edge runs downward, left edge upward.
        assert_eq!(segments[0].winding, 1);
        assert_eq!(segments[0].at.x, 10.0);
        assert_eq!(segments[1].winding, -1);
        assert_eq!(segments[1].at.x, 0.0);
    }

    #[test]
    fn ray_crossings_of_a_closed_shape_cancel() {
        let triangle = Shape::new(vec![
            Point::new(0.0, 0.0),
            Point::new(8.0, 4.0),
            Point::new(1.0, 9.0),
            Point::new(0.0, 0.0),
        ]);
        let segments = segments(&[triangle]);
        for y in [0.5, 2.0, 4.5, 8.9] {
            let sum: i32 = segments
                .iter()
                .filter(|s| s.at.y <= y && y < s.to.y)
                .map(|s| i32::from(s.winding))
                .sum();
            assert_eq!(sum, 0, "uncancelled crossing at y = {y}");
        }
    }

    #[test]
    fn open_shapes_get_an_implicit_closing_edge() {
        let open = Shape::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 8.0),
        ]);
        let segments = segments(&[open]);
        assert_eq!(segments.len(), 3);
        // The closing edge runs upward.
        assert_eq!(segments[2].winding, -1);
        assert_eq!(segments[2].to, Point::new(0.0, 8.0));
    }

    #[test]
    fn vertical_entries_store_x_in_the_intercept() {
        let segments = segments(&[square()]);
        let partitioning = Partitioning::new(&segments, 0.0, 10.0);
        let strip = partitioning.strip_at(5.0);
        for entry in &strip.entries {
            assert!(entry.is_vertical());
            assert_eq!(entry.m, 0.0);
            assert!(entry.b == 0.0 || entry.b == 10.0);
            assert_eq!(entry.hit_x(5.0), entry.b);
        }
    }

    #[test]
    fn sloped_entries_solve_for_x() {
        let diagonal = Shape::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 20.0),
            Point::new(0.0, 20.0),
            Point::new(0.0, 0.0),
        ]);
        let segments = segments(&[diagonal]);
        let entry = segments
            .iter()
            .map(PartitionEntry::new)
            .find(|e| !e.is_vertical())
            .unwrap();
        assert_eq!(entry.hit_x(10.0), 5.0);
    }

    #[test]
    fn strip_count_is_clamped_by_height_and_segments() {
        let segments = segments(&[square()]);
        // height/4 = 25, segments/2 = 1.
        assert_eq!(Partitioning::new(&segments, 0.0, 100.0).strip_count(), 1);
        // height/4 = 0 -> at least one strip.
        assert_eq!(Partitioning::new(&segments, 0.0, 2.0).strip_count(), 1);

        let many: Vec<Shape> = (0..40).map(|_| square()).collect();
        let segments = crate::segment::segments(&many);
        // height/4 = 10 < segments/2 = 40.
        assert_eq!(Partitioning::new(&segments, 0.0, 40.0).strip_count(), 10);
    }

    #[test]
    fn entries_land_in_every_overlapping_strip() {
        let tall = Shape::new(vec![
            Point::new(2.0, 0.0),
            Point::new(3.0, 40.0),
            Point::new(2.0, 40.0),
            Point::new(2.0, 0.0),
        ]);
        let short = Shape::new(vec![
            Point::new(5.0, 0.0),
            Point::new(6.0, 4.0),
            Point::new(5.0, 4.0),
            Point::new(5.0, 0.0),
        ]);
        let segments = segments(&[tall, short]);
        let partitioning = Partitioning::new(&segments, 0.0, 40.0);
        assert!(partitioning.strip_count() > 1);
        // The tall shape's edges appear in the last strip, the short one's
        // do not.
        let last = partitioning.strip_at(39.0);
        assert!(last.entries.iter().all(|e| e.at.x < 4.0));
        let first = partitioning.strip_at(0.0);
        assert!(first.entries.iter().any(|e| e.at.x >= 4.0));
    }

    #[test]
    fn integer_vertical_strips_skip_anti_aliasing() {
        let segments = segments(&[square()]);
        let partitioning = Partitioning::new(&segments, 0.0, 10.0);
        assert!(!partitioning.strip_at(5.0).requires_anti_aliasing);

        let shifted = Shape::new(vec![
            Point::new(0.5, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.5, 10.0),
            Point::new(0.5, 0.0),
        ]);
        let segments = crate::segment::segments(&[shifted]);
        let partitioning = Partitioning::new(&segments, 0.0, 10.0);
        assert!(partitioning.strip_at(5.0).requires_anti_aliasing);
    }

    #[test]
    fn bounds_cover_all_endpoints() {
        let segments = segments(&[square()]);
        let (min, max) = bounds(&segments).unwrap();
        assert_eq!((min.x, min.y), (0.0, 0.0));
        assert_eq!((max.x, max.y), (10.0, 10.0));
        assert!(bounds(&[]).is_none());
    }
}
