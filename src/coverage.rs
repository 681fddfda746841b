// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-scanline coverage computation.

use crate::segment::{bounds, Partitioning, Segment};
use crate::util::sort_hits;
use alloc::vec;
use alloc::vec::Vec;
use fearless_simd::Level;
use peniko::Fill;
#[cfg(not(feature = "std"))]
use peniko::kurbo::common::FloatFuncs as _;

/// Vertical supersamples per scanline when a strip needs antialiasing.
const QUALITY: u32 = 5;

/// Nudge applied to every sample line so it cannot land exactly on aligned
/// geometry.
const SAMPLE_NUDGE: f32 = 1e-4;

/// A ray/edge intersection on one sample line.
#[derive(Clone, Copy, Debug)]
pub struct Hit {
    /// The x position of the crossing.
    pub x: f32,
    /// The crossing direction, `+1` or `-1`.
    pub winding: i8,
}

/// Whether a winding count is inside the fill under the given rule.
#[inline]
pub fn should_fill(rule: Fill, winding: i32) -> bool {
    match rule {
        Fill::NonZero => winding != 0,
        Fill::EvenOdd => winding % 2 != 0,
    }
}

/// The pixel-snapped fill window: the segment bounds clipped to a
/// destination of `width` × `height`.
///
/// `None` means no pixel can be covered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// First covered column.
    pub left: u16,
    /// First covered row.
    pub top: u16,
    /// One past the last covered column.
    pub right: u16,
    /// One past the last covered row.
    pub bottom: u16,
}

impl Window {
    /// Compute the fill window for a segment list.
    pub fn new(segments: &[Segment], width: u16, height: u16) -> Option<Self> {
        let (min, max) = bounds(segments)?;
        let clamp = |v: f32, limit: u16| v.max(0.0).min(f32::from(limit)) as u16;
        let window = Self {
            left: clamp(min.x.floor(), width),
            top: clamp(min.y.floor(), height),
            right: clamp(max.x.ceil(), width),
            bottom: clamp(max.y.ceil(), height),
        };
        (window.left < window.right && window.top < window.bottom).then_some(window)
    }

    /// The width of the window in pixels.
    pub fn width(&self) -> u16 {
        self.right - self.left
    }
}

/// Rasterize segments into per-scanline coverage.
///
/// For every scanline of `window`, `row` receives the scanline's y and one
/// coverage byte per pixel of `[window.left, window.right)`. Scanlines run
/// top to bottom. Strips whose segments are all integer-aligned verticals
/// take a single center sample and write full coverage; everything else is
/// supersampled five times vertically with fractional horizontal coverage
/// at the span boundaries.
pub fn rasterize(
    level: Level,
    segments: &[Segment],
    window: Window,
    fill_rule: Fill,
    mut row: impl FnMut(u16, &[u8]),
) {
    let Some((min, max)) = bounds(segments) else {
        return;
    };
    let top = min.y.floor();
    let path_height = max.y.ceil() - top;
    let partitioning = Partitioning::new(segments, top, path_height);

    let mut hits: Vec<Hit> = Vec::with_capacity(partitioning.max_entries());
    let mut coverage = vec![0_u8; usize::from(window.width())];

    for y in window.top..window.bottom {
        let yf = f32::from(y);
        let strip = partitioning.strip_at(yf);
        let quality = if strip.requires_anti_aliasing {
            QUALITY
        } else {
            1
        };
        let weight = (255 / quality) as u8;

        for sample in 0..quality {
            let y_line = if quality == 1 {
                yf + 0.5 + SAMPLE_NUDGE
            } else {
                yf + 0.1 + sample as f32 * 0.2 + SAMPLE_NUDGE
            };

            hits.clear();
            for entry in &strip.entries {
                if entry.at.y <= y_line && y_line < entry.to.y {
                    hits.push(Hit {
                        x: entry.hit_x(y_line).min(f32::from(window.right)),
                        winding: entry.winding,
                    });
                }
            }
            sort_hits(&mut hits);

            // Walk the crossings left to right. Equal-x hits with cancelling
            // windings open and close a span at the same position, which
            // adds nothing.
            let mut winding: i32 = 0;
            let mut span_start = 0.0_f32;
            for hit in &hits {
                let was_inside = should_fill(fill_rule, winding);
                winding += i32::from(hit.winding);
                let is_inside = should_fill(fill_rule, winding);
                if !was_inside && is_inside {
                    span_start = hit.x;
                } else if was_inside && !is_inside {
                    add_span(
                        level,
                        &mut coverage,
                        &window,
                        span_start,
                        hit.x,
                        weight,
                        quality == 1,
                    );
                }
            }
        }

        row(y, &coverage);
        coverage.fill(0);
    }
}

/// Add one sample's span to the coverage buffer.
fn add_span(
    level: Level,
    coverage: &mut [u8],
    window: &Window,
    x0: f32,
    x1: f32,
    weight: u8,
    opaque: bool,
) {
    let left = f32::from(window.left);
    let x0 = (x0.max(left) - left).min(coverage.len() as f32);
    let x1 = (x1.min(f32::from(window.right)) - left).max(0.0);
    if x1 <= x0 {
        return;
    }

    if opaque {
        // Single-sample strips contain only integer-aligned verticals, so
        // the span boundaries are whole pixels.
        let a = x0.round() as usize;
        let b = (x1.round() as usize).min(coverage.len());
        coverage[a..b].fill(255);
        return;
    }

    let px0 = x0.floor() as usize;
    let px1 = x1.floor() as usize;
    let weight_f = f32::from(weight);
    let add = |c: &mut u8, fraction: f32| {
        *c = c.saturating_add((fraction * weight_f + 0.5) as u8);
    };

    if px0 == px1 {
        add(&mut coverage[px0], x1 - x0);
        return;
    }

    add(&mut coverage[px0], (px0 + 1) as f32 - x0);
    let end = px1.min(coverage.len());
    accumulate(level, &mut coverage[px0 + 1..end], weight);
    if px1 < coverage.len() {
        add(&mut coverage[px1], x1 - px1 as f32);
    }
}

/// Add the full sample weight to a run of interior pixels.
///
/// Blocked into 16-pixel chunks; dispatching on the level lets the compiler
/// vectorize the chunk loop, and the scalar tail is bit-identical.
fn accumulate(level: Level, coverage: &mut [u8], weight: u8) {
    level.dispatch(|_| {
        let mut chunks = coverage.chunks_exact_mut(16);
        for chunk in &mut chunks {
            for c in chunk {
                *c = c.saturating_add(weight);
            }
        }
        for c in chunks.into_remainder() {
            *c = c.saturating_add(weight);
        }
    });
}
