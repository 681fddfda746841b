// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scanfill is a CPU rasterizer for 2D vector paths.
//!
//! It turns a path, built imperatively or parsed from SVG path syntax, into
//! per-pixel coverage and writes that coverage into a premultiplied RGBA8
//! [`Pixmap`] or an 8-bit alpha [`Mask`].
//!
//! # Usage
//!
//! ```rust
//! use scanfill::{fill_path, Paint, Path, Pixmap};
//! use scanfill::color::{palette::css, PremulRgba8};
//! use scanfill::kurbo::{Affine, Rect};
//! use scanfill::peniko::Fill;
//!
//! let width = 10;
//! let height = 5;
//! let mut path = Path::new();
//! path.rect(&Rect::new(3.0, 1.0, 7.0, 4.0));
//!
//! let mut target = Pixmap::new(width, height);
//! let paint = Paint::from(css::MAGENTA);
//! fill_path(&mut target, &path, &paint, Affine::IDENTITY, Fill::NonZero);
//!
//! let expected_render = b"\
//!     0000000000\
//!     0001111000\
//!     0001111000\
//!     0001111000\
//!     0000000000";
//! let magenta = css::MAGENTA.premultiply().to_rgba8();
//! let transparent = PremulRgba8 { r: 0, g: 0, b: 0, a: 0 };
//! let mut result = Vec::new();
//! for pixel in target.data() {
//!     if *pixel == magenta {
//!         result.push(b'1');
//!     } else if *pixel == transparent {
//!         result.push(b'0');
//!     } else {
//!         panic!("Got unexpected pixel value {pixel:?}");
//!     }
//! }
//! assert_eq!(&result, expected_render);
//! ```
//!
//! # Features
//!
//! - `std` (enabled by default): Get floating point functions from the
//!   standard library (likely using your target's libc).
//! - `libm`: Use floating point implementations from [libm][].
//! - `simd` (enabled by default): Detect and use the widest SIMD instruction
//!   set available at runtime. Without it, every operation runs on the scalar
//!   fallback; the rendered output is bit-identical either way.
//!
//! At least one of `std` and `libm` is required; `std` overrides `libm`.
//!
//! # Pipeline
//!
//! - [`path`]: the command model and the builder operations.
//! - [`flatten`]: curves and arcs become polygonal sub-shapes.
//! - [`stroke`]: polylines are expanded into filled outlines.
//! - [`segment`]: shape edges become winding segments, binned into strips.
//! - [`coverage`]: per-scanline coverage, antialiased where it matters.
//! - [`render`]: the public entry points tying the stages together.
//!
//! [libm]: https://crates.io/crates/libm
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
#![forbid(unsafe_code)]
#![expect(
    clippy::cast_possible_truncation,
    reason = "We cast f64 path coordinates to f32 device coordinates and u16 \
pixel positions in many places where the values are known to be in range."
)]
#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod blend;
pub mod coverage;
pub mod flatten;
pub mod mask;
pub mod paint;
pub mod path;
pub mod pixmap;
pub mod render;
pub mod segment;
pub mod stroke;

mod fine;
mod svg;
mod util;

use thiserror::Error;

pub use mask::Mask;
pub use paint::{Paint, PaintKind, PaintSource, PremulColor};
pub use path::{Path, PathCommand};
pub use pixmap::Pixmap;
pub use render::{
    compute_bounds, fill_image, fill_mask, fill_overlaps, fill_path, fill_path_mask, stroke_overlaps,
    stroke_path, stroke_path_mask,
};

pub use fearless_simd::Level;
pub use peniko;
pub use peniko::color;
pub use peniko::kurbo;

/// The error type for path construction and parsing.
///
/// Everything else the crate absorbs locally: degenerate geometry produces
/// empty output rather than an error, and no destination is written before
/// validation has passed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The textual path data was malformed.
    #[error("malformed path data at byte {pos}: {reason}")]
    Parse {
        /// Byte offset of the offending input.
        pos: usize,
        /// What the parser expected to find there.
        reason: &'static str,
    },
    /// An arc was given a negative radius.
    #[error("arc radius must not be negative")]
    NegativeRadius,
}
