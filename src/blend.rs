// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The blender/masker lookup: per-pixel composition functions.
//!
//! The lookup maps a [`BlendMode`] to a scalar function composing one source
//! pixel onto one destination pixel (the blender), or one coverage byte onto
//! one mask byte (the masker). Composition follows the Porter-Duff operator
//! table on premultiplied values; mix modes other than [`Mix::Normal`] are
//! outside this crate and treated as normal. The SIMD variant of the default
//! source-over blend lives in the fill loop, which only falls back to these
//! functions for non-default modes.
//!
//! All quantization goes through the same `(x + 255) >> 8` division as the
//! SIMD pipeline, so scalar and vector paths agree bit for bit.

use crate::util::norm_mul;
use peniko::color::PremulRgba8;
use peniko::{BlendMode, Compose, Mix};

/// A scalar per-pixel blend function: `(dest, src) -> dest'`.
pub type Blender = fn(PremulRgba8, PremulRgba8) -> PremulRgba8;

/// A scalar per-byte mask function: `(dest, coverage) -> dest'`.
pub type Masker = fn(u8, u8) -> u8;

/// Whether this mode is the default: source-over with a normal mix.
///
/// The default mode is the one the fill loop has fast paths and a SIMD
/// variant for.
pub fn is_default(mode: BlendMode) -> bool {
    #[expect(deprecated, reason = "Mix::Clip is still a valid input value.")]
    let normal_mix = matches!(mode.mix, Mix::Normal | Mix::Clip);
    normal_mix && mode.compose == Compose::SrcOver
}

/// Whether this mode masks the destination.
///
/// Masking composition keeps destination pixels only where the source
/// covers; the fill loop extends it globally by clearing everything the
/// fill never touched.
pub fn is_masking(mode: BlendMode) -> bool {
    mode.compose == Compose::DestIn
}

/// Look up the scalar blender for a blend mode.
pub fn blender(mode: BlendMode) -> Blender {
    match mode.compose {
        Compose::Clear => blend_fn::<Clear>,
        Compose::Copy => blend_fn::<Copy>,
        Compose::SrcOver => blend_fn::<SrcOver>,
        Compose::DestOver => blend_fn::<DestOver>,
        Compose::Dest => blend_fn::<Dest>,
        Compose::SrcIn => blend_fn::<SrcIn>,
        Compose::DestIn => blend_fn::<DestIn>,
        Compose::SrcOut => blend_fn::<SrcOut>,
        Compose::DestOut => blend_fn::<DestOut>,
        Compose::SrcAtop => blend_fn::<SrcAtop>,
        Compose::DestAtop => blend_fn::<DestAtop>,
        Compose::Xor => blend_fn::<Xor>,
        Compose::Plus => blend_fn::<Plus>,
        // No closed form; approximated by Plus.
        Compose::PlusLighter => blend_fn::<Plus>,
    }
}

/// Look up the scalar masker for a blend mode.
pub fn masker(mode: BlendMode) -> Masker {
    match mode.compose {
        Compose::Clear => mask_fn::<Clear>,
        Compose::Copy => mask_fn::<Copy>,
        Compose::SrcOver => mask_fn::<SrcOver>,
        Compose::DestOver => mask_fn::<DestOver>,
        Compose::Dest => mask_fn::<Dest>,
        Compose::SrcIn => mask_fn::<SrcIn>,
        Compose::DestIn => mask_fn::<DestIn>,
        Compose::SrcOut => mask_fn::<SrcOut>,
        Compose::DestOut => mask_fn::<DestOut>,
        Compose::SrcAtop => mask_fn::<SrcAtop>,
        Compose::DestAtop => mask_fn::<DestAtop>,
        Compose::Xor => mask_fn::<Xor>,
        Compose::Plus => mask_fn::<Plus>,
        Compose::PlusLighter => mask_fn::<Plus>,
    }
}

/// A Porter-Duff operator as its source and destination coefficients.
trait Operator {
    /// The source coefficient, given source and destination alpha.
    fn fa(src_alpha: u8, dest_alpha: u8) -> u8;
    /// The destination coefficient.
    fn fb(src_alpha: u8, dest_alpha: u8) -> u8;
}

/// `out = s·fa + d·fb`, saturating.
#[inline(always)]
fn porter_duff(s: u8, d: u8, fa: u8, fb: u8) -> u8 {
    (u16::from(norm_mul(s, fa)) + u16::from(norm_mul(d, fb))).min(255) as u8
}

fn blend_fn<O: Operator>(dest: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let fa = O::fa(src.a, dest.a);
    let fb = O::fb(src.a, dest.a);
    PremulRgba8 {
        r: porter_duff(src.r, dest.r, fa, fb),
        g: porter_duff(src.g, dest.g, fa, fb),
        b: porter_duff(src.b, dest.b, fa, fb),
        a: porter_duff(src.a, dest.a, fa, fb),
    }
}

fn mask_fn<O: Operator>(dest: u8, coverage: u8) -> u8 {
    let fa = O::fa(coverage, dest);
    let fb = O::fb(coverage, dest);
    porter_duff(coverage, dest, fa, fb)
}

macro_rules! operator {
    ($name:ident, $fa:expr, $fb:expr) => {
        struct $name;

        impl Operator for $name {
            #[inline(always)]
            fn fa(src_alpha: u8, dest_alpha: u8) -> u8 {
                $fa(src_alpha, dest_alpha)
            }

            #[inline(always)]
            fn fb(src_alpha: u8, dest_alpha: u8) -> u8 {
                $fb(src_alpha, dest_alpha)
            }
        }
    };
}

operator!(Clear, |_, _| 0, |_, _| 0);
operator!(Copy, |_, _| 255, |_, _| 0);
operator!(SrcOver, |_, _| 255, |s, _| 255 - s);
operator!(DestOver, |_, d| 255 - d, |_, _| 255);
operator!(Dest, |_, _| 0, |_, _| 255);
operator!(SrcIn, |_, d| d, |_, _| 0);
operator!(DestIn, |_, _| 0, |s, _| s);
operator!(SrcOut, |_, d| 255 - d, |_, _| 0);
operator!(DestOut, |_, _| 0, |s, _| 255 - s);
operator!(SrcAtop, |_, d| d, |s, _| 255 - s);
operator!(DestAtop, |_, d| 255 - d, |s, _| s);
operator!(Xor, |_, d| 255 - d, |s, _| 255 - s);
operator!(Plus, |_, _| 255, |_, _| 255);
