// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small shared helpers.

use crate::coverage::Hit;
use fearless_simd::{Level, Simd, SimdBase, u8x32, u16x16, u16x32};
use peniko::kurbo::Affine;
#[cfg(not(feature = "std"))]
use peniko::kurbo::common::FloatFuncs as _;

/// Return the SIMD level all hot loops dispatch on.
#[cfg(feature = "simd")]
pub(crate) fn simd_level() -> Level {
    Level::try_detect().unwrap_or(Level::fallback())
}

/// Return the SIMD level all hot loops dispatch on.
#[cfg(not(feature = "simd"))]
pub(crate) fn simd_level() -> Level {
    Level::fallback()
}

/// The largest singular value of the transform's linear part.
///
/// This is the factor by which the transform can stretch a unit length, and
/// therefore the factor by which flattening tolerances have to shrink so the
/// error bound holds in device space. Clamped away from zero so callers can
/// divide by it.
pub(crate) fn pixel_scale(transform: &Affine) -> f32 {
    let [a, b, c, d, _, _] = transform.as_coeffs();
    let a = a as f32;
    let b = b as f32;
    let c = c as f32;
    let d = d as f32;

    let s1 = a * a + b * b + c * c + d * d;
    let e = a * a - b * b + c * c - d * d;
    let f = a * b + c * d;
    let s2 = (e * e + 4.0 * f * f).sqrt();

    (0.5 * (s1 + s2)).sqrt().max(1e-6)
}

/// Fast approximate division by 255, exact for products of two bytes.
#[inline(always)]
pub(crate) const fn div_255(x: u16) -> u16 {
    (x + 255) >> 8
}

/// Normalized multiplication of two bytes.
///
/// This is the scalar twin of the SIMD widen/multiply/`div_255` pipeline;
/// both must produce the same quantization.
#[inline(always)]
pub(crate) const fn norm_mul(a: u8, b: u8) -> u8 {
    div_255(a as u16 * b as u16) as u8
}

/// A trait for implementing a fast approximate division by 255 for vectors.
pub(crate) trait Div255Ext {
    /// Divide by 255.
    fn div_255(self) -> Self;
}

impl<S: Simd> Div255Ext for u16x32<S> {
    #[inline(always)]
    fn div_255(self) -> Self {
        let bias = Self::splat(self.simd, 255);
        (self + bias) >> 8
    }
}

impl<S: Simd> Div255Ext for u16x16<S> {
    #[inline(always)]
    fn div_255(self) -> Self {
        let bias = Self::splat(self.simd, 255);
        (self + bias) >> 8
    }
}

/// Perform a normalized multiplication for u8x32.
#[inline(always)]
pub(crate) fn normalized_mul_u8x32<S: Simd>(a: u8x32<S>, b: u8x32<S>) -> u16x32<S> {
    (a.simd.widen_u8x32(a) * b.simd.widen_u8x32(b)).div_255()
}

/// Below this length the sort switches to insertion sort.
const INSERTION_CUTOFF: usize = 32;

/// Sort scanline hits by ascending x.
///
/// In-place hybrid quicksort: median-of-three pivot, insertion sort for
/// short runs. Not stable; hits at equal x with cancelling windings are
/// coalesced by the winding walk, not by the sort.
pub(crate) fn sort_hits(hits: &mut [Hit]) {
    if hits.len() < INSERTION_CUTOFF {
        insertion_sort(hits);
        return;
    }

    let pivot_idx = median_of_three(hits);
    hits.swap(0, pivot_idx);
    let split = partition(hits);

    let (left, right) = hits.split_at_mut(split + 1);
    sort_hits(left);
    sort_hits(right);
}

fn insertion_sort(hits: &mut [Hit]) {
    for i in 1..hits.len() {
        let mut j = i;
        while j > 0 && hits[j - 1].x > hits[j].x {
            hits.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Index of the median of the first, middle and last element.
fn median_of_three(hits: &[Hit]) -> usize {
    let (lo, mid, hi) = (0, hits.len() / 2, hits.len() - 1);
    let (a, b, c) = (hits[lo].x, hits[mid].x, hits[hi].x);
    if (a <= b) == (b <= c) {
        mid
    } else if (b <= a) == (a <= c) {
        lo
    } else {
        hi
    }
}

/// Hoare partition around the pivot at index 0.
///
/// Returns `j` such that `hits[..=j]` holds values `<=` pivot and
/// `hits[j+1..]` values `>=` pivot, with `j < hits.len() - 1`.
fn partition(hits: &mut [Hit]) -> usize {
    let pivot = hits[0].x;
    let mut i = 0_usize;
    let mut j = hits.len() - 1;

    loop {
        while hits[i].x < pivot {
            i += 1;
        }
        while hits[j].x > pivot {
            j -= 1;
        }
        if i >= j {
            return j;
        }
        hits.swap(i, j);
        i += 1;
        j -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn hits_of(xs: &[f32]) -> Vec<Hit> {
        xs.iter().map(|&x| Hit { x, winding: 1 }).collect()
    }

    fn xs_of(hits: &[Hit]) -> Vec<f32> {
        hits.iter().map(|h| h.x).collect()
    }

    #[test]
    fn sorts_short_runs() {
        let mut hits = hits_of(&[3.0, 1.0, 2.0, -5.0, 2.0]);
        sort_hits(&mut hits);
        assert_eq!(xs_of(&hits), [-5.0, 1.0, 2.0, 2.0, 3.0]);
    }

    #[test]
    fn sorts_past_the_insertion_cutoff() {
        let mut xs = Vec::new();
        for i in 0..257 {
            xs.push(((i * 193) % 257) as f32);
        }
        let mut hits = hits_of(&xs);
        sort_hits(&mut hits);
        for (i, hit) in hits.iter().enumerate() {
            assert_eq!(hit.x, i as f32);
        }
    }

    #[test]
    fn sorts_presorted_and_reversed() {
        let ascending: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let mut hits = hits_of(&ascending);
        sort_hits(&mut hits);
        assert_eq!(xs_of(&hits), ascending);

        let mut hits = hits_of(&ascending.iter().rev().copied().collect::<Vec<_>>());
        sort_hits(&mut hits);
        assert_eq!(xs_of(&hits), ascending);
    }

    #[test]
    fn sorts_many_duplicates() {
        let mut hits = hits_of(&[5.0; 64]);
        hits[10].x = 1.0;
        hits[50].x = 9.0;
        sort_hits(&mut hits);
        assert_eq!(hits[0].x, 1.0);
        assert_eq!(hits[63].x, 9.0);
    }

    #[test]
    fn scale_of_identity_and_rotation_is_one() {
        use peniko::kurbo::Affine;
        assert!((pixel_scale(&Affine::IDENTITY) - 1.0).abs() < 1e-6);
        assert!((pixel_scale(&Affine::rotate(1.2)) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn scale_takes_the_larger_axis() {
        use peniko::kurbo::Affine;
        let t = Affine::scale_non_uniform(2.0, 7.0);
        assert!((pixel_scale(&t) - 7.0).abs() < 1e-4);
    }
}
