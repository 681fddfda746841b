// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The fill/composite loop: applying coverage to a destination.

use crate::blend::{self, Blender, Masker};
use crate::paint::PremulColor;
use crate::pixmap::Pixmap;
use crate::util::{div_255, norm_mul, normalized_mul_u8x32, Div255Ext};
use fearless_simd::*;
use peniko::color::PremulRgba8;
use peniko::BlendMode;

/// Pixels per block of the fast-path loop.
const BLOCK: usize = 16;

/// One draw's composite state: the resolved solid source, its blend mode,
/// and the dispatch level.
pub(crate) struct Fine {
    level: Level,
    solid: PremulRgba8,
    blender: Blender,
    masker: Masker,
    /// Source-over with a normal mix.
    default: bool,
    /// Masking composition: uncovered pixels must end up zero.
    masking: bool,
    /// Fully covered blocks can be written without blending.
    opaque_default: bool,
}

impl Fine {
    pub(crate) fn new(level: Level, color: PremulColor, blend_mode: BlendMode) -> Self {
        let default = blend::is_default(blend_mode);
        Self {
            level,
            solid: color.as_premul_rgba8(),
            blender: blend::blender(blend_mode),
            masker: blend::masker(blend_mode),
            default,
            masking: blend::is_masking(blend_mode),
            opaque_default: default && color.is_opaque(),
        }
    }

    pub(crate) fn masking(&self) -> bool {
        self.masking
    }

    /// Apply one scanline of coverage to a run of pixels.
    ///
    /// `dest` and `coverage` cover the same pixels: the fill window of the
    /// current scanline. Full blocks take one of three paths: skipped (or
    /// zeroed under masking) when untouched, stored directly when fully
    /// covered by an opaque default source, and otherwise blended with the
    /// SIMD kernel for the default mode or the scalar blender for the rest.
    pub(crate) fn fill_row(&self, dest: &mut [PremulRgba8], coverage: &[u8]) {
        debug_assert_eq!(dest.len(), coverage.len());
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(dest);
        let solid = self.solid.to_u8_array();

        let mut blocks = coverage.chunks_exact(BLOCK);
        let mut offset = 0;
        for block in &mut blocks {
            let dest_block = &mut bytes[offset * 4..offset * 4 + BLOCK * 4];
            let occupancy = u128::from_ne_bytes(block.try_into().unwrap());
            if occupancy == 0 {
                if self.masking {
                    dest_block.fill(0);
                }
            } else if occupancy == u128::MAX && self.opaque_default {
                for pixel in dest_block.chunks_exact_mut(4) {
                    pixel.copy_from_slice(&solid);
                }
            } else if self.default {
                dispatch!(self.level, simd => src_over_block(simd, dest_block, block, solid));
            } else {
                for (pixel, &cov) in dest_block.chunks_exact_mut(4).zip(block) {
                    self.blend_pixel(pixel, cov);
                }
            }
            offset += BLOCK;
        }

        for (pixel, &cov) in bytes[offset * 4..]
            .chunks_exact_mut(4)
            .zip(blocks.remainder())
        {
            self.blend_pixel(pixel, cov);
        }
    }

    /// The scalar tail of [`fill_row`](Self::fill_row), bit-identical to the
    /// SIMD kernel for the default mode.
    fn blend_pixel(&self, pixel: &mut [u8], cov: u8) {
        if cov == 0 {
            if self.masking {
                pixel.fill(0);
            }
            return;
        }
        let dest = PremulRgba8 {
            r: pixel[0],
            g: pixel[1],
            b: pixel[2],
            a: pixel[3],
        };
        let out = if self.default {
            src_over_pixel(dest, self.solid, cov)
        } else {
            let src = weighted(self.solid, cov);
            (self.blender)(dest, src)
        };
        pixel.copy_from_slice(&out.to_u8_array());
    }

    /// Apply one scanline of coverage to a run of mask bytes.
    pub(crate) fn fill_mask_row(&self, dest: &mut [u8], coverage: &[u8]) {
        debug_assert_eq!(dest.len(), coverage.len());

        let mut blocks = coverage.chunks_exact(BLOCK);
        let mut offset = 0;
        for block in &mut blocks {
            let dest_block = &mut dest[offset..offset + BLOCK];
            let occupancy = u128::from_ne_bytes(block.try_into().unwrap());
            if occupancy == 0 {
                if self.masking {
                    dest_block.fill(0);
                }
            } else if occupancy == u128::MAX && self.default {
                dest_block.fill(255);
            } else if self.default {
                dispatch!(self.level, simd => mask_over_block(simd, dest_block, block));
            } else {
                for (value, &cov) in dest_block.iter_mut().zip(block) {
                    self.mask_pixel(value, cov);
                }
            }
            offset += BLOCK;
        }

        for (value, &cov) in dest[offset..].iter_mut().zip(blocks.remainder()) {
            self.mask_pixel(value, cov);
        }
    }

    fn mask_pixel(&self, value: &mut u8, cov: u8) {
        if cov == 0 {
            if self.masking {
                *value = 0;
            }
            return;
        }
        *value = (self.masker)(*value, cov);
    }
}

/// Composite a source pixmap onto `dest` under a blend mode and opacity.
///
/// This is the slow path behind external paint sources; the source has
/// already been masked by the path's coverage.
pub(crate) fn composite_pixmap(
    dest: &mut Pixmap,
    src: &Pixmap,
    blend_mode: BlendMode,
    opacity: f32,
) {
    debug_assert_eq!((dest.width(), dest.height()), (src.width(), src.height()));
    let blender = blend::blender(blend_mode);
    let opacity = (opacity.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;

    for (d, s) in dest.data_mut().iter_mut().zip(src.data()) {
        let s = weighted(*s, opacity);
        *d = blender(*d, s);
    }
}

/// Scale a premultiplied color by a coverage byte.
#[inline(always)]
fn weighted(color: PremulRgba8, cov: u8) -> PremulRgba8 {
    PremulRgba8 {
        r: norm_mul(color.r, cov),
        g: norm_mul(color.g, cov),
        b: norm_mul(color.b, cov),
        a: norm_mul(color.a, cov),
    }
}

/// Source-over of a coverage-weighted solid, one pixel.
///
/// Keeps the products un-divided until the end, exactly like the SIMD
/// kernel, so both paths quantize identically.
#[inline(always)]
fn src_over_pixel(dest: PremulRgba8, src: PremulRgba8, cov: u8) -> PremulRgba8 {
    let inv = u16::from(255 - norm_mul(src.a, cov));
    let cov = u16::from(cov);
    let ch = |d: u8, s: u8| div_255(u16::from(d) * inv + u16::from(s) * cov) as u8;
    PremulRgba8 {
        r: ch(dest.r, src.r),
        g: ch(dest.g, src.g),
        b: ch(dest.b, src.b),
        a: ch(dest.a, src.a),
    }
}

/// Source-over of a coverage-weighted solid over 16 pixels.
#[inline(always)]
fn src_over_block<S: Simd>(simd: S, dest: &mut [u8], coverage: &[u8], src: [u8; 4]) {
    let src_a = u8x32::splat(simd, src[3]);
    let src_c = u32x8::splat(simd, u32::from_ne_bytes(src)).reinterpret_u8();
    let one = u8x32::splat(simd, 255);

    for (dest_half, cov_half) in dest.chunks_exact_mut(32).zip(coverage.chunks_exact(8)) {
        let bg = u8x32::from_slice(simd, dest_half);
        let cov = extract_coverage(simd, cov_half);
        let inv = one - simd.narrow_u16x32(normalized_mul_u8x32(src_a, cov));
        let res = simd.narrow_u16x32(
            (simd.widen_u8x32(bg) * simd.widen_u8x32(inv)
                + simd.widen_u8x32(src_c) * simd.widen_u8x32(cov))
            .div_255(),
        );
        dest_half.copy_from_slice(&res.val);
    }
}

/// Source-over of raw coverage over 16 mask bytes.
#[inline(always)]
fn mask_over_block<S: Simd>(simd: S, dest: &mut [u8], coverage: &[u8]) {
    let cov = u8x16::from_slice(simd, coverage);
    let inv = u8x16::splat(simd, 255) - cov;
    let bg = u8x16::from_slice(simd, dest);
    let res = simd.narrow_u16x16((simd.widen_u8x16(bg) * simd.widen_u8x16(inv)).div_255()) + cov;
    dest.copy_from_slice(&res.val);
}

/// Splat 8 coverage bytes to the 4 color components of 8 pixels.
#[inline(always)]
fn extract_coverage<S: Simd>(simd: S, coverage: &[u8]) -> u8x32<S> {
    let c1 = u32x4::splat(simd, u32::from_ne_bytes(coverage[0..4].try_into().unwrap()))
        .reinterpret_u8();
    let c2 = u32x4::splat(simd, u32::from_ne_bytes(coverage[4..8].try_into().unwrap()))
        .reinterpret_u8();

    let zipped1 = c1.zip_low(c1);
    let zipped1 = zipped1.zip_low(zipped1);

    let zipped2 = c2.zip_low(c2);
    let zipped2 = zipped2.zip_low(zipped2);

    simd.combine_u8x16(zipped1, zipped2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::PremulColor;
    use alloc::vec;
    use alloc::vec::Vec;
    use peniko::color::palette::css;
    use peniko::{BlendMode, Compose, Mix};

    fn fine(color: peniko::color::AlphaColor<peniko::color::Srgb>, mode: BlendMode) -> Fine {
        Fine::new(
            Level::try_detect().unwrap_or(Level::fallback()),
            PremulColor::from_alpha_color(color),
            mode,
        )
    }

    fn coverage_ramp(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    #[test]
    fn zero_coverage_leaves_pixels_alone() {
        let fine = fine(css::RED, BlendMode::default());
        let green = css::GREEN.premultiply().to_rgba8();
        let mut dest = vec![green; 40];
        fine.fill_row(&mut dest, &vec![0; 40]);
        assert!(dest.iter().all(|p| *p == green));
    }

    #[test]
    fn masking_zeroes_uncovered_blocks() {
        let fine = fine(css::WHITE, BlendMode::new(Mix::Normal, Compose::DestIn));
        let green = css::GREEN.premultiply().to_rgba8();
        let mut dest = vec![green; 40];
        let mut coverage = vec![0_u8; 40];
        coverage[20] = 255;
        fine.fill_row(&mut dest, &coverage);
        for (x, pixel) in dest.iter().enumerate() {
            if x == 20 {
                assert_eq!(*pixel, green);
            } else {
                assert_eq!(*pixel, PremulRgba8::from_u32(0), "pixel {x}");
            }
        }
    }

    #[test]
    fn full_opaque_coverage_writes_the_color() {
        let fine = fine(css::RED, BlendMode::default());
        let red = css::RED.premultiply().to_rgba8();
        let mut dest = vec![css::GREEN.premultiply().to_rgba8(); 32];
        fine.fill_row(&mut dest, &vec![255; 32]);
        assert!(dest.iter().all(|p| *p == red));
    }

    #[test]
    fn partial_coverage_blends() {
        let fine = fine(css::RED, BlendMode::default());
        let mut dest = vec![PremulRgba8::from_u32(0); 16];
        fine.fill_row(&mut dest, &vec![128; 16]);
        let out = dest[7];
        assert_eq!(out.g, 0);
        assert!((127..=129).contains(&out.r), "red {}", out.r);
        assert_eq!(out.r, out.a);
    }

    #[test]
    fn simd_levels_agree_with_the_fallback() {
        let color = css::REBECCA_PURPLE.with_alpha(0.7);
        let modes = [
            BlendMode::default(),
            BlendMode::new(Mix::Normal, Compose::DestIn),
            BlendMode::new(Mix::Normal, Compose::Plus),
        ];
        for mode in modes {
            let detected = Fine::new(
                Level::try_detect().unwrap_or(Level::fallback()),
                PremulColor::from_alpha_color(color),
                mode,
            );
            let fallback = Fine::new(
                Level::fallback(),
                PremulColor::from_alpha_color(color),
                mode,
            );

            let coverage = coverage_ramp(53);
            let base: Vec<PremulRgba8> = (0..53)
                .map(|i| {
                    let a = (i * 5 % 256) as u8;
                    PremulRgba8 {
                        r: norm_mul(a, 200),
                        g: norm_mul(a, 17),
                        b: norm_mul(a, 255),
                        a,
                    }
                })
                .collect();

            let mut with_detected = base.clone();
            detected.fill_row(&mut with_detected, &coverage);
            let mut with_fallback = base.clone();
            fallback.fill_row(&mut with_fallback, &coverage);
            assert_eq!(with_detected, with_fallback);

            let mask_base: Vec<u8> = (0..53).map(|i| (i * 11 % 256) as u8).collect();
            let mut mask_detected = mask_base.clone();
            detected.fill_mask_row(&mut mask_detected, &coverage);
            let mut mask_fallback = mask_base;
            fallback.fill_mask_row(&mut mask_fallback, &coverage);
            assert_eq!(mask_detected, mask_fallback);
        }
    }

    #[test]
    fn mask_rows_accumulate_coverage() {
        let fine = fine(css::WHITE, BlendMode::default());
        let mut dest = vec![0_u8; 20];
        let mut coverage = vec![0_u8; 20];
        coverage[3] = 100;
        coverage[17] = 255;
        fine.fill_mask_row(&mut dest, &coverage);
        assert_eq!(dest[3], 100);
        assert_eq!(dest[17], 255);
        assert_eq!(dest[0], 0);

        // Compositing again source-over accumulates.
        fine.fill_mask_row(&mut dest, &coverage);
        assert!(dest[3] > 100);
    }

    #[test]
    fn composite_pixmap_applies_blend_and_opacity() {
        let mut dest = Pixmap::new(2, 1);
        dest.fill(css::BLUE.premultiply().to_rgba8());
        let mut src = Pixmap::new(2, 1);
        src.fill(css::RED.premultiply().to_rgba8());

        composite_pixmap(&mut dest, &src, BlendMode::default(), 1.0);
        assert_eq!(dest.sample(0, 0), css::RED.premultiply().to_rgba8());

        let mut dest = Pixmap::new(2, 1);
        dest.fill(css::BLUE.premultiply().to_rgba8());
        composite_pixmap(&mut dest, &src, BlendMode::default(), 0.0);
        assert_eq!(dest.sample(0, 0), css::BLUE.premultiply().to_rgba8());
    }
}
