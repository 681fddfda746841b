// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Types for paints.

use crate::pixmap::Pixmap;
use alloc::sync::Arc;
use core::fmt::Debug;
use peniko::color::{AlphaColor, PremulRgba8, Srgb};
use peniko::BlendMode;

/// A premultiplied color, cached in both integer and float form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PremulColor {
    premul_u8: PremulRgba8,
    premul_f32: peniko::color::PremulColor<Srgb>,
}

impl PremulColor {
    /// Create a new premultiplied color.
    pub fn from_alpha_color(color: AlphaColor<Srgb>) -> Self {
        let premul = color.premultiply();
        Self {
            premul_u8: premul.to_rgba8(),
            premul_f32: premul,
        }
    }

    /// Return the color as a premultiplied RGBA8 color.
    pub fn as_premul_rgba8(&self) -> PremulRgba8 {
        self.premul_u8
    }

    /// Return whether the color is opaque (i.e. doesn't have transparency).
    pub fn is_opaque(&self) -> bool {
        self.premul_f32.components[3] == 1.0
    }
}

/// An externally rendered paint: gradients, images, tilings.
///
/// The rasterizer knows nothing about such paints beyond this interface. To
/// composite one, it renders the paint into an intermediate pixmap, masks it
/// by the path's coverage, and composites the result under the paint's blend
/// mode and opacity.
pub trait PaintSource: Debug + Send + Sync {
    /// Render the paint's pixels for a `width` × `height` destination.
    fn render(&self, width: u16, height: u16) -> Pixmap;
}

/// What a paint draws with.
#[derive(Debug, Clone)]
pub enum PaintKind {
    /// A solid color, composited directly.
    Solid(AlphaColor<Srgb>),
    /// An external source, rendered to an intermediate and masked.
    Source(Arc<dyn PaintSource>),
}

/// A paint: a pixel source plus blend mode and opacity.
#[derive(Debug, Clone)]
pub struct Paint {
    /// The pixel source.
    pub kind: PaintKind,
    /// How the paint composites onto the destination.
    pub blend_mode: BlendMode,
    /// A global opacity in `[0, 1]`. Zero short-circuits the draw.
    pub opacity: f32,
}

impl Paint {
    /// A solid paint with default blending.
    pub fn solid(color: AlphaColor<Srgb>) -> Self {
        Self {
            kind: PaintKind::Solid(color),
            blend_mode: BlendMode::default(),
            opacity: 1.0,
        }
    }

    /// A paint drawing from an external source.
    pub fn from_source(source: Arc<dyn PaintSource>) -> Self {
        Self {
            kind: PaintKind::Source(source),
            blend_mode: BlendMode::default(),
            opacity: 1.0,
        }
    }

    /// This paint with a different blend mode.
    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// This paint with a different opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

impl From<AlphaColor<Srgb>> for Paint {
    fn from(value: AlphaColor<Srgb>) -> Self {
        Self::solid(value)
    }
}
