use std::sync::Arc;

use kurbo::{Affine, Point, Vec2};

use crate::assets::prepare::{ImageSource, Recolor};
use crate::foundation::core::{OPA_COVER, Opacity, Rgba8};
use crate::paint::gradient::{GradientRamp, GradientShape};
use crate::path::stream::FillRule;

/// How a fill is combined with the destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Source-over.
    #[default]
    Normal,
    /// `dst + src`, saturating.
    Additive,
    /// `dst - src`, saturating.
    Subtractive,
    /// `dst * src`.
    Multiply,
}

/// Placement of an image pattern: scale and rotate around `pivot`, then translate by `offset`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternTransform {
    /// Translation applied last, in destination pixels.
    pub offset: Vec2,
    /// Center of scaling and rotation, in image pixels.
    pub pivot: Point,
    /// Uniform scale factor (`1.0` = unscaled).
    pub scale: f64,
    /// Rotation in radians.
    pub rotation: f64,
}

impl Default for PatternTransform {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            pivot: Point::ZERO,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

impl PatternTransform {
    /// Plain translation.
    pub fn translate(offset: Vec2) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    /// Image space to destination space.
    pub fn to_affine(&self) -> Affine {
        let pivot = self.pivot.to_vec2();
        Affine::translate(self.offset + pivot)
            * Affine::rotate(self.rotation)
            * Affine::scale(self.scale)
            * Affine::translate(-pivot)
    }

    /// Return `true` when the transform is a whole-pixel translation.
    pub fn is_integer_translation(&self) -> bool {
        self.scale == 1.0
            && self.rotation == 0.0
            && self.offset.x.fract() == 0.0
            && self.offset.y.fract() == 0.0
    }
}

/// Image source of a pattern fill.
#[derive(Clone, Debug)]
pub struct ImagePattern {
    /// Image to sample.
    pub source: Arc<ImageSource>,
    /// Recolor applied at preparation time.
    pub recolor: Option<Recolor>,
    /// Placement of the image.
    pub transform: PatternTransform,
}

/// What a path is painted with.
#[derive(Clone, Debug)]
pub enum FillSource {
    /// Solid straight-alpha color.
    Color(Rgba8),
    /// Bitmap pattern.
    Image(ImagePattern),
    /// Gradient along a line or around a center.
    Gradient {
        /// Geometry of the ramp in path coordinates.
        shape: GradientShape,
        /// Color stops.
        ramp: GradientRamp,
    },
}

/// Fill rule, paint, opacity and blend mode of one draw.
#[derive(Clone, Debug)]
pub struct FillDesc {
    /// Fill rule of the primary path.
    pub rule: FillRule,
    /// Paint.
    pub source: FillSource,
    /// Global opacity; `0` skips the draw.
    pub opacity: Opacity,
    /// Blend mode.
    pub blend: BlendMode,
}

impl FillDesc {
    /// Opaque, non-zero, source-over solid fill.
    pub fn solid(color: Rgba8) -> Self {
        Self {
            rule: FillRule::NonZero,
            source: FillSource::Color(color),
            opacity: OPA_COVER,
            blend: BlendMode::Normal,
        }
    }

    /// Linear gradient fill.
    pub fn linear(start: Point, end: Point, ramp: GradientRamp) -> Self {
        Self {
            source: FillSource::Gradient {
                shape: GradientShape::Linear { start, end },
                ramp,
            },
            ..Self::solid(Rgba8::BLACK)
        }
    }

    /// Radial gradient fill.
    pub fn radial(center: Point, radius: f64, ramp: GradientRamp) -> Self {
        Self {
            source: FillSource::Gradient {
                shape: GradientShape::Radial { center, radius },
                ramp,
            },
            ..Self::solid(Rgba8::BLACK)
        }
    }

    /// Image pattern fill.
    pub fn image(pattern: ImagePattern) -> Self {
        Self {
            source: FillSource::Image(pattern),
            ..Self::solid(Rgba8::BLACK)
        }
    }

    /// Builder-style opacity override.
    pub fn with_opacity(mut self, opacity: Opacity) -> Self {
        self.opacity = opacity;
        self
    }

    /// Builder-style fill rule override.
    pub fn with_rule(mut self, rule: FillRule) -> Self {
        self.rule = rule;
        self
    }

    /// Builder-style blend mode override.
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    /// Return `true` when the draw cannot change any pixel.
    pub fn is_invisible(&self) -> bool {
        self.opacity == 0 || matches!(self.source, FillSource::Color(c) if c.a == 0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/paint/fill.rs"]
mod tests;
