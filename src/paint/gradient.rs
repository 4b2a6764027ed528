use std::hash::{Hash, Hasher};
use std::sync::Arc;

use kurbo::{Affine, Point, Vec2};
use smallvec::SmallVec;
use tracing::trace;

use crate::buffer::descriptor::{BufferDesc, PixelBuffer};
use crate::buffer::format::PixelFormat;
use crate::foundation::core::{Rgba8, Rgba8Premul};
use crate::foundation::error::{VgError, VgResult};
use crate::foundation::math::RampHasher;

/// One color stop; `frac` runs from 0 (ramp start) to 255 (ramp end).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GradientStop {
    /// Position along the ramp.
    pub frac: u8,
    /// Premultiplied color.
    pub color: Rgba8Premul,
}

impl GradientStop {
    /// Stop from a straight-alpha color.
    pub fn straight(frac: u8, color: Rgba8) -> Self {
        Self {
            frac,
            color: color.premultiply(),
        }
    }
}

/// Ordered color stops. Always starts at 0 and ends at 255.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GradientRamp {
    stops: SmallVec<[GradientStop; 4]>,
}

impl GradientRamp {
    /// Sort stops by position and insert the implicit end stops.
    ///
    /// An empty stop list yields the opaque black to opaque white ramp.
    pub fn new(stops: impl IntoIterator<Item = GradientStop>) -> Self {
        let mut stops: SmallVec<[GradientStop; 4]> = stops.into_iter().collect();
        if stops.is_empty() {
            stops.push(GradientStop::straight(0, Rgba8::BLACK));
            stops.push(GradientStop::straight(255, Rgba8::WHITE));
        }
        stops.sort_by_key(|s| s.frac);
        if let Some(&first) = stops.first()
            && first.frac != 0
        {
            stops.insert(0, GradientStop { frac: 0, ..first });
        }
        if let Some(&last) = stops.last()
            && last.frac != 255
        {
            stops.push(GradientStop { frac: 255, ..last });
        }
        Self { stops }
    }

    /// Two-stop ramp.
    pub fn two_stop(start: Rgba8, end: Rgba8) -> Self {
        Self::new([
            GradientStop::straight(0, start),
            GradientStop::straight(255, end),
        ])
    }

    /// Stops in ascending order.
    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    /// Interpolated color at position `t` (`0.0..=255.0`).
    pub fn color_at(&self, t: f64) -> Rgba8Premul {
        let t = t.clamp(0.0, 255.0);
        let hi = self
            .stops
            .iter()
            .position(|s| f64::from(s.frac) >= t)
            .unwrap_or(self.stops.len() - 1);
        if hi == 0 {
            return self.stops[0].color;
        }
        let (a, b) = (self.stops[hi - 1], self.stops[hi]);
        let span = f64::from(b.frac) - f64::from(a.frac);
        if span <= 0.0 {
            return b.color;
        }
        let f = (t - f64::from(a.frac)) / span;
        let lerp = |x: u8, y: u8| -> u8 {
            let xf = f64::from(x);
            (xf + (f64::from(y) - xf) * f).round().clamp(0.0, 255.0) as u8
        };
        Rgba8Premul {
            r: lerp(a.color.r, b.color.r),
            g: lerp(a.color.g, b.color.g),
            b: lerp(a.color.b, b.color.b),
            a: lerp(a.color.a, b.color.a),
        }
    }

    /// Materialize into a `width x 1` premultiplied lookup image.
    pub fn materialize(&self, width: u32) -> VgResult<PixelBuffer> {
        if width < 2 {
            return Err(VgError::validation("gradient ramp width must be >= 2"));
        }
        let mut out = PixelBuffer::new(BufferDesc::new(width, 1, PixelFormat::Rgba8Premul))?;
        let last = f64::from(width - 1);
        for x in 0..width {
            out.set_pixel(x, 0, self.color_at(f64::from(x) * 255.0 / last));
        }
        Ok(out)
    }

    /// Content fingerprint used to skip re-materialization.
    pub fn content_hash(&self) -> u64 {
        let mut h = RampHasher::default();
        self.hash(&mut h);
        h.finish()
    }
}

/// Geometry of a gradient in path coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GradientShape {
    /// Ramp runs from `start` (0) to `end` (255).
    Linear {
        /// Ramp start.
        start: Point,
        /// Ramp end.
        end: Point,
    },
    /// Ramp runs from `center` (0) to the circle of `radius` (255).
    Radial {
        /// Center.
        center: Point,
        /// Radius where the ramp ends.
        radius: f64,
    },
}

impl GradientShape {
    /// Horizontal linear gradient spanning `[x0, x1]`.
    pub fn horizontal(x0: f64, x1: f64, y: f64) -> Self {
        Self::Linear {
            start: Point::new(x0, y),
            end: Point::new(x1, y),
        }
    }

    /// Vertical linear gradient spanning `[y0, y1]`, the horizontal case rotated by 90 degrees.
    pub fn vertical(y0: f64, y1: f64, x: f64) -> Self {
        Self::Linear {
            start: Point::new(x, y0),
            end: Point::new(x, y1),
        }
    }

    /// Shape mapped through `xf`; a radial radius scales by the mean axis scale.
    pub fn transformed(&self, xf: Affine) -> Self {
        match *self {
            Self::Linear { start, end } => Self::Linear {
                start: xf * start,
                end: xf * end,
            },
            Self::Radial { center, radius } => Self::Radial {
                center: xf * center,
                radius: radius * xf.determinant().abs().sqrt(),
            },
        }
    }

    /// Ramp position (`0.0..=1.0`) of point `p`.
    pub fn position(&self, p: Point) -> f64 {
        match *self {
            Self::Linear { start, end } => {
                let d: Vec2 = end - start;
                let len2 = d.hypot2();
                if len2 <= f64::EPSILON {
                    return 0.0;
                }
                ((p - start).dot(d) / len2).clamp(0.0, 1.0)
            }
            Self::Radial { center, radius } => {
                if radius <= 0.0 {
                    return 1.0;
                }
                ((p - center).hypot() / radius).clamp(0.0, 1.0)
            }
        }
    }
}

/// Materialized ramp ready for per-pixel lookup.
#[derive(Clone, Debug)]
pub struct RampLut {
    hash: u64,
    image: Arc<PixelBuffer>,
}

impl RampLut {
    /// Lookup image (`width x 1`).
    pub fn image(&self) -> &Arc<PixelBuffer> {
        &self.image
    }

    /// Content hash of the ramp it was built from.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Color at ramp position `t` (`0.0..=1.0`), nearest entry.
    pub fn sample(&self, t: f64) -> Rgba8Premul {
        let w = self.image.width();
        let x = (t.clamp(0.0, 1.0) * f64::from(w - 1)).round() as u32;
        self.image
            .pixel(x.min(w - 1), 0)
            .unwrap_or_else(Rgba8Premul::transparent)
    }
}

/// Counters of a [`RampCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RampCacheStats {
    /// Requests served from the previous materialization.
    pub hits: u64,
    /// Requests that materialized a ramp.
    pub misses: u64,
}

/// Remembers the last materialized ramp so consecutive draws with the same ramp reuse it.
#[derive(Debug)]
pub struct RampCache {
    width: u32,
    last: Option<RampLut>,
    stats: RampCacheStats,
}

impl RampCache {
    /// Cache producing lookups of `width` entries.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            last: None,
            stats: RampCacheStats::default(),
        }
    }

    /// Counters.
    pub fn stats(&self) -> RampCacheStats {
        self.stats
    }

    /// Lookup for `ramp`, materializing only when its content changed.
    pub fn lookup(&mut self, ramp: &GradientRamp) -> VgResult<RampLut> {
        let hash = ramp.content_hash();
        if let Some(last) = &self.last
            && last.hash == hash
        {
            self.stats.hits += 1;
            return Ok(last.clone());
        }
        self.stats.misses += 1;
        trace!(hash, width = self.width, "materializing gradient ramp");
        let lut = RampLut {
            hash,
            image: Arc::new(ramp.materialize(self.width)?),
        };
        self.last = Some(lut.clone());
        Ok(lut)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/paint/gradient.rs"]
mod tests;
