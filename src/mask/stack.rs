use std::sync::Arc;

use kurbo::{Point, Vec2};

use crate::foundation::core::{Area, OPA_COVER, OPA_TRANSP, Opacity};
use crate::foundation::math::mul_div255;

/// Direction of a [`MaskKind::Fade`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeAxis {
    /// Opacity changes along x.
    Horizontal,
    /// Opacity changes along y.
    Vertical,
}

/// Which side of a [`MaskKind::Line`] stays visible, looking from `p1` towards `p2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSide {
    /// Keep the left half-plane.
    Left,
    /// Keep the right half-plane.
    Right,
}

/// An active clip mask.
#[derive(Clone, Debug, PartialEq)]
pub enum MaskKind {
    /// Rounded rectangle; `outer == false` keeps the inside, `outer == true` keeps the outside.
    RoundedRect {
        /// Rectangle bounds.
        area: Area,
        /// Corner radius in pixels.
        radius: f64,
        /// Exclusion instead of inclusion.
        outer: bool,
    },
    /// Linear opacity fade between two coordinates along one axis.
    Fade {
        /// Region the fade applies to; pixels outside are unaffected.
        area: Area,
        /// Axis the fade runs along.
        axis: FadeAxis,
        /// Coordinate where `opa_start` applies.
        start: i32,
        /// Coordinate where `opa_end` applies.
        end: i32,
        /// Opacity at and before `start`.
        opa_start: Opacity,
        /// Opacity at and after `end`.
        opa_end: Opacity,
    },
    /// Half-plane bounded by the line through `p1` and `p2`.
    Line {
        /// First point on the line.
        p1: Point,
        /// Second point on the line.
        p2: Point,
        /// Side that stays visible.
        side: LineSide,
    },
    /// External A8 coverage map covering `area`, row-major, `area.width()` bytes per row.
    Map {
        /// Region the map covers; pixels outside are hidden.
        area: Area,
        /// Coverage bytes.
        coverage: Arc<[u8]>,
    },
}

impl MaskKind {
    /// Return `true` for the kind that can be expressed as a path.
    pub fn is_path_expressible(&self) -> bool {
        matches!(self, Self::RoundedRect { .. })
    }

    /// Return `true` when the mask changes at least one pixel of `area`.
    pub fn affects(&self, area: Area) -> bool {
        match self {
            Self::RoundedRect {
                area: m,
                radius,
                outer: false,
            } => {
                // Fully inside the straight-edged core: nothing is clipped.
                let r = radius.max(0.0).ceil() as i32;
                let core_h = Area::new(m.x0, m.y0 + r, m.x1, m.y1 - r);
                let core_v = Area::new(m.x0 + r, m.y0, m.x1 - r, m.y1);
                !(core_h.contains_area(area) || core_v.contains_area(area))
            }
            Self::RoundedRect {
                area: m,
                outer: true,
                ..
            } => m.intersect(area).is_some(),
            Self::Fade { area: m, .. } => m.intersect(area).is_some(),
            Self::Line { .. } | Self::Map { .. } => true,
        }
    }

    /// Multiply the coverage of pixels `x .. x + out.len()` on row `y` into `out`.
    pub fn apply_row(&self, x: i32, y: i32, out: &mut [u8]) {
        match self {
            Self::RoundedRect {
                area,
                radius,
                outer,
            } => {
                let rect = area.to_rect();
                let r = radius.clamp(0.0, rect.width().min(rect.height()) / 2.0);
                let center = rect.center();
                let half = Vec2::new(rect.width() / 2.0 - r, rect.height() / 2.0 - r);
                let py = f64::from(y) + 0.5;
                for (i, cov) in out.iter_mut().enumerate() {
                    let p = Point::new(f64::from(x) + i as f64 + 0.5, py);
                    let d = rounded_rect_distance(p - center, half, r);
                    let inside = ((0.5 - d).clamp(0.0, 1.0) * 255.0).round() as u8;
                    let m = if *outer { 255 - inside } else { inside };
                    *cov = mul_div255(*cov, m);
                }
            }
            Self::Fade {
                area,
                axis,
                start,
                end,
                opa_start,
                opa_end,
            } => {
                if y < area.y0 || y >= area.y1 {
                    return;
                }
                for (i, cov) in out.iter_mut().enumerate() {
                    let px = x + i as i32;
                    if px < area.x0 || px >= area.x1 {
                        continue;
                    }
                    let t = match axis {
                        FadeAxis::Horizontal => px,
                        FadeAxis::Vertical => y,
                    };
                    let m = fade_opacity(t, *start, *end, *opa_start, *opa_end);
                    *cov = mul_div255(*cov, m);
                }
            }
            Self::Line { p1, p2, side } => {
                let dir = *p2 - *p1;
                let len = dir.hypot();
                if len == 0.0 {
                    return;
                }
                let py = f64::from(y) + 0.5;
                for (i, cov) in out.iter_mut().enumerate() {
                    let p = Point::new(f64::from(x) + i as f64 + 0.5, py);
                    // Positive on the right of p1->p2 in y-down pixel space.
                    let d = dir.cross(p - *p1) / len;
                    let d = match side {
                        LineSide::Right => d,
                        LineSide::Left => -d,
                    };
                    let m = ((d + 0.5).clamp(0.0, 1.0) * 255.0).round() as u8;
                    *cov = mul_div255(*cov, m);
                }
            }
            Self::Map { area, coverage } => {
                let w = area.width() as usize;
                for (i, cov) in out.iter_mut().enumerate() {
                    let px = x + i as i32;
                    let m = if area.contains(px, y) {
                        let idx = (y - area.y0) as usize * w + (px - area.x0) as usize;
                        coverage.get(idx).copied().unwrap_or(OPA_TRANSP)
                    } else {
                        OPA_TRANSP
                    };
                    *cov = mul_div255(*cov, m);
                }
            }
        }
    }
}

fn fade_opacity(t: i32, start: i32, end: i32, opa_start: Opacity, opa_end: Opacity) -> Opacity {
    if start == end {
        return if t < start { opa_start } else { opa_end };
    }
    let (lo, hi, opa_lo, opa_hi) = if start < end {
        (start, end, opa_start, opa_end)
    } else {
        (end, start, opa_end, opa_start)
    };
    if t <= lo {
        return opa_lo;
    }
    if t >= hi {
        return opa_hi;
    }
    let span = i64::from(hi - lo);
    let f = i64::from(t - lo);
    let v = (i64::from(opa_lo) * (span - f) + i64::from(opa_hi) * f + span / 2) / span;
    v.clamp(0, 255) as Opacity
}

/// Signed distance from `p` (relative to the center) to a rounded box; negative inside.
fn rounded_rect_distance(p: Vec2, half: Vec2, r: f64) -> f64 {
    let q = Vec2::new(p.x.abs() - half.x, p.y.abs() - half.y);
    let outside = Vec2::new(q.x.max(0.0), q.y.max(0.0)).hypot();
    outside + q.x.max(q.y).min(0.0) - r
}

/// The toolkit's stack of active masks.
pub trait MaskStack {
    /// Active masks, bottom first.
    fn masks(&self) -> &[MaskKind];

    /// Return `true` when no mask is active.
    fn is_empty(&self) -> bool {
        self.masks().is_empty()
    }

    /// Combined coverage of pixels `x .. x + out.len()` on row `y`.
    ///
    /// Returns `false` (and leaves `out` fully covered) when no mask is active.
    fn coverage_row(&self, x: i32, y: i32, out: &mut [u8]) -> bool {
        out.fill(OPA_COVER);
        let masks = self.masks();
        for m in masks {
            m.apply_row(x, y, out);
        }
        !masks.is_empty()
    }
}

/// Handle returned by [`MaskList::push`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaskId(u32);

/// Plain ordered mask stack.
#[derive(Clone, Debug, Default)]
pub struct MaskList {
    ids: Vec<MaskId>,
    masks: Vec<MaskKind>,
    next: u32,
}

impl MaskList {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate a mask.
    pub fn push(&mut self, mask: MaskKind) -> MaskId {
        let id = MaskId(self.next);
        self.next = self.next.wrapping_add(1);
        self.ids.push(id);
        self.masks.push(mask);
        id
    }

    /// Deactivate a mask; returns it if it was active.
    pub fn remove(&mut self, id: MaskId) -> Option<MaskKind> {
        let i = self.ids.iter().position(|&x| x == id)?;
        self.ids.remove(i);
        Some(self.masks.remove(i))
    }

    /// Deactivate every mask.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.masks.clear();
    }
}

impl MaskStack for MaskList {
    fn masks(&self) -> &[MaskKind] {
        &self.masks
    }
}

#[cfg(test)]
#[path = "../../tests/unit/mask/stack.rs"]
mod tests;
