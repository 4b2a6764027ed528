use kurbo::{Point, Rect, Vec2};

use crate::foundation::error::{VgError, VgResult};
use crate::path::arc::{append_arc, append_circle, append_rounded_rect, arc_piece};
use crate::path::stream::{FillRule, PathCmd, PathStream};

/// Upper bound on the sub-paths a single dashed line may expand to.
pub const MAX_DASH_SPANS: usize = 4096;

/// End decoration of a stroked line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    /// The stroke stops exactly at the endpoint.
    #[default]
    Flat,
    /// A half disc centered on the endpoint.
    Round,
    /// The stroke is extended by half its width.
    Square,
}

/// On/off pattern of a dashed line, in pixels along the line.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Dash {
    /// Length of each drawn span.
    pub dash: f64,
    /// Length of each gap.
    pub gap: f64,
}

/// Geometric primitive accepted by [`build_path`].
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    /// Filled rectangle with circular corners.
    RoundedRect {
        /// Outer bounds.
        rect: Rect,
        /// Corner radius, clamped to half of the shorter side.
        radius: f64,
    },
    /// Stroked line segment.
    Line {
        /// Start point.
        from: Point,
        /// End point.
        to: Point,
        /// Stroke width.
        width: f64,
        /// Cap at both ends.
        cap: LineCap,
        /// Optional dash pattern.
        dash: Option<Dash>,
    },
    /// Stroked circular arc; a sweep of a full turn or more yields a ring.
    Arc {
        /// Arc center.
        center: Point,
        /// Outer radius.
        radius: f64,
        /// Stroke width measured inwards; `>= radius` produces a pie slice.
        width: f64,
        /// Start angle in radians, growing from +x towards +y.
        start_angle: f64,
        /// Signed sweep in radians.
        sweep: f64,
        /// Round the two ends.
        rounded: bool,
    },
    /// Filled disc.
    Circle {
        /// Center.
        center: Point,
        /// Radius.
        radius: f64,
    },
    /// Filled polygon through the vertices in order.
    Polygon {
        /// Vertices; at least three.
        points: Vec<Point>,
    },
    /// Precomputed curve list, used verbatim.
    Curves {
        /// Commands; must start with `MoveTo`.
        cmds: Vec<PathCmd>,
    },
    /// Rounded-rectangle outline of the given width.
    Border {
        /// Outer bounds.
        rect: Rect,
        /// Outer corner radius.
        radius: f64,
        /// Border width.
        width: f64,
    },
}

impl Primitive {
    /// Fill rule the built stream is meant to be rendered with.
    pub fn fill_rule(&self) -> FillRule {
        match self {
            Self::Border { .. } | Self::Arc { .. } => FillRule::EvenOdd,
            _ => FillRule::NonZero,
        }
    }

    /// Analytic bounding box of the filled region, `None` for zero-size primitives.
    pub fn bounds(&self) -> Option<Rect> {
        let non_empty = |r: Rect| (r.width() > 0.0 && r.height() > 0.0).then_some(r);
        match self {
            Self::RoundedRect { rect, .. } | Self::Border { rect, .. } => non_empty(rect.abs()),
            Self::Circle { center, radius } => {
                non_empty(Rect::from_center_size(*center, (radius * 2.0, radius * 2.0)))
            }
            _ => {
                let mut s = PathStream::new();
                build_path(self, &mut s).ok()?;
                s.bounds()
            }
        }
    }
}

/// Convert a primitive into a path command stream.
///
/// `out` is cleared first. Zero-size primitives leave it empty and succeed; callers must skip the
/// draw. A line with coincident endpoints fails with [`VgError::DegenerateGeometry`].
pub fn build_path(prim: &Primitive, out: &mut PathStream) -> VgResult<()> {
    out.clear();
    match prim {
        Primitive::RoundedRect { rect, radius } => {
            if rect.width() == 0.0 || rect.height() == 0.0 {
                return Ok(());
            }
            append_rounded_rect(out, *rect, *radius);
        }
        Primitive::Line {
            from,
            to,
            width,
            cap,
            dash,
        } => build_line(out, *from, *to, *width, *cap, *dash)?,
        Primitive::Arc {
            center,
            radius,
            width,
            start_angle,
            sweep,
            rounded,
        } => build_arc(out, *center, *radius, *width, *start_angle, *sweep, *rounded),
        Primitive::Circle { center, radius } => {
            if *radius <= 0.0 {
                return Ok(());
            }
            append_circle(out, *center, *radius);
        }
        Primitive::Polygon { points } => {
            let Some((first, rest)) = points.split_first() else {
                return Ok(());
            };
            if rest.len() < 2 {
                return Err(VgError::DegenerateGeometry);
            }
            out.move_to(*first);
            for p in rest {
                out.line_to(*p);
            }
            out.close();
        }
        Primitive::Curves { cmds } => {
            if cmds.is_empty() {
                return Ok(());
            }
            let stream = PathStream::from_cmds(cmds.iter().copied());
            stream.validate()?;
            out.append(&stream);
        }
        Primitive::Border {
            rect,
            radius,
            width,
        } => {
            let rect = rect.abs();
            if rect.width() == 0.0 || rect.height() == 0.0 || *width <= 0.0 {
                return Ok(());
            }
            append_rounded_rect(out, rect, *radius);
            let inner = rect.inset(-*width);
            if inner.width() > 0.0 && inner.height() > 0.0 {
                append_rounded_rect(out, inner, (*radius - *width).max(0.0));
            }
        }
    }
    if !out.is_empty() {
        out.end();
    }
    Ok(())
}

fn build_line(
    out: &mut PathStream,
    from: Point,
    to: Point,
    width: f64,
    cap: LineCap,
    dash: Option<Dash>,
) -> VgResult<()> {
    let delta = to - from;
    let len = delta.hypot();
    if len == 0.0 {
        return Err(VgError::DegenerateGeometry);
    }
    if width <= 0.0 {
        return Ok(());
    }
    let dir = delta / len;

    let Some(Dash { dash, gap }) = dash.filter(|d| d.dash > 0.0 && d.gap > 0.0) else {
        append_stroke_segment(out, from, to, dir, width, cap);
        return Ok(());
    };

    let period = dash + gap;
    let spans = (len / period).ceil();
    if !spans.is_finite() || spans > MAX_DASH_SPANS as f64 {
        return Err(VgError::validation(format!(
            "dash pattern needs {spans} spans, limit is {MAX_DASH_SPANS}"
        )));
    }
    for i in 0..spans as usize {
        let t0 = i as f64 * period;
        let t1 = (t0 + dash).min(len);
        if t1 <= t0 {
            continue;
        }
        append_stroke_segment(out, from + dir * t0, from + dir * t1, dir, width, cap);
    }
    Ok(())
}

/// One closed sub-path covering a stroked segment with caps on both ends.
fn append_stroke_segment(
    out: &mut PathStream,
    from: Point,
    to: Point,
    dir: Vec2,
    width: f64,
    cap: LineCap,
) {
    let half = width / 2.0;
    let n = Vec2::new(-dir.y, dir.x);
    let (from, to) = match cap {
        LineCap::Square => (from - dir * half, to + dir * half),
        LineCap::Flat | LineCap::Round => (from, to),
    };

    out.move_to(from + n * half);
    out.line_to(to + n * half);
    if cap == LineCap::Round {
        arc_piece(out, to, half, n, dir);
        arc_piece(out, to, half, dir, -n);
    } else {
        out.line_to(to - n * half);
    }
    out.line_to(from - n * half);
    if cap == LineCap::Round {
        arc_piece(out, from, half, -n, -dir);
        arc_piece(out, from, half, -dir, n);
    }
    out.close();
}

fn build_arc(
    out: &mut PathStream,
    center: Point,
    radius: f64,
    width: f64,
    start_angle: f64,
    sweep: f64,
    rounded: bool,
) {
    if radius <= 0.0 || width <= 0.0 || sweep == 0.0 {
        return;
    }
    let inner = (radius - width).max(0.0);

    if sweep.abs() >= std::f64::consts::TAU {
        append_circle(out, center, radius);
        if inner > 0.0 {
            append_circle(out, center, inner);
        }
        return;
    }

    append_arc(out, center, radius, start_angle, sweep, false);
    let end_angle = start_angle + sweep;
    let cap_r = (radius - inner) / 2.0;
    let cap_center = |a: f64| center + Vec2::from_angle(a) * (inner + cap_r);

    if inner <= 0.0 {
        out.line_to(center);
        out.close();
        return;
    }

    // Travel direction along the outer arc. Caps bulge along it at the end and against it at the
    // start.
    let fwd = |a: f64| Vec2::from_angle(a + sweep.signum() * std::f64::consts::FRAC_PI_2);
    if rounded {
        let out_r = Vec2::from_angle(end_angle);
        arc_piece(out, cap_center(end_angle), cap_r, out_r, fwd(end_angle));
        arc_piece(out, cap_center(end_angle), cap_r, fwd(end_angle), -out_r);
    }
    append_arc(out, center, inner, end_angle, -sweep, true);
    if rounded {
        let out_r = Vec2::from_angle(start_angle);
        arc_piece(out, cap_center(start_angle), cap_r, -out_r, -fwd(start_angle));
        arc_piece(out, cap_center(start_angle), cap_r, -fwd(start_angle), out_r);
    }
    out.close();
}

#[cfg(test)]
#[path = "../../tests/unit/path/builder.rs"]
mod tests;
