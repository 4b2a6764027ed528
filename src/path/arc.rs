//! Closed-form cubic Bézier approximation of circular arcs.
//!
//! Arcs are split into pieces of at most a quarter turn. A piece spanning `θ` uses control points
//! offset `k·r` along the tangents, with `k = 4/3·tan(θ/4)` (`0.5523` for a quarter circle).

use kurbo::{Point, Rect, Vec2};

use crate::path::stream::PathStream;

/// Control-point factor of a quarter-circle cubic.
pub const KAPPA: f64 = 0.552_284_749_830_793_4;

const QUARTER: f64 = std::f64::consts::FRAC_PI_2;

fn perp(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Append one cubic going from radial direction `u` to radial direction `v` around `center`.
///
/// `u` and `v` are unit vectors at most a quarter turn apart. The sign of `u × v` picks the
/// direction of travel; the current point is assumed to be `center + u·radius`.
pub(crate) fn arc_piece(stream: &mut PathStream, center: Point, radius: f64, u: Vec2, v: Vec2) {
    let cross = u.cross(v);
    let theta = cross.abs().atan2(u.dot(v));
    let k = 4.0 / 3.0 * (theta / 4.0).tan();
    let sign = if cross < 0.0 { -1.0 } else { 1.0 };

    let p0 = center + u * radius;
    let p3 = center + v * radius;
    let c1 = p0 + perp(u) * (sign * k * radius);
    let c2 = p3 - perp(v) * (sign * k * radius);
    stream.cubic_to(c1, c2, p3);
}

/// Append a circular arc of `sweep` radians starting at `start_angle`.
///
/// Angles grow from +x towards +y. With `connect` the arc is joined to the current point with a
/// line, otherwise it starts a new sub-path. A zero sweep emits only the start point.
pub fn append_arc(
    stream: &mut PathStream,
    center: Point,
    radius: f64,
    start_angle: f64,
    sweep: f64,
    connect: bool,
) {
    let start = center + Vec2::from_angle(start_angle) * radius;
    if connect && !stream.is_empty() {
        stream.line_to(start);
    } else {
        stream.move_to(start);
    }
    if sweep == 0.0 || radius <= 0.0 {
        return;
    }

    let pieces = (sweep.abs() / QUARTER).ceil().max(1.0) as usize;
    let step = sweep / pieces as f64;
    let mut u = Vec2::from_angle(start_angle);
    for i in 1..=pieces {
        let v = Vec2::from_angle(start_angle + step * i as f64);
        arc_piece(stream, center, radius, u, v);
        u = v;
    }
}

/// Append a closed full circle as four quarter arcs.
pub fn append_circle(stream: &mut PathStream, center: Point, radius: f64) {
    append_arc(
        stream,
        center,
        radius,
        0.0,
        std::f64::consts::TAU,
        false,
    );
    stream.close();
}

/// Append a closed rounded rectangle. `radius` is clamped to half of the shorter side.
pub fn append_rounded_rect(stream: &mut PathStream, rect: Rect, radius: f64) {
    let rect = rect.abs();
    let r = radius.clamp(0.0, rect.width().min(rect.height()) / 2.0);
    let (x0, y0, x1, y1) = (rect.x0, rect.y0, rect.x1, rect.y1);

    if r <= 0.0 {
        stream.move_to(Point::new(x0, y0));
        stream.line_to(Point::new(x1, y0));
        stream.line_to(Point::new(x1, y1));
        stream.line_to(Point::new(x0, y1));
        stream.close();
        return;
    }

    let up = Vec2::new(0.0, -1.0);
    let right = Vec2::new(1.0, 0.0);
    let down = Vec2::new(0.0, 1.0);
    let left = Vec2::new(-1.0, 0.0);

    stream.move_to(Point::new(x0 + r, y0));
    stream.line_to(Point::new(x1 - r, y0));
    arc_piece(stream, Point::new(x1 - r, y0 + r), r, up, right);
    stream.line_to(Point::new(x1, y1 - r));
    arc_piece(stream, Point::new(x1 - r, y1 - r), r, right, down);
    stream.line_to(Point::new(x0 + r, y1));
    arc_piece(stream, Point::new(x0 + r, y1 - r), r, down, left);
    stream.line_to(Point::new(x0, y0 + r));
    arc_piece(stream, Point::new(x0 + r, y0 + r), r, left, up);
    stream.close();
}

/// Point-in-rounded-rectangle test (boundary counts as inside).
pub fn rounded_rect_contains(rect: Rect, radius: f64, p: Point) -> bool {
    let rect = rect.abs();
    if p.x < rect.x0 || p.x > rect.x1 || p.y < rect.y0 || p.y > rect.y1 {
        return false;
    }
    let r = radius.clamp(0.0, rect.width().min(rect.height()) / 2.0);
    let cx = p.x.clamp(rect.x0 + r, rect.x1 - r);
    let cy = p.y.clamp(rect.y0 + r, rect.y1 - r);
    let (dx, dy) = (p.x - cx, p.y - cy);
    dx * dx + dy * dy <= r * r
}

#[cfg(test)]
#[path = "../../tests/unit/path/arc.rs"]
mod tests;
