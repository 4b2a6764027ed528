use super::*;
use crate::path::stream::PathCmd;

fn max_radial_error(s: &PathStream, center: Point, radius: f64) -> f64 {
    use kurbo::ParamCurve;
    let mut worst: f64 = 0.0;
    for seg in s.to_bez_path().segments() {
        for i in 0..=16 {
            let p = seg.eval(f64::from(i) / 16.0);
            worst = worst.max(((p - center).hypot() - radius).abs());
        }
    }
    worst
}

#[test]
fn kappa_matches_tangent_formula() {
    let k = 4.0 / 3.0 * (std::f64::consts::FRAC_PI_2 / 4.0).tan();
    assert!((k - KAPPA).abs() < 1e-12);
}

#[test]
fn circle_is_four_cubics_close_to_radius() {
    let mut s = PathStream::new();
    append_circle(&mut s, Point::new(50.0, 50.0), 40.0);
    let cubics = s
        .cmds()
        .iter()
        .filter(|c| matches!(c, PathCmd::CubicTo(..)))
        .count();
    assert_eq!(cubics, 4);
    assert!(max_radial_error(&s, Point::new(50.0, 50.0), 40.0) < 0.02);
    let b = s.bounds().unwrap();
    assert!((b.x0 - 10.0).abs() < 1e-6 && (b.y1 - 90.0).abs() < 1e-6);
}

#[test]
fn arc_direction_follows_sweep_sign() {
    let c = Point::new(0.0, 0.0);
    let mut pos = PathStream::new();
    append_arc(&mut pos, c, 10.0, 0.0, std::f64::consts::FRAC_PI_2, false);
    let mut neg = PathStream::new();
    append_arc(&mut neg, c, 10.0, 0.0, -std::f64::consts::FRAC_PI_2, false);

    let end = |s: &PathStream| s.current_point().unwrap();
    assert!((end(&pos) - Point::new(0.0, 10.0)).hypot() < 1e-9);
    assert!((end(&neg) - Point::new(0.0, -10.0)).hypot() < 1e-9);
    assert!(pos.bounds().unwrap().y1 > 9.99);
    assert!(neg.bounds().unwrap().y0 < -9.99);
}

#[test]
fn odd_sweeps_are_split_into_quarter_pieces() {
    let mut s = PathStream::new();
    append_arc(&mut s, Point::ZERO, 25.0, 0.3, 4.0, false);
    let cubics = s
        .cmds()
        .iter()
        .filter(|c| matches!(c, PathCmd::CubicTo(..)))
        .count();
    assert_eq!(cubics, 3);
    assert!(max_radial_error(&s, Point::ZERO, 25.0) < 0.05);
}

#[test]
fn tessellation_is_deterministic() {
    let build = || {
        let mut s = PathStream::new();
        append_arc(&mut s, Point::new(3.0, 4.0), 17.5, 1.1, -2.7, false);
        s
    };
    assert_eq!(build(), build());
}

#[test]
fn rounded_rect_radius_is_clamped() {
    let mut s = PathStream::new();
    append_rounded_rect(&mut s, Rect::new(0.0, 0.0, 20.0, 10.0), 100.0);
    assert!(max_radial_error_corner(&s) < 0.02);
    assert_eq!(s.bounds(), Some(Rect::new(0.0, 0.0, 20.0, 10.0)));
}

// Left corner arcs of a stadium: every curve point lies on the r=5 circle around (5,5) or (15,5).
fn max_radial_error_corner(s: &PathStream) -> f64 {
    use kurbo::{ParamCurve, PathSeg};
    let mut worst: f64 = 0.0;
    for seg in s.to_bez_path().segments() {
        if let PathSeg::Cubic(_) = seg {
            for i in 0..=16 {
                let p = seg.eval(f64::from(i) / 16.0);
                let c = if p.x < 10.0 {
                    Point::new(5.0, 5.0)
                } else {
                    Point::new(15.0, 5.0)
                };
                worst = worst.max(((p - c).hypot() - 5.0).abs());
            }
        }
    }
    worst
}

#[test]
fn rounded_rect_contains_excludes_corners() {
    let r = Rect::new(0.0, 0.0, 100.0, 100.0);
    assert!(rounded_rect_contains(r, 20.0, Point::new(50.0, 50.0)));
    assert!(rounded_rect_contains(r, 20.0, Point::new(50.0, 0.5)));
    assert!(!rounded_rect_contains(r, 20.0, Point::new(1.0, 1.0)));
    assert!(!rounded_rect_contains(r, 20.0, Point::new(101.0, 50.0)));
}
