use super::*;
use crate::mask::stack::{FadeAxis, MaskList};
use crate::path::builder::{Primitive, build_path};
use crate::path::stream::FillRule;
use kurbo::{Point, Rect, Shape};

fn rect_path(r: Rect) -> PathStream {
    let mut s = PathStream::new();
    build_path(&Primitive::RoundedRect { rect: r, radius: 0.0 }, &mut s).unwrap();
    s
}

fn winding_inside(clip: &PathStream, p: Point, rule: FillRule) -> bool {
    let w = clip.to_bez_path().winding(p);
    match rule {
        FillRule::NonZero => w != 0,
        FillRule::EvenOdd => w % 2 != 0,
    }
}

#[test]
fn no_masks_means_no_clip() {
    let list = MaskList::new();
    let path = rect_path(Rect::new(0.0, 0.0, 10.0, 10.0));
    let out = apply_masks(&path, Area::new(0, 0, 10, 10), &list);
    assert_eq!(out, MaskOutcome::default());
    assert!(!out.needs_pixel_mask());
}

#[test]
fn inclusion_mask_becomes_its_boundary() {
    let mut list = MaskList::new();
    list.push(MaskKind::RoundedRect {
        area: Area::new(10, 10, 50, 50),
        radius: 8.0,
        outer: false,
    });
    let dest = Area::new(0, 0, 100, 100);
    let out = apply_masks(&rect_path(dest.to_rect()), dest, &list);
    assert!(out.had_mask);
    let clip = out.augmented.unwrap();
    clip.validate().unwrap();
    for rule in [FillRule::NonZero, FillRule::EvenOdd] {
        assert!(winding_inside(&clip, Point::new(30.0, 30.0), rule));
        assert!(!winding_inside(&clip, Point::new(11.0, 11.0), rule));
        assert!(!winding_inside(&clip, Point::new(70.0, 70.0), rule));
    }
}

#[test]
fn exclusion_mask_cuts_a_hole_under_both_rules() {
    let mut list = MaskList::new();
    list.push(MaskKind::RoundedRect {
        area: Area::new(10, 10, 50, 50),
        radius: 8.0,
        outer: true,
    });
    let dest = Area::new(0, 0, 100, 100);
    let out = apply_masks(&rect_path(dest.to_rect()), dest, &list);
    let clip = out.augmented.unwrap();
    for rule in [FillRule::NonZero, FillRule::EvenOdd] {
        assert!(!winding_inside(&clip, Point::new(30.0, 30.0), rule));
        assert!(winding_inside(&clip, Point::new(11.0, 11.0), rule));
        assert!(winding_inside(&clip, Point::new(70.0, 70.0), rule));
    }
}

#[test]
fn masks_outside_the_draw_are_ignored() {
    let mut list = MaskList::new();
    list.push(MaskKind::RoundedRect {
        area: Area::new(60, 60, 90, 90),
        radius: 4.0,
        outer: true,
    });
    let dest = Area::new(0, 0, 100, 100);
    let out = apply_masks(&rect_path(Rect::new(0.0, 0.0, 20.0, 20.0)), dest, &list);
    assert!(!out.had_mask);
}

#[test]
fn two_rounded_rect_masks_are_unsupported() {
    let mut list = MaskList::new();
    for outer in [false, true] {
        list.push(MaskKind::RoundedRect {
            area: Area::new(10, 10, 50, 50),
            radius: 8.0,
            outer,
        });
    }
    let dest = Area::new(0, 0, 100, 100);
    let out = apply_masks(&rect_path(dest.to_rect()), dest, &list);
    assert!(out.had_mask);
    assert!(out.augmented.is_none());
    assert!(out.needs_pixel_mask());
}

#[test]
fn other_kinds_require_pixel_masking() {
    let mut list = MaskList::new();
    list.push(MaskKind::Fade {
        area: Area::new(0, 0, 100, 100),
        axis: FadeAxis::Horizontal,
        start: 0,
        end: 100,
        opa_start: 0,
        opa_end: 255,
    });
    let dest = Area::new(0, 0, 100, 100);
    let out = apply_masks(&rect_path(dest.to_rect()), dest, &list);
    assert!(out.needs_pixel_mask());
}
