use super::*;

fn row(mask: &MaskKind, x: i32, y: i32, n: usize) -> Vec<u8> {
    let mut out = vec![255u8; n];
    mask.apply_row(x, y, &mut out);
    out
}

#[test]
fn rounded_rect_inclusion_and_exclusion_are_complements() {
    let area = Area::new(0, 0, 20, 20);
    let inc = MaskKind::RoundedRect {
        area,
        radius: 6.0,
        outer: false,
    };
    let exc = MaskKind::RoundedRect {
        area,
        radius: 6.0,
        outer: true,
    };
    let a = row(&inc, -2, 0, 24);
    let b = row(&exc, -2, 0, 24);
    for (i, (x, y)) in a.iter().zip(&b).enumerate() {
        assert_eq!(u16::from(*x) + u16::from(*y), 255, "pixel {i}");
    }
    // Corner pixel is outside, middle of the top edge is inside.
    assert_eq!(a[2], 0);
    assert_eq!(a[12], 255);
    assert_eq!(a[0], 0);
}

#[test]
fn inclusion_core_does_not_affect_inner_areas() {
    let m = MaskKind::RoundedRect {
        area: Area::new(0, 0, 100, 100),
        radius: 10.0,
        outer: false,
    };
    assert!(!m.affects(Area::new(20, 20, 80, 80)));
    assert!(m.affects(Area::new(0, 0, 5, 5)));
    assert!(m.affects(Area::new(200, 200, 210, 210)));
}

#[test]
fn fade_interpolates_between_stops() {
    let m = MaskKind::Fade {
        area: Area::new(0, 0, 10, 100),
        axis: FadeAxis::Vertical,
        start: 0,
        end: 100,
        opa_start: 255,
        opa_end: 0,
    };
    assert_eq!(row(&m, 0, 0, 1)[0], 255);
    assert_eq!(row(&m, 0, 50, 1)[0], 128);
    assert!(row(&m, 0, 99, 1)[0] < 5);
    // Outside the area the fade is inert.
    assert_eq!(row(&m, 20, 50, 1)[0], 255);
}

#[test]
fn line_mask_keeps_one_side() {
    let m = MaskKind::Line {
        p1: Point::new(0.0, 5.0),
        p2: Point::new(10.0, 5.0),
        side: LineSide::Right,
    };
    assert_eq!(row(&m, 0, 8, 1)[0], 255);
    assert_eq!(row(&m, 0, 2, 1)[0], 0);
}

#[test]
fn map_hides_pixels_outside_its_area() {
    let m = MaskKind::Map {
        area: Area::new(1, 0, 3, 1),
        coverage: Arc::from(vec![10u8, 200]),
    };
    assert_eq!(row(&m, 0, 0, 4), vec![0, 10, 200, 0]);
}

#[test]
fn stack_combines_masks_multiplicatively() {
    let mut list = MaskList::new();
    let mut out = [0u8; 4];
    assert!(!list.coverage_row(0, 0, &mut out));
    assert_eq!(out, [255; 4]);

    let a = list.push(MaskKind::Map {
        area: Area::new(0, 0, 4, 1),
        coverage: Arc::from(vec![255u8, 128, 128, 0]),
    });
    list.push(MaskKind::Map {
        area: Area::new(0, 0, 4, 1),
        coverage: Arc::from(vec![128u8, 128, 255, 255]),
    });
    assert!(list.coverage_row(0, 0, &mut out));
    assert_eq!(out, [128, 64, 128, 0]);

    assert!(list.remove(a).is_some());
    assert!(list.remove(a).is_none());
    assert_eq!(list.masks().len(), 1);
    list.clear();
    assert!(list.is_empty());
}
