use kurbo::Rect;

use super::*;
use crate::foundation::core::{Rgba8, Rgba8Premul};

fn black(w: u32, h: u32) -> PixelBuffer {
    let mut b = PixelBuffer::new_rgba(w, h).unwrap();
    b.fill(Rgba8Premul::from_array([0, 0, 0, 255]));
    b
}

fn close(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 2)
}

fn solid_op<'a>(path: &'a BezPath, paint: &'a DevicePaint, blend: BlendMode) -> DeviceOp<'a> {
    DeviceOp {
        path,
        rule: FillRule::NonZero,
        clip: None,
        clip_area: Area::new(0, 0, 1000, 1000),
        paint,
        opacity: OPA_COVER,
        blend,
    }
}

#[test]
fn fills_are_deferred_until_finish() {
    let mut dst = black(16, 16);
    let path = Rect::new(4.0, 4.0, 12.0, 12.0).to_path(0.1);
    let paint = DevicePaint::Solid(Rgba8::rgb(255, 0, 0));
    let mut dev = VelloDevice::new();

    dev.submit(&mut dst, &solid_op(&path, &paint, BlendMode::Normal))
        .unwrap();
    assert_eq!(dev.pending(), 1);
    assert_eq!(dst.pixel(8, 8).unwrap().to_array(), [0, 0, 0, 255]);

    dev.finish(&mut dst).unwrap();
    assert_eq!(dev.pending(), 0);
    assert!(close(dst.pixel(8, 8).unwrap().to_array(), [255, 0, 0, 255]));
    assert!(close(dst.pixel(1, 1).unwrap().to_array(), [0, 0, 0, 255]));
}

#[test]
fn rejected_fill_leaves_everything_untouched() {
    let mut dst = black(8, 8);
    let before = dst.clone();
    let path = Rect::new(0.0, 0.0, 8.0, 8.0).to_path(0.1);
    let paint = DevicePaint::Solid(Rgba8::WHITE);
    let mut dev = VelloDevice::new();

    let err = dev
        .submit(&mut dst, &solid_op(&path, &paint, BlendMode::Subtractive))
        .unwrap_err();
    assert!(matches!(err, DeviceError::Unsupported(_)));
    assert_eq!(dev.pending(), 0);
    dev.finish(&mut dst).unwrap();
    assert_eq!(dst, before);
}

#[test]
fn non_finite_geometry_is_an_invalid_argument() {
    let mut dst = black(4, 4);
    let mut path = BezPath::new();
    path.move_to((0.0, 0.0));
    path.line_to((f64::NAN, 1.0));
    path.line_to((1.0, 1.0));
    let paint = DevicePaint::Solid(Rgba8::WHITE);
    let err = VelloDevice::new()
        .submit(&mut dst, &solid_op(&path, &paint, BlendMode::Normal))
        .unwrap_err();
    assert!(matches!(err, DeviceError::InvalidArgument(_)));
}

#[test]
fn indexed_destinations_are_unsupported() {
    let mut dst = PixelBuffer::new(crate::buffer::descriptor::BufferDesc::new(
        8,
        8,
        PixelFormat::Index8,
    ))
    .unwrap();
    let path = Rect::new(0.0, 0.0, 8.0, 8.0).to_path(0.1);
    let paint = DevicePaint::Solid(Rgba8::WHITE);
    let err = VelloDevice::new()
        .submit(&mut dst, &solid_op(&path, &paint, BlendMode::Normal))
        .unwrap_err();
    assert!(matches!(err, DeviceError::Unsupported(_)));
}

#[test]
fn finish_without_work_is_a_no_op() {
    let mut dst = black(2, 2);
    let before = dst.clone();
    VelloDevice::new().finish(&mut dst).unwrap();
    assert_eq!(dst, before);
}

#[test]
fn successive_fills_keep_submission_order() {
    let mut dst = black(8, 8);
    let full = Rect::new(0.0, 0.0, 8.0, 8.0).to_path(0.1);
    let red = DevicePaint::Solid(Rgba8::rgb(255, 0, 0));
    let blue = DevicePaint::Solid(Rgba8::rgb(0, 0, 255));
    let mut dev = VelloDevice::new();
    dev.submit(&mut dst, &solid_op(&full, &red, BlendMode::Normal))
        .unwrap();
    dev.submit(&mut dst, &solid_op(&full, &blue, BlendMode::Normal))
        .unwrap();
    dev.finish(&mut dst).unwrap();
    assert!(close(dst.pixel(3, 3).unwrap().to_array(), [0, 0, 255, 255]));
}

#[test]
fn finish_only_writes_back_the_recorded_area() {
    let mut dst = black(16, 16);
    let path = Rect::new(2.0, 2.0, 6.0, 6.0).to_path(0.1);
    let paint = DevicePaint::Solid(Rgba8::rgb(255, 0, 0));
    let mut dev = VelloDevice::new();
    dev.submit(&mut dst, &solid_op(&path, &paint, BlendMode::Normal))
        .unwrap();

    // Written by someone else while the fill is queued.
    dst.set_pixel(12, 12, Rgba8Premul::from_array([0, 255, 0, 255]));
    dev.finish(&mut dst).unwrap();

    assert_eq!(dst.pixel(12, 12).unwrap().to_array(), [0, 255, 0, 255]);
    assert!(close(dst.pixel(4, 4).unwrap().to_array(), [255, 0, 0, 255]));
}
