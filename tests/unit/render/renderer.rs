use std::sync::Arc;

use kurbo::Vec2;

use super::*;
use crate::assets::prepare::ImageId;
use crate::assets::raster::RasterImage;
use crate::assets::vector::VectorObject;
use crate::foundation::core::{Rgba8, Rgba8Premul};
use crate::foundation::error::DeviceError;
use crate::mask::stack::MaskList;
use crate::paint::fill::PatternTransform;
use crate::path::arc::{append_rounded_rect, rounded_rect_contains};
use crate::render::device::DeviceOp;

const BLACK: [u8; 4] = [0, 0, 0, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

struct Refusing;

impl Device for Refusing {
    fn name(&self) -> &'static str {
        "refusing"
    }

    fn submit(&mut self, _target: &mut PixelBuffer, _op: &DeviceOp<'_>) -> Result<(), DeviceError> {
        Err(DeviceError::unsupported("nothing"))
    }

    fn finish(&mut self, _target: &mut PixelBuffer) -> Result<(), DeviceError> {
        Ok(())
    }
}

fn black(w: u32, h: u32) -> PixelBuffer {
    let mut b = PixelBuffer::new_rgba(w, h).unwrap();
    b.fill(Rgba8Premul::from_array(BLACK));
    b
}

fn px(b: &PixelBuffer, x: u32, y: u32) -> [u8; 4] {
    b.pixel(x, y).unwrap().to_array()
}

fn software() -> Renderer<SoftwareDevice> {
    Renderer::software(EngineConfig::default()).unwrap()
}

#[test]
fn rounded_rect_is_red_inside_and_black_outside() {
    let mut dst = black(200, 200);
    let mut r = software();
    let rect = Rect::new(50.0, 50.0, 150.0, 150.0);
    let status = {
        let mut t = DrawTarget::new(&mut dst);
        r.draw_rect(&mut t, rect, 20.0, &FillDesc::solid(Rgba8::rgb(255, 0, 0)))
    };
    assert_eq!(status, DrawStatus::Drawn);

    for y in (0..200).step_by(3) {
        for x in (0..200).step_by(3) {
            let c = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let inside = [-1.0, 0.0, 1.0].iter().all(|&d: &f64| {
                rounded_rect_contains(rect, 20.0, c + Vec2::new(d, d))
                    && rounded_rect_contains(rect, 20.0, c + Vec2::new(d, -d))
            });
            let outside = [-1.0, 0.0, 1.0].iter().all(|&d: &f64| {
                !rounded_rect_contains(rect, 20.0, c + Vec2::new(d, d))
                    && !rounded_rect_contains(rect, 20.0, c + Vec2::new(d, -d))
            });
            if inside {
                assert_eq!(px(&dst, x, y), [255, 0, 0, 255], "({x},{y})");
            } else if outside {
                assert_eq!(px(&dst, x, y), BLACK, "({x},{y})");
            }
        }
    }
    assert_eq!(r.scratch_stats().outstanding, 0);
}

#[test]
fn nothing_to_draw_is_skipped() {
    let mut dst = black(16, 16);
    let before = dst.clone();
    let mut r = software();
    let mut t = DrawTarget::new(&mut dst);
    let white = FillDesc::solid(Rgba8::WHITE);

    let empty = Rect::new(4.0, 4.0, 4.0, 10.0);
    assert_eq!(r.draw_rect(&mut t, empty, 0.0, &white), DrawStatus::Skipped);
    let invisible = white.clone().with_opacity(0);
    let full = Rect::new(0.0, 0.0, 16.0, 16.0);
    assert_eq!(r.draw_rect(&mut t, full, 0.0, &invisible), DrawStatus::Skipped);
    let p = Point::new(3.0, 3.0);
    assert_eq!(
        r.draw_line(&mut t, p, p, &LineStroke::new(2.0), &white),
        DrawStatus::Skipped
    );
    let far = Rect::new(40.0, 40.0, 50.0, 50.0);
    assert_eq!(r.draw_rect(&mut t, far, 0.0, &white), DrawStatus::Skipped);
    let two = [Point::new(0.0, 0.0), Point::new(5.0, 5.0)];
    assert_eq!(r.draw_polygon(&mut t, &two, &white), DrawStatus::Skipped);

    drop(t);
    assert_eq!(dst, before);
}

#[test]
fn horizontal_line_fills_its_rows() {
    let mut dst = black(8, 4);
    let mut r = software();
    let status = r.draw_line(
        &mut DrawTarget::new(&mut dst),
        Point::new(0.0, 2.0),
        Point::new(8.0, 2.0),
        &LineStroke::new(2.0),
        &FillDesc::solid(Rgba8::WHITE),
    );
    assert_eq!(status, DrawStatus::Drawn);
    assert_eq!(px(&dst, 3, 1), WHITE);
    assert_eq!(px(&dst, 3, 2), WHITE);
    assert_eq!(px(&dst, 3, 0), BLACK);
    assert_eq!(px(&dst, 3, 3), BLACK);
}

#[test]
fn border_leaves_the_middle_untouched() {
    let mut dst = black(20, 20);
    let mut r = software();
    let status = r.draw_border(
        &mut DrawTarget::new(&mut dst),
        Rect::new(0.0, 0.0, 20.0, 20.0),
        0.0,
        3.0,
        &FillDesc::solid(Rgba8::WHITE),
    );
    assert_eq!(status, DrawStatus::Drawn);
    assert_eq!(px(&dst, 1, 10), WHITE);
    assert_eq!(px(&dst, 10, 18), WHITE);
    assert_eq!(px(&dst, 10, 10), BLACK);
}

#[test]
fn full_arc_is_a_ring() {
    let mut dst = black(40, 40);
    let mut r = software();
    let stroke = ArcStroke {
        width: 4.0,
        start_angle: 0.0,
        sweep: std::f64::consts::TAU,
        rounded: false,
    };
    let status = r.draw_arc(
        &mut DrawTarget::new(&mut dst),
        Point::new(20.0, 20.0),
        16.0,
        &stroke,
        &FillDesc::solid(Rgba8::WHITE),
    );
    assert_eq!(status, DrawStatus::Drawn);
    assert_eq!(px(&dst, 20, 20), BLACK);
    assert_eq!(px(&dst, 5, 20), WHITE);
    assert_eq!(px(&dst, 1, 1), BLACK);
}

#[test]
fn inclusion_mask_clips_through_the_path() {
    let mut dst = black(8, 8);
    let mut masks = MaskList::new();
    masks.push(MaskKind::RoundedRect {
        area: Area::new(0, 0, 4, 8),
        radius: 0.0,
        outer: false,
    });
    let mut r = software();
    let status = r.draw_rect(
        &mut DrawTarget::new(&mut dst).with_masks(&masks),
        Rect::new(0.0, 0.0, 8.0, 8.0),
        0.0,
        &FillDesc::solid(Rgba8::WHITE),
    );
    assert_eq!(status, DrawStatus::Drawn);
    assert_eq!(px(&dst, 3, 4), WHITE);
    assert_eq!(px(&dst, 4, 4), BLACK);
}

#[test]
fn coverage_map_mask_goes_through_pixel_masking() {
    let mut dst = black(4, 1);
    let mut masks = MaskList::new();
    masks.push(MaskKind::Map {
        area: Area::new(0, 0, 4, 1),
        coverage: Arc::from(vec![255u8, 128, 0, 255]),
    });
    let mut r = software();
    let status = r.draw_rect(
        &mut DrawTarget::new(&mut dst).with_masks(&masks),
        Rect::new(0.0, 0.0, 4.0, 1.0),
        0.0,
        &FillDesc::solid(Rgba8::WHITE),
    );
    assert_eq!(status, DrawStatus::Drawn);
    assert_eq!(px(&dst, 0, 0), WHITE);
    assert_eq!(px(&dst, 1, 0), [128, 128, 128, 255]);
    assert_eq!(px(&dst, 2, 0), BLACK);
}

#[test]
fn clip_rectangle_limits_the_draw() {
    let mut dst = black(8, 8);
    let mut r = software();
    r.draw_rect(
        &mut DrawTarget::new(&mut dst).with_clip(Area::new(2, 2, 4, 4)),
        Rect::new(0.0, 0.0, 8.0, 8.0),
        0.0,
        &FillDesc::solid(Rgba8::WHITE),
    );
    assert_eq!(px(&dst, 2, 2), WHITE);
    assert_eq!(px(&dst, 3, 3), WHITE);
    assert_eq!(px(&dst, 4, 4), BLACK);
    assert_eq!(px(&dst, 1, 1), BLACK);
}

#[test]
fn raster_image_lands_at_its_offset() {
    let img = RasterImage::from_rgba(2, 2, [0u8, 255, 0, 255].repeat(4)).unwrap();
    let pattern = ImagePattern {
        source: Arc::new(ImageSource::raster(ImageId(1), &img).unwrap()),
        recolor: None,
        transform: PatternTransform::translate(Vec2::new(2.0, 2.0)),
    };
    let mut dst = black(8, 8);
    let mut r = software();
    let status = r.draw_image(&mut DrawTarget::new(&mut dst), &pattern, 255);
    assert_eq!(status, DrawStatus::Drawn);
    assert_eq!(px(&dst, 2, 2), [0, 255, 0, 255]);
    assert_eq!(px(&dst, 3, 3), [0, 255, 0, 255]);
    assert_eq!(px(&dst, 4, 4), BLACK);
    assert_eq!(px(&dst, 1, 2), BLACK);
}

#[test]
fn vector_image_replays_under_the_composed_transform() {
    let mut path = PathStream::new();
    append_rounded_rect(&mut path, Rect::new(0.0, 0.0, 2.0, 2.0), 0.0);
    path.end();
    let vector = VectorImage {
        transform: Affine::scale(2.0),
        objects: vec![VectorObject {
            bbox: Rect::new(0.0, 0.0, 2.0, 2.0),
            transform: Affine::translate((1.0, 0.0)),
            fill_rule: FillRule::NonZero,
            paint: VectorPaint::Solid(Rgba8::rgb(0, 0, 255)),
            path,
        }],
    };
    let pattern = ImagePattern {
        source: Arc::new(ImageSource::vector(ImageId(7), &vector).unwrap()),
        recolor: None,
        transform: PatternTransform::translate(Vec2::new(1.0, 1.0)),
    };
    let mut dst = black(12, 12);
    let mut r = software();
    let status = r.draw_image(&mut DrawTarget::new(&mut dst), &pattern, 255);
    assert_eq!(status, DrawStatus::Drawn);
    // parent(1,1) * scale 2 * translate(1,0): object covers x 3..7, y 1..5
    assert_eq!(px(&dst, 3, 1), [0, 0, 255, 255]);
    assert_eq!(px(&dst, 6, 4), [0, 0, 255, 255]);
    assert_eq!(px(&dst, 2, 2), BLACK);
    assert_eq!(px(&dst, 7, 2), BLACK);
}

#[test]
fn refused_draws_report_unsupported_and_leave_pixels() {
    let mut dst = black(8, 8);
    let before = dst.clone();
    let mut r = Renderer::new(Refusing, EngineConfig::default()).unwrap();
    let status = r.draw_rect(
        &mut DrawTarget::new(&mut dst),
        Rect::new(0.0, 0.0, 8.0, 8.0),
        2.0,
        &FillDesc::solid(Rgba8::WHITE),
    );
    assert_eq!(status, DrawStatus::Unsupported);
    assert_eq!(dst, before);
    assert_eq!(r.scratch_stats().outstanding, 0);
}

#[test]
fn accelerated_renderer_matches_software_within_tolerance() {
    let fill = FillDesc::solid(Rgba8::new(30, 160, 220, 200));
    let rect = Rect::new(4.0, 4.0, 28.0, 28.0);

    let mut soft_dst = black(32, 32);
    software().draw_rect(&mut DrawTarget::new(&mut soft_dst), rect, 6.0, &fill);

    let mut accel_dst = black(32, 32);
    let mut accel = Renderer::accelerated(EngineConfig::default()).unwrap();
    let status = accel.draw_rect(&mut DrawTarget::new(&mut accel_dst), rect, 6.0, &fill);
    assert_eq!(status, DrawStatus::Drawn);
    accel.finish(&mut accel_dst).unwrap();

    for (x, y) in [(16, 16), (5, 16), (16, 27), (1, 1), (30, 30)] {
        let a = px(&accel_dst, x, y);
        let s = px(&soft_dst, x, y);
        assert!(
            a.iter().zip(s).all(|(p, q)| p.abs_diff(q) <= 3),
            "({x},{y}) {a:?} vs {s:?}"
        );
    }
}

#[test]
fn unsupported_draw_lands_queued_fills_before_returning() {
    let mut dst = black(16, 8);
    let mut r = Renderer::accelerated(EngineConfig::default()).unwrap();
    let broken = ImagePattern {
        source: Arc::new(ImageSource::new(ImageId(11), vec![1u8, 0, 0, 0])),
        recolor: None,
        transform: PatternTransform::translate(Vec2::new(0.0, 0.0)),
    };
    let (first, second) = {
        let mut t = DrawTarget::new(&mut dst);
        let first = r.draw_rect(
            &mut t,
            Rect::new(0.0, 0.0, 8.0, 8.0),
            0.0,
            &FillDesc::solid(Rgba8::rgb(255, 0, 0)),
        );
        (first, r.draw_image(&mut t, &broken, 255))
    };
    assert_eq!(first, DrawStatus::Drawn);
    assert_eq!(second, DrawStatus::Unsupported);
    assert_eq!(r.dispatcher().device().accelerator().pending(), 0);
    let reddish = |p: [u8; 4]| p.iter().zip([255u8, 0, 0, 255]).all(|(a, b)| a.abs_diff(b) <= 2);
    assert!(reddish(px(&dst, 4, 4)), "{:?}", px(&dst, 4, 4));

    // The caller redoes the unsupported draw on its own.
    dst.set_pixel(12, 4, Rgba8Premul::from_array([0, 255, 0, 255]));
    r.finish(&mut dst).unwrap();
    assert_eq!(px(&dst, 12, 4), [0, 255, 0, 255]);
    assert!(reddish(px(&dst, 4, 4)));
}

/// Software device that fails its `fail_at`-th submit (1-based).
struct FailingAt {
    inner: SoftwareDevice,
    submits: usize,
    fail_at: usize,
}

impl Device for FailingAt {
    fn name(&self) -> &'static str {
        "failing-at"
    }

    fn submit(&mut self, target: &mut PixelBuffer, op: &DeviceOp<'_>) -> Result<(), DeviceError> {
        self.submits += 1;
        if self.submits == self.fail_at {
            return Err(DeviceError::OutOfDeviceMemory);
        }
        self.inner.submit(target, op)
    }

    fn finish(&mut self, target: &mut PixelBuffer) -> Result<(), DeviceError> {
        self.inner.finish(target)
    }
}

fn two_squares() -> VectorImage {
    let square = |x0: f64, color: Rgba8| {
        let mut path = PathStream::new();
        append_rounded_rect(&mut path, Rect::new(x0, 0.0, x0 + 2.0, 2.0), 0.0);
        path.end();
        VectorObject {
            bbox: Rect::new(x0, 0.0, x0 + 2.0, 2.0),
            transform: Affine::IDENTITY,
            fill_rule: FillRule::NonZero,
            paint: VectorPaint::Solid(color),
            path,
        }
    };
    VectorImage {
        transform: Affine::IDENTITY,
        objects: vec![
            square(0.0, Rgba8::rgb(255, 0, 0)),
            square(4.0, Rgba8::rgb(0, 255, 0)),
        ],
    }
}

#[test]
fn failed_vector_replay_leaves_the_target_untouched() {
    let cfg = EngineConfig::default();
    let device = FailingAt {
        inner: SoftwareDevice::new(&cfg),
        submits: 0,
        fail_at: 2,
    };
    let mut r = Renderer::new(device, cfg).unwrap();
    let mut dst = black(8, 4);
    let before = dst.clone();
    let status = r.draw_vector_image(
        &mut DrawTarget::new(&mut dst),
        &two_squares(),
        Affine::IDENTITY,
        255,
    );
    assert_eq!(status, DrawStatus::Unsupported);
    assert_eq!(r.dispatcher().device().submits, 2);
    assert_eq!(dst, before);
}

#[test]
fn vector_replay_commits_every_object() {
    let cfg = EngineConfig::default();
    let device = FailingAt {
        inner: SoftwareDevice::new(&cfg),
        submits: 0,
        fail_at: usize::MAX,
    };
    let mut r = Renderer::new(device, cfg).unwrap();
    let mut dst = black(8, 4);
    let status = r.draw_vector_image(
        &mut DrawTarget::new(&mut dst),
        &two_squares(),
        Affine::translate((1.0, 1.0)),
        255,
    );
    assert_eq!(status, DrawStatus::Drawn);
    assert_eq!(px(&dst, 1, 1), [255, 0, 0, 255]);
    assert_eq!(px(&dst, 5, 2), [0, 255, 0, 255]);
    assert_eq!(px(&dst, 0, 0), BLACK);
}
