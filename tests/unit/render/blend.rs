use super::*;

fn opaque_bg(w: u32, h: u32, px: [u8; 4]) -> PixelBuffer {
    let mut buf = PixelBuffer::new_rgba(w, h).unwrap();
    buf.fill(Rgba8Premul::from_array(px));
    buf
}

struct Lcg(u32);

impl Lcg {
    fn next_u8(&mut self) -> u8 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.0 >> 24) as u8
    }

    fn premul_px(&mut self) -> [u8; 4] {
        let a = self.next_u8();
        let mut c = || mul_div255(self.next_u8(), a);
        [c(), c(), c(), a]
    }
}

#[test]
fn uniform_opacity_matches_the_blend_formula() {
    let src = Rgba8Premul::from_array([200, 30, 90, 255]);
    let bg = [10, 240, 128, 255];
    for o in 0..=255u8 {
        let mut dst = opaque_bg(1, 1, bg);
        blend_fill(&mut dst, Area::new(0, 0, 1, 1), src, o, None).unwrap();
        let out = dst.pixel(0, 0).unwrap().to_array();
        for c in 0..3 {
            let s = f64::from(src.to_array()[c]);
            let b = f64::from(bg[c]);
            let o = f64::from(o);
            let want = ((s * o + b * (255.0 - o)) / 255.0).round();
            assert!(
                (f64::from(out[c]) - want).abs() <= 1.0,
                "o={o} c={c}: {} vs {want}",
                out[c]
            );
        }
        assert_eq!(out[3], 255);
    }
}

#[test]
fn full_opacity_copies_opaque_color() {
    let mut dst = opaque_bg(3, 2, [1, 2, 3, 255]);
    let red = Rgba8Premul::from_array([255, 0, 0, 255]);
    blend_fill(&mut dst, Area::new(1, 0, 3, 2), red, OPA_COVER, None).unwrap();
    assert_eq!(dst.pixel(0, 0).unwrap().to_array(), [1, 2, 3, 255]);
    assert_eq!(dst.pixel(1, 1).unwrap(), red);
    assert_eq!(dst.pixel(2, 0).unwrap(), red);
}

#[test]
fn mask_scales_coverage_per_pixel() {
    let mut dst = opaque_bg(3, 1, [0, 0, 0, 255]);
    let white = Rgba8Premul::from_array([255, 255, 255, 255]);
    blend_fill(&mut dst, Area::new(0, 0, 3, 1), white, OPA_COVER, Some(&[0, 128, 255])).unwrap();
    assert_eq!(dst.pixel(0, 0).unwrap().to_array(), [0, 0, 0, 255]);
    assert_eq!(dst.pixel(1, 0).unwrap().to_array(), [128, 128, 128, 255]);
    assert_eq!(dst.pixel(2, 0).unwrap().to_array(), [255, 255, 255, 255]);
}

#[test]
fn clipped_area_keeps_mask_alignment() {
    let mut dst = opaque_bg(2, 1, [0, 0, 0, 255]);
    let white = Rgba8Premul::from_array([255, 255, 255, 255]);
    // Area starts one pixel left of the buffer; mask byte 0 falls outside.
    blend_fill(&mut dst, Area::new(-1, 0, 2, 1), white, OPA_COVER, Some(&[255, 0, 255])).unwrap();
    assert_eq!(dst.pixel(0, 0).unwrap().to_array(), [0, 0, 0, 255]);
    assert_eq!(dst.pixel(1, 0).unwrap().to_array(), [255, 255, 255, 255]);
}

#[test]
fn short_mask_is_rejected() {
    let mut dst = opaque_bg(2, 2, [0, 0, 0, 255]);
    let err = blend_fill(
        &mut dst,
        Area::new(0, 0, 2, 2),
        Rgba8Premul::transparent(),
        OPA_COVER,
        Some(&[0; 3]),
    )
    .unwrap_err();
    assert!(matches!(err, VgError::Validation(_)));
}

#[test]
fn image_blend_respects_source_origin_and_bounds() {
    let mut src = PixelBuffer::new_rgba(2, 2).unwrap();
    src.set_pixel(1, 1, Rgba8Premul::from_array([0, 255, 0, 255]));
    src.set_pixel(0, 1, Rgba8Premul::from_array([0, 0, 128, 128]));
    let mut dst = opaque_bg(4, 4, [255, 0, 0, 255]);

    blend_image(&mut dst, Area::new(0, 0, 4, 4), &src, (0, 1), OPA_COVER, None).unwrap();
    assert_eq!(dst.pixel(1, 0).unwrap().to_array(), [0, 255, 0, 255]);
    assert_eq!(dst.pixel(0, 0).unwrap().to_array(), [127, 0, 128, 255]);
    // Rows past the source stay untouched.
    assert_eq!(dst.pixel(0, 1).unwrap().to_array(), [255, 0, 0, 255]);
    assert_eq!(dst.pixel(3, 0).unwrap().to_array(), [255, 0, 0, 255]);
}

#[test]
fn image_blend_rejects_indexed_sources() {
    let src = PixelBuffer::new(crate::buffer::descriptor::BufferDesc::new(
        8,
        1,
        PixelFormat::Index1,
    ))
    .unwrap();
    let mut dst = opaque_bg(1, 1, [0, 0, 0, 255]);
    assert!(blend_image(&mut dst, Area::new(0, 0, 1, 1), &src, (0, 0), OPA_COVER, None).is_err());
}

#[test]
fn vectorized_kernel_is_bit_identical_to_scalar() {
    let mut rng = Lcg(7);
    for width in [1u32, 3, 4, 5, 13, 64] {
        let mut base = PixelBuffer::new_rgba(width, 3).unwrap();
        let mut src = PixelBuffer::new_rgba(width, 3).unwrap();
        for y in 0..3 {
            for x in 0..width {
                base.set_pixel(x, y, Rgba8Premul::from_array(rng.premul_px()));
                src.set_pixel(x, y, Rgba8Premul::from_array(rng.premul_px()));
            }
        }
        let mask: Vec<u8> = (0..width * 3).map(|_| rng.next_u8()).collect();
        let area = Area::new(0, 0, width as i32, 3);
        let color = Rgba8Premul::from_array(rng.premul_px());

        for opacity in [1u8, 77, 254, 255] {
            for m in [None, Some(mask.as_slice())] {
                let scalar = Blender::new(BlendMode::Normal, BlendKernel::Scalar);
                let lanes = Blender::new(BlendMode::Normal, BlendKernel::Vectorized);

                let mut a = base.clone();
                let mut b = base.clone();
                scalar.fill(&mut a, area, color, opacity, m).unwrap();
                lanes.fill(&mut b, area, color, opacity, m).unwrap();
                assert_eq!(a, b, "fill width={width} opacity={opacity}");

                let mut a = base.clone();
                let mut b = base.clone();
                scalar.image(&mut a, area, &src, (0, 0), opacity, m).unwrap();
                lanes.image(&mut b, area, &src, (0, 0), opacity, m).unwrap();
                assert_eq!(a, b, "image width={width} opacity={opacity}");
            }
        }
    }
}

#[test]
fn additive_and_subtractive_saturate() {
    let s = [200, 100, 0, 255];
    assert_eq!(blend_px(BlendMode::Additive, [100, 200, 50, 255], s), [255, 255, 50, 255]);
    assert_eq!(blend_px(BlendMode::Subtractive, [100, 200, 50, 255], s), [0, 100, 50, 255]);
}

#[test]
fn multiply_by_white_is_identity() {
    let d = [40, 80, 120, 255];
    assert_eq!(blend_px(BlendMode::Multiply, d, [255, 255, 255, 255]), d);
    assert_eq!(blend_px(BlendMode::Multiply, d, [0, 0, 0, 255]), [0, 0, 0, 255]);
}

#[test]
fn transparent_source_leaves_destination() {
    let d = [9, 8, 7, 255];
    for mode in [BlendMode::Normal, BlendMode::Additive, BlendMode::Multiply] {
        assert_eq!(blend_px(mode, d, [0, 0, 0, 0]), d);
    }
}
