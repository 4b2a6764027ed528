use super::*;

#[test]
fn tight_and_aligned_strides() {
    let d = BufferDesc::new(10, 2, PixelFormat::Rgba8Premul);
    assert_eq!(d.stride, 40);
    let d = BufferDesc::aligned(10, 2, PixelFormat::Rgba8Premul, 16);
    assert_eq!(d.stride, 64);
    let d = BufferDesc::aligned(10, 2, PixelFormat::Index1, 16);
    assert_eq!(d.stride, 2);
    let d = BufferDesc::new(3, 1, PixelFormat::Index4);
    assert_eq!(d.stride, 2);
}

#[test]
fn validate_rejects_short_stride() {
    let mut d = BufferDesc::new(10, 2, PixelFormat::Rgb565);
    d.stride = 19;
    assert!(d.validate().is_err());
    d.stride = 20;
    d.validate().unwrap();
}

#[test]
fn source_validation_checks_alignment() {
    let tight = BufferDesc::new(10, 2, PixelFormat::Rgba8Premul);
    assert!(tight.validate_source(16).is_err());
    let aligned = BufferDesc::aligned(10, 2, PixelFormat::Rgba8Premul, 16);
    aligned.validate_source(16).unwrap();
    tight.validate_source(1).unwrap();
}

#[test]
fn pixels_round_trip_through_padded_rows() {
    let desc = BufferDesc::aligned(3, 2, PixelFormat::Rgba8Premul, 16);
    let mut buf = PixelBuffer::new(desc).unwrap();
    let px = Rgba8Premul::from_array([1, 2, 3, 4]);
    buf.set_pixel(2, 1, px);
    assert_eq!(buf.pixel(2, 1), Some(px));
    assert_eq!(buf.pixel(3, 1), None);
    assert_eq!(buf.row(1).len(), 12);
    assert_eq!(buf.to_packed_vec().len(), 24);
    assert_eq!(&buf.to_packed_vec()[20..24], &[1, 2, 3, 4]);
}

#[test]
fn from_parts_requires_enough_bytes() {
    let desc = BufferDesc::new(2, 2, PixelFormat::A8);
    assert!(PixelBuffer::from_parts(desc, vec![0; 3]).is_err());
    PixelBuffer::from_parts(desc, vec![0; 4]).unwrap();
}
