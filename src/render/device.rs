use std::sync::Arc;

use kurbo::{Affine, BezPath, Point};

use crate::buffer::descriptor::PixelBuffer;
use crate::foundation::core::{Area, Opacity, Rgba8};
use crate::foundation::error::{DeviceError, VgError, VgResult};
use crate::paint::fill::BlendMode;
use crate::paint::gradient::{GradientShape, RampLut};
use crate::path::stream::FillRule;

/// Paint of a [`DeviceOp`], with every source already resolved to pixels.
#[derive(Clone, Debug)]
pub enum DevicePaint {
    /// Straight-alpha solid color.
    Solid(Rgba8),
    /// Premultiplied RGBA8 image placed by `transform` (image space to destination space).
    ///
    /// Only the area the placed image covers is painted.
    Image {
        /// Source pixels.
        image: Arc<PixelBuffer>,
        /// Image to destination transform.
        transform: Affine,
    },
    /// Gradient sampled per destination pixel.
    Gradient {
        /// Ramp geometry in destination space.
        shape: GradientShape,
        /// Materialized ramp.
        lut: RampLut,
    },
}

/// One fill submitted to a [`Device`]. Geometry is in destination pixel coordinates.
#[derive(Clone, Copy, Debug)]
pub struct DeviceOp<'a> {
    /// Shape to fill.
    pub path: &'a BezPath,
    /// Fill rule of `path`.
    pub rule: FillRule,
    /// Auxiliary clip intersected with the shape; filled non-zero.
    pub clip: Option<&'a BezPath>,
    /// Pixels outside this area are never touched.
    pub clip_area: Area,
    /// Paint.
    pub paint: &'a DevicePaint,
    /// Global opacity.
    pub opacity: Opacity,
    /// Blend mode.
    pub blend: BlendMode,
}

/// A fill backend.
///
/// `submit` may queue work; the destination is only guaranteed to hold the result after
/// `finish`. A failing `submit` leaves the destination untouched.
pub trait Device {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fill `op` into `target`.
    fn submit(&mut self, target: &mut PixelBuffer, op: &DeviceOp<'_>) -> Result<(), DeviceError>;

    /// Complete every queued operation into `target`.
    fn finish(&mut self, target: &mut PixelBuffer) -> Result<(), DeviceError>;
}

impl<D: Device + ?Sized> Device for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn submit(&mut self, target: &mut PixelBuffer, op: &DeviceOp<'_>) -> Result<(), DeviceError> {
        (**self).submit(target, op)
    }

    fn finish(&mut self, target: &mut PixelBuffer) -> Result<(), DeviceError> {
        (**self).finish(target)
    }
}

/// Map an engine error raised inside a device onto the recognized device classes.
pub(crate) fn to_device_error(err: VgError) -> DeviceError {
    match err {
        VgError::OutOfMemory(_) => DeviceError::OutOfDeviceMemory,
        VgError::AcceleratorUnsupported(e) => e,
        other => DeviceError::invalid_argument(other.to_string()),
    }
}

/// Gradient pixels over `area`, sampled at pixel centers.
pub(crate) fn gradient_image(
    shape: &GradientShape,
    lut: &RampLut,
    area: Area,
) -> VgResult<PixelBuffer> {
    let mut img = PixelBuffer::new_rgba(area.width(), area.height())?;
    for (row, y) in (area.y0..area.y1).enumerate() {
        let py = f64::from(y) + 0.5;
        for (d, x) in img.row_mut(row as u32).chunks_exact_mut(4).zip(area.x0..area.x1) {
            let t = shape.position(Point::new(f64::from(x) + 0.5, py));
            d.copy_from_slice(&lut.sample(t).to_array());
        }
    }
    Ok(img)
}

/// Image pixels resampled (nearest) into `area` through `transform`.
///
/// Destination pixels whose center maps outside the image stay transparent.
pub(crate) fn resample_image(
    image: &PixelBuffer,
    transform: Affine,
    area: Area,
) -> VgResult<PixelBuffer> {
    if transform.determinant().abs() <= f64::EPSILON {
        return Err(VgError::validation("image transform is not invertible"));
    }
    let inv = transform.inverse();
    let (w, h) = (f64::from(image.width()), f64::from(image.height()));
    let mut out = PixelBuffer::new_rgba(area.width(), area.height())?;
    for (row, y) in (area.y0..area.y1).enumerate() {
        for (d, x) in out.row_mut(row as u32).chunks_exact_mut(4).zip(area.x0..area.x1) {
            let p = inv * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if p.x < 0.0 || p.y < 0.0 || p.x >= w || p.y >= h {
                continue;
            }
            if let Some(px) = image.pixel(p.x as u32, p.y as u32) {
                d.copy_from_slice(&px.to_array());
            }
        }
    }
    Ok(out)
}

/// Integer offset of a whole-pixel translation, `None` for any other transform.
pub(crate) fn integer_offset(transform: Affine) -> Option<(i32, i32)> {
    let [a, b, c, d, e, f] = transform.as_coeffs();
    (a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0 && e.fract() == 0.0 && f.fract() == 0.0)
        .then_some((e as i32, f as i32))
}

#[cfg(test)]
#[path = "../../tests/unit/render/device.rs"]
mod tests;
