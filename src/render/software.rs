use tracing::trace;

use crate::buffer::descriptor::PixelBuffer;
use crate::foundation::config::EngineConfig;
use crate::foundation::error::DeviceError;
use crate::foundation::math::mul_div255;
use crate::mask::stack::MaskStack;
use crate::path::stream::FillRule;
use crate::render::blend::{BlendKernel, Blender};
use crate::render::device::{
    Device, DeviceOp, DevicePaint, gradient_image, integer_offset, resample_image, to_device_error,
};
use crate::render::raster::rasterize;

/// Reference device: scanline coverage plus the software blend kernels.
///
/// Work is applied immediately, so `finish` has nothing to do.
#[derive(Clone, Debug)]
pub struct SoftwareDevice {
    kernel: BlendKernel,
    tolerance: f64,
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl SoftwareDevice {
    /// Device using the blend kernel and flattening tolerance of `cfg`.
    pub fn new(cfg: &EngineConfig) -> Self {
        Self {
            kernel: if cfg.vectorized_blend {
                BlendKernel::Vectorized
            } else {
                BlendKernel::Scalar
            },
            tolerance: cfg.curve_tolerance,
        }
    }

    /// Selected blend kernel.
    pub fn kernel(&self) -> BlendKernel {
        self.kernel
    }

    /// Fill `op`, additionally scaling coverage by the per-pixel coverage of `masks`.
    pub fn submit_masked(
        &mut self,
        target: &mut PixelBuffer,
        op: &DeviceOp<'_>,
        masks: Option<&dyn MaskStack>,
    ) -> Result<(), DeviceError> {
        let Some(bounds) = target.area().intersect(op.clip_area) else {
            return Ok(());
        };
        let Some(mut cov) =
            rasterize(op.path, op.rule, bounds, self.tolerance).map_err(to_device_error)?
        else {
            return Ok(());
        };
        if let Some(clip) = op.clip {
            let Some(clip_cov) = rasterize(clip, FillRule::NonZero, cov.area(), self.tolerance)
                .map_err(to_device_error)?
            else {
                return Ok(());
            };
            cov.intersect(&clip_cov);
        }
        if let Some(masks) = masks
            && !masks.is_empty()
        {
            let area = cov.area();
            let mut row = vec![0u8; area.width() as usize];
            for y in area.y0..area.y1 {
                masks.coverage_row(area.x0, y, &mut row);
                for (c, &m) in cov.row_mut(y).iter_mut().zip(&row) {
                    *c = mul_div255(*c, m);
                }
            }
        }
        if cov.is_blank() {
            return Ok(());
        }

        let area = cov.area();
        trace!(?area, blend = ?op.blend, "software fill");
        let blender = Blender::new(op.blend, self.kernel);
        let mask = Some(cov.data());
        match op.paint {
            DevicePaint::Solid(color) => {
                blender.fill(target, area, color.premultiply(), op.opacity, mask)
            }
            DevicePaint::Image { image, transform } => match integer_offset(*transform) {
                Some((tx, ty)) => blender.image(
                    target,
                    area,
                    image,
                    (area.x0 - tx, area.y0 - ty),
                    op.opacity,
                    mask,
                ),
                None => {
                    let sampled =
                        resample_image(image, *transform, area).map_err(to_device_error)?;
                    blender.image(target, area, &sampled, (0, 0), op.opacity, mask)
                }
            },
            DevicePaint::Gradient { shape, lut } => {
                let img = gradient_image(shape, lut, area).map_err(to_device_error)?;
                blender.image(target, area, &img, (0, 0), op.opacity, mask)
            }
        }
        .map_err(to_device_error)
    }
}

impl Device for SoftwareDevice {
    fn name(&self) -> &'static str {
        "software"
    }

    fn submit(&mut self, target: &mut PixelBuffer, op: &DeviceOp<'_>) -> Result<(), DeviceError> {
        self.submit_masked(target, op, None)
    }

    fn finish(&mut self, _target: &mut PixelBuffer) -> Result<(), DeviceError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/software.rs"]
mod tests;
