use std::sync::Arc;

use kurbo::{Affine, BezPath, PathEl, Shape};
use tracing::{debug, trace};

use crate::buffer::descriptor::PixelBuffer;
use crate::buffer::format::PixelFormat;
use crate::foundation::core::{Area, OPA_COVER};
use crate::foundation::error::DeviceError;
use crate::paint::fill::BlendMode;
use crate::path::stream::FillRule;
use crate::render::device::{Device, DeviceOp, DevicePaint, gradient_image, to_device_error};

/// Accelerator device backed by a `vello_cpu` render context.
///
/// Submitted fills are recorded into the context on top of a snapshot of the destination;
/// `finish` renders the recording and writes back the area the recorded fills cover. Pixels
/// outside that area keep whatever the caller wrote in the meantime. Validation happens before
/// anything is recorded, so a rejected fill leaves both the queue and the destination unchanged.
pub struct VelloDevice {
    ctx: Option<vello_cpu::RenderContext>,
    frame: Option<(u16, u16)>,
    pending: usize,
    dirty: Option<Area>,
}

impl std::fmt::Debug for VelloDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VelloDevice")
            .field("frame", &self.frame)
            .field("pending", &self.pending)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Default for VelloDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloDevice {
    /// Device with no context allocated yet.
    pub fn new() -> Self {
        Self {
            ctx: None,
            frame: None,
            pending: 0,
            dirty: None,
        }
    }

    /// Number of fills recorded since the last `finish`.
    pub fn pending(&self) -> usize {
        self.pending
    }

    fn target_size(target: &PixelBuffer) -> Result<(u16, u16), DeviceError> {
        if target.format() != PixelFormat::Rgba8Premul {
            return Err(DeviceError::unsupported(format!(
                "{:?} destination",
                target.format()
            )));
        }
        let w: u16 = target
            .width()
            .try_into()
            .map_err(|_| DeviceError::invalid_argument("target width exceeds u16"))?;
        let h: u16 = target
            .height()
            .try_into()
            .map_err(|_| DeviceError::invalid_argument("target height exceeds u16"))?;
        if w == 0 || h == 0 {
            return Err(DeviceError::invalid_argument("empty target"));
        }
        Ok((w, h))
    }

    fn validate(op: &DeviceOp<'_>) -> Result<(), DeviceError> {
        let finite = |p: &BezPath| {
            p.elements().iter().all(|el| match *el {
                PathEl::MoveTo(a) | PathEl::LineTo(a) => a.is_finite(),
                PathEl::QuadTo(a, b) => a.is_finite() && b.is_finite(),
                PathEl::CurveTo(a, b, c) => a.is_finite() && b.is_finite() && c.is_finite(),
                PathEl::ClosePath => true,
            })
        };
        if !finite(op.path) || op.clip.is_some_and(|c| !finite(c)) {
            return Err(DeviceError::invalid_argument("non-finite path coordinate"));
        }
        if op.blend == BlendMode::Subtractive {
            return Err(DeviceError::unsupported("subtractive blending"));
        }
        if let DevicePaint::Image { image, transform } = op.paint {
            if image.format() != PixelFormat::Rgba8Premul {
                return Err(DeviceError::unsupported(format!(
                    "{:?} image paint",
                    image.format()
                )));
            }
            if image.width() > u32::from(u16::MAX) || image.height() > u32::from(u16::MAX) {
                return Err(DeviceError::invalid_argument("image exceeds u16 dimensions"));
            }
            if !transform.is_finite() || transform.determinant().abs() <= f64::EPSILON {
                return Err(DeviceError::invalid_argument("image transform is not invertible"));
            }
        }
        Ok(())
    }

    /// Context for the current frame, started on the first fill after a `finish`.
    fn frame_ctx(
        &mut self,
        target: &PixelBuffer,
        size: (u16, u16),
    ) -> Result<&mut vello_cpu::RenderContext, DeviceError> {
        if let Some(frame) = self.frame
            && frame != size
        {
            return Err(DeviceError::invalid_argument(
                "destination size changed with fills pending",
            ));
        }
        let start = self.frame.is_none();
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == size.0 && ctx.height() == size.1 => ctx,
            _ => vello_cpu::RenderContext::new(size.0, size.1),
        };
        if start {
            ctx.reset();
            let background = buffer_to_image(target)?;
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
            ctx.set_fill_rule(vello_cpu::peniko::Fill::NonZero);
            ctx.set_paint(background);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(size.0),
                f64::from(size.1),
            ));
            self.frame = Some(size);
        }
        Ok(self.ctx.insert(ctx))
    }
}

impl Device for VelloDevice {
    fn name(&self) -> &'static str {
        "vello_cpu"
    }

    fn submit(&mut self, target: &mut PixelBuffer, op: &DeviceOp<'_>) -> Result<(), DeviceError> {
        let size = Self::target_size(target)?;
        Self::validate(op)?;
        let Some(bounds) = target.area().intersect(op.clip_area) else {
            return Ok(());
        };
        let path_box = op.path.bounding_box();
        let touched = if path_box.is_finite() {
            Area::enclosing(path_box).intersect(bounds)
        } else {
            Some(bounds)
        };
        let Some(touched) = touched else {
            return Ok(());
        };

        // Resolve the paint before recording so a failure leaves the queue intact.
        let (paint, paint_transform) = match op.paint {
            DevicePaint::Solid(c) => (
                CpuPaint::Color(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)),
                Affine::IDENTITY,
            ),
            DevicePaint::Image { image, transform } => {
                (CpuPaint::Image(buffer_to_image(image)?), *transform)
            }
            DevicePaint::Gradient { shape, lut } => {
                let img = gradient_image(shape, lut, touched).map_err(to_device_error)?;
                (
                    CpuPaint::Image(buffer_to_image(&img)?),
                    Affine::translate((f64::from(touched.x0), f64::from(touched.y0))),
                )
            }
        };
        let image_bounds = match op.paint {
            DevicePaint::Image { image, transform } => {
                let (w, h) = (f64::from(image.width()), f64::from(image.height()));
                Some(*transform * kurbo::Rect::new(0.0, 0.0, w, h).to_path(0.1))
            }
            _ => None,
        };

        let ctx = self.frame_ctx(target, size)?;
        trace!(?bounds, blend = ?op.blend, "recording vello fill");
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_blend_mode(blend_to_cpu(op.blend));

        let mut layers = 0;
        if bounds != target.area() {
            ctx.push_clip_layer(&bezpath_to_cpu(&bounds.to_rect().to_path(0.1)));
            layers += 1;
        }
        if let Some(clip) = op.clip {
            ctx.set_fill_rule(vello_cpu::peniko::Fill::NonZero);
            ctx.push_clip_layer(&bezpath_to_cpu(clip));
            layers += 1;
        }
        if let Some(img_bounds) = &image_bounds {
            ctx.set_fill_rule(vello_cpu::peniko::Fill::NonZero);
            ctx.push_clip_layer(&bezpath_to_cpu(img_bounds));
            layers += 1;
        }
        if op.opacity < OPA_COVER {
            ctx.push_opacity_layer(f32::from(op.opacity) / 255.0);
            layers += 1;
        }

        ctx.set_fill_rule(match op.rule {
            FillRule::NonZero => vello_cpu::peniko::Fill::NonZero,
            FillRule::EvenOdd => vello_cpu::peniko::Fill::EvenOdd,
        });
        ctx.set_paint_transform(affine_to_cpu(paint_transform));
        match paint {
            CpuPaint::Color(c) => ctx.set_paint(c),
            CpuPaint::Image(img) => ctx.set_paint(img),
        }
        ctx.fill_path(&bezpath_to_cpu(op.path));
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        for _ in 0..layers {
            ctx.pop_layer();
        }
        self.pending += 1;
        self.dirty = Some(self.dirty.map_or(touched, |d| d.union(touched)));
        Ok(())
    }

    fn finish(&mut self, target: &mut PixelBuffer) -> Result<(), DeviceError> {
        if self.pending == 0 && self.frame.is_none() {
            return Ok(());
        }
        let size = Self::target_size(target)?;
        if self.frame != Some(size) {
            return Err(DeviceError::invalid_argument(
                "finish called with a different destination",
            ));
        }
        let Some(ctx) = self.ctx.as_mut() else {
            return Err(DeviceError::invalid_argument("no render context"));
        };

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(size.0, size.1);
        ctx.render_to_pixmap(&mut pixmap);

        let row_bytes = usize::from(size.0) * 4;
        if let Some(dirty) = self.dirty.take().and_then(|d| d.intersect(target.area())) {
            let src = pixmap.data_as_u8_slice();
            let (x0, x1) = (dirty.x0 as usize * 4, dirty.x1 as usize * 4);
            for y in dirty.y0..dirty.y1 {
                let start = y as usize * row_bytes;
                target.row_mut(y as u32)[x0..x1].copy_from_slice(&src[start + x0..start + x1]);
            }
        }
        debug!(fills = self.pending, "vello frame rendered");
        self.pending = 0;
        self.frame = None;
        Ok(())
    }
}

enum CpuPaint {
    Color(vello_cpu::peniko::Color),
    Image(vello_cpu::Image),
}

fn blend_to_cpu(mode: BlendMode) -> vello_cpu::peniko::BlendMode {
    use vello_cpu::peniko::{Compose, Mix};

    match mode {
        BlendMode::Normal | BlendMode::Subtractive => {
            vello_cpu::peniko::BlendMode::new(Mix::Normal, Compose::SrcOver)
        }
        BlendMode::Additive => vello_cpu::peniko::BlendMode::new(Mix::Normal, Compose::Plus),
        BlendMode::Multiply => vello_cpu::peniko::BlendMode::new(Mix::Multiply, Compose::SrcOver),
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(c, p) => out.quad_to(pt(c), pt(p)),
            PathEl::CurveTo(c1, c2, p) => out.curve_to(pt(c1), pt(c2), pt(p)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// Wrap premultiplied RGBA8 pixels as an image paint.
fn buffer_to_image(buf: &PixelBuffer) -> Result<vello_cpu::Image, DeviceError> {
    let w: u16 = buf
        .width()
        .try_into()
        .map_err(|_| DeviceError::invalid_argument("image width exceeds u16"))?;
    let h: u16 = buf
        .height()
        .try_into()
        .map_err(|_| DeviceError::invalid_argument("image height exceeds u16"))?;
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(usize::from(w) * usize::from(h))
        .map_err(|_| DeviceError::OutOfDeviceMemory)?;
    for y in 0..buf.height() {
        for px in buf.row(y).chunks_exact(4) {
            pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
                px[0], px[1], px[2], px[3],
            ]));
        }
    }
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/vello.rs"]
mod tests;
