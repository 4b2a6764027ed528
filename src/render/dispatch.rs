use std::sync::Arc;

use kurbo::BezPath;
use tracing::{debug, instrument, trace, warn};

use crate::assets::cache::ImageCache;
use crate::assets::prepare::{ImageSource, PreparedImage, Recolor, prepare_image};
use crate::buffer::descriptor::PixelBuffer;
use crate::foundation::config::EngineConfig;
use crate::foundation::core::Area;
use crate::foundation::error::{VgError, VgResult};
use crate::mask::stack::MaskStack;
use crate::paint::fill::{FillDesc, FillSource, ImagePattern};
use crate::paint::gradient::{RampCache, RampCacheStats};
use crate::path::stream::PathStream;
use crate::render::device::{Device, DeviceOp, DevicePaint};
use crate::render::software::SoftwareDevice;

struct Resolved {
    path: BezPath,
    clip: Option<BezPath>,
    paint: DevicePaint,
}

/// Issues fills to a [`Device`].
///
/// Image sources go through the [`ImageCache`] (or a transient preparation when caching is
/// disabled), gradient ramps through a content-hash [`RampCache`]. A device failure is reported
/// as [`VgError::AcceleratorUnsupported`] and never retried here.
#[derive(Debug)]
pub struct FillDispatcher<D> {
    device: D,
    software: SoftwareDevice,
    images: ImageCache,
    ramps: RampCache,
    cfg: EngineConfig,
}

impl<D: Device> FillDispatcher<D> {
    /// Dispatcher submitting to `device`.
    pub fn new(device: D, cfg: EngineConfig) -> VgResult<Self> {
        cfg.validate()?;
        Ok(Self {
            device,
            software: SoftwareDevice::new(&cfg),
            images: ImageCache::new(cfg.clone()),
            ramps: RampCache::new(cfg.gradient_ramp_width),
            cfg,
        })
    }

    /// The device fills are submitted to.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the device.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// The prepared image cache.
    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    /// Mutable access to the prepared image cache (release, clear).
    pub fn images_mut(&mut self) -> &mut ImageCache {
        &mut self.images
    }

    /// Gradient ramp cache counters.
    pub fn ramp_stats(&self) -> RampCacheStats {
        self.ramps.stats()
    }

    /// Prepared image for `src`, cached unless the cache capacity is zero.
    pub fn prepare(
        &mut self,
        src: &ImageSource,
        recolor: Option<Recolor>,
    ) -> VgResult<Arc<PreparedImage>> {
        if self.cfg.image_cache_capacity == 0 {
            trace!(id = src.id.0, "transient image preparation");
            return Ok(Arc::new(prepare_image(src, recolor, &self.cfg)?));
        }
        self.images.prepare(src, recolor)
    }

    /// Fill `path` with `fill` into `dst`, limited to `clip`.
    ///
    /// `aux_clip` is intersected with the shape (see [`crate::apply_masks`]). Opacity `0` and an
    /// empty clip return without touching the device. On a device error `dst` is unchanged.
    #[instrument(level = "trace", skip_all, fields(cmds = path.len()))]
    pub fn draw(
        &mut self,
        path: &PathStream,
        fill: &FillDesc,
        dst: &mut PixelBuffer,
        clip: Area,
        aux_clip: Option<&PathStream>,
    ) -> VgResult<()> {
        let Some(r) = self.resolve(path, fill, dst, clip, aux_clip)? else {
            return Ok(());
        };
        let op = DeviceOp {
            path: &r.path,
            rule: fill.rule,
            clip: r.clip.as_ref(),
            clip_area: clip,
            paint: &r.paint,
            opacity: fill.opacity,
            blend: fill.blend,
        };
        self.device.submit(dst, &op).map_err(|err| {
            warn!(device = self.device.name(), %err, "device rejected fill");
            VgError::AcceleratorUnsupported(err)
        })
    }

    /// Like [`FillDispatcher::draw`] but composited in software with per-pixel `masks`.
    ///
    /// Queued device work is completed first so the result lands on top of it.
    #[instrument(level = "trace", skip_all, fields(cmds = path.len()))]
    pub fn draw_pixel_masked(
        &mut self,
        path: &PathStream,
        fill: &FillDesc,
        dst: &mut PixelBuffer,
        clip: Area,
        masks: &dyn MaskStack,
    ) -> VgResult<()> {
        let Some(r) = self.resolve(path, fill, dst, clip, None)? else {
            return Ok(());
        };
        self.finish(dst)?;
        debug!("per-pixel masked software fill");
        let op = DeviceOp {
            path: &r.path,
            rule: fill.rule,
            clip: None,
            clip_area: clip,
            paint: &r.paint,
            opacity: fill.opacity,
            blend: fill.blend,
        };
        self.software
            .submit_masked(dst, &op, Some(masks))
            .map_err(VgError::AcceleratorUnsupported)
    }

    /// Wait for every submitted fill to land in `dst`.
    pub fn finish(&mut self, dst: &mut PixelBuffer) -> VgResult<()> {
        self.device.finish(dst).map_err(|err| {
            warn!(device = self.device.name(), %err, "device failed to finish");
            VgError::AcceleratorUnsupported(err)
        })
    }

    fn resolve(
        &mut self,
        path: &PathStream,
        fill: &FillDesc,
        dst: &PixelBuffer,
        clip: Area,
        aux_clip: Option<&PathStream>,
    ) -> VgResult<Option<Resolved>> {
        if fill.is_invisible() {
            trace!("invisible fill skipped");
            return Ok(None);
        }
        if dst.area().intersect(clip).is_none() || path.is_empty() {
            return Ok(None);
        }
        path.validate()?;
        if let Some(aux) = aux_clip {
            aux.validate()?;
        }

        let paint = match &fill.source {
            FillSource::Color(c) => DevicePaint::Solid(*c),
            FillSource::Image(pattern) => self.image_paint(pattern)?,
            FillSource::Gradient { shape, ramp } => DevicePaint::Gradient {
                shape: *shape,
                lut: self.ramps.lookup(ramp)?,
            },
        };
        Ok(Some(Resolved {
            path: path.to_bez_path(),
            clip: aux_clip.map(PathStream::to_bez_path),
            paint,
        }))
    }

    fn image_paint(&mut self, pattern: &ImagePattern) -> VgResult<DevicePaint> {
        let prepared = self.prepare(&pattern.source, pattern.recolor)?;
        let PreparedImage::Raster(raster) = &*prepared else {
            return Err(VgError::unsupported_format(
                "vector images are replayed as paths, not used as patterns",
            ));
        };
        Ok(DevicePaint::Image {
            image: Arc::clone(raster.rgba()),
            transform: pattern.transform.to_affine(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/dispatch.rs"]
mod tests;
