use kurbo::Shape;
use tracing::{debug, trace};

use crate::buffer::descriptor::PixelBuffer;
use crate::foundation::config::EngineConfig;
use crate::foundation::core::Area;
use crate::foundation::error::DeviceError;
use crate::render::device::{Device, DeviceOp, DevicePaint, integer_offset};
use crate::render::software::SoftwareDevice;

/// Counters of a [`FallbackDevice`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FallbackStats {
    /// Fills the accelerator accepted.
    pub accelerated: u64,
    /// Fills the accelerator rejected and the software device redid.
    pub fallbacks: u64,
    /// Small un-transformed image fills sent straight to software.
    pub small_blits: u64,
}

/// Two-tier device: try the accelerator, redo the same fill in software when it refuses.
///
/// Before any software fill the accelerator's queue is drained into the target, so fills land in
/// submission order regardless of which tier executed them.
#[derive(Debug)]
pub struct FallbackDevice<A, S = SoftwareDevice> {
    accel: A,
    soft: S,
    small_blit_max_px: u64,
    stats: FallbackStats,
}

impl<A: Device> FallbackDevice<A> {
    /// Pair `accel` with a [`SoftwareDevice`] configured from `cfg`.
    pub fn new(accel: A, cfg: &EngineConfig) -> Self {
        Self::with_software(accel, SoftwareDevice::new(cfg), cfg)
    }
}

impl<A: Device, S: Device> FallbackDevice<A, S> {
    /// Pair `accel` with an explicit software tier.
    pub fn with_software(accel: A, soft: S, cfg: &EngineConfig) -> Self {
        Self {
            accel,
            soft,
            small_blit_max_px: cfg.small_blit_max_px,
            stats: FallbackStats::default(),
        }
    }

    /// The accelerator tier.
    pub fn accelerator(&self) -> &A {
        &self.accel
    }

    /// The software tier.
    pub fn software(&self) -> &S {
        &self.soft
    }

    /// Tier usage counters.
    pub fn stats(&self) -> FallbackStats {
        self.stats
    }

    fn is_small_blit(&self, op: &DeviceOp<'_>) -> bool {
        let DevicePaint::Image { transform, .. } = op.paint else {
            return false;
        };
        if op.clip.is_some() || integer_offset(*transform).is_none() {
            return false;
        }
        Area::enclosing(op.path.bounding_box())
            .intersect(op.clip_area)
            .is_some_and(|a| a.pixel_count() <= self.small_blit_max_px)
    }

    fn software_submit(
        &mut self,
        target: &mut PixelBuffer,
        op: &DeviceOp<'_>,
    ) -> Result<(), DeviceError> {
        self.accel.finish(target)?;
        self.soft.submit(target, op)
    }
}

impl<A: Device, S: Device> Device for FallbackDevice<A, S> {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn submit(&mut self, target: &mut PixelBuffer, op: &DeviceOp<'_>) -> Result<(), DeviceError> {
        if self.is_small_blit(op) {
            trace!("small image blit in software");
            self.stats.small_blits += 1;
            return self.software_submit(target, op);
        }
        match self.accel.submit(target, op) {
            Ok(()) => {
                self.stats.accelerated += 1;
                Ok(())
            }
            Err(err) => {
                debug!(
                    accel = self.accel.name(),
                    soft = self.soft.name(),
                    %err,
                    "accelerator refused fill; redoing in software"
                );
                self.stats.fallbacks += 1;
                self.software_submit(target, op)
            }
        }
    }

    fn finish(&mut self, target: &mut PixelBuffer) -> Result<(), DeviceError> {
        self.accel.finish(target)?;
        self.soft.finish(target)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/fallback.rs"]
mod tests;
