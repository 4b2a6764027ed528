use std::borrow::Cow;

use kurbo::{Affine, Point, Rect};
use tracing::{debug, trace, warn};

use crate::assets::prepare::{ImageSource, PreparedImage};
use crate::assets::raster::RasterHeader;
use crate::assets::vector::{VectorImage, VectorPaint, is_vector_container};
use crate::buffer::descriptor::PixelBuffer;
use crate::foundation::config::EngineConfig;
use crate::foundation::core::{Area, Opacity};
use crate::foundation::error::{VgError, VgResult};
use crate::mask::apply::apply_masks;
use crate::mask::stack::{MaskKind, MaskStack};
use crate::paint::fill::{BlendMode, FillDesc, FillSource, ImagePattern};
use crate::path::builder::{Dash, LineCap, Primitive, build_path};
use crate::path::scratch::{ScratchPool, ScratchPoolOpts, ScratchPoolStats};
use crate::path::stream::{FillRule, PathStream};
use crate::render::device::Device;
use crate::render::dispatch::FillDispatcher;
use crate::render::fallback::FallbackDevice;
use crate::render::software::SoftwareDevice;
use crate::render::vello::VelloDevice;

/// Outcome of one draw call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawStatus {
    /// The draw was issued.
    Drawn,
    /// Nothing to draw (zero size, invisible, fully clipped or degenerate).
    Skipped,
    /// Redo this call through the plain software renderer.
    Unsupported,
}

struct NoMasks;

impl MaskStack for NoMasks {
    fn masks(&self) -> &[MaskKind] {
        &[]
    }
}

static NO_MASKS: NoMasks = NoMasks;

/// Destination of a draw: the buffer, the clip rectangle and the toolkit's active masks.
pub struct DrawTarget<'a> {
    /// Pixels drawn into.
    pub buffer: &'a mut PixelBuffer,
    /// Clip rectangle in buffer coordinates.
    pub clip: Area,
    /// Active masks.
    pub masks: &'a dyn MaskStack,
}

impl<'a> DrawTarget<'a> {
    /// Whole buffer, no masks.
    pub fn new(buffer: &'a mut PixelBuffer) -> Self {
        let clip = buffer.area();
        Self {
            buffer,
            clip,
            masks: &NO_MASKS,
        }
    }

    /// Limit drawing to `clip`.
    pub fn with_clip(mut self, clip: Area) -> Self {
        self.clip = clip;
        self
    }

    /// Consult `masks` on every draw.
    pub fn with_masks(mut self, masks: &'a dyn MaskStack) -> Self {
        self.masks = masks;
        self
    }
}

/// Stroke parameters of [`Renderer::draw_line`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineStroke {
    /// Stroke width.
    pub width: f64,
    /// End caps.
    pub cap: LineCap,
    /// Optional dash pattern.
    pub dash: Option<Dash>,
}

impl LineStroke {
    /// Solid flat-capped stroke.
    pub fn new(width: f64) -> Self {
        Self {
            width,
            cap: LineCap::Flat,
            dash: None,
        }
    }
}

/// Stroke parameters of [`Renderer::draw_arc`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcStroke {
    /// Stroke width measured inwards from the radius.
    pub width: f64,
    /// Start angle in radians.
    pub start_angle: f64,
    /// Signed sweep in radians.
    pub sweep: f64,
    /// Round the ends.
    pub rounded: bool,
}

/// Toolkit-facing draw entry points.
///
/// Each call builds the primitive's path in a pooled scratch stream, folds the active masks into
/// it, and hands it to the [`FillDispatcher`]. Calls never fail: anything the device tier could
/// not do comes back as [`DrawStatus::Unsupported`].
#[derive(Debug)]
pub struct Renderer<D> {
    dispatcher: FillDispatcher<D>,
    scratch: ScratchPool,
}

impl Renderer<FallbackDevice<VelloDevice>> {
    /// Accelerated renderer with software fallback.
    pub fn accelerated(cfg: EngineConfig) -> VgResult<Self> {
        let device = FallbackDevice::new(VelloDevice::new(), &cfg);
        Self::new(device, cfg)
    }
}

impl Renderer<SoftwareDevice> {
    /// Software-only renderer.
    pub fn software(cfg: EngineConfig) -> VgResult<Self> {
        Self::new(SoftwareDevice::new(&cfg), cfg)
    }
}

impl<D: Device> Renderer<D> {
    /// Renderer submitting to `device`.
    pub fn new(device: D, cfg: EngineConfig) -> VgResult<Self> {
        let scratch = ScratchPool::new(ScratchPoolOpts::from_config(&cfg));
        Ok(Self {
            dispatcher: FillDispatcher::new(device, cfg)?,
            scratch,
        })
    }

    /// The underlying dispatcher.
    pub fn dispatcher(&self) -> &FillDispatcher<D> {
        &self.dispatcher
    }

    /// Mutable access to the dispatcher (image cache management).
    pub fn dispatcher_mut(&mut self) -> &mut FillDispatcher<D> {
        &mut self.dispatcher
    }

    /// Scratch pool counters.
    pub fn scratch_stats(&self) -> ScratchPoolStats {
        self.scratch.stats()
    }

    /// Fill a rounded rectangle.
    pub fn draw_rect(
        &mut self,
        target: &mut DrawTarget<'_>,
        rect: Rect,
        radius: f64,
        fill: &FillDesc,
    ) -> DrawStatus {
        self.draw_primitive(target, &Primitive::RoundedRect { rect, radius }, fill)
    }

    /// Fill the ring between `rect` and `rect` inset by `width`.
    pub fn draw_border(
        &mut self,
        target: &mut DrawTarget<'_>,
        rect: Rect,
        radius: f64,
        width: f64,
        fill: &FillDesc,
    ) -> DrawStatus {
        let prim = Primitive::Border {
            rect,
            radius,
            width,
        };
        self.draw_primitive(target, &prim, fill)
    }

    /// Stroke a circular arc.
    pub fn draw_arc(
        &mut self,
        target: &mut DrawTarget<'_>,
        center: Point,
        radius: f64,
        stroke: &ArcStroke,
        fill: &FillDesc,
    ) -> DrawStatus {
        let prim = Primitive::Arc {
            center,
            radius,
            width: stroke.width,
            start_angle: stroke.start_angle,
            sweep: stroke.sweep,
            rounded: stroke.rounded,
        };
        self.draw_primitive(target, &prim, fill)
    }

    /// Stroke a line segment.
    ///
    /// Horizontal and vertical lines without round caps or dashes are filled as rectangles.
    pub fn draw_line(
        &mut self,
        target: &mut DrawTarget<'_>,
        from: Point,
        to: Point,
        stroke: &LineStroke,
        fill: &FillDesc,
    ) -> DrawStatus {
        if from == to {
            trace!("zero-length line skipped");
            return DrawStatus::Skipped;
        }
        if let Some(rect) = axis_aligned_line_rect(from, to, stroke) {
            return self.draw_rect(target, rect, 0.0, fill);
        }
        let prim = Primitive::Line {
            from,
            to,
            width: stroke.width,
            cap: stroke.cap,
            dash: stroke.dash,
        };
        self.draw_primitive(target, &prim, fill)
    }

    /// Fill a polygon through `points`.
    pub fn draw_polygon(
        &mut self,
        target: &mut DrawTarget<'_>,
        points: &[Point],
        fill: &FillDesc,
    ) -> DrawStatus {
        let prim = Primitive::Polygon {
            points: points.to_vec(),
        };
        self.draw_primitive(target, &prim, fill)
    }

    /// Build `prim` and fill it. The primitive's own fill rule wins when it needs even-odd.
    pub fn draw_primitive(
        &mut self,
        target: &mut DrawTarget<'_>,
        prim: &Primitive,
        fill: &FillDesc,
    ) -> DrawStatus {
        if fill.is_invisible() {
            return DrawStatus::Skipped;
        }
        let mut path = self.scratch.acquire();
        if let Err(err) = build_path(prim, &mut path) {
            return settle(&mut self.dispatcher, target.buffer, Err(err));
        }
        let fill = match prim.fill_rule() {
            FillRule::EvenOdd if fill.rule != FillRule::EvenOdd => {
                Cow::Owned(fill.clone().with_rule(FillRule::EvenOdd))
            }
            _ => Cow::Borrowed(fill),
        };
        fill_path(&mut self.dispatcher, target, &path, &fill)
    }

    /// Draw an image placed by its pattern transform.
    ///
    /// Raster images fill their transformed bounds with an image pattern; vector images are
    /// replayed through [`Renderer::draw_vector_image`] with the pattern transform as parent.
    pub fn draw_image(
        &mut self,
        target: &mut DrawTarget<'_>,
        pattern: &ImagePattern,
        opacity: Opacity,
    ) -> DrawStatus {
        if opacity == 0 {
            return DrawStatus::Skipped;
        }
        let placement = pattern.transform.to_affine();
        if is_vector_container(&pattern.source.bytes) {
            let prepared = match self.dispatcher.prepare(&pattern.source, pattern.recolor) {
                Ok(p) => p,
                Err(err) => return settle(&mut self.dispatcher, target.buffer, Err(err)),
            };
            let PreparedImage::Vector(vector) = &*prepared else {
                let err = VgError::unsupported_format("vector container prepared as raster");
                return settle(&mut self.dispatcher, target.buffer, Err(err));
            };
            return self.draw_vector_image(target, vector, placement, opacity);
        }

        let (w, h) = match raster_size(&pattern.source) {
            Ok(size) => size,
            Err(err) => return settle(&mut self.dispatcher, target.buffer, Err(err)),
        };
        let mut path = self.scratch.acquire();
        let rect = Rect::new(0.0, 0.0, f64::from(w), f64::from(h));
        let corners = [
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ];
        path.move_to(placement * corners[0]);
        for c in &corners[1..] {
            path.line_to(placement * *c);
        }
        path.close();
        path.end();
        let fill = FillDesc::image(pattern.clone()).with_opacity(opacity);
        fill_path(&mut self.dispatcher, target, &path, &fill)
    }

    /// Replay the objects of `image` under `parent × image.transform × object.transform`.
    ///
    /// The objects are composited into a copy of the target that replaces it only once every
    /// object has landed, so an [`DrawStatus::Unsupported`] result leaves the target as it was.
    /// Queued device work is completed before and after the replay.
    pub fn draw_vector_image(
        &mut self,
        target: &mut DrawTarget<'_>,
        image: &VectorImage,
        parent: Affine,
        opacity: Opacity,
    ) -> DrawStatus {
        if opacity == 0 || image.objects.is_empty() {
            return DrawStatus::Skipped;
        }
        if let Err(err) = self.dispatcher.finish(target.buffer) {
            warn!(%err, "vector image unsupported");
            return DrawStatus::Unsupported;
        }

        let mut staging = target.buffer.clone();
        let status = {
            let mut stage = DrawTarget {
                buffer: &mut staging,
                clip: target.clip,
                masks: target.masks,
            };
            self.replay_objects(&mut stage, image, parent, opacity)
        };
        if status != DrawStatus::Drawn {
            return status;
        }
        if let Err(err) = self.dispatcher.finish(&mut staging) {
            warn!(%err, "vector image unsupported");
            return DrawStatus::Unsupported;
        }
        std::mem::swap(&mut *target.buffer, &mut staging);
        DrawStatus::Drawn
    }

    /// Stops at the first object that comes back unsupported.
    fn replay_objects(
        &mut self,
        target: &mut DrawTarget<'_>,
        image: &VectorImage,
        parent: Affine,
        opacity: Opacity,
    ) -> DrawStatus {
        let base = parent * image.transform;
        let mut drawn = false;
        for obj in &image.objects {
            let xf = base * obj.transform;
            let mut path = obj.path.transformed(xf);
            if !path.is_ended() {
                path.end();
            }
            let source = match &obj.paint {
                VectorPaint::Solid(c) => FillSource::Color(*c),
                paint => match paint.gradient() {
                    Some((shape, ramp)) => FillSource::Gradient {
                        shape: shape.transformed(xf),
                        ramp,
                    },
                    None => {
                        debug!("vector object without usable paint skipped");
                        continue;
                    }
                },
            };
            let fill = FillDesc {
                rule: obj.fill_rule,
                source,
                opacity,
                blend: BlendMode::Normal,
            };
            match fill_path(&mut self.dispatcher, target, &path, &fill) {
                DrawStatus::Drawn => drawn = true,
                DrawStatus::Skipped => {}
                DrawStatus::Unsupported => return DrawStatus::Unsupported,
            }
        }
        if drawn {
            DrawStatus::Drawn
        } else {
            DrawStatus::Skipped
        }
    }

    /// Land every queued fill in `buffer`; call before presenting it.
    pub fn finish(&mut self, buffer: &mut PixelBuffer) -> VgResult<()> {
        self.dispatcher.finish(buffer)
    }
}

fn fill_path<D: Device>(
    dispatcher: &mut FillDispatcher<D>,
    target: &mut DrawTarget<'_>,
    path: &PathStream,
    fill: &FillDesc,
) -> DrawStatus {
    let Some(bounds) = path.bounds() else {
        return DrawStatus::Skipped;
    };
    let Some(clip) = target
        .clip
        .intersect(target.buffer.area())
        .filter(|c| c.intersect(Area::enclosing(bounds)).is_some())
    else {
        trace!("draw outside the clip skipped");
        return DrawStatus::Skipped;
    };

    let outcome = apply_masks(path, clip, target.masks);
    let result = if outcome.needs_pixel_mask() {
        dispatcher.draw_pixel_masked(path, fill, target.buffer, clip, target.masks)
    } else {
        dispatcher.draw(path, fill, target.buffer, clip, outcome.augmented.as_ref())
    };
    settle(dispatcher, target.buffer, result)
}

/// Status of a draw. An unsupported draw is redone by the caller straight into `buffer`, so
/// fills still queued on the device are landed first.
fn settle<D: Device>(
    dispatcher: &mut FillDispatcher<D>,
    buffer: &mut PixelBuffer,
    result: VgResult<()>,
) -> DrawStatus {
    match result {
        Ok(()) => DrawStatus::Drawn,
        Err(VgError::DegenerateGeometry) => {
            trace!("degenerate geometry skipped");
            DrawStatus::Skipped
        }
        Err(err) => {
            warn!(%err, "draw unsupported");
            if let Err(flush) = dispatcher.finish(buffer) {
                warn!(err = %flush, "queued fills could not be completed");
            }
            DrawStatus::Unsupported
        }
    }
}

fn raster_size(src: &ImageSource) -> VgResult<(u32, u32)> {
    let head = src
        .bytes
        .first_chunk::<4>()
        .ok_or_else(|| VgError::validation("raster container shorter than its header"))?;
    let header = RasterHeader::from_bytes(*head)?;
    Ok((header.width, header.height))
}

fn axis_aligned_line_rect(from: Point, to: Point, stroke: &LineStroke) -> Option<Rect> {
    if stroke.dash.is_some() || stroke.cap == LineCap::Round || stroke.width <= 0.0 {
        return None;
    }
    let half = stroke.width / 2.0;
    let ext = if stroke.cap == LineCap::Square { half } else { 0.0 };
    let r = Rect::from_points(from, to);
    if from.y == to.y {
        Some(Rect::new(r.x0 - ext, r.y0 - half, r.x1 + ext, r.y1 + half))
    } else if from.x == to.x {
        Some(Rect::new(r.x0 - half, r.y0 - ext, r.x1 + half, r.y1 + ext))
    } else {
        None
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
