use tracing::trace;

use crate::buffer::descriptor::PixelBuffer;
use crate::buffer::format::PixelFormat;
use crate::foundation::core::{Area, OPA_COVER, OPA_TRANSP, Opacity, Rgba8Premul};
use crate::foundation::error::{VgError, VgResult};
use crate::foundation::math::{div255, mul_div255};
use crate::paint::fill::BlendMode;

/// Inner loop implementation of the software blend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendKernel {
    /// One pixel at a time; the reference.
    Scalar,
    /// Fixed-width lanes of pixels the compiler can vectorize. Produces the same bytes as
    /// [`BlendKernel::Scalar`].
    #[default]
    Vectorized,
}

/// Source of one row of a blend.
#[derive(Clone, Copy, Debug)]
pub(crate) enum RowSource<'a> {
    /// Same premultiplied color for every pixel.
    Solid([u8; 4]),
    /// Premultiplied RGBA8 bytes, one pixel per destination pixel.
    Pixels(&'a [u8]),
}

/// Software compositor over premultiplied RGBA8 buffers.
///
/// Each call picks one of three tiers: per-pixel mask, uniform opacity, or a plain copy of opaque
/// source pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blender {
    /// Blend mode.
    pub mode: BlendMode,
    /// Inner loop.
    pub kernel: BlendKernel,
}

impl Blender {
    /// Blender with the given mode and kernel.
    pub fn new(mode: BlendMode, kernel: BlendKernel) -> Self {
        Self { mode, kernel }
    }

    /// Composite `color` over `area` of `dst`.
    ///
    /// `mask` holds one coverage byte per pixel of `area` (row-major, `area.width()` per row)
    /// and is indexed relative to the unclipped area.
    pub fn fill(
        &self,
        dst: &mut PixelBuffer,
        area: Area,
        color: Rgba8Premul,
        opacity: Opacity,
        mask: Option<&[u8]>,
    ) -> VgResult<()> {
        check_dst(dst)?;
        check_mask(area, mask)?;
        if opacity == OPA_TRANSP {
            return Ok(());
        }
        let Some(clipped) = area.intersect(dst.area()) else {
            return Ok(());
        };
        trace!(?clipped, opacity, mode = ?self.mode, "blend fill");

        let src = RowSource::Solid(color.to_array());
        let mw = area.width() as usize;
        let x0 = (clipped.x0 - dst.area().x0) as usize;
        let w = clipped.width() as usize;
        for y in clipped.y0..clipped.y1 {
            let row = &mut dst.row_mut(y as u32)[x0 * 4..(x0 + w) * 4];
            let m = mask.map(|m| {
                let start = (y - area.y0) as usize * mw + (clipped.x0 - area.x0) as usize;
                &m[start..start + w]
            });
            self.row(row, src, opacity, m);
        }
        Ok(())
    }

    /// Composite `src` over `area` of `dst`.
    ///
    /// Pixel `(area.x0, area.y0)` takes source pixel `src_origin`; destination pixels that map
    /// outside `src` are left untouched. `mask` is laid out as in [`Blender::fill`].
    pub fn image(
        &self,
        dst: &mut PixelBuffer,
        area: Area,
        src: &PixelBuffer,
        src_origin: (i32, i32),
        opacity: Opacity,
        mask: Option<&[u8]>,
    ) -> VgResult<()> {
        check_dst(dst)?;
        check_mask(area, mask)?;
        if src.format() != PixelFormat::Rgba8Premul {
            return Err(VgError::validation(format!(
                "blend source must be premultiplied RGBA8, got {:?}",
                src.format()
            )));
        }
        if opacity == OPA_TRANSP {
            return Ok(());
        }
        let (ox, oy) = src_origin;
        let src_in_dst = Area::from_xywh(area.x0 - ox, area.y0 - oy, src.width(), src.height());
        let Some(clipped) = area
            .intersect(dst.area())
            .and_then(|a| a.intersect(src_in_dst))
        else {
            return Ok(());
        };
        trace!(?clipped, opacity, mode = ?self.mode, "blend image");

        let mw = area.width() as usize;
        let w = clipped.width() as usize;
        let dx0 = clipped.x0 as usize;
        let sx0 = (clipped.x0 - area.x0 + ox) as usize;
        for y in clipped.y0..clipped.y1 {
            let sy = (y - area.y0 + oy) as u32;
            let s = &src.row(sy)[sx0 * 4..(sx0 + w) * 4];
            let row = &mut dst.row_mut(y as u32)[dx0 * 4..(dx0 + w) * 4];
            let m = mask.map(|m| {
                let start = (y - area.y0) as usize * mw + (clipped.x0 - area.x0) as usize;
                &m[start..start + w]
            });
            self.row(row, RowSource::Pixels(s), opacity, m);
        }
        Ok(())
    }

    /// Blend one row. `dst`, the source and `mask` cover the same pixels.
    pub(crate) fn row(
        &self,
        dst: &mut [u8],
        src: RowSource<'_>,
        opacity: Opacity,
        mask: Option<&[u8]>,
    ) {
        match self.kernel {
            BlendKernel::Scalar => scalar_row(self.mode, dst, src, opacity, mask),
            BlendKernel::Vectorized if self.mode == BlendMode::Normal => {
                vectorized_row(dst, src, opacity, mask)
            }
            // Only source-over has a lane kernel.
            BlendKernel::Vectorized => scalar_row(self.mode, dst, src, opacity, mask),
        }
    }
}

/// Source-over `color` onto `area` of `dst` with the default kernel.
pub fn blend_fill(
    dst: &mut PixelBuffer,
    area: Area,
    color: Rgba8Premul,
    opacity: Opacity,
    mask: Option<&[u8]>,
) -> VgResult<()> {
    Blender::default().fill(dst, area, color, opacity, mask)
}

/// Source-over `src` onto `area` of `dst` with the default kernel.
pub fn blend_image(
    dst: &mut PixelBuffer,
    area: Area,
    src: &PixelBuffer,
    src_origin: (i32, i32),
    opacity: Opacity,
    mask: Option<&[u8]>,
) -> VgResult<()> {
    Blender::default().image(dst, area, src, src_origin, opacity, mask)
}

fn check_dst(dst: &PixelBuffer) -> VgResult<()> {
    if dst.format() != PixelFormat::Rgba8Premul {
        return Err(VgError::validation(format!(
            "blend destination must be premultiplied RGBA8, got {:?}",
            dst.format()
        )));
    }
    Ok(())
}

fn check_mask(area: Area, mask: Option<&[u8]>) -> VgResult<()> {
    match mask {
        Some(m) if (m.len() as u64) < area.pixel_count() => Err(VgError::validation(format!(
            "mask holds {} bytes, area needs {}",
            m.len(),
            area.pixel_count()
        ))),
        _ => Ok(()),
    }
}

fn scale_px(px: [u8; 4], k: u8) -> [u8; 4] {
    if k == OPA_COVER {
        return px;
    }
    px.map(|c| mul_div255(c, k))
}

pub(crate) fn blend_px(mode: BlendMode, d: [u8; 4], s: [u8; 4]) -> [u8; 4] {
    let sa = s[3];
    if sa == 0 {
        return d;
    }
    let inv = 255 - sa;
    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(d[3], inv));
    for c in 0..3 {
        out[c] = match mode {
            BlendMode::Normal => s[c].saturating_add(mul_div255(d[c], inv)),
            BlendMode::Additive => d[c].saturating_add(s[c]),
            BlendMode::Subtractive => d[c].saturating_sub(s[c]),
            BlendMode::Multiply => mul_div255(s[c], d[c])
                .saturating_add(mul_div255(s[c], 255 - d[3]))
                .saturating_add(mul_div255(d[c], inv)),
        };
    }
    out
}

fn load(px: &[u8]) -> [u8; 4] {
    [px[0], px[1], px[2], px[3]]
}

fn scalar_row(
    mode: BlendMode,
    dst: &mut [u8],
    src: RowSource<'_>,
    opacity: Opacity,
    mask: Option<&[u8]>,
) {
    let src_px = |i: usize| match src {
        RowSource::Solid(c) => c,
        RowSource::Pixels(p) => load(&p[i * 4..i * 4 + 4]),
    };

    match mask {
        Some(mask) => {
            for (i, (d, &m)) in dst.chunks_exact_mut(4).zip(mask).enumerate() {
                let k = mul_div255(m, opacity);
                if k == 0 {
                    continue;
                }
                d.copy_from_slice(&blend_px(mode, load(d), scale_px(src_px(i), k)));
            }
        }
        None if opacity < OPA_COVER => {
            for (i, d) in dst.chunks_exact_mut(4).enumerate() {
                d.copy_from_slice(&blend_px(mode, load(d), scale_px(src_px(i), opacity)));
            }
        }
        None => {
            for (i, d) in dst.chunks_exact_mut(4).enumerate() {
                let s = src_px(i);
                if mode == BlendMode::Normal && s[3] == OPA_COVER {
                    d.copy_from_slice(&s);
                } else {
                    d.copy_from_slice(&blend_px(mode, load(d), s));
                }
            }
        }
    }
}

const LANES: usize = 4;
const LANE_BYTES: usize = LANES * 4;

/// Source-over of `LANES` pixels. `k` is the per-pixel source scale.
#[inline]
fn over_lanes(d: &mut [u8], s: &[u8], k: &[u16; LANES]) {
    let mut sv = [0u16; LANE_BYTES];
    for i in 0..LANE_BYTES {
        let ki = k[i / 4];
        sv[i] = if ki == 255 {
            u16::from(s[i])
        } else {
            div255(u32::from(s[i]) * u32::from(ki))
        };
    }
    let mut inv = [0u16; LANE_BYTES];
    for i in 0..LANE_BYTES {
        inv[i] = 255 - sv[(i & !3) + 3];
    }
    let mut out = [0u16; LANE_BYTES];
    for i in 0..LANE_BYTES {
        let dv = div255(u32::from(d[i]) * u32::from(inv[i]));
        out[i] = (sv[i] + dv).min(255);
    }
    for i in 0..LANE_BYTES {
        // Fully transparent or unscaled-away pixels keep the destination.
        if k[i / 4] != 0 && sv[(i & !3) + 3] != 0 {
            d[i] = out[i] as u8;
        }
    }
}

fn vectorized_row(dst: &mut [u8], src: RowSource<'_>, opacity: Opacity, mask: Option<&[u8]>) {
    let px_count = dst.len() / 4;
    let body = px_count - px_count % LANES;
    let solid_lanes;
    let src_bytes: &[u8] = match src {
        RowSource::Solid(c) => {
            solid_lanes = [c; LANES].concat();
            &solid_lanes
        }
        RowSource::Pixels(p) => p,
    };
    let src_chunk = |i: usize| match src {
        RowSource::Solid(_) => &src_bytes[..LANE_BYTES],
        RowSource::Pixels(_) => &src_bytes[i * 4..i * 4 + LANE_BYTES],
    };

    let mut i = 0;
    while i < body {
        let mut k = [u16::from(opacity); LANES];
        if let Some(m) = mask {
            for (l, kl) in k.iter_mut().enumerate() {
                *kl = u16::from(mul_div255(m[i + l], opacity));
            }
        }
        over_lanes(&mut dst[i * 4..i * 4 + LANE_BYTES], src_chunk(i), &k);
        i += LANES;
    }

    if body < px_count {
        let tail_src = match src {
            RowSource::Solid(c) => RowSource::Solid(c),
            RowSource::Pixels(p) => RowSource::Pixels(&p[body * 4..]),
        };
        scalar_row(
            BlendMode::Normal,
            &mut dst[body * 4..],
            tail_src,
            opacity,
            mask.map(|m| &m[body..]),
        );
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
