use std::sync::Arc;

use tracing::{instrument, trace};

use crate::assets::raster::{ColorFormat, RasterImage};
use crate::assets::vector::{
    VectorImage, decode_vector_image, encode_vector_image, is_vector_container,
};
use crate::buffer::convert::{expand_alpha, expand_indexed, index_at, reverse_pixel_order_in_place};
use crate::buffer::descriptor::{BufferDesc, PixelBuffer};
use crate::buffer::format::PixelFormat;
use crate::foundation::config::{BitOrder, EngineConfig};
use crate::foundation::core::{Opacity, Rgba8, Rgba8Premul};
use crate::foundation::error::{VgError, VgResult};

/// Identity of an image source; cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u64);

/// Color mixed into an image at preparation time; `amount == 0` disables it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Recolor {
    /// Target color (its alpha is ignored).
    pub color: Rgba8,
    /// Mix strength.
    pub amount: Opacity,
}

impl Recolor {
    /// Create a recolor.
    pub fn new(color: Rgba8, amount: Opacity) -> Self {
        Self { color, amount }
    }

    /// Return `true` when the recolor changes pixels.
    pub fn is_active(self) -> bool {
        self.amount > 0
    }

    /// `(rc * amount + c * (255 - amount)) / 255` per color channel; alpha is kept.
    pub fn apply(self, c: Rgba8) -> Rgba8 {
        if !self.is_active() {
            return c;
        }
        let amt = u32::from(self.amount);
        let mix = |rc: u8, v: u8| -> u8 {
            ((u32::from(rc) * amt + u32::from(v) * (255 - amt) + 127) / 255) as u8
        };
        Rgba8::new(
            mix(self.color.r, c.r),
            mix(self.color.g, c.g),
            mix(self.color.b, c.b),
            c.a,
        )
    }
}

fn effective(recolor: Option<Recolor>) -> Option<Recolor> {
    recolor.filter(|r| r.is_active())
}

/// A source image in container form (raster or vector), identified for caching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSource {
    /// Cache identity.
    pub id: ImageId,
    /// Container bytes.
    pub bytes: Arc<[u8]>,
}

impl ImageSource {
    /// Wrap container bytes.
    pub fn new(id: ImageId, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id,
            bytes: bytes.into(),
        }
    }

    /// Encode a raster image as a source.
    pub fn raster(id: ImageId, img: &RasterImage) -> VgResult<Self> {
        Ok(Self::new(id, img.encode()?))
    }

    /// Encode a vector image as a source.
    pub fn vector(id: ImageId, img: &VectorImage) -> VgResult<Self> {
        Ok(Self::new(id, encode_vector_image(img)?))
    }
}

/// Parsed container contents.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodedImage {
    /// Raster container.
    Raster(RasterImage),
    /// Vector container.
    Vector(VectorImage),
}

/// Parse an image source without preparing it.
pub fn decode(src: &ImageSource) -> VgResult<DecodedImage> {
    if is_vector_container(&src.bytes) {
        Ok(DecodedImage::Vector(decode_vector_image(&src.bytes)?))
    } else {
        Ok(DecodedImage::Raster(RasterImage::decode(&src.bytes)?))
    }
}

/// Distinguishes prepared vector images from prepared raster buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageTag {
    /// Aligned pixel buffer.
    Raster,
    /// Decoded vector structure.
    Vector,
}

/// Accelerator-ready raster data.
///
/// `buffer` keeps the compact prepared form (RGBA, A8 coverage or packed indices). The
/// premultiplied RGBA expansion handed to devices is built once here and shared by every draw.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRaster {
    /// Pixel buffer; rows padded to the configured source alignment.
    pub buffer: Arc<PixelBuffer>,
    /// Recolored premultiplied palette for indexed buffers.
    pub palette: Option<Vec<Rgba8Premul>>,
    /// Packing of sub-byte index pixels in `buffer`.
    pub bit_order: BitOrder,
    rgba: Arc<PixelBuffer>,
}

impl PreparedRaster {
    fn new(
        buffer: PixelBuffer,
        palette: Option<Vec<Rgba8Premul>>,
        bit_order: BitOrder,
        tint: Rgba8Premul,
    ) -> VgResult<Self> {
        let buffer = Arc::new(buffer);
        let rgba = match buffer.format() {
            PixelFormat::Rgba8Premul => Arc::clone(&buffer),
            PixelFormat::A8 => Arc::new(expand_alpha(&buffer, tint)?),
            f if f.is_indexed() => {
                let pal = palette
                    .as_deref()
                    .ok_or_else(|| VgError::validation("indexed buffer without palette"))?;
                Arc::new(expand_indexed(&buffer, pal, bit_order)?)
            }
            f => {
                return Err(VgError::unsupported_format(format!(
                    "prepared buffer of {f:?}"
                )));
            }
        };
        Ok(Self {
            buffer,
            palette,
            bit_order,
            rgba,
        })
    }

    /// Premultiplied RGBA pixels. Coverage-only images carry the recolor color (black without one).
    pub fn rgba(&self) -> &Arc<PixelBuffer> {
        &self.rgba
    }
}

/// Result of the preparation pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum PreparedImage {
    /// Prepared pixels.
    Raster(PreparedRaster),
    /// Decoded vector image, replayed as paths.
    Vector(Arc<VectorImage>),
}

impl PreparedImage {
    /// Sub-tag of the prepared data.
    pub fn tag(&self) -> ImageTag {
        match self {
            Self::Raster(_) => ImageTag::Raster,
            Self::Vector(_) => ImageTag::Vector,
        }
    }

    /// Width and height in pixels (vector images report their bounds).
    pub fn size(&self) -> (u32, u32) {
        match self {
            Self::Raster(r) => (r.buffer.width(), r.buffer.height()),
            Self::Vector(v) => v
                .bounds()
                .map(|b| (b.width().ceil() as u32, b.height().ceil() as u32))
                .unwrap_or((0, 0)),
        }
    }
}

/// Decode and convert a source into an accelerator-ready image.
#[instrument(level = "debug", skip(src, cfg), fields(id = src.id.0))]
pub fn prepare_image(
    src: &ImageSource,
    recolor: Option<Recolor>,
    cfg: &EngineConfig,
) -> VgResult<PreparedImage> {
    match decode(src)? {
        DecodedImage::Vector(v) => Ok(PreparedImage::Vector(Arc::new(v))),
        DecodedImage::Raster(r) => Ok(PreparedImage::Raster(prepare_raster(&r, recolor, cfg)?)),
    }
}

/// Convert a decoded raster image.
pub fn prepare_raster(
    img: &RasterImage,
    recolor: Option<Recolor>,
    cfg: &EngineConfig,
) -> VgResult<PreparedRaster> {
    let recolor = effective(recolor);
    let tint = recolor.map_or(Rgba8::BLACK, |rc| rc.color).premultiply();
    let (w, h) = (img.width(), img.height());
    let format = img.format();
    trace!(?format, w, h, "preparing raster");

    let align = cfg.source_align_px;
    match format {
        ColorFormat::TrueColor
        | ColorFormat::TrueColorAlpha
        | ColorFormat::TrueColorChromaKeyed => {
            let mut buf =
                PixelBuffer::new(BufferDesc::aligned(w, h, PixelFormat::Rgba8Premul, align))?;
            let key = cfg.chroma_key;
            for y in 0..h {
                let src = img.row(y);
                let dst = buf.row_mut(y);
                let step = if format == ColorFormat::TrueColorAlpha { 4 } else { 3 };
                for (s, d) in src.chunks_exact(step).zip(dst.chunks_exact_mut(4)) {
                    let a = if step == 4 { s[3] } else { 255 };
                    let px = Rgba8::new(s[0], s[1], s[2], a);
                    let keyed = format == ColorFormat::TrueColorChromaKeyed
                        && (px.r, px.g, px.b) == (key.r, key.g, key.b);
                    let out = if keyed {
                        Rgba8Premul::transparent()
                    } else {
                        recolor.map_or(px, |rc| rc.apply(px)).premultiply()
                    };
                    d.copy_from_slice(&out.to_array());
                }
            }
            PreparedRaster::new(buf, None, cfg.index_bit_order, tint)
        }
        ColorFormat::Indexed1
        | ColorFormat::Indexed2
        | ColorFormat::Indexed4
        | ColorFormat::Indexed8 => {
            let pf = match format {
                ColorFormat::Indexed1 => PixelFormat::Index1,
                ColorFormat::Indexed2 => PixelFormat::Index2,
                ColorFormat::Indexed4 => PixelFormat::Index4,
                _ => PixelFormat::Index8,
            };
            let mut buf = PixelBuffer::new(BufferDesc::aligned(w, h, pf, align))?;
            let bpp = pf.bits_per_pixel();
            for y in 0..h {
                let src = img.row(y);
                let dst = buf.row_mut(y);
                dst.copy_from_slice(src);
                if cfg.index_bit_order == BitOrder::LsbFirst {
                    reverse_pixel_order_in_place(dst, bpp);
                }
            }
            let palette = img
                .palette()
                .iter()
                .map(|&c| recolor.map_or(c, |rc| rc.apply(c)).premultiply())
                .collect();
            PreparedRaster::new(buf, Some(palette), cfg.index_bit_order, tint)
        }
        ColorFormat::Alpha1 | ColorFormat::Alpha2 | ColorFormat::Alpha4 | ColorFormat::Alpha8 => {
            let bpp = format.bits_per_pixel();
            let max = (1u32 << bpp) - 1;
            let mut buf = PixelBuffer::new(BufferDesc::aligned(w, h, PixelFormat::A8, align))?;
            for y in 0..h {
                let src = img.row(y);
                let dst = buf.row_mut(y);
                for (x, d) in dst.iter_mut().enumerate() {
                    let v = u32::from(index_at(src, x as u32, bpp, BitOrder::MsbFirst));
                    *d = ((v * 255 + max / 2) / max) as u8;
                }
            }
            PreparedRaster::new(buf, None, cfg.index_bit_order, tint)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/prepare.rs"]
mod tests;
