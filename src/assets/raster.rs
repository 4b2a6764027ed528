//! Tagged raster image container.
//!
//! Layout: a 4-byte little-endian header `cf:5 | zero:3 | reserved:2 | w:11 | h:11`, then for
//! indexed formats a palette of `2^bpp` straight RGBA entries, then pixel rows. Rows are tightly
//! packed; sub-byte pixels are MSB-first.

use crate::foundation::core::Rgba8;
use crate::foundation::error::{VgError, VgResult};

/// Largest width or height the header can carry.
pub const MAX_DIMENSION: u32 = (1 << 11) - 1;

/// Pixel encoding of a raster image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColorFormat {
    /// 24-bit RGB.
    TrueColor = 4,
    /// 32-bit RGBA, straight alpha.
    TrueColorAlpha = 5,
    /// 24-bit RGB; pixels equal to the chroma key are transparent.
    TrueColorChromaKeyed = 6,
    /// 1-bit palette index.
    Indexed1 = 7,
    /// 2-bit palette index.
    Indexed2 = 8,
    /// 4-bit palette index.
    Indexed4 = 9,
    /// 8-bit palette index.
    Indexed8 = 10,
    /// 1-bit coverage.
    Alpha1 = 11,
    /// 2-bit coverage.
    Alpha2 = 12,
    /// 4-bit coverage.
    Alpha4 = 13,
    /// 8-bit coverage.
    Alpha8 = 14,
}

impl ColorFormat {
    /// Parse the 5-bit header code.
    pub fn from_code(code: u8) -> VgResult<Self> {
        Ok(match code {
            4 => Self::TrueColor,
            5 => Self::TrueColorAlpha,
            6 => Self::TrueColorChromaKeyed,
            7 => Self::Indexed1,
            8 => Self::Indexed2,
            9 => Self::Indexed4,
            10 => Self::Indexed8,
            11 => Self::Alpha1,
            12 => Self::Alpha2,
            13 => Self::Alpha4,
            14 => Self::Alpha8,
            other => {
                return Err(VgError::unsupported_format(format!(
                    "raster color format code {other}"
                )));
            }
        })
    }

    /// 5-bit header code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Bits per stored pixel.
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            Self::TrueColor | Self::TrueColorChromaKeyed => 24,
            Self::TrueColorAlpha => 32,
            Self::Indexed1 | Self::Alpha1 => 1,
            Self::Indexed2 | Self::Alpha2 => 2,
            Self::Indexed4 | Self::Alpha4 => 4,
            Self::Indexed8 | Self::Alpha8 => 8,
        }
    }

    /// Return `true` for palette formats.
    pub fn is_indexed(self) -> bool {
        matches!(
            self,
            Self::Indexed1 | Self::Indexed2 | Self::Indexed4 | Self::Indexed8
        )
    }

    /// Return `true` for coverage-only formats.
    pub fn is_alpha_only(self) -> bool {
        matches!(
            self,
            Self::Alpha1 | Self::Alpha2 | Self::Alpha4 | Self::Alpha8
        )
    }

    /// Palette entries stored before the pixels.
    pub fn palette_len(self) -> usize {
        if self.is_indexed() {
            1 << self.bits_per_pixel()
        } else {
            0
        }
    }

    /// Bytes of one tightly packed row.
    pub fn row_bytes(self, width: u32) -> usize {
        (width as usize * self.bits_per_pixel() as usize).div_ceil(8)
    }
}

/// Decoded 4-byte header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterHeader {
    /// Pixel encoding.
    pub format: ColorFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl RasterHeader {
    /// Pack into the little-endian header word.
    pub fn to_bytes(self) -> VgResult<[u8; 4]> {
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(VgError::validation(format!(
                "raster {}x{} exceeds the {MAX_DIMENSION}px header limit",
                self.width, self.height
            )));
        }
        let word = u32::from(self.format.code()) | (self.width << 10) | (self.height << 21);
        Ok(word.to_le_bytes())
    }

    /// Unpack a header word.
    pub fn from_bytes(bytes: [u8; 4]) -> VgResult<Self> {
        let word = u32::from_le_bytes(bytes);
        if (word >> 5) & 0b111 != 0 {
            return Err(VgError::validation("raster header zero bits are set"));
        }
        Ok(Self {
            format: ColorFormat::from_code((word & 0x1f) as u8)?,
            width: (word >> 10) & MAX_DIMENSION,
            height: (word >> 21) & MAX_DIMENSION,
        })
    }
}

/// A raster image in container form: header fields, optional palette and packed rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    header: RasterHeader,
    palette: Vec<Rgba8>,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Assemble an image, checking the palette and pixel sizes against the format.
    pub fn new(
        format: ColorFormat,
        width: u32,
        height: u32,
        palette: Vec<Rgba8>,
        pixels: Vec<u8>,
    ) -> VgResult<Self> {
        let header = RasterHeader {
            format,
            width,
            height,
        };
        if width == 0 || height == 0 {
            return Err(VgError::validation("raster dimensions must be non-zero"));
        }
        header.to_bytes()?;
        if palette.len() != format.palette_len() {
            return Err(VgError::validation(format!(
                "{format:?} needs {} palette entries, got {}",
                format.palette_len(),
                palette.len()
            )));
        }
        let need = format.row_bytes(width) * height as usize;
        if pixels.len() != need {
            return Err(VgError::validation(format!(
                "{format:?} {width}x{height} needs {need} pixel bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            header,
            palette,
            pixels,
        })
    }

    /// Straight RGBA image.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> VgResult<Self> {
        Self::new(ColorFormat::TrueColorAlpha, width, height, Vec::new(), rgba)
    }

    /// Header fields.
    pub fn header(&self) -> RasterHeader {
        self.header
    }

    /// Pixel encoding.
    pub fn format(&self) -> ColorFormat {
        self.header.format
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.header.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.header.height
    }

    /// Palette (empty for non-indexed formats).
    pub fn palette(&self) -> &[Rgba8] {
        &self.palette
    }

    /// Packed pixel rows.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes of row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let n = self.header.format.row_bytes(self.header.width);
        &self.pixels[y as usize * n..(y as usize + 1) * n]
    }

    /// Serialize header, palette and pixels.
    pub fn encode(&self) -> VgResult<Vec<u8>> {
        let mut out = Vec::with_capacity(4 + self.palette.len() * 4 + self.pixels.len());
        out.extend_from_slice(&self.header.to_bytes()?);
        for c in &self.palette {
            out.extend_from_slice(&[c.r, c.g, c.b, c.a]);
        }
        out.extend_from_slice(&self.pixels);
        Ok(out)
    }

    /// Parse a container. Trailing bytes are ignored.
    pub fn decode(bytes: &[u8]) -> VgResult<Self> {
        let Some((head, rest)) = bytes.split_first_chunk::<4>() else {
            return Err(VgError::validation("raster container shorter than its header"));
        };
        let header = RasterHeader::from_bytes(*head)?;
        let pal_bytes = header.format.palette_len() * 4;
        let pix_bytes = header.format.row_bytes(header.width) * header.height as usize;
        if rest.len() < pal_bytes + pix_bytes {
            return Err(VgError::validation(format!(
                "raster container truncated: {} bytes, need {}",
                rest.len(),
                pal_bytes + pix_bytes
            )));
        }
        let palette = rest[..pal_bytes]
            .chunks_exact(4)
            .map(|c| Rgba8::new(c[0], c[1], c[2], c[3]))
            .collect();
        let pixels = rest[pal_bytes..pal_bytes + pix_bytes].to_vec();
        Self::new(header.format, header.width, header.height, palette, pixels)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/raster.rs"]
mod tests;
