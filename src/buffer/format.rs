/// Pixel layouts understood by the devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PixelFormat {
    /// 32-bit premultiplied RGBA, bytes in `r, g, b, a` order.
    Rgba8Premul,
    /// 16-bit `rrrrrggg_gggbbbbb`, little-endian.
    Rgb565,
    /// 8-bit coverage.
    A8,
    /// 1-bit palette index.
    Index1,
    /// 2-bit palette index.
    Index2,
    /// 4-bit palette index.
    Index4,
    /// 8-bit palette index.
    Index8,
}

impl PixelFormat {
    /// Bits used by a single pixel.
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Rgba8Premul => 32,
            Self::Rgb565 => 16,
            Self::A8 | Self::Index8 => 8,
            Self::Index4 => 4,
            Self::Index2 => 2,
            Self::Index1 => 1,
        }
    }

    /// Return `true` for palette-indexed formats.
    pub fn is_indexed(self) -> bool {
        matches!(
            self,
            Self::Index1 | Self::Index2 | Self::Index4 | Self::Index8
        )
    }

    /// Number of palette entries for indexed formats, `0` otherwise.
    pub fn palette_len(self) -> usize {
        if self.is_indexed() {
            1usize << self.bits_per_pixel()
        } else {
            0
        }
    }

    /// Bytes needed to store `width` pixels (rounded up to a whole byte).
    pub fn row_bytes(self, width: u32) -> u32 {
        let bits = u64::from(width) * u64::from(self.bits_per_pixel());
        bits.div_ceil(8).min(u64::from(u32::MAX)) as u32
    }

    /// Pixels that fit in `stride` bytes.
    pub fn pixels_per_stride(self, stride: u32) -> u32 {
        ((u64::from(stride) * 8) / u64::from(self.bits_per_pixel())) as u32
    }
}
