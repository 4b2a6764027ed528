use crate::buffer::format::PixelFormat;
use crate::foundation::core::{Area, Rgba8Premul};
use crate::foundation::error::{VgError, VgResult};
use crate::foundation::math::align_up;

/// Width/height/stride/format metadata of a pixel buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    /// Visible width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes between the starts of two consecutive rows.
    pub stride: u32,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Whether the memory uses the accelerator's tiled layout.
    pub tiled: bool,
}

impl BufferDesc {
    /// Tightly packed, linear layout.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            stride: format.row_bytes(width),
            format,
            tiled: false,
        }
    }

    /// Linear layout whose rows are padded to a multiple of `align_px` pixels.
    pub fn aligned(width: u32, height: u32, format: PixelFormat, align_px: u32) -> Self {
        Self {
            width,
            height,
            stride: format.row_bytes(align_up(width.max(1), align_px)),
            format,
            tiled: false,
        }
    }

    /// Total bytes described (`stride * height`).
    pub fn byte_len(&self) -> usize {
        (self.stride as usize).saturating_mul(self.height as usize)
    }

    /// Whole-buffer area.
    pub fn area(&self) -> Area {
        Area::from_xywh(0, 0, self.width, self.height)
    }

    /// Check `stride >= width * bytes-per-pixel`.
    pub fn validate(&self) -> VgResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VgError::validation("buffer dimensions must be non-zero"));
        }
        if self.stride < self.format.row_bytes(self.width) {
            return Err(VgError::validation(format!(
                "stride {} is smaller than a {}px row of {:?}",
                self.stride, self.width, self.format
            )));
        }
        Ok(())
    }

    /// Source buffers additionally need their padded row width to be a multiple of `align_px`.
    pub fn validate_source(&self, align_px: u32) -> VgResult<()> {
        self.validate()?;
        let padded = self.format.pixels_per_stride(self.stride);
        if align_px > 1 && padded % align_px != 0 {
            return Err(VgError::validation(format!(
                "source row of {padded}px is not a multiple of {align_px}px"
            )));
        }
        Ok(())
    }
}

/// Owned pixel memory plus its descriptor.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    desc: BufferDesc,
    data: Vec<u8>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("desc", &self.desc)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl PixelBuffer {
    /// Allocate a zeroed buffer. Allocation failure is reported, not aborted on.
    pub fn new(desc: BufferDesc) -> VgResult<Self> {
        desc.validate()?;
        let len = desc.byte_len();
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| {
            VgError::out_of_memory(format!(
                "{len} bytes for a {}x{} buffer",
                desc.width, desc.height
            ))
        })?;
        data.resize(len, 0);
        Ok(Self { desc, data })
    }

    /// Zeroed, tightly packed premultiplied RGBA8 buffer.
    pub fn new_rgba(width: u32, height: u32) -> VgResult<Self> {
        Self::new(BufferDesc::new(width, height, PixelFormat::Rgba8Premul))
    }

    /// Wrap existing bytes. `data` must cover `stride * height` bytes.
    pub fn from_parts(desc: BufferDesc, data: Vec<u8>) -> VgResult<Self> {
        desc.validate()?;
        if data.len() < desc.byte_len() {
            return Err(VgError::validation(format!(
                "buffer holds {} bytes, descriptor needs {}",
                data.len(),
                desc.byte_len()
            )));
        }
        Ok(Self { desc, data })
    }

    /// Descriptor of this buffer.
    pub fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    /// Visible width in pixels.
    pub fn width(&self) -> u32 {
        self.desc.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.desc.format
    }

    /// Whole-buffer area.
    pub fn area(&self) -> Area {
        self.desc.area()
    }

    /// Raw bytes, including row padding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Raw mutable bytes, including row padding.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes of row `y`, limited to the visible width.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.desc.stride as usize;
        let len = self.desc.format.row_bytes(self.desc.width) as usize;
        &self.data[start..start + len]
    }

    /// Mutable bytes of row `y`, limited to the visible width.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.desc.stride as usize;
        let len = self.desc.format.row_bytes(self.desc.width) as usize;
        &mut self.data[start..start + len]
    }

    /// Read an RGBA8 pixel. `None` when out of bounds or not an RGBA8 buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8Premul> {
        if self.desc.format != PixelFormat::Rgba8Premul
            || x >= self.desc.width
            || y >= self.desc.height
        {
            return None;
        }
        let i = y as usize * self.desc.stride as usize + x as usize * 4;
        Some(Rgba8Premul::from_array([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]))
    }

    /// Write an RGBA8 pixel. Ignored when out of bounds or not an RGBA8 buffer.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: Rgba8Premul) {
        if self.desc.format != PixelFormat::Rgba8Premul
            || x >= self.desc.width
            || y >= self.desc.height
        {
            return;
        }
        let i = y as usize * self.desc.stride as usize + x as usize * 4;
        self.data[i..i + 4].copy_from_slice(&px.to_array());
    }

    /// Fill every visible RGBA8 pixel with `px`.
    pub fn fill(&mut self, px: Rgba8Premul) {
        let bytes = px.to_array();
        for y in 0..self.desc.height {
            for d in self.row_mut(y).chunks_exact_mut(4) {
                d.copy_from_slice(&bytes);
            }
        }
    }

    /// Copy the visible pixels into a tightly packed vector.
    pub fn to_packed_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.desc.format.row_bytes(self.desc.width) as usize * self.desc.height as usize,
        );
        for y in 0..self.desc.height {
            out.extend_from_slice(self.row(y));
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/buffer/descriptor.rs"]
mod tests;
