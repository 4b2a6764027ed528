use crate::buffer::descriptor::{BufferDesc, PixelBuffer};
use crate::buffer::format::PixelFormat;
use crate::foundation::config::BitOrder;
use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{VgError, VgResult};
use crate::foundation::math::mul_div255;

const R_MASK: u16 = 0b1111_1000_0000_0000;
const G_MASK: u16 = 0b0000_0111_1110_0000;
const B_MASK: u16 = 0b0000_0000_0001_1111;

/// Convert little-endian RGB565 pixels into opaque RGBA8.
///
/// `src` holds `n * 2` bytes, `dst` receives `n * 4` bytes.
pub fn convert_rgb565_to_rgba8(src: &[u8], dst: &mut [u8]) -> VgResult<()> {
    if !src.len().is_multiple_of(2) || dst.len() != src.len() * 2 {
        return Err(VgError::validation(
            "rgb565 -> rgba8 expects n*2 source and n*4 destination bytes",
        ));
    }
    for (s, d) in src.chunks_exact(2).zip(dst.chunks_exact_mut(4)) {
        let v = u16::from_le_bytes([s[0], s[1]]);
        let r5 = ((v & R_MASK) >> 11) as u8;
        let g6 = ((v & G_MASK) >> 5) as u8;
        let b5 = (v & B_MASK) as u8;
        d[0] = (r5 << 3) | (r5 >> 2);
        d[1] = (g6 << 2) | (g6 >> 4);
        d[2] = (b5 << 3) | (b5 >> 2);
        d[3] = 255;
    }
    Ok(())
}

/// Convert RGBA8 pixels into little-endian RGB565, dropping alpha.
pub fn convert_rgba8_to_rgb565(src: &[u8], dst: &mut [u8]) -> VgResult<()> {
    if !src.len().is_multiple_of(4) || dst.len() * 2 != src.len() {
        return Err(VgError::validation(
            "rgba8 -> rgb565 expects n*4 source and n*2 destination bytes",
        ));
    }
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(2)) {
        let v = ((u16::from(s[0]) & 0b1111_1000) << 8)
            | ((u16::from(s[1]) & 0b1111_1100) << 3)
            | (u16::from(s[2]) >> 3);
        d.copy_from_slice(&v.to_le_bytes());
    }
    Ok(())
}

/// Read the `x`-th packed index of a row.
pub(crate) fn index_at(row: &[u8], x: u32, bpp: u32, order: BitOrder) -> u8 {
    if bpp == 8 {
        return row[x as usize];
    }
    let bit = x * bpp;
    let byte = row[(bit / 8) as usize];
    let in_byte = bit % 8;
    let shift = match order {
        BitOrder::MsbFirst => 8 - bpp - in_byte,
        BitOrder::LsbFirst => in_byte,
    };
    (byte >> shift) & ((1u8 << bpp) - 1)
}

/// Reverse the order of the `bpp`-bit pixel groups inside every byte.
///
/// Converts between MSB-first and LSB-first packing; a no-op for 8-bit pixels.
pub(crate) fn reverse_pixel_order_in_place(bytes: &mut [u8], bpp: u32) {
    match bpp {
        1 => bytes.iter_mut().for_each(|b| *b = b.reverse_bits()),
        2 => bytes.iter_mut().for_each(|b| {
            let v = *b;
            *b = (v >> 6) | ((v >> 2) & 0b0000_1100) | ((v << 2) & 0b0011_0000) | (v << 6);
        }),
        4 => bytes.iter_mut().for_each(|b| *b = b.rotate_left(4)),
        _ => {}
    }
}

/// Expand an indexed buffer into premultiplied RGBA8 through `palette`.
pub(crate) fn expand_indexed(
    src: &PixelBuffer,
    palette: &[Rgba8Premul],
    order: BitOrder,
) -> VgResult<PixelBuffer> {
    let fmt = src.format();
    if !fmt.is_indexed() {
        return Err(VgError::validation(format!(
            "expand_indexed expects an indexed buffer, got {fmt:?}"
        )));
    }
    if palette.len() < fmt.palette_len() {
        return Err(VgError::validation(format!(
            "{fmt:?} needs {} palette entries, got {}",
            fmt.palette_len(),
            palette.len()
        )));
    }
    let bpp = fmt.bits_per_pixel();
    let mut out = PixelBuffer::new(BufferDesc::new(
        src.width(),
        src.height(),
        PixelFormat::Rgba8Premul,
    ))?;
    for y in 0..src.height() {
        let row = src.row(y);
        let dst = out.row_mut(y);
        for x in 0..src.width() {
            let idx = index_at(row, x, bpp, order) as usize;
            let o = x as usize * 4;
            dst[o..o + 4].copy_from_slice(&palette[idx].to_array());
        }
    }
    Ok(out)
}

/// Expand an A8 coverage buffer into premultiplied RGBA8 tinted with `color`.
pub(crate) fn expand_alpha(src: &PixelBuffer, color: Rgba8Premul) -> VgResult<PixelBuffer> {
    if src.format() != PixelFormat::A8 {
        return Err(VgError::validation(format!(
            "expand_alpha expects an A8 buffer, got {:?}",
            src.format()
        )));
    }
    let mut out = PixelBuffer::new(BufferDesc::new(
        src.width(),
        src.height(),
        PixelFormat::Rgba8Premul,
    ))?;
    let c = color.to_array();
    for y in 0..src.height() {
        let row = src.row(y);
        let dst = out.row_mut(y);
        for (&cov, d) in row.iter().zip(dst.chunks_exact_mut(4)) {
            for i in 0..4 {
                d[i] = mul_div255(c[i], cov);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/buffer/convert.rs"]
mod tests;
