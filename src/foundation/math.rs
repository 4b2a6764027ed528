use std::hash::Hasher;

/// FNV-1a [`Hasher`] keyed on gradient ramp contents.
///
/// Unlike the std `DefaultHasher` the result is stable between runs, so ramp fingerprints can be
/// logged and compared across processes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RampHasher(u64);

impl Default for RampHasher {
    fn default() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }
}

impl Hasher for RampHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

/// Rounded `x / 255` for products of two 8-bit channels.
#[inline]
pub(crate) fn div255(x: u32) -> u16 {
    ((x + 127) / 255) as u16
}

/// Scale channel `c` by `k / 255`, rounding to nearest.
#[inline]
pub(crate) fn mul_div255(c: u8, k: u8) -> u8 {
    div255(u32::from(c) * u32::from(k)) as u8
}

/// Round `v` up to the next multiple of `align` (`align` must be a power of two).
pub(crate) fn align_up(v: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two());
    v.saturating_add(align - 1) & !(align - 1)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
