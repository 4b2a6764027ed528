use anyhow::Context;

use crate::assets::raster::{ColorFormat, MAX_DIMENSION, RasterImage};
use crate::foundation::error::{VgError, VgResult};

impl RasterImage {
    /// Decode an encoded PNG/JPEG/... file into a raster container.
    ///
    /// Fully opaque images become [`ColorFormat::TrueColor`], others
    /// [`ColorFormat::TrueColorAlpha`] with straight alpha.
    pub fn from_encoded(bytes: &[u8]) -> VgResult<Self> {
        let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(VgError::unsupported_format(format!(
                "{width}x{height} image exceeds the {MAX_DIMENSION}px container limit"
            )));
        }

        let raw = rgba.into_raw();
        if raw.chunks_exact(4).all(|px| px[3] == 255) {
            let rgb = raw
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            return Self::new(ColorFormat::TrueColor, width, height, Vec::new(), rgb);
        }
        Self::new(ColorFormat::TrueColorAlpha, width, height, Vec::new(), raw)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/import.rs"]
mod tests;
