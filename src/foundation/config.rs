use crate::foundation::core::Rgba8;
use crate::foundation::error::{VgError, VgResult};

/// Packing of sub-byte index pixels expected by the accelerator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitOrder {
    /// First pixel in the most significant bits (the on-disk container convention).
    MsbFirst,
    /// First pixel in the least significant bits.
    #[default]
    LsbFirst,
}

/// Engine-wide tunables.
///
/// Defaults are usable as-is; JSON files and `VGPORT_*` environment variables can override them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Width alignment (pixels) for prepared source buffers. Power of two.
    pub source_align_px: u32,
    /// Width of materialized gradient lookup images.
    pub gradient_ramp_width: u32,
    /// Maximum number of prepared images retained by the cache.
    pub image_cache_capacity: usize,
    /// Maximum number of idle path scratch buffers retained.
    pub scratch_pool_max_buffers: usize,
    /// Scratch buffers grown beyond this many commands are dropped on release.
    pub scratch_pool_max_cmds: usize,
    /// Un-transformed image draws at or below this pixel count bypass the accelerator.
    pub small_blit_max_px: u64,
    /// Index packing expected by the accelerator.
    pub index_bit_order: BitOrder,
    /// Use the chunked blend kernels instead of the scalar reference.
    pub vectorized_blend: bool,
    /// Curve flattening tolerance of the software rasterizer, in pixels.
    pub curve_tolerance: f64,
    /// Color that chroma-keyed images treat as transparent (alpha ignored).
    pub chroma_key: Rgba8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source_align_px: 16,
            gradient_ramp_width: 256,
            image_cache_capacity: 64,
            scratch_pool_max_buffers: 8,
            scratch_pool_max_cmds: 4096,
            small_blit_max_px: 64 * 64,
            index_bit_order: BitOrder::LsbFirst,
            vectorized_blend: true,
            curve_tolerance: 0.2,
            chroma_key: Rgba8::rgb(0, 255, 0),
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON document; missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> VgResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| VgError::validation(format!("invalid engine config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `VGPORT_*` environment overrides. Unparseable values are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|k| std::env::var(k).ok())
    }

    pub(crate) fn with_overrides_from(mut self, get: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(v: Option<String>) -> Option<T> {
            v.and_then(|s| s.trim().parse::<T>().ok())
        }

        if let Some(v) =
            parsed::<u32>(get("VGPORT_SOURCE_ALIGN_PX")).filter(|v| v.is_power_of_two())
        {
            self.source_align_px = v;
        }
        if let Some(v) = parsed::<u32>(get("VGPORT_GRADIENT_RAMP_WIDTH")) {
            self.gradient_ramp_width = v;
        }
        if let Some(v) = parsed::<usize>(get("VGPORT_IMAGE_CACHE_CAPACITY")).filter(|&n| n > 0) {
            self.image_cache_capacity = v;
        }
        if let Some(v) = parsed::<u64>(get("VGPORT_SMALL_BLIT_MAX_PX")) {
            self.small_blit_max_px = v;
        }
        if let Some(v) = parsed::<bool>(get("VGPORT_VECTORIZED_BLEND")) {
            self.vectorized_blend = v;
        }
        if let Some(v) =
            parsed::<f64>(get("VGPORT_CURVE_TOLERANCE")).filter(|v| v.is_finite() && *v > 0.0)
        {
            self.curve_tolerance = v;
        }
        self
    }

    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> VgResult<()> {
        if self.source_align_px == 0 || !self.source_align_px.is_power_of_two() {
            return Err(VgError::validation(
                "source_align_px must be a non-zero power of two",
            ));
        }
        if !(2..=1024).contains(&self.gradient_ramp_width) {
            return Err(VgError::validation(
                "gradient_ramp_width must be in 2..=1024",
            ));
        }
        if !self.curve_tolerance.is_finite() || self.curve_tolerance <= 0.0 {
            return Err(VgError::validation(
                "curve_tolerance must be finite and > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
