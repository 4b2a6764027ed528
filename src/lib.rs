//! vgport is a 2D vector path rendering and compositing engine for an embedded GUI toolkit.
//!
//! Draw calls flow through four stages:
//!
//! - Build a [`PathStream`] for a [`Primitive`] with [`build_path`]
//! - Fold the toolkit's active masks into it with [`apply_masks`]
//! - Prepare image sources once through the [`ImageCache`]
//! - Fill through a [`FillDispatcher`] on a [`Device`], accelerated by [`VelloDevice`] and backed
//!   by the [`SoftwareDevice`] compositing kernels
//!
//! [`Renderer`] wraps all of it behind per-primitive calls that report a [`DrawStatus`] and never
//! fail.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod buffer;
mod foundation;
mod mask;
mod paint;
mod path;
mod render;

pub use crate::foundation::config::{BitOrder, EngineConfig};
pub use crate::foundation::core::{
    Affine, Area, OPA_COVER, OPA_TRANSP, Opacity, Point, Rgba8, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{DeviceError, VgError, VgResult};
pub use kurbo::{BezPath, Rect};

pub use crate::buffer::convert::{convert_rgb565_to_rgba8, convert_rgba8_to_rgb565};
pub use crate::buffer::descriptor::{BufferDesc, PixelBuffer};
pub use crate::buffer::format::PixelFormat;

pub use crate::path::arc::{
    KAPPA, append_arc, append_circle, append_rounded_rect, rounded_rect_contains,
};
pub use crate::path::builder::{Dash, LineCap, MAX_DASH_SPANS, Primitive, build_path};
pub use crate::path::scratch::{ScratchPool, ScratchPoolOpts, ScratchPoolStats, ScratchStream};
pub use crate::path::stream::{FillRule, PathCmd, PathStream};

pub use crate::mask::apply::{MaskOutcome, apply_masks};
pub use crate::mask::stack::{FadeAxis, LineSide, MaskId, MaskKind, MaskList, MaskStack};

pub use crate::assets::cache::{ImageCache, ImageCacheStats};
pub use crate::assets::prepare::{
    DecodedImage, ImageId, ImageSource, ImageTag, PreparedImage, PreparedRaster, Recolor, decode,
    prepare_image, prepare_raster,
};
pub use crate::assets::raster::{ColorFormat, MAX_DIMENSION, RasterHeader, RasterImage};
pub use crate::assets::vector::{
    VectorImage, VectorObject, VectorPaint, VectorStop, decode_vector_image, encode_vector_image,
    is_vector_container,
};

pub use crate::paint::fill::{BlendMode, FillDesc, FillSource, ImagePattern, PatternTransform};
pub use crate::paint::gradient::{
    GradientRamp, GradientShape, GradientStop, RampCache, RampCacheStats, RampLut,
};

pub use crate::render::blend::{BlendKernel, Blender, blend_fill, blend_image};
pub use crate::render::device::{Device, DeviceOp, DevicePaint};
pub use crate::render::dispatch::FillDispatcher;
pub use crate::render::fallback::{FallbackDevice, FallbackStats};
pub use crate::render::renderer::{ArcStroke, DrawStatus, DrawTarget, LineStroke, Renderer};
pub use crate::render::software::SoftwareDevice;
pub use crate::render::vello::VelloDevice;
