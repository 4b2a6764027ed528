//! Compact pre-tessellated vector image container.
//!
//! All fields are little-endian. Header (48 bytes): magic `VGPV`, version `u16`, reserved `u16`,
//! object count `u32`, row-major 3x3 `f32` transform. One 68-byte record per object: bbox
//! `[f32; 4]`, path byte length `u32` (bit 31 is the "compressed" flag), 3x3 `f32` transform,
//! paint kind `u8`, fill rule `u8`, reserved `u16`, color (`0xRRGGBBAA`) or stop count `u32`.
//! Then every object's path bytes, then every gradient object's geometry and stops.

use kurbo::{Affine, Point, Rect};
use tracing::debug;

use crate::foundation::core::{Rgba8, Rgba8Premul};
use crate::foundation::error::{VgError, VgResult};
use crate::paint::gradient::{GradientRamp, GradientShape, GradientStop};
use crate::path::stream::{FillRule, PathCmd, PathStream};

/// Container magic.
pub const MAGIC: [u8; 4] = *b"VGPV";
/// Supported container version.
pub const VERSION: u16 = 1;

const HEADER_LEN: usize = 48;
const RECORD_LEN: usize = 68;
const COMPRESSED_FLAG: u32 = 1 << 31;

const OP_END: u8 = 0;
const OP_MOVE: u8 = 1;
const OP_LINE: u8 = 2;
const OP_QUAD: u8 = 3;
const OP_CUBIC: u8 = 4;
const OP_CLOSE: u8 = 5;

/// Gradient color stop as stored in the container (premultiplied once decoded).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VectorStop {
    /// Position, `0.0..=1.0`.
    pub offset: f32,
    /// Premultiplied color.
    pub color: Rgba8Premul,
}

/// Paint of one vector object.
#[derive(Clone, Debug, PartialEq)]
pub enum VectorPaint {
    /// Solid straight-alpha color.
    Solid(Rgba8),
    /// Linear gradient from `start` to `end` in object space.
    Linear {
        /// Ramp start.
        start: Point,
        /// Ramp end.
        end: Point,
        /// Stops.
        stops: Vec<VectorStop>,
    },
    /// Radial gradient in object space.
    Radial {
        /// Center.
        center: Point,
        /// Radius.
        radius: f64,
        /// Stops.
        stops: Vec<VectorStop>,
    },
}

impl VectorPaint {
    fn kind(&self) -> u8 {
        match self {
            Self::Solid(_) => 0,
            Self::Linear { .. } => 1,
            Self::Radial { .. } => 2,
        }
    }

    /// Gradient geometry and ramp, `None` for solid paints.
    pub fn gradient(&self) -> Option<(GradientShape, GradientRamp)> {
        let (shape, stops) = match self {
            Self::Solid(_) => return None,
            Self::Linear { start, end, stops } => (
                GradientShape::Linear {
                    start: *start,
                    end: *end,
                },
                stops,
            ),
            Self::Radial {
                center,
                radius,
                stops,
            } => (
                GradientShape::Radial {
                    center: *center,
                    radius: *radius,
                },
                stops,
            ),
        };
        let ramp = GradientRamp::new(stops.iter().map(|s| GradientStop {
            frac: (f64::from(s.offset).clamp(0.0, 1.0) * 255.0).round() as u8,
            color: s.color,
        }));
        Some((shape, ramp))
    }
}

/// One filled path of a vector image.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorObject {
    /// Bounding box in object space.
    pub bbox: Rect,
    /// Object transform.
    pub transform: Affine,
    /// Fill rule.
    pub fill_rule: FillRule,
    /// Paint.
    pub paint: VectorPaint,
    /// Path in object space.
    pub path: PathStream,
}

/// Decoded vector image; replayed as path draws, never rasterized up front.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorImage {
    /// Global transform.
    pub transform: Affine,
    /// Objects in paint order.
    pub objects: Vec<VectorObject>,
}

impl VectorImage {
    /// Union of the object bounding boxes mapped through their transforms.
    pub fn bounds(&self) -> Option<Rect> {
        self.objects
            .iter()
            .map(|o| (self.transform * o.transform).transform_rect_bbox(o.bbox))
            .reduce(|a, b| a.union(b))
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> VgResult<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.buf.len());
        let Some(end) = end else {
            return Err(VgError::validation(format!(
                "vector container truncated at byte {} (need {n} more)",
                self.pos
            )));
        };
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> VgResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> VgResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> VgResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self) -> VgResult<f32> {
        let v = f32::from_bits(self.u32()?);
        if !v.is_finite() {
            return Err(VgError::validation("vector container holds a non-finite number"));
        }
        Ok(v)
    }

    fn point(&mut self) -> VgResult<Point> {
        Ok(Point::new(f64::from(self.f32()?), f64::from(self.f32()?)))
    }

    fn matrix(&mut self) -> VgResult<Affine> {
        let mut m = [0f32; 9];
        for v in &mut m {
            *v = self.f32()?;
        }
        if m[6] != 0.0 || m[7] != 0.0 || m[8] != 1.0 {
            return Err(VgError::unsupported_format(
                "vector transform is not affine",
            ));
        }
        let f = |i: usize| f64::from(m[i]);
        Ok(Affine::new([f(0), f(3), f(1), f(4), f(2), f(5)]))
    }
}

struct Record {
    bbox: Rect,
    path_len: usize,
    transform: Affine,
    paint_kind: u8,
    fill_rule: FillRule,
    color_or_count: u32,
}

/// Return `true` when `bytes` starts with the vector container magic.
pub fn is_vector_container(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC)
}

/// Parse a vector container.
pub fn decode_vector_image(bytes: &[u8]) -> VgResult<VectorImage> {
    let mut r = Reader { buf: bytes, pos: 0 };
    if r.take(4)? != MAGIC {
        return Err(VgError::unsupported_format("missing vector container magic"));
    }
    let version = r.u16()?;
    if version != VERSION {
        return Err(VgError::unsupported_format(format!(
            "vector container version {version}"
        )));
    }
    let _reserved = r.u16()?;
    let count = r.u32()? as usize;
    let transform = r.matrix()?;
    debug_assert_eq!(r.pos, HEADER_LEN);

    if count.saturating_mul(RECORD_LEN) > bytes.len() - r.pos {
        return Err(VgError::validation(format!(
            "vector container declares {count} objects but is only {} bytes",
            bytes.len()
        )));
    }

    let mut records = Vec::with_capacity(count);
    for i in 0..count {
        let (x0, y0) = (r.f32()?, r.f32()?);
        let (x1, y1) = (r.f32()?, r.f32()?);
        let raw_len = r.u32()?;
        if raw_len & COMPRESSED_FLAG != 0 {
            debug!(object = i, "vector path marked compressed; flag is reserved and ignored");
        }
        let transform = r.matrix()?;
        let paint_kind = r.u8()?;
        let fill_rule = match r.u8()? {
            0 => FillRule::NonZero,
            1 => FillRule::EvenOdd,
            other => {
                return Err(VgError::validation(format!("unknown fill rule {other}")));
            }
        };
        let _reserved = r.u16()?;
        let color_or_count = r.u32()?;
        if paint_kind > 2 {
            return Err(VgError::unsupported_format(format!(
                "vector paint kind {paint_kind}"
            )));
        }
        records.push(Record {
            bbox: Rect::new(f64::from(x0), f64::from(y0), f64::from(x1), f64::from(y1)),
            path_len: (raw_len & !COMPRESSED_FLAG) as usize,
            transform,
            paint_kind,
            fill_rule,
            color_or_count,
        });
    }

    let mut paths = Vec::with_capacity(count);
    for rec in &records {
        paths.push(decode_path(r.take(rec.path_len)?)?);
    }

    let mut objects = Vec::with_capacity(count);
    for (rec, path) in records.into_iter().zip(paths) {
        let paint = match rec.paint_kind {
            0 => VectorPaint::Solid(Rgba8::from_u32(rec.color_or_count)),
            kind => {
                let (a, b) = (r.point()?, r.point()?);
                let mut stops = Vec::with_capacity(rec.color_or_count.min(256) as usize);
                for _ in 0..rec.color_or_count {
                    let offset = r.f32()?;
                    let color = Rgba8::from_u32(r.u32()?).premultiply();
                    stops.push(VectorStop { offset, color });
                }
                if kind == 1 {
                    VectorPaint::Linear {
                        start: a,
                        end: b,
                        stops,
                    }
                } else {
                    VectorPaint::Radial {
                        center: a,
                        radius: b.x,
                        stops,
                    }
                }
            }
        };
        objects.push(VectorObject {
            bbox: rec.bbox,
            transform: rec.transform,
            fill_rule: rec.fill_rule,
            paint,
            path,
        });
    }

    Ok(VectorImage { transform, objects })
}

fn decode_path(bytes: &[u8]) -> VgResult<PathStream> {
    let mut r = Reader { buf: bytes, pos: 0 };
    let mut out = PathStream::new();
    while r.pos < bytes.len() {
        match r.u8()? {
            OP_END => break,
            OP_MOVE => out.move_to(r.point()?),
            OP_LINE => out.line_to(r.point()?),
            OP_QUAD => {
                let c = r.point()?;
                out.quad_to(c, r.point()?);
            }
            OP_CUBIC => {
                let c1 = r.point()?;
                let c2 = r.point()?;
                out.cubic_to(c1, c2, r.point()?);
            }
            OP_CLOSE => out.close(),
            op => return Err(VgError::validation(format!("unknown path opcode {op}"))),
        }
    }
    if !out.is_empty() {
        out.end();
    }
    out.validate()?;
    Ok(out)
}

fn put_f32(out: &mut Vec<u8>, v: f64) {
    out.extend_from_slice(&(v as f32).to_le_bytes());
}

fn put_point(out: &mut Vec<u8>, p: Point) {
    put_f32(out, p.x);
    put_f32(out, p.y);
}

fn put_matrix(out: &mut Vec<u8>, xf: Affine) {
    let [a, b, c, d, e, f] = xf.as_coeffs();
    for v in [a, c, e, b, d, f, 0.0, 0.0, 1.0] {
        put_f32(out, v);
    }
}

fn encode_path(path: &PathStream) -> Vec<u8> {
    let mut out = Vec::with_capacity(path.len() * 9);
    for cmd in path.cmds() {
        match *cmd {
            PathCmd::MoveTo(p) => {
                out.push(OP_MOVE);
                put_point(&mut out, p);
            }
            PathCmd::LineTo(p) => {
                out.push(OP_LINE);
                put_point(&mut out, p);
            }
            PathCmd::QuadTo(c, p) => {
                out.push(OP_QUAD);
                put_point(&mut out, c);
                put_point(&mut out, p);
            }
            PathCmd::CubicTo(c1, c2, p) => {
                out.push(OP_CUBIC);
                put_point(&mut out, c1);
                put_point(&mut out, c2);
                put_point(&mut out, p);
            }
            PathCmd::Close => out.push(OP_CLOSE),
            PathCmd::End => out.push(OP_END),
        }
    }
    out
}

fn unpremultiply(c: Rgba8Premul) -> Rgba8 {
    if c.a == 0 {
        return Rgba8::TRANSPARENT;
    }
    let a = u32::from(c.a);
    let un = |v: u8| ((u32::from(v) * 255 + a / 2) / a).min(255) as u8;
    Rgba8::new(un(c.r), un(c.g), un(c.b), c.a)
}

/// Serialize a vector image. Coordinates are stored as `f32`.
pub fn encode_vector_image(img: &VectorImage) -> VgResult<Vec<u8>> {
    let count = u32::try_from(img.objects.len())
        .map_err(|_| VgError::validation("too many vector objects"))?;
    let paths: Vec<Vec<u8>> = img.objects.iter().map(|o| encode_path(&o.path)).collect();

    let mut out = Vec::with_capacity(HEADER_LEN + RECORD_LEN * img.objects.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    put_matrix(&mut out, img.transform);

    for (obj, path) in img.objects.iter().zip(&paths) {
        let path_len = u32::try_from(path.len())
            .ok()
            .filter(|&l| l & COMPRESSED_FLAG == 0)
            .ok_or_else(|| VgError::validation("vector path too long"))?;
        put_point(&mut out, Point::new(obj.bbox.x0, obj.bbox.y0));
        put_point(&mut out, Point::new(obj.bbox.x1, obj.bbox.y1));
        out.extend_from_slice(&path_len.to_le_bytes());
        put_matrix(&mut out, obj.transform);
        out.push(obj.paint.kind());
        out.push(match obj.fill_rule {
            FillRule::NonZero => 0,
            FillRule::EvenOdd => 1,
        });
        out.extend_from_slice(&0u16.to_le_bytes());
        let tail = match &obj.paint {
            VectorPaint::Solid(c) => c.to_u32(),
            VectorPaint::Linear { stops, .. } | VectorPaint::Radial { stops, .. } => {
                u32::try_from(stops.len()).map_err(|_| VgError::validation("too many stops"))?
            }
        };
        out.extend_from_slice(&tail.to_le_bytes());
    }

    for path in &paths {
        out.extend_from_slice(path);
    }

    for obj in &img.objects {
        let (a, b, stops) = match &obj.paint {
            VectorPaint::Solid(_) => continue,
            VectorPaint::Linear { start, end, stops } => (*start, *end, stops),
            VectorPaint::Radial {
                center,
                radius,
                stops,
            } => (*center, Point::new(*radius, 0.0), stops),
        };
        put_point(&mut out, a);
        put_point(&mut out, b);
        for s in stops {
            out.extend_from_slice(&s.offset.to_le_bytes());
            out.extend_from_slice(&unpremultiply(s.color).to_u32().to_le_bytes());
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/vector.rs"]
mod tests;
