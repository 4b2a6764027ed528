use kurbo::{BezPath, PathEl, Point};

use crate::foundation::core::Area;
use crate::foundation::error::{VgError, VgResult};
use crate::path::stream::FillRule;

/// Vertical samples per pixel row.
const SUBSAMPLES: u32 = 4;

#[derive(Clone, Copy, Debug)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    winding: i32,
}

/// Anti-aliased coverage of a path over an area, one byte per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Coverage {
    area: Area,
    data: Vec<u8>,
}

impl Coverage {
    pub(crate) fn area(&self) -> Area {
        self.area
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn row(&self, y: i32) -> &[u8] {
        let w = self.area.width() as usize;
        let start = (y - self.area.y0) as usize * w;
        &self.data[start..start + w]
    }

    pub(crate) fn row_mut(&mut self, y: i32) -> &mut [u8] {
        let w = self.area.width() as usize;
        let start = (y - self.area.y0) as usize * w;
        &mut self.data[start..start + w]
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.data.iter().all(|&c| c == 0)
    }

    /// Multiply `other` into this coverage; pixels outside `other` become uncovered.
    pub(crate) fn intersect(&mut self, other: &Coverage) {
        let w = self.area.width() as usize;
        for (i, c) in self.data.iter_mut().enumerate() {
            let x = self.area.x0 + (i % w) as i32;
            let y = self.area.y0 + (i / w) as i32;
            let o = if other.area.contains(x, y) {
                other.row(y)[(x - other.area.x0) as usize]
            } else {
                0
            };
            *c = crate::foundation::math::mul_div255(*c, o);
        }
    }
}

fn push_edge(edges: &mut Vec<Edge>, a: Point, b: Point) {
    if a.y == b.y {
        return;
    }
    let (p, q, winding) = if a.y < b.y { (a, b, 1) } else { (b, a, -1) };
    edges.push(Edge {
        x0: p.x,
        y0: p.y,
        x1: q.x,
        y1: q.y,
        winding,
    });
}

/// Flatten `path` into edges; every subpath is implicitly closed.
fn collect_edges(path: &BezPath, tolerance: f64) -> Vec<Edge> {
    let mut edges = Vec::new();
    let mut start = Point::ZERO;
    let mut cur = Point::ZERO;
    let mut open = false;
    kurbo::flatten(path, tolerance, |el| match el {
        PathEl::MoveTo(p) => {
            if open {
                push_edge(&mut edges, cur, start);
            }
            start = p;
            cur = p;
            open = true;
        }
        PathEl::LineTo(p) => {
            push_edge(&mut edges, cur, p);
            cur = p;
        }
        PathEl::ClosePath => {
            push_edge(&mut edges, cur, start);
            cur = start;
        }
        // flatten only emits lines
        PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => {
            push_edge(&mut edges, cur, p);
            cur = p;
        }
    });
    if open {
        push_edge(&mut edges, cur, start);
    }
    edges
}

/// Add horizontal coverage of the span `[xa, xb)` to `acc` (indexed from `x_origin`).
fn add_span(acc: &mut [f32], x_origin: i32, xa: f64, xb: f64) {
    let lo = f64::from(x_origin);
    let hi = lo + acc.len() as f64;
    let (xa, xb) = (xa.max(lo), xb.min(hi));
    if xb <= xa {
        return;
    }
    let first = (xa.floor() as i32 - x_origin) as usize;
    let last = ((xb.ceil() as i32 - x_origin) as usize).min(acc.len());
    for (i, a) in acc.iter_mut().enumerate().take(last).skip(first) {
        let px0 = lo + i as f64;
        let cov = (xb.min(px0 + 1.0) - xa.max(px0)).max(0.0);
        *a += cov as f32;
    }
}

/// Rasterize `path` under `rule` into coverage over `clip`.
///
/// Returns `None` when the path does not touch `clip`.
pub(crate) fn rasterize(
    path: &BezPath,
    rule: FillRule,
    clip: Area,
    tolerance: f64,
) -> VgResult<Option<Coverage>> {
    if tolerance.is_nan() || tolerance <= 0.0 {
        return Err(VgError::validation("flattening tolerance must be positive"));
    }
    let edges = collect_edges(path, tolerance);
    if edges.is_empty() {
        return Ok(None);
    }
    let bbox = edges.iter().fold(
        kurbo::Rect::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |r, e| {
            kurbo::Rect::new(
                r.x0.min(e.x0.min(e.x1)),
                r.y0.min(e.y0),
                r.x1.max(e.x0.max(e.x1)),
                r.y1.max(e.y1),
            )
        },
    );
    let Some(area) = Area::enclosing(bbox).intersect(clip) else {
        return Ok(None);
    };

    let w = area.width() as usize;
    let mut data = Vec::new();
    data.try_reserve_exact(w * area.height() as usize)
        .map_err(|_| VgError::out_of_memory("coverage buffer"))?;
    data.resize(w * area.height() as usize, 0u8);

    let mut acc = vec![0f32; w];
    let mut crossings: Vec<(f64, i32)> = Vec::new();
    let step = 1.0 / f64::from(SUBSAMPLES);
    for (row, y) in (area.y0..area.y1).enumerate() {
        acc.fill(0.0);
        for s in 0..SUBSAMPLES {
            let sy = f64::from(y) + (f64::from(s) + 0.5) * step;
            crossings.clear();
            for e in &edges {
                if sy >= e.y0 && sy < e.y1 {
                    let t = (sy - e.y0) / (e.y1 - e.y0);
                    crossings.push((e.x0 + t * (e.x1 - e.x0), e.winding));
                }
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            for pair in crossings.windows(2) {
                winding += pair[0].1;
                let inside = match rule {
                    FillRule::NonZero => winding != 0,
                    FillRule::EvenOdd => winding % 2 != 0,
                };
                if inside {
                    add_span(&mut acc, area.x0, pair[0].0, pair[1].0);
                }
            }
        }
        let out = &mut data[row * w..(row + 1) * w];
        for (o, a) in out.iter_mut().zip(&acc) {
            *o = ((f64::from(*a) * step).clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }

    Ok(Some(Coverage { area, data }))
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
