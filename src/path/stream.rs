use kurbo::{Affine, BezPath, Point, Rect, Shape};

use crate::foundation::error::{VgError, VgResult};

/// Rule deciding which regions enclosed by a path are filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillRule {
    /// A point is inside when the winding number is non-zero.
    #[default]
    NonZero,
    /// A point is inside when it is enclosed an odd number of times.
    EvenOdd,
}

/// One path command with its coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCmd {
    /// Start a new sub-path.
    MoveTo(Point),
    /// Straight segment to a point.
    LineTo(Point),
    /// Quadratic Bézier (control, end).
    QuadTo(Point, Point),
    /// Cubic Bézier (control 1, control 2, end).
    CubicTo(Point, Point, Point),
    /// Close the current sub-path. A following drawing command continues from its start point.
    Close,
    /// Terminates the stream.
    End,
}

impl PathCmd {
    fn end_point(self) -> Option<Point> {
        match self {
            Self::MoveTo(p) | Self::LineTo(p) | Self::QuadTo(_, p) | Self::CubicTo(_, _, p) => {
                Some(p)
            }
            Self::Close | Self::End => None,
        }
    }

    fn map_points(self, mut f: impl FnMut(Point) -> Point) -> Self {
        match self {
            Self::MoveTo(p) => Self::MoveTo(f(p)),
            Self::LineTo(p) => Self::LineTo(f(p)),
            Self::QuadTo(c, p) => Self::QuadTo(f(c), f(p)),
            Self::CubicTo(c1, c2, p) => Self::CubicTo(f(c1), f(c2), f(p)),
            other => other,
        }
    }
}

/// Ordered path commands. Built per draw call and never persisted.
///
/// A non-empty, finished stream starts with [`PathCmd::MoveTo`] and ends with [`PathCmd::End`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathStream {
    cmds: Vec<PathCmd>,
}

impl PathStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing allocation. The vector is cleared.
    pub fn from_vec(mut cmds: Vec<PathCmd>) -> Self {
        cmds.clear();
        Self { cmds }
    }

    /// Build a stream from already-formed commands, appending `End` if missing.
    pub fn from_cmds(cmds: impl IntoIterator<Item = PathCmd>) -> Self {
        let mut out = Self {
            cmds: cmds.into_iter().collect(),
        };
        if !out.cmds.is_empty() {
            out.end();
        }
        out
    }

    /// Give the allocation back.
    pub fn into_vec(self) -> Vec<PathCmd> {
        self.cmds
    }

    /// Commands in order.
    pub fn cmds(&self) -> &[PathCmd] {
        &self.cmds
    }

    /// Number of commands, `End` included.
    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    /// Return `true` when the stream holds no command at all.
    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Return `true` when the last command is `End`.
    pub fn is_ended(&self) -> bool {
        matches!(self.cmds.last(), Some(PathCmd::End))
    }

    /// Drop every command, keeping the allocation.
    pub fn clear(&mut self) {
        self.cmds.clear();
    }

    fn reopen(&mut self) {
        if self.is_ended() {
            self.cmds.pop();
        }
    }

    /// Start a new sub-path at `p`.
    pub fn move_to(&mut self, p: Point) {
        self.reopen();
        self.cmds.push(PathCmd::MoveTo(p));
    }

    /// Add a straight segment.
    pub fn line_to(&mut self, p: Point) {
        self.reopen();
        self.cmds.push(PathCmd::LineTo(p));
    }

    /// Add a quadratic segment.
    pub fn quad_to(&mut self, c: Point, p: Point) {
        self.reopen();
        self.cmds.push(PathCmd::QuadTo(c, p));
    }

    /// Add a cubic segment.
    pub fn cubic_to(&mut self, c1: Point, c2: Point, p: Point) {
        self.reopen();
        self.cmds.push(PathCmd::CubicTo(c1, c2, p));
    }

    /// Close the current sub-path.
    pub fn close(&mut self) {
        self.reopen();
        if !matches!(self.cmds.last(), None | Some(PathCmd::Close)) {
            self.cmds.push(PathCmd::Close);
        }
    }

    /// Terminate the stream. Idempotent.
    pub fn end(&mut self) {
        if !self.is_ended() {
            self.cmds.push(PathCmd::End);
        }
    }

    /// Last point emitted, if any.
    pub fn current_point(&self) -> Option<Point> {
        self.cmds.iter().rev().find_map(|c| c.end_point())
    }

    /// Append every command of `other` (except its `End`) and re-terminate.
    pub fn append(&mut self, other: &PathStream) {
        if other.is_empty() {
            return;
        }
        self.reopen();
        self.cmds.extend(
            other
                .cmds
                .iter()
                .copied()
                .filter(|c| !matches!(c, PathCmd::End)),
        );
        self.end();
    }

    /// Check the structural invariants: starts with `MoveTo`, a single trailing `End`.
    pub fn validate(&self) -> VgResult<()> {
        let Some((first, rest)) = self.cmds.split_first() else {
            return Ok(());
        };
        if !matches!(first, PathCmd::MoveTo(_)) {
            return Err(VgError::validation("path stream must start with MoveTo"));
        }
        if !self.is_ended() {
            return Err(VgError::validation("path stream must end with End"));
        }
        if rest[..rest.len() - 1]
            .iter()
            .any(|c| matches!(c, PathCmd::End))
        {
            return Err(VgError::validation("End may only terminate the stream"));
        }
        let finite = |p: &Point| p.x.is_finite() && p.y.is_finite();
        let all_finite = self.cmds.iter().all(|c| match c {
            PathCmd::MoveTo(p) | PathCmd::LineTo(p) => finite(p),
            PathCmd::QuadTo(c, p) => finite(c) && finite(p),
            PathCmd::CubicTo(c1, c2, p) => finite(c1) && finite(c2) && finite(p),
            PathCmd::Close | PathCmd::End => true,
        });
        if !all_finite {
            return Err(VgError::validation("path stream contains non-finite coordinates"));
        }
        Ok(())
    }

    /// Convert to a `kurbo` path. Drawing after `Close` restarts at the closed sub-path's start.
    pub fn to_bez_path(&self) -> BezPath {
        let mut out = BezPath::new();
        let mut start: Option<Point> = None;
        let mut open = false;
        for &c in &self.cmds {
            if !open
                && let (Some(s), PathCmd::LineTo(_) | PathCmd::QuadTo(..) | PathCmd::CubicTo(..)) =
                    (start, c)
            {
                out.move_to(s);
                open = true;
            }
            match c {
                PathCmd::MoveTo(p) => {
                    out.move_to(p);
                    start = Some(p);
                    open = true;
                }
                PathCmd::LineTo(p) if open => out.line_to(p),
                PathCmd::QuadTo(c, p) if open => out.quad_to(c, p),
                PathCmd::CubicTo(c1, c2, p) if open => out.curve_to(c1, c2, p),
                PathCmd::Close if open => {
                    out.close_path();
                    open = false;
                }
                PathCmd::End => break,
                _ => {}
            }
        }
        out
    }

    /// Exact bounds of the drawn geometry (curve extrema included). `None` when nothing is drawn.
    pub fn bounds(&self) -> Option<Rect> {
        let bez = self.to_bez_path();
        if bez.segments().next().is_none() {
            return None;
        }
        Some(bez.bounding_box())
    }

    /// A copy with every point mapped through `xf`.
    pub fn transformed(&self, xf: Affine) -> PathStream {
        Self {
            cmds: self.cmds.iter().map(|c| c.map_points(|p| xf * p)).collect(),
        }
    }

    /// A copy with every sub-path traversed in the opposite direction.
    ///
    /// Sub-paths are treated as closed; the reversed stream closes each of them.
    pub fn reversed(&self) -> PathStream {
        let mut out = PathStream::new();
        let mut sub: Vec<PathCmd> = Vec::new();
        for &c in &self.cmds {
            match c {
                PathCmd::MoveTo(_) => {
                    flush_reversed(&sub, &mut out);
                    sub.clear();
                    sub.push(c);
                }
                PathCmd::Close | PathCmd::End => {
                    flush_reversed(&sub, &mut out);
                    // Keep the start point so drawing after Close continues from it.
                    let start = sub.first().copied();
                    sub.clear();
                    sub.extend(start);
                }
                _ => sub.push(c),
            }
        }
        flush_reversed(&sub, &mut out);
        if !out.is_empty() {
            out.end();
        }
        out
    }
}

fn flush_reversed(sub: &[PathCmd], out: &mut PathStream) {
    let Some(PathCmd::MoveTo(start)) = sub.first().copied() else {
        return;
    };
    if sub.len() < 2 {
        return;
    }
    let mut prev = Vec::with_capacity(sub.len());
    let mut cur = start;
    for c in sub {
        prev.push(cur);
        if let Some(p) = c.end_point() {
            cur = p;
        }
    }
    out.move_to(cur);
    for (i, c) in sub.iter().enumerate().skip(1).rev() {
        let from = prev[i];
        match *c {
            PathCmd::LineTo(_) => out.line_to(from),
            PathCmd::QuadTo(ctrl, _) => out.quad_to(ctrl, from),
            PathCmd::CubicTo(c1, c2, _) => out.cubic_to(c2, c1, from),
            _ => {}
        }
    }
    out.close();
}

#[cfg(test)]
#[path = "../../tests/unit/path/stream.rs"]
mod tests;
