use tracing::{debug, warn};

use crate::foundation::core::Area;
use crate::mask::stack::{MaskKind, MaskStack};
use crate::path::arc::append_rounded_rect;
use crate::path::stream::PathStream;

/// Result of [`apply_masks`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaskOutcome {
    /// At least one active mask affects the draw.
    pub had_mask: bool,
    /// Clip path to intersect with the shape, or `None` when the mask cannot be expressed as a
    /// path (with `had_mask`) or nothing needs clipping (without `had_mask`).
    ///
    /// The clip fills identically under both fill rules.
    pub augmented: Option<PathStream>,
}

impl MaskOutcome {
    /// Return `true` when the caller must fall back to per-pixel masked compositing.
    pub fn needs_pixel_mask(&self) -> bool {
        self.had_mask && self.augmented.is_none()
    }
}

/// Turn the active masks over `dest_area` into an auxiliary clip path.
///
/// Only a single rounded-rectangle mask is expressed as a path. Inclusion clips to the rounded
/// rectangle; exclusion clips to `dest_area` with the rounded rectangle cut out (reversed winding).
/// Any other kind, or a second rounded-rectangle mask, reports `had_mask` without a path.
pub fn apply_masks(path: &PathStream, dest_area: Area, masks: &dyn MaskStack) -> MaskOutcome {
    let draw_area = path
        .bounds()
        .map(Area::enclosing)
        .and_then(|a| a.intersect(dest_area))
        .unwrap_or(dest_area);

    let mut active = masks.masks().iter().filter(|m| m.affects(draw_area));
    let Some(first) = active.next() else {
        return MaskOutcome::default();
    };
    let rest = active.count();

    if rest > 0 {
        let supported = masks
            .masks()
            .iter()
            .filter(|m| m.is_path_expressible() && m.affects(draw_area))
            .count();
        if supported > 1 {
            warn!(
                supported,
                "multiple rounded-rect masks active; only one can be combined as a path"
            );
        } else {
            debug!(count = rest + 1, "several masks active; using per-pixel masking");
        }
        return unsupported();
    }

    let MaskKind::RoundedRect {
        area,
        radius,
        outer,
    } = first
    else {
        debug!(mask = ?first, "mask kind is not path-expressible");
        return unsupported();
    };

    let mut clip = PathStream::new();
    if *outer {
        let bounds = dest_area.inflate(1).to_rect();
        clip.move_to(bounds.origin());
        clip.line_to(kurbo::Point::new(bounds.x1, bounds.y0));
        clip.line_to(kurbo::Point::new(bounds.x1, bounds.y1));
        clip.line_to(kurbo::Point::new(bounds.x0, bounds.y1));
        clip.close();
        let mut hole = PathStream::new();
        append_rounded_rect(&mut hole, area.to_rect(), *radius);
        clip.append(&hole.reversed());
    } else {
        append_rounded_rect(&mut clip, area.to_rect(), *radius);
    }
    clip.end();
    MaskOutcome {
        had_mask: true,
        augmented: Some(clip),
    }
}

fn unsupported() -> MaskOutcome {
    MaskOutcome {
        had_mask: true,
        augmented: None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/mask/apply.rs"]
mod tests;
