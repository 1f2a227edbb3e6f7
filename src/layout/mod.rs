//! Hub-alignment auto-layout.
//!
//! A local, best-effort declutter pass over the entries currently on screen:
//!
//! 1. group entries that sit within a neighbour radius of each other,
//! 2. find each group's natural spread direction with PCA,
//! 3. pick the axis that best matches the group's longer bounding-box side,
//! 4. estimate footprints from text,
//! 5. sort along the axis and push overlapping entries forward to a minimum gap,
//! 6. add a small perpendicular jitter so the result does not look ruled,
//! 7. cap every displacement,
//! 8. hand the moves to [`LayoutAnimation`] and commit them when it finishes.
//!
//! It does not guarantee a globally overlap-free canvas.

pub mod animation;
pub mod cluster;
pub mod footprint;
pub mod pca;

pub use animation::{LayoutAnimation, LayoutFrame};
pub use footprint::{estimate as estimate_footprint, Footprint};

use crate::model::{EntryId, Point, Rect};
use crate::store::EntryStore;
use rand::Rng;
use tracing::debug;

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;

/// Moves smaller than this are dropped from a plan.
const MIN_REPORTED_MOVE: f64 = 0.5;

/// Tunables for hub alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSettings {
    /// Two entries are neighbours within this distance.
    pub neighbor_radius: f64,
    /// Smallest connected set that is laid out.
    pub min_group_size: usize,
    /// Gap enforced between consecutive entries along the layout axis.
    pub min_gap: f64,
    /// Perpendicular jitter range.
    pub jitter_min: f64,
    /// Upper end of the jitter range.
    pub jitter_max: f64,
    /// Cap on any single entry's displacement.
    pub max_displacement: f64,
    /// The viewport is grown by this fraction per side when picking candidates.
    pub viewport_margin: f64,
    /// Animation length range.
    pub min_duration_ms: u64,
    /// Upper end of the duration range.
    pub max_duration_ms: u64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            neighbor_radius: 400.0,
            min_group_size: 4,
            min_gap: 22.0,
            jitter_min: 8.0,
            jitter_max: 14.0,
            max_displacement: 120.0,
            viewport_margin: 0.2,
            min_duration_ms: 700,
            max_duration_ms: 900,
        }
    }
}

impl LayoutSettings {
    /// Random animation length within the configured range.
    pub fn pick_duration<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.max_duration_ms <= self.min_duration_ms {
            return self.min_duration_ms;
        }
        rng.gen_range(self.min_duration_ms..=self.max_duration_ms)
    }
}

/// One entry's planned relocation.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutMove {
    /// Entry being moved.
    pub id: EntryId,
    /// Position before the layout.
    pub from: Point,
    /// Position after the layout.
    pub to: Point,
}

impl LayoutMove {
    /// Distance between `from` and `to`.
    pub fn displacement(&self) -> f64 {
        self.from.distance_to(self.to)
    }
}

/// Output of a layout pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutPlan {
    /// Every entry that moves, in group order.
    pub moves: Vec<LayoutMove>,
    /// Number of groups that qualified for alignment.
    pub groups: usize,
}

impl LayoutPlan {
    /// True when nothing moves.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

struct Candidate {
    id: EntryId,
    position: Point,
    footprint: Footprint,
}

/// Plan hub alignment for `candidates` that lie inside `view` (world rect of
/// the viewport), expanded by the configured margin.
///
/// The store is not modified; apply the plan through [`LayoutAnimation`].
pub fn plan_hub_alignment<R: Rng + ?Sized>(
    store: &EntryStore,
    candidates: &[EntryId],
    view: Rect,
    settings: &LayoutSettings,
    rng: &mut R,
) -> LayoutPlan {
    let region = view.expanded(settings.viewport_margin);
    let items: Vec<Candidate> = candidates
        .iter()
        .filter_map(|id| store.get(id))
        .filter(|e| e.position.is_finite() && region.contains(e.position))
        .map(|e| Candidate {
            id: e.id().clone(),
            position: e.position,
            footprint: footprint::estimate(e),
        })
        .collect();

    let points: Vec<Point> = items.iter().map(|c| c.position).collect();
    let groups = cluster::radius_groups(&points, settings.neighbor_radius, settings.min_group_size);

    let mut plan = LayoutPlan {
        moves: Vec::new(),
        groups: groups.len(),
    };
    for group in &groups {
        let members: Vec<&Candidate> = group.iter().map(|&i| &items[i]).collect();
        plan.moves.extend(align_group(&members, settings, rng));
    }
    debug!(
        candidates = items.len(),
        groups = plan.groups,
        moves = plan.moves.len(),
        "Hub alignment planned"
    );
    plan
}

fn align_group<R: Rng + ?Sized>(
    members: &[&Candidate],
    settings: &LayoutSettings,
    rng: &mut R,
) -> Vec<LayoutMove> {
    let points: Vec<Point> = members.iter().map(|c| c.position).collect();
    let (Some(axes), Some(bounds)) = (pca::principal_axes(&points), Rect::bounding(points.iter().copied()))
    else {
        return Vec::new();
    };
    let (layout_axis, jitter_axis) = choose_axes(axes.dominant, axes.perpendicular, bounds);

    let mut order: Vec<usize> = (0..members.len()).collect();
    order.sort_by(|&a, &b| {
        let pa = members[a].position.dot(layout_axis);
        let pb = members[b].position.dot(layout_axis);
        pa.total_cmp(&pb).then_with(|| members[a].id.cmp(&members[b].id))
    });

    let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let mut moves = Vec::new();
    let mut trailing_edge: Option<f64> = None;

    for idx in order {
        let member = members[idx];
        let along = member.position.dot(layout_axis);
        let start = match trailing_edge {
            Some(edge) if along < edge + settings.min_gap => edge + settings.min_gap,
            _ => along,
        };
        let push = start - along;
        let offset = if push > 0.0 {
            let jitter = sign * rng.gen_range(settings.jitter_min..=settings.jitter_max.max(settings.jitter_min));
            cap_magnitude(layout_axis * push + jitter_axis * jitter, settings.max_displacement)
        } else {
            Point::ORIGIN
        };
        // Pack the next entry against where this one actually lands.
        let reached = along + offset.dot(layout_axis);
        trailing_edge = Some(reached + member.footprint.extent_along(layout_axis));

        if offset.length() < MIN_REPORTED_MOVE {
            continue;
        }
        moves.push(LayoutMove {
            id: member.id.clone(),
            from: member.position,
            to: member.position + offset,
        });
    }
    moves
}

/// Pick the layout axis (matching the longer bounding-box side) and the
/// jitter axis, oriented so the layout axis points towards +x or +y.
fn choose_axes(dominant: Point, perpendicular: Point, bounds: Rect) -> (Point, Point) {
    let wide = bounds.width() >= bounds.height();
    let component = |v: Point| if wide { v.x.abs() } else { v.y.abs() };
    let (mut layout, jitter) = if component(dominant) >= component(perpendicular) {
        (dominant, perpendicular)
    } else {
        (perpendicular, dominant)
    };
    let main = if wide { layout.x } else { layout.y };
    if main < 0.0 {
        layout = layout * -1.0;
    }
    (layout, jitter)
}

/// Scale `v` down to at most `cap` in length, keeping its direction.
fn cap_magnitude(v: Point, cap: f64) -> Point {
    let len = v.length();
    if len > cap && len > 0.0 {
        v * (cap / len)
    } else {
        v
    }
}
