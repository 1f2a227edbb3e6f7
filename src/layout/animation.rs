//! Frame-driven interpolation of a layout plan.

use super::LayoutMove;
use crate::camera::ease_out_cubic;
use crate::model::{EntryId, Millis, Point};

/// Positions for one frame of a running layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutFrame {
    /// Where each still-animated entry sits in this frame.
    pub positions: Vec<(EntryId, Point)>,
    /// The frame reached the end; positions are the exact targets.
    pub finished: bool,
}

/// Animates every moved entry from its old to its new position.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutAnimation {
    moves: Vec<LayoutMove>,
    started: Millis,
    duration_ms: u64,
}

impl LayoutAnimation {
    /// Animation of `moves` starting at `started` and lasting `duration_ms`.
    pub fn new(moves: Vec<LayoutMove>, started: Millis, duration_ms: u64) -> Self {
        Self {
            moves,
            started,
            duration_ms,
        }
    }

    /// Moves still driven by this animation.
    pub fn moves(&self) -> &[LayoutMove] {
        &self.moves
    }

    /// True once every move has been released.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Stop animating `ids`, leaving their positions to whoever moved them.
    ///
    /// Returns how many moves were dropped.
    pub fn release(&mut self, ids: &[EntryId]) -> usize {
        let before = self.moves.len();
        self.moves.retain(|m| !ids.contains(&m.id));
        before - self.moves.len()
    }

    /// Total running time.
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Interpolated positions at `now`; exact targets once finished.
    pub fn sample(&self, now: Millis) -> LayoutFrame {
        let t = if self.duration_ms == 0 {
            1.0
        } else {
            now.since(self.started) as f64 / self.duration_ms as f64
        };
        let finished = t >= 1.0;
        let eased = ease_out_cubic(t);
        let positions = self
            .moves
            .iter()
            .map(|m| {
                let p = if finished { m.to } else { m.from.lerp(m.to, eased) };
                (m.id.clone(), p)
            })
            .collect();
        LayoutFrame {
            positions,
            finished,
        }
    }
}
