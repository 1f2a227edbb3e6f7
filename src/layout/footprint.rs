//! On-canvas size estimates.
//!
//! The layout engine never measures rendered elements; it approximates each
//! entry's footprint from its content with a fixed character cell.

use crate::model::{Entry, Payload, Point, Rect};
use unicode_width::UnicodeWidthStr;

/// Width of one character cell in world units.
pub const CHAR_WIDTH: f64 = 8.0;

/// Height of one text line in world units.
pub const LINE_HEIGHT: f64 = 20.0;

/// Narrowest box an entry occupies.
pub const MIN_WIDTH: f64 = 40.0;

/// Text wraps at this width.
pub const MAX_WIDTH: f64 = 360.0;

const LINK_CARD_WIDTH: f64 = 280.0;
const LINK_CARD_HEIGHT: f64 = 120.0;
const MEDIA_WIDTH: f64 = 240.0;
const MEDIA_HEIGHT: f64 = 180.0;

/// Estimated width and height of an entry, anchored at its position (top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// World-space width.
    pub width: f64,
    /// World-space height.
    pub height: f64,
}

impl Footprint {
    /// Length of the footprint's shadow on a unit `axis`.
    pub fn extent_along(&self, axis: Point) -> f64 {
        (self.width * axis.x).abs() + (self.height * axis.y).abs()
    }

    /// World rect covered when placed at `position`.
    pub fn rect_at(&self, position: Point) -> Rect {
        Rect::from_origin_size(position, self.width, self.height)
    }
}

/// Estimate an entry's footprint from its text and payload.
pub fn estimate(entry: &Entry) -> Footprint {
    let text = text_footprint(entry.text());
    match &entry.payload {
        Payload::Text | Payload::Latex { .. } => text,
        Payload::LinkCards { cards } => Footprint {
            width: text.width.max(LINK_CARD_WIDTH),
            height: text.height + LINK_CARD_HEIGHT * cards.len().max(1) as f64,
        },
        Payload::Media { .. } => Footprint {
            width: text.width.max(MEDIA_WIDTH),
            height: text.height + MEDIA_HEIGHT,
        },
    }
}

fn text_footprint(text: &str) -> Footprint {
    let cells_per_line = (MAX_WIDTH / CHAR_WIDTH) as usize;
    let mut widest = 0usize;
    let mut lines = 0usize;
    for line in text.lines() {
        let cells = UnicodeWidthStr::width(line);
        widest = widest.max(cells);
        lines += cells.div_ceil(cells_per_line).max(1);
    }
    Footprint {
        width: (widest as f64 * CHAR_WIDTH).clamp(MIN_WIDTH, MAX_WIDTH),
        height: lines.max(1) as f64 * LINE_HEIGHT,
    }
}
