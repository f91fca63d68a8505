//! # Grid Lanes Layout
//!
//! Lane sizing and item placement for `display: grid-lanes`.
//!
//! ## Design Goals
//!
//! 1. **Lane sizing**: Expand `repeat()`, resolve lengths, distribute `fr` space
//! 2. **Placement**: Shortest-lane placement with a reading-order tolerance
//! 3. **Host independence**: No DOM access; callers measure items between
//!    choosing a slot and committing it
//!
//! ## References
//!
//! - [CSS Grid Layout Module Level 3](https://www.w3.org/TR/css-grid-3/)

pub mod lanes;
pub mod placement;

pub use lanes::{
    collapse_empty_auto_fit, distribute_space, expand_template, lanes_extent, size_lanes, Lane,
    LaneMax, AUTO_REPEAT_FALLBACK_PX, MAX_AUTO_REPETITIONS, MAX_LANES,
};
pub use placement::{LanePlacer, Slot};

use gridlanes_css::ItemPlacement;
use thiserror::Error;

/// Errors that can occur in layout.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("No lanes to place items into")]
    NoLanes,

    #[error("Invalid lane geometry: {0}")]
    InvalidGeometry(String),
}

/// The axis lanes are laid out along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    /// Lanes are columns; items stack downwards (waterfall).
    #[default]
    Columns,
    /// Lanes are rows; items stack rightwards (brick).
    Rows,
}

impl Axis {
    /// Pick the lane axis from the two templates: columns win when present.
    pub fn from_templates(has_columns: bool, has_rows: bool) -> Self {
        if has_columns || !has_rows {
            Axis::Columns
        } else {
            Axis::Rows
        }
    }

    /// Explicit start and span of an item along this axis.
    pub fn item_lanes(self, placement: &ItemPlacement) -> (Option<i32>, u32) {
        match self {
            Axis::Columns => (placement.column_start(), placement.column_span()),
            Axis::Rows => (placement.row_start(), placement.row_span()),
        }
    }
}
