//! # Lane Placement
//!
//! Shortest-lane placement of items into resolved lanes.
//!
//! Placement is split in two steps so the caller can measure an item in
//! between: [`LanePlacer::place_auto`] / [`LanePlacer::place_explicit`]
//! choose a [`Slot`], the caller positions and measures the item, and
//! [`LanePlacer::commit`] advances the lane fills.

use crate::{Lane, LayoutError};
use tracing::trace;

/// Where an item goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    /// First lane index.
    pub lane: usize,
    /// Number of lanes covered.
    pub span: usize,
    /// Offset of the first lane along the lane axis.
    pub cross_offset: f32,
    /// Spanned lane sizes plus the gaps between them.
    pub cross_size: f32,
    /// Offset along the stacking axis.
    pub offset: f32,
}

/// Tracks how far each lane has been filled.
#[derive(Debug, Clone)]
pub struct LanePlacer {
    sizes: Vec<f32>,
    offsets: Vec<f32>,
    collapsed: Vec<bool>,
    fills: Vec<f32>,
    occupied: Vec<bool>,
    lane_gap: f32,
    item_gap: f32,
    tolerance: f32,
}

impl LanePlacer {
    /// Create a placer over sized lanes.
    pub fn new(
        lanes: &[Lane],
        lane_gap: f32,
        item_gap: f32,
        tolerance: f32,
    ) -> Result<Self, LayoutError> {
        if lanes.is_empty() {
            return Err(LayoutError::NoLanes);
        }
        if let Some(bad) = lanes.iter().find(|lane| !lane.size.is_finite()) {
            return Err(LayoutError::InvalidGeometry(format!(
                "lane size {} is not finite",
                bad.size
            )));
        }

        let lane_gap = sanitize(lane_gap);
        let sizes: Vec<f32> = lanes.iter().map(|lane| lane.size.max(0.0)).collect();
        let collapsed: Vec<bool> = lanes.iter().map(|lane| lane.collapsed).collect();

        // Collapsed lanes take no gap.
        let mut offsets = Vec::with_capacity(sizes.len());
        let mut position = 0.0;
        for (size, collapsed) in sizes.iter().zip(&collapsed) {
            offsets.push(position);
            if !collapsed {
                position += size + lane_gap;
            }
        }

        Ok(Self {
            fills: vec![0.0; sizes.len()],
            occupied: vec![false; sizes.len()],
            sizes,
            offsets,
            collapsed,
            lane_gap,
            item_gap: sanitize(item_gap),
            tolerance: sanitize(tolerance),
        })
    }

    /// Create a placer from plain lane sizes.
    pub fn from_sizes(
        sizes: &[f32],
        lane_gap: f32,
        item_gap: f32,
        tolerance: f32,
    ) -> Result<Self, LayoutError> {
        let lanes: Vec<Lane> = sizes.iter().map(|size| Lane::fixed(*size)).collect();
        Self::new(&lanes, lane_gap, item_gap, tolerance)
    }

    pub fn lane_count(&self) -> usize {
        self.sizes.len()
    }

    /// Current fill of every lane.
    pub fn fills(&self) -> &[f32] {
        &self.fills
    }

    /// Which lanes have received at least one item.
    pub fn occupied(&self) -> &[bool] {
        &self.occupied
    }

    /// Resolve a 1-based line number to a lane index.
    ///
    /// Negative lines count from the end; the result is clamped into range.
    pub fn resolve_start(&self, start: i32) -> usize {
        let n = self.lane_count() as i64;
        let line = if start < 0 {
            n + i64::from(start) + 1
        } else {
            i64::from(start)
        };
        (line - 1).clamp(0, n - 1) as usize
    }

    /// Choose the slot of an explicitly placed item.
    pub fn place_explicit(&self, start: i32, span: u32) -> Slot {
        let lane = self.resolve_start(start);
        let span = (span.max(1) as usize).min(self.lane_count() - lane);
        let slot = self.slot(lane, span);
        trace!(start, lane, span, offset = slot.offset, "Explicit placement");
        slot
    }

    /// Choose the slot of an auto-placed item.
    ///
    /// Windows are scanned left to right. A window replaces the current
    /// best only if its maximum fill is lower by more than the tolerance.
    pub fn place_auto(&self, span: u32) -> Slot {
        let n = self.lane_count();
        let span = (span.max(1) as usize).min(n);

        let mut best: Option<(usize, f32)> = None;
        for start in 0..=(n - span) {
            if self.collapsed[start..start + span].iter().any(|c| *c) {
                continue;
            }
            let m = self.window_max(start, span);
            match best {
                Some((_, best_max)) if best_max - m <= self.tolerance => {}
                _ => best = Some((start, m)),
            }
        }

        let lane = best.map_or(0, |(lane, _)| lane);
        let slot = self.slot(lane, span);
        trace!(lane, span, offset = slot.offset, "Auto placement");
        slot
    }

    /// Record the measured extent of an item placed into `slot`.
    pub fn commit(&mut self, slot: &Slot, measured: f32) {
        let end = (slot.lane + slot.span).min(self.lane_count());
        let fill = slot.offset + sanitize(measured);
        for lane in slot.lane..end {
            self.fills[lane] = fill;
            self.occupied[lane] = true;
        }
    }

    /// Largest lane fill.
    pub fn extent(&self) -> f32 {
        self.fills.iter().copied().fold(0.0, f32::max)
    }

    fn window_max(&self, start: usize, span: usize) -> f32 {
        self.fills[start..start + span]
            .iter()
            .copied()
            .fold(0.0, f32::max)
    }

    fn slot(&self, lane: usize, span: usize) -> Slot {
        let end = lane + span;
        let active = self.collapsed[lane..end].iter().filter(|c| !**c).count();
        let cross_size = self.sizes[lane..end].iter().sum::<f32>()
            + active.saturating_sub(1) as f32 * self.lane_gap;

        let m = self.window_max(lane, span);
        let offset = if m > 0.0 { m + self.item_gap } else { 0.0 };

        Slot {
            lane,
            span,
            cross_offset: self.offsets[lane],
            cross_size,
            offset,
        }
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
