//! # Lane Sizing
//!
//! Turns a parsed track template into resolved lane sizes.
//!
//! The algorithm is a reduced form of the grid track sizing algorithm:
//! repetitions are expanded against the available space, lane bounds are
//! resolved, and leftover space is shared between `fr` lanes.

use gridlanes_css::{IntrinsicSize, LengthContext, RepeatCount, TemplateToken, TrackBreadth};
use tracing::{debug, trace};

/// Estimated size of a pattern entry that has no definite minimum.
pub const AUTO_REPEAT_FALLBACK_PX: f32 = 100.0;

/// Upper bound on `auto-fill` / `auto-fit` repetitions.
pub const MAX_AUTO_REPETITIONS: usize = 1000;

/// Upper bound on the lanes one template expands to.
pub const MAX_LANES: usize = 1000;

/// Upper bound of a lane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LaneMax {
    /// Definite maximum in pixels.
    Fixed(f32),
    /// Flexible share of the free space.
    Flex(f32),
    /// Content-based maximum; the lane stays at its minimum.
    Intrinsic,
}

/// A resolved lane.
#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    /// Base size (minimum).
    pub min: f32,
    /// Growth limit.
    pub max: LaneMax,
    /// Final computed size.
    pub size: f32,
    /// Whether this lane came from an `auto-fit` repetition.
    pub is_auto_fit: bool,
    /// Collapsed empty `auto-fit` lane (zero size, no gaps).
    pub collapsed: bool,
}

impl Lane {
    /// Create a fixed lane.
    pub fn fixed(px: f32) -> Self {
        let px = px.max(0.0);
        Self {
            min: px,
            max: LaneMax::Fixed(px),
            size: px,
            is_auto_fit: false,
            collapsed: false,
        }
    }

    /// Create a flexible lane.
    pub fn flex(fr: f32) -> Self {
        Self {
            min: 0.0,
            max: LaneMax::Flex(fr.max(0.0)),
            size: 0.0,
            is_auto_fit: false,
            collapsed: false,
        }
    }

    /// Flex factor, if this lane is flexible.
    pub fn flex_factor(&self) -> Option<f32> {
        match self.max {
            LaneMax::Flex(fr) => Some(fr),
            _ => None,
        }
    }

    pub fn is_flexible(&self) -> bool {
        self.flex_factor().is_some()
    }

    fn from_token(token: &TemplateToken, ctx: &LengthContext) -> Option<Self> {
        match token {
            TemplateToken::Fixed(len) => Some(Self::fixed(len.to_px(ctx))),
            TemplateToken::Flex(fr) => Some(Self::flex(*fr)),
            TemplateToken::MinMax(min, max) => {
                let min = match min {
                    TrackBreadth::Length(len) => len.to_px(ctx).max(0.0),
                    TrackBreadth::Flex(_) | TrackBreadth::Intrinsic(_) => 0.0,
                };
                let max = match max {
                    TrackBreadth::Length(len) => LaneMax::Fixed(len.to_px(ctx).max(0.0)),
                    TrackBreadth::Flex(fr) => LaneMax::Flex(fr.max(0.0)),
                    TrackBreadth::Intrinsic(_) => LaneMax::Intrinsic,
                };
                Some(Self {
                    min,
                    max,
                    size: min,
                    is_auto_fit: false,
                    collapsed: false,
                })
            }
            // Repeats are expanded before conversion.
            TemplateToken::Repeat(..) => None,
        }
    }
}

/// Estimate the minimum size of one repetition of a pattern.
fn pattern_min_size(pattern: &[TemplateToken], gap: f32, ctx: &LengthContext) -> f32 {
    let tracks: f32 = pattern
        .iter()
        .map(|token| match token {
            TemplateToken::Fixed(len) => len.to_px(ctx).max(0.0),
            TemplateToken::Flex(_) => AUTO_REPEAT_FALLBACK_PX,
            TemplateToken::MinMax(min, _) => match min {
                TrackBreadth::Length(len) => len.to_px(ctx).max(0.0),
                TrackBreadth::Intrinsic(IntrinsicSize::MinContent | IntrinsicSize::MaxContent) => {
                    AUTO_REPEAT_FALLBACK_PX
                }
                TrackBreadth::Intrinsic(IntrinsicSize::Auto) | TrackBreadth::Flex(_) => 0.0,
            },
            TemplateToken::Repeat(..) => 0.0,
        })
        .sum();

    tracks + pattern.len().saturating_sub(1) as f32 * gap
}

/// How many times an auto repetition fits into the available space.
fn auto_repetitions(pattern: &[TemplateToken], available: f32, gap: f32, ctx: &LengthContext) -> usize {
    let min_pattern = pattern_min_size(pattern, gap, ctx);
    let step = min_pattern + gap;
    if step <= 0.0 || !step.is_finite() {
        return 1;
    }

    let fit = ((available + gap) / step).floor();
    if !fit.is_finite() || fit < 1.0 {
        return 1;
    }
    (fit as usize).min(MAX_AUTO_REPETITIONS)
}

/// Expand `repeat()` tokens and convert every track into an unsized lane.
pub fn expand_template(
    tokens: &[TemplateToken],
    available: f32,
    gap: f32,
    ctx: &LengthContext,
) -> Vec<Lane> {
    let mut lanes = Vec::new();

    for token in tokens {
        let TemplateToken::Repeat(count, pattern) = token else {
            if lanes.len() < MAX_LANES {
                lanes.extend(Lane::from_token(token, ctx));
            }
            continue;
        };

        let reps = match count {
            RepeatCount::Count(n) => *n as usize,
            RepeatCount::AutoFill | RepeatCount::AutoFit => {
                let reps = auto_repetitions(pattern, available, gap, ctx);
                trace!(reps, available, gap, "auto-repeat expansion");
                reps
            }
        };

        let room = (MAX_LANES - lanes.len()) / pattern.len().max(1);
        if reps > room {
            debug!(reps, room, max = MAX_LANES, "Clamping repeat() to the lane limit");
        }

        for _ in 0..reps.min(room) {
            for track in pattern {
                if let Some(mut lane) = Lane::from_token(track, ctx) {
                    lane.is_auto_fit = *count == RepeatCount::AutoFit;
                    lanes.push(lane);
                }
            }
        }
    }

    lanes
}

/// Resolve final lane sizes in place.
///
/// Inflexible lanes take their minimum. Flexible lanes share what is left
/// after inflexible minimums and gaps; a flexible lane whose minimum is
/// larger than its share is frozen at that minimum and the share is
/// recomputed without it.
pub fn distribute_space(lanes: &mut [Lane], available: f32, gap: f32) {
    let active = lanes.iter().filter(|lane| !lane.collapsed).count();
    let total_gaps = active.saturating_sub(1) as f32 * gap;
    let mut frozen: Vec<bool> = lanes.iter().map(|lane| !lane.is_flexible()).collect();

    let fr_unit = loop {
        let inflexible: f32 = lanes
            .iter()
            .zip(&frozen)
            .filter(|(lane, frozen)| !lane.collapsed && **frozen)
            .map(|(lane, _)| lane.min)
            .sum();
        let total_fr: f32 = lanes
            .iter()
            .zip(&frozen)
            .filter(|(lane, frozen)| !lane.collapsed && !**frozen)
            .filter_map(|(lane, _)| lane.flex_factor())
            .sum();

        let flex_space = (available - inflexible - total_gaps).max(0.0);
        let fr_unit = if total_fr > 0.0 { flex_space / total_fr } else { 0.0 };

        let mut changed = false;
        for (lane, frozen) in lanes.iter().zip(frozen.iter_mut()) {
            if *frozen || lane.collapsed {
                continue;
            }
            let fr = lane.flex_factor().unwrap_or(0.0);
            if lane.min > fr * fr_unit {
                *frozen = true;
                changed = true;
            }
        }
        if !changed {
            break fr_unit;
        }
    };

    for lane in lanes.iter_mut() {
        lane.size = if lane.collapsed {
            0.0
        } else {
            match lane.max {
                LaneMax::Flex(fr) => lane.min.max(fr_unit * fr),
                LaneMax::Fixed(_) | LaneMax::Intrinsic => lane.min,
            }
        };
    }
}

/// Size the lanes of a template against the available cross-axis space.
///
/// An empty or unusable template yields a single lane spanning the whole
/// space.
pub fn size_lanes(
    tokens: &[TemplateToken],
    available: f32,
    gap: f32,
    ctx: &LengthContext,
) -> Vec<Lane> {
    let available = available.max(0.0);
    let gap = gap.max(0.0);
    let ctx = ctx.with_container_size(available);

    let mut lanes = expand_template(tokens, available, gap, &ctx);
    if lanes.is_empty() {
        debug!(available, "No lanes resolved, falling back to a single lane");
        return vec![Lane::fixed(available)];
    }

    distribute_space(&mut lanes, available, gap);
    lanes
}

/// Collapse `auto-fit` lanes that received no item.
///
/// Returns `true` if any lane changed. Callers re-run [`distribute_space`]
/// and placement afterwards.
pub fn collapse_empty_auto_fit(lanes: &mut [Lane], occupied: &[bool]) -> bool {
    let mut changed = false;
    for (i, lane) in lanes.iter_mut().enumerate() {
        if lane.is_auto_fit && !lane.collapsed && !occupied.get(i).copied().unwrap_or(false) {
            lane.collapsed = true;
            lane.size = 0.0;
            changed = true;
            trace!("Collapsed empty auto-fit lane {}", i);
        }
    }
    changed
}

/// Total extent of the lanes including gaps between non-collapsed lanes.
pub fn lanes_extent(lanes: &[Lane], gap: f32) -> f32 {
    let active = lanes.iter().filter(|lane| !lane.collapsed).count();
    lanes.iter().map(|lane| lane.size).sum::<f32>() + active.saturating_sub(1) as f32 * gap
}
