//! Layout property tests
//!
//! These tests run many generated documents and verify that:
//! - Lane sizes never overflow the container
//! - Items sharing a lane never overlap, and lane fills match their items
//! - Auto placement stays within tolerance of the shortest window
//! - Relayout without changes is a no-op

use gridlanes_engine::{ElementId, LayoutHost, LayoutInstance};

use crate::support::{TestPage, PX_TOLERANCE};

const TEMPLATES: [&str; 8] = [
    "1fr 1fr 1fr",
    "200px 1fr",
    "repeat(4, 1fr)",
    "repeat(auto-fill, minmax(150px, 1fr))",
    "repeat(auto-fit, 120px)",
    "100px minmax(80px, 2fr) 1fr",
    "25% 25% 1fr",
    "repeat(3, minmax(0, 1fr))",
];

const WIDTHS: [f32; 4] = [320.0, 640.0, 1000.0, 1280.0];

/// Deterministic pseudo-random heights.
struct Heights(u64);

impl Heights {
    fn next(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        20.0 + ((self.0 >> 33) % 280) as f32
    }
}

fn build(width: f32, template: &str, gap: f32, seed: u64, count: usize) -> (TestPage, ElementId) {
    let mut page = TestPage::with_size(width, 800.0);
    let grid = page.container(&format!(
        "display: grid-lanes; grid-template-columns: {template}; gap: {gap}px"
    ));
    let mut heights = Heights(seed);
    for index in 0..count {
        let item = page.item(grid, heights.next());
        if index % 5 == 3 {
            page.host
                .set_style_property(item, "grid-column", "span 2")
                .unwrap();
        }
    }
    page.start_default();
    (page, grid)
}

fn each_document(mut check: impl FnMut(&TestPage, &LayoutInstance, f32, f32)) {
    let mut seed = 7;
    for template in TEMPLATES {
        for width in WIDTHS {
            for gap in [0.0, 12.0] {
                seed += 1;
                let (page, grid) = build(width, template, gap, seed, 14);
                check(&page, page.instance(grid), width, gap);
            }
        }
    }
}

#[test]
fn test_lane_sizes_fit_container() {
    each_document(|_, instance, width, gap| {
        let lanes = instance.lanes();
        assert!(!lanes.is_empty());
        let total: f32 = lanes.iter().map(|lane| lane.size).sum::<f32>()
            + gap * (lanes.len() as f32 - 1.0);
        assert!(
            total <= width + PX_TOLERANCE,
            "{} lanes use {total}px of {width}px",
            lanes.len()
        );
        if lanes.iter().any(|lane| lane.is_flexible()) {
            assert!((total - width).abs() <= 0.05, "flexible lanes leave space: {total} of {width}");
        }
    });
}

#[test]
fn test_items_do_not_overlap_and_fills_match() {
    each_document(|_, instance, _, gap| {
        let placements = instance.placements();
        for (i, a) in placements.iter().enumerate() {
            for b in &placements[i + 1..] {
                let shares_lane = a.slot.lane < b.slot.lane + b.slot.span
                    && b.slot.lane < a.slot.lane + a.slot.span;
                if shares_lane {
                    assert!(
                        b.slot.offset + PX_TOLERANCE >= a.slot.offset + a.extent + gap,
                        "item at {} overlaps item at {}",
                        b.slot.offset,
                        a.slot.offset
                    );
                }
            }
        }

        for (lane, fill) in instance.fills().iter().enumerate() {
            let expected = placements
                .iter()
                .filter(|item| item.slot.lane <= lane && lane < item.slot.lane + item.slot.span)
                .map(|item| item.slot.offset + item.extent)
                .fold(0.0, f32::max);
            assert!((fill - expected).abs() <= PX_TOLERANCE, "lane {lane}: {fill} vs {expected}");
        }
    });
}

#[test]
fn test_auto_placement_within_tolerance() {
    let tolerance = 16.0;
    each_document(|_, instance, _, _| {
        let mut fills = vec![0.0f32; instance.lanes().len()];
        for item in instance.placements() {
            let span = item.slot.span;
            let window_max = |start: usize| fills[start..start + span].iter().copied().fold(0.0, f32::max);
            let chosen = window_max(item.slot.lane);

            for start in 0..=fills.len() - span {
                if instance.lanes()[start..start + span].iter().any(|lane| lane.collapsed) {
                    continue;
                }
                assert!(
                    chosen <= window_max(start) + tolerance + PX_TOLERANCE,
                    "window {start} ({}) beats chosen lane {} ({chosen}) by more than {tolerance}",
                    window_max(start),
                    item.slot.lane
                );
            }

            let end = item.slot.offset + item.extent;
            for fill in &mut fills[item.slot.lane..item.slot.lane + span] {
                *fill = end;
            }
        }
    });
}

#[test]
fn test_layout_is_idempotent() {
    let mut seed = 100;
    for template in TEMPLATES {
        seed += 1;
        let (mut page, grid) = build(1000.0, template, 8.0, seed, 12);
        let before: Vec<_> = page.instance(grid).placements().to_vec();
        let styles: Vec<_> = page
            .host
            .children(grid)
            .into_iter()
            .map(|child| page.host.get_attribute(child, "style"))
            .collect();

        page.refresh();
        assert_eq!(page.settle(), 0, "refresh without changes produced notifications");

        assert_eq!(page.instance(grid).placements(), before.as_slice());
        let after: Vec<_> = page
            .host
            .children(grid)
            .into_iter()
            .map(|child| page.host.get_attribute(child, "style"))
            .collect();
        assert_eq!(after, styles);
    }
}
