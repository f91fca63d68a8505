//! Layout scenario tests
//!
//! Literal documents with hand-computed expected offsets.

use gridlanes_engine::{Axis, ImageOutcome, LayoutHost, GRID_LANES_ATTR};

use crate::support::{assert_near, assert_position, assert_px, assert_slot, TestPage};

#[test]
fn test_waterfall_three_fixed_lanes() {
    let mut page = TestPage::with_size(900.0, 600.0);
    let grid = page.container(
        "display: grid-lanes; grid-template-columns: 300px 300px 300px; gap: 0",
    );
    let items = page.items(grid, &[100.0, 200.0, 150.0, 120.0, 80.0, 300.0]);
    page.start_default();

    let instance = page.instance(grid);
    assert_slot(instance, items[0], 0, 0.0);
    assert_slot(instance, items[1], 1, 0.0);
    assert_slot(instance, items[2], 2, 0.0);
    assert_slot(instance, items[3], 0, 100.0);
    assert_slot(instance, items[4], 2, 150.0);
    // Lane 1 (200) beats lane 0 (220) by more than the 16px tolerance.
    assert_slot(instance, items[5], 1, 200.0);
    assert_eq!(instance.fills(), &[220.0, 500.0, 230.0]);

    assert_position(&page, items[4], 600.0, 150.0);
    assert_px(&page, items[4], "width", 300.0);
    assert_px(&page, grid, "min-height", 500.0);
}

#[test]
fn test_waterfall_wider_tolerance_keeps_reading_order() {
    let mut page = TestPage::with_size(900.0, 600.0);
    let grid = page.container(
        "display: grid-lanes; grid-template-columns: 300px 300px 300px; --item-tolerance: 20px",
    );
    let items = page.items(grid, &[100.0, 200.0, 150.0, 120.0, 80.0, 300.0]);
    page.start_default();

    let instance = page.instance(grid);
    assert_slot(instance, items[5], 0, 220.0);
    assert_eq!(instance.fills(), &[520.0, 200.0, 230.0]);
    assert_px(&page, grid, "min-height", 520.0);
}

#[test]
fn test_auto_fill_minmax() {
    let mut page = TestPage::with_size(1000.0, 600.0);
    let grid = page.container(
        "display: grid-lanes; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 16px",
    );
    let items = page.items(grid, &[50.0, 50.0, 50.0]);
    page.start_default();

    let instance = page.instance(grid);
    assert_eq!(instance.lanes().len(), 3);
    for lane in instance.lanes() {
        assert_near(lane.size, (1000.0 - 2.0 * 16.0) / 3.0);
    }
    let lane_width = (1000.0 - 32.0) / 3.0;
    assert_px(&page, items[2], "left", 2.0 * (lane_width + 16.0));
    assert_px(&page, items[2], "width", lane_width);
}

#[test]
fn test_negative_line_places_in_last_lane() {
    let mut page = TestPage::with_size(300.0, 600.0);
    let grid = page.container("display: grid-lanes; grid-template-columns: 100px 100px 100px");
    let item = page.item(grid, 60.0);
    page.host.set_style_property(item, "grid-column", "-1").unwrap();
    page.start_default();

    assert_position(&page, item, 200.0, 0.0);
    assert_px(&page, item, "width", 100.0);
    assert_slot(page.instance(grid), item, 2, 0.0);
}

#[test]
fn test_tolerance_prefers_earlier_lane() {
    let mut page = TestPage::with_size(400.0, 600.0);
    let grid = page.container("display: grid-lanes; grid-template-columns: 1fr 1fr");
    let items = page.items(grid, &[40.0, 48.0, 10.0]);
    page.start_default();

    let instance = page.instance(grid);
    assert_slot(instance, items[2], 0, 40.0);
    assert_position(&page, items[2], 0.0, 40.0);
}

#[test]
fn test_relayout_after_image_load() {
    let mut page = TestPage::with_size(600.0, 600.0);
    let grid = page.container("display: grid-lanes; grid-template-columns: 1fr");
    let card = page.item(grid, 100.0);
    let image = page.host.append(card, "img");
    page.host.set_image_complete(image, false);
    page.start_default();

    assert_px(&page, grid, "min-height", 100.0);
    assert_eq!(page.passes(grid), 1);
    let frames = page.host.frames_delivered();

    page.host.set_content_size(card, 0.0, 300.0);
    page.host.settle_image(image, ImageOutcome::Loaded);
    page.settle();

    assert_px(&page, grid, "min-height", 300.0);
    assert_eq!(page.passes(grid), 2);
    assert_eq!(page.host.frames_delivered(), frames + 1);

    assert_eq!(page.settle(), 0);
    assert_eq!(page.passes(grid), 2);
}

#[test]
fn test_rule_harvest_from_style_element() {
    let mut page = TestPage::with_size(900.0, 600.0);
    page.host
        .add_style_element(".grid { display: grid-lanes; grid-template-columns: 1fr 2fr; }");
    let body = page.body();
    let grid = page.host.append(body, "div");
    page.host.add_class(grid, "grid");
    let child = page.item(grid, 80.0);
    page.start_default();

    assert_eq!(page.host.get_attribute(grid, GRID_LANES_ATTR).as_deref(), Some("true"));
    assert_px(&page, child, "width", 300.0);
    assert_position(&page, child, 0.0, 0.0);
}

#[test]
fn test_brick_layout() {
    let mut page = TestPage::with_size(1000.0, 600.0);
    let grid = page.container("display: grid-lanes; grid-template-rows: repeat(2, 50px); gap: 10px");
    page.host.set_fixed_size(grid, None, Some(110.0));
    let items: Vec<_> = [200.0, 100.0, 60.0]
        .iter()
        .map(|width| {
            let item = page.host.append(grid, "span");
            page.host.set_content_size(item, *width, 0.0);
            item
        })
        .collect();
    page.start_default();

    let instance = page.instance(grid);
    assert_eq!(instance.axis(), Axis::Rows);
    assert_slot(instance, items[0], 0, 0.0);
    assert_slot(instance, items[1], 1, 0.0);
    assert_slot(instance, items[2], 1, 110.0);
    assert_position(&page, items[2], 110.0, 60.0);
    assert_px(&page, items[2], "height", 50.0);
    assert_px(&page, grid, "min-width", 200.0);
}

#[test]
fn test_spanning_item() {
    let mut page = TestPage::with_size(300.0, 600.0);
    let grid = page.container("display: grid-lanes; grid-template-columns: repeat(3, 1fr); gap: 0 0");
    let items = page.items(grid, &[30.0, 50.0, 20.0, 40.0]);
    page.host.set_style_property(items[3], "grid-column", "span 2").unwrap();
    page.start_default();

    let instance = page.instance(grid);
    // Windows: lanes 0-1 max 50, lanes 1-2 max 50. Equal, so the earlier wins.
    assert_slot(instance, items[3], 0, 50.0);
    assert_px(&page, items[3], "width", 200.0);
    assert_eq!(instance.fills(), &[90.0, 90.0, 20.0]);
}
