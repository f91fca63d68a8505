//! Relayout trigger integration tests
//!
//! These tests verify that containers relayout:
//! - When the lane-axis size changes, but not on other size changes
//! - When children are added, removed or resized
//! - When images inside the container settle
//! - At most once per animation frame
//! - Without the host services that are unavailable

use gridlanes_engine::headless::HostApi;
use gridlanes_engine::{ElementId, ImageOutcome, LayoutHost, PolyfillBuilder};

use crate::support::{assert_position, assert_px, TestPage};

fn two_lane_page() -> (TestPage, ElementId, Vec<ElementId>) {
    let mut page = TestPage::with_size(600.0, 600.0);
    let grid = page.container("display: grid-lanes; grid-template-columns: 1fr 1fr; gap: 10px");
    let items = page.items(grid, &[100.0, 50.0, 30.0]);
    (page, grid, items)
}

#[test]
fn test_initial_observations_do_not_relayout() {
    let (mut page, grid, _) = two_lane_page();
    page.start_default();
    assert_eq!(page.passes(grid), 1);
    assert!(!page.instance(grid).is_pending());
    assert_eq!(page.host.frames_delivered(), 0);
}

#[test]
fn test_lane_axis_resize_relayouts() {
    let (mut page, grid, items) = two_lane_page();
    page.start_default();
    assert_px(&page, items[1], "width", 295.0);

    page.host.set_viewport(400.0, 600.0);
    page.settle();

    assert_eq!(page.passes(grid), 2);
    assert_px(&page, items[1], "left", 205.0);
    assert_px(&page, items[1], "width", 195.0);
}

#[test]
fn test_cross_axis_resize_is_ignored() {
    let (mut page, grid, _) = two_lane_page();
    page.start_default();

    page.host.set_fixed_size(grid, None, Some(900.0));
    page.host.set_viewport(600.0, 1200.0);
    page.settle();

    assert_eq!(page.passes(grid), 1);
}

#[test]
fn test_child_resize_relayouts() {
    let (mut page, grid, items) = two_lane_page();
    page.start_default();
    assert_position(&page, items[2], 305.0, 60.0);

    page.host.set_content_size(items[1], 0.0, 200.0);
    page.settle();

    assert_eq!(page.passes(grid), 2);
    assert_position(&page, items[2], 0.0, 110.0);
    assert_px(&page, grid, "min-height", 200.0);
}

#[test]
fn test_child_list_changes_relayout() {
    let (mut page, grid, items) = two_lane_page();
    page.start_default();

    let added = page.item(grid, 20.0);
    page.settle();
    assert_eq!(page.passes(grid), 2);
    assert_position(&page, added, 0.0, 110.0);

    page.host.remove(items[0]);
    page.settle();
    assert_eq!(page.passes(grid), 3);
    assert_position(&page, items[1], 0.0, 0.0);
    assert_position(&page, items[2], 305.0, 0.0);

    // The removed child is no longer observed.
    page.host.set_content_size(items[0], 0.0, 999.0);
    page.settle();
    assert_eq!(page.passes(grid), 3);
}

#[test]
fn test_class_and_style_changes_relayout() {
    let (mut page, grid, _) = two_lane_page();
    page.start_default();

    page.host.add_class(grid, "highlighted");
    page.settle();
    assert_eq!(page.passes(grid), 2);

    page.host.set_style_property(grid, "outline", "1px solid").unwrap();
    page.settle();
    assert_eq!(page.passes(grid), 3);
}

#[test]
fn test_inline_template_change_is_picked_up() {
    let mut page = TestPage::with_size(600.0, 600.0);
    let grid = page.container("display: grid-lanes; grid-template-columns: 1fr 1fr 1fr");
    let items = page.items(grid, &[20.0, 20.0, 20.0]);
    page.start_default();
    assert_eq!(page.instance(grid).lanes().len(), 3);

    page.host
        .set_inline_style(grid, "display: grid-lanes; grid-template-columns: 1fr 1fr");
    page.settle();

    assert_eq!(page.passes(grid), 2);
    assert_eq!(page.instance(grid).lanes().len(), 2);
    assert_position(&page, items[2], 0.0, 20.0);
    assert_px(&page, items[1], "width", 300.0);
    assert_eq!(
        page.host.style_property(grid, "position").as_deref(),
        Some("relative")
    );

    // A later harvest keeps the edited template.
    page.host.add_style_element(".unrelated { color: red }");
    page.settle();
    assert_eq!(page.instance(grid).lanes().len(), 2);
    assert_eq!(
        page.controller()
            .rules()
            .get(grid)
            .and_then(|rules| rules.get("grid-template-columns"))
            .map(String::as_str),
        Some("1fr 1fr")
    );
}

#[test]
fn test_inline_gap_and_tolerance_edits_are_picked_up() {
    let (mut page, grid, items) = two_lane_page();
    page.start_default();

    page.host.set_style_property(grid, "gap", "20px").unwrap();
    page.settle();
    assert_eq!(page.passes(grid), 2);
    assert_px(&page, items[1], "left", 310.0);
    assert_px(&page, items[1], "width", 290.0);
    assert_position(&page, items[2], 310.0, 70.0);

    // Lane 1 (70) is 50px shorter than lane 0 (100); a wider tolerance keeps lane 0.
    page.host
        .set_style_property(grid, "--item-tolerance", "60px")
        .unwrap();
    page.settle();
    assert_eq!(page.passes(grid), 3);
    assert_position(&page, items[2], 0.0, 120.0);
}

#[test]
fn test_triggers_coalesce_into_one_frame() {
    let (mut page, grid, items) = two_lane_page();
    page.start_default();
    let frames = page.host.frames_delivered();

    page.host.add_class(grid, "a");
    page.host.set_content_size(items[0], 0.0, 10.0);
    page.host.set_content_size(items[2], 0.0, 80.0);
    page.item(grid, 5.0);
    page.settle();

    assert_eq!(page.passes(grid), 2);
    assert_eq!(page.host.frames_delivered(), frames + 1);
}

#[test]
fn test_image_load_and_error_relayout() {
    let mut page = TestPage::with_size(600.0, 600.0);
    let grid = page.container("display: grid-lanes; grid-template-columns: 1fr 1fr");
    let card = page.item(grid, 50.0);
    let ok = page.host.append(card, "img");
    let broken = page.host.append(card, "img");
    let cached = page.host.append(card, "img");
    for image in [ok, broken] {
        page.host.set_image_complete(image, false);
    }
    page.start_default();
    let subscriptions = page.host.active_subscriptions();

    // Complete images are not observed.
    page.host.settle_image(cached, ImageOutcome::Loaded);
    page.settle();
    assert_eq!(page.passes(grid), 1);

    page.host.settle_image(ok, ImageOutcome::Loaded);
    page.settle();
    assert_eq!(page.passes(grid), 2);

    page.host.settle_image(broken, ImageOutcome::Failed);
    page.settle();
    assert_eq!(page.passes(grid), 3);
    assert_eq!(page.host.active_subscriptions(), subscriptions - 2);
}

#[test]
fn test_images_added_later_are_observed() {
    let (mut page, grid, _) = two_lane_page();
    page.start_default();

    let card = page.host.append(grid, "figure");
    let image = page.host.append(card, "img");
    page.host.set_image_complete(image, false);
    page.settle();
    let passes = page.passes(grid);

    page.host.settle_image(image, ImageOutcome::Loaded);
    page.settle();
    assert_eq!(page.passes(grid), passes + 1);
}

#[test]
fn test_image_observation_can_be_disabled() {
    let mut page = TestPage::with_size(600.0, 600.0);
    let grid = page.container("display: grid-lanes");
    let card = page.item(grid, 50.0);
    let image = page.host.append(card, "img");
    page.host.set_image_complete(image, false);
    page.start(PolyfillBuilder::new().observe_images(false).build().unwrap());

    page.host.settle_image(image, ImageOutcome::Loaded);
    page.settle();
    assert_eq!(page.passes(grid), 1);
}

#[test]
fn test_without_animation_frames_layout_is_immediate() {
    let (mut page, grid, _) = two_lane_page();
    page.host.set_api_available(HostApi::AnimationFrames, false);
    page.start_default();

    page.host.add_class(grid, "x");
    page.settle();
    assert_eq!(page.passes(grid), 2);
    assert!(!page.instance(grid).triggers().frames);
    assert_eq!(page.host.frames_delivered(), 0);
}

#[test]
fn test_without_resize_observer_mutations_still_work() {
    let (mut page, grid, _) = two_lane_page();
    page.host.set_api_available(HostApi::ResizeObserver, false);
    page.start_default();

    let triggers = page.instance(grid).triggers();
    assert!(!triggers.resize);
    assert!(triggers.mutations);

    page.host.set_viewport(300.0, 600.0);
    page.settle();
    assert_eq!(page.passes(grid), 1);

    let added = page.item(grid, 10.0);
    page.settle();
    assert_eq!(page.passes(grid), 2);
    assert_px(&page, added, "width", 145.0);
}

#[test]
fn test_without_mutation_observer_resizes_still_work() {
    let (mut page, grid, _) = two_lane_page();
    page.host.set_api_available(HostApi::MutationObserver, false);
    page.start_default();

    assert!(!page.instance(grid).triggers().mutations);
    page.host.set_viewport(400.0, 600.0);
    page.settle();
    assert_eq!(page.passes(grid), 2);
}

#[test]
fn test_manual_refresh_runs_immediately() {
    let (mut page, grid, _) = two_lane_page();
    page.start_default();

    page.refresh();
    assert_eq!(page.passes(grid), 2);
    assert_eq!(page.settle(), 0);
}
