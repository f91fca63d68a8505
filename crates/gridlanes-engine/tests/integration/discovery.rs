//! Container discovery integration tests
//!
//! These tests verify that containers are found:
//! - From inline styles, `<style>` text and readable stylesheets
//! - When added to the document after init
//! - When a `<style>` element declaring them is added after init

use gridlanes_engine::{LayoutHost, PolyfillBuilder, GRID_LANES_ATTR};
use gridlanes_host::SheetRule;

use crate::support::{assert_position, assert_px, TestPage};

#[test]
fn test_stylesheet_rules_and_inaccessible_sheets() {
    let mut page = TestPage::with_size(900.0, 600.0);
    page.host.add_cross_origin_stylesheet("https://cdn.example.com/theme.css");
    page.host.add_stylesheet(vec![SheetRule::new(
        ".gallery",
        ".gallery { display: grid-lanes; grid-template-columns: repeat(3, 1fr); gap: 12px; }",
    )]);
    let body = page.body();
    let gallery = page.host.append(body, "section");
    page.host.add_class(gallery, "gallery");
    let items = page.items(gallery, &[100.0, 100.0, 100.0]);
    page.start_default();

    assert_eq!(page.controller().len(), 1);
    assert_px(&page, items[1], "left", 304.0);
    assert_px(&page, items[1], "width", 292.0);
}

#[test]
fn test_style_element_declarations_merge_over_inline() {
    let mut page = TestPage::with_size(600.0, 600.0);
    page.host
        .add_style_element("#feed { display: grid-lanes; grid-template-columns: 1fr 1fr 1fr; }");
    let grid = page.container("display: grid-lanes; grid-template-columns: 1fr 1fr");
    page.host.set_attribute(grid, "id", "feed").unwrap();
    let items = page.items(grid, &[50.0, 50.0, 50.0]);
    page.start_default();

    assert_eq!(page.instance(grid).lanes().len(), 3);
    assert_px(&page, items[2], "left", 400.0);
}

#[test]
fn test_container_added_after_init() {
    let mut page = TestPage::with_size(600.0, 600.0);
    page.start_default();
    assert!(page.controller().is_empty());

    let body = page.body();
    let wrapper = page.host.append(body, "div");
    let grid = page.host.append(wrapper, "div");
    page.host.set_inline_style(grid, "display: grid-lanes; grid-template-columns: 1fr 1fr");
    let items = page.items(grid, &[40.0, 40.0]);
    page.settle();

    assert_eq!(page.controller().len(), 1);
    assert_eq!(page.host.get_attribute(grid, GRID_LANES_ATTR).as_deref(), Some("true"));
    assert_position(&page, items[1], 300.0, 0.0);
}

#[test]
fn test_style_element_added_after_init() {
    let mut page = TestPage::with_size(600.0, 600.0);
    let body = page.body();
    let grid = page.host.append(body, "div");
    page.host.add_class(grid, "late");
    let items = page.items(grid, &[40.0, 40.0]);
    page.start_default();
    assert!(page.controller().is_empty());

    page.host
        .add_style_element(".late { display: grid-lanes; grid-template-columns: 100px 100px; }");
    page.settle();

    assert_eq!(page.controller().len(), 1);
    assert!(page.controller().rules().contains(grid));
    assert_position(&page, items[1], 100.0, 0.0);
}

#[test]
fn test_computed_display_discovery_on_forced_hosts() {
    let mut page = TestPage::with_size(600.0, 600.0);
    page.host.set_native_grid_lanes(true);
    page.start(PolyfillBuilder::new().force(true).build().unwrap());

    let body = page.body();
    let grid = page.host.append(body, "div");
    page.host.set_computed(grid, "display", "grid-lanes");
    page.host.set_computed(grid, "grid-template-columns", "1fr 1fr 1fr");
    let items = page.items(grid, &[30.0, 30.0]);
    page.settle();

    assert_eq!(page.controller().len(), 1);
    assert_eq!(page.instance(grid).lanes().len(), 3);
    assert_position(&page, items[1], 200.0, 0.0);
}

#[test]
fn test_existing_containers_are_not_duplicated() {
    let mut page = TestPage::new();
    let grid = page.container("display: grid-lanes; grid-template-columns: 1fr 1fr");
    page.items(grid, &[10.0]);
    page.start_default();

    let body = page.body();
    for _ in 0..3 {
        page.host.append(body, "p");
        page.settle();
    }
    assert_eq!(page.controller().len(), 1);
    assert_eq!(page.passes(grid), 1);
}
