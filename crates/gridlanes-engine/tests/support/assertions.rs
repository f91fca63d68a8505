//! Custom assertions for integration tests.

use gridlanes_engine::{ElementId, LayoutInstance, GRID_LANES_ATTR};
use gridlanes_engine::LayoutHost;

use super::TestPage;

/// Pixel comparisons tolerate float rounding below this.
pub const PX_TOLERANCE: f32 = 0.01;

/// Assert that two pixel values match.
#[track_caller]
pub fn assert_near(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() <= PX_TOLERANCE,
        "Value mismatch: expected {expected}, got {actual}"
    );
}

/// Assert that an inline style property holds a pixel value.
#[track_caller]
pub fn assert_px(page: &TestPage, element: ElementId, property: &str, expected: f32) {
    match page.px(element, property) {
        Some(actual) => assert!(
            (actual - expected).abs() <= PX_TOLERANCE,
            "{property} of element {}: expected {expected}px, got {actual}px",
            element.raw()
        ),
        None => panic!(
            "{property} of element {}: expected {expected}px, got {:?}",
            element.raw(),
            page.host.style_property(element, property)
        ),
    }
}

/// Assert an item's inline `left` / `top`.
#[track_caller]
pub fn assert_position(page: &TestPage, element: ElementId, left: f32, top: f32) {
    assert_px(page, element, "left", left);
    assert_px(page, element, "top", top);
}

/// Assert which lane an item was placed in and its offset along the lane.
#[track_caller]
pub fn assert_slot(instance: &LayoutInstance, element: ElementId, lane: usize, offset: f32) {
    let item = instance
        .placement_of(element)
        .unwrap_or_else(|| panic!("element {} was not placed", element.raw()));
    assert_eq!(
        (item.slot.lane, item.slot.offset),
        (lane, offset),
        "slot of element {}",
        element.raw()
    );
}

/// Assert that nothing the polyfill writes is left on a container or its children.
#[track_caller]
pub fn assert_restored(page: &TestPage, container: ElementId) {
    assert_eq!(
        page.host.get_attribute(container, GRID_LANES_ATTR),
        None,
        "container still marked"
    );
    for property in ["position", "min-height", "min-width"] {
        assert_eq!(
            page.host.style_property(container, property),
            None,
            "container {property}"
        );
    }
    for child in page.host.children(container) {
        for property in ["position", "left", "top", "width", "height"] {
            assert_eq!(
                page.host.style_property(child, property),
                None,
                "child {} {property}",
                child.raw()
            );
        }
    }
}
