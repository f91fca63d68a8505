//! Host trait for the grid-lanes polyfill
//!
//! This trait abstracts over the document the polyfill lays out, allowing
//! the engine to run inside a browser binding or against an in-memory
//! document in tests.

use crate::{
    Bounds, ComputedStyle, ElementId, HostError, MutationOptions, SheetRule, SubscriptionId,
    Viewport,
};

/// Document access and observer services.
///
/// All calls happen on one thread. Notifications for subscriptions are
/// delivered later by the host, never from inside a trait call.
pub trait LayoutHost {
    /// Whether the host natively supports `property: value` (`CSS.supports`).
    fn supports(&self, property: &str, value: &str) -> bool;

    /// Root element of the document.
    fn document_root(&self) -> ElementId;

    /// Computed style of an element
    fn computed_style(&self, element: ElementId) -> Result<ComputedStyle, HostError>;

    /// Font size of the root element in pixels.
    fn root_font_size(&self) -> f32;

    /// Viewport size in pixels.
    fn viewport(&self) -> Viewport;

    /// Layout box of an element (`getBoundingClientRect`).
    fn bounding_box(&self, element: ElementId) -> Result<Bounds, HostError>;

    /// Elements matching a selector, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementId>, HostError>;

    /// Element children in document order.
    fn children(&self, element: ElementId) -> Vec<ElementId>;

    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// Lowercase tag name.
    fn tag_name(&self, element: ElementId) -> Option<String>;

    fn get_attribute(&self, element: ElementId, name: &str) -> Option<String>;

    fn set_attribute(
        &mut self,
        element: ElementId,
        name: &str,
        value: &str,
    ) -> Result<(), HostError>;

    fn remove_attribute(&mut self, element: ElementId, name: &str) -> Result<(), HostError>;

    /// Set an inline style property. An empty value removes it.
    fn set_style_property(
        &mut self,
        element: ElementId,
        property: &str,
        value: &str,
    ) -> Result<(), HostError>;

    /// Text of every `<style>` element, in document order.
    fn style_element_texts(&self) -> Vec<String>;

    /// Rules of every stylesheet. Sheets that cannot be read report an error.
    fn stylesheets(&self) -> Vec<Result<Vec<SheetRule>, HostError>>;

    /// Whether an image element already has its natural size.
    fn image_complete(&self, element: ElementId) -> bool;

    /// Subscribe to DOM mutations.
    fn observe_mutations(
        &mut self,
        target: ElementId,
        options: MutationOptions,
    ) -> Result<SubscriptionId, HostError>;

    /// Subscribe to size changes of an element.
    fn observe_resize(&mut self, target: ElementId) -> Result<SubscriptionId, HostError>;

    /// Subscribe to `load` / `error` of an image element.
    fn observe_image_load(&mut self, image: ElementId) -> Result<SubscriptionId, HostError>;

    /// Release a subscription. Unknown ids are ignored.
    fn unobserve(&mut self, subscription: SubscriptionId);

    /// Ask for a single [`HostNotification::AnimationFrame`](crate::HostNotification).
    fn request_animation_frame(&mut self) -> Result<(), HostError>;

    /// All element descendants in document order, excluding `element`.
    fn descendants(&self, element: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut stack: Vec<ElementId> = self.children(element).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        result
    }

    /// Whether an element has the given tag.
    fn is_tag(&self, element: ElementId, tag: &str) -> bool {
        self.tag_name(element)
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    }
}
