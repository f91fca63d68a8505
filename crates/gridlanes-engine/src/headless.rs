//! # Headless Host
//!
//! An in-memory document implementing [`LayoutHost`].
//!
//! The geometry model is deliberately small: block elements stack
//! vertically and fill their parent's width, absolutely positioned elements
//! sit at their inline `left` / `top` and shrink to their content size, and
//! inline `width` / `height` / `min-*` values win over both. Observers follow
//! the browser delivery order: mutation records first, then queued image
//! events, then the animation frame, then resize observations.

use std::collections::{BTreeMap, VecDeque};

use gridlanes_css::{parse_declarations, resolve_length, DeclarationMap, LengthContext, Viewport};
use gridlanes_host::{
    Bounds, ComputedStyle, ElementId, HostError, HostNotification, ImageOutcome, LayoutHost,
    MutationKind, MutationOptions, MutationRecord, SheetRule, SubscriptionId,
};
use tracing::{trace, warn};

/// Upper bound on notifications delivered by one [`MemoryHost::pump`].
const MAX_PUMPED_NOTIFICATIONS: usize = 10_000;

/// Host services that can be switched off to simulate older hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostApi {
    AnimationFrames,
    ResizeObserver,
    MutationObserver,
    ImageEvents,
}

impl HostApi {
    fn name(self) -> &'static str {
        match self {
            HostApi::AnimationFrames => "requestAnimationFrame",
            HostApi::ResizeObserver => "ResizeObserver",
            HostApi::MutationObserver => "MutationObserver",
            HostApi::ImageEvents => "image load events",
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    /// Attributes other than `style`.
    attributes: BTreeMap<String, String>,
    /// Inline style declarations.
    style: DeclarationMap,
    /// Cascaded values below inline style.
    computed: BTreeMap<String, String>,
    font_size: Option<f32>,
    /// Intrinsic content size.
    content: (f32, f32),
    /// Author-specified size independent of inline style.
    fixed: (Option<f32>, Option<f32>),
    text: String,
    image_complete: bool,
}

impl Node {
    fn new(tag: &str, parent: Option<ElementId>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            parent,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            style: DeclarationMap::new(),
            computed: BTreeMap::new(),
            font_size: None,
            content: (0.0, 0.0),
            fixed: (None, None),
            text: String::new(),
            image_complete: true,
        }
    }

    fn style_attribute(&self) -> Option<String> {
        if self.style.is_empty() {
            return None;
        }
        Some(
            self.style
                .iter()
                .map(|(name, value)| format!("{name}: {value};"))
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    fn has_class(&self, class: &str) -> bool {
        self.attributes
            .get("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

#[derive(Debug, Clone)]
enum Sheet {
    Rules(Vec<SheetRule>),
    CrossOrigin(String),
}

/// In-memory document host.
#[derive(Debug)]
pub struct MemoryHost {
    nodes: Vec<Node>,
    root: ElementId,
    head: ElementId,
    body: ElementId,
    viewport: Viewport,
    native_grid_lanes: bool,
    sheets: Vec<Sheet>,
    disabled: Vec<HostApi>,

    // ==================== Observers ====================
    next_subscription: u64,
    mutation_subs: BTreeMap<SubscriptionId, (ElementId, MutationOptions)>,
    resize_subs: BTreeMap<SubscriptionId, (ElementId, Option<(f32, f32)>)>,
    image_subs: BTreeMap<SubscriptionId, ElementId>,
    pending_mutations: BTreeMap<SubscriptionId, Vec<MutationRecord>>,
    tasks: VecDeque<HostNotification>,
    queue: VecDeque<HostNotification>,
    frame_requested: bool,
    frames_delivered: u64,
}

impl MemoryHost {
    /// Create a document with `<html>`, `<head>` and `<body>` in a viewport.
    pub fn new(width: f32, height: f32) -> Self {
        let root = ElementId::new(0);
        let head = ElementId::new(1);
        let body = ElementId::new(2);

        let mut html = Node::new("html", None);
        html.children = vec![head, body];
        let mut head_node = Node::new("head", Some(root));
        head_node.computed.insert("display".into(), "none".into());

        Self {
            nodes: vec![html, head_node, Node::new("body", Some(root))],
            root,
            head,
            body,
            viewport: Viewport::new(width, height),
            native_grid_lanes: false,
            sheets: Vec::new(),
            disabled: Vec::new(),
            next_subscription: 1,
            mutation_subs: BTreeMap::new(),
            resize_subs: BTreeMap::new(),
            image_subs: BTreeMap::new(),
            pending_mutations: BTreeMap::new(),
            tasks: VecDeque::new(),
            queue: VecDeque::new(),
            frame_requested: false,
            frames_delivered: 0,
        }
    }

    pub fn body(&self) -> ElementId {
        self.body
    }

    pub fn head(&self) -> ElementId {
        self.head
    }

    // ==================== Document building ====================

    /// Append a new element.
    pub fn append(&mut self, parent: ElementId, tag: &str) -> ElementId {
        let id = ElementId::new(self.nodes.len() as u64);
        self.nodes.push(Node::new(tag, Some(parent)));
        if let Some(node) = self.node_mut(parent) {
            node.children.push(id);
        }
        self.record(
            parent,
            MutationKind::ChildList {
                added: vec![id],
                removed: Vec::new(),
            },
        );
        id
    }

    /// Detach an element from its parent.
    pub fn remove(&mut self, element: ElementId) {
        let Some(parent) = self.node(element).and_then(|node| node.parent) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|child| *child != element);
        }
        if let Some(node) = self.node_mut(element) {
            node.parent = None;
        }
        self.record(
            parent,
            MutationKind::ChildList {
                added: Vec::new(),
                removed: vec![element],
            },
        );
    }

    /// Append a `<style>` element to `<head>`.
    pub fn add_style_element(&mut self, css: &str) -> ElementId {
        let head = self.head;
        let style = self.append(head, "style");
        if let Some(node) = self.node_mut(style) {
            node.text = css.to_string();
        }
        style
    }

    /// Add a readable stylesheet.
    pub fn add_stylesheet(&mut self, rules: Vec<SheetRule>) {
        self.sheets.push(Sheet::Rules(rules));
    }

    /// Add a stylesheet whose rules cannot be read.
    pub fn add_cross_origin_stylesheet(&mut self, url: &str) {
        self.sheets.push(Sheet::CrossOrigin(url.to_string()));
    }

    /// Replace the inline style attribute.
    pub fn set_inline_style(&mut self, element: ElementId, css: &str) {
        self.set_style_attribute(element, css);
    }

    pub fn add_class(&mut self, element: ElementId, class: &str) {
        let classes = match self.get_attribute(element, "class") {
            Some(existing) if !existing.split_whitespace().any(|c| c == class) => {
                format!("{existing} {class}")
            }
            Some(existing) => existing,
            None => class.to_string(),
        };
        self.put_attribute(element, "class", &classes);
    }

    /// Set a cascaded (non-inline) computed value.
    pub fn set_computed(&mut self, element: ElementId, property: &str, value: &str) {
        if let Some(node) = self.node_mut(element) {
            node.computed.insert(property.to_string(), value.to_string());
        }
    }

    pub fn set_font_size(&mut self, element: ElementId, px: f32) {
        if let Some(node) = self.node_mut(element) {
            node.font_size = Some(px);
        }
    }

    /// Intrinsic content size.
    pub fn set_content_size(&mut self, element: ElementId, width: f32, height: f32) {
        if let Some(node) = self.node_mut(element) {
            node.content = (width.max(0.0), height.max(0.0));
        }
    }

    /// Author-specified size, as a stylesheet `width` / `height` would set.
    pub fn set_fixed_size(&mut self, element: ElementId, width: Option<f32>, height: Option<f32>) {
        if let Some(node) = self.node_mut(element) {
            node.fixed = (width, height);
        }
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = Viewport::new(width, height);
    }

    pub fn set_native_grid_lanes(&mut self, supported: bool) {
        self.native_grid_lanes = supported;
    }

    pub fn set_api_available(&mut self, api: HostApi, available: bool) {
        self.disabled.retain(|disabled| *disabled != api);
        if !available {
            self.disabled.push(api);
        }
    }

    pub fn set_image_complete(&mut self, image: ElementId, complete: bool) {
        if let Some(node) = self.node_mut(image) {
            node.image_complete = complete;
        }
    }

    /// Finish loading an image and queue `load` / `error` for its observers.
    pub fn settle_image(&mut self, image: ElementId, outcome: ImageOutcome) {
        self.set_image_complete(image, true);
        let subscriptions: Vec<SubscriptionId> = self
            .image_subs
            .iter()
            .filter(|(_, observed)| **observed == image)
            .map(|(sub, _)| *sub)
            .collect();
        for subscription in subscriptions {
            self.tasks.push_back(HostNotification::ImageSettled {
                subscription,
                element: image,
                outcome,
            });
        }
    }

    // ==================== Inspection ====================

    /// Inline style value of one property.
    pub fn style_property(&self, element: ElementId, property: &str) -> Option<String> {
        self.node(element)?.style.get(property).cloned()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.mutation_subs.len() + self.resize_subs.len() + self.image_subs.len()
    }

    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered
    }

    // ==================== Delivery ====================

    /// Next notification in delivery order, or `None` when idle.
    pub fn next_notification(&mut self) -> Option<HostNotification> {
        if let Some(notification) = self.queue.pop_front() {
            return Some(notification);
        }

        if !self.pending_mutations.is_empty() {
            for (subscription, records) in std::mem::take(&mut self.pending_mutations) {
                self.queue.push_back(HostNotification::Mutation {
                    subscription,
                    records,
                });
            }
            return self.queue.pop_front();
        }

        if let Some(task) = self.tasks.pop_front() {
            return Some(task);
        }

        if self.frame_requested {
            self.frame_requested = false;
            self.frames_delivered += 1;
            return Some(HostNotification::AnimationFrame);
        }

        self.collect_resizes();
        self.queue.pop_front()
    }

    /// Deliver notifications until idle. Returns how many were delivered.
    pub fn pump(&mut self, mut handler: impl FnMut(&mut MemoryHost, &HostNotification)) -> usize {
        let mut delivered = 0;
        while let Some(notification) = self.next_notification() {
            handler(self, &notification);
            delivered += 1;
            if delivered >= MAX_PUMPED_NOTIFICATIONS {
                warn!(delivered, "Notification loop did not settle");
                break;
            }
        }
        delivered
    }

    fn collect_resizes(&mut self) {
        let observed: Vec<(SubscriptionId, ElementId, Option<(f32, f32)>)> = self
            .resize_subs
            .iter()
            .map(|(sub, (element, last))| (*sub, *element, *last))
            .collect();

        for (subscription, element, last) in observed {
            let bounds = self.layout_box(element);
            let size = (bounds.width, bounds.height);
            if last == Some(size) {
                continue;
            }
            if let Some(entry) = self.resize_subs.get_mut(&subscription) {
                entry.1 = Some(size);
            }
            self.queue.push_back(HostNotification::Resize {
                subscription,
                element,
                bounds,
            });
        }
    }

    fn record(&mut self, target: ElementId, kind: MutationKind) {
        let attribute = match &kind {
            MutationKind::Attribute { name } => Some(name.clone()),
            MutationKind::ChildList { .. } => None,
        };

        let subscriptions: Vec<SubscriptionId> = self
            .mutation_subs
            .iter()
            .filter(|(_, (observed, options))| {
                let in_scope = *observed == target
                    || (options.subtree && self.is_ancestor(*observed, target));
                let wanted = match &attribute {
                    Some(name) => options.watches_attribute(name),
                    None => options.child_list,
                };
                in_scope && wanted
            })
            .map(|(sub, _)| *sub)
            .collect();

        for subscription in subscriptions {
            self.pending_mutations
                .entry(subscription)
                .or_default()
                .push(MutationRecord {
                    target,
                    kind: kind.clone(),
                });
        }
    }

    fn subscribe(&mut self) -> SubscriptionId {
        let sub = SubscriptionId::new(self.next_subscription);
        self.next_subscription += 1;
        sub
    }

    fn require(&self, api: HostApi) -> Result<(), HostError> {
        if self.disabled.contains(&api) {
            return Err(HostError::Unsupported(api.name().to_string()));
        }
        Ok(())
    }

    // ==================== Nodes ====================

    fn node(&self, element: ElementId) -> Option<&Node> {
        self.nodes.get(element.raw() as usize)
    }

    fn node_mut(&mut self, element: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(element.raw() as usize)
    }

    fn known(&self, element: ElementId) -> Result<&Node, HostError> {
        self.node(element).ok_or(HostError::UnknownElement(element))
    }

    fn is_ancestor(&self, ancestor: ElementId, element: ElementId) -> bool {
        let mut current = self.node(element).and_then(|node| node.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.node(parent).and_then(|node| node.parent);
        }
        false
    }

    fn put_attribute(&mut self, element: ElementId, name: &str, value: &str) {
        let Some(node) = self.node_mut(element) else {
            return;
        };
        if node.attributes.get(name).map(String::as_str) == Some(value) {
            return;
        }
        node.attributes.insert(name.to_string(), value.to_string());
        self.record(element, MutationKind::Attribute { name: name.to_string() });
    }

    fn set_style_attribute(&mut self, element: ElementId, css: &str) {
        let Some(node) = self.node_mut(element) else {
            return;
        };
        let before = node.style_attribute();
        node.style = parse_declarations(css);
        if node.style_attribute() != before {
            self.record(element, MutationKind::Attribute { name: "style".into() });
        }
    }

    // ==================== Geometry ====================

    fn font_size_of(&self, element: ElementId) -> f32 {
        let mut current = Some(element);
        while let Some(id) = current {
            let Some(node) = self.node(id) else { break };
            if let Some(size) = node.font_size {
                return size;
            }
            current = node.parent;
        }
        16.0
    }

    fn is_hidden(&self, element: ElementId) -> bool {
        self.computed_display(element) == "none"
    }

    fn computed_display(&self, element: ElementId) -> String {
        let Some(node) = self.node(element) else {
            return "none".to_string();
        };
        let display = node
            .style
            .get("display")
            .or_else(|| node.computed.get("display"))
            .map(|value| value.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "block".to_string());
        if display == "grid-lanes" && !self.native_grid_lanes {
            return "block".to_string();
        }
        display
    }

    fn is_absolute(&self, element: ElementId) -> bool {
        self.node(element)
            .and_then(|node| node.style.get("position"))
            .is_some_and(|position| matches!(position.trim(), "absolute" | "fixed"))
    }

    fn inline_px(&self, element: ElementId, property: &str, basis: f32) -> Option<f32> {
        let value = self.node(element)?.style.get(property)?;
        let ctx = LengthContext {
            container_size: basis,
            font_size: self.font_size_of(element),
            root_font_size: self.font_size_of(self.root),
            viewport: self.viewport,
        };
        resolve_length(value.trim(), &ctx)
    }

    fn parent_width(&self, element: ElementId) -> f32 {
        match self.node(element).and_then(|node| node.parent) {
            Some(parent) => self.width_of(parent),
            None => self.viewport.width,
        }
    }

    fn in_flow_children(&self, element: ElementId) -> Vec<ElementId> {
        self.node(element)
            .map(|node| {
                node.children
                    .iter()
                    .copied()
                    .filter(|child| !self.is_hidden(*child) && !self.is_absolute(*child))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn width_of(&self, element: ElementId) -> f32 {
        let Some(node) = self.node(element) else {
            return 0.0;
        };
        if element == self.root {
            return self.viewport.width;
        }
        if self.is_hidden(element) {
            return 0.0;
        }

        let basis = self.parent_width(element);
        let width = self
            .inline_px(element, "width", basis)
            .or(node.fixed.0)
            .unwrap_or_else(|| {
                if self.is_absolute(element) {
                    node.content.0
                } else {
                    basis
                }
            });
        let min = self.inline_px(element, "min-width", basis).unwrap_or(0.0);
        width.max(min).max(0.0)
    }

    fn height_of(&self, element: ElementId) -> f32 {
        let Some(node) = self.node(element) else {
            return 0.0;
        };
        if self.is_hidden(element) {
            return 0.0;
        }

        let flow: f32 = self
            .in_flow_children(element)
            .into_iter()
            .map(|child| self.height_of(child))
            .sum();
        let mut height = self
            .inline_px(element, "height", 0.0)
            .or(node.fixed.1)
            .unwrap_or_else(|| node.content.1.max(flow));
        if element == self.root {
            height = height.max(self.viewport.height);
        }
        let min = self.inline_px(element, "min-height", 0.0).unwrap_or(0.0);
        height.max(min).max(0.0)
    }

    fn layout_box(&self, element: ElementId) -> Bounds {
        let width = self.width_of(element);
        let height = self.height_of(element);
        let Some(parent) = self.node(element).and_then(|node| node.parent) else {
            return Bounds::new(0.0, 0.0, width, height);
        };
        let origin = self.layout_box(parent);

        if self.is_absolute(element) {
            let left = self.inline_px(element, "left", origin.width).unwrap_or(0.0);
            let top = self.inline_px(element, "top", origin.height).unwrap_or(0.0);
            return Bounds::new(origin.x + left, origin.y + top, width, height);
        }

        let above: f32 = self
            .in_flow_children(parent)
            .into_iter()
            .take_while(|sibling| *sibling != element)
            .map(|sibling| self.height_of(sibling))
            .sum();
        Bounds::new(origin.x, origin.y + above, width, height)
    }

    // ==================== Selectors ====================

    fn all_elements(&self) -> Vec<ElementId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .collect()
    }

    fn matches_compound(&self, element: ElementId, compound: &Compound) -> bool {
        let Some(node) = self.node(element) else {
            return false;
        };
        if compound.tag.as_deref().is_some_and(|tag| tag != node.tag) {
            return false;
        }
        if compound.id.as_deref().is_some_and(|id| {
            node.attributes.get("id").map(String::as_str) != Some(id)
        }) {
            return false;
        }
        if !compound.classes.iter().all(|class| node.has_class(class)) {
            return false;
        }
        compound.attributes.iter().all(|(name, test)| {
            let value = if name == "style" {
                node.style_attribute()
            } else {
                node.attributes.get(name).cloned()
            };
            match (value, test) {
                (None, _) => false,
                (Some(_), AttributeTest::Exists) => true,
                (Some(value), AttributeTest::Equals(expected)) => value == *expected,
                (Some(value), AttributeTest::Contains(expected)) => value.contains(expected.as_str()),
            }
        })
    }

    fn matches_complex(&self, element: ElementId, compounds: &[Compound]) -> bool {
        let Some((last, rest)) = compounds.split_last() else {
            return false;
        };
        if !self.matches_compound(element, last) {
            return false;
        }
        if rest.is_empty() {
            return true;
        }
        let mut ancestor = self.node(element).and_then(|node| node.parent);
        while let Some(candidate) = ancestor {
            if self.matches_complex(candidate, rest) {
                return true;
            }
            ancestor = self.node(candidate).and_then(|node| node.parent);
        }
        false
    }
}

impl LayoutHost for MemoryHost {
    fn supports(&self, property: &str, value: &str) -> bool {
        property.eq_ignore_ascii_case("display")
            && value.eq_ignore_ascii_case("grid-lanes")
            && self.native_grid_lanes
    }

    fn document_root(&self) -> ElementId {
        self.root
    }

    fn computed_style(&self, element: ElementId) -> Result<ComputedStyle, HostError> {
        let node = self.known(element)?;
        let mut style = ComputedStyle::new(self.font_size_of(element));
        for (name, value) in node.computed.iter().chain(node.style.iter()) {
            style.set(name.as_str(), value.as_str());
        }
        style.set("display", self.computed_display(element));
        Ok(style)
    }

    fn root_font_size(&self) -> f32 {
        self.font_size_of(self.root)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn bounding_box(&self, element: ElementId) -> Result<Bounds, HostError> {
        self.known(element)?;
        Ok(self.layout_box(element))
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementId>, HostError> {
        let list = parse_selector_list(selector)?;
        Ok(self
            .all_elements()
            .into_iter()
            .filter(|element| list.iter().any(|complex| self.matches_complex(*element, complex)))
            .collect())
    }

    fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.node(element)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.node(element)?.parent
    }

    fn tag_name(&self, element: ElementId) -> Option<String> {
        Some(self.node(element)?.tag.clone())
    }

    fn get_attribute(&self, element: ElementId, name: &str) -> Option<String> {
        let node = self.node(element)?;
        if name.eq_ignore_ascii_case("style") {
            return node.style_attribute();
        }
        node.attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str) -> Result<(), HostError> {
        self.known(element)?;
        if name.eq_ignore_ascii_case("style") {
            self.set_style_attribute(element, value);
        } else {
            self.put_attribute(element, name, value);
        }
        Ok(())
    }

    fn remove_attribute(&mut self, element: ElementId, name: &str) -> Result<(), HostError> {
        let node = self
            .node_mut(element)
            .ok_or(HostError::UnknownElement(element))?;
        let removed = if name.eq_ignore_ascii_case("style") {
            let had_style = !node.style.is_empty();
            node.style.clear();
            had_style
        } else {
            node.attributes.remove(name).is_some()
        };
        if removed {
            self.record(element, MutationKind::Attribute { name: name.to_string() });
        }
        Ok(())
    }

    fn set_style_property(&mut self, element: ElementId, property: &str, value: &str) -> Result<(), HostError> {
        let node = self
            .node_mut(element)
            .ok_or(HostError::UnknownElement(element))?;
        let property = property.to_ascii_lowercase();
        let value = value.trim();

        let changed = if value.is_empty() {
            node.style.remove(&property).is_some()
        } else if node.style.get(&property).map(String::as_str) == Some(value) {
            false
        } else {
            node.style.insert(property.clone(), value.to_string());
            true
        };

        if changed {
            trace!(element = element.raw(), property = property.as_str(), value, "Inline style write");
            self.record(element, MutationKind::Attribute { name: "style".into() });
        }
        Ok(())
    }

    fn style_element_texts(&self) -> Vec<String> {
        self.all_elements()
            .into_iter()
            .filter_map(|element| self.node(element))
            .filter(|node| node.tag == "style")
            .map(|node| node.text.clone())
            .collect()
    }

    fn stylesheets(&self) -> Vec<Result<Vec<SheetRule>, HostError>> {
        let inline = self
            .style_element_texts()
            .into_iter()
            .map(|text| Ok::<_, HostError>(split_rules(&text)));
        let external = self.sheets.iter().map(|sheet| match sheet {
            Sheet::Rules(rules) => Ok(rules.clone()),
            Sheet::CrossOrigin(url) => Err(HostError::SheetInaccessible(url.clone())),
        });
        inline.chain(external).collect()
    }

    fn image_complete(&self, element: ElementId) -> bool {
        self.node(element).map_or(true, |node| node.image_complete)
    }

    fn observe_mutations(&mut self, target: ElementId, options: MutationOptions) -> Result<SubscriptionId, HostError> {
        self.require(HostApi::MutationObserver)?;
        self.known(target)?;
        let sub = self.subscribe();
        self.mutation_subs.insert(sub, (target, options));
        Ok(sub)
    }

    fn observe_resize(&mut self, target: ElementId) -> Result<SubscriptionId, HostError> {
        self.require(HostApi::ResizeObserver)?;
        self.known(target)?;
        let sub = self.subscribe();
        // The first observation is always reported.
        self.resize_subs.insert(sub, (target, None));
        Ok(sub)
    }

    fn observe_image_load(&mut self, image: ElementId) -> Result<SubscriptionId, HostError> {
        self.require(HostApi::ImageEvents)?;
        self.known(image)?;
        let sub = self.subscribe();
        self.image_subs.insert(sub, image);
        Ok(sub)
    }

    fn unobserve(&mut self, subscription: SubscriptionId) {
        self.mutation_subs.remove(&subscription);
        self.resize_subs.remove(&subscription);
        self.image_subs.remove(&subscription);
        self.pending_mutations.remove(&subscription);
        self.tasks
            .retain(|task| task.subscription() != Some(subscription));
        self.queue
            .retain(|queued| queued.subscription() != Some(subscription));
    }

    fn request_animation_frame(&mut self) -> Result<(), HostError> {
        self.require(HostApi::AnimationFrames)?;
        self.frame_requested = true;
        Ok(())
    }
}

/// Split stylesheet text into flat rules. At-rules are skipped.
fn split_rules(css: &str) -> Vec<SheetRule> {
    css.split('}')
        .filter_map(|chunk| {
            let (selector, body) = chunk.split_once('{')?;
            let selector = selector.trim();
            if selector.is_empty() || selector.starts_with('@') {
                return None;
            }
            Some(SheetRule::new(selector, format!("{selector} {{ {} }}", body.trim())))
        })
        .collect()
}

// ==================== Selector parsing ====================

#[derive(Debug, Clone, PartialEq)]
enum AttributeTest {
    Exists,
    Equals(String),
    Contains(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, AttributeTest)>,
}

/// Parse a selector list of compound selectors joined by descendant
/// combinators.
fn parse_selector_list(selector: &str) -> Result<Vec<Vec<Compound>>, HostError> {
    let invalid = || HostError::InvalidSelector(selector.to_string());

    split_outside_brackets(selector, |c| c == ',')
        .into_iter()
        .map(|complex| {
            let compounds = split_outside_brackets(complex, char::is_whitespace)
                .into_iter()
                .filter(|part| !part.is_empty())
                .map(|part| parse_compound(part).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()?;
            if compounds.is_empty() {
                return Err(invalid());
            }
            Ok(compounds)
        })
        .collect()
}

fn split_outside_brackets(input: &str, is_separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth -= 1,
            (None, c) if depth == 0 && is_separator(c) => {
                parts.push(input[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(input[start..].trim());
    parts
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(input: &str) -> (&str, &str) {
    let end = input
        .find(|c: char| !is_ident_char(c))
        .unwrap_or(input.len());
    input.split_at(end)
}

fn parse_compound(input: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut rest = input;

    if let Some(after) = rest.strip_prefix('*') {
        rest = after;
    } else {
        let (tag, after) = take_ident(rest);
        if !tag.is_empty() {
            compound.tag = Some(tag.to_ascii_lowercase());
            rest = after;
        }
    }

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let (class, after) = take_ident(after);
            if class.is_empty() {
                return None;
            }
            compound.classes.push(class.to_string());
            rest = after;
        } else if let Some(after) = rest.strip_prefix('#') {
            let (id, after) = take_ident(after);
            if id.is_empty() {
                return None;
            }
            compound.id = Some(id.to_string());
            rest = after;
        } else if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']')?;
            compound.attributes.push(parse_attribute(&after[..close])?);
            rest = &after[close + 1..];
        } else {
            return None;
        }
    }

    Some(compound)
}

fn parse_attribute(body: &str) -> Option<(String, AttributeTest)> {
    let unquote = |value: &str| {
        let value = value.trim();
        value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value)
            .to_string()
    };

    let (name, test) = if let Some((name, value)) = body.split_once("*=") {
        (name, AttributeTest::Contains(unquote(value)))
    } else if let Some((name, value)) = body.split_once('=') {
        (name, AttributeTest::Equals(unquote(value)))
    } else {
        (body, AttributeTest::Exists)
    };

    let name = name.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return None;
    }
    Some((name.to_ascii_lowercase(), test))
}
