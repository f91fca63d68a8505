//! # Layout Instance
//!
//! Polyfilled layout of a single grid-lanes container.
//!
//! An instance owns the container's harvested declarations, its observer
//! subscriptions and the results of the last pass. Relayout triggers are
//! coalesced: a dirty instance requests one animation frame and runs at most
//! one pass when it arrives.

use std::collections::BTreeMap;

use gridlanes_css::{parse_declarations, parse_template, DeclarationMap};
use gridlanes_host::{
    Bounds, ElementId, HostError, HostNotification, ImageOutcome, LayoutHost, MutationKind,
    MutationOptions, MutationRecord, SubscriptionId,
};
use gridlanes_layout::{
    collapse_empty_auto_fit, distribute_space, size_lanes, Axis, Lane, LanePlacer, Slot,
};
use tracing::{debug, trace, warn};

use crate::styles::{item_placement, ContainerStyles};
use crate::{PolyfillOptions, GRID_LANES_ATTR};

/// Size differences below this are treated as unchanged.
const SIZE_EPSILON: f32 = 0.01;

/// Container properties written by the polyfill.
const CONTAINER_PROPERTIES: [&str; 4] = ["position", "display", "min-height", "min-width"];

/// Item properties written by the polyfill.
const ITEM_PROPERTIES: [&str; 5] = ["position", "left", "top", "width", "height"];

/// Counters for the passes an instance has run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutStats {
    /// Completed layout passes.
    pub passes: u64,
    /// Lane count of the last pass.
    pub last_lane_count: usize,
    /// Largest lane fill of the last pass.
    pub last_extent: f32,
}

/// Where one item ended up in the last pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemLayout {
    pub element: ElementId,
    pub slot: Slot,
    /// Measured size along the stacking axis.
    pub extent: f32,
}

#[derive(Debug, Default)]
struct Subscriptions {
    container_resize: Option<SubscriptionId>,
    mutations: Option<SubscriptionId>,
    children: BTreeMap<ElementId, SubscriptionId>,
    images: BTreeMap<ElementId, SubscriptionId>,
}

impl Subscriptions {
    fn drain(&mut self) -> Vec<SubscriptionId> {
        let mut all: Vec<SubscriptionId> = self
            .container_resize
            .take()
            .into_iter()
            .chain(self.mutations.take())
            .collect();
        all.extend(std::mem::take(&mut self.children).into_values());
        all.extend(std::mem::take(&mut self.images).into_values());
        all
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Resize,
    Mutations,
    Images,
}

impl Trigger {
    fn name(self) -> &'static str {
        match self {
            Trigger::Resize => "resize",
            Trigger::Mutations => "mutations",
            Trigger::Images => "images",
        }
    }
}

/// Which host services an instance still uses.
///
/// A service the host reports as unsupported is switched off for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerSupport {
    pub resize: bool,
    pub mutations: bool,
    pub images: bool,
    /// Without frames, relayouts run immediately.
    pub frames: bool,
}

impl Default for TriggerSupport {
    fn default() -> Self {
        Self {
            resize: true,
            mutations: true,
            images: true,
            frames: true,
        }
    }
}

/// Polyfilled layout of one container.
#[derive(Debug)]
pub struct LayoutInstance {
    container: ElementId,
    declarations: DeclarationMap,
    options: PolyfillOptions,

    // ==================== Last pass ====================
    axis: Axis,
    lanes: Vec<Lane>,
    fills: Vec<f32>,
    placements: Vec<ItemLayout>,
    /// Lane-axis size of the container.
    available: Option<f32>,
    /// Stacking-axis size of every placed item.
    child_extents: BTreeMap<ElementId, f32>,
    /// Container `style` attribute right after the pass.
    written_style: Option<String>,
    stats: LayoutStats,

    // ==================== Scheduling ====================
    subscriptions: Subscriptions,
    triggers: TriggerSupport,
    observing: bool,
    frame_pending: bool,
    destroyed: bool,
}

impl LayoutInstance {
    /// Take over a container: mark it, run the first pass and subscribe to
    /// relayout triggers.
    pub fn attach(
        host: &mut dyn LayoutHost,
        container: ElementId,
        declarations: DeclarationMap,
        options: PolyfillOptions,
    ) -> Self {
        let mut instance = Self {
            container,
            declarations,
            options,
            axis: Axis::default(),
            lanes: Vec::new(),
            fills: Vec::new(),
            placements: Vec::new(),
            available: None,
            child_extents: BTreeMap::new(),
            written_style: None,
            stats: LayoutStats::default(),
            subscriptions: Subscriptions::default(),
            triggers: TriggerSupport::default(),
            observing: false,
            frame_pending: false,
            destroyed: false,
        };

        if let Err(err) = host.set_attribute(container, GRID_LANES_ATTR, "true") {
            debug!(container = container.raw(), %err, "Could not mark container");
        }
        instance.layout(host);
        instance.observe(host);

        debug!(container = container.raw(), "Attached grid-lanes instance");
        instance
    }

    pub fn container(&self) -> ElementId {
        self.container
    }

    pub fn declarations(&self) -> &DeclarationMap {
        &self.declarations
    }

    pub fn options(&self) -> &PolyfillOptions {
        &self.options
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Lanes of the last pass.
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Lane fills of the last pass.
    pub fn fills(&self) -> &[f32] {
        &self.fills
    }

    /// Item placements of the last pass, in placement order.
    pub fn placements(&self) -> &[ItemLayout] {
        &self.placements
    }

    pub fn placement_of(&self, element: ElementId) -> Option<&ItemLayout> {
        self.placements.iter().find(|item| item.element == element)
    }

    pub fn stats(&self) -> LayoutStats {
        self.stats
    }

    pub fn triggers(&self) -> TriggerSupport {
        self.triggers
    }

    /// Whether a relayout is waiting for an animation frame.
    pub fn is_pending(&self) -> bool {
        self.frame_pending
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether a subscription belongs to this instance.
    pub fn owns(&self, subscription: SubscriptionId) -> bool {
        let subs = &self.subscriptions;
        subs.container_resize == Some(subscription)
            || subs.mutations == Some(subscription)
            || subs.children.values().any(|sub| *sub == subscription)
            || subs.images.values().any(|sub| *sub == subscription)
    }

    /// Replace the harvested declarations; schedules a relayout on change.
    pub fn set_declarations(&mut self, host: &mut dyn LayoutHost, declarations: DeclarationMap) {
        if self.destroyed || declarations == self.declarations {
            return;
        }
        trace!(container = self.container.raw(), "Declarations changed");
        self.declarations = declarations;
        self.schedule(host);
    }

    /// Run a layout pass now.
    pub fn refresh(&mut self, host: &mut dyn LayoutHost) {
        self.layout(host);
    }

    /// Run one synchronous layout pass.
    pub fn layout(&mut self, host: &mut dyn LayoutHost) {
        if self.destroyed {
            return;
        }
        self.frame_pending = false;

        let container = self.container;
        write_style(host, container, "position", "relative");
        write_style(host, container, "display", "block");

        let styles = ContainerStyles::resolve(
            &*host,
            container,
            &self.declarations,
            self.options.default_tolerance,
        );
        let bounds = host.bounding_box(container).unwrap_or_else(|err| {
            debug!(container = container.raw(), %err, "No container bounds");
            Bounds::default()
        });

        let axis = styles.axis;
        let available = match axis {
            Axis::Columns => bounds.width,
            Axis::Rows => bounds.height,
        }
        .max(0.0);
        let lane_gap = styles.lane_gap();
        let item_gap = styles.item_gap();

        let tokens = parse_template(styles.template());
        let mut lanes = size_lanes(&tokens, available, lane_gap, &styles.length_context(available));

        let items = self.items(&*host);
        let (explicit, auto): (Vec<_>, Vec<_>) = items
            .into_iter()
            .partition(|(_, placement)| axis.item_lanes(placement).0.is_some());

        let mut collapsed = false;
        let (placer, placements) = loop {
            let mut placer = match LanePlacer::new(&lanes, lane_gap, item_gap, styles.tolerance) {
                Ok(placer) => placer,
                Err(err) => {
                    warn!(container = container.raw(), %err, "Layout pass skipped");
                    return;
                }
            };

            let mut placements = Vec::with_capacity(explicit.len() + auto.len());
            for (element, placement) in explicit.iter().chain(auto.iter()) {
                let (start, span) = axis.item_lanes(placement);
                let slot = match start {
                    Some(start) => placer.place_explicit(start, span),
                    None => placer.place_auto(span),
                };
                position_item(host, *element, axis, &slot);
                let extent = measure(&*host, *element, axis);
                placer.commit(&slot, extent);
                placements.push(ItemLayout {
                    element: *element,
                    slot,
                    extent,
                });
            }

            if self.options.collapse_auto_fit
                && !collapsed
                && collapse_empty_auto_fit(&mut lanes, placer.occupied())
            {
                distribute_space(&mut lanes, available, lane_gap);
                collapsed = true;
                continue;
            }
            break (placer, placements);
        };

        let extent = placer.extent();
        let (extent_property, other_property) = match axis {
            Axis::Columns => ("min-height", "min-width"),
            Axis::Rows => ("min-width", "min-height"),
        };
        if self.axis != axis && self.stats.passes > 0 {
            write_style(host, container, other_property, "");
        }
        write_style(host, container, extent_property, &px(extent));

        self.axis = axis;
        self.available = Some(available);
        self.child_extents = placements
            .iter()
            .map(|item| (item.element, item.extent))
            .collect();
        self.fills = placer.fills().to_vec();
        self.stats.passes += 1;
        self.stats.last_lane_count = lanes.len();
        self.stats.last_extent = extent;
        self.lanes = lanes;
        self.placements = placements;
        self.written_style = host.get_attribute(container, "style");

        debug!(
            container = container.raw(),
            lanes = self.lanes.len(),
            items = self.placements.len(),
            extent,
            pass = self.stats.passes,
            "Layout pass"
        );

        if self.observing {
            self.sync_child_observers(host);
        }
    }

    /// React to a host notification.
    ///
    /// Returns `true` if the notification was addressed to this instance.
    pub fn handle_notification(
        &mut self,
        host: &mut dyn LayoutHost,
        notification: &HostNotification,
    ) -> bool {
        if self.destroyed {
            return false;
        }

        match notification {
            HostNotification::AnimationFrame => self.on_animation_frame(host),
            HostNotification::Mutation {
                subscription,
                records,
            } if self.subscriptions.mutations == Some(*subscription) => {
                if self.mutations_need_layout(host, records) {
                    self.schedule(host);
                }
                true
            }
            HostNotification::Resize {
                subscription,
                element,
                bounds,
            } if self.subscriptions.container_resize == Some(*subscription)
                || self.subscriptions.children.get(element) == Some(subscription) =>
            {
                if self.resize_needs_layout(*element, bounds) {
                    self.schedule(host);
                }
                true
            }
            HostNotification::ImageSettled {
                subscription,
                element,
                outcome,
            } if self.subscriptions.images.get(element) == Some(subscription) => {
                self.subscriptions.images.remove(element);
                host.unobserve(*subscription);
                match outcome {
                    ImageOutcome::Loaded => trace!(image = element.raw(), "Image loaded"),
                    ImageOutcome::Failed => debug!(image = element.raw(), "Image failed to load"),
                }
                self.schedule(host);
                true
            }
            _ => false,
        }
    }

    /// Run the pending pass, if any. Returns `true` if a pass ran.
    pub fn on_animation_frame(&mut self, host: &mut dyn LayoutHost) -> bool {
        if self.destroyed || !self.frame_pending {
            return false;
        }
        self.layout(host);
        true
    }

    /// Release every subscription and remove everything the polyfill wrote.
    pub fn destroy(&mut self, host: &mut dyn LayoutHost) {
        if self.destroyed {
            return;
        }
        for subscription in self.subscriptions.drain() {
            host.unobserve(subscription);
        }

        let container = self.container;
        if let Err(err) = host.remove_attribute(container, GRID_LANES_ATTR) {
            debug!(container = container.raw(), %err, "Could not unmark container");
        }
        for property in CONTAINER_PROPERTIES {
            write_style(host, container, property, "");
        }
        for child in host.children(container) {
            for property in ITEM_PROPERTIES {
                write_style(host, child, property, "");
            }
        }

        self.destroyed = true;
        self.observing = false;
        self.frame_pending = false;
        debug!(container = container.raw(), "Destroyed grid-lanes instance");
    }

    // ==================== Triggers ====================

    fn schedule(&mut self, host: &mut dyn LayoutHost) {
        if self.frame_pending {
            return;
        }
        if !self.triggers.frames {
            self.layout(host);
            return;
        }

        match host.request_animation_frame() {
            Ok(()) => {
                self.frame_pending = true;
                trace!(container = self.container.raw(), "Relayout scheduled");
            }
            Err(err) => {
                if matches!(err, HostError::Unsupported(_)) {
                    self.triggers.frames = false;
                }
                debug!(%err, "Animation frames unavailable, laying out immediately");
                self.layout(host);
            }
        }
    }

    fn observe(&mut self, host: &mut dyn LayoutHost) {
        self.observing = true;
        let container = self.container;

        match host.observe_resize(container) {
            Ok(sub) => self.subscriptions.container_resize = Some(sub),
            Err(err) => self.trigger_failed(Trigger::Resize, err),
        }

        let options = MutationOptions::child_list().attributes(["style", "class"]);
        match host.observe_mutations(container, options) {
            Ok(sub) => self.subscriptions.mutations = Some(sub),
            Err(err) => self.trigger_failed(Trigger::Mutations, err),
        }

        self.sync_child_observers(host);
        self.observe_images(host, container);
    }

    fn trigger_failed(&mut self, trigger: Trigger, err: HostError) {
        if matches!(err, HostError::Unsupported(_)) {
            match trigger {
                Trigger::Resize => self.triggers.resize = false,
                Trigger::Mutations => self.triggers.mutations = false,
                Trigger::Images => self.triggers.images = false,
            }
            debug!(trigger = trigger.name(), %err, "Trigger disabled");
        } else {
            debug!(trigger = trigger.name(), %err, "Subscription failed");
        }
    }

    fn sync_child_observers(&mut self, host: &mut dyn LayoutHost) {
        if !self.triggers.resize {
            return;
        }
        let children = host.children(self.container);

        let stale: Vec<ElementId> = self
            .subscriptions
            .children
            .keys()
            .filter(|child| !children.contains(child))
            .copied()
            .collect();
        for child in stale {
            if let Some(sub) = self.subscriptions.children.remove(&child) {
                host.unobserve(sub);
            }
        }

        for child in children {
            if self.subscriptions.children.contains_key(&child) {
                continue;
            }
            match host.observe_resize(child) {
                Ok(sub) => {
                    self.subscriptions.children.insert(child, sub);
                }
                Err(err) => {
                    let unsupported = matches!(err, HostError::Unsupported(_));
                    self.trigger_failed(Trigger::Resize, err);
                    if unsupported {
                        return;
                    }
                }
            }
        }
    }

    fn observe_images(&mut self, host: &mut dyn LayoutHost, root: ElementId) {
        if !self.options.observe_images || !self.triggers.images {
            return;
        }

        let images: Vec<ElementId> = std::iter::once(root)
            .chain(host.descendants(root))
            .filter(|element| host.is_tag(*element, "img"))
            .filter(|image| !self.subscriptions.images.contains_key(image))
            .filter(|image| !host.image_complete(*image))
            .collect();

        for image in images {
            match host.observe_image_load(image) {
                Ok(sub) => {
                    self.subscriptions.images.insert(image, sub);
                }
                Err(err) => {
                    let unsupported = matches!(err, HostError::Unsupported(_));
                    self.trigger_failed(Trigger::Images, err);
                    if unsupported {
                        return;
                    }
                }
            }
        }
    }

    fn mutations_need_layout(
        &mut self,
        host: &mut dyn LayoutHost,
        records: &[MutationRecord],
    ) -> bool {
        let mut needed = false;
        for record in records {
            match &record.kind {
                MutationKind::ChildList { added, removed } => {
                    for child in removed {
                        if let Some(sub) = self.subscriptions.children.remove(child) {
                            host.unobserve(sub);
                        }
                    }
                    for child in added {
                        self.observe_images(host, *child);
                    }
                    self.sync_child_observers(host);
                    needed = true;
                }
                MutationKind::Attribute { name } if record.target == self.container => {
                    if name == "style" {
                        let current = host.get_attribute(self.container, "style");
                        if current == self.written_style {
                            trace!("Ignoring own style write");
                            continue;
                        }
                        self.merge_inline_declarations(current.as_deref());
                        needed = true;
                    } else if name == "class" {
                        needed = true;
                    }
                }
                MutationKind::Attribute { .. } => {}
            }
        }
        needed
    }

    /// Merge author inline declarations over the harvested ones. Properties
    /// the polyfill writes on the container are skipped.
    fn merge_inline_declarations(&mut self, style: Option<&str>) {
        let Some(style) = style else {
            return;
        };
        for (name, value) in parse_declarations(style) {
            if CONTAINER_PROPERTIES.contains(&name.as_str()) {
                continue;
            }
            if self.declarations.get(&name) != Some(&value) {
                trace!(property = name.as_str(), value = value.as_str(), "Inline declaration changed");
                self.declarations.insert(name, value);
            }
        }
    }

    fn resize_needs_layout(&self, element: ElementId, bounds: &Bounds) -> bool {
        if element == self.container {
            let size = match self.axis {
                Axis::Columns => bounds.width,
                Axis::Rows => bounds.height,
            };
            return self
                .available
                .map_or(true, |available| (available - size).abs() > SIZE_EPSILON);
        }

        let extent = match self.axis {
            Axis::Columns => bounds.height,
            Axis::Rows => bounds.width,
        };
        self.child_extents
            .get(&element)
            .map_or(true, |last| (last - extent).abs() > SIZE_EPSILON)
    }

    // ==================== Items ====================

    fn items(&self, host: &dyn LayoutHost) -> Vec<(ElementId, gridlanes_css::ItemPlacement)> {
        host.children(self.container)
            .into_iter()
            .filter_map(|child| {
                let computed = host.computed_style(child).ok()?;
                if computed.display().is_some_and(|display| display.trim() == "none") {
                    return None;
                }
                Some((child, item_placement(&computed)))
            })
            .collect()
    }
}

fn position_item(host: &mut dyn LayoutHost, element: ElementId, axis: Axis, slot: &Slot) {
    write_style(host, element, "position", "absolute");
    match axis {
        Axis::Columns => {
            write_style(host, element, "left", &px(slot.cross_offset));
            write_style(host, element, "top", &px(slot.offset));
            write_style(host, element, "width", &px(slot.cross_size));
            write_style(host, element, "height", "");
        }
        Axis::Rows => {
            write_style(host, element, "top", &px(slot.cross_offset));
            write_style(host, element, "left", &px(slot.offset));
            write_style(host, element, "height", &px(slot.cross_size));
            write_style(host, element, "width", "");
        }
    }
}

fn measure(host: &dyn LayoutHost, element: ElementId, axis: Axis) -> f32 {
    match host.bounding_box(element) {
        Ok(bounds) => match axis {
            Axis::Columns => bounds.height,
            Axis::Rows => bounds.width,
        },
        Err(err) => {
            debug!(element = element.raw(), %err, "Item could not be measured");
            0.0
        }
    }
}

fn write_style(host: &mut dyn LayoutHost, element: ElementId, property: &str, value: &str) {
    if let Err(err) = host.set_style_property(element, property, value) {
        debug!(element = element.raw(), property, %err, "Style write failed");
    }
}

fn px(value: f32) -> String {
    format!("{value}px")
}
