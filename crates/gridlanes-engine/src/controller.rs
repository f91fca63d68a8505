//! # Polyfill Controller
//!
//! Discovers grid-lanes containers, owns one [`LayoutInstance`] per
//! container plus the harvested rule map, and watches the document for new
//! containers and `<style>` elements.

use gridlanes_css::DeclarationMap;
use gridlanes_host::{
    ElementId, HostNotification, LayoutHost, MutationKind, MutationOptions, MutationRecord,
    SubscriptionId,
};
use tracing::{debug, info, trace};

use crate::harvest::{harvest, inline_grid_lanes, HarvestedRules};
use crate::instance::LayoutInstance;
use crate::{supports_grid_lanes, PolyfillOptions, GRID_LANES_ATTR};

/// The running polyfill.
#[derive(Debug)]
pub struct Controller {
    options: PolyfillOptions,
    supported: bool,
    rules: HarvestedRules,
    instances: Vec<LayoutInstance>,
    root_subscription: Option<SubscriptionId>,
}

impl Controller {
    /// Start the polyfill.
    ///
    /// With native support (and no `force`) the controller is inert.
    pub fn init(host: &mut dyn LayoutHost, options: PolyfillOptions) -> Self {
        let mut controller = Self {
            options,
            supported: false,
            rules: HarvestedRules::new(),
            instances: Vec::new(),
            root_subscription: None,
        };

        if supports_grid_lanes(&*host) && !controller.options.force {
            info!("Native grid-lanes support detected, polyfill not needed");
            controller.supported = true;
            return controller;
        }

        controller.attach_harvested(host);

        let root = host.document_root();
        match host.observe_mutations(root, MutationOptions::child_list().subtree()) {
            Ok(sub) => controller.root_subscription = Some(sub),
            Err(err) => debug!(%err, "Document observation unavailable"),
        }

        info!(
            containers = controller.instances.len(),
            "Grid-lanes polyfill initialized"
        );
        controller
    }

    /// Whether the host supports grid lanes natively and the controller is inert.
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn options(&self) -> &PolyfillOptions {
        &self.options
    }

    /// Harvested declarations per container.
    pub fn rules(&self) -> &HarvestedRules {
        &self.rules
    }

    pub fn instance(&self, container: ElementId) -> Option<&LayoutInstance> {
        self.instances
            .iter()
            .find(|instance| instance.container() == container)
    }

    pub fn instances(&self) -> &[LayoutInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Relayout every container now.
    pub fn refresh(&mut self, host: &mut dyn LayoutHost) {
        for instance in &mut self.instances {
            instance.refresh(host);
        }
    }

    /// Stop watching the document and tear every instance down.
    pub fn destroy(&mut self, host: &mut dyn LayoutHost) {
        if let Some(sub) = self.root_subscription.take() {
            host.unobserve(sub);
        }
        for instance in &mut self.instances {
            instance.destroy(host);
        }
        debug!(containers = self.instances.len(), "Grid-lanes polyfill destroyed");
        self.instances.clear();
    }

    /// Route a host notification.
    ///
    /// Returns `true` if the notification was handled.
    pub fn handle_notification(
        &mut self,
        host: &mut dyn LayoutHost,
        notification: &HostNotification,
    ) -> bool {
        match notification {
            HostNotification::AnimationFrame => self.on_animation_frame(host) > 0,
            HostNotification::Mutation {
                subscription,
                records,
            } if self.root_subscription == Some(*subscription) => {
                self.handle_document_mutations(host, records);
                true
            }
            _ => {
                let Some(index) = self
                    .instances
                    .iter_mut()
                    .position(|instance| instance.handle_notification(host, notification))
                else {
                    return false;
                };
                // The rule map follows inline edits picked up by the instance.
                let instance = &self.instances[index];
                let container = instance.container();
                if self.rules.get(container) != Some(instance.declarations()) {
                    self.rules.merge(container, instance.declarations());
                }
                true
            }
        }
    }

    /// Run pending passes. Returns the number of passes run.
    pub fn on_animation_frame(&mut self, host: &mut dyn LayoutHost) -> usize {
        let mut passes = 0;
        for instance in &mut self.instances {
            if instance.on_animation_frame(host) {
                passes += 1;
            }
        }
        passes
    }

    fn handle_document_mutations(&mut self, host: &mut dyn LayoutHost, records: &[MutationRecord]) {
        for record in records {
            let MutationKind::ChildList { added, .. } = &record.kind else {
                continue;
            };
            for node in added {
                let candidates: Vec<ElementId> =
                    std::iter::once(*node).chain(host.descendants(*node)).collect();
                for candidate in candidates {
                    if let Some(declarations) = self.declared_container(&*host, candidate) {
                        self.rules.insert_if_absent(candidate, declarations);
                        self.attach(host, candidate);
                    }
                }
            }
        }

        // New <style> elements may have introduced rules.
        self.attach_harvested(host);
    }

    /// Declarations of an element that declares grid lanes inline or through
    /// its computed style.
    fn declared_container(&self, host: &dyn LayoutHost, element: ElementId) -> Option<DeclarationMap> {
        if let Some(declarations) = inline_grid_lanes(host, element) {
            return Some(declarations);
        }
        let computed = host.computed_style(element).ok()?;
        computed
            .display()
            .is_some_and(|display| display.trim().eq_ignore_ascii_case("grid-lanes"))
            .then(DeclarationMap::new)
    }

    fn attach_harvested(&mut self, host: &mut dyn LayoutHost) {
        let harvest = harvest(&*host, &mut self.rules);

        for container in harvest.containers {
            if self.instance(container).is_some() {
                continue;
            }
            if host.get_attribute(container, GRID_LANES_ATTR).is_some() {
                trace!(container = container.raw(), "Container already polyfilled");
                continue;
            }
            self.attach(host, container);
        }

        for instance in &mut self.instances {
            if let Some(declarations) = self.rules.get(instance.container()) {
                instance.set_declarations(host, declarations.clone());
            }
        }
    }

    fn attach(&mut self, host: &mut dyn LayoutHost, container: ElementId) {
        if self.instance(container).is_some() {
            return;
        }
        let declarations = self.rules.get(container).cloned().unwrap_or_default();
        let instance = LayoutInstance::attach(host, container, declarations, self.options.clone());
        self.instances.push(instance);
    }
}
