//! TestPage - Headless document driven by a polyfill controller.

use std::sync::Once;

use gridlanes_engine::headless::MemoryHost;
use gridlanes_engine::{Controller, ElementId, LayoutInstance, PolyfillOptions};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route polyfill logs to the test writer. Filtered by `RUST_LOG`.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A document plus the controller polyfilling it.
pub struct TestPage {
    pub host: MemoryHost,
    controller: Option<Controller>,
}

impl TestPage {
    /// Create a page with the default viewport (800x600).
    pub fn new() -> Self {
        Self::with_size(800.0, 600.0)
    }

    /// Create a page with a specific viewport.
    pub fn with_size(width: f32, height: f32) -> Self {
        init_tracing();
        Self {
            host: MemoryHost::new(width, height),
            controller: None,
        }
    }

    pub fn body(&self) -> ElementId {
        self.host.body()
    }

    /// Append a `<div>` with an inline style to `<body>`.
    pub fn container(&mut self, style: &str) -> ElementId {
        let body = self.host.body();
        let container = self.host.append(body, "div");
        self.host.set_inline_style(container, style);
        container
    }

    /// Append a block child with a content height.
    pub fn item(&mut self, container: ElementId, height: f32) -> ElementId {
        let item = self.host.append(container, "div");
        self.host.set_content_size(item, 0.0, height);
        item
    }

    pub fn items(&mut self, container: ElementId, heights: &[f32]) -> Vec<ElementId> {
        heights
            .iter()
            .map(|height| self.item(container, *height))
            .collect()
    }

    /// Start the polyfill and deliver the initial notifications.
    pub fn start(&mut self, options: PolyfillOptions) -> &Controller {
        let controller = Controller::init(&mut self.host, options);
        self.controller = Some(controller);
        self.settle();
        self.controller()
    }

    pub fn start_default(&mut self) -> &Controller {
        self.start(PolyfillOptions::default())
    }

    pub fn controller(&self) -> &Controller {
        self.controller.as_ref().expect("TestPage::start was not called")
    }

    pub fn instance(&self, container: ElementId) -> &LayoutInstance {
        self.controller()
            .instance(container)
            .unwrap_or_else(|| panic!("no instance for container {}", container.raw()))
    }

    /// Completed layout passes of a container.
    pub fn passes(&self, container: ElementId) -> u64 {
        self.instance(container).stats().passes
    }

    /// Deliver host notifications until idle. Returns how many were delivered.
    pub fn settle(&mut self) -> usize {
        let Self { host, controller } = self;
        match controller {
            Some(controller) => host.pump(|host, notification| {
                controller.handle_notification(host, notification);
            }),
            None => host.pump(|_, _| {}),
        }
    }

    /// Run a full relayout of every container.
    pub fn refresh(&mut self) {
        let Self { host, controller } = self;
        if let Some(controller) = controller {
            controller.refresh(host);
        }
    }

    /// Tear the polyfill down.
    pub fn destroy(&mut self) {
        let Self { host, controller } = self;
        if let Some(controller) = controller {
            controller.destroy(host);
        }
    }

    /// Inline style value parsed as pixels.
    pub fn px(&self, element: ElementId, property: &str) -> Option<f32> {
        self.host
            .style_property(element, property)?
            .strip_suffix("px")?
            .parse()
            .ok()
    }
}

impl Default for TestPage {
    fn default() -> Self {
        Self::new()
    }
}
