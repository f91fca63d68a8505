//! # Grid Lanes Engine
//!
//! Run-time polyfill for `display: grid-lanes` on hosts that lack it.
//!
//! ## Design Goals
//!
//! 1. **Rule recovery**: Re-read source CSS the host style engine discards
//! 2. **Reactive layout**: Relayout on mutations, resizes and image loads
//! 3. **Coalescing**: At most one pass per container per animation frame
//! 4. **Reversibility**: `destroy` removes everything the polyfill wrote
//!
//! ## Usage
//!
//! ```ignore
//! let mut controller = gridlanes_engine::init(&mut host, PolyfillOptions::default());
//! // Feed host events back in:
//! controller.handle_notification(&mut host, &notification);
//! ```

pub mod config;
pub mod controller;
pub mod harvest;
#[cfg(any(test, feature = "headless"))]
pub mod headless;
pub mod instance;
pub mod styles;

pub use config::{PolyfillBuilder, PolyfillOptions};
pub use controller::Controller;
pub use harvest::{harvest, Harvest, HarvestedRules};
pub use instance::{ItemLayout, LayoutInstance, LayoutStats, TriggerSupport};
pub use styles::ContainerStyles;

pub use gridlanes_css::CssError;
pub use gridlanes_host::{ElementId, HostError, HostNotification, ImageOutcome, LayoutHost};
pub use gridlanes_layout::{Axis, LayoutError};

use thiserror::Error;
use tracing::debug;

/// Attribute marking containers handled by the polyfill.
pub const GRID_LANES_ATTR: &str = "data-grid-lanes-polyfilled";

/// Default placement tolerance in pixels (about 1em).
pub const DEFAULT_TOLERANCE: f32 = 16.0;

/// Polyfill version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors that can occur in the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Element not found: {0:?}")]
    ElementNotFound(ElementId),
}

/// Whether the host lays out `display: grid-lanes` natively.
pub fn supports_grid_lanes(host: &dyn LayoutHost) -> bool {
    host.supports("display", "grid-lanes")
}

/// Start the polyfill on a host.
pub fn init(host: &mut dyn LayoutHost, options: PolyfillOptions) -> Controller {
    Controller::init(host, options)
}

/// Polyfill a single element.
///
/// Returns `None` when the host supports grid lanes natively and `force` is
/// not set.
pub fn apply(
    host: &mut dyn LayoutHost,
    element: ElementId,
    options: PolyfillOptions,
) -> Option<LayoutInstance> {
    if supports_grid_lanes(&*host) && !options.force {
        debug!("Native grid-lanes support detected, not applying");
        return None;
    }

    let mut rules = HarvestedRules::new();
    harvest(&*host, &mut rules);
    let declarations = rules
        .remove(element)
        .or_else(|| harvest::inline_grid_lanes(&*host, element))
        .unwrap_or_default();

    Some(LayoutInstance::attach(host, element, declarations, options))
}
