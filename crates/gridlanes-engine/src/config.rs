//! Polyfill configuration.

use gridlanes_host::{ElementId, LayoutHost};

use crate::{Controller, EngineError, LayoutInstance, DEFAULT_TOLERANCE};

/// Polyfill configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyfillOptions {
    /// Run even when the host supports grid lanes natively.
    pub force: bool,
    /// Placement tolerance when a container does not set `--item-tolerance`.
    pub default_tolerance: f32,
    /// Collapse empty `auto-fit` lanes.
    pub collapse_auto_fit: bool,
    /// Relayout when images inside containers finish loading.
    pub observe_images: bool,
}

impl Default for PolyfillOptions {
    fn default() -> Self {
        Self {
            force: false,
            default_tolerance: DEFAULT_TOLERANCE,
            collapse_auto_fit: false,
            observe_images: true,
        }
    }
}

impl PolyfillOptions {
    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        if !self.default_tolerance.is_finite() || self.default_tolerance < 0.0 {
            return Err(EngineError::InvalidOption(format!(
                "default_tolerance must be a non-negative number, got {}",
                self.default_tolerance
            )));
        }
        Ok(())
    }
}

/// Builder for polyfill options.
pub struct PolyfillBuilder {
    options: PolyfillOptions,
}

impl PolyfillBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            options: PolyfillOptions::default(),
        }
    }

    /// Run even with native support.
    pub fn force(mut self, force: bool) -> Self {
        self.options.force = force;
        self
    }

    /// Set the fallback placement tolerance in pixels.
    pub fn default_tolerance(mut self, tolerance: f32) -> Self {
        self.options.default_tolerance = tolerance;
        self
    }

    /// Enable or disable collapsing of empty `auto-fit` lanes.
    pub fn collapse_auto_fit(mut self, enabled: bool) -> Self {
        self.options.collapse_auto_fit = enabled;
        self
    }

    /// Enable or disable image load tracking.
    pub fn observe_images(mut self, enabled: bool) -> Self {
        self.options.observe_images = enabled;
        self
    }

    /// Validate and return the options.
    pub fn build(self) -> Result<PolyfillOptions, EngineError> {
        self.options.validate()?;
        Ok(self.options)
    }

    /// Validate the options and start the polyfill on a host.
    pub fn init(self, host: &mut dyn LayoutHost) -> Result<Controller, EngineError> {
        let options = self.build()?;
        Ok(Controller::init(host, options))
    }

    /// Validate the options and polyfill a single element.
    ///
    /// `Ok(None)` means the host lays grid lanes out natively.
    pub fn apply(
        self,
        host: &mut dyn LayoutHost,
        element: ElementId,
    ) -> Result<Option<LayoutInstance>, EngineError> {
        let options = self.build()?;
        if host.tag_name(element).is_none() {
            return Err(EngineError::ElementNotFound(element));
        }
        Ok(crate::apply(host, element, options))
    }
}

impl Default for PolyfillBuilder {
    fn default() -> Self {
        Self::new()
    }
}
