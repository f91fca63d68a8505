//! # Grid Lanes Host
//!
//! The document host the polyfill runs against.
//!
//! ## Design Goals
//!
//! 1. **Host independence**: The engine never touches a concrete DOM
//! 2. **Owned subscriptions**: Every observer is a [`SubscriptionId`] the
//!    engine must release
//! 3. **Pull-free events**: The host pushes [`HostNotification`]s; the engine
//!    only reacts

pub mod traits;

pub use gridlanes_css::Viewport;
pub use traits::LayoutHost;

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors reported by a host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("Unsupported host API: {0}")]
    Unsupported(String),

    #[error("Stylesheet is not accessible: {0}")]
    SheetInaccessible(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Unknown element: {0:?}")]
    UnknownElement(ElementId),
}

/// Handle to a host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u64);

impl ElementId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Handle to an active observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Element bounds in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Computed style as reported by the host.
///
/// Hosts without native grid lanes drop the grid properties of such
/// containers, so this is mostly used for `display` and font size.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    properties: BTreeMap<String, String>,
    /// Element font size in pixels.
    pub font_size: f32,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            properties: BTreeMap::new(),
            font_size: 16.0,
        }
    }
}

impl ComputedStyle {
    pub fn new(font_size: f32) -> Self {
        Self {
            font_size,
            ..Default::default()
        }
    }

    /// Builder-style property setter.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Get a property value. Missing and empty values are `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn display(&self) -> Option<&str> {
        self.get("display")
    }
}

/// What a mutation observer reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOptions {
    /// Child additions and removals.
    pub child_list: bool,
    /// Observe the whole subtree rather than the target only.
    pub subtree: bool,
    /// Attribute names to watch. Empty means none.
    pub attribute_filter: Vec<String>,
}

impl MutationOptions {
    /// Child list changes on the target only.
    pub fn child_list() -> Self {
        Self {
            child_list: true,
            ..Default::default()
        }
    }

    pub fn subtree(mut self) -> Self {
        self.subtree = true;
        self
    }

    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_filter = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn watches_attribute(&self, name: &str) -> bool {
        self.attribute_filter.iter().any(|watched| watched == name)
    }
}

/// Kind of DOM change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were added or removed.
    ChildList {
        added: Vec<ElementId>,
        removed: Vec<ElementId>,
    },
    /// An attribute changed.
    Attribute { name: String },
}

/// A single DOM change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Element the change happened on.
    pub target: ElementId,
    pub kind: MutationKind,
}

/// How an image finished loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    Loaded,
    Failed,
}

/// Events pushed by the host to the polyfill.
#[derive(Debug, Clone, PartialEq)]
pub enum HostNotification {
    /// Batched DOM mutations for one observer.
    Mutation {
        subscription: SubscriptionId,
        records: Vec<MutationRecord>,
    },
    /// An observed element changed size.
    Resize {
        subscription: SubscriptionId,
        element: ElementId,
        bounds: Bounds,
    },
    /// An observed image fired `load` or `error`.
    ImageSettled {
        subscription: SubscriptionId,
        element: ElementId,
        outcome: ImageOutcome,
    },
    /// A requested animation frame is due.
    AnimationFrame,
}

impl HostNotification {
    /// Subscription the notification belongs to.
    pub fn subscription(&self) -> Option<SubscriptionId> {
        match self {
            HostNotification::Mutation { subscription, .. }
            | HostNotification::Resize { subscription, .. }
            | HostNotification::ImageSettled { subscription, .. } => Some(*subscription),
            HostNotification::AnimationFrame => None,
        }
    }
}

/// A style rule exposed by the stylesheet API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRule {
    /// Selector text.
    pub selector: String,
    /// Full rule text, `selector { declarations }`.
    pub css_text: String,
}

impl SheetRule {
    pub fn new(selector: impl Into<String>, css_text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            css_text: css_text.into(),
        }
    }
}
