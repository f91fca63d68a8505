//! Integration tests for the grid-lanes polyfill
//!
//! These tests verify end-to-end behavior of the controller against the
//! headless host.
//!
//! ## Test Categories
//!
//! - `layout_scenarios`: Literal layouts with known offsets
//! - `layout_properties`: Invariants over generated documents
//! - `lifecycle`: Init, native detection, destroy, `apply`
//! - `discovery`: Rule harvesting and late containers
//! - `relayout_triggers`: Observers, coalescing, missing host services

mod discovery;
mod layout_properties;
mod layout_scenarios;
mod relayout_triggers;
