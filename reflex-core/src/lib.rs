//! Reflex Core
//!
//! This crate provides a reactive render engine for UI components. A
//! component's render function is bound to a property-level dependency
//! tracker so the component re-renders automatically, and only, when data
//! it actually read during its last render changes.
//!
//! It implements:
//!
//! - Observable property bags with per-property observers and versions
//! - Capture passes that attribute reads to the render that made them
//! - Per-instance subscription ledgers, rebuilt on every render
//! - Debounced, batched re-render scheduling
//! - Interception of "not ready yet" and failed renders into placeholders
//! - A registry of live instances for debugging tools
//!
//! The crate is designed to be used both as a native Rust library and as a
//! Python extension module via PyO3.
//!
//! # Architecture
//!
//! - `observable`: the access recorder (objects, observers, capture passes)
//! - `component`: the engine (ledger, interceptor, scheduler, lifecycle)
//! - `config`: per-component options and engine defaults
//! - `error`: the not-ready signal and error types
//!
//! # Example
//!
//! ```rust,ignore
//! use reflex_core::component::{component_fn, ComponentManager, Instance};
//! use reflex_core::observable::Observable;
//!
//! let counter = Observable::new();
//! counter.set("count", &0)?;
//!
//! let manager = ComponentManager::new();
//! let source = counter.clone();
//! let label = component_fn("Counter", move |_cx| {
//!     let count: i64 = source.get("count")?.unwrap_or_default();
//!     Ok(Some(format!("count = {count}")))
//! });
//!
//! let instance = manager.mount(label, |instance: &std::sync::Arc<Instance<_>>| {
//!     println!("{:?}", instance.render());
//! });
//! instance.render();
//!
//! // Re-renders once, 100ms after the last write.
//! counter.set("count", &1)?;
//! counter.set("count", &2)?;
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod observable;
pub mod python;

pub use error::{Error, NotReady, RenderError, Result};

use pyo3::prelude::*;

/// Python module definition.
///
/// This function is called by Python when importing the module.
/// It registers all Python-exposed types and functions.
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    python::register(m)?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
