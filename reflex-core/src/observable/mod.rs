//! Access Recorder
//!
//! This module implements the observable-object system the render engine
//! consumes: objects with stable identities, per-property version counters
//! and per-property change observers, plus the capture passes that attribute
//! reads to the computation that made them.
//!
//! # Concepts
//!
//! ## Observables
//!
//! An [`Observable`] is a shared property bag. Reading a property inside a
//! capture pass reports the `(object, property)` pair; writing a property
//! fires the observers installed on exactly that pair.
//!
//! ## Capture passes
//!
//! [`CaptureContext::capture`] runs a function and reports every read it
//! makes to a listener. The component engine runs each render inside a
//! capture pass to learn what the render depends on.
//!
//! # Implementation Notes
//!
//! Reads are discovered through a thread-local stack of active passes
//! rather than by intercepting property access, so only reads made through
//! the explicit accessors are tracked.

mod context;
mod object;
mod observer;

pub use context::CaptureContext;
pub use object::Observable;
pub use observer::{ObjectId, Observer, ObserverId, PropertyKey};
