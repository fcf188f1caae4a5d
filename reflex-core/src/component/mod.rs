//! Reactive Render Engine
//!
//! This module binds a component's render function to the access recorder
//! so that the component re-renders automatically, and only, when data it
//! read during its last render changes.
//!
//! # Pieces
//!
//! - [`ObserverLedger`]: which (object, property) pairs an instance is
//!   subscribed to, rebuilt on every render.
//! - [`RenderInterceptor`]: turns a render attempt into a [`Rendered`]
//!   value; not-ready and failed renders become placeholders.
//! - [`UpdateScheduler`]: debounces change notifications into one
//!   trailing re-render per burst.
//! - [`Instance`] and [`ComponentManager`]: the lifecycle hooks (mount,
//!   render, update, unmount) and the registry of live instances.
//!
//! # Lifecycle
//!
//! ```text
//! mount ──▶ Rendering ──▶ Idle ──change──▶ UpdatePending
//!              ▲                               │
//!              └────── debounce window ────────┘
//! any mounted state ──unmount──▶ Unmounted (terminal)
//! ```

mod definition;
mod host;
mod instance;
mod interceptor;
mod ledger;
mod manager;
mod scheduler;

pub use definition::{component_fn, Component, FnComponent, InstanceId, RenderContext};
pub use host::{DomHandle, RenderHost};
pub use instance::{Instance, InstanceInfo, InstanceState};
pub use interceptor::{RenderInterceptor, Rendered, ERROR_TEXT, LOADING_TEXT};
pub use ledger::{AccessKey, ObserverLedger, Subscription, SubscriptionInfo};
pub use manager::{ComponentManager, EngineStats, LiveInstance, StatsSnapshot};
pub use scheduler::{DebounceTimer, UpdateScheduler};
