//! Component definitions.
//!
//! A [`Component`] is the user side of a reactive instance: a render
//! callback plus optional lifecycle hooks. The engine wraps it in an
//! [`Instance`](super::Instance) that owns the subscriptions, the debounce
//! timer and the registry entry; the component itself never sees any of
//! that machinery.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ComponentOptions;
use crate::error::RenderError;

/// Identifier of a mounted instance, unique within its manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for InstanceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a render callback and the lifecycle hooks receive as their
/// receiver.
#[derive(Debug, Clone)]
pub struct RenderContext {
    id: InstanceId,
    name: Arc<str>,
    render_count: u64,
}

impl RenderContext {
    pub fn new(id: InstanceId, name: Arc<str>, render_count: u64) -> Self {
        Self {
            id,
            name,
            render_count,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders started so far, including the current one.
    pub fn render_count(&self) -> u64 {
        self.render_count
    }
}

/// A renderable with lifecycle hooks.
///
/// The user hooks run after the engine's own bookkeeping for the same
/// lifecycle event.
pub trait Component: Send + Sync + 'static {
    /// Output of a successful render.
    type View: Send + 'static;

    /// Produce the current view.
    ///
    /// Every [`Observable`](crate::observable::Observable) read made here
    /// subscribes the instance to that property. Return `Ok(None)` for an
    /// empty render and [`NotReady`](crate::error::NotReady) when required
    /// data is still loading.
    fn render(&self, cx: &RenderContext) -> Result<Option<Self::View>, RenderError>;

    /// Name used in logs and introspection snapshots.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Options for this component type. `None` uses the manager defaults.
    fn options(&self) -> Option<ComponentOptions> {
        None
    }

    fn did_mount(&self, _cx: &RenderContext) {}

    fn did_update(&self, _cx: &RenderContext) {}

    fn will_unmount(&self, _cx: &RenderContext) {}
}

/// A component built from a render closure.
pub struct FnComponent<F, V> {
    name: String,
    options: Option<ComponentOptions>,
    render: F,
    _view: PhantomData<fn() -> V>,
}

impl<F, V> FnComponent<F, V>
where
    F: Fn(&RenderContext) -> Result<Option<V>, RenderError> + Send + Sync + 'static,
    V: Send + 'static,
{
    pub fn new(name: impl Into<String>, render: F) -> Self {
        Self {
            name: name.into(),
            options: None,
            render,
            _view: PhantomData,
        }
    }

    pub fn with_options(mut self, options: ComponentOptions) -> Self {
        self.options = Some(options);
        self
    }
}

impl<F, V> Component for FnComponent<F, V>
where
    F: Fn(&RenderContext) -> Result<Option<V>, RenderError> + Send + Sync + 'static,
    V: Send + 'static,
{
    type View = V;

    fn render(&self, cx: &RenderContext) -> Result<Option<V>, RenderError> {
        (self.render)(cx)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> Option<ComponentOptions> {
        self.options
    }
}

/// Shorthand for [`FnComponent::new`].
pub fn component_fn<F, V>(name: impl Into<String>, render: F) -> FnComponent<F, V>
where
    F: Fn(&RenderContext) -> Result<Option<V>, RenderError> + Send + Sync + 'static,
    V: Send + 'static,
{
    FnComponent::new(name, render)
}
