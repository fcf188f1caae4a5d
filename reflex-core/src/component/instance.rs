//! Reactive Instances
//!
//! An [`Instance`] is one live component wrapped with the engine's
//! lifecycle hooks. It owns the ledger of subscriptions from its last
//! render, its debounce timer and its debug tag.
//!
//! # Render Protocol
//!
//! 1. Unsubscribe everything the previous render read.
//!
//! 2. Start a new ledger pass and run the component's render through the
//!    interceptor inside a capture pass.
//!
//! 3. Each first-seen `(object, property)` read installs one observer that
//!    forwards changes to the instance's [`UpdateScheduler`].
//!
//! After the render, the ledger holds exactly what that render read. A
//! render that stops early (not ready, error) keeps the reads it made
//! before stopping.
//!
//! Renders of one instance are serialized: a render started on another
//! thread waits for the one in flight to finish before touching the
//! ledger.
//!
//! # Reruns
//!
//! A forced update that arrives while a render is in flight is queued and
//! runs once that render returns. Queued reruns are drained in a loop by
//! whichever thread finishes a render first, so a component that keeps
//! invalidating itself never grows the stack. After
//! [`MAX_SYNCHRONOUS_RERUNS`] chained reruns the rest are dropped with a
//! warning.
//!
//! # Liveness
//!
//! Observers and timer tasks hold only `Weak` references and check the
//! mounted flag before doing anything, so nothing fires for an instance
//! after it has been unmounted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use serde::Serialize;

use super::definition::{Component, InstanceId, RenderContext};
use super::host::{DomHandle, RenderHost};
use super::interceptor::{RenderInterceptor, Rendered};
use super::ledger::{ObserverLedger, SubscriptionInfo};
use super::manager::EngineStats;
use super::scheduler::{DebounceTimer, UpdateScheduler};
use crate::config::{ComponentOptions, MAX_SYNCHRONOUS_RERUNS};
use crate::observable::{CaptureContext, Observable, Observer, PropertyKey};

/// Lifecycle state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    /// Mounted, nothing pending.
    Idle,
    /// A render is in flight.
    Rendering,
    /// A change arrived and the debounce timer is armed.
    UpdatePending,
    /// Torn down. Terminal.
    Unmounted,
}

/// Introspection snapshot of one instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceInfo {
    pub id: InstanceId,
    pub name: String,
    pub state: InstanceState,
    pub render_count: u64,
    pub update_count: u64,
    pub subscriptions: Vec<SubscriptionInfo>,
}

/// Resets the rendering flag even if the render unwinds.
struct RenderingGuard<'a>(&'a AtomicBool);

impl Drop for RenderingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A mounted component and its reactive bookkeeping.
pub struct Instance<C: Component> {
    id: InstanceId,
    name: Arc<str>,
    component: C,
    options: ComponentOptions,
    host: Arc<dyn RenderHost<C>>,
    interceptor: RenderInterceptor,
    scheduler: UpdateScheduler,
    ledger: Mutex<ObserverLedger>,
    timer: Mutex<DebounceTimer>,
    dom: Mutex<Option<Arc<dyn DomHandle>>>,
    dom_attribute: Arc<str>,
    /// Held for a whole render pass.
    render_lock: ReentrantMutex<()>,
    mounted: AtomicBool,
    rendering: AtomicBool,
    /// Set when a synchronous update arrives mid-render.
    rerun_requested: AtomicBool,
    /// Set while some thread is draining queued reruns.
    draining: AtomicBool,
    render_count: AtomicU64,
    update_count: AtomicU64,
    stats: Arc<EngineStats>,
}

impl<C: Component> Instance<C> {
    pub(crate) fn new(
        id: InstanceId,
        component: C,
        options: ComponentOptions,
        host: Arc<dyn RenderHost<C>>,
        dom: Option<Arc<dyn DomHandle>>,
        dom_attribute: Arc<str>,
        stats: Arc<EngineStats>,
    ) -> Self {
        let name: Arc<str> = Arc::from(component.name());
        Self {
            id,
            name,
            component,
            options,
            host,
            interceptor: RenderInterceptor::new(options.catch_panics),
            scheduler: UpdateScheduler::new(&options),
            ledger: Mutex::new(ObserverLedger::new()),
            timer: Mutex::new(DebounceTimer::new()),
            dom: Mutex::new(dom),
            dom_attribute,
            render_lock: ReentrantMutex::new(()),
            mounted: AtomicBool::new(true),
            rendering: AtomicBool::new(false),
            rerun_requested: AtomicBool::new(false),
            draining: AtomicBool::new(false),
            render_count: AtomicU64::new(0),
            update_count: AtomicU64::new(0),
            stats,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn options(&self) -> &ComponentOptions {
        &self.options
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> InstanceState {
        if !self.is_mounted() {
            InstanceState::Unmounted
        } else if self.rendering.load(Ordering::SeqCst) {
            InstanceState::Rendering
        } else if self.timer.lock().is_armed() {
            InstanceState::UpdatePending
        } else {
            InstanceState::Idle
        }
    }

    /// Renders started so far.
    pub fn render_count(&self) -> u64 {
        self.render_count.load(Ordering::SeqCst)
    }

    /// Forced re-renders requested from the host so far.
    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::SeqCst)
    }

    pub fn subscription_count(&self) -> usize {
        self.ledger.lock().len()
    }

    /// Check whether the last render subscribed to `property` on `object`.
    pub fn is_subscribed(&self, object: &Observable, property: &str) -> bool {
        self.ledger.lock().contains(object.id(), property)
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionInfo> {
        self.ledger.lock().info()
    }

    pub fn info(&self) -> InstanceInfo {
        InstanceInfo {
            id: self.id,
            name: self.name.to_string(),
            state: self.state(),
            render_count: self.render_count(),
            update_count: self.update_count(),
            subscriptions: self.subscriptions(),
        }
    }

    fn context(&self) -> RenderContext {
        RenderContext::new(self.id, self.name.clone(), self.render_count())
    }

    pub(crate) fn timer(&self) -> &Mutex<DebounceTimer> {
        &self.timer
    }

    /// Render hook.
    ///
    /// Always returns some output: render failures come back as
    /// placeholder variants. Rendering an unmounted instance yields
    /// [`Rendered::Empty`] and subscribes to nothing.
    pub fn render(self: &Arc<Self>) -> Rendered<C::View> {
        let output = {
            let _pass = self.render_lock.lock();
            if !self.is_mounted() {
                tracing::trace!(instance = %self.id, "skipping render of unmounted instance");
                return Rendered::Empty;
            }
            if self.rendering.load(Ordering::SeqCst) {
                // Re-entered from inside our own pass on this thread.
                tracing::debug!(instance = %self.id, "nested render deferred");
                self.rerun_requested.store(true, Ordering::SeqCst);
                return Rendered::Empty;
            }

            self.rendering.store(true, Ordering::SeqCst);
            let _rendering = RenderingGuard(&self.rendering);

            {
                let mut ledger = self.ledger.lock();
                ledger.remove_all();
                ledger.begin_capture();
            }
            self.render_count.fetch_add(1, Ordering::SeqCst);
            self.stats.record_render();

            let cx = self.context();
            let weak = Arc::downgrade(self);
            CaptureContext::capture(
                || self.interceptor.intercept(&cx, |cx| self.component.render(cx)),
                move |object, property| {
                    if let Some(instance) = weak.upgrade() {
                        instance.subscribe(object, property);
                    }
                },
            )
        };

        if !self.is_mounted() {
            // Unmounted mid-render; drop whatever this render subscribed.
            self.ledger.lock().remove_all();
        } else if self.rerun_requested.load(Ordering::SeqCst) {
            self.drain_reruns();
        }

        output
    }

    fn subscribe(self: &Arc<Self>, object: &Observable, property: &PropertyKey) {
        let observer_id = {
            let mut ledger = self.ledger.lock();
            if !ledger.track_access(object, property) {
                return;
            }
            ledger.observer_id()
        };

        let weak = Arc::downgrade(self);
        object.observe(
            property.clone(),
            Observer::new(observer_id, move || {
                if let Some(instance) = weak.upgrade() {
                    instance.on_change();
                }
            }),
        );
    }

    fn on_change(self: &Arc<Self>) {
        if !self.is_mounted() {
            return;
        }
        self.scheduler.schedule(self);
    }

    /// Ask the host to re-render now.
    ///
    /// If a render is already in flight, the update runs right after it
    /// finishes instead of recursing into it.
    pub(crate) fn force_update(self: &Arc<Self>) {
        if !self.is_mounted() {
            return;
        }
        // Request first, then look: the render clears `rendering` before it
        // checks for requests, so one of the two sides always sees it.
        self.rerun_requested.store(true, Ordering::SeqCst);
        if self.rendering.load(Ordering::SeqCst) {
            return;
        }
        self.drain_reruns();
    }

    /// Run queued reruns until none are left.
    ///
    /// Only one thread drains at a time. Reruns whose renders queue more
    /// reruns are picked up by the outer loop, not by recursion.
    fn drain_reruns(self: &Arc<Self>) {
        let mut reruns = 0u32;
        loop {
            if self.draining.swap(true, Ordering::SeqCst) {
                return;
            }
            while self.is_mounted() && self.rerun_requested.swap(false, Ordering::SeqCst) {
                if reruns == MAX_SYNCHRONOUS_RERUNS {
                    tracing::warn!(
                        instance = %self.id,
                        component = %self.name,
                        reruns,
                        "dropping rerun: component keeps invalidating its own render"
                    );
                    self.draining.store(false, Ordering::SeqCst);
                    return;
                }
                reruns += 1;
                self.update_count.fetch_add(1, Ordering::SeqCst);
                self.stats.record_update();
                self.host.force_rerender(self);
            }
            self.draining.store(false, Ordering::SeqCst);

            // A request that landed after the last swap but saw `draining`
            // still set would otherwise be lost.
            if !self.is_mounted() || !self.rerun_requested.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    /// Mount hook: tag the host element and run the user hook.
    pub(crate) fn did_mount(&self) {
        if let Some(dom) = self.dom.lock().clone() {
            dom.set_attribute(&self.dom_attribute, &self.id.to_string());
        }
        self.component.did_mount(&self.context());
    }

    /// Post-render hook.
    ///
    /// Restores the debug tag if the host replaced or stripped its element,
    /// then runs the user hook.
    pub fn did_update(&self) {
        if let Some(dom) = self.dom.lock().clone() {
            if dom.get_attribute(&self.dom_attribute).is_none() {
                dom.set_attribute(&self.dom_attribute, &self.id.to_string());
            }
        }
        self.component.did_update(&self.context());
    }

    /// Point the instance at a new host element.
    ///
    /// The element is tagged on the next [`did_update`](Self::did_update).
    pub fn attach_dom(&self, dom: Arc<dyn DomHandle>) {
        *self.dom.lock() = Some(dom);
    }

    /// Unmount hook. Returns `false` if the instance was already unmounted.
    pub(crate) fn teardown(&self) -> bool {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.ledger.lock().remove_all();
        self.scheduler.cancel(self);
        self.component.will_unmount(&self.context());
        true
    }
}

impl<C: Component> std::fmt::Debug for Instance<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("render_count", &self.render_count())
            .field("subscription_count", &self.subscription_count())
            .finish()
    }
}
