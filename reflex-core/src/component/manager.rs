//! Component Manager
//!
//! The manager is the composition root of the engine. It mounts components
//! into reactive instances, keeps the registry of live instances that
//! debugging tools read, and tears instances down on unmount.
//!
//! # Registry
//!
//! The registry maps [`InstanceId`]s to type-erased [`LiveInstance`]s. Ids
//! are assigned from a monotonically increasing counter and never reused
//! by the same manager. Entries are added on mount and removed on unmount,
//! so the registry never keeps an unmounted instance alive.
//!
//! # Thread Safety
//!
//! The registry is a `DashMap` and every instance guards its own state, so
//! a manager can be shared with tooling running on other threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use super::definition::{Component, InstanceId};
use super::host::{DomHandle, RenderHost};
use super::instance::{Instance, InstanceInfo, InstanceState};
use crate::config::EngineConfig;

/// Object-safe view of a live instance, independent of its component type.
pub trait LiveInstance: Send + Sync {
    fn id(&self) -> InstanceId;

    fn name(&self) -> &str;

    fn state(&self) -> InstanceState;

    fn info(&self) -> InstanceInfo;

    /// Run the unmount hook. Returns `false` if already unmounted.
    fn teardown(&self) -> bool;
}

impl<C: Component> LiveInstance for Instance<C> {
    fn id(&self) -> InstanceId {
        Instance::id(self)
    }

    fn name(&self) -> &str {
        Instance::name(self)
    }

    fn state(&self) -> InstanceState {
        Instance::state(self)
    }

    fn info(&self) -> InstanceInfo {
        Instance::info(self)
    }

    fn teardown(&self) -> bool {
        Instance::teardown(self)
    }
}

/// Render and update counters shared by all instances of a manager.
#[derive(Debug, Default)]
pub struct EngineStats {
    renders: AtomicU64,
    updates: AtomicU64,
}

impl EngineStats {
    pub(crate) fn record_render(&self) {
        self.renders.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            renders: self.renders.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub renders: u64,
    pub updates: u64,
}

/// Owns the live-instance registry and drives the lifecycle hooks.
pub struct ComponentManager {
    config: EngineConfig,
    dom_attribute: Arc<str>,
    next_id: AtomicU64,
    registry: DashMap<InstanceId, Arc<dyn LiveInstance>>,
    stats: Arc<EngineStats>,
}

impl ComponentManager {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            dom_attribute: Arc::from(config.dom_attribute.as_str()),
            config,
            next_id: AtomicU64::new(0),
            registry: DashMap::new(),
            stats: Arc::new(EngineStats::default()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mount hook.
    ///
    /// Assigns a fresh id, registers the instance and runs the component's
    /// `did_mount`. The host renders the returned instance with
    /// [`Instance::render`].
    pub fn mount<C, H>(&self, component: C, host: H) -> Arc<Instance<C>>
    where
        C: Component,
        H: RenderHost<C> + 'static,
    {
        self.mount_inner(component, Arc::new(host), None)
    }

    /// Like [`mount`](Self::mount), also tagging `dom` with the instance id.
    pub fn mount_with_dom<C, H>(
        &self,
        component: C,
        host: H,
        dom: Arc<dyn DomHandle>,
    ) -> Arc<Instance<C>>
    where
        C: Component,
        H: RenderHost<C> + 'static,
    {
        self.mount_inner(component, Arc::new(host), Some(dom))
    }

    fn mount_inner<C: Component>(
        &self,
        component: C,
        host: Arc<dyn RenderHost<C>>,
        dom: Option<Arc<dyn DomHandle>>,
    ) -> Arc<Instance<C>> {
        let id = InstanceId::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        let options = match component.options() {
            Some(options) => options,
            None => self.config.defaults,
        };
        if let Err(error) = options.validate() {
            tracing::warn!(
                instance = %id,
                component = component.name(),
                %error,
                "questionable component options"
            );
        }

        let instance = Arc::new(Instance::new(
            id,
            component,
            options,
            host,
            dom,
            self.dom_attribute.clone(),
            self.stats.clone(),
        ));
        self.registry.insert(id, instance.clone());
        tracing::debug!(instance = %id, component = instance.name(), "mounted");

        instance.did_mount();
        instance
    }

    /// Unmount hook.
    ///
    /// Removes the registry entry, drops every subscription and cancels any
    /// pending update. Returns `false` for unknown or already unmounted ids.
    pub fn unmount(&self, id: InstanceId) -> bool {
        let Some((_, instance)) = self.registry.remove(&id) else {
            return false;
        };
        let torn_down = instance.teardown();
        if torn_down {
            tracing::debug!(instance = %id, component = instance.name(), "unmounted");
        }
        torn_down
    }

    /// Look up a live instance.
    pub fn get(&self, id: InstanceId) -> Option<Arc<dyn LiveInstance>> {
        self.registry.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.registry.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Ids of all live instances, ascending.
    pub fn ids(&self) -> Vec<InstanceId> {
        let mut ids: Vec<_> = self.registry.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Introspection snapshot of every live instance, ordered by id.
    pub fn snapshot(&self) -> Vec<InstanceInfo> {
        let mut infos: Vec<_> = self.registry.iter().map(|entry| entry.value().info()).collect();
        infos.sort_unstable_by_key(|info| info.id);
        infos
    }

    /// [`snapshot`](Self::snapshot) encoded as JSON.
    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Unmount every live instance.
    pub fn unmount_all(&self) {
        for id in self.ids() {
            self.unmount(id);
        }
    }
}

impl Default for ComponentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ComponentManager {
    fn drop(&mut self) {
        self.unmount_all();
    }
}

impl std::fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentManager")
            .field("live", &self.registry.len())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
