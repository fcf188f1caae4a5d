//! Update Scheduler
//!
//! Turns change notifications into re-renders. With debouncing on, every
//! notification (re)arms a per-instance timer and only the last one in a
//! burst survives: the re-render runs once, one window after the final
//! write. With debouncing off, every notification re-renders immediately.
//!
//! # Timers
//!
//! A [`DebounceTimer`] is a Tokio task that sleeps for the window and then
//! calls back. Rearming aborts the previous task. Each arm bumps a
//! generation counter and the expiring task must present the current
//! generation to [`DebounceTimer::settle`], so a task that lost a race
//! with a rearm or a cancel never fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::definition::Component;
use super::instance::Instance;
use crate::config::ComponentOptions;
use crate::error::ScheduleError;

/// A cancellable one-shot timer owned by a single instance.
#[derive(Debug, Default)]
pub struct DebounceTimer {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Number of times the timer has been armed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel any pending expiry and arm the timer for `delay`.
    ///
    /// `on_expire` receives the generation it was armed with and should
    /// pass it to [`settle`](Self::settle) before acting.
    pub fn arm<F>(&mut self, delay: Duration, on_expire: F) -> Result<u64, ScheduleError>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let runtime = Handle::try_current()?;
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        self.handle = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            on_expire(generation);
        }));
        Ok(generation)
    }

    /// Cancel the pending expiry, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Claim an expiry. Returns `true` if `generation` is still the armed
    /// one, clearing the timer; `false` if it was superseded or cancelled.
    pub fn settle(&mut self, generation: u64) -> bool {
        if self.handle.is_some() && self.generation == generation {
            self.handle = None;
            true
        } else {
            false
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Per-instance scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateScheduler {
    debounce: bool,
    window: Duration,
}

impl UpdateScheduler {
    pub fn new(options: &ComponentOptions) -> Self {
        Self {
            debounce: options.debounce,
            window: options.debounce_window(),
        }
    }

    pub fn is_debounced(&self) -> bool {
        self.debounce
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// React to a change in something `instance` read during its last
    /// render.
    ///
    /// Without a Tokio runtime the debounce timer cannot be armed; the
    /// update then runs synchronously so it is not lost.
    pub fn schedule<C: Component>(&self, instance: &Arc<Instance<C>>) {
        if !instance.is_mounted() {
            tracing::trace!(instance = %instance.id(), "ignoring change for unmounted instance");
            return;
        }

        if !self.debounce {
            instance.force_update();
            return;
        }

        let weak = Arc::downgrade(instance);
        let armed = instance.timer().lock().arm(self.window, move |generation| {
            let Some(instance) = weak.upgrade() else {
                return;
            };
            let expired = instance.timer().lock().settle(generation);
            if expired {
                tracing::trace!(instance = %instance.id(), generation, "debounce window elapsed");
                instance.force_update();
            }
        });

        match armed {
            Ok(generation) => {
                tracing::trace!(instance = %instance.id(), generation, "update scheduled");
            }
            Err(error) => {
                tracing::warn!(instance = %instance.id(), %error, "updating synchronously");
                instance.force_update();
            }
        }
    }

    /// Cancel any pending update for `instance`. Safe when none is armed.
    pub fn cancel<C: Component>(&self, instance: &Instance<C>) {
        if instance.timer().lock().cancel() {
            tracing::trace!(instance = %instance.id(), "pending update cancelled");
        }
    }
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::new(&ComponentOptions::default())
    }
}
