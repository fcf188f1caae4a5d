//! Identity types for the access recorder.
//!
//! An observer is any callback installed on a single (object, property)
//! pair. Observers are identified by an [`ObserverId`] so they can be
//! removed again without comparing closures.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Stable identity of an observable object.
///
/// Assigned once when the object is created and never reused within the
/// process, so it is safe to use as a subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Generate a new unique object ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a property on an observable object.
pub type PropertyKey = Arc<str>;

/// Unique identifier for an installed observer.
///
/// Uses an atomic counter to ensure uniqueness across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

/// Change callback installed on an (object, property) pair.
///
/// Cloning is cheap; the observable clones callbacks out of its table
/// before invoking them so no lock is held while user code runs.
#[derive(Clone)]
pub struct Observer {
    id: ObserverId,
    notify: Arc<dyn Fn() + Send + Sync>,
}

impl Observer {
    /// Create an observer with the given notification callback.
    pub fn new<F>(id: ObserverId, notify: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id,
            notify: Arc::new(notify),
        }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Invoke the callback.
    pub fn notify(&self) {
        (self.notify)();
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").field("id", &self.id).finish()
    }
}
