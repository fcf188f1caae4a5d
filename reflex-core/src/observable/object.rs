//! Observable Objects
//!
//! An [`Observable`] is a property bag whose reads can be captured and whose
//! writes notify per-property observers. It is the data side of the render
//! engine: components read from observables while rendering, and writes
//! wake exactly the components that read the written property.
//!
//! # How Observables Work
//!
//! 1. A read inside a capture pass reports `(object, property)` to the
//!    active pass, then returns the value.
//!
//! 2. A write stores the value, bumps the property's version counter and
//!    fires every observer installed on that property.
//!
//! 3. Observers are installed and removed explicitly by id; the object
//!    never decides on its own who is interested.
//!
//! # Thread Safety
//!
//! Values live behind a `RwLock`, observers behind a `Mutex`. Neither lock
//! is held while an observer runs, so callbacks may freely read, write or
//! (un)subscribe on the same object.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;

use super::context::CaptureContext;
use super::observer::{ObjectId, Observer, ObserverId, PropertyKey};
use crate::error::ObservableError;

/// Storage for one property.
#[derive(Debug, Default)]
struct Slot {
    /// `None` once the property has been removed.
    value: Option<Value>,
    /// Bumped on every write, including removal.
    version: u64,
}

struct ObservableInner {
    id: ObjectId,
    slots: RwLock<IndexMap<PropertyKey, Slot>>,
    observers: Mutex<HashMap<PropertyKey, SmallVec<[Observer; 2]>>>,
}

/// A reactive property bag.
///
/// Cloning an `Observable` yields another handle to the same object; the
/// identity, values and observers are shared.
///
/// # Example
///
/// ```rust,ignore
/// let user = Observable::new();
/// user.set("name", &"Ada")?;
///
/// // Inside a render, this read subscribes the component to `name`.
/// let name: Option<String> = user.get("name")?;
/// ```
#[derive(Clone)]
pub struct Observable {
    inner: Arc<ObservableInner>,
}

impl Observable {
    /// Create an empty observable with a fresh identity.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ObservableInner {
                id: ObjectId::new(),
                slots: RwLock::new(IndexMap::new()),
                observers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Create an observable pre-populated with the given properties.
    ///
    /// Initial values start at version 0 and fire no observers.
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<PropertyKey>,
    {
        let observable = Self::new();
        {
            let mut slots = observable.inner.slots.write();
            for (key, value) in values {
                slots.insert(
                    key.into(),
                    Slot {
                        value: Some(value),
                        version: 0,
                    },
                );
            }
        }
        observable
    }

    /// Stable identity of this object.
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    /// Check whether two handles point at the same object.
    pub fn ptr_eq(&self, other: &Observable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read a property and decode it as `T`.
    ///
    /// The read is reported to the active capture pass even when the
    /// property is missing, so a later first write still wakes the reader.
    pub fn get<T>(&self, property: &str) -> Result<Option<T>, ObservableError>
    where
        T: DeserializeOwned,
    {
        self.get_value(property)
            .map(|value| {
                serde_json::from_value(value).map_err(|source| ObservableError::Deserialize {
                    property: property.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Read the raw value of a property.
    pub fn get_value(&self, property: &str) -> Option<Value> {
        let (key, value) = {
            let slots = self.inner.slots.read();
            match slots.get_key_value(property) {
                Some((key, slot)) => (key.clone(), slot.value.clone()),
                None => (PropertyKey::from(property), None),
            }
        };
        CaptureContext::report(self, &key);
        value
    }

    /// Read a property without reporting it to the active capture pass.
    pub fn get_untracked(&self, property: &str) -> Option<Value> {
        self.inner
            .slots
            .read()
            .get(property)
            .and_then(|slot| slot.value.clone())
    }

    /// Encode `value` and write it to `property`.
    pub fn set<T>(&self, property: impl Into<PropertyKey>, value: &T) -> Result<(), ObservableError>
    where
        T: Serialize + ?Sized,
    {
        let property = property.into();
        let value = serde_json::to_value(value).map_err(|source| ObservableError::Serialize {
            property: property.to_string(),
            source,
        })?;
        self.set_value(property, value);
        Ok(())
    }

    /// Write a raw value and notify observers of `property`.
    pub fn set_value(&self, property: impl Into<PropertyKey>, value: Value) {
        let property = property.into();
        {
            let mut slots = self.inner.slots.write();
            let slot = slots.entry(property.clone()).or_default();
            slot.value = Some(value);
            slot.version += 1;
        }
        self.notify(&property);
    }

    /// Remove a property, returning its last value.
    ///
    /// Removing a property that was never set is a no-op and notifies
    /// nobody.
    pub fn remove(&self, property: &str) -> Option<Value> {
        let (key, previous) = {
            let mut slots = self.inner.slots.write();
            match slots.get_full_mut(property) {
                Some((_, key, slot)) if slot.value.is_some() => {
                    slot.version += 1;
                    (key.clone(), slot.value.take())
                }
                _ => return None,
            }
        };
        self.notify(&key);
        previous
    }

    /// Number of writes made to `property` so far.
    pub fn version(&self, property: &str) -> u64 {
        self.inner
            .slots
            .read()
            .get(property)
            .map_or(0, |slot| slot.version)
    }

    /// Names of the properties that currently hold a value, in insertion
    /// order. Not reported to the capture pass.
    pub fn keys(&self) -> Vec<PropertyKey> {
        self.inner
            .slots
            .read()
            .iter()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Snapshot of all present properties as a JSON object.
    pub fn to_json(&self) -> Value {
        let slots = self.inner.slots.read();
        let map = slots
            .iter()
            .filter_map(|(key, slot)| slot.value.clone().map(|value| (key.to_string(), value)))
            .collect();
        Value::Object(map)
    }

    /// Install a change callback on `property`.
    pub fn observe(&self, property: impl Into<PropertyKey>, observer: Observer) {
        self.inner
            .observers
            .lock()
            .entry(property.into())
            .or_default()
            .push(observer);
    }

    /// Remove the observer with the given id from `property`.
    ///
    /// Returns whether an observer was removed.
    pub fn remove_observer(&self, property: &str, id: ObserverId) -> bool {
        let mut observers = self.inner.observers.lock();
        let Some(list) = observers.get_mut(property) else {
            return false;
        };
        let before = list.len();
        list.retain(|observer| observer.id() != id);
        let removed = list.len() != before;
        if list.is_empty() {
            observers.remove(property);
        }
        removed
    }

    /// Number of observers installed on `property`.
    pub fn observer_count(&self, property: &str) -> usize {
        self.inner
            .observers
            .lock()
            .get(property)
            .map_or(0, |list| list.len())
    }

    /// Fire every observer of `property`.
    fn notify(&self, property: &str) {
        let observers: SmallVec<[Observer; 2]> = match self.inner.observers.lock().get(property) {
            Some(list) => list.clone(),
            None => return,
        };
        tracing::trace!(
            object = %self.inner.id,
            property,
            observers = observers.len(),
            "notifying observers"
        );
        for observer in observers {
            observer.notify();
        }
    }
}

impl Default for Observable {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("values", &self.to_json())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
