//! Observer Ledger
//!
//! Each instance keeps a ledger of the (object, property) pairs it is
//! currently subscribed to. The ledger is rebuilt on every render, so after
//! a render completes it holds exactly the pairs that render read.
//!
//! All subscriptions of one instance share a single [`ObserverId`]; the
//! ledger's uniqueness key guarantees at most one observer per pair, so
//! removal by (property, id) is exact.

use indexmap::IndexMap;
use serde::Serialize;

use crate::observable::{ObjectId, Observable, ObserverId, PropertyKey};

/// Uniqueness key of a subscription within one instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessKey {
    pub object: ObjectId,
    pub property: PropertyKey,
}

/// A live subscription on one (object, property) pair.
///
/// Holds a handle to the object so the ledger can unsubscribe without
/// looking the object up again.
#[derive(Debug, Clone)]
pub struct Subscription {
    object: Observable,
    property: PropertyKey,
    observer: ObserverId,
    /// Render pass that installed the subscription.
    tag: u64,
}

impl Subscription {
    pub fn object(&self) -> &Observable {
        &self.object
    }

    pub fn property(&self) -> &PropertyKey {
        &self.property
    }

    pub fn tag(&self) -> u64 {
        self.tag
    }
}

/// Serializable view of a subscription, for debugging tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionInfo {
    pub object: ObjectId,
    pub property: String,
    pub tag: u64,
}

/// Per-instance record of active subscriptions.
#[derive(Debug)]
pub struct ObserverLedger {
    observer: ObserverId,
    pass: u64,
    entries: IndexMap<AccessKey, Subscription>,
}

impl ObserverLedger {
    pub fn new() -> Self {
        Self {
            observer: ObserverId::new(),
            pass: 0,
            entries: IndexMap::new(),
        }
    }

    /// Observer id used for every subscription this ledger records.
    pub fn observer_id(&self) -> ObserverId {
        self.observer
    }

    /// Number of capture passes started so far.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// Start a fresh capture pass.
    ///
    /// Forgets the previous pass's entries without unsubscribing them, so
    /// callers must run [`remove_all`](Self::remove_all) first.
    pub fn begin_capture(&mut self) {
        self.pass += 1;
        self.entries.clear();
    }

    /// Record a read of `property` on `object`.
    ///
    /// Returns `true` only the first time the pair is seen in this pass;
    /// the caller then installs exactly one observer for it.
    pub fn track_access(&mut self, object: &Observable, property: &PropertyKey) -> bool {
        let key = AccessKey {
            object: object.id(),
            property: property.clone(),
        };
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(
            key,
            Subscription {
                object: object.clone(),
                property: property.clone(),
                observer: self.observer,
                tag: self.pass,
            },
        );
        true
    }

    /// Unsubscribe every tracked pair and clear the ledger.
    ///
    /// Safe to call on an empty ledger.
    pub fn remove_all(&mut self) {
        for (_, subscription) in self.entries.drain(..) {
            subscription
                .object
                .remove_observer(&subscription.property, subscription.observer);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether the pair is currently tracked.
    pub fn contains(&self, object: ObjectId, property: &str) -> bool {
        self.entries.contains_key(&AccessKey {
            object,
            property: PropertyKey::from(property),
        })
    }

    /// Tracked pairs, in the order they were first read.
    pub fn keys(&self) -> impl Iterator<Item = &AccessKey> {
        self.entries.keys()
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.entries.values()
    }

    pub fn info(&self) -> Vec<SubscriptionInfo> {
        self.entries
            .values()
            .map(|subscription| SubscriptionInfo {
                object: subscription.object.id(),
                property: subscription.property.to_string(),
                tag: subscription.tag,
            })
            .collect()
    }
}

impl Default for ObserverLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::Observer;

    fn key(name: &str) -> PropertyKey {
        PropertyKey::from(name)
    }

    /// Mirror what the render protocol does on a first-seen access.
    fn track_and_observe(ledger: &mut ObserverLedger, object: &Observable, property: &str) -> bool {
        let property = key(property);
        let first = ledger.track_access(object, &property);
        if first {
            object.observe(property, Observer::new(ledger.observer_id(), || {}));
        }
        first
    }

    #[test]
    fn track_access_deduplicates_within_pass() {
        let obj = Observable::new();
        let mut ledger = ObserverLedger::new();
        ledger.begin_capture();

        assert!(ledger.track_access(&obj, &key("a")));
        assert!(!ledger.track_access(&obj, &key("a")));
        assert!(ledger.track_access(&obj, &key("b")));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn same_property_on_different_objects_is_distinct() {
        let first = Observable::new();
        let second = Observable::new();
        let mut ledger = ObserverLedger::new();
        ledger.begin_capture();

        assert!(ledger.track_access(&first, &key("count")));
        assert!(ledger.track_access(&second, &key("count")));
        assert!(ledger.contains(first.id(), "count"));
        assert!(ledger.contains(second.id(), "count"));
    }

    #[test]
    fn remove_all_unsubscribes_and_is_idempotent() {
        let obj = Observable::new();
        let mut ledger = ObserverLedger::new();
        ledger.begin_capture();

        track_and_observe(&mut ledger, &obj, "a");
        track_and_observe(&mut ledger, &obj, "b");
        assert_eq!(obj.observer_count("a"), 1);
        assert_eq!(obj.observer_count("b"), 1);

        ledger.remove_all();
        assert!(ledger.is_empty());
        assert_eq!(obj.observer_count("a"), 0);
        assert_eq!(obj.observer_count("b"), 0);

        ledger.remove_all();
        assert!(ledger.is_empty());
    }

    #[test]
    fn remove_all_leaves_other_observers_alone() {
        let obj = Observable::new();
        obj.observe("a", Observer::new(ObserverId::new(), || {}));

        let mut ledger = ObserverLedger::new();
        ledger.begin_capture();
        track_and_observe(&mut ledger, &obj, "a");
        assert_eq!(obj.observer_count("a"), 2);

        ledger.remove_all();
        assert_eq!(obj.observer_count("a"), 1);
    }

    #[test]
    fn begin_capture_starts_new_pass() {
        let obj = Observable::new();
        let mut ledger = ObserverLedger::new();

        ledger.begin_capture();
        ledger.track_access(&obj, &key("a"));
        assert_eq!(ledger.info()[0].tag, 1);

        ledger.remove_all();
        ledger.begin_capture();
        assert!(ledger.track_access(&obj, &key("a")));
        assert_eq!(ledger.pass(), 2);
        assert_eq!(ledger.info()[0].tag, 2);
    }

    #[test]
    fn keys_preserve_first_read_order() {
        let obj = Observable::new();
        let mut ledger = ObserverLedger::new();
        ledger.begin_capture();

        for name in ["z", "a", "m", "a"] {
            ledger.track_access(&obj, &key(name));
        }

        let order: Vec<&str> = ledger.keys().map(|k| &*k.property).collect();
        assert_eq!(order, vec!["z", "a", "m"]);
    }
}
