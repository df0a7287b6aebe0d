//! # Listener registry: per-key ordered listener lists.
//!
//! The registry maps each event key (by `TypeId`) to a slot holding two
//! ordered lists: persistent listeners and one-shot listeners. Insertion
//! order is invocation order within each list.
//!
//! ## Rules
//! - The same listener may be registered any number of times; every
//!   registration has its own [`ListenerId`] and is removed individually.
//! - `remove` removes exactly one matching registration (or none) and
//!   reports whether anything was removed; removing an unknown id is a no-op.
//! - `take_once` snapshots and clears the one-shot list atomically, so a
//!   dispatch consumes each one-shot registration exactly once.
//! - Slots left empty are pruned.
//!
//! The registry itself is plain data. All concurrency control lives in the
//! scheduler, which is the only component that touches it.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::events::EventKey;
use crate::listeners::{Listen, ListenerId};

/// One listener registration: the handle plus the shared listener.
pub(crate) struct Registered<T: Send + 'static> {
    pub(crate) id: ListenerId,
    pub(crate) listener: Arc<dyn Listen<T>>,
}

impl<T: Send + 'static> Clone for Registered<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            listener: Arc::clone(&self.listener),
        }
    }
}

/// Listener lists for one event key.
struct Slot<T: Send + 'static> {
    persistent: Vec<Registered<T>>,
    once: Vec<Registered<T>>,
}

impl<T: Send + 'static> Slot<T> {
    fn new() -> Self {
        Self {
            persistent: Vec::new(),
            once: Vec::new(),
        }
    }
}

/// Type-erased access to a slot: removal and bookkeeping work without
/// knowing the payload type, typed access goes through `Any` downcasts.
trait AnySlot: Send {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove(&mut self, id: ListenerId) -> bool;
    fn is_empty(&self) -> bool;
    fn len(&self) -> usize;
}

impl<T: Send + 'static> AnySlot for Slot<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        if let Some(pos) = self.once.iter().position(|entry| entry.id == id) {
            self.once.remove(pos);
            return true;
        }
        if let Some(pos) = self.persistent.iter().position(|entry| entry.id == id) {
            self.persistent.remove(pos);
            return true;
        }
        false
    }

    fn is_empty(&self) -> bool {
        self.persistent.is_empty() && self.once.is_empty()
    }

    fn len(&self) -> usize {
        self.persistent.len() + self.once.len()
    }
}

/// Per-emitter listener registry.
pub(crate) struct Registry {
    slots: HashMap<TypeId, Box<dyn AnySlot>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Appends a persistent listener for `K` (creating the slot if absent).
    pub(crate) fn add_persistent<K: EventKey>(&mut self, entry: Registered<K::Value>) {
        self.slot_mut::<K>().persistent.push(entry);
    }

    /// Appends a one-shot listener for `K` (creating the slot if absent).
    pub(crate) fn add_once<K: EventKey>(&mut self, entry: Registered<K::Value>) {
        self.slot_mut::<K>().once.push(entry);
    }

    /// Removes exactly one registration with the given id from either list.
    ///
    /// Returns whether anything was removed; unknown ids are a no-op.
    pub(crate) fn remove(&mut self, key: TypeId, id: ListenerId) -> bool {
        let Some(slot) = self.slots.get_mut(&key) else {
            return false;
        };
        let removed = slot.remove(id);
        if slot.is_empty() {
            self.slots.remove(&key);
        }
        removed
    }

    /// Snapshots and clears the one-shot list for `K` atomically.
    pub(crate) fn take_once<K: EventKey>(&mut self) -> Vec<Registered<K::Value>> {
        let key = TypeId::of::<K>();
        let (taken, now_empty) = {
            let Some(slot) = self.slots.get_mut(&key) else {
                return Vec::new();
            };
            let Some(slot) = slot.as_any_mut().downcast_mut::<Slot<K::Value>>() else {
                return Vec::new();
            };
            (std::mem::take(&mut slot.once), slot.persistent.is_empty())
        };
        if now_empty {
            self.slots.remove(&key);
        }
        taken
    }

    /// Clones the persistent list for `K` in registration order.
    pub(crate) fn snapshot<K: EventKey>(&self) -> Vec<Registered<K::Value>> {
        self.slots
            .get(&TypeId::of::<K>())
            .and_then(|slot| slot.as_any().downcast_ref::<Slot<K::Value>>())
            .map(|slot| slot.persistent.clone())
            .unwrap_or_default()
    }

    /// Number of registrations (persistent + once) currently held for a key.
    pub(crate) fn len_of(&self, key: TypeId) -> usize {
        self.slots.get(&key).map_or(0, |slot| slot.len())
    }

    fn slot_mut<K: EventKey>(&mut self) -> &mut Slot<K::Value> {
        let slot = self
            .slots
            .entry(TypeId::of::<K>())
            .or_insert_with(|| Box::new(Slot::<K::Value>::new()));
        slot.as_any_mut()
            .downcast_mut::<Slot<K::Value>>()
            .expect("slot payload type is fixed by its key")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenerResult;

    crate::events! {
        Ping => u32,
        Other => u32,
    }

    fn noop_listener() -> Arc<dyn Listen<u32>> {
        Arc::new(|_value: u32| async move { ListenerResult::Ok(()) })
    }

    fn entry(id: u64) -> Registered<u32> {
        Registered {
            id: ListenerId(id),
            listener: noop_listener(),
        }
    }

    #[test]
    fn test_snapshot_preserves_registration_order() {
        let mut registry = Registry::new();
        registry.add_persistent::<Ping>(entry(1));
        registry.add_persistent::<Ping>(entry(2));
        registry.add_persistent::<Ping>(entry(3));

        let ids: Vec<u64> = registry
            .snapshot::<Ping>()
            .iter()
            .map(|e| e.id.0)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_remove_takes_exactly_one_registration() {
        let mut registry = Registry::new();
        let listener = noop_listener();
        // Same listener registered twice: two independent registrations.
        registry.add_persistent::<Ping>(Registered {
            id: ListenerId(1),
            listener: Arc::clone(&listener),
        });
        registry.add_persistent::<Ping>(Registered {
            id: ListenerId(2),
            listener,
        });

        assert!(registry.remove(TypeId::of::<Ping>(), ListenerId(1)));
        let ids: Vec<u64> = registry
            .snapshot::<Ping>()
            .iter()
            .map(|e| e.id.0)
            .collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut registry = Registry::new();
        registry.add_persistent::<Ping>(entry(1));
        assert!(!registry.remove(TypeId::of::<Ping>(), ListenerId(99)));
        assert!(!registry.remove(TypeId::of::<Other>(), ListenerId(1)));
        assert_eq!(registry.len_of(TypeId::of::<Ping>()), 1);
    }

    #[test]
    fn test_take_once_clears_the_list() {
        let mut registry = Registry::new();
        registry.add_once::<Ping>(entry(1));
        registry.add_once::<Ping>(entry(2));
        registry.add_persistent::<Ping>(entry(3));

        let taken: Vec<u64> = registry.take_once::<Ping>().iter().map(|e| e.id.0).collect();
        assert_eq!(taken, vec![1, 2]);
        assert!(registry.take_once::<Ping>().is_empty());
        assert_eq!(registry.len_of(TypeId::of::<Ping>()), 1);
    }

    #[test]
    fn test_empty_slots_are_pruned() {
        let mut registry = Registry::new();
        registry.add_once::<Ping>(entry(1));
        let _ = registry.take_once::<Ping>();
        assert!(registry.slots.is_empty());

        registry.add_persistent::<Ping>(entry(2));
        registry.remove(TypeId::of::<Ping>(), ListenerId(2));
        assert!(registry.slots.is_empty());
    }

    #[test]
    fn test_keys_with_same_payload_type_stay_separate() {
        let mut registry = Registry::new();
        registry.add_persistent::<Ping>(entry(1));
        registry.add_persistent::<Other>(entry(2));

        assert_eq!(registry.len_of(TypeId::of::<Ping>()), 1);
        assert_eq!(registry.len_of(TypeId::of::<Other>()), 1);
        assert_eq!(registry.snapshot::<Ping>().len(), 1);
    }
}
