use std::hash::Hash;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use flightbox_core::{RegistryError, Verdict};
use futures::future::{BoxFuture, Shared};

/// Result shared by every caller of one fetch.
pub type Resolution = Result<Verdict, RegistryError>;

/// Shared pending result of a fetch that is currently running.
///
/// The first caller for a key creates it; later callers clone and await it.
pub type Flight = Shared<BoxFuture<'static, Resolution>>;

/// State kept for one key.
pub enum Slot {
    /// Stored cacheable answer. Never replaced once written.
    Ready(Verdict),
    /// Fetch in flight.
    Pending(Flight),
}

/// Result of checking a key before fetching.
pub enum ConcurrencyDecision {
    /// A stored answer exists.
    Ready(Verdict),
    /// Another caller is fetching; await its flight.
    Await(Flight),
    /// This caller registered a new flight and must drive it.
    Proceed(Flight),
}

/// Map from key to either a stored answer or an in-flight fetch.
///
/// Entries and in-flight markers share one map, so a key can never be both
/// stored and pending. Shard locks are only held for the duration of a map
/// operation, never while a fetch runs.
pub struct FlightMap<K> {
    slots: Arc<DashMap<K, Slot>>,
}

impl<K> FlightMap<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
        }
    }

    /// Check the slot for `key`, registering the flight built by `launch` if
    /// the key is vacant.
    ///
    /// `launch` runs under the shard lock, so it must only build the future,
    /// not poll it.
    pub fn check_or_launch<L>(&self, key: K, launch: L) -> ConcurrencyDecision
    where
        L: FnOnce(Landing<K>) -> Flight,
    {
        match self.slots.entry(key) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Ready(verdict) => ConcurrencyDecision::Ready(verdict.clone()),
                Slot::Pending(flight) => ConcurrencyDecision::Await(flight.clone()),
            },
            Entry::Vacant(entry) => {
                let landing = Landing {
                    slots: Arc::downgrade(&self.slots),
                    key: Some(entry.key().clone()),
                };
                let flight = launch(landing);
                entry.insert(Slot::Pending(flight.clone()));
                ConcurrencyDecision::Proceed(flight)
            }
        }
    }

    /// Insert a stored answer for a vacant key. Returns `false` and leaves
    /// the map untouched if the key already has a slot.
    pub fn seed(&self, key: K, verdict: Verdict) -> bool {
        match self.slots.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(Slot::Ready(verdict));
                true
            }
        }
    }

    pub fn contains_ready(&self, key: &K) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| matches!(*slot, Slot::Ready(_)))
    }

    pub fn ready_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Ready(_)))
            .count()
    }

    pub fn pending_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Pending(_)))
            .count()
    }
}

impl<K> Default for FlightMap<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Settles the slot of one flight.
///
/// Moved into the flight future. [`Landing::settle`] replaces the in-flight
/// marker with the stored answer, or removes it when the answer is not
/// cacheable. If the future is dropped or unwinds before settling, the marker
/// is removed so the key is not left pending forever.
pub struct Landing<K>
where
    K: Eq + Hash,
{
    slots: Weak<DashMap<K, Slot>>,
    key: Option<K>,
}

impl<K> Landing<K>
where
    K: Eq + Hash,
{
    pub fn settle(mut self, resolution: &Resolution) {
        let (Some(slots), Some(key)) = (self.slots.upgrade(), self.key.take()) else {
            return;
        };
        match resolution {
            Ok(verdict) => {
                slots.insert(key, Slot::Ready(verdict.clone()));
            }
            Err(_) => {
                slots.remove_if(&key, |_, slot| matches!(slot, Slot::Pending(_)));
            }
        }
    }
}

impl<K> Drop for Landing<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        if let (Some(slots), Some(key)) = (self.slots.upgrade(), self.key.take()) {
            slots.remove_if(&key, |_, slot| matches!(slot, Slot::Pending(_)));
        }
    }
}
