//! Single-flight keyed cache
//!
//! [`FlightCache`] is the concurrency primitive under both the memoizer and
//! the model cache. Each key owns a slot guarded by its own lock, so at most
//! one computation per key runs at a time; callers racing on the same key
//! block on the slot and then reuse whatever the first caller stored.
//!
//! The cache never evicts. Keys are expected to be few and fixed by
//! configuration (dataset loaders, model names). A slot whose computation
//! failed is dropped again once no other caller holds it, so failing keys
//! do not accumulate.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

/// A stored value together with the key it was computed for
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    /// Key the value was stored under
    pub key: K,

    /// The cached value
    pub value: V,

    /// When the value was stored
    pub created_at: Instant,
}

/// Result of a [`FlightCache::get_or_try_insert_with`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<V> {
    /// The cached or freshly computed value
    pub value: V,

    /// Whether the value came from the cache
    pub hit: bool,
}

/// Counters describing cache activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,

    /// Computations started because the key was absent
    pub misses: u64,

    /// Computations that returned an error
    pub failures: u64,

    /// Keys currently holding a value
    pub entries: usize,
}

type Slot<K, V> = Arc<Mutex<Option<CacheEntry<K, V>>>>;

/// Keyed cache with at-most-one in-flight computation per key
pub struct FlightCache<K, V> {
    /// Per-key slots; an empty slot means "not computed yet" or "last attempt failed"
    slots: RwLock<HashMap<K, Slot<K, V>>>,

    /// Slots holding a value
    filled: AtomicUsize,

    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

impl<K, V> FlightCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            filled: AtomicUsize::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    fn slot(&self, key: &K) -> Slot<K, V> {
        if let Some(slot) = self.slots.read().get(key) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write();
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Return the value for `key`, computing it with `f` if absent.
    ///
    /// Concurrent callers for the same key wait for the running computation.
    /// An error from `f` is returned to its caller and nothing is stored; the
    /// next caller for that key runs its own computation.
    pub fn get_or_try_insert_with<E, F>(&self, key: &K, f: F) -> Result<Lookup<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock();

        if let Some(entry) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Lookup {
                value: entry.value.clone(),
                hit: true,
            });
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match f() {
            Ok(value) => {
                *guard = Some(CacheEntry {
                    key: key.clone(),
                    value: value.clone(),
                    created_at: Instant::now(),
                });
                self.filled.fetch_add(1, Ordering::Relaxed);
                Ok(Lookup { value, hit: false })
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                self.release_empty(key, &slot);
                Err(err)
            }
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// Waits for an in-flight computation on the same key before replacing.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let slot = self.slot(&key);
        let mut guard = slot.lock();
        self.store(&mut guard, key, value)
    }

    /// Replace the value for `key` with the result of `f`.
    ///
    /// The key's slot stays locked while `f` runs, so concurrent replacements
    /// and lookups on that key are ordered behind it. On error the previous
    /// value, if any, is kept.
    pub fn try_replace_with<E, F>(&self, key: K, f: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = self.slot(&key);
        let mut guard = slot.lock();
        match f() {
            Ok(value) => Ok(self.store(&mut guard, key, value)),
            Err(err) => {
                if guard.is_none() {
                    self.release_empty(&key, &slot);
                }
                Err(err)
            }
        }
    }

    fn store(&self, slot: &mut Option<CacheEntry<K, V>>, key: K, value: V) -> Option<V> {
        let previous = slot.replace(CacheEntry {
            key,
            value,
            created_at: Instant::now(),
        });
        if previous.is_none() {
            self.filled.fetch_add(1, Ordering::Relaxed);
        }
        previous.map(|entry| entry.value)
    }

    /// Drop an empty slot from the map unless another caller still holds it.
    ///
    /// Called with the slot locked. Callers only clone slots under the map
    /// lock, so the reference count cannot grow while the write lock is held.
    fn release_empty(&self, key: &K, slot: &Slot<K, V>) {
        let mut slots = self.slots.write();
        let unshared = Arc::strong_count(slot) == 2;
        if unshared && slots.get(key).is_some_and(|held| Arc::ptr_eq(held, slot)) {
            slots.remove(key);
        }
    }

    /// Cached value for `key`, waiting for an in-flight computation
    pub fn get(&self, key: &K) -> Option<V> {
        let slot = self.slots.read().get(key).map(Arc::clone)?;
        let guard = slot.lock();
        guard.as_ref().map(|entry| entry.value.clone())
    }

    /// Full entry for `key`, including its creation time
    pub fn entry(&self, key: &K) -> Option<CacheEntry<K, V>> {
        let slot = self.slots.read().get(key).map(Arc::clone)?;
        let guard = slot.lock();
        guard.clone()
    }

    /// Whether `key` currently holds a value
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Keys currently holding a value; waits for in-flight computations
    pub fn keys(&self) -> Vec<K> {
        let slots: Vec<(K, Slot<K, V>)> = self
            .slots
            .read()
            .iter()
            .map(|(k, slot)| (k.clone(), Arc::clone(slot)))
            .collect();

        slots
            .into_iter()
            .filter(|(_, slot)| slot.lock().is_some())
            .map(|(k, _)| k)
            .collect()
    }

    /// Number of keys holding a value
    pub fn len(&self) -> usize {
        self.filled.load(Ordering::Relaxed)
    }

    /// Whether no key holds a value
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the activity counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl<K, V> Default for FlightCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for FlightCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightCache")
            .field("stats", &self.stats())
            .finish()
    }
}
