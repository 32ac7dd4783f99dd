//! Concurrent key-value store implementation

use super::config::{ExpiryPolicy, StoreConfig};
use super::slot::Slot;
use crate::expiry::{ExpiryTarget, ExpiryTask, Reaper};
use siphasher::sip::SipHasher13;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasherDefault, Hash};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;
use tracing::{debug, error};

/// Type alias for our hash map with SipHasher
type StoreMap<K, V> = HashMap<K, Slot<V>, BuildHasherDefault<SipHasher13>>;

/// Everything guarded by the store lock
struct StoreState<K, V> {
    /// The main storage map
    map: StoreMap<K, V>,

    /// Stamp handed to the next insert
    next_stamp: u64,
}

/// State shared by every handle of one store
struct Shared<K, V> {
    state: RwLock<StoreState<K, V>>,
    config: StoreConfig,

    /// Started on the first `put_expires`, `None` if starting failed
    reaper: OnceLock<Option<Reaper<K>>>,
}

/// In-memory key-value store, safe to share between threads
///
/// All operations go through a single reader-writer lock: `get` takes it in
/// shared mode, `put` and `delete` in exclusive mode. Cloning a `KeyStore`
/// yields another handle to the same map.
///
/// ```rust
/// use keystore::KeyStore;
///
/// let store = KeyStore::<u32, String>::new();
/// store.put(1, "one".to_string());
/// assert_eq!(store.get(&1).as_deref(), Some("one"));
///
/// store.delete(&1);
/// assert_eq!(store.get(&1), None);
/// ```
pub struct KeyStore<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> KeyStore<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty store with the default configuration
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store with the given configuration
    pub fn with_config(config: StoreConfig) -> Self {
        let map = HashMap::with_capacity_and_hasher(
            config.initial_capacity,
            BuildHasherDefault::<SipHasher13>::default(),
        );

        KeyStore {
            shared: Arc::new(Shared {
                state: RwLock::new(StoreState { map, next_stamp: 0 }),
                config,
                reaper: OnceLock::new(),
            }),
        }
    }

    /// Insert or overwrite the value stored under `key`
    ///
    /// Expiry tasks already scheduled for `key` are left untouched.
    pub fn put(&self, key: K, value: V) {
        self.insert(key, value);
    }

    /// Get a copy of the value stored under `key`
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get_with(key, V::clone)
    }

    /// Run `f` against the value stored under `key` while holding the read lock
    ///
    /// Works for values that are not `Clone`. `f` must not call back into
    /// the same store for writing, or it will deadlock.
    pub fn get_with<Q, R, F>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> R,
    {
        self.read().map.get(key).map(|slot| f(&slot.value))
    }

    /// Check if a key is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read().map.contains_key(key)
    }

    /// Remove `key` if present; absent keys are ignored
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.write().map.remove(key);
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.read().map.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the configuration this store was built with
    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// Insert under the write lock and return the stamp of this write
    fn insert(&self, key: K, value: V) -> u64 {
        let mut state = self.write();
        let stamp = state.next_stamp;
        state.next_stamp = state.next_stamp.wrapping_add(1);
        state.map.insert(key, Slot::new(value, stamp));
        stamp
    }

    // A panicking thread can only poison the lock between whole
    // insert/remove calls, so the map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, StoreState<K, V>> {
        self.shared.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState<K, V>> {
        self.shared.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> KeyStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Put a value, then delete `key` once `ttl` has elapsed
    ///
    /// Returns as soon as the value is stored. With
    /// [`ExpiryPolicy::KeyBound`] the delete applies to whatever the key
    /// holds when it fires, including values written later by `put`.
    pub fn put_expires(&self, key: K, value: V, ttl: Duration) {
        let stamp = self.insert(key.clone(), value);
        let task = ExpiryTask::new(key, ttl, stamp);

        let scheduled = self.reaper().is_some_and(|reaper| reaper.schedule(task));
        if !scheduled {
            error!("Expiry reaper unavailable, entry will not expire");
        }
    }

    /// Get the reaper, starting it on first use
    ///
    /// Concurrent first callers wait on the `OnceLock`, so at most one
    /// reaper thread is ever spawned. A failed start is not retried.
    fn reaper(&self) -> Option<&Reaper<K>> {
        self.shared
            .reaper
            .get_or_init(|| {
                let target = Arc::downgrade(&self.shared);
                let target: Weak<dyn ExpiryTarget<K>> = target;
                Reaper::spawn(target)
                    .map_err(|e| error!("Failed to start expiry reaper: {}", e))
                    .ok()
            })
            .as_ref()
    }
}

impl<K, V> ExpiryTarget<K> for Shared<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    fn expire(&self, key: &K, stamp: u64) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        match self.config.expiry_policy {
            ExpiryPolicy::KeyBound => state.map.remove(key).is_some(),
            ExpiryPolicy::WriteBound => {
                if state.map.get(key).is_some_and(|slot| slot.written_by(stamp)) {
                    state.map.remove(key);
                    true
                } else {
                    debug!("Key overwritten since its expiry was scheduled, keeping it");
                    false
                }
            }
        }
    }
}

impl<K, V> Clone for KeyStore<K, V> {
    fn clone(&self) -> Self {
        KeyStore {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V> Default for KeyStore<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for KeyStore<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("len", &self.len())
            .field("config", &self.shared.config)
            .field("reaper_running", &matches!(self.shared.reaper.get(), Some(Some(_))))
            .finish()
    }
}
