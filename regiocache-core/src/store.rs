use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::trace;

use crate::wire::{RegionUpdate, SyncState};
use crate::CacheEntry;

/// A thread-safe in-memory store of per-region configuration.
///
/// Keys are registered lazily, the first time a reader asks for them, and are
/// never removed afterwards. A registered key maps either to a placeholder
/// (requested, not loaded yet) or to a populated [`CacheEntry`]; a key that
/// was never requested is absent.
///
/// # Thread Safety
///
/// All state lives behind a single `parking_lot::RwLock`:
/// - **Reads** (`get`, `snapshot`, `contains`) take the shared lock and run
///   concurrently with each other
/// - **Writes** (`ensure_known`, `apply_update`, `apply_updates`) take the
///   exclusive lock
/// - No I/O ever happens while the lock is held, so lookups never wait on
///   the network
///
/// A store is kept in sync by at most one refresh scheduler, which claims it
/// through [`attach`](Self::attach).
///
/// # Examples
///
/// ```
/// use regiocache_core::{Region, RegionUpdate, Store};
///
/// let store = Store::new();
/// assert!(store.get("LON").is_none());
///
/// assert!(store.ensure_known("LON"));
/// assert!(!store.ensure_known("LON"));
/// assert!(store.get("LON").unwrap().is_placeholder());
///
/// store.apply_update(RegionUpdate::new("LON").with_region(Region::new("LON", "London"), "h1"));
/// let snapshot = store.snapshot();
/// assert_eq!(snapshot[0].region_hash, "h1");
/// ```
#[derive(Debug, Default)]
pub struct Store {
    entries: RwLock<HashMap<String, CacheEntry>>,
    attached: AtomicBool,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the store for a refresh scheduler.
    ///
    /// The claim is permanent. Among any number of callers exactly one
    /// observes `true`, so two schedulers can never sweep the same store.
    ///
    /// # Examples
    ///
    /// ```
    /// use regiocache_core::Store;
    ///
    /// let store = Store::new();
    /// assert!(!store.is_attached());
    /// assert!(store.attach());
    /// assert!(!store.attach());
    /// ```
    pub fn attach(&self) -> bool {
        self.attached
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Looks up a key.
    ///
    /// # Returns
    ///
    /// * `Some(entry)` - The key is registered; the entry may still be a placeholder
    /// * `None` - The key was never registered
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Returns `true` if `key` was ever registered, loaded or not.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of registered keys, placeholders included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Registers a placeholder for `key` unless it is already known.
    ///
    /// The fast path checks under the shared lock; only unknown keys take the
    /// exclusive lock, where the check is repeated before inserting. Among any
    /// number of concurrent callers racing on the same unknown key exactly one
    /// observes `true`.
    ///
    /// # Returns
    ///
    /// `true` if this call registered the key, `false` if it was already known.
    pub fn ensure_known(&self, key: &str) -> bool {
        if self.entries.read().contains_key(key) {
            return false;
        }

        let mut entries = self.entries.write();
        if entries.contains_key(key) {
            return false;
        }
        entries.insert(key.to_string(), CacheEntry::placeholder());
        trace!(region = key, "registered placeholder");
        true
    }

    /// Returns the synchronization state of every known key, sorted by key.
    ///
    /// The snapshot is taken under one lock acquisition and is therefore a
    /// consistent point-in-time view. Placeholders report empty hashes.
    pub fn snapshot(&self) -> Vec<SyncState> {
        let entries = self.entries.read();
        let mut states: Vec<SyncState> = entries
            .iter()
            .map(|(key, entry)| SyncState {
                code: key.clone(),
                region_hash: entry.region_hash.clone(),
                service_types_hash: entry.service_types_hash.clone(),
            })
            .collect();
        drop(entries);

        states.sort_by(|a, b| a.code.cmp(&b.code));
        states
    }

    /// Merges one update, creating the entry if the key is somehow unknown.
    pub fn apply_update(&self, update: RegionUpdate) {
        let mut entries = self.entries.write();
        Self::merge_into(&mut entries, update);
    }

    /// Merges a batch of updates under a single exclusive lock acquisition.
    ///
    /// Readers observe either none or all of the batch.
    pub fn apply_updates(&self, updates: impl IntoIterator<Item = RegionUpdate>) -> usize {
        let mut entries = self.entries.write();
        let mut applied = 0;
        for update in updates {
            Self::merge_into(&mut entries, update);
            applied += 1;
        }
        applied
    }

    fn merge_into(entries: &mut HashMap<String, CacheEntry>, update: RegionUpdate) {
        match entries.get_mut(update.key.as_str()) {
            Some(entry) => entry.merge(update),
            None => {
                let key = update.key.clone();
                let mut entry = CacheEntry::placeholder();
                entry.merge(update);
                entries.insert(key, entry);
            }
        }
    }
}
