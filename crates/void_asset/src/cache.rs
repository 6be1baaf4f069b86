//! Asset Cache - at most one live object per asset
//!
//! Entries live in an arena keyed by UID; paths map to UIDs, so a path lookup
//! is two hops and the two key spaces can never disagree. Every insert takes
//! a new generation, which lets a handle tell whether it still points at the
//! current instance. Detached entries leave nothing behind in the arena.
//!
//! Handles ([`AssetRef`]) count themselves on the entry. Detaching an entry
//! (explicit removal or cache clear) marks it evictable: an unreferenced
//! entry is destroyed immediately, a referenced one is destroyed by its last
//! handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::loader::Asset;
use crate::path;
use crate::uid::{AssetLocator, Uid};

/// Identity of one cached instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Asset UID
    pub uid: Uid,
    /// Cache generation at insertion time
    pub generation: u32,
}

/// Shared cache record
pub struct CacheEntry {
    key: CacheKey,
    path: String,
    asset: RwLock<Option<Box<dyn Asset>>>,
    ref_count: AtomicUsize,
    evictable: AtomicBool,
}

impl CacheEntry {
    fn new(key: CacheKey, path: String, asset: Box<dyn Asset>) -> Self {
        Self {
            key,
            path,
            asset: RwLock::new(Some(asset)),
            ref_count: AtomicUsize::new(0),
            evictable: AtomicBool::new(false),
        }
    }

    /// Get reference count
    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::Acquire)
    }

    /// Check if the asset object is still alive
    pub fn is_alive(&self) -> bool {
        self.asset.read().is_some()
    }

    /// Check if the entry was detached from the cache
    pub fn is_evictable(&self) -> bool {
        self.evictable.load(Ordering::Acquire)
    }

    fn add_ref(&self) -> usize {
        self.ref_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn release(&self) -> usize {
        let remaining = self.ref_count.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 && self.is_evictable() {
            self.destroy();
        }
        remaining
    }

    /// Detach from the cache; destroys now if nobody holds a handle
    fn mark_evictable(&self) -> bool {
        self.evictable.store(true, Ordering::Release);
        if self.ref_count() == 0 {
            self.destroy();
            true
        } else {
            false
        }
    }

    fn destroy(&self) {
        if self.asset.write().take().is_some() {
            log::debug!("Released cached asset {} ({})", self.path, self.key.uid);
        }
    }
}

/// Reference-counted handle to a cached asset
///
/// Cloning increments the count, dropping decrements it.
#[derive(Default)]
pub struct AssetRef {
    entry: Option<Arc<CacheEntry>>,
}

impl AssetRef {
    fn new(entry: Arc<CacheEntry>) -> Self {
        entry.add_ref();
        Self { entry: Some(entry) }
    }

    /// The null handle
    pub fn empty() -> Self {
        Self { entry: None }
    }

    /// Check if this is the null handle
    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    /// Asset UID
    pub fn uid(&self) -> Option<Uid> {
        self.entry.as_ref().map(|e| e.key.uid)
    }

    /// Cache key of the referenced instance
    pub fn key(&self) -> Option<CacheKey> {
        self.entry.as_ref().map(|e| e.key)
    }

    /// Path the asset was loaded from
    pub fn path(&self) -> Option<&str> {
        self.entry.as_ref().map(|e| e.path.as_str())
    }

    /// Number of live handles to this instance
    pub fn ref_count(&self) -> usize {
        self.entry.as_ref().map(|e| e.ref_count()).unwrap_or(0)
    }

    /// Borrow the asset object
    pub fn read(&self) -> Option<MappedRwLockReadGuard<'_, dyn Asset>> {
        let entry = self.entry.as_ref()?;
        RwLockReadGuard::try_map(entry.asset.read(), |a| a.as_deref()).ok()
    }

    /// Borrow the asset object mutably
    pub fn write(&self) -> Option<MappedRwLockWriteGuard<'_, dyn Asset>> {
        let entry = self.entry.as_ref()?;
        RwLockWriteGuard::try_map(entry.asset.write(), |a| a.as_deref_mut()).ok()
    }

    /// Borrow the asset as a concrete type
    pub fn get<T: Asset>(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        let entry = self.entry.as_ref()?;
        RwLockReadGuard::try_map(entry.asset.read(), |a| {
            a.as_deref().and_then(|a| a.as_any().downcast_ref::<T>())
        })
        .ok()
    }

    /// Check if two handles point at the same instance
    pub fn ptr_eq(&self, other: &AssetRef) -> bool {
        match (&self.entry, &other.entry) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Clone for AssetRef {
    fn clone(&self) -> Self {
        match &self.entry {
            Some(entry) => Self::new(entry.clone()),
            None => Self::empty(),
        }
    }
}

impl Drop for AssetRef {
    fn drop(&mut self) {
        if let Some(entry) = &self.entry {
            entry.release();
        }
    }
}

impl PartialEq for AssetRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl fmt::Debug for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRef")
            .field("key", &self.key())
            .field("path", &self.path())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// Registry of loaded assets
///
/// Generations come from one counter for the whole cache, so a key is never
/// reused even after its UID was evicted and loaded again.
#[derive(Default)]
pub struct AssetCache {
    entries: HashMap<Uid, Arc<CacheEntry>>,
    by_path: HashMap<String, Uid>,
    next_generation: u32,
}

impl AssetCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached asset; a hit returns a new handle
    pub fn find<'a>(&self, locator: impl Into<AssetLocator<'a>>) -> Option<AssetRef> {
        let uid = match locator.into() {
            AssetLocator::Path(p) => *self.by_path.get(path::normalize(p).as_str())?,
            AssetLocator::Uid(uid) => uid,
        };
        let entry = self.entries.get(&uid)?;
        Some(AssetRef::new(entry.clone()))
    }

    /// Register a freshly loaded asset under both key spaces
    ///
    /// A previous entry for the same UID is detached first.
    pub fn insert(&mut self, uid: Uid, path: &str, asset: Box<dyn Asset>) -> AssetRef {
        self.remove(uid);

        self.next_generation = self.next_generation.wrapping_add(1);
        let key = CacheKey {
            uid,
            generation: self.next_generation,
        };
        let entry = Arc::new(CacheEntry::new(key, path.to_string(), asset));
        self.entries.insert(uid, entry.clone());
        self.by_path.insert(path.to_string(), uid);

        AssetRef::new(entry)
    }

    /// Drop both index entries for an asset
    ///
    /// The object itself is destroyed only once no handle references it.
    pub fn remove(&mut self, uid: Uid) -> bool {
        let entry = match self.entries.remove(&uid) {
            Some(entry) => entry,
            None => return false,
        };
        if self.by_path.get(&entry.path) == Some(&uid) {
            self.by_path.remove(&entry.path);
        }
        entry.mark_evictable();
        true
    }

    /// Detach every entry
    ///
    /// Returns the number of entries still referenced by handles; those are
    /// destroyed by their last handle.
    pub fn clear(&mut self) -> usize {
        self.by_path.clear();

        let mut retained = 0;
        for (_, entry) in self.entries.drain() {
            if !entry.mark_evictable() {
                retained += 1;
            }
        }

        if retained > 0 {
            log::debug!("Asset cache cleared, {} entries still referenced", retained);
        }
        retained
    }

    /// Check if a handle points at the current instance of its asset
    pub fn is_current(&self, handle: &AssetRef) -> bool {
        match handle.key() {
            Some(key) => self
                .entries
                .get(&key.uid)
                .map(|e| e.key == key)
                .unwrap_or(false),
            None => false,
        }
    }

    /// Check if an asset is cached
    pub fn contains<'a>(&self, locator: impl Into<AssetLocator<'a>>) -> bool {
        match locator.into() {
            AssetLocator::Path(p) => self.by_path.contains_key(path::normalize(p).as_str()),
            AssetLocator::Uid(uid) => self.entries.contains_key(&uid),
        }
    }

    /// Number of cached assets
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
