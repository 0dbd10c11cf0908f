//! Reference-counted identity cache
//!
//! Associates string identifiers with at most one live asset and hands out
//! [`AssetId`] handles. Lookups by identifier add a reference, releases drop
//! one, and the entry (including its identifier) is removed on the release
//! that brings the count to zero. The asset is handed back to the caller at
//! that point so it can free whatever it owns exactly once.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU64;

/// Handle to an asset stored in an [`AssetRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(NonZeroU64);

impl AssetId {
    /// Raw handle value, never zero
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of [`AssetRegistry::release`]
#[derive(Debug)]
pub enum Released<T> {
    /// Other owners remain
    Alive { remaining: u32 },
    /// That was the last reference; the asset is now the caller's to destroy
    Last(T),
}

#[derive(Debug)]
struct Entry<T> {
    asset: T,
    identifier: Option<String>,
    ref_count: u32,
}

/// Identifier-keyed store of shared assets
#[derive(Debug)]
pub struct AssetRegistry<T> {
    entries: HashMap<AssetId, Entry<T>>,
    by_identifier: HashMap<String, AssetId>,
    // `None` once every handle value has been issued; handles are never reused.
    next_id: Option<NonZeroU64>,
}

impl<T> Default for AssetRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AssetRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            by_identifier: HashMap::new(),
            next_id: Some(NonZeroU64::MIN),
        }
    }

    /// Look up `identifier`, adding a reference on a hit
    pub fn find(&mut self, identifier: &str) -> Option<AssetId> {
        let id = *self.by_identifier.get(identifier)?;
        let entry = self.entries.get_mut(&id)?;
        entry.ref_count += 1;
        Some(id)
    }

    /// Register `asset` with a reference count of one
    ///
    /// An empty or missing identifier makes the asset anonymous. If the
    /// identifier is already taken the existing asset gets the new reference
    /// and `asset` is dropped unused.
    pub fn allocate(&mut self, identifier: Option<&str>, asset: T) -> AssetId {
        let identifier = identifier.filter(|s| !s.is_empty());
        if let Some(name) = identifier
            && let Some(existing) = self.find(name)
        {
            tracing::debug!(target: "tex2d", "allocate: '{}' already registered as {}", name, existing);
            return existing;
        }

        let Some(raw) = self.next_id else {
            panic!("asset handle space exhausted");
        };
        self.next_id = raw.checked_add(1);
        let id = AssetId(raw);

        let identifier = identifier.map(str::to_owned);
        if let Some(name) = &identifier {
            self.by_identifier.insert(name.clone(), id);
        }
        self.entries.insert(
            id,
            Entry {
                asset,
                identifier,
                ref_count: 1,
            },
        );
        id
    }

    /// Add a reference to a live asset; returns false for unknown handles
    pub fn add_ref(&mut self, id: AssetId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.ref_count += 1;
                true
            }
            None => false,
        }
    }

    /// Drop one reference; `None` if the handle is not live
    pub fn release(&mut self, id: AssetId) -> Option<Released<T>> {
        let entry = self.entries.get_mut(&id)?;
        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 {
            return Some(Released::Alive {
                remaining: entry.ref_count,
            });
        }

        let entry = self.entries.remove(&id)?;
        if let Some(name) = &entry.identifier {
            self.by_identifier.remove(name);
        }
        Some(Released::Last(entry.asset))
    }

    /// Current reference count, `None` if the handle is not live
    pub fn ref_count(&self, id: AssetId) -> Option<u32> {
        self.entries.get(&id).map(|e| e.ref_count)
    }

    /// Identifier an asset was registered under
    pub fn identifier(&self, id: AssetId) -> Option<&str> {
        self.entries.get(&id)?.identifier.as_deref()
    }

    /// Whether `identifier` currently names a live asset
    pub fn contains_identifier(&self, identifier: &str) -> bool {
        self.by_identifier.contains_key(identifier)
    }

    /// Borrow a live asset
    pub fn get(&self, id: AssetId) -> Option<&T> {
        self.entries.get(&id).map(|e| &e.asset)
    }

    /// Mutably borrow a live asset
    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut T> {
        self.entries.get_mut(&id).map(|e| &mut e.asset)
    }

    /// Number of live assets
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no assets
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over live assets
    pub fn iter(&self) -> impl Iterator<Item = (AssetId, &T)> {
        self.entries.iter().map(|(id, e)| (*id, &e.asset))
    }

    /// Remove every asset regardless of reference count
    pub fn drain(&mut self) -> impl Iterator<Item = (AssetId, T)> + '_ {
        self.by_identifier.clear();
        self.entries.drain().map(|(id, e)| (id, e.asset))
    }
}
