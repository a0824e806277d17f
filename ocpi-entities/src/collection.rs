//! Version-tagged owned collections
//!
//! `evses` and `connectors` are owned sub-entity lists: protected from
//! merge-patching and mutated only through dedicated add/replace/remove
//! operations. The collection keeps its own lock, separate from the entity's
//! patch lock, so structural updates never contend with patch application.
//! The two locks are never held at the same time.
//!
//! Reads hand out snapshots; the backing vector is never exposed for
//! iteration concurrent with mutation. Every mutation bumps a version
//! counter so callers can detect structural change cheaply.

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

struct Inner<T> {
    version: u64,
    items: Vec<T>,
}

/// An internally synchronized list of owned sub-entities
pub struct OwnedCollection<T> {
    inner: RwLock<Inner<T>>,
}

impl<T: Clone> OwnedCollection<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            inner: RwLock::new(Inner { version: 0, items }),
        }
    }

    /// Copy of the current items
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.read().items.clone()
    }

    /// Monotonic counter, bumped by every mutation
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    /// First item matching the predicate, cloned
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.inner.read().items.iter().find(|item| pred(item)).cloned()
    }

    /// Swap in a whole new list; returns the new version
    pub fn replace_all(&self, items: Vec<T>) -> u64 {
        let mut inner = self.inner.write();
        inner.items = items;
        inner.version += 1;
        inner.version
    }

    /// Replace the first item the new one matches, or append it.
    ///
    /// `same` decides identity (typically by id), not full equality.
    pub fn upsert(&self, item: T, same: impl Fn(&T, &T) -> bool) -> u64 {
        let mut inner = self.inner.write();
        match inner.items.iter_mut().find(|existing| same(existing, &item)) {
            Some(existing) => *existing = item,
            None => inner.items.push(item),
        }
        inner.version += 1;
        inner.version
    }

    /// Remove and return the first item matching the predicate
    pub fn remove(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        let mut inner = self.inner.write();
        let index = inner.items.iter().position(|item| pred(item))?;
        let removed = inner.items.remove(index);
        inner.version += 1;
        Some(removed)
    }
}

impl<T: Clone> Clone for OwnedCollection<T> {
    fn clone(&self) -> Self {
        let inner = self.inner.read();
        Self {
            inner: RwLock::new(Inner {
                version: inner.version,
                items: inner.items.clone(),
            }),
        }
    }
}

impl<T> Default for OwnedCollection<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner {
                version: 0,
                items: Vec::new(),
            }),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for OwnedCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.inner.read().items.iter()).finish()
    }
}

// Equality is on content only; the version counter is bookkeeping.
impl<T: PartialEq> PartialEq for OwnedCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.read().items == other.inner.read().items
    }
}

impl<T: Serialize> Serialize for OwnedCollection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.read().items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de> + Clone> Deserialize<'de> for OwnedCollection<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::new)
    }
}
