//! Node and backend traits shared by every store.
//!
//! A store maps an [`Id`] to a *node*. The node is what the backend holds;
//! the *value* is what callers see. The two differ when a node bundles more
//! than its value (a guild node carries nested stores), or holds the value
//! indirectly (a weak user reference).
//!
//! ```text
//!   caller value ──rewrap──▶ node ──▶ NodeMap backend
//!        ▲                     │
//!        └──────unwrap─────────┘
//! ```
//!
//! Backends only know how to compare-and-set a single key; every store
//! operation is built on that primitive.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::Id;

/// Entities that know their own key.
pub trait Keyed {
    fn key(&self) -> Id;
}

/// Storage representation of a value.
pub trait Node: Clone + Send + Sync + 'static {
    type Value: Clone + Send + Sync;

    /// Extracts the visible value. `None` when the node is empty or the value
    /// is not currently observable.
    fn unwrap(&self) -> Option<Self::Value>;

    /// Builds the node that should replace `current` to hold `value`.
    /// Returning `None` removes the node.
    fn rewrap(current: Option<&Self>, value: Option<Self::Value>) -> Option<Self>;

    /// Node identity used by compare-and-set.
    fn same(&self, other: &Self) -> bool;

    /// Whether [`unwrap`](Node::unwrap) would return a value.
    fn has_value(&self) -> bool {
        self.unwrap().is_some()
    }
}

/// Snapshot of store-level metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    pub inserts: u64,
    pub updates: u64,
    pub removes: u64,
    /// Compare-and-set attempts lost to a concurrent writer.
    pub retries: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Dead weak entries removed by sweeps.
    pub swept: u64,
}

impl std::ops::Add for StoreMetrics {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            inserts: self.inserts + rhs.inserts,
            updates: self.updates + rhs.updates,
            removes: self.removes + rhs.removes,
            retries: self.retries + rhs.retries,
            evictions: self.evictions + rhs.evictions,
            expirations: self.expirations + rhs.expirations,
            swept: self.swept + rhs.swept,
        }
    }
}

impl std::iter::Sum for StoreMetrics {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, m| acc + m)
    }
}

/// Atomic counters behind [`StoreMetrics`].
#[derive(Debug, Default)]
pub(crate) struct StoreCounters {
    inserts: AtomicU64,
    updates: AtomicU64,
    removes: AtomicU64,
    retries: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    swept: AtomicU64,
}

impl StoreCounters {
    pub(crate) fn snapshot(&self) -> StoreMetrics {
        StoreMetrics {
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn inc_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_removes(&self, n: u64) {
        self.removes.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn inc_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_swept(&self, n: u64) {
        self.swept.fetch_add(n, Ordering::Relaxed);
    }
}

/// A concurrent id → node map.
///
/// Implementations must make [`compare_and_set`](NodeMap::compare_and_set)
/// atomic per key. Different keys must not wait on each other beyond the
/// implementation's internal shard lock.
pub trait NodeMap<N: Node>: Send + Sync {
    fn get(&self, id: Id) -> Option<N>;

    /// Replaces the node at `id` with `new` (removing it when `None`) if the
    /// current node is `expected` (absent when `None`). Returns whether the
    /// swap happened.
    fn compare_and_set(&self, id: Id, expected: Option<&N>, new: Option<N>) -> bool;

    fn remove(&self, id: Id) -> Option<N>;

    fn ids(&self) -> Vec<Id>;

    fn nodes(&self) -> Vec<N>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keeps only the nodes for which `keep` returns `true`. Returns the
    /// number removed.
    fn retain(&self, keep: &mut dyn FnMut(Id, &N) -> bool) -> usize;

    fn clear(&self);

    fn metrics(&self) -> StoreMetrics;
}
