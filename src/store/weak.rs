//! Store whose nodes hold their values weakly.
//!
//! ## Architecture
//!
//! ```text
//!   WeaklyHeldStore<T>
//!   ├── inner:     KeyedStore<Weak<T>>
//!   └── countdown: AtomicUsize ── reaches zero every `cadence` inserts
//!                                   └─▶ sweep(): drop nodes whose Weak
//!                                       no longer upgrades
//! ```
//!
//! A value lives as long as some other owner keeps an `Arc<T>`. Once the last
//! strong reference goes away the value is unreachable through this store
//! right away; the dead node itself lingers until the next sweep. Sweeping
//! is amortized over inserts instead of running on every operation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crate::model::Id;
use crate::store::backend::StorageBackend;
use crate::store::keyed::KeyedStore;
use crate::store::traits::{Node, StoreCounters, StoreMetrics};

/// Default number of inserts between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: usize = 8192;

impl<T> Node for Weak<T>
where
    T: Send + Sync + 'static,
{
    type Value = Arc<T>;

    fn unwrap(&self) -> Option<Arc<T>> {
        self.upgrade()
    }

    fn rewrap(_current: Option<&Self>, value: Option<Arc<T>>) -> Option<Self> {
        value.map(|strong| Arc::downgrade(&strong))
    }

    fn same(&self, other: &Self) -> bool {
        Weak::ptr_eq(self, other)
    }

    fn has_value(&self) -> bool {
        self.strong_count() > 0
    }
}

pub struct WeaklyHeldStore<T: Send + Sync + 'static> {
    inner: KeyedStore<Weak<T>>,
    cadence: usize,
    countdown: AtomicUsize,
    counters: StoreCounters,
}

impl<T: Send + Sync + 'static> WeaklyHeldStore<T> {
    pub fn new(backend: &StorageBackend, cadence: usize) -> Self {
        let cadence = cadence.max(1);
        Self {
            inner: KeyedStore::new(backend),
            cadence,
            countdown: AtomicUsize::new(cadence),
            counters: StoreCounters::default(),
        }
    }

    pub fn get(&self, id: Id) -> Option<Arc<T>> {
        self.inner.find(id)
    }

    /// Every value still alive.
    pub fn find_all(&self) -> Vec<Arc<T>> {
        self.inner.find_all()
    }

    /// Number of values still alive.
    pub fn count(&self) -> usize {
        self.inner.count()
    }

    /// Number of nodes, dead ones included.
    pub fn node_count(&self) -> usize {
        self.inner.nodes().len()
    }

    /// Stores a weak reference to `value`. Returns the live value it
    /// replaced.
    pub fn insert(&self, id: Id, value: Arc<T>) -> Option<Arc<T>> {
        let previous = self.inner.update(id, |_| Some(value.clone()));
        self.tick();
        previous
    }

    /// Returns the live value at `id`, or stores the one built by `create`.
    ///
    /// `create` runs at most once and only when no live value exists.
    /// Returns `None` if it had to run and produced nothing.
    pub fn get_or_insert_with<F>(&self, id: Id, create: F) -> Option<Arc<T>>
    where
        F: FnOnce() -> Option<Arc<T>>,
    {
        let mut create = Some(create);
        let mut fresh: Option<Arc<T>> = None;
        loop {
            let current = self.inner.node(id);
            if let Some(live) = current.as_ref().and_then(Weak::upgrade) {
                return Some(live);
            }
            if fresh.is_none() {
                fresh = create.take().and_then(|create| create());
            }
            let strong = fresh.clone()?;
            let next = Some(Arc::downgrade(&strong));
            if self.inner.compare_and_set(id, current.as_ref(), next) {
                self.tick();
                return Some(strong);
            }
            self.counters.inc_retry();
        }
    }

    pub fn delete(&self, id: Id) -> Option<Arc<T>> {
        self.inner.delete(id)
    }

    /// Removes every node whose value has been dropped. Returns the number
    /// removed.
    pub fn sweep(&self) -> usize {
        let removed = self.inner.retain(|_, node| node.strong_count() > 0);
        self.counters.add_swept(removed as u64);
        tracing::debug!(removed, "swept dead weak entries");
        removed
    }

    fn tick(&self) {
        let cadence = self.cadence;
        let previous = self
            .countdown
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                Some(if left <= 1 { cadence } else { left - 1 })
            });
        if let Ok(left) = previous {
            if left <= 1 {
                self.sweep();
            }
        }
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn metrics(&self) -> StoreMetrics {
        let own = self.counters.snapshot();
        let inner = self.inner.metrics();
        StoreMetrics {
            retries: inner.retries + own.retries,
            swept: own.swept,
            ..inner
        }
    }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for WeaklyHeldStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeaklyHeldStore")
            .field("cadence", &self.cadence)
            .field("countdown", &self.countdown.load(Ordering::Relaxed))
            .finish()
    }
}
