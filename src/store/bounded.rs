//! Size- and idle-time-bounded node map.
//!
//! ## Architecture
//!
//! ```text
//!   Mutex<LruCache<Id, Slot<N>>>
//!            │
//!            ├── max_size:  pushing past capacity evicts the least
//!            │              recently used node
//!            └── expire_after_access: a node untouched for longer is
//!                           dropped the next time anything looks at it
//! ```
//!
//! Reads promote the node and refresh its access time. Expiry is lazy; no
//! background task runs. Bulk reads purge expired nodes first.
//!
//! The underlying `LruCache` is always built unbounded and grows with its
//! contents; `max_size` is enforced by popping after each push. An empty map
//! costs a few words no matter how large `max_size` is.
//!
//! The whole map sits behind one `parking_lot::Mutex`. That lock is the
//! backend's "shard lock": compare-and-set holds it only for the comparison
//! and the swap.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::model::Id;
use crate::store::traits::{Node, NodeMap, StoreCounters, StoreMetrics};

#[derive(Debug)]
struct Slot<N> {
    node: N,
    touched: Instant,
}

/// LRU node map with an optional capacity and idle expiry.
#[derive(Debug)]
pub struct BoundedNodes<N> {
    cache: Mutex<LruCache<Id, Slot<N>>>,
    max_size: Option<NonZeroUsize>,
    expire_after_access: Option<Duration>,
    counters: StoreCounters,
}

impl<N: Node> BoundedNodes<N> {
    /// Creates a map holding at most `max_size` nodes (unlimited when
    /// `None`), dropping nodes idle for longer than `expire_after_access`.
    pub fn new(max_size: Option<NonZeroUsize>, expire_after_access: Option<Duration>) -> Self {
        Self {
            cache: Mutex::new(LruCache::unbounded()),
            max_size,
            expire_after_access,
            counters: StoreCounters::default(),
        }
    }

    /// Most nodes the map keeps; `usize::MAX` when unlimited.
    pub fn capacity(&self) -> usize {
        self.max_size.map_or(usize::MAX, NonZeroUsize::get)
    }

    fn is_expired(&self, slot: &Slot<N>, now: Instant) -> bool {
        self.expire_after_access
            .is_some_and(|ttl| now.saturating_duration_since(slot.touched) > ttl)
    }

    /// Drops `id` if it has expired. Returns whether it was dropped.
    fn expire_one(&self, cache: &mut LruCache<Id, Slot<N>>, id: Id, now: Instant) -> bool {
        let expired = cache.peek(&id).is_some_and(|slot| self.is_expired(slot, now));
        if expired {
            cache.pop(&id);
            self.counters.inc_expiration();
            tracing::trace!(%id, "expired idle node");
        }
        expired
    }

    fn purge_expired(&self, cache: &mut LruCache<Id, Slot<N>>) {
        if self.expire_after_access.is_none() {
            return;
        }
        let now = Instant::now();
        let stale: Vec<Id> = cache
            .iter()
            .filter(|(_, slot)| self.is_expired(slot, now))
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            cache.pop(&id);
            self.counters.inc_expiration();
        }
    }

    fn put(&self, cache: &mut LruCache<Id, Slot<N>>, id: Id, node: N, now: Instant) {
        cache.push(id, Slot { node, touched: now });
        let Some(max_size) = self.max_size else {
            return;
        };
        while cache.len() > max_size.get() {
            let Some((evicted, _)) = cache.pop_lru() else {
                break;
            };
            self.counters.inc_eviction();
            tracing::trace!(id = %evicted, "evicted least recently used node");
        }
    }
}

impl<N: Node> NodeMap<N> for BoundedNodes<N> {
    fn get(&self, id: Id) -> Option<N> {
        let mut cache = self.cache.lock();
        let now = Instant::now();
        if self.expire_one(&mut cache, id, now) {
            return None;
        }
        cache.get_mut(&id).map(|slot| {
            slot.touched = now;
            slot.node.clone()
        })
    }

    fn compare_and_set(&self, id: Id, expected: Option<&N>, new: Option<N>) -> bool {
        let mut cache = self.cache.lock();
        let now = Instant::now();
        self.expire_one(&mut cache, id, now);
        let matches = match (cache.peek(&id), expected) {
            (None, None) => true,
            (Some(slot), Some(expected)) => slot.node.same(expected),
            _ => false,
        };
        if !matches {
            return false;
        }
        match (new, expected.is_some()) {
            (Some(node), existed) => {
                self.put(&mut cache, id, node, now);
                if existed {
                    self.counters.inc_update();
                } else {
                    self.counters.inc_insert();
                }
            },
            (None, true) => {
                cache.pop(&id);
                self.counters.inc_remove();
            },
            (None, false) => {},
        }
        true
    }

    fn remove(&self, id: Id) -> Option<N> {
        let mut cache = self.cache.lock();
        let now = Instant::now();
        if self.expire_one(&mut cache, id, now) {
            return None;
        }
        let removed = cache.pop(&id).map(|slot| slot.node);
        if removed.is_some() {
            self.counters.inc_remove();
        }
        removed
    }

    fn ids(&self) -> Vec<Id> {
        let mut cache = self.cache.lock();
        self.purge_expired(&mut cache);
        cache.iter().map(|(id, _)| *id).collect()
    }

    fn nodes(&self) -> Vec<N> {
        let mut cache = self.cache.lock();
        self.purge_expired(&mut cache);
        cache.iter().map(|(_, slot)| slot.node.clone()).collect()
    }

    fn len(&self) -> usize {
        let mut cache = self.cache.lock();
        self.purge_expired(&mut cache);
        cache.len()
    }

    fn retain(&self, keep: &mut dyn FnMut(Id, &N) -> bool) -> usize {
        let mut cache = self.cache.lock();
        let doomed: Vec<Id> = cache
            .iter()
            .filter(|(id, slot)| !keep(**id, &slot.node))
            .map(|(id, _)| *id)
            .collect();
        for id in &doomed {
            cache.pop(id);
            self.counters.inc_remove();
        }
        doomed.len()
    }

    fn clear(&self) {
        let mut cache = self.cache.lock();
        self.counters.add_removes(cache.len() as u64);
        cache.clear();
    }

    fn metrics(&self) -> StoreMetrics {
        self.counters.snapshot()
    }
}
