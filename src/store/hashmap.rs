//! Unbounded concurrent map backend.
//!
//! ## Architecture
//! - Nodes live in a `DashMap<Id, N>` hashed with `FxHasher`.
//! - Compare-and-set runs inside the map's entry API, so it holds one shard
//!   write lock for the duration of the comparison and the swap.
//! - Reads clone the node out; nodes are cheap `Arc`-backed handles.
//!
//! ## Thread Safety
//! - `Send + Sync`. Writers to different shards never contend.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxBuildHasher;

use crate::model::Id;
use crate::store::traits::{Node, NodeMap, StoreCounters, StoreMetrics};

/// Unbounded `DashMap`-backed node map.
#[derive(Debug)]
pub struct HashMapNodes<N> {
    map: DashMap<Id, N, FxBuildHasher>,
    counters: StoreCounters,
}

impl<N> HashMapNodes<N> {
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(FxBuildHasher),
            counters: StoreCounters::default(),
        }
    }
}

impl<N> Default for HashMapNodes<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Node> NodeMap<N> for HashMapNodes<N> {
    fn get(&self, id: Id) -> Option<N> {
        self.map.get(&id).map(|entry| entry.value().clone())
    }

    fn compare_and_set(&self, id: Id, expected: Option<&N>, new: Option<N>) -> bool {
        match self.map.entry(id) {
            Entry::Occupied(mut entry) => {
                match expected {
                    Some(expected) if entry.get().same(expected) => {},
                    _ => return false,
                }
                match new {
                    Some(node) => {
                        entry.insert(node);
                        self.counters.inc_update();
                    },
                    None => {
                        entry.remove();
                        self.counters.inc_remove();
                    },
                }
                true
            },
            Entry::Vacant(entry) => {
                if expected.is_some() {
                    return false;
                }
                if let Some(node) = new {
                    entry.insert(node);
                    self.counters.inc_insert();
                }
                true
            },
        }
    }

    fn remove(&self, id: Id) -> Option<N> {
        let removed = self.map.remove(&id).map(|(_, node)| node);
        if removed.is_some() {
            self.counters.inc_remove();
        }
        removed
    }

    fn ids(&self) -> Vec<Id> {
        self.map.iter().map(|entry| *entry.key()).collect()
    }

    fn nodes(&self) -> Vec<N> {
        self.map.iter().map(|entry| entry.value().clone()).collect()
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn retain(&self, keep: &mut dyn FnMut(Id, &N) -> bool) -> usize {
        let mut removed = 0;
        self.map.retain(|id, node| {
            let kept = keep(*id, node);
            if !kept {
                removed += 1;
            }
            kept
        });
        self.counters.add_removes(removed as u64);
        removed
    }

    fn clear(&self) {
        let mut removed = 0u64;
        self.map.retain(|_, _| {
            removed += 1;
            false
        });
        self.counters.add_removes(removed);
    }

    fn metrics(&self) -> StoreMetrics {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn compare_and_set_respects_expected_node() {
        let map: HashMapNodes<Arc<String>> = HashMapNodes::new();
        let id = Id::new(1);
        let first = Arc::new("a".to_string());

        assert!(map.compare_and_set(id, None, Some(first.clone())));
        // Absent expected no longer matches.
        assert!(!map.compare_and_set(id, None, Some(Arc::new("b".into()))));
        // Equal contents but a different allocation is not the same node.
        assert!(!map.compare_and_set(id, Some(&Arc::new("a".into())), None));
        assert!(map.compare_and_set(id, Some(&first), None));
        assert!(map.get(id).is_none());
    }

    #[test]
    fn vacant_remove_is_a_successful_noop() {
        let map: HashMapNodes<Arc<u32>> = HashMapNodes::new();
        assert!(map.compare_and_set(Id::new(9), None, None));
        assert!(map.is_empty());
    }

    #[test]
    fn metrics_counts() {
        let map: HashMapNodes<Arc<u32>> = HashMapNodes::new();
        let id = Id::new(3);
        let one = Arc::new(1);
        assert!(map.compare_and_set(id, None, Some(one.clone())));
        assert!(map.compare_and_set(id, Some(&one), Some(Arc::new(2))));
        assert!(map.remove(id).is_some());
        let m = map.metrics();
        assert_eq!((m.inserts, m.updates, m.removes), (1, 1, 1));
    }

    #[test]
    fn retain_reports_removed() {
        let map: HashMapNodes<Arc<u64>> = HashMapNodes::new();
        for i in 0..10u64 {
            assert!(map.compare_and_set(Id::new(i), None, Some(Arc::new(i))));
        }
        let removed = map.retain(&mut |_, v| **v % 2 == 0);
        assert_eq!(removed, 5);
        assert_eq!(map.len(), 5);
        assert_eq!(map.metrics().removes, 5);
        map.clear();
        assert_eq!(map.metrics().removes, 10);
        let mut ids = map.ids();
        ids.sort();
        assert_eq!(ids[0], Id::new(0));
    }
}
