//! Generic id-keyed store with lock-free per-key updates.
//!
//! ## Architecture
//!
//! ```text
//!   KeyedStore<N: Node>
//!   ├── map: Box<dyn NodeMap<N>>     (unbounded / bounded / disabled)
//!   └── empty: Option<factory>       (lazily created nodes, `for_id`)
//!
//!   update(id, f):
//!     loop {
//!       current  = map.get(id)
//!       previous = current.unwrap()
//!       next     = N::rewrap(current, f(previous))
//!       if map.compare_and_set(id, current, next) { return previous }
//!     }
//! ```
//!
//! ## Key Concepts
//!
//! - **Per-key atomicity**: every mutation is one compare-and-set on a single
//!   key. There is no lock held across calls to the update function.
//! - **Retries**: a lost compare-and-set re-runs the update function against
//!   the fresh value. Update functions must not have side effects outside
//!   their return value.
//! - **Lazy nodes**: stores built with an empty-node factory hand out empty
//!   nodes from [`for_id`](KeyedStore::for_id). Such nodes do not count
//!   towards [`count`](KeyedStore::count) until they hold a value.
//!
//! ## Example Usage
//!
//! ```
//! use mirrorkit::model::{Id, Role};
//! use mirrorkit::store::{IdentityStore, StorageBackend};
//!
//! let roles: IdentityStore<Role> = IdentityStore::new(&StorageBackend::Unbounded);
//! let role: Role = serde_json::from_str(r#"{"id":"1","name":"mods"}"#).unwrap();
//! assert!(roles.insert(role).is_none());
//!
//! let previous = roles.update(Id::new(1), |role| {
//!     role.map(|mut role| {
//!         role.name = "moderators".into();
//!         role
//!     })
//! });
//! assert_eq!(previous.unwrap().name, "mods");
//! assert_eq!(roles.find(Id::new(1)).unwrap().name, "moderators");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::model::Id;
use crate::store::backend::StorageBackend;
use crate::store::traits::{Keyed, Node, NodeMap, StoreCounters, StoreMetrics};

type EmptyNode<N> = Box<dyn Fn() -> N + Send + Sync>;

/// An id → node store built on a swappable [`NodeMap`].
pub struct KeyedStore<N: Node> {
    map: Box<dyn NodeMap<N>>,
    empty: Option<EmptyNode<N>>,
    counters: StoreCounters,
}

/// A store whose node is the value itself.
pub type IdentityStore<T> = KeyedStore<Arc<T>>;

impl<T> Node for Arc<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Value = T;

    fn unwrap(&self) -> Option<T> {
        Some(T::clone(self))
    }

    fn rewrap(_current: Option<&Self>, value: Option<T>) -> Option<Self> {
        value.map(Arc::new)
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }

    fn has_value(&self) -> bool {
        true
    }
}

impl<N: Node> KeyedStore<N> {
    /// Creates a store on `backend` without an empty-node factory.
    pub fn new(backend: &StorageBackend) -> Self {
        Self {
            map: backend.build(),
            empty: None,
            counters: StoreCounters::default(),
        }
    }

    /// A store that can create empty nodes on demand.
    pub fn with_empty_node<F>(backend: &StorageBackend, empty: F) -> Self
    where
        F: Fn() -> N + Send + Sync + 'static,
    {
        Self {
            map: backend.build(),
            empty: Some(Box::new(empty)),
            counters: StoreCounters::default(),
        }
    }

    /// Returns the node for `id`, creating an empty one if there is none.
    ///
    /// # Panics
    ///
    /// Panics if the store was built without an empty-node factory.
    pub fn for_id(&self, id: Id) -> N {
        let Some(empty) = self.empty.as_ref() else {
            panic!("for_id({id}) called on a store without empty nodes");
        };
        loop {
            if let Some(node) = self.map.get(id) {
                return node;
            }
            let fresh = empty();
            if self.map.compare_and_set(id, None, Some(fresh.clone())) {
                return fresh;
            }
            self.counters.inc_retry();
        }
    }

    /// Returns the raw node for `id`, empty or not.
    pub fn node(&self, id: Id) -> Option<N> {
        self.map.get(id)
    }

    /// Every node, including empty ones, cloned at call time.
    pub fn nodes(&self) -> Vec<N> {
        self.map.nodes()
    }

    /// Ids of every node, including empty ones.
    pub fn ids(&self) -> Vec<Id> {
        self.map.ids()
    }

    /// The value at `id`; `None` when the node is missing or empty.
    pub fn find(&self, id: Id) -> Option<N::Value> {
        self.map.get(id).and_then(|node| node.unwrap())
    }

    /// Returns every present value, materialized at call time.
    pub fn find_all(&self) -> Vec<N::Value> {
        self.map
            .nodes()
            .iter()
            .filter_map(|node| node.unwrap())
            .collect()
    }

    /// Number of nodes holding a value.
    pub fn count(&self) -> usize {
        self.map
            .nodes()
            .iter()
            .filter(|node| node.has_value())
            .count()
    }

    /// Stores `value` under its own key. Returns the value it replaced.
    pub fn insert(&self, value: N::Value) -> Option<N::Value>
    where
        N::Value: Keyed,
    {
        let id = value.key();
        self.update(id, |_| Some(value.clone()))
    }

    /// Atomically replaces the value at `id` with `f(previous)`. Returns the
    /// previous value.
    ///
    /// `f` may run more than once when other writers race on the same id.
    pub fn update<F>(&self, id: Id, f: F) -> Option<N::Value>
    where
        F: FnMut(Option<N::Value>) -> Option<N::Value>,
    {
        self.modify(id, false, f)
    }

    /// Like [`update`](KeyedStore::update), but does nothing when `id` holds
    /// no value.
    pub fn update_if_present<F>(&self, id: Id, mut f: F) -> Option<N::Value>
    where
        F: FnMut(N::Value) -> Option<N::Value>,
    {
        self.modify(id, true, |previous| previous.and_then(&mut f))
    }

    fn modify<F>(&self, id: Id, only_present: bool, mut f: F) -> Option<N::Value>
    where
        F: FnMut(Option<N::Value>) -> Option<N::Value>,
    {
        loop {
            let current = self.map.get(id);
            let previous = current.as_ref().and_then(N::unwrap);
            if only_present && previous.is_none() {
                return None;
            }
            let value = f(previous.clone());
            // An empty base is only needed when a value lands on a missing id.
            let fresh = match (&current, &value) {
                (None, Some(_)) => self.empty.as_ref().map(|empty| empty()),
                _ => None,
            };
            let next = N::rewrap(current.as_ref().or(fresh.as_ref()), value);
            if self.map.compare_and_set(id, current.as_ref(), next) {
                return previous;
            }
            self.counters.inc_retry();
        }
    }

    /// Removes the node at `id`. Returns the value it held.
    pub fn delete(&self, id: Id) -> Option<N::Value> {
        self.map.remove(id).and_then(|node| node.unwrap())
    }

    /// Removes and returns the node at `id`.
    pub fn delete_node(&self, id: Id) -> Option<N> {
        self.map.remove(id)
    }

    /// Swaps the node at `id` for `new` if it is still `expected`. See
    /// [`NodeMap::compare_and_set`].
    pub fn compare_and_set(&self, id: Id, expected: Option<&N>, new: Option<N>) -> bool {
        self.map.compare_and_set(id, expected, new)
    }

    /// Keeps only the nodes for which `keep` returns `true`. Returns the
    /// number removed.
    pub fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(Id, &N) -> bool,
    {
        self.map.retain(&mut keep)
    }

    /// Removes every node.
    pub fn clear(&self) {
        self.map.clear();
    }

    /// Backend counters plus the retries this store lost.
    pub fn metrics(&self) -> StoreMetrics {
        let own = self.counters.snapshot();
        let map = self.map.metrics();
        StoreMetrics {
            retries: own.retries,
            ..map
        }
    }
}

impl<N: Node> fmt::Debug for KeyedStore<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedStore")
            .field("len", &self.map.len())
            .field("lazy", &self.empty.is_some())
            .finish()
    }
}
