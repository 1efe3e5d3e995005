//! Generic stores and their backends.
//!
//! ```text
//!   KeyedStore<N>            id → node, CAS-loop updates
//!   ├── IdentityStore<T>     node is Arc<T>
//!   ├── WeaklyHeldStore<T>   node is Weak<T>, amortized sweep
//!   └── UserLinkedStore<E>   node links E to a shared UserRef
//!
//!   NodeMap backends (chosen by StorageBackend):
//!   HashMapNodes | BoundedNodes | NoopNodes
//! ```

pub mod backend;
pub mod bounded;
pub mod hashmap;
pub mod keyed;
pub mod noop;
pub mod traits;
pub mod user_linked;
pub mod weak;

pub use backend::StorageBackend;
pub use keyed::{IdentityStore, KeyedStore};
pub use traits::{Keyed, Node, NodeMap, StoreMetrics};
pub use user_linked::{LinkedNode, UserLinked, UserLinkedStore};
pub use weak::{DEFAULT_SWEEP_INTERVAL, WeaklyHeldStore};
