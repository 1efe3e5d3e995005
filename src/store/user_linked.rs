//! Stores for entities that reference a shared user instead of owning one.
//!
//! ## Architecture
//!
//! ```text
//!   UserLinkedStore<E>                       users: WeaklyHeldStore<UserRef>
//!   ┌───────────────────────────────┐        ┌──────────────────────────┐
//!   │ id ─▶ LinkedNode {            │        │ user id ─▶ Weak<UserRef> │
//!   │         entity: Arc<E>,  (user stub)   └─────────────▲────────────┘
//!   │         user: Arc<UserRef> ───────────────────────────┘
//!   │       }                       │
//!   └───────────────────────────────┘
//! ```
//!
//! On every write the embedded user fields are merged into the shared
//! [`UserRef`] (creating it when missing), then the entity is stored with its
//! user stripped down to an id. Reads re-attach the current shared user, so
//! every holder of the same user id observes the same user fields.
//!
//! An entity whose user cannot be resolved (no slot exists and the entity
//! carries too little to create one) is stored unlinked and stays invisible
//! to reads until a later write links it.

use std::sync::Arc;

use crate::model::{Id, Merge, PartialUser, User, UserRef};
use crate::store::backend::StorageBackend;
use crate::store::keyed::KeyedStore;
use crate::store::traits::{Node, StoreMetrics};
use crate::store::weak::WeaklyHeldStore;

/// Entities that embed a user by reference.
pub trait UserLinked: Clone + Send + Sync + 'static {
    fn user_id(&self) -> Id;

    /// The user fields this entity carries, for merging into the shared user.
    fn user_patch(&self) -> PartialUser;

    /// A full user to seed the shared slot with, if the entity has one.
    fn initial_user(&self) -> Option<User>;

    /// A copy with the embedded user reduced to its id.
    fn detached(&self) -> Self;

    /// A copy with `user` embedded.
    fn attached(&self, user: &User) -> Self;
}

/// Node of a [`UserLinkedStore`].
#[derive(Debug)]
pub struct LinkedNode<E> {
    entity: Arc<E>,
    user: Option<Arc<UserRef>>,
}

impl<E> Clone for LinkedNode<E> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity.clone(),
            user: self.user.clone(),
        }
    }
}

impl<E> LinkedNode<E> {
    pub fn user_ref(&self) -> Option<&Arc<UserRef>> {
        self.user.as_ref()
    }

    pub fn is_linked(&self) -> bool {
        self.user.is_some()
    }

    /// The stored entity with its user stub.
    pub fn detached(&self) -> &E {
        &self.entity
    }
}

impl<E: UserLinked> Node for LinkedNode<E> {
    type Value = E;

    fn unwrap(&self) -> Option<E> {
        let user = self.user.as_ref()?;
        Some(self.entity.attached(&user.load()))
    }

    fn rewrap(current: Option<&Self>, value: Option<E>) -> Option<Self> {
        value.map(|entity| LinkedNode {
            entity: Arc::new(entity.detached()),
            user: current.and_then(|c| c.user.clone()),
        })
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entity, &other.entity)
    }

    fn has_value(&self) -> bool {
        self.user.is_some()
    }
}

pub struct UserLinkedStore<E: UserLinked> {
    nodes: KeyedStore<LinkedNode<E>>,
    users: Arc<WeaklyHeldStore<UserRef>>,
}

impl<E: UserLinked> UserLinkedStore<E> {
    pub fn new(backend: &StorageBackend, users: Arc<WeaklyHeldStore<UserRef>>) -> Self {
        Self {
            nodes: KeyedStore::new(backend),
            users,
        }
    }

    /// Resolves the shared slot for `entity`'s user and merges the entity's
    /// user fields into it. Idempotent, so safe to repeat on retry.
    fn link(&self, entity: &E) -> Option<Arc<UserRef>> {
        let mut created: Option<Arc<UserRef>> = None;
        let slot = self.users.get_or_insert_with(entity.user_id(), || {
            let fresh = Arc::new(UserRef::new(entity.initial_user()?));
            created = Some(fresh.clone());
            Some(fresh)
        })?;
        if !created.is_some_and(|fresh| Arc::ptr_eq(&fresh, &slot)) {
            slot.merge(&entity.user_patch());
        }
        Some(slot)
    }

    /// Atomically replaces the entity at `id` with `f(previous)`, linking
    /// the result to the shared user table. Returns the previous entity.
    pub fn update<F>(&self, id: Id, mut f: F) -> Option<E>
    where
        F: FnMut(Option<E>) -> Option<E>,
    {
        loop {
            let current = self.nodes.node(id);
            let previous = current.as_ref().and_then(Node::unwrap);
            let next = f(previous.clone()).map(|entity| {
                let user = self
                    .link(&entity)
                    .or_else(|| current.as_ref().and_then(|c| c.user.clone()));
                if user.is_none() {
                    tracing::trace!(
                        %id,
                        user_id = %entity.user_id(),
                        "storing entity without user link"
                    );
                }
                LinkedNode {
                    entity: Arc::new(entity.detached()),
                    user,
                }
            });
            if self.nodes.compare_and_set(id, current.as_ref(), next) {
                return previous;
            }
        }
    }

    /// Like [`update`](UserLinkedStore::update), but does nothing when `id`
    /// holds no linked entity. The user link is kept as is: `f` sees the
    /// entity with a snapshot of its user, and writing that snapshot back
    /// could undo a concurrent user update.
    pub fn update_if_present<F>(&self, id: Id, mut f: F) -> Option<E>
    where
        F: FnMut(E) -> Option<E>,
    {
        loop {
            let current = self.nodes.node(id)?;
            let previous = current.unwrap()?;
            let next = f(previous.clone()).map(|entity| LinkedNode {
                entity: Arc::new(entity.detached()),
                user: current.user.clone(),
            });
            if self.nodes.compare_and_set(id, Some(&current), next) {
                return Some(previous);
            }
        }
    }

    /// Merges `update` into the linked entity at `id`, if any. Only the
    /// user fields `update` itself carries reach the shared user.
    pub fn merge_if_present(&self, id: Id, update: &E) -> Option<E>
    where
        E: Merge,
    {
        loop {
            let current = self.nodes.node(id)?;
            let previous = current.unwrap()?;
            let user = self.link(update).or_else(|| current.user.clone());
            let next = LinkedNode {
                entity: Arc::new(previous.merge(update).detached()),
                user,
            };
            if self.nodes.compare_and_set(id, Some(&current), Some(next)) {
                return Some(previous);
            }
        }
    }

    /// Stores `entity` under its user id. Returns the entity it replaced.
    pub fn insert(&self, entity: E) -> Option<E> {
        let id = entity.user_id();
        self.update(id, |_| Some(entity.clone()))
    }

    pub fn find(&self, id: Id) -> Option<E> {
        self.nodes.find(id)
    }

    pub fn find_all(&self) -> Vec<E> {
        self.nodes.find_all()
    }

    /// Number of linked entities.
    pub fn count(&self) -> usize {
        self.nodes.count()
    }

    pub fn ids(&self) -> Vec<Id> {
        self.nodes.ids()
    }

    pub fn delete(&self, id: Id) -> Option<E> {
        self.nodes.delete(id)
    }

    pub fn node(&self, id: Id) -> Option<LinkedNode<E>> {
        self.nodes.node(id)
    }

    /// The shared user slot the entity at `id` points to.
    pub fn user_ref(&self, id: Id) -> Option<Arc<UserRef>> {
        self.nodes.node(id).and_then(|node| node.user)
    }

    pub fn clear(&self) {
        self.nodes.clear();
    }

    pub fn metrics(&self) -> StoreMetrics {
        self.nodes.metrics()
    }
}

impl<E: UserLinked> std::fmt::Debug for UserLinkedStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLinkedStore")
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}
