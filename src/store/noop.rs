//! A node map that keeps nothing.
//!
//! Used for entity kinds whose storage is disabled. Every write "succeeds"
//! and is dropped, so update loops terminate on their first attempt.

use std::marker::PhantomData;

use crate::model::Id;
use crate::store::traits::{Node, NodeMap, StoreMetrics};

#[derive(Debug)]
pub struct NoopNodes<N> {
    _marker: PhantomData<fn() -> N>,
}

impl<N> NoopNodes<N> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<N> Default for NoopNodes<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Node> NodeMap<N> for NoopNodes<N> {
    fn get(&self, _id: Id) -> Option<N> {
        None
    }

    fn compare_and_set(&self, _id: Id, _expected: Option<&N>, _new: Option<N>) -> bool {
        true
    }

    fn remove(&self, _id: Id) -> Option<N> {
        None
    }

    fn ids(&self) -> Vec<Id> {
        Vec::new()
    }

    fn nodes(&self) -> Vec<N> {
        Vec::new()
    }

    fn len(&self) -> usize {
        0
    }

    fn retain(&self, _keep: &mut dyn FnMut(Id, &N) -> bool) -> usize {
        0
    }

    fn clear(&self) {}

    fn metrics(&self) -> StoreMetrics {
        StoreMetrics::default()
    }
}
