//! Backend selection for each entity kind.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::store::bounded::BoundedNodes;
use crate::store::hashmap::HashMapNodes;
use crate::store::noop::NoopNodes;
use crate::store::traits::{Node, NodeMap};

/// How a store keeps its nodes.
///
/// Deserializes from a table tagged by `kind`:
///
/// ```toml
/// [messages]
/// kind = "bounded"
/// max_size = 500
/// expire_after_access_secs = 3600
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageBackend {
    /// Keep everything until deleted.
    #[default]
    Unbounded,
    /// Keep nothing.
    Disabled,
    /// Keep at most `max_size` nodes, and drop nodes not accessed for
    /// `expire_after_access_secs`.
    Bounded {
        #[serde(default)]
        max_size: Option<usize>,
        #[serde(default)]
        expire_after_access_secs: Option<u64>,
    },
}

impl StorageBackend {
    /// A size-bounded backend without expiry.
    pub fn bounded(max_size: usize) -> Self {
        Self::Bounded {
            max_size: Some(max_size),
            expire_after_access_secs: None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    pub fn max_size(&self) -> Option<usize> {
        match self {
            Self::Bounded { max_size, .. } => *max_size,
            _ => None,
        }
    }

    pub fn expire_after_access(&self) -> Option<Duration> {
        match self {
            Self::Bounded {
                expire_after_access_secs,
                ..
            } => expire_after_access_secs.map(Duration::from_secs),
            _ => None,
        }
    }

    pub(crate) fn validate(&self, key: &'static str) -> Result<(), ConfigError> {
        match self {
            Self::Bounded {
                max_size: Some(0), ..
            } => Err(ConfigError::invalid(key, "max_size must be greater than zero")),
            Self::Bounded {
                expire_after_access_secs: Some(0),
                ..
            } => Err(ConfigError::invalid(
                key,
                "expire_after_access_secs must be greater than zero",
            )),
            _ => Ok(()),
        }
    }

    /// Creates an empty node map of this kind.
    pub fn build<N: Node>(&self) -> Box<dyn NodeMap<N>> {
        match self {
            Self::Unbounded => Box::new(HashMapNodes::new()),
            Self::Disabled => Box::new(NoopNodes::new()),
            Self::Bounded { max_size, .. } => Box::new(BoundedNodes::new(
                max_size.and_then(NonZeroUsize::new),
                self.expire_after_access(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::Id;

    #[test]
    fn decodes_tagged_tables() {
        let unbounded: StorageBackend = serde_json::from_str(r#"{"kind":"unbounded"}"#).unwrap();
        let bounded: StorageBackend =
            serde_json::from_str(r#"{"kind":"bounded","max_size":10}"#).unwrap();
        assert_eq!(unbounded, StorageBackend::Unbounded);
        assert_eq!(bounded, StorageBackend::bounded(10));
        assert!(serde_json::from_str::<StorageBackend>(r#"{"kind":"weird"}"#).is_err());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        assert!(StorageBackend::bounded(0).validate("roles").is_err());
        assert!(
            StorageBackend::Bounded {
                max_size: None,
                expire_after_access_secs: Some(0)
            }
            .validate("roles")
            .is_err()
        );
        assert!(StorageBackend::bounded(1).validate("roles").is_ok());
    }

    #[test]
    fn disabled_backend_keeps_nothing() {
        let map = StorageBackend::Disabled.build::<Arc<u8>>();
        assert!(map.compare_and_set(Id::new(1), None, Some(Arc::new(1))));
        assert!(map.get(Id::new(1)).is_none());
        assert!(StorageBackend::Disabled.is_disabled());
    }

    #[test]
    fn bounded_backend_exposes_limits() {
        let backend = StorageBackend::Bounded {
            max_size: Some(3),
            expire_after_access_secs: Some(60),
        };
        assert_eq!(backend.max_size(), Some(3));
        assert_eq!(backend.expire_after_access(), Some(Duration::from_secs(60)));
        let map = backend.build::<Arc<u8>>();
        for i in 0..5 {
            assert!(map.compare_and_set(Id::new(i), None, Some(Arc::new(i as u8))));
        }
        assert_eq!(map.len(), 3);
    }
}
