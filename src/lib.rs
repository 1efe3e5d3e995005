//! mirrorkit: an in-process, concurrently updated mirror of gateway state.
//!
//! Dispatches go in through [`GatewayDataUpdater`], queries come out of
//! [`DataAccessor`]. Both are implemented by [`StateMirror`].
//!
//! See `DESIGN.md` for the store layering and its consistency model.

pub mod config;
pub mod dispatch;
pub mod ds;
pub mod error;
pub mod mirror;
pub mod model;
pub mod prelude;
pub mod store;

pub use crate::config::StoreConfig;
pub use crate::ds::ShardSelector;
pub use crate::error::{ConfigError, IdError, StoreError};
pub use crate::mirror::{DataAccessor, GatewayDataUpdater, PresenceAndUser, StateMirror};
pub use crate::store::{StorageBackend, StoreMetrics};
