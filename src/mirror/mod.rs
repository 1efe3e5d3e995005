//! # State Mirror
//!
//! [`StateMirror`] owns every store and exposes them through two facets:
//! [`DataAccessor`] for queries and [`GatewayDataUpdater`] for dispatches.
//!
//! ## Architecture
//!
//! ```text
//!   StateMirror
//!   ├── users:    WeaklyHeldStore<UserRef>      shared by members, presences
//!   │                                           and the self-user slot
//!   ├── channels: ChannelStore                  global, channels and threads
//!   │             └── ChannelNode
//!   │                 ├── Channel
//!   │                 └── ChannelContent        nothing allocated until used
//!   │                     ├── MessageStore      bounded per channel
//!   │                     │   └── StoredMessage fields + reaction map
//!   │                     ├── thread members    keyed by user id
//!   │                     └── stage instance
//!   ├── guilds:   GuildStore                    composed with `channels`
//!   │             └── GuildNode
//!   │                 ├── Guild                 nested lists hold ids only
//!   │                 └── GuildContent
//!   │                     ├── roles, emojis, stickers, voice_states
//!   │                     ├── members, presences  (linked to `users`)
//!   │                     ├── scheduled_events  each with its user set
//!   │                     ├── channel_ids, thread_ids
//!   │                     └── member_list_complete
//!   ├── self_user:   OnceCell<Arc<UserRef>>     set by the first ready
//!   └── shard_count: AtomicU32                  CAS from 0 on ready
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use mirrorkit::mirror::StateMirror;
//! use mirrorkit::model::{Channel, Id};
//!
//! let mirror = StateMirror::default();
//! let channel: Channel = serde_json::from_str(r#"{"id": "10", "type": 1}"#).unwrap();
//! mirror.gateway_data_updater().on_channel_create(0, channel);
//!
//! let reader = mirror.data_accessor();
//! assert_eq!(reader.count_channels(), 1);
//! assert!(reader.get_channel_by_id(Id::new(10)).is_some());
//! ```

pub mod access;
pub mod channels;
pub mod guilds;
pub mod node;
pub mod update;

use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use dashmap::DashSet;
use once_cell::sync::OnceCell;
use rustc_hash::FxBuildHasher;

pub use access::DataAccessor;
pub use channels::ChannelStore;
pub use guilds::GuildStore;
pub use node::{
    ChannelBackends, ChannelContent, ChannelNode, GuildContent, GuildNode, MessageNode,
    MessageStore, ScheduledEventNode, ThreadMemberStore,
};
pub use update::{GatewayDataUpdater, PresenceAndUser};

use crate::config::StoreConfig;
use crate::model::UserRef;
use crate::store::{StoreMetrics, WeaklyHeldStore};

/// In-process mirror of the gateway state.
pub struct StateMirror {
    config: StoreConfig,
    users: Arc<WeaklyHeldStore<UserRef>>,
    channels: Arc<ChannelStore>,
    guilds: GuildStore,
    self_user: OnceCell<Arc<UserRef>>,
    shard_count: AtomicU32,
    connected_shards: DashSet<u32, FxBuildHasher>,
}

impl StateMirror {
    pub fn new(config: StoreConfig) -> Self {
        let users = Arc::new(WeaklyHeldStore::new(
            &config.users,
            config.user_sweep_interval,
        ));
        let channels = Arc::new(ChannelStore::new(&config));
        let guilds = GuildStore::new(&config, users.clone(), channels.clone());
        tracing::debug!(?config, "state mirror created");
        Self {
            config,
            users,
            channels,
            guilds,
            self_user: OnceCell::new(),
            shard_count: AtomicU32::new(0),
            connected_shards: DashSet::with_hasher(FxBuildHasher),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The query facet.
    pub fn data_accessor(&self) -> &dyn DataAccessor {
        self
    }

    /// The dispatch facet.
    pub fn gateway_data_updater(&self) -> &dyn GatewayDataUpdater {
        self
    }

    /// The shared user table.
    pub fn users(&self) -> &WeaklyHeldStore<UserRef> {
        &self.users
    }

    pub fn channels(&self) -> &ChannelStore {
        &self.channels
    }

    pub fn guilds(&self) -> &GuildStore {
        &self.guilds
    }

    /// Indices of shards that sent ready and were not invalidated since.
    pub fn connected_shards(&self) -> Vec<u32> {
        let mut shards: Vec<u32> = self.connected_shards.iter().map(|shard| *shard).collect();
        shards.sort_unstable();
        shards
    }

    /// Counters summed over every store.
    pub fn metrics(&self) -> StoreMetrics {
        self.users.metrics() + self.channels.metrics() + self.guilds.metrics()
    }
}

impl Default for StateMirror {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl std::fmt::Debug for StateMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMirror")
            .field("users", &self.users.count())
            .field("channels", &self.channels.count())
            .field("guilds", &self.guilds.count())
            .field("shard_count", &self.shard_count)
            .finish()
    }
}
