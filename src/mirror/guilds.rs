use std::sync::Arc;

use crate::config::StoreConfig;
use crate::ds::ShardSelector;
use crate::mirror::channels::ChannelStore;
use crate::mirror::node::{GuildContent, GuildNode};
use crate::model::guild::push_unique;
use crate::model::{Guild, Id, UserRef};
use crate::store::{KeyedStore, StoreMetrics, WeaklyHeldStore};

/// Guild table composed with the global channel table.
///
/// Deleting a guild invalidates its channels first and removes the guild
/// node after. The two steps are independent, so a reader may see a guild
/// whose channels are already gone.
#[derive(Debug)]
pub struct GuildStore {
    guilds: KeyedStore<GuildNode>,
    channels: Arc<ChannelStore>,
}

impl GuildStore {
    pub fn new(
        config: &StoreConfig,
        users: Arc<WeaklyHeldStore<UserRef>>,
        channels: Arc<ChannelStore>,
    ) -> Self {
        let nested = config.clone();
        Self {
            guilds: KeyedStore::with_empty_node(&config.guilds, move || {
                GuildNode::empty(GuildContent::new(&nested, users.clone()))
            }),
            channels,
        }
    }

    /// The node of `guild_id`, created empty on demand.
    pub fn node_for(&self, guild_id: Id) -> GuildNode {
        self.guilds.for_id(guild_id)
    }

    /// The node of `guild_id`, empty or not.
    pub fn node(&self, guild_id: Id) -> Option<GuildNode> {
        self.guilds.node(guild_id)
    }

    pub fn nodes(&self) -> Vec<GuildNode> {
        self.guilds.nodes()
    }

    pub fn find(&self, guild_id: Id) -> Option<Guild> {
        self.guilds.find(guild_id)
    }

    pub fn find_all(&self) -> Vec<Guild> {
        self.guilds.find_all()
    }

    /// Number of guilds holding a value.
    pub fn count(&self) -> usize {
        self.guilds.count()
    }

    /// Stores `guild`, keeping the node's nested stores. Returns the
    /// previous value.
    pub fn insert(&self, guild: Guild) -> Option<Guild> {
        self.guilds.insert(guild)
    }

    pub fn update_if_present<F>(&self, guild_id: Id, f: F) -> Option<Guild>
    where
        F: FnMut(Guild) -> Option<Guild>,
    {
        self.guilds.update_if_present(guild_id, f)
    }

    /// Removes the guild, invalidating every channel and thread it owns
    /// first.
    ///
    /// Owned channels are the union of the node's channel and thread id sets
    /// and the guild value's `channels` list. Returns the removed guild value.
    pub fn delete(&self, guild_id: Id) -> Option<Guild> {
        let node = self.guilds.node(guild_id)?;
        let mut owned = node.content().channel_ids();
        for thread_id in node.content().thread_ids() {
            push_unique(&mut owned, thread_id);
        }
        if let Some(guild) = node.data() {
            for channel_id in &guild.channels {
                push_unique(&mut owned, *channel_id);
            }
        }
        for channel_id in &owned {
            self.channels.invalidate(*channel_id);
        }
        let removed = self.guilds.delete_node(guild_id)?;
        tracing::debug!(guild_id = %guild_id, channels = owned.len(), "deleted guild");
        removed.data().cloned()
    }

    /// Deletes every guild owned by shard `index` out of `count`. Returns
    /// the removed guild values.
    pub fn invalidate_shard(&self, index: u32, count: u32) -> Vec<Guild> {
        let selector = ShardSelector::new(count);
        let removed: Vec<Guild> = self
            .guilds
            .ids()
            .into_iter()
            .filter(|id| selector.owns(index, *id))
            .filter_map(|id| self.delete(id))
            .collect();
        tracing::info!(
            shard = index,
            shards = selector.shard_count(),
            removed = removed.len(),
            "invalidated shard"
        );
        removed
    }

    pub fn metrics(&self) -> StoreMetrics {
        let nested: StoreMetrics = self
            .guilds
            .nodes()
            .iter()
            .map(|node| node.content().metrics())
            .sum();
        self.guilds.metrics() + nested
    }
}
