use std::sync::Arc;

use crate::config::StoreConfig;
use crate::mirror::node::{ChannelBackends, ChannelNode, MessageNode};
use crate::model::{Channel, Id, Merge, Message, Possible, ThreadMember};
use crate::store::{KeyedStore, StoreMetrics};

/// Global channel table. Threads live here too.
///
/// Each channel node owns a [`ChannelContent`](crate::mirror::ChannelContent)
/// whose message cache and thread member table are built on first use.
#[derive(Debug)]
pub struct ChannelStore {
    channels: KeyedStore<ChannelNode>,
}

impl ChannelStore {
    /// Creates the table on the configured channel backend. Nested stores
    /// use the message and thread member backends.
    pub fn new(config: &StoreConfig) -> Self {
        let backends = Arc::new(ChannelBackends::from_config(config));
        Self {
            channels: KeyedStore::with_empty_node(&config.channels, move || {
                ChannelNode::empty(backends.clone())
            }),
        }
    }

    /// The channel or thread with `id`.
    pub fn find(&self, id: Id) -> Option<Channel> {
        self.channels.find(id)
    }

    /// Every stored channel and thread.
    pub fn find_all(&self) -> Vec<Channel> {
        self.channels.find_all()
    }

    /// Number of channels and threads holding a value.
    pub fn count(&self) -> usize {
        self.channels.count()
    }

    /// Stores `channel`, replacing any previous value. Returns the previous
    /// value.
    pub fn insert(&self, channel: Channel) -> Option<Channel> {
        self.channels.insert(channel)
    }

    /// Merges `channel` into the stored value; inserts it when absent.
    pub fn merge(&self, channel: &Channel) -> Option<Channel> {
        self.channels.update(channel.id, |previous| {
            Some(match previous {
                Some(previous) => previous.merge(channel),
                None => channel.clone(),
            })
        })
    }

    /// Removes the channel with everything it owns. Returns the channel.
    pub fn invalidate(&self, id: Id) -> Option<Channel> {
        let node = self.channels.delete_node(id)?;
        let dropped = node.content().clear();
        if dropped > 0 {
            tracing::trace!(channel_id = %id, dropped, "dropped channel message cache");
        }
        node.data().cloned()
    }

    /// The node of `channel_id`, created empty on demand.
    pub fn node_for(&self, channel_id: Id) -> ChannelNode {
        self.channels.for_id(channel_id)
    }

    /// The node of `channel_id`, empty or not.
    pub fn node(&self, channel_id: Id) -> Option<ChannelNode> {
        self.channels.node(channel_id)
    }

    /// A cached message; `None` when the channel has no message cache yet.
    pub fn find_message(&self, channel_id: Id, message_id: Id) -> Option<Message> {
        self.node(channel_id)?
            .content()
            .messages()?
            .find(message_id)
    }

    /// The stored message behind `message_id`, for in-place reaction and
    /// edit updates.
    pub fn message_node(&self, channel_id: Id, message_id: Id) -> Option<MessageNode> {
        self.node(channel_id)?
            .content()
            .messages()?
            .node(message_id)
    }

    /// Every cached message of one channel.
    pub fn messages_in(&self, channel_id: Id) -> Vec<Message> {
        self.node(channel_id)
            .and_then(|node| node.content().messages().map(|messages| messages.find_all()))
            .unwrap_or_default()
    }

    /// Number of cached messages in one channel.
    pub fn count_messages_in(&self, channel_id: Id) -> usize {
        self.node(channel_id)
            .map_or(0, |node| node.content().count_messages())
    }

    /// Number of cached messages across all channels.
    pub fn count_messages(&self) -> usize {
        self.channels
            .nodes()
            .iter()
            .map(|node| node.content().count_messages())
            .sum()
    }

    /// Every cached message across all channels.
    pub fn all_messages(&self) -> Vec<Message> {
        self.channels
            .nodes()
            .iter()
            .filter_map(|node| node.content().messages().map(|messages| messages.find_all()))
            .flatten()
            .collect()
    }

    /// Records `message_id` as the channel's latest message.
    pub fn set_last_message_id(&self, channel_id: Id, message_id: Id) {
        self.channels.update_if_present(channel_id, |mut channel| {
            channel.last_message_id = Possible::Present(message_id);
            Some(channel)
        });
    }

    /// Records a thread's approximate member count. Unknown threads are
    /// left alone.
    pub fn set_member_count(&self, thread_id: Id, member_count: u32) {
        self.channels.update_if_present(thread_id, |mut thread| {
            thread.member_count = Possible::Present(member_count);
            Some(thread)
        });
    }

    /// Stores a thread membership under its thread and user. Returns the
    /// membership it replaced; `None` as well when either id is missing.
    pub fn save_thread_member(&self, member: ThreadMember) -> Option<ThreadMember> {
        let (Some(thread_id), Some(user_id)) = (member.thread(), member.user()) else {
            tracing::trace!("thread member without ids ignored");
            return None;
        };
        self.node_for(thread_id)
            .content()
            .thread_members_or_init()
            .update(user_id, |_| Some(member.clone()))
    }

    /// One user's membership in a thread.
    pub fn thread_member(&self, thread_id: Id, user_id: Id) -> Option<ThreadMember> {
        self.node(thread_id)?
            .content()
            .thread_members()?
            .find(user_id)
    }

    /// Every stored membership of a thread.
    pub fn thread_members(&self, thread_id: Id) -> Vec<ThreadMember> {
        self.node(thread_id)
            .and_then(|node| {
                node.content()
                    .thread_members()
                    .map(|members| members.find_all())
            })
            .unwrap_or_default()
    }

    /// Counters of the table and every nested store.
    pub fn metrics(&self) -> StoreMetrics {
        let nested: StoreMetrics = self
            .channels
            .nodes()
            .iter()
            .map(|node| node.content().metrics())
            .sum();
        self.channels.metrics() + nested
    }
}
