//! Composite nodes: a guild with its nested stores, a channel with its
//! lazily built caches, a scheduled event with its interested users, and a
//! message with its reaction set.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use dashmap::DashSet;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rustc_hash::{FxBuildHasher, FxHashSet};

use crate::config::StoreConfig;
use crate::model::{
    Channel, Emoji, Guild, Id, Member, Merge, Message, Presence, Role, ScheduledEvent,
    StageInstance, Sticker, StoredMessage, ThreadMember, UserRef, VoiceState,
};
use crate::store::traits::Node;
use crate::store::{
    IdentityStore, KeyedStore, StorageBackend, StoreMetrics, UserLinkedStore, WeaklyHeldStore,
};

/// Everything a guild owns besides its own value.
#[derive(Debug)]
pub struct GuildContent {
    pub roles: IdentityStore<Role>,
    pub emojis: IdentityStore<Emoji>,
    pub stickers: IdentityStore<Sticker>,
    pub members: UserLinkedStore<Member>,
    /// Keyed by user id.
    pub presences: UserLinkedStore<Presence>,
    /// Keyed by user id.
    pub voice_states: IdentityStore<VoiceState>,
    pub scheduled_events: KeyedStore<ScheduledEventNode>,
    pub channel_ids: DashSet<Id, FxBuildHasher>,
    /// Active threads. Thread values live in the global channel table.
    pub thread_ids: DashSet<Id, FxBuildHasher>,
    member_list_complete: AtomicBool,
}

impl GuildContent {
    pub fn new(config: &StoreConfig, users: Arc<WeaklyHeldStore<UserRef>>) -> Self {
        Self {
            roles: IdentityStore::new(&config.roles),
            emojis: IdentityStore::new(&config.emojis),
            stickers: IdentityStore::new(&config.stickers),
            members: UserLinkedStore::new(&config.members, users.clone()),
            presences: UserLinkedStore::new(&config.presences, users),
            voice_states: IdentityStore::new(&config.voice_states),
            scheduled_events: KeyedStore::with_empty_node(
                &config.scheduled_events,
                ScheduledEventNode::empty,
            ),
            channel_ids: DashSet::with_hasher(FxBuildHasher),
            thread_ids: DashSet::with_hasher(FxBuildHasher),
            member_list_complete: AtomicBool::new(false),
        }
    }

    pub fn is_member_list_complete(&self) -> bool {
        self.member_list_complete.load(Ordering::Acquire)
    }

    pub fn mark_member_list_complete(&self) {
        self.member_list_complete.store(true, Ordering::Release);
    }

    pub fn channel_ids(&self) -> Vec<Id> {
        self.channel_ids.iter().map(|id| *id).collect()
    }

    pub fn thread_ids(&self) -> Vec<Id> {
        self.thread_ids.iter().map(|id| *id).collect()
    }

    pub fn metrics(&self) -> StoreMetrics {
        self.roles.metrics()
            + self.emojis.metrics()
            + self.stickers.metrics()
            + self.members.metrics()
            + self.presences.metrics()
            + self.voice_states.metrics()
            + self.scheduled_events.metrics()
    }
}

/// A guild's value plus its nested stores.
///
/// Nodes are created empty on first reference, before the guild payload
/// arrives; the nested stores survive every later value update.
#[derive(Debug, Clone)]
pub struct GuildNode {
    data: Option<Arc<Guild>>,
    content: Arc<GuildContent>,
}

impl GuildNode {
    pub fn empty(content: GuildContent) -> Self {
        Self {
            data: None,
            content: Arc::new(content),
        }
    }

    pub fn content(&self) -> &GuildContent {
        &self.content
    }

    pub fn data(&self) -> Option<&Guild> {
        self.data.as_deref()
    }
}

impl Node for GuildNode {
    type Value = Guild;

    fn unwrap(&self) -> Option<Guild> {
        self.data.as_deref().cloned()
    }

    fn rewrap(current: Option<&Self>, value: Option<Guild>) -> Option<Self> {
        current.map(|current| GuildNode {
            data: value.map(Arc::new),
            content: current.content.clone(),
        })
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.content, &other.content)
            && match (&self.data, &other.data) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }

    fn has_value(&self) -> bool {
        self.data.is_some()
    }
}

/// A message in a channel's cache.
#[derive(Debug, Clone)]
pub struct MessageNode(Arc<StoredMessage>);

impl MessageNode {
    pub fn stored(&self) -> &StoredMessage {
        &self.0
    }
}

impl Node for MessageNode {
    type Value = Message;

    fn unwrap(&self) -> Option<Message> {
        Some(self.0.snapshot())
    }

    fn rewrap(_current: Option<&Self>, value: Option<Message>) -> Option<Self> {
        value.map(|message| MessageNode(Arc::new(StoredMessage::new(message))))
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn has_value(&self) -> bool {
        true
    }
}

/// Per-channel message cache.
pub type MessageStore = KeyedStore<MessageNode>;

/// Per-thread member table, keyed by user id.
pub type ThreadMemberStore = IdentityStore<ThreadMember>;

/// Backends for the stores a channel builds on first use.
#[derive(Debug, Clone, Default)]
pub struct ChannelBackends {
    pub messages: StorageBackend,
    pub thread_members: StorageBackend,
}

impl ChannelBackends {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            messages: config.messages.clone(),
            thread_members: config.thread_members.clone(),
        }
    }
}

/// Everything a channel owns besides its own value.
///
/// Nothing is allocated until the first message, thread member or stage
/// instance arrives: most channels never see any.
#[derive(Debug)]
pub struct ChannelContent {
    backends: Arc<ChannelBackends>,
    messages: OnceCell<MessageStore>,
    thread_members: OnceCell<ThreadMemberStore>,
    stage_instance: ArcSwapOption<StageInstance>,
}

impl ChannelContent {
    pub fn new(backends: Arc<ChannelBackends>) -> Self {
        Self {
            backends,
            messages: OnceCell::new(),
            thread_members: OnceCell::new(),
            stage_instance: ArcSwapOption::empty(),
        }
    }

    /// The message cache, if a message was ever stored here.
    pub fn messages(&self) -> Option<&MessageStore> {
        self.messages.get()
    }

    /// The message cache, built on first call.
    pub fn messages_or_init(&self) -> &MessageStore {
        self.messages
            .get_or_init(|| KeyedStore::new(&self.backends.messages))
    }

    pub fn thread_members(&self) -> Option<&ThreadMemberStore> {
        self.thread_members.get()
    }

    pub fn thread_members_or_init(&self) -> &ThreadMemberStore {
        self.thread_members
            .get_or_init(|| IdentityStore::new(&self.backends.thread_members))
    }

    pub fn stage_instance(&self) -> Option<StageInstance> {
        self.stage_instance.load_full().map(|stage| StageInstance::clone(&stage))
    }

    /// Stores `stage` and returns the one it replaced.
    pub fn set_stage_instance(&self, stage: Option<StageInstance>) -> Option<StageInstance> {
        self.stage_instance
            .swap(stage.map(Arc::new))
            .map(|previous| StageInstance::clone(&previous))
    }

    /// Replaces the stage instance only if there is one. Returns the
    /// replaced value.
    pub fn replace_stage_instance(&self, stage: &StageInstance) -> Option<StageInstance> {
        let previous = self.stage_instance.rcu(|current| {
            current
                .as_ref()
                .map(|current| Arc::new(current.merge(stage)))
        });
        previous.map(|previous| StageInstance::clone(&previous))
    }

    pub fn count_messages(&self) -> usize {
        self.messages().map_or(0, MessageStore::count)
    }

    /// Drops messages, thread members and the stage instance. Returns the
    /// number of messages dropped.
    pub fn clear(&self) -> usize {
        let dropped = self.count_messages();
        if let Some(messages) = self.messages() {
            messages.clear();
        }
        if let Some(members) = self.thread_members() {
            members.clear();
        }
        self.stage_instance.store(None);
        dropped
    }

    /// Whether any of the lazily built stores exists.
    pub fn is_allocated(&self) -> bool {
        self.messages.get().is_some() || self.thread_members.get().is_some()
    }

    pub fn metrics(&self) -> StoreMetrics {
        self.messages().map(KeyedStore::metrics).unwrap_or_default()
            + self
                .thread_members()
                .map(KeyedStore::metrics)
                .unwrap_or_default()
    }
}

/// A channel's value plus its content.
#[derive(Debug, Clone)]
pub struct ChannelNode {
    data: Option<Arc<Channel>>,
    content: Arc<ChannelContent>,
}

impl ChannelNode {
    pub fn empty(backends: Arc<ChannelBackends>) -> Self {
        Self {
            data: None,
            content: Arc::new(ChannelContent::new(backends)),
        }
    }

    pub fn content(&self) -> &ChannelContent {
        &self.content
    }

    pub fn data(&self) -> Option<&Channel> {
        self.data.as_deref()
    }
}

impl Node for ChannelNode {
    type Value = Channel;

    fn unwrap(&self) -> Option<Channel> {
        self.data.as_deref().cloned()
    }

    fn rewrap(current: Option<&Self>, value: Option<Channel>) -> Option<Self> {
        current.map(|current| ChannelNode {
            data: value.map(Arc::new),
            content: current.content.clone(),
        })
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.content, &other.content)
            && match (&self.data, &other.data) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }

    fn has_value(&self) -> bool {
        self.data.is_some()
    }
}

/// A scheduled event plus the users interested in it.
///
/// Users may subscribe before the event itself is seen; the node then
/// exists empty and carries only the user set.
#[derive(Debug, Clone)]
pub struct ScheduledEventNode {
    data: Option<Arc<ScheduledEvent>>,
    users: Arc<Mutex<FxHashSet<Id>>>,
}

impl ScheduledEventNode {
    pub fn empty() -> Self {
        Self {
            data: None,
            users: Arc::default(),
        }
    }

    pub fn data(&self) -> Option<&ScheduledEvent> {
        self.data.as_deref()
    }

    /// Interested users, sorted by id.
    pub fn users(&self) -> Vec<Id> {
        let mut users: Vec<Id> = self.users.lock().iter().copied().collect();
        users.sort_unstable();
        users
    }

    /// Returns `false` if the user was already listed.
    pub fn add_user(&self, user_id: Id) -> bool {
        self.users.lock().insert(user_id)
    }

    /// Returns `false` if the user was not listed.
    pub fn remove_user(&self, user_id: Id) -> bool {
        self.users.lock().remove(&user_id)
    }
}

impl Node for ScheduledEventNode {
    type Value = ScheduledEvent;

    fn unwrap(&self) -> Option<ScheduledEvent> {
        self.data.as_deref().cloned()
    }

    fn rewrap(current: Option<&Self>, value: Option<ScheduledEvent>) -> Option<Self> {
        current.map(|current| ScheduledEventNode {
            data: value.map(Arc::new),
            users: current.users.clone(),
        })
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.users, &other.users)
            && match (&self.data, &other.data) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }

    fn has_value(&self) -> bool {
        self.data.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild(id: u64) -> Guild {
        serde_json::from_value(serde_json::json!({
            "id": id.to_string(),
            "name": "g",
            "owner_id": "1",
        }))
        .unwrap()
    }

    #[test]
    fn guild_node_keeps_content_across_updates() {
        let config = StoreConfig::default();
        let users = Arc::new(WeaklyHeldStore::new(&StorageBackend::Unbounded, 16));
        let empty = GuildNode::empty(GuildContent::new(&config, users));
        assert!(!empty.has_value());

        let filled = GuildNode::rewrap(Some(&empty), Some(guild(5))).unwrap();
        assert!(filled.has_value());
        assert!(Arc::ptr_eq(&filled.content, &empty.content));
        assert!(!filled.same(&empty));

        let cleared = GuildNode::rewrap(Some(&filled), None).unwrap();
        assert!(cleared.data().is_none());
        assert!(GuildNode::rewrap(None, Some(guild(5))).is_none());
    }

    #[test]
    fn member_list_flag() {
        let config = StoreConfig::default();
        let users = Arc::new(WeaklyHeldStore::new(&StorageBackend::Unbounded, 16));
        let content = GuildContent::new(&config, users);
        assert!(!content.is_member_list_complete());
        content.mark_member_list_complete();
        assert!(content.is_member_list_complete());
    }

    #[test]
    fn channel_stores_are_built_on_first_use() {
        let node = ChannelNode::empty(Arc::new(ChannelBackends::from_config(
            &StoreConfig::default(),
        )));
        let content = node.content();
        assert!(!content.is_allocated());
        assert!(content.messages().is_none());
        assert_eq!(content.count_messages(), 0);
        assert_eq!(content.clear(), 0);
        assert!(!content.is_allocated());

        let messages = content.messages_or_init();
        assert!(std::ptr::eq(messages, content.messages_or_init()));
        assert!(content.is_allocated());
        assert!(content.thread_members().is_none());
    }

    #[test]
    fn stage_instance_replace_needs_an_existing_one() {
        let content = ChannelContent::new(Arc::default());
        let stage: StageInstance = serde_json::from_value(serde_json::json!({
            "id": "1",
            "guild_id": "2",
            "channel_id": "3",
            "topic": "town hall",
        }))
        .unwrap();
        assert!(content.replace_stage_instance(&stage).is_none());
        assert!(content.stage_instance().is_none());

        assert!(content.set_stage_instance(Some(stage.clone())).is_none());
        let renamed = StageInstance {
            topic: "q&a".into(),
            ..stage.clone()
        };
        assert_eq!(content.replace_stage_instance(&renamed), Some(stage));
        assert_eq!(content.stage_instance().unwrap().topic, "q&a");
    }

    #[test]
    fn scheduled_event_users_survive_value_updates() {
        let empty = ScheduledEventNode::empty();
        assert!(empty.add_user(Id::new(5)));
        assert!(!empty.add_user(Id::new(5)));
        let event: ScheduledEvent = serde_json::from_value(serde_json::json!({
            "id": "9",
            "guild_id": "1",
            "name": "launch",
        }))
        .unwrap();
        let filled = ScheduledEventNode::rewrap(Some(&empty), Some(event)).unwrap();
        assert!(filled.has_value());
        assert_eq!(filled.users(), vec![Id::new(5)]);
        assert!(filled.remove_user(Id::new(5)));
        assert!(empty.users().is_empty());
    }
}
