//! Decoded gateway dispatch payloads.
//!
//! Payloads that are a bare entity on the wire (channel and thread events,
//! guild update, message create and update, stage instance and scheduled
//! event changes, user update, voice state update) are passed as that entity
//! type directly. The types here cover the rest.

use serde::Deserialize;

use crate::model::{
    Channel, Emoji, Guild, Id, Member, Possible, Presence, ReactionEmoji, Role, ScheduledEvent,
    StageInstance, Sticker, ThreadMember, User, VoiceState,
};

/// Why a shard's state is being discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationCause {
    /// The client logged out; the shard will not come back.
    Logout,
    /// The shard reconnected without resuming; a fresh guild set follows.
    HardReconnect,
}

impl InvalidationCause {
    pub const ALL: [InvalidationCause; 2] = [Self::Logout, Self::HardReconnect];
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ready {
    pub user: User,
    /// `[shard_id, shard_count]`.
    #[serde(default)]
    pub shard: Option<[u32; 2]>,
    #[serde(default)]
    pub session_id: String,
}

impl Ready {
    /// Shard count announced by the gateway, if any.
    pub fn shard_count(&self) -> Option<u32> {
        self.shard.map(|[_, count]| count)
    }
}

/// A guild becoming available, with its nested entities.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildCreate {
    pub id: Id,
    pub name: String,
    pub owner_id: Id,
    #[serde(default)]
    pub icon: Possible<String>,
    #[serde(default)]
    pub afk_channel_id: Possible<Id>,
    #[serde(default)]
    pub system_channel_id: Possible<Id>,
    #[serde(default)]
    pub verification_level: Possible<u8>,
    #[serde(default)]
    pub premium_tier: Possible<u8>,
    #[serde(default)]
    pub premium_subscription_count: Possible<u32>,
    #[serde(default)]
    pub member_count: Possible<u64>,
    #[serde(default)]
    pub large: Possible<bool>,
    #[serde(default)]
    pub unavailable: Possible<bool>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub emojis: Vec<Emoji>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub presences: Vec<Presence>,
    #[serde(default)]
    pub voice_states: Vec<VoiceState>,
    #[serde(default)]
    pub stickers: Vec<Sticker>,
    /// Active threads the current user can see.
    #[serde(default)]
    pub threads: Vec<Channel>,
    #[serde(default)]
    pub stage_instances: Vec<StageInstance>,
    #[serde(default)]
    pub guild_scheduled_events: Vec<ScheduledEvent>,
}

impl GuildCreate {
    /// The guild value with nested entity lists reduced to ids.
    pub fn normalize(&self) -> Guild {
        Guild {
            id: self.id,
            name: self.name.clone(),
            owner_id: self.owner_id,
            icon: self.icon.clone(),
            afk_channel_id: self.afk_channel_id,
            system_channel_id: self.system_channel_id,
            verification_level: self.verification_level,
            premium_tier: self.premium_tier,
            premium_subscription_count: self.premium_subscription_count,
            member_count: self.member_count,
            large: self.large,
            unavailable: self.unavailable,
            features: self.features.clone(),
            roles: self.roles.iter().map(|r| r.id).collect(),
            emojis: self.emojis.iter().map(|e| e.id).collect(),
            stickers: self.stickers.iter().map(|s| s.id).collect(),
            channels: self.channels.iter().map(|c| c.id).collect(),
            members: self.members.iter().map(|m| m.user.id).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildDelete {
    pub id: Id,
    /// Present when the guild went away because of an outage.
    #[serde(default)]
    pub unavailable: Possible<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildEmojisUpdate {
    pub guild_id: Id,
    pub emojis: Vec<Emoji>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildStickersUpdate {
    pub guild_id: Id,
    pub stickers: Vec<Sticker>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildScheduledEventUser {
    pub guild_scheduled_event_id: Id,
    pub user_id: Id,
    pub guild_id: Id,
}

pub type GuildScheduledEventUserAdd = GuildScheduledEventUser;
pub type GuildScheduledEventUserRemove = GuildScheduledEventUser;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildMemberAdd {
    pub guild_id: Id,
    #[serde(flatten)]
    pub member: Member,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildMemberUpdate {
    pub guild_id: Id,
    #[serde(flatten)]
    pub member: Member,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildMemberRemove {
    pub guild_id: Id,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildMembersChunk {
    pub guild_id: Id,
    pub members: Vec<Member>,
    #[serde(default)]
    pub presences: Vec<Presence>,
    #[serde(default)]
    pub chunk_index: u32,
    #[serde(default)]
    pub chunk_count: u32,
    #[serde(default)]
    pub not_found: Vec<Id>,
}

impl GuildMembersChunk {
    pub fn is_last(&self) -> bool {
        self.chunk_index + 1 >= self.chunk_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildRoleCreate {
    pub guild_id: Id,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildRoleUpdate {
    pub guild_id: Id,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildRoleDelete {
    pub guild_id: Id,
    pub role_id: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageDelete {
    pub id: Id,
    pub channel_id: Id,
    #[serde(default)]
    pub guild_id: Possible<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageDeleteBulk {
    pub ids: Vec<Id>,
    pub channel_id: Id,
    #[serde(default)]
    pub guild_id: Possible<Id>,
}

/// Shared shape of reaction add and reaction remove.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageReaction {
    pub user_id: Id,
    pub channel_id: Id,
    pub message_id: Id,
    #[serde(default)]
    pub guild_id: Possible<Id>,
    pub emoji: ReactionEmoji,
}

pub type MessageReactionAdd = MessageReaction;
pub type MessageReactionRemove = MessageReaction;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageReactionRemoveAll {
    pub channel_id: Id,
    pub message_id: Id,
    #[serde(default)]
    pub guild_id: Possible<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageReactionRemoveEmoji {
    pub channel_id: Id,
    pub message_id: Id,
    #[serde(default)]
    pub guild_id: Possible<Id>,
    pub emoji: ReactionEmoji,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PresenceUpdate {
    pub guild_id: Id,
    #[serde(flatten)]
    pub presence: Presence,
}

/// A thread went away. Only its ids and kind are sent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadDelete {
    pub id: Id,
    #[serde(default)]
    pub guild_id: Possible<Id>,
    #[serde(default)]
    pub parent_id: Possible<Id>,
    #[serde(rename = "type", default)]
    pub kind: u8,
}

/// The full set of active threads for some parents of a guild.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadListSync {
    pub guild_id: Id,
    /// Parents being synced. Missing means the whole guild.
    #[serde(default)]
    pub channel_ids: Possible<Vec<Id>>,
    #[serde(default)]
    pub threads: Vec<Channel>,
    /// The current user's memberships in `threads`.
    #[serde(default)]
    pub members: Vec<ThreadMember>,
}

impl ThreadListSync {
    /// Whether threads under `parent_id` are covered by this sync.
    pub fn covers(&self, parent_id: Option<Id>) -> bool {
        match self.channel_ids.as_option() {
            Some(parents) => parent_id.is_some_and(|parent| parents.contains(&parent)),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadMemberUpdate {
    #[serde(default)]
    pub guild_id: Possible<Id>,
    #[serde(flatten)]
    pub member: ThreadMember,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadMembersUpdate {
    /// The thread.
    pub id: Id,
    pub guild_id: Id,
    /// Approximate, stops counting at 50.
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub added_members: Vec<ThreadMember>,
    #[serde(default)]
    pub removed_member_ids: Vec<Id>,
}
