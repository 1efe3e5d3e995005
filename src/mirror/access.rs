//! # Read Facet
//!
//! [`DataAccessor`] is the query side of the mirror. Every method is a
//! plain synchronous read against the concurrent stores.
//!
//! ## Scopes
//!
//! | Kind         | Global            | Per guild                  | Per channel                  | By id                           |
//! |--------------|-------------------|----------------------------|------------------------------|---------------------------------|
//! | channels     | `get_channels`    | `get_channels_in_guild`    | -                            | `get_channel_by_id`             |
//! | emojis       | `get_emojis`      | `get_emojis_in_guild`      | -                            | `get_emoji_by_id`               |
//! | guilds       | `get_guilds`      | -                          | -                            | `get_guild_by_id`               |
//! | members      | `get_members`     | `get_members_in_guild`     | -                            | `get_member_by_id`              |
//! | messages     | `get_messages`    | -                          | `get_messages_in_channel`    | `get_message_by_id`             |
//! | presences    | `get_presences`   | `get_presences_in_guild`   | -                            | `get_presence_by_id`            |
//! | roles        | `get_roles`       | `get_roles_in_guild`       | -                            | `get_role_by_id`                |
//! | stickers     | `get_stickers`    | `get_stickers_in_guild`    | -                            | `get_sticker_by_id`             |
//! | users        | `get_users`       | -                          | -                            | `get_user_by_id`                |
//! | voice states | `get_voice_states`| `get_voice_states_in_guild`| `get_voice_states_in_channel`| `get_voice_state_by_id`         |
//!
//! Each `get_*` collection has a matching `count_*`. Threads are channels:
//! `get_channel_by_id` finds them, `get_threads_in_guild` lists them apart
//! from the guild's regular channels. Thread members are scoped to their
//! thread, stage instances to their stage channel and scheduled events (with
//! their interested users) to their guild.
//!
//! ## Result Shapes
//!
//! - Point lookups return `Option`; a missing id is never an error.
//! - Collections return a `Vec` built fresh on every call. Later writes do
//!   not show up in a `Vec` already returned.
//! - Members and presences come back with their shared user resolved.
//! - `*_exact_members_in_guild` fail with
//!   [`StoreError::ExactResultNotAvailable`] until the guild's full member
//!   list has been received.

use crate::error::StoreError;
use crate::mirror::StateMirror;
use crate::mirror::node::GuildContent;
use crate::model::{
    Channel, Emoji, Guild, Id, Member, Message, Presence, Role, ScheduledEvent, StageInstance,
    Sticker, ThreadMember, User, VoiceState,
};

/// Queries over the mirrored state.
pub trait DataAccessor: Send + Sync {
    fn count_channels(&self) -> usize;
    fn count_channels_in_guild(&self, guild_id: Id) -> usize;
    fn count_emojis(&self) -> usize;
    fn count_emojis_in_guild(&self, guild_id: Id) -> usize;
    fn count_guilds(&self) -> usize;
    fn count_members(&self) -> usize;
    fn count_members_in_guild(&self, guild_id: Id) -> usize;

    /// Member count of a guild whose full member list has been received.
    fn count_exact_members_in_guild(&self, guild_id: Id) -> Result<usize, StoreError>;

    fn count_messages(&self) -> usize;
    fn count_messages_in_channel(&self, channel_id: Id) -> usize;
    fn count_presences(&self) -> usize;
    fn count_presences_in_guild(&self, guild_id: Id) -> usize;
    fn count_roles(&self) -> usize;
    fn count_roles_in_guild(&self, guild_id: Id) -> usize;

    /// Users still referenced by a member, a presence or the self slot.
    fn count_scheduled_events_in_guild(&self, guild_id: Id) -> usize;
    fn count_stickers(&self) -> usize;
    fn count_stickers_in_guild(&self, guild_id: Id) -> usize;
    fn count_members_in_thread(&self, thread_id: Id) -> usize;
    fn count_users(&self) -> usize;

    fn count_voice_states(&self) -> usize;
    fn count_voice_states_in_guild(&self, guild_id: Id) -> usize;
    fn count_voice_states_in_channel(&self, guild_id: Id, channel_id: Id) -> usize;

    fn get_channels(&self) -> Vec<Channel>;
    fn get_channels_in_guild(&self, guild_id: Id) -> Vec<Channel>;
    fn get_channel_by_id(&self, channel_id: Id) -> Option<Channel>;
    fn get_emojis(&self) -> Vec<Emoji>;
    fn get_emojis_in_guild(&self, guild_id: Id) -> Vec<Emoji>;
    fn get_emoji_by_id(&self, guild_id: Id, emoji_id: Id) -> Option<Emoji>;
    fn get_guilds(&self) -> Vec<Guild>;
    fn get_guild_by_id(&self, guild_id: Id) -> Option<Guild>;
    fn get_members(&self) -> Vec<Member>;
    fn get_members_in_guild(&self, guild_id: Id) -> Vec<Member>;

    /// Members of a guild whose full member list has been received.
    fn get_exact_members_in_guild(&self, guild_id: Id) -> Result<Vec<Member>, StoreError>;

    fn get_member_by_id(&self, guild_id: Id, user_id: Id) -> Option<Member>;
    fn get_messages(&self) -> Vec<Message>;
    fn get_messages_in_channel(&self, channel_id: Id) -> Vec<Message>;
    fn get_message_by_id(&self, channel_id: Id, message_id: Id) -> Option<Message>;
    fn get_presences(&self) -> Vec<Presence>;
    fn get_presences_in_guild(&self, guild_id: Id) -> Vec<Presence>;
    fn get_presence_by_id(&self, guild_id: Id, user_id: Id) -> Option<Presence>;
    fn get_roles(&self) -> Vec<Role>;
    fn get_roles_in_guild(&self, guild_id: Id) -> Vec<Role>;
    fn get_role_by_id(&self, guild_id: Id, role_id: Id) -> Option<Role>;
    fn get_scheduled_events_in_guild(&self, guild_id: Id) -> Vec<ScheduledEvent>;
    fn get_scheduled_event_by_id(&self, guild_id: Id, event_id: Id) -> Option<ScheduledEvent>;
    /// Users interested in the event, sorted by id. They are tracked even
    /// before the event itself is seen.
    fn get_scheduled_event_users_in_event(&self, guild_id: Id, event_id: Id) -> Vec<Id>;
    /// The live stage of a stage channel.
    fn get_stage_instance_by_channel_id(&self, channel_id: Id) -> Option<StageInstance>;
    fn get_stickers(&self) -> Vec<Sticker>;
    fn get_stickers_in_guild(&self, guild_id: Id) -> Vec<Sticker>;
    fn get_sticker_by_id(&self, guild_id: Id, sticker_id: Id) -> Option<Sticker>;
    fn get_threads_in_guild(&self, guild_id: Id) -> Vec<Channel>;
    fn get_members_in_thread(&self, thread_id: Id) -> Vec<ThreadMember>;
    fn get_thread_member_by_id(&self, thread_id: Id, user_id: Id) -> Option<ThreadMember>;
    fn get_users(&self) -> Vec<User>;
    fn get_user_by_id(&self, user_id: Id) -> Option<User>;
    fn get_voice_states(&self) -> Vec<VoiceState>;
    fn get_voice_states_in_guild(&self, guild_id: Id) -> Vec<VoiceState>;
    fn get_voice_states_in_channel(&self, guild_id: Id, channel_id: Id) -> Vec<VoiceState>;
    fn get_voice_state_by_id(&self, guild_id: Id, user_id: Id) -> Option<VoiceState>;

    /// The user this client is logged in as, once a ready dispatch arrived.
    fn get_self_user(&self) -> Option<User>;

    /// Shard count announced by the first ready; 0 before that or after
    /// every shard was invalidated.
    fn shard_count(&self) -> u32;
}

impl StateMirror {
    fn sum_guilds<F>(&self, count: F) -> usize
    where
        F: Fn(&GuildContent) -> usize,
    {
        self.guilds
            .nodes()
            .iter()
            .map(|node| count(node.content()))
            .sum()
    }

    fn collect_guilds<T, F>(&self, collect: F) -> Vec<T>
    where
        F: Fn(&GuildContent) -> Vec<T>,
    {
        self.guilds
            .nodes()
            .iter()
            .flat_map(|node| collect(node.content()))
            .collect()
    }

    fn in_guild<T, F>(&self, guild_id: Id, read: F) -> Option<T>
    where
        F: FnOnce(&GuildContent) -> Option<T>,
    {
        self.guilds
            .node(guild_id)
            .and_then(|node| read(node.content()))
    }

    /// Runs `read` against a guild whose member list is complete.
    fn with_complete_members<T, F>(&self, guild_id: Id, read: F) -> Result<T, StoreError>
    where
        F: FnOnce(&GuildContent) -> T,
    {
        match self.guilds.node(guild_id) {
            Some(node) if node.content().is_member_list_complete() => Ok(read(node.content())),
            _ => Err(StoreError::exact_result_not_available(guild_id)),
        }
    }
}

fn voice_channel_is(state: &VoiceState, channel_id: Id) -> bool {
    state.channel_id.as_option() == Some(&channel_id)
}

impl DataAccessor for StateMirror {
    fn count_channels(&self) -> usize {
        self.channels.count()
    }

    fn count_channels_in_guild(&self, guild_id: Id) -> usize {
        self.get_channels_in_guild(guild_id).len()
    }

    fn count_emojis(&self) -> usize {
        self.sum_guilds(|content| content.emojis.count())
    }

    fn count_emojis_in_guild(&self, guild_id: Id) -> usize {
        self.in_guild(guild_id, |content| Some(content.emojis.count()))
            .unwrap_or(0)
    }

    fn count_guilds(&self) -> usize {
        self.guilds.count()
    }

    fn count_members(&self) -> usize {
        self.sum_guilds(|content| content.members.count())
    }

    fn count_members_in_guild(&self, guild_id: Id) -> usize {
        self.in_guild(guild_id, |content| Some(content.members.count()))
            .unwrap_or(0)
    }

    fn count_exact_members_in_guild(&self, guild_id: Id) -> Result<usize, StoreError> {
        self.with_complete_members(guild_id, |content| content.members.count())
    }

    fn count_messages(&self) -> usize {
        self.channels.count_messages()
    }

    fn count_messages_in_channel(&self, channel_id: Id) -> usize {
        self.channels.count_messages_in(channel_id)
    }

    fn count_presences(&self) -> usize {
        self.sum_guilds(|content| content.presences.count())
    }

    fn count_presences_in_guild(&self, guild_id: Id) -> usize {
        self.in_guild(guild_id, |content| Some(content.presences.count()))
            .unwrap_or(0)
    }

    fn count_roles(&self) -> usize {
        self.sum_guilds(|content| content.roles.count())
    }

    fn count_roles_in_guild(&self, guild_id: Id) -> usize {
        self.in_guild(guild_id, |content| Some(content.roles.count()))
            .unwrap_or(0)
    }

    fn count_scheduled_events_in_guild(&self, guild_id: Id) -> usize {
        self.in_guild(guild_id, |content| Some(content.scheduled_events.count()))
            .unwrap_or(0)
    }

    fn count_stickers(&self) -> usize {
        self.sum_guilds(|content| content.stickers.count())
    }

    fn count_stickers_in_guild(&self, guild_id: Id) -> usize {
        self.in_guild(guild_id, |content| Some(content.stickers.count()))
            .unwrap_or(0)
    }

    fn count_members_in_thread(&self, thread_id: Id) -> usize {
        self.channels.thread_members(thread_id).len()
    }

    fn count_users(&self) -> usize {
        self.users.count()
    }

    fn count_voice_states(&self) -> usize {
        self.sum_guilds(|content| content.voice_states.count())
    }

    fn count_voice_states_in_guild(&self, guild_id: Id) -> usize {
        self.in_guild(guild_id, |content| Some(content.voice_states.count()))
            .unwrap_or(0)
    }

    fn count_voice_states_in_channel(&self, guild_id: Id, channel_id: Id) -> usize {
        self.get_voice_states_in_channel(guild_id, channel_id).len()
    }

    fn get_channels(&self) -> Vec<Channel> {
        self.channels.find_all()
    }

    fn get_channels_in_guild(&self, guild_id: Id) -> Vec<Channel> {
        let Some(node) = self.guilds.node(guild_id) else {
            return Vec::new();
        };
        node.content()
            .channel_ids()
            .into_iter()
            .filter_map(|channel_id| self.channels.find(channel_id))
            .collect()
    }

    fn get_channel_by_id(&self, channel_id: Id) -> Option<Channel> {
        self.channels.find(channel_id)
    }

    fn get_emojis(&self) -> Vec<Emoji> {
        self.collect_guilds(|content| content.emojis.find_all())
    }

    fn get_emojis_in_guild(&self, guild_id: Id) -> Vec<Emoji> {
        self.in_guild(guild_id, |content| Some(content.emojis.find_all()))
            .unwrap_or_default()
    }

    fn get_emoji_by_id(&self, guild_id: Id, emoji_id: Id) -> Option<Emoji> {
        self.in_guild(guild_id, |content| content.emojis.find(emoji_id))
    }

    fn get_guilds(&self) -> Vec<Guild> {
        self.guilds.find_all()
    }

    fn get_guild_by_id(&self, guild_id: Id) -> Option<Guild> {
        self.guilds.find(guild_id)
    }

    fn get_members(&self) -> Vec<Member> {
        self.collect_guilds(|content| content.members.find_all())
    }

    fn get_members_in_guild(&self, guild_id: Id) -> Vec<Member> {
        self.in_guild(guild_id, |content| Some(content.members.find_all()))
            .unwrap_or_default()
    }

    fn get_exact_members_in_guild(&self, guild_id: Id) -> Result<Vec<Member>, StoreError> {
        self.with_complete_members(guild_id, |content| content.members.find_all())
    }

    fn get_member_by_id(&self, guild_id: Id, user_id: Id) -> Option<Member> {
        self.in_guild(guild_id, |content| content.members.find(user_id))
    }

    fn get_messages(&self) -> Vec<Message> {
        self.channels.all_messages()
    }

    fn get_messages_in_channel(&self, channel_id: Id) -> Vec<Message> {
        self.channels.messages_in(channel_id)
    }

    fn get_message_by_id(&self, channel_id: Id, message_id: Id) -> Option<Message> {
        self.channels.find_message(channel_id, message_id)
    }

    fn get_presences(&self) -> Vec<Presence> {
        self.collect_guilds(|content| content.presences.find_all())
    }

    fn get_presences_in_guild(&self, guild_id: Id) -> Vec<Presence> {
        self.in_guild(guild_id, |content| Some(content.presences.find_all()))
            .unwrap_or_default()
    }

    fn get_presence_by_id(&self, guild_id: Id, user_id: Id) -> Option<Presence> {
        self.in_guild(guild_id, |content| content.presences.find(user_id))
    }

    fn get_roles(&self) -> Vec<Role> {
        self.collect_guilds(|content| content.roles.find_all())
    }

    fn get_roles_in_guild(&self, guild_id: Id) -> Vec<Role> {
        self.in_guild(guild_id, |content| Some(content.roles.find_all()))
            .unwrap_or_default()
    }

    fn get_role_by_id(&self, guild_id: Id, role_id: Id) -> Option<Role> {
        self.in_guild(guild_id, |content| content.roles.find(role_id))
    }

    fn get_scheduled_events_in_guild(&self, guild_id: Id) -> Vec<ScheduledEvent> {
        self.in_guild(guild_id, |content| Some(content.scheduled_events.find_all()))
            .unwrap_or_default()
    }

    fn get_scheduled_event_by_id(&self, guild_id: Id, event_id: Id) -> Option<ScheduledEvent> {
        self.in_guild(guild_id, |content| content.scheduled_events.find(event_id))
    }

    fn get_scheduled_event_users_in_event(&self, guild_id: Id, event_id: Id) -> Vec<Id> {
        self.in_guild(guild_id, |content| {
            content
                .scheduled_events
                .node(event_id)
                .map(|event| event.users())
        })
        .unwrap_or_default()
    }

    fn get_stage_instance_by_channel_id(&self, channel_id: Id) -> Option<StageInstance> {
        self.channels.node(channel_id)?.content().stage_instance()
    }

    fn get_stickers(&self) -> Vec<Sticker> {
        self.collect_guilds(|content| content.stickers.find_all())
    }

    fn get_stickers_in_guild(&self, guild_id: Id) -> Vec<Sticker> {
        self.in_guild(guild_id, |content| Some(content.stickers.find_all()))
            .unwrap_or_default()
    }

    fn get_sticker_by_id(&self, guild_id: Id, sticker_id: Id) -> Option<Sticker> {
        self.in_guild(guild_id, |content| content.stickers.find(sticker_id))
    }

    fn get_threads_in_guild(&self, guild_id: Id) -> Vec<Channel> {
        let Some(node) = self.guilds.node(guild_id) else {
            return Vec::new();
        };
        node.content()
            .thread_ids()
            .into_iter()
            .filter_map(|thread_id| self.channels.find(thread_id))
            .collect()
    }

    fn get_members_in_thread(&self, thread_id: Id) -> Vec<ThreadMember> {
        self.channels.thread_members(thread_id)
    }

    fn get_thread_member_by_id(&self, thread_id: Id, user_id: Id) -> Option<ThreadMember> {
        self.channels.thread_member(thread_id, user_id)
    }

    fn get_users(&self) -> Vec<User> {
        self.users
            .find_all()
            .iter()
            .map(|slot| slot.get())
            .collect()
    }

    fn get_user_by_id(&self, user_id: Id) -> Option<User> {
        self.users.get(user_id).map(|slot| slot.get())
    }

    fn get_voice_states(&self) -> Vec<VoiceState> {
        self.collect_guilds(|content| content.voice_states.find_all())
    }

    fn get_voice_states_in_guild(&self, guild_id: Id) -> Vec<VoiceState> {
        self.in_guild(guild_id, |content| Some(content.voice_states.find_all()))
            .unwrap_or_default()
    }

    fn get_voice_states_in_channel(&self, guild_id: Id, channel_id: Id) -> Vec<VoiceState> {
        self.get_voice_states_in_guild(guild_id)
            .into_iter()
            .filter(|state| voice_channel_is(state, channel_id))
            .collect()
    }

    fn get_voice_state_by_id(&self, guild_id: Id, user_id: Id) -> Option<VoiceState> {
        self.in_guild(guild_id, |content| content.voice_states.find(user_id))
    }

    fn get_self_user(&self) -> Option<User> {
        self.self_user.get().map(|slot| slot.get())
    }

    fn shard_count(&self) -> u32 {
        self.shard_count.load(std::sync::atomic::Ordering::Acquire)
    }
}
