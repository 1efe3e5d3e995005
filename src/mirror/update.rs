//! Write facet: one method per gateway dispatch.
//!
//! Each method is a sequence of single-key atomic steps. Steps that touch
//! two stores (the global channel table and a guild's channel set, a role
//! and every member holding it) are not one transaction; readers can
//! observe the state between them.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::dispatch::{
    GuildCreate, GuildDelete, GuildEmojisUpdate, GuildMemberAdd, GuildMemberRemove,
    GuildMemberUpdate, GuildMembersChunk, GuildRoleCreate, GuildRoleDelete, GuildRoleUpdate,
    GuildScheduledEventUserAdd, GuildScheduledEventUserRemove, GuildStickersUpdate,
    InvalidationCause, MessageDelete, MessageDeleteBulk, MessageReactionAdd,
    MessageReactionRemove, MessageReactionRemoveAll, MessageReactionRemoveEmoji, PresenceUpdate,
    Ready, ThreadDelete, ThreadListSync, ThreadMemberUpdate, ThreadMembersUpdate,
};
use crate::mirror::StateMirror;
use crate::mirror::node::MessageNode;
use crate::model::{
    Channel, Emoji, Guild, Id, Member, Merge, Message, PartialMessage, Possible, Presence, Role,
    ScheduledEvent, StageInstance, Sticker, ThreadMember, User, UserRef, VoiceState,
};

/// Previous state returned by a presence update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceAndUser {
    pub presence: Option<Presence>,
    pub user: Option<User>,
}

/// Applies gateway dispatches to the mirror.
///
/// Every method takes the index of the shard the dispatch arrived on.
/// Methods that replace state return what was there before.
pub trait GatewayDataUpdater: Send + Sync {
    fn on_ready(&self, dispatch: Ready);

    fn on_channel_create(&self, shard: u32, channel: Channel);
    fn on_channel_update(&self, shard: u32, channel: Channel) -> Option<Channel>;
    fn on_channel_delete(&self, shard: u32, channel: Channel) -> Option<Channel>;

    fn on_guild_create(&self, shard: u32, dispatch: GuildCreate);
    fn on_guild_update(&self, shard: u32, guild: Guild) -> Option<Guild>;
    fn on_guild_delete(&self, shard: u32, dispatch: GuildDelete) -> Option<Guild>;
    fn on_guild_emojis_update(&self, shard: u32, dispatch: GuildEmojisUpdate) -> Vec<Emoji>;
    fn on_guild_stickers_update(&self, shard: u32, dispatch: GuildStickersUpdate) -> Vec<Sticker>;

    fn on_guild_member_add(&self, shard: u32, dispatch: GuildMemberAdd);
    fn on_guild_member_update(&self, shard: u32, dispatch: GuildMemberUpdate) -> Option<Member>;
    fn on_guild_member_remove(&self, shard: u32, dispatch: GuildMemberRemove) -> Option<Member>;
    fn on_guild_members_chunk(&self, shard: u32, dispatch: GuildMembersChunk);

    /// Marks the guild's member list as fully received.
    fn on_guild_members_completion(&self, guild_id: Id);

    fn on_guild_role_create(&self, shard: u32, dispatch: GuildRoleCreate);
    fn on_guild_role_update(&self, shard: u32, dispatch: GuildRoleUpdate) -> Option<Role>;
    fn on_guild_role_delete(&self, shard: u32, dispatch: GuildRoleDelete) -> Option<Role>;

    fn on_message_create(&self, shard: u32, message: Message);
    fn on_message_update(&self, shard: u32, edit: PartialMessage) -> Option<Message>;
    fn on_message_delete(&self, shard: u32, dispatch: MessageDelete) -> Option<Message>;
    fn on_message_delete_bulk(&self, shard: u32, dispatch: MessageDeleteBulk) -> Vec<Message>;

    /// Reaction methods return the message as it was before the change, or
    /// `None` if the message is not cached.
    fn on_message_reaction_add(&self, shard: u32, dispatch: MessageReactionAdd)
    -> Option<Message>;
    fn on_message_reaction_remove(
        &self,
        shard: u32,
        dispatch: MessageReactionRemove,
    ) -> Option<Message>;
    fn on_message_reaction_remove_all(
        &self,
        shard: u32,
        dispatch: MessageReactionRemoveAll,
    ) -> Option<Message>;
    fn on_message_reaction_remove_emoji(
        &self,
        shard: u32,
        dispatch: MessageReactionRemoveEmoji,
    ) -> Option<Message>;

    fn on_guild_scheduled_event_create(&self, shard: u32, event: ScheduledEvent);
    fn on_guild_scheduled_event_update(
        &self,
        shard: u32,
        event: ScheduledEvent,
    ) -> Option<ScheduledEvent>;
    fn on_guild_scheduled_event_delete(
        &self,
        shard: u32,
        event: ScheduledEvent,
    ) -> Option<ScheduledEvent>;
    fn on_guild_scheduled_event_user_add(&self, shard: u32, dispatch: GuildScheduledEventUserAdd);
    fn on_guild_scheduled_event_user_remove(
        &self,
        shard: u32,
        dispatch: GuildScheduledEventUserRemove,
    );

    fn on_stage_instance_create(&self, shard: u32, stage: StageInstance);
    fn on_stage_instance_update(&self, shard: u32, stage: StageInstance) -> Option<StageInstance>;
    fn on_stage_instance_delete(&self, shard: u32, stage: StageInstance) -> Option<StageInstance>;

    fn on_thread_create(&self, shard: u32, thread: Channel);
    fn on_thread_update(&self, shard: u32, thread: Channel) -> Option<Channel>;
    fn on_thread_delete(&self, shard: u32, dispatch: ThreadDelete) -> Option<Channel>;
    /// Replaces the guild's threads under the synced parents with the ones
    /// listed.
    fn on_thread_list_sync(&self, shard: u32, dispatch: ThreadListSync);
    fn on_thread_member_update(
        &self,
        shard: u32,
        dispatch: ThreadMemberUpdate,
    ) -> Option<ThreadMember>;
    /// Returns the thread's members as they were before the change.
    fn on_thread_members_update(
        &self,
        shard: u32,
        dispatch: ThreadMembersUpdate,
    ) -> Vec<ThreadMember>;

    fn on_presence_update(&self, shard: u32, dispatch: PresenceUpdate) -> PresenceAndUser;
    fn on_user_update(&self, shard: u32, user: User) -> Option<User>;
    fn on_voice_state_update(&self, shard: u32, state: VoiceState) -> Option<VoiceState>;

    /// Drops the shard's guilds when `cause` passes the configured filter.
    /// Returns the removed guilds.
    fn on_shard_invalidation(&self, shard: u32, cause: InvalidationCause) -> Vec<Guild>;
}

impl StateMirror {
    fn self_user_id(&self) -> Option<Id> {
        self.self_user.get().map(|slot| slot.id())
    }

    fn message_node(&self, channel_id: Id, message_id: Id) -> Option<MessageNode> {
        self.channels.message_node(channel_id, message_id)
    }

    /// Adds `channel_id` to the guild's channel set, then to the guild
    /// value's list.
    fn attach_channel(&self, guild_id: Id, channel_id: Id) {
        self.guilds
            .node_for(guild_id)
            .content()
            .channel_ids
            .insert(channel_id);
        self.guilds
            .update_if_present(guild_id, |guild| Some(guild.with_channel(channel_id)));
    }

    fn detach_channel(&self, guild_id: Id, channel_id: Id) {
        if let Some(node) = self.guilds.node(guild_id) {
            node.content().channel_ids.remove(&channel_id);
        }
        self.guilds
            .update_if_present(guild_id, |guild| Some(guild.without_channel(channel_id)));
    }

    fn add_members(&self, guild_id: Id, members: Vec<Member>, count_joins: bool) {
        let node = self.guilds.node_for(guild_id);
        let ids: Vec<Id> = members.iter().map(|member| member.user.id).collect();
        for member in members {
            node.content().members.insert(member);
        }
        self.guilds
            .update_if_present(guild_id, |guild| Some(guild.with_members(&ids, count_joins)));
    }

    /// Fills in the current user for memberships that omit it; they only
    /// ever describe the current user.
    fn own_thread_member(&self, mut member: ThreadMember) -> ThreadMember {
        if member.user_id.is_unset() {
            if let Some(user_id) = self.self_user_id() {
                member.user_id = Possible::Present(user_id);
            }
        }
        member
    }

    /// Stores a thread and records it under its guild.
    fn attach_thread(&self, guild_id: Option<Id>, thread: Channel) {
        let thread_id = thread.id;
        self.channels.insert(thread);
        if let Some(guild_id) = guild_id {
            self.guilds
                .node_for(guild_id)
                .content()
                .thread_ids
                .insert(thread_id);
        }
    }

    fn save_role(&self, guild_id: Id, role: Role) -> Option<Role> {
        let role_id = role.id;
        let previous = self
            .guilds
            .node_for(guild_id)
            .content()
            .roles
            .update(role_id, |current| {
                Some(match current {
                    Some(current) => current.merge(&role),
                    None => role.clone(),
                })
            });
        self.guilds
            .update_if_present(guild_id, |guild| Some(guild.with_role(role_id)));
        previous
    }
}

impl GatewayDataUpdater for StateMirror {
    #[tracing::instrument(level = "debug", skip_all, fields(user_id = %dispatch.user.id))]
    fn on_ready(&self, dispatch: Ready) {
        let [shard, count] = dispatch.shard.unwrap_or([0, 1]);
        let user = dispatch.user;
        self.self_user.get_or_init(|| {
            let fresh = Arc::new(UserRef::new(user.clone()));
            let slot = self
                .users
                .get_or_insert_with(user.id, || Some(fresh.clone()))
                .unwrap_or_else(|| fresh.clone());
            if !Arc::ptr_eq(&slot, &fresh) {
                slot.merge_user(&user);
            }
            slot
        });
        if self
            .shard_count
            .compare_exchange(0, count.max(1), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            tracing::info!(shards = count.max(1), "shard count established");
        }
        self.connected_shards.insert(shard);
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, channel_id = %channel.id))]
    fn on_channel_create(&self, shard: u32, channel: Channel) {
        let channel_id = channel.id;
        let guild_id = channel.guild();
        self.channels.insert(channel);
        if let Some(guild_id) = guild_id {
            self.attach_channel(guild_id, channel_id);
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, channel_id = %channel.id))]
    fn on_channel_update(&self, shard: u32, channel: Channel) -> Option<Channel> {
        self.channels.merge(&channel)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, channel_id = %channel.id))]
    fn on_channel_delete(&self, shard: u32, channel: Channel) -> Option<Channel> {
        let previous = self.channels.invalidate(channel.id);
        if let Some(guild_id) = channel.guild() {
            self.detach_channel(guild_id, channel.id);
        }
        previous
    }

    #[tracing::instrument(level = "debug", skip_all, fields(shard = shard, guild_id = %dispatch.id))]
    fn on_guild_create(&self, shard: u32, dispatch: GuildCreate) {
        let guild_id = dispatch.id;
        self.guilds.insert(dispatch.normalize());
        let node = self.guilds.node_for(guild_id);
        let content = node.content();

        let GuildCreate {
            roles,
            emojis,
            members,
            channels,
            presences,
            voice_states,
            stickers,
            threads,
            stage_instances,
            guild_scheduled_events,
            ..
        } = dispatch;
        let (role_count, member_count, channel_count) = (roles.len(), members.len(), channels.len());
        let thread_count = threads.len();

        for role in roles {
            content.roles.insert(role);
        }
        for emoji in emojis {
            content.emojis.insert(emoji);
        }
        for member in members {
            content.members.insert(member);
        }
        for mut channel in channels {
            channel.guild_id = Possible::Present(guild_id);
            content.channel_ids.insert(channel.id);
            self.channels.insert(channel);
        }
        for mut thread in threads {
            thread.guild_id = Possible::Present(guild_id);
            content.thread_ids.insert(thread.id);
            self.channels.insert(thread);
        }
        for mut presence in presences {
            presence.guild_id = Possible::Present(guild_id);
            content.presences.insert(presence);
        }
        for mut state in voice_states {
            if state.is_connected() {
                state.guild_id = Possible::Present(guild_id);
                content.voice_states.insert(state);
            }
        }
        for sticker in stickers {
            content.stickers.insert(sticker);
        }
        for stage in stage_instances {
            self.channels
                .node_for(stage.channel_id)
                .content()
                .set_stage_instance(Some(stage));
        }
        for event in guild_scheduled_events {
            content.scheduled_events.insert(event);
        }
        tracing::debug!(
            roles = role_count,
            members = member_count,
            channels = channel_count,
            threads = thread_count,
            "guild created"
        );
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, guild_id = %guild.id))]
    fn on_guild_update(&self, shard: u32, guild: Guild) -> Option<Guild> {
        self.guilds
            .update_if_present(guild.id, |current| Some(current.merge(&guild)))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(shard = shard, guild_id = %dispatch.id))]
    fn on_guild_delete(&self, shard: u32, dispatch: GuildDelete) -> Option<Guild> {
        self.guilds.delete(dispatch.id)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, guild_id = %dispatch.guild_id))]
    fn on_guild_emojis_update(&self, shard: u32, dispatch: GuildEmojisUpdate) -> Vec<Emoji> {
        let guild_id = dispatch.guild_id;
        let node = self.guilds.node_for(guild_id);
        let emojis = &node.content().emojis;
        let previous = emojis.find_all();
        emojis.clear();
        let ids: Vec<Id> = dispatch.emojis.iter().map(|emoji| emoji.id).collect();
        for emoji in dispatch.emojis {
            emojis.insert(emoji);
        }
        self.guilds
            .update_if_present(guild_id, |guild| Some(guild.with_emojis(ids.clone())));
        previous
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, guild_id = %dispatch.guild_id))]
    fn on_guild_stickers_update(&self, shard: u32, dispatch: GuildStickersUpdate) -> Vec<Sticker> {
        let guild_id = dispatch.guild_id;
        let node = self.guilds.node_for(guild_id);
        let stickers = &node.content().stickers;
        let previous = stickers.find_all();
        stickers.clear();
        let ids: Vec<Id> = dispatch.stickers.iter().map(|sticker| sticker.id).collect();
        for sticker in dispatch.stickers {
            stickers.insert(sticker);
        }
        self.guilds
            .update_if_present(guild_id, |guild| Some(guild.with_stickers(ids.clone())));
        previous
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, guild_id = %dispatch.guild_id))]
    fn on_guild_member_add(&self, shard: u32, dispatch: GuildMemberAdd) {
        self.add_members(dispatch.guild_id, vec![dispatch.member], true);
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, guild_id = %dispatch.guild_id))]
    fn on_guild_member_update(&self, shard: u32, dispatch: GuildMemberUpdate) -> Option<Member> {
        let node = self.guilds.node(dispatch.guild_id)?;
        let update = dispatch.member;
        node.content()
            .members
            .merge_if_present(update.user.id, &update)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, guild_id = %dispatch.guild_id))]
    fn on_guild_member_remove(&self, shard: u32, dispatch: GuildMemberRemove) -> Option<Member> {
        let guild_id = dispatch.guild_id;
        let user_id = dispatch.user.id;
        let previous = self
            .guilds
            .node(guild_id)
            .and_then(|node| node.content().members.delete(user_id));
        self.guilds
            .update_if_present(guild_id, |guild| Some(guild.without_member(user_id)));
        previous
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(shard = shard, guild_id = %dispatch.guild_id, chunk = dispatch.chunk_index)
    )]
    fn on_guild_members_chunk(&self, shard: u32, dispatch: GuildMembersChunk) {
        let guild_id = dispatch.guild_id;
        self.add_members(guild_id, dispatch.members, false);
        let node = self.guilds.node_for(guild_id);
        for mut presence in dispatch.presences {
            presence.guild_id = Possible::Present(guild_id);
            node.content().presences.insert(presence);
        }
    }

    fn on_guild_members_completion(&self, guild_id: Id) {
        if let Some(node) = self.guilds.node(guild_id) {
            node.content().mark_member_list_complete();
            tracing::debug!(guild_id = %guild_id, "member list complete");
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, guild_id = %dispatch.guild_id))]
    fn on_guild_role_create(&self, shard: u32, dispatch: GuildRoleCreate) {
        self.save_role(dispatch.guild_id, dispatch.role);
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, guild_id = %dispatch.guild_id))]
    fn on_guild_role_update(&self, shard: u32, dispatch: GuildRoleUpdate) -> Option<Role> {
        self.save_role(dispatch.guild_id, dispatch.role)
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(shard = shard, guild_id = %dispatch.guild_id, role_id = %dispatch.role_id)
    )]
    fn on_guild_role_delete(&self, shard: u32, dispatch: GuildRoleDelete) -> Option<Role> {
        let GuildRoleDelete { guild_id, role_id } = dispatch;
        self.guilds
            .update_if_present(guild_id, |guild| Some(guild.without_role(role_id)));
        let node = self.guilds.node(guild_id)?;
        let content = node.content();
        let previous = content.roles.delete(role_id);
        let holders: Vec<Id> = content
            .members
            .find_all()
            .into_iter()
            .filter(|member| member.roles.contains(&role_id))
            .map(|member| member.user.id)
            .collect();
        for user_id in &holders {
            content
                .members
                .update_if_present(*user_id, |member| Some(member.without_role(role_id)));
        }
        let stripped = holders.len();
        tracing::trace!(stripped, "role removed from members");
        previous
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(shard = shard, channel_id = %message.channel_id, message_id = %message.id)
    )]
    fn on_message_create(&self, shard: u32, message: Message) {
        let channel_id = message.channel_id;
        self.channels.set_last_message_id(channel_id, message.id);
        self.channels
            .node_for(channel_id)
            .content()
            .messages_or_init()
            .insert(message);
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(shard = shard, channel_id = %edit.channel_id, message_id = %edit.id)
    )]
    fn on_message_update(&self, shard: u32, edit: PartialMessage) -> Option<Message> {
        let node = self.message_node(edit.channel_id, edit.id)?;
        Some(node.stored().edit(&edit))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, channel_id = %dispatch.channel_id))]
    fn on_message_delete(&self, shard: u32, dispatch: MessageDelete) -> Option<Message> {
        self.channels
            .node(dispatch.channel_id)?
            .content()
            .messages()?
            .delete(dispatch.id)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, channel_id = %dispatch.channel_id))]
    fn on_message_delete_bulk(&self, shard: u32, dispatch: MessageDeleteBulk) -> Vec<Message> {
        let Some(node) = self.channels.node(dispatch.channel_id) else {
            return Vec::new();
        };
        let Some(messages) = node.content().messages() else {
            return Vec::new();
        };
        dispatch
            .ids
            .iter()
            .filter_map(|id| messages.delete(*id))
            .collect()
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(shard = shard, message_id = %dispatch.message_id, user_id = %dispatch.user_id)
    )]
    fn on_message_reaction_add(
        &self,
        shard: u32,
        dispatch: MessageReactionAdd,
    ) -> Option<Message> {
        let node = self.message_node(dispatch.channel_id, dispatch.message_id)?;
        let by_self = self.self_user_id() == Some(dispatch.user_id);
        Some(node.stored().add_reaction(&dispatch.emoji, by_self))
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(shard = shard, message_id = %dispatch.message_id, user_id = %dispatch.user_id)
    )]
    fn on_message_reaction_remove(
        &self,
        shard: u32,
        dispatch: MessageReactionRemove,
    ) -> Option<Message> {
        let node = self.message_node(dispatch.channel_id, dispatch.message_id)?;
        let by_self = self.self_user_id() == Some(dispatch.user_id);
        Some(node.stored().remove_reaction(&dispatch.emoji, by_self))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, message_id = %dispatch.message_id))]
    fn on_message_reaction_remove_all(
        &self,
        shard: u32,
        dispatch: MessageReactionRemoveAll,
    ) -> Option<Message> {
        let node = self.message_node(dispatch.channel_id, dispatch.message_id)?;
        Some(node.stored().clear_reactions())
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, message_id = %dispatch.message_id))]
    fn on_message_reaction_remove_emoji(
        &self,
        shard: u32,
        dispatch: MessageReactionRemoveEmoji,
    ) -> Option<Message> {
        let node = self.message_node(dispatch.channel_id, dispatch.message_id)?;
        Some(node.stored().remove_emoji(&dispatch.emoji))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, event_id = %event.id))]
    fn on_guild_scheduled_event_create(&self, shard: u32, event: ScheduledEvent) {
        self.guilds
            .node_for(event.guild_id)
            .content()
            .scheduled_events
            .insert(event);
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, event_id = %event.id))]
    fn on_guild_scheduled_event_update(
        &self,
        shard: u32,
        event: ScheduledEvent,
    ) -> Option<ScheduledEvent> {
        self.guilds
            .node(event.guild_id)?
            .content()
            .scheduled_events
            .update_if_present(event.id, |current| Some(current.merge(&event)))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, event_id = %event.id))]
    fn on_guild_scheduled_event_delete(
        &self,
        shard: u32,
        event: ScheduledEvent,
    ) -> Option<ScheduledEvent> {
        self.guilds
            .node(event.guild_id)?
            .content()
            .scheduled_events
            .delete_node(event.id)?
            .data()
            .cloned()
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(shard = shard, event_id = %dispatch.guild_scheduled_event_id, user_id = %dispatch.user_id)
    )]
    fn on_guild_scheduled_event_user_add(&self, shard: u32, dispatch: GuildScheduledEventUserAdd) {
        let added = self
            .guilds
            .node_for(dispatch.guild_id)
            .content()
            .scheduled_events
            .for_id(dispatch.guild_scheduled_event_id)
            .add_user(dispatch.user_id);
        if !added {
            tracing::trace!("user already interested");
        }
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(shard = shard, event_id = %dispatch.guild_scheduled_event_id, user_id = %dispatch.user_id)
    )]
    fn on_guild_scheduled_event_user_remove(
        &self,
        shard: u32,
        dispatch: GuildScheduledEventUserRemove,
    ) {
        let Some(node) = self.guilds.node(dispatch.guild_id) else {
            return;
        };
        if let Some(event) = node
            .content()
            .scheduled_events
            .node(dispatch.guild_scheduled_event_id)
        {
            event.remove_user(dispatch.user_id);
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, channel_id = %stage.channel_id))]
    fn on_stage_instance_create(&self, shard: u32, stage: StageInstance) {
        self.channels
            .node_for(stage.channel_id)
            .content()
            .set_stage_instance(Some(stage));
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, channel_id = %stage.channel_id))]
    fn on_stage_instance_update(&self, shard: u32, stage: StageInstance) -> Option<StageInstance> {
        self.channels
            .node(stage.channel_id)?
            .content()
            .replace_stage_instance(&stage)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, channel_id = %stage.channel_id))]
    fn on_stage_instance_delete(&self, shard: u32, stage: StageInstance) -> Option<StageInstance> {
        self.channels
            .node(stage.channel_id)?
            .content()
            .set_stage_instance(None)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, thread_id = %thread.id))]
    fn on_thread_create(&self, shard: u32, thread: Channel) {
        self.attach_thread(thread.guild(), thread);
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, thread_id = %thread.id))]
    fn on_thread_update(&self, shard: u32, thread: Channel) -> Option<Channel> {
        let previous = self.channels.merge(&thread);
        if let Some(guild_id) = thread.guild() {
            self.guilds
                .node_for(guild_id)
                .content()
                .thread_ids
                .insert(thread.id);
        }
        previous
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, thread_id = %dispatch.id))]
    fn on_thread_delete(&self, shard: u32, dispatch: ThreadDelete) -> Option<Channel> {
        let previous = self.channels.invalidate(dispatch.id);
        let guild_id = dispatch
            .guild_id
            .as_option()
            .copied()
            .or_else(|| previous.as_ref().and_then(Channel::guild));
        if let Some(node) = guild_id.and_then(|guild_id| self.guilds.node(guild_id)) {
            node.content().thread_ids.remove(&dispatch.id);
        }
        previous
    }

    #[tracing::instrument(level = "debug", skip_all, fields(shard = shard, guild_id = %dispatch.guild_id))]
    fn on_thread_list_sync(&self, shard: u32, dispatch: ThreadListSync) {
        let guild_id = dispatch.guild_id;
        let node = self.guilds.node_for(guild_id);
        let synced: Vec<Id> = dispatch.threads.iter().map(|thread| thread.id).collect();
        let mut dropped = 0usize;
        for thread_id in node.content().thread_ids() {
            if synced.contains(&thread_id) {
                continue;
            }
            let parent = self.channels.find(thread_id).and_then(|thread| thread.parent());
            if dispatch.covers(parent) {
                self.channels.invalidate(thread_id);
                node.content().thread_ids.remove(&thread_id);
                dropped += 1;
            }
        }
        for mut thread in dispatch.threads {
            thread.guild_id = Possible::Present(guild_id);
            self.attach_thread(Some(guild_id), thread);
        }
        for member in dispatch.members {
            self.channels.save_thread_member(self.own_thread_member(member));
        }
        tracing::debug!(threads = synced.len(), dropped, "thread list synced");
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard))]
    fn on_thread_member_update(
        &self,
        shard: u32,
        dispatch: ThreadMemberUpdate,
    ) -> Option<ThreadMember> {
        self.channels
            .save_thread_member(self.own_thread_member(dispatch.member))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, thread_id = %dispatch.id))]
    fn on_thread_members_update(
        &self,
        shard: u32,
        dispatch: ThreadMembersUpdate,
    ) -> Vec<ThreadMember> {
        let thread_id = dispatch.id;
        let previous = self.channels.thread_members(thread_id);
        for mut member in dispatch.added_members {
            if member.id.is_unset() {
                member.id = Possible::Present(thread_id);
            }
            self.channels.save_thread_member(member);
        }
        if let Some(node) = self.channels.node(thread_id) {
            if let Some(members) = node.content().thread_members() {
                for user_id in &dispatch.removed_member_ids {
                    members.delete(*user_id);
                }
            }
        }
        self.channels.set_member_count(thread_id, dispatch.member_count);
        previous
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(shard = shard, guild_id = %dispatch.guild_id, user_id = %dispatch.presence.user.id)
    )]
    fn on_presence_update(&self, shard: u32, dispatch: PresenceUpdate) -> PresenceAndUser {
        let mut presence = dispatch.presence;
        presence.guild_id = Possible::Present(dispatch.guild_id);
        let user = self.users.get(presence.user.id).map(|slot| slot.get());
        let previous = self
            .guilds
            .node_for(dispatch.guild_id)
            .content()
            .presences
            .insert(presence);
        PresenceAndUser {
            presence: previous,
            user,
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, user_id = %user.id))]
    fn on_user_update(&self, shard: u32, user: User) -> Option<User> {
        let slot = self.users.get(user.id)?;
        Some(User::clone(&slot.merge_user(&user)))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(shard = shard, user_id = %state.user_id))]
    fn on_voice_state_update(&self, shard: u32, state: VoiceState) -> Option<VoiceState> {
        let guild_id = *state.guild_id.as_option()?;
        let node = self.guilds.node_for(guild_id);
        let voice_states = &node.content().voice_states;
        if state.is_connected() {
            voice_states.insert(state)
        } else {
            voice_states.delete(state.user_id)
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(shard = shard, cause = ?cause))]
    fn on_shard_invalidation(&self, shard: u32, cause: InvalidationCause) -> Vec<Guild> {
        self.connected_shards.remove(&shard);
        let removed = if self.config.invalidates_on(cause) {
            let count = self.shard_count.load(Ordering::Acquire);
            self.guilds.invalidate_shard(shard, count)
        } else {
            Vec::new()
        };
        if self.connected_shards.is_empty() {
            self.shard_count.store(0, Ordering::Release);
            tracing::debug!("no shard connected, shard count reset");
        }
        removed
    }
}
