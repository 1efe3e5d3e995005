//! Payload builders shared by the integration tests.

#![allow(dead_code)]

use mirrorkit::dispatch::{
    GuildCreate, GuildMemberAdd, GuildMemberUpdate, MessageReaction, PresenceUpdate, Ready,
};
use mirrorkit::model::{Channel, Guild, Id, Message, ReactionEmoji, User};
use serde_json::{Value, json};

pub fn decode<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("test payload decodes")
}

pub fn user(id: u64, username: &str) -> User {
    decode(json!({"id": id.to_string(), "username": username}))
}

pub fn ready(user_id: u64, shard: [u32; 2]) -> Ready {
    decode(json!({
        "user": {"id": user_id.to_string(), "username": "self"},
        "shard": shard,
    }))
}

pub fn guild(id: u64) -> Guild {
    decode(json!({"id": id.to_string(), "name": "guild", "owner_id": "1"}))
}

/// A guild with one text channel per id in `channel_ids` and one member
/// per id in `member_ids`.
pub fn guild_create(id: u64, channel_ids: &[u64], member_ids: &[u64]) -> GuildCreate {
    let channels: Vec<Value> = channel_ids
        .iter()
        .map(|c| json!({"id": c.to_string(), "type": 0, "name": format!("c{c}")}))
        .collect();
    let members: Vec<Value> = member_ids
        .iter()
        .map(|m| {
            json!({
                "user": {"id": m.to_string(), "username": format!("u{m}")},
                "roles": [],
            })
        })
        .collect();
    decode(json!({
        "id": id.to_string(),
        "name": "guild",
        "owner_id": "1",
        "member_count": member_ids.len(),
        "channels": channels,
        "members": members,
    }))
}

pub fn channel(id: u64, guild_id: u64) -> Channel {
    decode(json!({
        "id": id.to_string(),
        "type": 0,
        "guild_id": guild_id.to_string(),
        "name": format!("c{id}"),
    }))
}

pub fn message(id: u64, channel_id: u64) -> Message {
    decode(json!({
        "id": id.to_string(),
        "channel_id": channel_id.to_string(),
        "author": {"id": "1", "username": "author"},
        "content": format!("m{id}"),
    }))
}

pub fn member_add(guild_id: u64, user_id: u64, username: &str) -> GuildMemberAdd {
    decode(json!({
        "guild_id": guild_id.to_string(),
        "user": {"id": user_id.to_string(), "username": username},
        "roles": [],
    }))
}

pub fn member_update(guild_id: u64, user: Value, nick: &str) -> GuildMemberUpdate {
    decode(json!({
        "guild_id": guild_id.to_string(),
        "user": user,
        "nick": nick,
        "roles": [],
    }))
}

pub fn presence_update(guild_id: u64, user: Value, status: &str) -> PresenceUpdate {
    decode(json!({
        "guild_id": guild_id.to_string(),
        "user": user,
        "status": status,
    }))
}

pub fn reaction(user_id: u64, channel_id: u64, message_id: u64, emoji: &str) -> MessageReaction {
    MessageReaction {
        user_id: Id::new(user_id),
        channel_id: Id::new(channel_id),
        message_id: Id::new(message_id),
        guild_id: Default::default(),
        emoji: ReactionEmoji::unicode(emoji),
    }
}
