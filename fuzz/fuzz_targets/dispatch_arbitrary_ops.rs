#![no_main]

use libfuzzer_sys::fuzz_target;
use mirrorkit::StateMirror;
use mirrorkit::dispatch::{GuildMemberRemove, InvalidationCause, MessageReaction};
use mirrorkit::model::{Channel, Id, ReactionEmoji, User};
use serde_json::{Value, json};

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("fuzz payload decodes")
}

fn channel(id: u64, guild_id: u64) -> Channel {
    decode(json!({"id": id.to_string(), "type": 0, "guild_id": guild_id.to_string()}))
}

fn reaction(user_id: u64, channel_id: u64, message_id: u64, emoji: u8) -> MessageReaction {
    MessageReaction {
        user_id: Id::new(user_id),
        channel_id: Id::new(channel_id),
        message_id: Id::new(message_id),
        guild_id: Default::default(),
        emoji: ReactionEmoji::custom(Id::new(u64::from(emoji % 3)), "e"),
    }
}

// Fuzz arbitrary dispatch sequences over a small id space
//
// After every dispatch the mirror must be consistent: each channel a guild
// lists exists and points back at that guild, reaction counts stay
// positive, and guild-scoped counts match the lists they summarize.
fuzz_target!(|data: &[u8]| {
    let mirror = StateMirror::default();
    let updater = mirror.gateway_data_updater();
    let reader = mirror.data_accessor();

    for op in data.chunks_exact(4) {
        let guild = u64::from(op[1] % 4) << 22;
        // Channels never move between guilds.
        let channel_id = guild + 1 + u64::from(op[2] % 8);
        let user = u64::from(op[3] % 16);

        match op[0] % 10 {
            0 => updater.on_guild_create(
                0,
                decode(json!({
                    "id": guild.to_string(),
                    "name": "g",
                    "owner_id": "0",
                    "channels": [{"id": channel_id.to_string(), "type": 0}],
                })),
            ),
            1 => {
                updater.on_guild_delete(0, decode(json!({"id": guild.to_string()})));
            },
            2 => {
                updater.on_channel_create(0, channel(channel_id, guild));
            },
            3 => {
                updater.on_channel_delete(0, channel(channel_id, guild));
            },
            4 => updater.on_message_create(
                0,
                decode(json!({
                    "id": user.to_string(),
                    "channel_id": channel_id.to_string(),
                    "author": {"id": "1", "username": "a"},
                })),
            ),
            5 => {
                updater.on_message_reaction_add(0, reaction(user, channel_id, user, op[2]));
            },
            6 => {
                updater.on_message_reaction_remove(0, reaction(user, channel_id, user, op[2]));
            },
            7 => updater.on_guild_member_add(
                0,
                decode(json!({
                    "guild_id": guild.to_string(),
                    "user": {"id": user.to_string(), "username": "u"},
                })),
            ),
            8 => {
                updater.on_guild_member_remove(
                    0,
                    GuildMemberRemove {
                        guild_id: Id::new(guild),
                        user: User::stub(Id::new(user)),
                    },
                );
            },
            _ => {
                updater.on_shard_invalidation(u32::from(op[1] % 2), InvalidationCause::Logout);
            },
        }

        for guild in reader.get_guilds() {
            for channel_id in &guild.channels {
                let channel = reader
                    .get_channel_by_id(*channel_id)
                    .expect("listed channel exists");
                assert_eq!(channel.guild(), Some(guild.id));
            }
            assert_eq!(
                reader.count_members_in_guild(guild.id),
                reader.get_members_in_guild(guild.id).len()
            );
        }
        for message in reader.get_messages() {
            assert!(message.reactions.iter().all(|r| r.count > 0));
        }
    }
});
