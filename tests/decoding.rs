// ==============================================
// WIRE DECODING AND CONFIGURATION (integration)
// ==============================================
//
// Full gateway payloads decoded with serde_json and replayed through the
// mirror, plus configuration loading from files and the environment.

mod common;

use std::path::PathBuf;

use mirrorkit::dispatch::{GuildCreate, GuildMembersChunk, InvalidationCause, MessageReaction};
use mirrorkit::model::{Id, Message, PartialMessage, Possible};
use mirrorkit::{ConfigError, StateMirror, StorageBackend, StoreConfig, StoreError};
use serde_json::json;

use common::*;

// ==============================================
// Gateway Payloads
// ==============================================

mod gateway_payloads {
    use super::*;

    fn guild_create_payload() -> GuildCreate {
        decode(json!({
            "id": "197038439483310086",
            "name": "Test Guild",
            "owner_id": "80351110224678912",
            "icon": null,
            "member_count": 3,
            "large": false,
            "features": ["COMMUNITY"],
            "roles": [
                {"id": "197038439483310086", "name": "@everyone", "permissions": "104324673"},
                {"id": "41771983423143936", "name": "mods", "color": 3447003, "hoist": true}
            ],
            "emojis": [
                {"id": "41771983429993937", "name": "LUL", "roles": [], "animated": false}
            ],
            "members": [
                {
                    "user": {"id": "80351110224678912", "username": "Nelly", "avatar": "8342729096ea3675442027381ff50dfe"},
                    "nick": null,
                    "roles": ["41771983423143936"],
                    "joined_at": "2015-04-26T06:26:56.936000+00:00",
                    "deaf": false,
                    "mute": false
                },
                {
                    "user": {"id": "80351110224678913", "username": "Boaty", "bot": true},
                    "roles": []
                }
            ],
            "channels": [
                {"id": "41771983423143937", "type": 0, "name": "general", "position": 0},
                {"id": "41771983423143938", "type": 2, "name": "voice", "bitrate": 64000}
            ],
            "presences": [
                {"user": {"id": "80351110224678912"}, "status": "online", "activities": [{"name": "chess", "type": 0}]}
            ],
            "voice_states": [
                {"channel_id": "41771983423143938", "user_id": "80351110224678912", "session_id": "a"},
                {"channel_id": null, "user_id": "80351110224678913", "session_id": "b"}
            ]
        }))
    }

    #[test]
    fn guild_create_populates_every_kind() {
        let mirror = StateMirror::default();
        mirror
            .gateway_data_updater()
            .on_guild_create(0, guild_create_payload());

        let reader = mirror.data_accessor();
        let guild_id = Id::new(197038439483310086);
        let guild = reader.get_guild_by_id(guild_id).unwrap();
        assert_eq!(guild.name, "Test Guild");
        assert_eq!(guild.icon, Possible::Null);
        assert_eq!(guild.member_count, Possible::Present(3));
        assert_eq!(guild.features, vec!["COMMUNITY".to_string()]);

        assert_eq!(reader.count_roles_in_guild(guild_id), 2);
        assert_eq!(reader.count_emojis_in_guild(guild_id), 1);
        assert_eq!(reader.count_members_in_guild(guild_id), 2);
        assert_eq!(reader.count_channels_in_guild(guild_id), 2);
        assert_eq!(reader.count_presences_in_guild(guild_id), 1);
        // Only connected voice states are kept.
        assert_eq!(reader.count_voice_states_in_guild(guild_id), 1);
        assert_eq!(
            reader.count_voice_states_in_channel(guild_id, Id::new(41771983423143938)),
            1
        );

        let channel = reader.get_channel_by_id(Id::new(41771983423143937)).unwrap();
        assert_eq!(channel.guild_id, Possible::Present(guild_id));

        let member = reader
            .get_member_by_id(guild_id, Id::new(80351110224678912))
            .unwrap();
        assert_eq!(member.nick, Possible::Null);
        assert_eq!(member.roles, vec![Id::new(41771983423143936)]);
        assert_eq!(member.user.username, "Nelly");

        // The presence only carried the user id; the member supplied the rest.
        let presence = reader
            .get_presence_by_id(guild_id, Id::new(80351110224678912))
            .unwrap();
        assert_eq!(presence.status, "online");
        assert_eq!(presence.activities[0].name, "chess");
        assert_eq!(reader.count_users(), 2);
        assert_eq!(
            reader.get_user_by_id(Id::new(80351110224678913)).unwrap().bot,
            Possible::Present(true)
        );
    }

    #[test]
    fn member_chunks_unlock_exact_queries() {
        let mirror = StateMirror::default();
        let updater = mirror.gateway_data_updater();
        updater.on_guild_create(0, guild_create(100, &[], &[1]));

        let reader = mirror.data_accessor();
        assert_eq!(
            reader.count_exact_members_in_guild(Id::new(100)),
            Err(StoreError::exact_result_not_available(Id::new(100)))
        );

        for chunk_index in 0..2u64 {
            let chunk: GuildMembersChunk = decode(json!({
                "guild_id": "100",
                "chunk_index": chunk_index,
                "chunk_count": 2,
                "members": [
                    {"user": {"id": (10 + chunk_index).to_string(), "username": "chunked"}, "roles": []}
                ],
                "not_found": []
            }));
            assert_eq!(chunk.is_last(), chunk_index == 1);
            updater.on_guild_members_chunk(0, chunk);
        }
        updater.on_guild_members_completion(Id::new(100));

        assert_eq!(reader.count_exact_members_in_guild(Id::new(100)), Ok(3));
        assert_eq!(reader.get_exact_members_in_guild(Id::new(100)).unwrap().len(), 3);
        // Chunks do not count as joins.
        assert_eq!(
            reader.get_guild_by_id(Id::new(100)).unwrap().member_count,
            Possible::Present(1)
        );
    }

    #[test]
    fn message_lifecycle_from_wire_payloads() {
        let mirror = StateMirror::default();
        let updater = mirror.gateway_data_updater();
        updater.on_ready(ready(7, [0, 1]));

        let created: Message = decode(json!({
            "id": "334385199974967042",
            "channel_id": "290926798999357250",
            "author": {"id": "53908099506183680", "username": "Mason", "avatar": null},
            "content": "Supa Hot",
            "timestamp": "2017-07-11T17:27:07.299000+00:00",
            "edited_timestamp": null,
            "tts": false,
            "mention_everyone": false,
            "mentions": [],
            "mention_roles": [],
            "attachments": [],
            "pinned": false,
            "type": 0
        }));
        updater.on_message_create(0, created);

        let channel_id = Id::new(290926798999357250);
        let message_id = Id::new(334385199974967042);
        let edit: PartialMessage = decode(json!({
            "id": "334385199974967042",
            "channel_id": "290926798999357250",
            "content": "Supa Hot Fire",
            "edited_timestamp": "2017-07-11T17:28:00.000000+00:00"
        }));
        let before = updater.on_message_update(0, edit).unwrap();
        assert_eq!(before.content, "Supa Hot");

        let custom: MessageReaction = decode(json!({
            "user_id": "7",
            "channel_id": "290926798999357250",
            "message_id": "334385199974967042",
            "emoji": {"id": "41771983429993937", "name": "LUL", "animated": false}
        }));
        updater.on_message_reaction_add(0, custom);
        updater.on_message_reaction_add(0, reaction(8, 290926798999357250, 334385199974967042, "🔥"));

        let message = mirror
            .data_accessor()
            .get_message_by_id(channel_id, message_id)
            .unwrap();
        assert_eq!(message.content, "Supa Hot Fire");
        assert!(message.edited_timestamp.is_present());
        assert_eq!(message.author.username, "Mason");
        assert_eq!(message.reactions.len(), 2);
        let lul = message
            .reactions
            .iter()
            .find(|r| r.emoji.id == Some(Id::new(41771983429993937)))
            .unwrap();
        assert_eq!(lul.count, 1);
        assert!(lul.me);
        let fire = message
            .reactions
            .iter()
            .find(|r| r.emoji.name.as_deref() == Some("🔥"))
            .unwrap();
        assert!(!fire.me);
    }

    #[test]
    fn unknown_fields_and_numeric_ids_are_accepted() {
        let channel: mirrorkit::model::Channel = decode(json!({
            "id": 41771983423143937u64,
            "type": 0,
            "guild_id": "100",
            "name": "general",
            "default_auto_archive_duration": 1440
        }));
        assert_eq!(channel.id, Id::new(41771983423143937));
        assert_eq!(channel.guild(), Some(Id::new(100)));
        assert!(channel.topic.is_unset());
    }

    #[test]
    fn malformed_snowflakes_fail_to_decode() {
        let result = serde_json::from_value::<mirrorkit::model::Channel>(json!({
            "id": "not-a-number",
            "type": 0
        }));
        assert!(result.is_err());
    }
}

// ==============================================
// Configuration Loading
// ==============================================

mod configuration {
    use super::*;

    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "mirrorkit-{}-{}.toml",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn file_then_environment_layering() {
        let path = temp_config(
            "layering",
            r#"
            user_sweep_interval = 64

            [members]
            kind = "bounded"
            max_size = 10000

            [voice_states]
            kind = "disabled"
            "#,
        );

        let from_file = StoreConfig::load(Some(&path)).unwrap();
        assert_eq!(from_file.members.max_size(), Some(10000));
        assert!(from_file.voice_states.is_disabled());
        assert_eq!(from_file.user_sweep_interval, 64);

        // SAFETY: std serializes environment access and nothing else in
        // this binary sets variables.
        unsafe {
            std::env::set_var("MIRRORKIT__USER_SWEEP_INTERVAL", "128");
            std::env::set_var("MIRRORKIT__INVALIDATION_FILTER", "logout");
        }
        let layered = StoreConfig::load(Some(&path));
        unsafe {
            std::env::remove_var("MIRRORKIT__USER_SWEEP_INTERVAL");
            std::env::remove_var("MIRRORKIT__INVALIDATION_FILTER");
        }
        std::fs::remove_file(&path).unwrap();

        let layered = layered.unwrap();
        assert_eq!(layered.user_sweep_interval, 128);
        assert_eq!(layered.members.max_size(), Some(10000));
        assert!(layered.invalidates_on(InvalidationCause::Logout));
        assert!(!layered.invalidates_on(InvalidationCause::HardReconnect));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("mirrorkit-does-not-exist.toml");
        let config = StoreConfig::load(Some(&path)).unwrap();
        assert_eq!(config.channels, StorageBackend::Unbounded);
        assert_eq!(config.messages, StoreConfig::default().messages);
    }

    #[test]
    fn invalid_backend_is_reported() {
        let err = StoreConfig::from_toml_str(
            r#"
            [messages]
            kind = "bounded"
            expire_after_access_secs = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "messages", .. }));

        let err = StoreConfig::from_toml_str(
            r#"
            [guilds]
            kind = "sometimes"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn disabled_presences_drop_presence_dispatches() {
        let config = StoreConfig::from_toml_str(
            r#"
            [presences]
            kind = "disabled"
            "#,
        )
        .unwrap();
        let mirror = StateMirror::new(config);
        let updater = mirror.gateway_data_updater();
        updater.on_guild_create(0, guild_create(100, &[], &[5]));
        updater.on_presence_update(0, presence_update(100, json!({"id": "5"}), "idle"));

        let reader = mirror.data_accessor();
        assert_eq!(reader.count_presences(), 0);
        assert_eq!(reader.count_members_in_guild(Id::new(100)), 1);
    }
}
