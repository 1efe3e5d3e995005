// ==============================================
// GUILD-SCOPED EXTRAS (integration)
// ==============================================
//
// Stickers, threads with their members, stage instances and scheduled
// events, from guild create through their own dispatches to guild delete.

mod common;

use mirrorkit::StateMirror;
use mirrorkit::dispatch::{GuildDelete, ThreadListSync};
use mirrorkit::model::{Channel, Id, Possible, ScheduledEvent, StageInstance, ThreadMember};
use serde_json::{Value, json};

use common::*;

fn thread(id: u64, parent_id: u64) -> Channel {
    decode(json!({
        "id": id.to_string(),
        "type": 11,
        "guild_id": "100",
        "parent_id": parent_id.to_string(),
        "name": format!("t{id}"),
        "owner_id": "5",
        "member_count": 1,
        "message_count": 0,
        "thread_metadata": {"archived": false, "auto_archive_duration": 60, "locked": false},
    }))
}

fn thread_member(thread_id: u64, user_id: u64) -> ThreadMember {
    decode(json!({
        "id": thread_id.to_string(),
        "user_id": user_id.to_string(),
        "join_timestamp": "2024-01-01T00:00:00Z",
        "flags": 0,
    }))
}

fn stage(channel_id: u64, topic: &str) -> StageInstance {
    decode(json!({
        "id": "70",
        "guild_id": "100",
        "channel_id": channel_id.to_string(),
        "topic": topic,
        "privacy_level": 2,
    }))
}

fn event(id: u64, name: &str) -> ScheduledEvent {
    decode(json!({
        "id": id.to_string(),
        "guild_id": "100",
        "name": name,
        "scheduled_start_time": "2024-06-01T18:00:00Z",
        "privacy_level": 2,
        "status": 1,
        "entity_type": 1,
        "description": "weekly",
    }))
}

fn event_user(event_id: u64, user_id: u64) -> Value {
    json!({
        "guild_scheduled_event_id": event_id.to_string(),
        "user_id": user_id.to_string(),
        "guild_id": "100",
    })
}

// ==============================================
// Guild Create
// ==============================================

mod guild_create {
    use super::*;

    #[test]
    fn every_extra_kind_is_stored() {
        let mirror = StateMirror::default();
        mirror.gateway_data_updater().on_guild_create(
            0,
            decode(json!({
                "id": "100",
                "name": "g",
                "owner_id": "1",
                "channels": [{"id": "10", "type": 0}, {"id": "13", "type": 13}],
                "threads": [{
                    "id": "20",
                    "type": 11,
                    "parent_id": "10",
                    "member_count": 2,
                    "thread_metadata": {"archived": false, "auto_archive_duration": 60},
                }],
                "stickers": [
                    {"id": "30", "name": "wave", "tags": "hello", "type": 2, "format_type": 1},
                ],
                "stage_instances": [
                    {"id": "70", "guild_id": "100", "channel_id": "13", "topic": "town hall"},
                ],
                "guild_scheduled_events": [
                    {"id": "80", "guild_id": "100", "name": "game night"},
                ],
            })),
        );

        let reader = mirror.data_accessor();
        let guild_id = Id::new(100);
        assert_eq!(
            reader.get_guild_by_id(guild_id).unwrap().stickers,
            vec![Id::new(30)]
        );
        assert_eq!(reader.count_stickers_in_guild(guild_id), 1);
        assert_eq!(
            reader.get_sticker_by_id(guild_id, Id::new(30)).unwrap().tags,
            "hello"
        );

        let threads = reader.get_threads_in_guild(guild_id);
        assert_eq!(threads.len(), 1);
        assert!(threads[0].is_thread());
        assert_eq!(threads[0].guild(), Some(guild_id));
        assert_eq!(threads[0].parent(), Some(Id::new(10)));
        // Threads are not listed among the regular channels.
        assert_eq!(reader.count_channels_in_guild(guild_id), 2);
        assert_eq!(reader.count_channels(), 3);

        let stage = reader.get_stage_instance_by_channel_id(Id::new(13)).unwrap();
        assert_eq!(stage.topic, "town hall");
        assert_eq!(reader.count_scheduled_events_in_guild(guild_id), 1);
        assert_eq!(
            reader
                .get_scheduled_event_by_id(guild_id, Id::new(80))
                .unwrap()
                .name,
            "game night"
        );
    }

    #[test]
    fn guild_delete_drops_threads_and_stages() {
        let mirror = StateMirror::default();
        let updater = mirror.gateway_data_updater();
        updater.on_guild_create(0, guild_create(100, &[10, 13], &[]));
        updater.on_thread_create(0, thread(20, 10));
        updater.on_thread_member_update(
            0,
            decode(json!({"guild_id": "100", "id": "20", "user_id": "5"})),
        );
        updater.on_message_create(0, message(1, 20));
        updater.on_stage_instance_create(0, stage(13, "t"));

        updater.on_guild_delete(
            0,
            GuildDelete {
                id: Id::new(100),
                unavailable: Possible::Unset,
            },
        );

        let reader = mirror.data_accessor();
        assert!(reader.get_channel_by_id(Id::new(20)).is_none());
        assert_eq!(reader.count_members_in_thread(Id::new(20)), 0);
        assert_eq!(reader.count_messages(), 0);
        assert!(reader.get_stage_instance_by_channel_id(Id::new(13)).is_none());
        assert_eq!(reader.count_scheduled_events_in_guild(Id::new(100)), 0);
    }
}

// ==============================================
// Stickers
// ==============================================

mod stickers {
    use super::*;

    #[test]
    fn update_returns_previous_set_then_replaces() {
        let mirror = StateMirror::default();
        let updater = mirror.gateway_data_updater();
        updater.on_guild_create(0, guild_create(100, &[], &[]));
        updater.on_guild_stickers_update(
            0,
            decode(json!({
                "guild_id": "100",
                "stickers": [{"id": "30", "name": "a"}, {"id": "31", "name": "b"}],
            })),
        );

        let mut previous = updater.on_guild_stickers_update(
            0,
            decode(json!({"guild_id": "100", "stickers": [{"id": "32", "name": "c"}]})),
        );
        previous.sort_by_key(|sticker| sticker.id);
        let ids: Vec<Id> = previous.iter().map(|sticker| sticker.id).collect();
        assert_eq!(ids, vec![Id::new(30), Id::new(31)]);

        let reader = mirror.data_accessor();
        assert_eq!(reader.count_stickers(), 1);
        assert_eq!(reader.get_stickers()[0].name, "c");
        assert_eq!(
            reader.get_guild_by_id(Id::new(100)).unwrap().stickers,
            vec![Id::new(32)]
        );
    }
}

// ==============================================
// Threads
// ==============================================

mod threads {
    use super::*;

    #[test]
    fn create_update_delete() {
        let mirror = StateMirror::default();
        let updater = mirror.gateway_data_updater();
        updater.on_guild_create(0, guild_create(100, &[10], &[]));
        updater.on_thread_create(0, thread(20, 10));
        updater.on_message_create(0, message(1, 20));

        let previous = updater
            .on_thread_update(
                0,
                decode(json!({
                    "id": "20",
                    "type": 11,
                    "guild_id": "100",
                    "name": "renamed",
                    "thread_metadata": {"archived": true, "auto_archive_duration": 60},
                })),
            )
            .unwrap();
        assert_eq!(previous.name, Possible::Present("t20".into()));

        let reader = mirror.data_accessor();
        let now = reader.get_channel_by_id(Id::new(20)).unwrap();
        assert!(now.thread_metadata.as_option().unwrap().archived);
        assert_eq!(now.owner_id, Possible::Present(Id::new(5)));

        let removed = updater
            .on_thread_delete(
                0,
                decode(json!({"id": "20", "guild_id": "100", "parent_id": "10", "type": 11})),
            )
            .unwrap();
        assert_eq!(removed.id, Id::new(20));
        assert!(reader.get_threads_in_guild(Id::new(100)).is_empty());
        assert_eq!(reader.count_messages_in_channel(Id::new(20)), 0);
        assert_eq!(reader.count_channels_in_guild(Id::new(100)), 1);
    }

    #[test]
    fn list_sync_replaces_threads_under_synced_parents() {
        let mirror = StateMirror::default();
        let updater = mirror.gateway_data_updater();
        updater.on_ready(ready(5, [0, 1]));
        updater.on_guild_create(0, guild_create(100, &[10, 11], &[]));
        updater.on_thread_create(0, thread(20, 10));
        updater.on_thread_create(0, thread(21, 11));

        let sync: ThreadListSync = decode(json!({
            "guild_id": "100",
            "channel_ids": ["10"],
            "threads": [{"id": "22", "type": 11, "parent_id": "10"}],
            "members": [{"id": "22", "join_timestamp": "2024-01-01T00:00:00Z"}],
        }));
        updater.on_thread_list_sync(0, sync);

        let reader = mirror.data_accessor();
        let mut ids: Vec<Id> = reader
            .get_threads_in_guild(Id::new(100))
            .into_iter()
            .map(|thread| thread.id)
            .collect();
        ids.sort();
        // 20 was under a synced parent and not listed; 21 was out of scope.
        assert_eq!(ids, vec![Id::new(21), Id::new(22)]);
        assert!(reader.get_channel_by_id(Id::new(20)).is_none());
        assert_eq!(
            reader.get_channel_by_id(Id::new(22)).unwrap().guild(),
            Some(Id::new(100))
        );
        // The membership named no user; it belongs to the current user.
        assert!(
            reader
                .get_thread_member_by_id(Id::new(22), Id::new(5))
                .is_some()
        );
    }

    #[test]
    fn members_update_adds_removes_and_counts() {
        let mirror = StateMirror::default();
        let updater = mirror.gateway_data_updater();
        updater.on_guild_create(0, guild_create(100, &[10], &[]));
        updater.on_thread_create(0, thread(20, 10));
        updater.on_thread_members_update(
            0,
            decode(json!({
                "id": "20",
                "guild_id": "100",
                "member_count": 2,
                "added_members": [
                    {"user_id": "5", "join_timestamp": "2024-01-01T00:00:00Z"},
                    {"id": "20", "user_id": "6", "join_timestamp": "2024-01-02T00:00:00Z"},
                ],
            })),
        );

        let reader = mirror.data_accessor();
        assert_eq!(reader.count_members_in_thread(Id::new(20)), 2);
        assert_eq!(
            reader.get_thread_member_by_id(Id::new(20), Id::new(5)),
            Some(thread_member(20, 5))
        );

        let previous = updater.on_thread_members_update(
            0,
            decode(json!({
                "id": "20",
                "guild_id": "100",
                "member_count": 1,
                "removed_member_ids": ["5"],
            })),
        );
        assert_eq!(previous.len(), 2);
        assert_eq!(
            reader
                .get_members_in_thread(Id::new(20))
                .into_iter()
                .map(|member| member.user())
                .collect::<Vec<_>>(),
            vec![Some(Id::new(6))]
        );
        assert_eq!(
            reader.get_channel_by_id(Id::new(20)).unwrap().member_count,
            Possible::Present(1)
        );
    }

    #[test]
    fn member_update_returns_previous_membership() {
        let mirror = StateMirror::default();
        let updater = mirror.gateway_data_updater();
        updater.on_thread_create(0, thread(20, 10));
        let first = updater.on_thread_member_update(
            0,
            decode(json!({
                "guild_id": "100",
                "id": "20",
                "user_id": "5",
                "join_timestamp": "2024-01-01T00:00:00Z",
                "flags": 0,
            })),
        );
        assert!(first.is_none());

        let previous = updater
            .on_thread_member_update(
                0,
                decode(json!({
                    "guild_id": "100",
                    "id": "20",
                    "user_id": "5",
                    "join_timestamp": "2024-01-01T00:00:00Z",
                    "flags": 2,
                })),
            )
            .unwrap();
        assert_eq!(previous, thread_member(20, 5));
        assert_eq!(
            mirror
                .data_accessor()
                .get_thread_member_by_id(Id::new(20), Id::new(5))
                .unwrap()
                .flags,
            2
        );
    }
}

// ==============================================
// Stage Instances
// ==============================================

mod stage_instances {
    use super::*;

    #[test]
    fn create_update_delete() {
        let mirror = StateMirror::default();
        let updater = mirror.gateway_data_updater();
        let reader = mirror.data_accessor();

        // Updating a stage that was never created changes nothing.
        assert!(updater.on_stage_instance_update(0, stage(13, "early")).is_none());
        assert!(reader.get_stage_instance_by_channel_id(Id::new(13)).is_none());

        updater.on_stage_instance_create(0, stage(13, "first"));
        let previous = updater
            .on_stage_instance_update(0, stage(13, "second"))
            .unwrap();
        assert_eq!(previous.topic, "first");
        assert_eq!(
            reader.get_stage_instance_by_channel_id(Id::new(13)).unwrap().topic,
            "second"
        );

        let removed = updater.on_stage_instance_delete(0, stage(13, "second")).unwrap();
        assert_eq!(removed.topic, "second");
        assert!(reader.get_stage_instance_by_channel_id(Id::new(13)).is_none());
    }
}

// ==============================================
// Scheduled Events
// ==============================================

mod scheduled_events {
    use super::*;

    #[test]
    fn create_update_delete() {
        let mirror = StateMirror::default();
        let updater = mirror.gateway_data_updater();
        let reader = mirror.data_accessor();
        updater.on_guild_create(0, guild_create(100, &[], &[]));

        assert!(updater.on_guild_scheduled_event_update(0, event(80, "early")).is_none());
        assert_eq!(reader.count_scheduled_events_in_guild(Id::new(100)), 0);

        updater.on_guild_scheduled_event_create(0, event(80, "game night"));
        let mut update = event(80, "movie night");
        update.description = Possible::Unset;
        let previous = updater.on_guild_scheduled_event_update(0, update).unwrap();
        assert_eq!(previous.name, "game night");

        let now = reader
            .get_scheduled_event_by_id(Id::new(100), Id::new(80))
            .unwrap();
        assert_eq!(now.name, "movie night");
        assert_eq!(now.description, Possible::Present("weekly".into()));

        let removed = updater
            .on_guild_scheduled_event_delete(0, event(80, "movie night"))
            .unwrap();
        assert_eq!(removed.name, "movie night");
        assert!(reader.get_scheduled_events_in_guild(Id::new(100)).is_empty());
    }

    #[test]
    fn interested_users_are_tracked_before_and_after_the_event() {
        let mirror = StateMirror::default();
        let updater = mirror.gateway_data_updater();
        let reader = mirror.data_accessor();
        updater.on_guild_create(0, guild_create(100, &[], &[]));

        updater.on_guild_scheduled_event_user_add(0, decode(event_user(80, 6)));
        assert_eq!(reader.count_scheduled_events_in_guild(Id::new(100)), 0);

        updater.on_guild_scheduled_event_create(0, event(80, "game night"));
        updater.on_guild_scheduled_event_user_add(0, decode(event_user(80, 5)));
        updater.on_guild_scheduled_event_user_add(0, decode(event_user(80, 5)));
        assert_eq!(
            reader.get_scheduled_event_users_in_event(Id::new(100), Id::new(80)),
            vec![Id::new(5), Id::new(6)]
        );

        updater.on_guild_scheduled_event_update(0, event(80, "renamed"));
        updater.on_guild_scheduled_event_user_remove(0, decode(event_user(80, 6)));
        assert_eq!(
            reader.get_scheduled_event_users_in_event(Id::new(100), Id::new(80)),
            vec![Id::new(5)]
        );
        assert!(
            reader
                .get_scheduled_event_users_in_event(Id::new(100), Id::new(81))
                .is_empty()
        );
    }
}
