//! Dispatch throughput benchmarks.
//!
//! Run with: `cargo bench --bench dispatch`
//!
//! Payloads are decoded before timing starts, so the numbers cover only the
//! mirror update and read paths.

use std::hint::black_box;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use mirrorkit::dispatch::{GuildCreate, GuildMemberAdd, MessageReaction, PresenceUpdate};
use mirrorkit::model::{Id, Message, ReactionEmoji};
use mirrorkit::{StateMirror, StoreConfig};
use serde_json::{Value, json};

const OPS: u64 = 10_000;
const MEMBERS: u64 = 1_000;

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("bench payload decodes")
}

fn guild_create(id: u64, members: u64) -> GuildCreate {
    let members: Vec<Value> = (0..members)
        .map(|m| json!({"user": {"id": m.to_string(), "username": format!("u{m}")}, "roles": []}))
        .collect();
    decode(json!({
        "id": id.to_string(),
        "name": "bench",
        "owner_id": "0",
        "member_count": members.len(),
        "channels": [{"id": "10", "type": 0, "name": "general"}],
        "members": members,
    }))
}

fn messages(count: u64) -> Vec<Message> {
    (0..count)
        .map(|id| {
            decode(json!({
                "id": id.to_string(),
                "channel_id": "10",
                "guild_id": "100",
                "author": {"id": (id % MEMBERS).to_string(), "username": "author"},
                "content": "benchmark message",
            }))
        })
        .collect()
}

fn reactions(count: u64) -> Vec<MessageReaction> {
    (0..count)
        .map(|user_id| MessageReaction {
            user_id: Id::new(user_id),
            channel_id: Id::new(10),
            message_id: Id::new(0),
            guild_id: Default::default(),
            emoji: ReactionEmoji::unicode(if user_id % 2 == 0 { "🔥" } else { "👀" }),
        })
        .collect()
}

fn presence(user_id: u64, status: &str) -> PresenceUpdate {
    decode(json!({
        "guild_id": "100",
        "user": {"id": user_id.to_string()},
        "status": status,
    }))
}

// ============================================================================
// Guild Create
// ============================================================================

fn bench_guild_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("guild_create");
    group.throughput(Throughput::Elements(MEMBERS));
    let payload = guild_create(100, MEMBERS);

    group.bench_function("1k_members", |b| {
        b.iter_custom(|iters| {
            let mut total = Duration::ZERO;
            for _ in 0..iters {
                let mirror = StateMirror::default();
                let payload = payload.clone();
                let start = Instant::now();
                mirror.gateway_data_updater().on_guild_create(0, payload);
                total += start.elapsed();
                black_box(&mirror);
            }
            total
        })
    });

    group.finish();
}

// ============================================================================
// Message Path
// ============================================================================

fn bench_messages(c: &mut Criterion) {
    let mut group = c.benchmark_group("messages");
    group.throughput(Throughput::Elements(OPS));
    let created = messages(OPS);
    let reacted = reactions(OPS);

    group.bench_function("create_bounded_1000", |b| {
        b.iter_custom(|iters| {
            let mut total = Duration::ZERO;
            for _ in 0..iters {
                let mirror = StateMirror::default();
                let batch = created.clone();
                let start = Instant::now();
                for message in batch {
                    mirror.gateway_data_updater().on_message_create(0, message);
                }
                total += start.elapsed();
            }
            total
        })
    });

    group.bench_function("reaction_add_hot_message", |b| {
        b.iter_custom(|iters| {
            let mut total = Duration::ZERO;
            for _ in 0..iters {
                let mirror = StateMirror::default();
                mirror
                    .gateway_data_updater()
                    .on_message_create(0, created[0].clone());
                let batch = reacted.clone();
                let start = Instant::now();
                for reaction in batch {
                    black_box(mirror.gateway_data_updater().on_message_reaction_add(0, reaction));
                }
                total += start.elapsed();
            }
            total
        })
    });

    group.finish();
}

// ============================================================================
// Member Path
// ============================================================================

fn bench_members(c: &mut Criterion) {
    let mut group = c.benchmark_group("members");
    group.throughput(Throughput::Elements(OPS));
    let joins: Vec<GuildMemberAdd> = (MEMBERS..MEMBERS + OPS)
        .map(|id| {
            decode(json!({
                "guild_id": "100",
                "user": {"id": id.to_string(), "username": format!("u{id}")},
                "roles": [],
            }))
        })
        .collect();

    group.bench_function("member_add", |b| {
        b.iter_custom(|iters| {
            let mut total = Duration::ZERO;
            for _ in 0..iters {
                let mirror = StateMirror::default();
                mirror
                    .gateway_data_updater()
                    .on_guild_create(0, guild_create(100, MEMBERS));
                let batch = joins.clone();
                let start = Instant::now();
                for join in batch {
                    mirror.gateway_data_updater().on_guild_member_add(0, join);
                }
                total += start.elapsed();
            }
            total
        })
    });

    let mirror = StateMirror::default();
    mirror
        .gateway_data_updater()
        .on_guild_create(0, guild_create(100, MEMBERS));
    group.bench_function("get_member_by_id", |b| {
        b.iter(|| {
            let reader = mirror.data_accessor();
            for i in 0..OPS {
                black_box(reader.get_member_by_id(Id::new(100), Id::new(i % MEMBERS)));
            }
        })
    });

    group.finish();
}

// ============================================================================
// Concurrent Presence Updates
// ============================================================================

fn bench_concurrent_presences(c: &mut Criterion) {
    let mut group = c.benchmark_group("presence_update_concurrent");
    group.sample_size(20);

    for threads in [1usize, 2, 4, 8] {
        group.throughput(Throughput::Elements(OPS * threads as u64));
        let updates: Arc<Vec<PresenceUpdate>> = Arc::new(
            (0..OPS)
                .map(|i| presence(i % MEMBERS, if i % 3 == 0 { "idle" } else { "online" }))
                .collect(),
        );

        group.bench_function(format!("{threads}_threads"), |b| {
            b.iter_custom(|iters| {
                let mut total = Duration::ZERO;
                for _ in 0..iters {
                    let mirror = Arc::new(StateMirror::new(StoreConfig::default()));
                    mirror
                        .gateway_data_updater()
                        .on_guild_create(0, guild_create(100, MEMBERS));
                    let barrier = Arc::new(Barrier::new(threads + 1));
                    let handles: Vec<_> = (0..threads)
                        .map(|_| {
                            let mirror = mirror.clone();
                            let barrier = barrier.clone();
                            let updates = updates.clone();
                            thread::spawn(move || {
                                barrier.wait();
                                for update in updates.iter() {
                                    black_box(
                                        mirror
                                            .gateway_data_updater()
                                            .on_presence_update(0, update.clone()),
                                    );
                                }
                            })
                        })
                        .collect();
                    barrier.wait();
                    let start = Instant::now();
                    for handle in handles {
                        handle.join().expect("bench thread panicked");
                    }
                    total += start.elapsed();
                }
                total
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_guild_create,
    bench_messages,
    bench_members,
    bench_concurrent_presences
);
criterion_main!(benches);
