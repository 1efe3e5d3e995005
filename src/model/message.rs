//! Messages and their per-message reaction set.
//!
//! ## Architecture
//!
//! ```text
//!   StoredMessage
//!   ├── fields:    ArcSwap<Message>            (edits: RCU on the pointer)
//!   └── reactions: OnceCell<DashMap<EmojiKey, Reaction>>
//!                  │
//!                  └── allocated on first reaction, one entry per emoji;
//!                      each entry mutates under its own map shard lock
//! ```
//!
//! Reaction changes never touch `fields`, and edits never touch
//! `reactions`, so the two can race freely. [`StoredMessage::snapshot`]
//! stitches them back together into a plain [`Message`]. Every mutation
//! returns the message as it stood right before that mutation: the replaced
//! fields for an edit, the one changed reaction entry put back for a
//! reaction change.

use std::collections::BTreeMap;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::OnceCell;
use rustc_hash::FxBuildHasher;
use serde::Deserialize;

use crate::model::{EmojiKey, Id, Merge, Possible, ReactionEmoji, User};
use crate::store::traits::Keyed;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    pub id: Id,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content_type: Possible<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reaction {
    pub count: u32,
    /// Whether the current user is one of the reactors.
    #[serde(default)]
    pub me: bool,
    pub emoji: ReactionEmoji,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub id: Id,
    pub channel_id: Id,
    #[serde(default)]
    pub guild_id: Possible<Id>,
    pub author: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub edited_timestamp: Possible<String>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub mention_everyone: bool,
    #[serde(default)]
    pub mentions: Vec<User>,
    #[serde(default)]
    pub mention_roles: Vec<Id>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub webhook_id: Possible<Id>,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub flags: Possible<u64>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Merge for Message {
    fn merge(&self, update: &Self) -> Self {
        Self {
            guild_id: self.guild_id.merge(&update.guild_id),
            edited_timestamp: self.edited_timestamp.merge(&update.edited_timestamp),
            webhook_id: self.webhook_id.merge(&update.webhook_id),
            flags: self.flags.merge(&update.flags),
            ..update.clone()
        }
    }
}

impl Keyed for Message {
    fn key(&self) -> Id {
        self.id
    }
}

/// A message edit. Every field except the keys may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartialMessage {
    pub id: Id,
    pub channel_id: Id,
    #[serde(default)]
    pub guild_id: Possible<Id>,
    #[serde(default)]
    pub author: Possible<User>,
    #[serde(default)]
    pub content: Possible<String>,
    #[serde(default)]
    pub edited_timestamp: Possible<String>,
    #[serde(default)]
    pub tts: Possible<bool>,
    #[serde(default)]
    pub mention_everyone: Possible<bool>,
    #[serde(default)]
    pub mentions: Possible<Vec<User>>,
    #[serde(default)]
    pub mention_roles: Possible<Vec<Id>>,
    #[serde(default)]
    pub attachments: Possible<Vec<Attachment>>,
    #[serde(default)]
    pub pinned: Possible<bool>,
    #[serde(default)]
    pub flags: Possible<u64>,
}

impl Message {
    /// Applies an edit to this message.
    #[must_use]
    pub fn apply(&self, edit: &PartialMessage) -> Self {
        Self {
            id: self.id,
            channel_id: self.channel_id,
            guild_id: self.guild_id.merge(&edit.guild_id),
            author: edit.author.apply_to(&self.author),
            content: edit.content.apply_to(&self.content),
            timestamp: self.timestamp.clone(),
            edited_timestamp: self.edited_timestamp.merge(&edit.edited_timestamp),
            tts: edit.tts.apply_to(&self.tts),
            mention_everyone: edit.mention_everyone.apply_to(&self.mention_everyone),
            mentions: edit.mentions.apply_to(&self.mentions),
            mention_roles: edit.mention_roles.apply_to(&self.mention_roles),
            attachments: edit.attachments.apply_to(&self.attachments),
            pinned: edit.pinned.apply_to(&self.pinned),
            webhook_id: self.webhook_id.clone(),
            kind: self.kind,
            flags: self.flags.merge(&edit.flags),
            reactions: self.reactions.clone(),
        }
    }
}

type ReactionMap = DashMap<EmojiKey, Reaction, FxBuildHasher>;

/// A cached message whose edits and reactions mutate independently.
#[derive(Debug)]
pub struct StoredMessage {
    fields: ArcSwap<Message>,
    reactions: OnceCell<ReactionMap>,
}

impl StoredMessage {
    pub fn new(mut message: Message) -> Self {
        let reactions = std::mem::take(&mut message.reactions);
        let stored = Self {
            fields: ArcSwap::from_pointee(message),
            reactions: OnceCell::new(),
        };
        if !reactions.is_empty() {
            let map = stored.reaction_map();
            for reaction in reactions {
                if let Some(key) = reaction.emoji.key() {
                    map.insert(key, reaction);
                }
            }
        }
        stored
    }

    pub fn id(&self) -> Id {
        self.fields.load().id
    }

    fn reaction_map(&self) -> &ReactionMap {
        self.reactions
            .get_or_init(|| DashMap::with_hasher(FxBuildHasher))
    }

    fn reaction_entries(&self) -> BTreeMap<EmojiKey, Reaction> {
        self.reactions
            .get()
            .map(|map| {
                map.iter()
                    .map(|entry| (entry.key().clone(), entry.value().clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The current message with the entry at `key` put back to `previous`.
    fn before_change(&self, key: EmojiKey, previous: Option<Reaction>) -> Message {
        let mut entries = self.reaction_entries();
        match previous {
            Some(reaction) => entries.insert(key, reaction),
            None => entries.remove(&key),
        };
        assemble(&self.fields.load(), entries)
    }

    /// Returns the message with its current reactions, ordered by emoji key.
    pub fn snapshot(&self) -> Message {
        assemble(&self.fields.load(), self.reaction_entries())
    }

    /// Applies an edit. Returns the message as the edit found it, with the
    /// reactions current at the time of the call.
    pub fn edit(&self, edit: &PartialMessage) -> Message {
        let replaced = self.fields.rcu(|current| current.apply(edit));
        assemble(&replaced, self.reaction_entries())
    }

    /// Counts one more reactor for `emoji`. Returns the message as it was
    /// before.
    pub fn add_reaction(&self, emoji: &ReactionEmoji, by_self: bool) -> Message {
        let Some(key) = emoji.key() else {
            return self.snapshot();
        };
        let previous = match self.reaction_map().entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let before = entry.get().clone();
                let reaction = entry.get_mut();
                reaction.count += 1;
                reaction.me |= by_self;
                Some(before)
            },
            Entry::Vacant(entry) => {
                entry.insert(Reaction {
                    count: 1,
                    me: by_self,
                    emoji: emoji.clone(),
                });
                None
            },
        };
        self.before_change(key, previous)
    }

    /// Counts one less reactor for `emoji`; the entry goes away at zero.
    /// Returns the message as it was before.
    pub fn remove_reaction(&self, emoji: &ReactionEmoji, by_self: bool) -> Message {
        let (Some(key), Some(map)) = (emoji.key(), self.reactions.get()) else {
            return self.snapshot();
        };
        let previous = match map.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let before = entry.get().clone();
                if before.count <= 1 {
                    entry.remove();
                } else {
                    let reaction = entry.get_mut();
                    reaction.count -= 1;
                    reaction.me = reaction.me && !by_self;
                }
                before
            },
            Entry::Vacant(_) => return self.snapshot(),
        };
        self.before_change(key, Some(previous))
    }

    /// Drops every reaction for one emoji. Returns the message as it was
    /// before.
    pub fn remove_emoji(&self, emoji: &ReactionEmoji) -> Message {
        let removed = match (emoji.key(), self.reactions.get()) {
            (Some(key), Some(map)) => map.remove(&key),
            _ => None,
        };
        match removed {
            Some((key, reaction)) => self.before_change(key, Some(reaction)),
            None => self.snapshot(),
        }
    }

    /// Drops all reactions. Returns the message with exactly the reactions
    /// this call removed.
    pub fn clear_reactions(&self) -> Message {
        let mut drained = BTreeMap::new();
        if let Some(map) = self.reactions.get() {
            loop {
                let keys: Vec<EmojiKey> = map.iter().map(|entry| entry.key().clone()).collect();
                if keys.is_empty() {
                    break;
                }
                for key in keys {
                    if let Some((key, reaction)) = map.remove(&key) {
                        drained.insert(key, reaction);
                    }
                }
            }
        }
        assemble(&self.fields.load(), drained)
    }
}

fn assemble(fields: &Message, reactions: BTreeMap<EmojiKey, Reaction>) -> Message {
    let mut message = fields.clone();
    message.reactions = reactions.into_values().collect();
    message
}
