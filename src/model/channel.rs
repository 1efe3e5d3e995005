use serde::Deserialize;

use crate::model::thread::THREAD_KINDS;
use crate::model::{Id, Merge, Possible, ThreadMetadata};
use crate::store::traits::Keyed;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PermissionOverwrite {
    pub id: Id,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub allow: String,
    #[serde(default)]
    pub deny: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    pub id: Id,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub guild_id: Possible<Id>,
    #[serde(default)]
    pub position: Possible<i32>,
    #[serde(default)]
    pub name: Possible<String>,
    #[serde(default)]
    pub topic: Possible<String>,
    #[serde(default)]
    pub nsfw: Possible<bool>,
    #[serde(default)]
    pub last_message_id: Possible<Id>,
    #[serde(default)]
    pub bitrate: Possible<u32>,
    #[serde(default)]
    pub user_limit: Possible<u32>,
    #[serde(default)]
    pub rate_limit_per_user: Possible<u32>,
    #[serde(default)]
    pub parent_id: Possible<Id>,
    #[serde(default)]
    pub permission_overwrites: Possible<Vec<PermissionOverwrite>>,
    /// Threads only: the user who started it.
    #[serde(default)]
    pub owner_id: Possible<Id>,
    #[serde(default)]
    pub message_count: Possible<u32>,
    #[serde(default)]
    pub member_count: Possible<u32>,
    #[serde(default)]
    pub thread_metadata: Possible<ThreadMetadata>,
}

impl Channel {
    /// Returns the owning guild, if the channel belongs to one.
    pub fn guild(&self) -> Option<Id> {
        self.guild_id.as_option().copied()
    }

    pub fn is_thread(&self) -> bool {
        THREAD_KINDS.contains(&self.kind)
    }

    /// The channel a thread hangs off.
    pub fn parent(&self) -> Option<Id> {
        self.parent_id.as_option().copied()
    }
}

impl Merge for Channel {
    fn merge(&self, update: &Self) -> Self {
        Self {
            id: update.id,
            kind: update.kind,
            guild_id: self.guild_id.merge(&update.guild_id),
            position: self.position.merge(&update.position),
            name: self.name.merge(&update.name),
            topic: self.topic.merge(&update.topic),
            nsfw: self.nsfw.merge(&update.nsfw),
            last_message_id: self.last_message_id.merge(&update.last_message_id),
            bitrate: self.bitrate.merge(&update.bitrate),
            user_limit: self.user_limit.merge(&update.user_limit),
            rate_limit_per_user: self.rate_limit_per_user.merge(&update.rate_limit_per_user),
            parent_id: self.parent_id.merge(&update.parent_id),
            permission_overwrites: self
                .permission_overwrites
                .merge(&update.permission_overwrites),
            owner_id: self.owner_id.merge(&update.owner_id),
            message_count: self.message_count.merge(&update.message_count),
            member_count: self.member_count.merge(&update.member_count),
            thread_metadata: self.thread_metadata.merge(&update.thread_metadata),
        }
    }
}

impl Keyed for Channel {
    fn key(&self) -> Id {
        self.id
    }
}
