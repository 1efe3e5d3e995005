use serde::Deserialize;

use crate::model::{Id, Merge, Possible, User};
use crate::store::traits::Keyed;

/// A scheduled guild event. Interested users are tracked by the mirror
/// next to the event, not in this record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduledEvent {
    pub id: Id,
    pub guild_id: Id,
    pub name: String,
    #[serde(default)]
    pub channel_id: Possible<Id>,
    #[serde(default)]
    pub creator_id: Possible<Id>,
    #[serde(default)]
    pub description: Possible<String>,
    #[serde(default)]
    pub scheduled_start_time: String,
    #[serde(default)]
    pub scheduled_end_time: Possible<String>,
    #[serde(default)]
    pub privacy_level: u8,
    #[serde(default)]
    pub status: u8,
    #[serde(default)]
    pub entity_type: u8,
    #[serde(default)]
    pub entity_id: Possible<Id>,
    #[serde(default)]
    pub creator: Possible<User>,
    #[serde(default)]
    pub user_count: Possible<u32>,
    #[serde(default)]
    pub image: Possible<String>,
}

impl Merge for ScheduledEvent {
    fn merge(&self, update: &Self) -> Self {
        Self {
            channel_id: self.channel_id.merge(&update.channel_id),
            creator_id: self.creator_id.merge(&update.creator_id),
            description: self.description.merge(&update.description),
            scheduled_end_time: self.scheduled_end_time.merge(&update.scheduled_end_time),
            entity_id: self.entity_id.merge(&update.entity_id),
            creator: self.creator.merge(&update.creator),
            user_count: self.user_count.merge(&update.user_count),
            image: self.image.merge(&update.image),
            ..update.clone()
        }
    }
}

impl Keyed for ScheduledEvent {
    fn key(&self) -> Id {
        self.id
    }
}
