use serde::Deserialize;

use crate::model::{Id, Merge, Possible};

/// A live stage, keyed by its stage channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StageInstance {
    pub id: Id,
    pub guild_id: Id,
    pub channel_id: Id,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub privacy_level: u8,
    #[serde(default)]
    pub discoverable_disabled: Possible<bool>,
    #[serde(default)]
    pub guild_scheduled_event_id: Possible<Id>,
}

impl Merge for StageInstance {
    fn merge(&self, update: &Self) -> Self {
        Self {
            discoverable_disabled: self.discoverable_disabled.merge(&update.discoverable_disabled),
            guild_scheduled_event_id: self
                .guild_scheduled_event_id
                .merge(&update.guild_scheduled_event_id),
            ..update.clone()
        }
    }
}
