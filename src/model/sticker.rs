use serde::Deserialize;

use crate::model::{Id, Merge, Possible, User};
use crate::store::traits::Keyed;

/// A guild sticker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sticker {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub pack_id: Possible<Id>,
    #[serde(default)]
    pub description: Possible<String>,
    /// Autocomplete keywords, comma separated.
    #[serde(default)]
    pub tags: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub format_type: u8,
    #[serde(default)]
    pub available: Possible<bool>,
    #[serde(default)]
    pub guild_id: Possible<Id>,
    #[serde(default)]
    pub user: Possible<User>,
    #[serde(default)]
    pub sort_value: Possible<u32>,
}

impl Merge for Sticker {
    fn merge(&self, update: &Self) -> Self {
        Self {
            pack_id: self.pack_id.merge(&update.pack_id),
            description: self.description.merge(&update.description),
            available: self.available.merge(&update.available),
            guild_id: self.guild_id.merge(&update.guild_id),
            user: self.user.merge(&update.user),
            sort_value: self.sort_value.merge(&update.sort_value),
            ..update.clone()
        }
    }
}

impl Keyed for Sticker {
    fn key(&self) -> Id {
        self.id
    }
}
