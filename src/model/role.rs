use serde::Deserialize;

use crate::model::{Id, Merge, Possible};
use crate::store::traits::Keyed;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Role {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub position: i32,
    /// Permission bit set, kept as the decimal string the gateway sends.
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub mentionable: bool,
    #[serde(default)]
    pub icon: Possible<String>,
    #[serde(default)]
    pub unicode_emoji: Possible<String>,
}

impl Merge for Role {
    fn merge(&self, update: &Self) -> Self {
        Self {
            icon: self.icon.merge(&update.icon),
            unicode_emoji: self.unicode_emoji.merge(&update.unicode_emoji),
            ..update.clone()
        }
    }
}

impl Keyed for Role {
    fn key(&self) -> Id {
        self.id
    }
}
