use serde::Deserialize;

use crate::model::{Id, Merge, Possible};
use crate::store::traits::Keyed;

/// A guild as stored by the mirror.
///
/// Nested entities live in the guild's own stores; the guild value only
/// keeps their ids. Those id lists are never decoded from a payload: an
/// update leaves them to the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Guild {
    pub id: Id,
    pub name: String,
    pub owner_id: Id,
    #[serde(default)]
    pub icon: Possible<String>,
    #[serde(default)]
    pub afk_channel_id: Possible<Id>,
    #[serde(default)]
    pub system_channel_id: Possible<Id>,
    #[serde(default)]
    pub verification_level: Possible<u8>,
    #[serde(default)]
    pub premium_tier: Possible<u8>,
    #[serde(default)]
    pub premium_subscription_count: Possible<u32>,
    #[serde(default)]
    pub member_count: Possible<u64>,
    #[serde(default)]
    pub large: Possible<bool>,
    #[serde(default)]
    pub unavailable: Possible<bool>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(skip)]
    pub roles: Vec<Id>,
    #[serde(skip)]
    pub emojis: Vec<Id>,
    #[serde(skip)]
    pub stickers: Vec<Id>,
    #[serde(skip)]
    pub channels: Vec<Id>,
    #[serde(skip)]
    pub members: Vec<Id>,
}

/// Appends `id` unless it is already listed.
pub(crate) fn push_unique(ids: &mut Vec<Id>, id: Id) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

impl Guild {
    #[must_use]
    pub fn with_channel(&self, channel_id: Id) -> Self {
        let mut next = self.clone();
        push_unique(&mut next.channels, channel_id);
        next
    }

    #[must_use]
    pub fn without_channel(&self, channel_id: Id) -> Self {
        let mut next = self.clone();
        next.channels.retain(|id| *id != channel_id);
        next
    }

    #[must_use]
    pub fn with_role(&self, role_id: Id) -> Self {
        let mut next = self.clone();
        push_unique(&mut next.roles, role_id);
        next
    }

    #[must_use]
    pub fn without_role(&self, role_id: Id) -> Self {
        let mut next = self.clone();
        next.roles.retain(|id| *id != role_id);
        next
    }

    /// Adds members to the id list, bumping `member_count` for ids that
    /// were not listed yet when `count_joins` is set.
    #[must_use]
    pub fn with_members(&self, member_ids: &[Id], count_joins: bool) -> Self {
        let mut next = self.clone();
        let mut joined = 0u64;
        for id in member_ids {
            if !next.members.contains(id) {
                next.members.push(*id);
                joined += 1;
            }
        }
        if count_joins && joined > 0 {
            if let Possible::Present(count) = next.member_count {
                next.member_count = Possible::Present(count + joined);
            }
        }
        next
    }

    #[must_use]
    pub fn without_member(&self, member_id: Id) -> Self {
        let mut next = self.clone();
        let before = next.members.len();
        next.members.retain(|id| *id != member_id);
        if next.members.len() < before {
            if let Possible::Present(count) = next.member_count {
                next.member_count = Possible::Present(count.saturating_sub(1));
            }
        }
        next
    }

    #[must_use]
    pub fn with_emojis(&self, emoji_ids: Vec<Id>) -> Self {
        Self {
            emojis: emoji_ids,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_stickers(&self, sticker_ids: Vec<Id>) -> Self {
        Self {
            stickers: sticker_ids,
            ..self.clone()
        }
    }
}

impl Merge for Guild {
    fn merge(&self, update: &Self) -> Self {
        Self {
            id: update.id,
            name: update.name.clone(),
            owner_id: update.owner_id,
            icon: self.icon.merge(&update.icon),
            afk_channel_id: self.afk_channel_id.merge(&update.afk_channel_id),
            system_channel_id: self.system_channel_id.merge(&update.system_channel_id),
            verification_level: self.verification_level.merge(&update.verification_level),
            premium_tier: self.premium_tier.merge(&update.premium_tier),
            premium_subscription_count: self
                .premium_subscription_count
                .merge(&update.premium_subscription_count),
            member_count: self.member_count.merge(&update.member_count),
            large: self.large.merge(&update.large),
            unavailable: self.unavailable.merge(&update.unavailable),
            features: update.features.clone(),
            roles: self.roles.clone(),
            emojis: self.emojis.clone(),
            stickers: self.stickers.clone(),
            channels: self.channels.clone(),
            members: self.members.clone(),
        }
    }
}

impl Keyed for Guild {
    fn key(&self) -> Id {
        self.id
    }
}
