use serde::Deserialize;

use crate::model::{Id, Merge, Possible, User};
use crate::store::traits::Keyed;

/// A custom guild emoji.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Emoji {
    pub id: Id,
    #[serde(default)]
    pub name: Possible<String>,
    #[serde(default)]
    pub roles: Vec<Id>,
    #[serde(default)]
    pub user: Possible<User>,
    #[serde(default)]
    pub require_colons: Possible<bool>,
    #[serde(default)]
    pub managed: Possible<bool>,
    #[serde(default)]
    pub animated: Possible<bool>,
    #[serde(default)]
    pub available: Possible<bool>,
}

impl Merge for Emoji {
    fn merge(&self, update: &Self) -> Self {
        Self {
            id: update.id,
            name: self.name.merge(&update.name),
            roles: update.roles.clone(),
            user: self.user.merge(&update.user),
            require_colons: self.require_colons.merge(&update.require_colons),
            managed: self.managed.merge(&update.managed),
            animated: self.animated.merge(&update.animated),
            available: self.available.merge(&update.available),
        }
    }
}

impl Keyed for Emoji {
    fn key(&self) -> Id {
        self.id
    }
}

/// The emoji attached to a reaction: either a custom emoji (with an id) or a
/// unicode emoji (name only).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReactionEmoji {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: Possible<bool>,
}

impl ReactionEmoji {
    pub fn unicode(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            animated: Possible::Unset,
        }
    }

    pub fn custom(id: Id, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: Some(name.into()),
            animated: Possible::Unset,
        }
    }

    /// Key used to group reactions: the id when there is one, the name
    /// otherwise. `None` when the emoji carries neither.
    pub fn key(&self) -> Option<EmojiKey> {
        match (&self.id, &self.name) {
            (Some(id), _) => Some(EmojiKey::Id(*id)),
            (None, Some(name)) => Some(EmojiKey::Name(name.clone())),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmojiKey {
    Id(Id),
    Name(String),
}
