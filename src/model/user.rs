//! Users and the shared user slot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;

use crate::model::{Id, Merge, Possible};
use crate::store::traits::Keyed;

/// Discriminator used by accounts migrated to unique usernames.
pub const DEFAULT_DISCRIMINATOR: &str = "0";

fn default_discriminator() -> String {
    DEFAULT_DISCRIMINATOR.to_string()
}

/// A full user record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    #[serde(default = "default_discriminator")]
    pub discriminator: String,
    #[serde(default)]
    pub global_name: Possible<String>,
    #[serde(default)]
    pub avatar: Possible<String>,
    #[serde(default)]
    pub banner: Possible<String>,
    #[serde(default)]
    pub accent_color: Possible<u32>,
    #[serde(default)]
    pub bot: Possible<bool>,
}

impl User {
    /// An id-only placeholder, used where a stored entity must not carry
    /// a private copy of the user.
    pub fn stub(id: Id) -> Self {
        Self {
            id,
            username: String::new(),
            discriminator: default_discriminator(),
            global_name: Possible::Unset,
            avatar: Possible::Unset,
            banner: Possible::Unset,
            accent_color: Possible::Unset,
            bot: Possible::Unset,
        }
    }

    /// Returns `true` for placeholders built by [`User::stub`].
    pub fn is_stub(&self) -> bool {
        self.username.is_empty()
    }

    /// Applies the fields carried by a partial user.
    #[must_use]
    pub fn apply(&self, patch: &PartialUser) -> Self {
        Self {
            id: self.id,
            username: patch.username.apply_to(&self.username),
            discriminator: patch.discriminator.apply_to(&self.discriminator),
            global_name: self.global_name.merge(&patch.global_name),
            avatar: self.avatar.merge(&patch.avatar),
            banner: self.banner.merge(&patch.banner),
            accent_color: self.accent_color.merge(&patch.accent_color),
            bot: self.bot.merge(&patch.bot),
        }
    }
}

impl Merge for User {
    fn merge(&self, update: &Self) -> Self {
        self.apply(&PartialUser::from(update))
    }
}

impl Keyed for User {
    fn key(&self) -> Id {
        self.id
    }
}

/// A user as embedded in presence updates: only `id` is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PartialUser {
    pub id: Id,
    #[serde(default)]
    pub username: Possible<String>,
    #[serde(default)]
    pub discriminator: Possible<String>,
    #[serde(default)]
    pub global_name: Possible<String>,
    #[serde(default)]
    pub avatar: Possible<String>,
    #[serde(default)]
    pub banner: Possible<String>,
    #[serde(default)]
    pub accent_color: Possible<u32>,
    #[serde(default)]
    pub bot: Possible<bool>,
}

impl PartialUser {
    pub fn stub(id: Id) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Builds a full user when the partial carries a username.
    pub fn to_user(&self) -> Option<User> {
        let username = self.username.as_option()?.clone();
        Some(User {
            id: self.id,
            username,
            discriminator: self
                .discriminator
                .as_option()
                .cloned()
                .unwrap_or_else(default_discriminator),
            global_name: self.global_name.clone(),
            avatar: self.avatar.clone(),
            banner: self.banner.clone(),
            accent_color: self.accent_color,
            bot: self.bot,
        })
    }
}

impl Merge for PartialUser {
    fn merge(&self, update: &Self) -> Self {
        Self {
            id: update.id,
            username: self.username.merge(&update.username),
            discriminator: self.discriminator.merge(&update.discriminator),
            global_name: self.global_name.merge(&update.global_name),
            avatar: self.avatar.merge(&update.avatar),
            banner: self.banner.merge(&update.banner),
            accent_color: self.accent_color.merge(&update.accent_color),
            bot: self.bot.merge(&update.bot),
        }
    }
}

impl From<&User> for PartialUser {
    fn from(user: &User) -> Self {
        if user.is_stub() {
            return Self::stub(user.id);
        }
        Self {
            id: user.id,
            username: Possible::Present(user.username.clone()),
            discriminator: Possible::Present(user.discriminator.clone()),
            global_name: user.global_name.clone(),
            avatar: user.avatar.clone(),
            banner: user.banner.clone(),
            accent_color: user.accent_color,
            bot: user.bot,
        }
    }
}

/// The shared, mutable slot for one user.
///
/// Members, presences and the self-user reference hold an `Arc<UserRef>`;
/// the user table only holds a `Weak`. All writers go through [`merge`],
/// which is an RCU loop on the inner pointer.
///
/// [`merge`]: UserRef::merge
#[derive(Debug)]
pub struct UserRef {
    id: Id,
    current: ArcSwap<User>,
}

impl UserRef {
    pub fn new(user: User) -> Self {
        Self {
            id: user.id,
            current: ArcSwap::from_pointee(user),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns a snapshot of the current user.
    pub fn load(&self) -> Arc<User> {
        self.current.load_full()
    }

    /// Returns an owned copy of the current user.
    pub fn get(&self) -> User {
        User::clone(&self.current.load())
    }

    /// Merges a partial user into the slot. Returns the value it replaced.
    pub fn merge(&self, patch: &PartialUser) -> Arc<User> {
        self.current.rcu(|current| current.apply(patch))
    }

    /// Merges a full user into the slot. Returns the value it replaced.
    pub fn merge_user(&self, user: &User) -> Arc<User> {
        self.current.rcu(|current| current.merge(user))
    }
}
