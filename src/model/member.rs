use serde::Deserialize;

use crate::model::{Id, Merge, PartialUser, Possible, User};
use crate::store::user_linked::UserLinked;

/// A guild member. Stored detached from its user; see [`UserLinked`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub nick: Possible<String>,
    #[serde(default)]
    pub roles: Vec<Id>,
    #[serde(default)]
    pub joined_at: Possible<String>,
    #[serde(default)]
    pub premium_since: Possible<String>,
    #[serde(default)]
    pub deaf: Possible<bool>,
    #[serde(default)]
    pub mute: Possible<bool>,
    #[serde(default)]
    pub pending: Possible<bool>,
}

impl Member {
    /// Returns a copy with `role_id` removed from the role list.
    #[must_use]
    pub fn without_role(&self, role_id: Id) -> Self {
        Self {
            roles: self.roles.iter().copied().filter(|r| *r != role_id).collect(),
            ..self.clone()
        }
    }
}

impl Merge for Member {
    fn merge(&self, update: &Self) -> Self {
        Self {
            user: self.user.merge(&update.user),
            nick: self.nick.merge(&update.nick),
            roles: update.roles.clone(),
            joined_at: self.joined_at.merge(&update.joined_at),
            premium_since: self.premium_since.merge(&update.premium_since),
            deaf: self.deaf.merge(&update.deaf),
            mute: self.mute.merge(&update.mute),
            pending: self.pending.merge(&update.pending),
        }
    }
}

impl UserLinked for Member {
    fn user_id(&self) -> Id {
        self.user.id
    }

    fn user_patch(&self) -> PartialUser {
        PartialUser::from(&self.user)
    }

    fn initial_user(&self) -> Option<User> {
        (!self.user.is_stub()).then(|| self.user.clone())
    }

    fn detached(&self) -> Self {
        Self {
            user: User::stub(self.user.id),
            ..self.clone()
        }
    }

    fn attached(&self, user: &User) -> Self {
        Self {
            user: user.clone(),
            ..self.clone()
        }
    }
}
