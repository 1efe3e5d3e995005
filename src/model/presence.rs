use serde::Deserialize;

use crate::model::{Id, Merge, PartialUser, Possible, User};
use crate::store::user_linked::UserLinked;

fn default_status() -> String {
    "offline".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub url: Possible<String>,
    #[serde(default)]
    pub state: Possible<String>,
    #[serde(default)]
    pub details: Possible<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientStatus {
    #[serde(default)]
    pub desktop: Possible<String>,
    #[serde(default)]
    pub mobile: Possible<String>,
    #[serde(default)]
    pub web: Possible<String>,
}

/// A user's status inside one guild.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Presence {
    pub user: PartialUser,
    /// Filled in by the mirror when the payload carries the guild outside
    /// the presence record.
    #[serde(default)]
    pub guild_id: Possible<Id>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub client_status: Possible<ClientStatus>,
}

impl Presence {
    /// An offline presence with no activities.
    pub fn offline(user_id: Id) -> Self {
        Self {
            user: PartialUser::stub(user_id),
            guild_id: Possible::Unset,
            status: default_status(),
            activities: Vec::new(),
            client_status: Possible::Unset,
        }
    }
}

impl Merge for Presence {
    fn merge(&self, update: &Self) -> Self {
        Self {
            user: self.user.merge(&update.user),
            guild_id: self.guild_id.merge(&update.guild_id),
            status: update.status.clone(),
            activities: update.activities.clone(),
            client_status: self.client_status.merge(&update.client_status),
        }
    }
}

impl UserLinked for Presence {
    fn user_id(&self) -> Id {
        self.user.id
    }

    fn user_patch(&self) -> PartialUser {
        self.user.clone()
    }

    fn initial_user(&self) -> Option<User> {
        self.user.to_user()
    }

    fn detached(&self) -> Self {
        Self {
            user: PartialUser::stub(self.user.id),
            ..self.clone()
        }
    }

    fn attached(&self, user: &User) -> Self {
        Self {
            user: PartialUser::from(user),
            ..self.clone()
        }
    }
}
