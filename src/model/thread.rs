//! Thread-only records. A thread itself is a [`Channel`](crate::model::Channel)
//! carrying [`ThreadMetadata`].

use serde::Deserialize;

use crate::model::{Id, Merge, Possible};

/// Channel kinds that are threads.
pub const THREAD_KINDS: [u8; 3] = [10, 11, 12];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadMetadata {
    #[serde(default)]
    pub archived: bool,
    /// Minutes of inactivity before the thread archives.
    #[serde(default)]
    pub auto_archive_duration: u32,
    #[serde(default)]
    pub archive_timestamp: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub invitable: Possible<bool>,
    #[serde(default)]
    pub create_timestamp: Possible<String>,
}

/// A user's membership in a thread.
///
/// Both ids are missing when the record comes embedded in its own thread;
/// the mirror fills them in before storing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadMember {
    /// The thread.
    #[serde(default)]
    pub id: Possible<Id>,
    #[serde(default)]
    pub user_id: Possible<Id>,
    #[serde(default)]
    pub join_timestamp: String,
    #[serde(default)]
    pub flags: u64,
}

impl ThreadMember {
    pub fn thread(&self) -> Option<Id> {
        self.id.as_option().copied()
    }

    pub fn user(&self) -> Option<Id> {
        self.user_id.as_option().copied()
    }
}

impl Merge for ThreadMember {
    fn merge(&self, update: &Self) -> Self {
        Self {
            id: self.id.merge(&update.id),
            user_id: self.user_id.merge(&update.user_id),
            ..update.clone()
        }
    }
}
