//! Guild-to-shard mapping.
//!
//! The gateway assigns each guild to a shard from the guild id alone, so the
//! mirror can tell which guilds a dropped shard owned without keeping a
//! reverse index.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shard Selection Flow                            │
//! │                                                                         │
//! │   Guild id (snowflake)                                                  │
//! │   ┌──────────────────────────────────────────┬──────────┬───────────┐   │
//! │   │ timestamp (42 bits)                      │ worker/  │ increment │   │
//! │   │                                          │ process  │           │   │
//! │   └──────────────────────────────────────────┴──────────┴───────────┘   │
//! │       │                                       └──── 22 bits dropped ─┘  │
//! │       ▼                                                                 │
//! │   ShardSelector { shards: 4 }                                           │
//! │       (id >> 22) % 4                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌─────────┬─────────┬─────────┬─────────┐                             │
//! │   │ Shard 0 │ Shard 1 │ Shard 2 │ Shard 3 │                             │
//! │   └─────────┴─────────┴─────────┴─────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use mirrorkit::ds::ShardSelector;
//! use mirrorkit::model::Id;
//!
//! let selector = ShardSelector::new(4);
//! let guild = Id::new(41771983423143937);
//! let shard = selector.shard_for(guild);
//! assert!(shard < 4);
//! assert!(selector.owns(shard, guild));
//! ```

use crate::model::Id;
use crate::model::id::TIMESTAMP_SHIFT;

/// Deterministic guild id → shard index mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSelector {
    shards: u32,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards.
    ///
    /// The shard count is clamped to at least 1, so an unknown (zero) count
    /// maps every guild to shard 0.
    ///
    /// ```
    /// use mirrorkit::ds::ShardSelector;
    ///
    /// assert_eq!(ShardSelector::new(0).shard_count(), 1);
    /// ```
    pub fn new(shards: u32) -> Self {
        Self {
            shards: shards.max(1),
        }
    }

    pub fn shard_count(&self) -> u32 {
        self.shards
    }

    /// Maps a guild id to its shard index in `[0, shards)`.
    pub fn shard_for(&self, guild_id: Id) -> u32 {
        // Fits in u32 since `shards` does.
        ((guild_id.get() >> TIMESTAMP_SHIFT) % u64::from(self.shards)) as u32
    }

    /// Returns `true` if `guild_id` belongs to shard `index`.
    pub fn owns(&self, index: u32, guild_id: Id) -> bool {
        self.shard_for(guild_id) == index
    }
}

impl Default for ShardSelector {
    /// Creates a single-shard selector.
    fn default() -> Self {
        Self::new(1)
    }
}
