//! Store configuration.
//!
//! Every entity kind picks its own [`StorageBackend`]. Settings load from an
//! optional TOML file, then `MIRRORKIT__*` environment variables, with
//! nested keys separated by `__`:
//!
//! ```text
//! MIRRORKIT__MESSAGES__KIND=bounded
//! MIRRORKIT__MESSAGES__MAX_SIZE=250
//! MIRRORKIT__USER_SWEEP_INTERVAL=4096
//! ```
//!
//! Missing keys fall back to [`StoreConfig::default`].

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::dispatch::InvalidationCause;
use crate::error::ConfigError;
use crate::store::StorageBackend;
use crate::store::weak::DEFAULT_SWEEP_INTERVAL;

/// Most recent messages kept per channel by default.
pub const DEFAULT_MESSAGE_LIMIT: usize = 1000;

const ENV_PREFIX: &str = "MIRRORKIT";

fn default_invalidation_filter() -> FxHashSet<InvalidationCause> {
    InvalidationCause::ALL.into_iter().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub channels: StorageBackend,
    pub emojis: StorageBackend,
    pub guilds: StorageBackend,
    pub members: StorageBackend,
    /// Per channel.
    pub messages: StorageBackend,
    pub presences: StorageBackend,
    pub roles: StorageBackend,
    pub scheduled_events: StorageBackend,
    pub stickers: StorageBackend,
    /// Per thread.
    pub thread_members: StorageBackend,
    /// Backend under the weak user table.
    pub users: StorageBackend,
    pub voice_states: StorageBackend,
    /// Inserts into the user table between sweeps of dead entries.
    pub user_sweep_interval: usize,
    /// Invalidation causes that clear a shard's guilds.
    pub invalidation_filter: FxHashSet<InvalidationCause>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            channels: StorageBackend::Unbounded,
            emojis: StorageBackend::Unbounded,
            guilds: StorageBackend::Unbounded,
            members: StorageBackend::Unbounded,
            messages: StorageBackend::bounded(DEFAULT_MESSAGE_LIMIT),
            presences: StorageBackend::Unbounded,
            roles: StorageBackend::Unbounded,
            scheduled_events: StorageBackend::Unbounded,
            stickers: StorageBackend::Unbounded,
            thread_members: StorageBackend::Unbounded,
            users: StorageBackend::Unbounded,
            voice_states: StorageBackend::Unbounded,
            user_sweep_interval: DEFAULT_SWEEP_INTERVAL,
            invalidation_filter: default_invalidation_filter(),
        }
    }
}

impl StoreConfig {
    /// Loads settings from `path` (if given and present) and the
    /// environment, then validates them.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("invalidation_filter"),
        );
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        tracing::debug!(?config, "loaded store configuration");
        Ok(config)
    }

    /// Parses settings from a TOML document and validates them.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let backends = [
            ("channels", &self.channels),
            ("emojis", &self.emojis),
            ("guilds", &self.guilds),
            ("members", &self.members),
            ("messages", &self.messages),
            ("presences", &self.presences),
            ("roles", &self.roles),
            ("scheduled_events", &self.scheduled_events),
            ("stickers", &self.stickers),
            ("thread_members", &self.thread_members),
            ("users", &self.users),
            ("voice_states", &self.voice_states),
        ];
        for (key, backend) in backends {
            backend.validate(key)?;
        }
        if self.user_sweep_interval == 0 {
            return Err(ConfigError::invalid(
                "user_sweep_interval",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Whether invalidation for `cause` clears the shard's guilds.
    pub fn invalidates_on(&self, cause: InvalidationCause) -> bool {
        self.invalidation_filter.contains(&cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bound_messages_only() {
        let config = StoreConfig::default();
        assert_eq!(config.messages.max_size(), Some(DEFAULT_MESSAGE_LIMIT));
        assert_eq!(config.guilds, StorageBackend::Unbounded);
        assert_eq!(config.user_sweep_interval, 8192);
        assert!(config.invalidates_on(InvalidationCause::Logout));
        assert!(config.invalidates_on(InvalidationCause::HardReconnect));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_overrides_selected_kinds() {
        let config = StoreConfig::from_toml_str(
            r#"
            user_sweep_interval = 16
            invalidation_filter = ["logout"]

            [messages]
            kind = "bounded"
            max_size = 50
            expire_after_access_secs = 600

            [presences]
            kind = "disabled"

            [thread_members]
            kind = "bounded"
            max_size = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.messages.max_size(), Some(50));
        assert_eq!(config.thread_members.max_size(), Some(100));
        assert_eq!(config.stickers, StorageBackend::Unbounded);
        assert!(config.presences.is_disabled());
        assert_eq!(config.roles, StorageBackend::Unbounded);
        assert_eq!(config.user_sweep_interval, 16);
        assert!(!config.invalidates_on(InvalidationCause::HardReconnect));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = StoreConfig::from_toml_str("user_sweep_interval = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "user_sweep_interval",
                ..
            }
        ));

        let err = StoreConfig::from_toml_str(
            r#"
            [roles]
            kind = "bounded"
            max_size = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("roles"));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let config = StoreConfig::load(None).unwrap();
        assert_eq!(config.messages, StoreConfig::default().messages);
    }
}
