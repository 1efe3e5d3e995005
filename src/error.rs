//! Error types for the mirrorkit library.
//!
//! ## Key Components
//!
//! - [`StoreError`]: Returned by read queries whose answer is not yet known
//!   (exact member queries before the guild's member list completed).
//! - [`ConfigError`]: Returned when loading or validating a
//!   [`StoreConfig`](crate::config::StoreConfig) fails.
//! - [`IdError`]: Returned when a decimal snowflake cannot be parsed.
//!
//! Missing entities are never errors: point lookups return `Option`.
//!
//! ## Example Usage
//!
//! ```
//! use mirrorkit::error::StoreError;
//! use mirrorkit::model::Id;
//!
//! let err = StoreError::exact_result_not_available(Id::new(42));
//! assert!(err.to_string().contains("42"));
//! assert!(err.is_not_available());
//! ```

use thiserror::Error;

use crate::model::Id;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Error returned by queries that require a complete data set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The full member list of the guild has not been received yet, so an
    /// exact answer cannot be given.
    #[error("exact result for guild {guild_id} is not available yet")]
    ExactResultNotAvailable { guild_id: Id },
}

impl StoreError {
    /// Creates an [`StoreError::ExactResultNotAvailable`] for `guild_id`.
    #[inline]
    pub fn exact_result_not_available(guild_id: Id) -> Self {
        Self::ExactResultNotAvailable { guild_id }
    }

    /// Returns `true` if the error only means "ask again later".
    pub fn is_not_available(&self) -> bool {
        matches!(self, Self::ExactResultNotAvailable { .. })
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when store configuration cannot be loaded or is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to build configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// IdError
// ---------------------------------------------------------------------------

/// Error returned when a snowflake string is not a decimal `u64`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid snowflake `{input}`")]
pub struct IdError {
    input: String,
}

impl IdError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the rejected input.
    pub fn input(&self) -> &str {
        &self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_result_error_names_guild() {
        let err = StoreError::exact_result_not_available(Id::new(7));
        assert_eq!(
            err,
            StoreError::ExactResultNotAvailable {
                guild_id: Id::new(7)
            }
        );
        assert_eq!(err.to_string(), "exact result for guild 7 is not available yet");
    }

    #[test]
    fn config_error_invalid_display() {
        let err = ConfigError::invalid("messages.max_size", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "invalid configuration for `messages.max_size`: must be greater than zero"
        );
    }

    #[test]
    fn id_error_keeps_input() {
        let err = IdError::new("abc");
        assert_eq!(err.input(), "abc");
        assert_eq!(err.to_string(), "invalid snowflake `abc`");
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<IdError>();
    }
}
