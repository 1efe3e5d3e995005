//! Tri-state optional fields and the partial-update merge rule.
//!
//! Gateway updates are partial: a field may be missing (never sent), sent as
//! `null`, or sent with a value. Only the last two may change what is stored.
//!
//! ```text
//!   stored        update          merged
//!   ──────        ──────          ──────
//!   Present(a)    Unset       →   Present(a)
//!   Present(a)    Null        →   Null
//!   Present(a)    Present(b)  →   Present(b)
//!   Null          Unset       →   Null
//! ```
//!
//! Decoding follows the same split: put `#[serde(default)]` on a
//! `Possible<T>` field so a missing key becomes [`Possible::Unset`], while an
//! explicit `null` decodes to [`Possible::Null`].
//!
//! ## Example Usage
//!
//! ```
//! use mirrorkit::model::{Merge, Possible};
//!
//! let stored = Possible::Present("old nick".to_string());
//! assert_eq!(stored.merge(&Possible::Unset), stored);
//! assert_eq!(stored.merge(&Possible::Null), Possible::Null);
//! ```

use serde::{Deserialize, Deserializer};

/// A field that is unset, explicitly null, or present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Possible<T> {
    /// Never sent. Leaves the stored value alone.
    #[default]
    Unset,
    /// Sent as `null`. Clears the stored value.
    Null,
    /// Sent with a value. Replaces the stored value.
    Present(T),
}

impl<T> Possible<T> {
    #[inline]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Borrows the contained value.
    pub fn as_ref(&self) -> Possible<&T> {
        match self {
            Self::Unset => Possible::Unset,
            Self::Null => Possible::Null,
            Self::Present(v) => Possible::Present(v),
        }
    }

    /// Returns the value if present. Unset and null both map to `None`.
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Self::Present(v) => Some(v),
            _ => None,
        }
    }

    /// Consumes the field and returns the value if present.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Possible<U> {
        match self {
            Self::Unset => Possible::Unset,
            Self::Null => Possible::Null,
            Self::Present(v) => Possible::Present(f(v)),
        }
    }
}

impl<T: Clone> Possible<T> {
    /// Applies this update to a required (non-nullable) field.
    ///
    /// A `Null` on a required field is a protocol violation and is ignored.
    pub fn apply_to(&self, current: &T) -> T {
        match self {
            Self::Present(v) => v.clone(),
            Self::Null => {
                tracing::trace!("ignoring null update for a required field");
                current.clone()
            },
            Self::Unset => current.clone(),
        }
    }
}

impl<T> From<Option<T>> for Possible<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Present(v),
            None => Self::Null,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Possible<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Possible::from)
    }
}

/// Partial-update merge.
///
/// `stored.merge(&update)` returns the value after applying `update`: every
/// tri-state field follows the table in the module docs and every required
/// field is taken from `update`.
pub trait Merge {
    #[must_use]
    fn merge(&self, update: &Self) -> Self;
}

impl<T: Clone> Merge for Possible<T> {
    fn merge(&self, update: &Self) -> Self {
        match update {
            Self::Unset => self.clone(),
            other => other.clone(),
        }
    }
}
