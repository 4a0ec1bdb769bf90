use derive_more::{Display, From};
use thiserror::Error;

use crate::node::NodePath;

use super::StoreKey;

/// A store prefix: a directory of a store, either empty (the root) or ending with `/`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StorePrefix(String);

/// An invalid store prefix.
#[derive(Debug, Error, From)]
#[error("invalid store prefix {0}")]
pub struct StorePrefixError(String);

/// A list of [`StorePrefix`].
pub type StorePrefixes = Vec<StorePrefix>;

impl StorePrefix {
    /// Create a new store prefix from `prefix`.
    ///
    /// # Errors
    /// Returns [`StorePrefixError`] if `prefix` is not valid according to [`StorePrefix::validate`()].
    pub fn new(prefix: impl Into<String>) -> Result<Self, StorePrefixError> {
        let prefix = prefix.into();
        if Self::validate(&prefix) {
            Ok(Self(prefix))
        } else {
            Err(StorePrefixError(prefix))
        }
    }

    /// The root prefix.
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Extracts a string slice containing the prefix `String`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a prefix.
    ///
    /// A prefix is either the empty string or a valid [`StoreKey`] followed by a trailing `/`.
    #[must_use]
    pub fn validate(prefix: &str) -> bool {
        prefix.is_empty()
            || prefix
                .strip_suffix('/')
                .is_some_and(StoreKey::validate)
    }

    /// Returns true if this is the root prefix.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the key of the file `name` within this prefix.
    ///
    /// # Errors
    /// Returns [`StoreKeyError`](super::StoreKeyError) if `name` does not form a valid key.
    pub fn key(&self, name: &str) -> Result<StoreKey, super::StoreKeyError> {
        StoreKey::new(format!("{}{name}", self.0))
    }

    /// Returns the prefix of the parent, it if has one.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.0.strip_suffix('/')?;
        Some(match trimmed.rsplit_once('/') {
            Some((parent, _)) => Self(format!("{parent}/")),
            None => Self::root(),
        })
    }

    pub(crate) fn from_validated(prefix: String) -> Self {
        debug_assert!(Self::validate(&prefix));
        Self(prefix)
    }
}

impl TryFrom<&str> for StorePrefix {
    type Error = StorePrefixError;

    fn try_from(prefix: &str) -> Result<Self, StorePrefixError> {
        Self::new(prefix)
    }
}

impl From<&NodePath> for StorePrefix {
    fn from(path: &NodePath) -> Self {
        let path = path.as_str();
        if path == "/" {
            Self::root()
        } else {
            Self(path.strip_prefix('/').unwrap_or(path).to_string() + "/")
        }
    }
}
