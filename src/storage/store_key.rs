use derive_more::{Display, From};
use thiserror::Error;

use super::StorePrefix;

/// A store key: the `/`-separated location of a file relative to the root of a store.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StoreKey(String);

/// An invalid store key.
#[derive(Debug, From, Error)]
#[error("invalid store key {0}")]
pub struct StoreKeyError(String);

/// A list of [`StoreKey`].
pub type StoreKeys = Vec<StoreKey>;

impl StoreKey {
    /// Create a new store key from `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreKeyError`] if `key` is not valid according to [`StoreKey::validate()`].
    pub fn new(key: impl Into<String>) -> Result<Self, StoreKeyError> {
        let key = key.into();
        if Self::validate(&key) {
            Ok(Self(key))
        } else {
            Err(StoreKeyError(key))
        }
    }

    /// Extracts a string slice of the underlying key [String].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a key.
    ///
    /// A key is invalid if it is empty, starts or ends with `/`, contains an empty component (`//`), or contains a `.`/`..` component.
    #[must_use]
    pub fn validate(key: &str) -> bool {
        !key.is_empty()
            && key
                .split('/')
                .all(|component| !component.is_empty() && component != "." && component != "..")
    }

    /// Returns true if the key has prefix `prefix`.
    #[must_use]
    pub fn has_prefix(&self, prefix: &StorePrefix) -> bool {
        self.0.starts_with(prefix.as_str())
    }

    /// Returns the final component of the key.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns the parent of this key.
    #[must_use]
    pub fn parent(&self) -> StorePrefix {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => StorePrefix::from_validated(format!("{parent}/")),
            None => StorePrefix::root(),
        }
    }

    pub(crate) fn from_validated(key: String) -> Self {
        debug_assert!(Self::validate(&key));
        Self(key)
    }
}

impl TryFrom<&str> for StoreKey {
    type Error = StoreKeyError;

    fn try_from(key: &str) -> Result<Self, Self::Error> {
        Self::new(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_key() {
        assert!(StoreKey::new("a").is_ok());
        assert_eq!(StoreKey::new("a").unwrap().to_string(), "a");
        assert!(StoreKey::new("a/").is_err());
        assert_eq!(
            StoreKey::new("a/").unwrap_err().to_string(),
            "invalid store key a/"
        );
        assert!(StoreKey::new("/a").is_err());
        assert!(StoreKey::new("a//b").is_err());
        assert!(StoreKey::new("a/../b").is_err());
        assert!(StoreKey::new("").is_err());
    }

    #[test]
    fn store_key_parent() {
        let key = StoreKey::new("a/b/.zarray").unwrap();
        assert_eq!(key.parent(), StorePrefix::new("a/b/").unwrap());
        assert_eq!(key.name(), ".zarray");
        assert!(key.has_prefix(&StorePrefix::new("a/").unwrap()));
        assert_eq!(StoreKey::new("a").unwrap().parent(), StorePrefix::root());
    }
}
