use derive_more::Display;
use thiserror::Error;

/// The name of a node: a single component of a [`NodePath`](super::NodePath).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display)]
pub struct NodeName(String);

/// An invalid node name.
#[derive(Debug, Error)]
#[error("invalid node name {0}")]
pub struct NodeNameError(String);

impl NodeName {
    /// Create a new node name from `name`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeNameError`] if `name` is not valid according to [`NodeName::validate`()].
    pub fn new(name: &str) -> Result<Self, NodeNameError> {
        if Self::validate(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(NodeNameError(name.to_string()))
        }
    }

    /// Split a relative path such as `a/b/c` into node names.
    ///
    /// # Errors
    ///
    /// Returns [`NodeNameError`] if the path is empty or any component is invalid.
    pub fn split_relative(path: &str) -> Result<Vec<Self>, NodeNameError> {
        let path = path.strip_prefix('/').unwrap_or(path);
        if path.is_empty() {
            return Err(NodeNameError(path.to_string()));
        }
        path.split('/').map(Self::new).collect()
    }

    /// Extracts a string slice containing the node name `String`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a node name:
    /// - must not be the empty string (""),
    /// - must not include the character "/", and
    /// - must not be a string composed only of period characters, e.g. "." or "..".
    #[must_use]
    pub fn validate(node_name: &str) -> bool {
        !node_name.contains('/') && !node_name.replace('.', "").is_empty()
    }
}
