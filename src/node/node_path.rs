use derive_more::Display;
use thiserror::Error;

use super::NodeName;

/// An absolute path to a node of a hierarchy, such as `/` or `/g/test`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct NodePath(String);

/// An invalid node path.
#[derive(Debug, Error)]
#[error("invalid node path {0}")]
pub struct NodePathError(String);

impl NodePath {
    /// Create a new node path from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NodePathError`] if `path` is not valid according to [`NodePath::validate`()].
    pub fn new(path: &str) -> Result<Self, NodePathError> {
        if Self::validate(path) {
            Ok(Self(path.to_string()))
        } else {
            Err(NodePathError(path.to_string()))
        }
    }

    /// The root node.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Extracts a string slice containing the node path `String`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a path:
    /// - A path always starts with `/`,
    /// - a non-root path cannot end with `/`, and
    /// - every component is a valid [`NodeName`].
    #[must_use]
    pub fn validate(path: &str) -> bool {
        path == "/"
            || path
                .strip_prefix('/')
                .is_some_and(|path| path.split('/').all(NodeName::validate))
    }

    /// Returns true if this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns the final component of the path, or the empty string for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Returns the path of the parent node, if this is not the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(match self.0.rsplit_once('/') {
            Some(("", _)) | None => Self::root(),
            Some((parent, _)) => Self(parent.to_string()),
        })
    }

    /// Returns the path of the child `name`.
    #[must_use]
    pub fn child(&self, name: &NodeName) -> Self {
        if self.is_root() {
            Self(format!("/{}", name.as_str()))
        } else {
            Self(format!("{}/{}", self.0, name.as_str()))
        }
    }
}

impl TryFrom<&str> for NodePath {
    type Error = NodePathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_path() {
        assert!(NodePath::new("/").is_ok());
        assert!(NodePath::new("/a/b").is_ok());
        assert!(NodePath::new("/a/b/").is_err());
        assert!(NodePath::new("a/b").is_err());
        assert!(NodePath::new("/a//b").is_err());
        assert!(NodePath::new("/a/../b").is_err());
        assert_eq!(
            NodePath::new("/a/b/").unwrap_err().to_string(),
            "invalid node path /a/b/"
        );
    }

    #[test]
    fn node_path_relations() {
        let path = NodePath::new("/g/test").unwrap();
        assert_eq!(path.name(), "test");
        assert_eq!(path.parent(), Some(NodePath::new("/g").unwrap()));
        assert_eq!(NodePath::new("/g").unwrap().parent(), Some(NodePath::root()));
        assert_eq!(NodePath::root().parent(), None);
        assert_eq!(NodePath::root().name(), "");
        let name = NodeName::new("x").unwrap();
        assert_eq!(NodePath::root().child(&name).as_str(), "/x");
        assert_eq!(path.child(&name).as_str(), "/g/test/x");
    }
}
