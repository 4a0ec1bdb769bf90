use std::sync::Arc;

use log::debug;

use crate::{
    metadata::AttributesMap,
    node::{Hierarchy, NodeKind, NodePath},
};

use super::{create_parent_groups, store_group_metadata, stored_node_kind, Group, GroupCreateError};

/// A [`Group`] builder.
///
/// The only option for groups is their user attributes, which default to empty.
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use n5zarr::group::{File, FileMode, GroupBuilder};
/// # let path = tempfile::TempDir::new()?;
/// let file = File::open(path.path().join("data.n5"), FileMode::Create, None)?;
/// let mut attributes = serde_json::Map::new();
/// attributes.insert("spam".to_string(), "ham".into());
/// let group = GroupBuilder::new()
///     .attributes(attributes)
///     .build(file.hierarchy().clone(), "/a/b")?;
/// assert_eq!(group.attributes()?["spam"], "ham");
/// assert!(file.contains("a"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct GroupBuilder {
    attributes: AttributesMap,
}

impl GroupBuilder {
    /// Create a new group builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attributes.
    pub fn attributes(&mut self, attributes: AttributesMap) -> &mut Self {
        self.attributes = attributes;
        self
    }

    /// Build into a new [`Group`] in `hierarchy` at `path` and store its metadata.
    ///
    /// Missing intermediate groups are created.
    ///
    /// # Errors
    /// Returns [`GroupCreateError`] if `path` is invalid, a node already exists at `path`, an intermediate node is an array, or there is an underlying store error.
    pub fn build(&self, hierarchy: Arc<Hierarchy>, path: &str) -> Result<Group, GroupCreateError> {
        let path = NodePath::new(path)?;
        if path.is_root() || stored_node_kind(&hierarchy, &path)?.is_some() {
            return Err(GroupCreateError::AlreadyExists(path.to_string()));
        }
        create_parent_groups(&hierarchy, &path)?;
        let group = Group::from_node(hierarchy.clone(), hierarchy.register(&path, NodeKind::Group));
        group.set_attributes(self.attributes.clone())?;
        debug!("created group {path}");
        Ok(group)
    }
}
