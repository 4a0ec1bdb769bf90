//! Hierarchy nodes.
//!
//! A node of a hierarchy is either an [`Array`](crate::array::Array) (a dataset) or a [`Group`](crate::group::Group).
//! Every node is addressed by an absolute [`NodePath`] whose components are [`NodeName`]s.
//!
//! The nodes that have been opened or created through a [`File`](crate::group::File) are registered in a [`Hierarchy`].
//! The hierarchy is an arena: nodes refer to their parent by [`NodeId`] rather than by reference, so group and array handles can navigate upwards ([`parent`](crate::group::Group::parent), [`file`](crate::group::Group::file)) without reference cycles.

mod node_name;
mod node_path;

pub use node_name::{NodeName, NodeNameError};
pub use node_path::{NodePath, NodePathError};

use std::{collections::HashMap, sync::Arc};

use derive_more::Display;
use parking_lot::RwLock;

use crate::{metadata::StorageFormat, storage::FilesystemStore};

/// The identifier of a node registered in a [`Hierarchy`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
#[display("{_0}")]
pub struct NodeId(usize);

/// The type of a node.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum NodeKind {
    /// A group.
    #[display("group")]
    Group,
    /// An array (dataset).
    #[display("array")]
    Array,
}

#[derive(Debug)]
struct NodeEntry {
    path: NodePath,
    kind: NodeKind,
    parent: Option<NodeId>,
}

#[derive(Debug, Default)]
struct NodeArena {
    entries: Vec<NodeEntry>,
    index: HashMap<NodePath, NodeId>,
}

impl NodeArena {
    /// Insert the node at `path` with `kind`, inserting missing ancestors as groups.
    ///
    /// An existing node at `path` takes `kind`, existing ancestors are left unchanged.
    fn insert(&mut self, path: &NodePath, kind: NodeKind) -> NodeId {
        let id = self.get_or_insert(path, kind);
        self.entries[id.0].kind = kind;
        id
    }

    fn get_or_insert(&mut self, path: &NodePath, kind: NodeKind) -> NodeId {
        if let Some(id) = self.index.get(path).copied() {
            return id;
        }
        let parent = path
            .parent()
            .map(|parent| self.get_or_insert(&parent, NodeKind::Group));
        let id = NodeId(self.entries.len());
        self.entries.push(NodeEntry {
            path: path.clone(),
            kind,
            parent,
        });
        self.index.insert(path.clone(), id);
        id
    }
}

/// A hierarchy rooted at a store: the store, its [`StorageFormat`], and an arena of the nodes registered so far.
///
/// A hierarchy is shared (via [`Arc`]) by the [`File`](crate::group::File) and every group and array handle derived from it.
#[derive(Debug)]
pub struct Hierarchy {
    store: Arc<FilesystemStore>,
    format: StorageFormat,
    nodes: RwLock<NodeArena>,
}

impl Hierarchy {
    /// Create a new hierarchy on `store` with only the root group registered.
    #[must_use]
    pub fn new(store: Arc<FilesystemStore>, format: StorageFormat) -> Self {
        let mut nodes = NodeArena::default();
        nodes.insert(&NodePath::root(), NodeKind::Group);
        Self {
            store,
            format,
            nodes: RwLock::new(nodes),
        }
    }

    /// The store of the hierarchy.
    #[must_use]
    pub fn store(&self) -> &Arc<FilesystemStore> {
        &self.store
    }

    /// The storage format of the hierarchy.
    #[must_use]
    pub const fn format(&self) -> StorageFormat {
        self.format
    }

    /// The identifier of the root group.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Register the node at `path`, registering its ancestors as groups.
    ///
    /// Registering an existing path returns its existing identifier.
    pub fn register(&self, path: &NodePath, kind: NodeKind) -> NodeId {
        self.nodes.write().insert(path, kind)
    }

    /// The path of node `id`.
    #[must_use]
    pub fn path(&self, id: NodeId) -> NodePath {
        self.nodes.read().entries[id.0].path.clone()
    }

    /// The parent of node `id`, or [`None`] for the root.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.read().entries[id.0].parent
    }

    /// The number of registered nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.read().entries.len()
    }

    /// Returns true if only the root is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(hierarchy: &Hierarchy, id: NodeId) -> NodeKind {
        hierarchy.nodes.read().entries[id.0].kind
    }

    #[test]
    fn hierarchy_register() -> Result<(), Box<dyn std::error::Error>> {
        let path = tempfile::TempDir::new()?;
        let store = Arc::new(FilesystemStore::new(path.path())?);
        let hierarchy = Hierarchy::new(store, StorageFormat::N5);
        assert!(hierarchy.is_empty());
        assert_eq!(hierarchy.path(hierarchy.root()), NodePath::root());

        let array = hierarchy.register(&NodePath::new("/a/b/c")?, NodeKind::Array);
        assert_eq!(hierarchy.len(), 4);
        assert_eq!(kind(&hierarchy, array), NodeKind::Array);
        let parent = hierarchy.parent(array).unwrap();
        assert_eq!(hierarchy.path(parent).as_str(), "/a/b");
        assert_eq!(kind(&hierarchy, parent), NodeKind::Group);
        assert_eq!(
            hierarchy.parent(hierarchy.parent(parent).unwrap()),
            Some(hierarchy.root())
        );
        assert_eq!(hierarchy.parent(hierarchy.root()), None);

        assert_eq!(
            hierarchy.register(&NodePath::new("/a/b/c")?, NodeKind::Array),
            array
        );
        assert_eq!(hierarchy.len(), 4);
        Ok(())
    }

    #[test]
    fn hierarchy_register_keeps_ancestors() -> Result<(), Box<dyn std::error::Error>> {
        let path = tempfile::TempDir::new()?;
        let store = Arc::new(FilesystemStore::new(path.path())?);
        let hierarchy = Hierarchy::new(store, StorageFormat::N5);
        let array = hierarchy.register(&NodePath::new("/a/array")?, NodeKind::Array);

        // registering a descendant never relabels an existing ancestor
        let child = hierarchy.register(&NodePath::new("/a/array/x")?, NodeKind::Group);
        assert_eq!(hierarchy.parent(child), Some(array));
        assert_eq!(kind(&hierarchy, array), NodeKind::Array);

        // re-registering the node itself takes the new kind
        hierarchy.register(&NodePath::new("/a/array/x")?, NodeKind::Array);
        assert_eq!(kind(&hierarchy, child), NodeKind::Array);
        Ok(())
    }
}
