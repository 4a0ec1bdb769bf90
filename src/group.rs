//! Groups and files.
//!
//! A group is a node of a hierarchy that contains other groups and [`arrays`](crate::array).
//! A [`File`] is the root group of a hierarchy, bound to a directory and a [`StorageFormat`].
//!
//! Groups can store user attributes.
//! In the N5 format they are stored in the `attributes.json` document of the group:
//! ```json
//! {
//!     "spam": "ham",
//!     "eggs": 42
//! }
//! ```
//! The root `attributes.json` additionally records the N5 version.
//! In the Zarr format a group has a `.zgroup` document (`{"zarr_format": 2}`) and its attributes are stored in `.zattrs`.
//!
//! Names passed to group methods are paths relative to the group, such as `a/b/c`.
//! A name starting with `/` is relative to the root of the hierarchy.

mod file;
mod group_builder;

use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::{
    array::{Array, ArrayBuilder, ArrayCreateError, ErrorClass},
    metadata::{
        n5::{is_array_document, ATTRIBUTES_JSON, N5_VERSION, N5_VERSION_ATTRIBUTE, RESERVED_ARRAY_ATTRIBUTES},
        read_json,
        v2::{GroupMetadataV2, ZARRAY, ZATTRS, ZGROUP},
        write_json, AttributesMap, StorageFormat,
    },
    node::{Hierarchy, NodeId, NodeKind, NodeName, NodeNameError, NodePath, NodePathError},
    storage::{StorageError, StorePrefix},
};

pub use self::{
    file::{File, FileCreateError, FileMode},
    group_builder::GroupBuilder,
};

/// A group creation error.
#[derive(Debug, Error)]
pub enum GroupCreateError {
    /// An invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// An invalid node name.
    #[error(transparent)]
    NodeNameError(#[from] NodeNameError),
    /// There is no node at the path.
    #[error("no group or array at {0}")]
    NotFound(String),
    /// The node at the path is an array.
    #[error("{0} is an array, not a group")]
    NotAGroup(String),
    /// A node already exists at the path.
    #[error("a node already exists at {0}")]
    AlreadyExists(String),
    /// An attribute name is reserved by the storage format.
    #[error("attribute {0} is reserved")]
    ReservedAttribute(String),
    /// An error opening an array child.
    #[error(transparent)]
    ArrayCreateError(#[from] Box<ArrayCreateError>),
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

impl GroupCreateError {
    /// The class of the error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound(_) | Self::StorageError(_) => ErrorClass::Storage,
            Self::NotAGroup(_) | Self::AlreadyExists(_) | Self::ReservedAttribute(_) => {
                ErrorClass::Configuration
            }
            Self::ArrayCreateError(err) => err.class(),
            Self::NodePathError(_) | Self::NodeNameError(_) => ErrorClass::Other,
        }
    }
}

/// A child of a group.
#[derive(Clone, Debug)]
pub enum GroupChild {
    /// A group.
    Group(Group),
    /// An array (dataset).
    Array(Array),
}

impl GroupChild {
    /// The absolute name of the child.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Group(group) => group.name(),
            Self::Array(array) => array.name(),
        }
    }

    /// The kind of the child.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Group(_) => NodeKind::Group,
            Self::Array(_) => NodeKind::Array,
        }
    }
}

/// Return the kind of the node stored at `path`, or [`None`] if there is no node.
pub(crate) fn stored_node_kind(
    hierarchy: &Hierarchy,
    path: &NodePath,
) -> Result<Option<NodeKind>, StorageError> {
    let store = hierarchy.store();
    let prefix = StorePrefix::from(path);
    match hierarchy.format() {
        StorageFormat::N5 => {
            // chunk directories of an array are not nodes
            let mut ancestor = path.parent();
            while let Some(path) = ancestor {
                let key = StorePrefix::from(&path).key(ATTRIBUTES_JSON)?;
                if read_json(store, &key)?.is_some_and(|attributes| is_array_document(&attributes)) {
                    return Ok(None);
                }
                ancestor = path.parent();
            }
            match read_json(store, &prefix.key(ATTRIBUTES_JSON)?)? {
                Some(attributes) if is_array_document(&attributes) => Ok(Some(NodeKind::Array)),
                Some(_) => Ok(Some(NodeKind::Group)),
                None => Ok(store.prefix_exists(&prefix).then_some(NodeKind::Group)),
            }
        }
        StorageFormat::Zarr { .. } => {
            if store.key_exists(&prefix.key(ZARRAY)?) {
                Ok(Some(NodeKind::Array))
            } else if store.key_exists(&prefix.key(ZGROUP)?) {
                Ok(Some(NodeKind::Group))
            } else {
                Ok(None)
            }
        }
    }
}

/// Read the user attributes of the group at `path`.
fn load_group_attributes(
    hierarchy: &Hierarchy,
    path: &NodePath,
) -> Result<AttributesMap, StorageError> {
    let store = hierarchy.store();
    let prefix = StorePrefix::from(path);
    Ok(match hierarchy.format() {
        StorageFormat::N5 => {
            let mut attributes = read_json(store, &prefix.key(ATTRIBUTES_JSON)?)?.unwrap_or_default();
            if path.is_root() {
                attributes.remove(N5_VERSION_ATTRIBUTE);
            }
            attributes
        }
        StorageFormat::Zarr { .. } => read_json(store, &prefix.key(ZATTRS)?)?.unwrap_or_default(),
    })
}

/// Write the metadata of the group at `path` with user `attributes`.
pub(crate) fn store_group_metadata(
    hierarchy: &Hierarchy,
    path: &NodePath,
    attributes: &AttributesMap,
) -> Result<(), StorageError> {
    let store = hierarchy.store();
    let prefix = StorePrefix::from(path);
    store.create_prefix(&prefix)?;
    match hierarchy.format() {
        StorageFormat::N5 => {
            let key = prefix.key(ATTRIBUTES_JSON)?;
            let mut document = AttributesMap::new();
            if path.is_root() {
                let version = read_json(store, &key)?
                    .and_then(|mut document| document.remove(N5_VERSION_ATTRIBUTE))
                    .unwrap_or_else(|| N5_VERSION.into());
                document.insert(N5_VERSION_ATTRIBUTE.to_string(), version);
            }
            document.extend(attributes.clone());
            write_json(store, &key, &document)
        }
        StorageFormat::Zarr { .. } => {
            write_json(store, &prefix.key(ZGROUP)?, &GroupMetadataV2::default())?;
            let key = prefix.key(ZATTRS)?;
            if attributes.is_empty() {
                store.erase(&key)?;
                Ok(())
            } else {
                write_json(store, &key, attributes)
            }
        }
    }
}

/// Create the missing ancestor groups of `path`.
pub(crate) fn create_parent_groups(
    hierarchy: &Hierarchy,
    path: &NodePath,
) -> Result<(), GroupCreateError> {
    let mut ancestors = vec![];
    let mut ancestor = path.parent();
    while let Some(path) = ancestor {
        ancestor = path.parent();
        ancestors.push(path);
    }
    for ancestor in ancestors.iter().rev().filter(|path| !path.is_root()) {
        match stored_node_kind(hierarchy, ancestor)? {
            Some(NodeKind::Group) => {}
            Some(NodeKind::Array) => {
                return Err(GroupCreateError::NotAGroup(ancestor.to_string()));
            }
            None => {
                store_group_metadata(hierarchy, ancestor, &AttributesMap::new())?;
                debug!("created group {ancestor}");
            }
        }
        hierarchy.register(ancestor, NodeKind::Group);
    }
    Ok(())
}

/// A group.
#[derive(Clone, Debug)]
pub struct Group {
    hierarchy: Arc<Hierarchy>,
    id: NodeId,
    path: NodePath,
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.hierarchy, &other.hierarchy) && self.id == other.id
    }
}

impl Group {
    pub(crate) fn from_node(hierarchy: Arc<Hierarchy>, id: NodeId) -> Self {
        let path = hierarchy.path(id);
        Self {
            hierarchy,
            id,
            path,
        }
    }

    /// Open the existing group in `hierarchy` at `path`.
    ///
    /// # Errors
    /// Returns [`GroupCreateError`] if the path is invalid, there is no node at `path`, or it is an array.
    pub fn open(hierarchy: Arc<Hierarchy>, path: &str) -> Result<Self, GroupCreateError> {
        let path = NodePath::new(path)?;
        if !path.is_root() {
            match stored_node_kind(&hierarchy, &path)? {
                Some(NodeKind::Group) => {}
                Some(NodeKind::Array) => return Err(GroupCreateError::NotAGroup(path.to_string())),
                None => return Err(GroupCreateError::NotFound(path.to_string())),
            }
        }
        let id = hierarchy.register(&path, NodeKind::Group);
        Ok(Self {
            hierarchy,
            id,
            path,
        })
    }

    /// The hierarchy of the group.
    #[must_use]
    pub fn hierarchy(&self) -> &Arc<Hierarchy> {
        &self.hierarchy
    }

    /// Get the node path.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// The absolute name of the group, e.g. `/a/b`, or `/` for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.as_str()
    }

    /// The last component of the group path, or the empty string for the root.
    #[must_use]
    pub fn basename(&self) -> &str {
        self.path.name()
    }

    /// Returns true if this is the root group.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }

    /// The group containing this group. The parent of the root is the root.
    #[must_use]
    pub fn parent(&self) -> Group {
        let parent = self
            .hierarchy
            .parent(self.id)
            .unwrap_or_else(|| self.hierarchy.root());
        Self::from_node(self.hierarchy.clone(), parent)
    }

    /// The file (root group) containing this group.
    #[must_use]
    pub fn file(&self) -> File {
        File::from_hierarchy(self.hierarchy.clone())
    }

    /// The storage format of the hierarchy.
    #[must_use]
    pub fn format(&self) -> StorageFormat {
        self.hierarchy.format()
    }

    fn resolve(&self, name: &str) -> Result<NodePath, NodeNameError> {
        let base = if name.starts_with('/') {
            NodePath::root()
        } else {
            self.path.clone()
        };
        Ok(NodeName::split_relative(name)?
            .iter()
            .fold(base, |path, name| path.child(name)))
    }

    /// Get the user attributes.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the attributes cannot be read.
    pub fn attributes(&self) -> Result<AttributesMap, StorageError> {
        load_group_attributes(&self.hierarchy, &self.path)
    }

    /// Replace the user attributes.
    ///
    /// # Errors
    /// Returns [`GroupCreateError`] if an attribute name is reserved by the storage format or the attributes cannot be stored.
    pub fn set_attributes(&self, attributes: AttributesMap) -> Result<(), GroupCreateError> {
        if self.format() == StorageFormat::N5 {
            let reserved = attributes.keys().find(|key| {
                RESERVED_ARRAY_ATTRIBUTES.contains(&key.as_str())
                    || (self.is_root() && key.as_str() == N5_VERSION_ATTRIBUTE)
            });
            if let Some(reserved) = reserved {
                return Err(GroupCreateError::ReservedAttribute(reserved.clone()));
            }
        }
        store_group_metadata(&self.hierarchy, &self.path, &attributes)?;
        Ok(())
    }

    /// Set the user attribute `key` to `value`.
    ///
    /// # Errors
    /// See [`set_attributes`](Group::set_attributes).
    pub fn set_attribute(&self, key: &str, value: serde_json::Value) -> Result<(), GroupCreateError> {
        let mut attributes = self.attributes()?;
        attributes.insert(key.to_string(), value);
        self.set_attributes(attributes)
    }

    /// Create a new group `name`, creating missing intermediate groups.
    ///
    /// # Errors
    /// Returns [`GroupCreateError`] if the name is invalid, a node already exists at `name`, an intermediate node is an array, or there is an underlying store error.
    pub fn create_group(&self, name: &str) -> Result<Group, GroupCreateError> {
        let path = self.resolve(name)?;
        GroupBuilder::new().build(self.hierarchy.clone(), path.as_str())
    }

    /// Open group `name` if it exists, otherwise create it.
    ///
    /// # Errors
    /// Returns [`GroupCreateError`] if the name is invalid, the node at `name` is an array, or there is an underlying store error.
    pub fn require_group(&self, name: &str) -> Result<Group, GroupCreateError> {
        let path = self.resolve(name)?;
        match stored_node_kind(&self.hierarchy, &path)? {
            Some(_) => Self::open(self.hierarchy.clone(), path.as_str()),
            None => GroupBuilder::new().build(self.hierarchy.clone(), path.as_str()),
        }
    }

    /// Open the existing group `name`.
    ///
    /// # Errors
    /// Returns [`GroupCreateError`] if the name is invalid, there is no node at `name`, or it is an array.
    pub fn open_group(&self, name: &str) -> Result<Group, GroupCreateError> {
        let path = self.resolve(name)?;
        Self::open(self.hierarchy.clone(), path.as_str())
    }

    /// Create a new array `name` configured by `builder` and store its metadata, creating missing intermediate groups.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the name is invalid, a node already exists at `name`, the array configuration is invalid, or there is an underlying store error.
    pub fn create_dataset(&self, name: &str, builder: &ArrayBuilder) -> Result<Array, ArrayCreateError> {
        let path = self.resolve(name).map_err(StorageError::from)?;
        if stored_node_kind(&self.hierarchy, &path)?.is_some() {
            return Err(ArrayCreateError::AlreadyExists(path.to_string()));
        }
        let metadata = builder.build_metadata(self.hierarchy.format())?;
        create_parent_groups(&self.hierarchy, &path).map_err(Box::new)?;
        let array = Array::new_with_metadata(
            self.hierarchy.clone(),
            path,
            metadata,
            builder.num_threads,
        )?;
        array.store_metadata()?;
        debug!("created array {}", array.path());
        Ok(array)
    }

    /// Open array `name` if it exists with the shape and data type of `builder`, otherwise create it.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::RequireMismatch`] if an array exists at `name` with a different shape or data type, or see [`create_dataset`](Group::create_dataset).
    pub fn require_dataset(&self, name: &str, builder: &ArrayBuilder) -> Result<Array, ArrayCreateError> {
        let path = self.resolve(name).map_err(StorageError::from)?;
        match stored_node_kind(&self.hierarchy, &path)? {
            Some(NodeKind::Array) => {
                let array = Array::open(self.hierarchy.clone(), path.as_str())?;
                if array.shape() == builder.shape && array.data_type() == builder.data_type {
                    Ok(array)
                } else {
                    Err(ArrayCreateError::RequireMismatch {
                        path: path.to_string(),
                        shape: array.shape().to_vec(),
                        data_type: array.data_type(),
                        requested_shape: builder.shape.clone(),
                        requested_data_type: builder.data_type,
                    })
                }
            }
            Some(NodeKind::Group) => Err(ArrayCreateError::AlreadyExists(path.to_string())),
            None => self.create_dataset(name, builder),
        }
    }

    /// Open the existing array `name`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the name is invalid or there is no valid array at `name`.
    pub fn open_array(&self, name: &str) -> Result<Array, ArrayCreateError> {
        let path = self.resolve(name).map_err(StorageError::from)?;
        Array::open(self.hierarchy.clone(), path.as_str())
    }

    /// Open the group or array `name`.
    ///
    /// # Errors
    /// Returns [`GroupCreateError`] if the name is invalid, there is no node at `name`, or it cannot be opened.
    pub fn get(&self, name: &str) -> Result<GroupChild, GroupCreateError> {
        let path = self.resolve(name)?;
        self.child(&path)
    }

    fn child(&self, path: &NodePath) -> Result<GroupChild, GroupCreateError> {
        match stored_node_kind(&self.hierarchy, path)? {
            Some(NodeKind::Group) => Ok(GroupChild::Group(Self::open(
                self.hierarchy.clone(),
                path.as_str(),
            )?)),
            Some(NodeKind::Array) => Ok(GroupChild::Array(
                Array::open(self.hierarchy.clone(), path.as_str()).map_err(Box::new)?,
            )),
            None => Err(GroupCreateError::NotFound(path.to_string())),
        }
    }

    /// Returns true if there is a group or array at `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok_and(|path| {
            matches!(stored_node_kind(&self.hierarchy, &path), Ok(Some(_)))
        })
    }

    /// The names of the children of the group, sorted.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the group cannot be listed.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = vec![];
        for prefix in self.hierarchy.store().list_dir(&StorePrefix::from(&self.path))?.prefixes() {
            let name = prefix.as_str().trim_end_matches('/').rsplit('/').next().unwrap_or_default();
            let Ok(name) = NodeName::new(name) else {
                continue;
            };
            if stored_node_kind(&self.hierarchy, &self.path.child(&name))?.is_some() {
                keys.push(name.as_str().to_string());
            }
        }
        Ok(keys)
    }

    /// The children of the group, sorted by name.
    ///
    /// # Errors
    /// Returns [`GroupCreateError`] if the group cannot be listed or a child cannot be opened.
    pub fn children(&self) -> Result<Vec<GroupChild>, GroupCreateError> {
        self.keys()?
            .iter()
            .map(|name| self.child(&self.path.child(&NodeName::new(name)?)))
            .collect()
    }

    /// Return a tree of the hierarchy below this group as a string, with the shape and data type of each array.
    ///
    /// For example:
    /// ```text
    /// /
    ///   a
    ///     baz [10000, 1000] float64
    ///     foo [10000, 1000] float64
    ///   b
    /// ```
    ///
    /// # Errors
    /// Returns [`GroupCreateError`] if a node cannot be listed or opened.
    pub fn hierarchy_tree(&self) -> Result<String, GroupCreateError> {
        fn update_tree(string: &mut String, group: &Group, depth: usize) -> Result<(), GroupCreateError> {
            for child in group.children()? {
                string.push_str(&" ".repeat(depth * 2));
                match child {
                    GroupChild::Array(array) => {
                        string.push_str(&format!(
                            "{} {:?} {}\n",
                            array.basename(),
                            array.shape(),
                            array.data_type()
                        ));
                    }
                    GroupChild::Group(child) => {
                        string.push_str(child.basename());
                        string.push('\n');
                        update_tree(string, &child, depth + 1)?;
                    }
                }
            }
            Ok(())
        }

        let mut string = String::default();
        string.push_str(if self.is_root() { "/" } else { self.basename() });
        string.push('\n');
        update_tree(&mut string, self, 1)?;
        Ok(string)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::array::DataType;

    use super::*;

    fn files() -> Result<(tempfile::TempDir, Vec<File>), Box<dyn std::error::Error>> {
        let path = tempfile::TempDir::new()?;
        let files = vec![
            File::open(path.path().join("test.n5"), FileMode::Create, None)?,
            File::open(path.path().join("test.zarr"), FileMode::Create, None)?,
        ];
        Ok((path, files))
    }

    #[test]
    fn group_create_nested() -> Result<(), Box<dyn std::error::Error>> {
        let (_path, files) = files()?;
        for file in files {
            let group = file.create_group("a/b/c")?;
            assert_eq!(group.name(), "/a/b/c");
            assert_eq!(group.basename(), "c");
            assert_eq!(group.parent().name(), "/a/b");
            assert_eq!(group.parent().parent().parent(), file.root().clone());
            assert!(group.file().is_root());
            assert!(file.contains("a/b"));
            assert!(file.open_group("a")?.contains("b/c"));
            assert!(matches!(
                file.create_group("a/b"),
                Err(GroupCreateError::AlreadyExists(_))
            ));
            assert_eq!(file.require_group("a/b")?.name(), "/a/b");
            assert!(matches!(
                file.open_group("x"),
                Err(GroupCreateError::NotFound(_))
            ));
        }
        Ok(())
    }

    #[test]
    fn group_attributes() -> Result<(), Box<dyn std::error::Error>> {
        let (_path, files) = files()?;
        for file in files {
            let group = file.create_group("g")?;
            assert!(group.attributes()?.is_empty());
            group.set_attribute("spam", json!("ham"))?;
            group.set_attribute("eggs", json!(42))?;
            let attributes = file.open_group("g")?.attributes()?;
            assert_eq!(attributes["spam"], json!("ham"));
            assert_eq!(attributes["eggs"], json!(42));
            file.set_attribute("root", json!(true))?;
            assert_eq!(file.attributes()?.len(), 1);
        }
        Ok(())
    }

    #[test]
    fn group_n5_reserved_attributes() -> Result<(), Box<dyn std::error::Error>> {
        let (_path, files) = files()?;
        let n5 = &files[0];
        assert!(matches!(
            n5.create_group("g")?.set_attribute("dataType", json!("uint8")),
            Err(GroupCreateError::ReservedAttribute(_))
        ));
        assert!(matches!(
            n5.set_attribute("n5", json!("3.0.0")),
            Err(GroupCreateError::ReservedAttribute(_))
        ));
        Ok(())
    }

    #[test]
    fn group_children() -> Result<(), Box<dyn std::error::Error>> {
        let (_path, files) = files()?;
        for file in files {
            let builder = ArrayBuilder::new(vec![4, 4], DataType::UInt8, vec![2, 2]);
            file.create_group("b")?;
            let array = file.create_dataset("a/array", &builder)?;
            array.write_scalar(&[], 1u8)?;
            assert_eq!(file.keys()?, vec!["a", "b"]);
            assert_eq!(file.open_group("a")?.keys()?, vec!["array"]);
            assert!(matches!(file.get("a/array")?, GroupChild::Array(_)));
            assert_eq!(file.get("b")?.kind(), NodeKind::Group);
            assert!(matches!(
                file.create_group("a/array/c"),
                Err(GroupCreateError::NotAGroup(_))
            ));
            assert!(!file.contains("a/array/0"));
            assert_eq!(
                file.hierarchy_tree()?,
                "/\n  a\n    array [4, 4] uint8\n  b\n"
            );
        }
        Ok(())
    }

    #[test]
    fn group_create_dataset_failure_leaves_hierarchy() -> Result<(), Box<dyn std::error::Error>> {
        let (_path, files) = files()?;
        for file in files {
            let builder = ArrayBuilder::new(vec![4], DataType::UInt8, vec![2]);
            let array = file.create_dataset("a/array", &builder)?;
            let registered = file.hierarchy().len();

            assert!(matches!(
                file.create_dataset("a/array/x", &builder),
                Err(ArrayCreateError::GroupCreateError(err)) if matches!(*err, GroupCreateError::NotAGroup(_))
            ));
            assert_eq!(file.hierarchy().len(), registered);
            assert!(!file.contains("a/array/x"));
            assert!(matches!(file.get("a/array")?, GroupChild::Array(_)));
            assert_eq!(file.open_array("a/array")?, array);

            // invalid configurations fail before any intermediate group is created
            let mut invalid = builder.clone();
            invalid.compression("lz5", &serde_json::Map::new());
            assert!(file.create_dataset("b/array", &invalid).is_err());
            assert_eq!(file.hierarchy().len(), registered);
            assert!(!file.contains("b"));
        }
        Ok(())
    }
}
