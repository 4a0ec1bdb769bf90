use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use derive_more::{Deref, Display};
use log::{debug, warn};
use thiserror::Error;

use crate::{
    array::ErrorClass,
    metadata::{
        n5::ATTRIBUTES_JSON,
        v2::{ZARRAY, ZGROUP},
        AttributesMap, StorageFormat,
    },
    node::{Hierarchy, NodePath},
    storage::{FilesystemStore, FilesystemStoreCreateError, StorageError, StorePrefix},
};

use super::{store_group_metadata, Group};

/// The mode a [`File`] is opened with.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum FileMode {
    /// Read only, the file must exist (`r`).
    #[display("r")]
    Read,
    /// Read and write, the file must exist (`r+`).
    #[display("r+")]
    ReadWrite,
    /// Create the file, removing any existing content (`w`).
    #[display("w")]
    Create,
    /// Create the file, failing if it exists (`w-` or `x`).
    #[display("w-")]
    CreateNew,
    /// Read and write if the file exists, otherwise create it (`a`).
    #[display("a")]
    Append,
}

impl FromStr for FileMode {
    type Err = FileCreateError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "r" => Ok(Self::Read),
            "r+" => Ok(Self::ReadWrite),
            "w" => Ok(Self::Create),
            "w-" | "x" => Ok(Self::CreateNew),
            "a" => Ok(Self::Append),
            _ => Err(FileCreateError::InvalidMode(mode.to_string())),
        }
    }
}

/// A file creation error.
#[derive(Debug, Error)]
pub enum FileCreateError {
    /// The store could not be created.
    #[error(transparent)]
    FilesystemStoreCreateError(#[from] FilesystemStoreCreateError),
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// The file does not exist.
    #[error("file {0} does not exist")]
    NotFound(PathBuf),
    /// The file already exists.
    #[error("file {0} already exists")]
    AlreadyExists(PathBuf),
    /// The storage format could not be determined.
    #[error("cannot determine the storage format of {0}, specify it or use the .n5 or .zarr extension")]
    UnknownFormat(PathBuf),
    /// An invalid file mode.
    #[error("invalid file mode {0}, expected one of r, r+, w, w-, x, a")]
    InvalidMode(String),
}

impl FileCreateError {
    /// The class of the error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::FilesystemStoreCreateError(_)
            | Self::StorageError(_)
            | Self::NotFound(_)
            | Self::AlreadyExists(_) => ErrorClass::Storage,
            Self::UnknownFormat(_) | Self::InvalidMode(_) => ErrorClass::Configuration,
        }
    }
}

/// A file: the root group of a hierarchy stored in a directory.
///
/// A file dereferences to its root [`Group`].
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use n5zarr::{group::{File, FileMode}, metadata::StorageFormat};
/// # let path = tempfile::TempDir::new()?;
/// let file = File::open(path.path().join("data.zarr"), FileMode::Create, None)?;
/// file.create_group("a/b")?;
/// drop(file);
///
/// let file = File::open(path.path().join("data.zarr"), "r".parse()?, None)?;
/// assert_eq!(file.format(), StorageFormat::zarr());
/// assert_eq!(file.keys()?, vec!["a"]);
/// assert!(file.create_group("c").is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Deref)]
pub struct File {
    root: Group,
}

/// Detect the format of an existing hierarchy from its root metadata documents.
fn detect_format(store: &FilesystemStore) -> Result<Option<StorageFormat>, StorageError> {
    let root = StorePrefix::root();
    let has = |name: &str| -> Result<bool, StorageError> {
        Ok(store.key_exists(&root.key(name)?))
    };
    if has(ZGROUP)? || has(ZARRAY)? {
        Ok(Some(StorageFormat::zarr()))
    } else if has(ATTRIBUTES_JSON)? {
        Ok(Some(StorageFormat::N5))
    } else {
        Ok(None)
    }
}

impl File {
    /// Open the file at `path` with `mode`.
    ///
    /// The storage format of an existing file is detected from its root metadata.
    /// Otherwise it is `format`, or inferred from the extension of `path` if `format` is [`None`].
    /// The chunk key separator of a Zarr `format` applies to new arrays.
    ///
    /// # Errors
    /// Returns [`FileCreateError`] if
    ///  - the file does not exist and `mode` is [`Read`](FileMode::Read) or [`ReadWrite`](FileMode::ReadWrite),
    ///  - the file exists and `mode` is [`CreateNew`](FileMode::CreateNew),
    ///  - the storage format cannot be determined, or
    ///  - there is an underlying store error.
    pub fn open(
        path: impl AsRef<Path>,
        mode: FileMode,
        format: Option<StorageFormat>,
    ) -> Result<Self, FileCreateError> {
        let path = path.as_ref();
        let exists = path.is_dir();
        match mode {
            FileMode::Read | FileMode::ReadWrite if !exists => {
                return Err(FileCreateError::NotFound(path.to_path_buf()));
            }
            FileMode::CreateNew if path.exists() => {
                return Err(FileCreateError::AlreadyExists(path.to_path_buf()));
            }
            _ => {}
        }

        let store = if mode == FileMode::Read {
            FilesystemStore::new_readonly(path)?
        } else {
            FilesystemStore::new(path)?
        };
        let requested = format.or_else(|| StorageFormat::from_extension(path));
        let mut detected = detect_format(&store)?;
        let format = match (detected, requested) {
            (Some(StorageFormat::N5), Some(requested)) if requested.is_zarr() => {
                warn!("{} is an N5 hierarchy, ignoring the requested {requested} format", path.display());
                StorageFormat::N5
            }
            (Some(StorageFormat::Zarr { .. }), Some(StorageFormat::N5)) => {
                warn!("{} is a Zarr hierarchy, ignoring the requested n5 format", path.display());
                StorageFormat::zarr()
            }
            (Some(detected), None) => detected,
            (_, Some(requested)) => requested,
            (None, None) => return Err(FileCreateError::UnknownFormat(path.to_path_buf())),
        };
        if mode == FileMode::Create {
            store.erase_prefix(&StorePrefix::root())?;
            detected = None;
        }

        let hierarchy = Arc::new(Hierarchy::new(Arc::new(store), format));
        if detected.is_none() && mode != FileMode::Read && mode != FileMode::ReadWrite {
            store_group_metadata(&hierarchy, &NodePath::root(), &AttributesMap::new())?;
            debug!("created {format} file {}", path.display());
        } else {
            debug!("opened {format} file {} with mode {mode}", path.display());
        }
        Ok(Self::from_hierarchy(hierarchy))
    }

    pub(crate) fn from_hierarchy(hierarchy: Arc<Hierarchy>) -> Self {
        let root = hierarchy.root();
        Self {
            root: Group::from_node(hierarchy, root),
        }
    }

    /// The root group.
    #[must_use]
    pub const fn root(&self) -> &Group {
        &self.root
    }

    /// The directory of the file.
    #[must_use]
    pub fn filename(&self) -> &Path {
        self.root.hierarchy().store().base_directory()
    }

    /// Returns true if the file is read only.
    #[must_use]
    pub fn readonly(&self) -> bool {
        self.root.hierarchy().store().readonly()
    }

}
