//! A filesystem store.

use std::{
    collections::HashMap,
    io::Write,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use log::trace;
use parking_lot::Mutex;
use thiserror::Error;
use walkdir::WalkDir;

use super::{
    StorageError, StoreKey, StoreKeyError, StoreKeys, StoreKeysPrefixes, StorePrefix,
    StorePrefixes,
};

/// The file name prefix of values being staged for an atomic write.
const STAGING_PREFIX: &str = ".tmp";

/// A file system store.
///
/// Each [`StoreKey`] maps to a file below the base directory.
/// Values are written atomically: they are staged in a temporary file in the destination directory and then renamed into place, so a concurrent reader observes either the old or the new value.
///
/// Writers of the same key are serialised by a per-key lock; distinct keys can be accessed concurrently.
/// A key lock is held only while the key is in use.
#[derive(Debug)]
pub struct FilesystemStore {
    base_directory: PathBuf,
    readonly: bool,
    locks: Mutex<HashMap<StoreKey, Arc<Mutex<()>>>>,
}

impl FilesystemStore {
    /// Create a new file system store at a given `base_directory`.
    /// The base directory will be created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`FilesystemStoreCreateError`] if `base_directory`:
    ///   - is not valid unicode, or
    ///   - it points to an existing file rather than a directory.
    pub fn new<P: AsRef<Path>>(
        base_directory: P,
    ) -> Result<FilesystemStore, FilesystemStoreCreateError> {
        let base_directory = Self::validate_base_directory(base_directory.as_ref())?;
        let readonly = if base_directory.is_dir() {
            // the directory already exists, check if it is read only
            let md =
                std::fs::metadata(&base_directory).map_err(FilesystemStoreCreateError::IOError)?;
            md.permissions().readonly()
        } else {
            std::fs::create_dir_all(&base_directory)
                .map_err(FilesystemStoreCreateError::IOError)?;
            false
        };
        Ok(FilesystemStore {
            base_directory,
            readonly,
            locks: Mutex::default(),
        })
    }

    /// Open an existing `base_directory` as a read only file system store.
    ///
    /// # Errors
    ///
    /// Returns a [`FilesystemStoreCreateError`] if `base_directory` is not valid unicode or is not an existing directory.
    pub fn new_readonly<P: AsRef<Path>>(
        base_directory: P,
    ) -> Result<FilesystemStore, FilesystemStoreCreateError> {
        let base_directory = Self::validate_base_directory(base_directory.as_ref())?;
        if !base_directory.is_dir() {
            return Err(FilesystemStoreCreateError::MissingDirectory(base_directory));
        }
        Ok(FilesystemStore {
            base_directory,
            readonly: true,
            locks: Mutex::default(),
        })
    }

    fn validate_base_directory(
        base_directory: &Path,
    ) -> Result<PathBuf, FilesystemStoreCreateError> {
        if base_directory.to_str().is_none() {
            return Err(FilesystemStoreCreateError::InvalidBaseDirectory(
                base_directory.to_path_buf(),
            ));
        }
        if base_directory.is_file() {
            return Err(FilesystemStoreCreateError::ExistingFile(
                base_directory.to_path_buf(),
            ));
        }
        Ok(base_directory.to_path_buf())
    }

    /// Returns the base directory of the store.
    #[must_use]
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Returns true if the store is read only.
    #[must_use]
    pub fn readonly(&self) -> bool {
        self.readonly
    }

    /// Maps a [`StoreKey`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn key_to_fspath(&self, key: &StoreKey) -> PathBuf {
        key.as_str()
            .split('/')
            .fold(self.base_directory.clone(), |path, component| {
                path.join(component)
            })
    }

    /// Maps a store [`StorePrefix`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn prefix_to_fs_path(&self, prefix: &StorePrefix) -> PathBuf {
        prefix
            .as_str()
            .split('/')
            .filter(|component| !component.is_empty())
            .fold(self.base_directory.clone(), |path, component| {
                path.join(component)
            })
    }

    /// Maps a filesystem path below the base directory to a [`StoreKey`].
    fn fspath_to_key(&self, path: &Path) -> Result<StoreKey, StoreKeyError> {
        let invalid = || StoreKeyError::from(path.to_string_lossy().to_string());
        let relative = path.strip_prefix(&self.base_directory).map_err(|_| invalid())?;
        let components = relative
            .components()
            .map(|component| match component {
                Component::Normal(name) => name.to_str().ok_or_else(invalid),
                _ => Err(invalid()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        StoreKey::new(components.join("/"))
    }

    /// Run `f` holding the lock of `key`.
    fn with_key_lock<R>(&self, key: &StoreKey, f: impl FnOnce() -> R) -> R {
        let lock = self.locks.lock().entry(key.clone()).or_default().clone();
        let result = {
            let _guard = lock.lock();
            f()
        };
        let mut locks = self.locks.lock();
        // only the map and this call hold the lock
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
        result
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.readonly {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Retrieve the value associated with `key`.
    ///
    /// Returns [`None`] if the key does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the file exists but cannot be read.
    pub fn get(&self, key: &StoreKey) -> Result<Option<Vec<u8>>, StorageError> {
        self.with_key_lock(key, || match std::fs::read(self.key_to_fspath(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        })
    }

    /// Store bytes at a [`StoreKey`], creating parent directories as needed.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] if the store is read only, or an IO error if the value cannot be written.
    pub fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        self.check_writable()?;
        let key_path = self.key_to_fspath(key);
        let parent = key_path.parent().unwrap_or(&self.base_directory);

        self.with_key_lock(key, || {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = tempfile::Builder::new()
                .prefix(STAGING_PREFIX)
                .tempfile_in(parent)?;
            file.write_all(value)?;
            file.persist(&key_path).map_err(|err| err.error)?;
            trace!("set {key} ({} bytes)", value.len());
            Ok(())
        })
    }

    /// Erase a [`StoreKey`].
    ///
    /// Returns true if the key existed and was removed.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] if the store is read only, or an IO error if the file cannot be removed.
    pub fn erase(&self, key: &StoreKey) -> Result<bool, StorageError> {
        self.check_writable()?;
        self.with_key_lock(key, || match std::fs::remove_file(self.key_to_fspath(key)) {
            Ok(()) => {
                trace!("erase {key}");
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        })
    }

    /// Erase all keys below a [`StorePrefix`], including the prefix directory itself.
    ///
    /// Erasing the root prefix removes the contents of the base directory but keeps the directory.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] if the store is read only, or an IO error.
    pub fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        self.check_writable()?;
        let prefix_path = self.prefix_to_fs_path(prefix);
        if !prefix_path.is_dir() {
            return Ok(());
        }
        if prefix.is_root() {
            for entry in std::fs::read_dir(&prefix_path)? {
                let path = entry?.path();
                if path.is_dir() {
                    std::fs::remove_dir_all(path)?;
                } else {
                    std::fs::remove_file(path)?;
                }
            }
        } else {
            std::fs::remove_dir_all(prefix_path)?;
        }
        Ok(())
    }

    /// Create the directory of a [`StorePrefix`] (and its parents) if it does not exist.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] if the store is read only, or an IO error.
    pub fn create_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        self.check_writable()?;
        std::fs::create_dir_all(self.prefix_to_fs_path(prefix))?;
        Ok(())
    }

    /// Returns true if the key exists.
    #[must_use]
    pub fn key_exists(&self, key: &StoreKey) -> bool {
        self.key_to_fspath(key).is_file()
    }

    /// Returns true if the directory of a prefix exists.
    #[must_use]
    pub fn prefix_exists(&self, prefix: &StorePrefix) -> bool {
        self.prefix_to_fs_path(prefix).is_dir()
    }

    /// Retrieve all [`StoreKeys`] below a prefix (recursively), sorted.
    ///
    /// Values still being staged by a concurrent write are not listed.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if a directory cannot be walked.
    pub fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let prefix_path = self.prefix_to_fs_path(prefix);
        if !prefix_path.is_dir() {
            return Ok(vec![]);
        }
        let mut keys = vec![];
        for entry in WalkDir::new(prefix_path).sort_by_file_name() {
            let entry = entry.map_err(|err| StorageError::Other(err.to_string()))?;
            if entry.file_type().is_file() && is_key_file_name(entry.file_name()) {
                keys.push(self.fspath_to_key(entry.path())?);
            }
        }
        Ok(keys)
    }

    /// Retrieve the [`StoreKeys`] and [`StorePrefixes`] directly within a prefix, sorted.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the directory cannot be read.
    pub fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let prefix_path = self.prefix_to_fs_path(prefix);
        let mut keys: StoreKeys = vec![];
        let mut prefixes: StorePrefixes = vec![];
        if prefix_path.is_dir() {
            for entry in std::fs::read_dir(prefix_path)? {
                let entry = entry?;
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if entry.file_type()?.is_dir() {
                    prefixes.push(StorePrefix::new(format!("{}{name}/", prefix.as_str()))?);
                } else if !name.starts_with(STAGING_PREFIX) {
                    keys.push(prefix.key(&name)?);
                }
            }
        }
        keys.sort();
        prefixes.sort();
        Ok(StoreKeysPrefixes { keys, prefixes })
    }
}

/// Returns true if `file_name` can be the last component of a stored key.
fn is_key_file_name(file_name: &std::ffi::OsStr) -> bool {
    file_name
        .to_str()
        .is_some_and(|name| !name.starts_with(STAGING_PREFIX))
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// Base directory is an existing file.
    #[error("{0} is an existing file")]
    ExistingFile(PathBuf),
    /// Base directory does not exist.
    #[error("{0} does not exist")]
    MissingDirectory(PathBuf),
    /// The path is not valid on this system.
    #[error("base directory {0} is not valid")]
    InvalidBaseDirectory(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn filesystem_set_get_erase() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        let key = "a/b".try_into()?;
        assert_eq!(store.get(&key)?, None);
        store.set(&key, &[0, 1, 2])?;
        assert_eq!(store.get(&key)?, Some(vec![0, 1, 2]));
        store.set(&key, &[3])?;
        assert_eq!(store.get(&key)?, Some(vec![3]));
        assert!(store.key_exists(&key));
        assert!(store.erase(&key)?);
        assert!(!store.erase(&key)?);
        assert_eq!(store.get(&key)?, None);
        Ok(())
    }

    #[test]
    fn filesystem_list() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;

        store.set(&"a/b".try_into()?, &[])?;
        store.set(&"a/c".try_into()?, &[])?;
        store.set(&"a/d/e".try_into()?, &[])?;
        store.set(&"a/d/f".try_into()?, &[])?;
        store.erase(&"a/d/e".try_into()?)?;
        assert_eq!(
            store.list_prefix(&"a/".try_into()?)?,
            &["a/b".try_into()?, "a/c".try_into()?, "a/d/f".try_into()?]
        );
        assert_eq!(
            store.list_prefix(&"a/d/".try_into()?)?,
            &["a/d/f".try_into()?]
        );
        assert_eq!(
            store.list_prefix(&StorePrefix::root())?,
            &["a/b".try_into()?, "a/c".try_into()?, "a/d/f".try_into()?]
        );
        assert!(store.list_prefix(&"z/".try_into()?)?.is_empty());

        // a write in progress
        std::fs::write(path.path().join("a/d/.tmpA1b2C3"), [0])?;
        assert_eq!(
            store.list_prefix(&"a/d/".try_into()?)?,
            &["a/d/f".try_into()?]
        );
        assert_eq!(store.list_dir(&"a/d/".try_into()?)?.keys(), &["a/d/f".try_into()?]);
        Ok(())
    }

    #[test]
    fn filesystem_key_locks_released() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        for i in 0..16 {
            let key = StoreKey::new(format!("chunks/{i}"))?;
            store.set(&key, &[1])?;
            store.get(&key)?;
            store.erase(&key)?;
        }
        assert!(store.locks.lock().is_empty());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let key: StoreKey = "shared".try_into().unwrap();
                    for _ in 0..32 {
                        store.set(&key, &[2]).unwrap();
                    }
                });
            }
        });
        assert_eq!(store.get(&"shared".try_into()?)?, Some(vec![2]));
        assert!(store.locks.lock().is_empty());
        Ok(())
    }

    #[test]
    fn filesystem_list_dir() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        store.set(&"a/b".try_into()?, &[])?;
        store.set(&"a/c".try_into()?, &[])?;
        store.set(&"a/d/e".try_into()?, &[])?;
        store.set(&"a/f/g".try_into()?, &[])?;
        store.set(&"a/f/h".try_into()?, &[])?;
        store.set(&"b/c/d".try_into()?, &[])?;

        let list_dir = store.list_dir(&StorePrefix::new("a/")?)?;

        assert_eq!(list_dir.keys(), &["a/b".try_into()?, "a/c".try_into()?,]);
        assert_eq!(
            list_dir.prefixes(),
            &["a/d/".try_into()?, "a/f/".try_into()?,]
        );
        Ok(())
    }

    #[test]
    fn filesystem_erase_prefix() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        store.set(&"a/b".try_into()?, &[])?;
        store.set(&"c".try_into()?, &[])?;
        store.erase_prefix(&"a/".try_into()?)?;
        assert!(!store.prefix_exists(&"a/".try_into()?));
        assert!(store.key_exists(&"c".try_into()?));
        store.erase_prefix(&StorePrefix::root())?;
        assert!(!store.key_exists(&"c".try_into()?));
        assert!(path.path().is_dir());
        Ok(())
    }

    #[test]
    fn filesystem_readonly() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        FilesystemStore::new(path.path())?.set(&"a".try_into()?, &[1])?;
        let store = FilesystemStore::new_readonly(path.path())?;
        assert!(store.readonly());
        assert_eq!(store.get(&"a".try_into()?)?, Some(vec![1]));
        assert!(matches!(
            store.set(&"a".try_into()?, &[2]),
            Err(StorageError::ReadOnly)
        ));
        assert!(matches!(
            store.erase(&"a".try_into()?),
            Err(StorageError::ReadOnly)
        ));
        assert!(FilesystemStore::new_readonly(path.path().join("missing")).is_err());
        Ok(())
    }
}
