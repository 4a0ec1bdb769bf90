//! On-disk metadata documents.
//!
//! Two storage formats are supported:
//!  - [N5](https://github.com/saalfeldlab/n5): every node has an `attributes.json` document.
//!    Array metadata and user attributes share that document.
//!  - [Zarr V2](https://zarr.readthedocs.io/en/stable/spec/v2.html): groups have a `.zgroup` document, arrays have a `.zarray` document, and user attributes are in `.zattrs`.
//!
//! See [`n5`] and [`v2`] for the document types.

pub mod n5;
pub mod v2;

use derive_more::Display;
use serde_json::Value;

use crate::{
    array::ChunkKeySeparator,
    storage::{FilesystemStore, StorageError, StoreKey},
};

/// A map of user attributes.
pub type AttributesMap = serde_json::Map<String, Value>;

/// The storage format of a hierarchy.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum StorageFormat {
    /// The N5 format.
    #[display("n5")]
    N5,
    /// The Zarr V2 format, with the chunk key separator used for new arrays.
    #[display("zarr")]
    Zarr {
        /// The chunk key separator of new arrays.
        separator: ChunkKeySeparator,
    },
}

impl StorageFormat {
    /// The Zarr format with the default `.` chunk key separator.
    #[must_use]
    pub const fn zarr() -> Self {
        Self::Zarr {
            separator: ChunkKeySeparator::Dot,
        }
    }

    /// Returns true if this is the Zarr format.
    #[must_use]
    pub const fn is_zarr(&self) -> bool {
        matches!(self, Self::Zarr { .. })
    }

    /// Returns true if this format supports varlength chunks.
    #[must_use]
    pub const fn supports_varlength(&self) -> bool {
        matches!(self, Self::N5)
    }

    /// Infer the format from the extension of a path: `.n5` is N5, `.zarr` and `.zr` are Zarr.
    #[must_use]
    pub fn from_extension(path: &std::path::Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "n5" => Some(Self::N5),
            "zarr" | "zr" => Some(Self::zarr()),
            _ => None,
        }
    }
}

/// Read a JSON object from `key`, returning [`None`] if the key does not exist.
///
/// # Errors
/// Returns [`StorageError`] if the key cannot be read or is not a JSON object.
pub(crate) fn read_json(
    store: &FilesystemStore,
    key: &StoreKey,
) -> Result<Option<AttributesMap>, StorageError> {
    let Some(bytes) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(StorageError::InvalidMetadata(
            key.clone(),
            "expected a JSON object".to_string(),
        )),
        Err(err) => Err(StorageError::InvalidMetadata(key.clone(), err.to_string())),
    }
}

/// Write `value` as pretty-printed JSON to `key`.
///
/// # Errors
/// Returns [`StorageError`] if the value cannot be serialised or stored.
pub(crate) fn write_json<T: serde::Serialize>(
    store: &FilesystemStore,
    key: &StoreKey,
    value: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|err| StorageError::InvalidMetadata(key.clone(), err.to_string()))?;
    store.set(key, &json)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn storage_format_from_extension() {
        assert_eq!(
            StorageFormat::from_extension(Path::new("/tmp/data.n5")),
            Some(StorageFormat::N5)
        );
        assert_eq!(
            StorageFormat::from_extension(Path::new("data.zr")),
            Some(StorageFormat::zarr())
        );
        assert_eq!(StorageFormat::from_extension(Path::new("data")), None);
        assert!(StorageFormat::zarr().is_zarr());
        assert!(!StorageFormat::zarr().supports_varlength());
    }

    #[test]
    fn json_round_trip() {
        let path = tempfile::TempDir::new().unwrap();
        let store = FilesystemStore::new(path.path()).unwrap();
        let key = StoreKey::new("a/attributes.json").unwrap();
        assert!(read_json(&store, &key).unwrap().is_none());
        write_json(&store, &key, &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(
            read_json(&store, &key).unwrap().unwrap()["a"],
            serde_json::json!(1)
        );
        store.set(&key, b"[1]").unwrap();
        assert!(read_json(&store, &key).is_err());
    }
}
