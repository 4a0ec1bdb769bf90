//! Zarr V2 metadata.
//!
//! A group has a `.zgroup` document and an array a `.zarray` document.
//! User attributes of either are stored in a separate `.zattrs` document.
//!
//! An example `.zarray`:
//! ```json
//! {
//!     "zarr_format": 2,
//!     "shape": [10000, 10000],
//!     "chunks": [1000, 1000],
//!     "dtype": "<f8",
//!     "compressor": {"id": "blosc", "cname": "lz4", "clevel": 5, "shuffle": 1, "blocksize": 0},
//!     "fill_value": "NaN",
//!     "order": "C",
//!     "filters": null,
//!     "dimension_separator": "."
//! }
//! ```

use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::array::{codec::CompressionOptions, ArrayShape, ChunkKeySeparator};

/// The name of the Zarr V2 array metadata document.
pub const ZARRAY: &str = ".zarray";

/// The name of the Zarr V2 group metadata document.
pub const ZGROUP: &str = ".zgroup";

/// The name of the Zarr V2 attributes document.
pub const ZATTRS: &str = ".zattrs";

/// The memory layout of chunks.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum ArrayMetadataV2Order {
    /// Row-major order. The last dimension varies fastest.
    #[display("C")]
    C,
    /// Column-major order. The first dimension varies fastest.
    #[display("F")]
    F,
}

/// Zarr V2 array metadata.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ArrayMetadataV2 {
    /// An integer defining the version of the storage specification.
    pub zarr_format: monostate::MustBe!(2u64),
    /// The array shape.
    pub shape: ArrayShape,
    /// The chunk shape.
    pub chunks: ArrayShape,
    /// The data type, e.g. `<f4`.
    pub dtype: String,
    /// The compressor, or `null` for no compression.
    pub compressor: Option<CompressionOptions>,
    /// The fill value, a number, `null`, or one of `"NaN"`, `"Infinity"`, `"-Infinity"`.
    pub fill_value: Value,
    /// The memory layout of chunks.
    pub order: ArrayMetadataV2Order,
    /// Filters applied before compression.
    #[serde(default)]
    pub filters: Option<Vec<Value>>,
    /// The separator of the chunk grid indices in chunk keys.
    #[serde(default)]
    pub dimension_separator: ChunkKeySeparator,
}

impl ArrayMetadataV2 {
    /// Create Zarr V2 array metadata.
    #[must_use]
    pub fn new(
        shape: ArrayShape,
        chunks: ArrayShape,
        dtype: String,
        compressor: Option<CompressionOptions>,
        fill_value: Value,
        dimension_separator: ChunkKeySeparator,
    ) -> Self {
        Self {
            zarr_format: monostate::MustBe!(2u64),
            shape,
            chunks,
            dtype,
            compressor,
            fill_value,
            order: ArrayMetadataV2Order::C,
            filters: None,
            dimension_separator,
        }
    }
}

/// Zarr V2 group metadata.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct GroupMetadataV2 {
    /// An integer defining the version of the storage specification.
    pub zarr_format: monostate::MustBe!(2u64),
}

impl Default for GroupMetadataV2 {
    fn default() -> Self {
        Self {
            zarr_format: monostate::MustBe!(2u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_metadata_v2() {
        let metadata: ArrayMetadataV2 = serde_json::from_value(json!({
            "zarr_format": 2,
            "shape": [100, 100],
            "chunks": [10, 10],
            "dtype": "<f8",
            "compressor": null,
            "fill_value": "NaN",
            "order": "C",
            "filters": null
        }))
        .unwrap();
        assert_eq!(metadata.dimension_separator, ChunkKeySeparator::Dot);
        assert_eq!(metadata.fill_value, json!("NaN"));
        assert!(metadata.compressor.is_none());

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["zarr_format"], json!(2));
        assert_eq!(value["dimension_separator"], json!("."));
        assert_eq!(value["filters"], Value::Null);
    }

    #[test]
    fn array_metadata_v2_invalid_format() {
        assert!(serde_json::from_value::<ArrayMetadataV2>(json!({
            "zarr_format": 3,
            "shape": [100],
            "chunks": [10],
            "dtype": "<f8",
            "compressor": null,
            "fill_value": 0,
            "order": "C",
            "filters": null
        }))
        .is_err());
    }

    #[test]
    fn group_metadata_v2() {
        assert_eq!(
            serde_json::to_value(GroupMetadataV2::default()).unwrap(),
            json!({"zarr_format": 2})
        );
    }
}
