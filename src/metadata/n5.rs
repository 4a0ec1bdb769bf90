//! N5 metadata.
//!
//! Every N5 node has an `attributes.json` document.
//! The root document records the N5 version, e.g.
//! ```json
//! {"n5": "2.4.0"}
//! ```
//! The document of an array holds the array metadata beside user attributes:
//! ```json
//! {
//!     "dimensions": [30, 20, 10],
//!     "blockSize": [10, 10, 10],
//!     "dataType": "float32",
//!     "compression": {"type": "gzip", "level": 5, "useZlib": false},
//!     "resolution": [1.0, 1.0, 4.0]
//! }
//! ```
//! `dimensions` and `blockSize` are in column-major order (the fastest varying dimension first), the reverse of the order used by this library.
//! Documents written before N5 1.0.0 record the compression as `"compressionType": "gzip"`.

use serde::{Deserialize, Serialize};

use crate::array::{codec::CompressionOptions, ArrayShape};

use super::AttributesMap;

/// The name of the N5 metadata document.
pub const ATTRIBUTES_JSON: &str = "attributes.json";

/// The N5 version written to the root of new hierarchies.
pub const N5_VERSION: &str = "2.4.0";

/// The root attribute holding the N5 version.
pub const N5_VERSION_ATTRIBUTE: &str = "n5";

/// Attributes that are part of the array metadata and cannot be set as user attributes.
pub const RESERVED_ARRAY_ATTRIBUTES: &[&str] = &[
    "dimensions",
    "blockSize",
    "dataType",
    "compression",
    "compressionType",
];

/// The metadata of an N5 array, as stored on disk.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct N5ArrayMetadata {
    /// The array shape, fastest varying dimension first.
    pub dimensions: ArrayShape,
    /// The chunk shape, fastest varying dimension first.
    pub block_size: ArrayShape,
    /// The data type name, e.g. `uint8`.
    pub data_type: String,
    /// The compression, e.g. `{"type": "raw"}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionOptions>,
    /// The compression type of documents predating N5 1.0.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_type: Option<String>,
    /// User attributes.
    #[serde(flatten)]
    pub attributes: AttributesMap,
}

impl N5ArrayMetadata {
    /// Create N5 array metadata from a shape and chunk shape in C order.
    #[must_use]
    pub fn new(
        shape: &[u64],
        chunk_shape: &[u64],
        data_type: String,
        compression: CompressionOptions,
        attributes: AttributesMap,
    ) -> Self {
        Self {
            dimensions: shape.iter().rev().copied().collect(),
            block_size: chunk_shape.iter().rev().copied().collect(),
            data_type,
            compression: Some(compression),
            compression_type: None,
            attributes,
        }
    }

    /// The array shape in C order.
    #[must_use]
    pub fn shape(&self) -> ArrayShape {
        self.dimensions.iter().rev().copied().collect()
    }

    /// The chunk shape in C order.
    #[must_use]
    pub fn chunk_shape(&self) -> ArrayShape {
        self.block_size.iter().rev().copied().collect()
    }

    /// The compression object, converting the legacy `compressionType` form if necessary.
    #[must_use]
    pub fn compression(&self) -> CompressionOptions {
        self.compression.clone().unwrap_or_else(|| {
            let mut compression = CompressionOptions::new();
            compression.insert(
                "type".to_string(),
                serde_json::Value::from(self.compression_type.as_deref().unwrap_or("raw")),
            );
            compression
        })
    }
}

/// Returns true if an `attributes.json` document describes an array.
#[must_use]
pub fn is_array_document(attributes: &AttributesMap) -> bool {
    attributes.contains_key("dimensions") && attributes.contains_key("dataType")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn n5_array_metadata() {
        let metadata: N5ArrayMetadata = serde_json::from_value(json!({
            "dimensions": [30, 20, 10],
            "blockSize": [10, 10, 5],
            "dataType": "float32",
            "compression": {"type": "raw"},
            "resolution": [1, 2, 3]
        }))
        .unwrap();
        assert_eq!(metadata.shape(), vec![10, 20, 30]);
        assert_eq!(metadata.chunk_shape(), vec![5, 10, 10]);
        assert_eq!(metadata.attributes["resolution"], json!([1, 2, 3]));
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["blockSize"], json!([10, 10, 5]));
        assert_eq!(value["resolution"], json!([1, 2, 3]));
        assert!(value.get("compressionType").is_none());
    }

    #[test]
    fn n5_array_metadata_legacy_compression() {
        let metadata: N5ArrayMetadata = serde_json::from_value(json!({
            "dimensions": [30],
            "blockSize": [10],
            "dataType": "uint8",
            "compressionType": "gzip"
        }))
        .unwrap();
        assert_eq!(metadata.compression()["type"], json!("gzip"));
        assert!(metadata.attributes.is_empty());
    }

    #[test]
    fn n5_is_array_document() {
        let attributes = json!({"dimensions": [1], "dataType": "int8"});
        assert!(is_array_document(attributes.as_object().unwrap()));
        let attributes = json!({"n5": "2.4.0"});
        assert!(!is_array_document(attributes.as_object().unwrap()));
    }
}
