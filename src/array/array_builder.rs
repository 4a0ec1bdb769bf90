use std::sync::Arc;

use log::debug;

use crate::{
    metadata::{AttributesMap, StorageFormat},
    node::{Hierarchy, NodePath},
};

use super::{
    codec::{Compression, CompressionOptions},
    Array, ArrayCreateError, ArrayMetadata, ArrayShape, DataType, FillValue,
};

/// An [`Array`] builder.
///
/// The array builder is initialised from an array shape, data type, and chunk shape.
///  - The fill value is zero.
///  - The compression is the default of the storage format: `gzip` for N5 and `blosc` for Zarr.
///  - Attributes are empty.
///  - The number of I/O threads follows the global [`num_threads`](crate::config::Config::num_threads).
///
/// Use the methods in the array builder to change the configuration away from these defaults, and then build the array at a path of a hierarchy with [`ArrayBuilder::build`].
/// Note that [`build`](ArrayBuilder::build) does not modify the store; the array metadata has to be explicitly written with [`Array::store_metadata`].
/// [`Group::create_dataset`](crate::group::Group::create_dataset) does both.
///
/// For example:
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use n5zarr::{array::{ArrayBuilder, DataType, FillValue}, group::{File, FileMode}};
/// # let path = tempfile::TempDir::new()?;
/// let file = File::open(path.path().join("data.zarr"), FileMode::Create, None)?;
/// let mut builder = ArrayBuilder::new(vec![8, 8], DataType::Float32, vec![4, 4]);
/// builder
///     .fill_value(FillValue::from(f32::NAN))
///     .compression("zstd", &serde_json::json!({"level": 5}).as_object().unwrap().clone());
/// let array = file.create_dataset("group/array", &builder)?;
/// assert_eq!(array.chunk_grid_shape(), vec![2, 2]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ArrayBuilder {
    /// Array shape.
    pub shape: ArrayShape,
    /// Data type.
    pub data_type: DataType,
    /// Chunk shape.
    pub chunk_shape: ArrayShape,
    /// Fill value.
    pub fill_value: FillValue,
    /// The name and options of the compression, or [`None`] for the default of the storage format.
    pub compression: Option<(String, CompressionOptions)>,
    /// Attributes.
    pub attributes: AttributesMap,
    /// The number of I/O threads.
    pub num_threads: Option<usize>,
}

impl ArrayBuilder {
    /// Create a new array builder for an array at `path`.
    #[must_use]
    pub fn new(shape: ArrayShape, data_type: DataType, chunk_shape: ArrayShape) -> Self {
        Self {
            shape,
            data_type,
            chunk_shape,
            fill_value: FillValue::zero(data_type),
            compression: None,
            attributes: AttributesMap::new(),
            num_threads: None,
        }
    }

    /// Create a new builder copying the configuration of an existing array.
    #[must_use]
    pub fn from_array(array: &Array) -> Self {
        let mut builder = Self::new(
            array.shape().to_vec(),
            array.data_type(),
            array.chunk_shape().to_vec(),
        );
        builder
            .fill_value(array.fill_value().clone())
            .compression(array.compression().name(), &array.compression().options())
            .attributes(array.attributes().clone());
        builder
    }

    /// Set the shape.
    pub fn shape(&mut self, shape: ArrayShape) -> &mut Self {
        self.shape = shape;
        self
    }

    /// Set the data type.
    pub fn data_type(&mut self, data_type: DataType) -> &mut Self {
        self.data_type = data_type;
        self
    }

    /// Set the chunk shape.
    pub fn chunk_shape(&mut self, chunk_shape: ArrayShape) -> &mut Self {
        self.chunk_shape = chunk_shape;
        self
    }

    /// Set the fill value.
    ///
    /// N5 arrays only support a fill value of zero.
    pub fn fill_value(&mut self, fill_value: FillValue) -> &mut Self {
        self.fill_value = fill_value;
        self
    }

    /// Set the compression by name and options.
    ///
    /// The name and options are validated by [`build`](ArrayBuilder::build).
    /// See [`codec`](super::codec) for the supported compressions and their options.
    pub fn compression(&mut self, name: &str, options: &CompressionOptions) -> &mut Self {
        self.compression = Some((name.to_string(), options.clone()));
        self
    }

    /// Set the user attributes.
    pub fn attributes(&mut self, attributes: AttributesMap) -> &mut Self {
        self.attributes = attributes;
        self
    }

    /// Set the number of I/O threads of the array.
    pub fn num_threads(&mut self, num_threads: usize) -> &mut Self {
        self.num_threads = Some(num_threads.max(1));
        self
    }

    /// Build the metadata of the array for `format`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the compression is unknown or has invalid options, or the metadata is inconsistent or unsupported by `format`.
    pub fn build_metadata(&self, format: StorageFormat) -> Result<ArrayMetadata, ArrayCreateError> {
        let compression = match &self.compression {
            Some((name, options)) => Compression::new(name, options)?,
            None if format.is_zarr() => Compression::default_zarr(),
            None => Compression::default_n5(),
        };
        let metadata = ArrayMetadata {
            shape: self.shape.clone(),
            chunk_shape: self.chunk_shape.clone(),
            data_type: self.data_type,
            fill_value: self.fill_value.clone(),
            compression,
            attributes: self.attributes.clone(),
        };
        metadata.validate()?;
        if !format.is_zarr() {
            metadata.to_n5()?;
        }
        Ok(metadata)
    }

    /// Build into an [`Array`] in `hierarchy` at `path`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the path is invalid, the compression is unknown or has invalid options, or the metadata is inconsistent or unsupported by the storage format.
    pub fn build(&self, hierarchy: Arc<Hierarchy>, path: &str) -> Result<Array, ArrayCreateError> {
        let path: NodePath = path.try_into()?;
        let metadata = self.build_metadata(hierarchy.format())?;
        debug!(
            "build array {path} with shape {:?}, chunk shape {:?}, data type {}, and compression {}",
            metadata.shape, metadata.chunk_shape, metadata.data_type, metadata.compression
        );
        Array::new_with_metadata(hierarchy, path, metadata, self.num_threads)
    }
}
