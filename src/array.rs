//! Arrays (datasets).
//!
//! An array is a node of a hierarchy holding N-dimensional data of a numeric [`DataType`], split into a regular grid of chunks.
//! Each chunk is compressed and stored separately, so only the chunks intersecting a selection are read or written.
//!
//! Use [`ArrayBuilder`] to create a new array within a [`Group`](crate::group::Group), or [`Group::open_array`](crate::group::Group::open_array) for an existing array.
//! The documentation for [`Array`] details how to interact with arrays.

#[macro_use]
mod element;

mod array_builder;
mod array_errors;
mod array_metadata;
mod array_operand;
mod array_sync_readable;
mod array_sync_writable;
pub mod chunk_header;
pub mod chunk_key_encoding;
pub mod codec;
pub mod concurrency;
pub mod data_type;
mod endianness;
mod fill_value;

use std::sync::Arc;

pub use self::{
    array_builder::ArrayBuilder,
    array_errors::{ArrayCreateError, ArrayError, ErrorClass},
    array_metadata::ArrayMetadata,
    array_operand::{Operand, Scalar},
    chunk_key_encoding::{ChunkKeyEncoding, ChunkKeySeparator},
    codec::{Compression, CompressionOptions},
    concurrency::IoOptions,
    data_type::DataType,
    element::Element,
    endianness::{Endianness, NATIVE_ENDIAN},
    fill_value::FillValue,
};

use log::debug;

use crate::{
    array_subset::ArraySubset,
    config::global_config,
    group::{File, Group},
    metadata::{
        n5::{N5ArrayMetadata, ATTRIBUTES_JSON, RESERVED_ARRAY_ATTRIBUTES},
        read_json,
        v2::{ArrayMetadataV2, ZARRAY, ZATTRS},
        write_json, AttributesMap, StorageFormat,
    },
    node::{Hierarchy, NodeId, NodeKind, NodePath},
    storage::{FilesystemStore, StorageError, StoreKey, StoreKeys, StorePrefix},
};

/// An ND index to an element in an array.
pub type ArrayIndices = Vec<u64>;

/// The shape of an array.
pub type ArrayShape = Vec<u64>;

/// The result of a typed read: a scalar if every dimension was integer-indexed, otherwise an array.
#[derive(Clone, Debug, PartialEq)]
pub enum Selected<T> {
    /// A single element.
    Scalar(T),
    /// An array with the logical shape of the selection.
    Array(ndarray::ArrayD<T>),
}

impl<T: Clone> Selected<T> {
    /// Convert into an array, a 0-dimensional array for a scalar.
    #[must_use]
    pub fn into_array(self) -> ndarray::ArrayD<T> {
        match self {
            Self::Scalar(value) => ndarray::arr0(value).into_dyn(),
            Self::Array(array) => array,
        }
    }
}

/// An array (dataset).
///
/// ### Metadata
///
/// An array is defined by:
///  - **shape**: the length of each dimension, fixed at creation,
///  - **chunk shape**: the shape of each chunk of the regular chunk grid,
///  - **data type**: one of the fixed size numeric [`DataType`]s,
///  - **fill value**: the value of elements that have never been written, always zero for N5,
///  - **compression**: the [`Compression`] applied to every chunk, and
///  - **attributes**: user-defined attributes.
///
/// ### Chunks
///
/// A chunk that does not exist in the store reads as the fill value.
/// By default, a chunk whose elements all equal the fill value after a write is erased rather than stored (see [`IoOptions::write_empty_chunks`]).
///
/// N5 chunks at the upper boundary of the array store only the part within the array.
/// Zarr chunks are always stored with the full chunk shape, padded with the fill value.
///
/// ### Methods
///
/// Selections are lists of [`IndexElement`](crate::selection::IndexElement)s, most conveniently written with the [`sel!`](crate::sel) macro.
///  - read: [`read`](Array::read), [`read_array`](Array::read_array), [`read_direct`](Array::read_direct), [`read_chunk`](Array::read_chunk)
///  - write: [`write`](Array::write), [`write_scalar`](Array::write_scalar), [`assign`](Array::assign), [`write_direct`](Array::write_direct), [`write_chunk`](Array::write_chunk)
///
/// Each method has an `_opt` variant taking [`IoOptions`].
/// Chunks are read and written in parallel on a worker pool of [`n_threads`](Array::n_threads) threads, unless the options say otherwise.
#[derive(Clone, Debug)]
pub struct Array {
    hierarchy: Arc<Hierarchy>,
    id: NodeId,
    path: NodePath,
    metadata: ArrayMetadata,
    chunk_key_encoding: ChunkKeyEncoding,
    num_threads: Option<usize>,
}

impl Array {
    /// Create an array in `hierarchy` at `path` with `metadata`.
    ///
    /// This does not write to the store, use [`store_metadata`](Array::store_metadata) to write the metadata.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the metadata is invalid for the storage format.
    pub fn new_with_metadata(
        hierarchy: Arc<Hierarchy>,
        path: NodePath,
        metadata: ArrayMetadata,
        num_threads: Option<usize>,
    ) -> Result<Self, ArrayCreateError> {
        metadata.validate()?;
        let chunk_key_encoding = match hierarchy.format() {
            StorageFormat::N5 => {
                // checks the fill value and reserved attributes
                metadata.to_n5()?;
                ChunkKeyEncoding::N5
            }
            StorageFormat::Zarr { separator } => ChunkKeyEncoding::Zarr(separator),
        };
        let id = hierarchy.register(&path, NodeKind::Array);
        Ok(Self {
            hierarchy,
            id,
            path,
            metadata,
            chunk_key_encoding,
            num_threads,
        })
    }

    /// Open the existing array in `hierarchy` at `path`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if there is no array at `path`, or its metadata is invalid or unsupported.
    pub fn open(hierarchy: Arc<Hierarchy>, path: &str) -> Result<Self, ArrayCreateError> {
        let path: NodePath = path.try_into()?;
        let prefix = StorePrefix::from(&path);
        let store = hierarchy.store();
        let missing = || ArrayCreateError::MissingMetadata(path.to_string());
        let (metadata, chunk_key_encoding) = match hierarchy.format() {
            StorageFormat::N5 => {
                let attributes =
                    read_json(store, &prefix.key(ATTRIBUTES_JSON).map_err(StorageError::from)?)?
                        .filter(crate::metadata::n5::is_array_document)
                        .ok_or_else(missing)?;
                let metadata: N5ArrayMetadata =
                    serde_json::from_value(serde_json::Value::Object(attributes))?;
                (ArrayMetadata::from_n5(metadata)?, ChunkKeyEncoding::N5)
            }
            StorageFormat::Zarr { .. } => {
                let zarray = read_json(store, &prefix.key(ZARRAY).map_err(StorageError::from)?)?
                    .ok_or_else(missing)?;
                let metadata: ArrayMetadataV2 =
                    serde_json::from_value(serde_json::Value::Object(zarray))?;
                let attributes = read_json(store, &prefix.key(ZATTRS).map_err(StorageError::from)?)?
                    .unwrap_or_default();
                let (metadata, separator) = ArrayMetadata::from_v2(metadata, attributes)?;
                (metadata, ChunkKeyEncoding::Zarr(separator))
            }
        };
        debug!("opened array {path} with shape {:?}", metadata.shape);
        let id = hierarchy.register(&path, NodeKind::Array);
        Ok(Self {
            hierarchy,
            id,
            path,
            metadata,
            chunk_key_encoding,
            num_threads: None,
        })
    }

    /// Store the metadata of the array.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the metadata is invalid for the storage format or there is an underlying store error.
    pub fn store_metadata(&self) -> Result<(), ArrayCreateError> {
        let prefix = self.prefix();
        let store = self.store();
        match self.chunk_key_encoding {
            ChunkKeyEncoding::N5 => {
                let key = prefix.key(ATTRIBUTES_JSON).map_err(StorageError::from)?;
                write_json(store, &key, &self.metadata.to_n5()?)?;
            }
            ChunkKeyEncoding::Zarr(separator) => {
                let key = prefix.key(ZARRAY).map_err(StorageError::from)?;
                write_json(store, &key, &self.metadata.to_v2(separator)?)?;
                let key = prefix.key(ZATTRS).map_err(StorageError::from)?;
                if self.metadata.attributes.is_empty() {
                    store.erase(&key)?;
                } else {
                    write_json(store, &key, &self.metadata.attributes)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn store(&self) -> &FilesystemStore {
        self.hierarchy.store()
    }

    fn prefix(&self) -> StorePrefix {
        StorePrefix::from(&self.path)
    }

    /// Get the node path.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// The absolute name of the array, e.g. `/group/array`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.as_str()
    }

    /// The last component of the array path.
    #[must_use]
    pub fn basename(&self) -> &str {
        self.path.name()
    }

    /// The group containing the array.
    #[must_use]
    pub fn parent(&self) -> Group {
        let parent = self
            .hierarchy
            .parent(self.id)
            .unwrap_or_else(|| self.hierarchy.root());
        Group::from_node(self.hierarchy.clone(), parent)
    }

    /// The file (root group) containing the array.
    #[must_use]
    pub fn file(&self) -> File {
        File::from_hierarchy(self.hierarchy.clone())
    }

    /// The storage format of the array.
    #[must_use]
    pub fn format(&self) -> StorageFormat {
        match self.chunk_key_encoding {
            ChunkKeyEncoding::N5 => StorageFormat::N5,
            ChunkKeyEncoding::Zarr(separator) => StorageFormat::Zarr { separator },
        }
    }

    /// Returns true if the array is stored in the Zarr format.
    #[must_use]
    pub fn is_zarr(&self) -> bool {
        self.format().is_zarr()
    }

    /// The byte order of stored chunks: big endian for N5, little endian for Zarr.
    #[must_use]
    pub const fn endianness(&self) -> Endianness {
        match self.chunk_key_encoding {
            ChunkKeyEncoding::N5 => Endianness::Big,
            ChunkKeyEncoding::Zarr(_) => Endianness::Little,
        }
    }

    /// Get the metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ArrayMetadata {
        &self.metadata
    }

    /// Get the data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.metadata.data_type
    }

    /// Get the fill value.
    #[must_use]
    pub const fn fill_value(&self) -> &FillValue {
        &self.metadata.fill_value
    }

    /// Get the compression.
    #[must_use]
    pub const fn compression(&self) -> &Compression {
        &self.metadata.compression
    }

    /// Get the array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.metadata.shape
    }

    /// Get the chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &[u64] {
        &self.metadata.chunk_shape
    }

    /// Get the chunk key encoding.
    #[must_use]
    pub const fn chunk_key_encoding(&self) -> &ChunkKeyEncoding {
        &self.chunk_key_encoding
    }

    /// The dimensionality of the array.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.metadata.shape.len()
    }

    /// The number of elements in the array.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.metadata.shape.iter().product()
    }

    /// The number of worker threads used by I/O methods without explicit [`IoOptions`].
    ///
    /// Defaults to the global [`num_threads`](crate::config::Config::num_threads).
    #[must_use]
    pub fn n_threads(&self) -> usize {
        self.num_threads
            .unwrap_or_else(|| global_config().num_threads())
    }

    /// Set the number of worker threads used by I/O methods without explicit [`IoOptions`].
    pub fn set_n_threads(&mut self, num_threads: usize) {
        self.num_threads = Some(num_threads.max(1));
    }

    /// The I/O options used by methods without an `_opt` suffix.
    #[must_use]
    pub fn io_options(&self) -> IoOptions {
        let mut options = IoOptions::default();
        if let Some(num_threads) = self.num_threads {
            options.set_num_threads(num_threads);
        }
        options
    }

    /// Get the user attributes.
    #[must_use]
    pub const fn attributes(&self) -> &AttributesMap {
        &self.metadata.attributes
    }

    /// Mutably borrow the user attributes.
    ///
    /// Use [`store_metadata`](Array::store_metadata) to persist changes.
    #[must_use]
    pub fn attributes_mut(&mut self) -> &mut AttributesMap {
        &mut self.metadata.attributes
    }

    /// Set the user attribute `key` to `value` and store the metadata.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if `key` is reserved by the array metadata of the storage format, or there is an underlying store error.
    pub fn set_attribute(
        &mut self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), ArrayError> {
        if !self.is_zarr() && RESERVED_ARRAY_ATTRIBUTES.contains(&key) {
            return Err(ArrayCreateError::ReservedAttribute(key.to_string()).into());
        }
        self.metadata.attributes.insert(key.to_string(), value);
        self.store_metadata()?;
        Ok(())
    }

    /// Return the shape of the chunk grid, the number of chunks in each dimension.
    #[must_use]
    pub fn chunk_grid_shape(&self) -> ArrayShape {
        std::iter::zip(self.shape(), self.chunk_shape())
            .map(|(&size, &chunk_size)| size.div_ceil(chunk_size))
            .collect()
    }

    /// The number of chunks in the chunk grid.
    #[must_use]
    pub fn num_chunks(&self) -> u64 {
        self.chunk_grid_shape().iter().product()
    }

    fn validate_chunk_indices(&self, chunk_indices: &[u64]) -> Result<(), ArrayError> {
        let chunk_grid_shape = self.chunk_grid_shape();
        if chunk_indices.len() == chunk_grid_shape.len()
            && std::iter::zip(chunk_indices, &chunk_grid_shape).all(|(i, n)| i < n)
        {
            Ok(())
        } else {
            Err(ArrayError::InvalidChunkGridIndices(
                chunk_indices.to_vec(),
                chunk_grid_shape,
            ))
        }
    }

    /// Return the subset of the array covered by the chunk at `chunk_indices`, bounded by the array shape.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkGridIndices`] if the chunk indices are outside of the chunk grid.
    pub fn chunk_subset(&self, chunk_indices: &[u64]) -> Result<ArraySubset, ArrayError> {
        self.validate_chunk_indices(chunk_indices)?;
        let ranges: Vec<_> = itertools::izip!(chunk_indices, self.chunk_shape(), self.shape())
            .map(|(&index, &chunk_size, &size)| {
                let start = index * chunk_size;
                start..std::cmp::min(start + chunk_size, size)
            })
            .collect();
        Ok(ArraySubset::new_with_ranges(&ranges))
    }

    /// The shape of the chunk at `chunk_indices` as stored: bounded by the array shape for N5, the full chunk shape for Zarr.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkGridIndices`] if the chunk indices are outside of the chunk grid.
    pub fn stored_chunk_shape(&self, chunk_indices: &[u64]) -> Result<ArrayShape, ArrayError> {
        let bounded = self.chunk_subset(chunk_indices)?;
        Ok(match self.chunk_key_encoding {
            ChunkKeyEncoding::N5 => bounded.shape().to_vec(),
            ChunkKeyEncoding::Zarr(_) => self.chunk_shape().to_vec(),
        })
    }

    /// Return the store key of the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkGridIndices`] if the chunk indices are outside of the chunk grid.
    pub fn chunk_key(&self, chunk_indices: &[u64]) -> Result<StoreKey, ArrayError> {
        self.validate_chunk_indices(chunk_indices)?;
        let key = self.chunk_key_encoding.encode(chunk_indices);
        Ok(self.prefix().key(&key).map_err(StorageError::from)?)
    }

    /// Returns true if the chunk at `chunk_indices` is stored.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkGridIndices`] if the chunk indices are outside of the chunk grid.
    pub fn chunk_exists(&self, chunk_indices: &[u64]) -> Result<bool, ArrayError> {
        Ok(self.store().key_exists(&self.chunk_key(chunk_indices)?))
    }

    /// Return the chunk grid indices of every stored chunk, in lexicographical order.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the array prefix cannot be listed.
    pub fn existing_chunks(&self) -> Result<Vec<ArrayIndices>, StorageError> {
        let prefix = self.prefix();
        let chunk_grid_shape = self.chunk_grid_shape();
        let mut chunks: Vec<ArrayIndices> = self
            .store()
            .list_prefix(&prefix)?
            .iter()
            .filter_map(|key| {
                let relative = &key.as_str()[prefix.as_str().len()..];
                self.chunk_key_encoding.decode(relative)
            })
            .filter(|indices| {
                indices.len() == chunk_grid_shape.len()
                    && std::iter::zip(indices, &chunk_grid_shape).all(|(i, n)| i < n)
            })
            .collect();
        chunks.sort();
        Ok(chunks)
    }

    /// Return the store keys of every stored chunk.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the array prefix cannot be listed.
    pub fn chunk_keys(&self) -> Result<StoreKeys, StorageError> {
        self.existing_chunks()?
            .iter()
            .map(|chunk_indices| {
                self.prefix()
                    .key(&self.chunk_key_encoding.encode(chunk_indices))
                    .map_err(StorageError::from)
            })
            .collect()
    }

    /// Erase the chunk at `chunk_indices`, returning true if it existed.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if the chunk indices are outside of the chunk grid or there is an underlying store error.
    pub fn erase_chunk(&self, chunk_indices: &[u64]) -> Result<bool, ArrayError> {
        Ok(self.store().erase(&self.chunk_key(chunk_indices)?)?)
    }

    /// Create a builder with the metadata of this array.
    #[must_use]
    pub fn builder(&self) -> ArrayBuilder {
        ArrayBuilder::from_array(self)
    }

    fn check_element_type<T: Element>(&self) -> Result<(), ArrayError> {
        if T::DATA_TYPE == self.data_type() {
            Ok(())
        } else {
            Err(ArrayError::IncompatibleElementType(
                T::DATA_TYPE,
                self.data_type(),
            ))
        }
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.hierarchy, &other.hierarchy) && self.id == other.id
    }
}

/// Unravel a linearised index to ND indices.
#[must_use]
pub fn unravel_index(mut index: u64, shape: &[u64]) -> ArrayIndices {
    let mut indices = vec![0; shape.len()];
    for (indices_i, &dim) in std::iter::zip(indices.iter_mut().rev(), shape.iter().rev()) {
        if dim == 0 {
            return vec![0; shape.len()];
        }
        *indices_i = index % dim;
        index /= dim;
    }
    indices
}

/// Convert a `u64` shape to a `usize` shape.
pub(crate) fn shape_to_usize(shape: &[u64]) -> Result<Vec<usize>, ArrayError> {
    shape.iter().map(|&size| to_usize(size)).collect()
}

pub(crate) fn to_usize(index: u64) -> Result<usize, ArrayError> {
    usize::try_from(index).map_err(|_| ArrayError::from(format!("{index} exceeds usize::MAX")))
}

/// The `ndarray` slice of an array subset.
pub(crate) fn subset_slice_info(
    subset: &ArraySubset,
) -> Result<Vec<ndarray::SliceInfoElem>, ArrayError> {
    std::iter::zip(subset.start(), subset.end_exc())
        .map(|(&start, end)| Ok(ndarray::SliceInfoElem::from(to_usize(start)?..to_usize(end)?)))
        .collect()
}

/// Convert a `usize` shape to a `u64` shape.
pub(crate) fn shape_to_u64(shape: &[usize]) -> ArrayShape {
    shape.iter().map(|&size| size as u64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_unravel_index() {
        assert_eq!(unravel_index(6, &[2, 2, 3]), vec![1, 0, 0]);
        assert_eq!(unravel_index(0, &[]), Vec::<u64>::new());
        assert_eq!(unravel_index(0, &[0, 3]), vec![0, 0]);
    }

    #[test]
    fn selected_into_array() {
        assert_eq!(Selected::Scalar(1u8).into_array().ndim(), 0);
        let array = ndarray::ArrayD::<u8>::zeros(vec![2]);
        assert_eq!(Selected::Array(array.clone()).into_array(), array);
    }
}
