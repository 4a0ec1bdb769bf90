use derive_more::Display;
use thiserror::Error;

use crate::{
    array_subset::{ArrayExtractBytesError, ArrayStoreBytesError, IncompatibleDimensionalityError},
    group::GroupCreateError,
    node::NodePathError,
    selection::SelectionError,
    storage::StorageError,
};

use super::{
    codec::{CodecError, CompressionCreateError},
    data_type::{
        IncompatibleFillValueError, IncompatibleFillValueMetadataError, UnsupportedDataTypeError,
    },
    ArrayIndices, ArrayShape, DataType, FillValue,
};

/// The class of an error, for mapping errors onto the error types of a binding layer.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum ErrorClass {
    /// A malformed selection.
    #[display("invalid selection")]
    InvalidSelection,
    /// An integer index outside of its dimension.
    #[display("index out of range")]
    IndexOutOfRange,
    /// An unsupported index element or value type.
    #[display("type mismatch")]
    TypeMismatch,
    /// A value whose shape does not match the selection.
    #[display("shape mismatch")]
    ShapeMismatch,
    /// A value that cannot be converted to the array data type.
    #[display("coercion")]
    Coercion,
    /// An invalid array, compression, or format configuration.
    #[display("configuration")]
    Configuration,
    /// A storage failure.
    #[display("storage")]
    Storage,
    /// A compression or chunk encoding failure.
    #[display("codec")]
    Codec,
    /// Any other error.
    #[display("other")]
    Other,
}

/// An array creation error.
#[derive(Debug, Error)]
pub enum ArrayCreateError {
    /// An invalid node path
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// Unsupported data type.
    #[error(transparent)]
    DataTypeCreateError(#[from] UnsupportedDataTypeError),
    /// Invalid fill value metadata.
    #[error(transparent)]
    InvalidFillValueMetadata(#[from] IncompatibleFillValueMetadataError),
    /// Invalid fill value.
    #[error(transparent)]
    InvalidFillValue(#[from] IncompatibleFillValueError),
    /// A non-zero fill value for an N5 array.
    #[error("N5 arrays have a fill value of zero, got {0}")]
    NonZeroN5FillValue(FillValue),
    /// Error creating the compression.
    #[error(transparent)]
    CompressionCreateError(#[from] CompressionCreateError),
    /// An array with no dimensions.
    #[error("arrays must have at least one dimension")]
    ZeroDimensional,
    /// The chunk shape is incompatible with the array shape.
    #[error("chunk shape {_0:?} is incompatible with array shape {_1:?}")]
    InvalidChunkShape(ArrayShape, ArrayShape),
    /// An existing array does not match the requested shape and data type.
    #[error("array {path} has shape {shape:?} and data type {data_type}, requested shape {requested_shape:?} and data type {requested_data_type}")]
    RequireMismatch {
        /// The array path.
        path: String,
        /// The shape of the existing array.
        shape: ArrayShape,
        /// The data type of the existing array.
        data_type: DataType,
        /// The requested shape.
        requested_shape: ArrayShape,
        /// The requested data type.
        requested_data_type: DataType,
    },
    /// A node already exists at the path.
    #[error("a node already exists at {0}")]
    AlreadyExists(String),
    /// An attribute name is reserved by the array metadata.
    #[error("attribute {0} is reserved")]
    ReservedAttribute(String),
    /// Metadata describing an unsupported feature.
    #[error("unsupported array metadata: {0}")]
    UnsupportedMetadata(String),
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An error deserializing the metadata.
    #[error(transparent)]
    MetadataDeserializationError(#[from] serde_json::Error),
    /// Missing metadata.
    #[error("array metadata is missing at {0}")]
    MissingMetadata(String),
    /// An error creating the groups containing the array.
    #[error(transparent)]
    GroupCreateError(#[from] Box<GroupCreateError>),
}

impl ArrayCreateError {
    /// The class of the error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::GroupCreateError(err) => err.class(),
            Self::DataTypeCreateError(_)
            | Self::InvalidFillValueMetadata(_)
            | Self::InvalidFillValue(_)
            | Self::NonZeroN5FillValue(_)
            | Self::CompressionCreateError(_)
            | Self::ZeroDimensional
            | Self::InvalidChunkShape(..)
            | Self::RequireMismatch { .. }
            | Self::AlreadyExists(_)
            | Self::ReservedAttribute(_)
            | Self::UnsupportedMetadata(_) => ErrorClass::Configuration,
            Self::StorageError(_)
            | Self::MetadataDeserializationError(_)
            | Self::MissingMetadata(_) => ErrorClass::Storage,
            Self::NodePathError(_) => ErrorClass::Other,
        }
    }
}

/// Array errors.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// A selection error.
    #[error(transparent)]
    SelectionError(#[from] SelectionError),
    /// A value whose shape does not match the selection shape.
    #[error("value with shape {got:?} does not match the selection shape {expected:?}")]
    ShapeMismatch {
        /// The shape of the value.
        got: ArrayShape,
        /// The selection shape.
        expected: ArrayShape,
    },
    /// A value of an unsupported type.
    #[error("cannot assign a value of type {0}")]
    TypeMismatch(String),
    /// A value that cannot be converted to the data type of the array.
    #[error("cannot convert {_0} to {_1}")]
    Coercion(String, DataType),
    /// A variable length chunk write to a format that does not support it.
    #[error("variable length chunks are not supported by the {0} format")]
    VariableLengthUnsupported(String),
    /// A variable length chunk was encountered by an operation that requires a fixed size chunk.
    #[error("chunk {_0:?} is a variable length chunk")]
    UnexpectedVariableLengthChunk(ArrayIndices),
    /// The element type does not match the data type of the array.
    #[error("element type {_0} is incompatible with data type {_1}")]
    IncompatibleElementType(DataType, DataType),
    /// Invalid chunk grid indices.
    #[error("chunk grid indices {_0:?} are outside of the chunk grid {_1:?}")]
    InvalidChunkGridIndices(ArrayIndices, ArrayShape),
    /// A chunk with an unexpected shape.
    #[error("chunk {chunk_indices:?} has shape {got:?}, expected {expected:?}")]
    UnexpectedChunkShape {
        /// The chunk grid indices.
        chunk_indices: ArrayIndices,
        /// The chunk shape.
        got: ArrayShape,
        /// The expected chunk shape.
        expected: ArrayShape,
    },
    /// Incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionalityError(#[from] IncompatibleDimensionalityError),
    /// Error extracting the bytes of an array subset.
    #[error(transparent)]
    ArrayExtractBytesError(#[from] ArrayExtractBytesError),
    /// Error storing the bytes of an array subset.
    #[error(transparent)]
    ArrayStoreBytesError(#[from] ArrayStoreBytesError),
    /// An ndarray shape error.
    #[error(transparent)]
    NdarrayShapeError(#[from] ndarray::ShapeError),
    /// The worker pool could not be built.
    #[error(transparent)]
    ThreadPoolBuildError(#[from] rayon::ThreadPoolBuildError),
    /// Invalid array metadata.
    #[error(transparent)]
    ArrayCreateError(#[from] ArrayCreateError),
    /// A store error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// A codec error.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// An error serializing the metadata.
    #[error(transparent)]
    MetadataSerializationError(#[from] serde_json::Error),
    /// Other
    #[error("{_0}")]
    Other(String),
}

impl ArrayError {
    /// The class of the error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::SelectionError(SelectionError::InvalidSelection(_)) => {
                ErrorClass::InvalidSelection
            }
            Self::SelectionError(SelectionError::IndexOutOfRange { .. }) => {
                ErrorClass::IndexOutOfRange
            }
            Self::SelectionError(SelectionError::TypeMismatch(_)) | Self::TypeMismatch(_) => {
                ErrorClass::TypeMismatch
            }
            Self::ShapeMismatch { .. } | Self::NdarrayShapeError(_) => ErrorClass::ShapeMismatch,
            Self::Coercion(..) => ErrorClass::Coercion,
            Self::VariableLengthUnsupported(_) | Self::IncompatibleElementType(..) => {
                ErrorClass::Configuration
            }
            Self::ArrayCreateError(err) => err.class(),
            Self::StorageError(_) | Self::MetadataSerializationError(_) => ErrorClass::Storage,
            Self::CodecError(_)
            | Self::UnexpectedChunkShape { .. }
            | Self::UnexpectedVariableLengthChunk(_) => ErrorClass::Codec,
            Self::InvalidChunkGridIndices(..)
            | Self::IncompatibleDimensionalityError(_)
            | Self::ArrayExtractBytesError(_)
            | Self::ArrayStoreBytesError(_)
            | Self::ThreadPoolBuildError(_)
            | Self::Other(_) => ErrorClass::Other,
        }
    }
}

impl From<&str> for ArrayError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for ArrayError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
