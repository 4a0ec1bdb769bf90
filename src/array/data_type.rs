//! Data types.

use derive_more::{Display, From};
use serde_json::Value;
use thiserror::Error;

use super::{element::Element, FillValue};

/// A numeric data type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
#[rustfmt::skip]
pub enum DataType {
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    #[display("int8")]
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    #[display("int16")]
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    #[display("int32")]
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    #[display("int64")]
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    #[display("uint8")]
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    #[display("uint16")]
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    #[display("uint32")]
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    #[display("uint64")]
    UInt64,
    /// `float32` IEEE 754 single-precision floating point: sign bit, 8 bits exponent, 23 bits mantissa.
    #[display("float32")]
    Float32,
    /// `float64` IEEE 754 double-precision floating point: sign bit, 11 bits exponent, 52 bits mantissa.
    #[display("float64")]
    Float64,
}

/// An unsupported data type error.
#[derive(Debug, Error, From)]
#[error("unsupported data type {_0}")]
pub struct UnsupportedDataTypeError(String);

/// A fill value metadata incompatibility error.
#[derive(Debug, Error)]
#[error("incompatible fill value {1} for data type {0}")]
pub struct IncompatibleFillValueMetadataError(DataType, Value);

/// A fill value incompatibility error.
#[derive(Debug, Error)]
#[error("incompatible fill value {1} for data type {0}")]
pub struct IncompatibleFillValueError(DataType, FillValue);

impl IncompatibleFillValueError {
    /// Create a new incompatible fill value error.
    #[must_use]
    pub const fn new(data_type: DataType, fill_value: FillValue) -> Self {
        Self(data_type, fill_value)
    }
}

impl DataType {
    /// All supported data types.
    pub const ALL: [DataType; 10] = [
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
    ];

    /// Returns the identifier, e.g. `uint8`. This is the N5 `dataType`.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Returns the size in bytes of an element.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Returns true for the floating point data types.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Returns true for the signed integer data types.
    #[must_use]
    pub const fn is_signed_integer(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Returns the little-endian Zarr (numpy) data type string, e.g. `<f4` or `|u1`.
    #[must_use]
    pub fn zarr_dtype(&self) -> String {
        let kind = if self.is_float() {
            'f'
        } else if self.is_signed_integer() {
            'i'
        } else {
            'u'
        };
        let byteorder = if self.size() == 1 { '|' } else { '<' };
        format!("{byteorder}{kind}{}", self.size())
    }

    /// Create a data type from a Zarr (numpy) data type string such as `<f4` or `|u1`.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] for unknown or big-endian multi-byte data types.
    pub fn from_zarr_dtype(dtype: &str) -> Result<Self, UnsupportedDataTypeError> {
        let err = || UnsupportedDataTypeError(dtype.to_string());
        let mut chars = dtype.chars();
        let byteorder = chars.next().ok_or_else(err)?;
        let kind = chars.next().ok_or_else(err)?;
        let size: usize = chars.as_str().parse().map_err(|_| err())?;
        let data_type = Self::ALL
            .into_iter()
            .find(|data_type| {
                data_type.size() == size
                    && match kind {
                        'f' => data_type.is_float(),
                        'i' => data_type.is_signed_integer(),
                        'u' => !data_type.is_float() && !data_type.is_signed_integer(),
                        _ => false,
                    }
            })
            .ok_or_else(err)?;
        match (byteorder, size) {
            ('<', _) | ('|' | '>', 1) => Ok(data_type),
            _ => Err(err()),
        }
    }

    /// Create a data type from a name: either an identifier (`uint8`) or a Zarr data type string (`|u1`).
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if the name is not recognised.
    pub fn from_name(name: &str) -> Result<Self, UnsupportedDataTypeError> {
        Self::ALL
            .into_iter()
            .find(|data_type| data_type.identifier() == name)
            .map_or_else(|| Self::from_zarr_dtype(name), Ok)
    }

    /// Create a fill value from Zarr metadata: `null` (zero), a number, or one of `"NaN"`, `"Infinity"`, `"-Infinity"` for floats.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleFillValueMetadataError`] if the fill value is incompatible with the data type.
    pub fn fill_value_from_metadata(
        &self,
        fill_value: &Value,
    ) -> Result<FillValue, IncompatibleFillValueMetadataError> {
        fn cast<T: Element>(value: &Value) -> Option<FillValue> {
            let element: T = match value {
                Value::Null => T::zero(),
                Value::Bool(value) => num::cast(u8::from(*value))?,
                Value::Number(number) => {
                    if let Some(value) = number.as_u64() {
                        num::cast(value)?
                    } else if let Some(value) = number.as_i64() {
                        num::cast(value)?
                    } else {
                        let value = number.as_f64()?;
                        if T::DATA_TYPE.is_float() {
                            num::cast(value)?
                        } else {
                            // integer data types require integral fill values
                            if value.fract() != 0.0 {
                                return None;
                            }
                            num::cast(value)?
                        }
                    }
                }
                Value::String(string) if T::DATA_TYPE.is_float() => num::cast(match string.as_str() {
                    "NaN" => f64::NAN,
                    "Infinity" => f64::INFINITY,
                    "-Infinity" => f64::NEG_INFINITY,
                    _ => return None,
                })?,
                _ => return None,
            };
            Some(FillValue::from_element(element))
        }
        let err = || IncompatibleFillValueMetadataError(*self, fill_value.clone());
        with_element_type!(*self, T, cast::<T>(fill_value)).ok_or_else(err)
    }

    /// Create Zarr fill value metadata from a fill value.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleFillValueError`] if the fill value does not have the size of an element.
    pub fn metadata_fill_value(
        &self,
        fill_value: &FillValue,
    ) -> Result<Value, IncompatibleFillValueError> {
        fn to_metadata<T: Element>(fill_value: &FillValue) -> Option<Value> {
            let element: T = fill_value.as_element()?;
            if T::DATA_TYPE.is_float() {
                let value = element.to_f64()?;
                Some(if value.is_nan() {
                    Value::from("NaN")
                } else if value == f64::INFINITY {
                    Value::from("Infinity")
                } else if value == f64::NEG_INFINITY {
                    Value::from("-Infinity")
                } else {
                    Value::from(value)
                })
            } else if T::DATA_TYPE.is_signed_integer() {
                Some(Value::from(element.to_i64()?))
            } else {
                Some(Value::from(element.to_u64()?))
            }
        }
        with_element_type!(*self, T, to_metadata::<T>(fill_value))
            .ok_or_else(|| IncompatibleFillValueError::new(*self, fill_value.clone()))
    }
}

impl std::str::FromStr for DataType {
    type Err = UnsupportedDataTypeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::from_name(name)
    }
}
