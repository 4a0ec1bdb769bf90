use super::{DataType, Scalar};

/// A Rust type that can be stored as an element of an array.
///
/// Implemented for the primitive types of each [`DataType`].
pub trait Element:
    bytemuck::Pod
    + num::NumCast
    + num::Zero
    + PartialEq
    + Send
    + Sync
    + std::fmt::Debug
    + 'static
{
    /// The data type of this element type.
    const DATA_TYPE: DataType;

    /// Convert a dynamic [`Scalar`] to this element type.
    ///
    /// Numeric values are converted with numeric casting semantics (floats truncate towards zero).
    /// Returns [`None`] if the value is not numeric or is not representable, e.g. `NaN` or an out-of-range value for an integer type.
    #[must_use]
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Bool(value) => num::cast(u8::from(*value)),
            Scalar::Int(value) => num::cast(*value),
            Scalar::UInt(value) => num::cast(*value),
            Scalar::Float(value) => num::cast(*value),
            Scalar::Text(_) | Scalar::Object(_) => None,
        }
    }

    /// Convert from another element type.
    #[must_use]
    fn cast_from<U: Element>(value: U) -> Option<Self> {
        num::cast(value)
    }
}

macro_rules! impl_element {
    ($type:ty, $data_type:ident) => {
        impl Element for $type {
            const DATA_TYPE: DataType = DataType::$data_type;
        }
    };
}

impl_element!(i8, Int8);
impl_element!(i16, Int16);
impl_element!(i32, Int32);
impl_element!(i64, Int64);
impl_element!(u8, UInt8);
impl_element!(u16, UInt16);
impl_element!(u32, UInt32);
impl_element!(u64, UInt64);
impl_element!(f32, Float32);
impl_element!(f64, Float64);

/// Evaluate `$body` with `$t` bound to the [`Element`] type of a runtime [`DataType`].
macro_rules! with_element_type {
    ($data_type:expr, $t:ident, $body:expr) => {
        match $data_type {
            $crate::array::DataType::Int8 => {
                type $t = i8;
                $body
            }
            $crate::array::DataType::Int16 => {
                type $t = i16;
                $body
            }
            $crate::array::DataType::Int32 => {
                type $t = i32;
                $body
            }
            $crate::array::DataType::Int64 => {
                type $t = i64;
                $body
            }
            $crate::array::DataType::UInt8 => {
                type $t = u8;
                $body
            }
            $crate::array::DataType::UInt16 => {
                type $t = u16;
                $body
            }
            $crate::array::DataType::UInt32 => {
                type $t = u32;
                $body
            }
            $crate::array::DataType::UInt64 => {
                type $t = u64;
                $body
            }
            $crate::array::DataType::Float32 => {
                type $t = f32;
                $body
            }
            $crate::array::DataType::Float64 => {
                type $t = f64;
                $body
            }
        }
    };
}
