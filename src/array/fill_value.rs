//! Fill values.
//!
//! The fill value of an array is the element value of every position that has never been written.
//! Chunks absent from the store read as the fill value, and with the default configuration a chunk whose elements all equal the fill value is erased rather than stored.

use super::{element::Element, DataType};

/// The fill value of an array, stored as the native-endian bytes of one element.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FillValue(Vec<u8>);

impl core::fmt::Display for FillValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Vec<u8>> for FillValue {
    fn from(value: Vec<u8>) -> Self {
        FillValue(value)
    }
}

macro_rules! impl_from_element {
    ($($type:ty),*) => {
        $(
            impl From<$type> for FillValue {
                fn from(value: $type) -> Self {
                    FillValue(value.to_ne_bytes().to_vec())
                }
            }
        )*
    };
}

impl_from_element!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl FillValue {
    /// Create a new fill value composed of `bytes`.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> FillValue {
        FillValue(bytes)
    }

    /// Create a fill value from an element.
    #[must_use]
    pub fn from_element<T: Element>(element: T) -> FillValue {
        FillValue(bytemuck::bytes_of(&element).to_vec())
    }

    /// The zero fill value of `data_type`.
    #[must_use]
    pub fn zero(data_type: DataType) -> FillValue {
        FillValue(vec![0; data_type.size()])
    }

    /// Returns the size in bytes of the fill value.
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Return the byte representation of the fill value.
    #[must_use]
    pub fn as_ne_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if every byte of the fill value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&byte| byte == 0)
    }

    /// Interpret the fill value as an element of type `T`.
    ///
    /// Returns [`None`] if the size of `T` does not match the fill value.
    #[must_use]
    pub fn as_element<T: bytemuck::Pod>(&self) -> Option<T> {
        bytemuck::try_pod_read_unaligned(&self.0).ok()
    }

    /// Returns a buffer of `num_elements` repeats of the fill value.
    #[must_use]
    pub fn repeat(&self, num_elements: usize) -> Vec<u8> {
        self.0.repeat(num_elements)
    }

    /// Check if `bytes`, elements of `data_type`, all equal the fill value.
    ///
    /// Floating point elements are compared by value, so `-0.0` equals a `0.0` fill value and any NaN equals a NaN fill value.
    #[must_use]
    pub fn equals_all(&self, bytes: &[u8], data_type: DataType) -> bool {
        let size = self.0.len();
        if size == 0 || bytes.len() % size != 0 {
            return false;
        }
        match data_type {
            DataType::Float32 => self.float_equals_all(bytes, f32::from_ne_bytes),
            DataType::Float64 => self.float_equals_all(bytes, f64::from_ne_bytes),
            _ if self.is_zero() => bytes.iter().all(|&byte| byte == 0),
            _ => bytes.chunks_exact(size).all(|element| element == self.0),
        }
    }

    fn float_equals_all<F: num::Float, const N: usize>(
        &self,
        bytes: &[u8],
        from_ne_bytes: fn([u8; N]) -> F,
    ) -> bool {
        let Ok(fill_value) = <[u8; N]>::try_from(self.0.as_slice()).map(from_ne_bytes) else {
            return false;
        };
        bytes.chunks_exact(N).all(|element| {
            <[u8; N]>::try_from(element).map(from_ne_bytes).is_ok_and(|element| {
                element == fill_value || (element.is_nan() && fill_value.is_nan())
            })
        })
    }
}
