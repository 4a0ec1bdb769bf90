//! Array subsets.
//!
//! An [`ArraySubset`] is a hyperrectangle of an array: a start index and a shape per dimension.
//! It is used throughout this library to describe the box of a selection, the domain of a chunk, and the intersection of the two.
//!
//! This module provides convenience functions for:
//!  - intersecting subsets and expressing a subset relative to another,
//!  - iterating over the chunks of a regular grid that intersect a subset, and
//!  - extracting and storing the bytes of a subset within a C-ordered array.

mod iterators;

pub use iterators::{ChunksIterator, ContiguousLinearisedIndicesIterator, IndicesIterator};

use derive_more::Display;
use itertools::izip;
use thiserror::Error;

use crate::array::{ArrayIndices, ArrayShape};

/// An array subset.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Default)]
#[display("start {start:?} shape {shape:?}")]
pub struct ArraySubset {
    /// The start of the array subset.
    start: ArrayIndices,
    /// The shape of the array subset.
    shape: ArrayShape,
}

/// An array extract bytes error.
#[derive(Debug, Error)]
#[error("array subset {_0} is incompatible with array of shape {_1:?} and element size {_2}")]
pub struct ArrayExtractBytesError(ArraySubset, ArrayShape, usize);

/// An array store bytes error.
#[derive(Debug, Error)]
pub enum ArrayStoreBytesError {
    /// Invalid array shape.
    #[error("array shape {_1:?} is incompatible with array subset {_0}")]
    InvalidArrayShape(ArraySubset, ArrayShape),
    /// Invalid subset bytes.
    #[error("expected subset bytes to have length {_1}, got {_0}")]
    InvalidSubsetBytes(usize, usize),
    /// Invalid array bytes.
    #[error("expected array bytes to have length {_1}, got {_0}")]
    InvalidArrayBytes(usize, usize),
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

fn num_bytes(num_elements: u64, element_size: usize) -> Option<usize> {
    usize::try_from(num_elements)
        .ok()
        .and_then(|num_elements| num_elements.checked_mul(element_size))
}

impl ArraySubset {
    /// Create a new array subset with `shape` starting at the origin.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new array subset.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if the length of `start` and `shape` do not match.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError::new(
                start.len(),
                shape.len(),
            ))
        }
    }

    /// Create a new array subset from a start and end (exclusive).
    ///
    /// An end before the start produces an empty dimension.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if the length of `start` and `end` do not match.
    pub fn new_with_start_end_exc(
        start: ArrayIndices,
        end: ArrayIndices,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == end.len() {
            let shape = std::iter::zip(&start, end)
                .map(|(&start, end)| end.saturating_sub(start))
                .collect();
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError::new(start.len(), end.len()))
        }
    }

    /// Create a new array subset from per-dimension ranges.
    #[must_use]
    pub fn new_with_ranges(ranges: &[std::ops::Range<u64>]) -> Self {
        let start = ranges.iter().map(|range| range.start).collect();
        let shape = ranges
            .iter()
            .map(|range| range.end.saturating_sub(range.start))
            .collect();
        Self { start, shape }
    }

    /// Return the start of the array subset.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the array subset.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the end (exclusive) of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// Return the number of elements of the array subset.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Returns true if the array subset contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|&size| size == 0)
    }

    /// Returns true if the array subset is within the bounds of `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && izip!(self.start(), self.shape(), array_shape)
                .all(|(start, size, shape)| start + size <= *shape)
    }

    /// Bound the array subset to the domain within `end` (exclusive).
    ///
    /// # Errors
    /// Returns an error if `end` does not match the array subset dimensionality.
    pub fn bound(&self, end: &[u64]) -> Result<Self, IncompatibleDimensionalityError> {
        if end.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                end.len(),
                self.dimensionality(),
            ));
        }
        let start: ArrayIndices = std::iter::zip(self.start(), end)
            .map(|(&a, &b)| std::cmp::min(a, b))
            .collect();
        let end = std::iter::zip(self.end_exc(), end)
            .map(|(a, &b)| std::cmp::min(a, b))
            .collect();
        Self::new_with_start_end_exc(start, end)
    }

    /// Return the overlapping region of this subset and `other`, in absolute coordinates.
    ///
    /// Disjoint subsets produce an empty subset.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionality of `other` does not match.
    pub fn overlap(&self, other: &Self) -> Result<Self, IncompatibleDimensionalityError> {
        if other.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                other.dimensionality(),
                self.dimensionality(),
            ));
        }
        let (start, end) = izip!(
            self.start(),
            self.end_exc(),
            other.start(),
            other.end_exc()
        )
        .map(|(&start, end, &other_start, other_end)| {
            let start = std::cmp::max(start, other_start);
            let end = std::cmp::max(std::cmp::min(end, other_end), start);
            (start, end)
        })
        .unzip();
        Self::new_with_start_end_exc(start, end)
    }

    /// Return this subset with its start expressed relative to `origin`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionality of `origin` does not match.
    ///
    /// # Panics
    /// Panics if `origin` is beyond the start of the subset in any dimension.
    pub fn relative_to(&self, origin: &[u64]) -> Result<Self, IncompatibleDimensionalityError> {
        if origin.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                origin.len(),
                self.dimensionality(),
            ));
        }
        let start = std::iter::zip(self.start(), origin)
            .map(|(start, origin)| {
                assert!(start >= origin, "origin is beyond the array subset start");
                start - origin
            })
            .collect();
        Ok(Self {
            start,
            shape: self.shape.clone(),
        })
    }

    /// Returns an iterator over the chunks of a regular grid with `chunk_shape` that intersect this subset.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if `chunk_shape` does not match the dimensionality of the subset.
    pub fn iter_chunks(
        &self,
        chunk_shape: &[u64],
    ) -> Result<ChunksIterator, IncompatibleDimensionalityError> {
        if chunk_shape.len() == self.dimensionality() {
            Ok(ChunksIterator::new(self, chunk_shape))
        } else {
            Err(IncompatibleDimensionalityError::new(
                chunk_shape.len(),
                self.dimensionality(),
            ))
        }
    }

    fn check_bytes(&self, num_array_bytes: usize, array_shape: &[u64], element_size: usize) -> bool {
        self.inbounds(array_shape)
            && num_bytes(array_shape.iter().product(), element_size) == Some(num_array_bytes)
    }

    /// Return the bytes in this array subset from an array with shape `array_shape` and `element_size`.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayExtractBytesError`] if the length of `array_shape` does not match the array subset dimensionality, the array subset is outside of the bounds of `array_shape`, or `bytes` is not the size of the array.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<Vec<u8>, ArrayExtractBytesError> {
        let error = || ArrayExtractBytesError(self.clone(), array_shape.to_vec(), element_size);
        if !self.check_bytes(bytes.len(), array_shape, element_size) {
            return Err(error());
        }
        let num_bytes = num_bytes(self.num_elements(), element_size).ok_or_else(error)?;
        let mut bytes_subset = Vec::with_capacity(num_bytes);
        for (array_index, contiguous_elements) in
            ContiguousLinearisedIndicesIterator::new(self, array_shape)
        {
            let byte_offset = usize::try_from(array_index).map_err(|_| error())? * element_size;
            let byte_length =
                usize::try_from(contiguous_elements).map_err(|_| error())? * element_size;
            bytes_subset.extend_from_slice(&bytes[byte_offset..byte_offset + byte_length]);
        }
        Ok(bytes_subset)
    }

    /// Store `subset_bytes` into this array subset of `array_bytes`, an array with shape `array_shape` and `element_size`.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayStoreBytesError`] if the subset is incompatible with `array_shape`, or `subset_bytes` or `array_bytes` have an unexpected length.
    pub fn store_bytes(
        &self,
        subset_bytes: &[u8],
        array_bytes: &mut [u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<(), ArrayStoreBytesError> {
        if !self.inbounds(array_shape) {
            return Err(ArrayStoreBytesError::InvalidArrayShape(
                self.clone(),
                array_shape.to_vec(),
            ));
        }
        let expected_array_bytes =
            num_bytes(array_shape.iter().product(), element_size).unwrap_or(usize::MAX);
        if array_bytes.len() != expected_array_bytes {
            return Err(ArrayStoreBytesError::InvalidArrayBytes(
                array_bytes.len(),
                expected_array_bytes,
            ));
        }
        let expected_subset_bytes =
            num_bytes(self.num_elements(), element_size).unwrap_or(usize::MAX);
        if subset_bytes.len() != expected_subset_bytes {
            return Err(ArrayStoreBytesError::InvalidSubsetBytes(
                subset_bytes.len(),
                expected_subset_bytes,
            ));
        }

        // Both lengths are addressable, so every run below is too
        let mut subset_offset = 0;
        for (array_index, contiguous_elements) in
            ContiguousLinearisedIndicesIterator::new(self, array_shape)
        {
            let byte_offset = usize::try_from(array_index).unwrap_or(usize::MAX) * element_size;
            let byte_length =
                usize::try_from(contiguous_elements).unwrap_or(usize::MAX) * element_size;
            array_bytes[byte_offset..byte_offset + byte_length]
                .copy_from_slice(&subset_bytes[subset_offset..subset_offset + byte_length]);
            subset_offset += byte_length;
        }
        Ok(())
    }

    /// Fill this array subset of `array_bytes` (an array with shape `array_shape`) with repeats of `element`.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayStoreBytesError`] if the subset is incompatible with `array_shape` or `array_bytes` has an unexpected length.
    pub fn fill_bytes(
        &self,
        element: &[u8],
        array_bytes: &mut [u8],
        array_shape: &[u64],
    ) -> Result<(), ArrayStoreBytesError> {
        let element_size = element.len();
        if !self.inbounds(array_shape) {
            return Err(ArrayStoreBytesError::InvalidArrayShape(
                self.clone(),
                array_shape.to_vec(),
            ));
        }
        let expected_array_bytes =
            num_bytes(array_shape.iter().product(), element_size).unwrap_or(usize::MAX);
        if array_bytes.len() != expected_array_bytes {
            return Err(ArrayStoreBytesError::InvalidArrayBytes(
                array_bytes.len(),
                expected_array_bytes,
            ));
        }
        if element_size == 0 {
            return Ok(());
        }
        for (array_index, contiguous_elements) in
            ContiguousLinearisedIndicesIterator::new(self, array_shape)
        {
            let byte_offset = usize::try_from(array_index).unwrap_or(usize::MAX) * element_size;
            let byte_length =
                usize::try_from(contiguous_elements).unwrap_or(usize::MAX) * element_size;
            for dst in array_bytes[byte_offset..byte_offset + byte_length].chunks_exact_mut(element_size) {
                dst.copy_from_slice(element);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_subset() {
        assert!(ArraySubset::new_with_start_shape(vec![0, 0], vec![10, 10]).is_ok());
        assert!(ArraySubset::new_with_start_shape(vec![0, 0], vec![10]).is_err());
        assert!(ArraySubset::new_with_start_end_exc(vec![0, 0], vec![10]).is_err());
        let array_subset = ArraySubset::new_with_start_end_exc(vec![1, 2], vec![5, 2]).unwrap();
        assert_eq!(array_subset.shape(), &[4, 0]);
        assert!(array_subset.is_empty());
        assert_eq!(array_subset.num_elements(), 0);
        let array_subset = ArraySubset::new_with_ranges(&[0..5, 5..10]);
        assert_eq!(array_subset.end_exc(), vec![5, 10]);
        assert!(array_subset.inbounds(&[10, 10]));
        assert!(!array_subset.inbounds(&[10, 9]));
        assert_eq!(array_subset.to_string(), "start [0, 5] shape [5, 5]");
    }

    #[test]
    fn array_subset_overlap() {
        let a = ArraySubset::new_with_ranges(&[0..5, 2..8]);
        let b = ArraySubset::new_with_ranges(&[3..10, 0..4]);
        assert_eq!(
            a.overlap(&b).unwrap(),
            ArraySubset::new_with_ranges(&[3..5, 2..4])
        );
        let c = ArraySubset::new_with_ranges(&[6..10, 0..4]);
        assert!(a.overlap(&c).unwrap().is_empty());
        assert!(a.overlap(&ArraySubset::new_with_shape(vec![1])).is_err());

        let relative = a.overlap(&b).unwrap().relative_to(&[3, 0]).unwrap();
        assert_eq!(relative, ArraySubset::new_with_ranges(&[0..2, 2..4]));
        assert_eq!(
            ArraySubset::new_with_ranges(&[5..12]).bound(&[10]).unwrap(),
            ArraySubset::new_with_ranges(&[5..10])
        );
    }

    #[test]
    fn array_subset_bytes() {
        let array_shape = vec![4, 4];
        let bytes: Vec<u8> = (0..16).collect();
        let subset = ArraySubset::new_with_ranges(&[1..3, 1..4]);
        let extracted = subset.extract_bytes(&bytes, &array_shape, 1).unwrap();
        assert_eq!(extracted, vec![5, 6, 7, 9, 10, 11]);
        assert!(subset.extract_bytes(&bytes, &[4, 3], 1).is_err());
        assert!(subset.extract_bytes(&bytes[1..], &array_shape, 1).is_err());

        let mut array = vec![0u8; 16];
        subset.store_bytes(&extracted, &mut array, &array_shape, 1).unwrap();
        assert_eq!(
            array,
            vec![0, 0, 0, 0, 0, 5, 6, 7, 0, 9, 10, 11, 0, 0, 0, 0]
        );
        assert!(subset
            .store_bytes(&extracted[1..], &mut array, &array_shape, 1)
            .is_err());

        let mut array = vec![0u8; 32];
        ArraySubset::new_with_ranges(&[3..4, 0..2])
            .fill_bytes(&[1, 2], &mut array, &array_shape)
            .unwrap();
        assert_eq!(&array[24..], &[1, 2, 1, 2, 0, 0, 0, 0]);
    }
}
