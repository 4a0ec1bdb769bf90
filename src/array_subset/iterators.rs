use std::iter::FusedIterator;

use crate::array::{unravel_index, ArrayIndices};

use super::ArraySubset;

/// Iterates over the indices of the elements of an array subset, in C order.
pub struct IndicesIterator {
    subset: ArraySubset,
    index: u64,
    length: u64,
}

impl IndicesIterator {
    pub(super) fn new(subset: ArraySubset) -> Self {
        let length = subset.num_elements();
        Self {
            subset,
            index: 0,
            length,
        }
    }
}

impl Iterator for IndicesIterator {
    type Item = ArrayIndices;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.length {
            return None;
        }
        let mut indices = unravel_index(self.index, self.subset.shape());
        for (index, start) in std::iter::zip(&mut indices, self.subset.start()) {
            *index += start;
        }
        self.index += 1;
        Some(indices)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.length - self.index).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IndicesIterator {}

impl FusedIterator for IndicesIterator {}

/// Iterates over the contiguous runs of an array subset within an array.
///
/// Each item is the linearised index of the first element of a run and the number of elements in the run.
/// Runs extend over the trailing dimensions that the subset covers entirely.
pub struct ContiguousLinearisedIndicesIterator {
    outer: IndicesIterator,
    inner_start: u64,
    strides: Vec<u64>,
    contiguous_elements: u64,
}

impl ContiguousLinearisedIndicesIterator {
    pub(super) fn new(subset: &ArraySubset, array_shape: &[u64]) -> Self {
        let dimensionality = subset.dimensionality();
        let mut contiguous_elements = 1;
        let mut split = dimensionality;
        while split > 0 {
            split -= 1;
            contiguous_elements *= subset.shape()[split];
            if subset.shape()[split] != array_shape[split] {
                break;
            }
        }

        let mut strides = vec![1; dimensionality];
        for i in (0..dimensionality.saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * array_shape[i + 1];
        }

        let inner_start: u64 = (split..dimensionality)
            .map(|i| subset.start()[i] * strides[i])
            .sum();
        let outer = if subset.is_empty() {
            IndicesIterator::new(ArraySubset::new_with_shape(vec![0]))
        } else {
            IndicesIterator::new(ArraySubset {
                start: subset.start()[..split].to_vec(),
                shape: subset.shape()[..split].to_vec(),
            })
        };
        Self {
            outer,
            inner_start,
            strides: strides[..split].to_vec(),
            contiguous_elements,
        }
    }
}

impl Iterator for ContiguousLinearisedIndicesIterator {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let outer = self.outer.next()?;
        let index = self.inner_start
            + std::iter::zip(&outer, &self.strides)
                .map(|(index, stride)| index * stride)
                .sum::<u64>();
        Some((index, self.contiguous_elements))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.outer.size_hint()
    }
}

impl ExactSizeIterator for ContiguousLinearisedIndicesIterator {}

impl FusedIterator for ContiguousLinearisedIndicesIterator {}

/// Iterates over the chunks of a regular chunk grid that intersect an array subset.
///
/// Each item is the chunk grid indices of a chunk and the (unbounded) array subset of that chunk.
pub struct ChunksIterator {
    grid: IndicesIterator,
    chunk_shape: Vec<u64>,
}

impl ChunksIterator {
    pub(super) fn new(subset: &ArraySubset, chunk_shape: &[u64]) -> Self {
        let grid = if subset.is_empty() || chunk_shape.iter().any(|&size| size == 0) {
            ArraySubset::new_with_shape(vec![0])
        } else {
            let start = std::iter::zip(subset.start(), chunk_shape)
                .map(|(start, chunk)| start / chunk)
                .collect();
            let end = std::iter::zip(subset.end_exc(), chunk_shape)
                .map(|(end, chunk)| end.div_ceil(*chunk))
                .collect();
            ArraySubset::new_with_start_end_exc(start, end).unwrap_or_default()
        };
        Self {
            grid: IndicesIterator::new(grid),
            chunk_shape: chunk_shape.to_vec(),
        }
    }
}

impl Iterator for ChunksIterator {
    type Item = (ArrayIndices, ArraySubset);

    fn next(&mut self) -> Option<Self::Item> {
        let chunk_indices = self.grid.next()?;
        let start = std::iter::zip(&chunk_indices, &self.chunk_shape)
            .map(|(index, size)| index * size)
            .collect();
        let subset = ArraySubset {
            start,
            shape: self.chunk_shape.clone(),
        };
        Some((chunk_indices, subset))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.grid.size_hint()
    }
}

impl ExactSizeIterator for ChunksIterator {}

impl FusedIterator for ChunksIterator {}
