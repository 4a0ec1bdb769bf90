//! The indexing engine.
//!
//! A selection is a list of [`IndexElement`]s, one per leading dimension, optionally containing a single [`IndexElement::Ellipsis`].
//! [`Selection::resolve`] normalises a selection against an array shape into a box ([`Selection::subset`]) plus a logical output shape:
//!  - an [`IndexElement::Index`] selects a single position and removes the dimension from the output,
//!  - an [`IndexElement::Slice`] selects a half-open range (step 1 only),
//!  - an ellipsis expands to as many full ranges as needed, and
//!  - trailing dimensions without an element are selected in full.
//!
//! Negative indices count from the end of a dimension.
//! Slices that fall out of bounds produce an empty dimension rather than an error, while an out-of-bounds integer index is an error.
//!
//! A resolved selection is decomposed into [`ChunkIntersection`]s by [`Selection::chunk_intersections`].
//!
//! The [`sel!`](crate::sel) macro builds a selection from integers and ranges:
//! ```
//! use n5zarr::{sel, selection::{IndexElement, Selection}};
//! let selection = Selection::resolve(&sel![1, 2..4, ..], &[10, 10, 10])?;
//! assert_eq!(selection.shape(), &[2, 10]);
//! let selection = Selection::resolve(&[IndexElement::Ellipsis, 3.into()], &[10, 10, 10])?;
//! assert_eq!(selection.shape(), &[10, 10]);
//! # Ok::<(), n5zarr::selection::SelectionError>(())
//! ```

use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use derive_more::Display;
use thiserror::Error;

use crate::{
    array::{ArrayIndices, ArrayShape},
    array_subset::ArraySubset,
};

/// An element of a selection.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum IndexElement {
    /// A single (possibly negative) index. The dimension is removed from the output.
    #[display("{_0}")]
    Index(i64),
    /// A half-open slice `start:stop:step` with optional (possibly negative) bounds.
    #[display("{}:{}:{}", opt(start), opt(stop), opt(step))]
    Slice {
        /// The start, defaulting to 0.
        start: Option<i64>,
        /// The stop (exclusive), defaulting to the extent.
        stop: Option<i64>,
        /// The step. Only 1 is supported.
        step: Option<i64>,
    },
    /// Expands to full slices over the dimensions not covered by other elements.
    #[display("...")]
    Ellipsis,
    /// A list of indices. Not supported.
    #[display("{_0:?}")]
    List(Vec<i64>),
    /// An element of some other unsupported type, described by a name.
    #[display("<{_0}>")]
    Unsupported(String),
}

fn opt(value: &Option<i64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

impl IndexElement {
    /// A slice `start..stop` with step 1.
    #[must_use]
    pub const fn slice(start: Option<i64>, stop: Option<i64>) -> Self {
        Self::Slice {
            start,
            stop,
            step: None,
        }
    }

    /// A full slice (`:`).
    #[must_use]
    pub const fn full() -> Self {
        Self::slice(None, None)
    }
}

impl From<i64> for IndexElement {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<Range<i64>> for IndexElement {
    fn from(range: Range<i64>) -> Self {
        Self::slice(Some(range.start), Some(range.end))
    }
}

impl From<RangeFrom<i64>> for IndexElement {
    fn from(range: RangeFrom<i64>) -> Self {
        Self::slice(Some(range.start), None)
    }
}

impl From<RangeTo<i64>> for IndexElement {
    fn from(range: RangeTo<i64>) -> Self {
        Self::slice(None, Some(range.end))
    }
}

impl From<RangeFull> for IndexElement {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

impl From<Vec<i64>> for IndexElement {
    fn from(indices: Vec<i64>) -> Self {
        Self::List(indices)
    }
}

/// Build a `Vec<IndexElement>` from integers and ranges.
///
/// Each argument is converted with [`IndexElement::from`], so `sel![0, 2..4, ..]` selects index 0 of the first dimension, `2..4` of the second, and all of the third.
#[macro_export]
macro_rules! sel {
    () => {
        ::std::vec::Vec::<$crate::selection::IndexElement>::new()
    };
    ($($element:expr),+ $(,)?) => {
        vec![$($crate::selection::IndexElement::from($element)),+]
    };
}

/// A selection error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The selection is malformed.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    /// An integer index is out of range.
    #[error("index {index} is out of bounds for axis {axis} with size {extent}")]
    IndexOutOfRange {
        /// The index.
        index: i64,
        /// The axis.
        axis: usize,
        /// The extent of the axis.
        extent: u64,
    },
    /// A selection element has an unsupported type.
    #[error("unsupported selection element {0}")]
    TypeMismatch(String),
}

/// The resolved selection of a single dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DimensionSelection {
    /// A single index. The dimension is squeezed from the output.
    Index(u64),
    /// A half-open range.
    Range(Range<u64>),
}

/// A selection resolved against an array shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    dimensions: Vec<DimensionSelection>,
    subset: ArraySubset,
    shape: ArrayShape,
}

/// The part of a selection that falls within one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkIntersection {
    /// The chunk grid indices.
    pub chunk_indices: ArrayIndices,
    /// The intersected region relative to the chunk origin.
    pub chunk_subset: ArraySubset,
    /// The intersected region relative to the start of the selection box.
    pub selection_subset: ArraySubset,
}

fn clamp_extent(extent: u64) -> i64 {
    i64::try_from(extent).unwrap_or(i64::MAX)
}

fn resolve_slice(
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
    extent: u64,
) -> Result<Range<u64>, SelectionError> {
    if let Some(step) = step {
        if step != 1 {
            return Err(SelectionError::InvalidSelection(format!(
                "slice step {step} is not supported, only a step of 1 is"
            )));
        }
    }
    let size = clamp_extent(extent);
    let empty = 0..0;
    let start = match start {
        None => 0,
        Some(start) if (-size..0).contains(&start) => start + size,
        Some(start) if start < -size || start >= size => return Ok(empty),
        Some(start) => start,
    };
    let stop = match stop {
        None => size,
        Some(stop) if stop > size => size,
        Some(stop) if stop < 0 => stop + size,
        Some(stop) => stop,
    };
    if stop <= start {
        return Ok(empty);
    }
    // both are within 0..=size here
    Ok(start.unsigned_abs()..stop.unsigned_abs())
}

fn resolve_index(index: i64, axis: usize, extent: u64) -> Result<u64, SelectionError> {
    let size = clamp_extent(extent);
    let normalised = if index < 0 {
        index.checked_add(size)
    } else {
        Some(index)
    };
    match normalised {
        Some(normalised) if (0..size).contains(&normalised) => Ok(normalised.unsigned_abs()),
        _ => Err(SelectionError::IndexOutOfRange {
            index,
            axis,
            extent,
        }),
    }
}

impl Selection {
    /// Resolve `elements` against an array of shape `array_shape`.
    ///
    /// # Errors
    /// Returns [`SelectionError`]:
    ///  - [`TypeMismatch`](SelectionError::TypeMismatch) if an element is a list or of an unsupported type,
    ///  - [`InvalidSelection`](SelectionError::InvalidSelection) if there is more than one ellipsis, more elements than dimensions, or a slice step other than 1, or
    ///  - [`IndexOutOfRange`](SelectionError::IndexOutOfRange) if an integer index is outside its dimension.
    pub fn resolve(
        elements: &[IndexElement],
        array_shape: &[u64],
    ) -> Result<Self, SelectionError> {
        for element in elements {
            match element {
                IndexElement::List(_) => {
                    return Err(SelectionError::TypeMismatch(format!(
                        "{element} (index lists are not supported)"
                    )))
                }
                IndexElement::Unsupported(_) => {
                    return Err(SelectionError::TypeMismatch(element.to_string()))
                }
                _ => {}
            }
        }

        let num_ellipsis = elements
            .iter()
            .filter(|element| **element == IndexElement::Ellipsis)
            .count();
        if num_ellipsis > 1 {
            return Err(SelectionError::InvalidSelection(
                "an index can only have a single ellipsis".to_string(),
            ));
        }
        let num_explicit = elements.len() - num_ellipsis;
        if num_explicit > array_shape.len() {
            return Err(SelectionError::InvalidSelection(format!(
                "too many indices: the array is {}-dimensional, but {num_explicit} were indexed",
                array_shape.len()
            )));
        }

        let mut expanded: Vec<&IndexElement> = Vec::with_capacity(array_shape.len());
        let full = IndexElement::full();
        for element in elements {
            if *element == IndexElement::Ellipsis {
                expanded.extend(std::iter::repeat(&full).take(array_shape.len() - num_explicit));
            } else {
                expanded.push(element);
            }
        }
        expanded.resize(array_shape.len(), &full);

        let dimensions = std::iter::zip(expanded, array_shape)
            .enumerate()
            .map(|(axis, (element, &extent))| match element {
                IndexElement::Index(index) => {
                    resolve_index(*index, axis, extent).map(DimensionSelection::Index)
                }
                IndexElement::Slice { start, stop, step } => {
                    resolve_slice(*start, *stop, *step, extent).map(DimensionSelection::Range)
                }
                _ => Err(SelectionError::InvalidSelection(format!(
                    "unexpected selection element {element}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_dimensions(dimensions))
    }

    /// A selection of an entire array of shape `array_shape`.
    #[must_use]
    pub fn full(array_shape: &[u64]) -> Self {
        Self::from_dimensions(
            array_shape
                .iter()
                .map(|&extent| DimensionSelection::Range(0..extent))
                .collect(),
        )
    }

    /// A selection of a box, with no squeezed dimensions.
    #[must_use]
    pub fn from_subset(subset: &ArraySubset) -> Self {
        Self::from_dimensions(
            std::iter::zip(subset.start(), subset.shape())
                .map(|(&start, &size)| DimensionSelection::Range(start..start + size))
                .collect(),
        )
    }

    fn from_dimensions(dimensions: Vec<DimensionSelection>) -> Self {
        let ranges: Vec<Range<u64>> = dimensions
            .iter()
            .map(|dimension| match dimension {
                DimensionSelection::Index(index) => *index..index + 1,
                DimensionSelection::Range(range) => range.clone(),
            })
            .collect();
        let shape = dimensions
            .iter()
            .filter_map(|dimension| match dimension {
                DimensionSelection::Index(_) => None,
                DimensionSelection::Range(range) => Some(range.end - range.start),
            })
            .collect();
        Self {
            dimensions,
            subset: ArraySubset::new_with_ranges(&ranges),
            shape,
        }
    }

    /// The resolved selection of each dimension.
    #[must_use]
    pub fn dimensions(&self) -> &[DimensionSelection] {
        &self.dimensions
    }

    /// The selected box in array coordinates.
    #[must_use]
    pub fn subset(&self) -> &ArraySubset {
        &self.subset
    }

    /// The logical output shape: the box shape without the integer-indexed dimensions.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The number of selected elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.subset.num_elements()
    }

    /// Returns true if no elements are selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subset.is_empty()
    }

    /// Returns true if every dimension is integer-indexed, so the selection is a single element.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.dimensions
            .iter()
            .all(|dimension| matches!(dimension, DimensionSelection::Index(_)))
    }

    /// Convert a region relative to the start of the selection box into logical (squeezed) coordinates.
    #[must_use]
    pub fn to_logical(&self, box_relative: &ArraySubset) -> ArraySubset {
        let (start, shape) = self
            .dimensions
            .iter()
            .zip(std::iter::zip(box_relative.start(), box_relative.shape()))
            .filter(|(dimension, _)| matches!(dimension, DimensionSelection::Range(_)))
            .map(|(_, (&start, &size))| (start, size))
            .unzip();
        ArraySubset::new_with_start_shape(start, shape).unwrap_or_default()
    }

    /// Place a region in logical (squeezed) coordinates into the selected box, returning it in array coordinates.
    #[must_use]
    pub fn place(&self, logical: &ArraySubset) -> ArraySubset {
        let mut logical_dims = std::iter::zip(logical.start(), logical.shape());
        let ranges: Vec<Range<u64>> = self
            .dimensions
            .iter()
            .map(|dimension| match dimension {
                DimensionSelection::Index(index) => *index..index + 1,
                DimensionSelection::Range(range) => {
                    let (start, size) = logical_dims.next().unwrap_or((&0, &0));
                    range.start + start..range.start + start + size
                }
            })
            .collect();
        ArraySubset::new_with_ranges(&ranges)
    }

    /// Decompose the selection into its intersections with the chunks of a regular grid.
    ///
    /// Every chunk that overlaps the selection appears exactly once.
    /// Chunk domains are bounded by `array_shape`.
    #[must_use]
    pub fn chunk_intersections(
        &self,
        chunk_shape: &[u64],
        array_shape: &[u64],
    ) -> Vec<ChunkIntersection> {
        let Ok(chunks) = self.subset.iter_chunks(chunk_shape) else {
            return vec![];
        };
        chunks
            .filter_map(|(chunk_indices, chunk_subset)| {
                let chunk_subset = chunk_subset.bound(array_shape).ok()?;
                let overlap = self.subset.overlap(&chunk_subset).ok()?;
                if overlap.is_empty() {
                    return None;
                }
                Some(ChunkIntersection {
                    chunk_subset: overlap.relative_to(chunk_subset.start()).ok()?,
                    selection_subset: overlap.relative_to(self.subset.start()).ok()?,
                    chunk_indices,
                })
            })
            .collect()
    }
}
