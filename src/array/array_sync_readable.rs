use log::trace;
use ndarray::{ArrayD, ArrayViewMutD, IxDyn};
use parking_lot::Mutex;

use crate::{
    array_subset::ArraySubset,
    selection::{IndexElement, Selection},
};

use super::{
    chunk_header::N5ChunkHeader, concurrency::for_each_chunk, endianness::convert_endianness,
    shape_to_u64, shape_to_usize, subset_slice_info, Array, ArrayError, ArrayShape, ChunkKeyEncoding, Element,
    IoOptions, Selected,
};

/// A decoded chunk with elements in native endianness.
pub(crate) struct DecodedChunk {
    /// The stored shape of the chunk.
    pub(crate) shape: ArrayShape,
    pub(crate) bytes: Vec<u8>,
    pub(crate) varlength: bool,
}

impl Array {
    pub(crate) fn num_bytes(&self, num_elements: u64) -> Result<usize, ArrayError> {
        usize::try_from(num_elements)
            .ok()
            .and_then(|num_elements| num_elements.checked_mul(self.data_type().size()))
            .ok_or_else(|| ArrayError::from(format!("{num_elements} elements exceed usize::MAX bytes")))
    }

    /// Retrieve and decode the chunk at `chunk_indices`, or [`None`] if it is not stored.
    pub(crate) fn retrieve_chunk_decoded(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<DecodedChunk>, ArrayError> {
        let key = self.chunk_key(chunk_indices)?;
        let Some(encoded) = self.store().get(&key)? else {
            return Ok(None);
        };
        trace!("retrieve chunk {key} ({} bytes)", encoded.len());
        let (shape, mut bytes, varlength) = match self.chunk_key_encoding() {
            ChunkKeyEncoding::N5 => {
                let (header, header_length) = N5ChunkHeader::decode(&encoded)?;
                let decoded_size = self.num_bytes(header.num_elements())?;
                let bytes = self
                    .compression()
                    .decode(&encoded[header_length..], decoded_size)?;
                (header.shape().to_vec(), bytes, header.is_varlength())
            }
            ChunkKeyEncoding::Zarr(_) => {
                let shape = self.chunk_shape().to_vec();
                let decoded_size = self.num_bytes(shape.iter().product())?;
                let bytes = self.compression().decode(&encoded, decoded_size)?;
                (shape, bytes, false)
            }
        };
        convert_endianness(&mut bytes, self.data_type().size(), self.endianness());
        Ok(Some(DecodedChunk {
            shape,
            bytes,
            varlength,
        }))
    }

    /// Read the elements of `chunk_subset` (relative to the chunk origin) of the chunk at `chunk_indices`.
    ///
    /// Elements outside of the stored region of the chunk read as the fill value.
    fn retrieve_chunk_subset_bytes(
        &self,
        chunk_indices: &[u64],
        chunk_subset: &ArraySubset,
    ) -> Result<Vec<u8>, ArrayError> {
        let element_size = self.data_type().size();
        let num_elements = usize::try_from(chunk_subset.num_elements())
            .map_err(|_| ArrayError::from("chunk subset exceeds usize::MAX elements"))?;
        let Some(chunk) = self.retrieve_chunk_decoded(chunk_indices)? else {
            return Ok(self.fill_value().repeat(num_elements));
        };
        if chunk.varlength {
            return Err(ArrayError::UnexpectedVariableLengthChunk(
                chunk_indices.to_vec(),
            ));
        }
        if chunk_subset.inbounds(&chunk.shape) {
            return Ok(chunk_subset.extract_bytes(&chunk.bytes, &chunk.shape, element_size)?);
        }

        // A chunk stored with a smaller shape than expected
        let mut bytes = self.fill_value().repeat(num_elements);
        let stored = ArraySubset::new_with_shape(chunk.shape.clone());
        let available = chunk_subset.overlap(&stored)?;
        if !available.is_empty() {
            let available_bytes =
                available.extract_bytes(&chunk.bytes, &chunk.shape, element_size)?;
            available.relative_to(chunk_subset.start())?.store_bytes(
                &available_bytes,
                &mut bytes,
                chunk_subset.shape(),
                element_size,
            )?;
        }
        Ok(bytes)
    }

    /// Read the elements of `selection` into `output`, an array of shape `output_shape`.
    ///
    /// `placement` maps a region relative to the selection box to its region in `output`.
    fn read_selection_into<P>(
        &self,
        selection: &Selection,
        options: &IoOptions,
        output: &mut [u8],
        output_shape: &[u64],
        placement: P,
    ) -> Result<(), ArrayError>
    where
        P: Fn(&ArraySubset) -> ArraySubset + Send + Sync,
    {
        if selection.is_empty() {
            return Ok(());
        }
        let element_size = self.data_type().size();
        let intersections = selection.chunk_intersections(self.chunk_shape(), self.shape());
        let output = Mutex::new(output);
        for_each_chunk(options.num_threads(), intersections, |intersection| {
            let bytes = self
                .retrieve_chunk_subset_bytes(&intersection.chunk_indices, &intersection.chunk_subset)?;
            let output_subset = placement(&intersection.selection_subset);
            let mut output = output.lock();
            output_subset.store_bytes(&bytes, &mut output[..], output_shape, element_size)?;
            Ok(())
        })
    }

    /// Read the elements in the box of `selection` as native endian bytes in C order.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if a chunk cannot be retrieved or decoded.
    pub fn read_selection_bytes_opt(
        &self,
        selection: &Selection,
        options: &IoOptions,
    ) -> Result<Vec<u8>, ArrayError> {
        let subset = selection.subset();
        let mut bytes = vec![0; self.num_bytes(subset.num_elements())?];
        self.read_selection_into(
            selection,
            options,
            &mut bytes,
            subset.shape(),
            ArraySubset::clone,
        )?;
        Ok(bytes)
    }

    fn read_selection_elements<T: Element>(
        &self,
        selection: &Selection,
        options: &IoOptions,
    ) -> Result<ArrayD<T>, ArrayError> {
        self.check_element_type::<T>()?;
        let bytes = self.read_selection_bytes_opt(selection, options)?;
        let elements: Vec<T> = bytemuck::allocation::pod_collect_to_vec(&bytes);
        Ok(ArrayD::from_shape_vec(
            IxDyn(&shape_to_usize(selection.shape())?),
            elements,
        )?)
    }

    /// Read the elements of a selection.
    ///
    /// Returns [`Selected::Scalar`] if every dimension is indexed by an integer, otherwise [`Selected::Array`] with the logical shape of the selection.
    /// Chunks that are not stored read as the fill value.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the selection is invalid,
    ///  - `T` is not the element type of the data type of the array, or
    ///  - a chunk cannot be retrieved or decoded.
    pub fn read<T: Element>(&self, selection: &[IndexElement]) -> Result<Selected<T>, ArrayError> {
        self.read_opt(selection, &self.io_options())
    }

    /// Explicit options version of [`read`](Array::read).
    #[allow(clippy::missing_errors_doc)]
    pub fn read_opt<T: Element>(
        &self,
        selection: &[IndexElement],
        options: &IoOptions,
    ) -> Result<Selected<T>, ArrayError> {
        let selection = Selection::resolve(selection, self.shape())?;
        let array = self.read_selection_elements::<T>(&selection, options)?;
        if selection.is_scalar() {
            let element = array
                .iter()
                .next()
                .copied()
                .ok_or_else(|| ArrayError::from("a scalar selection read no elements"))?;
            Ok(Selected::Scalar(element))
        } else {
            Ok(Selected::Array(array))
        }
    }

    /// Read the elements of a selection into an array, which is zero-dimensional for a scalar selection.
    ///
    /// # Errors
    /// See [`read`](Array::read).
    pub fn read_array<T: Element>(&self, selection: &[IndexElement]) -> Result<ArrayD<T>, ArrayError> {
        self.read_array_opt(selection, &self.io_options())
    }

    /// Explicit options version of [`read_array`](Array::read_array).
    #[allow(clippy::missing_errors_doc)]
    pub fn read_array_opt<T: Element>(
        &self,
        selection: &[IndexElement],
        options: &IoOptions,
    ) -> Result<ArrayD<T>, ArrayError> {
        let selection = Selection::resolve(selection, self.shape())?;
        self.read_selection_elements(&selection, options)
    }

    /// Read the elements of `source_selection` directly into the `destination_selection` of `destination`.
    ///
    /// An empty selection selects everything.
    /// The logical shapes of the two selections must match.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - either selection is invalid,
    ///  - the selection shapes differ,
    ///  - `T` is not the element type of the data type of the array, or
    ///  - a chunk cannot be retrieved or decoded.
    pub fn read_direct<T: Element>(
        &self,
        destination: &mut ArrayViewMutD<T>,
        source_selection: &[IndexElement],
        destination_selection: &[IndexElement],
    ) -> Result<(), ArrayError> {
        self.read_direct_opt(
            destination,
            source_selection,
            destination_selection,
            &self.io_options(),
        )
    }

    /// Explicit options version of [`read_direct`](Array::read_direct).
    #[allow(clippy::missing_errors_doc)]
    pub fn read_direct_opt<T: Element>(
        &self,
        destination: &mut ArrayViewMutD<T>,
        source_selection: &[IndexElement],
        destination_selection: &[IndexElement],
        options: &IoOptions,
    ) -> Result<(), ArrayError> {
        self.check_element_type::<T>()?;
        let source = Selection::resolve(source_selection, self.shape())?;
        let destination_shape = shape_to_u64(destination.shape());
        let target = Selection::resolve(destination_selection, &destination_shape)?;
        if source.shape() != target.shape() {
            return Err(ArrayError::ShapeMismatch {
                got: target.shape().to_vec(),
                expected: source.shape().to_vec(),
            });
        }
        if let Some(elements) = destination.as_slice_mut() {
            let output: &mut [u8] = bytemuck::cast_slice_mut(elements);
            self.read_selection_into(&source, options, output, &destination_shape, |subset| {
                target.place(&source.to_logical(subset))
            })
        } else {
            let elements = self.read_selection_elements::<T>(&source, options)?;
            let slice_info = subset_slice_info(target.subset())?;
            let mut region = destination.slice_mut(slice_info.as_slice());
            let elements = elements.into_shape_with_order(region.shape())?;
            region.assign(&elements);
            Ok(())
        }
    }

    /// Read the chunk at `chunk_indices`, or [`None`] if it is not stored.
    ///
    /// The chunk has its stored shape: bounded by the array shape for N5, the full chunk shape for Zarr.
    /// A varlength chunk is returned as a one-dimensional array of its elements.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the chunk indices are invalid, `T` is not the element type of the data type of the array, or the chunk cannot be decoded.
    pub fn read_chunk<T: Element>(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<ArrayD<T>>, ArrayError> {
        self.check_element_type::<T>()?;
        let Some(chunk) = self.retrieve_chunk_decoded(chunk_indices)? else {
            return Ok(None);
        };
        let elements: Vec<T> = bytemuck::allocation::pod_collect_to_vec(&chunk.bytes);
        let shape = if chunk.varlength {
            vec![elements.len()]
        } else {
            shape_to_usize(&chunk.shape)?
        };
        Ok(Some(ArrayD::from_shape_vec(IxDyn(&shape), elements)?))
    }
}
