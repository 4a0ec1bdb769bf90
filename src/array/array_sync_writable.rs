use log::debug;
use ndarray::ArrayViewD;

use crate::{
    array_subset::ArraySubset,
    selection::{IndexElement, Selection},
};

use super::{
    chunk_header::N5ChunkHeader, concurrency::for_each_chunk, endianness::convert_endianness,
    shape_to_u64, subset_slice_info, Array, ArrayError, ChunkKeyEncoding, Element, IoOptions,
    Operand, Scalar,
};

/// The elements to write to a selection, in native endianness.
#[derive(Copy, Clone)]
enum WriteSource<'a> {
    /// A single element repeated over the selection.
    Broadcast(&'a [u8]),
    /// The elements of the selection box in C order.
    Bytes(&'a [u8]),
}

impl Array {
    /// Encode and store a chunk with elements `bytes` in native endianness.
    ///
    /// A fixed size chunk equal to the fill value is erased instead, unless `options` enable writing empty chunks.
    pub(crate) fn store_chunk_bytes(
        &self,
        chunk_indices: &[u64],
        shape: &[u64],
        mut bytes: Vec<u8>,
        varlength: bool,
        options: &IoOptions,
    ) -> Result<(), ArrayError> {
        let key = self.chunk_key(chunk_indices)?;
        if !varlength
            && !options.write_empty_chunks()
            && self.fill_value().equals_all(&bytes, self.data_type())
        {
            if self.store().erase(&key)? {
                debug!("erased chunk {key} equal to the fill value");
            }
            return Ok(());
        }

        let element_size = self.data_type().size();
        convert_endianness(&mut bytes, element_size, self.endianness());
        let encoded = match self.chunk_key_encoding() {
            ChunkKeyEncoding::N5 => {
                let header = if varlength {
                    N5ChunkHeader::new_varlength(shape.to_vec(), (bytes.len() / element_size) as u64)
                } else {
                    N5ChunkHeader::new_default(shape.to_vec())
                };
                let mut encoded = header.encode()?;
                encoded.extend(self.compression().encode(&bytes, element_size)?);
                encoded
            }
            ChunkKeyEncoding::Zarr(_) => self.compression().encode(&bytes, element_size)?,
        };
        self.store().set(&key, &encoded)?;
        Ok(())
    }

    /// Retrieve the elements of a chunk with `stored_shape` for a partial update.
    fn retrieve_chunk_for_update(
        &self,
        chunk_indices: &[u64],
        stored_shape: &[u64],
    ) -> Result<Vec<u8>, ArrayError> {
        let element_size = self.data_type().size();
        let num_elements = usize::try_from(stored_shape.iter().product::<u64>())
            .map_err(|_| ArrayError::from("chunk exceeds usize::MAX elements"))?;
        match self.retrieve_chunk_decoded(chunk_indices)? {
            None => Ok(self.fill_value().repeat(num_elements)),
            Some(chunk) if chunk.varlength => Err(ArrayError::UnexpectedVariableLengthChunk(
                chunk_indices.to_vec(),
            )),
            Some(chunk) if chunk.shape == stored_shape => Ok(chunk.bytes),
            Some(chunk) => {
                let mut bytes = self.fill_value().repeat(num_elements);
                let available = ArraySubset::new_with_shape(stored_shape.to_vec())
                    .overlap(&ArraySubset::new_with_shape(chunk.shape.clone()))?;
                if !available.is_empty() {
                    let available_bytes =
                        available.extract_bytes(&chunk.bytes, &chunk.shape, element_size)?;
                    available.store_bytes(&available_bytes, &mut bytes, stored_shape, element_size)?;
                }
                Ok(bytes)
            }
        }
    }

    fn write_selection(
        &self,
        selection: &Selection,
        source: WriteSource,
        options: &IoOptions,
    ) -> Result<(), ArrayError> {
        if selection.is_empty() {
            return Ok(());
        }
        let element_size = self.data_type().size();
        let box_shape = selection.subset().shape();
        let intersections = selection.chunk_intersections(self.chunk_shape(), self.shape());
        for_each_chunk(options.num_threads(), intersections, |intersection| {
            let chunk_indices = &intersection.chunk_indices;
            let bounded = self.chunk_subset(chunk_indices)?;
            let stored_shape = self.stored_chunk_shape(chunk_indices)?;
            let mut chunk_bytes = if intersection.chunk_subset.shape() == bounded.shape() {
                let num_elements = usize::try_from(stored_shape.iter().product::<u64>())
                    .map_err(|_| ArrayError::from("chunk exceeds usize::MAX elements"))?;
                self.fill_value().repeat(num_elements)
            } else {
                self.retrieve_chunk_for_update(chunk_indices, &stored_shape)?
            };
            match source {
                WriteSource::Broadcast(element) => {
                    intersection
                        .chunk_subset
                        .fill_bytes(element, &mut chunk_bytes, &stored_shape)?;
                }
                WriteSource::Bytes(bytes) => {
                    let subset_bytes = intersection
                        .selection_subset
                        .extract_bytes(bytes, box_shape, element_size)?;
                    intersection.chunk_subset.store_bytes(
                        &subset_bytes,
                        &mut chunk_bytes,
                        &stored_shape,
                        element_size,
                    )?;
                }
            }
            self.store_chunk_bytes(chunk_indices, &stored_shape, chunk_bytes, false, options)
        })
    }

    /// Convert elements of any element type to native endian bytes of the data type of the array.
    fn elements_to_bytes<T: Element>(
        &self,
        elements: impl Iterator<Item = T>,
    ) -> Result<Vec<u8>, ArrayError> {
        let data_type = self.data_type();
        with_element_type!(data_type, U, {
            let converted = elements
                .map(|element| {
                    U::cast_from(element)
                        .ok_or_else(|| ArrayError::Coercion(format!("{element:?}"), data_type))
                })
                .collect::<Result<Vec<U>, _>>()?;
            Ok(bytemuck::cast_slice(&converted).to_vec())
        })
    }

    /// Convert dynamic scalars to native endian bytes of the data type of the array.
    fn scalars_to_bytes<'a>(
        &self,
        scalars: impl Iterator<Item = &'a Scalar>,
    ) -> Result<Vec<u8>, ArrayError> {
        let data_type = self.data_type();
        with_element_type!(data_type, U, {
            let converted = scalars
                .map(|scalar| {
                    U::from_scalar(scalar)
                        .ok_or_else(|| ArrayError::Coercion(scalar.to_string(), data_type))
                })
                .collect::<Result<Vec<U>, _>>()?;
            Ok(bytemuck::cast_slice(&converted).to_vec())
        })
    }

    /// Write `values` to a selection.
    ///
    /// `values` must have the logical shape of the selection.
    /// Elements are converted to the data type of the array, so `T` need not match it.
    /// Use [`write_direct`](Array::write_direct) to write elements of the array data type without conversion.
    /// Chunks reduced to the fill value by the write are erased (see [`IoOptions::write_empty_chunks`]).
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the selection is invalid,
    ///  - the shape of `values` does not match the selection ([`ArrayError::ShapeMismatch`]),
    ///  - an element is not representable by the data type of the array ([`ArrayError::Coercion`]), or
    ///  - a chunk cannot be retrieved, encoded, or stored.
    pub fn write<T: Element>(
        &self,
        selection: &[IndexElement],
        values: &ArrayViewD<T>,
    ) -> Result<(), ArrayError> {
        self.write_opt(selection, values, &self.io_options())
    }

    /// Explicit options version of [`write`](Array::write).
    #[allow(clippy::missing_errors_doc)]
    pub fn write_opt<T: Element>(
        &self,
        selection: &[IndexElement],
        values: &ArrayViewD<T>,
        options: &IoOptions,
    ) -> Result<(), ArrayError> {
        let selection = Selection::resolve(selection, self.shape())?;
        let shape = shape_to_u64(values.shape());
        if shape != selection.shape() {
            return Err(ArrayError::ShapeMismatch {
                got: shape,
                expected: selection.shape().to_vec(),
            });
        }
        let bytes = self.elements_to_bytes(values.iter().copied())?;
        self.write_selection(&selection, WriteSource::Bytes(&bytes), options)
    }

    /// Write `value` to every element of a selection.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the selection is invalid, `value` is not representable by the data type of the array, or a chunk cannot be retrieved, encoded, or stored.
    pub fn write_scalar<T: Element>(
        &self,
        selection: &[IndexElement],
        value: T,
    ) -> Result<(), ArrayError> {
        self.write_scalar_opt(selection, value, &self.io_options())
    }

    /// Explicit options version of [`write_scalar`](Array::write_scalar).
    #[allow(clippy::missing_errors_doc)]
    pub fn write_scalar_opt<T: Element>(
        &self,
        selection: &[IndexElement],
        value: T,
        options: &IoOptions,
    ) -> Result<(), ArrayError> {
        let selection = Selection::resolve(selection, self.shape())?;
        let element = self.elements_to_bytes(std::iter::once(value))?;
        self.write_selection(&selection, WriteSource::Broadcast(&element), options)
    }

    /// Assign a dynamically typed value to a selection.
    ///
    /// A scalar is broadcast to every selected element.
    /// An array must have the logical shape of the selection.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the selection is invalid,
    ///  - the value is a non-numeric scalar ([`ArrayError::TypeMismatch`]),
    ///  - the value is an array that does not match the selection shape ([`ArrayError::ShapeMismatch`]),
    ///  - a value is not representable by the data type of the array ([`ArrayError::Coercion`]), or
    ///  - a chunk cannot be retrieved, encoded, or stored.
    pub fn assign(&self, selection: &[IndexElement], value: &Operand) -> Result<(), ArrayError> {
        self.assign_opt(selection, value, &self.io_options())
    }

    /// Explicit options version of [`assign`](Array::assign).
    #[allow(clippy::missing_errors_doc)]
    pub fn assign_opt(
        &self,
        selection: &[IndexElement],
        value: &Operand,
        options: &IoOptions,
    ) -> Result<(), ArrayError> {
        let selection = Selection::resolve(selection, self.shape())?;
        match value {
            Operand::Scalar(scalar) => {
                if !scalar.is_numeric() {
                    return Err(ArrayError::TypeMismatch(scalar.type_name().to_string()));
                }
                let element = self.scalars_to_bytes(std::iter::once(scalar))?;
                self.write_selection(&selection, WriteSource::Broadcast(&element), options)
            }
            Operand::Array { shape, elements } => {
                if shape != selection.shape() {
                    return Err(ArrayError::ShapeMismatch {
                        got: shape.clone(),
                        expected: selection.shape().to_vec(),
                    });
                }
                if elements.len() as u64 != selection.num_elements() {
                    return Err(ArrayError::ShapeMismatch {
                        got: vec![elements.len() as u64],
                        expected: selection.shape().to_vec(),
                    });
                }
                let bytes = self.scalars_to_bytes(elements.iter())?;
                self.write_selection(&selection, WriteSource::Bytes(&bytes), options)
            }
        }
    }

    /// Write the `source_selection` of `source` directly to the `destination_selection` of the array.
    ///
    /// An empty selection selects everything.
    /// The logical shapes of the two selections must match.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - either selection is invalid,
    ///  - the selection shapes differ,
    ///  - `T` is not the element type of the data type of the array, or
    ///  - a chunk cannot be retrieved, encoded, or stored.
    pub fn write_direct<T: Element>(
        &self,
        source: &ArrayViewD<T>,
        source_selection: &[IndexElement],
        destination_selection: &[IndexElement],
    ) -> Result<(), ArrayError> {
        self.write_direct_opt(
            source,
            source_selection,
            destination_selection,
            &self.io_options(),
        )
    }

    /// Explicit options version of [`write_direct`](Array::write_direct).
    #[allow(clippy::missing_errors_doc)]
    pub fn write_direct_opt<T: Element>(
        &self,
        source: &ArrayViewD<T>,
        source_selection: &[IndexElement],
        destination_selection: &[IndexElement],
        options: &IoOptions,
    ) -> Result<(), ArrayError> {
        self.check_element_type::<T>()?;
        let source_shape = shape_to_u64(source.shape());
        let source_selection = Selection::resolve(source_selection, &source_shape)?;
        let destination = Selection::resolve(destination_selection, self.shape())?;
        if source_selection.shape() != destination.shape() {
            return Err(ArrayError::ShapeMismatch {
                got: source_selection.shape().to_vec(),
                expected: destination.shape().to_vec(),
            });
        }
        let bytes = if let Some(elements) = source.as_slice() {
            source_selection.subset().extract_bytes(
                bytemuck::cast_slice(elements),
                &source_shape,
                self.data_type().size(),
            )?
        } else {
            let slice_info = subset_slice_info(source_selection.subset())?;
            let elements: Vec<T> = source.slice(slice_info.as_slice()).iter().copied().collect();
            bytemuck::cast_slice(&elements).to_vec()
        };
        self.write_selection(&destination, WriteSource::Bytes(&bytes), options)
    }

    /// Write a chunk.
    ///
    /// A fixed size chunk must have the stored chunk shape ([`stored_chunk_shape`](Array::stored_chunk_shape)).
    /// A Zarr chunk may also have the shape of the chunk bounded by the array, in which case it is padded with the fill value.
    /// A chunk equal to the fill value is erased (see [`IoOptions::write_empty_chunks`]).
    ///
    /// A varlength chunk (`varlength` true) holds any number of elements and is only supported by N5.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the chunk indices are invalid,
    ///  - `T` is not the element type of the data type of the array,
    ///  - a varlength chunk is written to a Zarr array ([`ArrayError::VariableLengthUnsupported`]),
    ///  - the chunk shape is unexpected, or
    ///  - the chunk cannot be encoded or stored.
    pub fn write_chunk<T: Element>(
        &self,
        chunk_indices: &[u64],
        chunk: &ArrayViewD<T>,
        varlength: bool,
    ) -> Result<(), ArrayError> {
        self.write_chunk_opt(chunk_indices, chunk, varlength, &self.io_options())
    }

    /// Explicit options version of [`write_chunk`](Array::write_chunk).
    #[allow(clippy::missing_errors_doc)]
    pub fn write_chunk_opt<T: Element>(
        &self,
        chunk_indices: &[u64],
        chunk: &ArrayViewD<T>,
        varlength: bool,
        options: &IoOptions,
    ) -> Result<(), ArrayError> {
        self.check_element_type::<T>()?;
        if varlength && !self.format().supports_varlength() {
            return Err(ArrayError::VariableLengthUnsupported(
                self.format().to_string(),
            ));
        }
        let bounded = self.chunk_subset(chunk_indices)?;
        let stored_shape = self.stored_chunk_shape(chunk_indices)?;
        let elements: Vec<T> = chunk.iter().copied().collect();
        let bytes: Vec<u8> = bytemuck::cast_slice(&elements).to_vec();
        if varlength {
            return self.store_chunk_bytes(chunk_indices, &stored_shape, bytes, true, options);
        }

        let shape = shape_to_u64(chunk.shape());
        let bytes = if shape == stored_shape {
            bytes
        } else if shape == bounded.shape() {
            let mut padded = self.fill_value().repeat(usize::try_from(stored_shape.iter().product::<u64>())
                .map_err(|_| ArrayError::from("chunk exceeds usize::MAX elements"))?);
            ArraySubset::new_with_shape(shape).store_bytes(
                &bytes,
                &mut padded,
                &stored_shape,
                self.data_type().size(),
            )?;
            padded
        } else {
            return Err(ArrayError::UnexpectedChunkShape {
                chunk_indices: chunk_indices.to_vec(),
                got: shape,
                expected: stored_shape,
            });
        };
        self.store_chunk_bytes(chunk_indices, &stored_shape, bytes, false, options)
    }
}
