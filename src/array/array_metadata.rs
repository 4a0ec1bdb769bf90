use crate::metadata::{
    n5::{N5ArrayMetadata, RESERVED_ARRAY_ATTRIBUTES},
    v2::{ArrayMetadataV2, ArrayMetadataV2Order},
    AttributesMap,
};

use super::{
    codec::Compression, ArrayCreateError, ArrayShape, ChunkKeySeparator, DataType, FillValue,
};

/// The metadata of an array, independent of the storage format.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayMetadata {
    /// The array shape.
    pub shape: ArrayShape,
    /// The chunk shape.
    pub chunk_shape: ArrayShape,
    /// The data type.
    pub data_type: DataType,
    /// The fill value.
    pub fill_value: FillValue,
    /// The compression.
    pub compression: Compression,
    /// User attributes.
    pub attributes: AttributesMap,
}

impl ArrayMetadata {
    /// Check that the shape, chunk shape, data type, and fill value are consistent.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the array has no dimensions, the chunk shape does not match the dimensionality or has a zero extent, or the fill value is not an element of the data type.
    pub fn validate(&self) -> Result<(), ArrayCreateError> {
        if self.shape.is_empty() {
            return Err(ArrayCreateError::ZeroDimensional);
        }
        if self.chunk_shape.len() != self.shape.len() || self.chunk_shape.contains(&0) {
            return Err(ArrayCreateError::InvalidChunkShape(
                self.chunk_shape.clone(),
                self.shape.clone(),
            ));
        }
        if self.fill_value.size() != self.data_type.size() {
            return Err(super::data_type::IncompatibleFillValueError::new(
                self.data_type,
                self.fill_value.clone(),
            )
            .into());
        }
        Ok(())
    }

    /// Create array metadata from an N5 `attributes.json` document.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the data type or compression is unsupported or the metadata is inconsistent.
    pub fn from_n5(metadata: N5ArrayMetadata) -> Result<Self, ArrayCreateError> {
        let data_type = DataType::from_name(&metadata.data_type)?;
        let compression = Compression::from_n5_metadata(&metadata.compression())?;
        let array_metadata = Self {
            shape: metadata.shape(),
            chunk_shape: metadata.chunk_shape(),
            data_type,
            fill_value: FillValue::zero(data_type),
            compression,
            attributes: metadata.attributes,
        };
        array_metadata.validate()?;
        Ok(array_metadata)
    }

    /// Create an N5 `attributes.json` document.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::NonZeroN5FillValue`] if the fill value is not zero, or [`ArrayCreateError::ReservedAttribute`] if a user attribute shadows the array metadata.
    pub fn to_n5(&self) -> Result<N5ArrayMetadata, ArrayCreateError> {
        if !self.fill_value.is_zero() {
            return Err(ArrayCreateError::NonZeroN5FillValue(
                self.fill_value.clone(),
            ));
        }
        if let Some(reserved) = self
            .attributes
            .keys()
            .find(|key| RESERVED_ARRAY_ATTRIBUTES.contains(&key.as_str()))
        {
            return Err(ArrayCreateError::ReservedAttribute(reserved.clone()));
        }
        Ok(N5ArrayMetadata::new(
            &self.shape,
            &self.chunk_shape,
            self.data_type.identifier().to_string(),
            self.compression.to_n5_metadata(),
            self.attributes.clone(),
        ))
    }

    /// Create array metadata from a Zarr V2 `.zarray` document and `.zattrs` attributes.
    ///
    /// Returns the metadata and the chunk key separator of the array.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the data type, fill value, compression, order, or filters are unsupported, or the metadata is inconsistent.
    pub fn from_v2(
        metadata: ArrayMetadataV2,
        attributes: AttributesMap,
    ) -> Result<(Self, ChunkKeySeparator), ArrayCreateError> {
        if metadata.order != ArrayMetadataV2Order::C {
            return Err(ArrayCreateError::UnsupportedMetadata(format!(
                "chunk memory layout {}",
                metadata.order
            )));
        }
        if metadata
            .filters
            .as_ref()
            .is_some_and(|filters| !filters.is_empty())
        {
            return Err(ArrayCreateError::UnsupportedMetadata(
                "filters".to_string(),
            ));
        }
        let data_type = DataType::from_zarr_dtype(&metadata.dtype)?;
        let fill_value = data_type.fill_value_from_metadata(&metadata.fill_value)?;
        let compression = Compression::from_zarr_metadata(metadata.compressor.as_ref())?;
        let array_metadata = Self {
            shape: metadata.shape,
            chunk_shape: metadata.chunks,
            data_type,
            fill_value,
            compression,
            attributes,
        };
        array_metadata.validate()?;
        Ok((array_metadata, metadata.dimension_separator))
    }

    /// Create a Zarr V2 `.zarray` document. User attributes are stored separately.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::InvalidFillValue`] if the fill value is not an element of the data type.
    pub fn to_v2(&self, separator: ChunkKeySeparator) -> Result<ArrayMetadataV2, ArrayCreateError> {
        Ok(ArrayMetadataV2::new(
            self.shape.clone(),
            self.chunk_shape.clone(),
            self.data_type.zarr_dtype(),
            self.compression.to_zarr_metadata(),
            self.data_type.metadata_fill_value(&self.fill_value)?,
            separator,
        ))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn metadata() -> ArrayMetadata {
        ArrayMetadata {
            shape: vec![100, 50],
            chunk_shape: vec![10, 20],
            data_type: DataType::Float32,
            fill_value: FillValue::from(0.0f32),
            compression: Compression::Raw,
            attributes: AttributesMap::new(),
        }
    }

    #[test]
    fn array_metadata_validate() {
        assert!(metadata().validate().is_ok());
        let mut invalid = metadata();
        invalid.chunk_shape = vec![10];
        assert!(matches!(
            invalid.validate(),
            Err(ArrayCreateError::InvalidChunkShape(..))
        ));
        invalid.chunk_shape = vec![10, 0];
        assert!(invalid.validate().is_err());
        invalid.shape = vec![];
        assert!(matches!(
            invalid.validate(),
            Err(ArrayCreateError::ZeroDimensional)
        ));
        let mut invalid = metadata();
        invalid.fill_value = FillValue::from(0u8);
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn array_metadata_n5() {
        let n5 = metadata().to_n5().unwrap();
        assert_eq!(n5.dimensions, vec![50, 100]);
        assert_eq!(n5.block_size, vec![20, 10]);
        assert_eq!(n5.data_type, "float32");
        assert_eq!(ArrayMetadata::from_n5(n5).unwrap(), metadata());

        let mut non_zero = metadata();
        non_zero.fill_value = FillValue::from(1.0f32);
        assert!(matches!(
            non_zero.to_n5(),
            Err(ArrayCreateError::NonZeroN5FillValue(_))
        ));

        let mut reserved = metadata();
        reserved
            .attributes
            .insert("dataType".to_string(), json!("uint8"));
        assert!(matches!(
            reserved.to_n5(),
            Err(ArrayCreateError::ReservedAttribute(_))
        ));
    }

    #[test]
    fn array_metadata_v2() {
        let mut nan = metadata();
        nan.fill_value = FillValue::from(f32::NAN);
        let v2 = nan.to_v2(ChunkKeySeparator::Slash).unwrap();
        assert_eq!(v2.dtype, "<f4");
        assert_eq!(v2.fill_value, json!("NaN"));
        assert_eq!(v2.compressor, None);
        let (round_trip, separator) = ArrayMetadata::from_v2(v2, AttributesMap::new()).unwrap();
        assert_eq!(separator, ChunkKeySeparator::Slash);
        assert!(round_trip.fill_value.as_element::<f32>().unwrap().is_nan());

        let mut fortran = metadata().to_v2(ChunkKeySeparator::Dot).unwrap();
        fortran.order = ArrayMetadataV2Order::F;
        assert!(matches!(
            ArrayMetadata::from_v2(fortran, AttributesMap::new()),
            Err(ArrayCreateError::UnsupportedMetadata(_))
        ));
    }
}
