//! The N5 chunk header.
//!
//! Every N5 chunk starts with a big-endian header:
//!
//! | field | type | |
//! | --- | --- | --- |
//! | mode | `u16` | `0` for a default chunk, `1` for a varlength chunk |
//! | ndim | `u16` | the number of dimensions |
//! | dims | `u32 * ndim` | the stored shape of the chunk, fastest varying dimension first |
//! | num_elements | `u32` | varlength chunks only: the number of elements in the payload |
//!
//! The compressed payload follows the header.
//! Zarr chunks have no header.

use derive_more::Display;

use super::{codec::CodecError, ArrayShape};

/// The mode of an N5 chunk.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum N5ChunkMode {
    /// The number of elements in the chunk is the product of its shape.
    #[display("default")]
    Default,
    /// The number of elements in the chunk is recorded in the header and may differ from the product of its shape.
    #[display("varlength")]
    VarLength,
}

/// An N5 chunk header.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct N5ChunkHeader {
    mode: N5ChunkMode,
    /// The stored chunk shape in C (slowest varying first) order.
    shape: ArrayShape,
    num_elements: u64,
}

fn to_u32(value: u64, what: &str) -> Result<u32, CodecError> {
    u32::try_from(value)
        .map_err(|_| CodecError::InvalidChunkHeader(format!("{what} {value} exceeds u32::MAX")))
}

impl N5ChunkHeader {
    /// Create a header for a default mode chunk of `shape` (in C order).
    #[must_use]
    pub fn new_default(shape: ArrayShape) -> Self {
        let num_elements = shape.iter().product();
        Self {
            mode: N5ChunkMode::Default,
            shape,
            num_elements,
        }
    }

    /// Create a header for a varlength chunk of `shape` (in C order) holding `num_elements` elements.
    #[must_use]
    pub fn new_varlength(shape: ArrayShape, num_elements: u64) -> Self {
        Self {
            mode: N5ChunkMode::VarLength,
            shape,
            num_elements,
        }
    }

    /// The chunk mode.
    #[must_use]
    pub const fn mode(&self) -> N5ChunkMode {
        self.mode
    }

    /// The stored chunk shape in C order.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The number of elements in the chunk payload.
    #[must_use]
    pub const fn num_elements(&self) -> u64 {
        self.num_elements
    }

    /// Returns true if this is a varlength chunk.
    #[must_use]
    pub fn is_varlength(&self) -> bool {
        self.mode == N5ChunkMode::VarLength
    }

    /// Encode the header.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidChunkHeader`] if the dimensionality or an extent exceeds the width of its header field.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let ndim = u16::try_from(self.shape.len()).map_err(|_| {
            CodecError::InvalidChunkHeader(format!(
                "dimensionality {} exceeds u16::MAX",
                self.shape.len()
            ))
        })?;
        let mut header = Vec::with_capacity(4 + 4 * self.shape.len() + 4);
        let mode: u16 = match self.mode {
            N5ChunkMode::Default => 0,
            N5ChunkMode::VarLength => 1,
        };
        header.extend_from_slice(&mode.to_be_bytes());
        header.extend_from_slice(&ndim.to_be_bytes());
        for &size in self.shape.iter().rev() {
            header.extend_from_slice(&to_u32(size, "chunk extent")?.to_be_bytes());
        }
        if self.is_varlength() {
            header.extend_from_slice(&to_u32(self.num_elements, "number of elements")?.to_be_bytes());
        }
        Ok(header)
    }

    /// Decode a header from the start of `bytes`, returning the header and its encoded length.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidChunkHeader`] if `bytes` is too short or the mode is unknown.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), CodecError> {
        let truncated = || CodecError::InvalidChunkHeader("the chunk header is truncated".to_string());
        let read_u16 = |offset: usize| -> Result<u16, CodecError> {
            let field = bytes.get(offset..offset + 2).ok_or_else(truncated)?;
            Ok(u16::from_be_bytes([field[0], field[1]]))
        };
        let read_u32 = |offset: usize| -> Result<u32, CodecError> {
            let field = bytes.get(offset..offset + 4).ok_or_else(truncated)?;
            Ok(u32::from_be_bytes([field[0], field[1], field[2], field[3]]))
        };

        let mode = match read_u16(0)? {
            0 => N5ChunkMode::Default,
            1 => N5ChunkMode::VarLength,
            mode => {
                return Err(CodecError::InvalidChunkHeader(format!(
                    "unknown chunk mode {mode}"
                )))
            }
        };
        let ndim = usize::from(read_u16(2)?);
        let mut shape = (0..ndim)
            .map(|dim| read_u32(4 + 4 * dim).map(u64::from))
            .collect::<Result<ArrayShape, _>>()?;
        shape.reverse();
        let mut length = 4 + 4 * ndim;
        let num_elements = match mode {
            N5ChunkMode::Default => shape.iter().product(),
            N5ChunkMode::VarLength => {
                let num_elements = u64::from(read_u32(length)?);
                length += 4;
                num_elements
            }
        };
        Ok((
            Self {
                mode,
                shape,
                num_elements,
            },
            length,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_header_default() {
        let header = N5ChunkHeader::new_default(vec![3, 2, 1]);
        let encoded = header.encode().unwrap();
        assert_eq!(
            encoded,
            vec![0, 0, 0, 3, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3]
        );
        let (decoded, length) = N5ChunkHeader::decode(&encoded).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(length, 16);
        assert_eq!(decoded.num_elements(), 6);
    }

    #[test]
    fn chunk_header_varlength() {
        let header = N5ChunkHeader::new_varlength(vec![10, 10], 7);
        let mut encoded = header.encode().unwrap();
        assert_eq!(&encoded[..2], &[0, 1]);
        assert_eq!(&encoded[12..], &[0, 0, 0, 7]);
        encoded.extend_from_slice(&[255; 7]);
        let (decoded, length) = N5ChunkHeader::decode(&encoded).unwrap();
        assert!(decoded.is_varlength());
        assert_eq!(decoded.shape(), &[10, 10]);
        assert_eq!(decoded.num_elements(), 7);
        assert_eq!(length, 16);
    }

    #[test]
    fn chunk_header_invalid() {
        assert!(N5ChunkHeader::decode(&[0, 0, 0, 2, 0, 0, 0, 1]).is_err());
        assert!(N5ChunkHeader::decode(&[0, 2, 0, 0]).is_err());
        assert!(N5ChunkHeader::new_default(vec![1 << 33]).encode().is_err());
    }
}
