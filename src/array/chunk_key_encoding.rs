//! Chunk key encodings.
//!
//! A chunk key encoding maps the grid indices of a chunk to the store key of the chunk, relative to the array prefix.
//!  - N5 joins the indices with `/` in reverse (Fortran) order, so chunk `[c0, c1, c2]` is stored at `c2/c1/c0`.
//!  - Zarr joins the indices in order with a separator: `c0.c1.c2` (the default) or `c0/c1/c2`.

use derive_more::Display;

use crate::array::ArrayIndices;

/// A chunk key separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Default)]
pub enum ChunkKeySeparator {
    /// The slash '/' character.
    #[display("/")]
    Slash,
    /// The dot '.' character.
    #[default]
    #[display(".")]
    Dot,
}

impl ChunkKeySeparator {
    const fn as_char(self) -> char {
        match self {
            Self::Slash => '/',
            Self::Dot => '.',
        }
    }
}

impl TryFrom<char> for ChunkKeySeparator {
    type Error = char;

    fn try_from(separator: char) -> Result<Self, Self::Error> {
        if separator == '/' {
            Ok(Self::Slash)
        } else if separator == '.' {
            Ok(Self::Dot)
        } else {
            Err(separator)
        }
    }
}

impl serde::Serialize for ChunkKeySeparator {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_char(self.as_char())
    }
}

impl<'de> serde::Deserialize<'de> for ChunkKeySeparator {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        if let serde_json::Value::String(separator) = value {
            if separator == "/" {
                return Ok(ChunkKeySeparator::Slash);
            } else if separator == "." {
                return Ok(ChunkKeySeparator::Dot);
            }
        }
        Err(serde::de::Error::custom(
            "chunk key separator must be a `.` or `/`.",
        ))
    }
}

/// A chunk key encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKeyEncoding {
    /// The N5 encoding: indices in reverse order, separated by `/`.
    N5,
    /// The Zarr encoding: indices in order, separated by the separator.
    Zarr(ChunkKeySeparator),
}

impl ChunkKeyEncoding {
    /// Encode chunk grid indices into a key relative to the array prefix.
    ///
    /// A chunk of a zero-dimensional array is encoded as `0`.
    #[must_use]
    pub fn encode(&self, chunk_grid_indices: &[u64]) -> String {
        if chunk_grid_indices.is_empty() {
            return "0".to_string();
        }
        match self {
            Self::N5 => itertools::join(chunk_grid_indices.iter().rev(), "/"),
            Self::Zarr(separator) => {
                itertools::join(chunk_grid_indices, &separator.to_string())
            }
        }
    }

    /// Decode a key relative to the array prefix into chunk grid indices.
    ///
    /// Returns [`None`] if the key is not a chunk key of this encoding.
    #[must_use]
    pub fn decode(&self, key: &str) -> Option<ArrayIndices> {
        let separator = match self {
            Self::N5 => '/',
            Self::Zarr(separator) => separator.as_char(),
        };
        let mut indices = key
            .split(separator)
            .map(|index| {
                if index.is_empty() || !index.bytes().all(|byte| byte.is_ascii_digit()) {
                    None
                } else {
                    index.parse::<u64>().ok()
                }
            })
            .collect::<Option<ArrayIndices>>()?;
        if *self == Self::N5 {
            indices.reverse();
        }
        Some(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_key_encoding_n5() {
        let encoding = ChunkKeyEncoding::N5;
        assert_eq!(encoding.encode(&[1, 23, 45]), "45/23/1");
        assert_eq!(encoding.decode("45/23/1"), Some(vec![1, 23, 45]));
        assert_eq!(encoding.decode("attributes.json"), None);
    }

    #[test]
    fn chunk_key_encoding_zarr() {
        let dot = ChunkKeyEncoding::Zarr(ChunkKeySeparator::Dot);
        assert_eq!(dot.encode(&[1, 23, 45]), "1.23.45");
        assert_eq!(dot.decode("1.23.45"), Some(vec![1, 23, 45]));
        assert_eq!(dot.decode(".zarray"), None);
        assert_eq!(dot.decode("1.-2"), None);
        let slash = ChunkKeyEncoding::Zarr(ChunkKeySeparator::Slash);
        assert_eq!(slash.encode(&[1, 23, 45]), "1/23/45");
        assert_eq!(slash.decode("1/23/45"), Some(vec![1, 23, 45]));
        assert_eq!(slash.encode(&[]), "0");
    }

    #[test]
    fn chunk_key_separator_serde() {
        assert_eq!(
            serde_json::to_string(&ChunkKeySeparator::Slash).unwrap(),
            r#""/""#
        );
        let separator: ChunkKeySeparator = serde_json::from_str(r#"".""#).unwrap();
        assert_eq!(separator, ChunkKeySeparator::Dot);
        assert!(serde_json::from_str::<ChunkKeySeparator>(r#""-""#).is_err());
        assert_eq!(ChunkKeySeparator::try_from('/'), Ok(ChunkKeySeparator::Slash));
        assert_eq!(ChunkKeySeparator::try_from('x'), Err('x'));
    }
}
