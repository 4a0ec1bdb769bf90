//! The `bzip2` compressor.

use std::io::{Cursor, Read};

use bzip2::bufread::{BzDecoder, BzEncoder};
use serde::{Deserialize, Serialize};

use super::{compression_level, parse_options, CodecError, CompressionCreateError, CompressionOptions, OptionNames};

pub(crate) const OPTION_NAMES: &[OptionNames] = &[OptionNames {
    option: "level",
    n5: "blockSize",
    zarr: "level",
}];

compression_level!(
    /// A bzip2 compression level (block size in units of 100k), an integer from 1 to 9.
    Bz2CompressionLevel,
    u32,
    1,
    9
);

impl Default for Bz2CompressionLevel {
    fn default() -> Self {
        Self(9)
    }
}

/// The configuration of the `bzip2` compressor.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct Bz2CodecConfiguration {
    /// The compression level.
    #[serde(default)]
    pub level: Bz2CompressionLevel,
}

/// A `bzip2` codec implementation.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Bz2Codec {
    configuration: Bz2CodecConfiguration,
}

impl Bz2Codec {
    /// Create a new `bzip2` codec.
    #[must_use]
    pub const fn new(level: Bz2CompressionLevel) -> Self {
        Self {
            configuration: Bz2CodecConfiguration { level },
        }
    }

    /// Create a new `bzip2` codec from options.
    ///
    /// # Errors
    /// Returns [`CompressionCreateError`] if an option is unknown or invalid.
    pub fn new_with_options(options: &CompressionOptions) -> Result<Self, CompressionCreateError> {
        Ok(Self {
            configuration: parse_options("bzip2", options, OPTION_NAMES)?,
        })
    }

    /// Return the configuration of the codec.
    #[must_use]
    pub const fn configuration(&self) -> &Bz2CodecConfiguration {
        &self.configuration
    }

    pub(super) fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = BzEncoder::new(
            Cursor::new(decoded),
            bzip2::Compression::new(self.configuration.level.get()),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    pub(super) fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoder = BzDecoder::new(Cursor::new(encoded));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
