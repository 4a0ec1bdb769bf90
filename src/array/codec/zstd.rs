//! The `zstd` compressor.

use serde::{Deserialize, Serialize};

use super::{compression_level, parse_options, CodecError, CompressionCreateError, CompressionOptions, OptionNames};

pub(crate) const OPTION_NAMES: &[OptionNames] = &[OptionNames {
    option: "level",
    n5: "level",
    zarr: "level",
}];

compression_level!(
    /// A zstd compression level, an integer from -7 to 22.
    ZstdCompressionLevel,
    i32,
    -7,
    22
);

impl Default for ZstdCompressionLevel {
    fn default() -> Self {
        Self(3)
    }
}

/// The configuration of the `zstd` compressor.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct ZstdCodecConfiguration {
    /// The compression level.
    #[serde(default)]
    pub level: ZstdCompressionLevel,
}

/// A `zstd` codec implementation.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ZstdCodec {
    configuration: ZstdCodecConfiguration,
}

impl ZstdCodec {
    /// Create a new `zstd` codec.
    #[must_use]
    pub const fn new(level: ZstdCompressionLevel) -> Self {
        Self {
            configuration: ZstdCodecConfiguration { level },
        }
    }

    /// Create a new `zstd` codec from options.
    ///
    /// # Errors
    /// Returns [`CompressionCreateError`] if an option is unknown or invalid.
    pub fn new_with_options(options: &CompressionOptions) -> Result<Self, CompressionCreateError> {
        Ok(Self {
            configuration: parse_options("zstd", options, OPTION_NAMES)?,
        })
    }

    /// Return the configuration of the codec.
    #[must_use]
    pub const fn configuration(&self) -> &ZstdCodecConfiguration {
        &self.configuration
    }

    pub(super) fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(::zstd::encode_all(decoded, self.configuration.level.get())?)
    }

    pub(super) fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(::zstd::decode_all(encoded)?)
    }
}
