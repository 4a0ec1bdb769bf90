//! The `gzip` compressor.

use std::io::{Cursor, Read};

use flate2::bufread::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};
use serde::{Deserialize, Serialize};

use super::{compression_level, parse_options, CodecError, CompressionCreateError, CompressionOptions, OptionNames};

pub(crate) const OPTION_NAMES: &[OptionNames] = &[
    OptionNames {
        option: "level",
        n5: "level",
        zarr: "level",
    },
    OptionNames {
        option: "useZlib",
        n5: "useZlib",
        zarr: "",
    },
];

compression_level!(
    /// A gzip compression level, an integer from 0 to 9.
    GzipCompressionLevel,
    u32,
    0,
    9
);

impl Default for GzipCompressionLevel {
    fn default() -> Self {
        Self(5)
    }
}

/// The configuration of the `gzip` compressor.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct GzipCodecConfiguration {
    /// The compression level.
    #[serde(default)]
    pub level: GzipCompressionLevel,
    /// Use zlib framing instead of gzip framing.
    #[serde(default)]
    pub use_zlib: bool,
}

/// A `gzip` codec implementation.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct GzipCodec {
    configuration: GzipCodecConfiguration,
}

impl GzipCodec {
    /// Create a new `gzip` codec.
    #[must_use]
    pub const fn new(level: GzipCompressionLevel, use_zlib: bool) -> Self {
        Self {
            configuration: GzipCodecConfiguration { level, use_zlib },
        }
    }

    /// Create a new `gzip` codec from options.
    ///
    /// # Errors
    /// Returns [`CompressionCreateError`] if an option is unknown or invalid.
    pub fn new_with_options(options: &CompressionOptions) -> Result<Self, CompressionCreateError> {
        Ok(Self {
            configuration: parse_options("gzip", options, OPTION_NAMES)?,
        })
    }

    /// Return the configuration of the codec.
    #[must_use]
    pub const fn configuration(&self) -> &GzipCodecConfiguration {
        &self.configuration
    }

    pub(super) fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let level = flate2::Compression::new(self.configuration.level.get());
        let mut out: Vec<u8> = Vec::new();
        if self.configuration.use_zlib {
            ZlibEncoder::new(Cursor::new(decoded), level).read_to_end(&mut out)?;
        } else {
            GzEncoder::new(Cursor::new(decoded), level).read_to_end(&mut out)?;
        }
        Ok(out)
    }

    pub(super) fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out: Vec<u8> = Vec::new();
        if self.configuration.use_zlib {
            ZlibDecoder::new(Cursor::new(encoded)).read_to_end(&mut out)?;
        } else {
            GzDecoder::new(Cursor::new(encoded)).read_to_end(&mut out)?;
        }
        Ok(out)
    }
}
