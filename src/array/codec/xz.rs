//! The `xz` compressor.
//!
//! Zarr records this compressor as `lzma` with the xz container format.

use std::io::{Cursor, Read};

use serde::{Deserialize, Serialize};
use xz2::bufread::{XzDecoder, XzEncoder};

use super::{compression_level, parse_options, CodecError, CompressionCreateError, CompressionOptions, OptionNames};

pub(crate) const OPTION_NAMES: &[OptionNames] = &[OptionNames {
    option: "level",
    n5: "preset",
    zarr: "preset",
}];

compression_level!(
    /// An xz preset, an integer from 0 to 9.
    XzPreset,
    u32,
    0,
    9
);

impl Default for XzPreset {
    fn default() -> Self {
        Self(6)
    }
}

/// The configuration of the `xz` compressor.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct XzCodecConfiguration {
    /// The preset.
    #[serde(default)]
    pub level: XzPreset,
}

/// An `xz` codec implementation.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct XzCodec {
    configuration: XzCodecConfiguration,
}

impl XzCodec {
    /// Create a new `xz` codec.
    #[must_use]
    pub const fn new(level: XzPreset) -> Self {
        Self {
            configuration: XzCodecConfiguration { level },
        }
    }

    /// Create a new `xz` codec from options.
    ///
    /// # Errors
    /// Returns [`CompressionCreateError`] if an option is unknown or invalid.
    pub fn new_with_options(options: &CompressionOptions) -> Result<Self, CompressionCreateError> {
        Ok(Self {
            configuration: parse_options("xz", options, OPTION_NAMES)?,
        })
    }

    /// Return the configuration of the codec.
    #[must_use]
    pub const fn configuration(&self) -> &XzCodecConfiguration {
        &self.configuration
    }

    pub(super) fn encode(&self, decoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = XzEncoder::new(Cursor::new(decoded), self.configuration.level.get());
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    pub(super) fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoder = XzDecoder::new(Cursor::new(encoded));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
