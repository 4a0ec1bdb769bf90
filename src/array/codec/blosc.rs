//! The `blosc` compressor.
//!
//! Wraps the `c-blosc` library.
//! The shuffle filter operates on elements of the dataset data type, so the encoder is given the element size.

use std::ffi::{c_char, c_int, c_void};

use blosc_sys::{
    blosc_cbuffer_validate, blosc_compress_ctx, blosc_decompress_ctx, BLOSC_BLOSCLZ_COMPNAME,
    BLOSC_LZ4HC_COMPNAME, BLOSC_LZ4_COMPNAME, BLOSC_MAX_OVERHEAD, BLOSC_SNAPPY_COMPNAME,
    BLOSC_ZLIB_COMPNAME, BLOSC_ZSTD_COMPNAME,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::{compression_level, parse_options, CodecError, CompressionCreateError, CompressionOptions, OptionNames};

pub(crate) const OPTION_NAMES: &[OptionNames] = &[
    OptionNames {
        option: "codec",
        n5: "cname",
        zarr: "cname",
    },
    OptionNames {
        option: "level",
        n5: "clevel",
        zarr: "clevel",
    },
    OptionNames {
        option: "shuffle",
        n5: "shuffle",
        zarr: "shuffle",
    },
    OptionNames {
        option: "blocksize",
        n5: "blocksize",
        zarr: "blocksize",
    },
];

compression_level!(
    /// A blosc compression level, an integer from 0 to 9.
    BloscCompressionLevel,
    u8,
    0,
    9
);

impl Default for BloscCompressionLevel {
    fn default() -> Self {
        Self(5)
    }
}

/// The blosc shuffle mode.
#[derive(Serialize_repr, Deserialize_repr, Copy, Clone, Eq, PartialEq, Debug, Default, Display)]
#[repr(u8)]
pub enum BloscShuffleMode {
    /// No shuffling.
    #[display("noshuffle")]
    NoShuffle = 0,
    /// Byte-wise shuffling.
    #[default]
    #[display("shuffle")]
    Shuffle = 1,
    /// Bit-wise shuffling.
    #[display("bitshuffle")]
    BitShuffle = 2,
}

/// The blosc internal compressor.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Default, Display)]
#[serde(rename_all = "lowercase")]
pub enum BloscCompressor {
    /// [BloscLZ](https://github.com/Blosc/c-blosc/blob/master/blosc/blosclz.h): blosc default compressor, heavily based on [FastLZ](http://fastlz.org/).
    #[display("blosclz")]
    BloscLZ,
    /// [LZ4](http://fastcompression.blogspot.com/p/lz4.html): a compact, very popular and fast compressor.
    #[default]
    #[display("lz4")]
    LZ4,
    /// [LZ4HC](http://fastcompression.blogspot.com/p/lz4.html): a tweaked version of LZ4, produces better compression ratios at the expense of speed.
    #[display("lz4hc")]
    LZ4HC,
    /// [Snappy](https://code.google.com/p/snappy): a popular compressor used in many places.
    #[display("snappy")]
    Snappy,
    /// [Zlib](http://www.zlib.net/): a classic; somewhat slower than the previous ones, but achieving better compression ratios.
    #[display("zlib")]
    Zlib,
    /// [Zstd](http://www.zstd.net/): an extremely well balanced codec.
    #[display("zstd")]
    Zstd,
}

impl BloscCompressor {
    const fn as_cstr(self) -> *const u8 {
        match self {
            Self::BloscLZ => BLOSC_BLOSCLZ_COMPNAME.as_ptr(),
            Self::LZ4 => BLOSC_LZ4_COMPNAME.as_ptr(),
            Self::LZ4HC => BLOSC_LZ4HC_COMPNAME.as_ptr(),
            Self::Snappy => BLOSC_SNAPPY_COMPNAME.as_ptr(),
            Self::Zlib => BLOSC_ZLIB_COMPNAME.as_ptr(),
            Self::Zstd => BLOSC_ZSTD_COMPNAME.as_ptr(),
        }
    }
}

/// The configuration of the `blosc` compressor.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct BloscCodecConfiguration {
    /// The internal compressor.
    #[serde(default)]
    pub codec: BloscCompressor,
    /// The compression level.
    #[serde(default)]
    pub level: BloscCompressionLevel,
    /// The shuffle mode.
    #[serde(default)]
    pub shuffle: BloscShuffleMode,
    /// The compression block size in bytes. Automatically determined if zero.
    #[serde(default)]
    pub blocksize: usize,
}

/// A `blosc` codec implementation.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BloscCodec {
    configuration: BloscCodecConfiguration,
}

impl BloscCodec {
    /// Create a new `blosc` codec.
    #[must_use]
    pub const fn new(
        codec: BloscCompressor,
        level: BloscCompressionLevel,
        shuffle: BloscShuffleMode,
        blocksize: usize,
    ) -> Self {
        Self {
            configuration: BloscCodecConfiguration {
                codec,
                level,
                shuffle,
                blocksize,
            },
        }
    }

    /// Create a new `blosc` codec from options.
    ///
    /// # Errors
    /// Returns [`CompressionCreateError`] if an option is unknown or invalid.
    pub fn new_with_options(options: &CompressionOptions) -> Result<Self, CompressionCreateError> {
        Ok(Self {
            configuration: parse_options("blosc", options, OPTION_NAMES)?,
        })
    }

    /// Return the configuration of the codec.
    #[must_use]
    pub const fn configuration(&self) -> &BloscCodecConfiguration {
        &self.configuration
    }

    pub(super) fn encode(&self, decoded: &[u8], typesize: usize) -> Result<Vec<u8>, CodecError> {
        let destsize = decoded.len() + BLOSC_MAX_OVERHEAD as usize;
        let mut dest = vec![0u8; destsize];
        let configuration = &self.configuration;
        let compressed_size = unsafe {
            blosc_compress_ctx(
                c_int::from(configuration.level.get()),
                configuration.shuffle as c_int,
                std::cmp::max(1, typesize),
                decoded.len(),
                decoded.as_ptr().cast::<c_void>(),
                dest.as_mut_ptr().cast::<c_void>(),
                destsize,
                configuration.codec.as_cstr().cast::<c_char>(),
                configuration.blocksize,
                1,
            )
        };
        match usize::try_from(compressed_size) {
            Ok(compressed_size) if compressed_size > 0 => {
                dest.truncate(compressed_size);
                Ok(dest)
            }
            _ => Err(CodecError::from(format!(
                "blosc_compress_ctx failed with code {compressed_size}"
            ))),
        }
    }

    pub(super) fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut destsize: usize = 0;
        let valid = unsafe {
            blosc_cbuffer_validate(
                encoded.as_ptr().cast::<c_void>(),
                encoded.len(),
                std::ptr::addr_of_mut!(destsize),
            )
        } == 0;
        if !valid {
            return Err(CodecError::from("blosc encoded value is invalid"));
        }
        let mut dest = vec![0u8; destsize];
        let decompressed_size = unsafe {
            blosc_decompress_ctx(
                encoded.as_ptr().cast::<c_void>(),
                dest.as_mut_ptr().cast::<c_void>(),
                destsize,
                1,
            )
        };
        match usize::try_from(decompressed_size) {
            Ok(decompressed_size) if decompressed_size == destsize => Ok(dest),
            _ => Err(CodecError::from(format!(
                "blosc_decompress_ctx failed with code {decompressed_size}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blosc_configuration() {
        let configuration: BloscCodecConfiguration =
            serde_json::from_str(r#"{"codec": "zstd", "level": 9, "shuffle": 2}"#).unwrap();
        assert_eq!(configuration.codec, BloscCompressor::Zstd);
        assert_eq!(configuration.shuffle, BloscShuffleMode::BitShuffle);
        assert_eq!(configuration.blocksize, 0);
        assert!(serde_json::from_str::<BloscCodecConfiguration>(r#"{"level": 10}"#).is_err());
        assert!(serde_json::from_str::<BloscCodecConfiguration>(r#"{"codec": ""}"#).is_err());
        assert!(serde_json::from_str::<BloscCodecConfiguration>(r#"{"shuffle": "shuffle"}"#).is_err());
    }

    #[test]
    fn blosc_round_trip() {
        let elements: Vec<u16> = (0..32).collect();
        let bytes = bytemuck::cast_slice::<u16, u8>(&elements).to_vec();
        for shuffle in [
            BloscShuffleMode::NoShuffle,
            BloscShuffleMode::Shuffle,
            BloscShuffleMode::BitShuffle,
        ] {
            let codec = BloscCodec::new(
                BloscCompressor::BloscLZ,
                BloscCompressionLevel::default(),
                shuffle,
                0,
            );
            let encoded = codec.encode(&bytes, 2).unwrap();
            assert_eq!(codec.decode(&encoded).unwrap(), bytes);
        }
    }
}
