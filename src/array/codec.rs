//! The codec layer.
//!
//! A [`Compression`] transforms the bytes of a chunk on write and restores them on read.
//! The supported compressors are
//!  - `raw`: no compression,
//!  - `gzip`: deflate with gzip or zlib framing (feature `gzip`),
//!  - `bzip2` (feature `bz2`),
//!  - `xz` (feature `xz`),
//!  - `zstd` (feature `zstd`), and
//!  - `blosc` (feature `blosc`).
//!
//! A compression is created from a name and a map of options with [`Compression::new`].
//! Options are validated when the compression is created: an unknown option name or a malformed value is an error.
//! The option names are those of the `z5` family of libraries:
//!
//! | name | options |
//! | --- | --- |
//! | `raw` | none |
//! | `gzip` | `level` (0-9, default 5), `useZlib` (default `false`) |
//! | `bzip2` | `level` (1-9, default 9) |
//! | `xz` | `level` (0-9, default 6) |
//! | `zstd` | `level` (-7-22, default 3) |
//! | `blosc` | `codec` (default `lz4`), `level` (0-9, default 5), `shuffle` (0-2, default 1), `blocksize` (default 0, automatic) |
//!
//! A compression is recorded in the N5 `compression` object and in the Zarr `compressor` object, whose names differ from the options above.

#[cfg(feature = "blosc")]
mod blosc;
#[cfg(feature = "bz2")]
mod bz2;
#[cfg(feature = "gzip")]
mod gzip;
#[cfg(feature = "xz")]
mod xz;
#[cfg(feature = "zstd")]
mod zstd;

#[cfg(feature = "blosc")]
pub use blosc::{
    BloscCodec, BloscCodecConfiguration, BloscCompressionLevel, BloscCompressor,
    BloscShuffleMode,
};
#[cfg(feature = "bz2")]
pub use bz2::{Bz2Codec, Bz2CodecConfiguration, Bz2CompressionLevel};
#[cfg(feature = "gzip")]
pub use gzip::{GzipCodec, GzipCodecConfiguration, GzipCompressionLevel};
#[cfg(feature = "xz")]
pub use xz::{XzCodec, XzCodecConfiguration, XzPreset};
#[cfg(feature = "zstd")]
pub use zstd::{ZstdCodec, ZstdCodecConfiguration, ZstdCompressionLevel};

use serde_json::Value;
use thiserror::Error;

/// Compression options: a JSON object of option names to values.
pub type CompressionOptions = serde_json::Map<String, Value>;

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The decoded size of a chunk did not match the expected size.
    #[error("the size of a decoded chunk is {_0}, expected {_1}")]
    UnexpectedDecodedSize(usize, usize),
    /// An invalid chunk header.
    #[error("invalid chunk header: {0}")]
    InvalidChunkHeader(String),
    /// Other
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for CodecError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// A compression creation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompressionCreateError {
    /// The compression is unknown or not enabled.
    #[error("unsupported compression {0}")]
    Unsupported(String),
    /// An option is not recognised by the compression.
    #[error("unknown option {option} for compression {compression}")]
    UnknownOption {
        /// The compression name.
        compression: String,
        /// The option name.
        option: String,
    },
    /// An option value is malformed.
    #[error("invalid options for compression {compression}: {error}")]
    InvalidOptions {
        /// The compression name.
        compression: String,
        /// A description of the error.
        error: String,
    },
}

/// The names of a compression option in the generic options, N5 metadata, and Zarr metadata.
pub(crate) struct OptionNames {
    pub(crate) option: &'static str,
    pub(crate) n5: &'static str,
    pub(crate) zarr: &'static str,
}

/// Parse validated options into a codec configuration.
pub(crate) fn parse_options<T: serde::de::DeserializeOwned>(
    compression: &str,
    options: &CompressionOptions,
    names: &[OptionNames],
) -> Result<T, CompressionCreateError> {
    if let Some(option) = options
        .keys()
        .find(|key| !names.iter().any(|names| names.option == key.as_str()))
    {
        return Err(CompressionCreateError::UnknownOption {
            compression: compression.to_string(),
            option: option.clone(),
        });
    }
    serde_json::from_value(Value::Object(options.clone())).map_err(|err| {
        CompressionCreateError::InvalidOptions {
            compression: compression.to_string(),
            error: err.to_string(),
        }
    })
}

/// Serialise a codec configuration into options.
pub(crate) fn to_options<T: serde::Serialize>(configuration: &T) -> CompressionOptions {
    match serde_json::to_value(configuration) {
        Ok(Value::Object(options)) => options,
        _ => CompressionOptions::new(),
    }
}

/// The metadata dialect of a compression.
#[derive(Copy, Clone, Debug)]
enum Dialect {
    N5,
    Zarr,
}

fn rename_from_metadata(
    metadata: &CompressionOptions,
    names: &[OptionNames],
    dialect: Dialect,
) -> CompressionOptions {
    names
        .iter()
        .filter_map(|names| {
            let key = match dialect {
                Dialect::N5 => names.n5,
                Dialect::Zarr => names.zarr,
            };
            metadata
                .get(key)
                .filter(|value| !value.is_null())
                .map(|value| (names.option.to_string(), value.clone()))
        })
        .collect()
}

fn rename_to_metadata(
    options: &CompressionOptions,
    names: &[OptionNames],
    dialect: Dialect,
) -> CompressionOptions {
    names
        .iter()
        .filter_map(|names| {
            let key = match dialect {
                Dialect::N5 => names.n5,
                Dialect::Zarr => names.zarr,
            };
            if key.is_empty() {
                return None;
            }
            options
                .get(names.option)
                .map(|value| (key.to_string(), value.clone()))
        })
        .collect()
}

/// A compressor.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Compression {
    /// No compression.
    Raw,
    /// gzip/zlib compression.
    #[cfg(feature = "gzip")]
    Gzip(GzipCodec),
    /// bzip2 compression.
    #[cfg(feature = "bz2")]
    Bz2(Bz2Codec),
    /// xz compression.
    #[cfg(feature = "xz")]
    Xz(XzCodec),
    /// zstd compression.
    #[cfg(feature = "zstd")]
    Zstd(ZstdCodec),
    /// blosc compression.
    #[cfg(feature = "blosc")]
    Blosc(BloscCodec),
}

impl Compression {
    /// Create a compression from a `name` and `options`.
    ///
    /// The names `zlib` (gzip with zlib framing), `bz2`, and `lzma` are accepted as aliases.
    ///
    /// # Errors
    /// Returns [`CompressionCreateError`] if the compression is not supported or not enabled, an option is unknown, or an option value is invalid.
    pub fn new(name: &str, options: &CompressionOptions) -> Result<Self, CompressionCreateError> {
        match name {
            "raw" => {
                if let Some(option) = options.keys().next() {
                    Err(CompressionCreateError::UnknownOption {
                        compression: name.to_string(),
                        option: option.clone(),
                    })
                } else {
                    Ok(Self::Raw)
                }
            }
            #[cfg(feature = "gzip")]
            "gzip" => Ok(Self::Gzip(GzipCodec::new_with_options(options)?)),
            #[cfg(feature = "gzip")]
            "zlib" => {
                let mut options = options.clone();
                options.insert("useZlib".to_string(), Value::Bool(true));
                Ok(Self::Gzip(GzipCodec::new_with_options(&options)?))
            }
            #[cfg(feature = "bz2")]
            "bzip2" | "bz2" => Ok(Self::Bz2(Bz2Codec::new_with_options(options)?)),
            #[cfg(feature = "xz")]
            "xz" | "lzma" => Ok(Self::Xz(XzCodec::new_with_options(options)?)),
            #[cfg(feature = "zstd")]
            "zstd" => Ok(Self::Zstd(ZstdCodec::new_with_options(options)?)),
            #[cfg(feature = "blosc")]
            "blosc" => Ok(Self::Blosc(BloscCodec::new_with_options(options)?)),
            _ => Err(CompressionCreateError::Unsupported(name.to_string())),
        }
    }

    /// The default compression of N5 datasets: gzip (level 5) if enabled, otherwise raw.
    #[must_use]
    pub fn default_n5() -> Self {
        #[cfg(feature = "gzip")]
        {
            Self::Gzip(GzipCodec::default())
        }
        #[cfg(not(feature = "gzip"))]
        {
            Self::Raw
        }
    }

    /// The default compression of Zarr datasets: blosc (lz4, level 5, byte shuffle) if enabled, otherwise raw.
    #[must_use]
    pub fn default_zarr() -> Self {
        #[cfg(feature = "blosc")]
        {
            Self::Blosc(BloscCodec::default())
        }
        #[cfg(not(feature = "blosc"))]
        {
            Self::Raw
        }
    }

    /// The name of the compression.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            #[cfg(feature = "gzip")]
            Self::Gzip(_) => "gzip",
            #[cfg(feature = "bz2")]
            Self::Bz2(_) => "bzip2",
            #[cfg(feature = "xz")]
            Self::Xz(_) => "xz",
            #[cfg(feature = "zstd")]
            Self::Zstd(_) => "zstd",
            #[cfg(feature = "blosc")]
            Self::Blosc(_) => "blosc",
        }
    }

    /// The options of the compression, including defaulted options.
    #[must_use]
    pub fn options(&self) -> CompressionOptions {
        match self {
            Self::Raw => CompressionOptions::new(),
            #[cfg(feature = "gzip")]
            Self::Gzip(codec) => to_options(codec.configuration()),
            #[cfg(feature = "bz2")]
            Self::Bz2(codec) => to_options(codec.configuration()),
            #[cfg(feature = "xz")]
            Self::Xz(codec) => to_options(codec.configuration()),
            #[cfg(feature = "zstd")]
            Self::Zstd(codec) => to_options(codec.configuration()),
            #[cfg(feature = "blosc")]
            Self::Blosc(codec) => to_options(codec.configuration()),
        }
    }

    fn option_names(&self) -> &'static [OptionNames] {
        match self {
            Self::Raw => &[],
            #[cfg(feature = "gzip")]
            Self::Gzip(_) => gzip::OPTION_NAMES,
            #[cfg(feature = "bz2")]
            Self::Bz2(_) => bz2::OPTION_NAMES,
            #[cfg(feature = "xz")]
            Self::Xz(_) => xz::OPTION_NAMES,
            #[cfg(feature = "zstd")]
            Self::Zstd(_) => zstd::OPTION_NAMES,
            #[cfg(feature = "blosc")]
            Self::Blosc(_) => blosc::OPTION_NAMES,
        }
    }

    fn option_names_for(name: &str) -> &'static [OptionNames] {
        match name {
            #[cfg(feature = "gzip")]
            "gzip" | "zlib" => gzip::OPTION_NAMES,
            #[cfg(feature = "bz2")]
            "bzip2" | "bz2" => bz2::OPTION_NAMES,
            #[cfg(feature = "xz")]
            "xz" | "lzma" => xz::OPTION_NAMES,
            #[cfg(feature = "zstd")]
            "zstd" => zstd::OPTION_NAMES,
            #[cfg(feature = "blosc")]
            "blosc" => blosc::OPTION_NAMES,
            _ => &[],
        }
    }

    /// Create a compression from an N5 `compression` object, e.g. `{"type": "gzip", "level": 5}`.
    ///
    /// Metadata entries without a counterpart option are ignored.
    ///
    /// # Errors
    /// Returns [`CompressionCreateError`] if the type is missing or unsupported, or an option value is invalid.
    pub fn from_n5_metadata(metadata: &CompressionOptions) -> Result<Self, CompressionCreateError> {
        let name = metadata
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CompressionCreateError::Unsupported(Value::from(metadata.clone()).to_string()))?;
        let mut options =
            rename_from_metadata(metadata, Self::option_names_for(name), Dialect::N5);
        if name == "gzip" && options.get("level").and_then(Value::as_i64) == Some(-1) {
            // the zlib default compression level
            options.insert("level".to_string(), Value::from(6));
        }
        Self::new(name, &options)
    }

    /// Create the N5 `compression` object of the compression.
    #[must_use]
    pub fn to_n5_metadata(&self) -> CompressionOptions {
        let mut metadata = CompressionOptions::new();
        metadata.insert("type".to_string(), Value::from(self.name()));
        metadata.extend(rename_to_metadata(
            &self.options(),
            self.option_names(),
            Dialect::N5,
        ));
        metadata
    }

    /// Create a compression from a Zarr `compressor` object, e.g. `{"id": "blosc", "cname": "lz4", ...}`.
    ///
    /// A `null` compressor is [`Compression::Raw`].
    /// Metadata entries without a counterpart option are ignored.
    ///
    /// # Errors
    /// Returns [`CompressionCreateError`] if the id is missing or unsupported, or an option value is invalid.
    pub fn from_zarr_metadata(
        metadata: Option<&CompressionOptions>,
    ) -> Result<Self, CompressionCreateError> {
        let Some(metadata) = metadata else {
            return Ok(Self::Raw);
        };
        let name = metadata
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| CompressionCreateError::Unsupported(Value::from(metadata.clone()).to_string()))?;
        if name == "lzma" {
            let format = metadata.get("format").and_then(Value::as_i64).unwrap_or(1);
            if format != 1 {
                return Err(CompressionCreateError::Unsupported(format!(
                    "lzma with format {format}"
                )));
            }
        }
        let options = rename_from_metadata(metadata, Self::option_names_for(name), Dialect::Zarr);
        Self::new(name, &options)
    }

    /// Create the Zarr `compressor` object of the compression, or [`None`] for [`Compression::Raw`].
    #[must_use]
    pub fn to_zarr_metadata(&self) -> Option<CompressionOptions> {
        let id = match self {
            Self::Raw => return None,
            #[cfg(feature = "gzip")]
            Self::Gzip(codec) => {
                if codec.configuration().use_zlib {
                    "zlib"
                } else {
                    "gzip"
                }
            }
            #[cfg(feature = "bz2")]
            Self::Bz2(_) => "bz2",
            #[cfg(feature = "xz")]
            Self::Xz(_) => "lzma",
            #[cfg(feature = "zstd")]
            Self::Zstd(_) => "zstd",
            #[cfg(feature = "blosc")]
            Self::Blosc(_) => "blosc",
        };
        let mut metadata = CompressionOptions::new();
        metadata.insert("id".to_string(), Value::from(id));
        metadata.extend(rename_to_metadata(
            &self.options(),
            self.option_names(),
            Dialect::Zarr,
        ));
        if id == "lzma" {
            metadata.insert("format".to_string(), Value::from(1));
            metadata.insert("check".to_string(), Value::from(-1));
            metadata.insert("filters".to_string(), Value::Null);
        }
        Some(metadata)
    }

    /// Compress `decoded` bytes, whose elements are `element_size` bytes.
    ///
    /// # Errors
    /// Returns [`CodecError`] if compression fails.
    #[cfg_attr(not(feature = "blosc"), allow(unused_variables))]
    pub fn encode(&self, decoded: &[u8], element_size: usize) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Raw => Ok(decoded.to_vec()),
            #[cfg(feature = "gzip")]
            Self::Gzip(codec) => codec.encode(decoded),
            #[cfg(feature = "bz2")]
            Self::Bz2(codec) => codec.encode(decoded),
            #[cfg(feature = "xz")]
            Self::Xz(codec) => codec.encode(decoded),
            #[cfg(feature = "zstd")]
            Self::Zstd(codec) => codec.encode(decoded),
            #[cfg(feature = "blosc")]
            Self::Blosc(codec) => codec.encode(decoded, element_size),
        }
    }

    /// Decompress `encoded` bytes into exactly `decoded_size` bytes.
    ///
    /// # Errors
    /// Returns [`CodecError`] if decompression fails or the decompressed size is not `decoded_size`.
    pub fn decode(&self, encoded: &[u8], decoded_size: usize) -> Result<Vec<u8>, CodecError> {
        let decoded = match self {
            Self::Raw => encoded.to_vec(),
            #[cfg(feature = "gzip")]
            Self::Gzip(codec) => codec.decode(encoded)?,
            #[cfg(feature = "bz2")]
            Self::Bz2(codec) => codec.decode(encoded)?,
            #[cfg(feature = "xz")]
            Self::Xz(codec) => codec.decode(encoded)?,
            #[cfg(feature = "zstd")]
            Self::Zstd(codec) => codec.decode(encoded)?,
            #[cfg(feature = "blosc")]
            Self::Blosc(codec) => codec.decode(encoded)?,
        };
        if decoded.len() == decoded_size {
            Ok(decoded)
        } else {
            Err(CodecError::UnexpectedDecodedSize(decoded.len(), decoded_size))
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Declare a compression level newtype that only deserialises from an integer in an inclusive range.
macro_rules! compression_level {
    ($(#[$attr:meta])* $name:ident, $int:ty, $min:expr, $max:expr) => {
        $(#[$attr])*
        #[derive(Copy, Clone, Eq, PartialEq, Debug, derive_more::Display, serde::Serialize)]
        pub struct $name($int);

        impl $name {
            /// Create a new compression level.
            ///
            /// # Errors
            /// Returns the level if it is out of range.
            pub fn new(level: $int) -> Result<Self, $int> {
                if ($min..=$max).contains(&level) {
                    Ok(Self(level))
                } else {
                    Err(level)
                }
            }

            /// The underlying integer compression level.
            #[must_use]
            pub const fn get(&self) -> $int {
                self.0
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let value = serde_json::Value::deserialize(d)?;
                if let serde_json::Value::Number(level) = value {
                    if let Some(level) = level.as_i64().and_then(|level| <$int>::try_from(level).ok()) {
                        if let Ok(level) = Self::new(level) {
                            return Ok(level);
                        }
                    }
                }
                Err(serde::de::Error::custom(concat!(
                    "level must be an integer between ",
                    stringify!($min),
                    " and ",
                    stringify!($max),
                    "."
                )))
            }
        }
    };
}
pub(crate) use compression_level;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> CompressionOptions {
        match value {
            Value::Object(options) => options,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn compression_raw() {
        let raw = Compression::new("raw", &CompressionOptions::new()).unwrap();
        assert_eq!(raw, Compression::Raw);
        assert_eq!(raw.encode(&[1, 2, 3], 1).unwrap(), vec![1, 2, 3]);
        assert_eq!(raw.decode(&[1, 2, 3], 3).unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            raw.decode(&[1, 2, 3], 4),
            Err(CodecError::UnexpectedDecodedSize(3, 4))
        ));
        assert_eq!(
            Compression::new("raw", &options(json!({"level": 5}))),
            Err(CompressionCreateError::UnknownOption {
                compression: "raw".to_string(),
                option: "level".to_string()
            })
        );
        assert_eq!(raw.to_n5_metadata(), options(json!({"type": "raw"})));
        assert_eq!(raw.to_zarr_metadata(), None);
        assert_eq!(Compression::from_zarr_metadata(None).unwrap(), Compression::Raw);
        assert_eq!(
            Compression::from_n5_metadata(&options(json!({"type": "raw"}))).unwrap(),
            Compression::Raw
        );
    }

    #[test]
    fn compression_unsupported() {
        assert!(matches!(
            Compression::new("lz5", &CompressionOptions::new()),
            Err(CompressionCreateError::Unsupported(_))
        ));
        assert!(matches!(
            Compression::from_n5_metadata(&options(json!({"level": 5}))),
            Err(CompressionCreateError::Unsupported(_))
        ));
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn compression_gzip() {
        let gzip = Compression::new("gzip", &CompressionOptions::new()).unwrap();
        assert_eq!(gzip.options(), options(json!({"level": 5, "useZlib": false})));
        assert_eq!(
            gzip.to_n5_metadata(),
            options(json!({"type": "gzip", "level": 5, "useZlib": false}))
        );
        assert_eq!(
            gzip.to_zarr_metadata(),
            Some(options(json!({"id": "gzip", "level": 5})))
        );
        assert!(matches!(
            Compression::new("gzip", &options(json!({"foo": 1}))),
            Err(CompressionCreateError::UnknownOption { .. })
        ));
        assert!(matches!(
            Compression::new("gzip", &options(json!({"level": 10}))),
            Err(CompressionCreateError::InvalidOptions { .. })
        ));

        let zlib = Compression::from_zarr_metadata(Some(&options(json!({"id": "zlib", "level": 1}))))
            .unwrap();
        assert_eq!(zlib.options(), options(json!({"level": 1, "useZlib": true})));
        assert_eq!(
            zlib.to_zarr_metadata(),
            Some(options(json!({"id": "zlib", "level": 1})))
        );

        let n5_default =
            Compression::from_n5_metadata(&options(json!({"type": "gzip", "level": -1}))).unwrap();
        assert_eq!(n5_default.options()["level"], json!(6));

        let data: Vec<u8> = (0..255).cycle().take(4096).collect();
        for codec in [gzip, zlib] {
            let encoded = codec.encode(&data, 1).unwrap();
            assert!(encoded.len() < data.len());
            assert_eq!(codec.decode(&encoded, data.len()).unwrap(), data);
        }
    }

    #[cfg(feature = "bz2")]
    #[test]
    fn compression_bz2() {
        let bz2 = Compression::new("bzip2", &options(json!({"level": 3}))).unwrap();
        assert_eq!(
            bz2.to_n5_metadata(),
            options(json!({"type": "bzip2", "blockSize": 3}))
        );
        assert_eq!(
            bz2.to_zarr_metadata(),
            Some(options(json!({"id": "bz2", "level": 3})))
        );
        assert_eq!(
            Compression::from_n5_metadata(&bz2.to_n5_metadata()).unwrap(),
            bz2
        );
        assert!(Compression::new("bzip2", &options(json!({"level": 0}))).is_err());
        let data: Vec<u8> = (0..100).cycle().take(1000).collect();
        let encoded = bz2.encode(&data, 1).unwrap();
        assert_eq!(bz2.decode(&encoded, data.len()).unwrap(), data);
    }

    #[cfg(feature = "xz")]
    #[test]
    fn compression_xz() {
        let xz = Compression::new("xz", &CompressionOptions::new()).unwrap();
        assert_eq!(xz.to_n5_metadata(), options(json!({"type": "xz", "preset": 6})));
        assert_eq!(
            xz.to_zarr_metadata(),
            Some(options(
                json!({"id": "lzma", "preset": 6, "format": 1, "check": -1, "filters": null})
            ))
        );
        assert_eq!(
            Compression::from_zarr_metadata(xz.to_zarr_metadata().as_ref()).unwrap(),
            xz
        );
        assert!(Compression::from_zarr_metadata(Some(&options(
            json!({"id": "lzma", "preset": 6, "format": 2})
        )))
        .is_err());
        let data: Vec<u8> = (0..100).cycle().take(1000).collect();
        let encoded = xz.encode(&data, 1).unwrap();
        assert_eq!(xz.decode(&encoded, data.len()).unwrap(), data);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn compression_zstd() {
        let zstd = Compression::new("zstd", &options(json!({"level": -3}))).unwrap();
        assert_eq!(zstd.to_n5_metadata(), options(json!({"type": "zstd", "level": -3})));
        assert!(Compression::new("zstd", &options(json!({"level": 23}))).is_err());
        let data: Vec<u8> = (0..100).cycle().take(1000).collect();
        let encoded = zstd.encode(&data, 1).unwrap();
        assert_eq!(zstd.decode(&encoded, data.len()).unwrap(), data);
    }

    #[cfg(feature = "blosc")]
    #[test]
    fn compression_blosc() {
        let blosc = Compression::default_zarr();
        assert_eq!(
            blosc.to_zarr_metadata(),
            Some(options(
                json!({"id": "blosc", "cname": "lz4", "clevel": 5, "shuffle": 1, "blocksize": 0})
            ))
        );
        assert_eq!(
            blosc.to_n5_metadata(),
            options(
                json!({"type": "blosc", "cname": "lz4", "clevel": 5, "shuffle": 1, "blocksize": 0})
            )
        );
        assert_eq!(
            Compression::from_zarr_metadata(blosc.to_zarr_metadata().as_ref()).unwrap(),
            blosc
        );
        let zstd = Compression::new("blosc", &options(json!({"codec": "zstd", "shuffle": 2})))
            .unwrap();
        assert!(Compression::new("blosc", &options(json!({"codec": "lz5"}))).is_err());
        assert!(Compression::new("blosc", &options(json!({"shuffle": 3}))).is_err());

        let elements: Vec<u32> = (0..1024).collect();
        let data = bytemuck::cast_slice::<u32, u8>(&elements).to_vec();
        for codec in [blosc, zstd] {
            let encoded = codec.encode(&data, 4).unwrap();
            assert!(encoded.len() < data.len());
            assert_eq!(codec.decode(&encoded, data.len()).unwrap(), data);
        }
        assert!(Compression::default_zarr().decode(&[1, 2, 3], 3).is_err());
    }
}
