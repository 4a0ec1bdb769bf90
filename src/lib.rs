//! A rust library for chunked, compressed N-dimensional arrays stored in the [N5](https://github.com/saalfeldlab/n5) and [Zarr V2](https://zarr-specs.readthedocs.io/en/latest/v2/v2.0.html) directory layouts.
//!
//! A hierarchy of groups and arrays (datasets) lives in a directory on the local filesystem.
//! Open it with [`File::open`](crate::group::File::open), then create or open groups and datasets relative to the root group.
//! Datasets are read and written with numpy-style selections built from [`IndexElement`](crate::selection::IndexElement)s, usually via the [`sel!`] macro.
//!
//! ## Storage Formats
//!  - **N5**: big-endian chunks with a binary header, `attributes.json` metadata, reversed dimension order on disk, and variable length chunks.
//!  - **Zarr V2**: little-endian headerless chunks padded to the chunk shape, `.zarray`/`.zgroup`/`.zattrs` metadata, `.` or `/` chunk key separators, and arbitrary fill values.
//!
//! The format of a new file is inferred from its extension (`.n5`, `.zarr`, `.zr`) unless given explicitly.
//! The format of an existing file is detected from its root metadata.
//!
//! ## Crate Features
//! #### Default
//!  - Compressions: `blosc`, `bz2`, `gzip` (includes `zlib`), `xz` (includes `lzma`), `zstd`.
//!
//! The `raw` compression is always available.
//!
//! ## Example
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use n5zarr::{array::{ArrayBuilder, DataType}, group::{File, FileMode}, sel};
//! # let path = tempfile::TempDir::new()?;
//! let file = File::open(path.path().join("data.n5"), FileMode::Create, None)?;
//! let dataset = file.create_dataset(
//!     "volumes/raw",
//!     &ArrayBuilder::new(vec![100, 100], DataType::UInt16, vec![32, 32]),
//! )?;
//! dataset.write_scalar(&sel![10..20, ..], 7u16)?;
//! let values = dataset.read_array::<u16>(&sel![15, 0..4])?;
//! assert_eq!(values.as_slice(), Some([7u16; 4].as_slice()));
//! assert_eq!(file.hierarchy_tree()?, "/\n  volumes\n    raw [100, 100] uint16\n");
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//! Chunk and metadata operations are logged with the [`log`](https://docs.rs/log) crate.
//! Hierarchy changes are logged at the `debug` level and individual store operations at the `trace` level.
//!
//! ## Licence
//! `n5zarr` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod array;
pub mod array_subset;
pub mod config;
pub mod group;
pub mod metadata;
pub mod node;
pub mod selection;
pub mod storage;
