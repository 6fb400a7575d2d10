//! Kerchunk reference chunk bounding and Zarr V2 zip archiving.
//!
//! This crate has two entry points that share the Zarr V2 storage model:
//!  - [`kerchunk::bound_chunks`] rewrites a [kerchunk](https://fsspec.github.io/kerchunk/) reference store so that the decoded chunk size of every uncompressed array is at most a byte budget.
//!    Chunks are split along their dimensions by prime factors of the chunk shape, and chunk pointers are re-partitioned into contiguous byte ranges.
//!  - [`archive::archive`] encodes an in-memory [`Dataset`](archive::Dataset) with per-variable codec chains into a staging [`MemoryStore`](storage::store::MemoryStore), then copies the encoded values into a create-only `.zarr.zip` archive.
//!
//! ## Example
//! ```rust
//! # use zarrs_kerchunk::kerchunk::{bound_chunks, ReferenceStore};
//! let refs = ReferenceStore::from_json(r#"{
//!     "version": 1,
//!     "refs": {
//!         "x/.zarray": "{\"chunks\":[8],\"compressor\":null,\"dtype\":\"<f8\",\"fill_value\":null,\"filters\":null,\"order\":\"C\",\"shape\":[8],\"zarr_format\":2}",
//!         "x/0": ["data.bin", 0, 64]
//!     }
//! }"#)?;
//! let bounded = bound_chunks(&refs, 16)?;
//! assert_eq!(bounded.chunk_keys("x")?.len(), 4);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate Features
//! #### Default
//!  - Codecs: `crc32c`, `gzip`, `zlib`, `zstd`.
//!
//! ## Licence
//! `zarrs_kerchunk` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod archive;
pub mod array;
pub mod array_subset;
pub mod byte_range;
pub mod config;
pub mod kerchunk;
pub mod metadata;
pub mod plugin;
pub mod storage;
