//! Kerchunk reference stores and chunk layout bounding.
//!
//! A kerchunk [`ReferenceStore`] describes a Zarr V2 hierarchy whose chunks live in external byte sources (e.g. a `netCDF` file in a bucket).
//! Each chunk key maps to a pointer `[source, offset, length]`, an inline payload, or a metadata document.
//!
//! [`bound_chunks`] rewrites a reference store so that the decoded chunks of every uncompressed variable fit within a byte limit.
//! Chunks are split along their slowest varying dimensions with [`subchunk`], which partitions each pointer into contiguous sub-ranges.
//! No chunk data is read or decoded, only references are rewritten.
//!
//! ```
//! # use zarrs_kerchunk::kerchunk::{bound_chunks, ReferenceStore};
//! let refs = ReferenceStore::from_json(r#"{
//!     "version": 1,
//!     "refs": {
//!         "t/.zarray": "{\"shape\": [6, 4], \"chunks\": [6, 4], \"dtype\": \"<i4\", \"compressor\": null, \"zarr_format\": 2}",
//!         "t/0.0": ["s3://bucket/t.bin", 0, 96]
//!     }
//! }"#)?;
//! let bounded = bound_chunks(&refs, 32)?;
//! assert_eq!(bounded.array_metadata("t")?.chunks, vec![1, 4]);
//! assert_eq!(bounded.chunk_keys("t")?.len(), 6);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

mod bound_chunks;
mod reference_store;
mod subchunk;

pub use bound_chunks::{bound_chunks, prime_factors};
pub use reference_store::{ChunkPointer, ReferenceStore, ReferenceStoreError, ReferenceValue};
pub use subchunk::subchunk;

use thiserror::Error;

use crate::storage::StoreKeyError;

/// A chunk bounding error.
#[derive(Debug, Error)]
pub enum BoundChunksError {
    /// An argument is invalid, such as a zero chunk size limit.
    #[error("invalid argument: {_0}")]
    InvalidArgument(String),
    /// Array metadata or a chunk reference is missing, malformed, or inconsistent.
    #[error("metadata error: {_0}")]
    MetadataError(String),
    /// The chunks of a variable cannot be split.
    #[error("unsupported layout: {_0}")]
    UnsupportedLayout(String),
}

impl From<ReferenceStoreError> for BoundChunksError {
    fn from(err: ReferenceStoreError) -> Self {
        Self::MetadataError(err.to_string())
    }
}

impl From<StoreKeyError> for BoundChunksError {
    fn from(err: StoreKeyError) -> Self {
        Self::MetadataError(err.to_string())
    }
}
