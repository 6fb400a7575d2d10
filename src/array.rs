//! Zarr V2 arrays.
//!
//! This module defines the [`DataType`] of array elements, the Zarr V2 [chunk key encoding](chunk_key_encoding), and the [codecs](codec) applied to chunks.
//!
//! A Zarr V2 array is divided into a regular grid of chunks of equal shape.
//! The final chunk along a dimension may extend beyond the array shape; such chunks are stored at their full size.

pub mod chunk_key_encoding;
pub mod codec;
mod data_type;
mod endianness;

pub use data_type::{DataType, DataTypeError, DataTypeKind, Element};
pub use endianness::{Endianness, NATIVE_ENDIAN};

/// An array shape. Dimensions may be zero.
pub type ArrayShape = Vec<u64>;

/// A chunk shape. Dimensions must be non-zero.
pub type ChunkShape = Vec<u64>;

/// An ND index to an element in an array or a chunk in a chunk grid.
pub type ArrayIndices = Vec<u64>;

/// Return the number of chunks along each dimension of an array with `array_shape` divided into chunks of `chunk_shape`.
///
/// Partial chunks at the end of a dimension are counted.
///
/// # Panics
/// Panics if `chunk_shape` has a zero length dimension.
#[must_use]
pub fn chunk_grid_shape(array_shape: &[u64], chunk_shape: &[u64]) -> ArrayShape {
    std::iter::zip(array_shape, chunk_shape)
        .map(|(&shape, &chunk)| shape.div_ceil(chunk))
        .collect()
}

/// Unravel a linearised index to ND indices in an array of `shape` (C order).
#[must_use]
pub fn unravel_index(mut index: u64, shape: &[u64]) -> ArrayIndices {
    let mut indices = vec![0; shape.len()];
    for (indices_i, &dim) in std::iter::zip(indices.iter_mut().rev(), shape.iter().rev()) {
        *indices_i = index % dim;
        index /= dim;
    }
    indices
}

/// Return the indices of every chunk of a chunk grid of `chunk_grid_shape`, in C order.
///
/// A zero-dimensional grid has a single chunk with empty indices.
pub fn chunk_grid_indices(chunk_grid_shape: &[u64]) -> impl Iterator<Item = ArrayIndices> + '_ {
    let num_chunks: u64 = chunk_grid_shape.iter().product();
    (0..num_chunks).map(move |index| unravel_index(index, chunk_grid_shape))
}
