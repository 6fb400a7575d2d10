use crate::metadata::v2::{ArrayMetadataV2, ArrayMetadataV2Error};

use super::{subchunk::is_contiguous_split, subchunk, BoundChunksError, ReferenceStore};

/// Returns the prime factors of `n` in ascending order, with multiplicity.
///
/// `0` and `1` have no prime factors.
#[must_use]
pub fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    if n < 2 {
        return factors;
    }
    while n % 2 == 0 {
        factors.push(2);
        n /= 2;
    }
    let mut factor = 3;
    while factor <= n / factor {
        while n % factor == 0 {
            factors.push(factor);
            n /= factor;
        }
        factor += 2;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Plan the splits of a chunk of `chunk_size` bytes with chunk shape `chunks` so that it fits in `limit` bytes.
///
/// Dimensions are visited in order. The prime factors of each chunk length are accumulated into a divisor until the chunk fits or the factors are exhausted.
/// Returns `(dimension, divisor)` pairs.
fn plan_splits(chunks: &[u64], mut chunk_size: u64, limit: u64) -> Vec<(usize, u64)> {
    let mut splits = Vec::new();
    for (dimension, &length) in chunks.iter().enumerate() {
        if chunk_size <= limit {
            break;
        }
        let mut divisor = 1;
        for factor in prime_factors(length) {
            divisor *= factor;
            if chunk_size / divisor <= limit {
                break;
            }
        }
        if divisor > 1 {
            splits.push((dimension, divisor));
            chunk_size /= divisor;
        }
    }
    splits
}

fn metadata_error(variable: &str, err: ArrayMetadataV2Error) -> BoundChunksError {
    BoundChunksError::MetadataError(format!("variable {variable:?}: {err}"))
}

/// Bound the decoded chunk size of every uncompressed variable in `refs` to at most `limit` bytes.
///
/// For each variable with a decoded chunk size (item size times the number of elements in a chunk) above `limit`,
/// dimensions are visited in declared order and split with [`subchunk`](super::subchunk) by a product of the prime factors of their chunk length.
/// Splitting stops as soon as the chunk fits within `limit`.
/// If every dimension is exhausted first, the variable is left with the smallest achievable chunks.
///
/// Variables that are compressed or filtered are returned unchanged, since their chunks cannot be split without decoding.
/// So are variables in `F` order whose sub-chunks would not be contiguous.
///
/// `refs` is not modified, a new reference store is returned.
///
/// # Errors
/// Returns [`BoundChunksError::InvalidArgument`] if `limit` is zero, or [`BoundChunksError::MetadataError`] if any array metadata or chunk reference is invalid.
pub fn bound_chunks(refs: &ReferenceStore, limit: u64) -> Result<ReferenceStore, BoundChunksError> {
    if limit == 0 {
        return Err(BoundChunksError::InvalidArgument(
            "the chunk size limit must be positive".to_string(),
        ));
    }

    let mut output = refs.clone();
    for variable in refs.variables() {
        let metadata = refs.array_metadata(&variable)?;
        if metadata.is_compressed() || metadata.has_filters() {
            log::debug!("not bounding chunks of variable {variable:?}, its chunks are encoded");
            continue;
        }
        let chunk_size = metadata
            .chunk_size_bytes()
            .map_err(|err| metadata_error(&variable, err))?;
        let splits = plan_splits(&metadata.chunks, chunk_size, limit);
        if splits.is_empty() {
            continue;
        }
        if !splits_are_contiguous(&metadata, &splits) {
            log::debug!(
                "not bounding chunks of variable {variable:?}, splitting chunk shape {:?} in {:?} order would produce non-contiguous sub-chunks",
                metadata.chunks,
                metadata.order
            );
            continue;
        }
        for (dimension, divisor) in splits {
            log::debug!("splitting dimension {dimension} of variable {variable:?} by {divisor}");
            output = subchunk(&output, &variable, dimension, divisor)?;
        }
        let chunk_size = output
            .array_metadata(&variable)?
            .chunk_size_bytes()
            .map_err(|err| metadata_error(&variable, err))?;
        if chunk_size > limit {
            log::debug!(
                "variable {variable:?} has a chunk size of {chunk_size} bytes after splitting, which exceeds the limit of {limit} bytes"
            );
        }
    }
    Ok(output)
}

fn splits_are_contiguous(metadata: &ArrayMetadataV2, splits: &[(usize, u64)]) -> bool {
    let mut chunks = metadata.chunks.clone();
    splits.iter().all(|&(dimension, divisor)| {
        let contiguous = is_contiguous_split(&chunks, metadata.order, dimension);
        chunks[dimension] /= divisor;
        contiguous
    })
}
