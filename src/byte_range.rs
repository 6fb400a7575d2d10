//! Byte ranges.
//!
//! Kerchunk chunk pointers reference a byte range of an external source.
//! When a chunk is split into sub-chunks, [`partition_byte_range`] divides its byte range into contiguous ranges of equal length.

use std::ops::Range;

use thiserror::Error;

/// A byte offset.
pub type ByteOffset = u64;

/// A byte length.
pub type ByteLength = u64;

/// A byte range could not be partitioned.
#[derive(Copy, Clone, Debug, Error)]
pub enum ByteRangePartitionError {
    /// The length is not a multiple of the number of parts.
    #[error("byte length {length} cannot be partitioned into {parts} equal parts")]
    Indivisible {
        /// The byte length.
        length: ByteLength,
        /// The number of parts.
        parts: u64,
    },
    /// The end of the byte range exceeds [`u64::MAX`].
    #[error("byte range at offset {offset} with length {length} overflows")]
    Overflow {
        /// The byte offset.
        offset: ByteOffset,
        /// The byte length.
        length: ByteLength,
    },
}

/// Partition `length` bytes starting at `offset` into `parts` contiguous byte ranges of equal length.
///
/// # Errors
/// Returns [`ByteRangePartitionError`] if `parts` is zero or does not evenly divide `length`, or if `offset + length` overflows.
pub fn partition_byte_range(
    offset: ByteOffset,
    length: ByteLength,
    parts: u64,
) -> Result<Vec<Range<u64>>, ByteRangePartitionError> {
    if parts == 0 || length % parts != 0 {
        return Err(ByteRangePartitionError::Indivisible { length, parts });
    }
    if offset.checked_add(length).is_none() {
        return Err(ByteRangePartitionError::Overflow { offset, length });
    }
    let part_length = length / parts;
    // offset + length fits, so every part does too
    Ok((0..parts)
        .map(|part| {
            let start = offset + part * part_length;
            start..start + part_length
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_range_partition() {
        assert_eq!(
            partition_byte_range(100, 12, 3).unwrap(),
            vec![100..104, 104..108, 108..112]
        );
        assert_eq!(
            partition_byte_range(0, 10, 3).unwrap_err().to_string(),
            "byte length 10 cannot be partitioned into 3 equal parts"
        );
        assert!(partition_byte_range(0, 10, 0).is_err());
        assert_eq!(partition_byte_range(7, 0, 2).unwrap(), vec![7..7, 7..7]);
    }

    #[test]
    fn byte_range_partition_overflow() {
        assert!(matches!(
            partition_byte_range(u64::MAX - 3, 8, 2),
            Err(ByteRangePartitionError::Overflow { .. })
        ));
        assert_eq!(
            partition_byte_range(u64::MAX - 8, 8, 2).unwrap(),
            vec![u64::MAX - 8..u64::MAX - 4, u64::MAX - 4..u64::MAX]
        );
    }
}
