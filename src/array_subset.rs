//! Array subsets.
//!
//! An [`ArraySubset`] is a rectangular region of an array, defined by a start and shape.
//! It is used to locate the elements of a chunk within an array, and to copy bytes between a C-order array and a C-order subset buffer.
//!
//! This module provides convenience functions for:
//!  - computing the contiguous runs of elements of a subset within an array,
//!  - extracting the bytes within a subset of an array, and
//!  - storing the bytes of a subset into an array.

use derive_more::Display;
use thiserror::Error;

use crate::array::{ArrayIndices, ArrayShape};

/// An array subset.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Default)]
#[display("start {start:?} shape {shape:?}")]
pub struct ArraySubset {
    /// The start of the array subset.
    start: ArrayIndices,
    /// The shape of the array subset.
    shape: ArrayShape,
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {_0}, expected {_1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// An array subset bytes error.
#[derive(Debug, Error)]
pub enum ArraySubsetBytesError {
    /// The array subset is out of bounds of the array or has a different dimensionality.
    #[error("array subset {_0} is incompatible with array of shape {_1:?}")]
    IncompatibleArrayShape(ArraySubset, ArrayShape),
    /// The length of the subset bytes is invalid.
    #[error("expected subset bytes to have length {_1}, got {_0}")]
    InvalidSubsetBytes(usize, u64),
    /// The length of the array bytes is invalid.
    #[error("expected array bytes to have length {_1}, got {_0}")]
    InvalidArrayBytes(usize, u64),
}

impl ArraySubset {
    /// Create a new array subset with `shape` starting at the origin.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new array subset.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if the size of `start` and `shape` do not match.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError::new(start.len(), shape.len()))
        }
    }

    /// Create the array subset of the chunk at `chunk_indices` in a regular grid of `chunk_shape`.
    ///
    /// The subset is not bounded by the array shape, see [`ArraySubset::bound`].
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if the size of `chunk_indices` and `chunk_shape` do not match.
    pub fn new_with_chunk(
        chunk_indices: &[u64],
        chunk_shape: &[u64],
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if chunk_indices.len() == chunk_shape.len() {
            Ok(Self {
                start: std::iter::zip(chunk_indices, chunk_shape)
                    .map(|(index, length)| index * length)
                    .collect(),
                shape: chunk_shape.to_vec(),
            })
        } else {
            Err(IncompatibleDimensionalityError::new(
                chunk_indices.len(),
                chunk_shape.len(),
            ))
        }
    }

    /// Return the start of the array subset.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the array subset.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the end (exclusive) of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// Return the number of elements of the array subset.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Returns true if the array subset contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.contains(&0)
    }

    /// Returns true if the array subset contains `indices`.
    #[must_use]
    pub fn contains(&self, indices: &[u64]) -> bool {
        indices.len() == self.dimensionality()
            && itertools::izip!(indices, &self.start, &self.shape)
                .all(|(&index, &start, &size)| index >= start && index < start + size)
    }

    /// Return the overlapping subset between this array subset and `other`, or [`None`] if they do not overlap.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionality of `other` does not match.
    pub fn overlap(&self, other: &Self) -> Result<Option<Self>, IncompatibleDimensionalityError> {
        if other.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                other.dimensionality(),
                self.dimensionality(),
            ));
        }
        let start: ArrayIndices = std::iter::zip(&self.start, &other.start)
            .map(|(&a, &b)| a.max(b))
            .collect();
        let end: ArrayIndices = std::iter::zip(self.end_exc(), other.end_exc())
            .map(|(a, b)| a.min(b))
            .collect();
        if std::iter::zip(&start, &end).any(|(start, end)| start >= end) {
            Ok(None)
        } else {
            let shape = std::iter::zip(&start, &end)
                .map(|(start, end)| end - start)
                .collect();
            Ok(Some(Self { start, shape }))
        }
    }

    /// Bound the array subset to the domain within `end` (exclusive).
    ///
    /// # Errors
    /// Returns an error if `end` does not match the array subset dimensionality.
    pub fn bound(&self, end: &[u64]) -> Result<Self, IncompatibleDimensionalityError> {
        if end.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                end.len(),
                self.dimensionality(),
            ));
        }
        let start: ArrayIndices = std::iter::zip(&self.start, end)
            .map(|(&a, &b)| a.min(b))
            .collect();
        let shape = itertools::izip!(&start, self.end_exc(), end)
            .map(|(start, subset_end, &end)| subset_end.min(end) - start)
            .collect();
        Ok(Self { start, shape })
    }

    /// Returns true if the array subset is within the bounds of `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        array_shape.len() == self.dimensionality()
            && std::iter::zip(self.end_exc(), array_shape).all(|(end, &shape)| end <= shape)
    }

    /// Return the linearised indices of the starts of each contiguous run of elements of the subset within an array of `array_shape`, and the number of elements in each run.
    ///
    /// Runs are returned in C order, matching the order of elements in a C-order subset buffer.
    ///
    /// # Errors
    /// Returns [`ArraySubsetBytesError::IncompatibleArrayShape`] if the subset is not within the bounds of `array_shape`.
    pub fn contiguous_linearised_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<(Vec<u64>, u64), ArraySubsetBytesError> {
        if !self.inbounds(array_shape) {
            return Err(ArraySubsetBytesError::IncompatibleArrayShape(
                self.clone(),
                array_shape.to_vec(),
            ));
        }
        if self.is_empty() {
            return Ok((vec![], 0));
        }
        let dimensionality = self.dimensionality();
        if dimensionality == 0 {
            return Ok((vec![0], 1));
        }

        // Merge inner dimensions that span the whole array into a single run
        let mut outer = dimensionality - 1;
        while outer > 0 && self.start[outer] == 0 && self.shape[outer] == array_shape[outer] {
            outer -= 1;
        }
        let contiguous_elements: u64 = self.shape[outer..].iter().product();

        let mut strides = vec![1u64; dimensionality];
        for i in (0..dimensionality - 1).rev() {
            strides[i] = strides[i + 1] * array_shape[i + 1];
        }
        let run_offset = self.start[outer] * strides[outer];

        let outer_shape = &self.shape[..outer];
        let num_runs: u64 = outer_shape.iter().product();
        let mut starts = Vec::with_capacity(usize::try_from(num_runs).unwrap_or_default());
        let mut indices = vec![0u64; outer];
        for _ in 0..num_runs {
            let linearised: u64 = itertools::izip!(&indices, &self.start, &strides)
                .map(|(index, start, stride)| (start + index) * stride)
                .sum();
            starts.push(linearised + run_offset);
            for i in (0..outer).rev() {
                indices[i] += 1;
                if indices[i] < outer_shape[i] {
                    break;
                }
                indices[i] = 0;
            }
        }
        Ok((starts, contiguous_elements))
    }

    /// Extract the bytes of the subset from the C-order `bytes` of an array of `array_shape` with elements of `element_size` bytes.
    ///
    /// # Errors
    /// Returns [`ArraySubsetBytesError`] if the subset is out of bounds or `bytes` has an unexpected length.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<Vec<u8>, ArraySubsetBytesError> {
        let element_size = element_size as u64;
        let array_size = array_shape.iter().product::<u64>() * element_size;
        if bytes.len() as u64 != array_size {
            return Err(ArraySubsetBytesError::InvalidArrayBytes(
                bytes.len(),
                array_size,
            ));
        }
        let (starts, contiguous_elements) = self.contiguous_linearised_indices(array_shape)?;
        let run_size = to_usize(contiguous_elements * element_size);
        let mut out = Vec::with_capacity(to_usize(self.num_elements() * element_size));
        for start in starts {
            let offset = to_usize(start * element_size);
            out.extend_from_slice(&bytes[offset..offset + run_size]);
        }
        Ok(out)
    }

    /// Store the C-order `subset_bytes` of the subset into the C-order `array_bytes` of an array of `array_shape` with elements of `element_size` bytes.
    ///
    /// # Errors
    /// Returns [`ArraySubsetBytesError`] if the subset is out of bounds or either byte buffer has an unexpected length.
    pub fn store_bytes(
        &self,
        subset_bytes: &[u8],
        array_bytes: &mut [u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<(), ArraySubsetBytesError> {
        let element_size = element_size as u64;
        let array_size = array_shape.iter().product::<u64>() * element_size;
        if array_bytes.len() as u64 != array_size {
            return Err(ArraySubsetBytesError::InvalidArrayBytes(
                array_bytes.len(),
                array_size,
            ));
        }
        let subset_size = self.num_elements() * element_size;
        if subset_bytes.len() as u64 != subset_size {
            return Err(ArraySubsetBytesError::InvalidSubsetBytes(
                subset_bytes.len(),
                subset_size,
            ));
        }
        let (starts, contiguous_elements) = self.contiguous_linearised_indices(array_shape)?;
        let run_size = to_usize(contiguous_elements * element_size);
        for (run, start) in starts.into_iter().enumerate() {
            let offset = to_usize(start * element_size);
            array_bytes[offset..offset + run_size]
                .copy_from_slice(&subset_bytes[run * run_size..(run + 1) * run_size]);
        }
        Ok(())
    }
}

// Offsets are bounded by the length of an in-memory buffer.
fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_subset() {
        let subset = ArraySubset::new_with_start_shape(vec![1, 1], vec![3, 3]).unwrap();
        assert_eq!(subset.end_exc(), vec![4, 4]);
        assert_eq!(subset.num_elements(), 9);
        assert!(subset.contains(&[1, 3]));
        assert!(!subset.contains(&[0, 3]));
        assert!(ArraySubset::new_with_start_shape(vec![1], vec![3, 3]).is_err());
        assert_eq!(
            subset.bound(&[3, 5]).unwrap(),
            ArraySubset::new_with_start_shape(vec![1, 1], vec![2, 3]).unwrap()
        );
        assert_eq!(
            subset
                .overlap(&ArraySubset::new_with_start_shape(vec![3, 0], vec![5, 2]).unwrap())
                .unwrap(),
            Some(ArraySubset::new_with_start_shape(vec![3, 1], vec![1, 1]).unwrap())
        );
        assert_eq!(
            subset
                .overlap(&ArraySubset::new_with_start_shape(vec![4, 0], vec![5, 2]).unwrap())
                .unwrap(),
            None
        );
        assert_eq!(
            ArraySubset::new_with_chunk(&[2, 1], &[3, 4]).unwrap(),
            ArraySubset::new_with_start_shape(vec![6, 4], vec![3, 4]).unwrap()
        );
    }

    #[test]
    fn array_subset_contiguous_linearised_indices() {
        let subset = ArraySubset::new_with_start_shape(vec![1, 1], vec![2, 2]).unwrap();
        assert_eq!(
            subset.contiguous_linearised_indices(&[4, 4]).unwrap(),
            (vec![5, 9], 2)
        );
        let subset = ArraySubset::new_with_start_shape(vec![1, 0], vec![2, 4]).unwrap();
        assert_eq!(
            subset.contiguous_linearised_indices(&[4, 4]).unwrap(),
            (vec![4], 8)
        );
        assert!(subset.contiguous_linearised_indices(&[2, 4]).is_err());
        let subset = ArraySubset::new_with_shape(vec![]);
        assert_eq!(
            subset.contiguous_linearised_indices(&[]).unwrap(),
            (vec![0], 1)
        );
    }

    #[test]
    fn array_subset_bytes() {
        let array: Vec<u8> = (0..16).collect();
        let subset = ArraySubset::new_with_start_shape(vec![1, 1], vec![2, 2]).unwrap();
        let bytes = subset.extract_bytes(&array, &[4, 4], 1).unwrap();
        assert_eq!(bytes, vec![5, 6, 9, 10]);

        let mut array_out = vec![0u8; 16];
        subset.store_bytes(&bytes, &mut array_out, &[4, 4], 1).unwrap();
        assert_eq!(array_out[5], 5);
        assert_eq!(array_out[10], 10);
        assert_eq!(array_out[0], 0);

        assert!(subset.extract_bytes(&array, &[4, 3], 1).is_err());
        assert!(subset
            .store_bytes(&bytes[1..], &mut array_out, &[4, 4], 1)
            .is_err());
    }
}
