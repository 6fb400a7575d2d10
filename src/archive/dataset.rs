use std::collections::BTreeMap;

use crate::{
    array::{ArrayShape, ChunkShape, DataType, Element},
    metadata::v2::is_metadata_key_name,
};

use super::ArchiveError;

/// The `.zattrs` attribute that records the dimension names of a variable.
pub const ARRAY_DIMENSIONS_ATTRIBUTE: &str = "_ARRAY_DIMENSIONS";

/// An in-memory n-dimensional variable.
///
/// The element bytes are in C (row-major) order and in the byte order of the [`DataType`].
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    shape: ArrayShape,
    data_type: DataType,
    data: Vec<u8>,
    chunk_shape: Option<ChunkShape>,
    dimension_names: Option<Vec<String>>,
    attributes: serde_json::Map<String, serde_json::Value>,
    fill_value: serde_json::Value,
}

impl Variable {
    /// Create a new variable from its shape, data type, and C-order element bytes.
    ///
    /// # Errors
    /// Returns [`ArchiveError::InvalidArgument`] if the length of `data` is not the number of elements multiplied by the data type size.
    pub fn new(
        shape: ArrayShape,
        data_type: DataType,
        data: Vec<u8>,
    ) -> Result<Self, ArchiveError> {
        if num_bytes(&shape, data_type.size()) != Some(data.len() as u64) {
            return Err(ArchiveError::InvalidArgument(format!(
                "variable data has {} bytes, which does not match shape {shape:?} of {data_type}",
                data.len(),
            )));
        }
        Ok(Self {
            shape,
            data_type,
            data,
            chunk_shape: None,
            dimension_names: None,
            attributes: serde_json::Map::default(),
            fill_value: serde_json::Value::Null,
        })
    }

    /// Create a new variable from a slice of elements in C order.
    ///
    /// # Errors
    /// Returns [`ArchiveError::InvalidArgument`] if the number of elements does not match `shape`.
    pub fn from_elements<T: Element>(shape: ArrayShape, elements: &[T]) -> Result<Self, ArchiveError> {
        Self::new(
            shape,
            T::data_type(),
            bytemuck::cast_slice(elements).to_vec(),
        )
    }

    /// Set the chunk shape. Defaults to a single chunk covering the variable.
    #[must_use]
    pub fn with_chunk_shape(mut self, chunk_shape: ChunkShape) -> Self {
        self.chunk_shape = Some(chunk_shape);
        self
    }

    /// Set the dimension names.
    #[must_use]
    pub fn with_dimension_names(mut self, dimension_names: Vec<String>) -> Self {
        self.dimension_names = Some(dimension_names);
        self
    }

    /// Set the user attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: serde_json::Map<String, serde_json::Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set the fill value. Defaults to `null`.
    #[must_use]
    pub fn with_fill_value(mut self, fill_value: serde_json::Value) -> Self {
        self.fill_value = fill_value;
        self
    }

    /// The shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The data type.
    #[must_use]
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// The C-order element bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The chunk shape, if set.
    #[must_use]
    pub fn chunk_shape(&self) -> Option<&[u64]> {
        self.chunk_shape.as_deref()
    }

    /// The dimension names, if set.
    #[must_use]
    pub fn dimension_names(&self) -> Option<&[String]> {
        self.dimension_names.as_deref()
    }

    /// The user attributes.
    #[must_use]
    pub fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }

    /// The fill value.
    #[must_use]
    pub fn fill_value(&self) -> &serde_json::Value {
        &self.fill_value
    }

    /// Return the elements of the variable.
    ///
    /// # Errors
    /// Returns [`ArchiveError::InvalidArgument`] if `T` does not match the data type of the variable.
    pub fn to_elements<T: Element>(&self) -> Result<Vec<T>, ArchiveError> {
        if T::data_type() != self.data_type {
            return Err(ArchiveError::InvalidArgument(format!(
                "variable data type {} is not {}",
                self.data_type,
                T::data_type()
            )));
        }
        Ok(bytemuck::pod_collect_to_vec(&self.data))
    }

    /// Return the chunk shape used when the variable is encoded.
    ///
    /// This is the configured chunk shape, or the variable shape with zero length dimensions replaced by 1.
    ///
    /// # Errors
    /// Returns [`ArchiveError::InvalidArgument`] if the configured chunk shape has the wrong dimensionality or a zero length dimension,
    /// or if a chunk is too large to be held in memory.
    pub(crate) fn effective_chunk_shape(&self) -> Result<ChunkShape, ArchiveError> {
        let chunk_shape = match &self.chunk_shape {
            Some(chunk_shape) => {
                if chunk_shape.len() != self.shape.len() || chunk_shape.contains(&0) {
                    return Err(ArchiveError::InvalidArgument(format!(
                        "chunk shape {chunk_shape:?} is incompatible with variable shape {:?}",
                        self.shape
                    )));
                }
                chunk_shape.clone()
            }
            None => self.shape.iter().map(|&length| length.max(1)).collect(),
        };
        chunk_num_bytes(&chunk_shape, self.data_type.size())?;
        Ok(chunk_shape)
    }

    pub(crate) fn validate_dimension_names(&self) -> Result<(), ArchiveError> {
        match &self.dimension_names {
            Some(dimension_names) if dimension_names.len() != self.shape.len() => {
                Err(ArchiveError::InvalidArgument(format!(
                    "{} dimension names given for a variable with {} dimensions",
                    dimension_names.len(),
                    self.shape.len()
                )))
            }
            _ => Ok(()),
        }
    }
}

/// The number of bytes of an array of `shape` with elements of `element_size` bytes, or [`None`] on overflow.
fn num_bytes(shape: &[u64], element_size: usize) -> Option<u64> {
    shape
        .iter()
        .try_fold(element_size as u64, |size, &length| size.checked_mul(length))
}

/// The number of bytes of a chunk of `chunk_shape` with elements of `element_size` bytes.
///
/// # Errors
/// Returns [`ArchiveError::InvalidArgument`] if the chunk cannot be allocated.
pub(crate) fn chunk_num_bytes(chunk_shape: &[u64], element_size: usize) -> Result<usize, ArchiveError> {
    num_bytes(chunk_shape, element_size)
        .and_then(|size| isize::try_from(size).ok())
        .and_then(|size| usize::try_from(size).ok())
        .ok_or_else(|| {
            ArchiveError::InvalidArgument(format!(
                "chunk shape {chunk_shape:?} with {element_size} byte elements is too large"
            ))
        })
}

/// An in-memory dataset: named [`Variable`]s and global attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    variables: BTreeMap<String, Variable>,
    attributes: serde_json::Map<String, serde_json::Value>,
}

impl Dataset {
    /// Create a new empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: serde_json::Map<String, serde_json::Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Add a variable.
    ///
    /// # Errors
    /// Returns [`ArchiveError::InvalidArgument`] if
    ///  - `name` is empty, contains `/`, or is a Zarr metadata key name, or
    ///  - the dataset already has a variable named `name`.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        variable: Variable,
    ) -> Result<(), ArchiveError> {
        let name = name.into();
        if name.is_empty() || name.contains('/') || is_metadata_key_name(&name) {
            return Err(ArchiveError::InvalidArgument(format!(
                "{name:?} is not a valid variable name"
            )));
        }
        if self.variables.contains_key(&name) {
            return Err(ArchiveError::InvalidArgument(format!(
                "the dataset already has a variable named {name:?}"
            )));
        }
        self.variables.insert(name, variable);
        Ok(())
    }

    /// The variables, ordered by name.
    #[must_use]
    pub fn variables(&self) -> &BTreeMap<String, Variable> {
        &self.variables
    }

    /// Return the variable named `name`.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// The global attributes.
    #[must_use]
    pub fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_from_elements() -> Result<(), Box<dyn std::error::Error>> {
        let variable = Variable::from_elements(vec![2, 3], &[0u16, 1, 2, 3, 4, 5])?
            .with_dimension_names(vec!["y".to_string(), "x".to_string()]);
        assert_eq!(variable.data().len(), 12);
        assert_eq!(variable.data_type(), &u16::data_type());
        assert_eq!(variable.to_elements::<u16>()?, vec![0, 1, 2, 3, 4, 5]);
        assert!(variable.to_elements::<i16>().is_err());
        assert_eq!(variable.effective_chunk_shape()?, vec![2, 3]);
        assert!(variable.validate_dimension_names().is_ok());
        Ok(())
    }

    #[test]
    fn variable_invalid() -> Result<(), Box<dyn std::error::Error>> {
        assert!(Variable::from_elements(vec![2, 3], &[0u16; 5]).is_err());

        let variable = Variable::from_elements(vec![0, 3], &[0f32; 0])?;
        assert_eq!(variable.effective_chunk_shape()?, vec![1, 3]);
        assert!(variable
            .clone()
            .with_chunk_shape(vec![1, 0])
            .effective_chunk_shape()
            .is_err());
        assert!(variable
            .clone()
            .with_chunk_shape(vec![1])
            .effective_chunk_shape()
            .is_err());
        assert!(variable
            .with_dimension_names(vec!["x".to_string()])
            .validate_dimension_names()
            .is_err());
        Ok(())
    }

    #[test]
    fn variable_overflow() -> Result<(), Box<dyn std::error::Error>> {
        assert!(matches!(
            Variable::new(vec![u64::MAX, 2], f64::data_type(), vec![]),
            Err(ArchiveError::InvalidArgument(_))
        ));

        let variable = Variable::from_elements(vec![2], &[1.0f64, 2.0])?;
        assert!(matches!(
            variable
                .clone()
                .with_chunk_shape(vec![u64::MAX / 4])
                .effective_chunk_shape(),
            Err(ArchiveError::InvalidArgument(_))
        ));
        assert!(variable
            .with_chunk_shape(vec![u64::MAX / 8])
            .effective_chunk_shape()
            .is_err());
        assert_eq!(chunk_num_bytes(&[3, 4], 2)?, 24);
        assert_eq!(chunk_num_bytes(&[], 8)?, 8);
        Ok(())
    }

    #[test]
    fn dataset_add_variable() -> Result<(), Box<dyn std::error::Error>> {
        let mut dataset = Dataset::new();
        let variable = Variable::from_elements(vec![], &[1.5f64])?;
        dataset.add_variable("t", variable.clone())?;
        assert!(dataset.add_variable("t", variable.clone()).is_err());
        assert!(dataset.add_variable("", variable.clone()).is_err());
        assert!(dataset.add_variable("a/b", variable.clone()).is_err());
        assert!(dataset.add_variable(".zattrs", variable).is_err());
        assert_eq!(dataset.variables().len(), 1);
        assert_eq!(dataset.variable("t").map(Variable::shape), Some(&[][..]));
        Ok(())
    }
}
