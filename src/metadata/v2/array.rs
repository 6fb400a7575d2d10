use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    array::{chunk_key_encoding::ChunkKeySeparator, ArrayShape, ChunkShape, DataType, DataTypeError},
    metadata::AdditionalFields,
};

use super::MetadataV2;

/// Zarr array metadata (storage specification v2).
///
/// An example `JSON` document for a Zarr V2 array:
/// ```json
/// {
///     "chunks": [
///         1000,
///         1000
///     ],
///     "compressor": {
///         "id": "zlib",
///         "level": 1
///     },
///     "dtype": "<f8",
///     "fill_value": "NaN",
///     "filters": [
///         {"id": "shuffle", "elementsize": 8}
///     ],
///     "order": "C",
///     "shape": [
///         10000,
///         10000
///     ],
///     "zarr_format": 2
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ArrayMetadataV2 {
    /// An integer defining the version of the storage specification to which the array adheres. Must be `2`.
    pub zarr_format: monostate::MustBe!(2u64),
    /// An array of integers providing the length of each dimension of the Zarr array.
    pub shape: ArrayShape,
    /// A list of integers defining the length of each dimension of a chunk of the array.
    pub chunks: ChunkShape,
    /// The data type of the Zarr array.
    pub dtype: ArrayMetadataV2DataType,
    /// A JSON object identifying the primary compression codec and providing configuration parameters, or null if no compressor is to be used.
    pub compressor: Option<MetadataV2>,
    /// A scalar value providing the default value to use for uninitialized portions of the array, or null if no fill value is to be used.
    #[serde(default)]
    pub fill_value: serde_json::Value,
    /// Either “C” or “F”, defining the layout of bytes within each chunk of the array.
    #[serde(default)]
    pub order: ArrayMetadataV2Order,
    /// A list of JSON objects providing codec configurations, or null if no filters are to be applied.
    #[serde(default)]
    pub filters: Option<Vec<MetadataV2>>,
    /// If present, either the string "." or "/" defining the separator placed between the dimensions of a chunk.
    #[serde(default = "chunk_key_separator_default_zarr_v2")]
    pub dimension_separator: ChunkKeySeparator,
    /// Additional fields.
    ///
    /// These are not part of Zarr V2, but are retained for compatibility/flexibility.
    #[serde(flatten)]
    pub additional_fields: AdditionalFields,
}

const fn chunk_key_separator_default_zarr_v2() -> ChunkKeySeparator {
    ChunkKeySeparator::Dot
}

/// Structure data type metadata.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(
    from = "DataTypeMetadataV2StructuredTuple",
    into = "DataTypeMetadataV2StructuredTuple"
)]
pub struct DataTypeMetadataV2Structured {
    /// Field name.
    fieldname: String,
    /// Data type.
    datatype: String,
    /// Subarray shape.
    shape: Option<Vec<u64>>,
}

#[derive(Serialize, Deserialize)]
struct DataTypeMetadataV2StructuredTuple(
    String,
    String,
    #[serde(skip_serializing_if = "Option::is_none")] Option<Vec<u64>>,
);

impl From<DataTypeMetadataV2StructuredTuple> for DataTypeMetadataV2Structured {
    fn from(value: DataTypeMetadataV2StructuredTuple) -> Self {
        let DataTypeMetadataV2StructuredTuple(fieldname, datatype, shape) = value;
        Self {
            fieldname,
            datatype,
            shape,
        }
    }
}

impl From<DataTypeMetadataV2Structured> for DataTypeMetadataV2StructuredTuple {
    fn from(value: DataTypeMetadataV2Structured) -> Self {
        Self(value.fieldname, value.datatype, value.shape)
    }
}

/// Zarr V2 data type metadata.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(untagged)]
pub enum ArrayMetadataV2DataType {
    /// A simple data type.
    Simple(String),
    /// A structured data type.
    Structured(Vec<DataTypeMetadataV2Structured>),
}

/// The layout of bytes within each chunk of the array.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ArrayMetadataV2Order {
    /// Row-major order. The last dimension varies fastest.
    #[default]
    C,
    /// Column-major order. The first dimension varies fastest.
    F,
}

/// A Zarr V2 array metadata error.
#[derive(Debug, Error)]
pub enum ArrayMetadataV2Error {
    /// The metadata is not a valid `.zarray` document.
    #[error("invalid array metadata: {_0}")]
    InvalidJSON(#[from] serde_json::Error),
    /// The chunk shape dimensionality does not match the array shape.
    #[error("chunk shape {_1:?} has a different dimensionality to array shape {_0:?}")]
    IncompatibleDimensionality(ArrayShape, ChunkShape),
    /// A chunk shape has a zero length dimension.
    #[error("chunk shape {_0:?} has a zero length dimension")]
    ZeroChunkLength(ChunkShape),
    /// The data type is invalid or unsupported.
    #[error(transparent)]
    DataType(#[from] DataTypeError),
    /// The chunk size in bytes exceeds [`u64::MAX`].
    #[error("the size of chunk shape {_0:?} in bytes overflows u64")]
    ChunkSizeOverflow(ChunkShape),
}

impl ArrayMetadataV2 {
    /// Create new uncompressed, unfiltered array metadata.
    #[must_use]
    pub fn new(
        shape: ArrayShape,
        chunks: ChunkShape,
        data_type: &DataType,
        fill_value: serde_json::Value,
    ) -> Self {
        Self {
            zarr_format: monostate::MustBe!(2u64),
            shape,
            chunks,
            dtype: ArrayMetadataV2DataType::Simple(data_type.to_string()),
            compressor: None,
            fill_value,
            order: ArrayMetadataV2Order::C,
            filters: None,
            dimension_separator: ChunkKeySeparator::Dot,
            additional_fields: AdditionalFields::default(),
        }
    }

    /// Set the compressor and filters.
    ///
    /// An empty filter list is written as `null`.
    #[must_use]
    pub fn with_codecs(mut self, compressor: Option<MetadataV2>, filters: Vec<MetadataV2>) -> Self {
        self.compressor = compressor;
        self.filters = if filters.is_empty() {
            None
        } else {
            Some(filters)
        };
        self
    }

    /// Parse and validate `.zarray` metadata from JSON bytes.
    ///
    /// # Errors
    /// Returns [`ArrayMetadataV2Error`] if the metadata is malformed or inconsistent.
    pub fn from_slice(metadata: &[u8]) -> Result<Self, ArrayMetadataV2Error> {
        let metadata: Self = serde_json::from_slice(metadata)?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Validate the consistency of the array shape, chunk shape, and data type.
    ///
    /// # Errors
    /// Returns [`ArrayMetadataV2Error`] if
    ///  - the chunk shape and array shape have a different dimensionality,
    ///  - any chunk dimension has length zero,
    ///  - the data type is unsupported, or
    ///  - the chunk size in bytes overflows.
    pub fn validate(&self) -> Result<(), ArrayMetadataV2Error> {
        if self.chunks.len() != self.shape.len() {
            return Err(ArrayMetadataV2Error::IncompatibleDimensionality(
                self.shape.clone(),
                self.chunks.clone(),
            ));
        }
        if self.chunks.contains(&0) {
            return Err(ArrayMetadataV2Error::ZeroChunkLength(self.chunks.clone()));
        }
        self.chunk_size_bytes()?;
        Ok(())
    }

    /// Return the data type.
    ///
    /// # Errors
    /// Returns [`DataTypeError`] if the data type is structured or unrecognised.
    pub fn data_type(&self) -> Result<DataType, DataTypeError> {
        DataType::from_metadata_v2(&self.dtype)
    }

    /// Return the size in bytes of a decoded chunk.
    ///
    /// # Errors
    /// Returns [`ArrayMetadataV2Error`] if the data type is unsupported or the size overflows [`u64`].
    pub fn chunk_size_bytes(&self) -> Result<u64, ArrayMetadataV2Error> {
        let data_type = self.data_type()?;
        self.chunks
            .iter()
            .try_fold(data_type.size() as u64, |size, &length| size.checked_mul(length))
            .ok_or_else(|| ArrayMetadataV2Error::ChunkSizeOverflow(self.chunks.clone()))
    }

    /// Returns true if the array has a compressor.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressor.is_some()
    }

    /// Returns true if the array has at least one filter.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        self.filters
            .as_ref()
            .is_some_and(|filters| !filters.is_empty())
    }
}
