//! Zarr V2 codecs.
//!
//! A Zarr V2 array is encoded by an optional sequence of filters followed by an optional primary compressor.
//! Each is a `bytes->bytes` [codec](CodecTraits) identified by [`MetadataV2`] (an `id` and configuration).
//! A [`CodecChain`] applies filters in order and then the compressor on encode, and the reverse on decode.
//!
//! Codecs are registered at compile time as [`CodecPlugin`]s and created from metadata with [`Codec::from_metadata`].
//! The supported codecs are:
//!  - `gzip` (feature `gzip`),
//!  - `zlib` (feature `zlib`),
//!  - `zstd` (feature `zstd`),
//!  - `crc32c` (feature `crc32c`), and
//!  - `shuffle`.

pub mod bytes_to_bytes;

#[cfg(feature = "crc32c")]
pub use bytes_to_bytes::crc32c::{Crc32cCodec, Crc32cCodecConfiguration, Crc32cLocation};
#[cfg(feature = "gzip")]
pub use bytes_to_bytes::gzip::{GzipCodec, GzipCodecConfiguration};
pub use bytes_to_bytes::{DeflateCompressionLevel, DeflateCompressionLevelError};
pub use bytes_to_bytes::shuffle::{ShuffleCodec, ShuffleCodecConfiguration};
#[cfg(feature = "zlib")]
pub use bytes_to_bytes::zlib::{ZlibCodec, ZlibCodecConfiguration};
#[cfg(feature = "zstd")]
pub use bytes_to_bytes::zstd::{ZstdCodec, ZstdCodecConfiguration};

use std::sync::Arc;

use derive_more::{Deref, From};
use thiserror::Error;

use crate::{
    metadata::v2::MetadataV2,
    plugin::{Plugin, PluginCreateError},
};

/// A codec plugin.
pub type CodecPlugin = Plugin<Codec>;
inventory::collect!(CodecPlugin);

/// Codec traits.
///
/// A codec transforms bytes to bytes. The store never inspects codec internals, it only sequences them.
pub trait CodecTraits: core::fmt::Debug + Send + Sync {
    /// Create the metadata of this codec.
    fn create_metadata(&self) -> MetadataV2;

    /// Encode bytes.
    ///
    /// # Errors
    /// Returns [`CodecError`] if a codec fails or the input is incompatible with the codec.
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes.
    ///
    /// # Errors
    /// Returns [`CodecError`] if a codec fails or the input is incompatible with the codec.
    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError>;
}

/// A codec.
#[derive(Debug, Clone, From, Deref)]
pub struct Codec(Arc<dyn CodecTraits>);

impl Codec {
    /// Create a codec.
    pub fn new<T: CodecTraits + 'static>(codec: T) -> Self {
        Self(Arc::new(codec))
    }

    /// Create a codec from metadata.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if the metadata is invalid or not associated with a registered codec plugin.
    pub fn from_metadata(metadata: &MetadataV2) -> Result<Self, PluginCreateError> {
        for plugin in inventory::iter::<CodecPlugin> {
            if plugin.match_id(metadata.id()) {
                return plugin.create(metadata);
            }
        }
        Err(PluginCreateError::Unsupported {
            id: metadata.id().to_string(),
            plugin_type: "codec".to_string(),
        })
    }
}

/// A codec chain: a sequence of filters followed by an optional primary compressor.
#[derive(Debug, Clone, Default)]
pub struct CodecChain {
    compressor: Option<Codec>,
    filters: Vec<Codec>,
}

impl CodecChain {
    /// Create a new codec chain.
    #[must_use]
    pub fn new(compressor: Option<Codec>, filters: Vec<Codec>) -> Self {
        Self {
            compressor,
            filters,
        }
    }

    /// Create a codec chain from an ordered list of codecs `[compressor, filter_1, filter_2, ...]`.
    ///
    /// The head of the list is the primary compressor and the tail are the filters.
    /// An empty list creates an empty chain.
    #[must_use]
    pub fn from_codecs(codecs: Vec<Codec>) -> Self {
        let mut codecs = codecs.into_iter();
        let compressor = codecs.next();
        Self {
            compressor,
            filters: codecs.collect(),
        }
    }

    /// Create a codec chain from Zarr V2 `compressor` and `filters` metadata.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if any codec cannot be created.
    pub fn from_metadata(
        compressor: Option<&MetadataV2>,
        filters: Option<&[MetadataV2]>,
    ) -> Result<Self, PluginCreateError> {
        let compressor = compressor.map(Codec::from_metadata).transpose()?;
        let filters = filters
            .unwrap_or_default()
            .iter()
            .map(Codec::from_metadata)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            compressor,
            filters,
        })
    }

    /// Returns true if the chain has no compressor and no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compressor.is_none() && self.filters.is_empty()
    }

    /// The primary compressor.
    #[must_use]
    pub fn compressor(&self) -> Option<&Codec> {
        self.compressor.as_ref()
    }

    /// The filters, in encode order.
    #[must_use]
    pub fn filters(&self) -> &[Codec] {
        &self.filters
    }

    /// Create the Zarr V2 `compressor` metadata.
    #[must_use]
    pub fn compressor_metadata(&self) -> Option<MetadataV2> {
        self.compressor.as_ref().map(|codec| codec.create_metadata())
    }

    /// Create the Zarr V2 `filters` metadata.
    #[must_use]
    pub fn filters_metadata(&self) -> Vec<MetadataV2> {
        self.filters
            .iter()
            .map(|codec| codec.create_metadata())
            .collect()
    }

    /// Encode bytes: apply each filter in order, then the compressor.
    ///
    /// # Errors
    /// Returns [`CodecError`] if any codec fails.
    pub fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut value = decoded_value;
        for filter in &self.filters {
            value = filter.encode(value)?;
        }
        if let Some(compressor) = &self.compressor {
            value = compressor.encode(value)?;
        }
        Ok(value)
    }

    /// Decode bytes: apply the compressor, then each filter in reverse order.
    ///
    /// # Errors
    /// Returns [`CodecError`] if any codec fails.
    pub fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut value = encoded_value;
        if let Some(compressor) = &self.compressor {
            value = compressor.decode(value)?;
        }
        for filter in self.filters.iter().rev() {
            value = filter.decode(value)?;
        }
        Ok(value)
    }
}

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An embedded checksum does not match the decoded value.
    #[error("the checksum is invalid")]
    InvalidChecksum,
    /// The length of the input is not compatible with the codec.
    #[error("the input length {_0} is incompatible with codec {_1}")]
    InvalidInputLength(usize, String),
    /// A codec could not be created.
    #[error(transparent)]
    PluginCreateError(#[from] PluginCreateError),
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
