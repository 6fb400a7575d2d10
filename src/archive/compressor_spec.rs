use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    array::codec::{Codec, CodecChain},
    metadata::v2::MetadataV2,
};

use super::{ArchiveError, Dataset};

/// A single codec or an ordered codec chain `[compressor, filter_1, filter_2, ...]`.
///
/// An empty chain writes the variable without a compressor or filters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum CodecSpec {
    /// A single codec, used as the compressor.
    Codec(MetadataV2),
    /// A codec chain. The head is the compressor and the tail are the filters.
    Chain(Vec<MetadataV2>),
}

impl Default for CodecSpec {
    fn default() -> Self {
        Self::Chain(vec![])
    }
}

impl CodecSpec {
    /// Create the [`CodecChain`] of this specification.
    ///
    /// # Errors
    /// Returns [`ArchiveError::InvalidArgument`] if any codec is not supported or its configuration is invalid.
    pub fn to_codec_chain(&self) -> Result<CodecChain, ArchiveError> {
        let metadata = match self {
            Self::Codec(metadata) => std::slice::from_ref(metadata),
            Self::Chain(chain) => chain.as_slice(),
        };
        let codecs = metadata
            .iter()
            .map(Codec::from_metadata)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ArchiveError::InvalidArgument(err.to_string()))?;
        Ok(CodecChain::from_codecs(codecs))
    }
}

/// The codecs applied to the variables of a dataset.
///
/// In JSON, this is either
///  - a codec, e.g. `{"id": "zlib", "level": 5}`,
///  - a codec chain, e.g. `[{"id": "zstd", "level": 3}, {"id": "shuffle", "elementsize": 8}]`, or
///  - an object mapping variable names to a codec or codec chain, e.g. `{"t": {"id": "gzip", "level": 1}, "x": []}`.
///
/// Variables absent from a per-variable map are written without a compressor or filters.
/// This differs from `xarray`, which compresses variables without an explicit encoding with its default compressor.
/// Name every variable in the map, or use a single codec or codec chain, to compress the whole dataset.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum CompressorSpec {
    /// The same codec or codec chain for every variable.
    All(CodecSpec),
    /// A codec or codec chain per variable.
    PerVariable(BTreeMap<String, CodecSpec>),
}

impl Default for CompressorSpec {
    fn default() -> Self {
        Self::All(CodecSpec::default())
    }
}

impl From<MetadataV2> for CompressorSpec {
    fn from(metadata: MetadataV2) -> Self {
        Self::All(CodecSpec::Codec(metadata))
    }
}

impl From<Vec<MetadataV2>> for CompressorSpec {
    fn from(chain: Vec<MetadataV2>) -> Self {
        Self::All(CodecSpec::Chain(chain))
    }
}

impl CompressorSpec {
    /// Resolve the codec chain of every variable in `dataset`.
    ///
    /// A variable absent from a per-variable map gets an empty codec chain.
    ///
    /// # Errors
    /// Returns [`ArchiveError::InvalidArgument`] if
    ///  - a per-variable map names a variable that is not in `dataset`, or
    ///  - a codec is not supported or its configuration is invalid.
    pub fn codec_chains(
        &self,
        dataset: &Dataset,
    ) -> Result<BTreeMap<String, CodecChain>, ArchiveError> {
        match self {
            Self::All(spec) => {
                let chain = spec.to_codec_chain()?;
                Ok(dataset
                    .variables()
                    .keys()
                    .map(|name| (name.clone(), chain.clone()))
                    .collect())
            }
            Self::PerVariable(specs) => {
                if let Some(unknown) = specs
                    .keys()
                    .find(|name| dataset.variable(name).is_none())
                {
                    return Err(ArchiveError::InvalidArgument(format!(
                        "the dataset has no variable named {unknown:?}"
                    )));
                }
                dataset
                    .variables()
                    .keys()
                    .map(|name| {
                        let chain = match specs.get(name) {
                            Some(spec) => spec.to_codec_chain()?,
                            None => CodecChain::default(),
                        };
                        Ok((name.clone(), chain))
                    })
                    .collect()
            }
        }
    }
}
