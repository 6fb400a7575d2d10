use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::array::codec::DeflateCompressionLevel;

/// Configuration parameters for the `gzip` codec.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[serde(deny_unknown_fields)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct GzipCodecConfiguration {
    /// The compression level.
    pub level: DeflateCompressionLevel,
}

impl GzipCodecConfiguration {
    /// Create a new `gzip` codec configuration given a [`DeflateCompressionLevel`].
    #[must_use]
    pub const fn new(level: DeflateCompressionLevel) -> Self {
        Self { level }
    }
}
