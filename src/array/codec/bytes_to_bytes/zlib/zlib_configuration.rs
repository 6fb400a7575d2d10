use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::array::codec::DeflateCompressionLevel;

/// Configuration parameters for the `zlib` codec.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[serde(deny_unknown_fields)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ZlibCodecConfiguration {
    /// The compression level.
    pub level: DeflateCompressionLevel,
}
