use std::num::NonZeroUsize;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Configuration parameters for the `shuffle` codec.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[serde(deny_unknown_fields)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ShuffleCodecConfiguration {
    /// The size of an element in bytes.
    #[serde(default = "default_elementsize")]
    pub elementsize: NonZeroUsize,
}

const fn default_elementsize() -> NonZeroUsize {
    NonZeroUsize::MIN.saturating_add(3)
}
