use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The location of the checksum relative to the data.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug, Default, Display)]
#[serde(rename_all = "lowercase")]
pub enum Crc32cLocation {
    /// The checksum precedes the data.
    #[default]
    #[display("start")]
    Start,
    /// The checksum follows the data.
    #[display("end")]
    End,
}

/// Configuration parameters for the `crc32c` codec.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default, Display)]
#[serde(deny_unknown_fields)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct Crc32cCodecConfiguration {
    /// The checksum location.
    #[serde(default)]
    pub location: Crc32cLocation,
}
