use derive_more::Display;
use serde::{Deserialize, Serialize};
use zstd::zstd_safe;

/// Configuration parameters for the `zstd` codec.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[serde(deny_unknown_fields)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ZstdCodecConfiguration {
    /// The compression level.
    pub level: ZstdCompressionLevel,
    /// A boolean that indicates whether to store a checksum when writing that will be verified when reading.
    #[serde(default)]
    pub checksum: bool,
}

impl ZstdCodecConfiguration {
    /// Create a new `zstd` codec configuration given a [`ZstdCompressionLevel`].
    #[must_use]
    pub const fn new(level: ZstdCompressionLevel, checksum: bool) -> Self {
        Self { level, checksum }
    }
}

/// A zstd compression level. An integer from -131072 to 22 which controls the speed and level of compression (has no impact on decoding).
///
/// A value of 0 indicates to use the default compression level.
/// Otherwise, a higher level is expected to achieve a higher compression ratio at the cost of lower speed.
#[derive(Serialize, Clone, Copy, Eq, PartialEq, Debug)]
pub struct ZstdCompressionLevel(zstd_safe::CompressionLevel);

impl<'de> serde::Deserialize<'de> for ZstdCompressionLevel {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let number = serde_json::Number::deserialize(d)?;
        if let Some(number) = number.as_i64() {
            if (-131_072..=22).contains(&number) {
                #[allow(clippy::cast_possible_truncation)]
                return Ok(Self(number as i32));
            }
        }
        Err(serde::de::Error::custom(
            "zstd compression level must be an integer between -131072 and 22",
        ))
    }
}

impl ZstdCompressionLevel {
    /// Create a new zstd compression level.
    #[must_use]
    pub const fn new(level: zstd_safe::CompressionLevel) -> Self {
        Self(level)
    }

    /// Return the compression level.
    #[must_use]
    pub const fn as_i32(&self) -> zstd_safe::CompressionLevel {
        self.0
    }
}
