use derive_more::Display;

/// A deflate compression level. Used by the `gzip` and `zlib` codecs and by zip archive entries.
///
/// An integer from 0 to 9 which controls the speed and level of compression.
/// A level of 1 is the fastest compression method and produces the least compression, while 9 is slowest and produces the most compression.
/// Compression is turned off completely when level is 0.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub struct DeflateCompressionLevel(u32);

/// An invalid compression level.
#[derive(Debug, thiserror::Error)]
#[error("Invalid compression level {0}, must be 0-9")]
pub struct DeflateCompressionLevelError(pub u32);

impl TryFrom<u32> for DeflateCompressionLevel {
    type Error = DeflateCompressionLevelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value < 10 {
            Ok(Self(value))
        } else {
            Err(DeflateCompressionLevelError(value))
        }
    }
}

impl serde::Serialize for DeflateCompressionLevel {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for DeflateCompressionLevel {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        if let serde_json::Value::Number(level) = value {
            if let Some(level) = level.as_u64().and_then(|level| u32::try_from(level).ok()) {
                if level < 10 {
                    return Ok(Self(level));
                }
            }
        }
        Err(serde::de::Error::custom(
            "compression level must be an integer between 0 and 9.",
        ))
    }
}

impl DeflateCompressionLevel {
    /// The highest compression level.
    pub const MAX: Self = Self(9);

    /// Return the compression level as [`u32`].
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}
