//! The zstd `bytes->bytes` codec.
//!
//! Applies zstd compression.
//!
//! This is the `numcodecs` `zstd` codec, with metadata such as `{"id": "zstd", "level": 1, "checksum": false}`.
//! The `checksum` field is optional and defaults to `false`.

mod zstd_codec;
mod zstd_configuration;

pub use zstd_codec::ZstdCodec;
pub use zstd_configuration::{ZstdCodecConfiguration, ZstdCompressionLevel};
