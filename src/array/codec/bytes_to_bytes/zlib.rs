//! The zlib `bytes->bytes` codec.
//!
//! Applies zlib compression.
//!
//! This is the `numcodecs` `zlib` codec, with metadata such as `{"id": "zlib", "level": 1}`.

mod zlib_codec;
mod zlib_configuration;

pub use zlib_codec::ZlibCodec;
pub use zlib_configuration::ZlibCodecConfiguration;
