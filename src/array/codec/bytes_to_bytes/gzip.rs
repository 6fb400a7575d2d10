//! The gzip `bytes->bytes` codec.
//!
//! Applies gzip compression.
//!
//! This is the `numcodecs` `gzip` codec, with metadata such as `{"id": "gzip", "level": 1}`.

mod gzip_codec;
mod gzip_configuration;

pub use gzip_codec::GzipCodec;
pub use gzip_configuration::GzipCodecConfiguration;
