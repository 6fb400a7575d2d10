//! The shuffle `bytes->bytes` codec.
//!
//! Reorders the bytes of fixed size elements so that the first byte of every element is stored first, then the second byte of every element, and so on.
//! Trailing bytes that do not form a whole element are stored unchanged at the end.
//! This is a filter which typically improves the compression ratio of a subsequent compressor.
//!
//! This is the `numcodecs` `shuffle` codec, with metadata such as `{"id": "shuffle", "elementsize": 4}`.

mod shuffle_codec;
mod shuffle_configuration;

pub use shuffle_codec::ShuffleCodec;
pub use shuffle_configuration::ShuffleCodecConfiguration;
