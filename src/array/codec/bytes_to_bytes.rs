//! Bytes to bytes codecs.

#[cfg(feature = "crc32c")]
pub mod crc32c;
#[cfg(feature = "gzip")]
pub mod gzip;
pub mod shuffle;
#[cfg(feature = "zlib")]
pub mod zlib;
#[cfg(feature = "zstd")]
pub mod zstd;

mod deflate_compression_level;

pub use deflate_compression_level::{DeflateCompressionLevel, DeflateCompressionLevelError};
