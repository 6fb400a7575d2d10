//! The `crc32c` checksum `bytes->bytes` codec.
//!
//! Stores a CRC32C checksum of the decoded bytes alongside them, either before (`"start"`) or after (`"end"`) the data.
//! The checksum is a little endian `u32`.
//! Validation on decode can be disabled with the [validate checksums](crate::config::Config#validate-checksums) global option.
//!
//! This is the `numcodecs` `crc32c` codec, with metadata such as `{"id": "crc32c", "location": "start"}`.

mod crc32c_codec;
mod crc32c_configuration;

pub use crc32c_codec::Crc32cCodec;
pub use crc32c_configuration::{Crc32cCodecConfiguration, Crc32cLocation};

const IDENTIFIER: &str = "crc32c";

const CHECKSUM_SIZE: usize = core::mem::size_of::<u32>();
