use std::io::Write;

use zstd::zstd_safe;

use crate::{
    array::codec::{Codec, CodecError, CodecPlugin, CodecTraits},
    metadata::v2::MetadataV2,
    plugin::{PluginCreateError, PluginMetadataInvalidError},
};

use super::{ZstdCodecConfiguration, ZstdCompressionLevel};

const IDENTIFIER: &str = "zstd";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_id_zstd, create_codec_zstd)
}

fn is_id_zstd(id: &str) -> bool {
    id.eq(IDENTIFIER)
}

fn create_codec_zstd(metadata: &MetadataV2) -> Result<Codec, PluginCreateError> {
    let configuration: ZstdCodecConfiguration = metadata
        .to_configuration()
        .map_err(|_| PluginMetadataInvalidError::new(IDENTIFIER, "codec", metadata))?;
    Ok(Codec::new(ZstdCodec::new_with_configuration(&configuration)))
}

/// A `zstd` codec implementation.
#[derive(Clone, Debug)]
pub struct ZstdCodec {
    compression: zstd_safe::CompressionLevel,
    checksum: bool,
}

impl ZstdCodec {
    /// Create a new `zstd` codec.
    #[must_use]
    pub const fn new(compression: zstd_safe::CompressionLevel, checksum: bool) -> Self {
        Self {
            compression,
            checksum,
        }
    }

    /// Create a new `zstd` codec from configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &ZstdCodecConfiguration) -> Self {
        Self {
            compression: configuration.level.as_i32(),
            checksum: configuration.checksum,
        }
    }
}

impl CodecTraits for ZstdCodec {
    fn create_metadata(&self) -> MetadataV2 {
        let configuration = ZstdCodecConfiguration::new(
            ZstdCompressionLevel::new(self.compression),
            self.checksum,
        );
        MetadataV2::new_with_serializable_configuration(IDENTIFIER, &configuration)
            .unwrap_or_else(|_| MetadataV2::new(IDENTIFIER))
    }

    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = zstd::Encoder::new(Vec::new(), self.compression)?;
        encoder.include_checksum(self.checksum)?;
        encoder.write_all(&decoded_value)?;
        Ok(encoder.finish()?)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        zstd::decode_all(encoded_value.as_slice()).map_err(CodecError::IOError)
    }
}
