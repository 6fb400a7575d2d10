use std::io::{Cursor, Read};

use flate2::bufread::{ZlibDecoder, ZlibEncoder};

use crate::{
    array::codec::{
        Codec, CodecError, CodecPlugin, CodecTraits, DeflateCompressionLevel,
        DeflateCompressionLevelError,
    },
    metadata::v2::MetadataV2,
    plugin::{PluginCreateError, PluginMetadataInvalidError},
};

use super::ZlibCodecConfiguration;

const IDENTIFIER: &str = "zlib";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_id_zlib, create_codec_zlib)
}

fn is_id_zlib(id: &str) -> bool {
    id.eq(IDENTIFIER)
}

fn create_codec_zlib(metadata: &MetadataV2) -> Result<Codec, PluginCreateError> {
    let configuration: ZlibCodecConfiguration = metadata
        .to_configuration()
        .map_err(|_| PluginMetadataInvalidError::new(IDENTIFIER, "codec", metadata))?;
    Ok(Codec::new(ZlibCodec::new_with_configuration(&configuration)))
}

/// A `zlib` codec implementation.
#[derive(Clone, Debug)]
pub struct ZlibCodec {
    compression_level: DeflateCompressionLevel,
}

impl ZlibCodec {
    /// Create a new `zlib` codec.
    ///
    /// # Errors
    /// Returns [`DeflateCompressionLevelError`] if `compression_level` is not valid.
    pub fn new(compression_level: u32) -> Result<Self, DeflateCompressionLevelError> {
        let compression_level: DeflateCompressionLevel = compression_level.try_into()?;
        Ok(Self { compression_level })
    }

    /// Create a new `zlib` codec from configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &ZlibCodecConfiguration) -> Self {
        Self {
            compression_level: configuration.level,
        }
    }
}

impl CodecTraits for ZlibCodec {
    fn create_metadata(&self) -> MetadataV2 {
        let configuration = ZlibCodecConfiguration {
            level: self.compression_level,
        };
        MetadataV2::new_with_serializable_configuration(IDENTIFIER, &configuration)
            .unwrap_or_else(|_| MetadataV2::new(IDENTIFIER))
    }

    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = ZlibEncoder::new(
            Cursor::new(decoded_value),
            flate2::Compression::new(self.compression_level.as_u32()),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut decoder = ZlibDecoder::new(Cursor::new(encoded_value));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
