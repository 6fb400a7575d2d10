use crate::{
    array::codec::{Codec, CodecError, CodecPlugin, CodecTraits},
    metadata::v2::MetadataV2,
    plugin::{PluginCreateError, PluginMetadataInvalidError},
};

use super::{Crc32cCodecConfiguration, Crc32cLocation, CHECKSUM_SIZE, IDENTIFIER};

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_id_crc32c, create_codec_crc32c)
}

fn is_id_crc32c(id: &str) -> bool {
    id.eq(IDENTIFIER)
}

fn create_codec_crc32c(metadata: &MetadataV2) -> Result<Codec, PluginCreateError> {
    let configuration: Crc32cCodecConfiguration = metadata
        .to_configuration()
        .map_err(|_| PluginMetadataInvalidError::new(IDENTIFIER, "codec", metadata))?;
    Ok(Codec::new(Crc32cCodec::new_with_configuration(
        &configuration,
    )))
}

/// A `crc32c` checksum codec implementation.
#[derive(Clone, Debug, Default)]
pub struct Crc32cCodec {
    location: Crc32cLocation,
}

impl Crc32cCodec {
    /// Create a new `crc32c` checksum codec.
    #[must_use]
    pub const fn new(location: Crc32cLocation) -> Self {
        Self { location }
    }

    /// Create a new `crc32c` checksum codec from configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &Crc32cCodecConfiguration) -> Self {
        Self {
            location: configuration.location,
        }
    }
}

impl CodecTraits for Crc32cCodec {
    fn create_metadata(&self) -> MetadataV2 {
        let configuration = Crc32cCodecConfiguration {
            location: self.location,
        };
        MetadataV2::new_with_serializable_configuration(IDENTIFIER, &configuration)
            .unwrap_or_else(|_| MetadataV2::new(IDENTIFIER))
    }

    fn encode(&self, mut decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let checksum = crc32c::crc32c(&decoded_value).to_le_bytes();
        match self.location {
            Crc32cLocation::Start => {
                let mut encoded_value = Vec::with_capacity(decoded_value.len() + CHECKSUM_SIZE);
                encoded_value.extend_from_slice(&checksum);
                encoded_value.extend_from_slice(&decoded_value);
                Ok(encoded_value)
            }
            Crc32cLocation::End => {
                decoded_value.reserve_exact(checksum.len());
                decoded_value.extend(&checksum);
                Ok(decoded_value)
            }
        }
    }

    fn decode(&self, mut encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        if encoded_value.len() < CHECKSUM_SIZE {
            return Err(CodecError::InvalidInputLength(
                encoded_value.len(),
                IDENTIFIER.to_string(),
            ));
        }
        let (checksum, decoded_value) = match self.location {
            Crc32cLocation::Start => {
                let (checksum, decoded_value) = encoded_value.split_at(CHECKSUM_SIZE);
                (checksum, decoded_value)
            }
            Crc32cLocation::End => {
                let (decoded_value, checksum) =
                    encoded_value.split_at(encoded_value.len() - CHECKSUM_SIZE);
                (checksum, decoded_value)
            }
        };
        if crate::config::global_config().validate_checksums()
            && crc32c::crc32c(decoded_value).to_le_bytes().as_slice() != checksum
        {
            return Err(CodecError::InvalidChecksum);
        }
        match self.location {
            Crc32cLocation::Start => {
                encoded_value.drain(..CHECKSUM_SIZE);
            }
            Crc32cLocation::End => {
                encoded_value.truncate(encoded_value.len() - CHECKSUM_SIZE);
            }
        }
        Ok(encoded_value)
    }
}
