use std::num::NonZeroUsize;

use crate::{
    array::codec::{Codec, CodecError, CodecPlugin, CodecTraits},
    metadata::v2::MetadataV2,
    plugin::{PluginCreateError, PluginMetadataInvalidError},
};

use super::ShuffleCodecConfiguration;

const IDENTIFIER: &str = "shuffle";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_id_shuffle, create_codec_shuffle)
}

fn is_id_shuffle(id: &str) -> bool {
    id.eq(IDENTIFIER)
}

fn create_codec_shuffle(metadata: &MetadataV2) -> Result<Codec, PluginCreateError> {
    let configuration: ShuffleCodecConfiguration = metadata
        .to_configuration()
        .map_err(|_| PluginMetadataInvalidError::new(IDENTIFIER, "codec", metadata))?;
    Ok(Codec::new(ShuffleCodec::new_with_configuration(
        &configuration,
    )))
}

/// A `shuffle` codec implementation.
#[derive(Clone, Debug)]
pub struct ShuffleCodec {
    element_size: NonZeroUsize,
}

impl ShuffleCodec {
    /// Create a new `shuffle` codec for elements of `element_size` bytes.
    ///
    /// An `element_size` of zero is treated as one, which leaves bytes unchanged.
    #[must_use]
    pub fn new(element_size: usize) -> Self {
        Self {
            element_size: NonZeroUsize::new(element_size).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Create a new `shuffle` codec from configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &ShuffleCodecConfiguration) -> Self {
        Self {
            element_size: configuration.elementsize,
        }
    }
}

impl CodecTraits for ShuffleCodec {
    fn create_metadata(&self) -> MetadataV2 {
        let configuration = ShuffleCodecConfiguration {
            elementsize: self.element_size,
        };
        MetadataV2::new_with_serializable_configuration(IDENTIFIER, &configuration)
            .unwrap_or_else(|_| MetadataV2::new(IDENTIFIER))
    }

    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let element_size = self.element_size.get();
        let count = decoded_value.len() / element_size;
        if element_size == 1 || count <= 1 {
            return Ok(decoded_value);
        }
        let mut encoded_value = vec![0; decoded_value.len()];
        for (i, element) in decoded_value.chunks_exact(element_size).enumerate() {
            for (j, byte) in element.iter().enumerate() {
                encoded_value[j * count + i] = *byte;
            }
        }
        let tail = count * element_size;
        encoded_value[tail..].copy_from_slice(&decoded_value[tail..]);
        Ok(encoded_value)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let element_size = self.element_size.get();
        let count = encoded_value.len() / element_size;
        if element_size == 1 || count <= 1 {
            return Ok(encoded_value);
        }
        let mut decoded_value = vec![0; encoded_value.len()];
        for (i, element) in decoded_value.chunks_exact_mut(element_size).enumerate() {
            for (j, byte) in element.iter_mut().enumerate() {
                *byte = encoded_value[j * count + i];
            }
        }
        let tail = count * element_size;
        decoded_value[tail..].copy_from_slice(&encoded_value[tail..]);
        Ok(decoded_value)
    }
}
