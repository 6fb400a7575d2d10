use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Metadata with an id and configuration.
///
/// This is the representation of a compressor or filter in Zarr V2 array metadata.
/// For example:
/// ```json
/// {
///     "id": "zlib",
///     "level": 1
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct MetadataV2 {
    id: String,
    #[serde(flatten)]
    configuration: serde_json::Map<String, serde_json::Value>,
}

impl MetadataV2 {
    /// Create metadata with `id` and an empty configuration.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            configuration: serde_json::Map::default(),
        }
    }

    /// Create metadata with `id` and a serializable `configuration`.
    ///
    /// # Errors
    /// Returns [`serde_json::Error`] if `configuration` does not serialize to a JSON object.
    pub fn new_with_serializable_configuration<TConfiguration: Serialize>(
        id: impl Into<String>,
        configuration: &TConfiguration,
    ) -> Result<Self, serde_json::Error> {
        let configuration = serde_json::to_value(configuration)?;
        match configuration {
            serde_json::Value::Object(configuration) => Ok(Self {
                id: id.into(),
                configuration,
            }),
            _ => Err(serde::ser::Error::custom(
                "the configuration cannot be serialized to a JSON object",
            )),
        }
    }

    /// Return the "id" key.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return the configuration, which includes all fields excluding the "id".
    #[must_use]
    pub fn configuration(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.configuration
    }

    /// Try and convert the configuration to a specific type.
    ///
    /// # Errors
    /// Returns a [`serde_json::Error`] if the configuration cannot be converted.
    pub fn to_configuration<TConfiguration: DeserializeOwned>(
        &self,
    ) -> Result<TConfiguration, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(self.configuration.clone()))
    }
}

impl core::fmt::Display for MetadataV2 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", serde_json::to_string(self).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize)]
    struct LevelConfiguration {
        level: u32,
    }

    #[test]
    fn metadata_v2_configuration() -> Result<(), Box<dyn std::error::Error>> {
        let metadata: MetadataV2 = serde_json::from_str(r#"{"id": "zlib", "level": 3}"#)?;
        assert_eq!(metadata.id(), "zlib");
        assert_eq!(metadata.to_configuration::<LevelConfiguration>()?.level, 3);
        assert_eq!(metadata.to_string(), r#"{"id":"zlib","level":3}"#);

        let metadata =
            MetadataV2::new_with_serializable_configuration("gzip", &LevelConfiguration { level: 9 })?;
        assert_eq!(
            serde_json::to_value(&metadata)?,
            serde_json::json!({"id": "gzip", "level": 9})
        );
        assert!(MetadataV2::new_with_serializable_configuration("x", &1u32).is_err());
        Ok(())
    }
}
