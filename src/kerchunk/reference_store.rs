use std::collections::BTreeMap;

use base64::{prelude::BASE64_STANDARD, Engine};
use bytes::Bytes;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    array::{chunk_key_encoding::V2ChunkKeyEncoding, ArrayIndices},
    byte_range::{ByteLength, ByteOffset},
    metadata::v2::{is_metadata_key_name, ArrayMetadataV2, ArrayMetadataV2Error, ARRAY_METADATA_KEY},
    storage::{StoreKey, StoreKeyError, StorePrefix},
};

const BASE64_PREFIX: &str = "base64:";

/// A pointer to a byte range of an external source, such as a file or an object in a bucket.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkPointer {
    source: String,
    offset: ByteOffset,
    length: Option<ByteLength>,
}

impl ChunkPointer {
    /// Create a pointer to `length` bytes at `offset` of `source`.
    #[must_use]
    pub fn new(source: impl Into<String>, offset: ByteOffset, length: ByteLength) -> Self {
        Self {
            source: source.into(),
            offset,
            length: Some(length),
        }
    }

    /// Create a pointer to the whole of `source`.
    #[must_use]
    pub fn new_whole(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            offset: 0,
            length: None,
        }
    }

    /// The source identifier (usually a URL, possibly containing `{{template}}` references).
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The byte offset into the source.
    #[must_use]
    pub const fn offset(&self) -> ByteOffset {
        self.offset
    }

    /// The byte length, or [`None`] if the pointer references the whole source.
    #[must_use]
    pub const fn length(&self) -> Option<ByteLength> {
        self.length
    }
}

/// A reference store value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReferenceValue {
    /// A metadata document such as `.zarray`, `.zgroup`, or `.zattrs`.
    Metadata(String),
    /// Inline bytes.
    Inline(Bytes),
    /// A byte range of an external source.
    Pointer(ChunkPointer),
}

/// A reference store error.
#[derive(Debug, Error)]
pub enum ReferenceStoreError {
    /// The reference document is not valid JSON.
    #[error(transparent)]
    InvalidJSON(#[from] serde_json::Error),
    /// The reference document has an unsupported version.
    #[error("unsupported reference store version {_0}")]
    UnsupportedVersion(Value),
    /// The reference document does not have a `refs` object.
    #[error("reference store version 1 must have a refs object")]
    MissingRefs,
    /// A reference key is invalid.
    #[error(transparent)]
    InvalidKey(#[from] StoreKeyError),
    /// A reference value is invalid.
    #[error("invalid reference for key {_0}: {_1}")]
    InvalidValue(String, String),
    /// A variable path is invalid.
    #[error("invalid variable path {_0:?}")]
    InvalidVariable(String),
    /// A variable has no `.zarray` metadata.
    #[error("variable {_0:?} has no array metadata")]
    MissingArrayMetadata(String),
    /// The `.zarray` metadata of a variable is invalid.
    #[error("variable {_0:?} has invalid array metadata: {_1}")]
    InvalidArrayMetadata(String, ArrayMetadataV2Error),
}

/// A kerchunk reference store.
///
/// A reference store maps store keys to [`ReferenceValue`]s:
/// metadata documents, inline bytes, or pointers into external byte sources.
///
/// It serialises to the kerchunk version 1 JSON format:
/// ```json
/// {
///     "version": 1,
///     "templates": {"u": "s3://bucket/data.nc"},
///     "refs": {
///         ".zgroup": "{\"zarr_format\": 2}",
///         "x/.zarray": "{\"shape\": [8], ...}",
///         "x/0": ["{{u}}", 1024, 64],
///         "y/0": "base64:AAECAw=="
///     }
/// }
/// ```
/// The version 0 format (a bare `refs` object) is also accepted by [`ReferenceStore::from_json`].
/// Templates and generators are preserved but never expanded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferenceStore {
    refs: BTreeMap<StoreKey, ReferenceValue>,
    templates: Map<String, Value>,
    generators: Option<Value>,
}

impl ReferenceStore {
    /// Create an empty reference store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a reference store from kerchunk JSON.
    ///
    /// # Errors
    /// Returns a [`ReferenceStoreError`] if the document is not valid kerchunk JSON.
    pub fn from_json(json: &str) -> Result<Self, ReferenceStoreError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Parse a reference store from kerchunk JSON bytes.
    ///
    /// # Errors
    /// Returns a [`ReferenceStoreError`] if the document is not valid kerchunk JSON.
    pub fn from_slice(json: &[u8]) -> Result<Self, ReferenceStoreError> {
        Self::from_value(serde_json::from_slice(json)?)
    }

    fn from_value(value: Value) -> Result<Self, ReferenceStoreError> {
        let Value::Object(mut document) = value else {
            return Err(ReferenceStoreError::MissingRefs);
        };
        let (refs, templates, generators) = match document.get("version") {
            Some(Value::Number(version)) if version.as_u64() == Some(1) => {
                let Some(Value::Object(refs)) = document.remove("refs") else {
                    return Err(ReferenceStoreError::MissingRefs);
                };
                let templates = match document.remove("templates") {
                    Some(Value::Object(templates)) => templates,
                    _ => Map::new(),
                };
                (refs, templates, document.remove("gen"))
            }
            Some(version) => {
                return Err(ReferenceStoreError::UnsupportedVersion(version.clone()));
            }
            None => (document, Map::new(), None),
        };

        let refs = refs
            .into_iter()
            .map(|(key, value)| {
                let key = StoreKey::new(key)?;
                let value = parse_reference_value(&key, value)?;
                Ok((key, value))
            })
            .collect::<Result<_, ReferenceStoreError>>()?;
        Ok(Self {
            refs,
            templates,
            generators,
        })
    }

    /// Serialise the reference store to a kerchunk version 1 JSON value.
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        let refs: Map<String, Value> = self
            .refs
            .iter()
            .map(|(key, value)| (key.to_string(), reference_value_to_json(value)))
            .collect();
        let mut document = Map::new();
        document.insert("version".to_string(), Value::from(1));
        if !self.templates.is_empty() {
            document.insert(
                "templates".to_string(),
                Value::Object(self.templates.clone()),
            );
        }
        if let Some(generators) = &self.generators {
            document.insert("gen".to_string(), generators.clone());
        }
        document.insert("refs".to_string(), Value::Object(refs));
        Value::Object(document)
    }

    /// Serialise the reference store to kerchunk version 1 JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Returns the number of references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Returns true if the store has no references.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Get the reference at `key`.
    #[must_use]
    pub fn get(&self, key: &StoreKey) -> Option<&ReferenceValue> {
        self.refs.get(key)
    }

    /// Insert a reference, returning the previous reference at `key` if any.
    pub fn insert(&mut self, key: StoreKey, value: ReferenceValue) -> Option<ReferenceValue> {
        self.refs.insert(key, value)
    }

    /// Remove the reference at `key`.
    pub fn remove(&mut self, key: &StoreKey) -> Option<ReferenceValue> {
        self.refs.remove(key)
    }

    /// Iterate over the references in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&StoreKey, &ReferenceValue)> {
        self.refs.iter()
    }

    /// The URL templates.
    #[must_use]
    pub fn templates(&self) -> &Map<String, Value> {
        &self.templates
    }

    /// Returns the paths of all variables (arrays) in the store, in key order.
    ///
    /// A variable is identified by the parent path of a `.zarray` key.
    /// An array at the root of the store has the path `""`.
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        self.refs
            .keys()
            .filter(|key| key.file_name() == ARRAY_METADATA_KEY)
            .map(|key| variable_name(&key.parent()))
            .collect()
    }

    /// Parse the `.zarray` metadata of `variable`.
    ///
    /// # Errors
    /// Returns a [`ReferenceStoreError`] if the metadata is missing, not a metadata document, or invalid.
    pub fn array_metadata(&self, variable: &str) -> Result<ArrayMetadataV2, ReferenceStoreError> {
        let key = array_metadata_key(variable)?;
        match self.refs.get(&key) {
            Some(ReferenceValue::Metadata(metadata)) => {
                ArrayMetadataV2::from_slice(metadata.as_bytes()).map_err(|err| {
                    ReferenceStoreError::InvalidArrayMetadata(variable.to_string(), err)
                })
            }
            Some(_) => Err(ReferenceStoreError::InvalidValue(
                key.to_string(),
                "array metadata must be a JSON document".to_string(),
            )),
            None => Err(ReferenceStoreError::MissingArrayMetadata(
                variable.to_string(),
            )),
        }
    }

    /// Returns the chunk keys of `variable` and their chunk grid indices, in key order.
    ///
    /// # Errors
    /// Returns a [`ReferenceStoreError`] if the array metadata of `variable` is missing or invalid.
    pub fn chunk_keys(
        &self,
        variable: &str,
    ) -> Result<Vec<(StoreKey, ArrayIndices)>, ReferenceStoreError> {
        let metadata = self.array_metadata(variable)?;
        let prefix = variable_prefix(variable)?;
        let encoding = V2ChunkKeyEncoding::new(metadata.dimension_separator);
        Ok(self
            .refs
            .keys()
            .filter(|key| key.has_prefix(&prefix))
            .filter_map(|key| {
                let name = &key.as_str()[prefix.as_str().len()..];
                encoding
                    .decode(name, metadata.shape.len())
                    .map(|indices| (key.clone(), indices))
            })
            .collect())
    }
}

pub(crate) fn variable_prefix(variable: &str) -> Result<StorePrefix, ReferenceStoreError> {
    if variable.is_empty() {
        Ok(StorePrefix::root())
    } else {
        StorePrefix::new(format!("{variable}/"))
            .map_err(|_| ReferenceStoreError::InvalidVariable(variable.to_string()))
    }
}

fn array_metadata_key(variable: &str) -> Result<StoreKey, ReferenceStoreError> {
    Ok(StoreKey::with_prefix(
        &variable_prefix(variable)?,
        ARRAY_METADATA_KEY,
    )?)
}

fn variable_name(prefix: &StorePrefix) -> String {
    prefix
        .as_str()
        .strip_suffix('/')
        .unwrap_or_default()
        .to_string()
}

fn parse_reference_value(key: &StoreKey, value: Value) -> Result<ReferenceValue, ReferenceStoreError> {
    let invalid = |reason: &str| ReferenceStoreError::InvalidValue(key.to_string(), reason.to_string());
    let is_metadata = is_metadata_key_name(key.file_name());
    match value {
        Value::String(string) if is_metadata => Ok(ReferenceValue::Metadata(string)),
        Value::String(string) => {
            if let Some(encoded) = string.strip_prefix(BASE64_PREFIX) {
                let bytes = BASE64_STANDARD
                    .decode(encoded)
                    .map_err(|err| invalid(&err.to_string()))?;
                Ok(ReferenceValue::Inline(Bytes::from(bytes)))
            } else {
                Ok(ReferenceValue::Inline(Bytes::from(string.into_bytes())))
            }
        }
        Value::Array(pointer) => {
            let source = match pointer.first() {
                Some(Value::String(source)) => source.clone(),
                _ => return Err(invalid("the pointer source must be a string")),
            };
            match pointer.as_slice() {
                [_] => Ok(ReferenceValue::Pointer(ChunkPointer::new_whole(source))),
                [_, offset, length] => {
                    let (Some(offset), Some(length)) = (offset.as_u64(), length.as_u64()) else {
                        return Err(invalid(
                            "the pointer offset and length must be non-negative integers",
                        ));
                    };
                    Ok(ReferenceValue::Pointer(ChunkPointer::new(
                        source, offset, length,
                    )))
                }
                _ => Err(invalid("a pointer must be [source] or [source, offset, length]")),
            }
        }
        Value::Object(_) if is_metadata => Ok(ReferenceValue::Metadata(value.to_string())),
        _ => Err(invalid("expected a string or a pointer")),
    }
}

fn reference_value_to_json(value: &ReferenceValue) -> Value {
    match value {
        ReferenceValue::Metadata(metadata) => Value::String(metadata.clone()),
        ReferenceValue::Inline(bytes) => match std::str::from_utf8(bytes) {
            Ok(string) if !string.starts_with(BASE64_PREFIX) => Value::String(string.to_string()),
            _ => Value::String(format!("{BASE64_PREFIX}{}", BASE64_STANDARD.encode(bytes))),
        },
        ReferenceValue::Pointer(pointer) => match pointer.length {
            Some(length) => Value::Array(vec![
                Value::String(pointer.source.clone()),
                Value::from(pointer.offset),
                Value::from(length),
            ]),
            None => Value::Array(vec![Value::String(pointer.source.clone())]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFS_V1: &str = r#"{
        "version": 1,
        "templates": {"u": "s3://bucket/data.bin"},
        "refs": {
            ".zgroup": "{\"zarr_format\": 2}",
            "x/.zarray": "{\"shape\": [8], \"chunks\": [4], \"dtype\": \"<i2\", \"compressor\": null, \"fill_value\": 0, \"order\": \"C\", \"filters\": null, \"zarr_format\": 2}",
            "x/.zattrs": {"_ARRAY_DIMENSIONS": ["t"]},
            "x/0": ["{{u}}", 100, 8],
            "x/1": "base64:AAECAwQFBgc=",
            "g/y/.zarray": "{\"shape\": [], \"chunks\": [], \"dtype\": \"|u1\", \"compressor\": null, \"zarr_format\": 2}",
            "g/y/0": "a",
            "whole": ["s3://bucket/other.bin"]
        }
    }"#;

    #[test]
    fn reference_store_v1() -> Result<(), Box<dyn std::error::Error>> {
        let refs = ReferenceStore::from_json(REFS_V1)?;
        assert_eq!(refs.len(), 8);
        assert_eq!(refs.templates().get("u"), Some(&Value::from("s3://bucket/data.bin")));
        assert_eq!(refs.variables(), vec!["g/y".to_string(), "x".to_string()]);
        assert_eq!(
            refs.get(&"x/0".try_into()?),
            Some(&ReferenceValue::Pointer(ChunkPointer::new("{{u}}", 100, 8)))
        );
        assert_eq!(
            refs.get(&"x/1".try_into()?),
            Some(&ReferenceValue::Inline(Bytes::from_static(&[0, 1, 2, 3, 4, 5, 6, 7])))
        );
        assert_eq!(
            refs.get(&"whole".try_into()?),
            Some(&ReferenceValue::Pointer(ChunkPointer::new_whole("s3://bucket/other.bin")))
        );
        assert!(matches!(
            refs.get(&"x/.zattrs".try_into()?),
            Some(ReferenceValue::Metadata(_))
        ));

        let chunk_keys = refs.chunk_keys("x")?;
        assert_eq!(
            chunk_keys,
            vec![("x/0".try_into()?, vec![0]), ("x/1".try_into()?, vec![1])]
        );
        assert_eq!(refs.chunk_keys("g/y")?, vec![("g/y/0".try_into()?, vec![])]);
        assert!(matches!(
            refs.chunk_keys("z"),
            Err(ReferenceStoreError::MissingArrayMetadata(_))
        ));
        Ok(())
    }

    #[test]
    fn reference_store_json_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let refs = ReferenceStore::from_json(REFS_V1)?;
        let json = refs.to_json_value();
        assert_eq!(json["version"], Value::from(1));
        assert_eq!(json["refs"]["x/0"], serde_json::json!(["{{u}}", 100, 8]));
        assert_eq!(json["refs"]["x/1"], Value::from("base64:AAECAwQFBgc="));
        assert_eq!(json["refs"]["g/y/0"], Value::from("a"));
        assert_eq!(json["refs"]["whole"], serde_json::json!(["s3://bucket/other.bin"]));
        assert_eq!(ReferenceStore::from_json(&refs.to_json())?, refs);
        Ok(())
    }

    #[test]
    fn reference_store_v0() -> Result<(), Box<dyn std::error::Error>> {
        let refs = ReferenceStore::from_json(r#"{".zgroup": "{\"zarr_format\": 2}", "a/0": ["f", 0, 4]}"#)?;
        assert_eq!(refs.len(), 2);
        assert!(refs.variables().is_empty());
        Ok(())
    }

    #[test]
    fn reference_store_invalid() {
        assert!(matches!(
            ReferenceStore::from_json(r#"{"version": 2, "refs": {}}"#),
            Err(ReferenceStoreError::UnsupportedVersion(_))
        ));
        assert!(matches!(
            ReferenceStore::from_json(r#"{"version": 1}"#),
            Err(ReferenceStoreError::MissingRefs)
        ));
        assert!(matches!(
            ReferenceStore::from_json(r#"{"version": 1, "refs": {"a/0": ["f", -1, 4]}}"#),
            Err(ReferenceStoreError::InvalidValue(_, _))
        ));
        assert!(matches!(
            ReferenceStore::from_json(r#"{"version": 1, "refs": {"a/0": 5}}"#),
            Err(ReferenceStoreError::InvalidValue(_, _))
        ));
        assert!(matches!(
            ReferenceStore::from_json(r#"{"version": 1, "refs": {"a/": "x"}}"#),
            Err(ReferenceStoreError::InvalidKey(_))
        ));
        assert!(ReferenceStore::from_json("[]").is_err());
        assert!(ReferenceStore::from_json("{").is_err());
    }
}
