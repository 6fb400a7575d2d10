use serde_json::Value;

use crate::{
    array::{chunk_key_encoding::V2ChunkKeyEncoding, ChunkShape},
    byte_range::partition_byte_range,
    metadata::v2::{ArrayMetadataV2, ArrayMetadataV2Order, ARRAY_METADATA_KEY},
    storage::StoreKey,
};

use super::{
    reference_store::variable_prefix, BoundChunksError, ChunkPointer, ReferenceStore,
    ReferenceValue,
};

/// Split every chunk of `variable` along `dimension` into `factor` sub-chunks.
///
/// The chunk with grid index `i` at `dimension` becomes the chunks `i * factor + s` for `s` in `0..factor`,
/// and the variable's chunk shape at `dimension` is divided by `factor`.
/// Pointers are partitioned into `factor` contiguous byte ranges of equal length and inline payloads are re-sliced the same way.
/// Sub-chunks that start beyond the end of the array (the padding of an edge chunk) are dropped.
///
/// `refs` is not modified, a new reference store is returned.
///
/// # Errors
/// Returns
///  - [`BoundChunksError::InvalidArgument`] if `dimension` is out of bounds or `factor` does not divide the chunk length,
///  - [`BoundChunksError::UnsupportedLayout`] if the variable is compressed or filtered, or its sub-chunks would not be contiguous byte ranges, or
///  - [`BoundChunksError::MetadataError`] if the metadata is invalid or a chunk payload cannot be partitioned.
pub fn subchunk(
    refs: &ReferenceStore,
    variable: &str,
    dimension: usize,
    factor: u64,
) -> Result<ReferenceStore, BoundChunksError> {
    let metadata = refs.array_metadata(variable)?;
    check_subchunk(&metadata, variable, dimension, factor)?;
    let chunk_length = metadata.chunks[dimension] / factor;
    let array_length = metadata.shape[dimension];

    let prefix = variable_prefix(variable)?;
    let encoding = V2ChunkKeyEncoding::new(metadata.dimension_separator);
    let mut output = refs.clone();
    for (key, indices) in refs.chunk_keys(variable)? {
        let Some(value) = output.remove(&key) else {
            continue;
        };
        let parts = partition_reference(&key, &value, factor)?;
        for (sub_index, part) in (0..factor).zip(parts) {
            let mut sub_indices = indices.clone();
            sub_indices[dimension] = indices[dimension]
                .checked_mul(factor)
                .and_then(|index| index.checked_add(sub_index))
                .ok_or_else(|| {
                    BoundChunksError::MetadataError(format!(
                        "chunk {key} has an index that overflows when split by {factor}"
                    ))
                })?;
            let beyond_array = sub_indices[dimension]
                .checked_mul(chunk_length)
                .map_or(true, |start| start >= array_length);
            if beyond_array {
                break;
            }
            let sub_key = StoreKey::with_prefix(&prefix, &encoding.encode(&sub_indices))?;
            output.insert(sub_key, part);
        }
    }

    let mut chunks = metadata.chunks;
    chunks[dimension] = chunk_length;
    let metadata_key = StoreKey::with_prefix(&prefix, ARRAY_METADATA_KEY)?;
    if let Some(ReferenceValue::Metadata(document)) = refs.get(&metadata_key) {
        let document = replace_chunks(document, &chunks)
            .map_err(|err| BoundChunksError::MetadataError(err.to_string()))?;
        output.insert(metadata_key, ReferenceValue::Metadata(document));
    }
    Ok(output)
}

/// Returns true if splitting `dimension` of a chunk produces sub-chunks that are contiguous in the chunk's memory layout.
///
/// This holds when every dimension that varies slower than `dimension` has a chunk length of one.
pub(super) fn is_contiguous_split(
    chunks: &[u64],
    order: ArrayMetadataV2Order,
    dimension: usize,
) -> bool {
    match order {
        ArrayMetadataV2Order::C => chunks[..dimension].iter().all(|&length| length == 1),
        ArrayMetadataV2Order::F => chunks[dimension + 1..].iter().all(|&length| length == 1),
    }
}

fn check_subchunk(
    metadata: &ArrayMetadataV2,
    variable: &str,
    dimension: usize,
    factor: u64,
) -> Result<(), BoundChunksError> {
    if metadata.is_compressed() || metadata.has_filters() {
        return Err(BoundChunksError::UnsupportedLayout(format!(
            "variable {variable:?} is encoded and its chunks cannot be split without decoding"
        )));
    }
    let Some(&chunk_length) = metadata.chunks.get(dimension) else {
        return Err(BoundChunksError::InvalidArgument(format!(
            "dimension {dimension} is out of bounds for variable {variable:?} with {} dimensions",
            metadata.chunks.len()
        )));
    };
    if factor == 0 || chunk_length % factor != 0 {
        return Err(BoundChunksError::InvalidArgument(format!(
            "factor {factor} does not divide the chunk length {chunk_length} of variable {variable:?}"
        )));
    }
    if !is_contiguous_split(&metadata.chunks, metadata.order, dimension) {
        return Err(BoundChunksError::UnsupportedLayout(format!(
            "splitting dimension {dimension} of variable {variable:?} with chunk shape {:?} would not produce contiguous sub-chunks",
            metadata.chunks
        )));
    }
    Ok(())
}

fn partition_reference(
    key: &StoreKey,
    value: &ReferenceValue,
    factor: u64,
) -> Result<Vec<ReferenceValue>, BoundChunksError> {
    let partition_error = |err: &dyn std::error::Error| {
        BoundChunksError::MetadataError(format!("chunk {key} cannot be split: {err}"))
    };
    match value {
        ReferenceValue::Pointer(pointer) => {
            let Some(length) = pointer.length() else {
                return Err(BoundChunksError::MetadataError(format!(
                    "chunk {key} references the whole of {} with an unknown length",
                    pointer.source()
                )));
            };
            Ok(partition_byte_range(pointer.offset(), length, factor)
                .map_err(|err| partition_error(&err))?
                .into_iter()
                .map(|range| {
                    ReferenceValue::Pointer(ChunkPointer::new(
                        pointer.source(),
                        range.start,
                        range.end - range.start,
                    ))
                })
                .collect())
        }
        ReferenceValue::Inline(bytes) => {
            let length = bytes.len() as u64;
            Ok(partition_byte_range(0, length, factor)
                .map_err(|err| partition_error(&err))?
                .into_iter()
                .map(|range| {
                    // every range lies within bytes, so the conversions are lossless
                    let start = usize::try_from(range.start).unwrap_or(bytes.len());
                    let end = usize::try_from(range.end).unwrap_or(bytes.len());
                    ReferenceValue::Inline(bytes.slice(start..end))
                })
                .collect())
        }
        ReferenceValue::Metadata(_) => Err(BoundChunksError::MetadataError(format!(
            "chunk {key} is a metadata document"
        ))),
    }
}

fn replace_chunks(document: &str, chunks: &ChunkShape) -> Result<String, serde_json::Error> {
    let mut document: Value = serde_json::from_str(document)?;
    if let Value::Object(fields) = &mut document {
        fields.insert("chunks".to_string(), Value::from(chunks.clone()));
    }
    serde_json::to_string(&document)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn refs_1d(compressor: &str, order: &str) -> ReferenceStore {
        ReferenceStore::from_json(&format!(
            r#"{{
                "version": 1,
                "refs": {{
                    "x/.zarray": "{{\"shape\": [10], \"chunks\": [8], \"dtype\": \"<u2\", \"compressor\": {compressor}, \"fill_value\": 0, \"order\": \"{order}\", \"filters\": null, \"zarr_format\": 2}}",
                    "x/0": ["data.bin", 0, 16],
                    "x/1": "base64:AAEBAQIBAwEEAQUBBgEHAQ=="
                }}
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn subchunk_1d() -> Result<(), Box<dyn std::error::Error>> {
        let refs = refs_1d("null", "C");
        let split = subchunk(&refs, "x", 0, 4)?;
        assert_eq!(split.array_metadata("x")?.chunks, vec![2]);
        // x/0 covers elements 0..8, x/1 covers 8..16 of which only 8..10 are in bounds
        let keys: Vec<String> = split
            .chunk_keys("x")?
            .into_iter()
            .map(|(key, _)| key.to_string())
            .collect();
        assert_eq!(keys, vec!["x/0", "x/1", "x/2", "x/3", "x/4"]);
        assert_eq!(
            split.get(&"x/2".try_into()?),
            Some(&ReferenceValue::Pointer(ChunkPointer::new("data.bin", 8, 4)))
        );
        assert_eq!(
            split.get(&"x/4".try_into()?),
            Some(&ReferenceValue::Inline(Bytes::from_static(&[0, 1, 1, 1])))
        );
        // the input is unchanged
        assert_eq!(refs, refs_1d("null", "C"));
        Ok(())
    }

    #[test]
    fn subchunk_errors() {
        let refs = refs_1d("null", "C");
        assert!(matches!(
            subchunk(&refs, "x", 0, 3),
            Err(BoundChunksError::InvalidArgument(_))
        ));
        assert!(matches!(
            subchunk(&refs, "x", 1, 2),
            Err(BoundChunksError::InvalidArgument(_))
        ));
        assert!(matches!(
            subchunk(&refs, "y", 0, 2),
            Err(BoundChunksError::MetadataError(_))
        ));
        let refs = refs_1d(r#"{\"id\": \"zlib\", \"level\": 1}"#, "C");
        assert!(matches!(
            subchunk(&refs, "x", 0, 2),
            Err(BoundChunksError::UnsupportedLayout(_))
        ));
    }

    #[test]
    fn subchunk_2d_contiguity() -> Result<(), Box<dyn std::error::Error>> {
        let refs = ReferenceStore::from_json(
            r#"{
                "version": 1,
                "refs": {
                    "v/.zarray": "{\"shape\": [4, 6], \"chunks\": [2, 6], \"dtype\": \"|u1\", \"compressor\": null, \"order\": \"C\", \"dimension_separator\": \"/\", \"zarr_format\": 2}",
                    "v/0/0": ["f", 0, 12],
                    "v/1/0": ["f", 12, 12]
                }
            }"#,
        )?;
        // dimension 1 varies fastest, splitting it produces strided sub-chunks
        assert!(matches!(
            subchunk(&refs, "v", 1, 2),
            Err(BoundChunksError::UnsupportedLayout(_))
        ));
        let split = subchunk(&refs, "v", 0, 2)?;
        assert_eq!(split.array_metadata("v")?.chunks, vec![1, 6]);
        assert_eq!(
            split.get(&"v/3/0".try_into()?),
            Some(&ReferenceValue::Pointer(ChunkPointer::new("f", 18, 6)))
        );
        let split = subchunk(&split, "v", 1, 3)?;
        assert_eq!(split.array_metadata("v")?.chunks, vec![1, 2]);
        assert_eq!(split.chunk_keys("v")?.len(), 12);
        assert_eq!(
            split.get(&"v/3/2".try_into()?),
            Some(&ReferenceValue::Pointer(ChunkPointer::new("f", 22, 2)))
        );
        Ok(())
    }

    #[test]
    fn subchunk_whole_source_pointer() {
        let refs = ReferenceStore::from_json(
            r#"{"version": 1, "refs": {
                "x/.zarray": "{\"shape\": [4], \"chunks\": [4], \"dtype\": \"|u1\", \"compressor\": null, \"zarr_format\": 2}",
                "x/0": ["f"]
            }}"#,
        )
        .unwrap();
        assert!(matches!(
            subchunk(&refs, "x", 0, 2),
            Err(BoundChunksError::MetadataError(_))
        ));
    }

    #[test]
    fn subchunk_overflow() {
        let refs = ReferenceStore::from_json(
            r#"{"version": 1, "refs": {
                "x/.zarray": "{\"shape\": [4], \"chunks\": [4], \"dtype\": \"|u1\", \"compressor\": null, \"zarr_format\": 2}",
                "x/18446744073709551615": ["f", 0, 4]
            }}"#,
        )
        .unwrap();
        assert!(matches!(
            subchunk(&refs, "x", 0, 2),
            Err(BoundChunksError::MetadataError(_))
        ));

        let refs = ReferenceStore::from_json(
            r#"{"version": 1, "refs": {
                "x/.zarray": "{\"shape\": [4], \"chunks\": [4], \"dtype\": \"|u1\", \"compressor\": null, \"zarr_format\": 2}",
                "x/0": ["f", 18446744073709551614, 4]
            }}"#,
        )
        .unwrap();
        assert!(matches!(
            subchunk(&refs, "x", 0, 2),
            Err(BoundChunksError::MetadataError(_))
        ));
    }

    #[test]
    fn contiguous_split() {
        assert!(is_contiguous_split(&[1, 1, 8], ArrayMetadataV2Order::C, 2));
        assert!(!is_contiguous_split(&[2, 1, 8], ArrayMetadataV2Order::C, 2));
        assert!(is_contiguous_split(&[8, 1, 1], ArrayMetadataV2Order::F, 0));
        assert!(!is_contiguous_split(&[8, 2, 1], ArrayMetadataV2Order::F, 0));
    }
}
