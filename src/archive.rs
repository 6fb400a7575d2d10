//! Zarr V2 zip archiving of in-memory datasets.
//!
//! [`archive`] writes a [`Dataset`] to a create-only `.zarr.zip` archive in an [`ArchiveDestination`]:
//!  1. the archive name is normalised with [`normalise_archive_name`],
//!  2. every variable is encoded with its codec chain (see [`CompressorSpec`]) into a staging [`MemoryStore`], in parallel,
//!  3. the destination archive is created exclusively, and
//!  4. each staged key is copied verbatim into the archive as a zip entry, in key order.
//!
//! Nothing is written to the destination if encoding fails.
//! If copying fails or is [cancelled](Cancellation), the partially written archive is discarded (see [`ArchiveOptions`]) so that a later attempt with the same name can succeed.
//!
//! The archive is a consolidated Zarr V2 group readable by `zarr-python` and `xarray`.
//! [`read_dataset`] reads it back, e.g. from a [`ZipStore`](crate::storage::store::ZipStore).
//!
//! ```
//! # use zarrs_kerchunk::archive::{archive, read_dataset, CompressorSpec, Dataset, MemoryDestination, Variable};
//! # use zarrs_kerchunk::storage::store::ZipStore;
//! let mut dataset = Dataset::new();
//! dataset.add_variable(
//!     "t",
//!     Variable::from_elements(vec![2, 3], &[0.0f32, 0.5, 1.0, 1.5, 2.0, 2.5])?.with_chunk_shape(vec![1, 2]),
//! )?;
//! let compressor: CompressorSpec = serde_json::from_str(r#"{"id": "zlib", "level": 5}"#)?;
//!
//! let destination = MemoryDestination::new();
//! let name = archive(&dataset, &destination, "t", &compressor, 0)?;
//! assert_eq!(name, "t.zarr.zip");
//!
//! let store = ZipStore::new(std::io::Cursor::new(destination.get(&name).unwrap()))?;
//! let read = read_dataset(&store)?;
//! assert_eq!(read.variable("t").unwrap().to_elements::<f32>()?, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

mod archive_name;
mod archive_sink;
mod cancellation;
mod compressor_spec;
mod dataset;
mod destination;

pub use archive_name::{normalise_archive_name, ZARR_ZIP_SUFFIX};
pub use cancellation::Cancellation;
pub use compressor_spec::{CodecSpec, CompressorSpec};
pub use dataset::{Dataset, Variable, ARRAY_DIMENSIONS_ATTRIBUTE};
pub use destination::{ArchiveDestination, FilesystemDestination, MemoryDestination, MemoryWriter};

use std::collections::BTreeMap;

use bytes::Bytes;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;
use thiserror::Error;
use zip::result::ZipError;

use crate::{
    array::{
        chunk_grid_indices, chunk_grid_shape,
        chunk_key_encoding::V2ChunkKeyEncoding,
        codec::{CodecChain, CodecError, DeflateCompressionLevel},
        ChunkShape,
    },
    array_subset::ArraySubset,
    config::global_config,
    metadata::v2::{
        ArrayMetadataV2, ArrayMetadataV2Order, ConsolidatedMetadataV2, GroupMetadataV2,
        ARRAY_METADATA_KEY, ATTRIBUTES_KEY, CONSOLIDATED_METADATA_KEY, GROUP_METADATA_KEY,
    },
    storage::{
        store::MemoryStore, ListableStorageTraits, ReadableListableStorageTraits, ReadableStorageTraits, StorageError,
        StoreKey, StorePrefix, WritableStorageTraits,
    },
};

use archive_sink::ArchiveSink;
use dataset::chunk_num_bytes;

/// An archive error.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An argument is invalid.
    #[error("invalid argument: {_0}")]
    InvalidArgument(String),
    /// The destination already has an archive with the same name.
    #[error("archive {_0} already exists")]
    DestinationExists(String),
    /// A chunk could not be encoded.
    #[error("failed to encode a chunk: {_0}")]
    EncodeFailure(#[source] CodecError),
    /// A chunk could not be decoded.
    #[error("failed to decode a chunk: {_0}")]
    DecodeFailure(#[source] CodecError),
    /// An IO error.
    #[error(transparent)]
    IOFailure(std::io::Error),
    /// A zip error.
    #[error(transparent)]
    Zip(ZipError),
    /// A storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Archive metadata is missing, malformed, or unsupported.
    #[error("metadata error: {_0}")]
    Metadata(String),
    /// The archive was cancelled, or its consumer disconnected.
    #[error("the archive was cancelled")]
    Cancelled,
    /// An internal invariant was violated.
    #[error("internal consistency error: {_0}")]
    InternalConsistency(String),
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::BrokenPipe | ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset => {
                log::debug!("archive consumer disconnected: {err}");
                Self::Cancelled
            }
            _ => Self::IOFailure(err),
        }
    }
}

impl From<ZipError> for ArchiveError {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::Io(err) => err.into(),
            err => Self::Zip(err),
        }
    }
}

/// Options for [`archive_with_options`].
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    concurrent_limit: usize,
    discard_partial_archives: bool,
    cancellation: Option<Cancellation>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        let config = global_config();
        Self {
            concurrent_limit: config.codec_concurrent_limit(),
            discard_partial_archives: config.discard_partial_archives(),
            cancellation: None,
        }
    }
}

impl ArchiveOptions {
    /// Create a new archive options builder.
    #[must_use]
    pub fn builder() -> ArchiveOptionsBuilder {
        ArchiveOptionsBuilder::new()
    }

    /// Return the maximum number of variables encoded concurrently.
    #[must_use]
    pub fn concurrent_limit(&self) -> usize {
        self.concurrent_limit
    }

    /// Returns true if a partially written archive is discarded on failure.
    #[must_use]
    pub fn discard_partial_archives(&self) -> bool {
        self.discard_partial_archives
    }

    /// Return the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(Cancellation::is_cancelled)
    }
}

/// Builder for [`ArchiveOptions`].
#[derive(Debug, Clone)]
pub struct ArchiveOptionsBuilder {
    options: ArchiveOptions,
}

impl Default for ArchiveOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveOptionsBuilder {
    /// Create a new archive options builder, initialised from the [global configuration](crate::config::Config).
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: ArchiveOptions::default(),
        }
    }

    /// Build into archive options.
    #[must_use]
    pub fn build(&self) -> ArchiveOptions {
        self.options.clone()
    }

    /// Set the maximum number of variables encoded concurrently.
    ///
    /// The limit is disabled if set to zero.
    #[must_use]
    pub fn concurrent_limit(mut self, concurrent_limit: usize) -> Self {
        self.options.concurrent_limit = concurrent_limit;
        self
    }

    /// Set whether a partially written archive is discarded on failure.
    #[must_use]
    pub fn discard_partial_archives(mut self, discard_partial_archives: bool) -> Self {
        self.options.discard_partial_archives = discard_partial_archives;
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn cancellation(mut self, cancellation: Cancellation) -> Self {
        self.options.cancellation = Some(cancellation);
        self
    }
}

/// Archive `dataset` as `name` in `destination` with default [`ArchiveOptions`].
///
/// See [`archive_with_options`].
///
/// # Errors
/// See [`archive_with_options`].
pub fn archive<D: ArchiveDestination + ?Sized>(
    dataset: &Dataset,
    destination: &D,
    name: &str,
    compressor_spec: &CompressorSpec,
    zip_level: u32,
) -> Result<String, ArchiveError> {
    archive_with_options(
        dataset,
        destination,
        name,
        compressor_spec,
        zip_level,
        &ArchiveOptions::default(),
    )
}

/// Archive `dataset` as `name` in `destination`.
///
/// The variables are encoded with the codec chains of `compressor_spec` and zip entries are deflated with `zip_level` (`0` stores entries uncompressed).
/// Returns the [normalised](normalise_archive_name) archive name.
///
/// # Errors
/// Returns
///  - [`ArchiveError::InvalidArgument`] if the name, zip level, compressor spec, or a variable is invalid,
///  - [`ArchiveError::EncodeFailure`] if a chunk cannot be encoded, in which case the destination is not touched,
///  - [`ArchiveError::DestinationExists`] if the destination already has an archive with the normalised name, which is left untouched,
///  - [`ArchiveError::Cancelled`] if the cancellation token is cancelled or the destination consumer disconnects, or
///  - another [`ArchiveError`] on an IO, zip, or storage error.
pub fn archive_with_options<D: ArchiveDestination + ?Sized>(
    dataset: &Dataset,
    destination: &D,
    name: &str,
    compressor_spec: &CompressorSpec,
    zip_level: u32,
    options: &ArchiveOptions,
) -> Result<String, ArchiveError> {
    let name = normalise_archive_name(name)?;
    let level = DeflateCompressionLevel::try_from(zip_level)
        .map_err(|err| ArchiveError::InvalidArgument(err.to_string()))?;
    let codec_chains = compressor_spec.codec_chains(dataset)?;

    let staging = encode_dataset(dataset, &codec_chains, options.concurrent_limit())?;
    log::debug!(
        "staged {} keys of {} variables for archive {name}",
        staging.len(),
        dataset.variables().len()
    );

    let mut sink = ArchiveSink::create(
        destination,
        &name,
        level,
        options.discard_partial_archives(),
    )?;
    for key in staging.list()? {
        if options.is_cancelled() {
            log::debug!("archive {name} cancelled before {key}");
            return Err(ArchiveError::Cancelled);
        }
        let value = staging.get(&key)?.ok_or_else(|| {
            ArchiveError::InternalConsistency(format!("staged key {key} has no value"))
        })?;
        sink.write_entry(&key, &value)?;
    }
    sink.finish()?;
    Ok(name)
}

fn metadata_key(prefix: &StorePrefix, name: &str) -> Result<StoreKey, ArchiveError> {
    StoreKey::with_prefix(prefix, name)
        .map_err(|err| ArchiveError::InternalConsistency(err.to_string()))
}

fn create_key(store: &MemoryStore, key: &StoreKey, value: Bytes) -> Result<(), ArchiveError> {
    store.create(key, value).map_err(|err| match err {
        StorageError::KeyExists(key) => {
            ArchiveError::InternalConsistency(format!("staged key {key} was written twice"))
        }
        err => err.into(),
    })
}

fn json_bytes<T: serde::Serialize>(value: &T) -> Result<Bytes, ArchiveError> {
    serde_json::to_vec_pretty(value)
        .map(Bytes::from)
        .map_err(|err| ArchiveError::InternalConsistency(err.to_string()))
}

struct StagedVariable<'a> {
    prefix: StorePrefix,
    variable: &'a Variable,
    codec_chain: &'a CodecChain,
    chunk_shape: ChunkShape,
}

/// Encode `dataset` into a new staging store.
fn encode_dataset(
    dataset: &Dataset,
    codec_chains: &BTreeMap<String, CodecChain>,
    concurrent_limit: usize,
) -> Result<MemoryStore, ArchiveError> {
    let store = MemoryStore::new();
    let mut consolidated = ConsolidatedMetadataV2::default();
    let mut stage_metadata = |key: StoreKey, value: serde_json::Value| -> Result<(), ArchiveError> {
        create_key(&store, &key, json_bytes(&value)?)?;
        consolidated.metadata.insert(key.as_str().to_string(), value);
        Ok(())
    };

    let root = StorePrefix::root();
    stage_metadata(
        metadata_key(&root, GROUP_METADATA_KEY)?,
        serde_json::to_value(GroupMetadataV2::default())
            .map_err(|err| ArchiveError::InternalConsistency(err.to_string()))?,
    )?;
    stage_metadata(
        metadata_key(&root, ATTRIBUTES_KEY)?,
        serde_json::Value::Object(dataset.attributes().clone()),
    )?;

    let mut staged = Vec::with_capacity(dataset.variables().len());
    for (name, variable) in dataset.variables() {
        let codec_chain = codec_chains.get(name).ok_or_else(|| {
            ArchiveError::InternalConsistency(format!("variable {name:?} has no codec chain"))
        })?;
        let chunk_shape = variable.effective_chunk_shape()?;
        variable.validate_dimension_names()?;
        let prefix = StorePrefix::new(format!("{name}/"))
            .map_err(|err| ArchiveError::InvalidArgument(err.to_string()))?;

        let metadata = ArrayMetadataV2::new(
            variable.shape().to_vec(),
            chunk_shape.clone(),
            variable.data_type(),
            variable.fill_value().clone(),
        )
        .with_codecs(
            codec_chain.compressor_metadata(),
            codec_chain.filters_metadata(),
        );
        stage_metadata(
            metadata_key(&prefix, ARRAY_METADATA_KEY)?,
            serde_json::to_value(&metadata)
                .map_err(|err| ArchiveError::InternalConsistency(err.to_string()))?,
        )?;

        let mut attributes = variable.attributes().clone();
        if let Some(dimension_names) = variable.dimension_names() {
            attributes.insert(
                ARRAY_DIMENSIONS_ATTRIBUTE.to_string(),
                serde_json::Value::from(dimension_names.to_vec()),
            );
        }
        stage_metadata(
            metadata_key(&prefix, ATTRIBUTES_KEY)?,
            serde_json::Value::Object(attributes),
        )?;

        staged.push(StagedVariable {
            prefix,
            variable,
            codec_chain,
            chunk_shape,
        });
    }

    stage_metadata_consolidated(&store, &consolidated)?;

    let concurrent_limit = if concurrent_limit == 0 {
        rayon::current_num_threads()
    } else {
        concurrent_limit
    };
    iter_concurrent_limit!(
        concurrent_limit,
        staged,
        try_for_each,
        |staged: StagedVariable| encode_variable(&store, &staged)
    )?;
    Ok(store)
}

fn stage_metadata_consolidated(
    store: &MemoryStore,
    consolidated: &ConsolidatedMetadataV2,
) -> Result<(), ArchiveError> {
    let key = metadata_key(&StorePrefix::root(), CONSOLIDATED_METADATA_KEY)?;
    create_key(store, &key, json_bytes(consolidated)?)
}

/// Encode every chunk of a variable into `store`.
///
/// Chunks that extend beyond the variable are padded with zeros to the full chunk shape.
fn encode_variable(store: &MemoryStore, staged: &StagedVariable) -> Result<(), ArchiveError> {
    let variable = staged.variable;
    let shape = variable.shape();
    let element_size = variable.data_type().size();
    let chunk_key_encoding = V2ChunkKeyEncoding::new_dot();
    let chunk_size = chunk_num_bytes(&staged.chunk_shape, element_size)?;

    let internal = |err: &dyn std::error::Error| ArchiveError::InternalConsistency(err.to_string());
    for chunk_indices in chunk_grid_indices(&chunk_grid_shape(shape, &staged.chunk_shape)) {
        let chunk_subset = ArraySubset::new_with_chunk(&chunk_indices, &staged.chunk_shape)
            .map_err(|err| internal(&err))?;
        let bounded_subset = chunk_subset.bound(shape).map_err(|err| internal(&err))?;
        let bytes = bounded_subset
            .extract_bytes(variable.data(), shape, element_size)
            .map_err(|err| internal(&err))?;
        let bytes = if bounded_subset == chunk_subset {
            bytes
        } else {
            let mut padded = vec![0; chunk_size];
            ArraySubset::new_with_shape(bounded_subset.shape().to_vec())
                .store_bytes(&bytes, &mut padded, &staged.chunk_shape, element_size)
                .map_err(|err| internal(&err))?;
            padded
        };

        let encoded = staged
            .codec_chain
            .encode(bytes)
            .map_err(ArchiveError::EncodeFailure)?;
        let key = metadata_key(&staged.prefix, &chunk_key_encoding.encode(&chunk_indices))?;
        create_key(store, &key, Bytes::from(encoded))?;
    }
    Ok(())
}

/// Read a dataset from a Zarr V2 group, such as an archive written by [`archive`].
///
/// Every array that is a direct child of the root group is read as a [`Variable`].
/// Dimension names are read from the `_ARRAY_DIMENSIONS` attribute.
/// Missing chunks are left zeroed.
///
/// # Errors
/// Returns
///  - [`ArchiveError::Metadata`] if array metadata or attributes are malformed or unsupported,
///  - [`ArchiveError::DecodeFailure`] if a chunk cannot be decoded, or
///  - [`ArchiveError::Storage`] if there is an underlying storage error.
pub fn read_dataset<TStorage: ReadableListableStorageTraits + ?Sized>(
    storage: &TStorage,
) -> Result<Dataset, ArchiveError> {
    let root = StorePrefix::root();
    let attributes = read_attributes(storage, &root)?;
    let mut dataset = Dataset::new().with_attributes(attributes);

    for key in storage.list()? {
        if key.file_name() != ARRAY_METADATA_KEY {
            continue;
        }
        let prefix = key.parent();
        let name = prefix.as_str().trim_end_matches('/');
        if name.is_empty() || name.contains('/') {
            log::debug!("skipping array {key} that is not a child of the root group");
            continue;
        }
        let variable = read_variable(storage, &key, &prefix)?;
        dataset.add_variable(name, variable)?;
    }
    Ok(dataset)
}

fn read_attributes<TStorage: ReadableStorageTraits + ?Sized>(
    storage: &TStorage,
    prefix: &StorePrefix,
) -> Result<serde_json::Map<String, serde_json::Value>, ArchiveError> {
    let key = metadata_key(prefix, ATTRIBUTES_KEY)?;
    match storage.get(&key)? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map_err(|err| ArchiveError::Metadata(format!("{key}: {err}"))),
        None => Ok(serde_json::Map::default()),
    }
}

fn read_variable<TStorage: ReadableStorageTraits + ?Sized>(
    storage: &TStorage,
    key: &StoreKey,
    prefix: &StorePrefix,
) -> Result<Variable, ArchiveError> {
    let metadata_error = |err: &dyn std::error::Error| ArchiveError::Metadata(format!("{key}: {err}"));

    let bytes = storage
        .get(key)?
        .ok_or_else(|| ArchiveError::InternalConsistency(format!("listed key {key} has no value")))?;
    let metadata = ArrayMetadataV2::from_slice(&bytes).map_err(|err| metadata_error(&err))?;
    if metadata.order != ArrayMetadataV2Order::C {
        return Err(ArchiveError::Metadata(format!(
            "{key}: only C order arrays are supported"
        )));
    }
    let data_type = metadata.data_type().map_err(|err| metadata_error(&err))?;
    let codec_chain =
        CodecChain::from_metadata(metadata.compressor.as_ref(), metadata.filters.as_deref())
            .map_err(|err| metadata_error(&err))?;
    let chunk_size = metadata.chunk_size_bytes().map_err(|err| metadata_error(&err))?;

    let shape = &metadata.shape;
    let element_size = data_type.size();
    let array_size = shape
        .iter()
        .try_fold(element_size as u64, |size, &length| size.checked_mul(length))
        .and_then(|size| usize::try_from(size).ok())
        .ok_or_else(|| ArchiveError::Metadata(format!("{key}: the array size overflows usize")))?;
    let mut data = vec![0; array_size];

    let chunk_key_encoding = V2ChunkKeyEncoding::new(metadata.dimension_separator);
    for chunk_indices in chunk_grid_indices(&chunk_grid_shape(shape, &metadata.chunks)) {
        let chunk_key = metadata_key(prefix, &chunk_key_encoding.encode(&chunk_indices))?;
        let Some(encoded) = storage.get(&chunk_key)? else {
            continue;
        };
        let decoded = codec_chain
            .decode(encoded.to_vec())
            .map_err(ArchiveError::DecodeFailure)?;
        if decoded.len() as u64 != chunk_size {
            return Err(ArchiveError::Metadata(format!(
                "{chunk_key}: decoded chunk has {} bytes, expected {chunk_size}",
                decoded.len()
            )));
        }

        let chunk_subset = ArraySubset::new_with_chunk(&chunk_indices, &metadata.chunks)
            .map_err(|err| metadata_error(&err))?;
        let bounded_subset = chunk_subset.bound(shape).map_err(|err| metadata_error(&err))?;
        let bytes = if bounded_subset == chunk_subset {
            decoded
        } else {
            ArraySubset::new_with_shape(bounded_subset.shape().to_vec())
                .extract_bytes(&decoded, &metadata.chunks, element_size)
                .map_err(|err| metadata_error(&err))?
        };
        bounded_subset
            .store_bytes(&bytes, &mut data, shape, element_size)
            .map_err(|err| metadata_error(&err))?;
    }

    let mut attributes = read_attributes(storage, prefix)?;
    let dimension_names = attributes
        .remove(ARRAY_DIMENSIONS_ATTRIBUTE)
        .map(serde_json::from_value::<Vec<String>>)
        .transpose()
        .map_err(|err| metadata_error(&err))?;

    let mut variable = Variable::new(shape.clone(), data_type, data)?
        .with_chunk_shape(metadata.chunks.clone())
        .with_attributes(attributes)
        .with_fill_value(metadata.fill_value.clone());
    if let Some(dimension_names) = dimension_names {
        variable = variable.with_dimension_names(dimension_names);
    }
    Ok(variable)
}
