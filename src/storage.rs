//! Zarr storage.
//!
//! A store maps [`StoreKey`]s to byte values.
//! Zarr V2 keys are `/` delimited paths such as `.zgroup`, `temperature/.zarray`, or `temperature/0.1`.
//!
//! This module defines the abstract store interfaces used throughout the crate:
//!  - [`ReadableStorageTraits`]: retrieve values,
//!  - [`WritableStorageTraits`]: create-only insertion of values, and
//!  - [`ListableStorageTraits`]: enumerate keys.
//!
//! It includes two stores:
//!  - [`MemoryStore`](store::MemoryStore): an ephemeral in-memory store, used to stage encoded data before it is archived, and
//!  - [`ZipStore`](store::ZipStore): a read-only view of a zip archive such as a `.zarr.zip` file.

pub mod store;
mod store_key;
mod store_prefix;

use bytes::Bytes;
use thiserror::Error;

pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError};

/// An optional byte value. [`None`] if the key does not exist.
pub type MaybeBytes = Option<Bytes>;

/// Readable storage traits.
pub trait ReadableStorageTraits: Send + Sync {
    /// Retrieve the value (bytes) associated with a given [`StoreKey`].
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError>;
}

/// Listable storage traits.
pub trait ListableStorageTraits: Send + Sync {
    /// Retrieve all [`StoreKeys`] in the store, in lexicographical order.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn list(&self) -> Result<StoreKeys, StorageError>;
}

/// Writable storage traits.
pub trait WritableStorageTraits: Send + Sync {
    /// Store bytes at a [`StoreKey`] that must not already exist.
    ///
    /// # Errors
    /// Returns [`StorageError::KeyExists`] if the key already has a value, or another [`StorageError`] on failure to store.
    fn create(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError>;
}

/// A supertrait of [`ReadableStorageTraits`] and [`ListableStorageTraits`].
pub trait ReadableListableStorageTraits: ReadableStorageTraits + ListableStorageTraits {}

impl<T> ReadableListableStorageTraits for T where T: ReadableStorageTraits + ListableStorageTraits {}

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// A create-only write was attempted on a key that already exists.
    #[error("key {0} already exists")]
    KeyExists(StoreKey),
    /// An invalid store prefix.
    #[error("invalid store prefix {0}")]
    StorePrefixError(#[from] StorePrefixError),
    /// An invalid store key.
    #[error("invalid store key {0}")]
    InvalidStoreKey(#[from] StoreKeyError),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<zip::result::ZipError> for StorageError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Other(err.to_string())
    }
}
