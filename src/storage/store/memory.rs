//! An in-memory store.

use std::collections::{btree_map::Entry, BTreeMap};

use bytes::Bytes;
use parking_lot::RwLock;

use crate::storage::{
    ListableStorageTraits, MaybeBytes, ReadableStorageTraits, StorageError, StoreKey, StoreKeys,
    WritableStorageTraits,
};

/// An in-memory store.
///
/// Values are reference counted [`Bytes`], so retrieving a value does not copy it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data_map: RwLock<BTreeMap<StoreKey, Bytes>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data_map.read().len()
    }

    /// Returns true if the store has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_map.read().is_empty()
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        Ok(self.data_map.read().get(key).cloned())
    }
}

impl WritableStorageTraits for MemoryStore {
    fn create(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        match self.data_map.write().entry(key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
            Entry::Occupied(_) => Err(StorageError::KeyExists(key.clone())),
        }
    }
}

impl ListableStorageTraits for MemoryStore {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        Ok(self.data_map.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn memory_create() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        let key: StoreKey = "x/.zarray".try_into()?;
        assert!(store.get(&key)?.is_none());
        store.create(&key, Bytes::from_static(b"{}"))?;
        assert!(matches!(
            store.create(&key, Bytes::from_static(b"[]")),
            Err(StorageError::KeyExists(_))
        ));
        assert_eq!(store.get(&key)?.unwrap(), Bytes::from_static(b"{}"));
        Ok(())
    }

    #[test]
    fn memory_list() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.create(&"b".try_into()?, Bytes::new())?;
        store.create(&"a/d/e".try_into()?, Bytes::new())?;
        store.create(&"a/c".try_into()?, Bytes::new())?;
        store.create(&"a/b".try_into()?, Bytes::from_static(&[0, 1, 2]))?;
        assert_eq!(store.len(), 4);
        assert_eq!(
            store.list()?,
            &["a/b".try_into()?, "a/c".try_into()?, "a/d/e".try_into()?, "b".try_into()?]
        );
        assert_eq!(store.get(&"a/b".try_into()?)?.unwrap(), vec![0, 1, 2]);
        Ok(())
    }
}
