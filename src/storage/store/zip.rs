//! A read-only zip store.

use std::{
    fs::File,
    io::{Read, Seek},
    path::{Path, PathBuf},
};

use bytes::Bytes;
use itertools::Itertools;
use parking_lot::Mutex;
use thiserror::Error;
use zip::{result::ZipError, ZipArchive};

use crate::storage::{
    ListableStorageTraits, MaybeBytes, ReadableStorageTraits, StorageError, StoreKey, StoreKeys,
};

/// A read-only zip store.
///
/// Each file entry of the archive is a key. Directory entries are ignored.
pub struct ZipStore<R: Read + Seek = File> {
    zip_archive: Mutex<ZipArchive<R>>,
}

impl<R: Read + Seek> std::fmt::Debug for ZipStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipStore")
            .field("len", &self.zip_archive.lock().len())
            .finish()
    }
}

impl ZipStore<File> {
    /// Open the zip file at `zip_path`.
    ///
    /// # Errors
    /// Returns a [`ZipStoreCreateError`] if `zip_path` is not a valid zip file.
    pub fn open<P: AsRef<Path>>(zip_path: P) -> Result<Self, ZipStoreCreateError> {
        let path = zip_path.as_ref().to_path_buf();
        if path.is_dir() {
            Err(ZipStoreCreateError::ExistingDir(path))
        } else {
            Self::new(File::open(&path)?)
        }
    }
}

impl<R: Read + Seek> ZipStore<R> {
    /// Create a zip store from a reader over a zip archive.
    ///
    /// # Errors
    /// Returns a [`ZipStoreCreateError`] if the reader does not contain a valid zip archive.
    pub fn new(reader: R) -> Result<Self, ZipStoreCreateError> {
        Ok(Self {
            zip_archive: Mutex::new(ZipArchive::new(reader)?),
        })
    }

    fn file_keys(zip_archive: &mut ZipArchive<R>) -> StoreKeys {
        (0..zip_archive.len())
            .filter_map(|index| {
                let file = zip_archive.by_index_raw(index).ok()?;
                if file.is_file() {
                    StoreKey::try_from(file.name()).ok()
                } else {
                    None
                }
            })
            .sorted()
            .collect()
    }
}

impl<R: Read + Seek + Send> ReadableStorageTraits for ZipStore<R> {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let mut zip_archive = self.zip_archive.lock();
        let mut file = match zip_archive.by_name(key.as_str()) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let capacity = usize::try_from(file.size()).map_err(|_| {
            StorageError::Other("zip archive internal file larger than usize".to_string())
        })?;
        let mut buffer = Vec::with_capacity(capacity);
        file.read_to_end(&mut buffer)?;
        Ok(Some(Bytes::from(buffer)))
    }
}

impl<R: Read + Seek + Send> ListableStorageTraits for ZipStore<R> {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        let mut zip_archive = self.zip_archive.lock();
        Ok(Self::file_keys(&mut zip_archive))
    }
}

/// A zip store creation error.
#[derive(Debug, Error)]
pub enum ZipStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An existing directory.
    #[error("{0} is an existing directory, not a zip file")]
    ExistingDir(PathBuf),
    /// A zip error.
    #[error(transparent)]
    ZipError(#[from] ZipError),
}

#[cfg(test)]
mod tests {
    use std::{error::Error, io::Cursor, io::Write};

    use super::*;

    fn zip_bytes() -> Result<Vec<u8>, Box<dyn Error>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        zip.add_directory("a/", options)?;
        zip.start_file("a/b", options)?;
        zip.write_all(&[0, 1, 2, 3])?;
        zip.start_file("a/c", options)?;
        zip.write_all(&[])?;
        zip.start_file("b", options)?;
        zip.write_all(&[4, 5])?;
        Ok(zip.finish()?.into_inner())
    }

    #[test]
    fn zip_root() -> Result<(), Box<dyn Error>> {
        let store = ZipStore::new(Cursor::new(zip_bytes()?))?;
        assert_eq!(
            store.list()?,
            &["a/b".try_into()?, "a/c".try_into()?, "b".try_into()?]
        );
        assert_eq!(store.get(&"a/b".try_into()?)?.unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(store.get(&"a/c".try_into()?)?.unwrap(), Vec::<u8>::new());
        assert_eq!(store.get(&"b".try_into()?)?.unwrap(), vec![4, 5]);
        assert!(store.get(&"a/d".try_into()?)?.is_none());
        Ok(())
    }

    #[test]
    fn zip_open_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("test.zip");
        std::fs::write(&path, zip_bytes()?)?;
        let store = ZipStore::open(&path)?;
        assert_eq!(store.list()?.len(), 3);
        assert!(matches!(
            ZipStore::open(dir.path()),
            Err(ZipStoreCreateError::ExistingDir(_))
        ));
        Ok(())
    }
}
