use std::{
    collections::BTreeMap,
    fs::{File, OpenOptions},
    io::{BufWriter, Seek, SeekFrom, Write},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};

use super::ArchiveError;

/// A destination of archives.
///
/// Archives are created exclusively: creating an archive with the name of an existing archive fails and leaves the existing archive untouched.
pub trait ArchiveDestination: Send + Sync {
    /// The writer of a new archive.
    type Writer: Write + Seek + Send;

    /// Create a new archive named `name` and return its writer.
    ///
    /// # Errors
    /// Returns [`ArchiveError::DestinationExists`] if an archive named `name` already exists, or another [`ArchiveError`] if it cannot be created.
    fn create_new(&self, name: &str) -> Result<Self::Writer, ArchiveError>;

    /// Discard the archive named `name`, which was created by [`create_new`](ArchiveDestination::create_new) and may be partially written.
    ///
    /// Discarding an archive that does not exist succeeds.
    ///
    /// # Errors
    /// Returns an [`ArchiveError`] if the archive exists but cannot be removed.
    fn discard(&self, name: &str) -> Result<(), ArchiveError>;
}

/// A filesystem directory of archives.
///
/// Archive names are paths relative to the root directory. Missing parent directories are created.
#[derive(Debug, Clone)]
pub struct FilesystemDestination {
    root: PathBuf,
}

impl FilesystemDestination {
    /// Create a filesystem destination rooted at `root`.
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Return the path of the archive named `name`.
    ///
    /// # Errors
    /// Returns [`ArchiveError::InvalidArgument`] if `name` is not a relative path of normal components, so the path would not be within the root directory.
    pub fn path(&self, name: &str) -> Result<PathBuf, ArchiveError> {
        let relative = Path::new(name);
        let is_normal = relative.components().next().is_some()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if is_normal {
            Ok(self.root.join(relative))
        } else {
            Err(ArchiveError::InvalidArgument(format!(
                "archive name {name:?} is not a relative path within the destination"
            )))
        }
    }
}

impl ArchiveDestination for FilesystemDestination {
    type Writer = BufWriter<File>;

    fn create_new(&self, name: &str) -> Result<Self::Writer, ArchiveError> {
        let path = self.path(name)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => Ok(BufWriter::new(file)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(ArchiveError::DestinationExists(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn discard(&self, name: &str) -> Result<(), ArchiveError> {
        match std::fs::remove_file(self.path(name)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

type MemoryBuffer = Arc<Mutex<Vec<u8>>>;

/// An in-memory collection of named archives.
///
/// Useful for serving archives as downloads without touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryDestination {
    archives: RwLock<BTreeMap<String, MemoryBuffer>>,
}

impl MemoryDestination {
    /// Create a new empty memory destination.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of the bytes of the archive named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.archives
            .read()
            .get(name)
            .map(|buffer| buffer.lock().clone())
    }

    /// Returns true if an archive named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.archives.read().contains_key(name)
    }

    /// Return the names of all archives.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.archives.read().keys().cloned().collect()
    }
}

impl ArchiveDestination for MemoryDestination {
    type Writer = MemoryWriter;

    fn create_new(&self, name: &str) -> Result<Self::Writer, ArchiveError> {
        let mut archives = self.archives.write();
        if archives.contains_key(name) {
            return Err(ArchiveError::DestinationExists(name.to_string()));
        }
        let buffer = MemoryBuffer::default();
        archives.insert(name.to_string(), buffer.clone());
        Ok(MemoryWriter {
            buffer,
            position: 0,
        })
    }

    fn discard(&self, name: &str) -> Result<(), ArchiveError> {
        self.archives.write().remove(name);
        Ok(())
    }
}

/// A writer of an archive in a [`MemoryDestination`].
#[derive(Debug)]
pub struct MemoryWriter {
    buffer: MemoryBuffer,
    position: usize,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self.buffer.lock();
        let end = self.position + buf.len();
        if buffer.len() < end {
            buffer.resize(end, 0);
        }
        buffer[self.position..end].copy_from_slice(buf);
        self.position = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryWriter {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let len = self.buffer.lock().len() as u64;
        let position = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(offset) => len.checked_add_signed(offset),
            SeekFrom::Current(offset) => (self.position as u64).checked_add_signed(offset),
        };
        let position = position
            .and_then(|position| usize::try_from(position).ok())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "invalid seek to a negative or overflowing position",
                )
            })?;
        self.position = position;
        Ok(position as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_destination() -> Result<(), Box<dyn std::error::Error>> {
        let destination = MemoryDestination::new();
        let mut writer = destination.create_new("a.zarr.zip")?;
        writer.write_all(b"hello")?;
        writer.seek(SeekFrom::Start(1))?;
        writer.write_all(b"E")?;
        writer.seek(SeekFrom::End(0))?;
        writer.write_all(b"!")?;
        assert_eq!(destination.get("a.zarr.zip"), Some(b"hEllo!".to_vec()));

        assert!(matches!(
            destination.create_new("a.zarr.zip"),
            Err(ArchiveError::DestinationExists(_))
        ));
        assert!(writer.seek(SeekFrom::Current(-10)).is_err());

        destination.discard("a.zarr.zip")?;
        assert!(!destination.contains("a.zarr.zip"));
        destination.discard("a.zarr.zip")?;
        assert!(destination.create_new("a.zarr.zip").is_ok());
        assert_eq!(destination.names(), vec!["a.zarr.zip".to_string()]);
        Ok(())
    }

    #[test]
    fn filesystem_destination() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::TempDir::new()?;
        let destination = FilesystemDestination::new(root.path());
        let mut writer = destination.create_new("out/a.zarr.zip")?;
        writer.write_all(b"zip")?;
        drop(writer);
        assert_eq!(std::fs::read(destination.path("out/a.zarr.zip")?)?, b"zip");

        assert!(matches!(
            destination.create_new("out/a.zarr.zip"),
            Err(ArchiveError::DestinationExists(_))
        ));
        assert_eq!(std::fs::read(destination.path("out/a.zarr.zip")?)?, b"zip");

        destination.discard("out/a.zarr.zip")?;
        assert!(!destination.path("out/a.zarr.zip")?.exists());
        destination.discard("out/a.zarr.zip")?;
        Ok(())
    }

    #[test]
    fn filesystem_destination_outside_root() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::TempDir::new()?;
        let destination = FilesystemDestination::new(root.path().join("archives"));
        for name in ["../a.zarr.zip", "out/../../a.zarr.zip", "./a.zarr.zip", "", "/tmp/a.zarr.zip"] {
            assert!(
                matches!(destination.path(name), Err(ArchiveError::InvalidArgument(_))),
                "{name}"
            );
            assert!(matches!(
                destination.create_new(name),
                Err(ArchiveError::InvalidArgument(_))
            ));
            assert!(destination.discard(name).is_err());
        }
        assert!(!root.path().join("a.zarr.zip").exists());
        assert!(!root.path().join("archives").exists());
        Ok(())
    }
}
