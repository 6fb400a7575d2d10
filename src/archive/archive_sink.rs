use std::io::Write;

use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{array::codec::DeflateCompressionLevel, storage::StoreKey};

use super::{ArchiveDestination, ArchiveError};

/// The zip writer of an archive being created in an [`ArchiveDestination`].
///
/// Unless [`finish`](ArchiveSink::finish) succeeds, dropping the sink drops the zip writer and (if `discard_partial` is set) discards the partially written archive.
/// This also applies when unwinding from a panic.
pub(super) struct ArchiveSink<'a, D: ArchiveDestination + ?Sized> {
    destination: &'a D,
    name: &'a str,
    zip_writer: Option<ZipWriter<D::Writer>>,
    options: SimpleFileOptions,
    discard_partial: bool,
    finished: bool,
}

impl<'a, D: ArchiveDestination + ?Sized> ArchiveSink<'a, D> {
    /// Create the archive `name` in `destination`.
    ///
    /// Entries are stored if `level` is zero, otherwise deflated.
    pub(super) fn create(
        destination: &'a D,
        name: &'a str,
        level: DeflateCompressionLevel,
        discard_partial: bool,
    ) -> Result<Self, ArchiveError> {
        let writer = destination.create_new(name)?;
        let options = if level.as_u32() == 0 {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(level.as_u32())))
        }
        .large_file(true);
        Ok(Self {
            destination,
            name,
            zip_writer: Some(ZipWriter::new(writer)),
            options,
            discard_partial,
            finished: false,
        })
    }

    /// Write an entry with `key` as its name.
    pub(super) fn write_entry(&mut self, key: &StoreKey, value: &[u8]) -> Result<(), ArchiveError> {
        let zip_writer = self.zip_writer.as_mut().ok_or_else(|| {
            ArchiveError::InternalConsistency("the archive sink is closed".to_string())
        })?;
        zip_writer.start_file(key.as_str(), self.options)?;
        zip_writer.write_all(value)?;
        Ok(())
    }

    /// Write the zip central directory and flush the destination writer.
    pub(super) fn finish(mut self) -> Result<(), ArchiveError> {
        let zip_writer = self.zip_writer.take().ok_or_else(|| {
            ArchiveError::InternalConsistency("the archive sink is closed".to_string())
        })?;
        let mut writer = zip_writer.finish()?;
        writer.flush()?;
        self.finished = true;
        Ok(())
    }
}

impl<D: ArchiveDestination + ?Sized> Drop for ArchiveSink<'_, D> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.zip_writer.take());
        if self.discard_partial {
            if let Err(err) = self.destination.discard(self.name) {
                log::warn!("failed to discard partial archive {}: {err}", self.name);
            } else {
                log::debug!("discarded partial archive {}", self.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::archive::MemoryDestination;

    #[test]
    fn archive_sink_finish() -> Result<(), Box<dyn std::error::Error>> {
        let destination = MemoryDestination::new();
        let level = DeflateCompressionLevel::try_from(6)?;
        let mut sink = ArchiveSink::create(&destination, "a.zarr.zip", level, true)?;
        sink.write_entry(&StoreKey::new(".zgroup")?, br#"{"zarr_format":2}"#)?;
        sink.finish()?;

        let bytes = destination.get("a.zarr.zip").unwrap();
        let mut zip_archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let file = zip_archive.by_name(".zgroup")?;
        assert_eq!(file.compression(), CompressionMethod::Deflated);
        Ok(())
    }

    #[test]
    fn archive_sink_drop_discards() -> Result<(), Box<dyn std::error::Error>> {
        let destination = MemoryDestination::new();
        let level = DeflateCompressionLevel::try_from(0)?;
        {
            let mut sink = ArchiveSink::create(&destination, "a.zarr.zip", level, true)?;
            sink.write_entry(&StoreKey::new(".zgroup")?, b"{}")?;
        }
        assert!(!destination.contains("a.zarr.zip"));

        {
            let _sink = ArchiveSink::create(&destination, "b.zarr.zip", level, false)?;
        }
        assert!(destination.contains("b.zarr.zip"));
        Ok(())
    }
}
