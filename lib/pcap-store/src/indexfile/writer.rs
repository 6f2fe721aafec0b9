//! Index-file writer (C5): the project header plus, on finalize, the
//! file-entry table, time-index table, and per-file offset-index tables.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use pcap_format::{
    crc32, FileEntry, FixedLayout, OffsetIndexEntry, PcapError, ProjectHeader, Result,
    TimeIndexEntry, PROJECT_HEADER_LEN,
};

pub struct IndexFileWriter {
    path: PathBuf,
    file: File,
    index_interval_ms: u16,
}

impl IndexFileWriter {
    /// Creates (or truncates) the project file at `path` and writes an
    /// empty, provisional header.
    ///
    /// Writing the header immediately, before any packets arrive, means an
    /// abnormal process exit leaves behind a project file that parses
    /// cleanly as "zero file entries" rather than a zero-length or
    /// half-written file.
    pub fn create(path: impl AsRef<Path>, index_interval_ms: u16) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(PcapError::from)?;
        let mut writer = Self {
            path,
            file,
            index_interval_ms,
        };
        writer.write_header(&ProjectHeader::new(index_interval_ms))?;
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `header` at offset 0. Callable repeatedly; always re-seeks.
    pub fn write_header(&mut self, header: &ProjectHeader) -> Result<()> {
        self.file.seek(SeekFrom::Start(0)).map_err(PcapError::from)?;
        self.file.write_all(&header.to_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    /// Finalization primitive (spec §4.5):
    ///
    /// 1. Compute a provisional header (`file_count`, `total_index_count`,
    ///    table offsets, `header_crc = 0`).
    /// 2. Serialize the full body — header, file entries, time-index
    ///    table, then each file's offset-index table in `file_entries`
    ///    order — into one buffer.
    /// 3. Compute the CRC-32 of that buffer and patch `header_crc` in
    ///    place.
    /// 4. Write the whole buffer at offset 0 and flush.
    pub fn write_all_indices(
        &mut self,
        file_entries: &[FileEntry],
        time_indices: &[TimeIndexEntry],
        file_indices: &HashMap<String, Vec<OffsetIndexEntry>>,
    ) -> Result<()> {
        let total_index_count: u32 = file_entries.iter().map(|e| e.index_count).sum();
        let file_entry_offset = PROJECT_HEADER_LEN as u32;
        let time_index_offset =
            file_entry_offset + file_entries.len() as u32 * FileEntry::SIZE as u32;

        let mut header = ProjectHeader::new(self.index_interval_ms);
        header.file_count = file_entries.len() as u16;
        header.total_index_count = total_index_count;
        header.file_entry_offset = file_entry_offset;
        header.time_index_offset = time_index_offset;
        header.header_crc = 0;

        let mut buf = Vec::with_capacity(
            PROJECT_HEADER_LEN
                + file_entries.len() * FileEntry::SIZE
                + time_indices.len() * TimeIndexEntry::SIZE
                + total_index_count as usize * OffsetIndexEntry::SIZE,
        );

        buf.extend_from_slice(&header.to_bytes());
        for entry in file_entries {
            buf.extend_from_slice(&entry.to_bytes());
        }
        for entry in time_indices {
            buf.extend_from_slice(&entry.to_bytes());
        }
        for entry in file_entries {
            let Some(offsets) = file_indices.get(&entry.relative_path) else {
                continue;
            };
            for offset in offsets {
                buf.extend_from_slice(&offset.to_bytes());
            }
        }

        let crc = crc32::checksum(&buf);
        buf[24..28].copy_from_slice(&crc.to_le_bytes());

        self.file.seek(SeekFrom::Start(0)).map_err(PcapError::from)?;
        self.file.write_all(&buf)?;
        self.file.flush()?;
        Ok(())
    }
}
