//! Index-file reader (C6): parses the project header and tables, lazily
//! loading per-file offset-index tables on demand.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use pcap_format::{
    crc32, FileEntry, FixedLayout, OffsetIndexEntry, PcapError, ProjectHeader, Result,
    TimeIndexEntry,
};

pub struct IndexFileReader {
    path: PathBuf,
    file: File,
    pub header: ProjectHeader,
}

impl IndexFileReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(PcapError::from)?;

        let mut header_buf = [0u8; ProjectHeader::SIZE];
        file.read_exact(&mut header_buf).map_err(|e| {
            PcapError::invalid_format(format!("truncated project header: {e}"))
        })?;
        let header = ProjectHeader::from_bytes(&header_buf)?;

        Ok(Self { path, file, header })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recomputes the header CRC over the whole file (with `header_crc`
    /// zeroed) and compares it to the stored value.
    ///
    /// Recommended but not required for the read path to succeed (spec
    /// §4.6): a caller that wants to fail fast on a corrupted project file
    /// should call this explicitly after [`Self::open`].
    pub fn verify_header_crc(&mut self) -> Result<bool> {
        self.file.seek(SeekFrom::Start(0)).map_err(PcapError::from)?;
        let mut buf = Vec::new();
        self.file.read_to_end(&mut buf).map_err(PcapError::from)?;
        if buf.len() < 28 {
            return Ok(false);
        }
        buf[24..28].copy_from_slice(&[0, 0, 0, 0]);
        Ok(crc32::checksum(&buf) == self.header.header_crc)
    }

    pub fn read_all_file_entries(&mut self) -> Result<Vec<FileEntry>> {
        let count = self.header.file_count as usize;
        let mut buf = vec![0u8; count * FileEntry::SIZE];
        self.file
            .seek(SeekFrom::Start(self.header.file_entry_offset as u64))
            .map_err(PcapError::from)?;
        self.file.read_exact(&mut buf).map_err(PcapError::from)?;

        (0..count)
            .map(|i| FileEntry::from_bytes(&buf[i * FileEntry::SIZE..]))
            .collect()
    }

    /// Reads the time-index table. Its entry count isn't stored directly;
    /// it is derived from the file's actual length minus the bytes
    /// reserved for all per-file offset-index tables combined (spec §4.6).
    pub fn read_all_time_indices(&mut self) -> Result<Vec<TimeIndexEntry>> {
        let file_len = self.file.metadata().map_err(PcapError::from)?.len();
        let offset_tables_bytes =
            self.header.total_index_count as u64 * OffsetIndexEntry::SIZE as u64;
        if file_len < offset_tables_bytes {
            return Err(PcapError::invalid_format(
                "project file shorter than its declared offset-index tables",
            ));
        }
        let first_file_table_offset = file_len - offset_tables_bytes;
        if first_file_table_offset < self.header.time_index_offset as u64 {
            return Err(PcapError::invalid_format(
                "time-index table offset is past the start of the offset-index tables",
            ));
        }
        let time_index_bytes = first_file_table_offset - self.header.time_index_offset as u64;
        let count = (time_index_bytes / TimeIndexEntry::SIZE as u64) as usize;

        let mut buf = vec![0u8; count * TimeIndexEntry::SIZE];
        self.file
            .seek(SeekFrom::Start(self.header.time_index_offset as u64))
            .map_err(PcapError::from)?;
        self.file.read_exact(&mut buf).map_err(PcapError::from)?;

        (0..count)
            .map(|i| TimeIndexEntry::from_bytes(&buf[i * TimeIndexEntry::SIZE..]))
            .collect()
    }

    /// Offset, within the project file, of the first byte of the
    /// concatenated per-file offset-index tables.
    pub fn file_index_tables_offset(&mut self) -> Result<u64> {
        let file_len = self.file.metadata().map_err(PcapError::from)?.len();
        let offset_tables_bytes =
            self.header.total_index_count as u64 * OffsetIndexEntry::SIZE as u64;
        Ok(file_len.saturating_sub(offset_tables_bytes))
    }

    /// Lazily loads one file's offset-index table, given its starting
    /// offset (within the project file) and entry count.
    pub fn read_file_indices(&mut self, offset: u64, count: u32) -> Result<Vec<OffsetIndexEntry>> {
        let mut buf = vec![0u8; count as usize * OffsetIndexEntry::SIZE];
        self.file.seek(SeekFrom::Start(offset)).map_err(PcapError::from)?;
        self.file.read_exact(&mut buf).map_err(PcapError::from)?;

        (0..count as usize)
            .map(|i| OffsetIndexEntry::from_bytes(&buf[i * OffsetIndexEntry::SIZE..]))
            .collect()
    }
}
