//! Project reader (C8): sequential and random-access reading across a
//! project's rolling data files, using the time-index table for coarse
//! seeking and per-file offset-index tables for exact positioning.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use pcap_format::{FileEntry, OffsetIndexEntry, Packet, PcapError, Result, TimeIndexEntry};
use tracing::debug;

use crate::datafile::{CrcMode, DataFileReader};
use crate::indexfile::IndexFileReader;
use crate::path;

/// Number of per-file offset-index tables kept in memory at once. A seek
/// touches at most one file's table, so a small cache absorbs the common
/// case of successive seeks landing in the same or a neighboring file
/// without holding every table for a large project in memory at once.
const OFFSET_INDEX_CACHE_CAP: usize = 3;

pub struct ProjectReader {
    data_dir: PathBuf,
    crc_mode: CrcMode,

    file_entries: Vec<FileEntry>,
    time_indices: Vec<TimeIndexEntry>,
    index_reader: IndexFileReader,
    file_index_tables_offset: u64,

    offset_cache: HashMap<u32, Vec<OffsetIndexEntry>>,
    offset_cache_order: VecDeque<u32>,

    current_file_id: Option<u32>,
    current_data_reader: Option<DataFileReader>,
    current_position: u64,
}

impl ProjectReader {
    pub fn open(project_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_mode(project_path, CrcMode::Strict)
    }

    pub fn open_with_mode(project_path: impl AsRef<Path>, crc_mode: CrcMode) -> Result<Self> {
        let project_path = project_path.as_ref();
        let mut index_reader = IndexFileReader::open(project_path)?;
        let file_entries = index_reader.read_all_file_entries()?;
        let time_indices = index_reader.read_all_time_indices()?;
        let file_index_tables_offset = index_reader.file_index_tables_offset()?;

        Ok(Self {
            data_dir: path::companion_dir(project_path),
            crc_mode,
            file_entries,
            time_indices,
            index_reader,
            file_index_tables_offset,
            offset_cache: HashMap::new(),
            offset_cache_order: VecDeque::new(),
            current_file_id: None,
            current_data_reader: None,
            current_position: 0,
        })
    }

    pub fn packet_count(&self) -> u32 {
        self.file_entries.iter().map(|e| e.index_count).sum()
    }

    pub fn start_time(&self) -> Option<i64> {
        self.file_entries.first().map(|e| e.start_timestamp)
    }

    pub fn end_time(&self) -> Option<i64> {
        self.file_entries.last().map(|e| e.end_timestamp)
    }

    pub fn file_entries(&self) -> &[FileEntry] {
        &self.file_entries
    }

    /// Tears down any open data-file handle and returns the reader to its
    /// just-opened, unpositioned state.
    pub fn reset(&mut self) {
        self.current_data_reader = None;
        self.current_file_id = None;
        self.current_position = 0;
    }

    pub fn close(mut self) {
        self.reset();
    }

    fn switch_to_file(&mut self, file_id: u32) -> Result<()> {
        if self.current_file_id == Some(file_id) {
            return Ok(());
        }
        let entry = self
            .file_entries
            .iter()
            .find(|e| e.file_id == file_id)
            .ok_or_else(|| PcapError::not_found(format!("no file entry with file_id {file_id}")))?;
        let data_path = self.data_dir.join(&entry.relative_path);
        self.current_data_reader = Some(DataFileReader::open_with_mode(&data_path, self.crc_mode)?);
        self.current_file_id = Some(file_id);
        Ok(())
    }

    /// Byte offset, within the project file, of `file_id`'s offset-index
    /// table: the tables are laid out back to back, in `file_entries`
    /// order, after the time-index table (spec §4.6).
    fn table_location(&self, file_id: u32) -> Option<(u64, u32)> {
        let mut offset = self.file_index_tables_offset;
        for entry in &self.file_entries {
            if entry.file_id == file_id {
                return Some((offset, entry.index_count));
            }
            offset += entry.index_count as u64 * 16;
        }
        None
    }

    fn offsets_for_file(&mut self, file_id: u32) -> Result<Vec<OffsetIndexEntry>> {
        if let Some(cached) = self.offset_cache.get(&file_id) {
            return Ok(cached.clone());
        }

        let (offset, count) = self
            .table_location(file_id)
            .ok_or_else(|| PcapError::not_found(format!("no offset-index table for file_id {file_id}")))?;
        let offsets = self.index_reader.read_file_indices(offset, count)?;

        if self.offset_cache_order.len() >= OFFSET_INDEX_CACHE_CAP {
            if let Some(evicted) = self.offset_cache_order.pop_front() {
                self.offset_cache.remove(&evicted);
            }
        }
        self.offset_cache_order.push_back(file_id);
        self.offset_cache.insert(file_id, offsets.clone());

        Ok(offsets)
    }

    /// Reads the next packet in capture order, opening the first data file
    /// on the first call and rolling across file boundaries transparently.
    pub fn read_next_packet(&mut self) -> Result<Option<Packet>> {
        Ok(self.read_next_packet_checked()?.map(|(packet, _)| packet))
    }

    /// Like [`Self::read_next_packet`] but also returns whether the
    /// packet's checksum verified. Only meaningful under
    /// [`CrcMode::Lenient`] — under [`CrcMode::Strict`] a mismatch is
    /// already surfaced as an `Err` before this can return.
    pub fn read_next_packet_checked(&mut self) -> Result<Option<(Packet, bool)>> {
        if self.file_entries.is_empty() {
            return Ok(None);
        }

        if self.current_data_reader.is_none() {
            let first_file_id = self.file_entries[0].file_id;
            self.switch_to_file(first_file_id)?;
        }

        loop {
            let reader = self
                .current_data_reader
                .as_mut()
                .expect("a data file reader is open at this point");
            match reader.read_packet()? {
                Some(read) => {
                    self.current_position += 1;
                    return Ok(Some((read.packet, read.checksum_valid)));
                }
                None => {
                    let current_id = self.current_file_id.expect("set alongside current_data_reader");
                    let next_id = self
                        .file_entries
                        .iter()
                        .find(|e| e.file_id > current_id)
                        .map(|e| e.file_id);
                    match next_id {
                        Some(id) => self.switch_to_file(id)?,
                        None => {
                            self.current_data_reader = None;
                            return Ok(None);
                        }
                    }
                }
            }
        }
    }

    pub fn read_packets(&mut self, max: usize) -> Result<Vec<Packet>> {
        let mut out = Vec::with_capacity(max.min(1024));
        while out.len() < max {
            match self.read_next_packet()? {
                Some(packet) => out.push(packet),
                None => break,
            }
        }
        Ok(out)
    }

    /// Locates the (file_id, local index within that file's offset table)
    /// pair for the `n`th packet in capture order across the whole
    /// project, where `n` is 0-based.
    fn locate_position(&self, n: u64) -> Option<(u32, u32)> {
        let mut remaining = n;
        for entry in &self.file_entries {
            if remaining < entry.index_count as u64 {
                return Some((entry.file_id, remaining as u32));
            }
            remaining -= entry.index_count as u64;
        }
        None
    }

    /// Seeks to the packet with the greatest `timestamp_ms <= target` (spec
    /// §4.8), using the time-index table as a coarse lower bound on the
    /// containing file and that file's offset-index table to find the exact
    /// byte offset. Returns `false` (cursor unchanged) if `target` is
    /// outside the project's recorded time range.
    pub fn seek_to_time(&mut self, target: i64) -> Result<bool> {
        let (Some(start), Some(end)) = (self.start_time(), self.end_time()) else {
            return Ok(false);
        };
        if target < start || target > end {
            return Ok(false);
        }

        let idx = self.time_indices.partition_point(|e| e.timestamp_ms <= target);
        let idx = idx.saturating_sub(1);
        let coarse_file_id = self.time_indices[idx].file_id;

        // The time index only samples at `index_interval_ms`, which can be
        // coarser than a single file's time span: the greatest sample
        // `<= target` may name an earlier file than the one that actually
        // holds the greatest packet `<= target`. Refine forward over the
        // (already fully resident) file entries, which are ordered and
        // whose `start_timestamp` is monotonic, to the true containing file.
        let start_pos = self
            .file_entries
            .iter()
            .position(|e| e.file_id == coarse_file_id)
            .unwrap_or(0);
        let mut file_id = coarse_file_id;
        for entry in &self.file_entries[start_pos..] {
            if entry.start_timestamp <= target {
                file_id = entry.file_id;
            } else {
                break;
            }
        }

        let offsets = self.offsets_for_file(file_id)?;
        let local_idx = offsets.partition_point(|e| e.timestamp_ms <= target);
        let local_idx = local_idx.saturating_sub(1);

        self.switch_to_file(file_id)?;
        let byte_offset = offsets[local_idx].file_offset as u64;
        self.current_data_reader
            .as_mut()
            .expect("switch_to_file opened a reader")
            .seek(byte_offset)?;

        let preceding: u64 = self
            .file_entries
            .iter()
            .take_while(|e| e.file_id < file_id)
            .map(|e| e.index_count as u64)
            .sum();
        self.current_position = preceding + local_idx as u64;

        debug!(target, file_id, local_idx, "seeked to time");
        Ok(true)
    }

    /// Seeks to the `n`th packet in capture order (0-based). Returns
    /// `false` if `n` is negative or out of range.
    pub fn seek_to_position(&mut self, n: i64) -> Result<bool> {
        if n < 0 || n as u64 >= self.packet_count() as u64 {
            return Ok(false);
        }
        let (file_id, local_idx) = self
            .locate_position(n as u64)
            .expect("n is within packet_count()");

        let offsets = self.offsets_for_file(file_id)?;
        self.switch_to_file(file_id)?;
        let byte_offset = offsets[local_idx as usize].file_offset as u64;
        self.current_data_reader
            .as_mut()
            .expect("switch_to_file opened a reader")
            .seek(byte_offset)?;

        self.current_position = n as u64;
        Ok(true)
    }

    /// Reads the packet at absolute position `n`, leaving the cursor
    /// positioned just after it (as `read_next_packet` would).
    pub fn read_packet_at(&mut self, n: i64) -> Result<Option<Packet>> {
        if !self.seek_to_position(n)? {
            return Ok(None);
        }
        self.read_next_packet()
    }

    pub fn position(&self) -> u64 {
        self.current_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::writer::{ProjectWriter, ProjectWriterConfig};

    fn write_fixture(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("capture.pcap");
        let config = ProjectWriterConfig::builder()
            .max_packets_per_file(5)
            .index_interval_ms(1)
            .build();
        let mut writer = ProjectWriter::create(&path, config).unwrap();
        for ts in 0..23i64 {
            writer
                .write_packet(&Packet::new(ts * 10, ts.to_le_bytes().to_vec()).unwrap())
                .unwrap();
        }
        writer.close().unwrap();
        path
    }

    #[test]
    fn reads_every_packet_back_in_order_across_file_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir);
        let mut reader = ProjectReader::open(&path).unwrap();

        assert_eq!(reader.packet_count(), 23);
        let all = reader.read_packets(100).unwrap();
        assert_eq!(all.len(), 23);
        for (i, packet) in all.iter().enumerate() {
            assert_eq!(packet.timestamp_ms, i as i64 * 10);
        }
        assert!(reader.read_next_packet().unwrap().is_none());
    }

    #[test]
    fn seek_to_time_lands_on_the_right_packet() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir);
        let mut reader = ProjectReader::open(&path).unwrap();

        assert!(reader.seek_to_time(105).unwrap());
        let packet = reader.read_next_packet().unwrap().unwrap();
        assert_eq!(packet.timestamp_ms, 100);
    }

    #[test]
    fn seek_to_time_outside_range_leaves_cursor_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir);
        let mut reader = ProjectReader::open(&path).unwrap();

        assert!(!reader.seek_to_time(-1).unwrap());
        assert!(!reader.seek_to_time(1_000_000).unwrap());
    }

    #[test]
    fn seek_to_position_and_read_packet_at_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir);
        let mut reader = ProjectReader::open(&path).unwrap();

        let packet = reader.read_packet_at(17).unwrap().unwrap();
        assert_eq!(packet.timestamp_ms, 170);
        assert_eq!(reader.position(), 18);
    }

    #[test]
    fn seek_to_position_rejects_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir);
        let mut reader = ProjectReader::open(&path).unwrap();

        assert!(!reader.seek_to_position(-1).unwrap());
        assert!(!reader.seek_to_position(23).unwrap());
    }

    #[test]
    fn reset_allows_reading_from_the_start_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir);
        let mut reader = ProjectReader::open(&path).unwrap();

        reader.read_packets(5).unwrap();
        reader.reset();
        let packet = reader.read_next_packet().unwrap().unwrap();
        assert_eq!(packet.timestamp_ms, 0);
    }
}
