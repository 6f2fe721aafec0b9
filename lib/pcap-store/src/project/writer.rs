//! Project writer (C7): drives the data-file writer and index-file writer,
//! maintains rolling-file state and in-memory index tables, and finalizes
//! the project on close.
//!
//! All index tables are held in memory and written to the project file
//! only on [`ProjectWriter::close`] (spec §4.7, §9): this amortizes I/O
//! into one compact metadata region and removes any need to seek-and-patch
//! the project file during the hot write path. An abnormal exit before
//! `close` therefore leaves the project file with its original empty
//! header — a reader opening it sees zero file entries, not corruption.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use pcap_format::{FileEntry, OffsetIndexEntry, Packet, PcapError, Result, TimeIndexEntry};
use tracing::{debug, info};

use crate::datafile::{DataFileWriter, DEFAULT_MAX_PACKETS_PER_FILE};
use crate::indexfile::IndexFileWriter;
use crate::path;

/// Tunables for a [`ProjectWriter`], built the way
/// `vector_buffers::DiskBufferConfigBuilder` builds its config: an
/// `Option<T>`-field builder with a `build()` that fills in defaults.
#[derive(Debug, Clone)]
pub struct ProjectWriterConfig {
    max_packets_per_file: u32,
    index_interval_ms: u16,
    auto_flush: bool,
    data_file_ext: String,
    timezone: i32,
    timestamp_accuracy: u32,
}

impl ProjectWriterConfig {
    pub fn builder() -> ProjectWriterConfigBuilder {
        ProjectWriterConfigBuilder::default()
    }
}

impl Default for ProjectWriterConfig {
    fn default() -> Self {
        ProjectWriterConfigBuilder::default().build()
    }
}

#[derive(Debug, Default)]
pub struct ProjectWriterConfigBuilder {
    max_packets_per_file: Option<u32>,
    index_interval_ms: Option<u16>,
    auto_flush: Option<bool>,
    data_file_ext: Option<String>,
    timezone: Option<i32>,
    timestamp_accuracy: Option<u32>,
}

impl ProjectWriterConfigBuilder {
    pub fn max_packets_per_file(mut self, n: u32) -> Self {
        self.max_packets_per_file = Some(n);
        self
    }

    pub fn index_interval_ms(mut self, ms: u16) -> Self {
        self.index_interval_ms = Some(ms);
        self
    }

    pub fn auto_flush(mut self, enabled: bool) -> Self {
        self.auto_flush = Some(enabled);
        self
    }

    pub fn data_file_ext(mut self, ext: impl Into<String>) -> Self {
        self.data_file_ext = Some(ext.into());
        self
    }

    pub fn timezone(mut self, tz: i32) -> Self {
        self.timezone = Some(tz);
        self
    }

    pub fn timestamp_accuracy(mut self, accuracy: u32) -> Self {
        self.timestamp_accuracy = Some(accuracy);
        self
    }

    pub fn build(self) -> ProjectWriterConfig {
        ProjectWriterConfig {
            max_packets_per_file: self
                .max_packets_per_file
                .unwrap_or(DEFAULT_MAX_PACKETS_PER_FILE),
            // The spec leaves the default sampling interval unstated; 1
            // second is a reasonable middle ground between index density
            // and table size for typical capture rates.
            index_interval_ms: self.index_interval_ms.unwrap_or(1_000),
            auto_flush: self.auto_flush.unwrap_or(true),
            data_file_ext: self
                .data_file_ext
                .unwrap_or_else(|| path::DEFAULT_DATA_FILE_EXT.to_string()),
            timezone: self.timezone.unwrap_or(0),
            timestamp_accuracy: self.timestamp_accuracy.unwrap_or(0),
        }
    }
}

pub struct ProjectWriter {
    project_path: PathBuf,
    data_dir: PathBuf,
    config: ProjectWriterConfig,

    index_writer: IndexFileWriter,
    current_data_writer: Option<DataFileWriter>,

    file_entries: Vec<FileEntry>,
    time_indices: Vec<TimeIndexEntry>,
    file_indices: HashMap<String, Vec<OffsetIndexEntry>>,

    current_file_id: u32,
    last_packet_ts: i64,
    last_indexed_ts: Option<i64>,
    first_packet_written: bool,
    closed: bool,
}

impl ProjectWriter {
    /// Creates a brand-new project at `project_path`, clearing any
    /// pre-existing companion data directory first (spec §5: a project
    /// directory has exactly one live writer, so re-creating it must not
    /// leave stale data files for the new index to drift against).
    pub fn create(project_path: impl AsRef<Path>, config: ProjectWriterConfig) -> Result<Self> {
        let project_path = project_path.as_ref().to_path_buf();
        let data_dir = path::companion_dir(&project_path);

        path::clear_directory(&data_dir)?;
        fs::create_dir_all(&data_dir).map_err(PcapError::from)?;

        let index_writer = IndexFileWriter::create(&project_path, config.index_interval_ms)?;
        info!(project = %project_path.display(), "created project");

        Ok(Self {
            project_path,
            data_dir,
            config,
            index_writer,
            current_data_writer: None,
            file_entries: Vec::new(),
            time_indices: Vec::new(),
            file_indices: HashMap::new(),
            current_file_id: 0,
            last_packet_ts: 0,
            last_indexed_ts: None,
            first_packet_written: false,
            closed: false,
        })
    }

    /// Opens `project_path` for writing. The storage engine supports
    /// exactly one writer generation per project directory at a time (spec
    /// §5), so this has the same clear-then-create semantics as
    /// [`Self::create`]; there is no append-to-an-existing-project mode.
    pub fn open(project_path: impl AsRef<Path>, config: ProjectWriterConfig) -> Result<Self> {
        Self::create(project_path, config)
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    pub fn packet_count(&self) -> u32 {
        self.file_entries.iter().map(|e| e.index_count).sum()
    }

    fn current_writer_is_full(&self) -> bool {
        self.current_data_writer
            .as_ref()
            .map(DataFileWriter::is_full)
            .unwrap_or(false)
    }

    fn roll_to_new_file(&mut self, timestamp_ms: i64) -> Result<()> {
        self.current_file_id += 1;
        let data_path = path::new_data_file_path(
            &self.project_path,
            timestamp_ms,
            &self.config.data_file_ext,
        );
        let writer = DataFileWriter::create(
            &data_path,
            self.config.max_packets_per_file,
            self.config.timezone,
            self.config.timestamp_accuracy,
        )?;
        let relative_path = data_path
            .file_name()
            .expect("data file path always has a file name")
            .to_string_lossy()
            .into_owned();

        debug!(file_id = self.current_file_id, %relative_path, "rolled to new data file");

        self.file_entries
            .push(FileEntry::new(self.current_file_id, relative_path.clone(), timestamp_ms)?);
        self.file_indices.insert(relative_path, Vec::new());
        self.current_data_writer = Some(writer);
        Ok(())
    }

    fn seal_current_file(&mut self) -> Result<()> {
        if let Some(writer) = self.current_data_writer.take() {
            writer.close()?;
        }
        Ok(())
    }

    /// Appends one packet, rolling to a new data file first if the current
    /// one has reached its packet-count limit (spec §4.7).
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        if self.closed {
            return Err(PcapError::invalid_state("project writer is closed"));
        }

        if !self.first_packet_written {
            self.roll_to_new_file(packet.timestamp_ms)?;
            self.first_packet_written = true;
        } else if self.current_writer_is_full() {
            self.seal_current_file()?;
            self.roll_to_new_file(packet.timestamp_ms)?;
        }

        let writer = self
            .current_data_writer
            .as_mut()
            .expect("a data file is always open once first_packet_written is set");
        let file_offset = writer.write_packet(packet)?;

        let entry = self
            .file_entries
            .last_mut()
            .expect("a file entry exists for the current data file");
        let relative_path = entry.relative_path.clone();

        let offsets = self
            .file_indices
            .get_mut(&relative_path)
            .expect("offset-index bucket exists for the current data file");
        offsets.push(OffsetIndexEntry {
            timestamp_ms: packet.timestamp_ms,
            file_offset: file_offset as i64,
        });

        let due_for_time_sample = match self.last_indexed_ts {
            None => true,
            Some(last) => {
                packet.timestamp_ms - last >= self.config.index_interval_ms as i64
            }
        };
        if due_for_time_sample {
            self.time_indices.push(TimeIndexEntry {
                file_id: self.current_file_id,
                timestamp_ms: packet.timestamp_ms,
            });
            self.last_indexed_ts = Some(packet.timestamp_ms);
        }

        let entry = self
            .file_entries
            .last_mut()
            .expect("a file entry exists for the current data file");
        entry.end_timestamp = packet.timestamp_ms;
        entry.index_count = offsets.len() as u32;

        self.last_packet_ts = packet.timestamp_ms;

        if self.config.auto_flush {
            self.flush()?;
        }

        Ok(())
    }

    pub fn write_packets<I>(&mut self, packets: I) -> Result<()>
    where
        I: IntoIterator<Item = Packet>,
    {
        for packet in packets {
            self.write_packet(&packet)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.current_data_writer.as_mut() {
            writer.flush()?;
        }
        self.index_writer.flush()?;
        Ok(())
    }

    /// Flushes and closes the active data file, then finalizes the project
    /// file with the accumulated tables. Idempotent: calling `close` again
    /// after a successful close is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.seal_current_file()?;

        if !self.first_packet_written {
            return Ok(());
        }

        // Defensive recomputation: the offset-index map is the ground
        // truth for how many packets actually landed in each file.
        for entry in &mut self.file_entries {
            if let Some(offsets) = self.file_indices.get(&entry.relative_path) {
                entry.index_count = offsets.len() as u32;
            }
        }

        self.index_writer
            .write_all_indices(&self.file_entries, &self.time_indices, &self.file_indices)?;
        info!(
            project = %self.project_path.display(),
            files = self.file_entries.len(),
            packets = self.packet_count(),
            "finalized project"
        );
        Ok(())
    }
}

impl Drop for ProjectWriter {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(error) = self.close() {
                tracing::warn!(%error, "error finalizing project writer on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("capture.pcap")
    }

    #[test]
    fn write_after_close_is_invalid_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            ProjectWriter::create(project_path(&dir), ProjectWriterConfig::default()).unwrap();
        writer
            .write_packet(&Packet::new(0, b"a".to_vec()).unwrap())
            .unwrap();
        writer.close().unwrap();

        let err = writer
            .write_packet(&Packet::new(1, b"b".to_vec()).unwrap())
            .unwrap_err();
        assert!(matches!(err, PcapError::InvalidState { .. }));
    }

    #[test]
    fn close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            ProjectWriter::create(project_path(&dir), ProjectWriterConfig::default()).unwrap();
        writer
            .write_packet(&Packet::new(0, b"a".to_vec()).unwrap())
            .unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn closing_with_no_packets_leaves_an_empty_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = project_path(&dir);
        let mut writer = ProjectWriter::create(&path, ProjectWriterConfig::default()).unwrap();
        writer.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), pcap_format::PROJECT_HEADER_LEN);
    }

    #[test]
    fn rolls_to_a_new_file_when_packet_count_limit_is_reached() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectWriterConfig::builder()
            .max_packets_per_file(10)
            .build();
        let mut writer = ProjectWriter::create(project_path(&dir), config).unwrap();

        for ts in 0..25i64 {
            writer
                .write_packet(&Packet::new(ts, vec![0u8; 16]).unwrap())
                .unwrap();
        }
        writer.close().unwrap();

        assert_eq!(writer.file_entries.len(), 3);
        assert_eq!(writer.file_entries[0].index_count, 10);
        assert_eq!(writer.file_entries[1].index_count, 10);
        assert_eq!(writer.file_entries[2].index_count, 5);
        assert_eq!(writer.file_entries[0].start_timestamp, 0);
        assert_eq!(writer.file_entries[0].end_timestamp, 9);
        assert_eq!(writer.file_entries[1].start_timestamp, 10);
        assert_eq!(writer.file_entries[1].end_timestamp, 19);
        assert_eq!(writer.file_entries[2].start_timestamp, 20);
        assert_eq!(writer.file_entries[2].end_timestamp, 24);
    }

    #[test]
    fn time_index_samples_at_the_configured_interval() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectWriterConfig::builder().index_interval_ms(100).build();
        let mut writer = ProjectWriter::create(project_path(&dir), config).unwrap();

        for ts in [0, 30, 60, 99, 100, 150, 250] {
            writer
                .write_packet(&Packet::new(ts, b"x".to_vec()).unwrap())
                .unwrap();
        }
        writer.close().unwrap();

        let sampled: Vec<i64> = writer.time_indices.iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(sampled, vec![0, 100, 250]);
    }
}
