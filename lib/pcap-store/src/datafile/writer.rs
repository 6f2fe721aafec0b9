//! Data-file writer (C3): creates and appends to a single bounded data
//! file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pcap_format::{DataFileHeader, FixedLayout, PacketHeader, Packet, PcapError, Result};
use tracing::{debug, trace};

/// Writes are buffered through roughly this much memory before hitting the
/// OS; payloads larger than this bypass the buffer entirely (spec §4.3).
const WRITE_BUFFER_SIZE: usize = 1024 * 1024;

/// Chunk size used to stream a payload that bypasses the write buffer.
const LARGE_PAYLOAD_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Default cap on packets per data file (spec §3); configurable per
/// project via [`DataFileWriter::create`].
pub const DEFAULT_MAX_PACKETS_PER_FILE: u32 = 500;

pub struct DataFileWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    next_offset: u64,
    packet_count: u32,
    max_packets_per_file: u32,
}

impl DataFileWriter {
    /// Creates a new data file at `path`, writing its 16-byte header.
    ///
    /// Fails if a file already exists at `path`: data files are created
    /// once and never reopened for append across process restarts.
    pub fn create(
        path: impl AsRef<Path>,
        max_packets_per_file: u32,
        timezone: i32,
        timestamp_accuracy: u32,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(PcapError::from)?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        let header = DataFileHeader::new(timezone, timestamp_accuracy);
        writer.write_all(&header.to_bytes())?;
        writer.flush()?;
        debug!(path = %path.display(), "created data file");
        Ok(Self {
            path,
            writer,
            next_offset: DataFileHeader::SIZE as u64,
            packet_count: 0,
            max_packets_per_file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_packet_count(&self) -> u32 {
        self.packet_count
    }

    pub fn max_packets_per_file(&self) -> u32 {
        self.max_packets_per_file
    }

    pub fn is_full(&self) -> bool {
        self.packet_count >= self.max_packets_per_file
    }

    /// Appends `packet`, returning the byte offset of its frame header.
    ///
    /// The returned offset is exactly `16 + Σ(prior frame sizes)` and is
    /// strictly increasing across calls within one file's lifetime.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<u64> {
        let header = packet.header();
        PacketHeader::validate_length(header.length)?;

        let offset = self.next_offset;
        self.writer.write_all(&header.to_bytes())?;

        if packet.payload.len() > WRITE_BUFFER_SIZE {
            // Bypass the buffer for large payloads: flush what's pending,
            // then stream the payload directly in bounded chunks.
            self.writer.flush()?;
            let file = self.writer.get_mut();
            for chunk in packet.payload.chunks(LARGE_PAYLOAD_CHUNK_SIZE) {
                file.write_all(chunk)?;
            }
        } else {
            self.writer.write_all(&packet.payload)?;
        }

        self.next_offset += PacketHeader::SIZE as u64 + packet.payload.len() as u64;
        self.packet_count += 1;
        trace!(offset, len = packet.payload.len(), "wrote packet");
        Ok(offset)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcap_format::Packet;

    fn tmp_path(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        dir.path().join(name)
    }

    #[test]
    fn offsets_are_monotonically_increasing_and_start_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            DataFileWriter::create(tmp_path(&dir, "a.pata"), 500, 0, 1_000_000).unwrap();

        let p1 = Packet::new(0, b"abc".to_vec()).unwrap();
        let p2 = Packet::new(1, b"de".to_vec()).unwrap();

        let off1 = writer.write_packet(&p1).unwrap();
        let off2 = writer.write_packet(&p2).unwrap();

        assert_eq!(off1, 16);
        assert_eq!(off2, 16 + 16 + 3);
        assert_eq!(writer.current_packet_count(), 2);
    }

    #[test]
    fn is_full_reflects_max_packets_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DataFileWriter::create(tmp_path(&dir, "a.pata"), 1, 0, 0).unwrap();
        assert!(!writer.is_full());
        writer
            .write_packet(&Packet::new(0, b"x".to_vec()).unwrap())
            .unwrap();
        assert!(writer.is_full());
    }

    #[test]
    fn large_payload_bypasses_the_write_buffer_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DataFileWriter::create(tmp_path(&dir, "a.pata"), 500, 0, 0).unwrap();
        let payload = vec![0xAB; WRITE_BUFFER_SIZE + 17];
        let packet = Packet::new(5, payload.clone()).unwrap();
        let offset = writer.write_packet(&packet).unwrap();
        writer.close().unwrap();

        let bytes = std::fs::read(tmp_path(&dir, "a.pata")).unwrap();
        let recovered = &bytes[offset as usize + 16..offset as usize + 16 + payload.len()];
        assert_eq!(recovered, payload.as_slice());
    }

    #[test]
    fn create_fails_if_path_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = tmp_path(&dir, "a.pata");
        DataFileWriter::create(&path, 500, 0, 0).unwrap().close().unwrap();
        let err = DataFileWriter::create(&path, 500, 0, 0).unwrap_err();
        assert!(matches!(err, PcapError::Io { .. }));
    }
}
