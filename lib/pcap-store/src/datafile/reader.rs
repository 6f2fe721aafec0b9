//! Data-file reader (C4): opens a data file and reads framed packets with
//! buffered I/O, seeking by byte offset and validating per-packet CRC.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use pcap_format::{crc32, DataFileHeader, FixedLayout, Packet, PacketHeader, PcapError, Result};
use tracing::warn;

/// Read buffer size for frame headers and small payloads (spec §4.4).
const READ_BUFFER_SIZE: usize = 4 * 1024;

/// How the reader treats a packet whose stored checksum does not match its
/// recomputed CRC-32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcMode {
    /// Fail with [`PcapError::IntegrityError`] (the default).
    Strict,
    /// Log a warning and return the packet anyway, flagged as corrupted.
    Lenient,
}

/// A packet read back from a data file, annotated with whether its
/// checksum verified.
#[derive(Debug, Clone)]
pub struct ReadPacket {
    pub packet: Packet,
    pub checksum_valid: bool,
}

pub struct DataFileReader {
    path: PathBuf,
    reader: BufReader<File>,
    crc_mode: CrcMode,
    pub header: DataFileHeader,
}

impl DataFileReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_mode(path, CrcMode::Strict)
    }

    pub fn open_with_mode(path: impl AsRef<Path>, crc_mode: CrcMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(PcapError::from)?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut header_buf = [0u8; DataFileHeader::SIZE];
        reader.read_exact(&mut header_buf).map_err(|e| {
            PcapError::invalid_format(format!("truncated data file header: {e}"))
        })?;
        let header = DataFileHeader::from_bytes(&header_buf)?;

        Ok(Self {
            path,
            reader,
            crc_mode,
            header,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Positions the cursor at an absolute byte offset. The caller is
    /// responsible for supplying an offset that actually frames a packet
    /// (e.g. one returned by the writer or read from an offset index).
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.reader.seek(SeekFrom::Start(offset)).map_err(PcapError::from)?;
        Ok(())
    }

    pub fn position(&mut self) -> Result<u64> {
        self.reader.stream_position().map_err(PcapError::from)
    }

    /// Reads the next packet frame, or `Ok(None)` at a clean end of file.
    pub fn read_packet(&mut self) -> Result<Option<ReadPacket>> {
        let mut header_buf = [0u8; PacketHeader::SIZE];
        let n = read_up_to(&mut self.reader, &mut header_buf)?;
        if n == 0 {
            return Ok(None);
        }
        if n != header_buf.len() {
            return Err(PcapError::invalid_format(
                "truncated packet header at end of data file",
            ));
        }

        let header = PacketHeader::from_bytes(&header_buf)?;
        PacketHeader::validate_length(header.length)?;

        let mut payload = vec![0u8; header.length as usize];
        self.reader.read_exact(&mut payload).map_err(|e| {
            PcapError::invalid_format(format!("truncated packet payload: {e}"))
        })?;

        let calculated = crc32::checksum(&payload);
        let checksum_valid = calculated == header.checksum;
        if !checksum_valid {
            match self.crc_mode {
                CrcMode::Strict => {
                    return Err(PcapError::integrity(format!(
                        "checksum mismatch at offset in {}: expected {:#010x}, calculated {:#010x}",
                        self.path.display(),
                        header.checksum,
                        calculated
                    )));
                }
                CrcMode::Lenient => {
                    warn!(
                        path = %self.path.display(),
                        expected = header.checksum,
                        calculated,
                        "packet checksum mismatch (lenient mode, continuing)"
                    );
                }
            }
        }

        let packet = Packet {
            timestamp_ms: header.timestamp_ms,
            payload,
        };
        Ok(Some(ReadPacket {
            packet,
            checksum_valid,
        }))
    }

    pub fn close(self) {}
}

/// Reads into `buf`, returning the number of bytes actually read (which may
/// be `0` at a clean EOF or less than `buf.len()` at a truncated stream).
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) => return Err(PcapError::from(e)),
        }
    }
    Ok(total)
}
