//! File-level headers: the 16-byte data-file header and the 32-byte project
//! header.

use bytes::{Buf, BufMut};

use crate::codec::{ensure_len, FixedLayout};
use crate::error::{PcapError, Result};

/// `"PATA"` in ASCII, little-endian as a u32.
pub const DATA_FILE_MAGIC: u32 = 0x5041_5441;
pub const DATA_FILE_VERSION_MAJOR: u16 = 2;
pub const DATA_FILE_VERSION_MINOR: u16 = 4;

pub const PROJECT_FILE_MAGIC: u32 = 0xA1B2_C3D4;
pub const PROJECT_FILE_VERSION_MAJOR: u16 = 2;
pub const PROJECT_FILE_VERSION_MINOR: u16 = 4;

/// Offset at which the file-entry table always begins: immediately after
/// the fixed 32-byte [`ProjectHeader`].
pub const PROJECT_HEADER_LEN: usize = 32;

/// 16-byte header at the start of every data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFileHeader {
    pub magic: u32,
    pub major: u16,
    pub minor: u16,
    pub timezone: i32,
    pub timestamp_accuracy: u32,
}

impl DataFileHeader {
    pub fn new(timezone: i32, timestamp_accuracy: u32) -> Self {
        Self {
            magic: DATA_FILE_MAGIC,
            major: DATA_FILE_VERSION_MAJOR,
            minor: DATA_FILE_VERSION_MINOR,
            timezone,
            timestamp_accuracy,
        }
    }
}

impl FixedLayout for DataFileHeader {
    const SIZE: usize = 16;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.put_u32_le(self.magic);
        buf.put_u16_le(self.major);
        buf.put_u16_le(self.minor);
        buf.put_i32_le(self.timezone);
        buf.put_u32_le(self.timestamp_accuracy);
        buf
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, Self::SIZE, "DataFileHeader")?;
        let mut cur = buf;
        let magic = cur.get_u32_le();
        if magic != DATA_FILE_MAGIC {
            return Err(PcapError::invalid_format(format!(
                "data file magic mismatch: expected {DATA_FILE_MAGIC:#010x}, found {magic:#010x}"
            )));
        }
        let major = cur.get_u16_le();
        let minor = cur.get_u16_le();
        let timezone = cur.get_i32_le();
        let timestamp_accuracy = cur.get_u32_le();
        Ok(Self {
            magic,
            major,
            minor,
            timezone,
            timestamp_accuracy,
        })
    }
}

/// 32-byte project-file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectHeader {
    pub magic: u32,
    pub major: u16,
    pub minor: u16,
    pub file_entry_offset: u32,
    pub file_count: u16,
    pub time_index_offset: u32,
    pub index_interval_ms: u16,
    pub total_index_count: u32,
    pub header_crc: u32,
    pub reserved: u16,
}

impl ProjectHeader {
    pub fn new(index_interval_ms: u16) -> Self {
        Self {
            magic: PROJECT_FILE_MAGIC,
            major: PROJECT_FILE_VERSION_MAJOR,
            minor: PROJECT_FILE_VERSION_MINOR,
            file_entry_offset: PROJECT_HEADER_LEN as u32,
            file_count: 0,
            time_index_offset: PROJECT_HEADER_LEN as u32,
            index_interval_ms,
            total_index_count: 0,
            header_crc: 0,
            reserved: 0,
        }
    }
}

impl FixedLayout for ProjectHeader {
    const SIZE: usize = 32;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.put_u32_le(self.magic);
        buf.put_u16_le(self.major);
        buf.put_u16_le(self.minor);
        buf.put_u32_le(self.file_entry_offset);
        buf.put_u16_le(self.file_count);
        buf.put_u32_le(self.time_index_offset);
        buf.put_u16_le(self.index_interval_ms);
        buf.put_u32_le(self.total_index_count);
        buf.put_u32_le(self.header_crc);
        buf.put_u16_le(self.reserved);
        // Two bytes of padding so the on-disk header is exactly 32 bytes
        // and the file-entry table begins at a 4-byte-aligned offset.
        buf.put_u16_le(0);
        debug_assert_eq!(buf.len(), Self::SIZE);
        buf
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, Self::SIZE, "ProjectHeader")?;
        let mut cur = buf;
        let magic = cur.get_u32_le();
        if magic != PROJECT_FILE_MAGIC {
            return Err(PcapError::invalid_format(format!(
                "project file magic mismatch: expected {PROJECT_FILE_MAGIC:#010x}, found {magic:#010x}"
            )));
        }
        let major = cur.get_u16_le();
        let minor = cur.get_u16_le();
        if major != PROJECT_FILE_VERSION_MAJOR {
            return Err(PcapError::invalid_format(format!(
                "unsupported project file major version {major}"
            )));
        }
        let file_entry_offset = cur.get_u32_le();
        let file_count = cur.get_u16_le();
        let time_index_offset = cur.get_u32_le();
        let index_interval_ms = cur.get_u16_le();
        let total_index_count = cur.get_u32_le();
        let header_crc = cur.get_u32_le();
        let reserved = cur.get_u16_le();
        Ok(Self {
            magic,
            major,
            minor,
            file_entry_offset,
            file_count,
            time_index_offset,
            index_interval_ms,
            total_index_count,
            header_crc,
            reserved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_file_header_round_trips() {
        let header = DataFileHeader::new(0, 1_000_000);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), DataFileHeader::SIZE);
        assert_eq!(DataFileHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn data_file_header_rejects_bad_magic() {
        let mut bytes = DataFileHeader::new(0, 0).to_bytes();
        bytes[0] = 0;
        let err = DataFileHeader::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, PcapError::InvalidFormat { .. }));
    }

    #[test]
    fn project_header_is_exactly_32_bytes_and_round_trips() {
        let mut header = ProjectHeader::new(250);
        header.file_count = 3;
        header.total_index_count = 77;
        header.header_crc = 0x1234_5678;
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), PROJECT_HEADER_LEN);
        assert_eq!(ProjectHeader::from_bytes(&bytes).unwrap(), header);
    }
}
