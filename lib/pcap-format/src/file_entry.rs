//! [`FileEntry`]: the 286-byte project-level record describing one data
//! file.

use bytes::{Buf, BufMut};

use crate::codec::{ensure_len, FixedLayout};
use crate::error::{PcapError, Result};

/// Fixed width of the null-padded UTF-8 relative-path slot.
const PATH_SLOT_LEN: usize = 256;

/// Metadata describing one data file within a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// 1-based, monotonically increasing within a project.
    pub file_id: u32,
    /// Path of the data file, relative to the project's companion
    /// directory. At most 255 UTF-8 bytes.
    pub relative_path: String,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    /// Number of packets actually written to this data file.
    pub index_count: u32,
}

impl FileEntry {
    pub fn new(file_id: u32, relative_path: impl Into<String>, timestamp: i64) -> Result<Self> {
        let relative_path = relative_path.into();
        if relative_path.len() > 255 {
            return Err(PcapError::invalid_argument(format!(
                "relative_path of {} bytes exceeds the 255-byte limit",
                relative_path.len()
            )));
        }
        Ok(Self {
            file_id,
            relative_path,
            start_timestamp: timestamp,
            end_timestamp: timestamp,
            index_count: 0,
        })
    }
}

impl FixedLayout for FileEntry {
    const SIZE: usize = 286;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.put_u32_le(self.file_id);
        let path_bytes = self.relative_path.as_bytes();
        buf.put_u16_le(path_bytes.len() as u16);
        let mut slot = [0u8; PATH_SLOT_LEN];
        slot[..path_bytes.len()].copy_from_slice(path_bytes);
        buf.put_slice(&slot);
        buf.put_i64_le(self.start_timestamp);
        buf.put_i64_le(self.end_timestamp);
        buf.put_u32_le(self.index_count);
        buf.put_u32_le(0); // reserved
        debug_assert_eq!(buf.len(), Self::SIZE);
        buf
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, Self::SIZE, "FileEntry")?;
        let mut cur = buf;
        let file_id = cur.get_u32_le();
        let path_length = cur.get_u16_le() as usize;
        if path_length > PATH_SLOT_LEN {
            return Err(PcapError::invalid_format(format!(
                "FileEntry path_length {path_length} exceeds the {PATH_SLOT_LEN}-byte slot"
            )));
        }
        let slot = &cur[..PATH_SLOT_LEN];
        cur.advance(PATH_SLOT_LEN);
        let relative_path = std::str::from_utf8(&slot[..path_length])
            .map_err(|e| PcapError::invalid_format(format!("FileEntry relative_path: {e}")))?
            .to_owned();
        let start_timestamp = cur.get_i64_le();
        let end_timestamp = cur.get_i64_le();
        let index_count = cur.get_u32_le();
        let _reserved = cur.get_u32_le();
        Ok(Self {
            file_id,
            relative_path,
            start_timestamp,
            end_timestamp,
            index_count,
        })
    }
}
