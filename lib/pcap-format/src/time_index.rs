//! [`TimeIndexEntry`]: project-level table sampling `(file_id, timestamp)`
//! at a configurable minimum interval.

use bytes::{Buf, BufMut};

use crate::codec::{ensure_len, FixedLayout};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeIndexEntry {
    pub file_id: u32,
    pub timestamp_ms: i64,
}

impl FixedLayout for TimeIndexEntry {
    const SIZE: usize = 12;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.put_u32_le(self.file_id);
        buf.put_i64_le(self.timestamp_ms);
        buf
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, Self::SIZE, "TimeIndexEntry")?;
        let mut cur = buf;
        let file_id = cur.get_u32_le();
        let timestamp_ms = cur.get_i64_le();
        Ok(Self {
            file_id,
            timestamp_ms,
        })
    }
}
