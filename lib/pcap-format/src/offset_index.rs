//! [`OffsetIndexEntry`]: per-file table mapping packet timestamp to byte
//! offset, recorded for every packet.

use bytes::{Buf, BufMut};

use crate::codec::{ensure_len, FixedLayout};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetIndexEntry {
    pub timestamp_ms: i64,
    pub file_offset: i64,
}

impl FixedLayout for OffsetIndexEntry {
    const SIZE: usize = 16;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.put_i64_le(self.timestamp_ms);
        buf.put_i64_le(self.file_offset);
        buf
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, Self::SIZE, "OffsetIndexEntry")?;
        let mut cur = buf;
        let timestamp_ms = cur.get_i64_le();
        let file_offset = cur.get_i64_le();
        Ok(Self {
            timestamp_ms,
            file_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let entry = OffsetIndexEntry {
            timestamp_ms: 1_700_000_000_000,
            file_offset: 16,
        };
        let bytes = entry.to_bytes();
        assert_eq!(bytes.len(), OffsetIndexEntry::SIZE);
        assert_eq!(OffsetIndexEntry::from_bytes(&bytes).unwrap(), entry);
    }
}
