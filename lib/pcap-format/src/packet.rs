//! Packets and their on-disk frame header.
//!
//! Frame layout (16-byte header + payload):
//!
//! ```text
//! offset 0 : i64 timestamp_ms
//! offset 8 : u32 length
//! offset 12: u32 crc32
//! offset 16: length × u8 payload
//! ```

use bytes::{Buf, BufMut};

use crate::codec::{ensure_len, FixedLayout};
use crate::crc32;
use crate::error::{PcapError, Result};

/// One packet, 1..=30 MiB of opaque payload, captured at a given millisecond
/// timestamp.
pub const MAX_PACKET_PAYLOAD_LEN: usize = 30 * 1024 * 1024;

/// The 16-byte fixed header preceding every packet's payload on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub timestamp_ms: i64,
    pub length: u32,
    pub checksum: u32,
}

impl FixedLayout for PacketHeader {
    const SIZE: usize = 16;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.put_i64_le(self.timestamp_ms);
        buf.put_u32_le(self.length);
        buf.put_u32_le(self.checksum);
        buf
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, Self::SIZE, "PacketHeader")?;
        let mut cur = buf;
        let timestamp_ms = cur.get_i64_le();
        let length = cur.get_u32_le();
        let checksum = cur.get_u32_le();
        Ok(Self {
            timestamp_ms,
            length,
            checksum,
        })
    }
}

impl PacketHeader {
    /// Validates `length` against the spec's bounds, independent of any
    /// payload actually being in hand (used by readers before allocating).
    pub fn validate_length(length: u32) -> Result<()> {
        if length == 0 {
            return Err(PcapError::invalid_format(
                "packet length is zero (empty payloads are not stored)",
            ));
        }
        if length as usize > MAX_PACKET_PAYLOAD_LEN {
            return Err(PcapError::invalid_format(format!(
                "packet length {length} exceeds the {MAX_PACKET_PAYLOAD_LEN}-byte limit"
            )));
        }
        Ok(())
    }
}

/// A captured packet: timestamp plus an owned, checksummed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub timestamp_ms: i64,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Builds a packet, rejecting empty or oversized payloads per spec §3.
    pub fn new(timestamp_ms: i64, payload: Vec<u8>) -> Result<Self> {
        if payload.is_empty() {
            return Err(PcapError::invalid_argument(
                "packet payload must not be empty",
            ));
        }
        if payload.len() > MAX_PACKET_PAYLOAD_LEN {
            return Err(PcapError::invalid_argument(format!(
                "packet payload of {} bytes exceeds the {MAX_PACKET_PAYLOAD_LEN}-byte limit",
                payload.len()
            )));
        }
        Ok(Self {
            timestamp_ms,
            payload,
        })
    }

    pub fn checksum(&self) -> u32 {
        crc32::checksum(&self.payload)
    }

    pub fn header(&self) -> PacketHeader {
        PacketHeader {
            timestamp_ms: self.timestamp_ms,
            length: self.payload.len() as u32,
            checksum: self.checksum(),
        }
    }
}
