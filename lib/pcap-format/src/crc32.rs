//! CRC-32 (IEEE 802.3, reflected, polynomial `0xEDB88320`).
//!
//! Thin wrapper around [`crc32fast`] so the rest of the crate never touches
//! the underlying hasher type directly. By convention (and unlike the
//! standard CRC-32 definition of an empty input), the checksum of an empty
//! slice is defined here as `0` rather than `0xFFFFFFFF` XOR'd back out —
//! see [`checksum`]'s doc comment and the `crc32_of_empty_is_zero` test.

use crc32fast::Hasher;

/// Computes the CRC-32 of a single contiguous buffer.
///
/// Returns `0` for an empty slice. This is a deliberate convention of this
/// container format, not the mathematical CRC-32 of zero bytes (which is
/// `0`, coincidentally matching here since `crc32fast::Hasher::finalize`
/// over no input already yields `0`).
pub fn checksum(data: &[u8]) -> u32 {
    if data.is_empty() {
        return 0;
    }
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Computes the CRC-32 over `data[offset..offset + length]`.
pub fn checksum_slice(data: &[u8], offset: usize, length: usize) -> u32 {
    checksum(&data[offset..offset + length])
}

/// Incremental CRC-32 accumulator for streaming input (e.g. payloads that
/// bypass the write buffer and are streamed in chunks).
#[derive(Default)]
pub struct StreamingCrc32 {
    hasher: Hasher,
    len: u64,
}

impl StreamingCrc32 {
    pub fn new() -> Self {
        Self {
            hasher: Hasher::new(),
            len: 0,
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.len += chunk.len() as u64;
    }

    pub fn finalize(self) -> u32 {
        if self.len == 0 {
            0
        } else {
            self.hasher.finalize()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_of_empty_is_zero() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn crc32_known_answer() {
        // The canonical CRC-32/ISO-HDLC check value for the ASCII string "123456789".
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn crc32_matches_between_streaming_and_oneshot() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(37);
        let oneshot = checksum(&data);

        let mut streaming = StreamingCrc32::new();
        for chunk in data.chunks(17) {
            streaming.update(chunk);
        }
        assert_eq!(streaming.finalize(), oneshot);
    }

    #[test]
    fn crc32_slice_matches_full_checksum_of_subrange() {
        let data = b"0123456789abcdef";
        assert_eq!(checksum_slice(data, 2, 5), checksum(&data[2..7]));
    }
}
