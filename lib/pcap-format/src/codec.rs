//! Fixed-layout struct ↔ byte conversion.
//!
//! Every on-disk record type in this crate is sequential, packed (no
//! padding), and little-endian. [`FixedLayout`] is the contract each of
//! those types implements: a fixed serialized size known at compile time,
//! an infallible `to_bytes`, and a `from_bytes` that validates the input is
//! at least `SIZE` bytes before reading a single field.

use crate::error::{PcapError, Result};

/// A record type with a fixed, known-in-advance on-disk size.
pub trait FixedLayout: Sized {
    /// Serialized length in bytes. Identical for every instance of `Self`.
    const SIZE: usize;

    /// Serializes `self` into exactly `SIZE` little-endian bytes.
    fn to_bytes(&self) -> Vec<u8>;

    /// Deserializes `Self` from the front of `buf`.
    ///
    /// Fails with [`PcapError::InvalidFormat`] if `buf` is shorter than
    /// [`Self::SIZE`]. Trailing bytes beyond `SIZE` are ignored, so callers
    /// may pass a larger buffer positioned at the start of the record.
    fn from_bytes(buf: &[u8]) -> Result<Self>;
}

/// Validates that `buf` holds at least `needed` bytes, naming `what` (the
/// record type) in the error for diagnosability.
pub(crate) fn ensure_len(buf: &[u8], needed: usize, what: &'static str) -> Result<()> {
    if buf.len() < needed {
        return Err(PcapError::invalid_format(format!(
            "{what}: buffer too short (need {needed} bytes, have {})",
            buf.len()
        )));
    }
    Ok(())
}
