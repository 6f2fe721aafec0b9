//! On-disk container format for the packet-capture storage engine.
//!
//! This crate owns everything that has a fixed, normative byte layout:
//! the packet frame header, the data-file header, the project header, and
//! the three table-entry types (file entry, time index, offset index). It
//! also owns the CRC-32 implementation and the error taxonomy shared across
//! the workspace (`pcap-store` builds the writer/reader state machines on
//! top of these types; `pcap-replay` reuses [`PcapError`] for its own
//! pipeline).
//!
//! Nothing in this crate performs I/O. Every type here converts cleanly
//! to and from a byte slice and leaves file handling to `pcap-store`.

pub mod codec;
pub mod crc32;
pub mod error;
pub mod file_entry;
pub mod headers;
pub mod offset_index;
pub mod packet;
pub mod time_index;

pub use codec::FixedLayout;
pub use error::{PcapError, Result};
pub use file_entry::FileEntry;
pub use headers::{
    DataFileHeader, ProjectHeader, DATA_FILE_MAGIC, DATA_FILE_VERSION_MAJOR,
    DATA_FILE_VERSION_MINOR, PROJECT_FILE_MAGIC, PROJECT_FILE_VERSION_MAJOR,
    PROJECT_FILE_VERSION_MINOR, PROJECT_HEADER_LEN,
};
pub use offset_index::OffsetIndexEntry;
pub use packet::{Packet, PacketHeader, MAX_PACKET_PAYLOAD_LEN};
pub use time_index::TimeIndexEntry;

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn packet_header_round_trips_for_any_fields(
            timestamp_ms: i64,
            length: u32,
            checksum: u32,
        ) {
            let header = PacketHeader { timestamp_ms, length, checksum };
            let bytes = header.to_bytes();
            prop_assert_eq!(PacketHeader::from_bytes(&bytes).unwrap(), header);
        }

        #[test]
        fn offset_index_entry_round_trips(timestamp_ms: i64, file_offset: i64) {
            let entry = OffsetIndexEntry { timestamp_ms, file_offset };
            let bytes = entry.to_bytes();
            prop_assert_eq!(OffsetIndexEntry::from_bytes(&bytes).unwrap(), entry);
        }

        #[test]
        fn crc32_is_deterministic(data in prop::collection::vec(any::<u8>(), 0..4096)) {
            prop_assert_eq!(crc32::checksum(&data), crc32::checksum(&data));
        }
    }
}
