//! Checksum corruption under strict and lenient CRC modes (S5).

use super::*;

fn corrupt_a_payload_byte(data_dir: &std::path::Path) {
    let data_file = crate::path::list_data_files(data_dir).unwrap().into_iter().next().unwrap();
    let mut bytes = std::fs::read(&data_file).unwrap();
    // Flip a byte inside the second packet's payload: header(16) + first
    // packet's header+payload("a" is 1 byte => 17 bytes) + its own header(16).
    let target = 16 + 16 + 1 + 16;
    bytes[target] ^= 0xFF;
    std::fs::write(&data_file, bytes).unwrap();
}

#[test]
fn strict_mode_fails_at_the_corrupted_packet_and_does_not_advance_past_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = project_path(&dir, "corrupt.pcap");
    let mut writer = ProjectWriter::create(&path, ProjectWriterConfig::default()).unwrap();
    for payload in [b"a".to_vec(), b"bc".to_vec(), b"def".to_vec()] {
        writer
            .write_packet(&Packet::new(1_000, payload).unwrap())
            .unwrap();
    }
    writer.close().unwrap();

    corrupt_a_payload_byte(&crate::path::companion_dir(&path));

    let mut reader = ProjectReader::open_with_mode(&path, CrcMode::Strict).unwrap();
    let first = reader.read_next_packet().unwrap().unwrap();
    assert_eq!(first.payload, b"a");

    let err = reader.read_next_packet().unwrap_err();
    assert!(matches!(err, pcap_format::PcapError::IntegrityError { .. }));
}

#[test]
fn lenient_mode_returns_the_corrupted_packet_flagged_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    let path = project_path(&dir, "corrupt_lenient.pcap");
    let mut writer = ProjectWriter::create(&path, ProjectWriterConfig::default()).unwrap();
    for payload in [b"a".to_vec(), b"bc".to_vec(), b"def".to_vec()] {
        writer
            .write_packet(&Packet::new(1_000, payload).unwrap())
            .unwrap();
    }
    writer.close().unwrap();

    corrupt_a_payload_byte(&crate::path::companion_dir(&path));

    let mut reader = ProjectReader::open_with_mode(&path, CrcMode::Lenient).unwrap();
    let all = reader.read_packets(3).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].payload, {
        let mut corrupted = b"bc".to_vec();
        corrupted[0] ^= 0xFF;
        corrupted
    });
}
