//! File roll-over (S2) and time-index sampling (S3).

use super::*;

#[test]
fn rolls_files_at_the_configured_packet_count_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = project_path(&dir, "rolling.pcap");
    let config = ProjectWriterConfig::builder()
        .max_packets_per_file(10)
        .build();
    let mut writer = ProjectWriter::create(&path, config).unwrap();
    for ts in 0..25i64 {
        writer
            .write_packet(&Packet::new(ts, vec![0xAB; 16]).unwrap())
            .unwrap();
    }
    writer.close().unwrap();

    let reader = ProjectReader::open(&path).unwrap();
    let entries = reader.file_entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].index_count, 10);
    assert_eq!(entries[1].index_count, 10);
    assert_eq!(entries[2].index_count, 5);
    assert_eq!((entries[0].start_timestamp, entries[0].end_timestamp), (0, 9));
    assert_eq!((entries[1].start_timestamp, entries[1].end_timestamp), (10, 19));
    assert_eq!((entries[2].start_timestamp, entries[2].end_timestamp), (20, 24));
}

#[test]
fn samples_the_time_index_at_the_configured_interval() {
    let dir = tempfile::tempdir().unwrap();
    let path = project_path(&dir, "time_index.pcap");
    let config = ProjectWriterConfig::builder().index_interval_ms(100).build();
    let mut writer = ProjectWriter::create(&path, config).unwrap();
    for ts in [0, 30, 60, 99, 100, 150, 250] {
        writer
            .write_packet(&Packet::new(ts, b"p".to_vec()).unwrap())
            .unwrap();
    }
    writer.close().unwrap();

    // The exact sampled set is checked directly against ProjectWriter's
    // in-memory table in project::writer's own tests; here we only check
    // that seeking still resolves correctly once those samples are read
    // back from disk.
    let mut reader = ProjectReader::open(&path).unwrap();
    assert!(reader.seek_to_time(200).unwrap());
    let packet = reader.read_next_packet().unwrap().unwrap();
    assert_eq!(packet.timestamp_ms, 150);
}
