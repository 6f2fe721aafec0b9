//! Basic write-then-read round trips (S1) and seek behavior (S4).

use super::*;

#[test]
fn a_freshly_written_project_reads_back_every_packet_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = project_path(&dir, "basic.pcap");
    let mut writer = write_n_packets(&path, ProjectWriterConfig::default(), 50, 32);
    writer.close().unwrap();

    let mut reader = ProjectReader::open(&path).unwrap();
    assert_eq!(reader.packet_count(), 50);
    assert_eq!(reader.start_time(), Some(0));
    assert_eq!(reader.end_time(), Some(4_900));

    let packets = reader.read_packets(50).unwrap();
    assert_eq!(packets.len(), 50);
    for (i, packet) in packets.iter().enumerate() {
        assert_eq!(packet.timestamp_ms, i as i64 * 100);
    }
}

#[test]
fn seek_to_time_lands_on_the_greatest_timestamp_not_after_the_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = project_path(&dir, "seek.pcap");
    let config = ProjectWriterConfig::builder().max_packets_per_file(7).build();
    let mut writer = write_n_packets(&path, config, 40, 16);
    writer.close().unwrap();

    let mut reader = ProjectReader::open(&path).unwrap();
    // Packets are spaced 100ms apart; 1_550 falls strictly between 1_500
    // and 1_600, so the seek should land on 1_500 (the greatest timestamp
    // not after the target) and continue sequentially from there.
    assert!(reader.seek_to_time(1_550).unwrap());
    let packets = reader.read_packets(3).unwrap();
    assert_eq!(packets[0].timestamp_ms, 1_500);
    assert_eq!(packets[1].timestamp_ms, 1_600);
    assert_eq!(packets[2].timestamp_ms, 1_700);
}

#[test]
fn seek_to_time_refines_past_a_time_index_sample_that_undershoots_the_file() {
    // With the default 1_000ms sampling interval and 7 packets per file at
    // 100ms spacing, each file spans only 700ms: files after the first get
    // no time-index sample of their own, so the greatest sample <= target
    // can name an earlier file than the one actually holding the greatest
    // packet <= target. Files here are [0..600], [700..1300], [1400..2000],
    // ...; the only samples are {0, 1000, 2000}. seek_to_time(1_550) must
    // still resolve to 1_500, in file 3, not 1_300 from the sampled file 2.
    let dir = tempfile::tempdir().unwrap();
    let path = project_path(&dir, "seek_coarse_sample.pcap");
    let config = ProjectWriterConfig::builder().max_packets_per_file(7).build();
    let mut writer = write_n_packets(&path, config, 40, 16);
    writer.close().unwrap();

    let mut reader = ProjectReader::open(&path).unwrap();
    assert!(reader.seek_to_time(1_550).unwrap());
    let packet = reader.read_next_packet().unwrap().unwrap();
    assert_eq!(packet.timestamp_ms, 1_500);
}

#[test]
fn seek_to_time_with_an_exact_match_lands_on_that_packet() {
    let dir = tempfile::tempdir().unwrap();
    let path = project_path(&dir, "seek_exact.pcap");
    let config = ProjectWriterConfig::builder()
        .max_packets_per_file(10)
        .build();
    let mut writer = write_n_packets(&path, config, 25, 16);
    writer.close().unwrap();

    // Mirrors S4: with MAX_PACKETS_PER_FILE == 10, timestamp 1_500 (packet
    // index 15, local index 5 of file 2) should be returned exactly.
    let mut reader = ProjectReader::open(&path).unwrap();
    assert!(reader.seek_to_time(1_500).unwrap());
    let packet = reader.read_next_packet().unwrap().unwrap();
    assert_eq!(packet.timestamp_ms, 1_500);
}

#[test]
fn an_empty_project_reports_no_packets_and_a_none_time_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = project_path(&dir, "empty.pcap");
    let mut writer = ProjectWriter::create(&path, ProjectWriterConfig::default()).unwrap();
    writer.close().unwrap();

    let mut reader = ProjectReader::open(&path).unwrap();
    assert_eq!(reader.packet_count(), 0);
    assert_eq!(reader.start_time(), None);
    assert!(reader.read_next_packet().unwrap().is_none());
}

#[test]
fn large_payloads_round_trip_through_the_bypass_buffer_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = project_path(&dir, "large.pcap");
    let mut writer = ProjectWriter::create(&path, ProjectWriterConfig::default()).unwrap();
    let big = vec![0x42u8; 3 * 1024 * 1024];
    writer
        .write_packet(&Packet::new(0, big.clone()).unwrap())
        .unwrap();
    writer.close().unwrap();

    let mut reader = ProjectReader::open(&path).unwrap();
    let packet = reader.read_next_packet().unwrap().unwrap();
    assert_eq!(packet.payload, big);
}
