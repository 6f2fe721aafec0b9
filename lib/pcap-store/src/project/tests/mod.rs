use std::path::PathBuf;

use pcap_format::Packet;

use crate::datafile::CrcMode;
use crate::project::{ProjectReader, ProjectWriter, ProjectWriterConfig};

mod integrity;
mod rolling;
mod scenarios;

fn project_path(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

fn write_n_packets(
    path: &std::path::Path,
    config: ProjectWriterConfig,
    count: i64,
    payload_len: usize,
) -> ProjectWriter {
    let mut writer = ProjectWriter::create(path, config).unwrap();
    for ts in 0..count {
        let payload = vec![(ts % 251) as u8; payload_len.max(1)];
        writer
            .write_packet(&Packet::new(ts * 100, payload).unwrap())
            .unwrap();
    }
    writer
}
