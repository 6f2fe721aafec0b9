//! `pcap-replay`: replays a captured project over UDP at a configurable
//! speed.
//!
//! ```text
//! pcap-replay <base_dir> <project_name> [--address IP] [--port N]
//!             [--mode broadcast|multicast|unicast] [--speed N] [--buffer N] [--quiet]
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use pcap_replay::{replay, ReplayConfig, ReplayHandle, TransportMode, UdpTransport};
use pcap_store::ProjectReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Broadcast,
    Multicast,
    Unicast,
}

impl From<ModeArg> for TransportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Broadcast => TransportMode::Broadcast,
            ModeArg::Multicast => TransportMode::Multicast,
            ModeArg::Unicast => TransportMode::Unicast,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "pcap-replay", about = "Replay a captured project over UDP")]
struct Args {
    /// Directory containing `<project_name>.pcap` and its companion data directory.
    base_dir: PathBuf,

    /// Project name, without the `.pcap` extension.
    project_name: String,

    /// Destination address for replayed datagrams.
    #[arg(long, default_value = "255.255.255.255")]
    address: IpAddr,

    /// Destination port.
    #[arg(long, default_value_t = 12345)]
    port: u16,

    /// Transport mode; inferred from `--address` if not given.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Playback speed multiplier (2.0 replays twice as fast).
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Bounded queue capacity between the reader and sender tasks.
    #[arg(long, default_value_t = 1_000)]
    buffer: usize,

    /// Suppress the summary printed after a successful replay.
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "replay failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> pcap_format::Result<()> {
    let project_path = args.base_dir.join(format!("{}.pcap", args.project_name));
    info!(path = %project_path.display(), "opening project");
    let reader = ProjectReader::open(&project_path)?;
    let packet_count = reader.packet_count();

    let mode = args
        .mode
        .map(TransportMode::from)
        .unwrap_or_else(|| TransportMode::infer(args.address));
    let destination = SocketAddr::new(args.address, args.port);
    let transport = UdpTransport::bind(destination, mode).await?;
    info!(%destination, ?mode, packets = packet_count, "starting replay");

    let config = ReplayConfig {
        speed: args.speed,
        buffer_capacity: args.buffer,
    };
    let (handle, cancel) = ReplayHandle::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, stopping replay");
            ctrl_c_cancel.cancel();
        }
    });

    let report = replay(reader, transport, config, cancel).await?;
    // `handle` only exists to give external callers (tests, embedders) a
    // way to call `stop()`; the CLI itself cancels via the ctrl-c task
    // above and keeps it alive only so it isn't dropped early.
    drop(handle);

    if !args.quiet {
        println!(
            "sent {} packets ({} bytes) in {:.3}s, {} checksum errors",
            report.packets_sent,
            report.bytes_sent,
            report.duration.as_secs_f64(),
            report.checksum_errors,
        );
    }

    Ok(())
}
