//! Replay pipeline (C9): a reader task and a pacing sender task coupled by
//! a bounded queue, producing packets to a [`UdpTransport`] in their
//! original inter-arrival rhythm (scaled by a speed factor).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pcap_format::{Packet, PcapError, Result};
use pcap_store::ProjectReader;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::transport::UdpTransport;

/// Packets requested per call to the reader in one batch (spec §4.9).
const READER_BATCH_SIZE: usize = 20;

/// Tunables for one replay run.
#[derive(Debug, Clone, Copy)]
pub struct ReplayConfig {
    /// Playback speed multiplier; inter-packet delay is divided by this.
    pub speed: f64,
    /// Bounded-queue capacity between the reader and sender tasks.
    pub buffer_capacity: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        // Matches the data model's stated default queue capacity (spec
        // §3); the CLI's own `--buffer` default is set independently at
        // the call site, not here.
        Self {
            speed: 1.0,
            buffer_capacity: 100,
        }
    }
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    bytes: AtomicU64,
    min_size: AtomicU64,
    max_size: AtomicU64,
    checksum_errors: AtomicU64,
}

impl Counters {
    fn record(&self, len: usize, checksum_valid: bool) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len as u64, Ordering::Relaxed);
        self.min_size.fetch_min(len as u64, Ordering::Relaxed);
        self.max_size.fetch_max(len as u64, Ordering::Relaxed);
        if !checksum_valid {
            self.checksum_errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Final statistics for one replay run.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub min_packet_size: u64,
    pub max_packet_size: u64,
    pub checksum_errors: u64,
    pub duration: Duration,
    /// Packets-per-second, sampled roughly once a second over the run.
    pub rate_samples: Vec<u64>,
}

/// Drives one end-to-end replay: reads `reader` to completion (or until
/// cancelled), pacing sends to `transport` according to `config`.
///
/// Mirrors spec §4.9's two-task design: a reader task pulls batches of
/// [`READER_BATCH_SIZE`] packets and feeds a bounded queue; a sender task
/// drains it, sleeping between sends to reproduce the original inter-packet
/// timing scaled by `config.speed`.
pub async fn replay(
    mut reader: ProjectReader,
    transport: UdpTransport,
    config: ReplayConfig,
    cancel: CancellationToken,
) -> Result<ReplayReport> {
    if config.speed <= 0.0 {
        return Err(PcapError::invalid_argument("replay speed must be > 0"));
    }

    let (tx, rx) = mpsc::channel::<(Packet, bool)>(config.buffer_capacity.max(1));
    let counters = Arc::new(Counters {
        min_size: AtomicU64::new(u64::MAX),
        ..Counters::default()
    });

    let reader_cancel = cancel.clone();
    let reader_handle = tokio::task::spawn_blocking(move || {
        run_reader(&mut reader, tx, reader_cancel);
        reader
    });

    let sender_cancel = cancel.clone();
    let sender_counters = Arc::clone(&counters);
    let rate_samples = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sampler_counters = Arc::clone(&counters);
    let sampler_samples = Arc::clone(&rate_samples);
    let sampler_cancel = cancel.clone();
    let sampler_handle = tokio::spawn(run_rate_sampler(
        sampler_counters,
        sampler_samples,
        sampler_cancel,
    ));

    let start = Instant::now();
    run_sender(rx, &transport, config.speed, sender_counters, sender_cancel).await;
    let duration = start.elapsed();

    cancel.cancel();
    sampler_handle.abort();
    reader_handle
        .await
        .map_err(|e| PcapError::invalid_state(format!("reader task panicked: {e}")))?;

    let rate_samples = Arc::try_unwrap(rate_samples)
        .map(|m| m.into_inner().unwrap_or_default())
        .unwrap_or_default();

    Ok(ReplayReport {
        packets_sent: counters.processed.load(Ordering::Relaxed),
        bytes_sent: counters.bytes.load(Ordering::Relaxed),
        min_packet_size: match counters.min_size.load(Ordering::Relaxed) {
            u64::MAX => 0,
            n => n,
        },
        max_packet_size: counters.max_size.load(Ordering::Relaxed),
        checksum_errors: counters.checksum_errors.load(Ordering::Relaxed),
        duration,
        rate_samples,
    })
}

/// Runs entirely on a blocking thread: `ProjectReader` is a synchronous,
/// file-backed type (spec §5 treats the storage core as strictly
/// single-threaded per project), so batches are pulled and handed to the
/// channel with `blocking_send` rather than awaited.
fn run_reader(reader: &mut ProjectReader, tx: mpsc::Sender<(Packet, bool)>, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            debug!("reader task observed cancellation");
            return;
        }

        let mut batch = Vec::with_capacity(READER_BATCH_SIZE);
        for _ in 0..READER_BATCH_SIZE {
            match reader.read_next_packet_checked() {
                Ok(Some(item)) => batch.push(item),
                Ok(None) => break,
                Err(error) => {
                    warn!(%error, "reader task stopping on error");
                    return;
                }
            }
        }

        if batch.is_empty() {
            debug!("reader task reached end of stream");
            return;
        }

        for item in batch {
            if cancel.is_cancelled() {
                return;
            }
            if tx.blocking_send(item).is_err() {
                // Receiver dropped: sender has exited.
                return;
            }
        }
    }
}

async fn run_sender(
    mut rx: mpsc::Receiver<(Packet, bool)>,
    transport: &UdpTransport,
    speed: f64,
    counters: Arc<Counters>,
    cancel: CancellationToken,
) {
    let mut last_timestamp: Option<i64> = None;

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            item = rx.recv() => item,
        };

        let Some((packet, checksum_valid)) = next else {
            break;
        };

        if let Some(previous) = last_timestamp {
            let delta_ms = packet.timestamp_ms - previous;
            if delta_ms > 0 {
                let scaled = (delta_ms as f64 / speed).max(0.0);
                sleep(Duration::from_secs_f64(scaled / 1_000.0)).await;
            }
        }
        last_timestamp = Some(packet.timestamp_ms);

        match transport.send(&packet.payload).await {
            Ok(_) => counters.record(packet.payload.len(), checksum_valid),
            Err(error) => warn!(%error, "send failed, continuing replay"),
        }
    }
}

async fn run_rate_sampler(
    counters: Arc<Counters>,
    samples: Arc<std::sync::Mutex<Vec<u64>>>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(Duration::from_secs(1));
    let mut last = 0u64;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                let current = counters.processed.load(Ordering::Relaxed);
                let rate = current.saturating_sub(last);
                last = current;
                if let Ok(mut samples) = samples.lock() {
                    samples.push(rate);
                }
                info!(rate, "replay rate sample");
            }
        }
    }
}

/// Coordinates a running replay and exposes cooperative cancellation
/// (spec §5's `stop()`): cancels the shared token and lets both tasks wind
/// down and release their resources on their own exit paths.
pub struct ReplayHandle {
    cancel: CancellationToken,
}

impl ReplayHandle {
    pub fn new() -> (Self, CancellationToken) {
        let cancel = CancellationToken::new();
        (
            Self {
                cancel: cancel.clone(),
            },
            cancel,
        )
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}
