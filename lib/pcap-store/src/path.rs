//! Path resolver (C2): derives the companion data directory and rolling
//! data-file names from a project-file path and a packet timestamp.
//!
//! Given a project-file path `P`, the companion directory is
//! `dirname(P)/basename_no_ext(P)/`. A new data-file path within it is named
//! `data_<yyMMdd_HHmmss_fffffff>.<ext>`, derived from the timestamp of the
//! first packet that will go into it. Directory creation is the writer's
//! responsibility (see `pcap_store::project::writer`); this module only
//! computes paths and lists what is already there.

use std::fs;
use std::path::{Path, PathBuf};

use pcap_format::{PcapError, Result};

/// Extension used for data files, matching spec §6's `.pata` convention.
pub const DEFAULT_DATA_FILE_EXT: &str = "pata";

/// Computes the companion data directory for a project file.
///
/// `base_dir/project.pcap` → `base_dir/project/`.
pub fn companion_dir(project_path: &Path) -> PathBuf {
    let parent = project_path.parent().unwrap_or_else(|| Path::new("."));
    let stem = project_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    parent.join(stem)
}

/// Formats a millisecond Unix timestamp as `yyMMdd_HHmmss_fffffff` (UTC).
///
/// `fffffff` is the fractional second expressed in 100-nanosecond ticks,
/// matching the source format's resolution even though this system's own
/// packet timestamps only carry millisecond precision (so the low four of
/// the seven digits are always `0`).
pub fn format_timestamp(timestamp_ms: i64) -> String {
    let (year, month, day, hour, minute, second, ms) = utc_parts(timestamp_ms);
    let yy = (year.rem_euclid(100)) as u32;
    let ticks = ms as u32 * 10_000;
    format!("{yy:02}{month:02}{day:02}_{hour:02}{minute:02}{second:02}_{ticks:07}")
}

/// Builds the path for a new data file named after `timestamp_ms`.
pub fn new_data_file_path(project_path: &Path, timestamp_ms: i64, ext: &str) -> PathBuf {
    companion_dir(project_path).join(format!("data_{}.{ext}", format_timestamp(timestamp_ms)))
}

/// Lists existing data files in `dir`, sorted by file name (which sorts
/// chronologically, since the name is the timestamp).
pub fn list_data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    entries.sort();
    Ok(entries)
}

/// Returns the most recently named data file in `dir`, if any.
pub fn latest_data_file(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(list_data_files(dir)?.into_iter().next_back())
}

/// Removes `dir` and everything in it, if it exists.
///
/// Used when (re-)creating a project for writing: spec §5 requires any
/// existing companion directory of the same name to be cleared first, to
/// prevent index/data drift between an old project file and fresh data
/// files.
pub fn clear_directory(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(PcapError::from)?;
    }
    Ok(())
}

/// Converts a millisecond Unix timestamp into `(year, month, day, hour,
/// minute, second, millisecond)`, all in UTC.
///
/// Uses Howard Hinnant's `civil_from_days` algorithm for the calendar
/// conversion (proleptic Gregorian, valid for the full `i64` timestamp
/// range this system cares about) rather than pulling in a date/time crate
/// for this single call site.
fn utc_parts(timestamp_ms: i64) -> (i64, u32, u32, u32, u32, u32, u32) {
    let days = timestamp_ms.div_euclid(86_400_000);
    let ms_of_day = timestamp_ms.rem_euclid(86_400_000);

    let hour = (ms_of_day / 3_600_000) as u32;
    let minute = ((ms_of_day / 60_000) % 60) as u32;
    let second = ((ms_of_day / 1_000) % 60) as u32;
    let ms = (ms_of_day % 1_000) as u32;

    let (year, month, day) = civil_from_days(days);
    (year, month, day, hour, minute, second, ms)
}

fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}
