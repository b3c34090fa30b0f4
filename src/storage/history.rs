//! Bounded per-device performance history with CSV persistence.
//!
//! The store keeps at most [`HISTORY_CAPACITY`] snapshots per device and
//! evicts the oldest one on each overflowing insert. All access goes through
//! a single mutex, which also serializes writes to the CSV sink.
//!
//! `flush_to_file` re-emits the whole in-memory history on every call; it does
//! not remember what was already written, so repeated flushes duplicate rows.

use std::collections::{BTreeMap, VecDeque};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::storage::model::PerformanceSnapshot;

/// Maximum number of snapshots retained per device.
pub const HISTORY_CAPACITY: usize = 1000;

/// Header row written once to an empty history file.
pub const CSV_HEADER: &str = "timestamp,device,read_iops,write_iops,read_throughput_mb,write_throughput_mb,read_latency_ms,write_latency_ms,queue_depth";

/// Local-time format of the CSV timestamp column.
pub const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type History = BTreeMap<String, VecDeque<PerformanceSnapshot>>;

/// Device path → chronologically ordered snapshots.
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    inner: Mutex<History>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Creates a store retaining `capacity` snapshots per device (min 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(History::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, History> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends `snapshot`, evicting exactly one oldest entry on overflow.
    pub fn record(&self, device_path: &str, snapshot: PerformanceSnapshot) {
        let mut history = self.lock();
        let series = history.entry(device_path.to_string()).or_default();
        series.push_back(snapshot);
        if series.len() > self.capacity {
            series.pop_front();
        }
    }

    /// Copy of the snapshots held for `device_path`, oldest first.
    pub fn snapshots(&self, device_path: &str) -> Vec<PerformanceSnapshot> {
        self.lock()
            .get(device_path)
            .map(|series| series.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Device paths with at least one snapshot, sorted.
    pub fn devices(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self, device_path: &str) -> usize {
        self.lock().get(device_path).map_or(0, VecDeque::len)
    }

    pub fn total_len(&self) -> usize {
        self.lock().values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Appends the full in-memory history to the CSV file at `path`.
    ///
    /// The header is written only if the file is empty. Rows are ordered by
    /// device, then chronologically. Returns the number of data rows written.
    pub fn flush_to_file(&self, path: &Path) -> io::Result<usize> {
        let history = self.lock();

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);

        if is_empty {
            writeln!(writer, "{}", CSV_HEADER)?;
        }

        let mut rows = 0;
        for (device, series) in history.iter() {
            for snapshot in series {
                write_row(&mut writer, device, snapshot)?;
                rows += 1;
            }
        }
        writer.flush()?;

        debug!(path = %path.display(), rows, "flushed history");
        Ok(rows)
    }
}

fn write_row(
    writer: &mut impl Write,
    device: &str,
    snapshot: &PerformanceSnapshot,
) -> io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{},{}",
        snapshot.timestamp.format(CSV_TIMESTAMP_FORMAT),
        device,
        snapshot.read_iops,
        snapshot.write_iops,
        snapshot.read_throughput_mb,
        snapshot.write_throughput_mb,
        snapshot.read_latency_ms,
        snapshot.write_latency_ms,
        snapshot.queue_depth,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    fn snapshot(read_iops: f64) -> PerformanceSnapshot {
        PerformanceSnapshot {
            read_iops,
            ..PerformanceSnapshot::zeroed(Local::now())
        }
    }

    fn data_rows(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| *l != CSV_HEADER)
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_record_and_read_back() {
        let store = HistoryStore::new();
        store.record("/dev/sda", snapshot(1.0));
        store.record("/dev/sda", snapshot(2.0));
        store.record("/dev/nvme0n1", snapshot(3.0));

        assert_eq!(store.len("/dev/sda"), 2);
        assert_eq!(store.total_len(), 3);
        assert_eq!(store.devices(), vec!["/dev/nvme0n1", "/dev/sda"]);
        let iops: Vec<f64> = store
            .snapshots("/dev/sda")
            .iter()
            .map(|s| s.read_iops)
            .collect();
        assert_eq!(iops, vec![1.0, 2.0]);
        assert!(store.snapshots("/dev/sdz").is_empty());
    }

    #[test]
    fn test_history_bounded_fifo() {
        let store = HistoryStore::new();
        for i in 0..=HISTORY_CAPACITY {
            store.record("/dev/sda", snapshot(i as f64));
        }

        let series = store.snapshots("/dev/sda");
        assert_eq!(series.len(), HISTORY_CAPACITY);
        assert_eq!(series[0].read_iops, 1.0);
        assert_eq!(series[HISTORY_CAPACITY - 1].read_iops, HISTORY_CAPACITY as f64);
        assert!(series.windows(2).all(|w| w[0].read_iops < w[1].read_iops));
    }

    #[test]
    fn test_eviction_is_per_device() {
        let store = HistoryStore::with_capacity(2);
        store.record("/dev/sda", snapshot(1.0));
        store.record("/dev/sda", snapshot(2.0));
        store.record("/dev/sdb", snapshot(9.0));
        store.record("/dev/sda", snapshot(3.0));

        assert_eq!(store.len("/dev/sda"), 2);
        assert_eq!(store.snapshots("/dev/sda")[0].read_iops, 2.0);
        assert_eq!(store.len("/dev/sdb"), 1);
    }

    #[test]
    fn test_flush_writes_header_once_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");

        let store = HistoryStore::new();
        let ts = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        store.record(
            "/dev/sda",
            PerformanceSnapshot {
                read_iops: 85.0,
                write_iops: 12.5,
                read_throughput_mb: 2.1,
                write_throughput_mb: 0.4,
                read_latency_ms: 0.21,
                write_latency_ms: 0.95,
                queue_depth: 0.03,
                timestamp: ts,
            },
        );

        assert_eq!(store.flush_to_file(&path).unwrap(), 1);
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "2024-03-05 14:07:09,/dev/sda,85,12.5,2.1,0.4,0.21,0.95,0.03"
        );
    }

    #[test]
    fn test_flush_orders_by_device_then_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");

        let store = HistoryStore::new();
        store.record("/dev/sdb", snapshot(1.0));
        store.record("/dev/nvme0n1", snapshot(2.0));
        store.record("/dev/sdb", snapshot(3.0));
        store.flush_to_file(&path).unwrap();

        let devices: Vec<String> = data_rows(&path)
            .iter()
            .map(|r| r.split(',').nth(1).unwrap().to_string())
            .collect();
        assert_eq!(devices, vec!["/dev/nvme0n1", "/dev/sdb", "/dev/sdb"]);
    }

    #[test]
    fn test_repeated_flush_duplicates_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");

        let store = HistoryStore::new();
        store.record("/dev/sda", snapshot(1.0));
        store.record("/dev/sda", snapshot(2.0));

        store.flush_to_file(&path).unwrap();
        assert_eq!(data_rows(&path).len(), 2);

        store.flush_to_file(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches(CSV_HEADER).count(), 1);
        assert_eq!(data_rows(&path).len(), 4);
    }

    #[test]
    fn test_flush_to_missing_directory_fails() {
        let store = HistoryStore::new();
        store.record("/dev/sda", snapshot(1.0));
        let result = store.flush_to_file(Path::new("/nonexistent/dir/history.csv"));
        assert!(result.is_err());
    }
}
