//! Data model for SSD telemetry records.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Storage interface classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InterfaceKind {
    Sata,
    Nvme,
    #[default]
    Unknown,
}

impl InterfaceKind {
    /// Classifies an interface-identification report by substring match.
    ///
    /// "NVMe" takes precedence over "SATA".
    pub fn from_report(report: &str) -> Self {
        if report.contains("NVMe") {
            InterfaceKind::Nvme
        } else if report.contains("SATA") {
            InterfaceKind::Sata
        } else {
            InterfaceKind::Unknown
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceKind::Sata => write!(f, "SATA"),
            InterfaceKind::Nvme => write!(f, "NVMe"),
            InterfaceKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A discovered storage device. `path` is the unique key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub path: String,
    pub model: String,
    pub serial: String,
    /// Capacity in bytes, 0 when unknown.
    pub size_bytes: u64,
    pub interface_kind: InterfaceKind,
}

impl DeviceRecord {
    /// Device name without the `/dev/` prefix (e.g. `nvme0n1`).
    pub fn short_name(&self) -> &str {
        short_name(&self.path)
    }

    /// Whether the NVMe code paths apply to this device.
    pub fn is_nvme(&self) -> bool {
        self.interface_kind == InterfaceKind::Nvme || self.path.contains("nvme")
    }
}

/// Strips the `/dev/` prefix from a device path, if present.
pub fn short_name(path: &str) -> &str {
    path.strip_prefix("/dev/").unwrap_or(path)
}

/// Whether `path` can be placed on a shell command line unquoted.
///
/// Only ASCII letters, digits and `/_.-` are accepted.
pub fn is_safe_device_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '.' | '-'))
}

/// One row of a SMART attribute table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthAttribute {
    pub id: i32,
    pub name: String,
    pub current: i32,
    pub worst: i32,
    pub threshold: i32,
    pub raw: String,
}

/// Vendor key/value report (e.g. `nvme smart-log`). Last duplicate key wins.
pub type KeyValueMetrics = HashMap<String, String>;

/// One performance sample for a device.
///
/// Numeric fields are zero when the source line could not be fully decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub read_iops: f64,
    pub write_iops: f64,
    pub read_throughput_mb: f64,
    pub write_throughput_mb: f64,
    pub read_latency_ms: f64,
    pub write_latency_ms: f64,
    pub queue_depth: f64,
    pub timestamp: DateTime<Local>,
}

impl PerformanceSnapshot {
    /// A zero-valued snapshot taken at `timestamp`.
    pub fn zeroed(timestamp: DateTime<Local>) -> Self {
        Self {
            read_iops: 0.0,
            write_iops: 0.0,
            read_throughput_mb: 0.0,
            write_throughput_mb: 0.0,
            read_latency_ms: 0.0,
            write_latency_ms: 0.0,
            queue_depth: 0.0,
            timestamp,
        }
    }

    /// Returns true if every numeric field is zero.
    pub fn is_zero(&self) -> bool {
        [
            self.read_iops,
            self.write_iops,
            self.read_throughput_mb,
            self.write_throughput_mb,
            self.read_latency_ms,
            self.write_latency_ms,
            self.queue_depth,
        ]
        .iter()
        .all(|v| *v == 0.0)
    }
}
