//! Telemetry records and the bounded history store.

mod history;
pub mod model;

pub use history::{CSV_HEADER, CSV_TIMESTAMP_FORMAT, HISTORY_CAPACITY, HistoryStore};
pub use model::{
    DeviceRecord, HealthAttribute, InterfaceKind, KeyValueMetrics, PerformanceSnapshot,
    is_safe_device_path,
};
