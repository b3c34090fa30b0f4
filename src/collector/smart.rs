//! On-demand telemetry for a single device.

use chrono::Local;
use tracing::{debug, warn};

use crate::collector::lifetime::{
    LifeRemaining, life_from_health_attributes, life_from_nvme_metrics,
};
use crate::collector::parser::{parse_health_attributes, parse_key_values, parse_performance};
use crate::collector::traits::CommandRunner;
use crate::storage::model::{
    DeviceRecord, HealthAttribute, KeyValueMetrics, PerformanceSnapshot, is_safe_device_path,
    short_name,
};

/// SMART attribute table for `device_path`.
pub fn health_command(device_path: &str) -> String {
    format!("smartctl -A {}", device_path)
}

/// NVMe smart-log for `device_path`.
pub fn nvme_smart_log_command(device_path: &str) -> String {
    format!("nvme smart-log {}", device_path)
}

/// Two one-second extended samples; only the last one is kept.
pub fn performance_command(device_name: &str) -> String {
    format!("iostat -xm {} 1 2 | tail -n 2", device_name)
}

/// Fetches health, vendor metrics and performance samples for a device.
///
/// Every call blocks on one external tool. Failures degrade to empty or
/// zero-valued results. Paths that are not [shell-safe](is_safe_device_path)
/// are refused without running anything.
#[derive(Debug, Clone)]
pub struct SmartCollector<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> SmartCollector<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// SMART attributes; empty when `smartctl` is missing or unsupported.
    pub fn health_attributes(&self, device_path: &str) -> Vec<HealthAttribute> {
        if !check_path(device_path) {
            return Vec::new();
        }
        let output = self.runner.run(&health_command(device_path));
        let attrs = parse_health_attributes(&output);
        debug!(device = device_path, count = attrs.len(), "parsed health attributes");
        attrs
    }

    /// NVMe smart-log entries. Non-NVMe paths return an empty map without
    /// running anything.
    pub fn nvme_metrics(&self, device_path: &str) -> KeyValueMetrics {
        if !device_path.contains("nvme") || !check_path(device_path) {
            return KeyValueMetrics::new();
        }
        parse_key_values(&self.runner.run(&nvme_smart_log_command(device_path)))
    }

    /// One performance sample, timestamped now.
    pub fn performance_snapshot(&self, device_path: &str) -> PerformanceSnapshot {
        let timestamp = Local::now();
        if !check_path(device_path) {
            return PerformanceSnapshot::zeroed(timestamp);
        }
        let name = short_name(device_path);
        let output = self.runner.run(&performance_command(name));
        let snapshot = parse_performance(&output, name, timestamp);
        if snapshot.is_zero() {
            debug!(device = device_path, "performance sample degraded to zero");
        }
        snapshot
    }

    /// Remaining life for `device`, dispatched on NVMe vs SATA.
    pub fn estimate_life_remaining(&self, device: &DeviceRecord) -> LifeRemaining {
        if device.is_nvme() {
            life_from_nvme_metrics(&self.nvme_metrics(&device.path))
        } else {
            life_from_health_attributes(&self.health_attributes(&device.path))
        }
    }

    /// Same as [`estimate_life_remaining`](Self::estimate_life_remaining)
    /// using the path heuristic only.
    pub fn estimate_life_remaining_for_path(&self, device_path: &str) -> LifeRemaining {
        self.estimate_life_remaining(&DeviceRecord {
            path: device_path.to_string(),
            ..DeviceRecord::default()
        })
    }
}

fn check_path(device_path: &str) -> bool {
    let safe = is_safe_device_path(device_path);
    if !safe {
        warn!(device = device_path, "refusing unsafe device path");
    }
    safe
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockRunner;
    use crate::storage::model::InterfaceKind;

    #[test]
    fn test_health_attributes_typical_host() {
        let collector = SmartCollector::new(MockRunner::typical_host());
        let attrs = collector.health_attributes("/dev/sda");
        assert!(attrs.iter().any(|a| a.id == 5 && a.threshold == 10));
    }

    #[test]
    fn test_health_attributes_missing_tool() {
        let collector = SmartCollector::new(MockRunner::new());
        assert!(collector.health_attributes("/dev/sda").is_empty());
    }

    #[test]
    fn test_nvme_metrics_skips_non_nvme_paths() {
        let runner = MockRunner::typical_host();
        let collector = SmartCollector::new(runner.clone());

        assert!(collector.nvme_metrics("/dev/sda").is_empty());
        assert_eq!(runner.call_count(&nvme_smart_log_command("/dev/sda")), 0);

        let metrics = collector.nvme_metrics("/dev/nvme0n1");
        assert_eq!(metrics.get("Percentage Used"), Some(&"37%".to_string()));
    }

    #[test]
    fn test_performance_snapshot_uses_short_name() {
        let runner = MockRunner::typical_host();
        let collector = SmartCollector::new(runner.clone());

        let snap = collector.performance_snapshot("/dev/nvme0n1");
        assert_eq!(runner.call_count(&performance_command("nvme0n1")), 1);
        assert_eq!(snap.read_iops, 1520.0);
        assert_eq!(snap.queue_depth, 0.62);
    }

    #[test]
    fn test_performance_snapshot_without_iostat_is_zero() {
        let collector = SmartCollector::new(MockRunner::new());
        assert!(collector.performance_snapshot("/dev/sda").is_zero());
    }

    #[test]
    fn test_unsafe_paths_never_reach_the_shell() {
        let runner = MockRunner::typical_host();
        let collector = SmartCollector::new(runner.clone());

        for path in ["/dev/sda; reboot", "/dev/nvme0n1 && id", "$(touch /tmp/x)"] {
            assert!(collector.health_attributes(path).is_empty());
            assert!(collector.nvme_metrics(path).is_empty());
            assert!(collector.performance_snapshot(path).is_zero());
            assert_eq!(
                collector.estimate_life_remaining_for_path(path),
                LifeRemaining::Unknown
            );
        }
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_estimate_life_nvme() {
        let collector = SmartCollector::new(MockRunner::typical_host());
        let device = DeviceRecord {
            path: "/dev/nvme0n1".to_string(),
            interface_kind: InterfaceKind::Nvme,
            ..DeviceRecord::default()
        };
        assert_eq!(
            collector.estimate_life_remaining(&device),
            LifeRemaining::Percent(63.0)
        );
    }

    #[test]
    fn test_estimate_life_sata() {
        let collector = SmartCollector::new(MockRunner::typical_host());
        assert_eq!(
            collector.estimate_life_remaining_for_path("/dev/sda"),
            LifeRemaining::Percent(97.0)
        );
    }

    #[test]
    fn test_estimate_life_sata_without_wear_indicator() {
        let runner = MockRunner::new();
        runner.on(
            health_command("/dev/sdc"),
            "\
ID# ATTRIBUTE_NAME FLAG VALUE WORST THRESH TYPE UPDATED WHEN_FAILED RAW_VALUE
  5 Reallocated_Sector_Ct   0x0033   100   100   010    Pre-fail  Always       -       0
  9 Power_On_Hours          0x0032   099   099   000    Old_age   Always       -       4521
",
        );
        let collector = SmartCollector::new(runner);

        let life = collector.estimate_life_remaining_for_path("/dev/sdc");
        assert_eq!(life, LifeRemaining::Unknown);
        assert_eq!(life.as_sentinel(), -1.0);
    }
}
