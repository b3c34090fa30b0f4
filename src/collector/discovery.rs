//! Solid-state device discovery.
//!
//! Discovery is tiered; each tier runs only if the previous one found
//! nothing:
//!
//! 1. structured `lsblk` listing filtered by the rotational flag, plus the
//!    `nvme list` vendor listing;
//! 2. probing well-known nodes under `/dev`;
//! 3. a bare `lsblk` name listing.
//!
//! Every tier is also callable on its own. Nothing here returns an error: a
//! missing tool yields an empty tier, a malformed field yields a default.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::collector::parser::{parse_lsblk_pairs, parse_size_digits};
use crate::collector::traits::{CommandRunner, FileSystem};
use crate::storage::model::{DeviceRecord, InterfaceKind, is_safe_device_path};

/// Structured listing of whole disks, sizes in bytes, `KEY="value"` rows.
pub const LSBLK_STRUCTURED: &str = "lsblk -d -b -n -P -o NAME,MODEL,SIZE,SERIAL";
/// Vendor NVMe listing.
pub const NVME_LIST: &str = "nvme list";
/// Bare device-name listing used by the last tier.
pub const LSBLK_NAMES: &str = "lsblk -d -n -o NAME";
/// Name, size and model listing used by [`Discovery::discover_block_devices`].
pub const LSBLK_BLOCK_DEVICES: &str = "lsblk -d -b -n -o NAME,SIZE,MODEL";

/// Device nodes probed by the second tier, relative to the device directory.
pub const PROBE_DEVICE_NAMES: [&str; 6] = ["nvme0n1", "nvme1n1", "sda", "sdb", "sdc", "vda"];

const DEFAULT_DEV_DIR: &str = "/dev";
const DEFAULT_SYS_BLOCK_DIR: &str = "/sys/block";

/// Command line of the interface-identification report for `device_path`.
pub fn interface_probe_command(device_path: &str) -> String {
    format!("smartctl -i {}", device_path)
}

fn is_virtual_device(name: &str) -> bool {
    name.starts_with("loop") || name.starts_with("sr")
}

fn push_unique(devices: &mut Vec<DeviceRecord>, record: DeviceRecord) {
    if !is_safe_device_path(&record.path) {
        warn!(path = %record.path, "skipping device with unsafe path");
        return;
    }
    if devices.iter().any(|d| d.path == record.path) {
        debug!(path = %record.path, "skipping duplicate device");
        return;
    }
    devices.push(record);
}

/// Finds candidate SSDs on the host.
pub struct Discovery<R: CommandRunner, F: FileSystem> {
    runner: R,
    fs: F,
    dev_dir: PathBuf,
    sys_block_dir: PathBuf,
}

impl<R: CommandRunner, F: FileSystem> Discovery<R, F> {
    /// Creates a discovery using `/dev` and `/sys/block`.
    pub fn new(runner: R, fs: F) -> Self {
        Self {
            runner,
            fs,
            dev_dir: PathBuf::from(DEFAULT_DEV_DIR),
            sys_block_dir: PathBuf::from(DEFAULT_SYS_BLOCK_DIR),
        }
    }

    /// Overrides the device directory (default `/dev`).
    pub fn with_dev_dir(mut self, dev_dir: impl Into<PathBuf>) -> Self {
        self.dev_dir = dev_dir.into();
        self
    }

    /// Overrides the block-device sysfs directory (default `/sys/block`).
    pub fn with_sys_block_dir(mut self, sys_block_dir: impl Into<PathBuf>) -> Self {
        self.sys_block_dir = sys_block_dir.into();
        self
    }

    /// Runs the tiers in order and returns the first non-empty result.
    pub fn discover(&self) -> Vec<DeviceRecord> {
        let devices = self.list_structured();
        if !devices.is_empty() {
            debug!(count = devices.len(), "structured listing found devices");
            return devices;
        }

        info!("structured listing found nothing, probing device nodes");
        let devices = self.probe_paths();
        if !devices.is_empty() {
            return devices;
        }

        info!("no known device nodes, falling back to minimal listing");
        self.list_minimal()
    }

    /// Tier 1: `lsblk` rows that are not rotational, then `nvme list`.
    pub fn list_structured(&self) -> Vec<DeviceRecord> {
        let mut devices = Vec::new();

        let listing = self.runner.run(LSBLK_STRUCTURED);
        for row in parse_lsblk_pairs(&listing) {
            let field = |key: &str| {
                row.iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.trim().to_string())
                    .unwrap_or_default()
            };

            let name = field("NAME");
            if name.is_empty() || is_virtual_device(&name) {
                continue;
            }
            if self.is_rotational(&name) {
                debug!(device = %name, "skipping rotational device");
                continue;
            }

            let path = self.device_path(&name);
            if !is_safe_device_path(&path) {
                warn!(path = %path, "skipping device with unsafe path");
                continue;
            }
            let report = self.runner.run(&interface_probe_command(&path));
            push_unique(
                &mut devices,
                DeviceRecord {
                    interface_kind: InterfaceKind::from_report(&report),
                    model: field("MODEL"),
                    serial: field("SERIAL"),
                    size_bytes: parse_size_digits(&field("SIZE")),
                    path,
                },
            );
        }

        for record in self.list_nvme() {
            push_unique(&mut devices, record);
        }

        devices
    }

    /// Devices reported by the vendor `nvme list` tool.
    ///
    /// Only tokens naming a device node are taken; headers are ignored.
    pub fn list_nvme(&self) -> Vec<DeviceRecord> {
        let listing = self.runner.run(NVME_LIST);
        let mut devices = Vec::new();

        for line in listing.lines() {
            let Some(node) = line.split_whitespace().next() else {
                continue;
            };
            if !node.starts_with("/dev/") {
                continue;
            }
            push_unique(
                &mut devices,
                DeviceRecord {
                    path: node.to_string(),
                    model: "NVMe Device".to_string(),
                    serial: String::new(),
                    size_bytes: 0,
                    interface_kind: InterfaceKind::Nvme,
                },
            );
        }

        devices
    }

    /// Tier 2: checks a fixed list of conventional device nodes.
    pub fn probe_paths(&self) -> Vec<DeviceRecord> {
        PROBE_DEVICE_NAMES
            .iter()
            .map(|name| self.device_path(name))
            .filter(|path| self.fs.exists(Path::new(path)))
            .map(|path| {
                let nvme = path.contains("nvme");
                DeviceRecord {
                    model: if nvme { "NVMe Device" } else { "SATA/SAS Device" }.to_string(),
                    interface_kind: if nvme {
                        InterfaceKind::Nvme
                    } else {
                        InterfaceKind::Sata
                    },
                    serial: String::new(),
                    size_bytes: 0,
                    path,
                }
            })
            .collect()
    }

    /// Tier 3: bare name listing, loop and optical devices excluded.
    pub fn list_minimal(&self) -> Vec<DeviceRecord> {
        let listing = self.runner.run(LSBLK_NAMES);
        let mut devices = Vec::new();

        for name in listing.lines().map(str::trim) {
            if name.is_empty() || is_virtual_device(name) {
                continue;
            }
            let nvme = name.contains("nvme");
            push_unique(
                &mut devices,
                DeviceRecord {
                    path: self.device_path(name),
                    model: if nvme { "NVMe Device" } else { "Block Device" }.to_string(),
                    serial: String::new(),
                    size_bytes: 0,
                    interface_kind: if nvme {
                        InterfaceKind::Nvme
                    } else {
                        InterfaceKind::Unknown
                    },
                },
            );
        }

        devices
    }

    /// Lists every whole block device with name, size and model.
    ///
    /// For callers whose primary discovery came back empty and who do not
    /// want the probing tiers. Lines mentioning `loop` are skipped; the text
    /// after the size column is kept as the model.
    pub fn discover_block_devices(&self) -> Vec<DeviceRecord> {
        let listing = self.runner.run(LSBLK_BLOCK_DEVICES);
        let mut devices = Vec::new();

        for line in listing.lines() {
            if line.trim().is_empty() || line.contains("loop") {
                continue;
            }
            let mut parts = line.trim().splitn(2, char::is_whitespace);
            let Some(name) = parts.next() else {
                continue;
            };
            let rest = parts.next().unwrap_or("").trim_start();
            let (size, model) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));

            push_unique(
                &mut devices,
                DeviceRecord {
                    path: self.device_path(name),
                    model: model.trim().to_string(),
                    serial: String::new(),
                    size_bytes: parse_size_digits(size),
                    interface_kind: InterfaceKind::Unknown,
                },
            );
        }

        devices
    }

    /// Reads the rotational flag; unreadable or unexpected values count as
    /// non-rotational.
    fn is_rotational(&self, name: &str) -> bool {
        let flag_path = self.sys_block_dir.join(name).join("queue").join("rotational");
        match self.fs.read_to_string(&flag_path) {
            Ok(flag) => flag.trim() == "1",
            Err(_) => false,
        }
    }

    fn device_path(&self, name: &str) -> String {
        self.dev_dir.join(name).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFs, MockRunner};
    use std::collections::HashSet;

    fn assert_unique_paths(devices: &[DeviceRecord]) {
        let paths: HashSet<&str> = devices.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths.len(), devices.len(), "duplicate paths in {:?}", devices);
    }

    #[test]
    fn test_structured_listing_typical_host() {
        let discovery = Discovery::new(MockRunner::typical_host(), MockFs::typical_host());
        let devices = discovery.list_structured();
        assert_unique_paths(&devices);

        let paths: Vec<&str> = devices.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["/dev/sda", "/dev/nvme0n1", "/dev/nvme1n1"]);

        let sda = &devices[0];
        assert_eq!(sda.model, "Samsung SSD 860 EVO 500GB");
        assert_eq!(sda.serial, "S3Z2NB0K123456A");
        assert_eq!(sda.size_bytes, 500107862016);
        assert_eq!(sda.interface_kind, InterfaceKind::Sata);

        let nvme0 = &devices[1];
        assert_eq!(nvme0.size_bytes, 512110190592);
        assert_eq!(nvme0.interface_kind, InterfaceKind::Nvme);

        let nvme1 = &devices[2];
        assert_eq!(nvme1.model, "NVMe Device");
        assert_eq!(nvme1.size_bytes, 0);
        assert_eq!(nvme1.interface_kind, InterfaceKind::Nvme);
    }

    #[test]
    fn test_structured_listing_keeps_undeterminable_rotation() {
        let runner = MockRunner::new();
        runner.on(LSBLK_STRUCTURED, "NAME=\"vda\" MODEL=\"\" SIZE=\"garbage\" SERIAL=\"\"\n");
        let discovery = Discovery::new(runner, MockFs::new());

        let devices = discovery.list_structured();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].path, "/dev/vda");
        assert_eq!(devices[0].size_bytes, 0);
        assert_eq!(devices[0].interface_kind, InterfaceKind::Unknown);
    }

    #[test]
    fn test_discover_stops_at_first_non_empty_tier() {
        let runner = MockRunner::typical_host();
        let discovery = Discovery::new(runner.clone(), MockFs::typical_host());

        let devices = discovery.discover();
        assert_eq!(devices.len(), 3);
        assert_eq!(runner.call_count(LSBLK_NAMES), 0);
    }

    #[test]
    fn test_discover_falls_back_to_probing() {
        let runner = MockRunner::new();
        let mut fs = MockFs::new();
        fs.add_node("/dev/nvme0n1");
        fs.add_node("/dev/sdb");
        let discovery = Discovery::new(runner.clone(), fs);

        let devices = discovery.discover();
        assert_unique_paths(&devices);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].path, "/dev/nvme0n1");
        assert_eq!(devices[0].model, "NVMe Device");
        assert_eq!(devices[0].interface_kind, InterfaceKind::Nvme);
        assert_eq!(devices[1].path, "/dev/sdb");
        assert_eq!(devices[1].model, "SATA/SAS Device");
        assert_eq!(devices[1].interface_kind, InterfaceKind::Sata);
        assert_eq!(runner.call_count(LSBLK_NAMES), 0);
    }

    #[test]
    fn test_discover_falls_back_to_minimal_listing() {
        let runner = MockRunner::new();
        runner.on(LSBLK_NAMES, "loop0\nsr0\nxvda\nnvme2n1\n\nxvda\n");
        let discovery = Discovery::new(runner, MockFs::new());

        let devices = discovery.discover();
        assert_unique_paths(&devices);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].path, "/dev/xvda");
        assert_eq!(devices[0].model, "Block Device");
        assert_eq!(devices[0].interface_kind, InterfaceKind::Unknown);
        assert_eq!(devices[1].path, "/dev/nvme2n1");
        assert_eq!(devices[1].interface_kind, InterfaceKind::Nvme);
    }

    #[test]
    fn test_discover_nothing_anywhere() {
        let discovery = Discovery::new(MockRunner::new(), MockFs::new());
        assert!(discovery.discover().is_empty());
    }

    #[test]
    fn test_discover_block_devices() {
        let runner = MockRunner::new();
        runner.on(
            LSBLK_BLOCK_DEVICES,
            "\
loop0          4096
sda    500107862016 Samsung SSD 860 EVO 500GB
vdb     10737418240
",
        );
        let discovery = Discovery::new(runner, MockFs::new());

        let devices = discovery.discover_block_devices();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].path, "/dev/sda");
        assert_eq!(devices[0].model, "Samsung SSD 860 EVO 500GB");
        assert_eq!(devices[0].size_bytes, 500107862016);
        assert_eq!(devices[1].path, "/dev/vdb");
        assert_eq!(devices[1].model, "");
        assert_eq!(devices[1].interface_kind, InterfaceKind::Unknown);
    }

    #[test]
    fn test_unsafe_device_names_are_skipped() {
        let runner = MockRunner::new();
        runner.on(
            LSBLK_STRUCTURED,
            "NAME=\"sda;reboot\" MODEL=\"\" SIZE=\"1\" SERIAL=\"\"\nNAME=\"sdb\" MODEL=\"\" SIZE=\"1\" SERIAL=\"\"\n",
        );
        runner.on(NVME_LIST, "/dev/nvme0n1$(id) S4EV Samsung\n");
        runner.on(LSBLK_NAMES, "sdc|id\nsdd\n");
        let discovery = Discovery::new(runner.clone(), MockFs::new());

        let paths: Vec<String> = discovery.list_structured().into_iter().map(|d| d.path).collect();
        assert_eq!(paths, vec!["/dev/sdb"]);
        assert_eq!(runner.call_count(&interface_probe_command("/dev/sda;reboot")), 0);

        let paths: Vec<String> = discovery.list_minimal().into_iter().map(|d| d.path).collect();
        assert_eq!(paths, vec!["/dev/sdd"]);
    }

    #[test]
    fn test_custom_dev_dir() {
        let mut fs = MockFs::new();
        fs.add_node("/host/dev/sda");
        let discovery = Discovery::new(MockRunner::new(), fs).with_dev_dir("/host/dev");

        let devices = discovery.probe_paths();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].path, "/host/dev/sda");
    }
}
