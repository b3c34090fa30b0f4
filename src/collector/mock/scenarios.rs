//! Pre-built host scenarios for testing.
//!
//! The typical host has a SATA SSD (`sda`), a spinning disk (`sdb`), an NVMe
//! SSD visible to `lsblk` (`nvme0n1`) and a second NVMe namespace only
//! reported by `nvme list` (`nvme1n1`).

use super::filesystem::MockFs;
use super::runner::MockRunner;
use crate::collector::discovery::{
    LSBLK_BLOCK_DEVICES, LSBLK_NAMES, LSBLK_STRUCTURED, NVME_LIST, interface_probe_command,
};
use crate::collector::smart::{health_command, nvme_smart_log_command, performance_command};

const SATA_SSD_SMART: &str = "\
smartctl 7.3 2022-02-28 r5338 [x86_64-linux-6.1.0-18-amd64] (local build)
Copyright (C) 2002-22, Bruce Allen, Christian Franke, www.smartmontools.org

=== START OF READ SMART DATA SECTION ===
SMART Attributes Data Structure revision number: 1
Vendor Specific SMART Attributes with Thresholds:
ID# ATTRIBUTE_NAME          FLAG     VALUE WORST THRESH TYPE      UPDATED  WHEN_FAILED RAW_VALUE
  5 Reallocated_Sector_Ct   0x0033   100   100   010    Pre-fail  Always       -       0
  9 Power_On_Hours          0x0032   099   099   000    Old_age   Always       -       4521
 12 Power_Cycle_Count       0x0032   099   099   000    Old_age   Always       -       812
177 Wear_Leveling_Count     0x0013   097   097   000    Pre-fail  Always       -       35
190 Airflow_Temperature_Cel 0x0032   067   052   000    Old_age   Always       -       33
241 Total_LBAs_Written      0x0032   099   099   000    Old_age   Always       -       21474836480

";

const NVME_SMART_LOG: &str = "\
Smart Log for NVME device:nvme0n1 namespace-id:ffffffff
critical_warning                        : 0
temperature                             : 38 C (311 Kelvin)
available_spare                         : 100%
available_spare_threshold               : 10%
Percentage Used                         : 37%
data_units_read                         : 12,345,678 (6.32 TB)
data_units_written                      : 9,876,543 (5.06 TB)
power_on_hours                          : 3,210
unsafe_shutdowns                        : 42
media_errors                            : 0
";

#[allow(dead_code)]
impl MockRunner {
    /// Tool output of a workstation with two SSDs and one HDD.
    pub fn typical_host() -> Self {
        let runner = Self::new();

        runner.on(
            LSBLK_STRUCTURED,
            "\
NAME=\"loop0\" MODEL=\"\" SIZE=\"58363904\" SERIAL=\"\"
NAME=\"sda\" MODEL=\"Samsung SSD 860 EVO 500GB\" SIZE=\"500107862016\" SERIAL=\"S3Z2NB0K123456A\"
NAME=\"sdb\" MODEL=\"ST2000DM008-2FR102\" SIZE=\"2000398934016\" SERIAL=\"ZFL0ABCD\"
NAME=\"sr0\" MODEL=\"DVD-RAM UJ8E2\" SIZE=\"1073741312\" SERIAL=\"\"
NAME=\"nvme0n1\" MODEL=\"Samsung SSD 970 EVO Plus 500GB\" SIZE=\"512110190592\" SERIAL=\"S4EVNF0M654321B\"
",
        );
        runner.on(
            interface_probe_command("/dev/sda"),
            "Device Model:     Samsung SSD 860 EVO 500GB\nSATA Version is:  SATA 3.2, 6.0 Gb/s\n",
        );
        runner.on(
            interface_probe_command("/dev/nvme0n1"),
            "Model Number:     Samsung SSD 970 EVO Plus 500GB\nNVMe Version:     1.3\n",
        );
        runner.on(
            NVME_LIST,
            "\
Node                  SN                   Model                                    Namespace Usage                      Format           FW Rev
--------------------- -------------------- ---------------------------------------- --------- -------------------------- ---------------- --------
/dev/nvme0n1          S4EVNF0M654321B      Samsung SSD 970 EVO Plus 500GB           1         120.50  GB / 500.11  GB    512   B +  0 B   2B2QEXM7
/dev/nvme1n1          S4EVNF0M654321B      Samsung SSD 970 EVO Plus 500GB           2          10.00  GB /  12.00  GB    512   B +  0 B   2B2QEXM7
",
        );
        runner.on(LSBLK_NAMES, "loop0\nsda\nsdb\nsr0\nnvme0n1\n");
        runner.on(
            LSBLK_BLOCK_DEVICES,
            "\
loop0       58363904
sda     500107862016 Samsung SSD 860 EVO 500GB
sdb    2000398934016 ST2000DM008-2FR102
nvme0n1 512110190592 Samsung SSD 970 EVO Plus 500GB
",
        );

        runner.on(health_command("/dev/sda"), SATA_SSD_SMART);
        runner.on(nvme_smart_log_command("/dev/nvme0n1"), NVME_SMART_LOG);

        runner.on(
            performance_command("sda"),
            "sda             85.00   12.00      2.10      0.40     0.00     3.00   0.00  20.00    25.30    34.10   0.21    0.95    0.03   0.18   1.70\n\n",
        );
        runner.on(
            performance_command("nvme0n1"),
            "nvme0n1       1520.00  340.00     59.40     21.30     0.00    12.00   0.00   3.41    40.02    64.15   0.08    0.31    0.62   0.04   6.80\n\n",
        );

        runner
    }
}

#[allow(dead_code)]
impl MockFs {
    /// Sysfs flags and device nodes matching [`MockRunner::typical_host`].
    pub fn typical_host() -> Self {
        let mut fs = Self::new();

        fs.add_rotational("sda", false);
        fs.add_rotational("sdb", true);
        fs.add_rotational("nvme0n1", false);
        fs.add_rotational("loop0", false);

        fs.add_node("/dev/sda");
        fs.add_node("/dev/sdb");
        fs.add_node("/dev/nvme0n1");
        fs.add_node("/dev/nvme1n1");

        fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::traits::{CommandRunner, FileSystem};
    use std::path::Path;

    #[test]
    fn test_typical_host_runner() {
        let runner = MockRunner::typical_host();
        assert!(runner.run(LSBLK_STRUCTURED).contains("nvme0n1"));
        assert!(runner.run(&health_command("/dev/sda")).contains("ID#"));
        assert_eq!(runner.run(&health_command("/dev/sdb")), "");
    }

    #[test]
    fn test_typical_host_fs() {
        let fs = MockFs::typical_host();
        assert_eq!(
            fs.read_to_string(Path::new("/sys/block/sdb/queue/rotational"))
                .unwrap(),
            "1\n"
        );
        assert!(fs.exists(Path::new("/dev/nvme1n1")));
        assert!(!fs.exists(Path::new("/dev/vda")));
    }
}
