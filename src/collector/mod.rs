//! SSD telemetry collection.
//!
//! Telemetry comes from external diagnostic tools whose text output is parsed
//! into typed records. Every tool invocation goes through the
//! [`CommandRunner`] seam and every sysfs/devfs lookup through
//! [`FileSystem`], so the whole pipeline runs against mocks in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │   Discovery                  SmartCollector              │
//! │   - lsblk / nvme list        - smartctl -A               │
//! │   - /dev probing             - nvme smart-log            │
//! │   - rotational flag          - iostat -xm                │
//! │        │                     - life estimate             │
//! │        │                            │                    │
//! │        │          parser (pure) ◄───┤                    │
//! │        ▼                            ▼                    │
//! │  ┌────────────┐             ┌───────────────┐            │
//! │  │ FileSystem │ (trait)     │ CommandRunner │ (trait)    │
//! │  └─────┬──────┘             └───────┬───────┘            │
//! └────────┼────────────────────────────┼────────────────────┘
//!          │                            │
//!    ┌─────┴─────┐                ┌─────┴───────┐
//!    │  RealFs   │ MockFs         │SystemRunner │ MockRunner
//!    └───────────┘                └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use ssdmon::collector::{Discovery, RealFs, SmartCollector, SystemRunner};
//!
//! let devices = Discovery::new(SystemRunner::new(), RealFs::new()).discover();
//! let smart = SmartCollector::new(SystemRunner::new());
//! for device in &devices {
//!     println!("{}: {}", device.path, smart.estimate_life_remaining(device));
//! }
//! ```
//!
//! ## Testing (with mocks)
//!
//! ```
//! use ssdmon::collector::{Discovery, MockFs, MockRunner};
//!
//! let discovery = Discovery::new(MockRunner::typical_host(), MockFs::typical_host());
//! let devices = discovery.discover();
//! assert!(!devices.is_empty());
//! ```

mod discovery;
mod lifetime;
pub mod mock;
pub mod parser;
mod smart;
pub mod traits;

pub use discovery::{
    Discovery, LSBLK_BLOCK_DEVICES, LSBLK_NAMES, LSBLK_STRUCTURED, NVME_LIST, PROBE_DEVICE_NAMES,
    interface_probe_command,
};
pub use lifetime::{
    LifeRemaining, NVME_PERCENTAGE_USED, UNKNOWN_LIFE_SENTINEL, WEAR_ATTRIBUTE_NAMES,
    life_from_health_attributes, life_from_nvme_metrics,
};
pub use mock::{MockFs, MockRunner};
pub use parser::ParseError;
pub use smart::{SmartCollector, health_command, nvme_smart_log_command, performance_command};
pub use traits::{CommandRunner, FileSystem, RealFs, SystemRunner};
