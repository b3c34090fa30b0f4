//! ssdmon - SSD health and performance telemetry library.
//!
//! Provides:
//! - `collector` - device discovery, tool output parsers, SMART/NVMe health,
//!   performance samples and remaining-life estimates
//! - `storage` - telemetry records and the bounded, CSV-persisted history
//! - `sampler` - cancellable periodic sampling in a background thread
//! - `util` - formatting helpers
//!
//! Used by `ssdmond`, the sampling daemon.

pub mod collector;
pub mod sampler;
pub mod storage;
pub mod util;
