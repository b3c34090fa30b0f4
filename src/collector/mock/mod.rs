//! In-memory fakes for testing collectors.
//!
//! This module provides `MockRunner`, `MockFs` and pre-built host scenarios
//! so discovery, parsing and sampling can be exercised without `smartctl`,
//! `nvme-cli`, `iostat` or real block devices.

mod filesystem;
mod runner;
mod scenarios;

pub use filesystem::MockFs;
pub use runner::MockRunner;
