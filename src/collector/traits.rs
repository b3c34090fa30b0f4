//! Abstractions over external commands and filesystem access.
//!
//! Diagnostic tools (`lsblk`, `smartctl`, `nvme`, `iostat`) have no stable
//! programmatic API, so every invocation goes through the narrow
//! [`CommandRunner`] seam. Parsers stay pure and the collectors can be driven
//! by [`MockRunner`](crate::collector::mock::MockRunner) in tests.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

/// Size of the buffer used to drain a child's stdout.
const READ_CHUNK_SIZE: usize = 4096;

/// Executes a shell command line and returns its textual output.
///
/// Implementations never fail: launch errors, I/O errors and non-zero exit
/// statuses all yield an empty string.
pub trait CommandRunner: Send + Sync {
    /// Runs `command_line` to completion and returns captured stdout.
    fn run(&self, command_line: &str) -> String;
}

/// Abstraction for filesystem operations.
///
/// Used for the rotational flag lookup under `/sys/block` and for probing
/// well-known device nodes under `/dev`.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Runs commands through `sh -c` on the host.
///
/// Blocks the caller until the child closes its stdout and exits. No timeout
/// is applied; a hung tool blocks the caller indefinitely.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    /// Creates a new `SystemRunner` instance.
    pub fn new() -> Self {
        Self
    }

    fn try_run(command_line: &str) -> io::Result<String> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let mut output = Vec::new();
        if let Some(mut stdout) = child.stdout.take() {
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            loop {
                let n = stdout.read(&mut chunk)?;
                if n == 0 {
                    break;
                }
                output.extend_from_slice(&chunk[..n]);
            }
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(io::Error::other(format!("exited with {}", status)));
        }

        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command_line: &str) -> String {
        match Self::try_run(command_line) {
            Ok(output) => {
                debug!(command = command_line, bytes = output.len(), "command finished");
                output
            }
            Err(e) => {
                debug!(command = command_line, error = %e, "command failed");
                String::new()
            }
        }
    }
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_system_runner_captures_stdout() {
        let runner = SystemRunner::new();
        assert_eq!(runner.run("echo hello"), "hello\n");
    }

    #[test]
    fn test_system_runner_nonzero_exit_is_empty() {
        let runner = SystemRunner::new();
        assert_eq!(runner.run("echo partial; exit 3"), "");
    }

    #[test]
    fn test_system_runner_missing_tool_is_empty() {
        let runner = SystemRunner::new();
        assert_eq!(runner.run("definitely-not-a-real-tool-12345 --help"), "");
    }

    #[test]
    fn test_system_runner_reads_past_chunk_boundary() {
        let runner = SystemRunner::new();
        let output = runner.run("head -c 10000 /dev/zero | tr '\\0' 'x'");
        assert_eq!(output.len(), 10000);
        assert!(output.chars().all(|c| c == 'x'));
    }

    #[test]
    fn test_real_fs_read_to_string() {
        let fs = RealFs::new();
        // Read Cargo.toml which should exist in project root
        let cargo_toml = env::current_dir().unwrap().join("Cargo.toml");
        let content = fs.read_to_string(&cargo_toml).unwrap();
        assert!(content.contains("[package]"));
    }

    #[test]
    fn test_real_fs_exists() {
        let fs = RealFs::new();
        let cargo_toml = env::current_dir().unwrap().join("Cargo.toml");
        assert!(fs.exists(&cargo_toml));
        assert!(!fs.exists(Path::new("/nonexistent/path/12345")));
    }
}
