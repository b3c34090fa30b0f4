//! Scripted command runner for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::collector::traits::CommandRunner;

/// Replays canned output keyed by exact command line.
///
/// Unknown command lines yield an empty string, the same as a missing tool.
/// Every invocation is recorded so tests can assert which tiers ran.
/// Clones share the script and the call log.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    outputs: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockRunner {
    /// Creates a runner that knows no commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the output returned for `command_line`.
    pub fn on(&self, command_line: impl Into<String>, output: impl Into<String>) -> &Self {
        self.outputs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(command_line.into(), output.into());
        self
    }

    /// Returns every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of times `command_line` was run.
    pub fn call_count(&self, command_line: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.as_str() == command_line)
            .count()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, command_line: &str) -> String {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command_line.to_string());
        self.outputs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(command_line)
            .cloned()
            .unwrap_or_default()
    }
}
