//! Periodic background sampling of one device.
//!
//! A [`Sampler`] is either idle or running a single worker thread. Each cycle
//! takes one performance snapshot, records it in the shared
//! [`HistoryStore`], and appends the history to the CSV output file.
//!
//! Stopping is cooperative: the worker checks its flag at the top of every
//! cycle and between sleep slices. An in-flight tool invocation is never
//! interrupted, so shutdown can lag by the duration of that command.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::collector::{CommandRunner, SmartCollector};
use crate::storage::HistoryStore;

/// Granularity of the interruptible sleep between cycles, and the shortest
/// accepted interval.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// How long `stop` waits for the worker before detaching it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// Error type for sampler control.
#[derive(Debug)]
pub enum SamplerError {
    /// The worker thread could not be spawned.
    Spawn(std::io::Error),
}

impl std::fmt::Display for SamplerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerError::Spawn(e) => write!(f, "failed to spawn sampler thread: {}", e),
        }
    }
}

impl std::error::Error for SamplerError {}

impl From<std::io::Error> for SamplerError {
    fn from(e: std::io::Error) -> Self {
        SamplerError::Spawn(e)
    }
}

struct Worker {
    device_path: String,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Samples one device on a fixed interval in a background thread.
pub struct Sampler<R: CommandRunner + Clone + 'static> {
    collector: SmartCollector<R>,
    history: Arc<HistoryStore>,
    worker: Option<Worker>,
}

impl<R: CommandRunner + Clone + 'static> Sampler<R> {
    /// Creates an idle sampler writing into `history`.
    pub fn new(collector: SmartCollector<R>, history: Arc<HistoryStore>) -> Self {
        Self {
            collector,
            history,
            worker: None,
        }
    }

    /// Shared history written by the worker.
    pub fn history(&self) -> Arc<HistoryStore> {
        Arc::clone(&self.history)
    }

    /// Whether a worker is active.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.running.load(Ordering::SeqCst) && !w.handle.is_finished())
    }

    /// Device sampled by the active worker, if any.
    pub fn device_path(&self) -> Option<&str> {
        self.worker.as_ref().map(|w| w.device_path.as_str())
    }

    /// Starts sampling `device_path` every `interval`, appending to
    /// `output_file`. A running worker is stopped first.
    ///
    /// Intervals shorter than 100ms are raised to 100ms.
    pub fn start(
        &mut self,
        device_path: &str,
        interval: Duration,
        output_file: impl Into<PathBuf>,
    ) -> Result<(), SamplerError> {
        if self.worker.is_some() {
            self.stop();
        }

        let running = Arc::new(AtomicBool::new(true));
        let output_file = output_file.into();
        if interval < SLEEP_SLICE {
            warn!(?interval, "sampling interval too short, using {:?}", SLEEP_SLICE);
        }
        let interval = interval.max(SLEEP_SLICE);

        let handle = {
            let running = Arc::clone(&running);
            let collector = self.collector.clone();
            let history = Arc::clone(&self.history);
            let device_path = device_path.to_string();
            thread::Builder::new()
                .name("ssdmon-sampler".to_string())
                .spawn(move || {
                    run_loop(
                        &collector,
                        &history,
                        &device_path,
                        interval,
                        &output_file,
                        &running,
                    )
                })?
        };

        info!(
            device = device_path,
            interval_secs = interval.as_secs_f64(),
            "sampler started"
        );
        self.worker = Some(Worker {
            device_path: device_path.to_string(),
            running,
            handle,
        });
        Ok(())
    }

    /// Signals the worker to stop and waits a bounded time for it to exit.
    ///
    /// No-op when idle.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.running.store(false, Ordering::SeqCst);

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while !worker.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(SHUTDOWN_POLL);
        }

        if worker.handle.is_finished() {
            if worker.handle.join().is_err() {
                warn!(device = %worker.device_path, "sampler thread panicked");
            }
            info!(device = %worker.device_path, "sampler stopped");
        } else {
            warn!(
                device = %worker.device_path,
                "sampler still busy after {:?}, detaching",
                SHUTDOWN_GRACE
            );
        }
    }
}

impl<R: CommandRunner + Clone + 'static> Drop for Sampler<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<R: CommandRunner>(
    collector: &SmartCollector<R>,
    history: &HistoryStore,
    device_path: &str,
    interval: Duration,
    output_file: &Path,
    running: &AtomicBool,
) {
    let mut cycles: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let cycle = panic::catch_unwind(AssertUnwindSafe(|| {
            let snapshot = collector.performance_snapshot(device_path);
            history.record(device_path, snapshot);
            history.flush_to_file(output_file)
        }));

        match cycle {
            Ok(Ok(rows)) => {
                cycles += 1;
                debug!(device = device_path, cycles, rows, "sampling cycle completed");
            }
            Ok(Err(e)) => {
                error!(
                    device = device_path,
                    path = %output_file.display(),
                    error = %e,
                    "failed to persist history"
                );
            }
            Err(_) => {
                error!(device = device_path, "sampling cycle panicked");
            }
        }

        // Sleep with periodic checks for the stop flag
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(SLEEP_SLICE);
            thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }
}
