//! ssdmond - SSD telemetry sampling daemon.
//!
//! Discovers solid-state devices, reports their health and remaining life,
//! then samples one device periodically and appends the history to a CSV
//! file until interrupted.
//!
//! Usage:
//!   ssdmond                          # sample the first discovered device every 10s
//!   ssdmond -d /dev/nvme0n1 -i 5     # pick device and interval
//!   ssdmond --list --json            # print discovered devices and exit

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use ssdmon::collector::{Discovery, RealFs, SmartCollector, SystemRunner};
use ssdmon::sampler::Sampler;
use ssdmon::storage::{DeviceRecord, HistoryStore};
use ssdmon::util::format_capacity;

/// SSD telemetry sampling daemon.
#[derive(Parser)]
#[command(name = "ssdmond", about = "SSD telemetry sampling daemon", version)]
struct Args {
    /// Sampling interval in seconds.
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// CSV file the sampled history is appended to.
    #[arg(short, long, default_value = "ssd_metrics_history.csv")]
    output: PathBuf,

    /// Device to sample (default: first discovered device).
    #[arg(short, long, value_name = "PATH")]
    device: Option<String>,

    /// Print discovered devices and exit.
    #[arg(long)]
    list: bool,

    /// Print the device list as JSON (with --list).
    #[arg(long, requires = "list")]
    json: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["ssdmond", "ssdmon"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {}: {}", target, e),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Discovers devices, falling back to the plain block-device listing.
/// Returns the devices and whether the fallback was used.
fn discover_devices() -> (Vec<DeviceRecord>, bool) {
    let discovery = Discovery::new(SystemRunner::new(), RealFs::new());

    let devices = discovery.discover();
    if !devices.is_empty() {
        return (devices, false);
    }

    info!("Trying fallback block device listing");
    (discovery.discover_block_devices(), true)
}

/// Renders the device list as numbered lines or a JSON array.
fn render_device_list(devices: &[DeviceRecord], json: bool) -> Result<String, serde_json::Error> {
    if json {
        return serde_json::to_string_pretty(devices);
    }

    let lines: Vec<String> = devices
        .iter()
        .enumerate()
        .map(|(i, device)| {
            format!(
                "{}. {} - {} ({}) {}",
                i + 1,
                device.path,
                device.model,
                device.interface_kind,
                format_capacity(device.size_bytes)
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Logs health attributes, NVMe metrics, life estimate and one sample.
fn report_device(smart: &SmartCollector<SystemRunner>, device: &DeviceRecord) {
    info!(
        "Device {}: model={}, interface={}, capacity={}",
        device.path,
        device.model,
        device.interface_kind,
        format_capacity(device.size_bytes)
    );

    let attrs = smart.health_attributes(&device.path);
    if attrs.is_empty() {
        warn!("No SMART data (missing permissions or unsupported device)");
    }
    for attr in &attrs {
        info!(
            "  SMART {:>3} {:<28} value={:>3} worst={:>3} thresh={:>3} raw={}",
            attr.id, attr.name, attr.current, attr.worst, attr.threshold, attr.raw
        );
    }

    if device.is_nvme() {
        let metrics = smart.nvme_metrics(&device.path);
        if metrics.is_empty() {
            warn!("No NVMe metrics (missing permissions or nvme-cli not installed)");
        }
        let mut entries: Vec<_> = metrics.iter().collect();
        entries.sort();
        for (key, value) in entries {
            info!("  NVMe {}: {}", key, value);
        }
    }

    info!(
        "Estimated life remaining: {}",
        smart.estimate_life_remaining(device)
    );

    let perf = smart.performance_snapshot(&device.path);
    info!(
        "Performance: read {} IOPS / {} MB/s / {} ms, write {} IOPS / {} MB/s / {} ms, queue depth {}",
        perf.read_iops,
        perf.read_throughput_mb,
        perf.read_latency_ms,
        perf.write_iops,
        perf.write_throughput_mb,
        perf.write_latency_ms,
        perf.queue_depth
    );
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("ssdmond {} starting", env!("CARGO_PKG_VERSION"));

    let (devices, used_fallback) = discover_devices();

    if args.list {
        if devices.is_empty() {
            warn!("No storage devices found; try running with root privileges");
        }
        match render_device_list(&devices, args.json) {
            Ok(out) if out.is_empty() => {}
            Ok(out) => println!("{}", out),
            Err(e) => {
                error!("Failed to serialize device list: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if devices.is_empty() {
        error!("No storage devices found; try running with root privileges");
        std::process::exit(1);
    }

    if used_fallback {
        warn!("Fallback discovery was used; install smartmontools and nvme-cli for full telemetry");
    }

    let device = match &args.device {
        Some(path) => devices
            .iter()
            .find(|d| &d.path == path)
            .cloned()
            .unwrap_or_else(|| {
                warn!("{} was not discovered, sampling it anyway", path);
                DeviceRecord {
                    path: path.clone(),
                    ..DeviceRecord::default()
                }
            }),
        None => devices[0].clone(),
    };

    let smart = SmartCollector::new(SystemRunner::new());
    report_device(&smart, &device);

    info!(
        "Config: device={}, interval={}s, output={}",
        device.path,
        args.interval,
        args.output.display()
    );

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let history = Arc::new(HistoryStore::new());
    let mut sampler = Sampler::new(smart, Arc::clone(&history));
    if let Err(e) = sampler.start(
        &device.path,
        Duration::from_secs(args.interval),
        &args.output,
    ) {
        error!("{}", e);
        std::process::exit(1);
    }

    while running.load(Ordering::SeqCst) && sampler.is_running() {
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("Shutting down...");
    sampler.stop();
    info!(
        "Collected {} snapshots into {}",
        history.len(&device.path),
        args.output.display()
    );
}
