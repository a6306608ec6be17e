// SPDX-License-Identifier: GPL-3.0-only

//! quickscan - report which block devices can be claimed as new storage
//!
//! Probes the host's raw block devices and prints, per physical disk, whether
//! it is available and why not. Nothing is ever written to a device.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use quickscan_sys::{DeviceRegistry, ExclusiveOpenProbe, ScanConfig, SystemCommandRunner, preflight};
use quickscan_types::DeviceFilter;
use tracing::{error, info};

mod logging;
mod report;

use logging::{DEFAULT_LOG_FILE, LogLevel};
use report::ReportFormat;

/// Exit status when the host does not meet the preconditions
const EXIT_PRECONDITION: u8 = 4;

#[derive(Debug, Parser)]
#[command(name = "quickscan")]
#[command(about = "Report which block devices are free to be claimed as storage", long_about = None)]
struct Args {
    /// Report format for the disk inventory
    #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
    format: ReportFormat,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value_t = LogLevel::Debug)]
    loglevel: LogLevel,

    /// Skip the disk availability checks
    #[arg(long)]
    skip_analysis: bool,

    /// Filter the devices shown by key/value (e.g. key=value,key/subkey=value)
    #[arg(long)]
    filter: Option<String>,

    /// TOML file overriding the scan configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file, truncated on each run; "-" logs to stderr
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let _log_guard = logging::init(args.loglevel, &args.log_file)?;

    let config = match &args.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };

    let checked = preflight::check(&config);
    if !checked.ok() {
        println!("Error: Unable to start");
        println!("{}", checked.reasons.join("\n"));
        return Ok(ExitCode::from(EXIT_PRECONDITION));
    }

    let filter = match args.filter.as_deref() {
        Some(raw) => DeviceFilter::parse(raw).unwrap_or_else(|err| {
            error!("invalid filter provided, ignored: {err}");
            DeviceFilter::none()
        }),
        None => DeviceFilter::none(),
    };

    info!("Starting...");
    let started = Instant::now();
    let registry = DeviceRegistry::build(
        &config,
        Arc::new(SystemCommandRunner),
        &ExclusiveOpenProbe,
        args.skip_analysis,
    )
    .await;
    info!(
        "Completed, runtime: {:.6}s",
        started.elapsed().as_secs_f64()
    );

    let selected = report::select(registry.devices(), &filter);
    let output = report::render(args.format, &selected, registry.analysed(), chrono::Utc::now())?;
    println!("{output}");

    Ok(ExitCode::SUCCESS)
}
