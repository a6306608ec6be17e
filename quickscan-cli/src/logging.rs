// SPDX-License-Identifier: GPL-3.0-only

use std::fs::File;
use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const DEFAULT_LOG_FILE: &str = "quickscan.log";

/// Passing this as the log file sends logs to stderr
pub const STDERR_LOG: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `level`.
///
/// The returned guard flushes buffered lines on drop and must live until exit.
pub fn init(level: LogLevel, log_file: &str) -> anyhow::Result<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let (writer, guard) = if log_file == STDERR_LOG {
        tracing_appender::non_blocking(std::io::stderr())
    } else {
        // truncated on every run
        let file = File::create(Path::new(log_file))
            .with_context(|| format!("unable to open log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .context("logging already initialized")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_are_filter_directives() {
        for level in LogLevel::value_variants() {
            let name = level.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(name, level.as_directive());
        }
    }
}
