//! Logging configuration and initialization.
//!
//! Sets up the tracing subscriber for the `proxy-resolver` binary. Library
//! consumers install their own subscriber; the resolver only emits events.

use crate::config::{LogFormat, LoggingConfig};
use std::fs::OpenOptions;
use std::io;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on configuration.
///
/// Returns a guard that must be kept alive for the duration of the program
/// to ensure all logs are flushed.
///
/// # Arguments
///
/// * `config` - The logging configuration
/// * `level_override` - Optional level override from CLI/environment
/// * `trace_deps` - If true, log every target instead of only this crate
pub fn init_logging(
    config: &LoggingConfig,
    level_override: Option<String>,
    trace_deps: bool,
) -> io::Result<WorkerGuard> {
    let level = level_override.unwrap_or_else(|| config.level.clone());

    // RUST_LOG wins over configuration
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&level, trace_deps)));

    let (writer, guard) = make_writer(&config.output)?;

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(config.include_target);

            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(writer)
                .with_target(config.include_target);

            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_writer(writer)
                .with_target(config.include_target);

            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }

    Ok(guard)
}

fn make_writer(output: &str) -> io::Result<(NonBlocking, WorkerGuard)> {
    match output.to_lowercase().as_str() {
        "stdout" => Ok(tracing_appender::non_blocking(io::stdout())),
        "stderr" => Ok(tracing_appender::non_blocking(io::stderr())),
        _ => {
            let file = OpenOptions::new().create(true).append(true).open(output)?;
            Ok(tracing_appender::non_blocking(file))
        }
    }
}

/// Builds the filter directive for a level name.
///
/// Unknown levels fall back to `info`. Unless `trace_deps` is set, only this
/// crate logs at the requested level and everything else at `warn`, or at
/// `error` when that is what was requested.
pub fn filter_directive(level: &str, trace_deps: bool) -> String {
    let level = match level.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };

    if trace_deps {
        return level.to_string();
    }

    let base = if level == "error" { "error" } else { "warn" };
    format!("{},proxy_resolver={}", base, level)
}
