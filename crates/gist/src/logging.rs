//! Tracing subscriber setup
//!
//! Logs go to stderr (stdout carries command output), optionally mirrored to
//! a daily-rotated file. `RUST_LOG` wins over the configured level.

use anyhow::Context;
use gist_config::{LogFormat, TelemetryConfig};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

const LOG_FILE_PREFIX: &str = "gist.log";

/// Install the global subscriber
///
/// The returned guards flush buffered log lines when dropped; keep them
/// alive for the duration of `main`.
///
/// # Errors
/// Fails if the filter is invalid, the log directory cannot be created, or a
/// subscriber is already installed.
pub fn init(config: &TelemetryConfig) -> anyhow::Result<Vec<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.tracing_level))
        .context("Invalid tracing filter")?;

    let (stderr_writer, stderr_guard): (NonBlocking, WorkerGuard) =
        tracing_appender::non_blocking(std::io::stderr());

    match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {dir}"))?;
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            let (file_writer, file_guard): (NonBlocking, WorkerGuard) =
                tracing_appender::non_blocking(file_appender);

            install(filter, config.log_format, file_writer.and(stderr_writer))?;
            Ok(vec![file_guard, stderr_guard])
        }
        None => {
            install(filter, config.log_format, stderr_writer)?;
            Ok(vec![stderr_guard])
        }
    }
}

fn install<W>(filter: EnvFilter, format: LogFormat, writer: W) -> anyhow::Result<()>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}
