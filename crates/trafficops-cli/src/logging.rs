use anyhow::{Context, Result};
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use trafficops_infrastructure::TrafficOpsPaths;

const DEFAULT_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "trafficops.log";

/// Installs the global subscriber.
///
/// Logs always go to stderr. With `to_file`, they are also appended to
/// `<config_dir>/logs/trafficops.log.YYYY-MM-DD`; keep the returned guard
/// alive until exit so buffered lines are flushed.
pub fn init(to_file: bool, config_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    if !to_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init()
            .context("Failed to install log subscriber")?;
        return Ok(None);
    }

    let logs_dir = TrafficOpsPaths::new(config_dir).logs_dir()?;
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::debug!("[Logging] Writing logs to {}", logs_dir.display());
    Ok(Some(guard))
}
