//! Logging infrastructure for the pipeline.
//!
//! Logs go to the console and to daily-rolling files under `<root>/logs`:
//!
//! - `tourism.<date>.log`: every event at or above the active filter
//! - `error.<date>.log`: warnings and errors only
//!
//! The filter defaults to `info` and can be overridden with `RUST_LOG`.
//!
//! Stage lifecycle is logged explicitly with [`run_stage`], which enters a
//! span for the stage and emits a "started" event before and a
//! "completed"/"failed" event after the stage body:
//!
//! ```no_run
//! use tourism::logging;
//!
//! # fn main() -> anyhow::Result<()> {
//! logging::init(std::path::Path::new("logs"))?;
//! let rows = logging::run_stage("data_ingestion", || Ok(800))?;
//! tracing::info!(rows, "ingested");
//! # Ok(())
//! # }
//! ```

use crate::error::Result as PipelineResult;
use anyhow::{Context as _, Result};
use std::path::Path;
use std::time::Instant;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Initializes console and file logging.
///
/// # Errors
///
/// Returns error if the log directory cannot be created, a file appender
/// fails, or a global subscriber is already installed.
pub fn init(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let all_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("tourism")
        .filename_suffix("log")
        .build(log_dir)
        .context("Failed to create all-logs file appender")?;

    let error_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("error")
        .filename_suffix("log")
        .build(log_dir)
        .context("Failed to create error-logs file appender")?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_file(true)
        .pretty();

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(all_logs_appender);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(error_logs_appender)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!("Logging initialized, log directory: {:?}", log_dir);

    Ok(())
}

/// Runs `body` inside a span named after the stage, logging entry and exit.
///
/// The error is logged and returned unchanged; wrapping it with the stage
/// name is left to the caller.
pub fn run_stage<T, F>(stage: &str, body: F) -> PipelineResult<T>
where
    F: FnOnce() -> PipelineResult<T>,
{
    let span = tracing::info_span!("stage", name = stage);
    let _entered = span.enter();
    let start = Instant::now();

    tracing::info!("{0} {stage} started {1}", ">>".repeat(20), "<<".repeat(20));
    let result = body();
    let elapsed_ms = start.elapsed().as_millis();

    match &result {
        Ok(_) => tracing::info!(
            elapsed_ms,
            "{0} {stage} completed {1}",
            ">>".repeat(20),
            "<<".repeat(20)
        ),
        Err(e) => tracing::error!(elapsed_ms, error = %e, "{stage} failed"),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_run_stage_passes_value_through() {
        let value = run_stage("unit", || Ok(42)).expect("stage succeeds");
        assert_eq!(value, 42);
    }

    #[test]
    fn test_run_stage_returns_error_unchanged() {
        let result: PipelineResult<()> =
            run_stage("unit", || Err(PipelineError::Download("offline".to_owned())));
        assert!(matches!(result, Err(PipelineError::Download(_))));
    }
}
