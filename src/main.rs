//! # Tourism Pipeline Entry Point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Initialize logging under ./logs
//!   └─> Run ingestion, then transformation
//! ```
//!
//! A failed run is logged with its full cause chain. The process still exits
//! normally; check the error log for failures.

#![warn(clippy::all, rust_2018_idioms)]

mod cli;

use anyhow::{Context as _, Result};
use clap::Parser as _;
use std::error::Error as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let root = std::env::current_dir().context("Failed to resolve working directory")?;
    tourism::logging::init(&root.join(tourism::config::LOG_DIR))?;

    match cli::run(&cli, &root) {
        Ok(report) => {
            tracing::info!("Pipeline run complete: {report:?}");
        }
        Err(e) => {
            tracing::error!("Pipeline run failed: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                tracing::error!("  caused by: {cause}");
                source = cause.source();
            }
        }
    }

    Ok(())
}
