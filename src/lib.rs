//! # Tourism - Data Preparation Pipeline
//!
//! Prepares the tourism package purchase dataset for model training. A run
//! downloads the raw CSV from object storage, drops excluded columns, splits
//! it 80/20 into train/test, fits a column-group preprocessor on the train
//! split, rebalances classes with SMOTEENN and persists the transformed
//! arrays together with the fitted preprocessor.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tourism::config::{self, Configuration};
//! use tourism::pipeline::TrainingPipeline;
//!
//! # fn main() -> tourism::error::Result<()> {
//! let root = std::env::current_dir()?;
//! let config = Configuration::with_root(
//!     &root,
//!     config::default_config_path(&root),
//!     &config::current_time_stamp(),
//! )?;
//!
//! let report = TrainingPipeline::new(config, config::default_schema_path(&root)).run_pipeline()?;
//! println!("train split: {}", report.ingestion.train_file_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`config`]: YAML run configuration and per-run artifact paths
//! - [`schema`]: Column groups, dropped columns and target column
//! - [`storage`]: Object storage backends (AWS S3, HTTP and local directory)
//! - [`ingestion`]: Download, column dropping, seeded train/test split
//! - [`preprocessing`]: Imputation, scaling, one-hot and power transforms
//! - [`resampling`]: SMOTE, edited nearest neighbours, SMOTEENN
//! - [`transformation`]: Fit/apply preprocessing, rebalance, persist arrays
//! - [`pipeline`]: Stage orchestration
//! - [`error`]: Error taxonomy and context helpers
//! - [`logging`]: Console and rolling-file tracing setup
//!
//! ## Artifact Layout
//!
//! ```text
//! <artifact_dir>/
//!   data_ingestion/<timestamp>/
//!     raw_data/Travel.csv
//!     ingested_data/{train,test}/Travel.csv
//!   data_transformation/<timestamp>/
//!     transformed_data/{train,test}/Travel.parquet
//!     preprocessed/preprocessed.json
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod ingestion;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod preprocessing;
pub mod resampling;
pub mod schema;
pub mod storage;
pub mod transformation;
