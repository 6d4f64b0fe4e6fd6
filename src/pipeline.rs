//! Training pipeline orchestration.
//!
//! [`TrainingPipeline`] owns the run [`Configuration`] and sequences the
//! stages:
//!
//! ```text
//! run_pipeline()
//!   │
//!   ├─> start_data_ingestion()        download, drop, split
//!   │
//!   └─> start_data_transformation()   only if run_data_transformation
//! ```
//!
//! Each stage runs inside [`logging::run_stage`]; a failing stage is wrapped
//! in [`PipelineError::Stage`] and aborts the run.

use crate::config::Configuration;
use crate::error::{PipelineError, Result};
use crate::ingestion::{DataIngestion, DataIngestionArtifact};
use crate::logging;
use crate::schema::DatasetSchema;
use crate::storage;
use crate::transformation::{DataTransformation, DataTransformationArtifact};
use serde::Serialize;
use std::path::PathBuf;

pub const DATA_INGESTION_STAGE: &str = "data_ingestion";
pub const DATA_TRANSFORMATION_STAGE: &str = "data_transformation";

/// Outputs of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub pipeline_name: String,
    pub time_stamp: String,
    pub ingestion: DataIngestionArtifact,
    /// `None` when transformation is disabled in the config
    pub transformation: Option<DataTransformationArtifact>,
}

pub struct TrainingPipeline {
    config: Configuration,
    schema_file_path: PathBuf,
}

impl TrainingPipeline {
    pub fn new(config: Configuration, schema_file_path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            schema_file_path: schema_file_path.into(),
        }
    }

    fn load_schema(&self) -> Result<DatasetSchema> {
        DatasetSchema::from_file(&self.schema_file_path)
    }

    pub fn start_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        logging::run_stage(DATA_INGESTION_STAGE, || {
            let ingestion_config = self.config.data_ingestion_config()?;
            let store = storage::from_endpoint(
                ingestion_config.storage_endpoint.as_deref(),
                ingestion_config.storage_region.as_deref(),
                self.config.root_dir(),
            )?;
            let ingestion = DataIngestion::new(ingestion_config, self.load_schema()?, store);
            ingestion.initiate_data_ingestion()
        })
        .map_err(|e| PipelineError::stage(DATA_INGESTION_STAGE, e))
    }

    pub fn start_data_transformation(
        &self,
        ingestion_artifact: DataIngestionArtifact,
    ) -> Result<DataTransformationArtifact> {
        logging::run_stage(DATA_TRANSFORMATION_STAGE, || {
            let transformation = DataTransformation::new(
                self.config.data_transformation_config()?,
                ingestion_artifact,
                self.load_schema()?,
            );
            transformation.initiate_data_transformation()
        })
        .map_err(|e| PipelineError::stage(DATA_TRANSFORMATION_STAGE, e))
    }

    pub fn run_pipeline(&self) -> Result<RunReport> {
        let run_config = self.config.training_pipeline_config();
        tracing::info!(
            pipeline = %run_config.pipeline_name,
            time_stamp = self.config.time_stamp(),
            "Starting training pipeline"
        );

        let ingestion = self.start_data_ingestion()?;

        let transformation = if run_config.run_data_transformation {
            Some(self.start_data_transformation(ingestion.clone())?)
        } else {
            tracing::info!("Data transformation disabled, stopping after ingestion");
            None
        };

        Ok(RunReport {
            pipeline_name: run_config.pipeline_name.clone(),
            time_stamp: self.config.time_stamp().to_owned(),
            ingestion,
            transformation,
        })
    }
}
