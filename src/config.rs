//! Run configuration: YAML config loading and per-run path resolution.
//!
//! The config file has one section per stage. Every directory the pipeline
//! writes to is derived from `artifact_dir`, the stage name and the run
//! timestamp:
//!
//! ```text
//! <root>/<artifact_dir>/data_ingestion/<timestamp>/<raw_data_dir>
//! <root>/<artifact_dir>/data_ingestion/<timestamp>/<ingested_dir>/<ingested_train_dir>
//! <root>/<artifact_dir>/data_transformation/<timestamp>/<transformed_dir>/<transformed_train_dir>
//! ```

use crate::error::{PipelineError, Result, ResultExt as _};
use chrono::Local;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = "config";
pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const SCHEMA_FILE_NAME: &str = "schema.yaml";
pub const LOG_DIR: &str = "logs";

pub const TRAINING_PIPELINE_CONFIG_KEY: &str = "training_pipeline_config";
pub const TRAINING_PIPELINE_NAME_KEY: &str = "pipeline_name";
pub const TRAINING_PIPELINE_ARTIFACT_DIR_KEY: &str = "artifact_dir";
pub const RUN_DATA_TRANSFORMATION_KEY: &str = "run_data_transformation";

pub const DATA_INGESTION_CONFIG_KEY: &str = "data_ingestion_config";
pub const DATA_INGESTION_ARTIFACT_DIR: &str = "data_ingestion";
pub const STORAGE_ENDPOINT_KEY: &str = "storage_endpoint";
pub const STORAGE_REGION_KEY: &str = "storage_region";
pub const BUCKET_NAME_KEY: &str = "bucket_name";
pub const OBJECT_NAME_KEY: &str = "object_name";
pub const LOCAL_FILE_NAME_KEY: &str = "local_file_name";
pub const DATA_INGESTION_RAW_DATA_DIR_KEY: &str = "raw_data_dir";
pub const DATA_INGESTION_INGESTED_DIR_NAME_KEY: &str = "ingested_dir";
pub const DATA_INGESTION_TRAIN_DIR_KEY: &str = "ingested_train_dir";
pub const DATA_INGESTION_TEST_DIR_KEY: &str = "ingested_test_dir";

pub const DATA_TRANSFORMATION_CONFIG_KEY: &str = "data_transformation_config";
pub const DATA_TRANSFORMATION_ARTIFACT_DIR: &str = "data_transformation";
pub const TRANSFORMED_DIR_KEY: &str = "transformed_dir";
pub const TRANSFORMED_TRAIN_DIR_KEY: &str = "transformed_train_dir";
pub const TRANSFORMED_TEST_DIR_KEY: &str = "transformed_test_dir";
pub const PREPROCESSING_DIR_KEY: &str = "preprocessing_dir";
pub const PREPROCESSED_OBJECT_FILE_NAME_KEY: &str = "preprocessed_object_file_name";
pub const RESAMPLE_TEST_SPLIT_KEY: &str = "resample_test_split";
pub const RANDOM_SEED_KEY: &str = "random_seed";

pub const DEFAULT_RANDOM_SEED: u64 = 42;

/// Timestamp naming one pipeline run, e.g. `2026-10-16-09-30-00`.
pub fn current_time_stamp() -> String {
    Local::now().format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// Default config path under `root`.
pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(CONFIG_FILE_NAME)
}

/// Default schema path under `root`.
pub fn default_schema_path(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(SCHEMA_FILE_NAME)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingPipelineConfig {
    pub pipeline_name: String,
    pub artifact_dir: PathBuf,
    /// Chain the transformation stage after ingestion
    pub run_data_transformation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataIngestionConfig {
    /// Object store location; `None` means AWS S3
    pub storage_endpoint: Option<String>,
    /// AWS region override for the S3 backend
    pub storage_region: Option<String>,
    pub bucket_name: String,
    pub object_name: String,
    pub local_file_name: String,
    pub raw_data_dir: PathBuf,
    pub ingested_train_dir: PathBuf,
    pub ingested_test_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataTransformationConfig {
    pub transformed_train_dir: PathBuf,
    pub transformed_test_dir: PathBuf,
    pub preprocessed_object_file_path: PathBuf,
    /// Apply rebalancing to the test split as well as the train split
    pub resample_test_split: bool,
    pub random_seed: u64,
}

/// Parsed config file plus the timestamp of the current run.
#[derive(Debug, Clone)]
pub struct Configuration {
    config_file_path: PathBuf,
    config_info: Value,
    root_dir: PathBuf,
    time_stamp: String,
    training_pipeline_config: TrainingPipelineConfig,
}

impl Configuration {
    /// Load `config_file_path`, resolving relative paths against the current
    /// working directory.
    pub fn new(config_file_path: impl AsRef<Path>, current_time_stamp: &str) -> Result<Self> {
        let root = std::env::current_dir().context("Failed to resolve working directory")?;
        Self::with_root(root, config_file_path, current_time_stamp)
    }

    /// Load `config_file_path`, resolving `artifact_dir` against `root_dir`.
    pub fn with_root(
        root_dir: impl Into<PathBuf>,
        config_file_path: impl AsRef<Path>,
        current_time_stamp: &str,
    ) -> Result<Self> {
        let config_file_path = config_file_path.as_ref().to_path_buf();
        let config_info = read_yaml_file(&config_file_path)?;
        let root_dir = root_dir.into();

        let mut config = Self {
            config_file_path,
            config_info,
            root_dir,
            time_stamp: current_time_stamp.to_owned(),
            training_pipeline_config: TrainingPipelineConfig {
                pipeline_name: String::new(),
                artifact_dir: PathBuf::new(),
                run_data_transformation: true,
            },
        };
        config.training_pipeline_config = config.load_training_pipeline_config()?;
        Ok(config)
    }

    pub fn time_stamp(&self) -> &str {
        &self.time_stamp
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn training_pipeline_config(&self) -> &TrainingPipelineConfig {
        &self.training_pipeline_config
    }

    pub fn load_training_pipeline_config(&self) -> Result<TrainingPipelineConfig> {
        let section = self.section(TRAINING_PIPELINE_CONFIG_KEY)?;
        let pipeline_name =
            self.required_str(TRAINING_PIPELINE_CONFIG_KEY, section, TRAINING_PIPELINE_NAME_KEY)?;
        let artifact_dir = self.required_str(
            TRAINING_PIPELINE_CONFIG_KEY,
            section,
            TRAINING_PIPELINE_ARTIFACT_DIR_KEY,
        )?;
        let run_data_transformation = self
            .optional_bool(TRAINING_PIPELINE_CONFIG_KEY, section, RUN_DATA_TRANSFORMATION_KEY)?
            .unwrap_or(true);

        let config = TrainingPipelineConfig {
            pipeline_name,
            artifact_dir: self.root_dir.join(artifact_dir),
            run_data_transformation,
        };
        tracing::info!("Training pipeline config: {config:?}");
        Ok(config)
    }

    /// Ingestion config for this run's timestamp.
    pub fn data_ingestion_config(&self) -> Result<DataIngestionConfig> {
        self.load_data_ingestion_config(&self.training_pipeline_config, &self.time_stamp)
    }

    pub fn load_data_ingestion_config(
        &self,
        run_config: &TrainingPipelineConfig,
        time_stamp: &str,
    ) -> Result<DataIngestionConfig> {
        let key = DATA_INGESTION_CONFIG_KEY;
        let section = self.section(key)?;
        let stage_dir = run_config
            .artifact_dir
            .join(DATA_INGESTION_ARTIFACT_DIR)
            .join(time_stamp);

        let ingested_dir =
            stage_dir.join(self.required_str(key, section, DATA_INGESTION_INGESTED_DIR_NAME_KEY)?);

        let config = DataIngestionConfig {
            storage_endpoint: self.optional_str(key, section, STORAGE_ENDPOINT_KEY)?,
            storage_region: self.optional_str(key, section, STORAGE_REGION_KEY)?,
            bucket_name: self.required_str(key, section, BUCKET_NAME_KEY)?,
            object_name: self.required_str(key, section, OBJECT_NAME_KEY)?,
            local_file_name: self.required_str(key, section, LOCAL_FILE_NAME_KEY)?,
            raw_data_dir: stage_dir
                .join(self.required_str(key, section, DATA_INGESTION_RAW_DATA_DIR_KEY)?),
            ingested_train_dir: ingested_dir
                .join(self.required_str(key, section, DATA_INGESTION_TRAIN_DIR_KEY)?),
            ingested_test_dir: ingested_dir
                .join(self.required_str(key, section, DATA_INGESTION_TEST_DIR_KEY)?),
        };
        tracing::info!("Data ingestion config: {config:?}");
        Ok(config)
    }

    /// Transformation config for this run's timestamp.
    pub fn data_transformation_config(&self) -> Result<DataTransformationConfig> {
        self.load_data_transformation_config(&self.training_pipeline_config, &self.time_stamp)
    }

    pub fn load_data_transformation_config(
        &self,
        run_config: &TrainingPipelineConfig,
        time_stamp: &str,
    ) -> Result<DataTransformationConfig> {
        let key = DATA_TRANSFORMATION_CONFIG_KEY;
        let section = self.section(key)?;
        let stage_dir = run_config
            .artifact_dir
            .join(DATA_TRANSFORMATION_ARTIFACT_DIR)
            .join(time_stamp);

        let transformed_dir = stage_dir.join(self.required_str(key, section, TRANSFORMED_DIR_KEY)?);
        let preprocessing_dir =
            stage_dir.join(self.required_str(key, section, PREPROCESSING_DIR_KEY)?);

        let random_seed = match section.get(RANDOM_SEED_KEY) {
            None | Some(Value::Null) => DEFAULT_RANDOM_SEED,
            Some(value) => value.as_u64().ok_or_else(|| {
                self.malformed(key, RANDOM_SEED_KEY, "expected a non-negative integer")
            })?,
        };

        let config = DataTransformationConfig {
            transformed_train_dir: transformed_dir
                .join(self.required_str(key, section, TRANSFORMED_TRAIN_DIR_KEY)?),
            transformed_test_dir: transformed_dir
                .join(self.required_str(key, section, TRANSFORMED_TEST_DIR_KEY)?),
            preprocessed_object_file_path: preprocessing_dir
                .join(self.required_str(key, section, PREPROCESSED_OBJECT_FILE_NAME_KEY)?),
            resample_test_split: self
                .optional_bool(key, section, RESAMPLE_TEST_SPLIT_KEY)?
                .unwrap_or(true),
            random_seed,
        };
        tracing::info!("Data transformation config: {config:?}");
        Ok(config)
    }

    fn section(&self, key: &str) -> Result<&Mapping> {
        match self.config_info.get(key) {
            Some(Value::Mapping(map)) => Ok(map),
            Some(_) => Err(self.malformed(key, key, "expected a mapping")),
            None => Err(PipelineError::Config(format!(
                "missing section '{key}' in {}",
                self.config_file_path.display()
            ))),
        }
    }

    fn required_str(&self, section_name: &str, section: &Mapping, key: &str) -> Result<String> {
        self.optional_str(section_name, section, key)?
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "missing key '{section_name}.{key}' in {}",
                    self.config_file_path.display()
                ))
            })
    }

    fn optional_str(
        &self,
        section_name: &str,
        section: &Mapping,
        key: &str,
    ) -> Result<Option<String>> {
        match section.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(self.malformed(section_name, key, "expected a string")),
        }
    }

    fn optional_bool(
        &self,
        section_name: &str,
        section: &Mapping,
        key: &str,
    ) -> Result<Option<bool>> {
        match section.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(self.malformed(section_name, key, "expected true or false")),
        }
    }

    fn malformed(&self, section_name: &str, key: &str, reason: &str) -> PipelineError {
        PipelineError::Config(format!(
            "malformed key '{section_name}.{key}' in {}: {reason}",
            self.config_file_path.display()
        ))
    }
}

/// Read a YAML file into an untyped document.
pub fn read_yaml_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read YAML file {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r"
training_pipeline_config:
  pipeline_name: tourism
  artifact_dir: artifact
data_ingestion_config:
  storage_region: eu-west-1
  bucket_name: tourism-data
  object_name: raw/Travel.csv
  local_file_name: Travel.csv
  raw_data_dir: raw_data
  ingested_dir: ingested_data
  ingested_train_dir: train
  ingested_test_dir: test
data_transformation_config:
  transformed_dir: transformed_data
  transformed_train_dir: train
  transformed_test_dir: test
  preprocessing_dir: preprocessed
  preprocessed_object_file_name: preprocessed.json
  resample_test_split: false
";

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.yaml");
        std::fs::write(&path, content).expect("write config");
        path
    }

    #[test]
    fn test_ingestion_paths_include_timestamp() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = write_config(tmp.path(), CONFIG);
        let config = Configuration::with_root(tmp.path(), &path, "2026-01-01-00-00-00")
            .expect("config loads");

        let ingestion = config.data_ingestion_config().expect("ingestion config");
        let stage_dir = tmp
            .path()
            .join("artifact")
            .join("data_ingestion")
            .join("2026-01-01-00-00-00");

        assert_eq!(ingestion.bucket_name, "tourism-data");
        assert_eq!(ingestion.storage_endpoint, None);
        assert_eq!(ingestion.storage_region.as_deref(), Some("eu-west-1"));
        assert_eq!(ingestion.raw_data_dir, stage_dir.join("raw_data"));
        assert_eq!(
            ingestion.ingested_train_dir,
            stage_dir.join("ingested_data").join("train")
        );
        assert_eq!(
            ingestion.ingested_test_dir,
            stage_dir.join("ingested_data").join("test")
        );
    }

    #[test]
    fn test_transformation_defaults_and_flags() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = write_config(tmp.path(), CONFIG);
        let config = Configuration::with_root(tmp.path(), &path, "ts").expect("config loads");

        assert!(config.training_pipeline_config().run_data_transformation);

        let transformation = config
            .data_transformation_config()
            .expect("transformation config");
        assert!(!transformation.resample_test_split);
        assert_eq!(transformation.random_seed, DEFAULT_RANDOM_SEED);
        assert!(
            transformation
                .preprocessed_object_file_path
                .ends_with("data_transformation/ts/preprocessed/preprocessed.json")
        );
    }

    #[test]
    fn test_missing_key_names_key_and_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = write_config(tmp.path(), &CONFIG.replace("  bucket_name: tourism-data\n", ""));
        let config = Configuration::with_root(tmp.path(), &path, "ts").expect("config loads");

        let err = config.data_ingestion_config().unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        let msg = err.to_string();
        assert!(msg.contains("data_ingestion_config.bucket_name"), "{msg}");
        assert!(msg.contains("config.yaml"), "{msg}");
    }

    #[test]
    fn test_missing_artifact_dir_fails_on_load() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = write_config(tmp.path(), &CONFIG.replace("  artifact_dir: artifact\n", ""));
        let err = Configuration::with_root(tmp.path(), &path, "ts").unwrap_err();
        assert!(err.to_string().contains("artifact_dir"));
    }

    #[test]
    fn test_unreadable_file_names_path() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = Configuration::with_root(tmp.path(), tmp.path().join("nope.yaml"), "ts")
            .unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }

    #[test]
    fn test_time_stamp_format() {
        let ts = current_time_stamp();
        assert_eq!(ts.len(), "2026-10-16-09-30-00".len());
        assert_eq!(ts.matches('-').count(), 5);
    }
}
