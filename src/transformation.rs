//! Data transformation: fit the column-group preprocessor on the train split,
//! apply it to the test split, rebalance classes and persist the arrays and
//! the fitted preprocessor.

use crate::config::DataTransformationConfig;
use crate::error::{PipelineError, Result, ResultExt as _};
use crate::ingestion::DataIngestionArtifact;
use crate::io;
use crate::preprocessing::ColumnPreprocessor;
use crate::resampling::SmoteEnn;
use crate::schema::{ColumnType, DatasetSchema};
use ndarray::{Array2, Axis, concatenate};
use polars::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataTransformationArtifact {
    pub is_transformed: bool,
    pub message: String,
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
    pub preprocessed_object_file_path: PathBuf,
}

pub struct DataTransformation {
    config: DataTransformationConfig,
    ingestion_artifact: DataIngestionArtifact,
    schema: DatasetSchema,
}

impl DataTransformation {
    pub fn new(
        config: DataTransformationConfig,
        ingestion_artifact: DataIngestionArtifact,
        schema: DatasetSchema,
    ) -> Self {
        Self {
            config,
            ingestion_artifact,
            schema,
        }
    }

    /// Unfitted preprocessor built from the schema's column groups.
    pub fn get_data_transformer_object(&self) -> Result<ColumnPreprocessor> {
        let groups = self.schema.require_column_groups()?;
        tracing::info!(
            numerical = ?groups.numerical,
            discrete = ?groups.discrete,
            continuous = ?groups.continuous,
            categorical = ?groups.categorical,
            power = ?groups.power_transform,
            "Building preprocessing object"
        );
        Ok(ColumnPreprocessor::from_groups(&groups))
    }

    pub fn initiate_data_transformation(&self) -> Result<DataTransformationArtifact> {
        // Every schema key is resolved before anything is read or written.
        let mut preprocessor = self.get_data_transformer_object()?;
        let target_column = self.schema.require_target_column()?;

        let train_path = &self.ingestion_artifact.train_file_path;
        let test_path = &self.ingestion_artifact.test_file_path;
        tracing::info!("Loading train and test splits");
        let train_df = load_data(train_path, &self.schema)?;
        let test_df = load_data(test_path, &self.schema)?;

        let (train_features, train_target) = split_target(&train_df, target_column)?;
        let (test_features, test_target) = split_target(&test_df, target_column)?;

        tracing::info!("Fitting preprocessor on train split");
        let train_arr = preprocessor.fit_transform(&train_features)?;
        let test_arr = preprocessor.transform(&test_features)?;

        let resampler = SmoteEnn::new(self.config.random_seed);
        tracing::info!("Resampling train split");
        let (train_arr, train_target) = resampler
            .fit_resample(&train_arr, &train_target)
            .context("Failed to resample train split")?;

        let (test_arr, test_target) = if self.config.resample_test_split {
            tracing::info!("Resampling test split");
            resampler
                .fit_resample(&test_arr, &test_target)
                .context("Failed to resample test split")?
        } else {
            (test_arr, test_target)
        };

        let train_arr = with_target(&train_arr, &train_target)?;
        let test_arr = with_target(&test_arr, &test_target)?;
        let mut column_names = preprocessor.feature_names();
        column_names.push(target_column.to_owned());

        let transformed_train_file_path =
            self.config.transformed_train_dir.join(array_file_name(train_path));
        let transformed_test_file_path =
            self.config.transformed_test_dir.join(array_file_name(test_path));
        let preprocessed_object_file_path = self.config.preprocessed_object_file_path.clone();

        tracing::info!(
            shape = ?train_arr.dim(),
            "Saving transformed train array to {}",
            transformed_train_file_path.display()
        );
        io::save_array(&train_arr, &column_names, &transformed_train_file_path)?;
        tracing::info!(
            shape = ?test_arr.dim(),
            "Saving transformed test array to {}",
            transformed_test_file_path.display()
        );
        io::save_array(&test_arr, &column_names, &transformed_test_file_path)?;

        tracing::info!(
            "Saving preprocessing object to {}",
            preprocessed_object_file_path.display()
        );
        preprocessor.save(&preprocessed_object_file_path)?;

        let artifact = DataTransformationArtifact {
            is_transformed: true,
            message: "Data transformation successful".to_owned(),
            transformed_train_file_path,
            transformed_test_file_path,
            preprocessed_object_file_path,
        };
        tracing::info!("Data transformation artifact: {artifact:?}");
        Ok(artifact)
    }
}

/// Load a split and enforce the schema's declared column types.
///
/// Columns the schema drops are not expected in a split and are skipped.
pub fn load_data(path: &Path, schema: &DatasetSchema) -> Result<DataFrame> {
    let mut df = io::load_df(path)?;

    let Some(declared) = &schema.columns else {
        return Ok(df);
    };

    for (name, column_type) in declared {
        if schema.drop_columns().contains(name) {
            continue;
        }

        let series = df
            .column(name)
            .map_err(|_| {
                PipelineError::SchemaMismatch(format!(
                    "column '{name}' declared in schema is missing from {}",
                    path.display()
                ))
            })?
            .as_materialized_series();

        let dtype = match column_type {
            ColumnType::Int => DataType::Int64,
            ColumnType::Float => DataType::Float64,
            ColumnType::Category => DataType::String,
        };
        if series.dtype() == &dtype {
            continue;
        }
        if dtype == DataType::Int64 {
            let fractional = count_fractional(series)?;
            if fractional > 0 {
                return Err(PipelineError::SchemaMismatch(format!(
                    "column '{name}' in {} has {fractional} non-integer value(s)",
                    path.display()
                )));
            }
        }

        let casted = series.strict_cast(&dtype).map_err(|e| {
            PipelineError::SchemaMismatch(format!(
                "column '{name}' in {} cannot be read as {column_type:?}: {e}",
                path.display()
            ))
        })?;
        df.replace(name, casted)?;
    }

    Ok(df)
}

/// Count non-null values with a fractional part. Non-float series have none.
fn count_fractional(series: &Series) -> Result<usize> {
    if !series.dtype().is_float() {
        return Ok(0);
    }
    let values = series.cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| v.fract() != 0.0)
        .count())
}

/// Separate the target column from the features.
fn split_target(df: &DataFrame, target_column: &str) -> Result<(DataFrame, Vec<i64>)> {
    let column = df
        .column(target_column)
        .map_err(|_| {
            PipelineError::SchemaMismatch(format!("target column '{target_column}' not found"))
        })?
        .as_materialized_series();

    let fractional = count_fractional(column)?;
    if fractional > 0 {
        return Err(PipelineError::DataProcessing(format!(
            "target column '{target_column}' has {fractional} non-integer value(s)"
        )));
    }

    let target = column
        .strict_cast(&DataType::Int64)
        .with_context(|| format!("Target column '{target_column}' is not integer-valued"))?;

    if target.null_count() > 0 {
        return Err(PipelineError::DataProcessing(format!(
            "target column '{target_column}' has {} missing value(s)",
            target.null_count()
        )));
    }

    let labels = target.i64()?.into_no_null_iter().collect();
    let features = df.drop(target_column)?;
    Ok((features, labels))
}

/// Append the target as the last column.
fn with_target(features: &Array2<f64>, target: &[i64]) -> Result<Array2<f64>> {
    let target = Array2::from_shape_fn((target.len(), 1), |(i, _)| target[i] as f64);
    concatenate(Axis(1), &[features.view(), target.view()]).map_err(|e| {
        PipelineError::DataProcessing(format!("Failed to append target column: {e}"))
    })
}

/// `train.csv` -> `train.parquet`.
fn array_file_name(split_path: &Path) -> PathBuf {
    PathBuf::from(split_path.file_name().unwrap_or(split_path.as_os_str()))
        .with_extension("parquet")
}
