//! Data ingestion: download the raw file, drop excluded columns and write a
//! seeded 80/20 train/test split.

use crate::config::DataIngestionConfig;
use crate::error::{PipelineError, Result, ResultExt as _};
use crate::io;
use crate::schema::DatasetSchema;
use crate::storage::ObjectStore;
use polars::prelude::*;
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Share of rows written to the test split.
pub const TEST_SIZE: f64 = 0.2;

/// Seed of the train/test permutation.
pub const SPLIT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataIngestionArtifact {
    pub train_file_path: PathBuf,
    pub test_file_path: PathBuf,
    pub is_ingested: bool,
    pub message: String,
}

pub struct DataIngestion {
    config: DataIngestionConfig,
    schema: DatasetSchema,
    store: Box<dyn ObjectStore>,
}

impl DataIngestion {
    pub fn new(
        config: DataIngestionConfig,
        schema: DatasetSchema,
        store: Box<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            schema,
            store,
        }
    }

    /// Fetch the configured object into the raw-data directory.
    pub fn download_data(&self) -> Result<PathBuf> {
        let raw_dir = &self.config.raw_data_dir;
        std::fs::create_dir_all(raw_dir)
            .with_context(|| format!("Failed to create raw data directory {}", raw_dir.display()))?;

        let dest = raw_dir.join(&self.config.local_file_name);
        tracing::info!(
            backend = self.store.backend_type(),
            "Downloading '{}' from bucket '{}' into {}",
            self.config.object_name,
            self.config.bucket_name,
            dest.display()
        );

        self.store
            .download(&self.config.bucket_name, &self.config.object_name, &dest)?;
        Ok(dest)
    }

    /// The one file in the raw-data directory.
    pub fn raw_data_file(&self) -> Result<PathBuf> {
        let raw_dir = &self.config.raw_data_dir;
        let mut files = io::list_files(raw_dir)?;

        match files.len() {
            1 => Ok(files.remove(0)),
            0 => Err(PipelineError::DataProcessing(format!(
                "no raw data file in {}",
                raw_dir.display()
            ))),
            n => Err(PipelineError::DataProcessing(format!(
                "expected exactly one raw data file in {}, found {n}",
                raw_dir.display()
            ))),
        }
    }

    /// Load the raw file and drop the schema's excluded columns.
    pub fn load_raw_data(&self, path: &Path) -> Result<DataFrame> {
        let df = io::load_df(path)?;
        tracing::info!(rows = df.height(), columns = df.width(), "Loaded {}", path.display());
        drop_columns(&df, self.schema.drop_columns())
    }

    /// Split `df` and write both partitions, named after `file_name`.
    pub fn split_data_as_train_test(
        &self,
        df: &DataFrame,
        file_name: &str,
    ) -> Result<DataIngestionArtifact> {
        let (mut train, mut test) = train_test_split(df, TEST_SIZE, SPLIT_SEED)?;

        let train_file_path = self.config.ingested_train_dir.join(file_name);
        let test_file_path = self.config.ingested_test_dir.join(file_name);

        tracing::info!(
            rows = train.height(),
            "Writing train split to {}",
            train_file_path.display()
        );
        io::save_df(&mut train, &train_file_path)?;
        tracing::info!(rows = test.height(), "Writing test split to {}", test_file_path.display());
        io::save_df(&mut test, &test_file_path)?;

        Ok(DataIngestionArtifact {
            train_file_path,
            test_file_path,
            is_ingested: true,
            message: "Data ingestion completed successfully".to_owned(),
        })
    }

    pub fn initiate_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        self.download_data()?;
        let raw_file = self.raw_data_file()?;
        let df = self.load_raw_data(&raw_file)?;

        let file_name = raw_file
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(self.config.local_file_name.as_str())
            .to_owned();

        let artifact = self.split_data_as_train_test(&df, &file_name)?;
        tracing::info!("Data ingestion artifact: {artifact:?}");
        Ok(artifact)
    }
}

/// Remove `columns` from `df`; every listed column must exist.
pub fn drop_columns(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    if let Some(missing) = columns
        .iter()
        .find(|name| df.get_column_index(name.as_str()).is_none())
    {
        return Err(PipelineError::SchemaMismatch(format!(
            "drop column '{missing}' not found in raw data"
        )));
    }

    let keep: Vec<PlSmallStr> = df
        .get_column_names()
        .into_iter()
        .filter(|name| !columns.iter().any(|c| c.as_str() == name.as_str()))
        .cloned()
        .collect();

    Ok(df.select(keep)?)
}

/// Seeded random split: the first `round(test_size * n)` rows of a seeded
/// permutation form the test set, the rest the train set.
pub fn train_test_split(
    df: &DataFrame,
    test_size: f64,
    seed: u64,
) -> Result<(DataFrame, DataFrame)> {
    let n = df.height();
    let n_test = (n as f64 * test_size).round() as usize;

    let mut permutation = (0..n)
        .map(|i| {
            IdxSize::try_from(i).map_err(|_| {
                PipelineError::DataProcessing(format!("row index {i} exceeds the index type"))
            })
        })
        .collect::<Result<Vec<IdxSize>>>()?;
    permutation.shuffle(&mut StdRng::seed_from_u64(seed));

    let (test_idx, train_idx) = permutation.split_at(n_test);
    let train = df.take(&IdxCa::from_vec("idx".into(), train_idx.to_vec()))?;
    let test = df.take(&IdxCa::from_vec("idx".into(), test_idx.to_vec()))?;
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn frame(n: usize) -> Result<DataFrame> {
        let ids: Vec<i64> = (0..n as i64).collect();
        let flags: Vec<i64> = ids.iter().map(|i| i % 2).collect();
        Ok(DataFrame::new(vec![
            Column::new("CustomerID".into(), ids),
            Column::new("ProdTaken".into(), flags),
        ])?)
    }

    fn ids(df: &DataFrame) -> Result<Vec<i64>> {
        Ok(df
            .column("CustomerID")?
            .as_materialized_series()
            .i64()?
            .into_no_null_iter()
            .collect())
    }

    #[test]
    fn test_split_is_reproducible_and_disjoint() -> Result<()> {
        let df = frame(50)?;
        let (train_a, test_a) = train_test_split(&df, TEST_SIZE, SPLIT_SEED)?;
        let (train_b, test_b) = train_test_split(&df, TEST_SIZE, SPLIT_SEED)?;

        assert_eq!(ids(&train_a)?, ids(&train_b)?);
        assert_eq!(ids(&test_a)?, ids(&test_b)?);

        let train_ids = ids(&train_a)?;
        assert!(ids(&test_a)?.iter().all(|id| !train_ids.contains(id)));
        Ok(())
    }

    #[test]
    fn test_drop_columns() -> Result<()> {
        let df = frame(4)?;
        let dropped = drop_columns(&df, &["CustomerID".to_owned()])?;
        assert_eq!(dropped.width(), 1);
        assert!(dropped.column("ProdTaken").is_ok());

        let err = drop_columns(&df, &["Missing".to_owned()]).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch(_)));
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_split_sizes(n in 0usize..400) {
            let df = frame(n)?;
            let (train, test) = train_test_split(&df, TEST_SIZE, SPLIT_SEED)?;
            let expected_test = (n as f64 * TEST_SIZE).round() as usize;
            prop_assert_eq!(test.height(), expected_test);
            prop_assert_eq!(train.height() + test.height(), n);
        }
    }
}
