//! Dataset schema: column groups, dropped columns, target column.
//!
//! Keys are optional at parse time so ingestion can run with a schema that
//! only lists `drop_columns`. Stages ask for the keys they need through the
//! `require_*` accessors, which fail with a [`PipelineError::Config`] naming
//! the key and the schema file.

use crate::error::{PipelineError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DROP_COLUMN_KEY: &str = "drop_columns";
pub const NUMERICAL_COLUMN_KEY: &str = "numerical_columns";
pub const CATEGORICAL_COLUMN_KEY: &str = "categorical_columns";
pub const DISCRETE_COLUMN_KEY: &str = "discrete_columns";
pub const CONTINUOUS_COLUMN_KEY: &str = "continuous_columns";
pub const TRANSFORMATION_COLUMN_KEY: &str = "transformation_columns";
pub const TARGET_COLUMN_KEY: &str = "target_column";

/// Declared type of a column in the schema's `columns` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[serde(alias = "int64", alias = "integer")]
    Int,
    #[serde(alias = "float64", alias = "double")]
    Float,
    #[serde(alias = "str", alias = "string", alias = "object")]
    Category,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Column name to declared type, checked when loading splits
    #[serde(default)]
    pub columns: Option<BTreeMap<String, ColumnType>>,

    #[serde(default, alias = "Drop_columns")]
    pub drop_columns: Option<Vec<String>>,

    #[serde(default)]
    pub numerical_columns: Option<Vec<String>>,

    #[serde(default)]
    pub categorical_columns: Option<Vec<String>>,

    #[serde(default)]
    pub discrete_columns: Option<Vec<String>>,

    #[serde(default)]
    pub continuous_columns: Option<Vec<String>>,

    #[serde(default)]
    pub transformation_columns: Option<Vec<String>>,

    #[serde(default)]
    pub target_column: Option<String>,

    #[serde(skip)]
    source: PathBuf,
}

/// Column groups driving the composite preprocessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroups {
    pub numerical: Vec<String>,
    pub discrete: Vec<String>,
    pub continuous: Vec<String>,
    pub categorical: Vec<String>,
    pub power_transform: Vec<String>,
}

impl DatasetSchema {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file {}", path.display()))?;
        let mut schema = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse schema file {}", path.display()))?;
        schema.source = path.to_path_buf();
        Ok(schema)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Dropped columns; an absent key means nothing is dropped.
    pub fn drop_columns(&self) -> &[String] {
        self.drop_columns.as_deref().unwrap_or_default()
    }

    pub fn require_target_column(&self) -> Result<&str> {
        self.target_column
            .as_deref()
            .ok_or_else(|| self.missing(TARGET_COLUMN_KEY))
    }

    pub fn require_column_groups(&self) -> Result<ColumnGroups> {
        Ok(ColumnGroups {
            numerical: self.require_list(&self.numerical_columns, NUMERICAL_COLUMN_KEY)?,
            discrete: self.require_list(&self.discrete_columns, DISCRETE_COLUMN_KEY)?,
            continuous: self.require_list(&self.continuous_columns, CONTINUOUS_COLUMN_KEY)?,
            categorical: self.require_list(&self.categorical_columns, CATEGORICAL_COLUMN_KEY)?,
            power_transform: self
                .require_list(&self.transformation_columns, TRANSFORMATION_COLUMN_KEY)?,
        })
    }

    fn require_list(&self, list: &Option<Vec<String>>, key: &str) -> Result<Vec<String>> {
        list.clone().ok_or_else(|| self.missing(key))
    }

    fn missing(&self, key: &str) -> PipelineError {
        if self.source.as_os_str().is_empty() {
            PipelineError::Config(format!("missing schema key '{key}'"))
        } else {
            PipelineError::Config(format!(
                "missing schema key '{key}' in {}",
                self.source.display()
            ))
        }
    }
}
