//! The composite column-group preprocessor.
//!
//! Applies one [`GroupPipeline`] per schema column group and concatenates the
//! outputs left to right. Columns outside every group are dropped.

use super::{
    CategoryImputer, ImputeStrategy, OneHotEncoder, PowerTransformer, SimpleImputer,
    StandardScaler,
};
use crate::error::{PipelineError, Result, ResultExt as _};
use crate::io;
use crate::schema::ColumnGroups;
use ndarray::{Array2, ArrayView2, Axis, concatenate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-group transformation chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupPipeline {
    /// Numeric imputation followed by standard scaling
    Scaled {
        imputer: SimpleImputer,
        scaler: StandardScaler,
    },

    /// Most-frequent imputation, one-hot encoding, scaling without centering
    OneHot {
        imputer: CategoryImputer,
        encoder: OneHotEncoder,
        scaler: StandardScaler,
    },

    /// Mean imputation followed by a standardized Yeo-Johnson transform
    Power {
        imputer: SimpleImputer,
        transformer: PowerTransformer,
    },
}

impl GroupPipeline {
    pub fn scaled(strategy: ImputeStrategy) -> Self {
        Self::Scaled {
            imputer: SimpleImputer::new(strategy),
            scaler: StandardScaler::new(true),
        }
    }

    pub fn one_hot() -> Self {
        Self::OneHot {
            imputer: CategoryImputer::default(),
            encoder: OneHotEncoder::default(),
            scaler: StandardScaler::new(false),
        }
    }

    pub fn power() -> Self {
        Self::Power {
            imputer: SimpleImputer::new(ImputeStrategy::Mean),
            transformer: PowerTransformer::new(true),
        }
    }

    fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<()> {
        match self {
            Self::Scaled { imputer, scaler } => {
                let block = numeric_block(df, columns)?;
                imputer.fit(&block)?;
                scaler.fit(&imputer.transform(&block)?)
            }
            Self::OneHot {
                imputer,
                encoder,
                scaler,
            } => {
                let block = text_block(df, columns)?;
                imputer.fit(&block)?;
                let filled = imputer.transform(&block)?;
                encoder.fit(&filled)?;
                scaler.fit(&encoder.transform(&filled)?)
            }
            Self::Power {
                imputer,
                transformer,
            } => {
                let block = numeric_block(df, columns)?;
                imputer.fit(&block)?;
                transformer.fit(&imputer.transform(&block)?)
            }
        }
    }

    fn transform(&self, df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
        match self {
            Self::Scaled { imputer, scaler } => {
                scaler.transform(&imputer.transform(&numeric_block(df, columns)?)?)
            }
            Self::OneHot {
                imputer,
                encoder,
                scaler,
            } => {
                let filled = imputer.transform(&text_block(df, columns)?)?;
                scaler.transform(&encoder.transform(&filled)?)
            }
            Self::Power {
                imputer,
                transformer,
            } => transformer.transform(&imputer.transform(&numeric_block(df, columns)?)?),
        }
    }

    fn feature_names(&self, columns: &[String]) -> Vec<String> {
        match self {
            Self::OneHot { encoder, .. } => encoder.feature_names(columns),
            Self::Scaled { .. } | Self::Power { .. } => columns.to_vec(),
        }
    }
}

/// A named pipeline bound to the columns it consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    pub name: String,
    pub columns: Vec<String>,
    pub pipeline: GroupPipeline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPreprocessor {
    pub transformers: Vec<ColumnTransformer>,
    #[serde(default)]
    fitted: bool,
}

impl ColumnPreprocessor {
    /// Unfitted preprocessor with the discrete, continuous, categorical and
    /// power pipelines, in that order.
    pub fn from_groups(groups: &ColumnGroups) -> Self {
        let transformer = |name: &str, columns: &[String], pipeline| ColumnTransformer {
            name: name.to_owned(),
            columns: columns.to_vec(),
            pipeline,
        };

        Self {
            transformers: vec![
                transformer(
                    "discrete",
                    &groups.discrete,
                    GroupPipeline::scaled(ImputeStrategy::MostFrequent),
                ),
                transformer(
                    "continuous",
                    &groups.continuous,
                    GroupPipeline::scaled(ImputeStrategy::Mean),
                ),
                transformer("categorical", &groups.categorical, GroupPipeline::one_hot()),
                transformer("power", &groups.power_transform, GroupPipeline::power()),
            ],
            fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn fit(&mut self, df: &DataFrame) -> Result<()> {
        if df.height() == 0 {
            return Err(PipelineError::DataProcessing(
                "cannot fit preprocessor on an empty frame".to_owned(),
            ));
        }

        for t in &mut self.transformers {
            if t.columns.is_empty() {
                continue;
            }
            t.pipeline
                .fit(df, &t.columns)
                .with_context(|| format!("Failed to fit '{}' pipeline", t.name))?;
        }

        self.fitted = true;
        tracing::debug!(features = self.n_features_out(), "Preprocessor fitted");
        Ok(())
    }

    /// Apply fitted parameters to `df`. Never changes `self`.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.fitted {
            return Err(PipelineError::DataProcessing(
                "preprocessor must be fitted before transform".to_owned(),
            ));
        }

        let mut blocks = Vec::with_capacity(self.transformers.len());
        for t in &self.transformers {
            if t.columns.is_empty() {
                continue;
            }
            let block = t
                .pipeline
                .transform(df, &t.columns)
                .with_context(|| format!("Failed to apply '{}' pipeline", t.name))?;
            blocks.push(block);
        }

        if blocks.is_empty() {
            return Ok(Array2::zeros((df.height(), 0)));
        }
        let views: Vec<ArrayView2<'_, f64>> = blocks.iter().map(Array2::view).collect();
        concatenate(Axis(1), &views)
            .map_err(|e| PipelineError::DataProcessing(format!("Failed to join blocks: {e}")))
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Output column names, in output order.
    pub fn feature_names(&self) -> Vec<String> {
        self.transformers
            .iter()
            .flat_map(|t| t.pipeline.feature_names(&t.columns))
            .collect()
    }

    pub fn n_features_out(&self) -> usize {
        self.feature_names().len()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        io::save_object(self, path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        io::load_object(path)
    }
}

fn numeric_block(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let mut block = Array2::from_elem((df.height(), columns.len()), f64::NAN);

    for (j, name) in columns.iter().enumerate() {
        let series = df.column(name)?.as_materialized_series();
        if matches!(series.dtype(), DataType::String) {
            return Err(PipelineError::SchemaMismatch(format!(
                "column '{name}' is text but is listed as numeric"
            )));
        }

        let values = series.cast(&DataType::Float64)?;
        for (i, value) in values.f64()?.into_iter().enumerate() {
            if let Some(value) = value {
                block[[i, j]] = value;
            }
        }
    }

    Ok(block)
}

fn text_block(df: &DataFrame, columns: &[String]) -> Result<Array2<Option<String>>> {
    let mut block = Array2::from_elem((df.height(), columns.len()), None);

    for (j, name) in columns.iter().enumerate() {
        let values = df
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        for (i, value) in values.str()?.into_iter().enumerate() {
            block[[i, j]] = value.map(str::to_owned);
        }
    }

    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> ColumnGroups {
        let v = |names: &[&str]| names.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>();
        ColumnGroups {
            numerical: v(&["Age", "NumberOfTrips", "MonthlyIncome"]),
            discrete: v(&["NumberOfTrips"]),
            continuous: v(&["Age"]),
            categorical: v(&["Gender"]),
            power_transform: v(&["MonthlyIncome"]),
        }
    }

    fn train_frame() -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Column::from(Series::new(
                "Age".into(),
                &[Some(30.0), Some(45.0), None, Some(28.0), Some(52.0)],
            )),
            Column::from(Series::new(
                "NumberOfTrips".into(),
                &[Some(2i64), Some(2), Some(5), None, Some(1)],
            )),
            Column::from(Series::new(
                "Gender".into(),
                &[Some("Male"), Some("Female"), None, Some("Male"), Some("Female")],
            )),
            Column::from(Series::new(
                "MonthlyIncome".into(),
                &[20_000.0, 35_000.0, 18_500.0, 24_000.0, 90_000.0],
            )),
            Column::from(Series::new("Unused".into(), &[1i64, 2, 3, 4, 5])),
        ])?)
    }

    fn test_frame() -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Column::from(Series::new("Age".into(), &[61.0, 19.0])),
            Column::from(Series::new("NumberOfTrips".into(), &[7i64, 3])),
            Column::from(Series::new("Gender".into(), &["Female", "Male"])),
            Column::from(Series::new("MonthlyIncome".into(), &[150_000.0, 1_000.0])),
            Column::from(Series::new("Unused".into(), &[9i64, 9])),
        ])?)
    }

    #[test]
    fn test_output_layout_and_names() -> Result<()> {
        let mut preprocessor = ColumnPreprocessor::from_groups(&groups());
        let out = preprocessor.fit_transform(&train_frame()?)?;

        assert_eq!(
            preprocessor.feature_names(),
            ["NumberOfTrips", "Age", "Gender_Female", "Gender_Male", "MonthlyIncome"]
        );
        assert_eq!(out.dim(), (5, 5));
        assert!(out.iter().all(|v| v.is_finite()));
        Ok(())
    }

    #[test]
    fn test_transform_is_deterministic() -> Result<()> {
        let mut preprocessor = ColumnPreprocessor::from_groups(&groups());
        preprocessor.fit(&train_frame()?)?;

        let test = test_frame()?;
        let first = preprocessor.transform(&test)?;
        let second = preprocessor.transform(&test)?;
        assert_eq!(
            first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            second.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
        Ok(())
    }

    #[test]
    fn test_transform_never_refits() -> Result<()> {
        let mut preprocessor = ColumnPreprocessor::from_groups(&groups());
        preprocessor.fit(&train_frame()?)?;
        let fitted = preprocessor.clone();

        let test = test_frame()?;
        let transformed = preprocessor.transform(&test)?;
        assert_eq!(preprocessor, fitted);

        let mut refit = ColumnPreprocessor::from_groups(&groups());
        let refit_out = refit.fit_transform(&test)?;
        assert_ne!(transformed, refit_out);
        Ok(())
    }

    #[test]
    fn test_unfitted_transform_fails() -> Result<()> {
        let preprocessor = ColumnPreprocessor::from_groups(&groups());
        assert!(preprocessor.transform(&train_frame()?).is_err());
        Ok(())
    }

    #[test]
    fn test_text_in_numeric_group_is_schema_mismatch() -> Result<()> {
        let mut g = groups();
        g.continuous = vec!["Gender".to_owned()];
        let mut preprocessor = ColumnPreprocessor::from_groups(&g);

        let err = preprocessor.fit(&train_frame()?).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch(_)), "{err}");
        Ok(())
    }

    #[test]
    fn test_save_load_round_trip() -> Result<()> {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("preprocessing").join("preprocessor.json");

        let mut preprocessor = ColumnPreprocessor::from_groups(&groups());
        preprocessor.fit(&train_frame()?)?;
        preprocessor.save(&path)?;

        let loaded = ColumnPreprocessor::load(&path)?;
        assert!(loaded.is_fitted());
        let test = test_frame()?;
        assert_eq!(loaded.transform(&test)?, preprocessor.transform(&test)?);
        Ok(())
    }
}
