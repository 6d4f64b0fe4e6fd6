//! Column-group preprocessing: imputation, scaling, one-hot encoding and
//! power transforms, combined into a single fitted [`ColumnPreprocessor`].
//!
//! # Overview
//!
//! Each schema column group gets its own pipeline:
//! - **discrete**: most-frequent imputation, standard scaling
//! - **continuous**: mean imputation, standard scaling
//! - **categorical**: most-frequent imputation, one-hot encoding, scaling
//!   without centering
//! - **power**: mean imputation, Yeo-Johnson transform (standardized)
//!
//! Numeric blocks are `Array2<f64>` with `NaN` marking a missing value.
//! Categorical blocks are `Array2<Option<String>>`.
//!
//! Fitted parameters are plain `Vec<f64>`/`Vec<String>` so the preprocessor
//! serializes to readable JSON and reloads bit-identically.

pub mod composite;
pub mod encoder;
pub mod imputer;
pub mod power;
pub mod scaler;

pub use composite::{ColumnPreprocessor, ColumnTransformer, GroupPipeline};
pub use encoder::OneHotEncoder;
pub use imputer::{CategoryImputer, ImputeStrategy, SimpleImputer};
pub use power::PowerTransformer;
pub use scaler::StandardScaler;

use crate::error::{PipelineError, Result};
use std::cmp::Ordering;

/// Fail unless a block has the column count a component was fitted with.
pub(crate) fn check_width(component: &str, fitted: usize, got: usize) -> Result<()> {
    if fitted == got {
        Ok(())
    } else {
        Err(PipelineError::DataProcessing(format!(
            "{component} was fitted on {fitted} columns but got {got}"
        )))
    }
}

/// Most frequent value; ties resolve to the smallest value under `cmp`.
pub(crate) fn most_frequent<T, F>(mut values: Vec<T>, cmp: F) -> Option<T>
where
    T: Clone,
    F: Fn(&T, &T) -> Ordering,
{
    values.sort_by(&cmp);

    let mut best: Option<(&T, usize)> = None;
    let mut run_start = 0;
    for i in 1..=values.len() {
        if i == values.len() || cmp(&values[i], &values[run_start]) != Ordering::Equal {
            let run = i - run_start;
            if best.is_none_or(|(_, count)| run > count) {
                best = Some((&values[run_start], run));
            }
            run_start = i;
        }
    }

    best.map(|(value, _)| value.clone())
}
