//! Missing-value imputation for numeric and categorical blocks.

use super::{check_width, most_frequent};
use crate::error::{PipelineError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    Mean,
    MostFrequent,
}

/// Replaces `NaN` in each column with a statistic learned at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleImputer {
    pub strategy: ImputeStrategy,
    /// One fill value per fitted column
    pub statistics: Vec<f64>,
}

impl SimpleImputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            statistics: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let mut statistics = Vec::with_capacity(x.ncols());

        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            if observed.is_empty() {
                return Err(PipelineError::DataProcessing(format!(
                    "cannot impute column {j}: no observed values"
                )));
            }

            let fill = match self.strategy {
                ImputeStrategy::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
                ImputeStrategy::MostFrequent => {
                    most_frequent(observed, f64::total_cmp).unwrap_or(f64::NAN)
                }
            };
            statistics.push(fill);
        }

        self.statistics = statistics;
        Ok(())
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_width("SimpleImputer", self.statistics.len(), x.ncols())?;

        let mut out = x.clone();
        for (mut column, fill) in out.axis_iter_mut(Axis(1)).zip(&self.statistics) {
            column.mapv_inplace(|v| if v.is_nan() { *fill } else { v });
        }
        Ok(out)
    }
}

/// Most-frequent imputation for text columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryImputer {
    pub fill_values: Vec<String>,
}

impl CategoryImputer {
    pub fn fit(&mut self, x: &Array2<Option<String>>) -> Result<()> {
        let mut fill_values = Vec::with_capacity(x.ncols());

        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let observed: Vec<String> = column.iter().flatten().cloned().collect();
            let fill = most_frequent(observed, |a: &String, b: &String| a.cmp(b)).ok_or_else(
                || {
                    PipelineError::DataProcessing(format!(
                        "cannot impute column {j}: no observed values"
                    ))
                },
            )?;
            fill_values.push(fill);
        }

        self.fill_values = fill_values;
        Ok(())
    }

    pub fn transform(&self, x: &Array2<Option<String>>) -> Result<Array2<String>> {
        check_width("CategoryImputer", self.fill_values.len(), x.ncols())?;

        Ok(Array2::from_shape_fn(x.dim(), |(i, j)| {
            x[[i, j]]
                .clone()
                .unwrap_or_else(|| self.fill_values[j].clone())
        }))
    }
}
