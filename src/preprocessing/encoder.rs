use super::check_width;
use crate::error::{PipelineError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoding with categories learned (and sorted) at fit time.
///
/// A category not seen during fit is rejected at transform time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit(&mut self, x: &Array2<String>) -> Result<()> {
        self.categories = x
            .axis_iter(Axis(1))
            .map(|column| {
                column
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .collect();
        Ok(())
    }

    pub fn n_features_out(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn transform(&self, x: &Array2<String>) -> Result<Array2<f64>> {
        check_width("OneHotEncoder", self.categories.len(), x.ncols())?;

        let mut out = Array2::<f64>::zeros((x.nrows(), self.n_features_out()));
        let mut offset = 0;
        for (j, categories) in self.categories.iter().enumerate() {
            for (i, value) in x.column(j).iter().enumerate() {
                let k = categories.binary_search(value).map_err(|_| {
                    PipelineError::DataProcessing(format!(
                        "unknown category '{value}' in encoded column {j}"
                    ))
                })?;
                out[[i, offset + k]] = 1.0;
            }
            offset += categories.len();
        }
        Ok(out)
    }

    /// Output names `<column>_<category>` for the given input column names.
    pub fn feature_names(&self, input_names: &[String]) -> Vec<String> {
        input_names
            .iter()
            .zip(&self.categories)
            .flat_map(|(name, categories)| {
                categories.iter().map(move |category| format!("{name}_{category}"))
            })
            .collect()
    }
}
