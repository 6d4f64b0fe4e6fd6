use super::check_width;
use crate::error::{PipelineError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Standardizes columns to zero mean and unit (population) variance.
///
/// With `with_mean = false` columns are only divided by their standard
/// deviation, which keeps zeros at zero for one-hot output. A constant
/// column gets a scale of 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub with_mean: bool,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl StandardScaler {
    pub fn new(with_mean: bool) -> Self {
        Self {
            with_mean,
            mean: Vec::new(),
            scale: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(PipelineError::DataProcessing(
                "StandardScaler cannot be fitted on zero rows".to_owned(),
            ));
        }

        let mut mean = Vec::with_capacity(x.ncols());
        let mut scale = Vec::with_capacity(x.ncols());
        for column in x.axis_iter(Axis(1)) {
            let mu = column.sum() / column.len() as f64;
            let var = column.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / column.len() as f64;
            let std = var.sqrt();

            mean.push(mu);
            scale.push(if std > f64::EPSILON * mu.abs().max(1.0) * 10.0 {
                std
            } else {
                1.0
            });
        }

        self.mean = mean;
        self.scale = scale;
        Ok(())
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_width("StandardScaler", self.scale.len(), x.ncols())?;

        let mut out = x.clone();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (mu, sigma) = (self.mean[j], self.scale[j]);
            if self.with_mean {
                column.mapv_inplace(|v| (v - mu) / sigma);
            } else {
                column.mapv_inplace(|v| v / sigma);
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standardizes_to_unit_variance() -> Result<()> {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]];
        let mut scaler = StandardScaler::new(true);
        let out = scaler.fit_transform(&x)?;

        let col = out.column(0);
        assert!((col.sum()).abs() < 1e-12);
        let var = col.iter().map(|v| v * v).sum::<f64>() / 3.0;
        assert!((var - 1.0).abs() < 1e-12);

        // constant column: centred, scale 1
        assert_eq!(scaler.scale[1], 1.0);
        assert_eq!(out.column(1).to_vec(), vec![0.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_without_centering_keeps_zeros() -> Result<()> {
        let x = array![[0.0], [1.0], [0.0], [1.0]];
        let mut scaler = StandardScaler::new(false);
        let out = scaler.fit_transform(&x)?;

        assert_eq!(out[[0, 0]], 0.0);
        assert!((out[[1, 0]] - 2.0).abs() < 1e-12);
        Ok(())
    }
}
