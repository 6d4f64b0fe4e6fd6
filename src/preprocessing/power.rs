//! Yeo-Johnson power transform.
//!
//! One lambda per column is chosen by maximizing the Yeo-Johnson
//! log-likelihood with a golden-section search over `[-5, 5]`. Output is then
//! standardized unless `standardize` is off.

use super::check_width;
use super::scaler::StandardScaler;
use crate::error::Result;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

const LAMBDA_BOUNDS: (f64, f64) = (-5.0, 5.0);
const SEARCH_TOLERANCE: f64 = 1e-8;
const MAX_SEARCH_ITERATIONS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerTransformer {
    pub standardize: bool,
    pub lambdas: Vec<f64>,
    pub scaler: Option<StandardScaler>,
}

impl Default for PowerTransformer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PowerTransformer {
    pub fn new(standardize: bool) -> Self {
        Self {
            standardize,
            lambdas: Vec::new(),
            scaler: None,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        self.lambdas = x.axis_iter(Axis(1)).map(optimal_lambda).collect();

        self.scaler = if self.standardize {
            let mut scaler = StandardScaler::new(true);
            scaler.fit(&apply(x, &self.lambdas))?;
            Some(scaler)
        } else {
            None
        };
        Ok(())
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_width("PowerTransformer", self.lambdas.len(), x.ncols())?;

        let out = apply(x, &self.lambdas);
        match &self.scaler {
            Some(scaler) => scaler.transform(&out),
            None => Ok(out),
        }
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

fn apply(x: &Array2<f64>, lambdas: &[f64]) -> Array2<f64> {
    let mut out = x.clone();
    for (mut column, &lambda) in out.axis_iter_mut(Axis(1)).zip(lambdas) {
        column.mapv_inplace(|v| yeo_johnson(v, lambda));
    }
    out
}

pub fn yeo_johnson(x: f64, lambda: f64) -> f64 {
    const EPS: f64 = 1e-12;
    if x >= 0.0 {
        if lambda.abs() < EPS {
            x.ln_1p()
        } else {
            ((x + 1.0).powf(lambda) - 1.0) / lambda
        }
    } else if (lambda - 2.0).abs() < EPS {
        -(-x).ln_1p()
    } else {
        -((1.0 - x).powf(2.0 - lambda) - 1.0) / (2.0 - lambda)
    }
}

/// Negative log-likelihood of `lambda` for one column.
fn neg_log_likelihood(column: ArrayView1<'_, f64>, lambda: f64) -> f64 {
    let n = column.len() as f64;
    let transformed: Vec<f64> = column.iter().map(|&v| yeo_johnson(v, lambda)).collect();
    let mean = transformed.iter().sum::<f64>() / n;
    let var = transformed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if !var.is_finite() || var < f64::MIN_POSITIVE {
        return f64::INFINITY;
    }

    let jacobian: f64 = column.iter().map(|v| v.signum() * v.abs().ln_1p()).sum();
    -(-n / 2.0 * var.ln() + (lambda - 1.0) * jacobian)
}

fn optimal_lambda(column: ArrayView1<'_, f64>) -> f64 {
    // A constant column has no likelihood to maximize.
    let first = column.first().copied();
    if column.iter().all(|&v| Some(v) == first) {
        return 1.0;
    }

    let inv_phi = (5f64.sqrt() - 1.0) / 2.0;
    let (mut a, mut b) = LAMBDA_BOUNDS;
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = neg_log_likelihood(column, c);
    let mut fd = neg_log_likelihood(column, d);

    for _ in 0..MAX_SEARCH_ITERATIONS {
        if (b - a).abs() < SEARCH_TOLERANCE {
            break;
        }
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = neg_log_likelihood(column, c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = neg_log_likelihood(column, d);
        }
    }

    (a + b) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_yeo_johnson_identity_at_lambda_one() {
        for v in [-3.5, -1.0, 0.0, 0.25, 12.0] {
            assert!((yeo_johnson(v, 1.0) - v).abs() < 1e-12);
        }
        assert!((yeo_johnson(1.0, 0.0) - 2f64.ln()).abs() < 1e-12);
        assert!((yeo_johnson(-1.0, 2.0) + 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_right_skewed_column_gets_lambda_below_one() -> Result<()> {
        let values: Vec<f64> = (0..200).map(|i| (f64::from(i) / 20.0).exp()).collect();
        let x = Array2::from_shape_vec((200, 1), values).expect("shape");

        let mut transformer = PowerTransformer::default();
        let out = transformer.fit_transform(&x)?;

        assert!(transformer.lambdas[0] < 1.0, "{:?}", transformer.lambdas);
        let mean = out.column(0).sum() / 200.0;
        assert!(mean.abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_constant_column() -> Result<()> {
        let x = Array2::from_elem((5, 1), 3.0);
        let mut transformer = PowerTransformer::default();
        let out = transformer.fit_transform(&x)?;
        assert_eq!(transformer.lambdas, vec![1.0]);
        assert!(out.iter().all(|v| *v == 0.0));
        Ok(())
    }
}
