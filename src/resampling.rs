//! Class rebalancing: SMOTE oversampling, edited-nearest-neighbours cleaning
//! and their combination [`SmoteEnn`].
//!
//! Neighbour search is brute-force Euclidean; ties are broken by row index so
//! results depend only on the input order and the seed.

use crate::error::{PipelineError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis, concatenate};
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};
use std::collections::BTreeMap;

pub const DEFAULT_K_NEIGHBORS: usize = 5;
pub const DEFAULT_ENN_NEIGHBORS: usize = 3;

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Indices of the `k` rows of `points` nearest to row `i`, excluding `i`.
fn nearest_neighbours(points: ArrayView2<'_, f64>, i: usize, k: usize) -> Vec<usize> {
    let sample = points.row(i);
    let mut distances: Vec<(usize, f64)> = points
        .rows()
        .into_iter()
        .enumerate()
        .filter(|(j, _)| *j != i)
        .map(|(j, row)| (j, squared_distance(sample, row)))
        .collect();

    distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    distances.into_iter().take(k).map(|(j, _)| j).collect()
}

/// Row indices per class label, classes in ascending order.
fn class_indices(y: &[i64]) -> BTreeMap<i64, Vec<usize>> {
    let mut classes: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, label) in y.iter().enumerate() {
        classes.entry(*label).or_default().push(i);
    }
    classes
}

fn check_input(x: &Array2<f64>, y: &[i64]) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(PipelineError::DataProcessing(format!(
            "feature rows ({}) and target length ({}) differ",
            x.nrows(),
            y.len()
        )));
    }
    Ok(())
}

/// Synthetic minority oversampling.
///
/// Only the minority class (smallest count, lowest label on ties) is grown,
/// up to the majority count. Other classes pass through unchanged. Each
/// synthetic row interpolates between a minority member and one of its
/// `k_neighbors` nearest same-class neighbours and is appended after the
/// original rows.
#[derive(Debug, Clone)]
pub struct Smote {
    pub k_neighbors: usize,
    pub seed: u64,
}

impl Smote {
    pub fn new(seed: u64) -> Self {
        Self {
            k_neighbors: DEFAULT_K_NEIGHBORS,
            seed,
        }
    }

    pub fn fit_resample(&self, x: &Array2<f64>, y: &[i64]) -> Result<(Array2<f64>, Vec<i64>)> {
        check_input(x, y)?;
        let classes = class_indices(y);
        if classes.len() < 2 {
            return Err(PipelineError::DataProcessing(format!(
                "oversampling needs at least two classes, found {}",
                classes.len()
            )));
        }

        let n_majority = classes.values().map(Vec::len).max().unwrap_or(0);
        let Some((&label, indices)) = classes.iter().min_by_key(|(_, indices)| indices.len())
        else {
            return Ok((x.clone(), y.to_vec()));
        };
        let n_samples = n_majority - indices.len();
        if n_samples == 0 {
            return Ok((x.clone(), y.to_vec()));
        }
        if indices.len() < 2 {
            return Err(PipelineError::DataProcessing(format!(
                "class {label} has {} sample(s); at least 2 are needed to oversample",
                indices.len()
            )));
        }

        let members = x.select(Axis(0), indices);
        let k = self.k_neighbors.min(indices.len() - 1);
        let neighbours: Vec<Vec<usize>> = (0..members.nrows())
            .map(|i| nearest_neighbours(members.view(), i, k))
            .collect();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut synthetic_rows: Vec<f64> = Vec::with_capacity(n_samples * x.ncols());
        for _ in 0..n_samples {
            let i = rng.gen_range(0..members.nrows());
            let nn = neighbours[i][rng.gen_range(0..k)];
            let gap: f64 = rng.r#gen();

            let (base, other) = (members.row(i), members.row(nn));
            synthetic_rows.extend(base.iter().zip(other.iter()).map(|(a, b)| a + gap * (b - a)));
        }
        tracing::debug!(class = label, n_samples, k, "Generated synthetic samples");

        let synthetic = Array2::from_shape_vec((n_samples, x.ncols()), synthetic_rows)
            .map_err(|e| PipelineError::DataProcessing(format!("synthetic rows: {e}")))?;
        let x_res = concatenate(Axis(0), &[x.view(), synthetic.view()])
            .map_err(|e| PipelineError::DataProcessing(format!("stacking samples: {e}")))?;

        let mut y_res = y.to_vec();
        y_res.extend(std::iter::repeat_n(label, n_samples));
        Ok((x_res, y_res))
    }
}

/// Edited nearest neighbours cleaning over all classes.
///
/// A sample is kept only when every one of its `n_neighbors` nearest
/// neighbours shares its label. Output rows are grouped by class in
/// ascending label order, original order within a class.
#[derive(Debug, Clone)]
pub struct EditedNearestNeighbours {
    pub n_neighbors: usize,
}

impl Default for EditedNearestNeighbours {
    fn default() -> Self {
        Self {
            n_neighbors: DEFAULT_ENN_NEIGHBORS,
        }
    }
}

impl EditedNearestNeighbours {
    pub fn fit_resample(&self, x: &Array2<f64>, y: &[i64]) -> Result<(Array2<f64>, Vec<i64>)> {
        check_input(x, y)?;
        let k = self.n_neighbors.min(x.nrows().saturating_sub(1));

        let mut keep = Vec::with_capacity(y.len());
        for indices in class_indices(y).values() {
            for &i in indices {
                let neighbours = nearest_neighbours(x.view(), i, k);
                if neighbours.iter().all(|&j| y[j] == y[i]) {
                    keep.push(i);
                }
            }
        }

        let x_res = x.select(Axis(0), &keep);
        let y_res = keep.iter().map(|&i| y[i]).collect();
        Ok((x_res, y_res))
    }
}

/// SMOTE oversampling followed by ENN cleaning.
#[derive(Debug, Clone)]
pub struct SmoteEnn {
    pub smote: Smote,
    pub enn: EditedNearestNeighbours,
}

impl SmoteEnn {
    pub fn new(seed: u64) -> Self {
        Self {
            smote: Smote::new(seed),
            enn: EditedNearestNeighbours::default(),
        }
    }

    pub fn fit_resample(&self, x: &Array2<f64>, y: &[i64]) -> Result<(Array2<f64>, Vec<i64>)> {
        let (x_over, y_over) = self.smote.fit_resample(x, y)?;
        let (x_res, y_res) = self.enn.fit_resample(&x_over, &y_over)?;

        tracing::info!(
            rows_before = x.nrows(),
            rows_oversampled = x_over.nrows(),
            rows_after = x_res.nrows(),
            "SMOTEENN resampling complete"
        );
        Ok((x_res, y_res))
    }
}
