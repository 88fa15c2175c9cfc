//! Seeded random-forest regression with permutation importance.
//!
//! `smartcore` does not expose feature importances for its forests, so
//! importance is measured the model-agnostic way: permute one column, watch
//! how much worse the predictions get. All shuffles are driven by a ChaCha
//! stream cipher RNG, so the same seed always yields the same importances.

use crate::error::AnalyticsError;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

/// A fitted forest plus the training data it was fitted on.
pub struct ForestFit {
    model: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    rows: Vec<Vec<f64>>,
    target: Vec<f64>,
    base_mse: f64,
}

/// Fits a seeded regression forest on column-major data.
pub fn fit_forest(
    columns: &[&[f64]],
    target: &[f64],
    trees: u16,
    max_depth: u16,
    seed: u64,
) -> Result<ForestFit, AnalyticsError> {
    if columns.is_empty() || target.len() < 4 {
        return Err(AnalyticsError::NotEnoughData(
            "forest fit needs at least one column and 4 rows".to_string(),
        ));
    }
    let n_rows = target.len();
    let mut rows = Vec::with_capacity(n_rows);
    for i in 0..n_rows {
        rows.push(columns.iter().map(|c| c[i]).collect::<Vec<f64>>());
    }

    let x = DenseMatrix::from_2d_vec(&rows)
        .map_err(|e| AnalyticsError::Model(format!("failed to build design matrix: {e}")))?;
    let y = target.to_vec();

    let params = RandomForestRegressorParameters::default()
        .with_n_trees(trees.into())
        .with_max_depth(max_depth)
        .with_min_samples_leaf(2)
        .with_seed(seed);

    let model = RandomForestRegressor::fit(&x, &y, params)
        .map_err(|e| AnalyticsError::Model(format!("forest fit failed: {e}")))?;

    let predictions = model
        .predict(&x)
        .map_err(|e| AnalyticsError::Model(format!("forest predict failed: {e}")))?;
    let base_mse = mse(&predictions, &y);

    Ok(ForestFit {
        model,
        rows,
        target: y,
        base_mse,
    })
}

impl ForestFit {
    /// Training-window mean squared error of the fitted model.
    pub fn mse(&self) -> f64 {
        self.base_mse
    }

    /// Permutation importance per column: the MSE increase caused by
    /// shuffling that column, floored at zero. Column `i` is shuffled with a
    /// sub-seed derived from `seed + i`, keeping columns independent and the
    /// whole computation reproducible.
    pub fn permutation_importance(&self, seed: u64) -> Result<Vec<f64>, AnalyticsError> {
        let n_cols = self.rows[0].len();
        let mut importances = Vec::with_capacity(n_cols);

        for col in 0..n_cols {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(col as u64));
            let mut order: Vec<usize> = (0..self.rows.len()).collect();
            order.shuffle(&mut rng);

            let mut permuted = self.rows.clone();
            for (i, &src) in order.iter().enumerate() {
                permuted[i][col] = self.rows[src][col];
            }

            let x = DenseMatrix::from_2d_vec(&permuted).map_err(|e| {
                AnalyticsError::Model(format!("failed to build permuted matrix: {e}"))
            })?;
            let predictions = self
                .model
                .predict(&x)
                .map_err(|e| AnalyticsError::Model(format!("forest predict failed: {e}")))?;
            let permuted_mse = mse(&predictions, &self.target);
            importances.push((permuted_mse - self.base_mse).max(0.0));
        }

        Ok(importances)
    }
}

fn mse(predictions: &[f64], target: &[f64]) -> f64 {
    predictions
        .iter()
        .zip(target)
        .map(|(p, y)| {
            let e = p - y;
            e * e
        })
        .sum::<f64>()
        / target.len().max(1) as f64
}
