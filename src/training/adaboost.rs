//! AdaBoost.R2 regression over shallow CART trees
//!
//! Each round fits a tree to a weighted bootstrap sample, scores every
//! training row by its relative loss and shifts weight toward the rows the
//! tree handled badly. Predictions are the weighted median over trees.

use super::decision_tree::DecisionTreeRegressor;
use super::models::{validate_prediction_input, validate_training_data, Regressor};
use crate::error::{EnergyError, Result};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-row loss applied to the normalized absolute error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoostLoss {
    Linear,
    Square,
    Exponential,
}

impl BoostLoss {
    fn apply(&self, normalized_error: f64) -> f64 {
        match self {
            BoostLoss::Linear => normalized_error,
            BoostLoss::Square => normalized_error * normalized_error,
            BoostLoss::Exponential => 1.0 - (-normalized_error).exp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub loss: BoostLoss,
    /// Depth of every base tree
    pub max_depth: usize,
    pub random_state: Option<u64>,
    estimators: Vec<DecisionTreeRegressor>,
    estimator_weights: Vec<f64>,
    n_features: usize,
}

impl Default for AdaBoostRegressor {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl AdaBoostRegressor {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            loss: BoostLoss::Linear,
            max_depth: 3,
            random_state: None,
            estimators: Vec::new(),
            estimator_weights: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_loss(mut self, loss: BoostLoss) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Trees kept after boosting stopped
    pub fn n_fitted_estimators(&self) -> usize {
        self.estimators.len()
    }

    pub fn estimator_weights(&self) -> &[f64] {
        &self.estimator_weights
    }
}

/// Draw `n` row indices with replacement, proportional to `weights`
/// (which sum to 1)
fn weighted_bootstrap(weights: &[f64], rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut cdf = Vec::with_capacity(weights.len());
    let mut acc = 0.0;
    for w in weights {
        acc += w;
        cdf.push(acc);
    }
    let last = weights.len() - 1;
    (0..weights.len())
        .map(|_| {
            let u: f64 = rng.gen::<f64>() * acc;
            cdf.partition_point(|c| *c <= u).min(last)
        })
        .collect()
}

/// Prediction whose cumulative weight first reaches half the total
fn weighted_median(values: &mut [(f64, f64)]) -> f64 {
    values.sort_by(|a, b| a.0.total_cmp(&b.0));
    let total: f64 = values.iter().map(|(_, w)| w).sum();
    let mut acc = 0.0;
    for (value, weight) in values.iter() {
        acc += weight;
        if acc >= 0.5 * total {
            return *value;
        }
    }
    values.last().map_or(0.0, |(v, _)| *v)
}

impl Regressor for AdaBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        validate_training_data(x, y)?;
        if self.n_estimators == 0 || !(self.learning_rate > 0.0) {
            return Err(EnergyError::InvalidParameter {
                name: "n_estimators/learning_rate".to_string(),
                value: format!("{}/{}", self.n_estimators, self.learning_rate),
                reason: "both must be positive".to_string(),
            });
        }

        let n = x.nrows();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut sample_weight = vec![1.0 / n as f64; n];
        let mut estimators = Vec::new();
        let mut weights = Vec::new();

        for round in 0..self.n_estimators {
            let indices = weighted_bootstrap(&sample_weight, &mut rng);
            let mut tree = DecisionTreeRegressor::new().with_max_depth(self.max_depth);
            let mut tree_rng = ChaCha8Rng::seed_from_u64(rng.gen());
            tree.fit_indices(x, y, indices, &mut tree_rng);

            let predictions = tree.predict_unchecked(x);
            let mut errors: Vec<f64> = predictions.iter().zip(y.iter()).map(|(p, t)| (p - t).abs()).collect();

            let error_max = errors
                .iter()
                .zip(&sample_weight)
                .filter(|(_, w)| **w > 0.0)
                .fold(0.0f64, |m, (e, _)| m.max(*e));
            for e in errors.iter_mut() {
                if error_max > 0.0 {
                    *e /= error_max;
                }
                *e = self.loss.apply(*e);
            }

            let estimator_error: f64 = errors.iter().zip(&sample_weight).map(|(e, w)| e * w).sum();

            if estimator_error <= 0.0 {
                // perfect fit
                estimators.push(tree);
                weights.push(1.0);
                break;
            }
            if estimator_error >= 0.5 {
                // no better than chance; keep it only if nothing else exists
                if estimators.is_empty() {
                    estimators.push(tree);
                    weights.push(1.0);
                }
                debug!(round, estimator_error, "boosting stopped early");
                break;
            }

            let beta = estimator_error / (1.0 - estimator_error);
            estimators.push(tree);
            weights.push(self.learning_rate * (1.0 / beta).ln());

            if round + 1 < self.n_estimators {
                for (w, e) in sample_weight.iter_mut().zip(&errors) {
                    *w *= beta.powf((1.0 - e) * self.learning_rate);
                }
                let total: f64 = sample_weight.iter().sum();
                if !(total > 0.0) {
                    break;
                }
                for w in sample_weight.iter_mut() {
                    *w /= total;
                }
            }
        }

        debug!(estimators = estimators.len(), "adaboost fitted");
        self.estimators = estimators;
        self.estimator_weights = weights;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.estimators.is_empty() {
            return Err(EnergyError::ModelNotFitted);
        }
        validate_prediction_input(x, self.n_features)?;

        let per_tree: Vec<Array1<f64>> = self
            .estimators
            .par_iter()
            .map(|tree| tree.predict_unchecked(x))
            .collect();

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|row| {
                let mut values: Vec<(f64, f64)> = per_tree
                    .iter()
                    .zip(&self.estimator_weights)
                    .map(|(p, w)| (p[row], *w))
                    .collect();
                weighted_median(&mut values)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn is_fitted(&self) -> bool {
        !self.estimators.is_empty()
    }
}
