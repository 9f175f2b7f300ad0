//! Random forest regression and the averaging tree ensemble it shares with
//! extra trees

use super::decision_tree::{DecisionTreeRegressor, Splitter};
use super::models::{validate_prediction_input, validate_training_data, Regressor};
use crate::error::{EnergyError, Result};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Independently grown trees whose predictions are averaged.
/// Tree `i` is seeded with `random_state + i`, so results do not depend on
/// the number of worker threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TreeEnsemble {
    trees: Vec<DecisionTreeRegressor>,
    n_features: usize,
}

impl TreeEnsemble {
    pub(crate) fn fit(
        template: &DecisionTreeRegressor,
        n_estimators: usize,
        bootstrap: bool,
        random_state: u64,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<Self> {
        validate_training_data(x, y)?;
        if n_estimators == 0 {
            return Err(EnergyError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        let n_samples = x.nrows();

        let trees: Vec<DecisionTreeRegressor> = (0..n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = random_state.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let indices: Vec<usize> = if bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = template.clone();
                tree.fit_indices(x, y, indices, &mut rng);
                tree
            })
            .collect();

        Ok(Self {
            trees,
            n_features: x.ncols(),
        })
    }

    pub(crate) fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        validate_prediction_input(x, self.n_features)?;

        let per_tree: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_unchecked(x))
            .collect();
        // summed in tree order so results do not depend on thread scheduling
        let sum = per_tree
            .iter()
            .fold(Array1::zeros(x.nrows()), |acc, p| acc + p);

        Ok(sum / self.trees.len() as f64)
    }

    pub(crate) fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Random forest regressor: bootstrap samples, best splits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` uses all
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub random_state: Option<u64>,
    ensemble: Option<TreeEnsemble>,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            random_state: None,
            ensemble: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.ensemble.as_ref().map_or(0, TreeEnsemble::n_trees)
    }

    fn template(&self) -> DecisionTreeRegressor {
        let mut tree = DecisionTreeRegressor::new()
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_splitter(Splitter::Best);
        tree.max_depth = self.max_depth;
        tree.max_features = self.max_features;
        tree
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let ensemble = TreeEnsemble::fit(
            &self.template(),
            self.n_estimators,
            self.bootstrap,
            self.random_state.unwrap_or(42),
            x,
            y,
        )?;
        self.ensemble = Some(ensemble);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.ensemble
            .as_ref()
            .ok_or(EnergyError::ModelNotFitted)?
            .predict(x)
    }

    fn is_fitted(&self) -> bool {
        self.ensemble.is_some()
    }
}
