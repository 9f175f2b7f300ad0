//! CART regression tree shared by the forest and boosting ensembles

use super::models::{validate_prediction_input, validate_training_data, Regressor};
use crate::error::{EnergyError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with the mean target of its samples
    Leaf { value: f64, n_samples: usize },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// Threshold search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Splitter {
    /// Exhaustive search over midpoints of sorted feature values
    Best,
    /// One uniform random threshold per candidate feature
    Random,
}

/// Regression tree minimizing squared error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` uses all
    pub max_features: Option<usize>,
    pub splitter: Splitter,
    pub random_state: Option<u64>,
    n_features: usize,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            splitter: Splitter::Best,
            random_state: None,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_splitter(mut self, splitter: Splitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Grow the tree on the rows named by `indices` (repeats allowed, as
    /// produced by bootstrap sampling). Inputs must already be validated.
    pub(crate) fn fit_indices(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        rng: &mut ChaCha8Rng,
    ) {
        self.n_features = x.ncols();
        self.root = Some(self.build(x, y, indices, 0, rng));
    }

    /// Predict without re-validating shape; callers check the width once
    pub(crate) fn predict_unchecked(&self, x: &Array2<f64>) -> Array1<f64> {
        match &self.root {
            Some(root) => x.rows().into_iter().map(|row| root.predict_row(row)).collect(),
            None => Array1::zeros(x.nrows()),
        }
    }

    fn build(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let total: f64 = indices.iter().map(|&i| y[i]).sum();
        let leaf = TreeNode::Leaf {
            value: total / n_samples.max(1) as f64,
            n_samples,
        };

        let first = indices.first().map(|&i| y[i]);
        let is_pure = indices.iter().all(|&i| Some(y[i]) == first);
        let should_stop = n_samples < self.min_samples_split.max(2)
            || n_samples < 2 * self.min_samples_leaf.max(1)
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure;
        if should_stop {
            return leaf;
        }

        let Some((feature_idx, threshold)) = self.find_split(x, y, &indices, total, rng) else {
            return leaf;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[[i, feature_idx]] <= threshold);

        let left = Box::new(self.build(x, y, left_idx, depth + 1, rng));
        let right = Box::new(self.build(x, y, right_idx, depth + 1, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
        }
    }

    /// Best (feature, threshold) by squared-error reduction, if any split
    /// improves on the parent
    fn find_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        total: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64)> {
        let n_features = x.ncols();
        let n_candidates = self.max_features.unwrap_or(n_features).clamp(1, n_features);
        let features: Vec<usize> = if n_candidates < n_features {
            sample(rng, n_features, n_candidates).into_vec()
        } else {
            (0..n_features).collect()
        };

        // SSE = sum(y^2) - sum^2/n, so maximizing sum_l^2/n_l + sum_r^2/n_r
        // minimizes the children's squared error
        let parent_score = total * total / indices.len() as f64;
        let tolerance = 1e-12 * parent_score.abs().max(1.0);

        let mut best: Option<(usize, f64, f64)> = None;
        for feature_idx in features {
            let candidate = match self.splitter {
                Splitter::Best => self.best_threshold(x, y, indices, feature_idx, total),
                Splitter::Random => self.random_threshold(x, y, indices, feature_idx, total, rng),
            };
            if let Some((threshold, score)) = candidate {
                if score - parent_score > tolerance && best.map_or(true, |(_, _, s)| score > s) {
                    best = Some((feature_idx, threshold, score));
                }
            }
        }

        best.map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }

    fn best_threshold(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
        total: f64,
    ) -> Option<(f64, f64)> {
        let mut pairs: Vec<(f64, f64)> = indices.iter().map(|&i| (x[[i, feature_idx]], y[i])).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = pairs.len();
        let min_leaf = self.min_samples_leaf.max(1);
        let mut left_sum = 0.0;
        let mut best: Option<(f64, f64)> = None;

        for i in 0..n - 1 {
            left_sum += pairs[i].1;
            let (current, next) = (pairs[i].0, pairs[i + 1].0);
            if current == next {
                continue;
            }
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
            if best.map_or(true, |(_, s)| score > s) {
                let mut threshold = (current + next) / 2.0;
                // adjacent floats: the midpoint may round up to `next`
                if threshold >= next {
                    threshold = current;
                }
                best = Some((threshold, score));
            }
        }

        best
    }

    fn random_threshold(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
        total: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<(f64, f64)> {
        let (lo, hi) = indices
            .iter()
            .map(|&i| x[[i, feature_idx]])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !(hi > lo) {
            return None;
        }

        let threshold = rng.gen_range(lo..hi);
        let (n_left, left_sum) = indices
            .iter()
            .filter(|&&i| x[[i, feature_idx]] <= threshold)
            .fold((0usize, 0.0), |(n, s), &i| (n + 1, s + y[i]));
        let n_right = indices.len() - n_left;

        let min_leaf = self.min_samples_leaf.max(1);
        if n_left < min_leaf || n_right < min_leaf {
            return None;
        }

        let right_sum = total - left_sum;
        let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
        Some((threshold, score))
    }
}

impl Regressor for DecisionTreeRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        validate_training_data(x, y)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        self.fit_indices(x, y, (0..x.nrows()).collect(), &mut rng);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.root.is_none() {
            return Err(EnergyError::ModelNotFitted);
        }
        validate_prediction_input(x, self.n_features)?;
        Ok(self.predict_unchecked(x))
    }

    fn is_fitted(&self) -> bool {
        self.root.is_some()
    }
}
