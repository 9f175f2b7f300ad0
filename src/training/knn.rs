//! K-nearest-neighbors regression

use super::models::{validate_prediction_input, validate_training_data, Regressor};
use crate::error::{EnergyError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Distance metric for neighbor search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
}

/// How neighbor targets are combined
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightFunction {
    /// Plain mean of the k targets
    Uniform,
    /// Inverse-distance weighted mean; exact matches take precedence
    Distance,
}

/// (distance, training row) ordered by distance, then row index
#[derive(Debug, Clone, Copy)]
struct Neighbor(f64, usize);

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Neighbor {}
impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNRegressor {
    pub n_neighbors: usize,
    pub weights: WeightFunction,
    pub metric: DistanceMetric,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl Default for KNNRegressor {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KNNRegressor {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            weights: WeightFunction::Uniform,
            metric: DistanceMetric::Euclidean,
            x_train: None,
            y_train: None,
        }
    }

    pub fn with_weights(mut self, weights: WeightFunction) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    fn predict_point(&self, point: ArrayView1<f64>, x_train: &Array2<f64>, y_train: &Array1<f64>) -> f64 {
        let neighbors = find_k_nearest(point, x_train, self.n_neighbors, self.metric);

        match self.weights {
            WeightFunction::Uniform => {
                neighbors.iter().map(|n| y_train[n.1]).sum::<f64>() / neighbors.len() as f64
            }
            WeightFunction::Distance => {
                let exact: Vec<f64> = neighbors.iter().filter(|n| n.0 == 0.0).map(|n| y_train[n.1]).collect();
                if !exact.is_empty() {
                    return exact.iter().sum::<f64>() / exact.len() as f64;
                }
                let (weighted, total) = neighbors.iter().fold((0.0, 0.0), |(s, w), n| {
                    let weight = 1.0 / n.0;
                    (s + weight * y_train[n.1], w + weight)
                });
                weighted / total
            }
        }
    }
}

/// k nearest training rows using a bounded max-heap, closest first
fn find_k_nearest(
    point: ArrayView1<f64>,
    x_train: &Array2<f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<Neighbor> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (i, row) in x_train.rows().into_iter().enumerate() {
        let candidate = Neighbor(compute_distance(point, row, metric), i);
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(top) = heap.peek() {
            if candidate < *top {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    heap.into_sorted_vec()
}

fn compute_distance(a: ArrayView1<f64>, b: ArrayView1<f64>, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b.iter())
            .map(|(ai, bi)| {
                let d = ai - bi;
                d * d
            })
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).abs()).sum(),
    }
}

impl Regressor for KNNRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        validate_training_data(x, y)?;
        if self.n_neighbors == 0 || self.n_neighbors > x.nrows() {
            return Err(EnergyError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: self.n_neighbors.to_string(),
                reason: format!("must be between 1 and the {} training rows", x.nrows()),
            });
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x_train), Some(y_train)) => (x_train, y_train),
            _ => return Err(EnergyError::ModelNotFitted),
        };
        validate_prediction_input(x, x_train.ncols())?;

        let rows: Vec<ArrayView1<f64>> = x.rows().into_iter().collect();
        let predictions: Vec<f64> = rows
            .par_iter()
            .map(|row| self.predict_point(*row, x_train, y_train))
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn is_fitted(&self) -> bool {
        self.x_train.is_some()
    }
}
