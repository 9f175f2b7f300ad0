//! Epsilon-insensitive support vector regression
//!
//! The dual is solved by randomized coordinate descent. The bias is folded
//! into the kernel (`K + 1`), which removes the equality constraint of the
//! standard dual so every coordinate can be updated on its own.

use super::models::{validate_prediction_input, validate_training_data, Regressor};
use crate::error::{EnergyError, Result};
use ndarray::{Array1, Array2, ArrayView1, Zip};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Above this many rows the kernel matrix is not cached and kernel columns
/// are recomputed on every update.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 4_096;

/// Kernel function type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// K(x, y) = x · y
    Linear,
    /// K(x, y) = (γ x · y + r)^d
    Polynomial { degree: u32, coef0: f64 },
    /// K(x, y) = exp(-γ ||x - y||²)
    RBF,
    /// K(x, y) = tanh(γ x · y + r)
    Sigmoid { coef0: f64 },
}

/// Kernel coefficient γ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// 1 / (n_features · Var(X)), variance over every entry of X
    Scale,
    /// 1 / n_features
    Auto,
    Value(f64),
}

impl Gamma {
    fn resolve(&self, x: &Array2<f64>) -> f64 {
        match self {
            Gamma::Scale => {
                let var = x.var(0.0);
                if var > 0.0 {
                    1.0 / (x.ncols() as f64 * var)
                } else {
                    1.0
                }
            }
            Gamma::Auto => 1.0 / x.ncols() as f64,
            Gamma::Value(g) => *g,
        }
    }
}

fn kernel_value(kernel: &KernelType, gamma: f64, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    match kernel {
        KernelType::Linear => a.dot(&b),
        KernelType::Polynomial { degree, coef0 } => (gamma * a.dot(&b) + coef0).powi(*degree as i32),
        KernelType::RBF => {
            let dist_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
            (-gamma * dist_sq).exp()
        }
        KernelType::Sigmoid { coef0 } => (gamma * a.dot(&b) + coef0).tanh(),
    }
}

fn soft_threshold(val: f64, threshold: f64) -> f64 {
    if val > threshold {
        val - threshold
    } else if val < -threshold {
        val + threshold
    } else {
        0.0
    }
}

/// Fitted support set
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SupportSet {
    vectors: Array2<f64>,
    dual_coef: Array1<f64>,
    intercept: f64,
    gamma: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMRegressor {
    /// Box constraint on the dual coefficients
    pub c: f64,
    /// Half-width of the loss-free tube
    pub epsilon: f64,
    pub kernel: KernelType,
    pub gamma: Gamma,
    /// Stop once no coefficient moves by more than this in a sweep
    pub tol: f64,
    /// Maximum number of sweeps over the training rows
    pub max_iter: usize,
    pub random_state: Option<u64>,
    support: Option<SupportSet>,
    n_features: usize,
}

impl Default for SVMRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl SVMRegressor {
    pub fn new() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.1,
            kernel: KernelType::RBF,
            gamma: Gamma::Scale,
            tol: 1e-3,
            max_iter: 200,
            random_state: None,
            support: None,
            n_features: 0,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_kernel(mut self, kernel: KernelType) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_gamma(mut self, gamma: Gamma) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_support(&self) -> usize {
        self.support.as_ref().map_or(0, |s| s.dual_coef.len())
    }

    fn check_params(&self) -> Result<()> {
        if !(self.c > 0.0) {
            return Err(EnergyError::InvalidParameter {
                name: "c".to_string(),
                value: self.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !(self.epsilon >= 0.0) {
            return Err(EnergyError::InvalidParameter {
                name: "epsilon".to_string(),
                value: self.epsilon.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

impl Regressor for SVMRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        validate_training_data(x, y)?;
        self.check_params()?;

        let n = x.nrows();
        let gamma = self.gamma.resolve(x);
        let kernel = &self.kernel;
        let augmented = |i: usize, j: usize| kernel_value(kernel, gamma, x.row(i), x.row(j)) + 1.0;

        let matrix = if n <= MAX_KERNEL_MATRIX_SAMPLES {
            let rows: Vec<f64> = (0..n)
                .into_par_iter()
                .flat_map_iter(|i| (0..n).map(move |j| augmented(i, j)))
                .collect();
            Some(Array2::from_shape_vec((n, n), rows)?)
        } else {
            None
        };
        let diag: Vec<f64> = (0..n).map(|i| augmented(i, i)).collect();

        // grad = K̃β - y
        let mut beta: Array1<f64> = Array1::zeros(n);
        let mut grad: Array1<f64> = -y;
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.random_state.unwrap_or(0));

        let mut sweeps = 0;
        let mut converged = false;
        while sweeps < self.max_iter {
            sweeps += 1;
            order.shuffle(&mut rng);
            let mut max_delta = 0.0f64;

            for &i in &order {
                let kii = diag[i];
                let updated =
                    (soft_threshold(kii * beta[i] - grad[i], self.epsilon) / kii).clamp(-self.c, self.c);
                let delta = updated - beta[i];
                if delta == 0.0 {
                    continue;
                }
                beta[i] = updated;
                max_delta = max_delta.max(delta.abs());

                match &matrix {
                    Some(m) => grad.scaled_add(delta, &m.row(i)),
                    None => Zip::indexed(&mut grad).par_for_each(|j, g| *g += delta * augmented(i, j)),
                }
            }

            if max_delta < self.tol {
                converged = true;
                break;
            }
        }
        debug!(sweeps, converged, gamma, "support vector regression fitted");

        let support_idx: Vec<usize> = (0..n).filter(|&i| beta[i] != 0.0).collect();
        self.support = Some(SupportSet {
            vectors: x.select(ndarray::Axis(0), &support_idx),
            dual_coef: support_idx.iter().map(|&i| beta[i]).collect(),
            intercept: beta.sum(),
            gamma,
        });
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let support = self.support.as_ref().ok_or(EnergyError::ModelNotFitted)?;
        validate_prediction_input(x, self.n_features)?;

        let rows: Vec<ArrayView1<f64>> = x.rows().into_iter().collect();
        let predictions: Vec<f64> = rows
            .par_iter()
            .map(|row| {
                support
                    .vectors
                    .rows()
                    .into_iter()
                    .zip(support.dual_coef.iter())
                    .map(|(sv, coef)| coef * kernel_value(&self.kernel, support.gamma, sv, *row))
                    .sum::<f64>()
                    + support.intercept
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn is_fitted(&self) -> bool {
        self.support.is_some()
    }
}
