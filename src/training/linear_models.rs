//! Elastic net linear regression

use super::models::{validate_prediction_input, validate_training_data, Regressor};
use crate::error::{EnergyError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Soft-threshold operator for the L1 proximal step
fn soft_threshold(val: f64, threshold: f64) -> f64 {
    if val > threshold {
        val - threshold
    } else if val < -threshold {
        val + threshold
    } else {
        0.0
    }
}

/// Linear regression with combined L1/L2 penalty, fit by cyclic coordinate
/// descent on
/// `1/(2n) ||y - Xw - b||^2 + alpha * l1_ratio * ||w||_1 + alpha * (1 - l1_ratio) / 2 * ||w||^2`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticNetRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    pub fit_intercept: bool,
    /// Overall regularization strength
    pub alpha: f64,
    /// L1 ratio (0.0 = pure L2/Ridge, 1.0 = pure L1/Lasso)
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tol: f64,
    n_iter: usize,
}

impl Default for ElasticNetRegression {
    fn default() -> Self {
        Self::new(1.0, 0.5)
    }
}

impl ElasticNetRegression {
    pub fn new(alpha: f64, l1_ratio: f64) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
            alpha,
            l1_ratio: l1_ratio.clamp(0.0, 1.0),
            max_iter: 1000,
            tol: 1e-4,
            n_iter: 0,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_l1_ratio(mut self, l1_ratio: f64) -> Self {
        self.l1_ratio = l1_ratio.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Coordinate-descent sweeps used by the last fit
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}

impl Regressor for ElasticNetRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        validate_training_data(x, y)?;
        if !(self.alpha >= 0.0) {
            return Err(EnergyError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();

        let (x_c, y_c, x_mean, y_mean) = if self.fit_intercept {
            let xm = x
                .mean_axis(Axis(0))
                .ok_or_else(|| EnergyError::Data("empty training matrix".to_string()))?;
            let ym = y.mean().unwrap_or(0.0);
            (x - &xm.view().insert_axis(Axis(0)), y - ym, xm, ym)
        } else {
            (x.clone(), y.clone(), Array1::zeros(n_features), 0.0)
        };

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| x_c.column(j).mapv(|v| v * v).sum())
            .collect();

        let n = n_samples as f64;
        let l1_penalty = self.alpha * self.l1_ratio * n;
        let l2_penalty = self.alpha * (1.0 - self.l1_ratio) * n;

        let mut w: Array1<f64> = Array1::zeros(n_features);
        let mut r = y_c.clone();
        self.n_iter = 0;

        for _ in 0..self.max_iter {
            self.n_iter += 1;
            let mut max_update = 0.0f64;

            for j in 0..n_features {
                let denom = col_norms[j] + l2_penalty;
                if denom < 1e-15 {
                    w[j] = 0.0;
                    continue;
                }
                let rho = x_c.column(j).dot(&r) + col_norms[j] * w[j];
                let old_wj = w[j];
                w[j] = soft_threshold(rho, l1_penalty) / denom;

                let delta = old_wj - w[j];
                if delta != 0.0 {
                    r.scaled_add(delta, &x_c.column(j));
                    max_update = max_update.max(delta.abs());
                }
            }

            let max_weight = w.iter().fold(0.0f64, |m, v| m.max(v.abs()));
            if max_weight == 0.0 || max_update <= self.tol * max_weight {
                break;
            }
        }

        self.intercept = Some(if self.fit_intercept { y_mean - w.dot(&x_mean) } else { 0.0 });
        self.coefficients = Some(w);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(EnergyError::ModelNotFitted)?;
        validate_prediction_input(x, coefficients.len())?;
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        // y = 2*x1 + 3*x2 + 1
        let x = array![
            [1.0, 1.0],
            [2.0, 1.0],
            [1.0, 2.0],
            [2.0, 2.0],
            [3.0, 1.0],
            [0.0, 3.0],
        ];
        let y = x.rows().into_iter().map(|r| 2.0 * r[0] + 3.0 * r[1] + 1.0).collect();
        (x, y)
    }

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
    }

    #[test]
    fn test_small_alpha_recovers_ols() {
        let (x, y) = linear_data();
        let mut model = ElasticNetRegression::new(1e-6, 0.5).with_tol(1e-10).with_max_iter(10_000);
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-3);
        assert!((coef[1] - 3.0).abs() < 1e-3);
        assert!((model.intercept.unwrap() - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_strong_penalty_shrinks_to_mean() {
        let (x, y) = linear_data();
        let mut model = ElasticNetRegression::new(1e3, 0.5);
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!(coef.iter().all(|c| *c == 0.0));
        let preds = model.predict(&x).unwrap();
        let mean = y.mean().unwrap();
        assert!(preds.iter().all(|p| (p - mean).abs() < 1e-12));
    }

    #[test]
    fn test_default_penalty_shrinks_coefficients() {
        let (x, y) = linear_data();
        let mut model = ElasticNetRegression::default();
        model.fit(&x, &y).unwrap();
        let coef = model.coefficients.as_ref().unwrap();
        assert!(coef[0].abs() < 2.0);
        assert!(coef[1].abs() < 3.0);
    }

    #[test]
    fn test_not_fitted() {
        let model = ElasticNetRegression::default();
        assert!(matches!(model.predict(&array![[1.0, 2.0]]), Err(EnergyError::ModelNotFitted)));
    }
}
