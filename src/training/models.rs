//! Regressor trait and evaluation metrics

use crate::error::{EnergyError, Result};
use ndarray::{Array1, Array2};

/// Common interface of every regression model in the roster
pub trait Regressor: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn is_fitted(&self) -> bool;
}

/// Mean absolute percentage error, in percent:
/// `100 * mean(|y_true - y_pred| / |y_true|)`.
///
/// Empty inputs, mismatched lengths and zero true values are errors.
pub fn mean_absolute_percentage_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(EnergyError::Shape {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(EnergyError::InvalidParameter {
            name: "y_true".to_string(),
            value: "[]".to_string(),
            reason: "MAPE needs at least one observation".to_string(),
        });
    }
    if let Some(pos) = y_true.iter().position(|v| *v == 0.0) {
        return Err(EnergyError::InvalidParameter {
            name: "y_true".to_string(),
            value: format!("0 at index {}", pos),
            reason: "MAPE is undefined for zero true values".to_string(),
        });
    }

    let total: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| ((t - p) / t).abs())
        .sum();
    Ok(100.0 * total / y_true.len() as f64)
}

/// Reject empty, mismatched or non-finite training data
pub(crate) fn validate_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(EnergyError::Shape {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(EnergyError::Shape {
            expected: "non-empty training matrix".to_string(),
            actual: format!("{} x {}", x.nrows(), x.ncols()),
        });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(EnergyError::DataIntegrity(
            "training data contains NaN or infinite values".to_string(),
        ));
    }
    Ok(())
}

/// Reject prediction input whose width differs from the fitted width
pub(crate) fn validate_prediction_input(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(EnergyError::Shape {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}
