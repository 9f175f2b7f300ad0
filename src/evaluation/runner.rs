//! Fit, time and score a single model

use crate::error::{EnergyError, Result};
use crate::training::{mean_absolute_percentage_error, Regressor};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Outcome of one model run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub model: String,
    /// Seconds spent in `fit`
    pub train_time: f64,
    /// Seconds spent in `predict`
    pub test_time: f64,
    /// Mean absolute percentage error on the test targets, in percent
    pub mape: f64,
}

/// Fit `model` on the training rows, predict the test rows and score them.
/// Any failure is attributed to `name` and returned to the caller.
pub fn run_model(
    model: &mut dyn Regressor,
    train_x: &Array2<f64>,
    train_y: &Array1<f64>,
    test_x: &Array2<f64>,
    test_y: &Array1<f64>,
    name: &str,
) -> Result<ModelResult> {
    let start = Instant::now();
    model
        .fit(train_x, train_y)
        .map_err(|e| EnergyError::model(name, e))?;
    let train_time = start.elapsed().as_secs_f64();

    let start = Instant::now();
    let predictions = model.predict(test_x).map_err(|e| EnergyError::model(name, e))?;
    let test_time = start.elapsed().as_secs_f64();

    let mape =
        mean_absolute_percentage_error(test_y, &predictions).map_err(|e| EnergyError::model(name, e))?;

    info!(model = name, train_time, test_time, mape, "model evaluated");

    Ok(ModelResult {
        model: name.to_string(),
        train_time,
        test_time,
        mape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{ElasticNetRegression, KNNRegressor};
    use ndarray::array;

    #[test]
    fn test_run_model() {
        let train_x = array![[1.0], [2.0], [3.0], [4.0]];
        let train_y = array![10.0, 20.0, 30.0, 40.0];
        let test_x = array![[2.0], [3.0]];
        let test_y = array![20.0, 30.0];

        let mut model = KNNRegressor::new(1);
        let result = run_model(&mut model, &train_x, &train_y, &test_x, &test_y, "knn").unwrap();
        assert_eq!(result.model, "knn");
        assert_eq!(result.mape, 0.0);
        assert!(result.train_time >= 0.0 && result.test_time >= 0.0);
    }

    #[test]
    fn test_model_failure_is_attributed() {
        let train_x = array![[1.0], [2.0]];
        let train_y = array![1.0];
        let mut model = ElasticNetRegression::default();

        let err = run_model(&mut model, &train_x, &train_y, &train_x, &array![1.0, 2.0], "elasticnet")
            .unwrap_err();
        match err {
            EnergyError::Model { model, .. } => assert_eq!(model, "elasticnet"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
