//! Declarative model roster
//!
//! Every benchmarked model is a `{name, kind, hyperparameters}` entry, so a
//! roster file can add or retune models without new code paths.

use crate::training::{
    AdaBoostRegressor, BoostLoss, DistanceMetric, ElasticNetRegression, ExtraTreesRegressor, Gamma,
    KNNRegressor, KernelType, RandomForestRegressor, Regressor, SVMRegressor, WeightFunction,
};
use serde::{Deserialize, Serialize};

/// Model family and its hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    ElasticNet {
        alpha: f64,
        l1_ratio: f64,
        max_iter: usize,
        tol: f64,
    },
    KNeighbors {
        n_neighbors: usize,
        weights: WeightFunction,
        metric: DistanceMetric,
    },
    Svr {
        kernel: KernelType,
        gamma: Gamma,
        c: f64,
        epsilon: f64,
        tol: f64,
        max_iter: usize,
    },
    RandomForest {
        n_estimators: usize,
        max_depth: Option<usize>,
        max_features: Option<usize>,
        bootstrap: bool,
    },
    ExtraTrees {
        n_estimators: usize,
        max_depth: Option<usize>,
    },
    AdaBoost {
        n_estimators: usize,
        learning_rate: f64,
        loss: BoostLoss,
        max_depth: usize,
    },
}

impl ModelKind {
    /// Instantiate an unfitted model; randomized models receive `seed`
    pub fn build(&self, seed: u64) -> Box<dyn Regressor> {
        match self {
            ModelKind::ElasticNet {
                alpha,
                l1_ratio,
                max_iter,
                tol,
            } => Box::new(
                ElasticNetRegression::new(*alpha, *l1_ratio)
                    .with_max_iter(*max_iter)
                    .with_tol(*tol),
            ),
            ModelKind::KNeighbors {
                n_neighbors,
                weights,
                metric,
            } => Box::new(
                KNNRegressor::new(*n_neighbors)
                    .with_weights(*weights)
                    .with_metric(*metric),
            ),
            ModelKind::Svr {
                kernel,
                gamma,
                c,
                epsilon,
                tol,
                max_iter,
            } => {
                let mut svr = SVMRegressor::new()
                    .with_kernel(kernel.clone())
                    .with_gamma(*gamma)
                    .with_c(*c)
                    .with_epsilon(*epsilon)
                    .with_max_iter(*max_iter)
                    .with_random_state(seed);
                svr.tol = *tol;
                Box::new(svr)
            }
            ModelKind::RandomForest {
                n_estimators,
                max_depth,
                max_features,
                bootstrap,
            } => {
                let mut rf = RandomForestRegressor::new(*n_estimators)
                    .with_bootstrap(*bootstrap)
                    .with_random_state(seed);
                rf.max_depth = *max_depth;
                rf.max_features = *max_features;
                Box::new(rf)
            }
            ModelKind::ExtraTrees {
                n_estimators,
                max_depth,
            } => {
                let mut et = ExtraTreesRegressor::new(*n_estimators).with_random_state(seed);
                et.max_depth = *max_depth;
                Box::new(et)
            }
            ModelKind::AdaBoost {
                n_estimators,
                learning_rate,
                loss,
                max_depth,
            } => Box::new(
                AdaBoostRegressor::new(*n_estimators, *learning_rate)
                    .with_loss(*loss)
                    .with_max_depth(*max_depth)
                    .with_random_state(seed),
            ),
        }
    }
}

/// One named roster entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub model: ModelKind,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, model: ModelKind) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }
}

/// The six benchmarked models with their fixed hyperparameters
pub fn default_roster() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new(
            "elasticnet",
            ModelKind::ElasticNet {
                alpha: 1.0,
                l1_ratio: 0.5,
                max_iter: 1000,
                tol: 1e-4,
            },
        ),
        ModelSpec::new(
            "knn",
            ModelKind::KNeighbors {
                n_neighbors: 5,
                weights: WeightFunction::Uniform,
                metric: DistanceMetric::Euclidean,
            },
        ),
        ModelSpec::new(
            "svm",
            ModelKind::Svr {
                kernel: KernelType::RBF,
                gamma: Gamma::Scale,
                c: 1.0,
                epsilon: 0.1,
                tol: 1e-3,
                max_iter: 200,
            },
        ),
        ModelSpec::new(
            "rf",
            ModelKind::RandomForest {
                n_estimators: 100,
                max_depth: None,
                max_features: None,
                bootstrap: true,
            },
        ),
        ModelSpec::new(
            "et",
            ModelKind::ExtraTrees {
                n_estimators: 100,
                max_depth: None,
            },
        ),
        ModelSpec::new(
            "adaboost",
            ModelKind::AdaBoost {
                n_estimators: 1000,
                learning_rate: 0.05,
                loss: BoostLoss::Exponential,
                max_depth: 3,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roster_names() {
        let names: Vec<String> = default_roster().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["elasticnet", "knn", "svm", "rf", "et", "adaboost"]);
    }

    #[test]
    fn test_kind_tag_serialization() {
        let spec = ModelSpec::new(
            "rf",
            ModelKind::RandomForest {
                n_estimators: 10,
                max_depth: Some(4),
                max_features: None,
                bootstrap: true,
            },
        );
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["model"]["kind"], "random_forest");
        assert_eq!(json["model"]["n_estimators"], 10);

        let back: ModelSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_roster_from_json() {
        let json = r#"[
            {"name": "lasso", "model": {"kind": "elastic_net", "alpha": 0.1, "l1_ratio": 1.0, "max_iter": 100, "tol": 0.001}},
            {"name": "boost", "model": {"kind": "ada_boost", "n_estimators": 5, "learning_rate": 0.1, "loss": "Linear", "max_depth": 2}}
        ]"#;
        let roster: Vec<ModelSpec> = serde_json::from_str(json).unwrap();
        assert_eq!(roster.len(), 2);
        assert!(!roster[1].model.build(1).is_fitted());
    }
}
