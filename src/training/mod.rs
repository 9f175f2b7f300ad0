//! Model training module
//!
//! Regression models benchmarked by the evaluation harness:
//! - Elastic net linear regression
//! - K-Nearest Neighbors
//! - Support vector regression
//! - Random Forest and Extra Trees over a shared CART tree
//! - AdaBoost.R2

mod models;
pub mod adaboost;
pub mod decision_tree;
pub mod extra_trees;
pub mod knn;
pub mod linear_models;
pub mod random_forest;
pub mod svm;

pub use adaboost::{AdaBoostRegressor, BoostLoss};
pub use decision_tree::{DecisionTreeRegressor, Splitter, TreeNode};
pub use extra_trees::ExtraTreesRegressor;
pub use knn::{DistanceMetric, KNNRegressor, WeightFunction};
pub use linear_models::ElasticNetRegression;
pub use models::{mean_absolute_percentage_error, Regressor};
pub use random_forest::RandomForestRegressor;
pub use svm::{Gamma, KernelType, SVMRegressor};
