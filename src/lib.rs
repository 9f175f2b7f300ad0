//! Energy Bench - building energy consumption forecasting benchmark
//!
//! Turns raw building energy observations into model-ready train/test
//! matrices and compares a roster of regression models on them.
//!
//! # Modules
//!
//! - [`preprocessing`] - Schema validation, encoding, scaling and the pipeline
//! - [`timeseries`] - Timestamp features, sampling inference, chronological split
//! - [`training`] - Regression models and the MAPE metric
//! - [`evaluation`] - Model roster, runner and multi-dataset harness
//! - [`utils`] - Data loading and frame conversion
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data preparation
pub mod preprocessing;
pub mod timeseries;

// Models and evaluation
pub mod evaluation;
pub mod training;

// Utilities
pub mod cli;
pub mod utils;

pub use error::{EnergyError, Result};

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{EnergyError, Result};
    pub use crate::evaluation::{
        default_roster, run_model, BatchReport, ComparisonTable, EvaluationConfig,
        EvaluationHarness, ModelKind, ModelResult, ModelSpec,
    };
    pub use crate::preprocessing::{preprocess, EnergyPreprocessor, PreparedData, PreprocessingConfig};
    pub use crate::training::{mean_absolute_percentage_error, Regressor};
    pub use crate::utils::DataLoader;
}
