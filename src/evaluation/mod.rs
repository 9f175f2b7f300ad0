//! Model evaluation
//!
//! - [`roster`] - declarative list of benchmarked models
//! - [`runner`] - fit/predict timing and MAPE for one model
//! - [`harness`] - preprocessing plus the roster over one or many datasets

pub mod harness;
pub mod roster;
pub mod runner;

pub use harness::{
    BatchFailure, BatchReport, ComparisonTable, EvaluationConfig, EvaluationHarness, FailureStage,
};
pub use roster::{default_roster, ModelKind, ModelSpec};
pub use runner::{run_model, ModelResult};
