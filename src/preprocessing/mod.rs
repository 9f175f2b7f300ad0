//! Data preprocessing module
//!
//! Turns a raw building energy observation table into model-ready,
//! chronologically split train/test sets:
//! - Schema validation of the required columns
//! - Cyclical calendar encoding and relative-seconds timestamps
//! - Label and one-hot categorical encoding
//! - Target filtering and extraction
//! - Min-max scaling fit on the training rows only

mod config;
mod encoder;
mod pipeline;
mod scaler;
pub mod schema;

pub use config::PreprocessingConfig;
pub use encoder::{fill_missing_category, LabelEncoder, OneHotEncoder};
pub use pipeline::{check_no_missing, preprocess, EnergyPreprocessor, PreparedData};
pub use scaler::{ColumnRange, MinMaxScaler};
pub use schema::{FieldKind, FieldSpec, ObservationSchema};
