//! Error types for the energy benchmarking pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, EnergyError>;

/// Main error type for preprocessing, splitting and model evaluation
#[derive(Error, Debug)]
pub enum EnergyError {
    #[error("Schema error: column '{column}' {reason}")]
    Schema { column: String, reason: String },

    #[error("Sampling error: {0}")]
    Sampling(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Split error: {0}")]
    Split(String),

    #[error("Model '{model}' failed: {message}")]
    Model { model: String, message: String },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl EnergyError {
    /// Shorthand for a schema violation on a named column
    pub fn schema(column: impl Into<String>, reason: impl Into<String>) -> Self {
        EnergyError::Schema {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Wrap any failure raised while fitting or predicting with a named model
    pub fn model(model: impl Into<String>, source: EnergyError) -> Self {
        match source {
            // already attributed
            EnergyError::Model { .. } => source,
            other => EnergyError::Model {
                model: model.into(),
                message: other.to_string(),
            },
        }
    }
}

impl From<polars::error::PolarsError> for EnergyError {
    fn from(err: polars::error::PolarsError) -> Self {
        EnergyError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for EnergyError {
    fn from(err: serde_json::Error) -> Self {
        EnergyError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for EnergyError {
    fn from(err: ndarray::ShapeError) -> Self {
        EnergyError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EnergyError::schema("elec_cons", "is missing");
        assert_eq!(err.to_string(), "Schema error: column 'elec_cons' is missing");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EnergyError = io_err.into();
        assert!(matches!(err, EnergyError::Io(_)));
    }

    #[test]
    fn test_model_error_keeps_first_attribution() {
        let inner = EnergyError::model("svm", EnergyError::ModelNotFitted);
        let outer = EnergyError::model("other", inner);
        match outer {
            EnergyError::Model { model, message } => {
                assert_eq!(model, "svm");
                assert_eq!(message, "Model not fitted");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
