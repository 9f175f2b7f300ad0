//! Preprocessing configuration

use super::schema::AUXILIARY_COLUMNS;
use crate::error::{EnergyError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for turning an observation table into train/test sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Number of trailing calendar days held out for testing
    pub test_days: u32,

    /// Whether to min-max scale the feature tables
    pub scale: bool,

    /// Target interval of the min-max scaler
    pub feature_range: (f64, f64),

    /// Category substituted for nulls in `sun_rise_set`
    pub missing_category: String,

    /// Columns removed with the target; never used as features
    pub auxiliary_columns: Vec<String>,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            test_days: 183,
            scale: true,
            feature_range: (0.0, 1.0),
            missing_category: "neither".to_string(),
            auxiliary_columns: AUXILIARY_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PreprocessingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_days(mut self, days: u32) -> Self {
        self.test_days = days;
        self
    }

    pub fn with_scaling(mut self, scale: bool) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_feature_range(mut self, lo: f64, hi: f64) -> Self {
        self.feature_range = (lo, hi);
        self
    }

    pub fn with_missing_category(mut self, category: impl Into<String>) -> Self {
        self.missing_category = category.into();
        self
    }

    /// Add an extra column to drop alongside the target
    pub fn with_auxiliary_column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if !self.auxiliary_columns.contains(&column) {
            self.auxiliary_columns.push(column);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.test_days == 0 {
            return Err(EnergyError::Config("test_days must be positive".to_string()));
        }
        let (lo, hi) = self.feature_range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(EnergyError::Config(format!(
                "feature_range ({}, {}) must be finite with lower < upper",
                lo, hi
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PreprocessingConfig::default();
        assert_eq!(config.test_days, 183);
        assert!(config.scale);
        assert_eq!(config.feature_range, (0.0, 1.0));
        assert_eq!(config.missing_category, "neither");
        assert!(config.auxiliary_columns.iter().any(|c| c == "forecast"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = PreprocessingConfig::new()
            .with_test_days(7)
            .with_scaling(false)
            .with_auxiliary_column("meter_id")
            .with_auxiliary_column("meter_id");
        assert_eq!(config.test_days, 7);
        assert!(!config.scale);
        assert_eq!(config.auxiliary_columns.iter().filter(|c| *c == "meter_id").count(), 1);
    }

    #[test]
    fn test_validation() {
        assert!(PreprocessingConfig::new().with_test_days(0).validate().is_err());
        assert!(PreprocessingConfig::new().with_feature_range(1.0, 0.0).validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PreprocessingConfig = serde_json::from_str(r#"{"test_days": 30}"#).unwrap();
        assert_eq!(config.test_days, 30);
        assert!(config.scale);
    }
}
