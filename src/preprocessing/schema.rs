//! Typed contract for the building energy observation table

use crate::error::{EnergyError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const TIMESTAMP: &str = "timestamp";
pub const TARGET: &str = "elec_cons";
pub const SUN_RISE_SET: &str = "sun_rise_set";
pub const WEEK_DAY_END: &str = "week_day_end";
pub const NUM_TIME: &str = "num_time";
pub const DAY_OF_WEEK: &str = "day_of_week";

/// Auxiliary consumption, demand, anomaly and forecast columns that must
/// never reach the feature set.
pub const AUXILIARY_COLUMNS: &[&str] = &[
    "elec_cons_imp",
    "pow_dem",
    "anom_flag",
    "anom_missed_flag",
    "cleaned_energy",
    "forecast",
];

/// Accepted type class of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// String, Datetime or Date
    Timestamp,
    /// Integer or floating point
    Numeric,
    /// String
    Text,
    /// String, numeric or boolean
    Categorical,
    /// No type constraint
    Any,
}

impl FieldKind {
    fn accepts(&self, dtype: &DataType) -> bool {
        match self {
            FieldKind::Timestamp => matches!(
                dtype,
                DataType::String | DataType::Datetime(_, _) | DataType::Date
            ),
            FieldKind::Numeric => is_numeric(dtype),
            FieldKind::Text => matches!(dtype, DataType::String),
            FieldKind::Categorical => {
                matches!(dtype, DataType::String | DataType::Boolean) || is_numeric(dtype)
            }
            FieldKind::Any => true,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FieldKind::Timestamp => "a timestamp (string, datetime or date)",
            FieldKind::Numeric => "numeric",
            FieldKind::Text => "a string",
            FieldKind::Categorical => "a string, numeric or boolean category",
            FieldKind::Any => "any type",
        }
    }
}

/// One required column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind, nullable: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable,
        }
    }
}

/// Required columns of an observation table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationSchema {
    fields: Vec<FieldSpec>,
}

impl ObservationSchema {
    /// Schema of the building energy dataset family
    pub fn energy() -> Self {
        Self {
            fields: vec![
                FieldSpec::new(TIMESTAMP, FieldKind::Timestamp, false),
                FieldSpec::new(TARGET, FieldKind::Numeric, true),
                FieldSpec::new(SUN_RISE_SET, FieldKind::Text, true),
                FieldSpec::new(WEEK_DAY_END, FieldKind::Categorical, false),
                FieldSpec::new(NUM_TIME, FieldKind::Numeric, true),
                FieldSpec::new(DAY_OF_WEEK, FieldKind::Any, true),
            ],
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Check presence, type class and nullability of every required column.
    /// Returns the first violation found.
    pub fn validate(&self, df: &DataFrame) -> Result<()> {
        for field in &self.fields {
            let column = df
                .column(&field.name)
                .map_err(|_| EnergyError::schema(&field.name, "is missing"))?;

            // An all-null column read from CSV has dtype Null
            if matches!(column.dtype(), DataType::Null) {
                if field.nullable {
                    continue;
                }
                return Err(EnergyError::schema(&field.name, "contains only nulls"));
            }

            if !field.kind.accepts(column.dtype()) {
                return Err(EnergyError::schema(
                    &field.name,
                    format!("must be {}, found {}", field.kind.describe(), column.dtype()),
                ));
            }

            if !field.nullable && column.null_count() > 0 {
                return Err(EnergyError::schema(
                    &field.name,
                    format!("must not contain nulls, found {}", column.null_count()),
                ));
            }
        }
        Ok(())
    }
}

impl Default for ObservationSchema {
    fn default() -> Self {
        Self::energy()
    }
}

/// Integer or floating point dtype
pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}
