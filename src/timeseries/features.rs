//! Calendar and cyclical time features

use crate::error::{EnergyError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// String layouts accepted for timestamp columns, tried in order.
/// `%.f` also matches a missing fractional part.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a single timestamp string
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Convert a timestamp column into chrono values.
///
/// Accepts string, `Datetime` (any unit, zone ignored) and `Date` columns.
/// Nulls and unparseable values are schema violations.
pub fn parse_timestamps(column: &Column) -> Result<Vec<NaiveDateTime>> {
    let name = column.name().to_string();
    let series = column.as_materialized_series();

    if series.null_count() > 0 {
        return Err(EnergyError::schema(
            &name,
            format!("contains {} null timestamps", series.null_count()),
        ));
    }

    match series.dtype() {
        DataType::String => {
            let ca = series.str()?;
            ca.into_iter()
                .enumerate()
                .map(|(row, value)| {
                    let raw = value.unwrap_or_default();
                    parse_timestamp(raw).ok_or_else(|| {
                        EnergyError::schema(
                            &name,
                            format!("has unparseable timestamp '{}' at row {}", raw, row),
                        )
                    })
                })
                .collect()
        }
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let physical = series.cast(&DataType::Int64)?;
            physical
                .i64()?
                .into_iter()
                .enumerate()
                .map(|(row, value)| {
                    value
                        .and_then(|v| epoch_to_naive(v, unit))
                        .ok_or_else(|| {
                            EnergyError::schema(&name, format!("has out-of-range timestamp at row {}", row))
                        })
                })
                .collect()
        }
        DataType::Date => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| EnergyError::Data("invalid epoch".to_string()))?;
            let physical = series.cast(&DataType::Int32)?;
            physical
                .i32()?
                .into_iter()
                .enumerate()
                .map(|(row, value)| {
                    value
                        .and_then(|days| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
                        .ok_or_else(|| {
                            EnergyError::schema(&name, format!("has out-of-range date at row {}", row))
                        })
                })
                .collect()
        }
        other => Err(EnergyError::schema(
            &name,
            format!("has type {} which cannot be read as a timestamp", other),
        )),
    }
}

fn epoch_to_naive(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let dt = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
    };
    dt.map(|d| d.naive_utc())
}

/// Elapsed seconds since the earliest timestamp in the set
pub fn relative_seconds(timestamps: &[NaiveDateTime]) -> Vec<f64> {
    let Some(origin) = timestamps.iter().min().copied() else {
        return Vec::new();
    };
    timestamps
        .iter()
        .map(|ts| (*ts - origin).num_milliseconds() as f64 / 1_000.0)
        .collect()
}

/// Ordinal calendar fields derived from timestamps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarFeatures {
    /// Day of year (1-366)
    pub day_of_year: Vec<f64>,
    /// Month (1-12)
    pub month: Vec<f64>,
    /// Day of week (0=Monday, 6=Sunday)
    pub day_of_week: Vec<f64>,
}

impl CalendarFeatures {
    /// Derive calendar fields for every timestamp
    pub fn from_timestamps(timestamps: &[NaiveDateTime]) -> Self {
        let mut features = Self {
            day_of_year: Vec::with_capacity(timestamps.len()),
            month: Vec::with_capacity(timestamps.len()),
            day_of_week: Vec::with_capacity(timestamps.len()),
        };

        for ts in timestamps {
            features.day_of_year.push(ts.ordinal() as f64);
            features.month.push(ts.month() as f64);
            features.day_of_week.push(ts.weekday().num_days_from_monday() as f64);
        }

        features
    }
}

/// Sine/cosine pair for one periodic quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyclicalFeature {
    /// Base name; columns are `{base}_sin` and `{base}_cos`
    pub base: String,
    pub sin: Vec<f64>,
    pub cos: Vec<f64>,
}

impl CyclicalFeature {
    /// Encode `values` against their own maximum: `sin(2π·v/max)`, `cos(2π·v/max)`.
    ///
    /// A zero (or non-finite) maximum maps every value to angle 0.
    /// NaN inputs stay NaN.
    pub fn encode(base: impl Into<String>, values: &[f64]) -> Self {
        let period = values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(f64::NEG_INFINITY, f64::max);

        let angles: Vec<f64> = values
            .iter()
            .map(|&v| {
                if period == 0.0 || !period.is_finite() {
                    if v.is_nan() { f64::NAN } else { 0.0 }
                } else {
                    TAU * v / period
                }
            })
            .collect();

        Self {
            base: base.into(),
            sin: angles.iter().map(|a| a.sin()).collect(),
            cos: angles.iter().map(|a| a.cos()).collect(),
        }
    }

    pub fn sin_name(&self) -> String {
        format!("{}_sin", self.base)
    }

    pub fn cos_name(&self) -> String {
        format!("{}_cos", self.base)
    }

    /// The two output columns, sine first
    pub fn into_columns(self) -> [Column; 2] {
        let sin_name = self.sin_name();
        let cos_name = self.cos_name();
        [
            Column::new(sin_name.into(), self.sin),
            Column::new(cos_name.into(), self.cos),
        ]
    }
}
