//! Min-max feature scaling

use crate::error::{EnergyError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Observed bounds of one column on the fitting data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub data_min: f64,
    pub data_max: f64,
}

impl ColumnRange {
    /// Range used as divisor; a constant column counts as range 1
    pub fn scale(&self) -> f64 {
        let range = self.data_max - self.data_min;
        if range == 0.0 {
            1.0
        } else {
            range
        }
    }
}

/// Maps each fitted column linearly onto `feature_range` using the bounds
/// seen at fit time. Values outside those bounds are not clipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    feature_range: (f64, f64),
    params: Vec<(String, ColumnRange)>,
    is_fitted: bool,
}

impl MinMaxScaler {
    pub fn new(feature_range: (f64, f64)) -> Self {
        Self {
            feature_range,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn feature_range(&self) -> (f64, f64) {
        self.feature_range
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fitted columns in fit order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(name, _)| name.as_str())
    }

    /// Fitted bounds of a column
    pub fn range(&self, column: &str) -> Option<&ColumnRange> {
        self.params
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, range)| range)
    }

    pub fn params(&self) -> &[(String, ColumnRange)] {
        &self.params
    }

    /// Learn per-column bounds, ignoring nulls and NaN.
    /// A column without any finite value gets NaN bounds.
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let (lo, hi) = self.feature_range;
        if !(lo < hi) {
            return Err(EnergyError::InvalidParameter {
                name: "feature_range".to_string(),
                value: format!("({}, {})", lo, hi),
                reason: "lower bound must be below upper bound".to_string(),
            });
        }

        let mut params = Vec::with_capacity(columns.len());
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| EnergyError::schema(*col_name, "is missing from the fitting frame"))?;
            let casted = column.as_materialized_series().cast(&DataType::Float64)?;
            let ca = casted.f64()?;

            let (min, max) = ca
                .into_iter()
                .flatten()
                .filter(|v| !v.is_nan())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(mn, mx), v| {
                    (mn.min(v), mx.max(v))
                });

            let range = if min.is_finite() && max.is_finite() {
                ColumnRange {
                    data_min: min,
                    data_max: max,
                }
            } else {
                ColumnRange {
                    data_min: f64::NAN,
                    data_max: f64::NAN,
                }
            };
            params.push((col_name.to_string(), range));
        }

        self.params = params;
        self.is_fitted = true;
        Ok(self)
    }

    /// Scale every fitted column present in `df`; other columns pass through
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let (lo, hi) = self.feature_range;
        self.apply(df, |v, range| (v - range.data_min) / range.scale() * (hi - lo) + lo)
    }

    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Map scaled values back to the original units
    pub fn inverse_transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let (lo, hi) = self.feature_range;
        self.apply(df, |v, range| (v - lo) / (hi - lo) * range.scale() + range.data_min)
    }

    /// Build every replacement column first, then swap them in
    fn apply<F>(&self, df: &DataFrame, f: F) -> Result<DataFrame>
    where
        F: Fn(f64, &ColumnRange) -> f64,
    {
        if !self.is_fitted {
            return Err(EnergyError::ModelNotFitted);
        }

        let replacements: Vec<Series> = self
            .params
            .iter()
            .filter_map(|(col_name, range)| {
                df.column(col_name).ok().map(|column| {
                    let casted = column.as_materialized_series().cast(&DataType::Float64)?;
                    let mapped: Float64Chunked = casted
                        .f64()?
                        .into_iter()
                        .map(|opt| opt.map(|v| f(v, range)))
                        .collect();
                    Ok(mapped.with_name(column.name().clone()).into_series())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for series in replacements {
            result = result.with_column(series)?.clone();
        }
        Ok(result)
    }
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self::new((0.0, 1.0))
    }
}
