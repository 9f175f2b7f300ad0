//! Categorical encoding: missing-category fill, label codes and one-hot indicators

use super::schema::is_numeric;
use crate::error::{EnergyError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Replace nulls in a string column with a literal category.
/// An all-null column (dtype Null) becomes a constant string column.
pub fn fill_missing_category(df: &DataFrame, column: &str, fill: &str) -> Result<DataFrame> {
    let series = df
        .column(column)
        .map_err(|_| EnergyError::schema(column, "is missing"))?
        .as_materialized_series();

    let filled: StringChunked = match series.dtype() {
        DataType::Null => (0..series.len()).map(|_| Some(fill)).collect(),
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| Some(v.unwrap_or(fill)))
            .collect(),
        other => {
            return Err(EnergyError::schema(
                column,
                format!("must be a string column to fill missing categories, found {}", other),
            ))
        }
    };

    let mut result = df.clone();
    result.with_column(filled.with_name(column.into()).into_series())?;
    Ok(result)
}

/// Maps each distinct value to its index in sorted order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
    mapping: HashMap<String, usize>,
    is_fitted: bool,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learned classes; position is the code
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Collect distinct values. Numeric columns sort numerically, everything
    /// else lexicographically.
    pub fn fit(&mut self, series: &Series) -> Result<&mut Self> {
        let keys = Self::keys(series)?;
        let distinct: BTreeSet<&str> = keys.iter().flatten().map(String::as_str).collect();
        let mut classes: Vec<String> = distinct.into_iter().map(str::to_string).collect();

        if is_numeric(series.dtype()) {
            classes.sort_by(|a, b| {
                let a = a.parse::<f64>().unwrap_or(f64::NAN);
                let b = b.parse::<f64>().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            });
        }

        self.mapping = classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class.clone(), idx))
            .collect();
        self.classes = classes;
        self.is_fitted = true;
        Ok(self)
    }

    /// Codes as f64. Nulls and unseen values are errors.
    pub fn transform(&self, series: &Series) -> Result<Vec<f64>> {
        if !self.is_fitted {
            return Err(EnergyError::ModelNotFitted);
        }
        let name = series.name().to_string();

        Self::keys(series)?
            .into_iter()
            .enumerate()
            .map(|(row, key)| {
                let key = key.ok_or_else(|| {
                    EnergyError::schema(&name, format!("has a null category at row {}", row))
                })?;
                self.mapping.get(&key).map(|code| *code as f64).ok_or_else(|| {
                    EnergyError::schema(&name, format!("has unseen category '{}'", key))
                })
            })
            .collect()
    }

    pub fn fit_transform(&mut self, series: &Series) -> Result<Vec<f64>> {
        self.fit(series)?;
        self.transform(series)
    }

    fn keys(series: &Series) -> Result<Vec<Option<String>>> {
        let as_text = series.cast(&DataType::String)?;
        let keys = as_text
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        Ok(keys)
    }
}

/// One indicator column per (column, category) pair
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<(String, Vec<String>)>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// String columns of `df` that are not listed in `exclude`, in frame order
    pub fn categorical_columns(df: &DataFrame, exclude: &[&str]) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|c| matches!(c.dtype(), DataType::String))
            .map(|c| c.name().to_string())
            .filter(|name| !exclude.contains(&name.as_str()))
            .collect()
    }

    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut categories = Vec::with_capacity(columns.len());
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| EnergyError::schema(*col_name, "is missing"))?;
            let ca = column.as_materialized_series().str()?;
            let distinct: BTreeSet<&str> = ca.into_iter().flatten().collect();
            categories.push((
                col_name.to_string(),
                distinct.into_iter().map(str::to_string).collect(),
            ));
        }

        self.categories = categories;
        self.is_fitted = true;
        Ok(self)
    }

    /// Indicator column names in output order
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|(col, cats)| cats.iter().map(move |cat| format!("{}_{}", col, cat)))
            .collect()
    }

    /// Drop the encoded columns and append `{column}_{category}` indicators
    /// (1.0 / 0.0) after the remaining columns. Nulls and unseen values give
    /// an all-zero row.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(EnergyError::ModelNotFitted);
        }

        let encoded: Vec<&str> = self.categories.iter().map(|(c, _)| c.as_str()).collect();
        let mut columns: Vec<Column> = df
            .get_columns()
            .iter()
            .filter(|c| !encoded.contains(&c.name().as_str()))
            .cloned()
            .collect();

        for (col_name, cats) in &self.categories {
            let ca = df
                .column(col_name)
                .map_err(|_| EnergyError::schema(col_name.as_str(), "is missing"))?
                .as_materialized_series()
                .str()?;

            for category in cats {
                let values: Vec<f64> = ca
                    .into_iter()
                    .map(|v| if v == Some(category.as_str()) { 1.0 } else { 0.0 })
                    .collect();
                columns.push(Column::new(format!("{}_{}", col_name, category).into(), values));
            }
        }

        Ok(DataFrame::new(columns)?)
    }

    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }
}
