//! Sampling-frequency inference and chronological train/test splitting

use crate::error::{EnergyError, Result};
use ndarray::{s, Array1};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// First strictly positive gap between consecutive relative timestamps.
///
/// Leading duplicate timestamps (zero deltas) are skipped. Only the first
/// positive gap is consulted, so gaps or clock shifts later in the series
/// do not influence the result.
pub fn infer_sampling_interval(seconds: &[f64]) -> Result<f64> {
    if seconds.len() < 2 {
        return Err(EnergyError::Sampling(format!(
            "need at least 2 observations to infer a sampling interval, got {}",
            seconds.len()
        )));
    }

    seconds
        .windows(2)
        .map(|w| w[1] - w[0])
        .find(|delta| *delta > 0.0)
        .ok_or_else(|| {
            EnergyError::Sampling(
                "no strictly increasing pair of timestamps found".to_string(),
            )
        })
}

/// Inferred sampling rate of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingInfo {
    /// Seconds between observations
    pub interval_seconds: f64,
    /// Observations per calendar day
    pub observations_per_day: f64,
}

impl SamplingInfo {
    /// Infer the sampling rate from relative-seconds timestamps
    pub fn infer(seconds: &[f64]) -> Result<Self> {
        let interval_seconds = infer_sampling_interval(seconds)?;
        Ok(Self {
            interval_seconds,
            observations_per_day: SECONDS_PER_DAY / interval_seconds,
        })
    }
}

/// A single boundary separating earlier training rows from later testing rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronologicalSplit {
    n_rows: usize,
    test_start: usize,
}

impl ChronologicalSplit {
    /// Hold out the trailing `test_days` calendar days.
    ///
    /// `test_start = n_rows - round(test_days * observations_per_day)`, which
    /// must satisfy `0 < test_start < n_rows`.
    pub fn from_test_days(n_rows: usize, test_days: u32, observations_per_day: f64) -> Result<Self> {
        if test_days == 0 {
            return Err(EnergyError::InvalidParameter {
                name: "test_days".to_string(),
                value: test_days.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !(observations_per_day.is_finite() && observations_per_day > 0.0) {
            return Err(EnergyError::InvalidParameter {
                name: "observations_per_day".to_string(),
                value: observations_per_day.to_string(),
                reason: "must be finite and positive".to_string(),
            });
        }

        let test_rows = (test_days as f64 * observations_per_day).round();
        let test_start = n_rows as f64 - test_rows;

        if test_start < 1.0 || test_start >= n_rows as f64 {
            return Err(EnergyError::Split(format!(
                "{} test days at {:.3} observations/day need {} rows but only {} rows are available",
                test_days, observations_per_day, test_rows, n_rows
            )));
        }

        Ok(Self {
            n_rows,
            test_start: test_start as usize,
        })
    }

    /// Split at an explicit row index
    pub fn at(n_rows: usize, test_start: usize) -> Result<Self> {
        if test_start == 0 || test_start >= n_rows {
            return Err(EnergyError::Split(format!(
                "test start {} outside 1..{}",
                test_start, n_rows
            )));
        }
        Ok(Self { n_rows, test_start })
    }

    pub fn test_start(&self) -> usize {
        self.test_start
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_train(&self) -> usize {
        self.test_start
    }

    pub fn n_test(&self) -> usize {
        self.n_rows - self.test_start
    }

    pub fn train_range(&self) -> Range<usize> {
        0..self.test_start
    }

    pub fn test_range(&self) -> Range<usize> {
        self.test_start..self.n_rows
    }

    /// Split a frame into (train, test), preserving row order
    pub fn split_frame(&self, df: &DataFrame) -> Result<(DataFrame, DataFrame)> {
        self.check_len(df.height())?;
        let train = df.slice(0, self.n_train());
        let test = df.slice(self.test_start as i64, self.n_test());
        Ok((train, test))
    }

    /// Split a target vector into (train, test)
    pub fn split_targets(&self, targets: &Array1<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        self.check_len(targets.len())?;
        Ok((
            targets.slice(s![..self.test_start]).to_owned(),
            targets.slice(s![self.test_start..]).to_owned(),
        ))
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.n_rows {
            return Err(EnergyError::Shape {
                expected: format!("{} rows", self.n_rows),
                actual: format!("{} rows", len),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_interval_regular() {
        let seconds = [0.0, 900.0, 1800.0, 2700.0];
        assert_eq!(infer_sampling_interval(&seconds).unwrap(), 900.0);
    }

    #[test]
    fn test_interval_skips_leading_duplicates() {
        let seconds = [0.0, 0.0, 0.0, 3600.0, 7200.0];
        assert_eq!(infer_sampling_interval(&seconds).unwrap(), 3600.0);
    }

    #[test]
    fn test_interval_uses_first_positive_gap_only() {
        // a later gap does not change the estimate
        let seconds = [0.0, 900.0, 5400.0, 6300.0];
        assert_eq!(infer_sampling_interval(&seconds).unwrap(), 900.0);
    }

    #[test]
    fn test_interval_failure() {
        assert!(matches!(
            infer_sampling_interval(&[10.0, 10.0, 10.0]),
            Err(EnergyError::Sampling(_))
        ));
        assert!(matches!(infer_sampling_interval(&[0.0]), Err(EnergyError::Sampling(_))));
    }

    #[test]
    fn test_sampling_info() {
        let info = SamplingInfo::infer(&[0.0, 900.0, 1800.0]).unwrap();
        assert_eq!(info.interval_seconds, 900.0);
        assert!((info.observations_per_day - 96.0).abs() < 1e-12);
    }

    #[test]
    fn test_split_daily() {
        let split = ChronologicalSplit::from_test_days(400, 100, 1.0).unwrap();
        assert_eq!(split.test_start(), 300);
        assert_eq!(split.n_train(), 300);
        assert_eq!(split.n_test(), 100);
        assert_eq!(split.n_train() + split.n_test(), 400);
    }

    #[test]
    fn test_split_rounds_row_count() {
        // 2 days at 3.75 obs/day = 7.5 -> 8 rows
        let split = ChronologicalSplit::from_test_days(20, 2, 3.75).unwrap();
        assert_eq!(split.n_test(), 8);
    }

    #[test]
    fn test_split_too_many_days() {
        assert!(matches!(
            ChronologicalSplit::from_test_days(100, 100, 1.0),
            Err(EnergyError::Split(_))
        ));
        assert!(matches!(
            ChronologicalSplit::from_test_days(100, 183, 96.0),
            Err(EnergyError::Split(_))
        ));
    }

    #[test]
    fn test_split_zero_days_rejected() {
        assert!(ChronologicalSplit::from_test_days(100, 0, 1.0).is_err());
    }

    #[test]
    fn test_split_targets_and_frame() {
        let split = ChronologicalSplit::at(5, 3).unwrap();
        let (train, test) = split.split_targets(&array![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(train, array![1.0, 2.0, 3.0]);
        assert_eq!(test, array![4.0, 5.0]);

        let df = df!("a" => &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let (train_df, test_df) = split.split_frame(&df).unwrap();
        assert_eq!(train_df.height(), 3);
        assert_eq!(test_df.height(), 2);

        let short = df!("a" => &[1.0, 2.0]).unwrap();
        assert!(split.split_frame(&short).is_err());
    }
}
