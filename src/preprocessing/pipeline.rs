//! End-to-end preprocessing of a building energy observation table

use super::config::PreprocessingConfig;
use super::encoder::{fill_missing_category, LabelEncoder, OneHotEncoder};
use super::scaler::MinMaxScaler;
use super::schema::{
    is_numeric, ObservationSchema, DAY_OF_WEEK, NUM_TIME, SUN_RISE_SET, TARGET, TIMESTAMP,
    WEEK_DAY_END,
};
use crate::error::{EnergyError, Result};
use crate::timeseries::{
    parse_timestamps, relative_seconds, CalendarFeatures, ChronologicalSplit, CyclicalFeature,
    SamplingInfo,
};
use crate::utils::frame_to_matrix;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Ordinal inputs superseded by the cyclical encodings
const SUPERSEDED_COLUMNS: &[&str] = &["yday", "month", "wday", NUM_TIME, DAY_OF_WEEK];

/// Model-ready output of the pipeline
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub train: DataFrame,
    pub train_targets: Array1<f64>,
    pub test: DataFrame,
    pub test_targets: Array1<f64>,
    /// Feature columns shared by `train` and `test`, in column order
    pub feature_names: Vec<String>,
    pub split: ChronologicalSplit,
    pub sampling: SamplingInfo,
    /// Scaler fitted on the training rows, when scaling is enabled
    pub scaler: Option<MinMaxScaler>,
}

impl PreparedData {
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn train_matrix(&self) -> Result<Array2<f64>> {
        frame_to_matrix(&self.train, &self.feature_names)
    }

    pub fn test_matrix(&self) -> Result<Array2<f64>> {
        frame_to_matrix(&self.test, &self.feature_names)
    }
}

/// Feature engineering, target extraction, chronological split and scaling.
///
/// The input frame is never modified; calling `preprocess` twice on the
/// same table gives identical results.
#[derive(Debug, Clone, Default)]
pub struct EnergyPreprocessor {
    config: PreprocessingConfig,
    schema: ObservationSchema,
}

impl EnergyPreprocessor {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self {
            config,
            schema: ObservationSchema::energy(),
        }
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn preprocess(&self, observations: &DataFrame) -> Result<PreparedData> {
        let start = Instant::now();
        self.config.validate()?;
        self.schema.validate(observations)?;
        debug!(
            rows = observations.height(),
            columns = observations.width(),
            "observation table validated"
        );

        let engineered = self.engineer_features(observations)?;
        let (features, targets) = self.extract_targets(&engineered)?;

        let seconds = column_values(features.column(TIMESTAMP)?)?;
        let sampling = SamplingInfo::infer(&seconds)?;
        let split = ChronologicalSplit::from_test_days(
            features.height(),
            self.config.test_days,
            sampling.observations_per_day,
        )?;
        debug!(
            interval = sampling.interval_seconds,
            observations_per_day = sampling.observations_per_day,
            test_start = split.test_start(),
            "inferred sampling frequency"
        );

        let (mut train, mut test) = split.split_frame(&features)?;
        let (train_targets, test_targets) = split.split_targets(&targets)?;

        let feature_names: Vec<String> = features
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let scaler = if self.config.scale {
            let mut scaler = MinMaxScaler::new(self.config.feature_range);
            let columns: Vec<&str> = feature_names.iter().map(String::as_str).collect();
            scaler.fit(&train, &columns)?;
            train = scaler.transform(&train)?;
            test = scaler.transform(&test)?;
            Some(scaler)
        } else {
            None
        };

        check_no_missing(&train, "training")?;
        check_no_missing(&test, "testing")?;

        info!(
            train_rows = train.height(),
            test_rows = test.height(),
            features = feature_names.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "preprocessing complete"
        );

        Ok(PreparedData {
            train,
            train_targets,
            test,
            test_targets,
            feature_names,
            split,
            sampling,
            scaler,
        })
    }

    /// Fill categories, derive time features, label and one-hot encode.
    /// Target and auxiliary columns are still present in the result.
    fn engineer_features(&self, observations: &DataFrame) -> Result<DataFrame> {
        let df = fill_missing_category(observations, SUN_RISE_SET, &self.config.missing_category)?;

        let timestamps = parse_timestamps(df.column(TIMESTAMP)?)?;
        let calendar = CalendarFeatures::from_timestamps(&timestamps);
        let num_time = column_values(df.column(NUM_TIME)?)?;
        let cyclical = [
            CyclicalFeature::encode("yday", &calendar.day_of_year),
            CyclicalFeature::encode("month", &calendar.month),
            CyclicalFeature::encode("wday", &calendar.day_of_week),
            CyclicalFeature::encode(NUM_TIME, &num_time),
        ];
        let mut seconds = relative_seconds(&timestamps);

        let week_day_end = df.column(WEEK_DAY_END)?.as_materialized_series();
        let mut week_day_codes = LabelEncoder::new().fit_transform(week_day_end)?;

        let mut columns: Vec<Column> = Vec::with_capacity(df.width() + 2 * cyclical.len());
        for column in df.get_columns() {
            match column.name().as_str() {
                TIMESTAMP => columns.push(Column::new(TIMESTAMP.into(), std::mem::take(&mut seconds))),
                WEEK_DAY_END => columns.push(Column::new(
                    WEEK_DAY_END.into(),
                    std::mem::take(&mut week_day_codes),
                )),
                name if SUPERSEDED_COLUMNS.contains(&name) => {}
                _ => columns.push(column.clone()),
            }
        }
        for feature in cyclical {
            columns.extend(feature.into_columns());
        }
        let df = DataFrame::new(columns)?;

        let mut protected: Vec<&str> = vec![TARGET];
        protected.extend(self.config.auxiliary_columns.iter().map(String::as_str));
        let categorical = OneHotEncoder::categorical_columns(&df, &protected);
        if categorical.is_empty() {
            return Ok(df);
        }

        debug!(columns = ?categorical, "one-hot encoding categorical columns");
        let categorical: Vec<&str> = categorical.iter().map(String::as_str).collect();
        OneHotEncoder::new().fit_transform(&df, &categorical)
    }

    /// Keep rows with positive consumption, split off the target and drop
    /// the auxiliary columns. Remaining columns are cast to f64.
    fn extract_targets(&self, engineered: &DataFrame) -> Result<(DataFrame, Array1<f64>)> {
        let consumption = column_values(engineered.column(TARGET)?)?;
        let keep: Vec<bool> = consumption.iter().map(|v| *v > 0.0).collect();
        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        let filtered = engineered.filter(&mask)?;

        let dropped = engineered.height() - filtered.height();
        if dropped > 0 {
            debug!(dropped, "removed rows without positive consumption");
        }

        let targets: Array1<f64> = consumption.into_iter().filter(|v| *v > 0.0).collect();

        let mut features = filtered.drop(TARGET)?;
        for column in &self.config.auxiliary_columns {
            if features.column(column).is_ok() {
                features = features.drop(column)?;
            }
        }

        Ok((to_float_frame(&features)?, targets))
    }
}

/// Preprocess with default settings apart from the hold-out length and scaling
pub fn preprocess(observations: &DataFrame, test_days: u32, scale: bool) -> Result<PreparedData> {
    let config = PreprocessingConfig::default()
        .with_test_days(test_days)
        .with_scaling(scale);
    EnergyPreprocessor::new(config).preprocess(observations)
}

/// Fail if any cell is null or NaN, naming the offending columns
pub fn check_no_missing(df: &DataFrame, label: &str) -> Result<()> {
    let mut offenders = Vec::new();
    for column in df.get_columns() {
        let series = column.as_materialized_series();
        let nans = match series.f64() {
            Ok(ca) => ca.into_iter().flatten().filter(|v| v.is_nan()).count(),
            Err(_) => 0,
        };
        let missing = series.null_count() + nans;
        if missing > 0 {
            offenders.push(format!("{} ({})", column.name(), missing));
        }
    }

    if offenders.is_empty() {
        Ok(())
    } else {
        Err(EnergyError::DataIntegrity(format!(
            "{} data contains missing values in: {}",
            label,
            offenders.join(", ")
        )))
    }
}

/// Column values as f64 with nulls mapped to NaN
fn column_values(column: &Column) -> Result<Vec<f64>> {
    let casted = column.as_materialized_series().cast(&DataType::Float64)?;
    let values = casted
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok(values)
}

fn to_float_frame(df: &DataFrame) -> Result<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| match column.dtype() {
            DataType::Float64 => Ok(column.clone()),
            dtype if is_numeric(dtype) || matches!(dtype, DataType::Boolean | DataType::Null) => {
                Ok(column.cast(&DataType::Float64)?)
            }
            other => Err(EnergyError::schema(
                column.name().as_str(),
                format!("has unsupported type {}, expected numeric, boolean or string", other),
            )),
        })
        .collect::<Result<Vec<Column>>>()?;
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hourly_frame(hours: usize) -> DataFrame {
        let timestamps: Vec<String> = (0..hours)
            .map(|h| format!("2016-01-{:02} {:02}:00:00", 1 + h / 24, h % 24))
            .collect();
        let consumption: Vec<f64> = (0..hours).map(|h| 10.0 + (h % 24) as f64).collect();
        let sun: Vec<Option<&str>> = (0..hours)
            .map(|h| match h % 24 {
                6 => Some("rise"),
                18 => Some("set"),
                _ => None,
            })
            .collect();
        let week: Vec<&str> = (0..hours)
            .map(|h| if (h / 24) % 7 < 2 { "weekend" } else { "weekday" })
            .collect();
        let num_time: Vec<f64> = (0..hours).map(|h| (h % 24) as f64).collect();
        let dow: Vec<i64> = (0..hours).map(|h| ((h / 24) % 7) as i64).collect();
        let temperature: Vec<f64> = (0..hours).map(|h| 5.0 + (h % 7) as f64).collect();

        df!(
            "timestamp" => timestamps,
            "elec_cons" => consumption,
            "sun_rise_set" => sun,
            "week_day_end" => week,
            "num_time" => num_time,
            "day_of_week" => dow,
            "temperature" => temperature,
        )
        .unwrap()
    }

    #[test]
    fn test_feature_layout() {
        let prepared = preprocess(&hourly_frame(96), 1, true).unwrap();
        assert_eq!(
            prepared.feature_names,
            vec![
                "timestamp",
                "week_day_end",
                "temperature",
                "yday_sin",
                "yday_cos",
                "month_sin",
                "month_cos",
                "wday_sin",
                "wday_cos",
                "num_time_sin",
                "num_time_cos",
                "sun_rise_set_neither",
                "sun_rise_set_rise",
                "sun_rise_set_set",
            ]
        );
        assert_eq!(prepared.train.width(), prepared.test.width());
    }

    #[test]
    fn test_split_sizes_hourly() {
        let prepared = preprocess(&hourly_frame(96), 1, true).unwrap();
        assert_eq!(prepared.sampling.interval_seconds, 3600.0);
        assert_eq!(prepared.test.height(), 24);
        assert_eq!(prepared.train.height(), 72);
        assert_eq!(prepared.train_targets.len(), 72);
        assert_eq!(prepared.test_targets.len(), 24);
    }

    #[test]
    fn test_unscaled_keeps_relative_seconds() {
        let prepared = preprocess(&hourly_frame(48), 1, false).unwrap();
        assert!(prepared.scaler.is_none());
        let seconds: Vec<f64> = prepared
            .train
            .column("timestamp")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(seconds[0], 0.0);
        assert_eq!(seconds[1], 3600.0);
    }

    #[test]
    fn test_non_positive_targets_removed() {
        let mut df = hourly_frame(72);
        let mut consumption: Vec<Option<f64>> = (0..72).map(|h| Some(10.0 + h as f64)).collect();
        consumption[3] = Some(0.0);
        consumption[4] = Some(-2.0);
        consumption[5] = None;
        df.with_column(Series::new("elec_cons".into(), consumption)).unwrap();

        let prepared = preprocess(&df, 1, true).unwrap();
        assert_eq!(prepared.train.height() + prepared.test.height(), 69);
        assert!(prepared.train_targets.iter().all(|v| *v > 0.0));
    }

    #[test]
    fn test_auxiliary_columns_dropped() {
        let mut df = hourly_frame(48);
        df.with_column(Series::new("forecast".into(), vec![1.0; 48])).unwrap();
        df.with_column(Series::new("anom_flag".into(), vec!["no"; 48])).unwrap();

        let prepared = preprocess(&df, 1, true).unwrap();
        assert!(!prepared.feature_names.iter().any(|n| n.starts_with("forecast")));
        assert!(!prepared.feature_names.iter().any(|n| n.starts_with("anom_flag")));
        assert!(!prepared.feature_names.iter().any(|n| n == "elec_cons"));
    }

    #[test]
    fn test_missing_num_time_is_integrity_error() {
        let mut df = hourly_frame(48);
        let mut num_time: Vec<Option<f64>> = (0..48).map(|h| Some((h % 24) as f64)).collect();
        num_time[10] = None;
        df.with_column(Series::new("num_time".into(), num_time)).unwrap();

        assert!(matches!(
            preprocess(&df, 1, true),
            Err(EnergyError::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_unsupported_extra_column() {
        let mut df = hourly_frame(48);
        let dates: Vec<i32> = (0..48).collect();
        let series = Series::new("installed".into(), dates)
            .cast(&DataType::Date)
            .unwrap();
        df.with_column(series).unwrap();

        match preprocess(&df, 1, true) {
            Err(EnergyError::Schema { column, reason }) => {
                assert_eq!(column, "installed");
                assert!(reason.contains("unsupported type"));
                assert!(reason.contains("numeric, boolean or string"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("date column should be rejected"),
        }
    }

    #[test]
    fn test_matrices_follow_feature_order() {
        let prepared = preprocess(&hourly_frame(48), 1, true).unwrap();
        let train = prepared.train_matrix().unwrap();
        let test = prepared.test_matrix().unwrap();
        assert_eq!(train.ncols(), prepared.n_features());
        assert_eq!(train.nrows(), 24);
        assert_eq!(test.nrows(), 24);
    }

    #[test]
    fn test_check_no_missing() {
        let clean = df!("a" => &[1.0, 2.0]).unwrap();
        assert!(check_no_missing(&clean, "training").is_ok());

        let dirty = df!("a" => &[1.0, f64::NAN], "b" => &[Some(1.0), None]).unwrap();
        let err = check_no_missing(&dirty, "training").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("a (1)"));
        assert!(message.contains("b (1)"));
    }
}
