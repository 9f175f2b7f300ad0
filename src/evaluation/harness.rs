//! Evaluation harness: preprocessing plus the model roster, per dataset

use super::roster::{default_roster, ModelSpec};
use super::runner::{run_model, ModelResult};
use crate::error::{EnergyError, Result};
use crate::preprocessing::{EnergyPreprocessor, PreparedData, PreprocessingConfig};
use crate::utils::DataLoader;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Harness configuration: pipeline settings, seed and roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub preprocessing: PreprocessingConfig,
    /// Seed passed to every randomized model
    pub random_seed: u64,
    pub roster: Vec<ModelSpec>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            preprocessing: PreprocessingConfig::default(),
            random_seed: 42,
            roster: default_roster(),
        }
    }
}

impl EvaluationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preprocessing(mut self, config: PreprocessingConfig) -> Self {
        self.preprocessing = config;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_roster(mut self, roster: Vec<ModelSpec>) -> Self {
        self.roster = roster;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.preprocessing.validate()?;
        if self.roster.is_empty() {
            return Err(EnergyError::Config("roster has no models".to_string()));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Results of every roster model on one dataset, in roster order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    results: Vec<ModelResult>,
}

impl ComparisonTable {
    pub fn new(results: Vec<ModelResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[ModelResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Lowest-MAPE record
    pub fn best(&self) -> Option<&ModelResult> {
        self.results.iter().min_by(|a, b| a.mape.total_cmp(&b.mape))
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let models: Vec<&str> = self.results.iter().map(|r| r.model.as_str()).collect();
        let train_time: Vec<f64> = self.results.iter().map(|r| r.train_time).collect();
        let test_time: Vec<f64> = self.results.iter().map(|r| r.test_time).collect();
        let mape: Vec<f64> = self.results.iter().map(|r| r.mape).collect();

        Ok(DataFrame::new(vec![
            Column::new("model".into(), models),
            Column::new("train_time".into(), train_time),
            Column::new("test_time".into(), test_time),
            Column::new("mape".into(), mape),
        ])?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.results)?)
    }
}

impl fmt::Display for ComparisonTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<12} {:>12} {:>12} {:>10}", "model", "train_time", "test_time", "mape")?;
        for r in &self.results {
            writeln!(
                f,
                "{:<12} {:>12.4} {:>12.4} {:>10.3}",
                r.model, r.train_time, r.test_time, r.mape
            )?;
        }
        Ok(())
    }
}

/// Where a dataset dropped out of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Load,
    Preprocessing,
    Model,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Load => "load",
            FailureStage::Preprocessing => "preprocessing",
            FailureStage::Model => "model",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub dataset: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Outcome of a multi-dataset evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Completed datasets with their tables, in input order
    pub tables: Vec<(String, ComparisonTable)>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn n_succeeded(&self) -> usize {
        self.tables.len()
    }

    /// True when nothing was attempted successfully
    pub fn all_failed(&self) -> bool {
        self.tables.is_empty() && !self.failures.is_empty()
    }

    /// Every table stacked, with a leading `dataset` column
    pub fn combined(&self) -> Result<DataFrame> {
        let mut frames = Vec::with_capacity(self.tables.len());
        for (name, table) in &self.tables {
            let mut df = table.to_dataframe()?;
            let dataset = Column::new("dataset".into(), vec![name.as_str(); table.len()]);
            df.insert_column(0, dataset)?;
            frames.push(df);
        }

        let mut iter = frames.into_iter();
        let Some(mut combined) = iter.next() else {
            return Ok(DataFrame::empty());
        };
        for df in iter {
            combined.vstack_mut(&df)?;
        }
        Ok(combined)
    }
}

/// Runs the preprocessing pipeline and every roster model on a dataset
#[derive(Debug, Clone, Default)]
pub struct EvaluationHarness {
    config: EvaluationConfig,
    preprocessor: EnergyPreprocessor,
}

impl EvaluationHarness {
    pub fn new(config: EvaluationConfig) -> Self {
        let preprocessor = EnergyPreprocessor::new(config.preprocessing.clone());
        Self { config, preprocessor }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Evaluate one dataset.
    ///
    /// A preprocessing failure is logged and yields `Ok(None)` so callers
    /// iterating over many buildings can move on. Model failures are
    /// returned as errors.
    pub fn evaluate(&self, observations: &DataFrame) -> Result<Option<ComparisonTable>> {
        let prepared = match self.preprocessor.preprocess(observations) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(error = %e, "preprocessing failed, dataset skipped");
                return Ok(None);
            }
        };
        self.evaluate_prepared(&prepared).map(Some)
    }

    /// Run the roster on already preprocessed data
    pub fn evaluate_prepared(&self, prepared: &PreparedData) -> Result<ComparisonTable> {
        self.config.validate()?;
        let train_x = prepared.train_matrix()?;
        let test_x = prepared.test_matrix()?;

        let mut results = Vec::with_capacity(self.config.roster.len());
        for spec in &self.config.roster {
            let mut model = spec.model.build(self.config.random_seed);
            let result = run_model(
                model.as_mut(),
                &train_x,
                &prepared.train_targets,
                &test_x,
                &prepared.test_targets,
                &spec.name,
            )?;
            results.push(result);
        }

        Ok(ComparisonTable::new(results))
    }

    /// Evaluate named datasets one after another; failures are recorded
    /// and never stop the batch.
    pub fn evaluate_batch<S, I>(&self, datasets: I) -> BatchReport
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, DataFrame)>,
    {
        let mut report = BatchReport::default();
        for (name, df) in datasets {
            self.evaluate_into(&mut report, name.into(), &df);
        }
        self.log_summary(&report);
        report
    }

    /// Load every file and evaluate it; load errors become batch failures
    pub fn evaluate_files<P: AsRef<Path>>(&self, paths: &[P], loader: &DataLoader) -> BatchReport {
        let mut report = BatchReport::default();
        for path in paths {
            let path = path.as_ref();
            let name = path.display().to_string();
            match loader.load_auto(path) {
                Ok(df) => self.evaluate_into(&mut report, name, &df),
                Err(e) => {
                    warn!(dataset = %name, error = %e, "failed to load dataset");
                    report.failures.push(BatchFailure {
                        dataset: name,
                        stage: FailureStage::Load,
                        message: e.to_string(),
                    });
                }
            }
        }
        self.log_summary(&report);
        report
    }

    fn evaluate_into(&self, report: &mut BatchReport, name: String, df: &DataFrame) {
        let prepared = match self.preprocessor.preprocess(df) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(dataset = %name, error = %e, "preprocessing failed, dataset skipped");
                report.failures.push(BatchFailure {
                    dataset: name,
                    stage: FailureStage::Preprocessing,
                    message: e.to_string(),
                });
                return;
            }
        };

        match self.evaluate_prepared(&prepared) {
            Ok(table) => {
                if let Some(best) = table.best() {
                    info!(dataset = %name, best = %best.model, mape = best.mape, "dataset evaluated");
                }
                report.tables.push((name, table));
            }
            Err(e) => {
                warn!(dataset = %name, error = %e, "model run failed, dataset skipped");
                report.failures.push(BatchFailure {
                    dataset: name,
                    stage: FailureStage::Model,
                    message: e.to_string(),
                });
            }
        }
    }

    fn log_summary(&self, report: &BatchReport) {
        info!(
            succeeded = report.n_succeeded(),
            failed = report.failures.len(),
            "batch evaluation finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::roster::ModelKind;
    use crate::training::{DistanceMetric, WeightFunction};

    fn small_roster() -> Vec<ModelSpec> {
        vec![
            ModelSpec::new(
                "knn",
                ModelKind::KNeighbors {
                    n_neighbors: 3,
                    weights: WeightFunction::Uniform,
                    metric: DistanceMetric::Euclidean,
                },
            ),
            ModelSpec::new(
                "rf",
                ModelKind::RandomForest {
                    n_estimators: 5,
                    max_depth: Some(4),
                    max_features: None,
                    bootstrap: true,
                },
            ),
        ]
    }

    fn observations(hours: usize) -> DataFrame {
        let timestamps: Vec<String> = (0..hours)
            .map(|h| format!("2021-03-{:02} {:02}:00:00", 1 + h / 24, h % 24))
            .collect();
        let consumption: Vec<f64> = (0..hours).map(|h| 10.0 + (h % 24) as f64).collect();
        let sun: Vec<&str> = (0..hours)
            .map(|h| match h % 24 {
                7 => "rise",
                17 => "set",
                _ => "neither",
            })
            .collect();
        let week: Vec<&str> = (0..hours)
            .map(|h| if (h / 24) % 7 == 5 { "weekend" } else { "weekday" })
            .collect();
        let num_time: Vec<f64> = (0..hours).map(|h| (h % 24) as f64).collect();
        let dow: Vec<i64> = (0..hours).map(|h| ((h / 24) % 7) as i64).collect();

        df!(
            "timestamp" => timestamps,
            "elec_cons" => consumption,
            "sun_rise_set" => sun,
            "week_day_end" => week,
            "num_time" => num_time,
            "day_of_week" => dow,
        )
        .unwrap()
    }

    fn harness() -> EvaluationHarness {
        let preprocessing = PreprocessingConfig::default().with_test_days(1);
        EvaluationHarness::new(
            EvaluationConfig::default()
                .with_preprocessing(preprocessing)
                .with_roster(small_roster()),
        )
    }

    #[test]
    fn test_evaluate_returns_table_in_roster_order() {
        let table = harness().evaluate(&observations(96)).unwrap().unwrap();
        let names: Vec<&str> = table.results().iter().map(|r| r.model.as_str()).collect();
        assert_eq!(names, vec!["knn", "rf"]);

        let df = table.to_dataframe().unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["model", "train_time", "test_time", "mape"]);
        assert_eq!(df.column("mape").unwrap().dtype(), &DataType::Float64);
        assert!(table.best().is_some());
    }

    #[test]
    fn test_preprocessing_failure_yields_none() {
        let broken = observations(96).drop("elec_cons").unwrap();
        assert!(harness().evaluate(&broken).unwrap().is_none());
    }

    #[test]
    fn test_batch_records_failures() {
        let good = observations(96);
        let broken = good.drop("timestamp").unwrap();
        let report = harness().evaluate_batch(vec![("a", good.clone()), ("b", broken), ("c", good)]);

        assert_eq!(report.n_succeeded(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].dataset, "b");
        assert_eq!(report.failures[0].stage, FailureStage::Preprocessing);
        assert!(!report.all_failed());

        let combined = report.combined().unwrap();
        assert_eq!(combined.height(), 4);
        assert_eq!(combined.get_column_names()[0].as_str(), "dataset");
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = EvaluationConfig::default().with_random_seed(7);
        config.save(&path).unwrap();
        assert_eq!(EvaluationConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_empty_roster_rejected() {
        assert!(EvaluationConfig::default().with_roster(Vec::new()).validate().is_err());
    }

    #[test]
    fn test_harness_with_empty_roster_errors() {
        let harness = EvaluationHarness::new(
            EvaluationConfig::default()
                .with_preprocessing(PreprocessingConfig::default().with_test_days(1))
                .with_roster(Vec::new()),
        );
        assert!(matches!(
            harness.evaluate(&observations(96)),
            Err(EnergyError::Config(_))
        ));

        let report = harness.evaluate_batch(vec![("a", observations(96))]);
        assert!(report.all_failed());
    }
}
