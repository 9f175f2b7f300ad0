//! Integration tests for the model runner and evaluation harness

use energy_bench::evaluation::{
    default_roster, run_model, EvaluationConfig, EvaluationHarness, FailureStage, ModelKind,
    ModelSpec,
};
use energy_bench::preprocessing::{preprocess, PreprocessingConfig};
use energy_bench::training::{
    BoostLoss, DistanceMetric, ElasticNetRegression, Gamma, KernelType, Regressor, WeightFunction,
};
use energy_bench::utils::DataLoader;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::io::Write;

// ============================================================================
// Fixtures
// ============================================================================

/// Hourly observations for one building; `offset` shifts the load profile
fn building(days: usize, offset: f64) -> DataFrame {
    let hours = days * 24;
    let timestamps: Vec<String> = (0..hours)
        .map(|h| format!("2019-06-{:02} {:02}:00:00", 1 + h / 24, h % 24))
        .collect();
    let consumption: Vec<f64> = (0..hours)
        .map(|h| {
            let hour = (h % 24) as f64;
            offset + 30.0 + 10.0 * (hour / 24.0 * std::f64::consts::TAU).sin().abs() + hour * 0.2
        })
        .collect();
    let sun: Vec<Option<&str>> = (0..hours)
        .map(|h| match h % 24 {
            5 => Some("rise"),
            20 => Some("set"),
            _ => None,
        })
        .collect();
    let week: Vec<&str> = (0..hours)
        .map(|h| if (h / 24) % 7 >= 5 { "weekend" } else { "weekday" })
        .collect();
    let num_time: Vec<f64> = (0..hours).map(|h| (h % 24) as f64).collect();
    let dow: Vec<i64> = (0..hours).map(|h| ((h / 24) % 7) as i64).collect();
    let temperature: Vec<f64> = (0..hours).map(|h| 15.0 + (h % 24) as f64 * 0.4).collect();

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

fn light_roster() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new(
            "elasticnet",
            ModelKind::ElasticNet {
                alpha: 0.01,
                l1_ratio: 0.5,
                max_iter: 500,
                tol: 1e-4,
            },
        ),
        ModelSpec::new(
            "knn",
            ModelKind::KNeighbors {
                n_neighbors: 3,
                weights: WeightFunction::Distance,
                metric: DistanceMetric::Euclidean,
            },
        ),
        ModelSpec::new(
            "svm",
            ModelKind::Svr {
                kernel: KernelType::RBF,
                gamma: Gamma::Scale,
                c: 1.0,
                epsilon: 0.1,
                tol: 1e-3,
                max_iter: 50,
            },
        ),
        ModelSpec::new(
            "rf",
            ModelKind::RandomForest {
                n_estimators: 8,
                max_depth: Some(6),
                max_features: None,
                bootstrap: true,
            },
        ),
        ModelSpec::new(
            "et",
            ModelKind::ExtraTrees {
                n_estimators: 8,
                max_depth: Some(6),
            },
        ),
        ModelSpec::new(
            "adaboost",
            ModelKind::AdaBoost {
                n_estimators: 20,
                learning_rate: 0.05,
                loss: BoostLoss::Exponential,
                max_depth: 3,
            },
        ),
    ]
}

fn light_harness() -> EvaluationHarness {
    EvaluationHarness::new(
        EvaluationConfig::default()
            .with_preprocessing(PreprocessingConfig::default().with_test_days(1))
            .with_roster(light_roster()),
    )
}

// ============================================================================
// Model runner
// ============================================================================

#[test]
fn test_runner_on_prepared_building() {
    let prepared = preprocess(&building(4, 0.0), 1, true).unwrap();
    let train_x = prepared.train_matrix().unwrap();
    let test_x = prepared.test_matrix().unwrap();

    let mut model = ElasticNetRegression::new(0.001, 0.5);
    let result = run_model(
        &mut model,
        &train_x,
        &prepared.train_targets,
        &test_x,
        &prepared.test_targets,
        "elasticnet",
    )
    .unwrap();

    assert!(model.is_fitted());
    assert_eq!(result.model, "elasticnet");
    assert!(result.mape.is_finite() && result.mape >= 0.0);
    assert!(result.mape < 50.0, "mape {}", result.mape);
}

#[test]
fn test_runner_rejects_zero_targets() {
    let x = Array2::from_shape_fn((6, 1), |(i, _)| i as f64);
    let y = Array1::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let test_y = Array1::from_vec(vec![0.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

    let mut model = ElasticNetRegression::default();
    assert!(run_model(&mut model, &x, &y, &x, &test_y, "elasticnet").is_err());
}

// ============================================================================
// Harness
// ============================================================================

#[test]
fn test_full_roster_table() {
    let table = light_harness().evaluate(&building(4, 0.0)).unwrap().unwrap();

    let names: Vec<&str> = table.results().iter().map(|r| r.model.as_str()).collect();
    assert_eq!(names, vec!["elasticnet", "knn", "svm", "rf", "et", "adaboost"]);

    let df = table.to_dataframe().unwrap();
    assert_eq!(df.height(), 6);
    for column in ["train_time", "test_time", "mape"] {
        assert_eq!(df.column(column).unwrap().dtype(), &DataType::Float64);
    }
    for result in table.results() {
        assert!(result.mape.is_finite());
        assert!(result.train_time >= 0.0 && result.test_time >= 0.0);
    }

    let best = table.best().unwrap();
    assert!(table.results().iter().all(|r| r.mape >= best.mape));
}

#[test]
fn test_seeded_evaluation_is_reproducible() {
    let data = building(4, 0.0);
    let a = light_harness().evaluate(&data).unwrap().unwrap();
    let b = light_harness().evaluate(&data).unwrap().unwrap();
    let mape_a: Vec<f64> = a.results().iter().map(|r| r.mape).collect();
    let mape_b: Vec<f64> = b.results().iter().map(|r| r.mape).collect();
    assert_eq!(mape_a, mape_b);
}

#[test]
fn test_batch_of_five_with_one_malformed() {
    let mut datasets: Vec<(String, DataFrame)> = (0..5)
        .map(|i| (format!("building_{i}"), building(3, i as f64 * 5.0)))
        .collect();
    datasets[2].1 = datasets[2].1.drop("elec_cons").unwrap();

    let report = light_harness().evaluate_batch(datasets);

    assert_eq!(report.n_succeeded(), 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].dataset, "building_2");
    assert_eq!(report.failures[0].stage, FailureStage::Preprocessing);
    assert!(report.failures[0].message.contains("elec_cons"));
    for (_, table) in &report.tables {
        assert_eq!(table.len(), 6);
    }

    let combined = report.combined().unwrap();
    assert_eq!(combined.height(), 24);
}

#[test]
fn test_model_failure_recorded_in_batch() {
    // more neighbours than training rows
    let roster = vec![ModelSpec::new(
        "knn",
        ModelKind::KNeighbors {
            n_neighbors: 10_000,
            weights: WeightFunction::Uniform,
            metric: DistanceMetric::Euclidean,
        },
    )];
    let harness = EvaluationHarness::new(
        EvaluationConfig::default()
            .with_preprocessing(PreprocessingConfig::default().with_test_days(1))
            .with_roster(roster),
    );

    assert!(harness.evaluate(&building(3, 0.0)).is_err());

    let report = harness.evaluate_batch(vec![("only", building(3, 0.0))]);
    assert!(report.all_failed());
    assert_eq!(report.failures[0].stage, FailureStage::Model);
}

#[test]
fn test_evaluate_files_records_load_failures() {
    let dir = tempfile::tempdir().unwrap();

    let good_path = dir.path().join("good.csv");
    let mut good = building(3, 0.0);
    let mut file = std::fs::File::create(&good_path).unwrap();
    CsvWriter::new(&mut file).finish(&mut good).unwrap();

    let bad_path = dir.path().join("bad.csv");
    let mut file = std::fs::File::create(&bad_path).unwrap();
    writeln!(file, "timestamp,temperature").unwrap();
    writeln!(file, "2019-06-01 00:00:00,12.0").unwrap();

    let missing_path = dir.path().join("missing.csv");

    let report = light_harness().evaluate_files(&[good_path, bad_path, missing_path], &DataLoader::new());
    assert_eq!(report.n_succeeded(), 1);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].stage, FailureStage::Preprocessing);
    assert_eq!(report.failures[1].stage, FailureStage::Load);
}

#[test]
fn test_default_roster_hyperparameters() {
    let roster = default_roster();
    assert_eq!(roster.len(), 6);
    match &roster[5].model {
        ModelKind::AdaBoost {
            n_estimators,
            learning_rate,
            loss,
            max_depth,
        } => {
            assert_eq!(*n_estimators, 1000);
            assert_eq!(*learning_rate, 0.05);
            assert_eq!(*loss, BoostLoss::Exponential);
            assert_eq!(*max_depth, 3);
        }
        other => panic!("unexpected roster entry {other:?}"),
    }
}
