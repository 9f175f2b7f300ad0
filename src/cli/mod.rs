//! Energy Bench CLI Module
//!
//! Command-line interface for preprocessing observation files and
//! benchmarking the model roster on them.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::evaluation::{EvaluationConfig, EvaluationHarness};
use crate::preprocessing::{EnergyPreprocessor, PreprocessingConfig};
use crate::utils::{targets_to_frame, DataLoader, DataSaver};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn bad(s: &str) -> ColoredString    { s.truecolor(235, 100, 100) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_fail(msg: &str) {
    println!("  {} {}", bad("✗"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "energy-bench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Building energy consumption forecasting benchmark")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Preprocess an observation file into train/test tables
    Preprocess {
        /// Input data file (CSV or JSON)
        #[arg(short, long)]
        data: PathBuf,

        /// Directory receiving train.csv, test.csv and the target files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Days held out for testing
        #[arg(long, default_value = "183")]
        test_days: u32,

        /// Keep features unscaled
        #[arg(long)]
        no_scale: bool,
    },

    /// Benchmark the model roster on one or more observation files
    Evaluate {
        /// Input data files (CSV or JSON)
        #[arg(short, long, num_args = 1.., required = true)]
        data: Vec<PathBuf>,

        /// Evaluation config (JSON) with preprocessing settings and roster
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed for randomized models, overrides the config
        #[arg(long)]
        seed: Option<u64>,

        /// Write every comparison table to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print or write the default model roster
    Roster {
        /// Output file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_preprocess(
    data_path: &Path,
    output_dir: &Path,
    test_days: u32,
    scale: bool,
) -> anyhow::Result<()> {
    section("Preprocess");

    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new().load_auto(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    let config = PreprocessingConfig::default()
        .with_test_days(test_days)
        .with_scaling(scale);
    config.validate()?;

    step_run("Processing");
    let start = Instant::now();
    let prepared = EnergyPreprocessor::new(config).preprocess(&df)?;
    step_done(&format!(
        "{} train / {} test rows, {} features in {:?}",
        prepared.train.height(),
        prepared.test.height(),
        prepared.n_features(),
        start.elapsed()
    ));

    std::fs::create_dir_all(output_dir)?;
    step_run(&format!("Saving → {}", output_dir.display()));
    let mut train = prepared.train.clone();
    let mut test = prepared.test.clone();
    let mut train_targets = targets_to_frame("elec_cons", &prepared.train_targets)?;
    let mut test_targets = targets_to_frame("elec_cons", &prepared.test_targets)?;
    DataSaver::save_csv(&mut train, output_dir.join("train.csv"))?;
    DataSaver::save_csv(&mut test, output_dir.join("test.csv"))?;
    DataSaver::save_csv(&mut train_targets, output_dir.join("train_targets.csv"))?;
    DataSaver::save_csv(&mut test_targets, output_dir.join("test_targets.csv"))?;
    step_done("4 files");

    println!();
    println!(
        "  {:<16} {}",
        muted("Interval"),
        format!("{:.0}s ({:.1}/day)", prepared.sampling.interval_seconds, prepared.sampling.observations_per_day).white()
    );
    println!("  {:<16} {}", muted("Test start"), prepared.split.test_start().to_string().white());
    println!();

    Ok(())
}

/// Returns true when every dataset failed
pub fn cmd_evaluate(
    data_paths: &[PathBuf],
    config_path: Option<&Path>,
    seed: Option<u64>,
    output: Option<&Path>,
) -> anyhow::Result<bool> {
    section("Evaluate");

    let mut config = match config_path {
        Some(path) => {
            step_run(&format!("Loading config {}", path.display()));
            let config = EvaluationConfig::load(path)?;
            step_done(&format!("{} models", config.roster.len()));
            config
        }
        None => EvaluationConfig::default(),
    };
    if let Some(seed) = seed {
        config = config.with_random_seed(seed);
    }
    config.validate()?;

    let harness = EvaluationHarness::new(config);
    let start = Instant::now();
    let report = harness.evaluate_files(data_paths, &DataLoader::new());

    for (name, table) in &report.tables {
        section(name);
        for line in table.to_string().lines() {
            println!("  {}", line);
        }
        if let Some(best) = table.best() {
            println!();
            step_ok(&format!("best: {} ({:.3}% MAPE)", best.model.cyan(), best.mape));
        }
    }

    if !report.failures.is_empty() {
        section("Failures");
        for failure in &report.failures {
            step_fail(&format!("{} [{}] {}", failure.dataset, failure.stage, dim(&failure.message)));
        }
    }

    if let Some(path) = output {
        let mut combined = report.combined()?;
        DataSaver::save_csv(&mut combined, path)?;
        println!();
        step_ok(&format!("results written to {}", path.display()));
    }

    println!();
    println!(
        "  {:<16} {}",
        muted("Datasets"),
        format!("{} ok, {} failed in {:?}", report.n_succeeded(), report.failures.len(), start.elapsed()).white()
    );
    println!();

    Ok(report.all_failed())
}

pub fn cmd_roster(output: Option<&Path>) -> anyhow::Result<()> {
    let config = EvaluationConfig::default();
    match output {
        Some(path) => {
            config.save(path)?;
            step_ok(&format!("roster written to {}", path.display()));
        }
        None => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}
