//! Scoreline CLI Module
//!
//! Command-line interface for training and prediction.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::{
    load_csv, write_csv, DataIngestion, DataIngestionConfig, DataTransformation,
    DataTransformationConfig, DatasetSplit,
};
use crate::inference::{PredictConfig, PredictPipeline};
use crate::training::{EvaluationReport, ModelCatalogue, ModelTrainer, TrainerConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
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
#[command(name = "scoreline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a catalogue of regressors, keep the best, serve predictions")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a CSV, evaluate every model and persist the best one
    Train {
        /// Source CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// YAML file with hyperparameter grids
        #[arg(short, long, default_value = "config/params.yaml")]
        params: PathBuf,

        /// Train every model with its defaults, skipping grid search
        #[arg(long)]
        no_search: bool,

        /// Directory for data copies and artifacts
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// Minimum test R² for the best model
        #[arg(long, default_value = "0.6")]
        min_score: f64,

        /// Grid search folds
        #[arg(long, default_value = "3")]
        cv_folds: usize,

        /// Random seed for splitting and estimators
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Predict with the persisted preprocessor and model
    Predict {
        /// Input CSV file with feature columns
        #[arg(short, long)]
        data: PathBuf,

        /// Directory holding model.pkl and preprocessor.pkl
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// Output CSV (input columns plus `prediction`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Options for [`cmd_train`]
#[derive(Debug, Clone)]
pub struct TrainArgs {
    pub data: PathBuf,
    pub target: String,
    pub params: PathBuf,
    pub no_search: bool,
    pub artifacts: PathBuf,
    pub min_score: f64,
    pub cv_folds: usize,
    pub seed: u64,
}

pub fn cmd_train(args: &TrainArgs) -> anyhow::Result<()> {
    section("Train");

    step_run("Ingesting data");
    let start = Instant::now();
    let ingestion = DataIngestion::new(
        DataIngestionConfig::in_dir(&args.artifacts).with_random_state(args.seed),
    );
    let (train_path, test_path) = ingestion.initiate_data_ingestion(&args.data)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run("Fitting preprocessor");
    let start = Instant::now();
    let transformation = DataTransformation::new(
        DataTransformationConfig::default()
            .with_target(&args.target)
            .with_preprocessor_path(args.artifacts.join("preprocessor.pkl")),
    );
    let transformed = transformation.initiate_data_transformation(&train_path, &test_path)?;
    step_done(&format!(
        "{} train × {} test rows, {} features in {:?}",
        transformed.train.nrows(),
        transformed.test.nrows(),
        transformed.train.ncols() - 1,
        start.elapsed()
    ));

    let split = DatasetSplit::from_arrays(transformed.train, transformed.test)?;

    let config = TrainerConfig::new()
        .with_model_path(args.artifacts.join("model.pkl"))
        .with_min_score(args.min_score)
        .with_cv_folds(args.cv_folds)
        .with_random_state(Some(args.seed));
    let config = if args.no_search {
        config.without_params()
    } else {
        config.with_params_path(&args.params)
    };

    step_run("Evaluating models");
    let start = Instant::now();
    let outcome = ModelTrainer::new(config).run(&split, ModelCatalogue::default_regressors());
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            println!("{}", "failed".red());
            return Err(e.into());
        }
    };
    step_done(&format!("{:?}", start.elapsed()));

    print_report(&outcome.report, &outcome.selected.name);

    let report_path = args.artifacts.join("report.json");
    std::fs::write(&report_path, outcome.report.to_json()?)?;

    println!();
    println!(
        "  {:<16} {}",
        muted("Best model"),
        outcome.selected.name.as_str().white().bold()
    );
    println!(
        "  {:<16} {}",
        muted("Test R²"),
        format!("{:.4}", outcome.selected.score).white().bold()
    );
    println!(
        "  {:<16} {}",
        muted("Saved to"),
        outcome.selected.path.display().to_string().white()
    );
    println!();
    Ok(())
}

fn print_report(report: &EvaluationReport, winner: &str) {
    section("Results");
    println!(
        "  {:<24} {:>10} {:>10} {:>10} {:>9}",
        muted("Model"),
        muted("Train R²"),
        muted("Test R²"),
        muted("CV R²"),
        muted("Time")
    );
    for score in report.entries() {
        let cv = score
            .cv_score
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "-".to_string());
        let line = format!(
            "{:<24} {:>10.4} {:>10.4} {:>10} {:>8.2}s",
            score.name, score.train_r2, score.test_r2, cv, score.fit_seconds
        );
        if score.name == winner {
            println!("  {}", ok(&line).bold());
        } else {
            println!("  {}", line);
        }
    }
}

pub fn cmd_predict(data_path: &Path, artifacts: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading data");
    let start = Instant::now();
    let mut df = load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    step_run("Predicting");
    let start = Instant::now();
    let pipeline = PredictPipeline::new(PredictConfig::in_dir(artifacts));
    let predictions = pipeline.predict(&df)?;
    step_done(&format!("{} predictions in {:?}", predictions.len(), start.elapsed()));

    match output {
        Some(path) => {
            df.with_column(Column::new("prediction".into(), predictions.to_vec()))?;
            write_csv(path, &mut df)?;
            println!("  {} {}", ok("✓"), format!("Saved → {}", path.display()));
        }
        None => {
            println!();
            for (i, p) in predictions.iter().enumerate().take(20) {
                println!("  {:>6}  {}", dim(&i.to_string()), format!("{:.4}", p).white());
            }
            if predictions.len() > 20 {
                println!("  {}", dim(&format!("... {} more", predictions.len() - 20)));
            }
        }
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_reads_shipped_grids_by_default() {
        let cli = Cli::try_parse_from(["scoreline", "train", "--data", "students.csv", "--target", "math_score"]).unwrap();
        match cli.command {
            Commands::Train { params, no_search, .. } => {
                assert_eq!(params, PathBuf::from("config/params.yaml"));
                assert!(!no_search);
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_no_search_flag() {
        let cli = Cli::try_parse_from([
            "scoreline", "train", "--data", "s.csv", "--target", "y", "--no-search",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Train { no_search: true, .. }));
    }
}
