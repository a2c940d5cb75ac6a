//! Local training commands

use advisor_lib::{
    dataset::{HousingDataset, DEFAULT_DATA_PATH},
    tracking::JsonlTracker,
    training::{Trainer, TrainingConfig, TrainingReport, DEFAULT_SEED, DEFAULT_TEST_SIZE},
    Task,
};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tabled::Tabled;

use crate::output::{print_info, print_json, print_success, print_table, OutputFormat};

/// Options shared by every `train` subcommand
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Processed housing dataset (CSV)
    #[arg(long, env = "ADVISOR_DATA_PATH", default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    /// Directory the pipeline artifacts are written to
    #[arg(long, env = "ADVISOR_MODELS_DIR", default_value = "models")]
    pub models_dir: PathBuf,

    /// Directory of the JSONL experiment logs
    #[arg(long, default_value = "mlruns")]
    pub tracking_dir: PathBuf,

    /// Seed for the split and the ensembles
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value_t = DEFAULT_TEST_SIZE)]
    pub test_size: f64,

    /// Number of boosting rounds (defaults: 200 classifier, 300 regressor)
    #[arg(long)]
    pub n_estimators: Option<usize>,

    /// Maximum tree depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Shrinkage applied to every tree
    #[arg(long)]
    pub learning_rate: Option<f64>,
}

impl TrainArgs {
    /// Training configuration with the overrides applied to both tasks
    pub fn training_config(&self) -> TrainingConfig {
        let mut config = TrainingConfig {
            models_dir: self.models_dir.clone(),
            test_size: self.test_size,
            ..TrainingConfig::default()
        }
        .with_seed(self.seed);

        for params in [&mut config.classifier_params, &mut config.regressor_params] {
            if let Some(n_estimators) = self.n_estimators {
                params.n_estimators = n_estimators;
            }
            if let Some(max_depth) = self.max_depth {
                params.max_depth = max_depth;
            }
            if let Some(learning_rate) = self.learning_rate {
                params.learning_rate = learning_rate;
            }
        }
        config
    }
}

/// Row for the training summary table
#[derive(Tabled)]
struct TrainingRow {
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Run ID")]
    run_id: String,
    #[tabled(rename = "Train")]
    train_rows: usize,
    #[tabled(rename = "Test")]
    test_rows: usize,
    #[tabled(rename = "Skipped")]
    skipped_rows: usize,
    #[tabled(rename = "Metrics")]
    metrics: String,
    #[tabled(rename = "Artifact")]
    artifact: String,
}

/// Train the pipelines for `tasks` in order and report each run
pub async fn train(tasks: Vec<Task>, args: TrainArgs, format: OutputFormat) -> Result<()> {
    anyhow::ensure!(
        args.test_size > 0.0 && args.test_size < 1.0,
        "--test-size must be between 0 and 1, got {}",
        args.test_size
    );

    if format == OutputFormat::Table {
        print_info(&format!("Loading dataset from {}", args.data.display()));
    }

    let tracking_dir = args.tracking_dir.clone();
    let reports = tokio::task::spawn_blocking(move || run_training(&tasks, &args))
        .await
        .context("Training task failed")??;

    match format {
        OutputFormat::Json => print_json(&reports)?,
        OutputFormat::Table => {
            let rows = reports.iter().map(training_row).collect();
            print_table(rows, "Nothing was trained");
            for report in &reports {
                print_success(&format!(
                    "{} pipeline saved to {}",
                    report.task,
                    report.artifact_path.display()
                ));
            }
            print_info(&format!("Runs logged under {}", tracking_dir.display()));
        }
    }

    Ok(())
}

fn run_training(tasks: &[Task], args: &TrainArgs) -> Result<Vec<TrainingReport>> {
    let dataset = HousingDataset::load(&args.data)?;
    let config = args.training_config();
    let tracker = JsonlTracker::new(&args.tracking_dir);
    let trainer = Trainer::new(&config, &tracker);

    tasks
        .iter()
        .map(|&task| {
            let report = match task {
                Task::Classification => trainer.train_classifier(&dataset),
                Task::Regression => trainer.train_regressor(&dataset),
            };
            report.with_context(|| format!("Training the {} pipeline failed", task.component()))
        })
        .collect()
}

fn training_row(report: &TrainingReport) -> TrainingRow {
    let metrics = report
        .metrics
        .pairs()
        .iter()
        .map(|(name, value)| format!("{}={:.4}", name, value))
        .collect::<Vec<_>>()
        .join("\n");

    TrainingRow {
        task: report.task.to_string(),
        run_id: report.run_id.clone(),
        train_rows: report.train_rows,
        test_rows: report.test_rows,
        skipped_rows: report.skipped_rows,
        metrics,
        artifact: report.artifact_path.display().to_string(),
    }
}
