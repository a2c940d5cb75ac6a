//! Training runs for both pipelines
//!
//! Build features, drop rows without a usable target, split, fit the
//! preprocessor and ensemble on the training rows, evaluate on the held-out
//! rows, record the run, then persist the artifact.

use crate::artifact::{save_artifact, ArtifactHeader, ArtifactMetadata, ArtifactPaths};
use crate::boosting::{BoostingParams, GradientBoostedClassifier, GradientBoostedRegressor};
use crate::dataset::{stratified_split, train_test_split, HousingDataset, Split};
use crate::error::{AdvisorError, Result};
use crate::evaluation::{ClassificationMetrics, EvaluationMetrics, RegressionMetrics};
use crate::features::FeatureRow;
use crate::observability::AdvisorLogger;
use crate::pipeline::{Pipeline, Task};
use crate::preprocessing::Preprocessor;
use crate::tracking::{RunRecord, TrackingSink};
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

pub const DEFAULT_TEST_SIZE: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub models_dir: PathBuf,
    pub test_size: f64,
    pub seed: u64,
    pub classifier_params: BoostingParams,
    pub regressor_params: BoostingParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            test_size: DEFAULT_TEST_SIZE,
            seed: DEFAULT_SEED,
            classifier_params: BoostingParams::classifier(),
            regressor_params: BoostingParams::regressor(),
        }
    }
}

impl TrainingConfig {
    /// Use `seed` for both the split and the ensembles
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.classifier_params.seed = seed;
        self.regressor_params.seed = seed;
        self
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.models_dir)
    }
}

/// Outcome of one training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub task: Task,
    pub run_id: String,
    pub train_rows: usize,
    pub test_rows: usize,
    pub skipped_rows: usize,
    pub metrics: EvaluationMetrics,
    pub artifact_path: PathBuf,
    pub header: ArtifactHeader,
}

/// Drives training runs against one tracking sink
pub struct Trainer<'a> {
    config: &'a TrainingConfig,
    tracker: &'a dyn TrackingSink,
    logger: AdvisorLogger,
}

impl<'a> Trainer<'a> {
    pub fn new(config: &'a TrainingConfig, tracker: &'a dyn TrackingSink) -> Self {
        Self {
            config,
            tracker,
            logger: AdvisorLogger::new("property-advisor-trainer"),
        }
    }

    pub fn train_classifier(&self, dataset: &HousingDataset) -> Result<TrainingReport> {
        let started_at = Utc::now();
        let task = Task::Classification;
        let (rows, labels, skipped) = collect_rows(dataset, task, |l| l.good_investment)?;

        let split = stratified_split(&labels, self.config.test_size, self.config.seed);
        check_split(&split, task)?;

        let train_rows = pick(&rows, &split.train);
        let train_labels = pick(&labels, &split.train);
        let preprocessor = Preprocessor::fit(&train_rows);
        let matrix = preprocessor.transform(&train_rows);

        let params = &self.config.classifier_params;
        let model = GradientBoostedClassifier::fit(&matrix, &train_labels, params)?;
        let pipeline = Pipeline::new(preprocessor, model);

        let test_rows = pick(&rows, &split.test);
        let test_labels = pick(&labels, &split.test);
        let probabilities: Vec<f64> = test_rows.iter().map(|r| pipeline.predict_proba(r)).collect();
        let predictions: Vec<u8> = test_rows.iter().map(|r| pipeline.predict(r)).collect();
        let metrics = EvaluationMetrics::Classification(ClassificationMetrics::compute(
            &test_labels,
            &probabilities,
            &predictions,
        ));

        self.finish(task, pipeline, params, metrics, &split, skipped, started_at)
    }

    pub fn train_regressor(&self, dataset: &HousingDataset) -> Result<TrainingReport> {
        let started_at = Utc::now();
        let task = Task::Regression;
        let (rows, prices, skipped) = collect_rows(dataset, task, |l| l.price_in_lakhs)?;

        let split = train_test_split(rows.len(), self.config.test_size, self.config.seed);
        check_split(&split, task)?;

        let train_rows = pick(&rows, &split.train);
        let train_prices = pick(&prices, &split.train);
        let preprocessor = Preprocessor::fit(&train_rows);
        let matrix = preprocessor.transform(&train_rows);

        let params = &self.config.regressor_params;
        let model = GradientBoostedRegressor::fit(&matrix, &train_prices, params)?;
        let pipeline = Pipeline::new(preprocessor, model);

        let test_rows = pick(&rows, &split.test);
        let test_prices = pick(&prices, &split.test);
        let predictions: Vec<f64> = test_rows.iter().map(|r| pipeline.predict(r)).collect();
        let metrics =
            EvaluationMetrics::Regression(RegressionMetrics::compute(&test_prices, &predictions));

        self.finish(task, pipeline, params, metrics, &split, skipped, started_at)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish<M: crate::pipeline::Estimator>(
        &self,
        task: Task,
        pipeline: Pipeline<M>,
        params: &BoostingParams,
        metrics: EvaluationMetrics,
        split: &Split,
        skipped_rows: usize,
        started_at: chrono::DateTime<Utc>,
    ) -> Result<TrainingReport> {
        let artifact_path = self.config.artifact_paths().for_task(task).to_path_buf();

        let mut run = RunRecord::new(task, started_at);
        run.params = serde_json::to_value(params)?
            .as_object()
            .map(|o| o.clone().into_iter().collect())
            .unwrap_or_default();
        let test_size = serde_json::json!(self.config.test_size);
        run.params.insert("test_size".to_string(), test_size);
        run.metrics = metrics
            .pairs()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        run.artifact_path = Some(artifact_path.clone());
        run.finished_at = Utc::now();
        self.tracker.log_run(&run)?;

        let header = save_artifact(
            &artifact_path,
            &pipeline,
            ArtifactMetadata {
                created_at: run.finished_at,
                train_rows: split.train.len(),
                test_rows: split.test.len(),
                params: params.clone(),
                metrics,
            },
        )?;

        self.logger.log_training_completed(
            task,
            split.train.len(),
            split.test.len(),
            &metrics.pairs(),
            &artifact_path,
        );

        Ok(TrainingReport {
            task,
            run_id: run.run_id,
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            skipped_rows,
            metrics,
            artifact_path,
            header,
        })
    }
}

/// Feature rows and targets for listings whose target is usable
fn collect_rows<T: Copy>(
    dataset: &HousingDataset,
    task: Task,
    target: impl Fn(&crate::dataset::Listing) -> Option<T>,
) -> Result<(Vec<FeatureRow>, Vec<T>, usize)> {
    let mut rows = Vec::with_capacity(dataset.len());
    let mut targets = Vec::with_capacity(dataset.len());
    let mut skipped = 0;

    for listing in dataset.listings() {
        match target(listing) {
            Some(value) => {
                rows.push(FeatureRow::from_record(&listing.record));
                targets.push(value);
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(
            task = task.as_str(),
            skipped = skipped,
            "Dropped rows with a missing or unreadable target"
        );
    }
    if rows.is_empty() {
        return Err(AdvisorError::EmptyDataset(format!(
            "no rows with a usable {} target",
            task.as_str()
        )));
    }

    info!(task = task.as_str(), rows = rows.len(), "Prepared training rows");
    Ok((rows, targets, skipped))
}

fn check_split(split: &Split, task: Task) -> Result<()> {
    if split.train.is_empty() || split.test.is_empty() {
        return Err(AdvisorError::EmptyDataset(format!(
            "{} split left {} training and {} test rows",
            task.as_str(),
            split.train.len(),
            split.test.len()
        )));
    }
    Ok(())
}

fn pick<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}
