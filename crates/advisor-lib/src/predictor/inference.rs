//! Inference over the persisted pipelines
//!
//! Both artifacts are loaded on first use and shared for the rest of the
//! process. A missing artifact fails the call with a message naming the
//! path and the training command; it is retried on the next call.

use super::Predictor;
use crate::artifact::{load_artifact, read_header, ArtifactHeader, ArtifactPaths};
use crate::boosting::{label_for, GradientBoostedClassifier, GradientBoostedRegressor};
use crate::cache::LazyLoad;
use crate::error::Result;
use crate::features::FeatureRow;
use crate::models::{PredictionResult, PropertyRecord};
use crate::observability::{AdvisorLogger, AdvisorMetrics};
use crate::pipeline::{Estimator, Pipeline, Task};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Latency above which a single scoring call is logged as slow
const SLOW_INFERENCE_MS: f64 = 50.0;

/// A verified pipeline together with its header
#[derive(Debug)]
pub struct LoadedPipeline<M> {
    pub header: ArtifactHeader,
    pub pipeline: Pipeline<M>,
}

/// Artifact status for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub task: Task,
    pub path: String,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<ArtifactHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub failed_inferences: u64,
    pub slow_inferences: u64,
}

/// Scores properties with the classifier and regressor pipelines
pub struct InferenceService {
    paths: ArtifactPaths,
    classifier: LazyLoad<LoadedPipeline<GradientBoostedClassifier>>,
    regressor: LazyLoad<LoadedPipeline<GradientBoostedRegressor>>,
    metrics: AdvisorMetrics,
    logger: AdvisorLogger,
    inference_count: AtomicU64,
    failed_count: AtomicU64,
    slow_count: AtomicU64,
}

impl InferenceService {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            classifier: LazyLoad::new(),
            regressor: LazyLoad::new(),
            metrics: AdvisorMetrics::new(),
            logger: AdvisorLogger::new("property-advisor"),
            inference_count: AtomicU64::new(0),
            failed_count: AtomicU64::new(0),
            slow_count: AtomicU64::new(0),
        }
    }

    pub fn from_models_dir(models_dir: impl AsRef<Path>) -> Self {
        Self::new(ArtifactPaths::in_dir(models_dir))
    }

    pub fn with_logger(mut self, logger: AdvisorLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn classifier(&self) -> Result<Arc<LoadedPipeline<GradientBoostedClassifier>>> {
        self.load(&self.classifier)
    }

    pub fn regressor(&self) -> Result<Arc<LoadedPipeline<GradientBoostedRegressor>>> {
        self.load(&self.regressor)
    }

    fn load<M: Estimator>(
        &self,
        cache: &LazyLoad<LoadedPipeline<M>>,
    ) -> Result<Arc<LoadedPipeline<M>>> {
        let path = self.paths.for_task(M::TASK);
        cache.get_or_try_load(|| {
            let start = Instant::now();
            match load_artifact::<M>(path) {
                Ok((header, pipeline)) => {
                    let elapsed = start.elapsed();
                    let version = &header.checksum[..12.min(header.checksum.len())];
                    self.metrics
                        .observe_artifact_load(M::TASK, elapsed.as_secs_f64());
                    self.metrics.set_model_version(M::TASK, version);
                    self.logger.log_model_loaded(
                        M::TASK,
                        path,
                        &header.checksum,
                        elapsed.as_secs_f64() * 1000.0,
                    );
                    Ok(LoadedPipeline { header, pipeline })
                }
                Err(e) => {
                    self.logger
                        .log_model_load_failed(M::TASK, path, &e.to_string());
                    Err(e)
                }
            }
        })
    }

    pub fn is_loaded(&self, task: Task) -> bool {
        match task {
            Task::Classification => self.classifier.is_loaded(),
            Task::Regression => self.regressor.is_loaded(),
        }
    }

    /// Score an already-built feature row
    pub fn score_row(&self, row: &FeatureRow) -> Result<PredictionResult> {
        let classifier = self.classifier()?;
        let regressor = self.regressor()?;

        let good_investment_prob = classifier.pipeline.predict_proba(row);
        Ok(PredictionResult {
            good_investment_label: label_for(good_investment_prob),
            good_investment_prob,
            predicted_price_lakhs: regressor.pipeline.predict(row),
        })
    }

    /// Header and load state of both artifacts, read without loading payloads
    pub fn model_summaries(&self) -> Vec<ModelSummary> {
        Task::ALL
            .iter()
            .map(|&task| {
                let path = self.paths.for_task(task);
                let (header, error) = match read_header(path, task) {
                    Ok(header) => (Some(header), None),
                    Err(e) => (None, Some(e.to_string())),
                };
                ModelSummary {
                    task,
                    path: path.display().to_string(),
                    loaded: self.is_loaded(task),
                    header,
                    error,
                }
            })
            .collect()
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            failed_inferences: self.failed_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_count.load(Ordering::Relaxed),
        }
    }
}

impl Predictor for InferenceService {
    fn score(&self, record: &PropertyRecord) -> Result<PredictionResult> {
        let start = Instant::now();
        let row = FeatureRow::from_record(record);

        let result = match self.score_row(&row) {
            Ok(result) => result,
            Err(e) => {
                self.failed_count.fetch_add(1, Ordering::Relaxed);
                self.metrics.inc_prediction_errors(e.code());
                return Err(e);
            }
        };

        let elapsed = start.elapsed();
        let latency_ms = elapsed.as_secs_f64() * 1000.0;
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
        if latency_ms > SLOW_INFERENCE_MS {
            self.slow_count.fetch_add(1, Ordering::Relaxed);
            warn!(latency_ms = latency_ms, "Slow inference");
        }

        self.logger.log_prediction(
            &row.categorical[0],
            &row.categorical[2],
            result.good_investment_label,
            result.good_investment_prob,
            result.predicted_price_lakhs,
            latency_ms,
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisorError;
    use crate::testing::{sample_record, train_fixture_models};
    use tempfile::TempDir;

    #[test]
    fn test_missing_artifact_names_path_and_command() {
        let dir = TempDir::new().unwrap();
        let service = InferenceService::from_models_dir(dir.path());

        let err = service.score(&sample_record()).unwrap_err();
        assert!(matches!(err, AdvisorError::ArtifactNotFound { .. }));
        let message = err.to_string();
        assert!(message.contains("classifier_pipeline.json"));
        assert!(message.contains("advisor train classifier"));
        assert_eq!(service.stats().failed_inferences, 1);
        assert!(!service.is_loaded(Task::Classification));
    }

    #[test]
    fn test_score_sample_record() {
        let dir = TempDir::new().unwrap();
        train_fixture_models(dir.path());
        let service = InferenceService::from_models_dir(dir.path());

        let result = service.score(&sample_record()).unwrap();
        assert!(result.good_investment_label <= 1);
        assert!((0.0..=1.0).contains(&result.good_investment_prob));
        assert!(result.predicted_price_lakhs > 0.0);
        assert_eq!(
            result.good_investment_label,
            u8::from(result.good_investment_prob > 0.5)
        );
        assert!(service.is_loaded(Task::Classification));
        assert!(service.is_loaded(Task::Regression));
        assert_eq!(service.stats().total_inferences, 1);
    }

    #[test]
    fn test_unknown_categories_do_not_fail() {
        let dir = TempDir::new().unwrap();
        train_fixture_models(dir.path());
        let service = InferenceService::from_models_dir(dir.path());

        let mut record = sample_record();
        record.city = "Atlantis".into();
        record.locality = "Nowhere".into();
        record.bhk = "12".into();
        record.size_in_sqft = "not a number".into();
        assert!(service.score(&record).is_ok());
    }

    #[test]
    fn test_training_after_failure_recovers() {
        let dir = TempDir::new().unwrap();
        let service = InferenceService::from_models_dir(dir.path());
        assert!(service.score(&sample_record()).is_err());

        train_fixture_models(dir.path());
        assert!(service.score(&sample_record()).is_ok());
    }

    #[test]
    fn test_model_summaries() {
        let dir = TempDir::new().unwrap();
        train_fixture_models(dir.path());
        let service = InferenceService::from_models_dir(dir.path());

        let summaries = service.model_summaries();
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.header.is_some() && !s.loaded));

        service.score(&sample_record()).unwrap();
        assert!(service.model_summaries().iter().all(|s| s.loaded));
    }

    #[test]
    fn test_concurrent_scoring_shares_one_load() {
        let dir = TempDir::new().unwrap();
        train_fixture_models(dir.path());
        let service = Arc::new(InferenceService::from_models_dir(dir.path()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || service.score(&sample_record()).unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));

        let first = service.classifier().unwrap();
        let second = service.classifier().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
