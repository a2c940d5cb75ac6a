//! Observability for the advisor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, artifact loads, request counts, model version)
//! - Structured JSON logging with tracing

use crate::pipeline::Task;
use prometheus::{
    register_gauge_vec, register_histogram, register_histogram_vec, register_int_counter,
    register_int_counter_vec, GaugeVec, Histogram, HistogramVec, IntCounter, IntCounterVec,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing::{info, warn};

/// Latency buckets in seconds
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AdvisorMetricsInner> = OnceLock::new();

struct AdvisorMetricsInner {
    prediction_latency_seconds: Histogram,
    artifact_load_seconds: HistogramVec,
    predictions_total: IntCounter,
    prediction_errors_total: IntCounterVec,
    validation_rejections_total: IntCounter,
    insights_requests_total: IntCounter,
    model_version_info: GaugeVec,
    current_versions: Mutex<HashMap<Task, String>>,
}

impl AdvisorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "property_advisor_prediction_latency_seconds",
                "Time spent scoring a single property with both pipelines",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            artifact_load_seconds: register_histogram_vec!(
                "property_advisor_artifact_load_seconds",
                "Time spent loading and verifying a model artifact",
                &["task"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register artifact_load_seconds"),

            predictions_total: register_int_counter!(
                "property_advisor_predictions_total",
                "Total number of properties scored"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "property_advisor_prediction_errors_total",
                "Total number of failed scoring attempts by error code",
                &["code"]
            )
            .expect("Failed to register prediction_errors_total"),

            validation_rejections_total: register_int_counter!(
                "property_advisor_validation_rejections_total",
                "Total number of form submissions rejected by validation"
            )
            .expect("Failed to register validation_rejections_total"),

            insights_requests_total: register_int_counter!(
                "property_advisor_insights_requests_total",
                "Total number of market insight computations"
            )
            .expect("Failed to register insights_requests_total"),

            model_version_info: register_gauge_vec!(
                "property_advisor_model_version_info",
                "Checksum prefix of the loaded artifact per task",
                &["task", "version"]
            )
            .expect("Failed to register model_version_info"),

            current_versions: Mutex::new(HashMap::new()),
        }
    }
}

/// Advisor metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct AdvisorMetrics {
    _private: (),
}

impl Default for AdvisorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvisorMetrics {
    /// Create a handle, registering the global metrics on first call
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AdvisorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AdvisorMetricsInner {
        GLOBAL_METRICS.get_or_init(AdvisorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
        self.inner().predictions_total.inc();
    }

    pub fn observe_artifact_load(&self, task: Task, duration_secs: f64) {
        self.inner()
            .artifact_load_seconds
            .with_label_values(&[task.as_str()])
            .observe(duration_secs);
    }

    pub fn inc_prediction_errors(&self, code: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[code])
            .inc();
    }

    pub fn inc_validation_rejections(&self) {
        self.inner().validation_rejections_total.inc();
    }

    pub fn inc_insights_requests(&self) {
        self.inner().insights_requests_total.inc();
    }

    /// Record the version of the artifact now serving `task`
    pub fn set_model_version(&self, task: Task, version: &str) {
        let inner = self.inner();
        let mut current = inner
            .current_versions
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        // Drop the previous version for this task
        if let Some(previous) = current.insert(task, version.to_string()) {
            let _ = inner
                .model_version_info
                .remove_label_values(&[task.as_str(), previous.as_str()]);
        }
        inner
            .model_version_info
            .with_label_values(&[task.as_str(), version])
            .set(1.0);
    }

    pub fn predictions_total(&self) -> u64 {
        self.inner().predictions_total.get()
    }
}

/// Structured logger for advisor events
///
/// Consistent JSON-formatted events for predictions, model loads, training
/// runs and service lifecycle.
#[derive(Clone)]
pub struct AdvisorLogger {
    service: String,
}

impl AdvisorLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Log a scored property
    pub fn log_prediction(
        &self,
        city: &str,
        property_type: &str,
        good_investment_label: u8,
        good_investment_prob: f64,
        predicted_price_lakhs: f64,
        latency_ms: f64,
    ) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            city = %city,
            property_type = %property_type,
            good_investment_label = good_investment_label,
            good_investment_prob = good_investment_prob,
            predicted_price_lakhs = predicted_price_lakhs,
            latency_ms = latency_ms,
            "Scored property"
        );
    }

    pub fn log_model_loaded(&self, task: Task, path: &Path, checksum: &str, load_ms: f64) {
        info!(
            event = "model_loaded",
            service = %self.service,
            task = task.as_str(),
            path = %path.display(),
            checksum = %checksum,
            load_ms = load_ms,
            "Model artifact loaded"
        );
    }

    pub fn log_model_load_failed(&self, task: Task, path: &Path, error: &str) {
        warn!(
            event = "model_load_failed",
            service = %self.service,
            task = task.as_str(),
            path = %path.display(),
            error = %error,
            "Model artifact could not be loaded"
        );
    }

    /// Log a finished training run with its held-out metrics
    pub fn log_training_completed(
        &self,
        task: Task,
        train_rows: usize,
        test_rows: usize,
        metrics: &[(&'static str, f64)],
        artifact: &Path,
    ) {
        let metrics = metrics
            .iter()
            .map(|(name, value)| format!("{}={:.4}", name, value))
            .collect::<Vec<_>>()
            .join(" ");
        info!(
            event = "training_completed",
            service = %self.service,
            task = task.as_str(),
            train_rows = train_rows,
            test_rows = test_rows,
            metrics = %metrics,
            artifact = %artifact.display(),
            "Training run completed"
        );
    }

    pub fn log_insights(&self, matched: usize, total: usize) {
        info!(
            event = "insights_computed",
            service = %self.service,
            matched = matched,
            total = total,
            "Market insights computed"
        );
    }

    pub fn log_startup(&self, version: &str, models_dir: &Path, data_path: &Path) {
        info!(
            event = "server_started",
            service = %self.service,
            version = %version,
            models_dir = %models_dir.display(),
            data_path = %data_path.display(),
            "Property advisor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "server_shutdown",
            service = %self.service,
            reason = %reason,
            "Property advisor shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advisor_metrics_creation() {
        let metrics = AdvisorMetrics::new();
        let before = metrics.predictions_total();

        metrics.observe_prediction_latency(0.002);
        metrics.observe_artifact_load(Task::Classification, 0.05);
        metrics.inc_prediction_errors("artifact_not_found");
        metrics.inc_validation_rejections();
        metrics.inc_insights_requests();
        metrics.set_model_version(Task::Regression, "abc123");

        assert!(metrics.predictions_total() > before);
    }

    #[test]
    fn test_logger_creation() {
        let logger = AdvisorLogger::new("property-advisor");
        assert_eq!(logger.service(), "property-advisor");
    }
}
