//! HTTP API: health, metrics, scoring, the investment form and market insights

use advisor_lib::{
    dataset::{CachedDataset, HousingDataset},
    health::{Component, ComponentStatus, HealthRegistry},
    insights::{compute_insights, FilterOptions, InsightFilter, InsightReport},
    observability::{AdvisorLogger, AdvisorMetrics},
    predictor::{evaluate_investment, InvestmentAssessment, InvestmentQuery, ModelSummary},
    AdvisorError, ErrorBody, InferenceService, PredictionResult, Predictor, PropertyRecord, Task,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: AdvisorMetrics,
    pub logger: AdvisorLogger,
    pub inference: Arc<InferenceService>,
    pub dataset: Arc<CachedDataset>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: AdvisorMetrics,
        logger: AdvisorLogger,
        models_dir: impl Into<PathBuf>,
        data_path: impl Into<PathBuf>,
    ) -> Self {
        let inference = InferenceService::from_models_dir(models_dir.into())
            .with_logger(logger.clone());
        Self {
            health_registry,
            metrics,
            logger,
            inference: Arc::new(inference),
            dataset: Arc::new(CachedDataset::new(data_path)),
        }
    }

    /// Reflect a model call in the health of the artifact it touched
    async fn track_models<T>(&self, result: &advisor_lib::Result<T>) {
        match result {
            Ok(_) => {
                for task in Task::ALL {
                    self.health_registry.set_healthy(task.component()).await;
                }
            }
            Err(e) => {
                if let Some(task) = self.failed_task(e) {
                    self.health_registry
                        .record_load(task.component(), result)
                        .await;
                }
            }
        }
    }

    fn failed_task(&self, error: &AdvisorError) -> Option<Task> {
        match error {
            AdvisorError::ArtifactNotFound { task, .. } => Some(*task),
            AdvisorError::ArtifactCorrupt { path, .. } => Task::ALL
                .into_iter()
                .find(|&task| self.inference.paths().for_task(task) == path.as_path()),
            _ => None,
        }
    }

    /// Load (or reuse) the dataset and track its health
    async fn load_dataset(&self) -> Result<Arc<HousingDataset>, ApiError> {
        let dataset = Arc::clone(&self.dataset);
        let result = blocking(move || dataset.get()).await?;
        self.health_registry
            .record_load(Component::Dataset, &result)
            .await;
        Ok(result?)
    }
}

/// Error response carrying an HTTP status and an [`ErrorBody`]
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                code: code.to_string(),
                details: None,
            },
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl From<AdvisorError> for ApiError {
    fn from(err: AdvisorError) -> Self {
        let status = match &err {
            AdvisorError::ArtifactNotFound { .. } | AdvisorError::DatasetNotFound { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AdvisorError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let mut api_error = Self::new(status, err.code(), err.to_string());
        if let AdvisorError::InvalidInput(problems) = err {
            api_error.body.details = Some(problems);
        }
        api_error
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "invalid_body",
            rejection.body_text(),
        )
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "invalid_query",
            rejection.body_text(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = %self.body.code, error = %self.body.error, "Request failed");
        }
        (self.status, Json(self.body)).into_response()
    }
}

/// Run CPU or file work off the async executor
async fn blocking<T, F>(f: F) -> Result<advisor_lib::Result<T>, ApiError>
where
    F: FnOnce() -> advisor_lib::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {}", e)))
}

/// Health check response - returns 200 unless a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Untrained models still serve insights
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::internal(format!("failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Score a raw property record with both pipelines
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PropertyRecord>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(record) = payload?;
    let inference = Arc::clone(&state.inference);

    let result = blocking(move || inference.score(&record)).await?;
    state.track_models(&result).await;

    Ok(Json(result?))
}

/// Validate and assess an investment form submission
async fn evaluate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InvestmentQuery>, JsonRejection>,
) -> Result<Json<InvestmentAssessment>, ApiError> {
    let Json(query) = payload?;
    let inference = Arc::clone(&state.inference);

    let result = blocking(move || evaluate_investment(inference.as_ref(), &query)).await?;
    match &result {
        Err(AdvisorError::InvalidInput(_)) => state.metrics.inc_validation_rejections(),
        _ => state.track_models(&result).await,
    }

    Ok(Json(result?))
}

/// Market insights over the listings matching the query filter
async fn insights(
    State(state): State<Arc<AppState>>,
    filter: Result<Query<InsightFilter>, QueryRejection>,
) -> Result<Json<InsightReport>, ApiError> {
    let Query(filter) = filter?;
    let dataset = state.load_dataset().await?;
    let total = dataset.len();

    let report = tokio::task::spawn_blocking(move || compute_insights(&dataset, &filter))
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {}", e)))?;

    state.metrics.inc_insights_requests();
    state.logger.log_insights(report.kpis.listings, total);

    Ok(Json(report))
}

/// Values available to the insight filters
async fn insight_filters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FilterOptions>, ApiError> {
    let dataset = state.load_dataset().await?;
    Ok(Json(FilterOptions::from_dataset(&dataset)))
}

/// Artifact status for both pipelines
async fn models(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ModelSummary>>, ApiError> {
    let inference = Arc::clone(&state.inference);
    let summaries = tokio::task::spawn_blocking(move || inference.model_summaries())
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {}", e)))?;
    Ok(Json(summaries))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/evaluate", post(evaluate))
        .route("/api/v1/insights", get(insights))
        .route("/api/v1/insights/filters", get(insight_filters))
        .route("/api/v1/models", get(models))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
