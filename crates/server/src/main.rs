//! Property advisor server
//!
//! Serves investment scoring, the evaluation form and market insights over
//! HTTP, together with health and Prometheus metrics endpoints.

use advisor_lib::{
    artifact::ArtifactPaths,
    health::{Component, HealthRegistry},
    observability::{AdvisorLogger, AdvisorMetrics},
    Task,
};
use advisor_server::{api, config::ServerConfig};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting property-advisor");

    let config = ServerConfig::load()?;
    info!(
        port = config.api_port,
        models_dir = %config.models_dir.display(),
        "Server configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    for component in Component::ALL {
        health_registry.register(component).await;
    }

    // Artifacts and the dataset load lazily; only note what is missing now
    let paths = ArtifactPaths::in_dir(&config.models_dir);
    for task in Task::ALL {
        let path = paths.for_task(task);
        if !health_registry.check_file(task.component(), path).await {
            warn!(
                path = %path.display(),
                command = task.train_command(),
                "{} artifact missing", task
            );
        }
    }
    if !health_registry
        .check_file(Component::Dataset, &config.data_path)
        .await
    {
        warn!(path = %config.data_path.display(), "Dataset missing, insights unavailable");
    }

    let metrics = AdvisorMetrics::new();
    let logger = AdvisorLogger::new(&config.service_name);
    logger.log_startup(SERVER_VERSION, &config.models_dir, &config.data_path);

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        logger.clone(),
        &config.models_dir,
        &config.data_path,
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    return Err(e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
