//! Health tracking for the advisor service
//!
//! Each model artifact and the dataset is a component. A file that is not
//! there yet marks its component degraded; a failed load marks it
//! unhealthy; a successful load marks it healthy again.

use crate::error::AdvisorError;
use crate::pipeline::Task;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Something the service needs in order to answer requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Classifier,
    Regressor,
    Dataset,
}

impl Component {
    pub const ALL: [Component; 3] = [
        Component::Classifier,
        Component::Regressor,
        Component::Dataset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Classifier => "classifier",
            Component::Regressor => "regressor",
            Component::Dataset => "dataset",
        }
    }
}

impl From<Task> for Component {
    fn from(task: Task) -> Self {
        match task {
            Task::Classification => Component::Classifier,
            Task::Regression => Component::Regressor,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health status of a component, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Not usable yet, e.g. the artifact has not been trained
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<Component, ComponentHealth>,
}

impl HealthResponse {
    /// The worst status among `components`; healthy when there are none
    pub fn compute_status(components: &BTreeMap<Component, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|health| health.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }

    /// First unhealthy component, if any
    pub fn first_unhealthy(&self) -> Option<(Component, &ComponentHealth)> {
        self.components
            .iter()
            .find(|(_, health)| health.status == ComponentStatus::Unhealthy)
            .map(|(component, health)| (*component, health))
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct RegistryState {
    components: BTreeMap<Component, ComponentHealth>,
    started: bool,
}

/// Shared, cloneable view of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `component` as healthy
    pub async fn register(&self, component: Component) {
        self.set(component, ComponentHealth::healthy()).await;
    }

    pub async fn set(&self, component: Component, health: ComponentHealth) {
        self.state.write().await.components.insert(component, health);
    }

    pub async fn set_healthy(&self, component: Component) {
        self.set(component, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentHealth::unhealthy(message)).await;
    }

    /// Degrade `component` when `path` does not exist yet, otherwise mark it
    /// healthy. Returns whether the file exists.
    pub async fn check_file(&self, component: Component, path: &Path) -> bool {
        let exists = path.exists();
        let health = if exists {
            ComponentHealth::healthy()
        } else {
            ComponentHealth::degraded(format!("{} not found at {}", component, path.display()))
        };
        self.set(component, health).await;
        exists
    }

    /// Reflect the outcome of loading a component. Absent files degrade,
    /// anything else that fails is unhealthy.
    pub async fn record_load<T>(&self, component: Component, result: &Result<T, AdvisorError>) {
        let health = match result {
            Ok(_) => ComponentHealth::healthy(),
            Err(e @ AdvisorError::ArtifactNotFound { .. })
            | Err(e @ AdvisorError::DatasetNotFound { .. }) => {
                ComponentHealth::degraded(e.to_string())
            }
            Err(e) => ComponentHealth::unhealthy(e.to_string()),
        };
        self.set(component, health).await;
    }

    /// Mark startup as finished (or not)
    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.started = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.state.read().await.components.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Ready once startup is done, as long as nothing is unhealthy.
    /// Untrained models only degrade, so insights can still be served.
    pub async fn readiness(&self) -> ReadinessResponse {
        if !self.state.read().await.started {
            return ReadinessResponse {
                ready: false,
                reason: Some("Service not yet initialized".to_string()),
            };
        }

        let health = self.health().await;
        match health.first_unhealthy() {
            Some((component, detail)) => ReadinessResponse {
                ready: false,
                reason: Some(match &detail.message {
                    Some(message) => format!("{} unhealthy: {}", component, message),
                    None => format!("{} unhealthy", component),
                }),
            },
            None => ReadinessResponse {
                ready: true,
                reason: None,
            },
        }
    }
}
