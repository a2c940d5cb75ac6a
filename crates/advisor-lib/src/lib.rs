//! Property investment advisor library
//!
//! This crate provides the core functionality for:
//! - Feature building and preprocessing of housing records
//! - Gradient-boosted classification and price regression
//! - Training runs, artifact persistence and experiment tracking
//! - Lazily loaded inference and the investment form
//! - Market insights over the historical dataset
//! - Health checks and observability

pub mod artifact;
pub mod boosting;
pub mod cache;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod health;
pub mod insights;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod predictor;
pub mod preprocessing;
pub mod tracking;
pub mod training;

#[cfg(test)]
mod testing;

pub use error::{AdvisorError, Result};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use models::*;
pub use observability::{AdvisorLogger, AdvisorMetrics};
pub use pipeline::Task;
pub use predictor::{InferenceService, Predictor};
