//! Server configuration

use advisor_lib::dataset::DEFAULT_DATA_PATH;
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

/// Optional config file looked up in the working directory
const CONFIG_FILE: &str = "advisor";

/// Server configuration
///
/// Read from `advisor.toml` (optional) and `ADVISOR_*` environment variables,
/// the latter taking precedence.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Processed historical dataset for insights
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Directory holding both pipeline artifacts
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Service name stamped on structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_api_port() -> u16 {
    8080
}

fn default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_service_name() -> String {
    "property-advisor".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            data_path: default_data_path(),
            models_dir: default_models_dir(),
            service_name: default_service_name(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix("ADVISOR"));
        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config = builder.build()?;

        Ok(config.try_deserialize().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid configuration, using defaults");
            ServerConfig::default()
        }))
    }
}
