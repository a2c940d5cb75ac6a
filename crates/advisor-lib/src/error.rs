//! Error taxonomy for the advisor library

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::Task;

/// Errors surfaced by training, inference and insights
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("{task} model file not found at {}. Run `{}` first.", .path.display(), .task.train_command())]
    ArtifactNotFound { task: Task, path: PathBuf },

    #[error("model artifact at {} is corrupt: {reason}", .path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("processed dataset not found at '{}'. Make sure this file exists locally.", .path.display())]
    DatasetNotFound { path: PathBuf },

    #[error("dataset is missing required columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("invalid input: {}", .0.join("; "))]
    InvalidInput(Vec<String>),

    #[error("dataset has no usable rows: {0}")]
    EmptyDataset(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdvisorError {
    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            AdvisorError::ArtifactNotFound { .. } => "artifact_not_found",
            AdvisorError::ArtifactCorrupt { .. } => "artifact_corrupt",
            AdvisorError::DatasetNotFound { .. } => "dataset_not_found",
            AdvisorError::MissingColumns { .. } => "missing_columns",
            AdvisorError::InvalidInput(_) => "invalid_input",
            AdvisorError::EmptyDataset(_) => "empty_dataset",
            AdvisorError::Io { .. } => "io_error",
            AdvisorError::Csv(_) => "csv_error",
            AdvisorError::Serialization(_) => "serialization_error",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AdvisorError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
