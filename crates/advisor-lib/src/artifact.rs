//! Model artifact persistence
//!
//! An artifact is one JSON header line followed by the serialized pipeline.
//! The header carries the SHA-256 of the payload bytes, so a truncated or
//! hand-edited file is rejected on load instead of producing bad scores.

use crate::boosting::BoostingParams;
use crate::error::{AdvisorError, Result};
use crate::evaluation::EvaluationMetrics;
use crate::pipeline::{Estimator, Pipeline, Task};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Training facts recorded alongside a fitted pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub created_at: DateTime<Utc>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub params: BoostingParams,
    pub metrics: EvaluationMetrics,
}

/// First line of every artifact file. The metadata fields sit at the top
/// level of the JSON object next to the checksum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub format_version: u32,
    pub task: Task,
    pub model_type: String,
    pub checksum: String,
    pub payload_bytes: usize,
    #[serde(flatten)]
    pub metadata: ArtifactMetadata,
}

/// Default artifact locations for both tasks
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub classifier: PathBuf,
    pub regressor: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(models_dir: impl AsRef<Path>) -> Self {
        let dir = models_dir.as_ref();
        Self {
            classifier: dir.join(Task::Classification.artifact_file_name()),
            regressor: dir.join(Task::Regression.artifact_file_name()),
        }
    }

    pub fn for_task(&self, task: Task) -> &Path {
        match task {
            Task::Classification => &self.classifier,
            Task::Regression => &self.regressor,
        }
    }
}

/// Write `pipeline` to `path`, replacing any existing artifact atomically
pub fn save_artifact<M: Estimator>(
    path: &Path,
    pipeline: &Pipeline<M>,
    metadata: ArtifactMetadata,
) -> Result<ArtifactHeader> {
    let payload = serde_json::to_vec(pipeline)?;
    let header = ArtifactHeader {
        format_version: ARTIFACT_FORMAT_VERSION,
        task: M::TASK,
        model_type: M::TASK.model_type().to_string(),
        checksum: compute_checksum(&payload),
        payload_bytes: payload.len(),
        metadata,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AdvisorError::io(parent, e))?;
    }

    // Write to temp file first
    let temp_path = path.with_extension("json.tmp");
    let mut file = File::create(&temp_path).map_err(|e| AdvisorError::io(&temp_path, e))?;
    let mut header_line = serde_json::to_vec(&header)?;
    header_line.push(b'\n');
    file.write_all(&header_line)
        .and_then(|_| file.write_all(&payload))
        .and_then(|_| file.sync_all())
        .map_err(|e| AdvisorError::io(&temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| AdvisorError::io(path, e))?;

    info!(
        task = M::TASK.as_str(),
        path = %path.display(),
        bytes = header.payload_bytes,
        checksum = %header.checksum,
        "Saved model artifact"
    );
    Ok(header)
}

/// Load and verify an artifact for estimator type `M`
pub fn load_artifact<M: Estimator>(path: &Path) -> Result<(ArtifactHeader, Pipeline<M>)> {
    if !path.exists() {
        return Err(AdvisorError::ArtifactNotFound {
            task: M::TASK,
            path: path.to_path_buf(),
        });
    }

    let mut reader = BufReader::new(File::open(path).map_err(|e| AdvisorError::io(path, e))?);
    let header = parse_header(path, &mut reader)?;
    if header.task != M::TASK {
        return Err(corrupt(
            path,
            format!(
                "expected a {} artifact, found {}",
                M::TASK.as_str(),
                header.task.as_str()
            ),
        ));
    }

    let mut payload = Vec::with_capacity(header.payload_bytes);
    reader
        .read_to_end(&mut payload)
        .map_err(|e| AdvisorError::io(path, e))?;

    let checksum = compute_checksum(&payload);
    if checksum != header.checksum {
        return Err(corrupt(
            path,
            format!(
                "checksum mismatch: expected {}, got {}",
                header.checksum, checksum
            ),
        ));
    }

    let pipeline: Pipeline<M> = serde_json::from_slice(&payload)
        .map_err(|e| corrupt(path, format!("payload does not decode: {}", e)))?;

    debug!(
        task = M::TASK.as_str(),
        path = %path.display(),
        "Loaded model artifact"
    );
    Ok((header, pipeline))
}

/// Read only the header line, for listings
pub fn read_header(path: &Path, task: Task) -> Result<ArtifactHeader> {
    if !path.exists() {
        return Err(AdvisorError::ArtifactNotFound {
            task,
            path: path.to_path_buf(),
        });
    }
    let mut reader = BufReader::new(File::open(path).map_err(|e| AdvisorError::io(path, e))?);
    parse_header(path, &mut reader)
}

fn parse_header<R: BufRead>(path: &Path, reader: &mut R) -> Result<ArtifactHeader> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| AdvisorError::io(path, e))?;
    if line.trim().is_empty() {
        return Err(corrupt(path, "missing header line".to_string()));
    }

    let header: ArtifactHeader = serde_json::from_str(line.trim_end())
        .map_err(|e| corrupt(path, format!("unreadable header: {}", e)))?;
    if header.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(corrupt(
            path,
            format!("unsupported format version {}", header.format_version),
        ));
    }
    Ok(header)
}

fn corrupt(path: &Path, reason: String) -> AdvisorError {
    AdvisorError::ArtifactCorrupt {
        path: path.to_path_buf(),
        reason,
    }
}

/// SHA-256 hex digest
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
