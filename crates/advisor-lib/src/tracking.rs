//! Experiment tracking
//!
//! Every training run records its parameters and held-out metrics under the
//! task's experiment name. The default sink appends JSON lines to
//! `<tracking_dir>/<experiment>.jsonl`.

use crate::error::{AdvisorError, Result};
use crate::pipeline::Task;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// One completed training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub experiment: String,
    pub task: Task,
    pub model_type: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub params: BTreeMap<String, serde_json::Value>,
    pub metrics: BTreeMap<String, f64>,
    pub artifact_path: Option<PathBuf>,
}

impl RunRecord {
    pub fn new(task: Task, started_at: DateTime<Utc>) -> Self {
        let experiment = task.experiment_name().to_string();
        Self {
            run_id: run_id(&experiment, started_at),
            experiment,
            task,
            model_type: task.model_type().to_string(),
            started_at,
            finished_at: started_at,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifact_path: None,
        }
    }
}

fn run_id(experiment: &str, started_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(experiment.as_bytes());
    hasher.update(started_at.to_rfc3339().as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

/// Destination for run records
pub trait TrackingSink: Send + Sync {
    fn log_run(&self, run: &RunRecord) -> Result<()>;
}

/// Append-only JSON-lines store, one file per experiment
pub struct JsonlTracker {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlTracker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn experiment_path(&self, experiment: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", experiment))
    }

    /// All runs recorded for `experiment`, oldest first
    pub fn runs(&self, experiment: &str) -> Result<Vec<RunRecord>> {
        let path = self.experiment_path(experiment);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&path).map_err(|e| AdvisorError::io(&path, e))?;
        let mut runs = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| AdvisorError::io(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            runs.push(serde_json::from_str(&line)?);
        }
        Ok(runs)
    }
}

impl TrackingSink for JsonlTracker {
    fn log_run(&self, run: &RunRecord) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        fs::create_dir_all(&self.dir).map_err(|e| AdvisorError::io(&self.dir, e))?;

        let path = self.experiment_path(&run.experiment);
        let mut line = serde_json::to_vec(run)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AdvisorError::io(&path, e))?;
        file.write_all(&line).map_err(|e| AdvisorError::io(&path, e))?;

        debug!(
            experiment = %run.experiment,
            run_id = %run.run_id,
            path = %path.display(),
            "Recorded training run"
        );
        Ok(())
    }
}

/// Sink that drops every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

impl TrackingSink for NoopTracker {
    fn log_run(&self, _run: &RunRecord) -> Result<()> {
        Ok(())
    }
}
