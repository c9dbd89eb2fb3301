//! Saved-run store.
//!
//! A completed run can be saved under a run id and exported later, replacing
//! implicit session state with an explicit caller-owned cache. Expiry is the
//! caller's policy: `sweep` deletes runs older than the given TTL.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use cohort_model::RunOutcome;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("run serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown run id: {0}")]
    UnknownRun(String),
}

/// Identifier of a saved run; doubles as the file stem on disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunId(String);

impl RunId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Directory-backed store of saved run outcomes.
#[derive(Debug)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    /// Open (creating if needed) a run store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self, ReportError> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Persist an outcome and return its run id.
    pub fn save(&self, outcome: &RunOutcome) -> Result<RunId, ReportError> {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let mut sequence = 0u32;
        let run_id = loop {
            let candidate = if sequence == 0 {
                RunId(format!("{stamp}"))
            } else {
                RunId(format!("{stamp}-{sequence:02}"))
            };
            if !self.path_for(&candidate).exists() {
                break candidate;
            }
            sequence += 1;
        };
        let json = serde_json::to_vec_pretty(outcome)?;
        fs::write(self.path_for(&run_id), json)?;
        debug!(run_id = %run_id, "run saved");
        Ok(run_id)
    }

    /// Load a saved outcome.
    pub fn load(&self, run_id: &RunId) -> Result<RunOutcome, ReportError> {
        let path = self.path_for(run_id);
        if !path.exists() {
            return Err(ReportError::UnknownRun(run_id.to_string()));
        }
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// All saved run ids, oldest first.
    pub fn list(&self) -> Result<Vec<RunId>, ReportError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(RunId(stem.to_string()));
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Delete runs older than `ttl`; returns how many were removed.
    pub fn sweep(&self, ttl: Duration) -> Result<usize, ReportError> {
        let now = SystemTime::now();
        let mut removed = 0;
        for run_id in self.list()? {
            let path = self.path_for(&run_id);
            let modified = fs::metadata(&path)?.modified()?;
            let expired = now
                .duration_since(modified)
                .map(|age| age > ttl)
                .unwrap_or(false);
            if expired {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn path_for(&self, run_id: &RunId) -> PathBuf {
        self.root.join(format!("{run_id}.json"))
    }
}
