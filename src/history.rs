//! Recorded build results and previous-build lookup.
//!
//! The history file is a JSON document kept next to the repository (default
//! `.riskgate/history.json`). Records are sorted by build number; recording a
//! build number twice replaces the earlier record.

use crate::collect::BuildResult;
use crate::error::{Result, RiskgateError};
use crate::models::BuildOutcome;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub number: u32,
    pub outcome: BuildOutcome,
    /// Absent when the build ran without analysis results.
    #[serde(default)]
    pub result: Option<BuildResult>,
}

/// Walk backward from `current_build`, skipping builds without a stored
/// result and builds that were not built, and return the first result found.
pub fn find_previous_result(history: &[BuildRecord], current_build: u32) -> Option<&BuildRecord> {
    history
        .iter()
        .filter(|r| r.number < current_build)
        .rev()
        .find(|r| r.result.is_some() && r.outcome != BuildOutcome::NotBuilt)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    pub builds: Vec<BuildRecord>,
}

impl History {
    /// Load from `path`; a missing file is an empty history.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no history file yet");
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).map_err(|e| RiskgateError::io(path, e))?;
        let mut history: History =
            serde_json::from_str(&data).map_err(|e| RiskgateError::History {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        history.builds.sort_by_key(|r| r.number);
        Ok(history)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|e| RiskgateError::io(dir, e))?;
            }
        }
        let body = serde_json::to_string_pretty(self).map_err(|e| RiskgateError::History {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, body + "\n").map_err(|e| RiskgateError::io(path, e))
    }

    pub fn previous(&self, current_build: u32) -> Option<&BuildRecord> {
        find_previous_result(&self.builds, current_build)
    }

    /// Insert or replace the record for `record.number`, then keep only the
    /// newest `keep` builds. Returns `false` when the record itself fell
    /// outside the retained window.
    pub fn record(&mut self, record: BuildRecord, keep: usize) -> bool {
        let number = record.number;
        match self.builds.binary_search_by_key(&number, |r| r.number) {
            Ok(i) => {
                warn!(build = number, "replacing recorded build");
                self.builds[i] = record;
            }
            Err(i) => self.builds.insert(i, record),
        }
        if keep > 0 && self.builds.len() > keep {
            let excess = self.builds.len() - keep;
            self.builds.drain(..excess);
        }
        let kept = self.builds.binary_search_by_key(&number, |r| r.number).is_ok();
        if !kept {
            warn!(build = number, keep, "build is older than the retained history; not recorded");
        }
        kept
    }
}

/// Resolve the history path against the repository root.
pub fn history_path(repo_root: &Path, configured: &str) -> PathBuf {
    let p = PathBuf::from(configured);
    if p.is_absolute() {
        p
    } else {
        repo_root.join(p)
    }
}
