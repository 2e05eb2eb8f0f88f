//! Turns analysis-server exports into per-build distributions.
//!
//! Inputs are glob patterns resolved against the repository root. Files are
//! parsed in parallel and merged in path order. Findings reported more than
//! once (same matrix, or an alias of an already kept vulnerability on the
//! same component) are counted once.
//!
//! Each scope may count only actionable items; this module applies that
//! filter so the risk gate only ever sees counts.

use crate::error::{Result, RiskgateError};
use crate::models::{Finding, Snapshot, SeverityDistribution, Violation, ViolationDistribution};
use glob::glob;
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Deserialize)]
#[serde(untagged)]
/// Plain array (project findings API) or a document with a `findings` /
/// `violations` array (finding packaging format export).
enum Export<T> {
    List(Vec<T>),
    Findings { findings: Vec<T> },
    Violations { violations: Vec<T> },
}

impl<T> Export<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Export::List(v) | Export::Findings { findings: v } | Export::Violations { violations: v } => v,
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Findings and violations gathered for one build.
pub struct Collected {
    pub findings: Vec<Finding>,
    pub violations: Vec<Violation>,
    /// Every file read, in path order.
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Distributions of one build, unfiltered and limited to actionable items.
pub struct BuildResult {
    pub all: Snapshot,
    pub actionable: Snapshot,
}

impl BuildResult {
    pub fn select(&self, actionable_only: bool) -> &Snapshot {
        if actionable_only {
            &self.actionable
        } else {
            &self.all
        }
    }

    pub fn empty(build_number: u32) -> Self {
        Self {
            all: Snapshot::empty(build_number),
            actionable: Snapshot::empty(build_number),
        }
    }
}

impl Collected {
    /// Load and merge every file matched by the patterns. Violations are
    /// optional; findings need at least one matching file.
    pub fn load(root: &Path, findings: &[String], violations: &[String]) -> Result<Self> {
        let finding_files = expand_patterns(root, findings)?;
        let violation_files = expand_patterns(root, violations)?;
        let findings = dedupe_findings(parse_all::<Finding>(&finding_files, "findings")?);
        let violations = parse_all::<Violation>(&violation_files, "violations")?;
        info!(
            findings = findings.len(),
            violations = violations.len(),
            files = finding_files.len() + violation_files.len(),
            "collected analysis results"
        );
        let mut sources = finding_files;
        sources.extend(violation_files);
        Ok(Self {
            findings,
            violations,
            sources,
        })
    }

    pub fn snapshot(&self, build_number: u32, actionable_only: bool) -> Snapshot {
        let findings = SeverityDistribution::from_levels(
            build_number,
            self.findings
                .iter()
                .filter(|f| !actionable_only || f.is_actionable())
                .map(Finding::severity),
        );
        let violations = ViolationDistribution::from_levels(
            build_number,
            self.violations
                .iter()
                .filter(|v| !actionable_only || v.is_actionable())
                .map(Violation::state),
        );
        Snapshot {
            findings,
            violations,
        }
    }

    pub fn result(&self, build_number: u32) -> BuildResult {
        BuildResult {
            all: self.snapshot(build_number, false),
            actionable: self.snapshot(build_number, true),
        }
    }
}

/// Resolve patterns relative to `root`. Each pattern must match at least one
/// file.
pub fn expand_patterns(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut out: Vec<PathBuf> = Vec::new();
    for pat in patterns {
        let abs = root.join(pat);
        let pattern = abs.to_string_lossy().to_string();
        let entries = glob(&pattern).map_err(|e| RiskgateError::Pattern {
            pattern: pat.clone(),
            message: e.to_string(),
        })?;
        let before = out.len();
        for entry in entries.flatten() {
            if entry.is_file() {
                out.push(entry);
            }
        }
        if out.len() == before {
            return Err(RiskgateError::NoInput(pat.clone()));
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

fn parse_all<T>(paths: &[PathBuf], kind: &'static str) -> Result<Vec<T>>
where
    T: DeserializeOwned + Send,
{
    let per_file: Vec<Vec<T>> = paths
        .par_iter()
        .map(|path| parse_file::<T>(path, kind))
        .collect::<Result<_>>()?;
    Ok(per_file.into_iter().flatten().collect())
}

fn parse_file<T: DeserializeOwned>(path: &Path, kind: &'static str) -> Result<Vec<T>> {
    let data = fs::read_to_string(path).map_err(|e| RiskgateError::io(path, e))?;
    let export: Export<T> =
        serde_json::from_str(&data).map_err(|e| RiskgateError::InputParse {
            path: path.to_path_buf(),
            kind,
            message: e.to_string(),
        })?;
    let items = export.into_items();
    debug!(path = %path.display(), kind, items = items.len(), "parsed export");
    Ok(items)
}

/// Keep the first occurrence of each finding; drop repeats of the same
/// matrix and findings whose vulnerability is aliased (either direction) by
/// a kept finding on the same component.
pub fn dedupe_findings(findings: Vec<Finding>) -> Vec<Finding> {
    let mut kept: Vec<Finding> = Vec::with_capacity(findings.len());
    for f in findings {
        let duplicate = kept
            .iter()
            .any(|k| f.same_as(k) || f.is_alias_of(k) || k.is_alias_of(&f));
        if !duplicate {
            kept.push(f);
        }
    }
    kept
}
