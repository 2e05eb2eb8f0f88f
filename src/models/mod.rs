//! Shared data models: bucket levels, distributions, server exports, and
//! build verdicts.

pub mod distribution;
pub mod finding;
pub mod level;

pub use distribution::{Distribution, SeverityDistribution, Snapshot, ViolationDistribution};
pub use finding::{Finding, Violation};
pub use level::{Bucket, Severity, ViolationState};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
/// Outcome of a risk gate evaluation, ordered by severity.
pub enum Verdict {
    Success,
    Unstable,
    Failure,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Success => "SUCCESS",
            Verdict::Unstable => "UNSTABLE",
            Verdict::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Final state of a recorded build. Only the CI side produces `NotBuilt`
/// and `Aborted`.
pub enum BuildOutcome {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl From<Verdict> for BuildOutcome {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Success => BuildOutcome::Success,
            Verdict::Unstable => BuildOutcome::Unstable,
            Verdict::Failure => BuildOutcome::Failure,
        }
    }
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildOutcome::Success => "SUCCESS",
            BuildOutcome::Unstable => "UNSTABLE",
            BuildOutcome::Failure => "FAILURE",
            BuildOutcome::NotBuilt => "NOT_BUILT",
            BuildOutcome::Aborted => "ABORTED",
        };
        f.write_str(s)
    }
}
