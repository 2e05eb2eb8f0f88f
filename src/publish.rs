//! One build evaluation from inputs to CI action.
//!
//! Collects the current build, looks up the previous build's distributions in
//! the history, runs the risk gate once, records the build and returns what the
//! CI job should do next.

use crate::collect::{BuildResult, Collected};
use crate::config::Effective;
use crate::error::{Result, RiskgateError};
use crate::history::{BuildRecord, History};
use crate::models::{BuildOutcome, Verdict};
use crate::risk_gate::{Assessment, GateInput, RiskGate};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// What the CI job does with a verdict.
pub enum CiAction {
    Continue,
    MarkUnstable,
    Abort,
}

impl CiAction {
    pub fn from_verdict(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Success => CiAction::Continue,
            Verdict::Unstable => CiAction::MarkUnstable,
            Verdict::Failure => CiAction::Abort,
        }
    }

    /// Process exit code for this action.
    pub fn exit_code(self, unstable_exit_code: i32) -> i32 {
        match self {
            CiAction::Continue => 0,
            CiAction::MarkUnstable => unstable_exit_code,
            CiAction::Abort => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
/// Everything reported about one evaluated build.
pub struct Evaluation {
    pub build: u32,
    /// Build the `new` scope was compared with, if any qualified.
    pub previous_build: Option<u32>,
    pub sources: Vec<PathBuf>,
    pub result: BuildResult,
    pub assessment: Assessment,
    pub action: CiAction,
    pub recorded: bool,
}

impl Evaluation {
    pub fn verdict(&self) -> Verdict {
        self.assessment.verdict
    }
}

/// Evaluate build `build` with the resolved settings.
pub fn evaluate_build(eff: &Effective, build: u32) -> Result<Evaluation> {
    if eff.findings.is_empty() {
        return Err(RiskgateError::ConfigValidation {
            field: "findings".into(),
            message: "no findings input; pass --findings or set `findings` in riskgate.toml"
                .into(),
        });
    }
    let collected = Collected::load(&eff.repo_root, &eff.findings, &eff.violations)?;
    let result = collected.result(build);

    let mut history = History::load(&eff.history_path)?;
    let previous = history.previous(build).and_then(|r| r.result.clone().map(|res| (r.number, res)));
    let previous_build = previous.as_ref().map(|(n, _)| *n);
    let previous_result = match previous {
        Some((_, res)) => res,
        None => {
            info!(build, "no previous build with results; comparing against zero");
            BuildResult::empty(0)
        }
    };

    let assessment = assess(&RiskGate::new(eff.thresholds.clone()), &result, &previous_result);
    let verdict = assessment.verdict;
    let action = CiAction::from_verdict(verdict);
    info!(build, previous = ?previous_build, verdict = %verdict, "build evaluated");

    let recorded = if eff.record {
        let kept = history.record(
            BuildRecord {
                number: build,
                outcome: BuildOutcome::from(verdict),
                result: Some(result.clone()),
            },
            eff.history_keep,
        );
        history.save(&eff.history_path)?;
        kept
    } else {
        info!(build, "recording disabled; history left unchanged");
        false
    };

    Ok(Evaluation {
        build,
        previous_build,
        sources: collected.sources,
        result,
        assessment,
        action,
        recorded,
    })
}

/// Run the gate with each scope reading the snapshot its actionable flag
/// selects.
pub fn assess(gate: &RiskGate, current: &BuildResult, previous: &BuildResult) -> Assessment {
    let th = gate.thresholds();
    let input = GateInput {
        total: current.select(th.total.limit_to_actionable),
        new_current: current.select(th.new.limit_to_actionable),
        new_previous: previous.select(th.new.limit_to_actionable),
    };
    gate.assess(&input)
}
