//! Risk gate: compares the current build's distributions with the previous
//! build's against the configured thresholds and produces a verdict.
//!
//! Rules are evaluated in a fixed order:
//! 1. total findings (critical, high, medium, low, unassigned, all)
//! 2. new findings
//! 3. total violations (fail, warn, info, all)
//! 4. new violations
//!
//! A tier matches when `count > 0 && count >= limit`, where `limit` is the
//! configured value for `total` and `previous + configured` for `new`. A
//! configured limit of zero never matches, so setting `0` has no effect.
//!
//! Each matched rule escalates to `Unstable`, or to `Failure` for a failed-tier
//! match in a scope with `fail_build`. The verdict is the maximum over all
//! matched rules. No rule can lower the verdict, so folding every rule gives
//! the same answer as stopping at the first failure, and the full list of
//! breaches is kept for reporting.

use crate::models::{Bucket, Distribution, Severity, Snapshot, Verdict, ViolationState};
use crate::thresholds::{LeveledLimits, Limits, ScopeThresholds, Thresholds, Tier};
use serde::Serialize;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Total,
    New,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Total => "total",
            Scope::New => "new",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One matched threshold rule.
pub struct Breach {
    pub scope: Scope,
    /// `findings` or `violations`.
    pub kind: &'static str,
    /// Level name, or `all` for the aggregate limit.
    pub level: &'static str,
    pub tier: Tier,
    pub count: u32,
    /// Configured limit.
    pub limit: u32,
    /// Limit the count was compared with (`previous + limit` for `new`).
    pub effective_limit: u32,
    pub outcome: Verdict,
}

impl Breach {
    /// Rule key in override syntax, e.g. `new.findings.critical.failed`.
    pub fn rule(&self) -> String {
        format!("{}.{}.{}.{}", self.scope, self.kind, self.level, self.tier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Verdict plus every rule that contributed to it.
pub struct Assessment {
    pub verdict: Verdict,
    pub breaches: Vec<Breach>,
}

/// Distributions for one evaluation. `total` feeds the total-scope rules;
/// `new_current` and `new_previous` feed the new-scope rules. They differ
/// only when the scopes filter items differently.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub total: &'a Snapshot,
    pub new_current: &'a Snapshot,
    pub new_previous: &'a Snapshot,
}

impl<'a> GateInput<'a> {
    /// Same current snapshot for both scopes.
    pub fn new(current: &'a Snapshot, previous: &'a Snapshot) -> Self {
        Self {
            total: current,
            new_current: current,
            new_previous: previous,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Stateless evaluator over a fixed threshold configuration.
pub struct RiskGate {
    thresholds: Thresholds,
}

impl RiskGate {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Verdict for the current build given the previous build's distributions.
    /// Pass all-zero distributions when there is no previous build.
    pub fn evaluate(
        &self,
        current_findings: &Distribution<Severity>,
        previous_findings: &Distribution<Severity>,
        current_violations: &Distribution<ViolationState>,
        previous_violations: &Distribution<ViolationState>,
    ) -> Verdict {
        let current = Snapshot {
            findings: current_findings.clone(),
            violations: current_violations.clone(),
        };
        let previous = Snapshot {
            findings: previous_findings.clone(),
            violations: previous_violations.clone(),
        };
        self.assess(&GateInput::new(&current, &previous)).verdict
    }

    /// Evaluate every rule and return the verdict with its breaches.
    pub fn assess(&self, input: &GateInput<'_>) -> Assessment {
        let mut breaches = Vec::new();
        if !self.thresholds.has_values() {
            debug!("no thresholds configured; gate passes");
            return Assessment {
                verdict: Verdict::Success,
                breaches,
            };
        }
        let th = &self.thresholds;
        check_kind(
            Scope::Total,
            &th.total,
            &th.total.findings,
            &input.total.findings,
            None,
            &mut breaches,
        );
        check_kind(
            Scope::New,
            &th.new,
            &th.new.findings,
            &input.new_current.findings,
            Some(&input.new_previous.findings),
            &mut breaches,
        );
        check_kind(
            Scope::Total,
            &th.total,
            &th.total.violations,
            &input.total.violations,
            None,
            &mut breaches,
        );
        check_kind(
            Scope::New,
            &th.new,
            &th.new.violations,
            &input.new_current.violations,
            Some(&input.new_previous.violations),
            &mut breaches,
        );
        let verdict = fold(&breaches);
        for b in &breaches {
            debug!(
                rule = %b.rule(),
                count = b.count,
                limit = b.effective_limit,
                outcome = %b.outcome,
                "threshold met"
            );
        }
        debug!(verdict = %verdict, breaches = breaches.len(), "risk gate evaluated");
        Assessment { verdict, breaches }
    }
}

fn fold(breaches: &[Breach]) -> Verdict {
    breaches
        .iter()
        .map(|b| b.outcome)
        .max()
        .unwrap_or(Verdict::Success)
}

fn check_kind<K: Bucket>(
    scope: Scope,
    scope_th: &ScopeThresholds,
    limits: &LeveledLimits<K>,
    current: &Distribution<K>,
    previous: Option<&Distribution<K>>,
    out: &mut Vec<Breach>,
) {
    for (level, lim) in limits.gated() {
        let prev = previous.map(|p| p.get(level));
        check_level(scope, scope_th, K::KIND, level.name(), lim, current.get(level), prev, out);
    }
    let prev = previous.map(Distribution::total);
    check_level(scope, scope_th, K::KIND, "all", limits.all, current.total(), prev, out);
}

#[allow(clippy::too_many_arguments)]
fn check_level(
    scope: Scope,
    scope_th: &ScopeThresholds,
    kind: &'static str,
    level: &'static str,
    limits: Limits,
    count: u32,
    previous: Option<u32>,
    out: &mut Vec<Breach>,
) {
    for tier in Tier::BOTH {
        // zero limits are configured but disabled
        let Some(limit) = limits.get(tier).filter(|l| *l > 0) else {
            continue;
        };
        let effective_limit = previous.map_or(limit, |p| p.saturating_add(limit));
        if count > 0 && count >= effective_limit {
            let outcome = match tier {
                Tier::Failed if scope_th.fail_build => Verdict::Failure,
                _ => Verdict::Unstable,
            };
            out.push(Breach {
                scope,
                kind,
                level,
                tier,
                count,
                limit,
                effective_limit,
                outcome,
            });
        }
    }
}
