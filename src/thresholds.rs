//! Threshold configuration for the risk gate.
//!
//! Two scopes are configured independently:
//! - `total`: absolute counts in the current build.
//! - `new`: counts in the current build on top of the previous build's.
//!
//! Each scope carries per-level limits for findings (by severity) and for
//! violations (by state), an aggregate `all` limit per kind, and two flags:
//! `fail_build` (failed-tier matches fail the build) and `limit_to_actionable`
//! (read by the collector, never by the gate).
//!
//! TOML form, as found under `[thresholds]` in `riskgate.toml`:
//!
//! ```toml
//! [thresholds.total]
//! fail_build = true
//! [thresholds.total.findings]
//! critical = { unstable = 1, failed = 3 }
//! all = { unstable = 20 }
//! [thresholds.new.violations]
//! fail = { failed = 1 }
//! ```

use crate::error::{Result, RiskgateError};
use crate::models::{Bucket, Severity, ViolationState};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
/// Which outcome a limit triggers when met.
pub enum Tier {
    Unstable,
    Failed,
}

impl Tier {
    pub const BOTH: [Tier; 2] = [Tier::Unstable, Tier::Failed];

    pub fn name(self) -> &'static str {
        match self {
            Tier::Unstable => "unstable",
            Tier::Failed => "failed",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Optional count limits for one level. Unset means no limit; zero is
/// accepted but never matches.
pub struct Limits {
    pub unstable: Option<u32>,
    pub failed: Option<u32>,
}

impl Limits {
    pub fn get(&self, tier: Tier) -> Option<u32> {
        match tier {
            Tier::Unstable => self.unstable,
            Tier::Failed => self.failed,
        }
    }

    pub fn set(&mut self, tier: Tier, value: Option<u32>) {
        match tier {
            Tier::Unstable => self.unstable = value,
            Tier::Failed => self.failed = value,
        }
    }

    pub fn has_values(&self) -> bool {
        self.unstable.is_some() || self.failed.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Limits keyed by bucket level plus an aggregate over all levels.
pub struct LeveledLimits<K: Bucket> {
    levels: BTreeMap<K, Limits>,
    pub all: Limits,
}

impl<K: Bucket> Default for LeveledLimits<K> {
    fn default() -> Self {
        Self {
            levels: BTreeMap::new(),
            all: Limits::default(),
        }
    }
}

impl<K: Bucket> LeveledLimits<K> {
    pub fn get(&self, level: K) -> Limits {
        self.levels.get(&level).copied().unwrap_or_default()
    }

    pub fn set(&mut self, level: K, tier: Tier, value: Option<u32>) {
        self.levels.entry(level).or_default().set(tier, value);
    }

    pub fn has_values(&self) -> bool {
        self.all.has_values() || self.levels.values().any(Limits::has_values)
    }

    /// Limits for gated levels in evaluation order, most severe first.
    pub fn gated(&self) -> impl Iterator<Item = (K, Limits)> + '_ {
        K::GATED.iter().map(move |k| (*k, self.get(*k)))
    }

    fn limits_mut(&mut self, key: &str) -> Option<&mut Limits> {
        if key.eq_ignore_ascii_case("all") {
            return Some(&mut self.all);
        }
        let level = K::GATED
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(key))?;
        Some(self.levels.entry(level).or_default())
    }
}

impl<'de, K: Bucket> Deserialize<'de> for LeveledLimits<K> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, Limits>::deserialize(d)?;
        let mut out = Self::default();
        for (key, limits) in raw {
            match out.limits_mut(&key) {
                Some(slot) => *slot = limits,
                None => {
                    return Err(de::Error::custom(format!(
                        "unknown {} level '{}'",
                        K::KIND,
                        key
                    )))
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Thresholds of one scope (`total` or `new`).
pub struct ScopeThresholds {
    pub findings: LeveledLimits<Severity>,
    pub violations: LeveledLimits<ViolationState>,
    /// Count only actionable items (not suppressed, confirmed exploitable).
    pub limit_to_actionable: bool,
    /// Let failed-tier matches fail the build instead of marking it unstable.
    pub fail_build: bool,
}

impl ScopeThresholds {
    pub fn has_values(&self) -> bool {
        self.findings.has_values() || self.violations.has_values()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Complete threshold configuration handed to the risk gate.
pub struct Thresholds {
    pub total: ScopeThresholds,
    pub new: ScopeThresholds,
}

impl Thresholds {
    /// `true` iff at least one limit is set anywhere. Flags alone do not count.
    pub fn has_values(&self) -> bool {
        self.total.has_values() || self.new.has_values()
    }

    pub fn scope_mut(&mut self, name: &str) -> Option<&mut ScopeThresholds> {
        match name {
            "total" => Some(&mut self.total),
            "new" => Some(&mut self.new),
            _ => None,
        }
    }

    /// Apply a per-build override such as `total.findings.critical.failed=1`,
    /// `new.violations.all.unstable=none` or `total.fail_build=true`.
    pub fn apply_override(&mut self, input: &str) -> Result<()> {
        let err = |message: &str| RiskgateError::ThresholdOverride {
            input: input.to_string(),
            message: message.to_string(),
        };
        let (key, value) = input
            .split_once('=')
            .ok_or_else(|| err("expected key=value"))?;
        let value = value.trim();
        let parts: Vec<&str> = key.trim().split('.').map(str::trim).collect();
        let scope = self
            .scope_mut(parts[0])
            .ok_or_else(|| err("scope must be 'total' or 'new'"))?;
        match parts.as_slice() {
            [_, flag] => {
                let on = parse_bool(value).ok_or_else(|| err("expected true or false"))?;
                match *flag {
                    "fail_build" => scope.fail_build = on,
                    "limit_to_actionable" => scope.limit_to_actionable = on,
                    _ => return Err(err("unknown flag")),
                }
            }
            [_, kind, level, tier] => {
                let tier = match *tier {
                    "unstable" => Tier::Unstable,
                    "failed" => Tier::Failed,
                    _ => return Err(err("tier must be 'unstable' or 'failed'")),
                };
                let limit = parse_limit(value).ok_or_else(|| {
                    err("expected a non-negative integer or 'none'")
                })?;
                let slot = match *kind {
                    "findings" => scope.findings.limits_mut(level),
                    "violations" => scope.violations.limits_mut(level),
                    _ => return Err(err("kind must be 'findings' or 'violations'")),
                };
                slot.ok_or_else(|| err("unknown level"))?.set(tier, limit);
            }
            _ => return Err(err("expected scope.flag or scope.kind.level.tier")),
        }
        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// `Some(None)` clears a limit.
fn parse_limit(s: &str) -> Option<Option<u32>> {
    if s.is_empty() || s.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    s.parse::<u32>().ok().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_values() {
        let mut th = Thresholds::default();
        assert!(!th.has_values());

        th.new.findings.set(Severity::Critical, Tier::Failed, Some(1));
        assert!(th.has_values());

        let mut th = Thresholds::default();
        th.new.findings.set(Severity::Unassigned, Tier::Unstable, Some(1));
        assert!(th.has_values());

        let mut th = Thresholds::default();
        th.total.violations.all.failed = Some(0);
        assert!(th.has_values());

        let mut th = Thresholds::default();
        th.total.fail_build = true;
        th.new.limit_to_actionable = true;
        assert!(!th.has_values());
    }

    #[test]
    fn test_deserialize_toml() {
        let th: Thresholds = toml::from_str(
            r#"
[total]
fail_build = true
[total.findings]
critical = { unstable = 1, failed = 3 }
all = { unstable = 20 }
[new.violations]
fail = { failed = 1 }
            "#,
        )
        .unwrap();
        assert!(th.total.fail_build);
        assert_eq!(th.total.findings.get(Severity::Critical).failed, Some(3));
        assert_eq!(th.total.findings.all.unstable, Some(20));
        assert_eq!(th.new.violations.get(ViolationState::Fail).failed, Some(1));
        assert!(!th.new.fail_build);
    }

    #[test]
    fn test_deserialize_rejects_unknown_level() {
        let res: std::result::Result<Thresholds, _> = toml::from_str(
            r#"
[total.violations]
critical = { failed = 1 }
            "#,
        );
        assert!(res.is_err());
        let res: std::result::Result<Thresholds, _> = toml::from_str(
            r#"
[total.violations]
unassigned = { failed = 1 }
            "#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut th = Thresholds::default();
        th.apply_override("total.findings.high.unstable=4").unwrap();
        th.apply_override("new.violations.all.failed = 2").unwrap();
        th.apply_override("new.fail_build=true").unwrap();
        assert_eq!(th.total.findings.get(Severity::High).unstable, Some(4));
        assert_eq!(th.new.violations.all.failed, Some(2));
        assert!(th.new.fail_build);

        th.apply_override("total.findings.high.unstable=none").unwrap();
        assert!(!th.total.findings.has_values());
    }

    #[test]
    fn test_bad_overrides() {
        let mut th = Thresholds::default();
        for bad in [
            "total.findings.high.unstable",
            "later.findings.high.unstable=1",
            "total.findings.severe.unstable=1",
            "total.findings.high.broken=1",
            "total.findings.high.unstable=-1",
            "total.fail_build=maybe",
            "total.findings=1",
        ] {
            let err = th.apply_override(bad).unwrap_err();
            assert!(matches!(err, RiskgateError::ThresholdOverride { .. }), "{bad}");
        }
        assert_eq!(th, Thresholds::default());
    }
}
