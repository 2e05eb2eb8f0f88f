//! Findings and policy violations as exported by the analysis server.
//!
//! Only the fields the collector needs are modelled; everything else in the
//! export is ignored. Missing objects default to empty values so that partial
//! exports still count.

use super::level::{Severity, ViolationState};
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Component {
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub group: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Vulnerability {
    pub uuid: Option<String>,
    pub vuln_id: Option<String>,
    pub source: Option<String>,
    pub severity: Severity,
    /// Alias objects such as `{"cveId": "...", "ghsaId": "..."}`.
    pub aliases: Option<Vec<BTreeMap<String, Json>>>,
}

impl Vulnerability {
    /// Alias identifiers other than this vulnerability's own id.
    pub fn alias_ids(&self) -> Vec<&str> {
        let own = self.vuln_id.as_deref().unwrap_or_default();
        let mut ids: Vec<&str> = self
            .aliases
            .iter()
            .flatten()
            .flat_map(|m| m.values())
            .filter_map(Json::as_str)
            .filter(|id| !id.eq_ignore_ascii_case(own))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// `true` if `other`'s id is listed among this vulnerability's aliases.
    pub fn has_alias(&self, other: &Vulnerability) -> bool {
        match other.vuln_id.as_deref() {
            Some(id) => self
                .alias_ids()
                .iter()
                .any(|a| a.eq_ignore_ascii_case(id)),
            None => false,
        }
    }

    /// `true` if this vulnerability's id is listed among `other`'s aliases.
    pub fn is_alias_of(&self, other: &Vulnerability) -> bool {
        other.has_alias(self)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// Auditing state attached to a finding or violation.
pub struct Analysis {
    #[serde(alias = "analysisState")]
    pub state: Option<String>,
    pub is_suppressed: bool,
}

impl Analysis {
    pub fn is_exploitable(&self) -> bool {
        self.state
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("EXPLOITABLE"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// A (component, vulnerability, analysis) triple for one project version.
pub struct Finding {
    pub component: Component,
    pub vulnerability: Vulnerability,
    pub analysis: Option<Analysis>,
    /// Project, component and vulnerability uuids joined by colons.
    pub matrix: Option<String>,
}

impl Finding {
    pub fn severity(&self) -> Severity {
        self.vulnerability.severity
    }

    pub fn is_suppressed(&self) -> bool {
        self.analysis.as_ref().is_some_and(|a| a.is_suppressed)
    }

    /// Not suppressed and confirmed exploitable by analysis.
    pub fn is_actionable(&self) -> bool {
        self.analysis
            .as_ref()
            .is_some_and(|a| !a.is_suppressed && a.is_exploitable())
    }

    /// Same finding reported twice: identical matrix.
    pub fn same_as(&self, other: &Finding) -> bool {
        matches!((&self.matrix, &other.matrix), (Some(a), Some(b)) if a == b)
    }

    /// Same component and this vulnerability is an alias of the other one.
    pub fn is_alias_of(&self, other: &Finding) -> bool {
        self.component.uuid.is_some()
            && self.component.uuid == other.component.uuid
            && self.vulnerability.is_alias_of(&other.vulnerability)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Policy {
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub violation_state: ViolationState,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyCondition {
    pub uuid: Option<String>,
    pub policy: Policy,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// A policy-condition breach (license, security, operational) for a component.
pub struct Violation {
    pub uuid: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub component: Component,
    pub policy_condition: PolicyCondition,
    pub analysis: Option<Analysis>,
}

impl Violation {
    pub fn state(&self) -> ViolationState {
        self.policy_condition.policy.violation_state
    }

    pub fn policy_name(&self) -> Option<&str> {
        self.policy_condition.policy.name.as_deref()
    }

    /// Violations are actionable unless suppressed.
    pub fn is_actionable(&self) -> bool {
        !self.analysis.as_ref().is_some_and(|a| a.is_suppressed)
    }
}
