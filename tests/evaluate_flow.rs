use riskgate::config::{resolve_effective, CliOverrides};
use riskgate::history::History;
use riskgate::models::{BuildOutcome, Severity};
use riskgate::publish::{evaluate_build, CiAction};
use riskgate::{RiskgateError, Verdict};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn finding(component: &str, id: &str, severity: &str, state: &str, suppressed: bool) -> String {
    format!(
        r#"{{"component": {{"uuid": "{component}", "name": "{component}"}},
            "vulnerability": {{"vulnId": "{id}", "severity": "{severity}"}},
            "analysis": {{"state": "{state}", "isSuppressed": {suppressed}}},
            "matrix": "p:{component}:{id}"}}"#
    )
}

fn write_findings(root: &Path, items: &[String]) {
    fs::create_dir_all(root.join("reports")).unwrap();
    fs::write(root.join("reports/findings.json"), format!("[{}]", items.join(","))).unwrap();
}

fn cli(root: &Path) -> CliOverrides {
    CliOverrides {
        repo_root: root.to_str().map(String::from),
        ..Default::default()
    }
}

#[test]
fn builds_escalate_against_previous_and_record_history() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(
        root.join("riskgate.toml"),
        r#"
findings = ["reports/*.json"]

[thresholds.total]
fail_build = true
[thresholds.total.findings]
critical = { failed = 3 }

[thresholds.new.findings]
high = { unstable = 1 }
"#,
    )
    .unwrap();

    // build 1: one high, nothing to compare with
    write_findings(root, &[finding("a", "CVE-1", "HIGH", "NOT_SET", false)]);
    let eff = resolve_effective(&cli(root)).unwrap();
    let ev = evaluate_build(&eff, 1).unwrap();
    assert_eq!(ev.previous_build, None);
    assert_eq!(ev.verdict(), Verdict::Unstable);
    assert_eq!(ev.action, CiAction::MarkUnstable);

    // build 2: same high finding, no new ones
    let ev = evaluate_build(&eff, 2).unwrap();
    assert_eq!(ev.previous_build, Some(1));
    assert_eq!(ev.verdict(), Verdict::Success);

    // build 3: three criticals fail the build
    write_findings(
        root,
        &[
            finding("a", "CVE-1", "HIGH", "NOT_SET", false),
            finding("b", "CVE-2", "CRITICAL", "NOT_SET", false),
            finding("b", "CVE-3", "CRITICAL", "NOT_SET", false),
            finding("c", "CVE-4", "CRITICAL", "NOT_SET", false),
        ],
    );
    let ev = evaluate_build(&eff, 3).unwrap();
    assert_eq!(ev.verdict(), Verdict::Failure);
    assert_eq!(ev.action.exit_code(eff.unstable_exit_code), 1);
    assert_eq!(ev.result.all.findings.get(Severity::Critical), 3);

    let history = History::load(&eff.history_path).unwrap();
    let outcomes: Vec<(u32, BuildOutcome)> =
        history.builds.iter().map(|r| (r.number, r.outcome)).collect();
    assert_eq!(
        outcomes,
        vec![
            (1, BuildOutcome::Unstable),
            (2, BuildOutcome::Success),
            (3, BuildOutcome::Failure)
        ]
    );
}

#[test]
fn actionable_scope_ignores_suppressed_and_unconfirmed() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_findings(
        root,
        &[
            finding("a", "CVE-1", "CRITICAL", "EXPLOITABLE", true),
            finding("b", "CVE-2", "CRITICAL", "IN_TRIAGE", false),
            finding("c", "CVE-3", "LOW", "EXPLOITABLE", false),
        ],
    );
    let mut overrides = cli(root);
    overrides.findings = vec!["reports/findings.json".into()];
    overrides.no_record = true;
    overrides.thresholds = vec![
        "total.findings.critical.failed=1".into(),
        "total.fail_build=true".into(),
        "total.limit_to_actionable=true".into(),
    ];
    let eff = resolve_effective(&overrides).unwrap();
    let ev = evaluate_build(&eff, 1).unwrap();
    assert_eq!(ev.verdict(), Verdict::Success);
    assert_eq!(ev.result.actionable.findings.total(), 1);
    assert!(!ev.recorded);
    assert!(!eff.history_path.exists());
}

#[test]
fn missing_findings_input_is_an_error() {
    let dir = tempdir().unwrap();
    let eff = resolve_effective(&cli(dir.path())).unwrap();
    assert!(matches!(
        evaluate_build(&eff, 1),
        Err(RiskgateError::ConfigValidation { .. })
    ));

    let mut overrides = cli(dir.path());
    overrides.findings = vec!["reports/none-*.json".into()];
    let eff = resolve_effective(&overrides).unwrap();
    assert!(matches!(evaluate_build(&eff, 1), Err(RiskgateError::NoInput(_))));
}

#[test]
fn violations_gate_the_build() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_findings(root, &[]);
    fs::write(
        root.join("reports/violations.json"),
        r#"[{"uuid": "v1", "type": "LICENSE",
             "policyCondition": {"policy": {"name": "No GPL", "violationState": "FAIL"}}}]"#,
    )
    .unwrap();
    let mut overrides = cli(root);
    overrides.findings = vec!["reports/findings.json".into()];
    overrides.violations = vec!["reports/violations.json".into()];
    overrides.thresholds = vec![
        "total.violations.fail.failed=1".into(),
        "total.fail_build=true".into(),
    ];
    let eff = resolve_effective(&overrides).unwrap();
    let ev = evaluate_build(&eff, 9).unwrap();
    assert_eq!(ev.verdict(), Verdict::Failure);
    assert_eq!(ev.assessment.breaches[0].rule(), "total.violations.fail.failed");
    assert_eq!(ev.sources.len(), 2);
}

#[test]
fn build_older_than_retained_history_is_not_reported_as_recorded() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(
        root.join("riskgate.toml"),
        "findings = [\"reports/findings.json\"]\n[history]\nkeep = 2\n",
    )
    .unwrap();
    write_findings(root, &[finding("a", "CVE-1", "LOW", "NOT_SET", false)]);
    let eff = resolve_effective(&cli(root)).unwrap();

    assert!(evaluate_build(&eff, 5).unwrap().recorded);
    assert!(evaluate_build(&eff, 6).unwrap().recorded);
    let late = evaluate_build(&eff, 1).unwrap();
    assert!(!late.recorded);

    let history = History::load(&eff.history_path).unwrap();
    let numbers: Vec<u32> = history.builds.iter().map(|r| r.number).collect();
    assert_eq!(numbers, vec![5, 6]);
}
