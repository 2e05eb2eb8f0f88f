//! Configuration discovery and effective settings resolution.
//!
//! riskgate reads `riskgate.toml|yaml|yml` from the repository root (or the
//! closest ancestor) and merges it with CLI flags to produce an `Effective`
//! config.
//! Defaults:
//! - `output`: `human`
//! - `history.path`: `.riskgate/history.json`
//! - `history.keep`: 50
//! - `unstable_exit_code`: 0
//! - `thresholds`: none (the gate always passes)
//!
//! Overrides precedence: CLI > config file > defaults. Threshold overrides
//! from the CLI are applied on top of the `[thresholds]` table.
//!
//! Input patterns and the history path may reference environment variables
//! as `${NAME}`; unknown variables are left untouched.

use crate::error::{Result, RiskgateError};
use crate::thresholds::Thresholds;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const CONFIG_FILES: [&str; 3] = ["riskgate.toml", "riskgate.yaml", "riskgate.yml"];
pub const DEFAULT_HISTORY: &str = ".riskgate/history.json";
pub const DEFAULT_KEEP: usize = 50;

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
/// History section under `[history]`.
pub struct HistoryCfg {
    pub path: Option<String>,
    pub keep: Option<usize>,
    /// Record evaluated builds (default true).
    pub record: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
/// Root configuration loaded from `riskgate.toml|yaml`.
pub struct RiskgateConfig {
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub violations: Vec<String>,
    pub output: Option<String>,
    pub unstable_exit_code: Option<i32>,
    #[serde(default)]
    pub history: Option<HistoryCfg>,
    #[serde(default)]
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Default)]
/// Flags from the command line; `None`/empty means "not given".
pub struct CliOverrides {
    pub repo_root: Option<String>,
    pub findings: Vec<String>,
    pub violations: Vec<String>,
    pub output: Option<String>,
    pub history: Option<String>,
    pub no_record: bool,
    pub thresholds: Vec<String>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub config_path: Option<PathBuf>,
    pub findings: Vec<String>,
    pub violations: Vec<String>,
    pub output: String,
    pub history_path: PathBuf,
    pub history_keep: usize,
    pub record: bool,
    pub unstable_exit_code: i32,
    pub thresholds: Thresholds,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `riskgate.toml|yaml|yml` or a `.git` directory is found.
/// Relative starts are resolved against the current directory first.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let start = match std::env::current_dir() {
        Ok(cwd) => absolutize(&cwd, start),
        Err(_) => start.to_path_buf(),
    };
    let mut cur = start.as_path();
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.clone(),
        }
    }
}

/// Join `path` onto `base` unless it is already absolute, dropping `.`
/// components so `parent()` climbs.
fn absolutize(base: &Path, path: &Path) -> PathBuf {
    base.join(path).components().collect()
}

/// Path of the first config file present in `root`.
pub fn find_config(root: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|f| root.join(f))
        .find(|p| p.is_file())
}

/// Load `RiskgateConfig` from `riskgate.toml` or `riskgate.yaml|yml` if present.
pub fn load_config(root: &Path) -> Result<Option<(PathBuf, RiskgateConfig)>> {
    let Some(path) = find_config(root) else {
        return Ok(None);
    };
    let s = fs::read_to_string(&path).map_err(|e| RiskgateError::io(&path, e))?;
    let parsed = if path.extension().is_some_and(|e| e == "toml") {
        toml::from_str::<RiskgateConfig>(&s).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str::<RiskgateConfig>(&s).map_err(|e| e.to_string())
    };
    let cfg = parsed.map_err(|message| RiskgateError::ConfigParse {
        path: path.clone(),
        message,
    })?;
    Ok(Some((path, cfg)))
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli: &CliOverrides) -> Result<Effective> {
    let start = PathBuf::from(cli.repo_root.as_deref().unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let (config_path, cfg) = match load_config(&repo_root)? {
        Some((p, c)) => (Some(p), c),
        None => (None, RiskgateConfig::default()),
    };

    let findings = if cli.findings.is_empty() {
        cfg.findings
    } else {
        cli.findings.clone()
    };
    let violations = if cli.violations.is_empty() {
        cfg.violations
    } else {
        cli.violations.clone()
    };

    let output = cli
        .output
        .clone()
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    if output != "human" && output != "json" {
        return Err(RiskgateError::ConfigValidation {
            field: "output".into(),
            message: format!("expected human or json, got '{}'", output),
        });
    }

    let history_cfg = cfg.history.unwrap_or_default();
    let history = cli
        .history
        .clone()
        .or(history_cfg.path)
        .unwrap_or_else(|| DEFAULT_HISTORY.to_string());
    let history_path = crate::history::history_path(&repo_root, &expand_env(&history));
    let history_keep = history_cfg.keep.unwrap_or(DEFAULT_KEEP);
    let record = !cli.no_record && history_cfg.record.unwrap_or(true);

    let unstable_exit_code = cfg.unstable_exit_code.unwrap_or(0);
    if unstable_exit_code == 1 || unstable_exit_code == 2 {
        return Err(RiskgateError::ConfigValidation {
            field: "unstable_exit_code".into(),
            message: format!(
                "{} is reserved (1 = failure, 2 = configuration or input error)",
                unstable_exit_code
            ),
        });
    }

    let mut thresholds = cfg.thresholds;
    for ov in &cli.thresholds {
        thresholds.apply_override(ov)?;
    }

    Ok(Effective {
        repo_root,
        config_path,
        findings: findings.iter().map(|p| expand_env(p)).collect(),
        violations: violations.iter().map(|p| expand_env(p)).collect(),
        output,
        history_path,
        history_keep,
        record,
        unstable_exit_code,
        thresholds,
    })
}

fn env_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env regex"))
}

/// Replace `${NAME}` with the environment value; unknown names stay as-is.
pub fn expand_env(s: &str) -> String {
    env_pattern()
        .replace_all(s, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, ViolationState};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("riskgate.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
findings = ["reports/findings.json"]
output = "json"
unstable_exit_code = 3
[history]
keep = 10
[thresholds.total]
fail_build = true
[thresholds.total.findings]
critical = { failed = 1 }
    "#
        )
        .unwrap();

        // Resolve using explicit repo_root to avoid global CWD races
        let cli = CliOverrides {
            repo_root: root.to_str().map(String::from),
            ..Default::default()
        };
        let eff = resolve_effective(&cli).unwrap();
        assert_eq!(eff.findings, vec!["reports/findings.json"]);
        assert_eq!(eff.output, "json");
        assert_eq!(eff.unstable_exit_code, 3);
        assert_eq!(eff.history_keep, 10);
        assert!(eff.record);
        assert_eq!(eff.history_path, root.join(DEFAULT_HISTORY));
        assert!(eff.thresholds.total.fail_build);
        assert_eq!(
            eff.thresholds.total.findings.get(Severity::Critical).failed,
            Some(1)
        );
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("riskgate.yaml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
violations:
  - reports/violations.json
thresholds:
  new:
    violations:
      fail:
        unstable: 1
            "#
        )
        .unwrap();

        let cli = CliOverrides {
            repo_root: root.to_str().map(String::from),
            ..Default::default()
        };
        let eff = resolve_effective(&cli).unwrap();
        assert_eq!(eff.output, "human");
        assert!(eff.findings.is_empty());
        assert_eq!(eff.violations, vec!["reports/violations.json"]);
        assert_eq!(eff.history_keep, DEFAULT_KEEP);
        assert_eq!(eff.unstable_exit_code, 0);
        assert_eq!(
            eff.thresholds.new.violations.get(ViolationState::Fail).unstable,
            Some(1)
        );
    }

    #[test]
    fn test_cli_precedence_and_threshold_overrides() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("riskgate.toml"),
            r#"
findings = ["a.json"]
output = "json"
[history]
path = "state/h.json"
[thresholds.total.findings]
high = { unstable = 5 }
            "#,
        )
        .unwrap();

        let cli = CliOverrides {
            repo_root: root.to_str().map(String::from),
            findings: vec!["b.json".into()],
            output: Some("human".into()),
            no_record: true,
            thresholds: vec![
                "total.findings.high.unstable=2".into(),
                "new.fail_build=true".into(),
            ],
            ..Default::default()
        };
        let eff = resolve_effective(&cli).unwrap();
        assert_eq!(eff.findings, vec!["b.json"]);
        assert_eq!(eff.output, "human");
        assert!(!eff.record);
        assert_eq!(eff.history_path, root.join("state/h.json"));
        assert_eq!(eff.thresholds.total.findings.get(Severity::High).unstable, Some(2));
        assert!(eff.thresholds.new.fail_build);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("riskgate.toml"), "[thresholds.total]\nfail_bild = true\n").unwrap();
        let cli = CliOverrides {
            repo_root: root.to_str().map(String::from),
            ..Default::default()
        };
        assert!(matches!(
            resolve_effective(&cli),
            Err(RiskgateError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_invalid_output_is_error() {
        let dir = tempdir().unwrap();
        let cli = CliOverrides {
            repo_root: dir.path().to_str().map(String::from),
            output: Some("xml".into()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_effective(&cli),
            Err(RiskgateError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_detect_repo_root_climbs_from_nested_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("riskgate.toml"), "findings = [\"f.json\"]\n").unwrap();
        let nested = root.join("a/b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(detect_repo_root(&nested), root);

        // "." as seen from inside a/b
        let start = absolutize(&nested, Path::new("."));
        assert_eq!(start, nested);
        assert_eq!(detect_repo_root(&start), root);
        assert_eq!(absolutize(&nested, Path::new("./c")), nested.join("c"));
        assert!(detect_repo_root(Path::new(".")).is_absolute());
    }

    #[test]
    fn test_reserved_unstable_exit_code_is_error() {
        for code in [1, 2] {
            let dir = tempdir().unwrap();
            let root = dir.path();
            fs::write(
                root.join("riskgate.toml"),
                format!("unstable_exit_code = {}\n", code),
            )
            .unwrap();
            let cli = CliOverrides {
                repo_root: root.to_str().map(String::from),
                ..Default::default()
            };
            match resolve_effective(&cli) {
                Err(RiskgateError::ConfigValidation { field, .. }) => {
                    assert_eq!(field, "unstable_exit_code")
                }
                other => panic!("expected validation error, got {:?}", other.map(|e| e.unstable_exit_code)),
            }
        }
    }

    #[test]
    fn test_expand_env() {
        std::env::set_var("RISKGATE_TEST_BUILD_DIR", "out/42");
        assert_eq!(
            expand_env("${RISKGATE_TEST_BUILD_DIR}/findings.json"),
            "out/42/findings.json"
        );
        assert_eq!(
            expand_env("${RISKGATE_TEST_SURELY_UNSET_VAR}/x"),
            "${RISKGATE_TEST_SURELY_UNSET_VAR}/x"
        );
    }
}
