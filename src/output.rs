//! Output rendering for the evaluate and history commands.
//!
//! Supports `human` (default) and `json` outputs. The JSON form carries the
//! verdict, the counted distributions, every breached rule and a top-level
//! summary.

use crate::history::History;
use crate::models::{Bucket, Distribution, Snapshot, Verdict};
use crate::publish::Evaluation;
use crate::risk_gate::Breach;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::path::Path;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

fn stderr_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// `error:` prefix for messages on stderr.
pub fn error_prefix() -> String {
    if stderr_colors() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn warn_prefix() -> String {
    if stderr_colors() {
        "warning:".yellow().bold().to_string()
    } else {
        "warning:".to_string()
    }
}

pub fn note_prefix() -> String {
    if stderr_colors() {
        "note:".blue().bold().to_string()
    } else {
        "note:".to_string()
    }
}

/// Path relative to `root` when possible, for display.
pub fn display_path(path: &Path, root: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

fn verdict_tag(v: Verdict, color: bool) -> String {
    let tag = format!("⟦{}⟧", v.as_str().to_ascii_lowercase());
    if !color {
        return tag;
    }
    match v {
        Verdict::Success => tag.green().bold().to_string(),
        Verdict::Unstable => tag.yellow().bold().to_string(),
        Verdict::Failure => tag.red().bold().to_string(),
    }
}

/// `critical=1 high=0 ...`, most severe first.
fn counts_line<K: Bucket>(d: &Distribution<K>) -> String {
    let mut parts: Vec<String> = d
        .iter()
        .rev()
        .map(|(k, n)| format!("{}={}", k.name(), n))
        .collect();
    parts.push(format!("total={}", d.total()));
    parts.join(" ")
}

fn breach_line(b: &Breach, color: bool) -> String {
    let icon = match b.outcome {
        Verdict::Failure => "✖".red().to_string(),
        _ => "▲".yellow().to_string(),
    };
    let icon = if color { icon } else { String::new() };
    let cmp = if b.effective_limit == b.limit {
        format!("{} >= {}", b.count, b.limit)
    } else {
        format!(
            "{} >= {} (previous {} + {})",
            b.count,
            b.effective_limit,
            b.effective_limit - b.limit,
            b.limit
        )
    };
    let rule = if color {
        b.rule().bold().to_string()
    } else {
        b.rule()
    };
    format!("{} {} ❲{}❳ — {}", icon, verdict_tag(b.outcome, color), rule, cmp)
        .trim_start()
        .to_string()
}

/// Print one build evaluation in the requested format.
pub fn print_evaluation(ev: &Evaluation, repo_root: &Path, output: &str) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_evaluation_json(ev, repo_root))
                .unwrap_or_default()
        ),
        _ => {
            let color = use_colors(output);
            let prev = ev
                .previous_build
                .map(|n| format!("#{}", n))
                .unwrap_or_else(|| "none".to_string());
            println!("build #{} (previous: {})", ev.build, prev);
            for src in &ev.sources {
                println!("  input      {}", display_path(src, repo_root));
            }
            print_snapshot("", &ev.result.all);
            if ev.result.actionable != ev.result.all {
                print_snapshot("actionable ", &ev.result.actionable);
            }
            for b in &ev.assessment.breaches {
                println!("{}", breach_line(b, color));
            }
            let summary = format!(
                "— Verdict — {} breaches={}{}",
                ev.verdict(),
                ev.assessment.breaches.len(),
                if ev.recorded { "" } else { " (not recorded)" }
            );
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
        }
    }
}

fn print_snapshot(label: &str, snap: &Snapshot) {
    println!("  {}findings   {}", label, counts_line(&snap.findings));
    println!("  {}violations {}", label, counts_line(&snap.violations));
}

/// Print recorded builds, oldest first.
pub fn print_history(history: &History, output: &str) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_history_json(history)).unwrap_or_default()
        ),
        _ => {
            let color = use_colors(output);
            if history.builds.is_empty() {
                println!("no recorded builds");
                return;
            }
            for rec in &history.builds {
                let outcome = rec.outcome.to_string();
                let outcome = if color {
                    outcome.bold().to_string()
                } else {
                    outcome
                };
                match &rec.result {
                    Some(res) => println!(
                        "#{:<6} {:<10} findings[{}] violations[{}]",
                        rec.number,
                        outcome,
                        counts_line(&res.all.findings),
                        counts_line(&res.all.violations)
                    ),
                    None => println!("#{:<6} {:<10} (no results)", rec.number, outcome),
                }
            }
        }
    }
}

fn counts_json<K: Bucket>(d: &Distribution<K>) -> JsonVal {
    let mut map = serde_json::Map::new();
    for (k, n) in d.iter().rev() {
        map.insert(k.name().to_string(), json!(n));
    }
    map.insert("total".to_string(), json!(d.total()));
    JsonVal::Object(map)
}

fn snapshot_json(snap: &Snapshot) -> JsonVal {
    json!({
        "findings": counts_json(&snap.findings),
        "violations": counts_json(&snap.violations),
    })
}

pub fn compose_evaluation_json(ev: &Evaluation, repo_root: &Path) -> JsonVal {
    let breaches: Vec<JsonVal> = ev
        .assessment
        .breaches
        .iter()
        .map(|b| {
            json!({
                "rule": b.rule(),
                "scope": b.scope,
                "kind": b.kind,
                "level": b.level,
                "tier": b.tier,
                "count": b.count,
                "limit": b.limit,
                "effective_limit": b.effective_limit,
                "outcome": b.outcome,
            })
        })
        .collect();
    let failures = ev
        .assessment
        .breaches
        .iter()
        .filter(|b| b.outcome == Verdict::Failure)
        .count();
    json!({
        "build": ev.build,
        "previous_build": ev.previous_build,
        "verdict": ev.verdict(),
        "action": ev.action,
        "recorded": ev.recorded,
        "inputs": ev.sources.iter().map(|p| display_path(p, repo_root)).collect::<Vec<_>>(),
        "distributions": {
            "all": snapshot_json(&ev.result.all),
            "actionable": snapshot_json(&ev.result.actionable),
        },
        "breaches": breaches,
        "summary": {
            "breaches": ev.assessment.breaches.len(),
            "failures": failures,
            "unstable": ev.assessment.breaches.len() - failures,
        }
    })
}

pub fn compose_history_json(history: &History) -> JsonVal {
    let builds: Vec<JsonVal> = history
        .builds
        .iter()
        .map(|rec| {
            let counts = rec.result.as_ref().map(|r| snapshot_json(&r.all));
            json!({
                "number": rec.number,
                "outcome": rec.outcome,
                "counts": counts,
            })
        })
        .collect();
    json!({ "builds": builds, "summary": { "builds": history.builds.len() } })
}
