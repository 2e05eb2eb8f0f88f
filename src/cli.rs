//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "riskgate",
    version,
    about = "Gate CI builds on SBOM findings and policy violations",
    long_about = "riskgate reads findings and policy violations exported by a Dependency-Track server, compares them with the previous build and configured thresholds, and decides whether the build passes, becomes unstable or fails.\n\nConfiguration precedence: CLI > riskgate.toml > defaults.",
    after_help = "Examples:\n  riskgate evaluate --findings reports/findings.json --build 42\n  riskgate evaluate --findings 'reports/*.json' --violations reports/violations.json --build 42 --threshold total.findings.critical.failed=1 --threshold total.fail_build=true\n  riskgate history --output json",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(
        about = "Show version",
        long_about = "Print the current riskgate version."
    )]
    Version,
    /// Evaluate one build against the thresholds
    #[command(
        about = "Evaluate a build",
        long_about = "Collect findings and violations for a build, compare them with the previous recorded build, and apply the risk gate. Exits 0 on SUCCESS, with unstable_exit_code on UNSTABLE, 1 on FAILURE and 2 on configuration or input errors.",
        after_help = "Examples:\n  riskgate evaluate --findings reports/findings.json --build 7\n  riskgate evaluate --build 7 --threshold new.findings.high.unstable=1 --output json\n  riskgate evaluate --build 7 --no-record"
    )]
    Evaluate {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, num_args = 1.., help = "Findings export file(s) or glob(s)")]
        findings: Vec<String>,
        #[arg(long, num_args = 1.., help = "Policy violation export file(s) or glob(s)")]
        violations: Vec<String>,
        #[arg(long, help = "Current build number")]
        build: u32,
        #[arg(
            long = "threshold",
            value_name = "KEY=VALUE",
            help = "Override a threshold, e.g. total.findings.critical.failed=1 (repeatable)"
        )]
        thresholds: Vec<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, help = "History file (default: .riskgate/history.json)")]
        history: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Do not record this build in the history")]
        no_record: bool,
    },
    /// Show recorded builds
    #[command(
        about = "Show build history",
        long_about = "List recorded builds with their outcome and severity/violation counts, oldest first.",
        after_help = "Examples:\n  riskgate history\n  riskgate history --output json"
    )]
    History {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, help = "History file (default: .riskgate/history.json)")]
        history: Option<String>,
    },
}
