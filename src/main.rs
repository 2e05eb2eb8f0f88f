//! riskgate CLI binary entry point.
//! Resolves configuration, runs the requested command and maps the verdict
//! to an exit code.

use clap::Parser;
use riskgate::cli::{Cli, Commands};
use riskgate::config::{self, CliOverrides};
use riskgate::history::History;
use riskgate::output::{error_prefix, note_prefix, warn_prefix};
use riskgate::publish::{self, CiAction};
use riskgate::{output, RiskgateError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("RISKGATE_LOG")
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

fn fail(err: RiskgateError) -> ! {
    eprintln!("{} {}", error_prefix(), err);
    std::process::exit(2);
}

fn main() {
    let cli = Cli::parse();
    init_tracing();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Evaluate {
            repo_root,
            findings,
            violations,
            build,
            thresholds,
            output,
            history,
            no_record,
        } => {
            let eff = config::resolve_effective(&CliOverrides {
                repo_root,
                findings,
                violations,
                output,
                history,
                no_record,
                thresholds,
            })
            .unwrap_or_else(|e| fail(e));
            if eff.config_path.is_none() {
                eprintln!("{} No riskgate.toml found; using defaults.", note_prefix());
            }
            if !eff.thresholds.has_values() {
                eprintln!(
                    "{} No thresholds configured; the build will always pass.",
                    note_prefix()
                );
            }
            let ev = publish::evaluate_build(&eff, build).unwrap_or_else(|e| fail(e));
            output::print_evaluation(&ev, &eff.repo_root, &eff.output);
            match ev.action {
                CiAction::Continue => {}
                CiAction::MarkUnstable => {
                    eprintln!(
                        "{} Thresholds exceeded; marking build #{} unstable.",
                        warn_prefix(),
                        ev.build
                    );
                }
                CiAction::Abort => {
                    eprintln!(
                        "{} Thresholds exceeded; failing build #{}.",
                        error_prefix(),
                        ev.build
                    );
                }
            }
            let code = ev.action.exit_code(eff.unstable_exit_code);
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::History {
            repo_root,
            output,
            history,
        } => {
            let eff = config::resolve_effective(&CliOverrides {
                repo_root,
                output,
                history,
                ..Default::default()
            })
            .unwrap_or_else(|e| fail(e));
            let h = History::load(&eff.history_path).unwrap_or_else(|e| fail(e));
            output::print_history(&h, &eff.output);
        }
    }
}
