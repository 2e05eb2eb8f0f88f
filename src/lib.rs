//! riskgate core library.
//!
//! Decides whether a CI build passes, becomes unstable or fails based on the
//! findings and policy violations a Dependency-Track server reports for it.
//!
//! High-level modules:
//! - `models`: Severity/violation levels, distributions, export models, verdicts.
//! - `thresholds`: Threshold configuration and per-build overrides.
//! - `risk_gate`: The verdict evaluator.
//! - `collect`: Input discovery, parsing and de-duplication.
//! - `history`: Recorded builds and previous-build lookup.
//! - `publish`: One build evaluation end to end.
//! - `config`: Discovery and effective configuration resolution.
//! - `cli`: CLI argument parsing (binary uses this).
//! - `output`: Human/JSON printers.
//! - `error`: Shared error type.
pub mod cli;
pub mod collect;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod output;
pub mod publish;
pub mod risk_gate;
pub mod thresholds;

pub use error::{Result, RiskgateError};
pub use models::Verdict;
pub use risk_gate::RiskGate;
pub use thresholds::Thresholds;
