//! Error type shared by config, collector, history and publisher.
//! The risk gate itself is total and has no error variant.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RiskgateError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid value for {field}: {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Invalid threshold override '{input}': {message}")]
    ThresholdOverride { input: String, message: String },

    #[error("Invalid input pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("No input files matched '{0}'")]
    NoInput(String),

    #[error("{path} is not a valid {kind} export: {message}")]
    InputParse {
        path: PathBuf,
        kind: &'static str,
        message: String,
    },

    #[error("History file {path} is corrupt: {message}")]
    History { path: PathBuf, message: String },
}

impl RiskgateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RiskgateError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = RiskgateError> = std::result::Result<T, E>;
