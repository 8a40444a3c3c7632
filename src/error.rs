//! Error types for Pulse Stitch

use thiserror::Error;

/// Errors that can terminate an operation.
///
/// Per-sample, per-file and per-transition problems are not errors: they are
/// contained where they happen and surface in the result structures instead.
#[derive(Debug, Error)]
pub enum StitchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid date '{0}': expected DD.MM.YY (e.g. 06.08.25)")]
    InvalidDate(String),

    #[error("Invalid gap thresholds: error threshold {error_gap_ms}ms is below warning threshold {warn_gap_ms}ms")]
    InvalidThresholds { warn_gap_ms: i64, error_gap_ms: i64 },

    #[error("Data directory '{path}' is not accessible ({reason}); check that it exists and is readable")]
    DirectoryUnavailable { path: String, reason: String },

    #[error("Failed to decode '{file}': {reason}")]
    Decode { file: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl From<bincode::Error> for StitchError {
    fn from(e: bincode::Error) -> Self {
        StitchError::Snapshot(e.to_string())
    }
}

impl From<toml::de::Error> for StitchError {
    fn from(e: toml::de::Error) -> Self {
        StitchError::Config(e.to_string())
    }
}
