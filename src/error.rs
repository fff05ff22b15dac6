//! Error types for the configuration and storage boundary
//!
//! Detectors never fail: a missing baseline or a degenerate field yields an
//! empty or partial result. Only the managers that own configuration and
//! stored state (thresholds, baselines, history, run configuration) return
//! these errors, and they are always surfaced to the caller.

use thiserror::Error;

/// Errors raised at the Baseline/Threshold/History manager boundary
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid threshold {category}.{metric}: {reason}")]
    InvalidThreshold {
        category: String,
        metric: String,
        reason: String,
    },

    #[error("Baseline not found: {0}")]
    BaselineNotFound(String),

    #[error("Baseline already established for version {0}")]
    BaselineExists(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Malformed snapshot: {0}")]
    Snapshot(String),

    #[error("Corrupt history log at line {line}: {reason}")]
    CorruptHistory { line: usize, reason: String },

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for manager operations
pub type Result<T> = std::result::Result<T, EngineError>;
