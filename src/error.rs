//! Error taxonomy for the forecast pipeline
//!
//! Every stage surfaces its own failure kind to the caller. Nothing here is
//! retried or replaced by a default value.

use thiserror::Error;

/// Boxed error returned by an external proof-generation service
pub type BoxedSourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur anywhere in the forecast pipeline
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Invalid observation: {0}")]
    Validation(String),

    #[error("No observations recorded for node '{0}'")]
    NotFound(String),

    #[error("Insufficient data: cannot estimate an hourly profile from {0} observations")]
    InsufficientData(usize),

    #[error("Profile gap: hour {hour} has no historical coverage for node '{node_id}'")]
    ProfileGap { node_id: String, hour: u32 },

    #[error("Cannot encode PUE {value} as fixed-point: {reason}")]
    Encoding { value: f64, reason: String },

    #[error("Proof generation failed for node '{node_id}': {source}")]
    ProofGeneration {
        node_id: String,
        #[source]
        source: BoxedSourceError,
    },

    #[error("Node '{node_id}' did not finish within {timeout_ms} ms")]
    Timeout { node_id: String, timeout_ms: u64 },

    #[error("Worker for node '{node_id}' panicked: {message}")]
    WorkerPanicked { node_id: String, message: String },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, ForecastError>;

impl ForecastError {
    /// Short machine-friendly name of the error kind, used in logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::Validation(_) => "validation",
            ForecastError::NotFound(_) => "not_found",
            ForecastError::InsufficientData(_) => "insufficient_data",
            ForecastError::ProfileGap { .. } => "profile_gap",
            ForecastError::Encoding { .. } => "encoding",
            ForecastError::ProofGeneration { .. } => "proof_generation",
            ForecastError::Timeout { .. } => "timeout",
            ForecastError::WorkerPanicked { .. } => "worker_panicked",
            ForecastError::Parse { .. } => "parse",
            ForecastError::Config(_) => "config",
            ForecastError::Io(_) => "io",
        }
    }
}
