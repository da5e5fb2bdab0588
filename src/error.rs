//! Error taxonomy for the benchmark pipeline.
//!
//! Setup failures (discovery, initialization, wallet provisioning) are recoverable per provider.
//! Failures inside the timed phase are not: they surface as [`OperationError`] and end the run.

use std::fmt;
use std::io;

/// Required credentials or configuration are missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// An environment variable the provider needs is not set (or empty).
    #[error("missing environment variable {0}")]
    MissingVariable(String),

    /// A configuration field failed validation.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A provider SDK or gateway call failed.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The provider answered but refused the request (auth failure, bad request, rate limit).
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with something we could not interpret.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Fetching the chain reference point failed.
    #[error("chain rpc error: {0}")]
    Chain(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("unknown wallet {0}")]
    UnknownWallet(String),

    #[error("payload encoding failed: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Malformed input to the statistics aggregator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInputError {
    #[error("cannot summarize an empty measurement")]
    EmptyMeasurement,

    #[error("sample {index} is not a finite non-negative duration: {value}")]
    InvalidSample { index: usize, value: f64 },
}

/// Geolocation lookup failure. Never fatal; folded into the report as absent data.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("geolocation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("geolocation service reported failure: {0}")]
    Lookup(String),
}

/// Which part of a harness run a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Warmup,
    Measured,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Warmup => f.write_str("warm-up"),
            Phase::Measured => f.write_str("measured"),
        }
    }
}

/// A provider call failed while the harness was running an operation.
///
/// Partial measurements are dropped when this is produced.
#[derive(Debug, thiserror::Error)]
#[error("{provider} {operation} failed during {phase} iteration {iteration}: {source}")]
pub struct OperationError {
    pub provider: String,
    pub operation: &'static str,
    pub phase: Phase,
    /// 1-based index within the phase.
    pub iteration: usize,
    #[source]
    pub source: ProviderError,
}

/// Top-level failure of a benchmark run.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A provider failed during setup while running in strict (single-provider) mode.
    #[error("provider {provider} failed during {stage}: {source}")]
    Setup {
        provider: String,
        stage: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("no providers left with a usable wallet")]
    NoUsableProviders,

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
