use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::BenchmarkType;

/// Message signed by the message-signing benchmark.
pub const DEFAULT_MESSAGE: &str = "Hello from the MPC latency benchmark!";

/// Destination of the benchmark transfer. Never broadcast.
pub const DEFAULT_DESTINATION: &str = "0x000000000000000000000000000000000000dEaD";

/// Transfer amount in the chain's smallest unit.
pub const DEFAULT_AMOUNT: u64 = 1_000;

pub const DEFAULT_RESULTS_DIR: &str = "results";

pub const DEFAULT_GEO_ENDPOINT: &str = "http://ip-api.com/json";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }

    pub fn warmup_iters(&self) -> usize {
        match self {
            Profile::Quick => 2,
            Profile::Full => 10,
        }
    }

    pub fn iters(&self) -> usize {
        match self {
            Profile::Quick => 10,
            Profile::Full => 100,
        }
    }
}

/// A transfer whose signing latency is measured.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub destination: String,
    pub amount: u64,
}

impl Default for Transfer {
    fn default() -> Self {
        Self {
            destination: DEFAULT_DESTINATION.to_string(),
            amount: DEFAULT_AMOUNT,
        }
    }
}

/// Everything a run needs, built once at process start.
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    pub benchmark: BenchmarkType,
    pub profile: Profile,
    pub iterations: usize,
    pub warmup_iterations: usize,
    pub message: String,
    pub transfer: Transfer,
    /// Seeds key generation for in-process signers.
    pub seed: u64,
    pub results_dir: PathBuf,
    /// JSON-RPC endpoint for the latest block hash. `None` uses synthetic reference points.
    pub chain_rpc_url: Option<String>,
    /// `None` disables the geolocation lookup.
    pub geo_endpoint: Option<String>,
    /// Restrict the run to one registered provider.
    pub provider: Option<String>,
    /// Any setup failure aborts the run instead of dropping the provider.
    pub strict: bool,
}

impl BenchmarkConfig {
    pub fn new(benchmark: BenchmarkType, profile: Profile) -> Self {
        Self {
            benchmark,
            profile,
            iterations: profile.iters(),
            warmup_iterations: profile.warmup_iters(),
            message: DEFAULT_MESSAGE.to_string(),
            transfer: Transfer::default(),
            seed: 0,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            chain_rpc_url: None,
            geo_endpoint: Some(DEFAULT_GEO_ENDPOINT.to_string()),
            provider: None,
            strict: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.iterations == 0 {
            return Err(invalid("iterations", "must be at least 1"));
        }
        if self.message.is_empty() {
            return Err(invalid("message", "must not be empty"));
        }
        if self.transfer.destination.trim().is_empty() {
            return Err(invalid("transfer.destination", "must not be empty"));
        }
        if self.transfer.amount == 0 {
            return Err(invalid("transfer.amount", "must be greater than zero"));
        }
        if matches!(&self.chain_rpc_url, Some(url) if url.trim().is_empty()) {
            return Err(invalid("chain_rpc_url", "must not be empty when set"));
        }
        if matches!(&self.geo_endpoint, Some(url) if url.trim().is_empty()) {
            return Err(invalid("geo_endpoint", "must not be empty when set"));
        }
        if matches!(&self.provider, Some(name) if name.trim().is_empty()) {
            return Err(invalid("provider", "must not be empty when set"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigurationError {
    ConfigurationError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

/// Snapshot of the process environment.
///
/// Providers read credentials from here, never from `std::env` directly.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigurationError> {
        self.get(key)
            .ok_or_else(|| ConfigurationError::MissingVariable(key.to_string()))
    }
}
