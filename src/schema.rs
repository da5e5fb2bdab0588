use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Transfer;
use crate::providers::OperationKind;
use crate::stats::Statistics;
use crate::BenchmarkType;

pub const SCHEMA_VERSION: u32 = 1;

/// Best-effort origin of the run. `success: false` carries the reason instead of fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GeoLocation {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEcho {
    pub profile: String,
    pub iterations: usize,
    pub warmup_iterations: usize,
    pub message: String,
    pub transfer: Transfer,
    pub seed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Whether transaction reference points came from a live chain RPC.
    pub live_chain: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResult {
    pub raw_times: Vec<f64>,
    pub statistics: Statistics,
}

/// Single-operation runs store one result per service; comprehensive runs one per operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceSection {
    Single(ServiceResult),
    PerOperation(BTreeMap<OperationKind, ServiceResult>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub rank: usize,
    pub service: String,
    pub mean_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Difference {
    pub faster: String,
    pub slower: String,
    pub percent_slower: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slowest: Option<String>,
    pub rankings: Vec<Ranking>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub differences: Vec<Difference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparisonSection {
    Single(Comparison),
    PerOperation(BTreeMap<OperationKind, Comparison>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedProvider {
    pub service: String,
    pub stage: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub schema_version: u32,
    pub bench_version: String,
    pub timestamp: String,
    pub geo_location: GeoLocation,
    pub benchmark_type: BenchmarkType,
    pub config: ConfigEcho,
    pub services: BTreeMap<String, ServiceSection>,
    pub comparison: ComparisonSection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedProvider>,
}
