//! End-to-end benchmark pipeline: registry, harness, statistics, report.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::chain::ChainClient;
use crate::config::{BenchmarkConfig, Environment};
use crate::error::BenchError;
use crate::providers::{Operation, ProviderContext};
use crate::registry::{Registry, SetupLog};
use crate::report::{self, OperationResults, RunMetadata};
use crate::schema::{ConfigEcho, GeoLocation, Report, ServiceResult};
use crate::{geo, harness, stats};

fn echo(cfg: &BenchmarkConfig) -> ConfigEcho {
    ConfigEcho {
        profile: cfg.profile.as_str().to_string(),
        iterations: cfg.iterations,
        warmup_iterations: cfg.warmup_iterations,
        message: cfg.message.clone(),
        transfer: cfg.transfer.clone(),
        seed: cfg.seed,
        provider: cfg.provider.clone(),
        live_chain: cfg.chain_rpc_url.is_some(),
    }
}

/// Run every operation of the configured benchmark against every usable provider.
///
/// Providers run one at a time, operations in order. The first measurement failure ends the
/// run with no report.
pub async fn run(
    registry: Registry,
    env: Environment,
    cfg: &BenchmarkConfig,
) -> Result<Report, BenchError> {
    cfg.validate()?;
    let registry = match &cfg.provider {
        Some(name) => registry.only(name)?,
        None => registry,
    };

    let timestamp = report::timestamp_now();
    let chain = match &cfg.chain_rpc_url {
        Some(url) => ChainClient::rpc(url.as_str()),
        None => ChainClient::synthetic(cfg.seed),
    };
    let ctx = ProviderContext {
        env,
        chain: Arc::new(chain),
        seed: cfg.seed,
    };

    let mut log = SetupLog::new(cfg.strict);
    let ready = registry.prepare(&ctx, &mut log).await?;
    info!(
        providers = ready.len(),
        benchmark = cfg.benchmark.as_str(),
        iterations = cfg.iterations,
        warmup = cfg.warmup_iterations,
        "starting benchmark"
    );

    let mut results = Vec::new();
    for &kind in cfg.benchmark.operations() {
        let operation = Operation::from_config(kind, cfg);
        let mut op_results: OperationResults = BTreeMap::new();
        for (name, provider) in &ready {
            info!(service = %name, operation = kind.as_str(), "running");
            let measurement = harness::run(
                provider.session.as_ref(),
                &provider.wallet,
                &operation,
                cfg.iterations,
                cfg.warmup_iterations,
            )
            .await?;
            let statistics = stats::summarize(&measurement.samples_ms)?;
            info!(
                service = %name,
                operation = kind.as_str(),
                mean_ms = statistics.mean,
                p95_ms = statistics.p95,
                "done"
            );
            op_results.insert(
                name.clone(),
                ServiceResult {
                    raw_times: measurement.samples_ms,
                    statistics,
                },
            );
        }
        results.push((kind, op_results));
    }

    let geo_location = match &cfg.geo_endpoint {
        Some(endpoint) => geo::lookup(endpoint).await,
        None => GeoLocation::unavailable("disabled"),
    };

    Ok(report::build(
        cfg.benchmark,
        results,
        echo(cfg),
        RunMetadata {
            timestamp,
            geo_location,
            skipped: log.into_skipped(),
        },
    ))
}
