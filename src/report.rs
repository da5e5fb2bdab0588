//! Report assembly: rankings, console summary and JSON persistence.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::providers::OperationKind;
use crate::schema::{
    Comparison, ComparisonSection, ConfigEcho, Difference, GeoLocation, Ranking, Report,
    ServiceResult, ServiceSection, SkippedProvider, SCHEMA_VERSION,
};
use crate::BenchmarkType;

/// Results of one operation, keyed by service name.
pub type OperationResults = BTreeMap<String, ServiceResult>;

/// Run-level data that is not a measurement.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub timestamp: String,
    pub geo_location: GeoLocation,
    pub skipped: Vec<SkippedProvider>,
}

/// RFC 3339 UTC timestamp with millisecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Rank services ascending by mean; equal means fall back to name order.
pub fn compare(results: &OperationResults) -> Comparison {
    let mut order: Vec<(&str, f64)> = results
        .iter()
        .map(|(name, r)| (name.as_str(), r.statistics.mean))
        .collect();
    order.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let rankings: Vec<Ranking> = order
        .iter()
        .enumerate()
        .map(|(i, (name, mean))| Ranking {
            rank: i + 1,
            service: name.to_string(),
            mean_time: *mean,
        })
        .collect();

    if order.len() < 2 {
        return Comparison {
            fastest: None,
            slowest: None,
            rankings,
            differences: Vec::new(),
        };
    }

    let mut differences = Vec::new();
    for (i, (faster, fast_mean)) in order.iter().enumerate() {
        // A zero mean has no meaningful relative difference.
        if *fast_mean <= 0.0 {
            continue;
        }
        for (slower, slow_mean) in &order[i + 1..] {
            differences.push(Difference {
                faster: faster.to_string(),
                slower: slower.to_string(),
                percent_slower: (slow_mean - fast_mean) / fast_mean * 100.0,
            });
        }
    }

    Comparison {
        fastest: order.first().map(|(n, _)| n.to_string()),
        slowest: order.last().map(|(n, _)| n.to_string()),
        rankings,
        differences,
    }
}

pub fn build(
    benchmark: BenchmarkType,
    results: Vec<(OperationKind, OperationResults)>,
    config: ConfigEcho,
    meta: RunMetadata,
) -> Report {
    let (services, comparison) = if let [(_, only)] = results.as_slice() {
        let comparison = ComparisonSection::Single(compare(only));
        let services = only
            .iter()
            .map(|(name, r)| (name.clone(), ServiceSection::Single(r.clone())))
            .collect();
        (services, comparison)
    } else {
        let mut per_service: BTreeMap<String, BTreeMap<OperationKind, ServiceResult>> =
            BTreeMap::new();
        let mut comparisons = BTreeMap::new();
        for (kind, op_results) in results {
            comparisons.insert(kind, compare(&op_results));
            for (name, r) in op_results {
                per_service.entry(name).or_default().insert(kind, r);
            }
        }
        let services = per_service
            .into_iter()
            .map(|(name, ops)| (name, ServiceSection::PerOperation(ops)))
            .collect();
        (services, ComparisonSection::PerOperation(comparisons))
    };

    Report {
        schema_version: SCHEMA_VERSION,
        bench_version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: meta.timestamp,
        geo_location: meta.geo_location,
        benchmark_type: benchmark,
        config,
        services,
        comparison,
        skipped: meta.skipped,
    }
}

fn render_operation(
    out: &mut String,
    title: &str,
    services: &[(&str, &ServiceResult)],
    comparison: &Comparison,
) {
    let _ = writeln!(out, "\n== {title} ==");
    let _ = writeln!(
        out,
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "service", "mean", "median", "p95", "p99", "min", "max", "stddev"
    );
    for (name, r) in services {
        let s = &r.statistics;
        let _ = writeln!(
            out,
            "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
            name, s.mean, s.median, s.p95, s.p99, s.min, s.max, s.standard_deviation
        );
    }

    let _ = writeln!(out, "\nranking (mean, ms):");
    for r in &comparison.rankings {
        let _ = writeln!(out, "  {}. {:<12} {:.2}", r.rank, r.service, r.mean_time);
    }
    if let (Some(fastest), Some(slowest)) = (&comparison.fastest, &comparison.slowest) {
        let _ = writeln!(out, "fastest: {fastest}, slowest: {slowest}");
    }
    for d in &comparison.differences {
        let _ = writeln!(
            out,
            "  {} is {:.1}% slower than {}",
            d.slower, d.percent_slower, d.faster
        );
    }
}

/// Human-readable summary of the same data the JSON carries.
pub fn render_console(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} benchmark @ {} ({} iterations, {} warm-up)",
        report.benchmark_type.as_str(),
        report.timestamp,
        report.config.iterations,
        report.config.warmup_iterations
    );
    match (
        report.geo_location.success,
        &report.geo_location.city,
        &report.geo_location.country,
    ) {
        (true, city, country) => {
            let _ = writeln!(
                out,
                "origin: {}, {}",
                city.as_deref().unwrap_or("?"),
                country.as_deref().unwrap_or("?")
            );
        }
        (false, _, _) => {
            let _ = writeln!(
                out,
                "origin: unavailable ({})",
                report.geo_location.error.as_deref().unwrap_or("unknown")
            );
        }
    }

    match &report.comparison {
        ComparisonSection::Single(comparison) => {
            let services: Vec<(&str, &ServiceResult)> = report
                .services
                .iter()
                .filter_map(|(name, section)| match section {
                    ServiceSection::Single(r) => Some((name.as_str(), r)),
                    ServiceSection::PerOperation(_) => None,
                })
                .collect();
            render_operation(&mut out, report.benchmark_type.as_str(), &services, comparison);
        }
        ComparisonSection::PerOperation(comparisons) => {
            for (kind, comparison) in comparisons {
                let services: Vec<(&str, &ServiceResult)> = report
                    .services
                    .iter()
                    .filter_map(|(name, section)| match section {
                        ServiceSection::PerOperation(ops) => {
                            ops.get(kind).map(|r| (name.as_str(), r))
                        }
                        ServiceSection::Single(_) => None,
                    })
                    .collect();
                render_operation(&mut out, kind.as_str(), &services, comparison);
            }
        }
    }

    if !report.skipped.is_empty() {
        let _ = writeln!(out, "\nskipped:");
        for s in &report.skipped {
            let _ = writeln!(out, "  {} ({}): {}", s.service, s.stage, s.reason);
        }
    }
    out
}

/// `<benchmark>-<timestamp>` with `:` and `.` replaced so it is a safe file name.
pub fn file_stem(report: &Report) -> String {
    format!(
        "{}-{}",
        report.benchmark_type.as_str(),
        report.timestamp.replace([':', '.'], "-")
    )
}

/// Write the report under `dir`, creating it if needed. Returns the path written.
///
/// Never overwrites: a name already taken gets a numeric suffix.
pub fn write(report: &Report, dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
    let stem = file_stem(report);

    let mut attempt = 0usize;
    loop {
        let name = if attempt == 0 {
            format!("{stem}.json")
        } else {
            format!("{stem}-{attempt}.json")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(json.as_bytes())?;
                file.write_all(b"\n")?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}
