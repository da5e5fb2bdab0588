//! Descriptive statistics over a measurement.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub samples: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation (divides by `n`).
    pub standard_deviation: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Nearest-rank index `floor(n * q)` into an ascending slice of length `n`.
///
/// Clamped to `n - 1` so the index can never run past the end.
pub fn nearest_rank_index(n: usize, q: f64) -> usize {
    let idx = (n as f64 * q).floor() as usize;
    idx.min(n.saturating_sub(1))
}

/// Summarize per-call durations in milliseconds. Input order does not matter.
pub fn summarize(samples_ms: &[f64]) -> Result<Statistics, InvalidInputError> {
    if samples_ms.is_empty() {
        return Err(InvalidInputError::EmptyMeasurement);
    }
    if let Some((index, &value)) = samples_ms
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        return Err(InvalidInputError::InvalidSample { index, value });
    }

    let mut sorted = samples_ms.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n = sorted.len();
    // Summation error can leave the raw mean a hair outside [min, max] for constant input.
    let mean = (sorted.iter().sum::<f64>() / n as f64).clamp(sorted[0], sorted[n - 1]);
    let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };

    Ok(Statistics {
        samples: n,
        min: sorted[0],
        max: sorted[n - 1],
        mean,
        median,
        standard_deviation: variance.sqrt(),
        p95: sorted[nearest_rank_index(n, 0.95)],
        p99: sorted[nearest_rank_index(n, 0.99)],
    })
}
