use std::time::Duration;

use crate::collector::{FrozenEntry, FrozenSamples, LatencySamples};
use crate::config::LatencyMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    #[error("job failed to run: elapsed time is zero")]
    ZeroElapsed,

    #[error("job failed to run: no requests completed")]
    NoRequests,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentiles {
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p99: f64,
    pub p100: f64,
}

/// Latency figures in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub average: f64,
    /// `None` in aggregate mode.
    pub percentiles: Option<Percentiles>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub requests: u64,
    pub connection_requests: Vec<u64>,
    pub connection_requests_min: u64,
    pub connection_requests_max: u64,
    pub requests_per_sec: Option<f64>,
    pub latency: Option<LatencySummary>,
    /// Set when the run is statistically degenerate; rate and latency are then left unset.
    pub failure: Option<StatsError>,
}

/// `(now - prev) / elapsed_ms * 1000`. The first report of a run uses `prev = 0`.
pub fn requests_per_sec(
    now_total: u64,
    prev_total: u64,
    elapsed_ms: f64,
) -> Result<f64, StatsError> {
    if !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
        return Err(StatsError::ZeroElapsed);
    }

    let delta = now_total.saturating_sub(prev_total);
    Ok(delta as f64 / elapsed_ms * 1000.0)
}

/// Percentile `p` (0..=100) of an ascending sequence, interpolating between the two
/// bracketing order statistics.
///
/// `rank = p * n / 100 + 0.5`; the result is
/// `(1 - frac) * seq[floor(rank) - 1] + frac * seq[ceil(rank) - 1]` with both 1-based ranks
/// clamped to `1..=n`. `p = 100` is the maximum.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    let max = *sorted.last()?;
    if p >= 100.0 {
        return Some(max);
    }

    let rank = p * (n as f64) / 100.0 + 0.5;
    let lower = rank.floor();
    let frac = rank - lower;

    let lo = (lower as usize).clamp(1, n) - 1;
    let hi = (rank.ceil() as usize).clamp(1, n) - 1;

    Some((1.0 - frac) * sorted[lo] + frac * sorted[hi])
}

fn percentiles(sorted: &[f64]) -> Option<Percentiles> {
    Some(Percentiles {
        p50: percentile(sorted, 50.0)?,
        p75: percentile(sorted, 75.0)?,
        p90: percentile(sorted, 90.0)?,
        p99: percentile(sorted, 99.0)?,
        p100: percentile(sorted, 100.0)?,
    })
}

/// Reduces frozen latency data to a summary; `None` when there are no samples.
///
/// Detailed sample vectors are sorted in place and pooled without copying.
pub fn latency_summary(mode: LatencyMode, entries: Vec<FrozenEntry>) -> Option<LatencySummary> {
    match mode {
        LatencyMode::Detailed => {
            let mut pooled: Vec<f64> = Vec::with_capacity(
                entries
                    .iter()
                    .map(|e| e.latency.count() as usize)
                    .sum::<usize>(),
            );

            for (index, entry) in entries.into_iter().enumerate() {
                let LatencySamples::Detailed(mut own) = entry.latency else {
                    continue;
                };

                own.sort_by(f64::total_cmp);
                if let (Some(p50), Some(max)) = (percentile(&own, 50.0), own.last()) {
                    tracing::trace!(
                        connection = index,
                        samples = own.len(),
                        p50,
                        max,
                        "connection latency"
                    );
                }
                pooled.append(&mut own);
            }

            if pooled.is_empty() {
                return None;
            }

            pooled.sort_by(f64::total_cmp);
            let average = pooled.iter().sum::<f64>() / pooled.len() as f64;

            Some(LatencySummary {
                average,
                percentiles: percentiles(&pooled),
            })
        }
        LatencyMode::Aggregate => {
            let (sum, count) = entries.iter().fold((0.0f64, 0u64), |(sum, count), e| {
                match e.latency {
                    LatencySamples::Aggregate { sum: s, count: c } => (sum + s, count + c),
                    LatencySamples::Detailed(_) => (sum, count),
                }
            });

            if count == 0 {
                return None;
            }

            Some(LatencySummary {
                average: sum / count as f64,
                percentiles: None,
            })
        }
    }
}

/// End-of-job reduction. Takes the frozen samples by value so latency data is never copied.
pub fn summarize(frozen: FrozenSamples, elapsed: Duration) -> RunReport {
    let connection_requests: Vec<u64> = frozen.entries.iter().map(|e| e.requests).collect();
    let requests: u64 = connection_requests.iter().sum();
    let connection_requests_min = connection_requests.iter().copied().min().unwrap_or(0);
    let connection_requests_max = connection_requests.iter().copied().max().unwrap_or(0);

    let mut report = RunReport {
        requests,
        connection_requests,
        connection_requests_min,
        connection_requests_max,
        requests_per_sec: None,
        latency: None,
        failure: None,
    };

    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    let requests_per_sec = match requests_per_sec(requests, 0, elapsed_ms) {
        Ok(v) => v,
        Err(err) => {
            report.failure = Some(err);
            return report;
        }
    };

    if requests == 0 {
        report.failure = Some(StatsError::NoRequests);
        return report;
    }

    report.requests_per_sec = Some(requests_per_sec);
    report.latency = latency_summary(frozen.mode, frozen.entries);
    report
}
