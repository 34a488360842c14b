use serde::Serialize;
use std::io::Write as _;
use std::sync::Arc;

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _desc: &rpcbench_core::JobDescriptor) {}

    fn progress(&self) -> Option<rpcbench_core::ProgressFn> {
        Some(Arc::new(move |u| {
            let line = build_progress_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, res: &rpcbench_core::JobResult) -> anyhow::Result<()> {
        let line = build_summary_line(res);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub tick: u64,
    pub elapsed_secs: f64,
    pub interval_secs: f64,

    pub requests_per_sec: f64,
    pub total_requests: u64,

    pub connection_requests_min: u64,
    pub connection_requests_max: u64,
}

fn build_progress_line(u: &rpcbench_core::ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        tick: u.tick,
        elapsed_secs: u.elapsed.as_secs_f64(),
        interval_secs: u.interval.as_secs_f64(),
        requests_per_sec: u.requests_per_sec,
        total_requests: u.requests_total,
        connection_requests_min: u.connection_requests_min,
        connection_requests_max: u.connection_requests_max,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub state: String,
    pub elapsed_secs: Option<f64>,

    pub total_requests: u64,
    pub requests_per_sec: Option<f64>,
    pub connection_requests: Vec<u64>,
    pub connection_requests_min: u64,
    pub connection_requests_max: u64,

    pub latency: Option<JsonLatencySummary>,

    /// One entry per error line.
    pub errors: Vec<String>,
}

/// Milliseconds.
#[derive(Debug, Serialize)]
pub(crate) struct JsonLatencySummary {
    pub average: f64,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub p99: Option<f64>,
    pub max: Option<f64>,
}

fn build_summary_line(res: &rpcbench_core::JobResult) -> JsonSummaryLine {
    JsonSummaryLine {
        kind: "summary",
        state: res.state.to_string(),
        elapsed_secs: res.elapsed.map(|d| d.as_secs_f64()),
        total_requests: res.requests,
        requests_per_sec: res.requests_per_sec,
        connection_requests: res.connection_requests.clone(),
        connection_requests_min: res.connection_requests_min,
        connection_requests_max: res.connection_requests_max,
        latency: res.latency.map(|l| {
            let p = l.percentiles;
            JsonLatencySummary {
                average: l.average,
                p50: p.map(|p| p.p50),
                p75: p.map(|p| p.p75),
                p90: p.map(|p| p.p90),
                p99: p.map(|p| p.p99),
                max: p.map(|p| p.p100),
            }
        }),
        errors: res.error.lines().map(str::to_string).collect(),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
