use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    let unit = unit_str.trim();
    match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "us" | "Âµs" | "usec" | "usecs" | "microsecond" | "microseconds" => {
            Ok(Duration::from_micros(value))
        }
        "ns" | "nsec" | "nsecs" | "nanosecond" | "nanoseconds" => Ok(Duration::from_nanos(value)),
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        "h" | "hr" | "hrs" | "hour" | "hours" => {
            let secs = value
                .checked_mul(60)
                .and_then(|v| v.checked_mul(60))
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress bar and summary.
    HumanReadable,
    /// Emit JSON progress and summary lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "rpcbench",
    author,
    version,
    about = "Closed-loop gRPC load generator",
    long_about = "rpcbench opens a fixed number of HTTP/2 connections to a gRPC endpoint and keeps exactly one request in flight on each of them for the configured duration.\n\nAt the end of the run it reports total requests, requests/sec and latency (average, plus percentiles with --collect-latency).",
    after_help = "Examples:\n  rpcbench run --target 127.0.0.1:50051 --scenario unary\n  rpcbench run --target 127.0.0.1:50051 --scenario unary --connections 64 --duration 30s --collect-latency\n  rpcbench run --target bench.example.com:443 --scenario unary --ca ca.pem --output json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a benchmark job against a target
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Target endpoint (host:port or full URI)
    #[arg(long, env = "RPCBENCH_TARGET")]
    pub target: String,

    /// Number of connections, each with one request in flight
    #[arg(long, default_value_t = 1)]
    pub connections: usize,

    /// Run duration (e.g. 10s, 250ms, 1m)
    #[arg(long, value_parser = parse_duration, default_value = "10s")]
    pub duration: Duration,

    /// Scenario to issue on every connection (e.g. unary)
    #[arg(long)]
    pub scenario: Option<String>,

    /// Keep every latency sample and report percentiles
    #[arg(long)]
    pub collect_latency: bool,

    /// Job property (repeatable, KEY=VALUE). Overrides the flags above.
    #[arg(long = "property", value_name = "KEY=VALUE")]
    pub properties: Vec<String>,

    /// Per-request deadline; 0 disables it
    #[arg(long, value_parser = parse_duration, default_value = "5s")]
    pub timeout: Duration,

    /// Delay after closing connections before exiting
    #[arg(long, value_parser = parse_duration, default_value = "1s")]
    pub grace: Duration,

    /// Milliseconds added to every latency sample to correct clock skew
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub clock_offset_ms: f64,

    /// PEM-encoded CA certificate; enables TLS
    #[arg(long, value_name = "PEM")]
    pub ca: Option<PathBuf>,

    /// PEM-encoded client certificate (requires --key)
    #[arg(long, value_name = "PEM", requires = "key")]
    pub cert: Option<PathBuf>,

    /// PEM-encoded client private key (requires --cert)
    #[arg(long, value_name = "PEM", requires = "cert")]
    pub key: Option<PathBuf>,

    /// TLS server name override; enables TLS
    #[arg(long)]
    pub domain: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

impl RunArgs {
    pub fn tls_requested(&self) -> bool {
        self.ca.is_some() || self.cert.is_some() || self.domain.is_some()
    }
}
