use std::collections::HashMap;
use std::time::Duration;

use crate::progress::ProgressFn;

use super::error::{Error, Result};

pub const PROP_SCENARIO: &str = "Scenario";
pub const PROP_COLLECT_LATENCY: &str = "CollectLatency";
pub const PROP_REQUEST_SIZE: &str = "RequestSize";
pub const PROP_RESPONSE_SIZE: &str = "ResponseSize";

/// Upper bound on `connections`: each one holds its own local port.
pub const MAX_CONNECTIONS: usize = u16::MAX as usize;

/// A load-test job as handed over by the orchestration layer.
#[derive(Debug, Clone, Default)]
pub struct JobDescriptor {
    pub connections: usize,
    pub duration: Duration,
    pub target: String,

    /// Scenario identifier. The `Scenario` property takes precedence when both are set.
    pub scenario: Option<String>,

    /// Free-form string properties (`Scenario`, `CollectLatency`, ...). Unknown keys are ignored.
    pub properties: HashMap<String, String>,
}

/// Workload pattern issued on every connection (the string form used by properties/CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
#[strum(ascii_case_insensitive)]
pub enum ScenarioKind {
    Unary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LatencyMode {
    /// Keep every sample; enables percentiles.
    Detailed,
    /// Keep a running `(sum, count)` per connection; average only.
    Aggregate,
}

/// Typed job configuration, built once from a [`JobDescriptor`] before any connection opens.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub connections: usize,
    pub duration: Duration,
    pub target: String,
    pub scenario: ScenarioKind,
    pub latency_mode: LatencyMode,
    pub request_size: usize,
    pub response_size: i32,
}

impl JobConfig {
    pub fn from_descriptor(desc: &JobDescriptor) -> Result<Self> {
        if !(1..=MAX_CONNECTIONS).contains(&desc.connections) {
            return Err(Error::InvalidConnections);
        }

        let scenario_name = desc
            .properties
            .get(PROP_SCENARIO)
            .or(desc.scenario.as_ref())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or(Error::MissingProperty(PROP_SCENARIO))?;
        let scenario: ScenarioKind = scenario_name
            .parse()
            .map_err(|_| Error::UnknownScenario(scenario_name.to_string()))?;

        let collect_latency = match desc.properties.get(PROP_COLLECT_LATENCY) {
            Some(v) => parse_bool(PROP_COLLECT_LATENCY, v)?,
            None => false,
        };
        let latency_mode = if collect_latency {
            LatencyMode::Detailed
        } else {
            LatencyMode::Aggregate
        };

        let request_size = match desc.properties.get(PROP_REQUEST_SIZE) {
            Some(v) => parse_size(PROP_REQUEST_SIZE, v)?,
            None => 0,
        };

        let response_size = match desc.properties.get(PROP_RESPONSE_SIZE) {
            Some(v) => i32::try_from(parse_size(PROP_RESPONSE_SIZE, v)?).map_err(|_| {
                Error::InvalidProperty {
                    key: PROP_RESPONSE_SIZE,
                    value: v.clone(),
                }
            })?,
            None => 0,
        };

        Ok(Self {
            connections: desc.connections,
            duration: desc.duration,
            target: desc.target.clone(),
            scenario,
            latency_mode,
            request_size,
            response_size,
        })
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::InvalidProperty {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_size(key: &'static str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| Error::InvalidProperty {
        key,
        value: value.to_string(),
    })
}

/// Runtime settings supplied by the caller rather than by the job descriptor.
#[derive(Clone)]
pub struct JobOptions {
    pub request_timeout: Duration,

    /// Delay after all connections are closed, letting the remote endpoint settle.
    pub grace: Duration,

    /// Added to every observed latency to correct client/server clock skew.
    pub clock_offset_ms: f64,

    pub progress: Option<ProgressFn>,
    pub progress_interval: Duration,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            grace: Duration::from_secs(1),
            clock_offset_ms: 0.0,
            progress: None,
            progress_interval: Duration::from_secs(1),
        }
    }
}

impl std::fmt::Debug for JobOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOptions")
            .field("request_timeout", &self.request_timeout)
            .field("grace", &self.grace)
            .field("clock_offset_ms", &self.clock_offset_ms)
            .field("progress", &self.progress.is_some())
            .field("progress_interval", &self.progress_interval)
            .finish()
    }
}
