use std::time::Duration;

use bytes::Bytes;

use crate::clock;
use crate::config::{JobConfig, JobOptions, ScenarioKind};
use crate::grpc::{self, SimpleRequest};
use crate::pool::BenchChannel;

/// The request pattern a driver repeats on its connection.
#[derive(Debug, Clone)]
pub struct Workload {
    kind: ScenarioKind,
    request: SimpleRequest,
    timeout: Option<Duration>,
    clock_offset_ms: f64,
}

impl Workload {
    pub fn new(cfg: &JobConfig, opts: &JobOptions) -> Self {
        Self {
            kind: cfg.scenario,
            request: SimpleRequest {
                response_size: cfg.response_size,
                payload: Bytes::from(vec![0u8; cfg.request_size]),
            },
            timeout: Some(opts.request_timeout).filter(|t| !t.is_zero()),
            clock_offset_ms: opts.clock_offset_ms,
        }
    }

    pub fn kind(&self) -> ScenarioKind {
        self.kind
    }

    /// Issues one request and returns the observed latency in milliseconds.
    pub async fn issue<C: BenchChannel>(&self, channel: &C) -> grpc::Result<f64> {
        match self.kind {
            ScenarioKind::Unary => self.unary(channel).await,
        }
    }

    async fn unary<C: BenchChannel>(&self, channel: &C) -> grpc::Result<f64> {
        let res = channel
            .unary_call(self.request.clone(), self.timeout)
            .await?;
        let received = clock::unix_nanos_now();

        Ok(clock::latency_ms(
            received,
            res.server_timestamp_unix_nanos,
            self.clock_offset_ms,
        ))
    }
}
