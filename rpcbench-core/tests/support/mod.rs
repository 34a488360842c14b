#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rpcbench_core::{
    BenchChannel, Connector, GrpcError, JobDescriptor, PROP_COLLECT_LATENCY, PROP_SCENARIO,
    SimpleRequest, SimpleResponse, unix_nanos_now,
};

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// The call fails but the connection stays up.
    Status,
    /// The transport reports the connection gone.
    Lost,
}

/// Connector whose channels answer after a fixed delay and can be told to fail.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    pub delay: Duration,
    /// Connection index -> (successful calls before failing, failure kind). Keyed by connect
    /// order, which follows the connection index on a current-thread runtime.
    pub fail_after: HashMap<usize, (usize, Failure)>,
    pub connects: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing(mut self, connection: usize, after: usize, failure: Failure) -> Self {
        self.fail_after.insert(connection, (after, failure));
        self
    }
}

pub struct ScriptedChannel {
    delay: Duration,
    fail_after: Option<(usize, Failure)>,
    calls: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl Connector for ScriptedConnector {
    type Channel = ScriptedChannel;

    fn connect(
        &self,
        _target: &str,
    ) -> impl Future<Output = rpcbench_core::GrpcResult<ScriptedChannel>> + Send {
        let index = self.connects.fetch_add(1, Ordering::Relaxed);
        let channel = ScriptedChannel {
            delay: self.delay,
            fail_after: self.fail_after.get(&index).copied(),
            calls: AtomicUsize::new(0),
            closed: self.closed.clone(),
        };
        async move { Ok(channel) }
    }
}

impl BenchChannel for ScriptedChannel {
    fn unary_call(
        &self,
        _request: SimpleRequest,
        _timeout: Option<Duration>,
    ) -> impl Future<Output = rpcbench_core::GrpcResult<SimpleResponse>> + Send {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let fail = self
            .fail_after
            .filter(|(after, _)| call >= *after)
            .map(|(_, failure)| failure);
        let delay = self.delay;

        async move {
            tokio::time::sleep(delay).await;
            match fail {
                Some(Failure::Status) => Err(GrpcError::Status(tonic::Status::internal("boom"))),
                Some(Failure::Lost) => Err(GrpcError::Closed),
                None => Ok(SimpleResponse {
                    server_timestamp_unix_nanos: unix_nanos_now(),
                    payload: Default::default(),
                }),
            }
        }
    }

    fn close(&self) -> impl Future<Output = ()> + Send {
        self.closed.fetch_add(1, Ordering::Relaxed);
        async {}
    }
}

pub fn unary_descriptor(connections: usize, duration: Duration) -> JobDescriptor {
    JobDescriptor {
        connections,
        duration,
        target: "scripted".to_string(),
        scenario: None,
        properties: HashMap::from([(PROP_SCENARIO.to_string(), "Unary".to_string())]),
    }
}

pub fn with_latency(mut desc: JobDescriptor) -> JobDescriptor {
    desc.properties
        .insert(PROP_COLLECT_LATENCY.to_string(), "true".to_string());
    desc
}
