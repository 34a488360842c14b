mod clock;
mod collector;
mod config;
mod driver;
mod error;
mod grpc;
mod job;
mod pool;
mod progress;
mod scenario;
mod signal;
mod stats;

pub use clock::{latency_ms, unix_nanos_now};
pub use collector::{FrozenEntry, FrozenSamples, LatencySamples, SampleCollector};
pub use config::{
    JobConfig, JobDescriptor, JobOptions, LatencyMode, MAX_CONNECTIONS, PROP_COLLECT_LATENCY,
    PROP_REQUEST_SIZE, PROP_RESPONSE_SIZE, PROP_SCENARIO, ScenarioKind,
};
pub use error::{Error, ErrorLog, Result};
pub use grpc::{
    ConnectOptions, CredentialBundle, Error as GrpcError, GrpcChannel, GrpcConnector,
    GrpcTransportErrorKind, Result as GrpcResult, SimpleRequest, SimpleResponse, UNARY_CALL_PATH,
};
pub use job::{Job, JobResult, JobState};
pub use pool::{BenchChannel, ChannelPool, CloseReason, Connection, Connector};
pub use progress::{ProgressFn, ProgressUpdate};
pub use scenario::Workload;
pub use signal::{Signal, StopGate};
pub use stats::{
    LatencySummary, Percentiles, RunReport, StatsError, latency_summary, percentile,
    requests_per_sec, summarize,
};
