use std::sync::Arc;

use crate::collector::SampleCollector;
use crate::error::ErrorLog;
use crate::grpc;
use crate::pool::{BenchChannel, CloseReason, Connection};
use crate::scenario::Workload;
use crate::signal::Signal;

pub(crate) struct DriverContext<C> {
    pub(crate) conn: Arc<Connection<C>>,
    pub(crate) workload: Arc<Workload>,
    pub(crate) collector: Arc<SampleCollector>,
    pub(crate) stop: Arc<Signal>,
    pub(crate) errors: Arc<ErrorLog>,
}

/// Drives one connection until the stop signal fires or the connection fails.
///
/// Exactly one request is in flight at a time. The stop signal is polled before each
/// request; a request already on the wire is never cancelled, and its sample is dropped
/// if the collector froze in the meantime.
pub(crate) async fn run_connection<C: BenchChannel>(ctx: DriverContext<C>) {
    let index = ctx.conn.index();

    loop {
        if ctx.stop.is_fired() {
            break;
        }

        if !ctx.conn.is_open() {
            tracing::warn!(connection = index, "connection closed; driver stopping");
            ctx.errors
                .push(format!("connection {index}: {}", grpc::Error::Closed));
            break;
        }

        match ctx.workload.issue(ctx.conn.channel()).await {
            Ok(latency_ms) => {
                if !ctx.collector.record(index, latency_ms) {
                    // Frozen: statistics are already published.
                    break;
                }
            }
            Err(err) => {
                // The close watcher reports a lost transport; don't write it twice.
                let watched = err.is_connection_lost()
                    && ctx.conn.mark_closed(CloseReason::Lost(err.to_string()));

                if ctx.stop.is_fired() {
                    tracing::debug!(connection = index, error = %err, "request failed after stop");
                    break;
                }

                tracing::warn!(
                    connection = index,
                    kind = %err.transport_error_kind(),
                    error = %err,
                    "request failed; driver stopping"
                );
                if !watched {
                    ctx.errors.push(format!("connection {index}: {err}"));
                }
                break;
            }
        }
    }

    tracing::trace!(
        connection = index,
        requests = ctx.collector.requests(index),
        "driver finished"
    );
}
