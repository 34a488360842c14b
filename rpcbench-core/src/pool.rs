use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinSet;

use crate::grpc::{self, SimpleRequest, SimpleResponse};

use super::error::{Error, Result};

/// One logical channel to the target endpoint.
pub trait BenchChannel: Send + Sync + 'static {
    /// Issues one unary request and awaits its single response.
    fn unary_call(
        &self,
        request: SimpleRequest,
        timeout: Option<Duration>,
    ) -> impl Future<Output = grpc::Result<SimpleResponse>> + Send;

    /// Stops accepting new calls. In-flight calls are left to finish on their own.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Creates channels to a target. Each call must yield an independent connection.
pub trait Connector: Send + Sync + 'static {
    type Channel: BenchChannel;

    fn connect(&self, target: &str)
    -> impl Future<Output = grpc::Result<Self::Channel>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Closed by pool teardown.
    Shutdown,
    /// The transport reported the channel gone.
    Lost(String),
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shutdown => f.write_str("shutdown"),
            Self::Lost(reason) => f.write_str(reason),
        }
    }
}

pub struct Connection<C> {
    index: usize,
    channel: C,
    open: AtomicBool,
    close_tx: Mutex<Option<oneshot::Sender<CloseReason>>>,
    close_rx: Mutex<Option<oneshot::Receiver<CloseReason>>>,
}

impl<C: BenchChannel> Connection<C> {
    fn new(index: usize, channel: C) -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            index,
            channel,
            open: AtomicBool::new(true),
            close_tx: Mutex::new(Some(tx)),
            close_rx: Mutex::new(Some(rx)),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Marks the connection closed and fires its close signal.
    ///
    /// Returns `false` if it was already closed; the signal fires at most once.
    pub fn mark_closed(&self, reason: CloseReason) -> bool {
        if !self.open.swap(false, Ordering::AcqRel) {
            return false;
        }

        let tx = self
            .close_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(tx) = tx {
            // The receiver may already be gone (nobody watching).
            let _ = tx.send(reason);
        }
        true
    }

    /// Takes the one-shot close signal. Only the first caller gets it.
    pub fn take_close_signal(&self) -> Option<oneshot::Receiver<CloseReason>> {
        self.close_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    async fn shutdown(&self) {
        self.mark_closed(CloseReason::Shutdown);
        self.channel.close().await;
    }
}

/// Registry of every connection opened for a job.
pub struct ChannelPool<C> {
    connections: Vec<Arc<Connection<C>>>,
}

impl<C: BenchChannel> ChannelPool<C> {
    /// Opens `count` connections eagerly and concurrently, so connection setup never shows up
    /// in request latency.
    ///
    /// If any connection fails, the ones already opened are closed and the lowest failing index
    /// is reported.
    pub async fn open<K>(connector: &Arc<K>, target: &str, count: usize) -> Result<Self>
    where
        K: Connector<Channel = C>,
    {
        let mut connecting = JoinSet::new();
        for index in 0..count {
            let connector = connector.clone();
            let target = target.to_string();
            connecting.spawn(async move { (index, connector.connect(&target).await) });
        }

        let mut pool = Self {
            connections: Vec::new(),
        };
        let mut failure: Option<Error> = None;

        while let Some(res) = connecting.join_next().await {
            match res {
                Ok((index, Ok(channel))) => pool
                    .connections
                    .push(Arc::new(Connection::new(index, channel))),
                Ok((index, Err(source))) => {
                    tracing::debug!(connection = index, error = %source, "connect failed");
                    let lower = match &failure {
                        Some(Error::Connect { index: first, .. }) => index < *first,
                        Some(_) => false,
                        None => true,
                    };
                    if lower {
                        failure = Some(Error::Connect { index, source });
                    }
                }
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => failure = Some(Error::ConnectCancelled),
            }
        }

        if let Some(err) = failure {
            pool.close_all().await;
            return Err(err);
        }

        pool.connections.sort_unstable_by_key(|c| c.index());
        tracing::debug!(target, connections = count, "channel pool opened");
        Ok(pool)
    }

    pub fn connections(&self) -> &[Arc<Connection<C>>] {
        &self.connections
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Closes every connection concurrently and waits until all of them are done.
    pub async fn close_all(&self) {
        let mut closing = JoinSet::new();
        for conn in &self.connections {
            let conn = conn.clone();
            closing.spawn(async move { conn.shutdown().await });
        }

        while let Some(res) = closing.join_next().await {
            if let Err(err) = res {
                tracing::warn!(error = %err, "connection shutdown task failed");
            }
        }

        tracing::debug!(connections = self.connections.len(), "channel pool closed");
    }
}
