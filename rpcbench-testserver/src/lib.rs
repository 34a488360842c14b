use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};

pub mod pb {
    tonic::include_proto!("rpcbench.test");
}

use pb::benchmark_service_server::{BenchmarkService, BenchmarkServiceServer};

/// How the service answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerBehavior {
    /// Sleep before answering each call.
    pub delay: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    requests_total: Arc<AtomicU64>,
    request_bytes_total: Arc<AtomicU64>,
}

impl ServerStats {
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn request_bytes_total(&self) -> u64 {
        self.request_bytes_total.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct BenchSvc {
    behavior: ServerBehavior,
    stats: ServerStats,
}

#[tonic::async_trait]
impl BenchmarkService for BenchSvc {
    async fn unary_call(
        &self,
        request: Request<pb::SimpleRequest>,
    ) -> Result<Response<pb::SimpleResponse>, Status> {
        let req = request.into_inner();
        self.stats.requests_total.fetch_add(1, Ordering::Relaxed);
        self.stats
            .request_bytes_total
            .fetch_add(req.payload.len() as u64, Ordering::Relaxed);

        if !self.behavior.delay.is_zero() {
            tokio::time::sleep(self.behavior.delay).await;
        }

        let size = usize::try_from(req.response_size).unwrap_or(0);
        Ok(Response::new(pb::SimpleResponse {
            server_timestamp_unix_nanos: unix_nanos_now(),
            payload: vec![0u8; size].into(),
        }))
    }
}

fn unix_nanos_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// In-process gRPC benchmark target bound to an ephemeral loopback port.
pub struct BenchServer {
    addr: SocketAddr,
    stats: ServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl BenchServer {
    pub async fn start() -> std::io::Result<Self> {
        let bind = SocketAddr::from(([127, 0, 0, 1], 0));
        Self::start_with(bind, ServerBehavior::default()).await
    }

    pub async fn start_with(bind: SocketAddr, behavior: ServerBehavior) -> std::io::Result<Self> {
        let listener = TcpListener::bind(bind).await?;
        let addr = listener.local_addr()?;
        let stats = ServerStats::default();

        let svc = BenchmarkServiceServer::new(BenchSvc {
            behavior,
            stats: stats.clone(),
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let incoming = TcpListenerStream::new(listener);

            let server = tonic::transport::Server::builder()
                .add_service(svc)
                .serve_with_incoming_shutdown(incoming, async move {
                    let _ = shutdown_rx.await;
                });

            let _ = server.await;
        });

        Ok(Self {
            addr,
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.addr.ip(), self.addr.port())
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for BenchServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
