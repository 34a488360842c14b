use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use http::uri::PathAndQuery;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};

use crate::pool::{BenchChannel, Connector};

use super::codec::ProstCodec;
use super::{ConnectOptions, Error, Result, SimpleRequest, SimpleResponse};

pub const UNARY_CALL_PATH: &str = "/rpcbench.test.BenchmarkService/UnaryCall";

/// Opens one HTTP/2 connection per [`GrpcChannel`].
#[derive(Debug, Clone, Default)]
pub struct GrpcConnector {
    opts: ConnectOptions,
}

impl GrpcConnector {
    pub fn new(opts: ConnectOptions) -> Self {
        Self { opts }
    }

    fn endpoint(&self, target: &str) -> Result<Endpoint> {
        let uri = if target.contains("://") {
            target.to_string()
        } else if self.opts.credentials.is_some() {
            format!("https://{target}")
        } else {
            format!("http://{target}")
        };

        let mut endpoint = Endpoint::from_shared(uri)?;

        // Every benchmark connection carries exactly one request at a time; Nagle would only
        // add latency.
        endpoint = endpoint.tcp_nodelay(true).http2_adaptive_window(false);

        if let Some(timeout) = self.opts.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }

        if let Some(creds) = &self.opts.credentials {
            let mut tls_cfg = ClientTlsConfig::new();

            if let Some(domain) = &creds.domain_name {
                tls_cfg = tls_cfg.domain_name(domain.clone());
            }

            if let Some(ca_pem) = &creds.ca_pem {
                tls_cfg = tls_cfg.ca_certificate(Certificate::from_pem(ca_pem));
            } else {
                tls_cfg = tls_cfg.with_webpki_roots();
            }

            if let (Some(cert), Some(key)) = (&creds.client_cert_pem, &creds.client_key_pem) {
                tls_cfg = tls_cfg.identity(Identity::from_pem(cert, key));
            }

            endpoint = endpoint.tls_config(tls_cfg)?;
        }

        Ok(endpoint)
    }
}

impl Connector for GrpcConnector {
    type Channel = GrpcChannel;

    fn connect(&self, target: &str) -> impl Future<Output = Result<GrpcChannel>> + Send {
        let endpoint = self.endpoint(target);
        async move {
            // `connect` (not `connect_lazy`): the handshake happens here, before the run starts.
            let channel = endpoint?.connect().await.map_err(Error::Connect)?;
            Ok(GrpcChannel {
                channel: Mutex::new(Some(channel)),
            })
        }
    }
}

#[derive(Debug)]
pub struct GrpcChannel {
    channel: Mutex<Option<Channel>>,
}

impl GrpcChannel {
    fn current(&self) -> Option<Channel> {
        self.channel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl BenchChannel for GrpcChannel {
    fn unary_call(
        &self,
        request: SimpleRequest,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<SimpleResponse>> + Send {
        let channel = self.current();
        async move {
            let channel = channel.ok_or(Error::Closed)?;
            let mut grpc = tonic::client::Grpc::new(channel);

            grpc.ready()
                .await
                .map_err(|e| Error::NotReady(e.to_string()))?;

            let mut request = tonic::Request::new(request);
            if let Some(timeout) = timeout {
                request.set_timeout(timeout);
            }

            let path = PathAndQuery::from_static(UNARY_CALL_PATH);
            let call = grpc.unary(
                request,
                path,
                ProstCodec::<SimpleRequest, SimpleResponse>::default(),
            );

            // `grpc-timeout` is only advisory for the server; enforce the deadline locally too.
            let res = match timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| tonic::Status::deadline_exceeded("request timed out"))??,
                None => call.await?,
            };
            Ok(res.into_inner())
        }
    }

    fn close(&self) -> impl Future<Output = ()> + Send {
        // The HTTP/2 connection goes away once the last clone (including in-flight calls)
        // is dropped.
        let channel = self
            .channel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        async move {
            drop(channel);
        }
    }
}
