use super::GrpcTransportErrorKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] tonic::transport::Error),

    #[error("failed to connect: {0}")]
    Connect(#[source] tonic::transport::Error),

    #[error("service was not ready: {0}")]
    NotReady(String),

    #[error("call failed: {0}")]
    Status(#[from] tonic::Status),

    #[error("connection is closed")]
    Closed,
}

impl Error {
    #[must_use]
    pub fn transport_error_kind(&self) -> GrpcTransportErrorKind {
        match self {
            Self::InvalidEndpoint(_) => GrpcTransportErrorKind::InvalidEndpoint,
            Self::Connect(_) => GrpcTransportErrorKind::Connect,
            Self::NotReady(_) => GrpcTransportErrorKind::NotReady,
            Self::Status(_) => GrpcTransportErrorKind::Status,
            Self::Closed => GrpcTransportErrorKind::Closed,
        }
    }

    /// Whether the underlying channel can no longer carry requests.
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Self::NotReady(_) | Self::Closed => true,
            Self::Status(status) => status.code() == tonic::Code::Unavailable,
            Self::InvalidEndpoint(_) | Self::Connect(_) => false,
        }
    }
}
