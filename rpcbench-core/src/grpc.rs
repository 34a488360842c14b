mod client;
mod codec;
mod error;
mod kind;
mod messages;
mod types;

pub use client::{GrpcChannel, GrpcConnector, UNARY_CALL_PATH};
pub use error::{Error, Result};
pub use kind::GrpcTransportErrorKind;
pub use messages::{SimpleRequest, SimpleResponse};
pub use types::{ConnectOptions, CredentialBundle};
