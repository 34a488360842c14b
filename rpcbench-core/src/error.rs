pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "`connections` must be between 1 and {max}",
        max = crate::config::MAX_CONNECTIONS
    )]
    InvalidConnections,

    #[error("missing required property `{0}`")]
    MissingProperty(&'static str),

    #[error("invalid value for property `{key}`: `{value}`")]
    InvalidProperty { key: &'static str, value: String },

    #[error("unknown scenario `{0}` (expected `Unary`)")]
    UnknownScenario(String),

    #[error("failed to open connection {index}: {source}")]
    Connect {
        index: usize,
        #[source]
        source: crate::grpc::Error,
    },

    #[error("connection setup was cancelled")]
    ConnectCancelled,
}

/// Append-only job error text. Lines are joined with `\n` when published.
#[derive(Debug, Default)]
pub struct ErrorLog {
    lines: std::sync::Mutex<Vec<String>>,
}

impl ErrorLog {
    pub fn push(&self, line: impl Into<String>) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }

    pub fn joined(&self) -> String {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .join("\n")
    }
}
