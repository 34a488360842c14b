use std::time::Duration;

/// PEM material for a secure channel. Loading it from disk is the caller's job.
#[derive(Debug, Clone, Default)]
pub struct CredentialBundle {
    pub ca_pem: Option<Vec<u8>>,
    pub client_cert_pem: Option<Vec<u8>>,
    pub client_key_pem: Option<Vec<u8>>,
    pub domain_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    pub connect_timeout: Option<Duration>,
    pub credentials: Option<CredentialBundle>,
}
