use thiserror::Error;

/// Failures while turning `TransportSettings` into a live client.
///
/// Dispatch errors from the network never pass through this type; they reach
/// the caller exactly as the HTTP stack produced them.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("tls configuration rejected: {0}")]
    Tls(#[from] rustls::Error),

    #[error("invalid root certificate: {0}")]
    InvalidRoot(String),

    #[error("failed to load native root certificates: {0}")]
    NativeRoots(#[source] std::io::Error),

    #[error("invalid proxy {url}: {reason}")]
    InvalidProxy { url: String, reason: String },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
