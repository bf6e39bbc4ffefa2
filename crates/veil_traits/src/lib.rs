use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use reqwest::{Request, Response};

/// Named key-exchange groups a TLS client can advertise in its ClientHello.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveId {
    X25519,
    P256,
    P384,
}

/// Where the transport sources its trust anchors from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootStore {
    /// Mozilla roots bundled at compile time.
    #[default]
    WebPki,
    /// Roots from the operating system store.
    Native,
}

/// The configurable TLS section of a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsSettings {
    /// Ordered key-exchange preference. Empty means library defaults.
    pub curve_preferences: Vec<CurveId>,
    pub alpn_protocols: Vec<String>,
    pub root_store: RootStore,
    /// DER-encoded certificates trusted in addition to `root_store`.
    #[serde(skip)]
    pub extra_roots_der: Vec<Vec<u8>>,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            curve_preferences: Vec::new(),
            alpn_protocols: vec!["h2".to_string(), "http/1.1".to_string()],
            root_store: RootStore::WebPki,
            extra_roots_der: Vec::new(),
        }
    }
}

/// Outcome of probing a transport for a configurable TLS section.
#[derive(Debug)]
pub enum TlsCapability<'a> {
    Configurable(&'a mut TlsSettings),
    Opaque,
}

impl TlsCapability<'_> {
    pub fn is_configurable(&self) -> bool {
        matches!(self, TlsCapability::Configurable(_))
    }
}

/// Sends a single request and returns the response, or the error the
/// underlying stack produced.
#[async_trait]
pub trait RoundTripper: Send + Sync {
    async fn round_trip(&self, request: Request) -> anyhow::Result<Response>;

    /// Exposes the TLS section for in-place mutation, if this transport has one.
    fn tls_capability(&mut self) -> TlsCapability<'_> {
        TlsCapability::Opaque
    }

    fn tls_settings(&self) -> Option<&TlsSettings> {
        None
    }
}

/// A prebuilt client has already fixed its TLS stack, so it probes as opaque.
#[async_trait]
impl RoundTripper for reqwest::Client {
    async fn round_trip(&self, request: Request) -> anyhow::Result<Response> {
        Ok(self.execute(request).await?)
    }
}

#[async_trait]
impl<T: RoundTripper + ?Sized> RoundTripper for Box<T> {
    async fn round_trip(&self, request: Request) -> anyhow::Result<Response> {
        (**self).round_trip(request).await
    }

    fn tls_capability(&mut self) -> TlsCapability<'_> {
        (**self).tls_capability()
    }

    fn tls_settings(&self) -> Option<&TlsSettings> {
        (**self).tls_settings()
    }
}
