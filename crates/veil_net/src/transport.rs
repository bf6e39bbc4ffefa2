use async_trait::async_trait;
use reqwest::redirect::Policy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;
use veil_traits::{Request, Response, RoundTripper, TlsCapability, TlsSettings};

use crate::error::{Result, TransportError};
use crate::proxy::ProxySettings;
use crate::tls;

/// Everything an [`HttpTransport`] needs to build its client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub tls: TlsSettings,
    pub proxy: Option<ProxySettings>,
    pub connect_timeout_ms: Option<u64>,
    /// Whole-request deadline, connect through body.
    pub timeout_ms: Option<u64>,
    /// 0 hands redirect responses back to the caller.
    pub max_redirects: usize,
}

/// The default transport: a reqwest client whose TLS section stays
/// configurable until the client is built.
///
/// The client is assembled on first dispatch. Any mutation through
/// [`HttpTransport::settings_mut`] or the TLS capability drops it, so the next
/// request is sent with the new settings.
#[derive(Debug, Default)]
pub struct HttpTransport {
    settings: TransportSettings,
    client: OnceCell<reqwest::Client>,
}

impl HttpTransport {
    pub fn new(settings: TransportSettings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut TransportSettings {
        if self.client.initialized() {
            debug!("transport settings changed, dropping built client");
        }
        self.client = OnceCell::new();
        &mut self.settings
    }

    async fn client(&self) -> Result<&reqwest::Client> {
        self.client.get_or_try_init(|| async { self.build_client() }).await
    }

    fn build_client(&self) -> Result<reqwest::Client> {
        let tls = tls::client_config(&self.settings.tls)?;

        let redirect = match self.settings.max_redirects {
            0 => Policy::none(),
            n => Policy::limited(n),
        };

        let mut builder = reqwest::Client::builder()
            .use_preconfigured_tls(tls)
            .redirect(redirect);

        builder = match &self.settings.proxy {
            Some(proxy) => builder.proxy(proxy.to_reqwest()?),
            None => builder.no_proxy(),
        };
        if let Some(ms) = self.settings.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.settings.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }

        debug!(
            curves = ?self.settings.tls.curve_preferences,
            proxied = self.settings.proxy.is_some(),
            "building http client"
        );
        builder.build().map_err(TransportError::Client)
    }
}

#[async_trait]
impl RoundTripper for HttpTransport {
    async fn round_trip(&self, request: Request) -> anyhow::Result<Response> {
        let client = self.client().await?;
        Ok(client.execute(request).await?)
    }

    fn tls_capability(&mut self) -> TlsCapability<'_> {
        TlsCapability::Configurable(&mut self.settings_mut().tls)
    }

    fn tls_settings(&self) -> Option<&TlsSettings> {
        Some(&self.settings.tls)
    }
}
