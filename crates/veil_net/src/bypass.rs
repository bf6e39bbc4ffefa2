//! Transport decorator that makes outbound requests look like they came from
//! a desktop browser.
//!
//! Two adjustments are applied:
//! - the TLS key-exchange preference is pinned to [`CLOUDFLARE_CURVES`] on the
//!   wrapped transport (or on a substitute when it cannot be configured);
//! - `Accept`, `Accept-Language` and `User-Agent` are filled in on requests
//!   that do not already carry them.
//!
//! Nothing else about the request or response is touched.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use veil_traits::{CurveId, Request, Response, RoundTripper, TlsCapability, TlsSettings};

use crate::transport::HttpTransport;
use crate::user_agent;

/// Key-exchange preference advertised by wrapped transports, highest first.
pub const CLOUDFLARE_CURVES: [CurveId; 2] = [CurveId::X25519, CurveId::P256];

pub const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Header injection settings. Fixed once attached to a [`BypassTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub add_missing_headers: bool,
    /// Header name to value. Names compare case-insensitively.
    pub headers: HashMap<String, String>,
}

impl Default for Options {
    fn default() -> Self {
        let headers = HashMap::from([
            ("Accept".to_string(), DEFAULT_ACCEPT.to_string()),
            ("Accept-Language".to_string(), DEFAULT_ACCEPT_LANGUAGE.to_string()),
            ("User-Agent".to_string(), user_agent::firefox()),
        ]);

        Self {
            add_missing_headers: true,
            headers,
        }
    }
}

impl Options {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A [`RoundTripper`] that fills in missing browser headers before handing
/// the request to its delegate. Built by [`wrap`].
#[derive(Clone)]
pub struct BypassTransport {
    inner: Arc<dyn RoundTripper>,
    options: Options,
    headers: HeaderMap,
}

impl BypassTransport {
    /// The transport requests are delegated to. After [`wrap`] its TLS
    /// section (if any) carries [`CLOUDFLARE_CURVES`].
    pub fn inner(&self) -> &dyn RoundTripper {
        self.inner.as_ref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

impl fmt::Debug for BypassTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BypassTransport")
            .field("options", &self.options)
            .field("inner_tls", &self.inner.tls_settings())
            .finish()
    }
}

/// Pins the curve preference on `transport` and decorates it with header
/// injection. `None` selects [`Options::default`].
///
/// A transport without a configurable TLS section is replaced by a fresh
/// [`HttpTransport`]; whatever else it was configured with is not carried
/// over. An already decorated transport counts as non-configurable.
pub fn wrap<T>(mut transport: T, options: Option<Options>) -> BypassTransport
where
    T: RoundTripper + 'static,
{
    let pinned = match transport.tls_capability() {
        TlsCapability::Configurable(tls) => {
            pin_curves(tls);
            true
        }
        TlsCapability::Opaque => false,
    };

    let inner: Arc<dyn RoundTripper> = if pinned {
        Arc::new(transport)
    } else {
        info!(
            replaced = std::any::type_name::<T>(),
            "transport has no configurable tls section, substituting default transport"
        );
        let mut fallback = HttpTransport::default();
        pin_curves(&mut fallback.settings_mut().tls);
        Arc::new(fallback)
    };

    let options = options.unwrap_or_default();
    let headers = compile_headers(&options.headers);

    BypassTransport {
        inner,
        options,
        headers,
    }
}

fn pin_curves(tls: &mut TlsSettings) {
    tls.curve_preferences = CLOUDFLARE_CURVES.to_vec();
}

/// Entries that are not valid HTTP headers are dropped; wrapping never fails.
fn compile_headers(headers: &HashMap<String, String>) -> HeaderMap {
    let mut compiled = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let parsed_name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(header = %name, "ignoring invalid header name");
                continue;
            }
        };
        let parsed_value = match HeaderValue::from_str(value) {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(header = %name, "ignoring invalid header value");
                continue;
            }
        };
        compiled.entry(parsed_name).or_insert(parsed_value);
    }

    compiled
}

#[async_trait]
impl RoundTripper for BypassTransport {
    async fn round_trip(&self, mut request: Request) -> anyhow::Result<Response> {
        if !self.options.add_missing_headers {
            return self.inner.round_trip(request).await;
        }

        let present = request.headers_mut();
        for (name, value) in self.headers.iter() {
            if !present.contains_key(name) {
                debug!(header = %name, "adding missing header");
                present.insert(name.clone(), value.clone());
            }
        }

        self.inner.round_trip(request).await
    }
}
