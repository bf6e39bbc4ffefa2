use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TransportError};

/// Upstream proxy a transport routes its connections through.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    /// `http://`, `https://`, `socks5://` or `socks5h://` address.
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Http,
    Socks5,
}

impl ProxyKind {
    fn scheme(self) -> &'static str {
        match self {
            ProxyKind::Http => "http",
            ProxyKind::Socks5 => "socks5",
        }
    }

    fn port_var(self) -> &'static str {
        match self {
            ProxyKind::Http => "PROXY_PORT_HTTP",
            ProxyKind::Socks5 => "PROXY_PORT_SOCKS5",
        }
    }
}

impl ProxySettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Reads `PROXY_HOST`, the port variable for `kind`, `PROXY_USER` and
    /// `PROXY_PASS`. Returns `None` unless both host and port are set.
    pub fn from_env(kind: ProxyKind) -> Option<Self> {
        Self::from_lookup(kind, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(kind: ProxyKind, lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("PROXY_HOST").filter(|h| !h.is_empty())?;
        let port = lookup(kind.port_var()).filter(|p| !p.is_empty())?;

        let mut settings = Self::new(format!("{}://{}:{}", kind.scheme(), host, port));
        settings.username = lookup("PROXY_USER").filter(|u| !u.is_empty());
        settings.password = lookup("PROXY_PASS");
        Some(settings)
    }

    fn is_socks(url: &Url) -> bool {
        matches!(url.scheme(), "socks5" | "socks5h")
    }

    /// SOCKS credentials travel in the URL userinfo; HTTP proxies get a
    /// `Proxy-Authorization` header instead.
    pub fn to_reqwest(&self) -> Result<reqwest::Proxy> {
        let invalid = |reason: String| TransportError::InvalidProxy {
            url: self.url.clone(),
            reason,
        };

        let mut url = Url::parse(&self.url).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" | "socks5" | "socks5h" => {}
            other => return Err(invalid(format!("unsupported scheme {other}"))),
        }

        let socks = Self::is_socks(&url);
        if socks {
            if let Some(user) = &self.username {
                url.set_username(user)
                    .map_err(|_| invalid("url cannot carry credentials".to_string()))?;
                url.set_password(self.password.as_deref())
                    .map_err(|_| invalid("url cannot carry credentials".to_string()))?;
            }
        }

        let mut proxy = reqwest::Proxy::all(url.as_str()).map_err(|e| invalid(e.to_string()))?;
        if !socks {
            if let Some(user) = &self.username {
                proxy = proxy.basic_auth(user, self.password.as_deref().unwrap_or_default());
            }
        }
        Ok(proxy)
    }
}

impl fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
