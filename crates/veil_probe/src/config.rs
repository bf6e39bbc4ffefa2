use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use veil_net::{Options, TransportSettings};

/// Probe configuration, read from TOML.
///
/// ```toml
/// [options]
/// add_missing_headers = true
///
/// [options.headers]
/// Accept-Language = "de-DE,de;q=0.7"
///
/// [transport]
/// timeout_ms = 15000
///
/// [transport.proxy]
/// url = "socks5://127.0.0.1:1080"
/// ```
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ProbeConfig {
    /// Header injection settings; defaults when the table is absent.
    pub options: Option<Options>,
    pub transport: TransportSettings,
}

impl ProbeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}
