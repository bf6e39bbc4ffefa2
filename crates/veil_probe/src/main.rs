mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::ProbeConfig;
use reqwest::{Method, Url};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use veil_net::{wrap, HttpTransport, ProxySettings, Request, RoundTripper};

#[derive(Parser)]
#[command(name = "veil_probe")]
#[command(about = "Fetch a URL with and without browser-like transport tweaks", long_about = None)]
struct Cli {
    /// Target URL
    url: String,

    /// TOML file with `options` and `transport` tables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Proxy URL (http, https, socks5, socks5h); overrides the config file
    #[arg(short, long)]
    proxy: Option<String>,

    /// Send through the undecorated transport only
    #[arg(long, conflicts_with = "compare")]
    bare: bool,

    /// Send through both the undecorated and the decorated transport
    #[arg(long)]
    compare: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ProbeConfig::load(path)?,
        None => ProbeConfig::default(),
    };
    if let Some(proxy) = cli.proxy {
        config.transport.proxy = Some(ProxySettings::new(proxy));
    }
    let url = Url::parse(&cli.url).with_context(|| format!("invalid url {}", cli.url))?;

    // With --compare only the decorated outcome decides the exit code.
    let admitted = if cli.bare {
        probe("bare", &HttpTransport::new(config.transport), &url).await
    } else {
        if cli.compare {
            probe("bare", &HttpTransport::new(config.transport.clone()), &url).await;
        }
        let wrapped = wrap(HttpTransport::new(config.transport), config.options);
        probe("wrapped", &wrapped, &url).await
    };

    tracing::info!("Probe finished.");
    if !admitted {
        std::process::exit(1);
    }
    Ok(())
}

/// Sends one GET and prints the outcome. Returns whether the status was 2xx.
async fn probe(label: &str, transport: &dyn RoundTripper, url: &Url) -> bool {
    let request = Request::new(Method::GET, url.clone());
    match transport.round_trip(request).await {
        Ok(res) => {
            tracing::debug!(label, headers = ?res.headers(), "response received");
            println!("{label:<8} {}", res.status());
            res.status().is_success()
        }
        Err(e) => {
            println!("{label:<8} error: {e:#}");
            false
        }
    }
}
