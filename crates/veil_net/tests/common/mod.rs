//! Local servers standing in for a bot-protected origin.

use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::{Body, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::rustls::{Certificate, PrivateKey, ServerConfig, SupportedKxGroup};
use tokio_rustls::TlsAcceptor;

/// Routes `tracing` output to the test harness; `RUST_LOG=debug` shows
/// injected headers and client builds.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 200 when the request carries `Accept-Language`, 403 otherwise. The body
/// echoes the received `User-Agent`.
async fn gatekeeper(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let agent = req
        .headers()
        .get(hyper::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let status = if req.headers().contains_key(hyper::header::ACCEPT_LANGUAGE) {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    };

    Ok(Response::builder()
        .status(status)
        .body(Body::from(agent))
        .unwrap())
}

async fn serve<S>(stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let _ = Http::new()
        .http1_only(true)
        .serve_connection(stream, service_fn(gatekeeper))
        .await;
}

/// Plain HTTP gatekeeper on an ephemeral port.
pub async fn start_gatekeeper() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve(socket));
        }
    });

    addr
}

pub struct TlsOrigin {
    pub addr: SocketAddr,
    /// DER of the CA that signed the `localhost` leaf.
    pub ca_der: Vec<u8>,
}

impl TlsOrigin {
    pub fn url(&self) -> String {
        format!("https://localhost:{}/login", self.addr.port())
    }
}

/// TLS gatekeeper that only completes handshakes over `groups`.
pub async fn start_tls_gatekeeper(groups: &[&'static SupportedKxGroup]) -> TlsOrigin {
    let (ca_der, leaf_der, leaf_key) = issue_localhost_cert();

    let config = ServerConfig::builder()
        .with_safe_default_cipher_suites()
        .with_kx_groups(groups)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![Certificate(leaf_der)], PrivateKey(leaf_key))
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                if let Ok(stream) = acceptor.accept(socket).await {
                    serve(stream).await;
                }
            });
        }
    });

    TlsOrigin { addr, ca_der }
}

fn issue_localhost_cert() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};

    let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params
        .distinguished_name
        .push(DnType::CommonName, "veil test ca");
    let ca_key = KeyPair::generate().unwrap();
    let ca = ca_params.self_signed(&ca_key).unwrap();

    let mut leaf_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    leaf_params
        .distinguished_name
        .push(DnType::CommonName, "localhost");
    let leaf_key = KeyPair::generate().unwrap();
    let leaf = leaf_params.signed_by(&leaf_key, &ca, &ca_key).unwrap();

    (ca.der().to_vec(), leaf.der().to_vec(), leaf_key.serialize_der())
}
