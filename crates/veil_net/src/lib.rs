pub mod bypass;
pub mod error;
pub mod proxy;
pub mod tls;
pub mod transport;
pub mod user_agent;

pub use bypass::{wrap, BypassTransport, Options, CLOUDFLARE_CURVES};
pub use error::TransportError;
pub use proxy::{ProxyKind, ProxySettings};
pub use transport::{HttpTransport, TransportSettings};
pub use veil_traits::{CurveId, Request, Response, RootStore, RoundTripper, TlsCapability, TlsSettings};
