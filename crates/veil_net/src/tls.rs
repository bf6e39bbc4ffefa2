//! rustls client configuration assembled from `TlsSettings`.

use rustls::kx_group;
use rustls::{Certificate, ClientConfig, OwnedTrustAnchor, RootCertStore, SupportedKxGroup};
use tracing::{debug, warn};
use veil_traits::{CurveId, RootStore, TlsSettings};

use crate::error::{Result, TransportError};

/// Maps a curve name onto the rustls key-exchange group implementing it.
pub fn kx_group_for(curve: CurveId) -> &'static SupportedKxGroup {
    match curve {
        CurveId::X25519 => &kx_group::X25519,
        CurveId::P256 => &kx_group::SECP256R1,
        CurveId::P384 => &kx_group::SECP384R1,
    }
}

/// Builds the client config a transport hands to its HTTP stack.
///
/// Key-exchange groups are advertised in exactly the order of
/// `curve_preferences`; an empty list keeps the rustls defaults.
pub fn client_config(settings: &TlsSettings) -> Result<ClientConfig> {
    let roots = root_store(settings)?;

    let builder = ClientConfig::builder().with_safe_default_cipher_suites();
    let builder = if settings.curve_preferences.is_empty() {
        builder.with_safe_default_kx_groups()
    } else {
        let groups: Vec<&'static SupportedKxGroup> = settings
            .curve_preferences
            .iter()
            .copied()
            .map(kx_group_for)
            .collect();
        debug!(curves = ?settings.curve_preferences, "pinning key exchange groups");
        builder.with_kx_groups(&groups)
    };

    let mut config = builder
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = settings
        .alpn_protocols
        .iter()
        .map(|proto| proto.as_bytes().to_vec())
        .collect();

    Ok(config)
}

fn root_store(settings: &TlsSettings) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();

    match settings.root_store {
        RootStore::WebPki => {
            roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
                OwnedTrustAnchor::from_subject_spki_name_constraints(
                    ta.subject,
                    ta.spki,
                    ta.name_constraints,
                )
            }));
        }
        RootStore::Native => {
            let native =
                rustls_native_certs::load_native_certs().map_err(TransportError::NativeRoots)?;
            let der: Vec<Vec<u8>> = native.into_iter().map(|cert| cert.0).collect();
            let (added, ignored) = roots.add_parsable_certificates(&der);
            if ignored > 0 {
                warn!(added, ignored, "skipped unparsable native root certificates");
            }
        }
    }

    for der in &settings.extra_roots_der {
        roots
            .add(&Certificate(der.clone()))
            .map_err(|e| TransportError::InvalidRoot(format!("{e:?}")))?;
    }

    Ok(roots)
}
