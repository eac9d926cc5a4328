//! Encryption Upgrader
//!
//! Builds the rustls client configuration from a [`PairRecord`] and a
//! version preference, then runs the client handshake over a plain
//! [`RawStream`]. Committing the result to a session is done by
//! [`DeviceConnection`](crate::DeviceConnection).
//!
//! Upgrade steps:
//!
//! 1. version selection ([`TlsVersionPolicy`])
//! 2. credential binding (failure: [`CredentialError`])
//! 3. handshake with peer verification disabled and SNI off
//!    (failure: the transport is handed back untouched)

pub mod verifier;
pub mod version;

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, OnceLock};

use rustls::crypto::CryptoProvider;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::error::CredentialError;
use crate::pair_record::PairRecord;
use crate::transport::RawStream;

pub use verifier::{AttachedDeviceVerifier, PeerVerification};
pub use version::TlsVersionPolicy;

/// Encrypted session stream over the retained plain handle
pub type SecureStream = TlsStream<RawStream>;

/// Everything that shapes one upgrade attempt besides the credentials
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TlsClientOptions {
    pub versions: TlsVersionPolicy,
    pub peer_verification: PeerVerification,
}

impl TlsClientOptions {
    pub fn from_preference(preference: &[u32]) -> Self {
        Self {
            versions: TlsVersionPolicy::from_preference(preference),
            ..Default::default()
        }
    }
}

pub(crate) fn crypto_provider() -> Arc<CryptoProvider> {
    static INSTANCE: OnceLock<Arc<CryptoProvider>> = OnceLock::new();
    INSTANCE
        .get_or_init(|| Arc::new(rustls::crypto::ring::default_provider()))
        .clone()
}

/// Parse the host certificate chain and private key out of a pair record
pub fn client_identity(
    record: &PairRecord,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), CredentialError> {
    let certs = CertificateDer::pem_slice_iter(&record.host_certificate)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CredentialError::InvalidCertificate(format!("{e:?}")))?;
    if certs.is_empty() {
        return Err(CredentialError::MissingCertificate);
    }

    let key = PrivateKeyDer::from_pem_slice(&record.host_private_key)
        .map_err(|e| CredentialError::InvalidPrivateKey(format!("{e:?}")))?;

    Ok((certs, key))
}

/// Build the client configuration for one upgrade attempt
pub fn build_client_config(
    record: &PairRecord,
    options: &TlsClientOptions,
) -> Result<Arc<rustls::ClientConfig>, CredentialError> {
    let (certs, key) = client_identity(record)?;

    let builder = rustls::ClientConfig::builder_with_provider(crypto_provider())
        .with_protocol_versions(options.versions.protocol_versions())
        .map_err(CredentialError::Versions)?;

    let builder = builder
        .dangerous()
        .with_custom_certificate_verifier(options.peer_verification.server_verifier());

    let mut config = builder
        .with_client_auth_cert(certs, key)
        .map_err(CredentialError::Rejected)?;
    config.enable_sni = false;

    Ok(Arc::new(config))
}

/// Run the client handshake over `stream`
///
/// On failure the original stream is returned alongside the error so the
/// caller can keep using it in plaintext.
pub async fn handshake(
    stream: RawStream,
    config: Arc<rustls::ClientConfig>,
) -> Result<SecureStream, (io::Error, RawStream)> {
    // Only used for logging by rustls since SNI and verification are off
    let server_name = ServerName::from(IpAddr::V4(Ipv4Addr::LOCALHOST));

    TlsConnector::from(config)
        .connect(server_name, stream)
        .into_fallible()
        .await
}
