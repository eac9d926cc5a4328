//! Peer identity verification policy
//!
//! The device is trusted because it is physically attached, not because its
//! certificate chains to a root. The certificate is therefore accepted as-is,
//! while handshake signatures are still checked against the presented key.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};

use super::crypto_provider;

/// How the peer's certificate is checked during the upgrade
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PeerVerification {
    /// Accept any certificate (trust-on-physical-proximity)
    ///
    /// This is a deliberate security trade-off. Anything able to answer on
    /// the local multiplexer socket is treated as the paired device.
    #[default]
    Disabled,
}

impl PeerVerification {
    /// Verifier to install on the client configuration
    pub fn server_verifier(self) -> Arc<dyn ServerCertVerifier> {
        match self {
            Self::Disabled => Arc::new(AttachedDeviceVerifier::new(crypto_provider())),
        }
    }
}

/// Accepts whatever certificate the attached device presents
///
/// Signatures over the handshake transcript are still checked with the
/// provider's algorithms, so the peer must hold the key it presents.
#[derive(Debug)]
pub struct AttachedDeviceVerifier {
    provider: Arc<CryptoProvider>,
}

impl AttachedDeviceVerifier {
    pub fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }
}

impl ServerCertVerifier for AttachedDeviceVerifier {
    fn verify_server_cert(
        &self,
        device_cert: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        tracing::trace!(len = device_cert.len(), "Accepting device certificate unchecked");
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        device_cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        let algs = &self.provider.signature_verification_algorithms;
        rustls::crypto::verify_tls12_signature(message, device_cert, dss, algs)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        device_cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        let algs = &self.provider.signature_verification_algorithms;
        rustls::crypto::verify_tls13_signature(message, device_cert, dss, algs)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
