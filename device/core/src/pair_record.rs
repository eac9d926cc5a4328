//! Pairing credentials
//!
//! Produced by the pairing exchange elsewhere; this layer only reads the
//! host certificate and key out of it when upgrading a session.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CredentialError, DeviceError};

/// Host identity material from a pairing record (PEM encoded)
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PairRecord {
    pub host_certificate: Vec<u8>,
    pub host_private_key: Vec<u8>,
}

impl PairRecord {
    pub fn new(host_certificate: impl Into<Vec<u8>>, host_private_key: impl Into<Vec<u8>>) -> Self {
        Self {
            host_certificate: host_certificate.into(),
            host_private_key: host_private_key.into(),
        }
    }

    /// Read the certificate and key from two PEM files
    pub async fn from_pem_files(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> Result<Self, DeviceError> {
        let cert_path = cert_path.as_ref();
        let key_path = key_path.as_ref();

        let host_certificate = tokio::fs::read(cert_path).await.map_err(|e| {
            CredentialError::InvalidCertificate(format!("reading {}: {e}", cert_path.display()))
        })?;
        let host_private_key = tokio::fs::read(key_path).await.map_err(|e| {
            CredentialError::InvalidPrivateKey(format!("reading {}: {e}", key_path.display()))
        })?;

        Ok(Self::new(host_certificate, host_private_key))
    }
}

// Keeps the private key out of logs
impl fmt::Debug for PairRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairRecord")
            .field("host_certificate", &format_args!("{} bytes", self.host_certificate.len()))
            .field("host_private_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_debug_redacts_key() {
        let record = PairRecord::new(b"CERT".to_vec(), b"SECRET".to_vec());
        let out = format!("{record:?}");
        assert!(out.contains("4 bytes"));
        assert!(!out.contains("SECRET"));
    }

    #[test]
    fn test_deserialize_pascal_case() {
        let record: PairRecord =
            serde_json::from_str(r#"{"HostCertificate":[65],"HostPrivateKey":[66]}"#).unwrap();
        assert_eq!(record, PairRecord::new(b"A".to_vec(), b"B".to_vec()));
    }

    #[tokio::test]
    async fn test_from_pem_files() {
        let mut cert = tempfile::NamedTempFile::new().unwrap();
        let mut key = tempfile::NamedTempFile::new().unwrap();
        cert.write_all(b"cert-pem").unwrap();
        key.write_all(b"key-pem").unwrap();

        let record = PairRecord::from_pem_files(cert.path(), key.path()).await.unwrap();
        assert_eq!(record.host_certificate, b"cert-pem");
        assert_eq!(record.host_private_key, b"key-pem");
    }

    #[tokio::test]
    async fn test_from_missing_pem_file() {
        let key = tempfile::NamedTempFile::new().unwrap();
        let result = PairRecord::from_pem_files("/nonexistent/host.pem", key.path()).await;
        assert!(matches!(
            result,
            Err(DeviceError::Credential(CredentialError::InvalidCertificate(_)))
        ));
    }
}
