//! Error types for the device connection layer
//!
//! Every failure is returned to the immediate caller with the subsystem that
//! produced it and the wrapped underlying error. Nothing here retries.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::transport::Endpoint;

/// Subsystem name reported for dial failures
pub const SOCKET_SUBSYSTEM: &str = "socket";

/// Errors produced by [`DeviceConnection`](crate::DeviceConnection) and the
/// transport selector
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The host OS has no known multiplexer endpoint
    #[error(
        "unsupported system: {os}; no device multiplexer endpoint is known for it, \
         please report this platform to the deviceconn maintainers"
    )]
    UnsupportedPlatform { os: String },

    /// Dialing the multiplexer endpoint failed (refused, missing path, ...)
    #[error("{subsystem}: failed to connect to {endpoint}: {source}")]
    Connect {
        subsystem: &'static str,
        endpoint: Endpoint,
        #[source]
        source: io::Error,
    },

    /// Dialing the multiplexer endpoint did not finish in time
    #[error("{subsystem}: connecting to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout {
        subsystem: &'static str,
        endpoint: Endpoint,
        timeout: Duration,
    },

    /// The pairing credentials could not be bound as a client identity
    #[error("tls: invalid pairing credentials: {0}")]
    Credential(#[from] CredentialError),

    /// The TLS handshake was rejected or failed mid-flight
    ///
    /// The plain handle is left in place and remains the active transport.
    #[error("tls: handshake failed: {0}")]
    Handshake(#[source] io::Error),

    /// An upgrade was requested on a session that is already encrypted
    #[error("tls: session is already secure")]
    AlreadySecure,

    /// A secure-only operation was requested without an encrypted session
    #[error("session: no secure session established")]
    NotSecure,

    /// The session has been closed
    #[error("session: connection is closed")]
    Closed,

    /// Sending over the secure session failed; the session is now closed
    #[error("session: {0}")]
    Write(#[from] WriteError),

    /// Closing the secure session failed
    #[error("session: close failed: {0}")]
    Close(#[source] io::Error),

    /// Configuration could not be loaded
    #[error("config: {0}")]
    Config(String),
}

/// Failures while turning a [`PairRecord`](crate::PairRecord) into a client
/// identity
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("host certificate contains no PEM certificate")]
    MissingCertificate,

    #[error("host certificate PEM is malformed: {0}")]
    InvalidCertificate(String),

    #[error("host private key PEM is malformed or missing: {0}")]
    InvalidPrivateKey(String),

    /// rustls refused the certificate/key pair (e.g. key does not match)
    #[error("client identity rejected: {0}")]
    Rejected(#[source] rustls::Error),

    /// The requested protocol versions are not supported by the provider
    #[error("protocol versions rejected: {0}")]
    Versions(#[source] rustls::Error),
}

/// Failures of [`DeviceConnection::send`](crate::DeviceConnection::send)
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed writing {written} of {expected} bytes")]
    Short { written: usize, expected: usize },

    #[error("write failed after {written} bytes: {source}")]
    Io {
        written: usize,
        #[source]
        source: io::Error,
    },
}

impl DeviceError {
    /// Whether a higher layer may retry the dial (with its own backoff)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::ConnectTimeout { .. } | Self::Handshake(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_platform_names_os() {
        let err = DeviceError::UnsupportedPlatform {
            os: "plan9".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("plan9"));
        assert!(msg.contains("report"));
    }

    #[test]
    fn test_connect_error_names_subsystem() {
        let err = DeviceError::Connect {
            subsystem: SOCKET_SUBSYSTEM,
            endpoint: Endpoint::Unix("/nonexistent".into()),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("socket:"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_short_write_message() {
        let err = DeviceError::from(WriteError::Short {
            written: 3,
            expected: 8,
        });
        assert_eq!(err.to_string(), "session: failed writing 3 of 8 bytes");
        assert!(!err.is_retryable());
    }
}
