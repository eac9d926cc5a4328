//! Device Session
//!
//! [`DeviceConnection`] owns one logical channel to the device multiplexer.
//! It starts plaintext and can be upgraded to TLS with pairing credentials,
//! downgraded again, and closed. Reads and writes always go to the current
//! handle: the secure stream when one exists, the plain one otherwise.
//!
//! # Close semantics
//!
//! [`close`](DeviceConnection::close) only tears down a secure stream. On a
//! plain session it is a no-op and the socket stays usable.
//! [`disable_session_ssl`](DeviceConnection::disable_session_ssl) drops the
//! TLS layer without closing anything. In both cases the socket is still
//! released when the `DeviceConnection` is dropped.

mod state;
pub mod traits;

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

use crate::error::{DeviceError, WriteError};
use crate::pair_record::PairRecord;
use crate::tls::{self, TlsClientOptions};
use crate::transport::{self, ConnectionConfig, Endpoint, RawStream};

pub use state::{ActiveHandle, SessionMode, SessionState};
pub use traits::DeviceConnect;

/// One connection to the device multiplexer
#[derive(Debug)]
pub struct DeviceConnection {
    state: SessionState,
    /// Default version preference for `enable_session_ssl_configured`
    tls_version: Vec<u32>,
}

impl DeviceConnection {
    /// Connect to the multiplexer endpoint of the running host
    pub async fn open() -> Result<Self, DeviceError> {
        Self::open_with_config(&ConnectionConfig::default()).await
    }

    /// Connect using an explicit configuration
    ///
    /// # Errors
    ///
    /// - [`DeviceError::UnsupportedPlatform`] before any dial is attempted
    /// - [`DeviceError::Connect`] / [`DeviceError::ConnectTimeout`] from the dial
    pub async fn open_with_config(config: &ConnectionConfig) -> Result<Self, DeviceError> {
        let platform = config.host_platform();
        let endpoint = transport::select_transport(&platform)?;
        tracing::debug!(%platform, %endpoint, "Selected multiplexer endpoint");

        let mut conn = Self::connect_to(&endpoint, config.connect_timeout()).await?;
        conn.tls_version = config.tls_version.clone();
        Ok(conn)
    }

    /// Connect to a specific endpoint
    pub async fn connect_to(endpoint: &Endpoint, timeout: Duration) -> Result<Self, DeviceError> {
        let stream = transport::dial(endpoint, timeout).await?;
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already connected plain stream
    pub fn from_stream(stream: RawStream) -> Self {
        Self {
            state: SessionState::Plain(stream),
            tls_version: Vec::new(),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.state.mode()
    }

    pub fn is_secure(&self) -> bool {
        self.mode() == SessionMode::Secure
    }

    /// The current handle: secure if present, else plain
    pub fn conn(&self) -> ActiveHandle<'_> {
        self.state.active()
    }

    /// The plain socket, whether active or underneath the TLS layer
    pub fn plain_conn(&self) -> Option<&RawStream> {
        self.state.plain()
    }

    /// Read view of the current handle
    pub fn reader(&mut self) -> &mut (dyn AsyncRead + Unpin + Send) {
        &mut self.state
    }

    /// Write view of the current handle
    pub fn writer(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send) {
        &mut self.state
    }

    /// Upgrade to TLS with the conservative version
    pub async fn enable_session_ssl(&mut self, record: &PairRecord) -> Result<(), DeviceError> {
        self.enable_session_ssl_with_version(&[], record).await
    }

    /// Upgrade to TLS with the version preference from the configuration
    pub async fn enable_session_ssl_configured(
        &mut self,
        record: &PairRecord,
    ) -> Result<(), DeviceError> {
        let preference = self.tls_version.clone();
        self.enable_session_ssl_with_version(&preference, record).await
    }

    /// Upgrade to TLS with an explicit version preference
    pub async fn enable_session_ssl_with_version(
        &mut self,
        version: &[u32],
        record: &PairRecord,
    ) -> Result<(), DeviceError> {
        self.upgrade(&TlsClientOptions::from_preference(version), record)
            .await
    }

    /// Run the upgrade with fully specified options
    ///
    /// All-or-nothing: on any error the session keeps its previous mode.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::AlreadySecure`] if a secure stream already exists
    /// - [`DeviceError::Closed`] if the session was closed
    /// - [`DeviceError::Credential`] if the pair record cannot be bound
    /// - [`DeviceError::Handshake`] if the peer rejects the handshake
    pub async fn upgrade(
        &mut self,
        options: &TlsClientOptions,
        record: &PairRecord,
    ) -> Result<(), DeviceError> {
        match self.state.mode() {
            SessionMode::Plain => {}
            SessionMode::Secure => return Err(DeviceError::AlreadySecure),
            SessionMode::Closed => return Err(DeviceError::Closed),
        }

        let config = tls::build_client_config(record, options)?;

        let SessionState::Plain(plain) = self.state.take_state() else {
            return Err(DeviceError::Closed);
        };

        tracing::debug!(
            min = ?options.versions.min_version(),
            max = ?options.versions.max_version(),
            "Starting TLS handshake"
        );
        match tls::handshake(plain, config).await {
            Ok(secure) => {
                let version = secure.get_ref().1.protocol_version();
                self.state.upgrade(secure);
                tracing::info!(?version, "Session upgraded to TLS");
                Ok(())
            }
            Err((e, plain)) => {
                self.state = SessionState::Plain(plain);
                tracing::warn!(error = %e, "TLS handshake failed, staying in plaintext");
                Err(DeviceError::Handshake(e))
            }
        }
    }

    /// Drop the TLS layer and continue on the plain handle
    ///
    /// No-op when no secure stream exists.
    pub fn disable_session_ssl(&mut self) {
        if self.state.downgrade() {
            tracing::debug!("Session TLS disabled");
        }
    }

    /// Write all of `bytes` to the secure stream
    ///
    /// Only the secure stream is written. A plain-mode caller writes through
    /// [`writer`](Self::writer) instead.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::NotSecure`] without a secure stream
    /// - [`DeviceError::Write`] on a short or failed write; the secure stream
    ///   is shut down and the session is closed before returning
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        let SessionState::Secure(stream) = &mut self.state else {
            return Err(DeviceError::NotSecure);
        };

        let result = write_fully(stream.as_mut(), bytes).await;
        self.finish_send(result).await
    }

    /// Close the session after a failed write and surface the write error
    async fn finish_send(&mut self, result: Result<(), WriteError>) -> Result<(), DeviceError> {
        let Err(e) = result else {
            return Ok(());
        };
        tracing::warn!(error = %e, "Send failed, closing secure session");
        if let Err(close_err) = self.close().await {
            tracing::debug!(error = %close_err, "Close after failed send also failed");
        }
        Err(e.into())
    }

    /// Close the secure stream, if any
    ///
    /// A plain-only session is left untouched.
    pub async fn close(&mut self) -> Result<(), DeviceError> {
        if !self.is_secure() {
            return Ok(());
        }

        let SessionState::Secure(mut stream) = self.state.take_state() else {
            return Ok(());
        };
        tracing::debug!("Closing secure session");
        match stream.shutdown().await {
            Ok(()) => Ok(()),
            // Peer already gone
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(DeviceError::Close(e)),
        }
    }
}

async fn write_fully<W>(writer: &mut W, bytes: &[u8]) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0;
    while written < bytes.len() {
        match writer.write(&bytes[written..]).await {
            Ok(0) => {
                return Err(WriteError::Short {
                    written,
                    expected: bytes.len(),
                })
            }
            Ok(n) => written += n,
            Err(source) => return Err(WriteError::Io { written, source }),
        }
    }
    writer
        .flush()
        .await
        .map_err(|source| WriteError::Io { written, source })
}

impl AsyncRead for DeviceConnection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().state).poll_read(cx, buf)
    }
}

impl AsyncWrite for DeviceConnection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().state).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().state).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().state).poll_shutdown(cx)
    }
}
