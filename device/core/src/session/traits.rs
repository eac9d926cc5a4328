//! Session trait
//!
//! Higher layers (lockdown, service clients, ...) talk to a device channel
//! through this trait so they can be tested against in-memory doubles.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::DeviceError;
use crate::pair_record::PairRecord;

use super::{ActiveHandle, DeviceConnection};

/// Operations of one logical device channel
#[async_trait]
pub trait DeviceConnect: Send {
    /// Drop the TLS layer, continuing on the plain handle
    fn disable_session_ssl(&mut self);

    /// Upgrade with an explicit version preference
    async fn enable_session_ssl_with_version(
        &mut self,
        version: &[u32],
        record: &PairRecord,
    ) -> Result<(), DeviceError>;

    /// Upgrade with the conservative default version
    async fn enable_session_ssl(&mut self, record: &PairRecord) -> Result<(), DeviceError> {
        self.enable_session_ssl_with_version(&[], record).await
    }

    fn reader(&mut self) -> &mut (dyn AsyncRead + Unpin + Send);

    fn writer(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send);

    fn conn(&self) -> ActiveHandle<'_>;

    /// Write all bytes over the secure stream
    async fn send(&mut self, bytes: &[u8]) -> Result<(), DeviceError>;

    async fn close(&mut self) -> Result<(), DeviceError>;
}

#[async_trait]
impl DeviceConnect for DeviceConnection {
    fn disable_session_ssl(&mut self) {
        DeviceConnection::disable_session_ssl(self)
    }

    async fn enable_session_ssl_with_version(
        &mut self,
        version: &[u32],
        record: &PairRecord,
    ) -> Result<(), DeviceError> {
        DeviceConnection::enable_session_ssl_with_version(self, version, record).await
    }

    fn reader(&mut self) -> &mut (dyn AsyncRead + Unpin + Send) {
        DeviceConnection::reader(self)
    }

    fn writer(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send) {
        DeviceConnection::writer(self)
    }

    fn conn(&self) -> ActiveHandle<'_> {
        DeviceConnection::conn(self)
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        DeviceConnection::send(self, bytes).await
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        DeviceConnection::close(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Endpoint, RawStream};
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Endpoint::Tcp(listener.local_addr().unwrap());
        let (conn, _accepted) = tokio::join!(
            DeviceConnection::connect_to(&endpoint, Duration::from_secs(1)),
            listener.accept()
        );

        let mut device: Box<dyn DeviceConnect> = Box::new(conn.unwrap());
        assert!(matches!(device.conn(), ActiveHandle::Plain(RawStream::Tcp(_))));

        device.disable_session_ssl();
        assert!(matches!(device.send(b"x").await, Err(DeviceError::NotSecure)));
        device.close().await.unwrap();
    }
}
