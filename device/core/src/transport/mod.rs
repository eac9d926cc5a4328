//! Transport Selector
//!
//! Maps the host platform to the device multiplexer endpoint and opens the
//! raw connection with a bounded dial timeout:
//!
//! | Host                  | Transport     | Address            |
//! |-----------------------|---------------|--------------------|
//! | Windows               | loopback TCP  | `127.0.0.1:27015`  |
//! | macOS, Linux, Android | Unix socket   | `/var/run/usbmuxd` |
//!
//! The endpoints are fixed. Only the dial timeout and the platform used for
//! selection can be overridden through [`ConnectionConfig`].

pub mod config;
pub mod platform;
pub mod stream;

use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::{DeviceError, SOCKET_SUBSYSTEM};

pub use config::{ConnectionConfig, DEVICE_CONNECT_TIMEOUT};
pub use platform::{
    select_transport, HostPlatform, TCP_SOCKET_ADDRESS, UNIX_SOCKET_ADDRESS,
};
pub use stream::RawStream;

/// Address of a device multiplexer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{addr}"),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Open a raw connection to `endpoint`, giving up after `timeout`
///
/// # Errors
///
/// - [`DeviceError::Connect`] when the dial is refused or the path is missing
/// - [`DeviceError::ConnectTimeout`] when `timeout` elapses first
/// - [`DeviceError::UnsupportedPlatform`] for a Unix endpoint on a non-unix host
pub async fn dial(endpoint: &Endpoint, timeout: Duration) -> Result<RawStream, DeviceError> {
    tracing::debug!(%endpoint, ?timeout, "Dialing device multiplexer");

    let attempt = async {
        match endpoint {
            Endpoint::Tcp(addr) => TcpStream::connect(addr).await.map(RawStream::from),
            #[cfg(unix)]
            Endpoint::Unix(path) => tokio::net::UnixStream::connect(path)
                .await
                .map(RawStream::from),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix domain sockets are not available on this host",
            )),
        }
    };

    bounded_connect(endpoint, timeout, attempt).await
}

/// Race a connect attempt against `timeout` and attach endpoint context
async fn bounded_connect<F>(
    endpoint: &Endpoint,
    timeout: Duration,
    attempt: F,
) -> Result<RawStream, DeviceError>
where
    F: Future<Output = io::Result<RawStream>>,
{
    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(stream)) => {
            tracing::info!(%endpoint, kind = stream.kind(), "Connected to device multiplexer");
            Ok(stream)
        }
        #[cfg(not(unix))]
        Ok(Err(e)) if e.kind() == io::ErrorKind::Unsupported => {
            Err(DeviceError::UnsupportedPlatform {
                os: std::env::consts::OS.to_string(),
            })
        }
        Ok(Err(source)) => {
            tracing::warn!(%endpoint, error = %source, "Dial failed");
            Err(DeviceError::Connect {
                subsystem: SOCKET_SUBSYSTEM,
                endpoint: endpoint.clone(),
                source,
            })
        }
        Err(_) => {
            tracing::warn!(%endpoint, ?timeout, "Dial timed out");
            Err(DeviceError::ConnectTimeout {
                subsystem: SOCKET_SUBSYSTEM,
                endpoint: endpoint.clone(),
                timeout,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    #[test]
    fn test_endpoint_display() {
        assert_eq!(
            Endpoint::Tcp(TCP_SOCKET_ADDRESS).to_string(),
            "tcp://127.0.0.1:27015"
        );
        assert_eq!(
            Endpoint::Unix(PathBuf::from(UNIX_SOCKET_ADDRESS)).to_string(),
            "unix:///var/run/usbmuxd"
        );
    }

    #[tokio::test]
    async fn test_dial_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Endpoint::Tcp(listener.local_addr().unwrap());

        let stream = dial(&endpoint, Duration::from_secs(1)).await.unwrap();
        assert_eq!(stream.kind(), "tcp");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dial_unix() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("usbmuxd");
        let _listener = tokio::net::UnixListener::bind(&socket_path).unwrap();

        let stream = dial(&Endpoint::Unix(socket_path), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(stream.kind(), "unix");
    }

    #[tokio::test]
    async fn test_dial_missing_socket_path() {
        let temp_dir = TempDir::new().unwrap();
        let endpoint = Endpoint::Unix(temp_dir.path().join("nonexistent.sock"));

        let result = dial(&endpoint, Duration::from_secs(1)).await;
        match result {
            Err(DeviceError::Connect {
                subsystem,
                endpoint: failed,
                ..
            }) => {
                assert_eq!(subsystem, "socket");
                assert_eq!(failed, endpoint);
            }
            #[cfg(not(unix))]
            Err(DeviceError::UnsupportedPlatform { .. }) => {}
            other => panic!("Expected Connect error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dial_refused() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let result = dial(&Endpoint::Tcp(addr), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(DeviceError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_dial_timeout_names_endpoint() {
        let endpoint = Endpoint::Unix(PathBuf::from(UNIX_SOCKET_ADDRESS));
        let timeout = Duration::from_millis(20);

        let result = bounded_connect(&endpoint, timeout, std::future::pending()).await;
        match result {
            Err(DeviceError::ConnectTimeout {
                subsystem,
                endpoint: failed,
                timeout: waited,
            }) => {
                assert_eq!(subsystem, "socket");
                assert_eq!(failed, endpoint);
                assert_eq!(waited, timeout);
            }
            other => panic!("Expected ConnectTimeout error, got: {other:?}"),
        }
    }
}
