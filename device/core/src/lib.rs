//! Device Connection Core - transport layer to a locally attached device
//!
//! Opens the platform's device multiplexer socket and optionally upgrades
//! it to a TLS session using the host credentials from a pairing record.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       DeviceConnection                       │
//! │                                                              │
//! │  ┌────────────────┐   ┌───────────────┐   ┌───────────────┐  │
//! │  │   Transport    │   │    Session    │   │  Encryption   │  │
//! │  │   Selector     │──►│    State      │◄──│   Upgrader    │  │
//! │  │ (platform→addr)│   │ Plain/Secure  │   │ (rustls)      │  │
//! │  └────────────────┘   └───────┬───────┘   └───────────────┘  │
//! │                               │                              │
//! └───────────────────────────────┼──────────────────────────────┘
//!                                 │
//!                 /var/run/usbmuxd  or  127.0.0.1:27015
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use deviceconn_core::{DeviceConnection, PairRecord};
//!
//! let mut conn = DeviceConnection::open().await?;
//! let record = PairRecord::from_pem_files("host.pem", "host.key").await?;
//!
//! // Opportunistic upgrade; a failed handshake leaves the plain socket in place
//! conn.enable_session_ssl_with_version(&[11], &record).await?;
//! conn.send(b"...").await?;
//!
//! conn.disable_session_ssl();
//! conn.close().await?;
//! ```

pub mod error;
pub mod pair_record;
pub mod session;
pub mod tls;
pub mod transport;

// Re-exports for convenience
pub use error::{CredentialError, DeviceError, WriteError};
pub use pair_record::PairRecord;
pub use session::{ActiveHandle, DeviceConnect, DeviceConnection, SessionMode};
pub use tls::{PeerVerification, TlsClientOptions, TlsVersionPolicy};
pub use transport::{
    select_transport, ConnectionConfig, Endpoint, HostPlatform, RawStream,
    DEVICE_CONNECT_TIMEOUT, TCP_SOCKET_ADDRESS, UNIX_SOCKET_ADDRESS,
};
