//! Host platform to endpoint mapping
//!
//! Selection is a pure function of [`HostPlatform`], so every branch can be
//! exercised on any build host without touching the operating system.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;

use crate::error::DeviceError;

use super::Endpoint;

/// Loopback TCP address of the multiplexer on Windows hosts
pub const TCP_SOCKET_ADDRESS: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 27015));

/// Unix domain socket path of the multiplexer on Unix-like hosts
pub const UNIX_SOCKET_ADDRESS: &str = "/var/run/usbmuxd";

/// Host operating system families the selector knows about
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    MacOs,
    Linux,
    Android,
    /// Anything else, carrying the OS name as reported by the toolchain
    Other(String),
}

impl HostPlatform {
    /// Platform of the running binary
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map an OS name (as in `std::env::consts::OS`) to a platform
    pub fn from_os_name(os: &str) -> Self {
        match os.trim().to_lowercase().as_str() {
            "windows" => Self::Windows,
            "macos" | "darwin" => Self::MacOs,
            "linux" => Self::Linux,
            "android" => Self::Android,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
            Self::Android => "android",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Choose the multiplexer endpoint for a host platform
///
/// # Errors
///
/// Returns [`DeviceError::UnsupportedPlatform`] for platforms with no known
/// endpoint. No dial is attempted in that case.
pub fn select_transport(platform: &HostPlatform) -> Result<Endpoint, DeviceError> {
    match platform {
        HostPlatform::Windows => Ok(Endpoint::Tcp(TCP_SOCKET_ADDRESS)),
        HostPlatform::MacOs | HostPlatform::Linux | HostPlatform::Android => {
            Ok(Endpoint::Unix(PathBuf::from(UNIX_SOCKET_ADDRESS)))
        }
        HostPlatform::Other(os) => Err(DeviceError::UnsupportedPlatform { os: os.clone() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_windows_uses_loopback_tcp() {
        let endpoint = select_transport(&HostPlatform::Windows).unwrap();
        assert_eq!(endpoint, Endpoint::Tcp("127.0.0.1:27015".parse().unwrap()));
    }

    #[test]
    fn test_unix_like_hosts_use_usbmuxd_socket() {
        for platform in [HostPlatform::MacOs, HostPlatform::Linux, HostPlatform::Android] {
            let endpoint = select_transport(&platform).unwrap();
            assert_eq!(endpoint, Endpoint::Unix(PathBuf::from("/var/run/usbmuxd")));
        }
    }

    #[test]
    fn test_unknown_host_is_unsupported() {
        let result = select_transport(&HostPlatform::from_os_name("freebsd"));
        match result {
            Err(DeviceError::UnsupportedPlatform { os }) => assert_eq!(os, "freebsd"),
            other => panic!("Expected UnsupportedPlatform, got: {other:?}"),
        }
    }

    #[test]
    fn test_os_name_aliases() {
        assert_eq!(HostPlatform::from_os_name("darwin"), HostPlatform::MacOs);
        assert_eq!(HostPlatform::from_os_name("Linux"), HostPlatform::Linux);
        assert_eq!(HostPlatform::from_os_name("windows"), HostPlatform::Windows);
        assert_eq!(
            HostPlatform::from_os_name("solaris"),
            HostPlatform::Other("solaris".to_string())
        );
    }

    #[test]
    fn test_current_matches_build_target() {
        assert_eq!(HostPlatform::current().name(), std::env::consts::OS);
    }
}
