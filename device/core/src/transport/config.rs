//! Connection Configuration
//!
//! Knobs around the fixed multiplexer endpoints: which platform to select
//! for, how long a dial may take, and the default TLS version preference.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

use super::platform::HostPlatform;

/// Default bound on dialing the multiplexer
pub const DEVICE_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Host OS name used for endpoint selection (None = detect)
    pub platform: Option<String>,

    /// Dial timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Version preference for [`enable_session_ssl_configured`]
    ///
    /// Empty or a first element of 10 or less pins the conservative version;
    /// a first element above 10 widens the range.
    ///
    /// [`enable_session_ssl_configured`]: crate::DeviceConnection::enable_session_ssl_configured
    pub tls_version: Vec<u32>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            platform: None,
            connect_timeout_ms: DEVICE_CONNECT_TIMEOUT.as_millis() as u64,
            tls_version: Vec::new(),
        }
    }
}

impl ConnectionConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DEVICECONN_PLATFORM`: OS name override ("linux", "windows", ...)
    /// - `DEVICECONN_CONNECT_TIMEOUT`: Dial timeout in ms
    /// - `DEVICECONN_TLS_VERSION`: Comma separated version preference
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            platform: lookup("DEVICECONN_PLATFORM").filter(|v| !v.trim().is_empty()),
            connect_timeout_ms: lookup("DEVICECONN_CONNECT_TIMEOUT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.connect_timeout_ms),
            tls_version: lookup("DEVICECONN_TLS_VERSION")
                .map(|v| parse_version_list(&v))
                .unwrap_or_default(),
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, DeviceError> {
        toml::from_str(contents).map_err(|e| DeviceError::Config(e.to_string()))
    }

    /// Load a TOML configuration file
    pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DeviceError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Platform to select the endpoint for
    pub fn host_platform(&self) -> HostPlatform {
        match &self.platform {
            Some(os) => HostPlatform::from_os_name(os),
            None => HostPlatform::current(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Parse "11,0" style lists, skipping entries that are not numbers
fn parse_version_list(value: &str) -> Vec<u32> {
    value
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(60));
        assert!(config.tls_version.is_empty());
        assert_eq!(config.host_platform(), HostPlatform::current());
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("DEVICECONN_PLATFORM", "windows"),
            ("DEVICECONN_CONNECT_TIMEOUT", "2500"),
            ("DEVICECONN_TLS_VERSION", "13, 0,x"),
        ]
        .into_iter()
        .collect();

        let config = ConnectionConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.host_platform(), HostPlatform::Windows);
        assert_eq!(config.connect_timeout(), Duration::from_millis(2500));
        assert_eq!(config.tls_version, vec![13, 0]);
    }

    #[test]
    fn test_from_lookup_bad_values_fall_back() {
        let config = ConnectionConfig::from_lookup(|k| match k {
            "DEVICECONN_CONNECT_TIMEOUT" => Some("soon".to_string()),
            "DEVICECONN_PLATFORM" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config, ConnectionConfig::default());
    }

    #[test]
    fn test_from_toml_str() {
        let config = ConnectionConfig::from_toml_str(
            r#"
            platform = "linux"
            tls_version = [11]
            "#,
        )
        .unwrap();
        assert_eq!(config.platform.as_deref(), Some("linux"));
        assert_eq!(config.tls_version, vec![11]);
        assert_eq!(config.connect_timeout_ms, 60_000);
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = ConnectionConfig::from_toml_str("connect_timeout_ms = \"fast\"");
        assert!(matches!(result, Err(DeviceError::Config(_))));
    }

    #[tokio::test]
    async fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "connect_timeout_ms = 750").unwrap();

        let config = ConnectionConfig::load_from_path(file.path()).await.unwrap();
        assert_eq!(config.connect_timeout(), Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_load_from_missing_path() {
        let result = ConnectionConfig::load_from_path("/nonexistent/deviceconn.toml").await;
        assert!(matches!(result, Err(DeviceError::Config(_))));
    }
}
