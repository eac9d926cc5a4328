//! Device Connection Probe
//!
//! Opens the local device multiplexer socket, optionally upgrades the session
//! to TLS with a pairing record, sends a payload and dumps the reply.
//!
//! # Usage
//!
//! ```bash
//! # Check that the multiplexer socket is reachable
//! deviceconn-probe
//!
//! # Upgrade with host credentials, offering TLS 1.2-1.3
//! deviceconn-probe --cert host.pem --key host.key --tls-version 11
//!
//! # Send a request file and print up to 4 KiB of the reply
//! deviceconn-probe --pair-record record.json --send request.bin --read 4096
//!
//! # With verbose logging
//! RUST_LOG=debug deviceconn-probe
//! ```
//!
//! # Environment Variables
//!
//! - `DEVICECONN_PLATFORM`: Host OS override for endpoint selection
//! - `DEVICECONN_CONNECT_TIMEOUT`: Dial timeout in ms
//! - `DEVICECONN_TLS_VERSION`: Comma separated version preference
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

use deviceconn_core::{ConnectionConfig, DeviceConnection, PairRecord, SessionMode};

#[derive(Debug, Parser)]
#[command(name = "deviceconn-probe", version, about)]
struct Args {
    /// TOML configuration file (defaults come from the environment)
    #[arg(long, env = "DEVICECONN_CONFIG")]
    config: Option<PathBuf>,

    /// Host OS name used to pick the multiplexer endpoint
    #[arg(long)]
    platform: Option<String>,

    /// Dial timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Host certificate PEM
    #[arg(long, requires = "key", conflicts_with = "pair_record")]
    cert: Option<PathBuf>,

    /// Host private key PEM
    #[arg(long, requires = "cert")]
    key: Option<PathBuf>,

    /// Pair record as JSON with HostCertificate/HostPrivateKey byte arrays
    #[arg(long)]
    pair_record: Option<PathBuf>,

    /// Version preference; a first value above 10 widens the TLS range
    #[arg(long, value_delimiter = ',')]
    tls_version: Option<Vec<u32>>,

    /// Drop back to plaintext after the upgrade, before sending
    #[arg(long)]
    disable_ssl: bool,

    /// File whose contents are sent after connecting
    #[arg(long)]
    send: Option<PathBuf>,

    /// Read up to this many bytes of reply and print them as hex
    #[arg(long, default_value_t = 0)]
    read: usize,

    /// How long to wait for the reply, in milliseconds
    #[arg(long, default_value_t = 5000)]
    read_timeout_ms: u64,
}

async fn load_config(args: &Args) -> Result<ConnectionConfig> {
    let mut config = match &args.config {
        Some(path) => ConnectionConfig::load_from_path(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConnectionConfig::from_env(),
    };

    if let Some(platform) = &args.platform {
        config.platform = Some(platform.clone());
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.connect_timeout_ms = timeout_ms;
    }
    if let Some(version) = &args.tls_version {
        config.tls_version = version.clone();
    }
    Ok(config)
}

async fn load_pair_record(args: &Args) -> Result<Option<PairRecord>> {
    if let (Some(cert), Some(key)) = (&args.cert, &args.key) {
        let record = PairRecord::from_pem_files(cert, key)
            .await
            .context("Failed to read host credentials")?;
        return Ok(Some(record));
    }

    if let Some(path) = &args.pair_record {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read pair record {}", path.display()))?;
        let record: PairRecord =
            serde_json::from_slice(&raw).context("Pair record is not valid JSON")?;
        return Ok(Some(record));
    }

    Ok(None)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("deviceconn_probe=info".parse()?)
                .add_directive("deviceconn_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = load_config(&args).await?;
    let record = load_pair_record(&args).await?;

    info!(platform = %config.host_platform(), "Opening device connection");
    let mut conn = DeviceConnection::open_with_config(&config)
        .await
        .context("Failed to open device connection")?;
    info!(mode = ?conn.mode(), "Connected");

    if let Some(record) = &record {
        match conn.enable_session_ssl_configured(record).await {
            Ok(()) => info!(mode = ?conn.mode(), "Session upgraded"),
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "Upgrade failed, continuing in plaintext");
            }
            Err(e) => return Err(e).context("Failed to upgrade session"),
        }

        if args.disable_ssl {
            conn.disable_session_ssl();
            info!(mode = ?conn.mode(), "Session TLS disabled");
        }
    }

    if let Some(path) = &args.send {
        let payload = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read payload {}", path.display()))?;

        match conn.mode() {
            SessionMode::Secure => conn.send(&payload).await.context("Secure send failed")?,
            SessionMode::Plain => {
                let writer = conn.writer();
                writer.write_all(&payload).await.context("Plain write failed")?;
                writer.flush().await.context("Plain flush failed")?;
            }
            SessionMode::Closed => bail!("Connection closed before sending"),
        }
        info!(bytes = payload.len(), "Payload sent");
    }

    if args.read > 0 {
        let mut buf = vec![0u8; args.read];
        let read = tokio::time::timeout(
            Duration::from_millis(args.read_timeout_ms),
            conn.reader().read(&mut buf),
        )
        .await
        .context("Timed out waiting for a reply")?
        .context("Read failed")?;
        println!("{}", hex::encode(&buf[..read]));
    }

    conn.close().await.context("Failed to close session")?;
    info!(mode = ?conn.mode(), "Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_version_list() {
        let args = Args::try_parse_from([
            "deviceconn-probe",
            "--tls-version",
            "11,0",
            "--platform",
            "linux",
        ])
        .unwrap();
        assert_eq!(args.tls_version, Some(vec![11, 0]));
        assert_eq!(args.platform.as_deref(), Some("linux"));
        assert_eq!(args.read, 0);
    }

    #[test]
    fn test_cert_requires_key() {
        let result = Args::try_parse_from(["deviceconn-probe", "--cert", "host.pem"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cli_overrides_config() {
        let args = Args::try_parse_from([
            "deviceconn-probe",
            "--platform",
            "windows",
            "--timeout-ms",
            "250",
        ])
        .unwrap();
        let config = load_config(&args).await.unwrap();
        assert_eq!(config.platform.as_deref(), Some("windows"));
        assert_eq!(config.connect_timeout_ms, 250);
    }
}
