//! Protocol version selection
//!
//! A two-way switch, not a negotiation table: the caller's preference either
//! pins the handshake to one conservative version or opens the full range.

use rustls::{ProtocolVersion, SupportedProtocolVersion};

/// Preference values above this select the wide range
pub const WIDE_RANGE_THRESHOLD: u32 = 10;

static PINNED_VERSIONS: &[&SupportedProtocolVersion] = &[&rustls::version::TLS12];
static WIDE_VERSIONS: &[&SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

/// Version range offered during the handshake
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TlsVersionPolicy {
    /// Minimum and maximum pinned to the oldest supported version (TLS 1.2)
    #[default]
    Pinned,
    /// TLS 1.2 through TLS 1.3
    Wide,
}

impl TlsVersionPolicy {
    /// Derive the policy from a caller preference list
    ///
    /// Only the first element matters. An empty list is the pinned case.
    pub fn from_preference(preference: &[u32]) -> Self {
        match preference.first() {
            Some(&first) if first > WIDE_RANGE_THRESHOLD => Self::Wide,
            _ => Self::Pinned,
        }
    }

    pub fn protocol_versions(self) -> &'static [&'static SupportedProtocolVersion] {
        match self {
            Self::Pinned => PINNED_VERSIONS,
            Self::Wide => WIDE_VERSIONS,
        }
    }

    pub fn min_version(self) -> ProtocolVersion {
        ProtocolVersion::TLSv1_2
    }

    pub fn max_version(self) -> ProtocolVersion {
        match self {
            Self::Pinned => ProtocolVersion::TLSv1_2,
            Self::Wide => ProtocolVersion::TLSv1_3,
        }
    }
}
