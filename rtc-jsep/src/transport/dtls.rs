use std::fmt;

use sdp::util::ConnectionRole;
use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};

use crate::session::configuration::UNSPECIFIED_STR;

/// Hash functions accepted in `a=fingerprint` (RFC 8122 §5).
pub const SUPPORTED_FINGERPRINT_ALGORITHMS: [&str; 5] =
    ["sha-1", "sha-224", "sha-256", "sha-384", "sha-512"];

/// Which side of the DTLS handshake this endpoint plays.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCDtlsRole {
    #[default]
    Unspecified = 0,

    /// Not decided yet; offered as `a=setup:actpass`.
    #[serde(rename = "auto")]
    Auto = 1,

    /// Initiates the handshake; `a=setup:active`.
    #[serde(rename = "client")]
    Client = 2,

    /// Waits for the handshake; `a=setup:passive`.
    #[serde(rename = "server")]
    Server = 3,
}

impl fmt::Display for RTCDtlsRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCDtlsRole::Auto => write!(f, "auto"),
            RTCDtlsRole::Client => write!(f, "client"),
            RTCDtlsRole::Server => write!(f, "server"),
            _ => write!(f, "{UNSPECIFIED_STR}"),
        }
    }
}

impl From<ConnectionRole> for RTCDtlsRole {
    fn from(role: ConnectionRole) -> Self {
        match role {
            ConnectionRole::Active => RTCDtlsRole::Client,
            ConnectionRole::Passive => RTCDtlsRole::Server,
            ConnectionRole::Actpass => RTCDtlsRole::Auto,
            _ => RTCDtlsRole::Unspecified,
        }
    }
}

impl RTCDtlsRole {
    pub(crate) fn to_connection_role(self) -> ConnectionRole {
        match self {
            RTCDtlsRole::Client => ConnectionRole::Active,
            RTCDtlsRole::Server => ConnectionRole::Passive,
            RTCDtlsRole::Auto => ConnectionRole::Actpass,
            _ => ConnectionRole::Unspecified,
        }
    }

    /// The `a=setup` an answerer replies with to the offerer's `remote` setup.
    pub(crate) fn answer_setup(remote: ConnectionRole) -> ConnectionRole {
        match remote {
            ConnectionRole::Active => ConnectionRole::Passive,
            _ => ConnectionRole::Active,
        }
    }
}

/// A certificate fingerprint as carried by `a=fingerprint:<algorithm> <value>`.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RTCDtlsFingerprint {
    pub algorithm: String,

    /// Upper-case hex bytes separated by colons.
    pub value: String,
}

impl fmt::Display for RTCDtlsFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.algorithm, self.value)
    }
}

impl RTCDtlsFingerprint {
    /// Parses and validates an `a=fingerprint` attribute value.
    pub fn parse(raw: &str) -> Result<Self> {
        let (algorithm, value) = raw
            .trim()
            .split_once(' ')
            .ok_or_else(|| Error::ErrInvalidFingerprint(raw.to_owned()))?;
        let fingerprint = RTCDtlsFingerprint {
            algorithm: algorithm.to_ascii_lowercase(),
            value: value.trim().to_owned(),
        };
        fingerprint.validate()?;
        Ok(fingerprint)
    }

    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_FINGERPRINT_ALGORITHMS.contains(&self.algorithm.to_ascii_lowercase().as_str())
        {
            return Err(Error::ErrUnsupportedFingerprintAlgorithm(
                self.algorithm.clone(),
            ));
        }

        let well_formed = !self.value.is_empty()
            && self
                .value
                .split(':')
                .all(|byte| byte.len() == 2 && byte.chars().all(|c| c.is_ascii_hexdigit()));
        if !well_formed {
            return Err(Error::ErrInvalidFingerprint(self.value.clone()));
        }

        Ok(())
    }
}
