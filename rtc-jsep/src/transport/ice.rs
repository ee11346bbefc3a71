use serde::{Deserialize, Serialize};
use shared::util::math_rand_alpha_number;

/// Length of a generated `ice-ufrag` (RFC 8445 §5.3 asks for at least 4).
pub const ICE_UFRAG_LEN: usize = 16;
/// Length of a generated `ice-pwd` (RFC 8445 §5.3 asks for at least 22).
pub const ICE_PWD_LEN: usize = 32;

/// Local or remote ICE credentials.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RTCIceParameters {
    pub username_fragment: String,
    pub password: String,
}

impl RTCIceParameters {
    pub fn new(username_fragment: &str, password: &str) -> Self {
        RTCIceParameters {
            username_fragment: username_fragment.to_owned(),
            password: password.to_owned(),
        }
    }

    /// Fresh random credentials.
    pub fn generate() -> Self {
        RTCIceParameters {
            username_fragment: math_rand_alpha_number(ICE_UFRAG_LEN),
            password: math_rand_alpha_number(ICE_PWD_LEN),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username_fragment.is_empty() && self.password.is_empty()
    }
}

/// The address put on the m= and c= lines (and `a=rtcp`) of sections using a transport.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCDefaultCandidate {
    pub address: String,
    pub port: u16,
    pub rtcp_address: String,
    pub rtcp_port: u16,
}

const CANDIDATE_PREFIX: &str = "candidate:";

/// Strips an optional `a=` and the `candidate:` prefix, leaving the
/// attribute value as it is stored in an m-section.
pub(crate) fn candidate_attribute_value(candidate: &str) -> String {
    let candidate = candidate.trim();
    let candidate = candidate.strip_prefix("a=").unwrap_or(candidate);
    candidate
        .strip_prefix(CANDIDATE_PREFIX)
        .unwrap_or(candidate)
        .to_owned()
}

/// Component id of a candidate attribute value (`<foundation> <component> ...`).
pub(crate) fn candidate_component(candidate: &str) -> Option<u16> {
    candidate.split_whitespace().nth(1)?.parse().ok()
}
