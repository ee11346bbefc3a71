//! Transport records.
//!
//! The session owns one [`RTCJsepTransport`] per m-section that carries its
//! own ICE/DTLS association. Bundled transceivers share the record of their
//! bundle tag by holding the same transport id.

pub mod dtls;
pub mod ice;

use serde::{Deserialize, Serialize};

use dtls::{RTCDtlsFingerprint, RTCDtlsRole};
use ice::{RTCDefaultCandidate, RTCIceParameters};

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RTCJsepTransport {
    pub transport_id: String,
    /// Level of the m-section that owns this transport.
    pub level: usize,
    /// 1 when RTCP is multiplexed with RTP, 2 otherwise, 0 before negotiation.
    pub components: usize,

    pub local_ice: RTCIceParameters,
    pub remote_ice: Option<RTCIceParameters>,
    pub dtls_role: RTCDtlsRole,
    pub remote_fingerprints: Vec<RTCDtlsFingerprint>,

    /// Local candidates as `a=candidate` values.
    pub local_candidates: Vec<String>,
    pub remote_candidates: Vec<String>,
    pub local_end_of_candidates: bool,
    pub remote_end_of_candidates: bool,
    pub default_candidate: Option<RTCDefaultCandidate>,
}

impl RTCJsepTransport {
    pub(crate) fn new(transport_id: &str, level: usize, local_ice: RTCIceParameters) -> Self {
        RTCJsepTransport {
            transport_id: transport_id.to_owned(),
            level,
            local_ice,
            ..Default::default()
        }
    }

    /// Forgets everything gathered under the previous local credentials.
    pub(crate) fn restart_local(&mut self, local_ice: RTCIceParameters) {
        if self.local_ice != local_ice {
            self.local_ice = local_ice;
            self.local_candidates.clear();
            self.local_end_of_candidates = false;
            self.default_candidate = None;
        }
    }

    /// Forgets remote candidates when the remote credentials change.
    pub(crate) fn set_remote_ice(&mut self, remote_ice: RTCIceParameters) {
        if self.remote_ice.as_ref() != Some(&remote_ice) {
            self.remote_candidates.clear();
            self.remote_end_of_candidates = false;
            self.remote_ice = Some(remote_ice);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_transport_restart_local() {
        let mut transport = RTCJsepTransport::new("t0", 0, RTCIceParameters::new("u1", "p1"));
        transport.local_candidates.push("0 1 UDP 1 10.0.0.1 5000 typ host".to_owned());
        transport.local_end_of_candidates = true;

        transport.restart_local(RTCIceParameters::new("u1", "p1"));
        assert_eq!(transport.local_candidates.len(), 1);

        transport.restart_local(RTCIceParameters::new("u2", "p2"));
        assert!(transport.local_candidates.is_empty());
        assert!(!transport.local_end_of_candidates);
    }

    #[test]
    fn test_transport_set_remote_ice() {
        let mut transport = RTCJsepTransport::new("t0", 0, RTCIceParameters::default());
        transport.set_remote_ice(RTCIceParameters::new("ru", "rp"));
        transport.remote_candidates.push("candidate".to_owned());

        transport.set_remote_ice(RTCIceParameters::new("ru", "rp"));
        assert_eq!(transport.remote_candidates.len(), 1);

        transport.set_remote_ice(RTCIceParameters::new("ru2", "rp2"));
        assert!(transport.remote_candidates.is_empty());
    }
}
