use serde::{Deserialize, Serialize};

use crate::codec::RTCCodecDescriptor;
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;

/// One RTP encoding (simulcast layer) and the codecs usable on it.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RTCEncoding {
    /// Empty when the m-section does not use rids.
    pub rid: String,
    pub codecs: Vec<RTCCodecDescriptor>,
}

/// A header extension binding agreed on for an m-section.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCExtmap {
    pub id: u16,
    pub uri: String,
    pub direction: RTCRtpTransceiverDirection,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCRtpRtcpConfig {
    pub extmap_allow_mixed: bool,
    pub rtcp_mux: bool,
    pub rtcp_rsize: bool,
}

/// What an offer/answer exchange settled for one track.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RTCNegotiatedDetails {
    pub encodings: Vec<RTCEncoding>,
    pub extmaps: Vec<RTCExtmap>,
    /// Remote `b=TIAS` in bits per second, zero when absent.
    pub tias: u64,
    pub rtp_rtcp_config: RTCRtpRtcpConfig,
}

impl RTCNegotiatedDetails {
    /// Codecs of the first encoding; all encodings share the same list.
    pub fn codecs(&self) -> &[RTCCodecDescriptor] {
        self.encodings
            .first()
            .map(|e| e.codecs.as_slice())
            .unwrap_or(&[])
    }

    pub fn codec_by_name(&self, name: &str) -> Option<&RTCCodecDescriptor> {
        self.codecs().iter().find(|c| c.is_named(name))
    }

    pub fn extmap_by_uri(&self, uri: &str) -> Option<&RTCExtmap> {
        self.extmaps.iter().find(|e| e.uri == uri)
    }

    pub fn extmap_by_id(&self, id: u16) -> Option<&RTCExtmap> {
        self.extmaps.iter().find(|e| e.id == id)
    }
}
