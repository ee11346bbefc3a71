use serde::{Deserialize, Serialize};
use shared::util::random_ssrc;

use crate::codec::RTCMediaKind;
use crate::rtp_transceiver::negotiated_details::RTCNegotiatedDetails;

/// Stream id used by `add_track` when the application gives none.
pub const DEFAULT_STREAM_ID: &str = "-";

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCRtpTrackDirection {
    #[default]
    Send,
    Recv,
}

/// One direction of media flow of a transceiver.
///
/// A track is *null* while it has no stream ids; a null send track is never
/// signalled with `a=msid` and does not allow sending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RTCRtpTrack {
    pub kind: RTCMediaKind,
    pub direction: RTCRtpTrackDirection,
    pub stream_ids: Vec<String>,
    pub track_id: String,
    pub cname: String,
    pub ssrcs: Vec<u32>,
    /// Retransmission SSRCs, one per entry of `ssrcs` when RTX is negotiated.
    pub rtx_ssrcs: Vec<u32>,
    /// Simulcast rids sent (send track) or received (recv track).
    pub rids: Vec<String>,
    pub active: bool,
    /// Present once an offer/answer exchange covered this track.
    pub negotiated: Option<RTCNegotiatedDetails>,
}

impl RTCRtpTrack {
    pub fn new(kind: RTCMediaKind, direction: RTCRtpTrackDirection) -> Self {
        RTCRtpTrack {
            kind,
            direction,
            stream_ids: vec![],
            track_id: String::new(),
            cname: String::new(),
            ssrcs: vec![],
            rtx_ssrcs: vec![],
            rids: vec![],
            active: false,
            negotiated: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.stream_ids.is_empty()
    }

    pub fn set_stream_ids(&mut self, stream_ids: Vec<String>) {
        self.stream_ids = stream_ids;
    }

    pub fn clear_stream_ids(&mut self) {
        self.stream_ids.clear();
    }

    /// Sets the simulcast layers and makes sure every layer has an SSRC.
    pub fn set_rids(&mut self, rids: Vec<String>) {
        self.rids = rids;
        self.ensure_ssrcs(self.rids.len().max(1));
    }

    pub(crate) fn ensure_ssrcs(&mut self, count: usize) {
        while self.ssrcs.len() < count {
            self.ssrcs.push(random_ssrc());
        }
        self.ssrcs.truncate(count);
        if self.kind == RTCMediaKind::Video {
            while self.rtx_ssrcs.len() < count {
                self.rtx_ssrcs.push(random_ssrc());
            }
            self.rtx_ssrcs.truncate(count);
        }
    }

    /// Forgets everything a negotiation taught this track.
    pub(crate) fn reset_negotiation(&mut self) {
        self.negotiated = None;
        self.active = false;
        if self.direction == RTCRtpTrackDirection::Recv {
            self.stream_ids.clear();
            self.track_id.clear();
            self.ssrcs.clear();
            self.rtx_ssrcs.clear();
            self.rids.clear();
            self.cname.clear();
        }
    }
}
