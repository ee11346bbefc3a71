use serde::{Deserialize, Serialize};

/// Options for [`RTCJsepSession::create_answer`](crate::session::RTCJsepSession::create_answer).
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub struct RTCAnswerOptions {}

/// Options for [`RTCJsepSession::create_offer`](crate::session::RTCJsepSession::create_offer).
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub struct RTCOfferOptions {
    /// Generate fresh ICE credentials for every transport in the offer.
    pub ice_restart: bool,

    /// Adds this many recvonly audio transceivers when no audio
    /// transceiver exists yet.
    pub offer_to_receive_audio: Option<usize>,

    /// Adds this many recvonly video transceivers when no video
    /// transceiver exists yet.
    pub offer_to_receive_video: Option<usize>,
}
