use std::fmt;

use shared::error::{Error, Result};

use crate::session::configuration::UNSPECIFIED_STR;
use crate::session::sdp::sdp_type::RTCSdpType;

#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub(crate) enum StateChangeOp {
    #[default]
    SetLocal,
    SetRemote,
}

impl fmt::Display for StateChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StateChangeOp::SetLocal => write!(f, "SetLocal"),
            StateChangeOp::SetRemote => write!(f, "SetRemote"),
        }
    }
}

/// Signaling state of a session (RFC 8829 §3.2 and W3C `RTCSignalingState`).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCSignalingState {
    Unspecified = 0,

    /// No offer/answer exchange is in progress.
    #[default]
    Stable,

    /// A local offer has been applied.
    HaveLocalOffer,

    /// A remote offer has been applied.
    HaveRemoteOffer,

    /// A remote offer and a local provisional answer have been applied.
    HaveLocalPranswer,

    /// A local offer and a remote provisional answer have been applied.
    HaveRemotePranswer,
}

const SIGNALING_STATE_STABLE_STR: &str = "stable";
const SIGNALING_STATE_HAVE_LOCAL_OFFER_STR: &str = "have-local-offer";
const SIGNALING_STATE_HAVE_REMOTE_OFFER_STR: &str = "have-remote-offer";
const SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR: &str = "have-local-pranswer";
const SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR: &str = "have-remote-pranswer";

impl From<&str> for RTCSignalingState {
    fn from(raw: &str) -> Self {
        match raw {
            SIGNALING_STATE_STABLE_STR => RTCSignalingState::Stable,
            SIGNALING_STATE_HAVE_LOCAL_OFFER_STR => RTCSignalingState::HaveLocalOffer,
            SIGNALING_STATE_HAVE_REMOTE_OFFER_STR => RTCSignalingState::HaveRemoteOffer,
            SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR => RTCSignalingState::HaveLocalPranswer,
            SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR => RTCSignalingState::HaveRemotePranswer,
            _ => RTCSignalingState::Unspecified,
        }
    }
}

impl fmt::Display for RTCSignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCSignalingState::Stable => SIGNALING_STATE_STABLE_STR,
            RTCSignalingState::HaveLocalOffer => SIGNALING_STATE_HAVE_LOCAL_OFFER_STR,
            RTCSignalingState::HaveRemoteOffer => SIGNALING_STATE_HAVE_REMOTE_OFFER_STR,
            RTCSignalingState::HaveLocalPranswer => SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR,
            RTCSignalingState::HaveRemotePranswer => SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR,
            RTCSignalingState::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// Computes the state reached by applying a description of `sdp_type`
/// through `op` while in `cur`.
pub(crate) fn next_signaling_state(
    cur: RTCSignalingState,
    op: StateChangeOp,
    sdp_type: RTCSdpType,
) -> Result<RTCSignalingState> {
    use RTCSignalingState::*;

    if sdp_type == RTCSdpType::Rollback && cur == Stable {
        return Err(Error::ErrSignalingStateCannotRollback);
    }

    let next = match (cur, op, sdp_type) {
        // stable->SetLocal(offer)->have-local-offer
        (Stable, StateChangeOp::SetLocal, RTCSdpType::Offer) => Some(HaveLocalOffer),
        // stable->SetRemote(offer)->have-remote-offer
        (Stable, StateChangeOp::SetRemote, RTCSdpType::Offer) => Some(HaveRemoteOffer),

        // have-local-offer->SetLocal(offer)->have-local-offer
        (HaveLocalOffer, StateChangeOp::SetLocal, RTCSdpType::Offer) => Some(HaveLocalOffer),
        (HaveLocalOffer, StateChangeOp::SetRemote, RTCSdpType::Answer) => Some(Stable),
        (HaveLocalOffer, StateChangeOp::SetRemote, RTCSdpType::Pranswer) => {
            Some(HaveRemotePranswer)
        }
        (HaveLocalOffer, StateChangeOp::SetLocal, RTCSdpType::Rollback) => Some(Stable),

        (HaveRemotePranswer, StateChangeOp::SetRemote, RTCSdpType::Answer) => Some(Stable),
        (HaveRemotePranswer, StateChangeOp::SetRemote, RTCSdpType::Pranswer) => {
            Some(HaveRemotePranswer)
        }
        (HaveRemotePranswer, StateChangeOp::SetLocal, RTCSdpType::Rollback) => Some(Stable),

        (HaveRemoteOffer, StateChangeOp::SetLocal, RTCSdpType::Answer) => Some(Stable),
        (HaveRemoteOffer, StateChangeOp::SetLocal, RTCSdpType::Pranswer) => {
            Some(HaveLocalPranswer)
        }
        (HaveRemoteOffer, StateChangeOp::SetRemote, RTCSdpType::Rollback) => Some(Stable),

        (HaveLocalPranswer, StateChangeOp::SetLocal, RTCSdpType::Answer) => Some(Stable),
        (HaveLocalPranswer, StateChangeOp::SetLocal, RTCSdpType::Pranswer) => {
            Some(HaveLocalPranswer)
        }
        (HaveLocalPranswer, StateChangeOp::SetRemote, RTCSdpType::Rollback) => Some(Stable),

        _ => None,
    };

    next.ok_or_else(|| {
        Error::ErrSignalingStateProposedTransitionInvalid(format!(
            "from {cur} applying {op}({sdp_type})"
        ))
    })
}
