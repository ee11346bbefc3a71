use std::collections::HashSet;

use log::{trace, warn};

use super::RTCJsepSession;
use super::description::parse_description;
use super::sdp::ParsedSdp;
use super::signaling_state::RTCSignalingState;
use crate::codec::RTCMediaKind;
use crate::rtp_transceiver::RTCRtpTransceiver;

impl RTCJsepSession {
    /// Whether the transceivers changed in a way only a new offer/answer
    /// exchange can apply. Never true outside the stable state.
    pub fn check_negotiation_needed(&mut self) -> bool {
        let needed = self.negotiation_needed_reason().inspect(|reason| {
            trace!("negotiation needed: {reason}");
        });
        self.negotiation_needed = needed.is_some();
        self.negotiation_needed
    }

    /// The value computed by the last [`check_negotiation_needed`](Self::check_negotiation_needed).
    pub fn is_negotiation_needed(&self) -> bool {
        self.negotiation_needed
    }

    fn negotiation_needed_reason(&self) -> Option<String> {
        if self.signaling_state != RTCSignalingState::Stable {
            return None;
        }
        if self.ice_restart_requested {
            return Some("ICE restart requested".to_owned());
        }

        let (local, remote) = match (
            parse_description(self.current_local_description.as_ref()),
            parse_description(self.current_remote_description.as_ref()),
        ) {
            (Ok(local), Ok(remote)) => (local, remote),
            (Err(err), _) | (_, Err(err)) => {
                warn!("current descriptions do not parse: {err}");
                return Some("unreadable descriptions".to_owned());
            }
        };

        self.transceivers
            .iter()
            .find_map(|t| self.transceiver_needs_negotiation(t, local.as_ref(), remote.as_ref()))
    }

    fn transceiver_needs_negotiation(
        &self,
        t: &RTCRtpTransceiver,
        local: Option<&ParsedSdp>,
        remote: Option<&ParsedSdp>,
    ) -> Option<String> {
        let local_section = t
            .level
            .and_then(|level| local.and_then(|l| l.sections.get(level)));

        if t.stopped {
            let remote_section = t
                .level
                .and_then(|level| remote.and_then(|r| r.sections.get(level)));
            let rejected = local_section.is_none_or(|s| s.is_disabled())
                || remote_section.is_some_and(|s| s.is_disabled());
            return (!rejected).then(|| format!("transceiver {} stopped", t.uuid));
        }
        if t.stopping {
            return Some(format!("transceiver {} stopping", t.uuid));
        }
        if t.removed {
            return None;
        }

        let Some(local_section) = local_section.filter(|_| t.associated) else {
            return Some(format!("transceiver {} has no m-section", t.uuid));
        };
        if local_section.is_disabled() {
            return None;
        }
        if t.kind == RTCMediaKind::Application {
            return None;
        }

        if local_section.direction.has_send() {
            let signalled: HashSet<&str> =
                local_section.msids.iter().map(|(s, _)| s.as_str()).collect();
            let current: HashSet<&str> =
                t.send_track.stream_ids.iter().map(String::as_str).collect();
            if signalled != current {
                return Some(format!("transceiver {} changed its streams", t.uuid));
            }
        }

        let expected = if self.is_offerer {
            self.offered_direction(t)
        } else {
            let remote_direction = t
                .level
                .and_then(|level| remote.and_then(|r| r.sections.get(level)))
                .map(|s| s.direction)?;
            self.offered_direction(t)
                .intersect(remote_direction.reverse())
        };
        if local_section.direction != expected {
            return Some(format!(
                "transceiver {} direction {} was negotiated as {}",
                t.uuid, expected, local_section.direction
            ));
        }

        None
    }
}
