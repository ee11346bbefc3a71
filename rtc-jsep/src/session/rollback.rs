use log::{debug, info};
use shared::error::Result;

use super::RTCJsepSession;
use super::sdp::sdp_type::RTCSdpType;
use super::signaling_state::{RTCSignalingState, StateChangeOp, next_signaling_state};

impl RTCJsepSession {
    /// Discards the in-flight offer (or pranswer round) and returns to the
    /// last stable state.
    ///
    /// Transceivers created since then are dropped when only a remote offer
    /// brought them into existence; the others lose their association but
    /// stay in the list.
    pub(crate) fn rollback(&mut self, op: StateChangeOp) -> Result<()> {
        let next_state = next_signaling_state(self.signaling_state, op, RTCSdpType::Rollback)?;

        let stable_count = self.stable.transceivers.len();
        for (t, stable) in self
            .transceivers
            .iter_mut()
            .zip(self.stable.transceivers.iter())
        {
            t.level = stable.level;
            t.mid = stable.mid.clone();
            t.associated = stable.associated;
            t.bundle_level = stable.bundle_level;
            t.negotiated = stable.negotiated;
            t.current_direction = stable.current_direction;
            t.transport_id = stable.transport_id.clone();
            t.owns_transport = stable.owns_transport;
            t.can_recycle = stable.can_recycle;
            t.recv_track = stable.recv_track.clone();
            t.send_track.negotiated = stable.send_track.negotiated.clone();
            t.send_track.active = stable.send_track.active;
            if t.stopping && t.level.is_none() {
                t.stopped = true;
            }
        }

        let before = self.transceivers.len();
        let mut index = 0;
        self.transceivers.retain(|t| {
            index += 1;
            index <= stable_count || !t.only_exists_because_of_set_remote
        });
        let dropped = before - self.transceivers.len();

        for t in self.transceivers.iter_mut().skip(stable_count) {
            t.disassociate();
            if !t.owns_transport {
                t.transport_id = self.uuid_generator.generate();
                t.owns_transport = true;
            }
        }

        self.transports = self.stable.transports.clone();
        self.pending_ice_credentials = None;
        self.pending_local_description = None;
        self.pending_remote_description = None;
        if dropped > 0 {
            debug!("rollback dropped {dropped} transceivers created by a remote offer");
        }

        info!("{op} rollback: {} -> {}", self.signaling_state, next_state);
        self.signaling_state = RTCSignalingState::Stable;
        self.check_negotiation_needed();
        Ok(())
    }
}
