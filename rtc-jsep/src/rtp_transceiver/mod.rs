//! Transceivers: the unit the application negotiates.
//!
//! A [`RTCRtpTransceiver`] pairs a send and a receive [`RTCRtpTrack`] and,
//! once negotiated, binds them to one m-section (level and mid) and one
//! transport. The application edits transceivers by value: it takes a copy
//! from [`RTCJsepSession::get_transceivers`](crate::session::RTCJsepSession::get_transceivers),
//! changes what it is allowed to change and hands the copy back through
//! [`RTCJsepSession::set_transceiver`](crate::session::RTCJsepSession::set_transceiver).

pub mod direction;
pub mod negotiated_details;
pub mod track;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::codec::RTCMediaKind;
use direction::RTCRtpTransceiverDirection;
use track::{RTCRtpTrack, RTCRtpTrackDirection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCRtpTransceiverInit {
    pub direction: RTCRtpTransceiverDirection,
    /// Stream ids of the send track. Empty leaves the send track null.
    pub streams: Vec<String>,
    /// Simulcast rids to send.
    pub rids: Vec<String>,
}

impl Default for RTCRtpTransceiverInit {
    fn default() -> Self {
        RTCRtpTransceiverInit {
            direction: RTCRtpTransceiverDirection::Sendrecv,
            streams: vec![],
            rids: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RTCRtpTransceiver {
    pub(crate) uuid: String,
    pub(crate) kind: RTCMediaKind,
    pub(crate) direction: RTCRtpTransceiverDirection,
    pub(crate) send_track: RTCRtpTrack,
    pub(crate) recv_track: RTCRtpTrack,

    pub(crate) transport_id: String,
    pub(crate) owns_transport: bool,

    pub(crate) level: Option<usize>,
    pub(crate) mid: Option<String>,
    /// Set once the mid has been applied by a local or remote description.
    pub(crate) associated: bool,
    pub(crate) bundle_level: Option<usize>,
    /// Set once an offer/answer exchange covering this transceiver completed.
    pub(crate) negotiated: bool,
    pub(crate) current_direction: Option<RTCRtpTransceiverDirection>,
    /// Receive bitrate limit advertised as `b=TIAS`, zero for none.
    pub(crate) max_recv_bitrate: u64,

    pub(crate) stopping: bool,
    pub(crate) stopped: bool,
    pub(crate) removed: bool,
    /// The level was negotiated disabled and may be given to a new transceiver.
    pub(crate) can_recycle: bool,

    pub(crate) add_track_magic: bool,
    pub(crate) only_exists_because_of_set_remote: bool,
}

impl RTCRtpTransceiver {
    /// Creates a transceiver to be handed to
    /// [`RTCJsepSession::add_transceiver`](crate::session::RTCJsepSession::add_transceiver),
    /// which assigns its identifiers.
    pub fn new(kind: RTCMediaKind, init: RTCRtpTransceiverInit) -> Self {
        let direction = if kind == RTCMediaKind::Application {
            RTCRtpTransceiverDirection::Sendrecv
        } else {
            init.direction
        };

        let mut send_track = RTCRtpTrack::new(kind, RTCRtpTrackDirection::Send);
        send_track.stream_ids = init.streams;
        send_track.rids = init.rids;

        RTCRtpTransceiver {
            uuid: String::new(),
            kind,
            direction,
            send_track,
            recv_track: RTCRtpTrack::new(kind, RTCRtpTrackDirection::Recv),
            transport_id: String::new(),
            owns_transport: true,
            level: None,
            mid: None,
            associated: false,
            bundle_level: None,
            negotiated: false,
            current_direction: None,
            max_recv_bitrate: 0,
            stopping: false,
            stopped: false,
            removed: false,
            can_recycle: false,
            add_track_magic: false,
            only_exists_because_of_set_remote: false,
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn kind(&self) -> RTCMediaKind {
        self.kind
    }

    /// The direction requested by the application.
    pub fn direction(&self) -> RTCRtpTransceiverDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: RTCRtpTransceiverDirection) {
        if self.direction != direction {
            trace!(
                "transceiver {} direction {} -> {}",
                self.uuid, self.direction, direction
            );
        }
        self.direction = direction;
    }

    /// The direction most recently negotiated, from this side's point of view.
    pub fn current_direction(&self) -> Option<RTCRtpTransceiverDirection> {
        self.current_direction
    }

    pub fn max_recv_bitrate(&self) -> u64 {
        self.max_recv_bitrate
    }

    /// Limits what the remote side sends on this transceiver, in bits per
    /// second. Takes effect with the next offer or answer.
    pub fn set_max_recv_bitrate(&mut self, bitrate: u64) {
        self.max_recv_bitrate = bitrate;
    }

    pub fn send_track(&self) -> &RTCRtpTrack {
        &self.send_track
    }

    pub fn send_track_mut(&mut self) -> &mut RTCRtpTrack {
        &mut self.send_track
    }

    pub fn recv_track(&self) -> &RTCRtpTrack {
        &self.recv_track
    }

    pub fn transport_id(&self) -> &str {
        &self.transport_id
    }

    pub fn level(&self) -> Option<usize> {
        self.level
    }

    pub fn has_level(&self) -> bool {
        self.level.is_some()
    }

    pub fn mid(&self) -> Option<&str> {
        self.mid.as_deref()
    }

    pub fn is_associated(&self) -> bool {
        self.associated
    }

    pub fn bundle_level(&self) -> Option<usize> {
        self.bundle_level
    }

    pub fn has_bundle_level(&self) -> bool {
        self.bundle_level.is_some()
    }

    pub fn is_negotiated(&self) -> bool {
        self.negotiated
    }

    /// Marks the transceiver for stopping. The m-section is disabled by the
    /// next offer this side makes; a transceiver that never got a level stops
    /// at once.
    pub fn stop(&mut self) {
        self.stopping = true;
        if self.level.is_none() {
            self.stopped = true;
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn set_removed(&mut self) {
        self.removed = true;
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn can_recycle(&self) -> bool {
        self.can_recycle
    }

    pub fn has_add_track_magic(&self) -> bool {
        self.add_track_magic
    }

    pub fn set_add_track_magic(&mut self) {
        self.add_track_magic = true;
    }

    pub fn only_exists_because_of_set_remote(&self) -> bool {
        self.only_exists_because_of_set_remote
    }

    pub fn set_only_exists_because_of_set_remote(&mut self, only: bool) {
        self.only_exists_because_of_set_remote = only;
    }

    /// Drops the level and mid assignment without touching the tracks.
    pub(crate) fn clear_level(&mut self) {
        self.level = None;
        self.bundle_level = None;
        self.mid = None;
        self.associated = false;
    }

    /// Returns the transceiver to the shape it had before any negotiation.
    pub(crate) fn disassociate(&mut self) {
        self.clear_level();
        self.negotiated = false;
        self.current_direction = None;
        self.recv_track.reset_negotiation();
        self.send_track.negotiated = None;
        self.send_track.active = false;
    }

    /// Copies the fields the application may change from `other`.
    pub(crate) fn merge_application_state(&mut self, other: &RTCRtpTransceiver) {
        self.direction = other.direction;
        self.max_recv_bitrate = other.max_recv_bitrate;
        if other.stopping && !self.stopping {
            self.stop();
        }
        if other.removed {
            self.removed = true;
        }
        if other.add_track_magic {
            self.add_track_magic = true;
        }
        if !other.only_exists_because_of_set_remote {
            self.only_exists_because_of_set_remote = false;
        }
        self.send_track.stream_ids = other.send_track.stream_ids.clone();
        if !other.send_track.track_id.is_empty() {
            self.send_track.track_id = other.send_track.track_id.clone();
        }
        if self.send_track.rids != other.send_track.rids {
            self.send_track.set_rids(other.send_track.rids.clone());
        }
    }
}
