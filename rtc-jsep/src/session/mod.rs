//! The JSEP session: one side of an offer/answer negotiation.
//!
//! [`RTCJsepSession`] owns the ordered transceiver list, the transport
//! table, the four session descriptions (current and pending, local and
//! remote) and the signaling state machine. It is a sans-IO value: every
//! operation runs to completion synchronously and SDP text is the only
//! thing that crosses to the remote side.
//!
//! ```
//! use jsep::codec::RTCMediaKind;
//! use jsep::rtp_transceiver::RTCRtpTransceiverInit;
//! use jsep::session::RTCJsepSession;
//! use jsep::session::configuration::RTCConfigurationBuilder;
//! use jsep::session::configuration::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
//! use jsep::session::sdp::sdp_type::RTCSdpType;
//! use jsep::transport::dtls::RTCDtlsFingerprint;
//! use jsep::uuid::RandomUuidGenerator;
//!
//! # fn example() -> shared::error::Result<()> {
//! let fingerprint = RTCDtlsFingerprint::parse("sha-256 AB:CD:EF:01:23:45:67:89")?;
//! let config = || {
//!     RTCConfigurationBuilder::new()
//!         .with_dtls_fingerprints(vec![fingerprint.clone()])
//!         .build()
//! };
//!
//! let mut offerer = RTCJsepSession::new(config(), Box::new(RandomUuidGenerator))?;
//! let mut answerer = RTCJsepSession::new(config(), Box::new(RandomUuidGenerator))?;
//!
//! offerer.add_transceiver_from_kind(RTCMediaKind::Audio, RTCRtpTransceiverInit::default())?;
//!
//! let offer = offerer.create_offer(RTCOfferOptions::default())?;
//! offerer.set_local_description(RTCSdpType::Offer, &offer)?;
//! answerer.set_remote_description(RTCSdpType::Offer, &offer)?;
//!
//! let answer = answerer.create_answer(RTCAnswerOptions::default())?;
//! answerer.set_local_description(RTCSdpType::Answer, &answer)?;
//! offerer.set_remote_description(RTCSdpType::Answer, &answer)?;
//! # Ok(())
//! # }
//! ```

pub mod configuration;
pub mod sdp;
pub mod signaling_state;

mod answer;
mod description;
mod ice;
mod negotiation;
mod offer;
mod rollback;

pub use ice::RTCIceCandidateLocation;

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace};
use shared::error::{Error, Result};
use shared::util::random_session_id;

use crate::codec::{RTCCodecDescriptor, RTCMediaKind};
use crate::media_engine::{MediaEngine, MediaEngineHeaderExtension};
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::track::DEFAULT_STREAM_ID;
use crate::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use crate::session::sdp::session_description::RTCSessionDescription;
use crate::transport::RTCJsepTransport;
use crate::transport::ice::RTCIceParameters;
use crate::uuid::UuidGenerator;
use configuration::RTCConfiguration;
use signaling_state::RTCSignalingState;

/// Which of the two descriptions of a side to read.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCDescriptionSelector {
    Current,
    Pending,
    #[default]
    PendingOrCurrent,
}

/// What the session looked like the last time it was stable.
#[derive(Default, Debug, Clone)]
pub(crate) struct StableSnapshot {
    pub(crate) transceivers: Vec<RTCRtpTransceiver>,
    pub(crate) transports: BTreeMap<String, RTCJsepTransport>,
}

/// One side of a JSEP negotiation.
pub struct RTCJsepSession {
    pub(crate) configuration: RTCConfiguration,
    pub(crate) media_engine: MediaEngine,
    pub(crate) uuid_generator: Box<dyn UuidGenerator>,

    pub(crate) signaling_state: RTCSignalingState,
    pub(crate) is_offerer: bool,

    pub(crate) transceivers: Vec<RTCRtpTransceiver>,
    pub(crate) transports: BTreeMap<String, RTCJsepTransport>,

    pub(crate) current_local_description: Option<RTCSessionDescription>,
    pub(crate) pending_local_description: Option<RTCSessionDescription>,
    pub(crate) current_remote_description: Option<RTCSessionDescription>,
    pub(crate) pending_remote_description: Option<RTCSessionDescription>,
    pub(crate) last_offer: Option<String>,
    pub(crate) last_answer: Option<String>,

    /// Credentials of the last stable round.
    pub(crate) ice_credentials: RTCIceParameters,
    /// Credentials of an ICE restart that is not yet stable.
    pub(crate) pending_ice_credentials: Option<RTCIceParameters>,
    pub(crate) ice_restart_requested: bool,
    pub(crate) negotiation_needed: bool,

    pub(crate) session_id: u64,
    pub(crate) session_version: u64,
    pub(crate) cname: String,
    pub(crate) used_mids: HashSet<String>,
    pub(crate) mid_counter: usize,

    /// Extension ids ever agreed on, by uri. Never shrinks.
    pub(crate) extmaps_negotiated: HashMap<String, u16>,
    /// Every id ever put in a description, by the uri it carried.
    pub(crate) extmap_ids_used: HashMap<u16, String>,

    pub(crate) stable: StableSnapshot,
}

impl RTCJsepSession {
    /// Creates a session. Without a media engine in `configuration`, the
    /// default codecs and header extensions are registered.
    pub fn new(
        mut configuration: RTCConfiguration,
        uuid_generator: Box<dyn UuidGenerator>,
    ) -> Result<Self> {
        for fingerprint in &configuration.dtls_fingerprints {
            fingerprint.validate()?;
        }

        let media_engine = match configuration.media_engine.take() {
            Some(media_engine) => media_engine,
            None => {
                let mut media_engine = MediaEngine::default();
                media_engine.register_default_codecs()?;
                media_engine.register_default_header_extensions()?;
                media_engine
            }
        };

        let ice_credentials = configuration
            .ice_credentials
            .clone()
            .unwrap_or_else(RTCIceParameters::generate);

        let mut session = RTCJsepSession {
            configuration,
            media_engine,
            uuid_generator,
            signaling_state: RTCSignalingState::Stable,
            is_offerer: false,
            transceivers: vec![],
            transports: BTreeMap::new(),
            current_local_description: None,
            pending_local_description: None,
            current_remote_description: None,
            pending_remote_description: None,
            last_offer: None,
            last_answer: None,
            ice_credentials,
            pending_ice_credentials: None,
            ice_restart_requested: false,
            negotiation_needed: false,
            session_id: random_session_id(),
            session_version: 0,
            cname: String::new(),
            used_mids: HashSet::new(),
            mid_counter: 0,
            extmaps_negotiated: HashMap::new(),
            extmap_ids_used: HashMap::new(),
            stable: StableSnapshot::default(),
        };
        session.cname = session.uuid_generator.generate();

        Ok(session)
    }

    pub fn configuration(&self) -> &RTCConfiguration {
        &self.configuration
    }

    pub fn signaling_state(&self) -> RTCSignalingState {
        self.signaling_state
    }

    /// Whether this side made the offer of the current (or in-flight) round.
    pub fn is_offerer(&self) -> bool {
        self.is_offerer
    }

    pub fn cname(&self) -> &str {
        &self.cname
    }

    pub fn media_engine(&self) -> &MediaEngine {
        &self.media_engine
    }

    /// The session's codec list, used by every later offer and answer.
    pub fn codecs_mut(&mut self) -> &mut Vec<RTCCodecDescriptor> {
        self.media_engine.codecs_mut()
    }

    /// Changes the payload type `name` is offered with.
    pub fn set_payload_type(&mut self, name: &str, pt: &str) -> Result<()> {
        self.media_engine.set_payload_type(name, pt)
    }

    pub fn add_audio_rtp_extension(
        &mut self,
        uri: &str,
        direction: RTCRtpTransceiverDirection,
    ) -> Result<u16> {
        self.media_engine
            .register_header_extension(uri, RTCMediaKind::Audio, direction)
    }

    pub fn add_video_rtp_extension(
        &mut self,
        uri: &str,
        direction: RTCRtpTransceiverDirection,
    ) -> Result<u16> {
        self.media_engine
            .register_header_extension(uri, RTCMediaKind::Video, direction)
    }

    pub fn add_audio_video_rtp_extension(
        &mut self,
        uri: &str,
        direction: RTCRtpTransceiverDirection,
    ) -> Result<u16> {
        self.add_audio_rtp_extension(uri, direction)?;
        self.add_video_rtp_extension(uri, direction)
    }

    pub fn get_rtp_extensions(&self) -> &[MediaEngineHeaderExtension] {
        self.media_engine.header_extensions()
    }

    /// Adds `transceiver`, assigning its uuid, transport id and send track
    /// identity. Returns the uuid.
    pub fn add_transceiver(&mut self, mut transceiver: RTCRtpTransceiver) -> Result<String> {
        if transceiver.kind == RTCMediaKind::Unspecified {
            return Err(Error::ErrAddTrackInvalidKind(transceiver.kind.to_string()));
        }

        self.assign_identifiers(&mut transceiver);

        debug!(
            "added {} transceiver {} ({})",
            transceiver.kind, transceiver.uuid, transceiver.direction
        );
        let uuid = transceiver.uuid.clone();
        self.transceivers.push(transceiver);

        Ok(uuid)
    }

    pub(crate) fn assign_identifiers(&mut self, transceiver: &mut RTCRtpTransceiver) {
        transceiver.uuid = self.uuid_generator.generate();
        transceiver.transport_id = self.uuid_generator.generate();
        transceiver.owns_transport = true;

        if transceiver.kind != RTCMediaKind::Application {
            let send_track = &mut transceiver.send_track;
            send_track.cname = self.cname.clone();
            if send_track.track_id.is_empty() {
                send_track.track_id = self.uuid_generator.generate();
            }
            let layers = send_track.rids.len().max(1);
            send_track.ensure_ssrcs(layers);
        }
    }

    pub fn add_transceiver_from_kind(
        &mut self,
        kind: RTCMediaKind,
        init: RTCRtpTransceiverInit,
    ) -> Result<String> {
        self.add_transceiver(RTCRtpTransceiver::new(kind, init))
    }

    /// Replaces the application-controlled state of the transceiver with the
    /// same uuid by that of `transceiver`.
    pub fn set_transceiver(&mut self, transceiver: RTCRtpTransceiver) -> Result<()> {
        let existing = self
            .transceivers
            .iter_mut()
            .find(|t| t.uuid == transceiver.uuid)
            .ok_or_else(|| Error::ErrTransceiverNotFound(transceiver.uuid.clone()))?;

        if existing.kind != transceiver.kind {
            return Err(Error::ErrTransceiverKindChanged(transceiver.uuid));
        }
        if existing.removed {
            return Err(Error::ErrTransceiverRemoved(transceiver.uuid));
        }

        existing.merge_application_state(&transceiver);
        Ok(())
    }

    pub fn get_transceivers(&self) -> &[RTCRtpTransceiver] {
        &self.transceivers
    }

    pub fn get_transceiver(&self, uuid: &str) -> Option<&RTCRtpTransceiver> {
        self.transceivers.iter().find(|t| t.uuid == uuid)
    }

    /// Attaches a sending track, reusing a transceiver that never sent and
    /// has no track, or creating a new one. Returns the transceiver uuid.
    pub fn add_track(
        &mut self,
        kind: RTCMediaKind,
        stream_ids: Vec<String>,
        track_id: &str,
    ) -> Result<String> {
        if kind != RTCMediaKind::Audio && kind != RTCMediaKind::Video {
            return Err(Error::ErrAddTrackInvalidKind(kind.to_string()));
        }

        let stream_ids = if stream_ids.is_empty() {
            vec![DEFAULT_STREAM_ID.to_owned()]
        } else {
            stream_ids
        };

        let reusable = self.transceivers.iter_mut().find(|t| {
            t.kind == kind
                && !t.stopping
                && !t.stopped
                && !t.removed
                && t.send_track.is_null()
                && !t.current_direction.is_some_and(|d| d.has_send())
        });

        match reusable {
            Some(transceiver) => {
                transceiver.send_track.set_stream_ids(stream_ids);
                if !track_id.is_empty() {
                    transceiver.send_track.track_id = track_id.to_owned();
                }
                let direction = RTCRtpTransceiverDirection::from_send_recv(
                    true,
                    transceiver.direction.has_recv(),
                );
                transceiver.set_direction(direction);
                transceiver.only_exists_because_of_set_remote = false;
                transceiver.add_track_magic = true;
                trace!("add_track reuses transceiver {}", transceiver.uuid);
                Ok(transceiver.uuid.clone())
            }
            None => {
                let mut transceiver = RTCRtpTransceiver::new(
                    kind,
                    RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Sendrecv,
                        streams: stream_ids,
                        rids: vec![],
                    },
                );
                transceiver.send_track.track_id = track_id.to_owned();
                transceiver.add_track_magic = true;
                self.add_transceiver(transceiver)
            }
        }
    }

    /// Requests fresh ICE credentials in the next offer.
    pub fn restart_ice(&mut self) {
        self.ice_restart_requested = true;
    }

    pub fn transports(&self) -> &BTreeMap<String, RTCJsepTransport> {
        &self.transports
    }

    pub fn get_transport(&self, transport_id: &str) -> Option<&RTCJsepTransport> {
        self.transports.get(transport_id)
    }

    /// The local ICE credentials in effect for the next description.
    pub fn local_ice_credentials(&self) -> &RTCIceParameters {
        self.pending_ice_credentials
            .as_ref()
            .unwrap_or(&self.ice_credentials)
    }

    /// SDP text of the selected local description, empty when there is none.
    pub fn get_local_description(&self, selector: RTCDescriptionSelector) -> String {
        Self::select(
            &self.current_local_description,
            &self.pending_local_description,
            selector,
        )
    }

    /// SDP text of the selected remote description, empty when there is none.
    pub fn get_remote_description(&self, selector: RTCDescriptionSelector) -> String {
        Self::select(
            &self.current_remote_description,
            &self.pending_remote_description,
            selector,
        )
    }

    fn select(
        current: &Option<RTCSessionDescription>,
        pending: &Option<RTCSessionDescription>,
        selector: RTCDescriptionSelector,
    ) -> String {
        let desc = match selector {
            RTCDescriptionSelector::Current => current.as_ref(),
            RTCDescriptionSelector::Pending => pending.as_ref(),
            RTCDescriptionSelector::PendingOrCurrent => pending.as_ref().or(current.as_ref()),
        };
        desc.map(|d| d.sdp.clone()).unwrap_or_default()
    }

    pub(crate) fn local_description(&self) -> Option<&RTCSessionDescription> {
        self.pending_local_description
            .as_ref()
            .or(self.current_local_description.as_ref())
    }

    pub(crate) fn local_description_mut(&mut self) -> Option<&mut RTCSessionDescription> {
        self.pending_local_description
            .as_mut()
            .or(self.current_local_description.as_mut())
    }

    pub(crate) fn remote_description(&self) -> Option<&RTCSessionDescription> {
        self.pending_remote_description
            .as_ref()
            .or(self.current_remote_description.as_ref())
    }

    pub(crate) fn remote_description_mut(&mut self) -> Option<&mut RTCSessionDescription> {
        self.pending_remote_description
            .as_mut()
            .or(self.current_remote_description.as_mut())
    }

    /// A mid not used by any description of this session so far.
    pub(crate) fn new_mid(&mut self) -> String {
        loop {
            let mid = self.mid_counter.to_string();
            self.mid_counter += 1;
            if !self.used_mids.contains(&mid)
                && !self.transceivers.iter().any(|t| t.mid.as_deref() == Some(&mid))
            {
                return mid;
            }
        }
    }

    pub(crate) fn transceiver_at_level(&self, level: usize) -> Option<usize> {
        self.transceivers
            .iter()
            .position(|t| t.level == Some(level))
    }

    pub(crate) fn take_snapshot(&mut self) {
        self.stable = StableSnapshot {
            transceivers: self.transceivers.clone(),
            transports: self.transports.clone(),
        };
    }
}
