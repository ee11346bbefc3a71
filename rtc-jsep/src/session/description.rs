use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info, trace};
use sdp::util::ConnectionRole;
use shared::error::{Error, Result};

use super::RTCJsepSession;
use super::sdp::sdp_type::RTCSdpType;
use super::sdp::session_description::RTCSessionDescription;
use super::sdp::{MediaSection, ParsedSdp};
use super::signaling_state::{RTCSignalingState, StateChangeOp, next_signaling_state};
use crate::codec::{RTCCodecDescriptor, RTCMediaKind, SdpFormat};
use crate::media_engine::VALID_EXT_IDS;
use crate::rtp_transceiver::RTCRtpTransceiver;
use crate::rtp_transceiver::RTCRtpTransceiverInit;
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::negotiated_details::{
    RTCEncoding, RTCNegotiatedDetails, RTCRtpRtcpConfig,
};
use crate::rtp_transceiver::track::RTCRtpTrack;
use crate::transport::RTCJsepTransport;
use crate::transport::dtls::{RTCDtlsFingerprint, RTCDtlsRole};
use crate::transport::ice::RTCIceParameters;

/// The typed view of `desc`, if there is one.
pub(crate) fn parse_description(desc: Option<&RTCSessionDescription>) -> Result<Option<ParsedSdp>> {
    desc.map(|d| d.parsed().and_then(|p| ParsedSdp::parse(&p)))
        .transpose()
}

/// Whether `section` carries ICE credentials different from those the
/// same mid used in `previous`. Changing only one of ufrag and pwd is an error.
fn ice_restarted(previous: Option<&ParsedSdp>, section: &MediaSection) -> Result<bool> {
    let Some(ice) = section.ice() else {
        return Ok(false);
    };
    let Some(old) = previous
        .and_then(|p| p.section_by_mid(section.mid()))
        .and_then(|s| s.ice())
    else {
        return Ok(false);
    };

    let ufrag_changed = ice.username_fragment != old.username_fragment;
    let pwd_changed = ice.password != old.password;
    match (ufrag_changed, pwd_changed) {
        (true, false) => Err(Error::ErrIceRestartPwdUnchanged(section.level)),
        (false, true) => Err(Error::ErrIceRestartUfragUnchanged(section.level)),
        (changed, _) => Ok(changed),
    }
}

/// Copies the identity the remote announces for what it sends into `track`.
pub(crate) fn apply_remote_track_identity(track: &mut RTCRtpTrack, section: &MediaSection) {
    if section.is_disabled() || !section.direction.has_send() {
        track.stream_ids.clear();
        track.track_id.clear();
        track.ssrcs.clear();
        track.rtx_ssrcs.clear();
        track.rids.clear();
        return;
    }

    track.stream_ids = section.msids.iter().map(|(s, _)| s.clone()).collect();
    track.track_id = section
        .msids
        .first()
        .map(|(_, t)| t.clone())
        .unwrap_or_default();

    let rtx: HashSet<u32> = section.fid_groups.iter().map(|(_, r)| *r).collect();
    track.ssrcs = section
        .ssrcs
        .iter()
        .filter(|s| !rtx.contains(s))
        .copied()
        .collect();
    track.rtx_ssrcs = section.fid_groups.iter().map(|(_, r)| *r).collect();
    track.cname = section.cname.clone();
    track.rids = section.send_rids();
}

/// The format of `section` describing the same codec as `format`, trying
/// the same payload type first.
fn find_format<'a>(section: &'a MediaSection, format: &SdpFormat) -> Option<&'a SdpFormat> {
    section
        .format(&format.pt)
        .filter(|f| f.same_codec(format))
        .or_else(|| section.primary_formats().find(|f| f.same_codec(format)))
}

fn encodings(rids: Vec<String>, codecs: Vec<RTCCodecDescriptor>) -> Vec<RTCEncoding> {
    if rids.is_empty() {
        return vec![RTCEncoding {
            rid: String::new(),
            codecs,
        }];
    }
    rids.into_iter()
        .map(|rid| RTCEncoding {
            rid,
            codecs: codecs.clone(),
        })
        .collect()
}

/// Tags of the BUNDLE groups of `desc`, by the level of every member.
fn bundle_tags(desc: &ParsedSdp) -> HashMap<usize, usize> {
    let mut tags = HashMap::new();
    for group in &desc.bundle_groups {
        let Some(tag) = group.first().and_then(|m| desc.section_by_mid(m)) else {
            continue;
        };
        if tag.is_disabled() {
            continue;
        }
        for mid in group {
            if let Some(section) = desc.section_by_mid(mid)
                && !section.is_disabled()
            {
                tags.insert(section.level, tag.level);
            }
        }
    }
    tags
}

impl RTCJsepSession {
    /// Applies a description this session generated.
    ///
    /// `sdp` must be empty (meaning the last generated one) or exactly the
    /// text last returned by [`create_offer`](Self::create_offer) or
    /// [`create_answer`](Self::create_answer).
    pub fn set_local_description(&mut self, sdp_type: RTCSdpType, sdp: &str) -> Result<()> {
        if sdp_type == RTCSdpType::Rollback {
            return self.rollback(StateChangeOp::SetLocal);
        }

        let next_state =
            next_signaling_state(self.signaling_state, StateChangeOp::SetLocal, sdp_type)?;

        let (generated, mismatch) = if sdp_type == RTCSdpType::Offer {
            (&self.last_offer, Error::ErrSDPDoesNotMatchOffer)
        } else {
            (&self.last_answer, Error::ErrSDPDoesNotMatchAnswer)
        };
        let Some(generated) = generated else {
            return Err(Error::ErrNoLocalDescriptionCreated);
        };
        if !sdp.is_empty() && sdp != generated {
            return Err(mismatch);
        }
        let sdp = generated.clone();

        let desc = match sdp_type {
            RTCSdpType::Offer => RTCSessionDescription::offer(sdp)?,
            RTCSdpType::Pranswer => RTCSessionDescription::pranswer(sdp)?,
            RTCSdpType::Answer => RTCSessionDescription::answer(sdp)?,
            _ => return Err(Error::ErrPeerConnSDPTypeInvalidValue(sdp_type.to_string())),
        };
        let parsed = ParsedSdp::parse(&desc.parsed()?)?;

        if sdp_type == RTCSdpType::Offer {
            self.apply_local_offer(desc, &parsed);
        } else {
            self.apply_local_answer(desc, &parsed, sdp_type)?;
        }

        self.set_signaling_state(next_state);
        Ok(())
    }

    /// Applies a description received from the remote side.
    pub fn set_remote_description(&mut self, sdp_type: RTCSdpType, sdp: &str) -> Result<()> {
        if sdp_type == RTCSdpType::Rollback {
            return self.rollback(StateChangeOp::SetRemote);
        }

        let next_state =
            next_signaling_state(self.signaling_state, StateChangeOp::SetRemote, sdp_type)?;

        let desc = match sdp_type {
            RTCSdpType::Offer => RTCSessionDescription::offer(sdp.to_owned())?,
            RTCSdpType::Pranswer => RTCSessionDescription::pranswer(sdp.to_owned())?,
            RTCSdpType::Answer => RTCSessionDescription::answer(sdp.to_owned())?,
            _ => return Err(Error::ErrPeerConnSDPTypeInvalidValue(sdp_type.to_string())),
        };
        let parsed = ParsedSdp::parse(&desc.parsed()?)?;
        self.validate_remote_description(&parsed, sdp_type)?;

        if sdp_type == RTCSdpType::Offer {
            self.apply_remote_offer(desc, &parsed)?;
        } else {
            self.apply_remote_answer(desc, &parsed, sdp_type)?;
        }

        self.set_signaling_state(next_state);
        Ok(())
    }

    pub(crate) fn set_signaling_state(&mut self, next_state: RTCSignalingState) {
        if self.signaling_state != next_state {
            info!(
                "signaling state changed: {} -> {}",
                self.signaling_state, next_state
            );
        }
        self.signaling_state = next_state;
        if next_state == RTCSignalingState::Stable {
            self.check_negotiation_needed();
        }
    }

    fn apply_local_offer(&mut self, desc: RTCSessionDescription, offer: &ParsedSdp) {
        let local_ice = self.local_ice_credentials().clone();
        let tags = bundle_tags(offer);
        let tag_transports: HashMap<usize, String> = self
            .transceivers
            .iter()
            .filter_map(|t| Some((t.level?, t.transport_id.clone())))
            .collect();

        for t in self.transceivers.iter_mut() {
            let Some(level) = t.level else {
                continue;
            };
            let Some(section) = offer.sections.get(level) else {
                continue;
            };
            self.used_mids.insert(section.mid().to_owned());
            if section.is_disabled() {
                continue;
            }
            t.associated = true;

            if section.bundle_only
                && let Some(tag) = tags.get(&level).filter(|tag| **tag != level)
                && let Some(transport_id) = tag_transports.get(tag)
            {
                trace!("level {level} provisionally bundled on level {tag}");
                t.transport_id = transport_id.clone();
                t.owns_transport = false;
                t.bundle_level = Some(*tag);
                continue;
            }

            if t.owns_transport {
                let transport = self
                    .transports
                    .entry(t.transport_id.clone())
                    .or_insert_with(|| {
                        RTCJsepTransport::new(&t.transport_id, level, local_ice.clone())
                    });
                transport.level = level;
                transport.restart_local(local_ice.clone());
            }
        }

        self.pending_local_description = Some(desc);
        self.is_offerer = true;
    }

    fn apply_local_answer(
        &mut self,
        desc: RTCSessionDescription,
        answer: &ParsedSdp,
        sdp_type: RTCSdpType,
    ) -> Result<()> {
        let offer = parse_description(self.pending_remote_description.as_ref())?
            .ok_or(Error::ErrNoRemoteDescription("apply a local answer"))?;

        self.finalize(&offer, answer, sdp_type == RTCSdpType::Pranswer)?;
        for section in &answer.sections {
            self.used_mids.insert(section.mid().to_owned());
        }

        if sdp_type == RTCSdpType::Answer {
            self.current_local_description = Some(desc);
            self.pending_local_description = None;
            self.current_remote_description = self.pending_remote_description.take();
            self.complete_negotiation();
        } else {
            self.pending_local_description = Some(desc);
        }
        Ok(())
    }

    fn apply_remote_answer(
        &mut self,
        desc: RTCSessionDescription,
        answer: &ParsedSdp,
        sdp_type: RTCSdpType,
    ) -> Result<()> {
        let offer = parse_description(self.pending_local_description.as_ref())?
            .ok_or(Error::ErrNoLocalDescription("apply a remote answer"))?;

        self.finalize(&offer, answer, sdp_type == RTCSdpType::Pranswer)?;

        if sdp_type == RTCSdpType::Answer {
            self.current_remote_description = Some(desc);
            self.pending_remote_description = None;
            self.current_local_description = self.pending_local_description.take();
            self.complete_negotiation();
        } else {
            self.pending_remote_description = Some(desc);
        }
        Ok(())
    }

    /// Commits the ICE credentials of the round and remembers the stable shape.
    fn complete_negotiation(&mut self) {
        if let Some(credentials) = self.pending_ice_credentials.take() {
            debug!("ICE restart completed, ufrag {}", credentials.username_fragment);
            self.ice_credentials = credentials;
        }
        if self.is_offerer {
            self.ice_restart_requested = false;
        }
        self.take_snapshot();
    }

    fn validate_remote_description(&self, remote: &ParsedSdp, sdp_type: RTCSdpType) -> Result<()> {
        let is_offer = sdp_type == RTCSdpType::Offer;

        let mut mids = HashSet::new();
        for section in &remote.sections {
            let Some(mid) = section.mid.as_deref() else {
                return Err(Error::ErrMissingMid(section.level));
            };
            if !mids.insert(mid) {
                return Err(Error::ErrDuplicateMid(mid.to_owned()));
            }
        }

        self.validate_extmaps(remote)?;

        if is_offer {
            let previous = [
                parse_description(self.current_local_description.as_ref())?,
                parse_description(self.current_remote_description.as_ref())?,
            ]
            .iter()
            .flatten()
            .map(|p| p.sections.len())
            .max()
            .unwrap_or(0);
            if remote.sections.len() < previous {
                return Err(Error::ErrMsectionRemoved(remote.sections.len(), previous));
            }
        } else {
            let offer = parse_description(self.pending_local_description.as_ref())?
                .ok_or(Error::ErrNoLocalDescription("apply a remote answer"))?;
            if remote.sections.len() != offer.sections.len() {
                return Err(Error::ErrAnswerMsectionCountMismatch(
                    remote.sections.len(),
                    offer.sections.len(),
                ));
            }
            for (answered, offered) in remote.sections.iter().zip(&offer.sections) {
                if answered.mid != offered.mid {
                    return Err(Error::ErrSDPDoesNotMatchMsection(answered.level));
                }
            }
            for mid in remote.bundle_groups.iter().flatten() {
                if offer.bundle_group_of(mid).is_none() {
                    return Err(Error::ErrAnswerBundleNotOffered(mid.clone()));
                }
            }
        }

        for group in &remote.bundle_groups {
            for mid in group {
                if remote.section_by_mid(mid).is_none() {
                    return Err(Error::ErrBundleGroupUnknownMid(mid.clone()));
                }
            }
            if let Some(tag) = group.first().and_then(|m| remote.section_by_mid(m))
                && tag.bundle_only
            {
                return Err(Error::ErrBundleOnlyTag(tag.mid().to_owned()));
            }
        }

        let previous_remote = parse_description(self.remote_description())?;
        for section in &remote.sections {
            if section.is_disabled() {
                continue;
            }
            if section.kind == RTCMediaKind::Unspecified {
                return Err(Error::ErrUnsupportedMediaFormat(section.media.clone()));
            }

            // every offered section but a bundle-only one carries a transport
            let owning = if is_offer {
                !section.bundle_only
            } else {
                remote
                    .bundle_tag_level(section.mid())
                    .is_none_or(|tag| tag == section.level)
            };
            if owning && !section.has_transport_attributes() {
                let level = section.level;
                if section.ice_ufrag.is_none() {
                    return Err(Error::ErrMissingIceUfrag(level));
                }
                if section.ice_pwd.is_none() {
                    return Err(Error::ErrMissingIcePwd(level));
                }
                if section.fingerprints.is_empty() {
                    return Err(Error::ErrMissingFingerprint(level));
                }
                if section.setup.is_none() {
                    return Err(Error::ErrMissingSetup(level));
                }
            }

            if let Some(setup) = &section.setup {
                let allowed = match ConnectionRole::from(setup.as_str()) {
                    ConnectionRole::Active | ConnectionRole::Passive => true,
                    ConnectionRole::Actpass => is_offer,
                    _ => false,
                };
                if !allowed {
                    return Err(Error::ErrInvalidSetupRole(setup.clone()));
                }
            }

            for fingerprint in &section.fingerprints {
                RTCDtlsFingerprint::parse(fingerprint)?;
            }

            let restarted = ice_restarted(previous_remote.as_ref(), section)?;
            if restarted && !is_offer && self.pending_ice_credentials.is_none() {
                return Err(Error::ErrUnexpectedIceRestart(section.level));
            }
        }

        Ok(())
    }

    /// Header extension ids must be one-byte ids, unique per m-section and
    /// consistent with every binding agreed on before.
    fn validate_extmaps(&self, remote: &ParsedSdp) -> Result<()> {
        for section in &remote.sections {
            let mut ids = HashSet::new();
            for extmap in &section.extmaps {
                let id = extmap.id;
                if id == 0 || id > 255 {
                    return Err(Error::ErrInvalidExtmapId(id));
                }
                if !VALID_EXT_IDS.contains(&id) {
                    return Err(Error::ErrUnsupportedTwoByteExtmapId(id));
                }
                if !ids.insert(id) {
                    return Err(Error::ErrDuplicateExtmapId(id, section.level));
                }

                if let Some(bound) = self.extmaps_negotiated.get(&extmap.uri)
                    && *bound != id
                {
                    return Err(Error::ErrExtmapUriRemapped {
                        uri: extmap.uri.clone(),
                        old: *bound,
                        new: id,
                    });
                }
                if let Some((uri, _)) = self
                    .extmaps_negotiated
                    .iter()
                    .find(|(uri, bound)| **bound == id && **uri != extmap.uri)
                {
                    return Err(Error::ErrExtmapIdRemapped {
                        id,
                        old: uri.clone(),
                        new: extmap.uri.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn apply_remote_offer(&mut self, desc: RTCSessionDescription, offer: &ParsedSdp) -> Result<()> {
        let previous_remote = parse_description(self.current_remote_description.as_ref())?;

        let mut transceivers = self.transceivers.clone();
        for t in transceivers.iter_mut().filter(|t| !t.associated) {
            t.clear_level();
        }

        for section in &offer.sections {
            let index = self.pair_remote_section(&mut transceivers, section)?;
            let t = &mut transceivers[index];
            trace!(
                "remote level {} (mid {}) paired with transceiver {}",
                section.level,
                section.mid(),
                t.uuid
            );
            t.level = Some(section.level);
            t.mid = Some(section.mid().to_owned());
            t.associated = true;
            apply_remote_track_identity(&mut t.recv_track, section);
        }

        let remote_restart = offer
            .sections
            .iter()
            .any(|s| ice_restarted(previous_remote.as_ref(), s).unwrap_or(false));
        let pending_ice_credentials = remote_restart.then(RTCIceParameters::generate);
        let local_ice = pending_ice_credentials
            .clone()
            .unwrap_or_else(|| self.ice_credentials.clone());

        let mut transports = self.transports.clone();
        self.apply_bundle_groups(&mut transceivers, offer);
        for t in &transceivers {
            let Some(level) = t.level else {
                continue;
            };
            let Some(section) = offer.sections.get(level) else {
                continue;
            };
            if section.is_disabled() || !t.owns_transport {
                continue;
            }
            let transport = transports
                .entry(t.transport_id.clone())
                .or_insert_with(|| RTCJsepTransport::new(&t.transport_id, level, local_ice.clone()));
            transport.level = level;
            update_remote_transport(transport, section);
        }

        if remote_restart {
            debug!("remote offer restarts ICE");
        }
        for section in &offer.sections {
            self.used_mids.insert(section.mid().to_owned());
        }
        self.transceivers = transceivers;
        self.transports = transports;
        self.pending_ice_credentials = pending_ice_credentials;
        self.pending_remote_description = Some(desc);
        self.is_offerer = false;

        Ok(())
    }

    /// Finds or creates the transceiver for a remote offer's m-section.
    fn pair_remote_section(
        &mut self,
        transceivers: &mut Vec<RTCRtpTransceiver>,
        section: &MediaSection,
    ) -> Result<usize> {
        let level = section.level;

        if let Some(index) = transceivers
            .iter()
            .position(|t| t.associated && t.mid.as_deref() == Some(section.mid()))
        {
            if transceivers[index].level != Some(level) {
                return Err(Error::ErrMidChanged(level));
            }
            return Ok(index);
        }

        if let Some(holder) = transceivers.iter_mut().find(|t| t.level == Some(level)) {
            if !holder.can_recycle && !holder.stopped {
                return Err(Error::ErrMidChanged(level));
            }
            trace!("remote recycles level {level} of transceiver {}", holder.uuid);
            holder.clear_level();
            holder.can_recycle = false;
        }

        if !section.is_disabled()
            && let Some(index) = transceivers.iter().position(|t| {
                !t.associated
                    && t.level.is_none()
                    && !t.stopped
                    && !t.stopping
                    && !t.removed
                    && t.kind == section.kind
                    && t.add_track_magic
            })
        {
            return Ok(index);
        }

        let kind = if section.kind == RTCMediaKind::Unspecified {
            RTCMediaKind::from(section.media.as_str())
        } else {
            section.kind
        };
        let mut transceiver = RTCRtpTransceiver::new(
            kind,
            RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Recvonly,
                ..Default::default()
            },
        );
        transceiver.only_exists_because_of_set_remote = true;
        self.assign_identifiers(&mut transceiver);
        debug!(
            "remote level {level} creates {} transceiver {}",
            transceiver.kind, transceiver.uuid
        );
        transceivers.push(transceiver);

        Ok(transceivers.len() - 1)
    }

    /// Points the transceivers of every BUNDLE group of `desc` at the
    /// transport of the group's tag; everyone else owns a transport.
    fn apply_bundle_groups(&mut self, transceivers: &mut [RTCRtpTransceiver], desc: &ParsedSdp) {
        let tags = bundle_tags(desc);

        for t in transceivers.iter_mut() {
            let Some(level) = t.level else {
                continue;
            };
            if desc.sections.get(level).is_none_or(|s| s.is_disabled()) {
                continue;
            }
            let tag = tags.get(&level).copied();
            if tag.is_some_and(|tag| tag != level) {
                continue;
            }
            if !t.owns_transport {
                t.transport_id = self.uuid_generator.generate();
                t.owns_transport = true;
            }
            t.bundle_level = tag;
        }

        let tag_transports: HashMap<usize, String> = transceivers
            .iter()
            .filter(|t| t.owns_transport)
            .filter_map(|t| Some((t.level?, t.transport_id.clone())))
            .collect();

        for t in transceivers.iter_mut() {
            let Some(level) = t.level else {
                continue;
            };
            let Some(tag) = tags.get(&level).copied().filter(|tag| *tag != level) else {
                continue;
            };
            if let Some(transport_id) = tag_transports.get(&tag) {
                t.transport_id = transport_id.clone();
                t.owns_transport = false;
                t.bundle_level = Some(tag);
            }
        }
    }

    /// Applies an answer (or provisional answer) to the offer it answers.
    ///
    /// Updates negotiated codecs, activity and transports of every
    /// transceiver with a level. A final answer also stops the transceivers
    /// whose m-section was rejected and records the header extension ids.
    pub(crate) fn finalize(
        &mut self,
        offer: &ParsedSdp,
        answer: &ParsedSdp,
        provisional: bool,
    ) -> Result<()> {
        let (local, remote) = if self.is_offerer {
            (offer, answer)
        } else {
            (answer, offer)
        };
        let local_ice = self.local_ice_credentials().clone();

        let mut transceivers = self.transceivers.clone();
        let mut transports: BTreeMap<String, RTCJsepTransport> = self.transports.clone();
        self.apply_bundle_groups(&mut transceivers, answer);

        for t in transceivers.iter_mut() {
            let Some(level) = t.level else {
                continue;
            };
            let (Some(local_section), Some(remote_section), Some(answer_section)) = (
                local.sections.get(level),
                remote.sections.get(level),
                answer.sections.get(level),
            ) else {
                continue;
            };

            if answer_section.is_disabled() {
                t.send_track.negotiated = None;
                t.send_track.active = false;
                t.recv_track.reset_negotiation();
                t.current_direction = Some(RTCRtpTransceiverDirection::Inactive);
                if !provisional {
                    trace!("level {level} negotiated disabled");
                    t.stopping = true;
                    t.stopped = true;
                    t.can_recycle = true;
                    t.bundle_level = None;
                }
                continue;
            }

            self.negotiate_tracks(t, local_section, remote_section, answer_section);

            if t.owns_transport {
                let transport = transports.entry(t.transport_id.clone()).or_insert_with(|| {
                    RTCJsepTransport::new(&t.transport_id, level, local_ice.clone())
                });
                transport.level = level;
                transport.restart_local(local_ice.clone());
                update_remote_transport(transport, remote_section);

                let setup = ConnectionRole::from(answer_section.setup.as_deref().unwrap_or(""));
                transport.dtls_role = if self.is_offerer {
                    match setup {
                        ConnectionRole::Active => RTCDtlsRole::Server,
                        ConnectionRole::Passive => RTCDtlsRole::Client,
                        _ => RTCDtlsRole::Unspecified,
                    }
                } else {
                    RTCDtlsRole::from(setup)
                };
                transport.components = if (local_section.rtcp_mux && remote_section.rtcp_mux)
                    || t.kind == RTCMediaKind::Application
                {
                    1
                } else {
                    2
                };
                transport.remote_fingerprints = remote_section
                    .fingerprints
                    .iter()
                    .map(|f| RTCDtlsFingerprint::parse(f))
                    .collect::<Result<Vec<_>>>()?;
            }

            if !provisional {
                t.associated = true;
                t.negotiated = true;
            }
        }

        if !provisional {
            for section in answer.sections.iter().filter(|s| !s.is_disabled()) {
                for extmap in &section.extmaps {
                    self.extmaps_negotiated
                        .insert(extmap.uri.clone(), extmap.id);
                    self.extmap_ids_used.insert(extmap.id, extmap.uri.clone());
                }
            }

            let live: HashSet<&str> = transceivers
                .iter()
                .filter(|t| {
                    t.level
                        .and_then(|l| answer.sections.get(l))
                        .is_some_and(|s| !s.is_disabled())
                })
                .map(|t| t.transport_id.as_str())
                .collect();
            transports.retain(|id, _| live.contains(id.as_str()));
        }

        debug!(
            "{} applied with {} transceivers and {} transports",
            if provisional { "pranswer" } else { "answer" },
            transceivers.len(),
            transports.len()
        );
        self.transceivers = transceivers;
        self.transports = transports;

        Ok(())
    }

    /// Fills the negotiated details and activity of both tracks of `t`.
    fn negotiate_tracks(
        &self,
        t: &mut RTCRtpTransceiver,
        local: &MediaSection,
        remote: &MediaSection,
        answer: &MediaSection,
    ) {
        let mut send_codecs = vec![];
        let mut recv_codecs = vec![];

        for format in answer.primary_formats() {
            let Some(descriptor) = self
                .media_engine
                .codecs()
                .iter()
                .find(|c| c.enabled && c.kind() == t.kind && c.matches(format))
            else {
                trace!("answer format {} {} is not supported", format.pt, format.name);
                continue;
            };
            let (Some(local_format), Some(remote_format)) =
                (find_format(local, format), find_format(remote, format))
            else {
                continue;
            };

            let local_rtx = local.rtx_for(&local_format.pt).map(|f| f.pt.as_str());
            let remote_rtx = remote.rtx_for(&remote_format.pt).map(|f| f.pt.as_str());
            let (local_rtx, remote_rtx) = if local_rtx.is_some()
                && remote_rtx.is_some()
                && descriptor.rtx_payload_type().is_some()
            {
                (local_rtx, remote_rtx)
            } else {
                (None, None)
            };

            send_codecs.push(descriptor.negotiated(&remote_format.pt, remote_format, remote_rtx));
            recv_codecs.push(descriptor.negotiated(&local_format.pt, remote_format, local_rtx));
        }

        let rtp_rtcp_config = RTCRtpRtcpConfig {
            extmap_allow_mixed: local.extmap_allow_mixed && remote.extmap_allow_mixed,
            rtcp_mux: local.rtcp_mux && remote.rtcp_mux,
            rtcp_rsize: local.rtcp_rsize && remote.rtcp_rsize,
        };

        let send_active =
            local.direction.has_send() && remote.direction.has_recv() && !send_codecs.is_empty();
        let recv_active =
            local.direction.has_recv() && remote.direction.has_send() && !recv_codecs.is_empty();

        let send_rids: Vec<String> = remote
            .recv_rids()
            .into_iter()
            .filter(|rid| t.send_track.rids.contains(rid))
            .collect();

        t.send_track.negotiated = Some(RTCNegotiatedDetails {
            encodings: encodings(send_rids, send_codecs),
            extmaps: answer.extmaps.clone(),
            tias: remote.tias,
            rtp_rtcp_config: rtp_rtcp_config.clone(),
        });
        t.send_track.active = send_active;

        apply_remote_track_identity(&mut t.recv_track, remote);
        t.recv_track.negotiated = Some(RTCNegotiatedDetails {
            encodings: encodings(remote.send_rids(), recv_codecs),
            extmaps: answer.extmaps.clone(),
            tias: local.tias,
            rtp_rtcp_config,
        });
        t.recv_track.active = recv_active;

        let current_direction = RTCRtpTransceiverDirection::from_send_recv(send_active, recv_active);
        trace!(
            "transceiver {} at level {:?} negotiated {current_direction}",
            t.uuid, t.level
        );
        t.current_direction = Some(current_direction);
    }
}

/// Takes the remote ICE credentials and candidates of `section`.
fn update_remote_transport(transport: &mut RTCJsepTransport, section: &MediaSection) {
    if let Some(ice) = section.ice() {
        transport.set_remote_ice(ice);
    }
    for candidate in &section.candidates {
        if !transport.remote_candidates.contains(candidate) {
            transport.remote_candidates.push(candidate.clone());
        }
    }
    if section.end_of_candidates {
        transport.remote_end_of_candidates = true;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rtp_transceiver::track::RTCRtpTrackDirection;

    fn section(mid: &str, ufrag: &str, pwd: &str) -> MediaSection {
        MediaSection {
            mid: Some(mid.to_owned()),
            ice_ufrag: Some(ufrag.to_owned()),
            ice_pwd: Some(pwd.to_owned()),
            port: 9,
            ..Default::default()
        }
    }

    #[test]
    fn test_ice_restarted() {
        let previous = ParsedSdp {
            sections: vec![section("0", "u1", "p1")],
            ..Default::default()
        };

        let tests = vec![
            ("unchanged", section("0", "u1", "p1"), Ok(false)),
            ("restart", section("0", "u2", "p2"), Ok(true)),
            (
                "ufrag only",
                section("0", "u2", "p1"),
                Err(Error::ErrIceRestartPwdUnchanged(0)),
            ),
            (
                "pwd only",
                section("0", "u1", "p2"),
                Err(Error::ErrIceRestartUfragUnchanged(0)),
            ),
            ("new mid", section("1", "u9", "p9"), Ok(false)),
        ];

        for (name, section, expected) in tests {
            assert_eq!(ice_restarted(Some(&previous), &section), expected, "{name}");
        }
        assert_eq!(ice_restarted(None, &section("0", "u2", "p1")), Ok(false));
    }

    #[test]
    fn test_apply_remote_track_identity() {
        let mut remote = section("0", "u", "p");
        remote.direction = RTCRtpTransceiverDirection::Sendonly;
        remote.msids = vec![("stream".to_owned(), "track".to_owned())];
        remote.ssrcs = vec![1111, 2222];
        remote.fid_groups = vec![(1111, 2222)];
        remote.cname = "remote-cname".to_owned();

        let mut track = RTCRtpTrack::new(RTCMediaKind::Video, RTCRtpTrackDirection::Recv);
        apply_remote_track_identity(&mut track, &remote);
        assert_eq!(track.stream_ids, vec!["stream".to_owned()]);
        assert_eq!(track.track_id, "track");
        assert_eq!(track.ssrcs, vec![1111]);
        assert_eq!(track.rtx_ssrcs, vec![2222]);
        assert_eq!(track.cname, "remote-cname");

        remote.direction = RTCRtpTransceiverDirection::Recvonly;
        apply_remote_track_identity(&mut track, &remote);
        assert!(track.is_null());
        assert!(track.ssrcs.is_empty());
    }

    #[test]
    fn test_bundle_tags() {
        let mut disabled = section("2", "u", "p");
        disabled.port = 0;
        let mut bundle_only = section("1", "u", "p");
        bundle_only.port = 0;
        bundle_only.bundle_only = true;

        let mut desc = ParsedSdp {
            sections: vec![section("0", "u", "p"), bundle_only, disabled],
            bundle_groups: vec![vec!["0".to_owned(), "1".to_owned(), "2".to_owned()]],
            ..Default::default()
        };
        for (level, s) in desc.sections.iter_mut().enumerate() {
            s.level = level;
        }

        let tags = bundle_tags(&desc);
        assert_eq!(tags.get(&0), Some(&0));
        assert_eq!(tags.get(&1), Some(&0));
        assert_eq!(tags.get(&2), None);
    }
}
