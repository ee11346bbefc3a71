use std::collections::HashSet;

use log::{debug, trace};
use sdp::description::media::MediaDescription;
use sdp::util::ConnectionRole;
use shared::error::{Error, Result};

use super::RTCJsepSession;
use super::configuration::offer_answer_options::RTCAnswerOptions;
use super::description::parse_description;
use super::sdp::*;
use super::signaling_state::RTCSignalingState;
use crate::codec::{RTCCodecDescriptor, RTCMediaKind};
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::negotiated_details::RTCExtmap;
use crate::transport::dtls::RTCDtlsRole;
use crate::transport::ice::RTCIceParameters;

/// How one m-section of the remote offer is answered.
enum AnswerSection {
    Accepted {
        index: usize,
        direction: RTCRtpTransceiverDirection,
        codecs: Vec<RTCCodecDescriptor>,
    },
    Rejected,
}

/// `format`s of the offer the session can use, in answer order: strongly
/// preferred codecs first, then the order of the offer.
fn answer_codecs(
    candidates: &[&RTCCodecDescriptor],
    section: &MediaSection,
    direction: RTCRtpTransceiverDirection,
) -> Vec<RTCCodecDescriptor> {
    let mut codecs: Vec<(bool, RTCCodecDescriptor)> = vec![];
    for format in section.primary_formats() {
        let Some(descriptor) = candidates.iter().find(|c| {
            c.matches(format)
                && (direction == RTCRtpTransceiverDirection::Inactive
                    || (c.direction.has_send() && direction.has_send())
                    || (c.direction.has_recv() && direction.has_recv()))
        }) else {
            continue;
        };

        let rtx = section
            .rtx_for(&format.pt)
            .filter(|_| descriptor.rtx_payload_type().is_some())
            .map(|f| f.pt.as_str());
        codecs.push((
            descriptor.strongly_preferred,
            descriptor.negotiated(&format.pt, format, rtx),
        ));
    }

    codecs.sort_by_key(|(strongly_preferred, _)| !*strongly_preferred);
    codecs.into_iter().map(|(_, codec)| codec).collect()
}

impl RTCJsepSession {
    /// Generates an answer to the pending remote offer.
    ///
    /// Payload types and header extension ids are those of the offer. An
    /// m-section is rejected when the offer disabled it, its transceiver
    /// is stopped or no codec is acceptable.
    pub fn create_answer(&mut self, _options: RTCAnswerOptions) -> Result<String> {
        if self.signaling_state != RTCSignalingState::HaveRemoteOffer
            && self.signaling_state != RTCSignalingState::HaveLocalPranswer
        {
            return Err(Error::ErrIncorrectSignalingState);
        }
        if self.configuration.dtls_fingerprints.is_empty() {
            return Err(Error::ErrNoLocalFingerprint);
        }

        let offer = parse_description(self.pending_remote_description.as_ref())?
            .ok_or(Error::ErrNoRemoteDescription("create an answer"))?;
        let local_ice = self.local_ice_credentials().clone();

        let mut plan: Vec<AnswerSection> = offer
            .sections
            .iter()
            .map(|section| self.plan_answer_section(section))
            .collect();

        let bundle_group = self.plan_answer_bundle(&offer, &mut plan);

        let mut media_descriptions = Vec::with_capacity(plan.len());
        for (section, planned) in offer.sections.iter().zip(plan) {
            let md = match planned {
                AnswerSection::Rejected => {
                    trace!("answer level {}: rejected mid {}", section.level, section.mid());
                    disabled_media_description(&section.media, section.protos.clone(), section.mid())
                }
                AnswerSection::Accepted {
                    index,
                    direction,
                    codecs,
                } => self.answer_media_description(
                    index, &offer, section, direction, &codecs, &local_ice,
                ),
            };
            media_descriptions.push(md);
        }

        let session_version = self.next_session_version();
        let mut desc = new_session_description(
            self.session_id,
            session_version,
            &self.configuration.session_name,
        );
        self.add_session_attributes(&mut desc.attributes, &bundle_group, offer.extmap_allow_mixed);
        desc.media_descriptions = media_descriptions;

        let sdp = desc.marshal();
        debug!(
            "created answer v{session_version} with {} m-sections",
            desc.media_descriptions.len()
        );
        self.last_answer = Some(sdp.clone());

        Ok(sdp)
    }

    fn plan_answer_section(&self, section: &MediaSection) -> AnswerSection {
        if section.is_disabled() || section.kind == RTCMediaKind::Unspecified {
            return AnswerSection::Rejected;
        }
        let Some(index) = self.transceiver_at_level(section.level) else {
            return AnswerSection::Rejected;
        };
        let t = &self.transceivers[index];
        if t.stopped || t.removed {
            return AnswerSection::Rejected;
        }

        let direction = if t.kind == RTCMediaKind::Application {
            RTCRtpTransceiverDirection::Sendrecv
        } else {
            self.offered_direction(t)
                .intersect(section.direction.reverse())
        };

        let candidates = self.media_engine.codecs_by_kind(t.kind);
        let codecs = answer_codecs(&candidates, section, direction);
        if codecs.is_empty() {
            trace!("answer level {}: no common codec", section.level);
            return AnswerSection::Rejected;
        }

        AnswerSection::Accepted {
            index,
            direction,
            codecs,
        }
    }

    /// Rejects bundle-only sections whose group tag is rejected and returns
    /// the mids of the accepted BUNDLE group, tag first.
    fn plan_answer_bundle(&self, offer: &ParsedSdp, plan: &mut [AnswerSection]) -> Vec<String> {
        let mut group = vec![];
        for (i, offered) in offer.bundle_groups.iter().enumerate() {
            let tag_rejected = offered
                .first()
                .and_then(|tag| offer.section_by_mid(tag))
                .is_none_or(|tag| matches!(plan[tag.level], AnswerSection::Rejected));

            for mid in offered {
                let Some(section) = offer.section_by_mid(mid) else {
                    continue;
                };
                let level = section.level;
                if section.bundle_only && (tag_rejected || i > 0) {
                    trace!("answer level {level}: bundle-only without a tag");
                    plan[level] = AnswerSection::Rejected;
                }
                if i == 0 && !matches!(plan[level], AnswerSection::Rejected) {
                    group.push(mid.clone());
                }
            }
        }
        group
    }

    fn answer_media_description(
        &mut self,
        index: usize,
        offer: &ParsedSdp,
        section: &MediaSection,
        direction: RTCRtpTransceiverDirection,
        codecs: &[RTCCodecDescriptor],
        local_ice: &RTCIceParameters,
    ) -> MediaDescription {
        let kind = self.transceivers[index].kind;
        let extmaps = self.answer_extmaps(kind, section);
        let t = &self.transceivers[index];

        let mut md = new_media_description(&section.media, section.protos.clone());
        md.attributes
            .push(value_attribute(ATTR_KEY_MID, section.mid()));

        let remote_setup = section.setup.as_deref().or_else(|| {
            offer
                .bundle_tag_level(section.mid())
                .and_then(|tag| offer.sections.get(tag))
                .and_then(|tag| tag.setup.as_deref())
        });
        let established = self
            .transports
            .get(&t.transport_id)
            .filter(|tr| t.owns_transport && tr.level == section.level)
            .map(|tr| tr.dtls_role)
            .filter(|role| matches!(role, RTCDtlsRole::Client | RTCDtlsRole::Server));
        // an actpass re-offer keeps the role already established
        let setup = match (ConnectionRole::from(remote_setup.unwrap_or("")), established) {
            (ConnectionRole::Actpass, Some(role)) => role.to_connection_role(),
            (remote, _) => RTCDtlsRole::answer_setup(remote),
        }
        .to_string();
        let transport = self
            .transports
            .get(&t.transport_id)
            .filter(|tr| t.owns_transport && tr.level == section.level && tr.local_ice == *local_ice);
        add_transport_attributes(
            &mut md,
            &TransportAttributes {
                ice: local_ice,
                setup: &setup,
                candidates: transport.map(|tr| tr.local_candidates.as_slice()).unwrap_or(&[]),
                end_of_candidates: transport.is_some_and(|tr| tr.local_end_of_candidates),
                default_candidate: transport.and_then(|tr| tr.default_candidate.as_ref()),
            },
        );

        md.attributes
            .push(property_attribute(&direction.to_string()));
        if kind != RTCMediaKind::Application && direction.has_recv() && t.max_recv_bitrate > 0 {
            add_bandwidth(&mut md, BANDWIDTH_TYPE_TIAS, t.max_recv_bitrate);
        }

        if kind != RTCMediaKind::Application {
            if section.rtcp_mux {
                md.attributes.push(property_attribute(ATTR_KEY_RTCP_MUX));
            }
            if section.rtcp_rsize {
                md.attributes.push(property_attribute(ATTR_KEY_RTCP_RSIZE));
            }
            add_extmap_attributes(&mut md, &extmaps);
        }

        add_codec_attributes(&mut md, codecs);

        if kind != RTCMediaKind::Application {
            if direction.has_send() {
                let with_rtx = codecs.iter().any(|c| c.rtx_payload_type().is_some());
                add_track_attributes(&mut md, &t.send_track, with_rtx);

                let accepted: Vec<String> = section
                    .recv_rids()
                    .into_iter()
                    .filter(|rid| t.send_track.rids.contains(rid))
                    .collect();
                add_simulcast_attributes(&mut md, &accepted, true);
            }
            if direction.has_recv() {
                add_simulcast_attributes(&mut md, &section.send_rids(), false);
            }
        }

        trace!(
            "answer level {}: mid {} {kind} {direction} setup {setup}",
            section.level,
            section.mid()
        );
        md
    }

    /// The offered header extensions the session supports for `kind`,
    /// keeping the offerer's ids.
    fn answer_extmaps(&mut self, kind: RTCMediaKind, section: &MediaSection) -> Vec<RTCExtmap> {
        let mut seen = HashSet::new();
        let mut extmaps = vec![];
        for offered in &section.extmaps {
            let Some(ext) = self
                .media_engine
                .header_extensions()
                .iter()
                .find(|ext| ext.uri == offered.uri && ext.is_matching_kind(kind))
            else {
                continue;
            };
            let direction = ext
                .allowed_direction
                .intersect(offered.direction.reverse());
            if direction == RTCRtpTransceiverDirection::Inactive || !seen.insert(offered.id) {
                continue;
            }

            extmaps.push(RTCExtmap {
                id: offered.id,
                uri: offered.uri.clone(),
                direction,
            });
        }

        for extmap in &extmaps {
            self.extmap_ids_used.insert(extmap.id, extmap.uri.clone());
        }
        extmaps
    }
}
