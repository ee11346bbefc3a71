use std::collections::{HashMap, HashSet};

use log::{debug, trace, warn};
use sdp::description::media::MediaDescription;
use sdp::util::ConnectionRole;
use shared::error::{Error, Result};

use super::RTCJsepSession;
use super::configuration::bundle_policy::RTCBundlePolicy;
use super::configuration::offer_answer_options::RTCOfferOptions;
use super::description::parse_description;
use super::sdp::*;
use super::signaling_state::RTCSignalingState;
use crate::codec::{CODEC_NAME_RED, RTCCodecDescriptor, RTCMediaKind};
use crate::media_engine::VALID_EXT_IDS;
use crate::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::negotiated_details::RTCExtmap;
use crate::transport::ice::RTCIceParameters;

/// Dynamic payload types, then the unassigned static range (RFC 3551 §6).
fn free_payload_types() -> impl Iterator<Item = u8> {
    (96..=127).chain(35..=63)
}

/// Makes every payload type (including RTX ones) unique within `codecs`,
/// moving later duplicates to free numbers. Codecs that cannot be placed
/// are dropped.
pub(crate) fn assign_unique_payload_types(codecs: Vec<RTCCodecDescriptor>) -> Vec<RTCCodecDescriptor> {
    let claimed: HashSet<String> = codecs
        .iter()
        .flat_map(|c| {
            std::iter::once(c.default_pt.clone()).chain(c.rtx_payload_type().map(str::to_owned))
        })
        .collect();
    let mut used: HashSet<String> = HashSet::new();

    let take_free = |used: &mut HashSet<String>| {
        free_payload_types()
            .map(|pt| pt.to_string())
            .find(|pt| !claimed.contains(pt) && !used.contains(pt))
    };

    let mut result = Vec::with_capacity(codecs.len());
    for mut codec in codecs {
        if codec.kind() == RTCMediaKind::Application {
            result.push(codec);
            continue;
        }

        if used.contains(&codec.default_pt) {
            let Some(pt) = take_free(&mut used) else {
                warn!("no payload type left for {}", codec.name);
                continue;
            };
            trace!("{} moved from payload type {} to {pt}", codec.name, codec.default_pt);
            codec.default_pt = pt;
        }
        used.insert(codec.default_pt.clone());

        if let Some(rtx_pt) = codec.rtx_payload_type().map(str::to_owned) {
            if used.contains(&rtx_pt) {
                match take_free(&mut used) {
                    Some(pt) => codec.enable_rtx(&pt),
                    None => codec.disable_rtx(),
                }
            }
            if let Some(rtx_pt) = codec.rtx_payload_type() {
                used.insert(rtx_pt.to_owned());
            }
        }

        result.push(codec);
    }

    result
}

/// Points RED at every primary video codec of the section.
pub(crate) fn update_redundant_encodings(codecs: &mut [RTCCodecDescriptor]) {
    let primaries: Vec<String> = codecs
        .iter()
        .filter(|c| c.kind() == RTCMediaKind::Video && !c.is_companion())
        .map(|c| c.default_pt.clone())
        .collect();

    for codec in codecs.iter_mut() {
        if codec.is_named(CODEC_NAME_RED)
            && let Some(v) = codec.video_parameters_mut()
        {
            v.redundant_encodings = primaries.clone();
        }
    }
}

enum OfferSection {
    Active { index: usize, bundle_only: bool },
    Disabled { media: String, protos: Vec<String>, mid: String },
}

impl RTCJsepSession {
    /// Generates an offer from the current transceivers.
    ///
    /// Only level and mid assignment of new transceivers (and the transceivers
    /// added for `offer_to_receive_*`) are visible afterwards; the offer takes
    /// effect with [`set_local_description`](Self::set_local_description).
    pub fn create_offer(&mut self, options: RTCOfferOptions) -> Result<String> {
        if self.signaling_state != RTCSignalingState::Stable
            && self.signaling_state != RTCSignalingState::HaveLocalOffer
        {
            return Err(Error::ErrIncorrectSignalingState);
        }
        if self.configuration.dtls_fingerprints.is_empty() {
            return Err(Error::ErrNoLocalFingerprint);
        }

        let previous_local = parse_description(self.current_local_description.as_ref())?;
        let previous_remote = parse_description(self.current_remote_description.as_ref())?;

        self.add_offer_to_receive(RTCMediaKind::Audio, options.offer_to_receive_audio);
        self.add_offer_to_receive(RTCMediaKind::Video, options.offer_to_receive_video);

        let ice_restart = options.ice_restart || self.ice_restart_requested;
        if ice_restart && self.pending_ice_credentials.is_none() {
            self.pending_ice_credentials = Some(RTCIceParameters::generate());
        }
        let local_ice = self.local_ice_credentials().clone();

        let previous_count = previous_local
            .as_ref()
            .map(|p| p.sections.len())
            .unwrap_or(0)
            .max(previous_remote.as_ref().map(|p| p.sections.len()).unwrap_or(0));

        self.assign_levels(previous_count);

        let level_count = self
            .transceivers
            .iter()
            .filter_map(|t| t.level)
            .map(|l| l + 1)
            .max()
            .unwrap_or(0)
            .max(previous_count);

        let mut plan = Vec::with_capacity(level_count);
        for level in 0..level_count {
            let section = match self.transceiver_at_level(level) {
                Some(index) => {
                    if self.transceivers[index].mid.is_none() {
                        let mid = self.new_mid();
                        self.transceivers[index].mid = Some(mid);
                    }
                    let t = &self.transceivers[index];
                    if t.stopped || t.stopping || t.removed {
                        OfferSection::Disabled {
                            media: t.kind.to_string(),
                            protos: media_protos(t.kind),
                            mid: t.mid.clone().unwrap_or_default(),
                        }
                    } else {
                        OfferSection::Active {
                            index,
                            bundle_only: false,
                        }
                    }
                }
                None => {
                    let previous = previous_local
                        .as_ref()
                        .and_then(|p| p.sections.get(level))
                        .or_else(|| previous_remote.as_ref().and_then(|p| p.sections.get(level)));
                    match previous {
                        Some(section) => OfferSection::Disabled {
                            media: section.media.clone(),
                            protos: section.protos.clone(),
                            mid: section.mid().to_owned(),
                        },
                        None => OfferSection::Disabled {
                            media: RTCMediaKind::Audio.to_string(),
                            protos: media_protos(RTCMediaKind::Audio),
                            mid: self.new_mid(),
                        },
                    }
                }
            };
            plan.push(section);
        }

        let bundle_group = self.plan_offer_bundle(&mut plan, previous_local.as_ref());

        let mut offer_extmap_ids: HashMap<u16, String> = HashMap::new();
        let mut media_descriptions = Vec::with_capacity(level_count);
        for (level, section) in plan.iter().enumerate() {
            let md = match section {
                OfferSection::Disabled { media, protos, mid } => {
                    trace!("offer level {level}: disabled mid {mid}");
                    disabled_media_description(media, protos.clone(), mid)
                }
                OfferSection::Active { index, bundle_only } => self.offer_media_description(
                    *index,
                    level,
                    *bundle_only,
                    ice_restart,
                    &local_ice,
                    &mut offer_extmap_ids,
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
        self.add_session_attributes(&mut desc.attributes, &bundle_group, true);
        desc.media_descriptions = media_descriptions;

        let sdp = desc.marshal();
        debug!(
            "created offer v{session_version} with {} m-sections",
            desc.media_descriptions.len()
        );
        self.last_offer = Some(sdp.clone());

        Ok(sdp)
    }

    /// Adds `count` receive-only transceivers of `kind` unless one of that
    /// kind is already live.
    fn add_offer_to_receive(&mut self, kind: RTCMediaKind, count: Option<usize>) {
        let Some(count) = count else {
            return;
        };
        if self
            .transceivers
            .iter()
            .any(|t| t.kind == kind && !t.stopped && !t.stopping)
        {
            return;
        }

        for _ in 0..count {
            let mut transceiver = RTCRtpTransceiver::new(
                kind,
                RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    ..Default::default()
                },
            );
            self.assign_identifiers(&mut transceiver);
            trace!("offer to receive adds {kind} transceiver {}", transceiver.uuid);
            self.transceivers.push(transceiver);
        }
    }

    /// Gives a level to every live transceiver that has none, preferring the
    /// lowest level that was negotiated disabled.
    pub(crate) fn assign_levels(&mut self, previous_count: usize) {
        let mut next_level = self
            .transceivers
            .iter()
            .filter_map(|t| t.level)
            .map(|l| l + 1)
            .max()
            .unwrap_or(0)
            .max(previous_count);

        for i in 0..self.transceivers.len() {
            let t = &self.transceivers[i];
            if t.level.is_some() || t.stopped || t.stopping || t.removed {
                continue;
            }

            let recyclable = self
                .transceivers
                .iter()
                .enumerate()
                .filter(|(_, o)| o.can_recycle && o.level.is_some())
                .min_by_key(|(_, o)| o.level)
                .map(|(j, _)| j);

            let level = match recyclable {
                Some(j) => {
                    let level = self.transceivers[j].level;
                    self.transceivers[j].clear_level();
                    self.transceivers[j].can_recycle = false;
                    level
                }
                None => {
                    next_level += 1;
                    Some(next_level - 1)
                }
            };

            trace!(
                "transceiver {} gets level {:?}",
                self.transceivers[i].uuid, level
            );
            self.transceivers[i].level = level;
        }
    }

    /// Picks the bundle tag, marks bundle-only sections and returns the
    /// mids of the BUNDLE group.
    fn plan_offer_bundle(
        &self,
        plan: &mut [OfferSection],
        previous_local: Option<&ParsedSdp>,
    ) -> Vec<String> {
        let active: Vec<(usize, usize)> = plan
            .iter()
            .enumerate()
            .filter_map(|(level, s)| match s {
                OfferSection::Active { index, .. } => Some((level, *index)),
                _ => None,
            })
            .collect();

        let previous_tag = previous_local
            .and_then(|p| p.bundle_groups.first())
            .and_then(|g| g.first())
            .and_then(|tag| {
                active
                    .iter()
                    .find(|(_, index)| self.transceivers[*index].mid.as_deref() == Some(tag))
            })
            .map(|(level, _)| *level);
        let Some(tag_level) = previous_tag.or(active.first().map(|(level, _)| *level)) else {
            return vec![];
        };

        let policy = self.configuration.bundle_policy;
        let mut seen_kinds = HashSet::new();
        if let Some(OfferSection::Active { index, .. }) = plan.get(tag_level) {
            seen_kinds.insert(self.transceivers[*index].kind);
        }

        let mut group = vec![];
        for (level, index) in &active {
            let t = &self.transceivers[*index];
            if *level == tag_level {
                group.insert(0, t.mid.clone().unwrap_or_default());
                continue;
            }
            group.push(t.mid.clone().unwrap_or_default());

            let first_of_kind = seen_kinds.insert(t.kind);
            if t.negotiated {
                continue;
            }
            let bundle_only = match policy {
                RTCBundlePolicy::MaxBundle => true,
                RTCBundlePolicy::Balanced => !first_of_kind,
                _ => false,
            };
            if bundle_only {
                plan[*level] = OfferSection::Active {
                    index: *index,
                    bundle_only: true,
                };
            }
        }

        group
    }

    fn offer_media_description(
        &mut self,
        index: usize,
        level: usize,
        bundle_only: bool,
        ice_restart: bool,
        local_ice: &RTCIceParameters,
        offer_extmap_ids: &mut HashMap<u16, String>,
    ) -> MediaDescription {
        let kind = self.transceivers[index].kind;
        let direction = self.offered_direction(&self.transceivers[index]);
        let extmaps = self.offer_extmaps(kind, offer_extmap_ids);

        let t = &self.transceivers[index];
        let codecs = self.offer_codecs(t, direction);
        let mid = t.mid.clone().unwrap_or_default();

        let mut md = new_media_description(&kind.to_string(), media_protos(kind));
        md.attributes.push(value_attribute(ATTR_KEY_MID, mid.as_str()));

        if bundle_only {
            md.media_name.port.value = 0;
            md.attributes.push(property_attribute(ATTR_KEY_BUNDLE_ONLY));
        } else {
            let transport = self
                .transports
                .get(&t.transport_id)
                .filter(|tr| t.owns_transport && tr.level == level && tr.local_ice == *local_ice);
            let (candidates, end_of_candidates, default_candidate) = match transport {
                Some(tr) if !ice_restart => (
                    tr.local_candidates.as_slice(),
                    tr.local_end_of_candidates,
                    tr.default_candidate.as_ref(),
                ),
                _ => (&[][..], false, None),
            };
            let setup = ConnectionRole::Actpass.to_string();
            add_transport_attributes(
                &mut md,
                &TransportAttributes {
                    ice: local_ice,
                    setup: &setup,
                    candidates,
                    end_of_candidates,
                    default_candidate,
                },
            );
        }

        md.attributes
            .push(property_attribute(&direction.to_string()));
        if kind != RTCMediaKind::Application && direction.has_recv() && t.max_recv_bitrate > 0 {
            add_bandwidth(&mut md, BANDWIDTH_TYPE_TIAS, t.max_recv_bitrate);
        }

        if kind != RTCMediaKind::Application {
            md.attributes.push(property_attribute(ATTR_KEY_RTCP_MUX));
            if kind == RTCMediaKind::Video {
                md.attributes.push(property_attribute(ATTR_KEY_RTCP_RSIZE));
            }
            add_extmap_attributes(&mut md, &extmaps);
        }

        add_codec_attributes(&mut md, &codecs);

        if kind != RTCMediaKind::Application && direction.has_send() {
            let with_rtx = codecs.iter().any(|c| c.rtx_payload_type().is_some());
            add_track_attributes(&mut md, &t.send_track, with_rtx);
            add_simulcast_attributes(&mut md, &t.send_track.rids, true);
        }

        trace!(
            "offer level {level}: mid {mid} {kind} {direction}{}",
            if bundle_only { " bundle-only" } else { "" }
        );
        md
    }

    /// The direction a transceiver asks for in an offer.
    pub(crate) fn offered_direction(&self, t: &RTCRtpTransceiver) -> RTCRtpTransceiverDirection {
        if t.kind == RTCMediaKind::Application {
            return RTCRtpTransceiverDirection::Sendrecv;
        }
        RTCRtpTransceiverDirection::from_send_recv(
            t.direction.has_send() && !t.send_track.is_null(),
            t.direction.has_recv(),
        )
    }

    /// Enabled codecs of the transceiver's kind usable in `direction`, with
    /// payload types agreed in earlier rounds kept.
    fn offer_codecs(
        &self,
        t: &RTCRtpTransceiver,
        direction: RTCRtpTransceiverDirection,
    ) -> Vec<RTCCodecDescriptor> {
        let negotiated = t
            .recv_track
            .negotiated
            .as_ref()
            .map(|n| n.codecs())
            .unwrap_or(&[]);

        let codecs = self
            .media_engine
            .codecs_by_kind(t.kind)
            .into_iter()
            .filter(|c| {
                direction == RTCRtpTransceiverDirection::Inactive
                    || (c.direction.has_send() && direction.has_send())
                    || (c.direction.has_recv() && direction.has_recv())
            })
            .map(|c| {
                let mut codec = c.clone();
                if let Some(previous) = negotiated.iter().find(|n| n.same_codec(c)) {
                    codec.default_pt = previous.default_pt.clone();
                    if let Some(rtx_pt) = previous.rtx_payload_type()
                        && codec.rtx_payload_type().is_some()
                    {
                        codec.enable_rtx(rtx_pt);
                    }
                }
                codec
            })
            .collect();

        let mut codecs = assign_unique_payload_types(codecs);
        update_redundant_encodings(&mut codecs);
        codecs
    }

    /// Header extensions for an offered section, keeping ids agreed on
    /// before and never reusing an id for another uri.
    fn offer_extmaps(
        &mut self,
        kind: RTCMediaKind,
        offer_extmap_ids: &mut HashMap<u16, String>,
    ) -> Vec<RTCExtmap> {
        if kind != RTCMediaKind::Audio && kind != RTCMediaKind::Video {
            return vec![];
        }

        let extensions: Vec<_> = self
            .media_engine
            .header_extensions()
            .iter()
            .filter(|ext| ext.is_matching_kind(kind))
            .cloned()
            .collect();

        let mut extmaps = vec![];
        for ext in extensions {
            let available = |session: &Self, id: u16| {
                session
                    .extmap_ids_used
                    .get(&id)
                    .is_none_or(|uri| *uri == ext.uri)
                    && offer_extmap_ids.get(&id).is_none_or(|uri| *uri == ext.uri)
            };

            let id = match self.extmaps_negotiated.get(&ext.uri) {
                Some(id) => Some(*id),
                None if VALID_EXT_IDS.contains(&ext.id) && available(self, ext.id) => Some(ext.id),
                None => VALID_EXT_IDS.clone().find(|id| available(self, *id)),
            };
            let Some(id) = id else {
                warn!("no extension id left for {}", ext.uri);
                continue;
            };

            self.extmap_ids_used.insert(id, ext.uri.clone());
            offer_extmap_ids.insert(id, ext.uri.clone());
            extmaps.push(RTCExtmap {
                id,
                uri: ext.uri,
                direction: ext.allowed_direction,
            });
        }

        extmaps
    }

    pub(crate) fn next_session_version(&mut self) -> u64 {
        self.session_version += 1;
        self.session_version
    }

    /// Fingerprints, BUNDLE group, ICE options and msid semantics.
    pub(crate) fn add_session_attributes(
        &self,
        attributes: &mut Vec<sdp::description::common::Attribute>,
        bundle_group: &[String],
        extmap_allow_mixed: bool,
    ) {
        for fingerprint in &self.configuration.dtls_fingerprints {
            attributes.push(value_attribute(ATTR_KEY_FINGERPRINT, fingerprint.to_string()));
        }
        if !bundle_group.is_empty() {
            attributes.push(value_attribute(
                ATTR_KEY_GROUP,
                format!("{SEMANTIC_TOKEN_BUNDLE} {}", bundle_group.join(" ")),
            ));
        }
        if !self.configuration.ice_options.is_empty() {
            attributes.push(value_attribute(
                ATTR_KEY_ICE_OPTIONS,
                self.configuration.ice_options.join(" "),
            ));
        }
        attributes.push(value_attribute(ATTR_KEY_MSID_SEMANTIC, MSID_SEMANTIC_WMS));
        if extmap_allow_mixed {
            attributes.push(property_attribute(ATTR_KEY_EXTMAP_ALLOW_MIXED));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::CODEC_NAME_ULPFEC;
    use crate::media_engine::MediaEngine;
    use crate::session::configuration::RTCConfigurationBuilder;
    use crate::session::sdp::sdp_type::RTCSdpType;
    use crate::session::sdp::session_description::RTCSessionDescription;
    use crate::transport::dtls::RTCDtlsFingerprint;
    use crate::uuid::RandomUuidGenerator;

    #[test]
    fn test_assign_unique_payload_types() {
        let mut opus = RTCCodecDescriptor::audio("opus", "0", 48000, 2);
        opus.strongly_preferred = true;
        let pcmu = RTCCodecDescriptor::audio("PCMU", "0", 8000, 1);
        let pcma = RTCCodecDescriptor::audio("PCMA", "8", 8000, 1);

        let codecs = assign_unique_payload_types(vec![opus, pcmu, pcma]);
        let pts: Vec<&str> = codecs.iter().map(|c| c.default_pt.as_str()).collect();
        assert_eq!(pts, vec!["0", "96", "8"]);
    }

    #[test]
    fn test_assign_unique_rtx_payload_types() {
        let mut vp8 = RTCCodecDescriptor::video("VP8", "120");
        vp8.enable_rtx("121");
        let vp9 = RTCCodecDescriptor::video("VP9", "121");

        let codecs = assign_unique_payload_types(vec![vp8, vp9]);
        assert_eq!(codecs[0].default_pt, "120");
        assert_eq!(codecs[0].rtx_payload_type(), Some("121"));
        assert_eq!(codecs[1].default_pt, "96");
    }

    #[test]
    fn test_update_redundant_encodings() {
        let mut m = MediaEngine::default();
        m.register_default_codecs().unwrap();
        let mut codecs: Vec<RTCCodecDescriptor> = m
            .codecs_by_kind(RTCMediaKind::Video)
            .into_iter()
            .cloned()
            .collect();
        update_redundant_encodings(&mut codecs);

        let red = codecs.iter().find(|c| c.is_named(CODEC_NAME_RED)).unwrap();
        let encodings = &red.video_parameters().unwrap().redundant_encodings;
        assert!(encodings.contains(&"120".to_owned()));
        assert!(!encodings.contains(&"122".to_owned()));
        assert!(
            !codecs
                .iter()
                .filter(|c| c.is_named(CODEC_NAME_ULPFEC))
                .any(|c| encodings.contains(&c.default_pt))
        );
    }

    #[test]
    fn test_failed_offer_leaves_session_untouched() -> Result<()> {
        let config = RTCConfigurationBuilder::new()
            .with_dtls_fingerprints(vec![RTCDtlsFingerprint::parse(
                "sha-256 5D:5B:AE:A4:94:63:73:1B:D8:7C:6A:6D:31:47:A8:D9:1C:0E:69:C0:8E:12:62:56:3E:D0:76:1B:74:50:DD:1F",
            )?])
            .build();
        let mut session = RTCJsepSession::new(config, Box::new(RandomUuidGenerator))?;
        session.current_local_description = Some(RTCSessionDescription {
            sdp_type: RTCSdpType::Answer,
            sdp: "not sdp".to_owned(),
            parsed: None,
        });

        let options = RTCOfferOptions {
            ice_restart: true,
            offer_to_receive_audio: Some(1),
            offer_to_receive_video: Some(2),
        };
        assert!(matches!(
            session.create_offer(options),
            Err(Error::ErrSdpParse(_))
        ));
        assert!(session.transceivers.is_empty());
        assert!(session.pending_ice_credentials.is_none());
        assert!(session.last_offer.is_none());

        Ok(())
    }
}
