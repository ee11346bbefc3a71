//! SDP plumbing shared by offer and answer generation and by remote
//! description validation.
//!
//! [`ParsedSdp`] is a typed, read-only view over a
//! [`SessionDescription`]: one [`MediaSection`] per m-line with the
//! session level fallbacks (ICE credentials, fingerprints, setup) already
//! applied. The builder functions at the bottom of this module produce the
//! m-sections this crate emits.

pub mod sdp_type;
pub mod session_description;

use sdp::description::common::{Address, Attribute, Bandwidth, ConnectionInformation};
use sdp::description::media::{MediaDescription, MediaName, RangedPort};
use sdp::description::session::SessionDescription;
use shared::error::{Error, Result};

use crate::codec::fmtp::Fmtp;
use crate::codec::*;
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::negotiated_details::RTCExtmap;
use crate::rtp_transceiver::track::RTCRtpTrack;
use crate::transport::ice::{RTCDefaultCandidate, RTCIceParameters};

pub(crate) const ATTR_KEY_MID: &str = "mid";
pub(crate) const ATTR_KEY_GROUP: &str = "group";
pub(crate) const ATTR_KEY_BUNDLE_ONLY: &str = "bundle-only";
pub(crate) const ATTR_KEY_ICE_UFRAG: &str = "ice-ufrag";
pub(crate) const ATTR_KEY_ICE_PWD: &str = "ice-pwd";
pub(crate) const ATTR_KEY_ICE_OPTIONS: &str = "ice-options";
pub(crate) const ATTR_KEY_FINGERPRINT: &str = "fingerprint";
pub(crate) const ATTR_KEY_SETUP: &str = "setup";
pub(crate) const ATTR_KEY_CANDIDATE: &str = "candidate";
pub(crate) const ATTR_KEY_END_OF_CANDIDATES: &str = "end-of-candidates";
pub(crate) const ATTR_KEY_RTCP: &str = "rtcp";
pub(crate) const ATTR_KEY_RTCP_MUX: &str = "rtcp-mux";
pub(crate) const ATTR_KEY_RTCP_RSIZE: &str = "rtcp-rsize";
pub(crate) const ATTR_KEY_RTPMAP: &str = "rtpmap";
pub(crate) const ATTR_KEY_FMTP: &str = "fmtp";
pub(crate) const ATTR_KEY_RTCP_FB: &str = "rtcp-fb";
pub(crate) const ATTR_KEY_EXTMAP: &str = "extmap";
pub(crate) const ATTR_KEY_EXTMAP_ALLOW_MIXED: &str = "extmap-allow-mixed";
pub(crate) const ATTR_KEY_MSID: &str = "msid";
pub(crate) const ATTR_KEY_MSID_SEMANTIC: &str = "msid-semantic";
pub(crate) const ATTR_KEY_SSRC: &str = "ssrc";
pub(crate) const ATTR_KEY_SSRC_GROUP: &str = "ssrc-group";
pub(crate) const ATTR_KEY_RID: &str = "rid";
pub(crate) const ATTR_KEY_SIMULCAST: &str = "simulcast";
pub(crate) const ATTR_KEY_SCTP_PORT: &str = "sctp-port";
pub(crate) const ATTR_KEY_MAX_MESSAGE_SIZE: &str = "max-message-size";

pub(crate) const SEMANTIC_TOKEN_BUNDLE: &str = "BUNDLE";
pub(crate) const SEMANTIC_TOKEN_FID: &str = "FID";
pub(crate) const MSID_SEMANTIC_WMS: &str = "WMS *";
pub(crate) const BANDWIDTH_TYPE_TIAS: &str = "TIAS";

pub(crate) const MEDIA_PROTOS_RTP: [&str; 4] = ["UDP", "TLS", "RTP", "SAVPF"];
pub(crate) const MEDIA_PROTOS_DATA: [&str; 3] = ["UDP", "DTLS", "SCTP"];

/// Port of an m-line that is not disabled and has no default candidate yet.
pub(crate) const DEFAULT_PORT: u16 = 9;
pub(crate) const DEFAULT_ADDRESS: &str = "0.0.0.0";

const RID_DIRECTION_SEND: &str = "send";
const RID_DIRECTION_RECV: &str = "recv";

/// Value of the first attribute called `key`; property attributes yield `""`.
pub(crate) fn attribute<'a>(attributes: &'a [Attribute], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.key == key)
        .map(|a| a.value.as_deref().unwrap_or(""))
}

/// Values of every attribute called `key`.
pub(crate) fn attributes<'a>(
    attributes: &'a [Attribute],
    key: &'a str,
) -> impl Iterator<Item = &'a str> + 'a {
    attributes
        .iter()
        .filter(move |a| a.key == key)
        .map(|a| a.value.as_deref().unwrap_or(""))
}

pub(crate) fn has_attribute(attributes: &[Attribute], key: &str) -> bool {
    attributes.iter().any(|a| a.key == key)
}

pub(crate) fn value_attribute(key: &str, value: impl Into<String>) -> Attribute {
    Attribute {
        key: key.to_owned(),
        value: Some(value.into()),
    }
}

pub(crate) fn property_attribute(key: &str) -> Attribute {
    Attribute {
        key: key.to_owned(),
        value: None,
    }
}

/// An `a=rid` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SdpRid {
    pub(crate) id: String,
    /// Whether the side that wrote the line sends this rid.
    pub(crate) send: bool,
}

/// A typed view of one m-section.
#[derive(Debug, Clone, Default)]
pub(crate) struct MediaSection {
    pub(crate) level: usize,
    pub(crate) kind: RTCMediaKind,
    pub(crate) media: String,
    pub(crate) protos: Vec<String>,
    pub(crate) port: isize,
    pub(crate) bundle_only: bool,
    pub(crate) mid: Option<String>,
    pub(crate) direction: RTCRtpTransceiverDirection,

    pub(crate) ice_ufrag: Option<String>,
    pub(crate) ice_pwd: Option<String>,
    pub(crate) fingerprints: Vec<String>,
    pub(crate) setup: Option<String>,
    pub(crate) candidates: Vec<String>,
    pub(crate) end_of_candidates: bool,

    pub(crate) formats: Vec<SdpFormat>,
    pub(crate) extmaps: Vec<RTCExtmap>,
    pub(crate) extmap_allow_mixed: bool,
    pub(crate) rtcp_mux: bool,
    pub(crate) rtcp_rsize: bool,
    pub(crate) tias: u64,

    /// `(stream id, track id)` pairs of `a=msid`.
    pub(crate) msids: Vec<(String, String)>,
    pub(crate) ssrcs: Vec<u32>,
    /// `(primary, retransmission)` pairs of `a=ssrc-group:FID`.
    pub(crate) fid_groups: Vec<(u32, u32)>,
    pub(crate) cname: String,
    pub(crate) rids: Vec<SdpRid>,

    pub(crate) sctp_port: Option<u16>,
    pub(crate) max_message_size: Option<u32>,
}

impl MediaSection {
    /// Port zero without `a=bundle-only`.
    pub(crate) fn is_disabled(&self) -> bool {
        self.port == 0 && !self.bundle_only
    }

    pub(crate) fn ice(&self) -> Option<RTCIceParameters> {
        match (&self.ice_ufrag, &self.ice_pwd) {
            (Some(ufrag), Some(pwd)) => Some(RTCIceParameters::new(ufrag, pwd)),
            _ => None,
        }
    }

    /// Whether the section carries the attributes of a transport of its own.
    pub(crate) fn has_transport_attributes(&self) -> bool {
        self.ice_ufrag.is_some()
            && self.ice_pwd.is_some()
            && !self.fingerprints.is_empty()
            && self.setup.is_some()
    }

    pub(crate) fn mid(&self) -> &str {
        self.mid.as_deref().unwrap_or("")
    }

    pub(crate) fn format(&self, pt: &str) -> Option<&SdpFormat> {
        self.formats.iter().find(|f| f.pt == pt)
    }

    /// Formats other than retransmission.
    pub(crate) fn primary_formats(&self) -> impl Iterator<Item = &SdpFormat> {
        self.formats.iter().filter(|f| !f.is_rtx())
    }

    /// The retransmission format protecting `pt`.
    pub(crate) fn rtx_for(&self, pt: &str) -> Option<&SdpFormat> {
        self.formats
            .iter()
            .find(|f| f.is_rtx() && f.fmtp.apt() == Some(pt))
    }

    /// Rids the writer of this section sends.
    pub(crate) fn send_rids(&self) -> Vec<String> {
        self.rids
            .iter()
            .filter(|r| r.send)
            .map(|r| r.id.clone())
            .collect()
    }

    /// Rids the writer of this section receives.
    pub(crate) fn recv_rids(&self) -> Vec<String> {
        self.rids
            .iter()
            .filter(|r| !r.send)
            .map(|r| r.id.clone())
            .collect()
    }
}

/// A typed view of a whole session description.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedSdp {
    pub(crate) sections: Vec<MediaSection>,
    pub(crate) bundle_groups: Vec<Vec<String>>,
    pub(crate) extmap_allow_mixed: bool,
}

impl ParsedSdp {
    pub(crate) fn parse(desc: &SessionDescription) -> Result<ParsedSdp> {
        let session_attributes = &desc.attributes;

        let bundle_groups = attributes(session_attributes, ATTR_KEY_GROUP)
            .filter_map(|value| {
                let mut tokens = value.split_whitespace();
                if tokens.next() == Some(SEMANTIC_TOKEN_BUNDLE) {
                    Some(tokens.map(str::to_owned).collect::<Vec<String>>())
                } else {
                    None
                }
            })
            .collect();

        let sections = desc
            .media_descriptions
            .iter()
            .enumerate()
            .map(|(level, md)| parse_media_section(level, md, session_attributes))
            .collect::<Result<Vec<MediaSection>>>()?;

        Ok(ParsedSdp {
            sections,
            bundle_groups,
            extmap_allow_mixed: has_attribute(session_attributes, ATTR_KEY_EXTMAP_ALLOW_MIXED),
        })
    }

    pub(crate) fn section_by_mid(&self, mid: &str) -> Option<&MediaSection> {
        self.sections.iter().find(|s| s.mid.as_deref() == Some(mid))
    }

    /// The BUNDLE group naming `mid`, if any.
    pub(crate) fn bundle_group_of(&self, mid: &str) -> Option<&[String]> {
        self.bundle_groups
            .iter()
            .find(|group| group.iter().any(|m| m == mid))
            .map(Vec::as_slice)
    }

    /// The level of the tag section of the group `mid` belongs to.
    pub(crate) fn bundle_tag_level(&self, mid: &str) -> Option<usize> {
        let tag = self.bundle_group_of(mid)?.first()?;
        self.section_by_mid(tag).map(|s| s.level)
    }
}

fn parse_media_section(
    level: usize,
    md: &MediaDescription,
    session_attributes: &[Attribute],
) -> Result<MediaSection> {
    let attrs = &md.attributes;
    let kind = RTCMediaKind::from(md.media_name.media.as_str());

    let media_or_session = |key: &str| {
        attribute(attrs, key)
            .or_else(|| attribute(session_attributes, key))
            .map(str::to_owned)
    };

    let mut fingerprints: Vec<String> = attributes(attrs, ATTR_KEY_FINGERPRINT)
        .map(str::to_owned)
        .collect();
    if fingerprints.is_empty() {
        fingerprints = attributes(session_attributes, ATTR_KEY_FINGERPRINT)
            .map(str::to_owned)
            .collect();
    }

    let mut section = MediaSection {
        level,
        kind,
        media: md.media_name.media.clone(),
        protos: md.media_name.protos.clone(),
        port: md.media_name.port.value,
        bundle_only: has_attribute(attrs, ATTR_KEY_BUNDLE_ONLY),
        mid: attribute(attrs, ATTR_KEY_MID).map(str::to_owned),
        direction: RTCRtpTransceiverDirection::from_attributes(attrs),
        ice_ufrag: media_or_session(ATTR_KEY_ICE_UFRAG),
        ice_pwd: media_or_session(ATTR_KEY_ICE_PWD),
        fingerprints,
        setup: media_or_session(ATTR_KEY_SETUP),
        candidates: attributes(attrs, ATTR_KEY_CANDIDATE)
            .map(str::to_owned)
            .collect(),
        end_of_candidates: has_attribute(attrs, ATTR_KEY_END_OF_CANDIDATES),
        extmap_allow_mixed: has_attribute(attrs, ATTR_KEY_EXTMAP_ALLOW_MIXED)
            || has_attribute(session_attributes, ATTR_KEY_EXTMAP_ALLOW_MIXED),
        rtcp_mux: has_attribute(attrs, ATTR_KEY_RTCP_MUX),
        rtcp_rsize: has_attribute(attrs, ATTR_KEY_RTCP_RSIZE),
        tias: md
            .bandwidth
            .iter()
            .find(|b| b.bandwidth_type == BANDWIDTH_TYPE_TIAS)
            .map(|b| b.bandwidth)
            .unwrap_or(0),
        sctp_port: attribute(attrs, ATTR_KEY_SCTP_PORT).and_then(|v| v.trim().parse().ok()),
        max_message_size: attribute(attrs, ATTR_KEY_MAX_MESSAGE_SIZE)
            .and_then(|v| v.trim().parse().ok()),
        ..Default::default()
    };

    section.formats = if kind == RTCMediaKind::Application {
        md.media_name
            .formats
            .iter()
            .map(|f| SdpFormat {
                pt: f.clone(),
                name: f.clone(),
                clock_rate: 0,
                channels: 0,
                fmtp: Fmtp::default(),
                rtcp_feedback: vec![],
            })
            .collect()
    } else {
        parse_formats(kind, md)
    };

    for value in attributes(attrs, ATTR_KEY_EXTMAP) {
        section.extmaps.push(parse_extmap(value)?);
    }

    for value in attributes(attrs, ATTR_KEY_MSID) {
        let mut tokens = value.split_whitespace();
        if let Some(stream_id) = tokens.next() {
            let track_id = tokens.next().unwrap_or("").to_owned();
            section.msids.push((stream_id.to_owned(), track_id));
        }
    }

    for value in attributes(attrs, ATTR_KEY_SSRC) {
        let mut tokens = value.splitn(2, ' ');
        let Some(Ok(ssrc)) = tokens.next().map(str::parse::<u32>) else {
            continue;
        };
        if !section.ssrcs.contains(&ssrc) {
            section.ssrcs.push(ssrc);
        }
        if let Some(cname) = tokens.next().and_then(|rest| rest.strip_prefix("cname:"))
            && section.cname.is_empty()
        {
            section.cname = cname.trim().to_owned();
        }
    }

    for value in attributes(attrs, ATTR_KEY_SSRC_GROUP) {
        let tokens: Vec<&str> = value.split_whitespace().collect();
        if let [SEMANTIC_TOKEN_FID, primary, rtx] = tokens.as_slice()
            && let (Ok(primary), Ok(rtx)) = (primary.parse(), rtx.parse())
        {
            section.fid_groups.push((primary, rtx));
        }
    }

    for value in attributes(attrs, ATTR_KEY_RID) {
        let mut tokens = value.split_whitespace();
        if let (Some(id), Some(direction)) = (tokens.next(), tokens.next()) {
            section.rids.push(SdpRid {
                id: id.to_owned(),
                send: direction == RID_DIRECTION_SEND,
            });
        }
    }

    Ok(section)
}

/// Payload types 0, 8 and 9 may appear without an `a=rtpmap` (RFC 3551).
fn static_format(pt: &str) -> Option<(&'static str, u32)> {
    match pt {
        "0" => Some((CODEC_NAME_PCMU, 8000)),
        "8" => Some((CODEC_NAME_PCMA, 8000)),
        "9" => Some((CODEC_NAME_G722, 8000)),
        _ => None,
    }
}

fn parse_formats(kind: RTCMediaKind, md: &MediaDescription) -> Vec<SdpFormat> {
    let attrs = &md.attributes;
    let mut formats = vec![];

    for pt in &md.media_name.formats {
        let prefix = format!("{pt} ");
        let rtpmap = attributes(attrs, ATTR_KEY_RTPMAP).find_map(|v| v.strip_prefix(&prefix));

        let (name, clock_rate, channels) = match rtpmap {
            Some(rtpmap) => {
                let mut parts = rtpmap.trim().split('/');
                let name = parts.next().unwrap_or("").to_owned();
                let clock_rate = parts.next().and_then(|c| c.parse().ok()).unwrap_or(0);
                let channels = parts.next().and_then(|c| c.parse().ok()).unwrap_or(1);
                (name, clock_rate, channels)
            }
            None => match static_format(pt) {
                Some((name, clock_rate)) if kind == RTCMediaKind::Audio => {
                    (name.to_owned(), clock_rate, 1)
                }
                _ => continue,
            },
        };

        let fmtp = attributes(attrs, ATTR_KEY_FMTP)
            .find_map(|v| v.strip_prefix(&prefix))
            .map(Fmtp::parse)
            .unwrap_or_default();

        let rtcp_feedback = attributes(attrs, ATTR_KEY_RTCP_FB)
            .filter_map(|v| {
                let (target, fb) = v.split_once(' ')?;
                (target == pt.as_str() || target == "*").then(|| RTCPFeedback::from(fb))
            })
            .collect();

        formats.push(SdpFormat {
            pt: pt.clone(),
            name,
            clock_rate,
            channels,
            fmtp,
            rtcp_feedback,
        });
    }

    formats
}

/// Parses `<id>[/<direction>] <uri> [<attributes>]`.
fn parse_extmap(value: &str) -> Result<RTCExtmap> {
    let mut tokens = value.split_whitespace();
    let (id, uri) = match (tokens.next(), tokens.next()) {
        (Some(id), Some(uri)) => (id, uri),
        _ => return Err(Error::ErrSdpParse(format!("malformed extmap {value}"))),
    };

    let (id, direction) = match id.split_once('/') {
        Some((id, direction)) => (id, RTCRtpTransceiverDirection::from(direction)),
        None => (id, RTCRtpTransceiverDirection::Sendrecv),
    };

    let id = id
        .parse::<u16>()
        .map_err(|_| Error::ErrSdpParse(format!("malformed extmap {value}")))?;

    Ok(RTCExtmap {
        id,
        uri: uri.to_owned(),
        direction,
    })
}

/// A new session description carrying only the origin and session name.
pub(crate) fn new_session_description(
    session_id: u64,
    session_version: u64,
    session_name: &str,
) -> SessionDescription {
    let mut desc = SessionDescription::new_jsep_session_description(false);
    desc.origin.session_id = session_id;
    desc.origin.session_version = session_version;
    desc.session_name = session_name.to_owned();
    desc.attributes.clear();
    desc
}

pub(crate) fn media_protos(kind: RTCMediaKind) -> Vec<String> {
    let protos: &[&str] = if kind == RTCMediaKind::Application {
        &MEDIA_PROTOS_DATA
    } else {
        &MEDIA_PROTOS_RTP
    };
    protos.iter().map(|p| p.to_string()).collect()
}

/// An m-section with no attributes yet, on the default port and address.
pub(crate) fn new_media_description(media: &str, protos: Vec<String>) -> MediaDescription {
    MediaDescription {
        media_name: MediaName {
            media: media.to_owned(),
            port: RangedPort {
                value: DEFAULT_PORT as isize,
                range: None,
            },
            protos,
            formats: vec![],
        },
        media_title: None,
        connection_information: Some(ConnectionInformation {
            network_type: "IN".to_owned(),
            address_type: "IP4".to_owned(),
            address: Some(Address {
                address: DEFAULT_ADDRESS.to_owned(),
                ttl: None,
                range: None,
            }),
        }),
        bandwidth: vec![],
        encryption_key: None,
        attributes: vec![],
    }
}

/// A rejected or stopped m-section: port zero, one placeholder format and
/// exactly `a=mid`, `a=inactive` and one format attribute.
pub(crate) fn disabled_media_description(
    media: &str,
    protos: Vec<String>,
    mid: &str,
) -> MediaDescription {
    let mut md = new_media_description(media, protos);
    md.media_name.port.value = 0;
    md.attributes.push(value_attribute(ATTR_KEY_MID, mid));
    md.attributes
        .push(property_attribute(&RTCRtpTransceiverDirection::Inactive.to_string()));

    match RTCMediaKind::from(media) {
        RTCMediaKind::Audio => {
            md.media_name.formats.push("0".to_owned());
            md.attributes.push(value_attribute(
                ATTR_KEY_RTPMAP,
                format!("0 {CODEC_NAME_PCMU}/8000"),
            ));
        }
        RTCMediaKind::Video => {
            md.media_name.formats.push("120".to_owned());
            md.attributes.push(value_attribute(
                ATTR_KEY_RTPMAP,
                format!("120 {CODEC_NAME_VP8}/90000"),
            ));
        }
        RTCMediaKind::Application => {
            md.media_name
                .formats
                .push(CODEC_NAME_DATACHANNEL.to_owned());
            md.attributes.push(value_attribute(
                ATTR_KEY_SCTP_PORT,
                crate::media_engine::DEFAULT_SCTP_PORT.to_string(),
            ));
        }
        RTCMediaKind::Unspecified => md.media_name.formats.push("0".to_owned()),
    }

    md
}

/// ICE, DTLS and candidate lines of a section that owns its transport.
pub(crate) struct TransportAttributes<'a> {
    pub(crate) ice: &'a RTCIceParameters,
    pub(crate) setup: &'a str,
    pub(crate) candidates: &'a [String],
    pub(crate) end_of_candidates: bool,
    pub(crate) default_candidate: Option<&'a RTCDefaultCandidate>,
}

pub(crate) fn add_transport_attributes(md: &mut MediaDescription, transport: &TransportAttributes<'_>) {
    md.attributes.push(value_attribute(
        ATTR_KEY_ICE_UFRAG,
        transport.ice.username_fragment.as_str(),
    ));
    md.attributes
        .push(value_attribute(ATTR_KEY_ICE_PWD, transport.ice.password.as_str()));
    md.attributes
        .push(value_attribute(ATTR_KEY_SETUP, transport.setup));

    for candidate in transport.candidates {
        md.attributes
            .push(value_attribute(ATTR_KEY_CANDIDATE, candidate.as_str()));
    }
    if transport.end_of_candidates {
        md.attributes
            .push(property_attribute(ATTR_KEY_END_OF_CANDIDATES));
    }

    if let Some(default_candidate) = transport.default_candidate {
        apply_default_candidate(md, default_candidate);
    }
}

/// Puts `candidate` on the m= and c= lines and `a=rtcp`.
pub(crate) fn apply_default_candidate(md: &mut MediaDescription, candidate: &RTCDefaultCandidate) {
    md.media_name.port.value = candidate.port as isize;
    let address_type = if candidate.address.contains(':') {
        "IP6"
    } else {
        "IP4"
    };
    md.connection_information = Some(ConnectionInformation {
        network_type: "IN".to_owned(),
        address_type: address_type.to_owned(),
        address: Some(Address {
            address: candidate.address.clone(),
            ttl: None,
            range: None,
        }),
    });

    md.attributes.retain(|a| a.key != ATTR_KEY_RTCP);
    if candidate.rtcp_port != 0 {
        let rtcp_address = if candidate.rtcp_address.is_empty() {
            &candidate.address
        } else {
            &candidate.rtcp_address
        };
        md.attributes.push(value_attribute(
            ATTR_KEY_RTCP,
            format!("{} IN {address_type} {rtcp_address}", candidate.rtcp_port),
        ));
    }
}

/// `a=rtpmap`, `a=fmtp` and `a=rtcp-fb` lines plus retransmission formats.
pub(crate) fn add_codec_attributes(md: &mut MediaDescription, codecs: &[RTCCodecDescriptor]) {
    for codec in codecs {
        let pt = &codec.default_pt;
        md.media_name.formats.push(pt.clone());

        if codec.kind() == RTCMediaKind::Application {
            if let Some(params) = codec.application_parameters() {
                md.attributes
                    .push(value_attribute(ATTR_KEY_SCTP_PORT, params.sctp_port.to_string()));
                md.attributes.push(value_attribute(
                    ATTR_KEY_MAX_MESSAGE_SIZE,
                    params.max_message_size.to_string(),
                ));
            }
            continue;
        }

        md.attributes
            .push(value_attribute(ATTR_KEY_RTPMAP, format!("{pt} {}", codec.rtpmap())));
        if let Some(fmtp) = codec.fmtp() {
            md.attributes
                .push(value_attribute(ATTR_KEY_FMTP, format!("{pt} {fmtp}")));
        }
        for fb in codec.rtcp_feedback() {
            md.attributes
                .push(value_attribute(ATTR_KEY_RTCP_FB, format!("{pt} {fb}")));
        }

        if let Some(rtx_pt) = codec.rtx_payload_type() {
            md.media_name.formats.push(rtx_pt.to_owned());
            md.attributes.push(value_attribute(
                ATTR_KEY_RTPMAP,
                format!("{rtx_pt} {CODEC_NAME_RTX}/{}", codec.clock_rate),
            ));
            md.attributes
                .push(value_attribute(ATTR_KEY_FMTP, format!("{rtx_pt} apt={pt}")));
        }
    }
}

pub(crate) fn add_extmap_attributes(md: &mut MediaDescription, extmaps: &[RTCExtmap]) {
    for extmap in extmaps {
        let value = if extmap.direction == RTCRtpTransceiverDirection::Sendrecv
            || extmap.direction == RTCRtpTransceiverDirection::Unspecified
        {
            format!("{} {}", extmap.id, extmap.uri)
        } else {
            format!("{}/{} {}", extmap.id, extmap.direction, extmap.uri)
        };
        md.attributes.push(value_attribute(ATTR_KEY_EXTMAP, value));
    }
}

/// `a=msid`, `a=ssrc-group:FID` and `a=ssrc` lines of a sending track.
pub(crate) fn add_track_attributes(md: &mut MediaDescription, track: &RTCRtpTrack, with_rtx: bool) {
    for stream_id in &track.stream_ids {
        md.attributes.push(value_attribute(
            ATTR_KEY_MSID,
            format!("{stream_id} {}", track.track_id),
        ));
    }

    if !track.rids.is_empty() {
        return;
    }

    let rtx_ssrcs: &[u32] = if with_rtx { &track.rtx_ssrcs } else { &[] };
    for (ssrc, rtx_ssrc) in track.ssrcs.iter().zip(rtx_ssrcs) {
        md.attributes.push(value_attribute(
            ATTR_KEY_SSRC_GROUP,
            format!("{SEMANTIC_TOKEN_FID} {ssrc} {rtx_ssrc}"),
        ));
    }
    for ssrc in track.ssrcs.iter().chain(rtx_ssrcs) {
        md.attributes.push(value_attribute(
            ATTR_KEY_SSRC,
            format!("{ssrc} cname:{}", track.cname),
        ));
    }
}

/// `a=rid` and `a=simulcast` lines; `send` is from the writer's side.
pub(crate) fn add_simulcast_attributes(md: &mut MediaDescription, rids: &[String], send: bool) {
    if rids.is_empty() {
        return;
    }
    let direction = if send {
        RID_DIRECTION_SEND
    } else {
        RID_DIRECTION_RECV
    };
    for rid in rids {
        md.attributes
            .push(value_attribute(ATTR_KEY_RID, format!("{rid} {direction}")));
    }
    md.attributes.push(value_attribute(
        ATTR_KEY_SIMULCAST,
        format!("{direction} {}", rids.join(";")),
    ));
}

pub(crate) fn add_bandwidth(md: &mut MediaDescription, bandwidth_type: &str, bandwidth: u64) {
    md.bandwidth.push(Bandwidth {
        experimental: false,
        bandwidth_type: bandwidth_type.to_owned(),
        bandwidth,
    });
}
