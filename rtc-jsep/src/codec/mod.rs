//! Codec descriptors.
//!
//! A [`RTCCodecDescriptor`] describes one payload format the session can put
//! in an m-section. Media specific knobs live in [`RTCCodecParameters`], a
//! tagged union over audio, video and application (data channel) formats.
//!
//! Descriptors serve two purposes:
//!
//! - as *prototypes* in the [`MediaEngine`](crate::media_engine::MediaEngine)
//!   catalogue, from which offers and answers are built, and
//! - as *negotiated* codecs stored on a track after an offer/answer exchange,
//!   carrying the payload types and feedback both sides agreed on.

pub mod fmtp;

use std::fmt;

use serde::{Deserialize, Serialize};
use unicase::UniCase;

use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::session::configuration::UNSPECIFIED_STR;
use fmtp::{Fmtp, h264_profile_idc};

pub const CODEC_NAME_OPUS: &str = "opus";
pub const CODEC_NAME_G722: &str = "G722";
pub const CODEC_NAME_PCMU: &str = "PCMU";
pub const CODEC_NAME_PCMA: &str = "PCMA";
pub const CODEC_NAME_TELEPHONE_EVENT: &str = "telephone-event";
pub const CODEC_NAME_VP8: &str = "VP8";
pub const CODEC_NAME_VP9: &str = "VP9";
pub const CODEC_NAME_H264: &str = "H264";
pub const CODEC_NAME_AV1: &str = "AV1";
pub const CODEC_NAME_RED: &str = "red";
pub const CODEC_NAME_ULPFEC: &str = "ulpfec";
pub const CODEC_NAME_RTX: &str = "rtx";
pub const CODEC_NAME_DATACHANNEL: &str = "webrtc-datachannel";

/// Media type of an m-section, transceiver or codec.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RTCMediaKind {
    #[default]
    Unspecified,
    #[serde(rename = "audio")]
    Audio,
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "application")]
    Application,
}

const MEDIA_KIND_AUDIO_STR: &str = "audio";
const MEDIA_KIND_VIDEO_STR: &str = "video";
const MEDIA_KIND_APPLICATION_STR: &str = "application";

impl From<&str> for RTCMediaKind {
    fn from(raw: &str) -> Self {
        match raw {
            MEDIA_KIND_AUDIO_STR => RTCMediaKind::Audio,
            MEDIA_KIND_VIDEO_STR => RTCMediaKind::Video,
            MEDIA_KIND_APPLICATION_STR => RTCMediaKind::Application,
            _ => RTCMediaKind::Unspecified,
        }
    }
}

impl fmt::Display for RTCMediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCMediaKind::Audio => MEDIA_KIND_AUDIO_STR,
            RTCMediaKind::Video => MEDIA_KIND_VIDEO_STR,
            RTCMediaKind::Application => MEDIA_KIND_APPLICATION_STR,
            RTCMediaKind::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// A single `a=rtcp-fb` mechanism, e.g. `nack pli`.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RTCPFeedback {
    /// Type of feedback, e.g. `nack`, `ccm`, `goog-remb`, `transport-cc`.
    pub typ: String,
    /// Optional sub-type, e.g. `pli` for `nack pli`.
    pub parameter: String,
}

impl RTCPFeedback {
    pub fn new(typ: &str, parameter: &str) -> Self {
        RTCPFeedback {
            typ: typ.to_owned(),
            parameter: parameter.to_owned(),
        }
    }
}

impl From<&str> for RTCPFeedback {
    fn from(raw: &str) -> Self {
        match raw.trim().split_once(' ') {
            Some((typ, parameter)) => RTCPFeedback::new(typ, parameter.trim()),
            None => RTCPFeedback::new(raw.trim(), ""),
        }
    }
}

impl fmt::Display for RTCPFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parameter.is_empty() {
            write!(f, "{}", self.typ)
        } else {
            write!(f, "{} {}", self.typ, self.parameter)
        }
    }
}

pub(crate) fn rtcp_feedback_intersection(
    a: &[RTCPFeedback],
    b: &[RTCPFeedback],
) -> Vec<RTCPFeedback> {
    a.iter().filter(|fb| b.contains(fb)).cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RTCAudioCodecParameters {
    pub channels: u16,
    /// Opus `maxplaybackrate`, zero when unset.
    pub max_playback_rate: u32,
    pub stereo: bool,
    pub use_in_band_fec: bool,
    pub use_dtx: bool,
    /// Opus `maxaveragebitrate`, zero when unset.
    pub max_average_bitrate: u32,
    /// telephone-event event list, e.g. `0-15`.
    pub dtmf_events: String,
}

impl Default for RTCAudioCodecParameters {
    fn default() -> Self {
        RTCAudioCodecParameters {
            channels: 1,
            max_playback_rate: 0,
            stereo: false,
            use_in_band_fec: false,
            use_dtx: false,
            max_average_bitrate: 0,
            dtmf_events: String::new(),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RTCVideoCodecParameters {
    pub rtcp_feedback: Vec<RTCPFeedback>,
    pub rtx_enabled: bool,
    pub rtx_payload_type: String,
    /// H.264 profile-level-id, zero for other codecs.
    pub profile_level_id: u32,
    pub packetization_mode: u32,
    pub level_asymmetry_allowed: bool,
    pub max_fs: u32,
    pub max_fr: u32,
    /// Payload types protected by a RED format.
    pub redundant_encodings: Vec<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RTCApplicationCodecParameters {
    pub sctp_port: u16,
    pub max_message_size: u32,
}

/// Media specific part of a codec descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RTCCodecParameters {
    Audio(RTCAudioCodecParameters),
    Video(RTCVideoCodecParameters),
    Application(RTCApplicationCodecParameters),
}

/// One payload format as read from a remote m-section.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SdpFormat {
    pub(crate) pt: String,
    pub(crate) name: String,
    pub(crate) clock_rate: u32,
    pub(crate) channels: u16,
    pub(crate) fmtp: Fmtp,
    pub(crate) rtcp_feedback: Vec<RTCPFeedback>,
}

impl SdpFormat {
    pub(crate) fn is_rtx(&self) -> bool {
        self.name.eq_ignore_ascii_case(CODEC_NAME_RTX)
    }

    /// Codec identity as used to pair formats of an offer and its answer.
    pub(crate) fn same_codec(&self, other: &SdpFormat) -> bool {
        if !self.name.eq_ignore_ascii_case(&other.name) || self.clock_rate != other.clock_rate {
            return false;
        }
        if self.name.eq_ignore_ascii_case(CODEC_NAME_H264) {
            return self.fmtp.h264_packetization_mode() == other.fmtp.h264_packetization_mode()
                && h264_profile_idc(self.fmtp.h264_profile_level_id())
                    == h264_profile_idc(other.fmtp.h264_profile_level_id());
        }
        self.channels == other.channels
    }
}

/// A codec the session can offer, or one it has negotiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RTCCodecDescriptor {
    /// Encoding name as it appears in `a=rtpmap`, e.g. `opus`.
    pub name: String,
    /// Payload type used when offering. After negotiation, the agreed payload type.
    pub default_pt: String,
    pub clock_rate: u32,
    pub enabled: bool,
    /// Forces this codec to the front of offers and answers.
    pub strongly_preferred: bool,
    /// Directions this codec can be used for.
    pub direction: RTCRtpTransceiverDirection,
    pub parameters: RTCCodecParameters,
}

impl RTCCodecDescriptor {
    pub fn audio(name: &str, pt: &str, clock_rate: u32, channels: u16) -> Self {
        RTCCodecDescriptor {
            name: name.to_owned(),
            default_pt: pt.to_owned(),
            clock_rate,
            enabled: true,
            strongly_preferred: false,
            direction: RTCRtpTransceiverDirection::Sendrecv,
            parameters: RTCCodecParameters::Audio(RTCAudioCodecParameters {
                channels,
                ..Default::default()
            }),
        }
    }

    pub fn video(name: &str, pt: &str) -> Self {
        RTCCodecDescriptor {
            name: name.to_owned(),
            default_pt: pt.to_owned(),
            clock_rate: 90000,
            enabled: true,
            strongly_preferred: false,
            direction: RTCRtpTransceiverDirection::Sendrecv,
            parameters: RTCCodecParameters::Video(RTCVideoCodecParameters::default()),
        }
    }

    pub fn application(name: &str, sctp_port: u16, max_message_size: u32) -> Self {
        RTCCodecDescriptor {
            name: name.to_owned(),
            default_pt: name.to_owned(),
            clock_rate: 0,
            enabled: true,
            strongly_preferred: false,
            direction: RTCRtpTransceiverDirection::Sendrecv,
            parameters: RTCCodecParameters::Application(RTCApplicationCodecParameters {
                sctp_port,
                max_message_size,
            }),
        }
    }

    pub fn kind(&self) -> RTCMediaKind {
        match self.parameters {
            RTCCodecParameters::Audio(_) => RTCMediaKind::Audio,
            RTCCodecParameters::Video(_) => RTCMediaKind::Video,
            RTCCodecParameters::Application(_) => RTCMediaKind::Application,
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        UniCase::new(self.name.as_str()) == UniCase::new(name)
    }

    /// Companion formats protect or accompany a primary codec and are never
    /// selected as the sending codec on their own.
    pub fn is_companion(&self) -> bool {
        self.is_named(CODEC_NAME_RED)
            || self.is_named(CODEC_NAME_ULPFEC)
            || self.is_named(CODEC_NAME_TELEPHONE_EVENT)
            || self.is_named(CODEC_NAME_RTX)
    }

    pub fn audio_parameters(&self) -> Option<&RTCAudioCodecParameters> {
        match &self.parameters {
            RTCCodecParameters::Audio(params) => Some(params),
            _ => None,
        }
    }

    pub fn audio_parameters_mut(&mut self) -> Option<&mut RTCAudioCodecParameters> {
        match &mut self.parameters {
            RTCCodecParameters::Audio(params) => Some(params),
            _ => None,
        }
    }

    pub fn video_parameters(&self) -> Option<&RTCVideoCodecParameters> {
        match &self.parameters {
            RTCCodecParameters::Video(params) => Some(params),
            _ => None,
        }
    }

    pub fn video_parameters_mut(&mut self) -> Option<&mut RTCVideoCodecParameters> {
        match &mut self.parameters {
            RTCCodecParameters::Video(params) => Some(params),
            _ => None,
        }
    }

    pub fn application_parameters(&self) -> Option<&RTCApplicationCodecParameters> {
        match &self.parameters {
            RTCCodecParameters::Application(params) => Some(params),
            _ => None,
        }
    }

    pub fn channels(&self) -> u16 {
        self.audio_parameters().map(|a| a.channels).unwrap_or(0)
    }

    pub fn rtcp_feedback(&self) -> &[RTCPFeedback] {
        self.video_parameters()
            .map(|v| v.rtcp_feedback.as_slice())
            .unwrap_or(&[])
    }

    /// The RTX payload type if retransmission is enabled for this codec.
    pub fn rtx_payload_type(&self) -> Option<&str> {
        match self.video_parameters() {
            Some(v) if v.rtx_enabled && !v.rtx_payload_type.is_empty() => {
                Some(v.rtx_payload_type.as_str())
            }
            _ => None,
        }
    }

    pub fn enable_rtx(&mut self, pt: &str) {
        if let Some(v) = self.video_parameters_mut() {
            v.rtx_enabled = true;
            v.rtx_payload_type = pt.to_owned();
        }
    }

    pub fn disable_rtx(&mut self) {
        if let Some(v) = self.video_parameters_mut() {
            v.rtx_enabled = false;
        }
    }

    /// The `a=rtpmap` value following the payload type.
    pub fn rtpmap(&self) -> String {
        if self.channels() > 1 {
            format!("{}/{}/{}", self.name, self.clock_rate, self.channels())
        } else {
            format!("{}/{}", self.name, self.clock_rate)
        }
    }

    /// The `a=fmtp` value following the payload type, if any.
    pub fn fmtp(&self) -> Option<String> {
        let mut params = vec![];
        match &self.parameters {
            RTCCodecParameters::Audio(a) => {
                if self.is_named(CODEC_NAME_TELEPHONE_EVENT) {
                    if !a.dtmf_events.is_empty() {
                        params.push(a.dtmf_events.clone());
                    }
                } else if self.is_named(CODEC_NAME_OPUS) {
                    if a.max_playback_rate != 0 {
                        params.push(format!("maxplaybackrate={}", a.max_playback_rate));
                    }
                    if a.stereo {
                        params.push("stereo=1".to_owned());
                    }
                    if a.use_in_band_fec {
                        params.push("useinbandfec=1".to_owned());
                    }
                    if a.use_dtx {
                        params.push("usedtx=1".to_owned());
                    }
                    if a.max_average_bitrate != 0 {
                        params.push(format!("maxaveragebitrate={}", a.max_average_bitrate));
                    }
                }
            }
            RTCCodecParameters::Video(v) => {
                if self.is_named(CODEC_NAME_H264) {
                    params.push(format!("profile-level-id={:06x}", v.profile_level_id));
                    if v.level_asymmetry_allowed {
                        params.push("level-asymmetry-allowed=1".to_owned());
                    }
                    params.push(format!("packetization-mode={}", v.packetization_mode));
                } else if self.is_named(CODEC_NAME_RED) {
                    if !v.redundant_encodings.is_empty() {
                        params.push(v.redundant_encodings.join("/"));
                    }
                } else {
                    if v.max_fs != 0 {
                        params.push(format!("max-fs={}", v.max_fs));
                    }
                    if v.max_fr != 0 {
                        params.push(format!("max-fr={}", v.max_fr));
                    }
                }
            }
            RTCCodecParameters::Application(_) => {}
        }

        if params.is_empty() {
            None
        } else {
            Some(params.join(";"))
        }
    }

    /// This descriptor as it would appear in an m-section.
    pub(crate) fn to_sdp_format(&self) -> SdpFormat {
        SdpFormat {
            pt: self.default_pt.clone(),
            name: self.name.clone(),
            clock_rate: self.clock_rate,
            channels: self.channels().max(1),
            fmtp: Fmtp::parse(&self.fmtp().unwrap_or_default()),
            rtcp_feedback: self.rtcp_feedback().to_vec(),
        }
    }

    /// Whether `other` describes the same codec, ignoring payload types.
    pub fn same_codec(&self, other: &RTCCodecDescriptor) -> bool {
        self.kind() == other.kind() && self.matches(&other.to_sdp_format())
    }

    /// Whether a remote format describes the same codec as this descriptor.
    pub(crate) fn matches(&self, format: &SdpFormat) -> bool {
        if !self.is_named(&format.name) {
            return false;
        }

        match &self.parameters {
            RTCCodecParameters::Audio(a) => {
                self.clock_rate == format.clock_rate && a.channels == format.channels
            }
            RTCCodecParameters::Video(v) => {
                if self.clock_rate != format.clock_rate {
                    return false;
                }
                if self.is_named(CODEC_NAME_H264) {
                    v.packetization_mode == format.fmtp.h264_packetization_mode()
                        && h264_profile_idc(v.profile_level_id)
                            == h264_profile_idc(format.fmtp.h264_profile_level_id())
                } else {
                    true
                }
            }
            RTCCodecParameters::Application(_) => true,
        }
    }

    /// Builds the codec agreed on with `format`, using payload type `pt`.
    pub(crate) fn negotiated(&self, pt: &str, format: &SdpFormat, rtx_pt: Option<&str>) -> Self {
        let mut codec = self.clone();
        codec.default_pt = pt.to_owned();
        codec.enabled = true;

        match &mut codec.parameters {
            RTCCodecParameters::Audio(a) => {
                if codec.name.eq_ignore_ascii_case(CODEC_NAME_TELEPHONE_EVENT) {
                    if let Some(events) = format.fmtp.bare_value() {
                        a.dtmf_events = events.to_owned();
                    }
                } else {
                    a.use_in_band_fec = a.use_in_band_fec && format.fmtp.get_flag("useinbandfec");
                    a.use_dtx = a.use_dtx && format.fmtp.get_flag("usedtx");
                    a.stereo = a.stereo && format.fmtp.get_flag("stereo");
                    if let Some(rate) = format.fmtp.get_u32("maxplaybackrate")
                        && (a.max_playback_rate == 0 || rate < a.max_playback_rate)
                    {
                        a.max_playback_rate = rate;
                    }
                }
            }
            RTCCodecParameters::Video(v) => {
                v.rtcp_feedback = rtcp_feedback_intersection(&v.rtcp_feedback, &format.rtcp_feedback);
                match rtx_pt {
                    Some(rtx_pt) => {
                        v.rtx_enabled = true;
                        v.rtx_payload_type = rtx_pt.to_owned();
                    }
                    None => {
                        v.rtx_enabled = false;
                        v.rtx_payload_type.clear();
                    }
                }
                if codec.name.eq_ignore_ascii_case(CODEC_NAME_RED) {
                    if let Some(encodings) = format.fmtp.bare_value() {
                        v.redundant_encodings =
                            encodings.split('/').map(str::to_owned).collect();
                    }
                }
            }
            RTCCodecParameters::Application(_) => {}
        }

        codec
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn format(pt: &str, name: &str, clock_rate: u32, channels: u16, fmtp: &str) -> SdpFormat {
        SdpFormat {
            pt: pt.to_owned(),
            name: name.to_owned(),
            clock_rate,
            channels,
            fmtp: Fmtp::parse(fmtp),
            rtcp_feedback: vec![],
        }
    }

    #[test]
    fn test_media_kind_string() {
        let tests = vec![
            (RTCMediaKind::Unspecified, "Unspecified"),
            (RTCMediaKind::Audio, "audio"),
            (RTCMediaKind::Video, "video"),
            (RTCMediaKind::Application, "application"),
        ];

        for (kind, expected_string) in tests {
            assert_eq!(kind.to_string(), expected_string);
            if kind != RTCMediaKind::Unspecified {
                assert_eq!(RTCMediaKind::from(expected_string), kind);
            }
        }
    }

    #[test]
    fn test_rtcp_feedback_parse() {
        let tests = vec![
            ("nack", RTCPFeedback::new("nack", "")),
            ("nack pli", RTCPFeedback::new("nack", "pli")),
            ("ccm fir", RTCPFeedback::new("ccm", "fir")),
            ("goog-remb", RTCPFeedback::new("goog-remb", "")),
        ];

        for (raw, expected) in tests {
            let fb = RTCPFeedback::from(raw);
            assert_eq!(fb, expected);
            assert_eq!(fb.to_string(), raw);
        }
    }

    #[test]
    fn test_codec_rtpmap_and_fmtp() {
        let mut opus = RTCCodecDescriptor::audio(CODEC_NAME_OPUS, "109", 48000, 2);
        if let Some(a) = opus.audio_parameters_mut() {
            a.max_playback_rate = 48000;
            a.stereo = true;
            a.use_in_band_fec = true;
        }
        assert_eq!(opus.rtpmap(), "opus/48000/2");
        assert_eq!(
            opus.fmtp().as_deref(),
            Some("maxplaybackrate=48000;stereo=1;useinbandfec=1")
        );

        let pcmu = RTCCodecDescriptor::audio(CODEC_NAME_PCMU, "0", 8000, 1);
        assert_eq!(pcmu.rtpmap(), "PCMU/8000");
        assert_eq!(pcmu.fmtp(), None);

        let mut h264 = RTCCodecDescriptor::video(CODEC_NAME_H264, "126");
        if let Some(v) = h264.video_parameters_mut() {
            v.profile_level_id = 0x42e01f;
            v.level_asymmetry_allowed = true;
            v.packetization_mode = 1;
        }
        assert_eq!(
            h264.fmtp().as_deref(),
            Some("profile-level-id=42e01f;level-asymmetry-allowed=1;packetization-mode=1")
        );
    }

    #[test]
    fn test_codec_matches() {
        let opus = RTCCodecDescriptor::audio(CODEC_NAME_OPUS, "109", 48000, 2);
        let mut h264 = RTCCodecDescriptor::video(CODEC_NAME_H264, "126");
        if let Some(v) = h264.video_parameters_mut() {
            v.profile_level_id = 0x42e01f;
            v.packetization_mode = 1;
        }

        let tests = vec![
            ("same opus", &opus, format("111", "OPUS", 48000, 2, ""), true),
            ("mono opus", &opus, format("111", "opus", 48000, 1, ""), false),
            ("other clock", &opus, format("111", "opus", 16000, 2, ""), false),
            (
                "h264 same mode",
                &h264,
                format("96", "H264", 90000, 0, "profile-level-id=42e01f;packetization-mode=1"),
                true,
            ),
            (
                "h264 higher level",
                &h264,
                format("96", "H264", 90000, 0, "profile-level-id=42e034;packetization-mode=1"),
                true,
            ),
            (
                "h264 other mode",
                &h264,
                format("97", "H264", 90000, 0, "profile-level-id=42e01f"),
                false,
            ),
            (
                "h264 other profile",
                &h264,
                format("98", "H264", 90000, 0, "profile-level-id=640c1f;packetization-mode=1"),
                false,
            ),
        ];

        for (name, codec, format, expected) in tests {
            assert_eq!(codec.matches(&format), expected, "{name}");
        }
    }

    #[test]
    fn test_codec_negotiated() {
        let mut vp8 = RTCCodecDescriptor::video(CODEC_NAME_VP8, "120");
        if let Some(v) = vp8.video_parameters_mut() {
            v.rtcp_feedback = vec![
                RTCPFeedback::new("nack", ""),
                RTCPFeedback::new("nack", "pli"),
                RTCPFeedback::new("goog-remb", ""),
            ];
        }
        vp8.enable_rtx("124");

        let mut remote = format("96", "VP8", 90000, 0, "");
        remote.rtcp_feedback = vec![RTCPFeedback::new("nack", "pli")];

        let negotiated = vp8.negotiated("96", &remote, None);
        assert_eq!(negotiated.default_pt, "96");
        assert_eq!(negotiated.rtcp_feedback(), &[RTCPFeedback::new("nack", "pli")]);
        assert_eq!(negotiated.rtx_payload_type(), None);

        let negotiated = vp8.negotiated("96", &remote, Some("97"));
        assert_eq!(negotiated.rtx_payload_type(), Some("97"));
    }
}
