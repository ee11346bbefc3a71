//! The session's codec catalogue and RTP header-extension registry.
//!
//! A [`MediaEngine`] is handed to the session through
//! [`RTCConfigurationBuilder::with_media_engine`](crate::session::configuration::RTCConfigurationBuilder::with_media_engine).
//! The session keeps its own copy, which the application may keep editing
//! between negotiations (enable or disable codecs, reassign payload types,
//! mark a codec strongly preferred).
//!
//! # Examples
//!
//! ```
//! use jsep::media_engine::MediaEngine;
//!
//! # fn example() -> shared::error::Result<()> {
//! let mut media_engine = MediaEngine::default();
//! media_engine.register_default_codecs()?;
//! media_engine.register_default_header_extensions()?;
//!
//! // Negotiate opus on payload type 111 instead of 109.
//! media_engine.set_payload_type("opus", "111")?;
//! # Ok(())
//! # }
//! ```

use std::ops::RangeInclusive;

use log::trace;
use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};

use crate::codec::fmtp::H264_DEFAULT_PROFILE_LEVEL_ID;
use crate::codec::*;
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;

pub const SDES_MID_URI: &str = "urn:ietf:params:rtp-hdrext:sdes:mid";
pub const SSRC_AUDIO_LEVEL_URI: &str = "urn:ietf:params:rtp-hdrext:ssrc-audio-level";
pub const CSRC_AUDIO_LEVEL_URI: &str = "urn:ietf:params:rtp-hdrext:csrc-audio-level";
pub const ABS_SEND_TIME_URI: &str = "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time";
pub const TOFFSET_URI: &str = "urn:ietf:params:rtp-hdrext:toffset";
pub const TRANSPORT_CC_URI: &str =
    "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01";

/// One-byte header extension ids (RFC 8285 §4.2). 15 is reserved.
pub const VALID_EXT_IDS: RangeInclusive<u16> = 1..=14;

pub const DEFAULT_SCTP_PORT: u16 = 5000;
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 1073741823;

pub const TYPE_RTCP_FB_NACK: &str = "nack";
pub const TYPE_RTCP_FB_CCM: &str = "ccm";
pub const TYPE_RTCP_FB_GOOG_REMB: &str = "goog-remb";
pub const TYPE_RTCP_FB_TRANSPORT_CC: &str = "transport-cc";

/// A registered RTP header extension and the default id it is offered with.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEngineHeaderExtension {
    pub uri: String,
    pub id: u16,
    pub is_audio: bool,
    pub is_video: bool,
    pub allowed_direction: RTCRtpTransceiverDirection,
}

impl MediaEngineHeaderExtension {
    pub fn is_matching_kind(&self, kind: RTCMediaKind) -> bool {
        match kind {
            RTCMediaKind::Audio => self.is_audio,
            RTCMediaKind::Video => self.is_video,
            _ => false,
        }
    }

    pub fn is_matching_direction(&self, dir: RTCRtpTransceiverDirection) -> bool {
        self.allowed_direction.has_send() && dir.has_send()
            || self.allowed_direction.has_recv() && dir.has_recv()
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct MediaEngine {
    pub(crate) codecs: Vec<RTCCodecDescriptor>,
    pub(crate) header_extensions: Vec<MediaEngineHeaderExtension>,
}

fn default_video_feedback() -> Vec<RTCPFeedback> {
    vec![
        RTCPFeedback::new(TYPE_RTCP_FB_NACK, ""),
        RTCPFeedback::new(TYPE_RTCP_FB_NACK, "pli"),
        RTCPFeedback::new(TYPE_RTCP_FB_CCM, "fir"),
        RTCPFeedback::new(TYPE_RTCP_FB_GOOG_REMB, ""),
        RTCPFeedback::new(TYPE_RTCP_FB_TRANSPORT_CC, ""),
    ]
}

fn default_video_codec(name: &str, pt: &str, rtx_pt: &str) -> RTCCodecDescriptor {
    let mut codec = RTCCodecDescriptor::video(name, pt);
    if let Some(v) = codec.video_parameters_mut() {
        v.rtcp_feedback = default_video_feedback();
        v.max_fs = 12288;
        v.max_fr = 60;
    }
    codec.enable_rtx(rtx_pt);
    codec
}

fn default_h264_codec(pt: &str, rtx_pt: &str, packetization_mode: u32) -> RTCCodecDescriptor {
    let mut codec = default_video_codec(CODEC_NAME_H264, pt, rtx_pt);
    if let Some(v) = codec.video_parameters_mut() {
        v.profile_level_id = H264_DEFAULT_PROFILE_LEVEL_ID;
        v.level_asymmetry_allowed = true;
        v.packetization_mode = packetization_mode;
        v.max_fs = 0;
        v.max_fr = 0;
    }
    codec
}

/// Payload types are decimal numbers in [0, 127].
pub(crate) fn validate_payload_type(pt: &str) -> Result<u8> {
    match pt.parse::<u8>() {
        Ok(value) if value <= 127 && !pt.starts_with('+') => Ok(value),
        _ => Err(Error::ErrInvalidPayloadType(pt.to_owned())),
    }
}

impl MediaEngine {
    /// Replaces the catalogue with the default audio, video and data channel codecs.
    pub fn register_default_codecs(&mut self) -> Result<()> {
        let mut opus = RTCCodecDescriptor::audio(CODEC_NAME_OPUS, "109", 48000, 2);
        if let Some(a) = opus.audio_parameters_mut() {
            a.max_playback_rate = 48000;
            a.stereo = true;
            a.use_in_band_fec = true;
        }

        let mut telephone_event =
            RTCCodecDescriptor::audio(CODEC_NAME_TELEPHONE_EVENT, "101", 8000, 1);
        if let Some(a) = telephone_event.audio_parameters_mut() {
            a.dtmf_events = "0-15".to_owned();
        }

        self.codecs = vec![
            opus,
            RTCCodecDescriptor::audio(CODEC_NAME_G722, "9", 8000, 1),
            RTCCodecDescriptor::audio(CODEC_NAME_PCMU, "0", 8000, 1),
            RTCCodecDescriptor::audio(CODEC_NAME_PCMA, "8", 8000, 1),
            telephone_event,
            default_video_codec(CODEC_NAME_VP8, "120", "124"),
            default_video_codec(CODEC_NAME_VP9, "121", "125"),
            default_h264_codec("126", "127", 1),
            default_h264_codec("97", "98", 0),
            RTCCodecDescriptor::video(CODEC_NAME_RED, "122"),
            RTCCodecDescriptor::video(CODEC_NAME_ULPFEC, "123"),
            RTCCodecDescriptor::application(
                CODEC_NAME_DATACHANNEL,
                DEFAULT_SCTP_PORT,
                DEFAULT_MAX_MESSAGE_SIZE,
            ),
        ];

        Ok(())
    }

    /// Registers the header extensions offered by default.
    pub fn register_default_header_extensions(&mut self) -> Result<()> {
        use RTCRtpTransceiverDirection::*;

        for (uri, kind, direction) in [
            (SSRC_AUDIO_LEVEL_URI, RTCMediaKind::Audio, Sendrecv),
            (CSRC_AUDIO_LEVEL_URI, RTCMediaKind::Audio, Recvonly),
            (SDES_MID_URI, RTCMediaKind::Audio, Sendrecv),
            (SDES_MID_URI, RTCMediaKind::Video, Sendrecv),
            (ABS_SEND_TIME_URI, RTCMediaKind::Video, Sendrecv),
            (TOFFSET_URI, RTCMediaKind::Video, Sendrecv),
            (TRANSPORT_CC_URI, RTCMediaKind::Video, Sendrecv),
        ] {
            self.register_header_extension(uri, kind, direction)?;
        }

        Ok(())
    }

    /// Adds a codec, or replaces the codec with the same name and payload type.
    pub fn register_codec(&mut self, codec: RTCCodecDescriptor) -> Result<()> {
        if codec.kind() != RTCMediaKind::Application {
            validate_payload_type(&codec.default_pt)?;
        }

        match self
            .codecs
            .iter_mut()
            .find(|c| c.is_named(&codec.name) && c.default_pt == codec.default_pt)
        {
            Some(existing) => *existing = codec,
            None => self.codecs.push(codec),
        }
        Ok(())
    }

    /// Registers `uri` for `kind` and returns the id it will be offered with.
    ///
    /// An already registered uri keeps its id and gains the new kind.
    pub fn register_header_extension(
        &mut self,
        uri: &str,
        kind: RTCMediaKind,
        allowed_direction: RTCRtpTransceiverDirection,
    ) -> Result<u16> {
        if allowed_direction == RTCRtpTransceiverDirection::Unspecified
            || allowed_direction == RTCRtpTransceiverDirection::Inactive
        {
            return Err(Error::ErrRegisterHeaderExtensionInvalidDirection);
        }
        if kind != RTCMediaKind::Audio && kind != RTCMediaKind::Video {
            return Err(Error::ErrAddTrackInvalidKind(kind.to_string()));
        }

        let index = match self.header_extensions.iter().position(|ext| ext.uri == uri) {
            Some(index) => index,
            None => {
                let id = VALID_EXT_IDS
                    .clone()
                    .find(|id| !self.header_extensions.iter().any(|ext| ext.id == *id))
                    .ok_or(Error::ErrRegisterHeaderExtensionNoFreeID)?;
                self.header_extensions.push(MediaEngineHeaderExtension {
                    uri: uri.to_owned(),
                    id,
                    ..Default::default()
                });
                self.header_extensions.len() - 1
            }
        };

        let ext = &mut self.header_extensions[index];
        match kind {
            RTCMediaKind::Audio => ext.is_audio = true,
            _ => ext.is_video = true,
        }
        ext.allowed_direction = allowed_direction;
        trace!("registered header extension {} with id {}", ext.uri, ext.id);

        Ok(ext.id)
    }

    pub fn header_extensions(&self) -> &[MediaEngineHeaderExtension] {
        &self.header_extensions
    }

    pub fn header_extension_id(&self, uri: &str) -> Option<u16> {
        self.header_extensions
            .iter()
            .find(|ext| ext.uri == uri)
            .map(|ext| ext.id)
    }

    pub fn codecs(&self) -> &[RTCCodecDescriptor] {
        &self.codecs
    }

    pub fn codecs_mut(&mut self) -> &mut Vec<RTCCodecDescriptor> {
        &mut self.codecs
    }

    /// Reassigns the default payload type of the first codec called `name`.
    pub fn set_payload_type(&mut self, name: &str, pt: &str) -> Result<()> {
        validate_payload_type(pt)?;
        let codec = self
            .codecs
            .iter_mut()
            .find(|c| c.is_named(name))
            .ok_or(Error::ErrCodecNotFound)?;
        codec.default_pt = pt.to_owned();
        Ok(())
    }

    /// Turns retransmission on or off for every video codec carrying an RTX payload type.
    pub fn set_rtx_enabled(&mut self, enabled: bool) {
        for codec in &mut self.codecs {
            if let Some(v) = codec.video_parameters_mut()
                && !v.rtx_payload_type.is_empty()
            {
                v.rtx_enabled = enabled;
            }
        }
    }

    /// Turns the RED and ULPFEC formats on or off.
    pub fn set_fec_enabled(&mut self, enabled: bool) {
        for codec in &mut self.codecs {
            if codec.is_named(CODEC_NAME_RED) || codec.is_named(CODEC_NAME_ULPFEC) {
                codec.enabled = enabled;
            }
        }
    }

    /// Turns telephone-event on or off.
    pub fn set_dtmf_enabled(&mut self, enabled: bool) {
        for codec in &mut self.codecs {
            if codec.is_named(CODEC_NAME_TELEPHONE_EVENT) {
                codec.enabled = enabled;
            }
        }
    }

    /// Enabled codecs of `kind`, strongly preferred ones first.
    pub(crate) fn codecs_by_kind(&self, kind: RTCMediaKind) -> Vec<&RTCCodecDescriptor> {
        let mut codecs: Vec<&RTCCodecDescriptor> = self
            .codecs
            .iter()
            .filter(|c| c.enabled && c.kind() == kind)
            .collect();
        codecs.sort_by_key(|c| !c.strongly_preferred);
        codecs
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn default_engine() -> MediaEngine {
        let mut m = MediaEngine::default();
        m.register_default_codecs().unwrap();
        m.register_default_header_extensions().unwrap();
        m
    }

    #[test]
    fn test_default_codecs() {
        let m = default_engine();

        let audio: Vec<&str> = m
            .codecs_by_kind(RTCMediaKind::Audio)
            .iter()
            .map(|c| c.default_pt.as_str())
            .collect();
        assert_eq!(audio, vec!["109", "9", "0", "8", "101"]);

        let video: Vec<&str> = m
            .codecs_by_kind(RTCMediaKind::Video)
            .iter()
            .map(|c| c.default_pt.as_str())
            .collect();
        assert_eq!(video, vec!["120", "121", "126", "97", "122", "123"]);

        let vp8 = &m.codecs_by_kind(RTCMediaKind::Video)[0];
        assert_eq!(vp8.rtx_payload_type(), Some("124"));
        assert_eq!(vp8.rtcp_feedback().len(), 5);
    }

    #[test]
    fn test_default_header_extensions() {
        let m = default_engine();

        let tests = vec![
            (SSRC_AUDIO_LEVEL_URI, Some(1)),
            (CSRC_AUDIO_LEVEL_URI, Some(2)),
            (SDES_MID_URI, Some(3)),
            (ABS_SEND_TIME_URI, Some(4)),
            (TOFFSET_URI, Some(5)),
            (TRANSPORT_CC_URI, Some(6)),
            ("urn:example:unknown", None),
        ];

        for (uri, expected_id) in tests {
            assert_eq!(m.header_extension_id(uri), expected_id, "{uri}");
        }

        let mid = &m.header_extensions()[2];
        assert!(mid.is_audio && mid.is_video);
    }

    #[test]
    fn test_register_header_extension_errors() {
        let mut m = MediaEngine::default();
        assert_eq!(
            m.register_header_extension(
                SDES_MID_URI,
                RTCMediaKind::Audio,
                RTCRtpTransceiverDirection::Inactive
            ),
            Err(Error::ErrRegisterHeaderExtensionInvalidDirection)
        );

        for i in 0..14 {
            let uri = format!("urn:example:{i}");
            assert_eq!(
                m.register_header_extension(
                    &uri,
                    RTCMediaKind::Video,
                    RTCRtpTransceiverDirection::Sendrecv
                ),
                Ok(i + 1)
            );
        }
        assert_eq!(
            m.register_header_extension(
                "urn:example:overflow",
                RTCMediaKind::Video,
                RTCRtpTransceiverDirection::Sendrecv
            ),
            Err(Error::ErrRegisterHeaderExtensionNoFreeID)
        );
    }

    #[test]
    fn test_set_payload_type() {
        let mut m = default_engine();

        let tests = vec![
            ("opus", "12", Ok(())),
            ("OPUS", "111", Ok(())),
            ("opus", "128", Err(Error::ErrInvalidPayloadType("128".to_owned()))),
            ("opus", "x", Err(Error::ErrInvalidPayloadType("x".to_owned()))),
            ("iLBC", "102", Err(Error::ErrCodecNotFound)),
        ];

        for (name, pt, expected) in tests {
            assert_eq!(m.set_payload_type(name, pt), expected, "{name} {pt}");
        }
        assert_eq!(m.codecs()[0].default_pt, "111");
    }

    #[test]
    fn test_feature_toggles() {
        let mut m = default_engine();
        m.set_rtx_enabled(false);
        m.set_fec_enabled(false);
        m.set_dtmf_enabled(false);

        assert!(
            m.codecs_by_kind(RTCMediaKind::Video)
                .iter()
                .all(|c| c.rtx_payload_type().is_none())
        );
        assert!(
            !m.codecs_by_kind(RTCMediaKind::Video)
                .iter()
                .any(|c| c.is_named(CODEC_NAME_RED) || c.is_named(CODEC_NAME_ULPFEC))
        );
        assert!(
            !m.codecs_by_kind(RTCMediaKind::Audio)
                .iter()
                .any(|c| c.is_named(CODEC_NAME_TELEPHONE_EVENT))
        );
    }

    #[test]
    fn test_strongly_preferred_first() {
        let mut m = default_engine();
        for codec in m.codecs_mut() {
            if codec.is_named(CODEC_NAME_PCMA) {
                codec.strongly_preferred = true;
            }
        }

        let audio = m.codecs_by_kind(RTCMediaKind::Audio);
        assert_eq!(audio[0].name, CODEC_NAME_PCMA);
        assert_eq!(audio[1].name, CODEC_NAME_OPUS);
    }
}
