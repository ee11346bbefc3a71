#![allow(dead_code)]

use std::io::Cursor;

use anyhow::Result;
use jsep::sdp::description::session::SessionDescription;
use jsep::session::RTCJsepSession;
use jsep::session::configuration::RTCConfigurationBuilder;
use jsep::session::configuration::bundle_policy::RTCBundlePolicy;
use jsep::session::configuration::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use jsep::session::sdp::sdp_type::RTCSdpType;
use jsep::transport::dtls::RTCDtlsFingerprint;
use jsep::uuid::UuidGenerator;

pub const FINGERPRINT: &str = "sha-256 5D:5B:AE:A4:94:63:73:1B:D8:7C:6A:6D:31:47:A8:D9:1C:0E:69:C0:8E:12:62:56:3E:D0:76:1B:74:50:DD:1F";

/// Hands out `<prefix>-1`, `<prefix>-2`, ... so runs are reproducible.
pub struct CountingUuidGenerator {
    prefix: String,
    next: usize,
}

impl CountingUuidGenerator {
    pub fn new(prefix: &str) -> Self {
        CountingUuidGenerator {
            prefix: prefix.to_owned(),
            next: 0,
        }
    }
}

impl UuidGenerator for CountingUuidGenerator {
    fn generate(&mut self) -> String {
        self.next += 1;
        format!("{}-{}", self.prefix, self.next)
    }
}

pub fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

pub fn new_session(name: &str) -> Result<RTCJsepSession> {
    new_session_with_policy(name, RTCBundlePolicy::Balanced)
}

pub fn new_session_with_policy(name: &str, policy: RTCBundlePolicy) -> Result<RTCJsepSession> {
    let config = RTCConfigurationBuilder::new()
        .with_bundle_policy(policy)
        .with_dtls_fingerprints(vec![RTCDtlsFingerprint::parse(FINGERPRINT)?])
        .build();
    Ok(RTCJsepSession::new(
        config,
        Box::new(CountingUuidGenerator::new(name)),
    )?)
}

/// Creates and applies an offer on `offerer` and hands it to `answerer`.
pub fn offer(offerer: &mut RTCJsepSession, answerer: &mut RTCJsepSession) -> Result<String> {
    let offer = offerer.create_offer(RTCOfferOptions::default())?;
    offerer.set_local_description(RTCSdpType::Offer, &offer)?;
    answerer.set_remote_description(RTCSdpType::Offer, &offer)?;
    Ok(offer)
}

/// Creates and applies an answer on `answerer` and hands it to `offerer`.
pub fn answer(offerer: &mut RTCJsepSession, answerer: &mut RTCJsepSession) -> Result<String> {
    let answer = answerer.create_answer(RTCAnswerOptions::default())?;
    answerer.set_local_description(RTCSdpType::Answer, &answer)?;
    offerer.set_remote_description(RTCSdpType::Answer, &answer)?;
    Ok(answer)
}

/// A full offer/answer round; returns both texts.
pub fn negotiate(
    offerer: &mut RTCJsepSession,
    answerer: &mut RTCJsepSession,
) -> Result<(String, String)> {
    let offer = offer(offerer, answerer)?;
    let answer = answer(offerer, answerer)?;
    Ok((offer, answer))
}

pub fn parse_sdp(sdp: &str) -> Result<SessionDescription> {
    let mut reader = Cursor::new(sdp.as_bytes());
    Ok(SessionDescription::unmarshal(&mut reader)?)
}

/// Values of the `a=<key>` lines of the m-section at `level`.
pub fn media_attributes(desc: &SessionDescription, level: usize, key: &str) -> Vec<String> {
    desc.media_descriptions
        .get(level)
        .map(|md| {
            md.attributes
                .iter()
                .filter(|a| a.key == key)
                .map(|a| a.value.clone().unwrap_or_default())
                .collect()
        })
        .unwrap_or_default()
}

pub fn has_media_attribute(desc: &SessionDescription, level: usize, key: &str) -> bool {
    desc.media_descriptions
        .get(level)
        .is_some_and(|md| md.attributes.iter().any(|a| a.key == key))
}

/// Values of the session level `a=<key>` lines.
pub fn session_attributes(desc: &SessionDescription, key: &str) -> Vec<String> {
    desc.attributes
        .iter()
        .filter(|a| a.key == key)
        .map(|a| a.value.clone().unwrap_or_default())
        .collect()
}

pub fn port(desc: &SessionDescription, level: usize) -> isize {
    desc.media_descriptions
        .get(level)
        .map(|md| md.media_name.port.value)
        .unwrap_or(-1)
}

pub fn formats(desc: &SessionDescription, level: usize) -> Vec<String> {
    desc.media_descriptions
        .get(level)
        .map(|md| md.media_name.formats.clone())
        .unwrap_or_default()
}

/// Replaces every line starting with `prefix` by `line` (or drops it when
/// `line` is empty).
pub fn replace_lines(sdp: &str, prefix: &str, line: &str) -> String {
    sdp.split("\r\n")
        .filter_map(|l| {
            if l.starts_with(prefix) {
                (!line.is_empty()).then(|| line.to_owned())
            } else {
                Some(l.to_owned())
            }
        })
        .collect::<Vec<_>>()
        .join("\r\n")
}
