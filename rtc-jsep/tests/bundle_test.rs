mod common;

use anyhow::Result;
use jsep::codec::RTCMediaKind;
use jsep::rtp_transceiver::RTCRtpTransceiverInit;
use jsep::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use jsep::session::configuration::bundle_policy::RTCBundlePolicy;
use jsep::session::sdp::sdp_type::RTCSdpType;
use jsep::shared::error::Error;

use common::*;

#[test]
fn test_max_bundle_offers_bundle_only() -> Result<()> {
    init_logger();

    let mut a = new_session_with_policy("a", RTCBundlePolicy::MaxBundle)?;
    let mut b = new_session("b")?;
    a.add_track(RTCMediaKind::Audio, vec!["stream".to_owned()], "mic")?;
    a.add_track(RTCMediaKind::Video, vec!["stream".to_owned()], "cam")?;

    let (offer, answer) = negotiate(&mut a, &mut b)?;

    let offer = parse_sdp(&offer)?;
    assert_eq!(port(&offer, 0), 9);
    assert!(!has_media_attribute(&offer, 0, "bundle-only"));
    assert_eq!(port(&offer, 1), 0);
    assert!(has_media_attribute(&offer, 1, "bundle-only"));
    assert!(!has_media_attribute(&offer, 1, "ice-ufrag"));
    assert!(!has_media_attribute(&offer, 1, "setup"));
    assert_eq!(session_attributes(&offer, "group"), vec!["BUNDLE 0 1"]);

    let answer = parse_sdp(&answer)?;
    assert_eq!(port(&answer, 1), 9);
    assert!(!has_media_attribute(&answer, 1, "bundle-only"));
    assert_eq!(session_attributes(&answer, "group"), vec!["BUNDLE 0 1"]);

    let (audio, video) = (&a.get_transceivers()[0], &a.get_transceivers()[1]);
    assert_eq!(video.transport_id(), audio.transport_id());
    assert_eq!(video.bundle_level(), Some(0));
    assert_eq!(
        video.current_direction(),
        Some(RTCRtpTransceiverDirection::Sendonly)
    );
    assert_eq!(a.transports().len(), 1);
    assert_eq!(b.transports().len(), 1);

    // negotiated sections are not made bundle-only again
    let offer = parse_sdp(&a.create_offer(Default::default())?)?;
    assert!(!has_media_attribute(&offer, 1, "bundle-only"));
    assert_eq!(port(&offer, 1), 9);

    Ok(())
}

#[test]
fn test_balanced_bundles_second_section_of_a_kind() -> Result<()> {
    init_logger();

    let mut a = new_session("a")?;
    a.add_transceiver_from_kind(RTCMediaKind::Audio, RTCRtpTransceiverInit::default())?;
    a.add_transceiver_from_kind(RTCMediaKind::Audio, RTCRtpTransceiverInit::default())?;
    a.add_transceiver_from_kind(RTCMediaKind::Video, RTCRtpTransceiverInit::default())?;

    let offer = parse_sdp(&a.create_offer(Default::default())?)?;
    let bundle_only: Vec<bool> = (0..3)
        .map(|level| has_media_attribute(&offer, level, "bundle-only"))
        .collect();
    assert_eq!(bundle_only, vec![false, true, false]);

    Ok(())
}

#[test]
fn test_max_compat_never_bundle_only() -> Result<()> {
    init_logger();

    let mut a = new_session_with_policy("a", RTCBundlePolicy::MaxCompat)?;
    let mut b = new_session("b")?;
    a.add_transceiver_from_kind(RTCMediaKind::Audio, RTCRtpTransceiverInit::default())?;
    a.add_transceiver_from_kind(RTCMediaKind::Audio, RTCRtpTransceiverInit::default())?;

    let (offer, _) = negotiate(&mut a, &mut b)?;
    let offer = parse_sdp(&offer)?;
    assert!(!has_media_attribute(&offer, 1, "bundle-only"));
    assert_eq!(session_attributes(&offer, "group"), vec!["BUNDLE 0 1"]);
    // the answer bundled them anyway
    assert_eq!(a.transports().len(), 1);

    Ok(())
}

#[test]
fn test_stop_and_recycle() -> Result<()> {
    init_logger();

    let mut a = new_session("a")?;
    let mut b = new_session("b")?;
    let audio_uuid = a.add_track(RTCMediaKind::Audio, vec!["stream".to_owned()], "mic")?;
    a.add_transceiver_from_kind(RTCMediaKind::Video, RTCRtpTransceiverInit::default())?;
    negotiate(&mut a, &mut b)?;

    let mut audio = a.get_transceiver(&audio_uuid).cloned().expect("audio");
    audio.stop();
    a.set_transceiver(audio)?;
    assert!(a.get_transceiver(&audio_uuid).is_some_and(|t| t.is_stopping()));
    assert!(a.check_negotiation_needed());

    let (offer, answer) = negotiate(&mut a, &mut b)?;
    for sdp in [&offer, &answer] {
        let parsed = parse_sdp(sdp)?;
        assert_eq!(port(&parsed, 0), 0);
        let md = &parsed.media_descriptions[0];
        assert_eq!(md.attributes.len(), 3);
        assert_eq!(media_attributes(&parsed, 0, "mid"), vec!["0"]);
        assert!(has_media_attribute(&parsed, 0, "inactive"));
        assert_eq!(session_attributes(&parsed, "group"), vec!["BUNDLE 1"]);
    }

    let audio = a.get_transceiver(&audio_uuid).expect("audio");
    assert!(audio.is_stopped());
    assert!(audio.can_recycle());
    assert_eq!(audio.current_direction(), Some(RTCRtpTransceiverDirection::Inactive));
    assert!(b.get_transceivers()[0].is_stopped());

    // the video section now carries the transport
    let video = &a.get_transceivers()[1];
    assert_eq!(video.bundle_level(), Some(1));
    assert_eq!(a.transports().len(), 1);
    assert!(a.get_transport(video.transport_id()).is_some());
    assert!(!a.is_negotiation_needed());
    assert!(!b.is_negotiation_needed());

    // a new track takes the disabled level with a fresh mid
    let new_uuid = a.add_track(RTCMediaKind::Audio, vec!["stream".to_owned()], "mic2")?;
    assert_ne!(new_uuid, audio_uuid);
    let (offer, _) = negotiate(&mut a, &mut b)?;
    let offer = parse_sdp(&offer)?;
    assert_eq!(offer.media_descriptions.len(), 2);
    assert_eq!(media_attributes(&offer, 0, "mid"), vec!["2"]);
    assert_ne!(port(&offer, 0), 0);

    let recycled = a.get_transceiver(&new_uuid).expect("recycled");
    assert_eq!(recycled.level(), Some(0));
    assert_eq!(
        recycled.current_direction(),
        Some(RTCRtpTransceiverDirection::Sendonly)
    );
    assert_eq!(a.get_transceiver(&audio_uuid).and_then(|t| t.level()), None);

    assert_eq!(b.get_transceivers().len(), 3);
    let remote = b
        .get_transceivers()
        .iter()
        .find(|t| t.mid() == Some("2"))
        .expect("remote");
    assert_eq!(remote.level(), Some(0));
    assert_eq!(remote.recv_track().track_id, "mic2");

    Ok(())
}

#[test]
fn test_unsupported_codecs_reject_section() -> Result<()> {
    init_logger();

    let mut a = new_session("a")?;
    let mut b = new_session("b")?;
    b.codecs_mut().retain(|c| c.kind() != RTCMediaKind::Video);
    a.add_track(RTCMediaKind::Audio, vec![], "mic")?;
    a.add_track(RTCMediaKind::Video, vec![], "cam")?;

    let (_, answer) = negotiate(&mut a, &mut b)?;
    let answer = parse_sdp(&answer)?;
    assert_eq!(port(&answer, 1), 0);
    assert_eq!(session_attributes(&answer, "group"), vec!["BUNDLE 0"]);

    let video = &a.get_transceivers()[1];
    assert!(video.is_stopped());
    assert_eq!(video.current_direction(), Some(RTCRtpTransceiverDirection::Inactive));
    assert!(!a.is_negotiation_needed());

    Ok(())
}

#[test]
fn test_remote_offer_cannot_move_a_mid() -> Result<()> {
    init_logger();

    let mut a = new_session("a")?;
    let mut b = new_session("b")?;
    a.add_track(RTCMediaKind::Audio, vec![], "mic")?;
    a.add_track(RTCMediaKind::Video, vec![], "cam")?;
    negotiate(&mut a, &mut b)?;

    let offer = a.create_offer(Default::default())?;
    let swapped = offer
        .replace("a=mid:0", "a=mid:tmp")
        .replace("a=mid:1", "a=mid:0")
        .replace("a=mid:tmp", "a=mid:1")
        .replace("BUNDLE 0 1", "BUNDLE 1 0");
    assert_eq!(
        b.set_remote_description(RTCSdpType::Offer, &swapped),
        Err(Error::ErrMidChanged(0))
    );

    let truncated = offer
        .split("m=video")
        .next()
        .unwrap_or_default()
        .replace("BUNDLE 0 1", "BUNDLE 0");
    assert_eq!(
        b.set_remote_description(RTCSdpType::Offer, &truncated),
        Err(Error::ErrMsectionRemoved(1, 2))
    );

    Ok(())
}

#[test]
fn test_answerer_stop_waits_for_its_own_offer() -> Result<()> {
    init_logger();

    let mut a = new_session("a")?;
    let mut b = new_session("b")?;
    a.add_track(RTCMediaKind::Audio, vec!["stream".to_owned()], "mic")?;
    negotiate(&mut a, &mut b)?;

    let mut stopping = b.get_transceivers()[0].clone();
    stopping.stop();
    b.set_transceiver(stopping)?;

    // answering a re-offer does not reject the section
    let (_, answer) = negotiate(&mut a, &mut b)?;
    let answer = parse_sdp(&answer)?;
    assert_eq!(port(&answer, 0), 9);
    assert!(has_media_attribute(&answer, 0, "recvonly"));
    assert!(b.get_transceivers()[0].is_stopping());
    assert!(!b.get_transceivers()[0].is_stopped());
    assert!(!a.get_transceivers()[0].is_stopped());
    assert!(b.check_negotiation_needed());

    // the stopping side rejects it once it makes the offer
    let (offer, answer) = negotiate(&mut b, &mut a)?;
    for sdp in [&offer, &answer] {
        let parsed = parse_sdp(sdp)?;
        assert_eq!(port(&parsed, 0), 0);
        assert!(has_media_attribute(&parsed, 0, "inactive"));
    }
    assert!(b.get_transceivers()[0].is_stopped());
    assert!(a.get_transceivers()[0].is_stopped());
    assert!(!b.check_negotiation_needed());

    Ok(())
}
