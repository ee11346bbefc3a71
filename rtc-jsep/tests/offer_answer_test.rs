mod common;

use anyhow::Result;
use jsep::codec::{CODEC_NAME_DATACHANNEL, CODEC_NAME_OPUS, RTCMediaKind};
use jsep::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use jsep::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use jsep::session::RTCDescriptionSelector;
use jsep::session::configuration::RTCConfigurationBuilder;
use jsep::session::configuration::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use jsep::session::sdp::sdp_type::RTCSdpType;
use jsep::session::signaling_state::RTCSignalingState;
use jsep::session::RTCJsepSession;
use jsep::shared::error::{Error, ErrorKind};
use jsep::transport::dtls::RTCDtlsRole;

use common::*;

fn audio_video_pair() -> Result<(RTCJsepSession, RTCJsepSession)> {
    let mut offerer = new_session("a")?;
    let answerer = new_session("b")?;
    offerer.add_track(RTCMediaKind::Audio, vec!["stream".to_owned()], "mic")?;
    offerer.add_transceiver_from_kind(RTCMediaKind::Video, RTCRtpTransceiverInit::default())?;
    Ok((offerer, answerer))
}

#[test]
fn test_audio_video_offer_answer() -> Result<()> {
    init_logger();

    let (mut a, mut b) = audio_video_pair()?;
    let offer = offer(&mut a, &mut b)?;
    assert_eq!(a.signaling_state(), RTCSignalingState::HaveLocalOffer);
    assert_eq!(b.signaling_state(), RTCSignalingState::HaveRemoteOffer);
    assert!(a.is_offerer());
    assert!(!b.is_offerer());

    let parsed_offer = parse_sdp(&offer)?;
    assert_eq!(parsed_offer.media_descriptions.len(), 2);
    assert_eq!(media_attributes(&parsed_offer, 0, "mid"), vec!["0"]);
    assert_eq!(media_attributes(&parsed_offer, 1, "mid"), vec!["1"]);
    assert!(has_media_attribute(&parsed_offer, 0, "sendrecv"));
    // video has no track to send
    assert!(has_media_attribute(&parsed_offer, 1, "recvonly"));
    assert_eq!(media_attributes(&parsed_offer, 0, "setup"), vec!["actpass"]);
    assert_eq!(media_attributes(&parsed_offer, 0, "msid"), vec!["stream mic"]);
    assert_eq!(session_attributes(&parsed_offer, "group"), vec!["BUNDLE 0 1"]);
    assert_eq!(session_attributes(&parsed_offer, "fingerprint"), vec![FINGERPRINT]);

    assert_eq!(b.get_transceivers().len(), 2);
    let remote_audio = &b.get_transceivers()[0];
    assert_eq!(remote_audio.kind(), RTCMediaKind::Audio);
    assert_eq!(remote_audio.direction(), RTCRtpTransceiverDirection::Recvonly);
    assert!(remote_audio.only_exists_because_of_set_remote());
    assert_eq!(remote_audio.recv_track().stream_ids, vec!["stream".to_owned()]);
    assert_eq!(remote_audio.recv_track().track_id, "mic");

    let answer = answer(&mut a, &mut b)?;
    assert_eq!(a.signaling_state(), RTCSignalingState::Stable);
    assert_eq!(b.signaling_state(), RTCSignalingState::Stable);

    let parsed_answer = parse_sdp(&answer)?;
    assert!(has_media_attribute(&parsed_answer, 0, "recvonly"));
    assert!(has_media_attribute(&parsed_answer, 1, "inactive"));
    assert_eq!(media_attributes(&parsed_answer, 0, "setup"), vec!["active"]);
    assert_eq!(session_attributes(&parsed_answer, "group"), vec!["BUNDLE 0 1"]);
    assert!(!has_media_attribute(&parsed_answer, 0, "msid"));

    let (audio, video) = (&a.get_transceivers()[0], &a.get_transceivers()[1]);
    assert_eq!(audio.current_direction(), Some(RTCRtpTransceiverDirection::Sendonly));
    assert_eq!(video.current_direction(), Some(RTCRtpTransceiverDirection::Inactive));
    assert!(audio.is_negotiated());
    assert!(audio.send_track().active);
    assert!(!audio.recv_track().active);
    assert_eq!(audio.mid(), Some("0"));
    assert_eq!(video.bundle_level(), Some(0));
    assert_eq!(video.transport_id(), audio.transport_id());

    let negotiated = audio.send_track().negotiated.as_ref().expect("negotiated");
    assert_eq!(negotiated.codecs()[0].name, CODEC_NAME_OPUS);
    assert_eq!(negotiated.codecs()[0].default_pt, "109");
    assert!(negotiated.rtp_rtcp_config.rtcp_mux);

    assert_eq!(a.transports().len(), 1);
    let transport = a.get_transport(audio.transport_id()).expect("transport");
    assert_eq!(transport.dtls_role, RTCDtlsRole::Server);
    assert_eq!(transport.components, 1);
    assert_eq!(transport.remote_fingerprints.len(), 1);
    assert_eq!(
        transport.remote_ice.as_ref(),
        Some(b.local_ice_credentials())
    );

    let remote_audio = &b.get_transceivers()[0];
    assert_eq!(remote_audio.current_direction(), Some(RTCRtpTransceiverDirection::Recvonly));
    let transport = b.get_transport(remote_audio.transport_id()).expect("transport");
    assert_eq!(transport.dtls_role, RTCDtlsRole::Client);
    assert_eq!(transport.components, 1);

    assert_eq!(a.get_local_description(RTCDescriptionSelector::Current), offer);
    assert_eq!(a.get_remote_description(RTCDescriptionSelector::Current), answer);
    assert!(a.get_local_description(RTCDescriptionSelector::Pending).is_empty());
    assert!(!a.is_negotiation_needed());
    assert!(!b.is_negotiation_needed());

    Ok(())
}

#[test]
fn test_renegotiation_is_stable() -> Result<()> {
    init_logger();

    let (mut a, mut b) = audio_video_pair()?;
    let (offer1, answer1) = negotiate(&mut a, &mut b)?;
    let before_a = a.get_transceivers().to_vec();
    let before_b = b.get_transceivers().to_vec();

    let (offer2, answer2) = negotiate(&mut a, &mut b)?;

    let (o1, o2) = (parse_sdp(&offer1)?, parse_sdp(&offer2)?);
    assert_eq!(o1.origin.session_id, o2.origin.session_id);
    assert_eq!(o1.origin.session_version + 1, o2.origin.session_version);
    assert_eq!(
        media_attributes(&o1, 0, "ice-ufrag"),
        media_attributes(&o2, 0, "ice-ufrag")
    );
    assert_eq!(media_attributes(&o1, 0, "extmap"), media_attributes(&o2, 0, "extmap"));
    assert_eq!(formats(&o1, 0), formats(&o2, 0));

    let (a1, a2) = (parse_sdp(&answer1)?, parse_sdp(&answer2)?);
    assert_eq!(formats(&a1, 0), formats(&a2, 0));
    assert_eq!(media_attributes(&a1, 1, "extmap"), media_attributes(&a2, 1, "extmap"));

    for (before, after) in before_a.iter().zip(a.get_transceivers()) {
        assert_eq!(before.mid(), after.mid());
        assert_eq!(before.level(), after.level());
        assert_eq!(before.current_direction(), after.current_direction());
        assert_eq!(before.transport_id(), after.transport_id());
    }
    for (before, after) in before_b.iter().zip(b.get_transceivers()) {
        assert_eq!(before.uuid(), after.uuid());
        assert_eq!(before.current_direction(), after.current_direction());
    }
    assert!(!a.check_negotiation_needed());
    assert!(!b.check_negotiation_needed());

    Ok(())
}

#[test]
fn test_answerer_adds_track_and_renegotiates() -> Result<()> {
    init_logger();

    let (mut a, mut b) = audio_video_pair()?;
    negotiate(&mut a, &mut b)?;

    let uuid = b.add_track(RTCMediaKind::Audio, vec!["back".to_owned()], "speaker")?;
    assert_eq!(uuid, b.get_transceivers()[0].uuid());
    assert_eq!(b.get_transceivers().len(), 2);
    assert!(b.check_negotiation_needed());

    let (_, answer) = negotiate(&mut b, &mut a)?;
    assert_eq!(media_attributes(&parse_sdp(&answer)?, 0, "setup"), vec!["passive"]);

    let audio = &b.get_transceivers()[0];
    let transport = b.get_transport(audio.transport_id()).expect("transport");
    assert_eq!(transport.dtls_role, RTCDtlsRole::Client);
    let transport = a
        .get_transport(a.get_transceivers()[0].transport_id())
        .expect("transport");
    assert_eq!(transport.dtls_role, RTCDtlsRole::Server);

    assert_eq!(audio.current_direction(), Some(RTCRtpTransceiverDirection::Sendrecv));
    assert_eq!(
        a.get_transceivers()[0].recv_track().stream_ids,
        vec!["back".to_owned()]
    );
    assert_eq!(a.get_transceivers()[0].recv_track().track_id, "speaker");
    assert_eq!(
        a.get_transceivers()[0].current_direction(),
        Some(RTCRtpTransceiverDirection::Sendrecv)
    );
    assert!(!a.is_negotiation_needed());
    assert!(!b.is_negotiation_needed());

    Ok(())
}

#[test]
fn test_direction_change_needs_negotiation() -> Result<()> {
    init_logger();

    let (mut a, mut b) = audio_video_pair()?;
    negotiate(&mut a, &mut b)?;

    let mut audio = a.get_transceivers()[0].clone();
    audio.set_direction(RTCRtpTransceiverDirection::Inactive);
    a.set_transceiver(audio)?;
    assert!(a.check_negotiation_needed());

    let (offer, _) = negotiate(&mut a, &mut b)?;
    assert!(has_media_attribute(&parse_sdp(&offer)?, 0, "inactive"));
    assert_eq!(
        a.get_transceivers()[0].current_direction(),
        Some(RTCRtpTransceiverDirection::Inactive)
    );
    assert!(!a.is_negotiation_needed());

    Ok(())
}

#[test]
fn test_offered_payload_types_are_mirrored() -> Result<()> {
    init_logger();

    let mut a = new_session("a")?;
    let mut b = new_session("b")?;
    a.set_payload_type(CODEC_NAME_OPUS, "12")?;
    a.add_track(RTCMediaKind::Audio, vec![], "")?;

    let (_, answer) = negotiate(&mut a, &mut b)?;
    let answer = parse_sdp(&answer)?;
    assert_eq!(formats(&answer, 0).first().map(String::as_str), Some("12"));
    assert!(
        media_attributes(&answer, 0, "rtpmap").contains(&"12 opus/48000/2".to_owned())
    );

    let sent = a.get_transceivers()[0].send_track().negotiated.as_ref();
    assert_eq!(
        sent.and_then(|n| n.codec_by_name(CODEC_NAME_OPUS))
            .map(|c| c.default_pt.as_str()),
        Some("12")
    );
    let received = b.get_transceivers()[0].recv_track().negotiated.as_ref();
    assert_eq!(
        received
            .and_then(|n| n.codec_by_name(CODEC_NAME_OPUS))
            .map(|c| c.default_pt.as_str()),
        Some("12")
    );

    Ok(())
}

#[test]
fn test_data_channel() -> Result<()> {
    init_logger();

    let mut a = new_session("a")?;
    let mut b = new_session("b")?;
    a.add_transceiver_from_kind(RTCMediaKind::Application, RTCRtpTransceiverInit::default())?;

    let (offer, answer) = negotiate(&mut a, &mut b)?;
    for sdp in [&offer, &answer] {
        let parsed = parse_sdp(sdp)?;
        assert_eq!(parsed.media_descriptions[0].media_name.media, "application");
        assert_eq!(formats(&parsed, 0), vec![CODEC_NAME_DATACHANNEL]);
        assert_eq!(media_attributes(&parsed, 0, "sctp-port"), vec!["5000"]);
        assert!(!has_media_attribute(&parsed, 0, "rtcp-mux"));
        assert!(!has_media_attribute(&parsed, 0, "extmap"));
    }

    let remote = &b.get_transceivers()[0];
    assert_eq!(remote.kind(), RTCMediaKind::Application);
    assert_eq!(remote.current_direction(), Some(RTCRtpTransceiverDirection::Sendrecv));

    let local = &a.get_transceivers()[0];
    let transport = a.get_transport(local.transport_id()).expect("transport");
    assert_eq!(transport.components, 1);

    Ok(())
}

#[test]
fn test_offer_to_receive() -> Result<()> {
    init_logger();

    let mut a = new_session("a")?;
    let mut b = new_session("b")?;
    let offer = a.create_offer(RTCOfferOptions {
        offer_to_receive_audio: Some(1),
        offer_to_receive_video: Some(2),
        ..Default::default()
    })?;
    assert_eq!(a.get_transceivers().len(), 3);
    assert!(
        a.get_transceivers()
            .iter()
            .all(|t| t.direction() == RTCRtpTransceiverDirection::Recvonly)
    );

    a.set_local_description(RTCSdpType::Offer, &offer)?;
    b.set_remote_description(RTCSdpType::Offer, &offer)?;
    answer(&mut a, &mut b)?;

    let kinds: Vec<RTCMediaKind> = b.get_transceivers().iter().map(|t| t.kind()).collect();
    assert_eq!(
        kinds,
        vec![RTCMediaKind::Audio, RTCMediaKind::Video, RTCMediaKind::Video]
    );

    Ok(())
}

#[test]
fn test_pranswer() -> Result<()> {
    init_logger();

    let (mut a, mut b) = audio_video_pair()?;
    offer(&mut a, &mut b)?;

    let answer = b.create_answer(RTCAnswerOptions::default())?;
    b.set_local_description(RTCSdpType::Pranswer, &answer)?;
    assert_eq!(b.signaling_state(), RTCSignalingState::HaveLocalPranswer);
    a.set_remote_description(RTCSdpType::Pranswer, &answer)?;
    assert_eq!(a.signaling_state(), RTCSignalingState::HaveRemotePranswer);

    let audio = &a.get_transceivers()[0];
    assert_eq!(audio.current_direction(), Some(RTCRtpTransceiverDirection::Sendonly));
    assert!(!audio.is_negotiated());
    assert!(a.get_remote_description(RTCDescriptionSelector::Current).is_empty());
    assert_eq!(a.get_remote_description(RTCDescriptionSelector::Pending), answer);

    b.set_local_description(RTCSdpType::Answer, &answer)?;
    a.set_remote_description(RTCSdpType::Answer, &answer)?;
    assert_eq!(a.signaling_state(), RTCSignalingState::Stable);
    assert_eq!(b.signaling_state(), RTCSignalingState::Stable);
    assert!(a.get_transceivers()[0].is_negotiated());
    assert_eq!(a.get_remote_description(RTCDescriptionSelector::Current), answer);

    Ok(())
}

#[test]
fn test_signaling_errors() -> Result<()> {
    init_logger();

    let (mut a, mut b) = audio_video_pair()?;

    let err = b.create_answer(RTCAnswerOptions::default()).unwrap_err();
    assert_eq!(err, Error::ErrIncorrectSignalingState);
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let err = a.set_local_description(RTCSdpType::Offer, "").unwrap_err();
    assert_eq!(err, Error::ErrNoLocalDescriptionCreated);

    let offer = a.create_offer(RTCOfferOptions::default())?;
    let err = a
        .set_local_description(RTCSdpType::Offer, &format!("{offer}a=edited\r\n"))
        .unwrap_err();
    assert_eq!(err, Error::ErrSDPDoesNotMatchOffer);
    assert_eq!(err.kind(), ErrorKind::InvalidModification);

    // empty text applies the last generated offer
    a.set_local_description(RTCSdpType::Offer, "")?;
    assert_eq!(a.get_local_description(RTCDescriptionSelector::Pending), offer);

    let err = a.set_remote_description(RTCSdpType::Offer, &offer).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(a.signaling_state(), RTCSignalingState::HaveLocalOffer);

    let unknown = RTCRtpTransceiver::new(RTCMediaKind::Audio, RTCRtpTransceiverInit::default());
    let err = a.set_transceiver(unknown).unwrap_err();
    assert_eq!(err, Error::ErrTransceiverNotFound(String::new()));
    assert_eq!(err.kind(), ErrorKind::InvalidModification);

    let mut unconfigured = RTCJsepSession::new(
        RTCConfigurationBuilder::new().build(),
        Box::new(CountingUuidGenerator::new("c")),
    )?;
    assert_eq!(
        unconfigured.create_offer(RTCOfferOptions::default()),
        Err(Error::ErrNoLocalFingerprint)
    );

    Ok(())
}

#[test]
fn test_receive_bitrate_limit() -> Result<()> {
    init_logger();

    let mut a = new_session("a")?;
    let mut b = new_session("b")?;
    let uuid = a.add_transceiver_from_kind(RTCMediaKind::Video, RTCRtpTransceiverInit::default())?;
    let mut video = a.get_transceivers()[0].clone();
    video.set_max_recv_bitrate(500_000);
    a.set_transceiver(video)?;
    assert_eq!(a.get_transceiver(&uuid).map(|t| t.max_recv_bitrate()), Some(500_000));

    let (offer, answer) = negotiate(&mut a, &mut b)?;
    let offer = parse_sdp(&offer)?;
    let bandwidth = &offer.media_descriptions[0].bandwidth;
    assert_eq!(bandwidth.len(), 1);
    assert_eq!(bandwidth[0].bandwidth_type, "TIAS");
    assert_eq!(bandwidth[0].bandwidth, 500_000);
    assert!(parse_sdp(&answer)?.media_descriptions[0].bandwidth.is_empty());

    let sent = b.get_transceivers()[0].send_track().negotiated.clone().expect("negotiated");
    assert_eq!(sent.tias, 500_000);
    let received = a.get_transceivers()[0].recv_track().negotiated.clone().expect("negotiated");
    assert_eq!(received.tias, 500_000);

    Ok(())
}
