//! # JSEP - Sans-I/O Offer/Answer Negotiation
//!
//! A Rust implementation of the JavaScript Session Establishment Protocol
//! ([RFC 8829](https://www.rfc-editor.org/rfc/rfc8829)): the engine that turns a list of
//! media transceivers into SDP offers and answers and reconciles local and remote
//! descriptions into negotiated codecs, directions and transports.
//!
//! The crate does no I/O. SDP text goes in and out of [`session::RTCJsepSession`];
//! ICE candidates are fed in by the application as they are gathered or received.
//!
//! ## Quick Start
//!
//! ```no_run
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
//! let config = RTCConfigurationBuilder::new()
//!     .with_dtls_fingerprints(vec![RTCDtlsFingerprint::parse(
//!         "sha-256 AB:CD:EF:01:23:45:67:89",
//!     )?])
//!     .build();
//! let mut session = RTCJsepSession::new(config, Box::new(RandomUuidGenerator))?;
//!
//! // 1. Describe what to send and receive
//! session.add_track(RTCMediaKind::Audio, vec!["stream".to_owned()], "mic")?;
//! session.add_transceiver_from_kind(RTCMediaKind::Video, RTCRtpTransceiverInit::default())?;
//!
//! // 2. Offer, apply it locally and ship it to the remote side
//! let offer = session.create_offer(RTCOfferOptions::default())?;
//! session.set_local_description(RTCSdpType::Offer, &offer)?;
//!
//! // 3. Apply the remote answer
//! # let answer = String::new();
//! session.set_remote_description(RTCSdpType::Answer, &answer)?;
//!
//! // 4. Negotiated state is on the transceivers and transports
//! for transceiver in session.get_transceivers() {
//!     println!("{:?} {:?}", transceiver.mid(), transceiver.current_direction());
//! }
//! # let _ = RTCAnswerOptions::default();
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! ### [`session`]
//!
//! - **[`RTCJsepSession`](session::RTCJsepSession)** - one side of a negotiation
//! - **[`configuration`](session::configuration)** - bundle policy, fingerprints, offer/answer options
//! - **[`sdp`](session::sdp)** - SDP types and session descriptions
//! - **[`signaling_state`](session::signaling_state)** - the offer/answer state machine
//!
//! ### [`rtp_transceiver`]
//!
//! - **[`RTCRtpTransceiver`](rtp_transceiver::RTCRtpTransceiver)** - an m-section's worth of media
//! - **[`RTCRtpTrack`](rtp_transceiver::track::RTCRtpTrack)** - send and receive sides
//! - **[`RTCNegotiatedDetails`](rtp_transceiver::negotiated_details::RTCNegotiatedDetails)** - what an exchange agreed on
//!
//! ### [`codec`] and [`media_engine`]
//!
//! Codec descriptors, fmtp handling and the session's codec and header extension catalogue.
//!
//! ### [`transport`]
//!
//! ICE credentials and candidates, DTLS role and fingerprints per transport.
//!
//! ## Specification Compliance
//!
//! - [RFC 8829](https://www.rfc-editor.org/rfc/rfc8829) - JSEP
//! - [RFC 8843](https://www.rfc-editor.org/rfc/rfc8843) - BUNDLE
//! - [RFC 8285](https://www.rfc-editor.org/rfc/rfc8285) - RTP header extensions
//! - [RFC 8122](https://www.rfc-editor.org/rfc/rfc8122) - DTLS fingerprints and setup
//! - [RFC 8838](https://www.rfc-editor.org/rfc/rfc8838) - Trickle ICE

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub use {sdp, shared};

pub mod codec;
pub mod media_engine;
pub mod rtp_transceiver;
pub mod session;
pub mod transport;
pub mod uuid;
