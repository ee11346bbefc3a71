#![allow(dead_code)]

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The four error categories a JSEP operation can fail with.
///
/// They mirror the `DOMException` names used by the W3C WebRTC API.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The operation is illegal in the current signaling state.
    InvalidState,
    /// A local description does not match what was last generated.
    InvalidModification,
    /// A remote description is malformed or semantically invalid.
    InvalidAccess,
    /// A codec or media level failure.
    Operation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ErrorKind::InvalidState => write!(f, "InvalidStateError"),
            ErrorKind::InvalidModification => write!(f, "InvalidModificationError"),
            ErrorKind::InvalidAccess => write!(f, "InvalidAccessError"),
            ErrorKind::Operation => write!(f, "OperationError"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    // signaling state
    #[error("can't rollback from stable state")]
    ErrSignalingStateCannotRollback,
    #[error("invalid proposed signaling state transition: {0}")]
    ErrSignalingStateProposedTransitionInvalid(String),
    #[error("operation can not be run in current signaling state")]
    ErrIncorrectSignalingState,
    #[error("cannot {0} without a local description")]
    ErrNoLocalDescription(&'static str),
    #[error("cannot {0} without a remote description")]
    ErrNoRemoteDescription(&'static str),

    // local modification
    #[error("new sdp does not match previous offer")]
    ErrSDPDoesNotMatchOffer,
    #[error("new sdp does not match previous answer")]
    ErrSDPDoesNotMatchAnswer,
    #[error("no offer or answer has been created to apply")]
    ErrNoLocalDescriptionCreated,
    #[error("transceiver {0} cannot change its media kind")]
    ErrTransceiverKindChanged(String),
    #[error("transceiver {0} cannot be modified once removed")]
    ErrTransceiverRemoved(String),

    // remote description validation
    #[error("failed to parse sdp: {0}")]
    ErrSdpParse(String),
    #[error("sdp type {0} is not valid here")]
    ErrPeerConnSDPTypeInvalidValue(String),
    #[error("remote description is missing a=mid at level {0}")]
    ErrMissingMid(usize),
    #[error("remote description uses mid {0} more than once")]
    ErrDuplicateMid(String),
    #[error("remote description is missing ice-ufrag at level {0}")]
    ErrMissingIceUfrag(usize),
    #[error("remote description is missing ice-pwd at level {0}")]
    ErrMissingIcePwd(usize),
    #[error("remote description is missing a DTLS fingerprint at level {0}")]
    ErrMissingFingerprint(usize),
    #[error("remote description is missing a=setup at level {0}")]
    ErrMissingSetup(usize),
    #[error("remote description has an illegal a=setup:{0}")]
    ErrInvalidSetupRole(String),
    #[error("remote fingerprint uses unsupported hash algorithm {0}")]
    ErrUnsupportedFingerprintAlgorithm(String),
    #[error("remote fingerprint is malformed: {0}")]
    ErrInvalidFingerprint(String),
    #[error("remote description uses extension id {0} more than once at level {1}")]
    ErrDuplicateExtmapId(u16, usize),
    #[error("remote description attempted to remap extension id {id} from {old} to {new}")]
    ErrExtmapIdRemapped { id: u16, old: String, new: String },
    #[error("remote description attempted to move {uri} from extension id {old} to {new}")]
    ErrExtmapUriRemapped { uri: String, old: u16, new: u16 },
    #[error("remote description changed ice-ufrag but not ice-pwd at level {0}")]
    ErrIceRestartPwdUnchanged(usize),
    #[error("remote description changed ice-pwd but not ice-ufrag at level {0}")]
    ErrIceRestartUfragUnchanged(usize),
    #[error("remote answer changed ICE credentials at level {0} without an ICE restart")]
    ErrUnexpectedIceRestart(usize),
    #[error("remote offer has {0} m-sections, previous negotiation had {1}")]
    ErrMsectionRemoved(usize, usize),
    #[error("remote offer changed the mid at level {0} without disabling it first")]
    ErrMidChanged(usize),
    #[error("answer has {0} m-sections, offer had {1}")]
    ErrAnswerMsectionCountMismatch(usize, usize),
    #[error("answer does not match the offer at level {0}")]
    ErrSDPDoesNotMatchMsection(usize),
    #[error("bundle group names unknown mid {0}")]
    ErrBundleGroupUnknownMid(String),
    #[error("bundle tag {0} must not be bundle-only")]
    ErrBundleOnlyTag(String),
    #[error("answer bundles mid {0} which was not bundled in the offer")]
    ErrAnswerBundleNotOffered(String),

    // codec and media
    #[error("invalid extension id {0}")]
    ErrInvalidExtmapId(u16),
    #[error("unsupported 2-byte extmap id {0}")]
    ErrUnsupportedTwoByteExtmapId(u16),
    #[error("unsupported media format {0}")]
    ErrUnsupportedMediaFormat(String),
    #[error("codec not found")]
    ErrCodecNotFound,
    #[error("invalid payload type {0}")]
    ErrInvalidPayloadType(String),
    #[error("no DTLS fingerprint has been configured")]
    ErrNoLocalFingerprint,
    #[error("no free RTP header extension ids")]
    ErrRegisterHeaderExtensionNoFreeID,
    #[error("invalid header extension direction")]
    ErrRegisterHeaderExtensionInvalidDirection,
    #[error("no transceiver for {0}")]
    ErrNoTransceiverForCandidate(String),
    #[error("transceiver {0} does not exist")]
    ErrTransceiverNotFound(String),
    #[error("cannot add a {0} track")]
    ErrAddTrackInvalidKind(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Classifies the error into one of the four reported kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ErrSignalingStateCannotRollback
            | Error::ErrSignalingStateProposedTransitionInvalid(_)
            | Error::ErrIncorrectSignalingState
            | Error::ErrNoLocalDescription(_)
            | Error::ErrNoRemoteDescription(_) => ErrorKind::InvalidState,

            Error::ErrSDPDoesNotMatchOffer
            | Error::ErrSDPDoesNotMatchAnswer
            | Error::ErrNoLocalDescriptionCreated
            | Error::ErrTransceiverNotFound(_)
            | Error::ErrTransceiverKindChanged(_)
            | Error::ErrTransceiverRemoved(_) => ErrorKind::InvalidModification,

            Error::ErrSdpParse(_)
            | Error::ErrPeerConnSDPTypeInvalidValue(_)
            | Error::ErrMissingMid(_)
            | Error::ErrDuplicateMid(_)
            | Error::ErrMissingIceUfrag(_)
            | Error::ErrMissingIcePwd(_)
            | Error::ErrMissingFingerprint(_)
            | Error::ErrMissingSetup(_)
            | Error::ErrInvalidSetupRole(_)
            | Error::ErrUnsupportedFingerprintAlgorithm(_)
            | Error::ErrInvalidFingerprint(_)
            | Error::ErrDuplicateExtmapId(_, _)
            | Error::ErrExtmapIdRemapped { .. }
            | Error::ErrExtmapUriRemapped { .. }
            | Error::ErrIceRestartPwdUnchanged(_)
            | Error::ErrIceRestartUfragUnchanged(_)
            | Error::ErrUnexpectedIceRestart(_)
            | Error::ErrMsectionRemoved(_, _)
            | Error::ErrMidChanged(_)
            | Error::ErrAnswerMsectionCountMismatch(_, _)
            | Error::ErrSDPDoesNotMatchMsection(_)
            | Error::ErrBundleGroupUnknownMid(_)
            | Error::ErrBundleOnlyTag(_)
            | Error::ErrAnswerBundleNotOffered(_) => ErrorKind::InvalidAccess,

            Error::ErrInvalidExtmapId(_)
            | Error::ErrUnsupportedTwoByteExtmapId(_)
            | Error::ErrUnsupportedMediaFormat(_)
            | Error::ErrCodecNotFound
            | Error::ErrInvalidPayloadType(_)
            | Error::ErrNoLocalFingerprint
            | Error::ErrRegisterHeaderExtensionNoFreeID
            | Error::ErrRegisterHeaderExtensionInvalidDirection
            | Error::ErrNoTransceiverForCandidate(_)
            | Error::ErrAddTrackInvalidKind(_)
            | Error::Other(_) => ErrorKind::Operation,
        }
    }
}
