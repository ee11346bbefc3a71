use std::fmt::Display;
use std::io::Cursor;

use sdp::description::session::SessionDescription;
use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};

use super::sdp_type::RTCSdpType;

/// A typed SDP blob as exchanged with the remote side.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct RTCSessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: RTCSdpType,

    pub sdp: String,

    #[serde(skip)]
    pub(crate) parsed: Option<SessionDescription>,
}

impl PartialEq for RTCSessionDescription {
    fn eq(&self, other: &Self) -> bool {
        self.sdp_type == other.sdp_type && self.sdp == other.sdp
    }
}

impl Display for RTCSessionDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "type: {}, sdp:\n{}",
            self.sdp_type,
            self.sdp.replace("\r\n", "\n")
        )
    }
}

impl RTCSessionDescription {
    fn new(sdp_type: RTCSdpType, sdp: String) -> Result<RTCSessionDescription> {
        let mut desc = RTCSessionDescription {
            sdp,
            sdp_type,
            parsed: None,
        };

        let parsed = desc.unmarshal()?;
        desc.parsed = Some(parsed);

        Ok(desc)
    }

    pub fn offer(sdp: String) -> Result<RTCSessionDescription> {
        Self::new(RTCSdpType::Offer, sdp)
    }

    pub fn pranswer(sdp: String) -> Result<RTCSessionDescription> {
        Self::new(RTCSdpType::Pranswer, sdp)
    }

    pub fn answer(sdp: String) -> Result<RTCSessionDescription> {
        Self::new(RTCSdpType::Answer, sdp)
    }

    pub(crate) fn from_parsed(
        sdp_type: RTCSdpType,
        parsed: SessionDescription,
    ) -> RTCSessionDescription {
        RTCSessionDescription {
            sdp_type,
            sdp: parsed.marshal(),
            parsed: Some(parsed),
        }
    }

    pub fn unmarshal(&self) -> Result<SessionDescription> {
        let mut reader = Cursor::new(self.sdp.as_bytes());
        SessionDescription::unmarshal(&mut reader).map_err(|e| Error::ErrSdpParse(e.to_string()))
    }

    /// The parsed form, parsing on demand when it was not cached.
    pub(crate) fn parsed(&self) -> Result<SessionDescription> {
        match &self.parsed {
            Some(parsed) => Ok(parsed.clone()),
            None => self.unmarshal(),
        }
    }

    /// Re-serializes after `parsed` has been edited in place.
    pub(crate) fn remarshal(&mut self) {
        if let Some(parsed) = &self.parsed {
            self.sdp = parsed.marshal();
        }
    }
}
