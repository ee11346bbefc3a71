use log::{debug, trace, warn};
use sdp::description::media::MediaDescription;
use shared::error::{Error, Result};

use super::RTCJsepSession;
use super::sdp::session_description::RTCSessionDescription;
use super::sdp::*;
use crate::transport::ice::{RTCDefaultCandidate, candidate_attribute_value, candidate_component};

/// Where a local candidate was put.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCIceCandidateLocation {
    /// Level of the m-section owning the candidate's transport. The
    /// candidate is written there only.
    pub level: Option<usize>,
    pub mid: Option<String>,
    /// Every `(level, mid)` using the transport, the owner included, in
    /// level order.
    pub bundled: Vec<(usize, String)>,
    /// The candidate was ignored: unknown transport, stale ufrag, duplicate
    /// or an RTCP component on a multiplexed transport.
    pub skipped: bool,
}

/// Applies `edit` to the m-sections at `levels` of `desc` and re-serializes it.
fn edit_media_descriptions<F>(desc: &mut RTCSessionDescription, levels: &[usize], mut edit: F) -> Result<()>
where
    F: FnMut(&mut MediaDescription),
{
    if desc.parsed.is_none() {
        desc.parsed = Some(desc.unmarshal()?);
    }
    if let Some(parsed) = desc.parsed.as_mut() {
        for level in levels {
            if let Some(md) = parsed.media_descriptions.get_mut(*level) {
                edit(md);
            }
        }
    }
    desc.remarshal();
    Ok(())
}

fn add_end_of_candidates(md: &mut MediaDescription) {
    if !has_attribute(&md.attributes, ATTR_KEY_END_OF_CANDIDATES) {
        md.attributes
            .push(property_attribute(ATTR_KEY_END_OF_CANDIDATES));
    }
}

impl RTCJsepSession {
    /// Records a gathered local candidate on `transport_id` and adds it to
    /// the local description.
    ///
    /// `ufrag` names the credentials the candidate was gathered for; an
    /// empty one matches the current credentials.
    pub fn add_local_ice_candidate(
        &mut self,
        candidate: &str,
        transport_id: &str,
        ufrag: &str,
    ) -> Result<RTCIceCandidateLocation> {
        if self.local_description().is_none() {
            return Err(Error::ErrNoLocalDescription("add a local ICE candidate"));
        }

        let skipped = RTCIceCandidateLocation {
            skipped: true,
            ..Default::default()
        };
        let value = candidate_attribute_value(candidate);

        let Some(transport) = self.transports.get_mut(transport_id) else {
            warn!("skipping local candidate for unknown transport {transport_id}");
            return Ok(skipped);
        };
        if !ufrag.is_empty() && ufrag != transport.local_ice.username_fragment {
            warn!("skipping local candidate for stale ufrag {ufrag}");
            return Ok(skipped);
        }
        if transport.local_candidates.contains(&value) {
            trace!("skipping duplicate local candidate {value}");
            return Ok(skipped);
        }
        if transport.components == 1 && candidate_component(&value).is_some_and(|c| c > 1) {
            trace!("skipping RTCP candidate on multiplexed transport {transport_id}");
            return Ok(skipped);
        }

        transport.local_candidates.push(value.clone());
        let level = transport.level;

        if let Some(desc) = self.local_description_mut() {
            edit_media_descriptions(desc, &[level], |md| {
                md.attributes
                    .push(value_attribute(ATTR_KEY_CANDIDATE, value.as_str()));
            })?;
        }

        let mid = self
            .transceiver_at_level(level)
            .and_then(|index| self.transceivers[index].mid.clone());
        let mut bundled: Vec<(usize, String)> = self
            .transceivers
            .iter()
            .filter(|t| t.transport_id == transport_id && !t.stopped)
            .filter_map(|t| Some((t.level?, t.mid.clone()?)))
            .collect();
        bundled.sort();
        debug!("local candidate on transport {transport_id} at level {level}");

        Ok(RTCIceCandidateLocation {
            level: Some(level),
            mid,
            bundled,
            skipped: false,
        })
    }

    /// Applies a trickled remote candidate, located by `mid` or, when the
    /// mid is empty, by `level`. An empty `candidate` ends the remote
    /// candidates of that transport.
    ///
    /// Returns the transport the candidate belongs to, or `None` when it
    /// was ignored because the transceiver is stopped or `ufrag` is stale.
    pub fn add_remote_ice_candidate(
        &mut self,
        candidate: &str,
        mid: &str,
        level: Option<usize>,
        ufrag: &str,
    ) -> Result<Option<String>> {
        if self.local_description().is_none() {
            return Err(Error::ErrNoLocalDescription("add a remote ICE candidate"));
        }
        if self.remote_description().is_none() {
            return Err(Error::ErrNoRemoteDescription("add a remote ICE candidate"));
        }

        let transceiver = if mid.is_empty() {
            level.and_then(|level| self.transceivers.iter().find(|t| t.level == Some(level)))
        } else {
            self.transceivers
                .iter()
                .find(|t| t.mid.as_deref() == Some(mid))
        };
        let Some(transceiver) = transceiver else {
            let key = if mid.is_empty() {
                level.map(|l| l.to_string()).unwrap_or_default()
            } else {
                mid.to_owned()
            };
            return Err(Error::ErrNoTransceiverForCandidate(key));
        };
        if transceiver.stopped {
            debug!("ignoring remote candidate for stopped transceiver {}", transceiver.uuid);
            return Ok(None);
        }
        let transport_id = transceiver.transport_id.clone();

        let Some(transport) = self.transports.get_mut(&transport_id) else {
            return Ok(None);
        };
        if !ufrag.is_empty()
            && transport
                .remote_ice
                .as_ref()
                .is_some_and(|ice| ice.username_fragment != ufrag)
        {
            warn!("ignoring remote candidate for stale ufrag {ufrag}");
            return Ok(None);
        }

        let value = candidate_attribute_value(candidate);
        let level = transport.level;
        if value.is_empty() {
            transport.remote_end_of_candidates = true;
            if let Some(desc) = self.remote_description_mut() {
                edit_media_descriptions(desc, &[level], add_end_of_candidates)?;
            }
            debug!("remote end of candidates on transport {transport_id}");
        } else if !transport.remote_candidates.contains(&value) {
            transport.remote_candidates.push(value.clone());
            if let Some(desc) = self.remote_description_mut() {
                edit_media_descriptions(desc, &[level], |md| {
                    md.attributes
                        .push(value_attribute(ATTR_KEY_CANDIDATE, value.as_str()));
                })?;
            }
            trace!("remote candidate on transport {transport_id} at level {level}");
        }

        Ok(Some(transport_id))
    }

    /// Sets the address the m-lines of `transport_id` advertise, in the
    /// local description and in every later one.
    pub fn update_default_candidate(
        &mut self,
        transport_id: &str,
        default_candidate: RTCDefaultCandidate,
    ) -> Result<()> {
        let Some(transport) = self.transports.get_mut(transport_id) else {
            warn!("default candidate for unknown transport {transport_id}");
            return Ok(());
        };
        transport.default_candidate = Some(default_candidate.clone());

        let levels = self.levels_of_transport(transport_id);
        if let Some(desc) = self.local_description_mut() {
            edit_media_descriptions(desc, &levels, |md| {
                if !has_attribute(&md.attributes, ATTR_KEY_BUNDLE_ONLY)
                    && md.media_name.port.value != 0
                {
                    apply_default_candidate(md, &default_candidate);
                }
            })?;
        }
        Ok(())
    }

    /// Marks local gathering on `transport_id` complete.
    pub fn end_of_local_candidates(&mut self, transport_id: &str) -> Result<()> {
        if self.local_description().is_none() {
            return Err(Error::ErrNoLocalDescription("end local ICE candidates"));
        }
        let Some(transport) = self.transports.get_mut(transport_id) else {
            warn!("end of candidates for unknown transport {transport_id}");
            return Ok(());
        };
        transport.local_end_of_candidates = true;
        let level = transport.level;

        if let Some(desc) = self.local_description_mut() {
            edit_media_descriptions(desc, &[level], add_end_of_candidates)?;
        }
        Ok(())
    }

    fn levels_of_transport(&self, transport_id: &str) -> Vec<usize> {
        self.transceivers
            .iter()
            .filter(|t| t.transport_id == transport_id)
            .filter_map(|t| t.level)
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SDP: &str = "v=0\r
o=- 1 1 IN IP4 0.0.0.0\r
s=-\r
t=0 0\r
m=audio 9 UDP/TLS/RTP/SAVPF 0\r
c=IN IP4 0.0.0.0\r
a=mid:0\r
m=video 9 UDP/TLS/RTP/SAVPF 120\r
c=IN IP4 0.0.0.0\r
a=mid:1\r
";

    #[test]
    fn test_edit_media_descriptions() {
        let mut desc = RTCSessionDescription::offer(SDP.to_owned()).unwrap();

        edit_media_descriptions(&mut desc, &[1, 5], |md| {
            md.attributes
                .push(value_attribute(ATTR_KEY_CANDIDATE, "0 1 UDP 1 192.0.2.1 5000 typ host"));
        })
        .unwrap();
        edit_media_descriptions(&mut desc, &[1], add_end_of_candidates).unwrap();
        edit_media_descriptions(&mut desc, &[1], add_end_of_candidates).unwrap();

        let parsed = desc.unmarshal().unwrap();
        let audio = &parsed.media_descriptions[0].attributes;
        let video = &parsed.media_descriptions[1].attributes;
        assert!(!has_attribute(audio, ATTR_KEY_CANDIDATE));
        assert_eq!(
            attribute(video, ATTR_KEY_CANDIDATE),
            Some("0 1 UDP 1 192.0.2.1 5000 typ host")
        );
        assert_eq!(attributes(video, ATTR_KEY_END_OF_CANDIDATES).count(), 1);
    }
}
