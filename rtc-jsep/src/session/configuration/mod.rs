//! Session configuration.

pub mod bundle_policy;
pub mod offer_answer_options;

use crate::media_engine::MediaEngine;
use crate::transport::dtls::RTCDtlsFingerprint;
use crate::transport::ice::RTCIceParameters;
use bundle_policy::RTCBundlePolicy;

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";

pub const ICE_OPTION_TRICKLE: &str = "trickle";

/// Name used on the `s=` line when none is configured.
pub const DEFAULT_SESSION_NAME: &str = "-";

#[derive(Debug, Clone)]
pub struct RTCConfiguration {
    pub(crate) bundle_policy: RTCBundlePolicy,

    /// Values of the session level `a=ice-options` attribute.
    pub(crate) ice_options: Vec<String>,

    /// When unset, the session uses the default codecs and header extensions.
    pub(crate) media_engine: Option<MediaEngine>,

    /// Fingerprints of the local DTLS certificates.
    pub(crate) dtls_fingerprints: Vec<RTCDtlsFingerprint>,

    /// Initial ICE credentials; random ones are generated when unset.
    pub(crate) ice_credentials: Option<RTCIceParameters>,

    pub(crate) session_name: String,
}

impl Default for RTCConfiguration {
    fn default() -> Self {
        RTCConfigurationBuilder::new().build()
    }
}

impl RTCConfiguration {
    pub fn bundle_policy(&self) -> RTCBundlePolicy {
        self.bundle_policy
    }

    pub fn ice_options(&self) -> &[String] {
        &self.ice_options
    }

    pub fn dtls_fingerprints(&self) -> &[RTCDtlsFingerprint] {
        &self.dtls_fingerprints
    }
}

pub struct RTCConfigurationBuilder {
    pub(crate) bundle_policy: RTCBundlePolicy,
    pub(crate) ice_options: Vec<String>,
    pub(crate) media_engine: Option<MediaEngine>,
    pub(crate) dtls_fingerprints: Vec<RTCDtlsFingerprint>,
    pub(crate) ice_credentials: Option<RTCIceParameters>,
    pub(crate) session_name: String,
}

impl Default for RTCConfigurationBuilder {
    fn default() -> Self {
        RTCConfigurationBuilder {
            bundle_policy: RTCBundlePolicy::default(),
            ice_options: vec![ICE_OPTION_TRICKLE.to_owned()],
            media_engine: None,
            dtls_fingerprints: vec![],
            ice_credentials: None,
            session_name: DEFAULT_SESSION_NAME.to_owned(),
        }
    }
}

impl RTCConfigurationBuilder {
    pub fn new() -> Self {
        RTCConfigurationBuilder::default()
    }

    pub fn with_bundle_policy(mut self, bundle_policy: RTCBundlePolicy) -> Self {
        self.bundle_policy = bundle_policy;
        self
    }

    pub fn with_ice_options(mut self, ice_options: Vec<String>) -> Self {
        self.ice_options = ice_options;
        self
    }

    pub fn with_media_engine(mut self, media_engine: MediaEngine) -> Self {
        self.media_engine = Some(media_engine);
        self
    }

    pub fn with_dtls_fingerprints(mut self, dtls_fingerprints: Vec<RTCDtlsFingerprint>) -> Self {
        self.dtls_fingerprints = dtls_fingerprints;
        self
    }

    pub fn with_ice_credentials(mut self, ice_credentials: RTCIceParameters) -> Self {
        self.ice_credentials = Some(ice_credentials);
        self
    }

    pub fn with_session_name(mut self, session_name: String) -> Self {
        self.session_name = session_name;
        self
    }

    pub fn build(self) -> RTCConfiguration {
        let bundle_policy = if self.bundle_policy == RTCBundlePolicy::Unspecified {
            RTCBundlePolicy::Balanced
        } else {
            self.bundle_policy
        };

        RTCConfiguration {
            bundle_policy,
            ice_options: self.ice_options,
            media_engine: self.media_engine,
            dtls_fingerprints: self.dtls_fingerprints,
            ice_credentials: self.ice_credentials,
            session_name: self.session_name,
        }
    }
}
