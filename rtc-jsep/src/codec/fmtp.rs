use std::collections::HashMap;

use unicase::UniCase;

/// H.264 constrained baseline, level 3.1.
pub const H264_DEFAULT_PROFILE_LEVEL_ID: u32 = 0x42e01f;

/// Profile-level-id assumed when a remote H.264 format omits it (RFC 6184 §8.1).
pub(crate) const H264_IMPLICIT_PROFILE_LEVEL_ID: u32 = 0x42000a;

/// Parsed `a=fmtp` parameters.
///
/// Keys are matched case-insensitively. Parameters without `=` (the
/// telephone-event `0-15` form) are stored with an empty value.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Fmtp {
    params: HashMap<UniCase<String>, String>,
}

impl Fmtp {
    pub fn parse(line: &str) -> Self {
        let mut params = HashMap::new();
        for param in line.split(';') {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (key, value) = match param.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => (param, ""),
            };
            params.insert(UniCase::new(key.to_owned()), value.to_owned());
        }
        Fmtp { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(&UniCase::new(key.to_owned()))
            .map(String::as_str)
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn get_flag(&self, key: &str) -> bool {
        self.get(key) == Some("1")
    }

    /// The single valueless entry, e.g. `0-15` for telephone-event.
    pub fn bare_value(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|(_, v)| v.is_empty())
            .map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn h264_profile_level_id(&self) -> u32 {
        self.get("profile-level-id")
            .and_then(|v| u32::from_str_radix(v, 16).ok())
            .unwrap_or(H264_IMPLICIT_PROFILE_LEVEL_ID)
    }

    pub fn h264_packetization_mode(&self) -> u32 {
        self.get_u32("packetization-mode").unwrap_or(0)
    }

    /// RTX `apt` parameter.
    pub fn apt(&self) -> Option<&str> {
        self.get("apt")
    }
}

/// The profile_idc byte of an H.264 profile-level-id.
pub(crate) fn h264_profile_idc(profile_level_id: u32) -> u32 {
    (profile_level_id >> 16) & 0xff
}

/// The level_idc byte of an H.264 profile-level-id.
pub(crate) fn h264_level_idc(profile_level_id: u32) -> u32 {
    profile_level_id & 0xff
}
