use rand::{Rng, rng};

const RUNES_ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const RUNES_ALPHA_NUMBER: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const RUNES_HEX: &[u8] = b"0123456789abcdef";

/// math_rand_alpha generates a mathematical random alphabet sequence of the requested length.
pub fn math_rand_alpha(n: usize) -> String {
    generate_crypto_random_string(n, RUNES_ALPHA)
}

/// math_rand_alpha_number generates a mathematical random alphabet and number sequence of the requested length.
pub fn math_rand_alpha_number(n: usize) -> String {
    generate_crypto_random_string(n, RUNES_ALPHA_NUMBER)
}

/// math_rand_hex generates a random lowercase hex sequence of the requested length.
pub fn math_rand_hex(n: usize) -> String {
    generate_crypto_random_string(n, RUNES_HEX)
}

pub fn generate_crypto_random_string(n: usize, runes: &[u8]) -> String {
    let mut rng = rng();

    let rand_string: String = (0..n)
        .map(|_| {
            let idx = rng.random_range(0..runes.len());
            runes[idx] as char
        })
        .collect();

    rand_string
}

/// Random SDP session id. RFC 4566 recommends an NTP-ish value, JSEP only
/// requires it to fit in 63 bits.
pub fn random_session_id() -> u64 {
    rng().random_range(0..(1u64 << 62))
}

/// Random non-zero SSRC.
pub fn random_ssrc() -> u32 {
    rng().random_range(1..=u32::MAX)
}
