//! Identifier generation for transceivers, tracks and transports.

use shared::util::math_rand_hex;

/// Source of unique identifiers handed to a session.
///
/// Production code uses [`RandomUuidGenerator`]; tests inject a deterministic
/// implementation.
pub trait UuidGenerator {
    fn generate(&mut self) -> String;
}

/// Random RFC 4122 version 4 UUIDs.
#[derive(Default, Debug, Clone)]
pub struct RandomUuidGenerator;

impl UuidGenerator for RandomUuidGenerator {
    fn generate(&mut self) -> String {
        let hex = math_rand_hex(32);
        // version nibble and RFC 4122 variant bits
        let variant = ["8", "9", "a", "b"][usize::from(hex.as_bytes()[16] % 4)];
        format!(
            "{}-{}-4{}-{}{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[13..16],
            variant,
            &hex[17..20],
            &hex[20..32]
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_random_uuid_format() {
        let mut generator = RandomUuidGenerator;
        let uuid = generator.generate();

        let groups: Vec<&str> = uuid.split('-').collect();
        assert_eq!(
            groups.iter().map(|g| g.len()).collect::<Vec<_>>(),
            vec![8, 4, 4, 4, 12]
        );
        assert!(groups[2].starts_with('4'));
        assert!(matches!(&groups[3][..1], "8" | "9" | "a" | "b"));
        assert_ne!(uuid, generator.generate());
    }
}
