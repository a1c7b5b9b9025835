//! Formats raw keys and values for log output.

use itertools::Itertools as _;

/// Formats raw byte slices without any decoding.
pub struct Raw;

impl Raw {
    /// Formats raw bytes as escaped ASCII strings.
    pub fn bytes(bytes: &[u8]) -> String {
        let escaped = bytes
            .iter()
            .copied()
            .flat_map(std::ascii::escape_default)
            .collect_vec();
        format!("\"{}\"", String::from_utf8_lossy(&escaped))
    }

    /// Formats a key/value pair.
    pub fn key_value(key: &[u8], value: &[u8]) -> String {
        format!("{}={}", Self::bytes(key), Self::bytes(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable_bytes() {
        assert_eq!(Raw::bytes(b"abc"), "\"abc\"");
    }

    #[test]
    fn test_escapes_non_printable_bytes() {
        assert_eq!(Raw::bytes(&[0x00, 0xFF]), "\"\\x00\\xff\"");
    }

    #[test]
    fn test_key_value() {
        assert_eq!(Raw::key_value(b"k", b"v"), "\"k\"=\"v\"");
    }
}
