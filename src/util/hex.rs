//! # Hex Encoding/Decoding Utilities
//!
//! Hex helpers used for frame dumps in logs and captured-frame fixtures in
//! tests.
//!
//! ```rust
//! use tracer_rs::util::hex::{decode_hex, format_hex_compact};
//!
//! let data = decode_hex("eb 90 00 a0").unwrap();
//! assert_eq!(format_hex_compact(&data), "eb 90 00 a0");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to lowercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode hex string to bytes
///
/// Accepts both uppercase and lowercase hex characters.
/// Whitespace is automatically stripped.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }

    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format hex data for compact display (useful for logs)
///
/// Formats data as "eb 90 00 a0" with spaces between bytes.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Helper for creating test data from hex strings
///
/// Panics on invalid hex (intended for test code only).
pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    decode_hex(hex).expect("Invalid hex in test data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_with_whitespace() {
        let expected = vec![0xEB, 0x90, 0xEB, 0x90];
        assert_eq!(decode_hex("eb 90\neb 90").unwrap(), expected);
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_hex_compact(&[0x00, 0xA0, 0x18]), "00 a0 18");
        assert_eq!(encode_hex(&[0x00, 0xA0, 0x18]), "00a018");
    }

    #[test]
    fn test_errors() {
        assert_eq!(decode_hex(""), Err(HexError::EmptyString));
        assert_eq!(decode_hex("7"), Err(HexError::OddLength(1)));
        assert!(matches!(decode_hex("GG"), Err(HexError::DecodeError(_))));
    }
}
