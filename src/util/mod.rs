//! # Utility Modules
//!
//! Hex helpers shared by logging, the CLI and the tests.

pub mod hex;

pub use self::hex::{decode_hex, encode_hex, format_hex_compact, hex_to_bytes, HexError};
