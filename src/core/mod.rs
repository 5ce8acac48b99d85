//! # Core Codec Components
//!
//! Byte-level building blocks of the gamestats protocol.
//!
//! ## Components
//! - **Hex**: upper/lower rendering and a lenient parser
//! - **Cipher**: LCG keystream seeded from the request checksum
//! - **Codec**: URL-safe base64, request decryption, response checksums
//!
//! All operations here are pure and never block.

pub mod cipher;
pub mod codec;
pub mod hex;

pub use codec::{
    decode_url_safe_base64, decrypt_request, encode_request, encode_url_safe_base64,
    response_checksum,
};
pub use self::hex::{hex_lower, hex_upper, parse_hex};
