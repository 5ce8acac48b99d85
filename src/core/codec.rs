//! # Request Codec
//!
//! Transport encoding for request payloads carried in the `data` query parameter.
//!
//! ## Wire Format
//! ```text
//! V1:     base64url( [pid LE(4)] [body] )
//! V2:     base64url( [checksum^mask BE(4)] cipher([pid LE(4)] [body]) )
//! V3:     base64url( [checksum^mask BE(4)] cipher([pid LE(4)] [len LE(4)] [body]) )
//! ```
//! `checksum` is the wrapping byte sum of everything after the first four bytes,
//! taken before encryption. When encryption is enabled the keystream is seeded
//! from that checksum, so the server can regenerate it without any key exchange.
//!
//! Responses may carry a trailer: lowercase hex SHA-1 of
//! `salt + base64url(response) + salt`.

use crate::config::{ProtocolConfig, RequestVersion};
use crate::core::cipher::KeystreamRng;
use crate::core::hex::hex_lower;
use crate::error::{constants, GamestatsError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha1::{Digest, Sha1};

/// Length of the transmitted checksum prefix
pub const CHECKSUM_LEN: usize = 4;

/// Length of a response checksum trailer in hex characters
pub const RESPONSE_CHECKSUM_LEN: usize = 40;

/// Decode URL-safe base64 (`-` and `_` for `+` and `/`). Standard characters are also accepted.
pub fn decode_url_safe_base64(data: &str) -> Result<Vec<u8>> {
    let standard: String = data
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    STANDARD
        .decode(standard.as_bytes())
        .map_err(|_| GamestatsError::Format(constants::ERR_BASE64))
}

/// Encode as padded URL-safe base64.
pub fn encode_url_safe_base64(bytes: &[u8]) -> String {
    STANDARD
        .encode(bytes)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect()
}

/// Wrapping sum of every byte, as the signed value carried on the wire.
#[inline]
pub fn byte_sum(bytes: &[u8]) -> i32 {
    bytes
        .iter()
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b))) as i32
}

/// Recover the payload from a `data` parameter.
///
/// The pid (and for V3 the length) header is left at the start of the result;
/// only the transmitted checksum is stripped. V1 payloads are returned as decoded.
pub fn decrypt_request(config: &ProtocolConfig, data: &str) -> Result<Vec<u8>> {
    let raw = decode_url_safe_base64(data)?;
    if config.request_version() == RequestVersion::V1 {
        return Ok(raw);
    }
    if raw.len() < CHECKSUM_LEN {
        return Err(GamestatsError::Format(constants::ERR_TOO_SHORT));
    }

    let (prefix, body) = raw.split_at(CHECKSUM_LEN);
    let transmitted = i32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
    let checksum = transmitted ^ config.hash_mask() as i32;

    let mut output = body.to_vec();
    if config.encrypted_request() {
        KeystreamRng::for_checksum(config, checksum).apply(&mut output);
    }

    if byte_sum(&output) != checksum {
        return Err(GamestatsError::Format(constants::ERR_CHECKSUM));
    }

    Ok(output)
}

/// Client-side inverse of [`decrypt_request`] for a payload that already carries its header.
///
/// Returns the raw bytes before base64url encoding.
pub fn encrypt_payload(config: &ProtocolConfig, plaintext: &[u8]) -> Vec<u8> {
    if config.request_version() == RequestVersion::V1 {
        return plaintext.to_vec();
    }

    let checksum = byte_sum(plaintext);
    let mut body = plaintext.to_vec();
    if config.encrypted_request() {
        KeystreamRng::for_checksum(config, checksum).apply(&mut body);
    }

    let transmitted = checksum ^ config.hash_mask() as i32;
    let mut out = Vec::with_capacity(CHECKSUM_LEN + body.len());
    out.extend_from_slice(&transmitted.to_be_bytes());
    out.extend_from_slice(&body);
    out
}

/// Build the `data` parameter a client would send for `body` under `config`.
pub fn encode_request(config: &ProtocolConfig, pid: i32, body: &[u8]) -> String {
    let version = config.request_version();
    let mut plaintext = Vec::with_capacity(version.header_len() + body.len());
    plaintext.extend_from_slice(&pid.to_le_bytes());
    if version == RequestVersion::V3 {
        plaintext.extend_from_slice(&(body.len() as i32).to_le_bytes());
    }
    plaintext.extend_from_slice(body);

    encode_url_safe_base64(&encrypt_payload(config, &plaintext))
}

/// Salted SHA-1 trailer appended to checksummed responses.
pub fn response_checksum(config: &ProtocolConfig, response: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(config.salt().as_bytes());
    hasher.update(encode_url_safe_base64(response).as_bytes());
    hasher.update(config.salt().as_bytes());
    hex_lower(&hasher.finalize())
}
