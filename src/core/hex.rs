//! Hex rendering and a deliberately lenient hex parser.

/// Uppercase hex, two characters per byte.
pub fn hex_upper(bytes: &[u8]) -> String {
    ::hex::encode_upper(bytes)
}

/// Lowercase hex, two characters per byte.
pub fn hex_lower(bytes: &[u8]) -> String {
    ::hex::encode(bytes)
}

/// Parse hex without ever failing.
///
/// Every character occupies a nibble slot; characters outside `[0-9A-Fa-f]`
/// contribute zero bits. A trailing odd nibble is dropped.
pub fn parse_hex(hex: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(hex.len() / 2);
    let mut high: Option<u8> = None;

    for c in hex.chars() {
        let nibble = c.to_digit(16).map(|d| d as u8).unwrap_or(0);
        match high.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }

    out
}
