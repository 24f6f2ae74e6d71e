//! Percent-encoding of arbitrary byte buffers for
//! `application/x-www-form-urlencoded` bodies and query strings.
//!
//! Only `[A-Za-z0-9_.~-]` passes through unchanged; every other byte,
//! including space, NUL and bytes with the high bit set, becomes `%XX`.

const HEX: &[u8; 16] = b"0123456789ABCDEF";

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b'~' | b'-')
}

/// Exact length of [`urlencode`]'s output for `src`.
pub fn urlencode_size(src: &[u8]) -> usize {
    src.iter()
        .map(|&b| if is_unreserved(b) { 1 } else { 3 })
        .sum()
}

/// Appends the encoding of `src` to `dest`.
pub fn urlencode_into(src: &[u8], dest: &mut String) {
    dest.reserve(urlencode_size(src));
    for &byte in src {
        if is_unreserved(byte) {
            dest.push(byte as char);
        } else {
            dest.push('%');
            dest.push(HEX[(byte >> 4) as usize] as char);
            dest.push(HEX[(byte & 0x0f) as usize] as char);
        }
    }
}

/// Percent-encodes `src`.
pub fn urlencode(src: &[u8]) -> String {
    let mut out = String::with_capacity(urlencode_size(src));
    urlencode_into(src, &mut out);
    out
}

/// Appends `key=<encoded value>` to `uri`, choosing `?` or `&` depending on
/// whether the URI already has a query string.
pub fn append_query_param(uri: &str, key: &str, value: &[u8]) -> String {
    let mut out = String::with_capacity(uri.len() + key.len() + 2 + urlencode_size(value));
    out.push_str(uri);
    out.push(if uri.contains('?') { '&' } else { '?' });
    out.push_str(key);
    out.push('=');
    urlencode_into(value, &mut out);
    out
}
