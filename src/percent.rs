//! Percent-encoding helpers for signed strings.
//!
//! - Characters A-Z, a-z, 0-9, `-`, `_`, `.`, `~` pass through.
//! - `/` passes through unless slash encoding is requested.
//! - Everything else becomes one `%XX` triplet per UTF-8 byte, uppercase hex.

use percent_encoding::percent_decode_str;

/// Percent-encode a single code point.
///
/// Code points up to U+007F produce one `%XX` triplet. Larger code points
/// are expanded into their 2-4 byte UTF-8 form (leading byte `110xxxxx`,
/// `1110xxxx` or `11110xxx`, continuation bytes `10xxxxxx`) and each byte
/// is encoded in turn.
pub fn percent_encode_char(c: char) -> String {
    let cp = c as u32;
    if cp <= 0x7F {
        return format!("%{cp:02X}");
    }

    let (count, lead_mask) = match cp {
        0x80..=0x7FF => (2, 0xC0u32),
        0x800..=0xFFFF => (3, 0xE0u32),
        _ => (4, 0xF0u32),
    };

    let mut out = String::with_capacity(count * 3);
    let lead = lead_mask | (cp >> (6 * (count - 1)));
    out.push_str(&format!("%{lead:02X}"));
    for i in (0..count - 1).rev() {
        let cont = 0x80 | ((cp >> (6 * i)) & 0x3F);
        out.push_str(&format!("%{cont:02X}"));
    }
    out
}

/// Percent-encode a byte, treating values above 0x7F as Latin-1 code points.
pub fn percent_encode_byte(b: u8) -> String {
    percent_encode_char(char::from(b))
}

/// S3-compatible URI encoding.
///
/// With `encode_slash` false, `/` is kept (resource paths); with it true,
/// `/` becomes `%2F` (query names and values).
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut encoded = String::with_capacity(input.len() * 2);
    for ch in input.chars() {
        if is_unreserved(ch) || (ch == '/' && !encode_slash) {
            encoded.push(ch);
        } else {
            encoded.push_str(&percent_encode_char(ch));
        }
    }
    encoded
}

fn is_unreserved(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~')
}

/// Decode `%XX` triplets. Malformed triplets are kept verbatim; invalid
/// UTF-8 is replaced with U+FFFD.
pub fn percent_decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Strip leading and trailing ASCII whitespace. All-whitespace input
/// yields an empty string.
pub fn trim(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_ascii_whitespace())
}

/// Hex-encode `bytes`, lowercase unless `uppercase` is set.
pub fn bytes_to_hex(bytes: &[u8], uppercase: bool) -> String {
    if uppercase {
        hex::encode_upper(bytes)
    } else {
        hex::encode(bytes)
    }
}
