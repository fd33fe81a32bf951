//! URL parsing.
//!
//! Splits a URL string into scheme, host, port, path, and query without
//! any percent-decoding: components are stored exactly as received.
//!
//! ```text
//! scheme://host[:port][/path][?query]
//! ```
//!
//! Absent optional components are `None`, never empty strings.

use std::fmt;

use crate::errors::{Result, Ros3Error};

/// Components of a parsed URL. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    /// Lowercased scheme, e.g. `https`.
    pub scheme: String,
    /// Host name or address; IPv6 literals keep their brackets.
    pub host: String,
    /// Decimal port string.
    pub port: Option<String>,
    /// Path without its leading slash.
    pub path: Option<String>,
    /// Raw query string after `?`.
    pub query: Option<String>,
}

impl ParsedUrl {
    /// Absolute resource path for an HTTP request line, always starting with `/`.
    pub fn resource(&self) -> String {
        format!("/{}", self.path.as_deref().unwrap_or(""))
    }

    /// Value for the `Host` header: host plus `:port` when a port is present.
    pub fn host_header(&self) -> String {
        match &self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    /// Reassemble the URL in canonical component order.
    pub fn to_url_string(&self) -> String {
        let mut out = format!("{}://{}", self.scheme, self.host_header());
        out.push_str(&self.resource());
        if let Some(query) = &self.query {
            out.push('?');
            out.push_str(query);
        }
        out
    }
}

impl fmt::Display for ParsedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url_string())
    }
}

/// Parse `url` into its components.
///
/// Fails with [`Ros3Error::MalformedUrl`] on any structural violation:
/// missing `://`, invalid scheme characters, empty host, unterminated
/// IPv6 literal, empty or non-numeric port, or empty query.
pub fn parse_url(url: &str) -> Result<ParsedUrl> {
    if url.is_empty() {
        return Err(Ros3Error::malformed_url(url, "URL cannot be empty"));
    }
    let bytes = url.as_bytes();

    // Scheme: [A-Za-z+-.]+ followed by "://".
    let colon = url
        .find(':')
        .ok_or_else(|| Ros3Error::malformed_url(url, "invalid scheme: no ':' found"))?;
    let scheme = &url[..colon];
    if scheme.is_empty() {
        return Err(Ros3Error::malformed_url(url, "scheme cannot be empty"));
    }
    if !scheme
        .bytes()
        .all(|b| b.is_ascii_alphabetic() || b == b'+' || b == b'-' || b == b'.')
    {
        return Err(Ros3Error::malformed_url(url, "invalid scheme characters"));
    }
    if !url[colon..].starts_with("://") {
        return Err(Ros3Error::malformed_url(url, "scheme must be followed by '://'"));
    }
    let scheme = scheme.to_ascii_lowercase();
    let mut pos = colon + 3;

    // Host.
    let host_start = pos;
    if bytes.get(pos) == Some(&b'[') {
        let close = url[pos..]
            .find(']')
            .ok_or_else(|| Ros3Error::malformed_url(url, "incomplete IPv6 host"))?;
        pos += close + 1;
        if let Some(&next) = bytes.get(pos) {
            if next != b':' && next != b'/' && next != b'?' {
                return Err(Ros3Error::malformed_url(
                    url,
                    "unexpected character after IPv6 host",
                ));
            }
        }
    } else {
        while pos < bytes.len() && !matches!(bytes[pos], b':' | b'/' | b'?') {
            pos += 1;
        }
    }
    if pos == host_start {
        return Err(Ros3Error::malformed_url(url, "host cannot be empty"));
    }
    let host = url[host_start..pos].to_string();

    // Port.
    let mut port = None;
    if bytes.get(pos) == Some(&b':') {
        pos += 1;
        let port_start = pos;
        while pos < bytes.len() && !matches!(bytes[pos], b'/' | b'?') {
            pos += 1;
        }
        let raw = &url[port_start..pos];
        if raw.is_empty() {
            return Err(Ros3Error::malformed_url(url, "port cannot be empty"));
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Ros3Error::malformed_url(url, "port is not a decimal string"));
        }
        port = Some(raw.to_string());
    }

    // Path.
    let mut path = None;
    if bytes.get(pos) == Some(&b'/') {
        pos += 1;
        let path_start = pos;
        while pos < bytes.len() && bytes[pos] != b'?' {
            pos += 1;
        }
        if pos > path_start {
            path = Some(url[path_start..pos].to_string());
        }
    }

    // Query.
    let mut query = None;
    if bytes.get(pos) == Some(&b'?') {
        let raw = &url[pos + 1..];
        if raw.is_empty() {
            return Err(Ros3Error::malformed_url(url, "query cannot be empty"));
        }
        query = Some(raw.to_string());
    }

    Ok(ParsedUrl {
        scheme,
        host,
        port,
        path,
        query,
    })
}
