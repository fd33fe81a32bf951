//! Logical HTTP request: verb, resource, version, headers, body.
//!
//! A request is built for exactly one send and discarded afterwards.

use bytes::Bytes;
use http::Method;

use crate::headers::HeaderList;

/// Default protocol version for the request line.
pub const DEFAULT_HTTP_VERSION: &str = "HTTP/1.1";

/// One outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP verb (GET unless stated otherwise).
    pub verb: Method,
    /// Absolute resource path, always starting with `/`.
    pub resource: String,
    /// Protocol version for the request line.
    pub http_version: String,
    /// Sorted header fields.
    pub headers: HeaderList,
    /// Request body; empty for every request this driver sends.
    pub body: Bytes,
}

impl HttpRequest {
    /// Create a request for `resource`, prefixing `/` when missing.
    /// `verb` defaults to GET.
    pub fn new(verb: Option<Method>, resource: &str) -> Self {
        let resource = if resource.starts_with('/') {
            resource.to_string()
        } else {
            format!("/{resource}")
        };
        Self {
            verb: verb.unwrap_or(Method::GET),
            resource,
            http_version: DEFAULT_HTTP_VERSION.to_string(),
            headers: HeaderList::new(),
            body: Bytes::new(),
        }
    }

    /// Override the protocol version.
    pub fn with_version(mut self, version: &str) -> Self {
        self.http_version = version.to_string();
        self
    }

    /// Render the request as HTTP/1.x wire text: request line, header
    /// lines in list order, blank line, body.
    pub fn render(&self) -> Vec<u8> {
        let mut out = format!("{} {} {}\r\n", self.verb, self.resource, self.http_version);
        for field in &self.headers {
            out.push_str(field.rendered());
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        let mut wire = out.into_bytes();
        wire.extend_from_slice(&self.body);
        wire
    }
}

/// Format an HTTP `Range` value for a read of `length` bytes at `offset`.
///
/// `length == 0` means "to end of file": `bytes=OFFSET-` when `offset > 0`,
/// and no range at all for `(0, 0)` (the whole object).
pub fn format_range(offset: u64, length: u64) -> Option<String> {
    if length > 0 {
        Some(format!("bytes={}-{}", offset, offset + length - 1))
    } else if offset > 0 {
        Some(format!("bytes={offset}-"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = HttpRequest::new(None, "data.h5");
        assert_eq!(req.verb, Method::GET);
        assert_eq!(req.resource, "/data.h5");
        assert_eq!(req.http_version, "HTTP/1.1");
        assert!(req.headers.is_empty());
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_resource_keeps_leading_slash() {
        let req = HttpRequest::new(Some(Method::HEAD), "/a/b").with_version("HTTP/1.0");
        assert_eq!(req.resource, "/a/b");
        assert_eq!(req.verb, Method::HEAD);
        assert_eq!(req.http_version, "HTTP/1.0");
    }

    #[test]
    fn test_render() {
        let mut req = HttpRequest::new(None, "/test.txt");
        req.headers.insert("Range", "bytes=0-9").unwrap();
        req.headers.insert("Host", "examplebucket.s3.amazonaws.com").unwrap();
        let wire = String::from_utf8(req.render()).unwrap();
        assert_eq!(
            wire,
            "GET /test.txt HTTP/1.1\r\nHost: examplebucket.s3.amazonaws.com\r\nRange: bytes=0-9\r\n\r\n"
        );
    }

    #[test]
    fn test_format_range() {
        assert_eq!(format_range(0, 10).as_deref(), Some("bytes=0-9"));
        assert_eq!(format_range(1024, 1).as_deref(), Some("bytes=1024-1024"));
        assert_eq!(format_range(5, 0).as_deref(), Some("bytes=5-"));
        assert_eq!(format_range(0, 0), None);
    }
}
