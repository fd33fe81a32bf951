//! Error types for the read-only S3 driver.
//!
//! Every failure the driver can report is a variant of [`Ros3Error`].
//! Each variant carries a stable short code (see [`Ros3Error::code`]) so
//! callers and logs can match on it without parsing the display text.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Ros3Error>;

/// Driver error kinds.
#[derive(Debug, Error)]
pub enum Ros3Error {
    /// The URL could not be parsed into scheme/host/port/path/query.
    #[error("malformed URL {url:?}: {reason}")]
    MalformedUrl { url: String, reason: String },

    /// Credentials were partially supplied or a required field was empty.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The open-time configuration object was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The sizing request did not yield a usable content length.
    #[error("unable to determine remote object size: {0}")]
    SizingFailed(String),

    /// The remote host reported that the object does not exist.
    #[error("remote object not found: {url}")]
    ObjectNotFound { url: String },

    /// A read was requested past the end of the remote object.
    #[error("range {offset}+{length} exceeds file size {file_size}")]
    RangeExceedsFile {
        offset: u64,
        length: u64,
        file_size: u64,
    },

    /// Network failure or non-2xx HTTP response.
    #[error("transport error{}: {message}", status_suffix(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The destination buffer cannot hold the requested bytes.
    #[error("destination holds {available} bytes but the read needs {needed}")]
    BufferTooSmall { needed: u64, available: u64 },

    /// The request could not be signed.
    #[error("unable to sign request: {0}")]
    SigningFailure(String),

    /// Removal of a header that is not present in the list.
    #[error("header not found: {name}")]
    HeaderNotFound { name: String },

    /// The driver has no write path.
    #[error("the ros3 driver is read-only")]
    ReadOnly,

    /// An access mode or operation the driver does not support.
    #[error("{0}")]
    Unsupported(String),

    /// Local I/O failure (credential files, settings files, output).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Ros3Error {
    /// Return the stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Ros3Error::MalformedUrl { .. } => "MalformedUrl",
            Ros3Error::InvalidCredentials(_) => "InvalidCredentials",
            Ros3Error::InvalidConfig(_) => "InvalidConfig",
            Ros3Error::SizingFailed(_) => "SizingFailed",
            Ros3Error::ObjectNotFound { .. } => "ObjectNotFound",
            Ros3Error::RangeExceedsFile { .. } => "RangeExceedsFile",
            Ros3Error::Transport { .. } => "TransportError",
            Ros3Error::BufferTooSmall { .. } => "BufferTooSmall",
            Ros3Error::SigningFailure(_) => "SigningFailure",
            Ros3Error::HeaderNotFound { .. } => "NotFound",
            Ros3Error::ReadOnly => "ReadOnly",
            Ros3Error::Unsupported(_) => "Unsupported",
            Ros3Error::Io(_) => "Io",
        }
    }

    pub(crate) fn malformed_url(url: &str, reason: impl Into<String>) -> Self {
        Ros3Error::MalformedUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Ros3Error::Transport {
            status,
            message: message.into(),
        }
    }

    /// The HTTP status attached to a transport failure, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Ros3Error::Transport { status, .. } => *status,
            Ros3Error::ObjectNotFound { .. } => Some(404),
            _ => None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}
