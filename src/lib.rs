//! ros3 -- read-only access to objects on S3-compatible HTTP storage.
//!
//! The crate exposes a remote object as a random-access, read-only file:
//! the object is sized with a HEAD request at open, the front of it is
//! cached in memory, and every other read becomes a ranged GET. Requests
//! are signed with AWS Signature Version 4 when credentials are given.
//!
//! Layers, bottom to top: URL parsing ([`url`]), percent-encoding
//! ([`percent`]), sorted header lists ([`headers`]), request building
//! ([`request`]), signing ([`auth`]), the HTTP seam ([`transport`]), the
//! open object ([`handle`]), the prefix cache ([`cache`]) and the
//! file-driver adapter ([`driver`]).

pub mod auth;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod driver;
pub mod errors;
pub mod handle;
pub mod headers;
pub mod metrics;
pub mod percent;
pub mod request;
pub mod stats;
pub mod transport;
pub mod url;

pub use config::{DriverSettings, Ros3Config};
pub use driver::{AccessFlags, DriverConfig, DriverFeatures, FileDriver, Ros3File};
pub use errors::{Result, Ros3Error};
pub use handle::{Credentials, RemoteObject};
pub use stats::ReadKind;
