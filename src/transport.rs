//! HTTP transport seam.
//!
//! [`Transport`] performs one blocking HTTP exchange for a fully built
//! [`HttpRequest`]. [`HttpTransport`] is the production implementation on
//! top of `reqwest`'s blocking client.
//!
//! The HTTP client is process-wide state with an init-on-first-use,
//! release-on-last-use lifecycle: every [`TransportGuard`] counts as one
//! user, the shared client is built when the count goes from zero to one
//! and dropped when it returns to zero. Guards release on drop, so a
//! handle that fails halfway through opening still gives its slot back.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::HeaderMap;
use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::config::TransportSettings;
use crate::errors::{Result, Ros3Error};
use crate::request::HttpRequest;

/// Status, headers and body of one HTTP response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Raw `Content-Length` header value, if present and valid text.
    pub fn content_length_header(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
    }
}

/// One blocking HTTP exchange.
///
/// Implementations return `Ok` for any HTTP status the server sends;
/// only failures to complete the exchange (DNS, connect, TLS, timeout,
/// body read) are errors.
pub trait Transport: Send {
    fn execute(&mut self, url: &str, request: &HttpRequest) -> Result<TransportResponse>;
}

// -- Process-wide client registry ---------------------------------------------

struct Registry {
    users: usize,
    client: Arc<Client>,
}

static REGISTRY: Mutex<Option<Registry>> = Mutex::new(None);

/// One registered user of the shared HTTP client.
pub struct TransportGuard {
    client: Arc<Client>,
}

impl TransportGuard {
    /// Register a user, building the shared client if this is the first.
    ///
    /// Settings only take effect when they create the client; later
    /// callers share whatever client is live.
    pub fn acquire(settings: &TransportSettings) -> Result<Self> {
        let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
        match registry.as_mut() {
            Some(entry) => {
                entry.users += 1;
                Ok(Self {
                    client: Arc::clone(&entry.client),
                })
            }
            None => {
                let client = Arc::new(build_client(settings)?);
                debug!("HTTP transport initialized");
                *registry = Some(Registry {
                    users: 1,
                    client: Arc::clone(&client),
                });
                Ok(Self { client })
            }
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Drop for TransportGuard {
    fn drop(&mut self) {
        let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
        match registry.as_mut() {
            Some(entry) if entry.users > 1 => entry.users -= 1,
            Some(_) => {
                *registry = None;
                debug!("HTTP transport released");
            }
            None => warn!("transport guard released with no registered users"),
        }
    }
}

/// Number of live [`TransportGuard`]s in the process.
pub fn active_users() -> usize {
    REGISTRY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map_or(0, |entry| entry.users)
}

fn build_client(settings: &TransportSettings) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .user_agent(settings.user_agent.clone())
        .build()
        .map_err(|e| Ros3Error::transport(None, format!("failed to create HTTP client: {e}")))
}

// -- reqwest implementation ---------------------------------------------------

/// [`Transport`] backed by the shared `reqwest` blocking client.
pub struct HttpTransport {
    guard: TransportGuard,
}

impl HttpTransport {
    pub fn new(settings: &TransportSettings) -> Result<Self> {
        Ok(Self {
            guard: TransportGuard::acquire(settings)?,
        })
    }
}

impl Transport for HttpTransport {
    fn execute(&mut self, url: &str, request: &HttpRequest) -> Result<TransportResponse> {
        let mut builder = self.guard.client().request(request.verb.clone(), url);
        for field in &request.headers {
            builder = builder.header(field.name(), field.value());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.to_vec());
        }

        let started = Instant::now();
        let response = builder
            .send()
            .map_err(|e| Ros3Error::transport(e.status().map(|s| s.as_u16()), e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .map_err(|e| Ros3Error::transport(Some(status), format!("failed to read body: {e}")))?;

        crate::metrics::record_request(request.verb.as_str(), status, started.elapsed(), body.len());
        debug!(
            verb = %request.verb,
            url,
            status,
            bytes = body.len(),
            "HTTP exchange complete"
        );

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

// -- In-memory transport for tests --------------------------------------------
