//! Driver metrics.
//!
//! Records request and byte counters through the `metrics` facade. The
//! library never installs a recorder; without one every call here is a
//! no-op, and a host application that installs one gets these series.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};

// -- Metric name constants ----------------------------------------------------

/// Total HTTP requests sent (counter). Labels: verb, status.
pub const REQUESTS_TOTAL: &str = "ros3_requests_total";

/// HTTP request duration in seconds (histogram). Labels: verb.
pub const REQUEST_DURATION_SECONDS: &str = "ros3_request_duration_seconds";

/// Total bytes received in response bodies (counter).
pub const BYTES_READ_TOTAL: &str = "ros3_bytes_read_total";

/// Reads served from the front-of-file cache (counter).
pub const CACHE_HITS_TOTAL: &str = "ros3_cache_hits_total";

/// Register metric descriptions with the global recorder. Call once after
/// installing a recorder.
pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total HTTP requests sent to the object store");
    describe_histogram!(REQUEST_DURATION_SECONDS, "HTTP request duration in seconds");
    describe_counter!(BYTES_READ_TOTAL, "Total bytes received in response bodies");
    describe_counter!(CACHE_HITS_TOTAL, "Reads served from the front-of-file cache");
}

/// Record one completed HTTP exchange.
pub fn record_request(verb: &str, status: u16, elapsed: Duration, body_bytes: usize) {
    counter!(REQUESTS_TOTAL, "verb" => verb.to_string(), "status" => status.to_string()).increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "verb" => verb.to_string()).record(elapsed.as_secs_f64());
    counter!(BYTES_READ_TOTAL).increment(body_bytes as u64);
}

/// Record a read served without a network round trip.
pub fn record_cache_hit() {
    counter!(CACHE_HITS_TOTAL).increment(1);
}
