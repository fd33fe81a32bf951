//! AWS Signature Version 4 request signing.
//!
//! Signs outgoing S3 requests with an `Authorization: AWS4-HMAC-SHA256 ...`
//! header, in four steps:
//! 1. Build a canonical request
//! 2. Build a string-to-sign
//! 3. Derive a signing key via HMAC chain (once per handle)
//! 4. Compute the signature and format the authorization header
//!
//! Every buffer is sized from its actual inputs; there are no fixed limits
//! on header, credential, or authorization lengths.

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::errors::{Result, Ros3Error};
use crate::percent::{bytes_to_hex, percent_decode, trim, uri_encode};
use crate::request::HttpRequest;

type HmacSha256 = Hmac<Sha256>;

/// Derived per-day signing key.
pub type SigningKey = [u8; 32];

/// SHA-256 of the empty string.
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Signature algorithm identifier.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name baked into every credential scope.
pub const SERVICE: &str = "s3";

/// Length of a `yyyyMMdd'T'HHmmss'Z'` timestamp.
pub const ISO8601_LEN: usize = 16;

// ── Credentials ─────────────────────────────────────────────────────

/// Authentication material held by an open handle.
///
/// Either fully present or absent: region, access id and signing key
/// are all required.
#[derive(Clone)]
pub struct Credentials {
    region: String,
    access_id: String,
    signing_key: SigningKey,
    /// SHA-256 of the secret the key was derived from, when known.
    secret_digest: Option<[u8; 32]>,
    session_token: Option<String>,
}

impl Credentials {
    /// Wrap an already-derived signing key.
    pub fn new(region: &str, access_id: &str, signing_key: SigningKey) -> Result<Self> {
        if region.is_empty() {
            return Err(Ros3Error::InvalidCredentials(
                "region cannot be empty".to_string(),
            ));
        }
        if access_id.is_empty() {
            return Err(Ros3Error::InvalidCredentials(
                "access id cannot be empty".to_string(),
            ));
        }
        if signing_key.iter().all(|&b| b == 0) {
            return Err(Ros3Error::InvalidCredentials(
                "signing key cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            region: region.to_string(),
            access_id: access_id.to_string(),
            signing_key,
            secret_digest: None,
            session_token: None,
        })
    }

    /// Build credentials from optional parts.
    ///
    /// All absent means an anonymous handle (`Ok(None)`). Any part present
    /// requires all three to be present and non-empty.
    pub fn from_parts(
        region: Option<&str>,
        access_id: Option<&str>,
        signing_key: Option<SigningKey>,
    ) -> Result<Option<Self>> {
        match (region, access_id, signing_key) {
            (None, None, None) => Ok(None),
            (Some(region), Some(access_id), Some(key)) => Self::new(region, access_id, key).map(Some),
            _ => Err(Ros3Error::InvalidCredentials(
                "region, access id and signing key must be supplied together".to_string(),
            )),
        }
    }

    /// Derive the signing key for `now`'s calendar day from a secret key.
    pub fn from_secret(
        region: &str,
        access_id: &str,
        secret_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let timestamp = iso8601_timestamp(now)?;
        let key = derive_signing_key(secret_key, region, &timestamp)?;
        let mut creds = Self::new(region, access_id, key)?;
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(secret_key.as_bytes()));
        creds.secret_digest = Some(digest);
        Ok(creds)
    }

    /// Attach a temporary-credentials session token.
    pub fn with_session_token(mut self, token: Option<String>) -> Self {
        self.session_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn access_id(&self) -> &str {
        &self.access_id
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Key material that identifies the account behind these credentials.
    ///
    /// The secret's digest when the key was derived here, so keys derived
    /// on different days from one secret compare equal. Otherwise the
    /// signing key itself.
    pub fn identity_key(&self) -> &[u8; 32] {
        self.secret_digest.as_ref().unwrap_or(&self.signing_key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("region", &self.region)
            .field("access_id", &self.access_id)
            .field("signing_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ── Timestamps ──────────────────────────────────────────────────────

/// Format `now` as `yyyyMMdd'T'HHmmss'Z'`.
pub fn iso8601_timestamp(now: DateTime<Utc>) -> Result<String> {
    let stamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    if stamp.len() != ISO8601_LEN {
        return Err(Ros3Error::SigningFailure(format!(
            "timestamp {stamp:?} is not {ISO8601_LEN} characters"
        )));
    }
    Ok(stamp)
}

/// The `yyyyMMdd` prefix of an ISO-8601 basic timestamp.
fn date_stamp(iso8601: &str) -> Result<&str> {
    match iso8601.get(..8) {
        Some(date) if date.bytes().all(|b| b.is_ascii_digit()) => Ok(date),
        _ => Err(Ros3Error::SigningFailure(format!(
            "invalid date in timestamp {iso8601:?}"
        ))),
    }
}

// ── Signing key derivation ──────────────────────────────────────────

/// Derive the signing key for a given secret, region, and date.
///
/// `iso8601` may be a full timestamp or just `yyyyMMdd`; only the date
/// part is used.
///
/// ```text
/// kDate    = HMAC-SHA256("AWS4" + secret, dateStamp)
/// kRegion  = HMAC-SHA256(kDate, region)
/// kService = HMAC-SHA256(kRegion, "s3")
/// kSigning = HMAC-SHA256(kService, "aws4_request")
/// ```
pub fn derive_signing_key(secret_key: &str, region: &str, iso8601: &str) -> Result<SigningKey> {
    let date = date_stamp(iso8601)?;
    let k_secret = format!("AWS4{secret_key}");
    let k_date = hmac_sha256(k_secret.as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
    Ok(hmac_sha256(&k_service, b"aws4_request"))
}

/// Compute HMAC-SHA256.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> SigningKey {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

// ── Canonical request construction ──────────────────────────────────

/// Build the canonical request string and the signed-headers list.
///
/// ```text
/// HTTPMethod + '\n' +
/// Resource + '\n' +
/// CanonicalQueryString + '\n' +
/// lowername:trimmedvalue + '\n'   (one per header, list order)
/// '\n' +
/// SignedHeaders + '\n' +
/// HexEncode(SHA256(Body))
/// ```
///
/// Every header in the request is signed. A request without headers
/// cannot be signed.
pub fn build_canonical_request(
    request: &HttpRequest,
    query_string: Option<&str>,
) -> Result<(String, String)> {
    if request.headers.is_empty() {
        return Err(Ros3Error::SigningFailure(
            "request has no headers to sign".to_string(),
        ));
    }

    let canonical_query = build_canonical_query_string(query_string.unwrap_or(""));
    let mut canonical = format!(
        "{}\n{}\n{}\n",
        request.verb, request.resource, canonical_query
    );

    let mut signed_names: Vec<&str> = Vec::with_capacity(request.headers.len());
    for field in &request.headers {
        canonical.push_str(field.lowername());
        canonical.push(':');
        canonical.push_str(trim(field.value()));
        canonical.push('\n');
        signed_names.push(field.lowername());
    }
    let signed_headers = signed_names.join(";");

    let payload_hash = bytes_to_hex(&Sha256::digest(&request.body), false);
    canonical.push('\n');
    canonical.push_str(&signed_headers);
    canonical.push('\n');
    canonical.push_str(&payload_hash);

    Ok((canonical, signed_headers))
}

/// Build the canonical query string from a raw query string.
///
/// All query parameters are sorted by name (byte-order, case-sensitive),
/// each name and value URI-encoded, and joined with `&`. Parameters with
/// no value use an empty value: `acl=`.
///
/// The raw query may already be percent-encoded, so each component is
/// decoded before being re-encoded with S3 rules.
pub fn build_canonical_query_string(query_string: &str) -> String {
    if query_string.is_empty() {
        return String::new();
    }

    let mut params: Vec<(String, String)> = Vec::new();
    for part in query_string.split('&') {
        if part.is_empty() {
            continue;
        }
        let (k, v) = part.split_once('=').unwrap_or((part, ""));
        params.push((
            uri_encode(&percent_decode(k), true),
            uri_encode(&percent_decode(v), true),
        ));
    }

    // Sort by name, then by value.
    params.sort();

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

// ── String to sign ──────────────────────────────────────────────────

/// Credential scope: `yyyyMMdd/region/s3/aws4_request`.
pub fn credential_scope(iso8601: &str, region: &str) -> Result<String> {
    Ok(format!("{}/{region}/{SERVICE}/aws4_request", date_stamp(iso8601)?))
}

/// Build the string to sign.
///
/// ```text
/// AWS4-HMAC-SHA256 + '\n' +
/// Timestamp + '\n' +
/// CredentialScope + '\n' +
/// HexEncode(SHA256(CanonicalRequest))
/// ```
pub fn build_string_to_sign(canonical_request: &str, iso8601: &str, region: &str) -> Result<String> {
    if iso8601.len() != ISO8601_LEN {
        return Err(Ros3Error::SigningFailure(format!(
            "timestamp {iso8601:?} is not {ISO8601_LEN} characters"
        )));
    }
    let scope = credential_scope(iso8601, region)?;
    let hash = bytes_to_hex(&Sha256::digest(canonical_request.as_bytes()), false);
    Ok(format!("{ALGORITHM}\n{iso8601}\n{scope}\n{hash}"))
}

// ── Signature computation ───────────────────────────────────────────

/// Compute the signature: HexEncode(HMAC-SHA256(SigningKey, StringToSign)).
pub fn compute_signature(signing_key: &[u8], string_to_sign: &str) -> String {
    bytes_to_hex(&hmac_sha256(signing_key, string_to_sign.as_bytes()), false)
}

/// Format the `Authorization` header value.
pub fn build_authorization(
    access_id: &str,
    iso8601: &str,
    region: &str,
    signed_headers: &str,
    signature: &str,
) -> Result<String> {
    let scope = credential_scope(iso8601, region)?;
    Ok(format!(
        "{ALGORITHM} Credential={access_id}/{scope},SignedHeaders={signed_headers},Signature={signature}"
    ))
}

// ── Full request signing ────────────────────────────────────────────

/// Sign `request` in place.
///
/// Adds `x-amz-date`, `x-amz-content-sha256` and (with a session token)
/// `x-amz-security-token`, then signs every header present (the caller is
/// expected to have set `Host` and, for partial reads, `Range`) and adds
/// the resulting `Authorization` header.
pub fn sign_request(
    request: &mut HttpRequest,
    query_string: Option<&str>,
    credentials: &Credentials,
    now: DateTime<Utc>,
) -> Result<()> {
    let timestamp = iso8601_timestamp(now)?;
    let payload_hash = bytes_to_hex(&Sha256::digest(&request.body), false);

    if request.headers.get("authorization").is_some() {
        request.headers.remove("authorization")?;
    }
    request.headers.insert("x-amz-date", &timestamp)?;
    request.headers.insert("x-amz-content-sha256", &payload_hash)?;
    if let Some(token) = credentials.session_token() {
        request.headers.insert("x-amz-security-token", token)?;
    }

    let (canonical_request, signed_headers) = build_canonical_request(request, query_string)?;
    let string_to_sign = build_string_to_sign(&canonical_request, &timestamp, credentials.region())?;
    let signature = compute_signature(credentials.signing_key(), &string_to_sign);
    let authorization = build_authorization(
        credentials.access_id(),
        &timestamp,
        credentials.region(),
        &signed_headers,
        &signature,
    )?;

    request.headers.insert("Authorization", &authorization)?;
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────
