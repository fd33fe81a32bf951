//! AWS shared credential files.
//!
//! Reads `region`, `aws_access_key_id`, `aws_secret_access_key` and
//! `aws_session_token` for one profile from `~/.aws/credentials`, then
//! fills whatever is still blank from `~/.aws/config`.
//!
//! Parsing is line oriented: a `[name]` header (or `[profile name]`, as
//! the config file spells it) opens a section, `key=value` lines inside
//! it assign settings, and the first whitespace ends a value. Only the
//! first matching section is read.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{Result, Ros3Error};

/// Settings gathered for one profile.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProfileCredentials {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for ProfileCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCredentials")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ProfileCredentials {
    /// Region, key id and secret are all present.
    pub fn is_complete(&self) -> bool {
        !self.region.is_empty() && !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }

    fn assign(&mut self, key: &str, value: &str) {
        let slot = match key {
            "region" => &mut self.region,
            "aws_access_key_id" => &mut self.access_key_id,
            "aws_secret_access_key" => &mut self.secret_access_key,
            "aws_session_token" => {
                if self.session_token.is_none() {
                    self.session_token = Some(value.to_string());
                }
                return;
            }
            _ => return,
        };
        // Earlier sources win.
        if slot.is_empty() {
            *slot = value.to_string();
        }
    }
}

fn is_profile_header(line: &str, profile: &str) -> bool {
    let Some(inner) = line.strip_prefix('[').and_then(|rest| rest.split_once(']')) else {
        return false;
    };
    let name = inner.0.trim();
    name == profile || name.strip_prefix("profile ").map(str::trim) == Some(profile)
}

/// Read `profile` from one credential source into `into`, filling only
/// fields that are still blank. Returns whether the profile was found.
pub fn load_profile_from_reader<R: BufRead>(
    reader: R,
    profile: &str,
    into: &mut ProfileCredentials,
) -> Result<bool> {
    let mut in_profile = false;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_start();
        if line.starts_with('[') {
            if in_profile {
                break;
            }
            in_profile = is_profile_header(line, profile);
            continue;
        }
        if !in_profile || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.split_whitespace().next().unwrap_or("");
        if !value.is_empty() {
            into.assign(key.trim(), value);
        }
    }
    Ok(in_profile)
}

fn load_file(path: &Path, profile: &str, into: &mut ProfileCredentials) -> Result<bool> {
    match File::open(path) {
        Ok(file) => {
            let found = load_profile_from_reader(BufReader::new(file), profile, into)?;
            debug!(path = %path.display(), profile, found, "read credential file");
            Ok(found)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Load `profile` from `dir/credentials`, then `dir/config`.
pub fn load_aws_profile_from_dir(dir: &Path, profile: &str) -> Result<ProfileCredentials> {
    let mut creds = ProfileCredentials::default();
    load_file(&dir.join("credentials"), profile, &mut creds)?;
    if !creds.is_complete() {
        load_file(&dir.join("config"), profile, &mut creds)?;
    }
    if !creds.is_complete() {
        return Err(Ros3Error::InvalidCredentials(format!(
            "profile {profile:?} is missing region, access key id or secret key in {}",
            dir.display()
        )));
    }
    Ok(creds)
}

/// Directory holding the shared credential files: `$HOME/.aws`.
pub fn aws_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".aws"))
        .ok_or_else(|| Ros3Error::InvalidCredentials("cannot locate home directory".to_string()))
}

/// Load `profile` from the standard `~/.aws` files.
pub fn load_aws_profile(profile: &str) -> Result<ProfileCredentials> {
    load_aws_profile_from_dir(&aws_dir()?, profile)
}
