//! Virtual file driver over a remote object.
//!
//! [`FileDriver`] is the contract a container-format library expects
//! from a storage backend: open, read, write, end-of-file and
//! end-of-allocation queries, identity comparison and a feature query.
//! [`Ros3File`] implements it read-only on top of [`CachingReader`].

use std::cmp::Ordering;
use std::fmt;

use bitflags::bitflags;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::{CachingReader, ReadSource};
use crate::config::{DriverSettings, Ros3Config};
use crate::errors::{Result, Ros3Error};
use crate::handle::RemoteObject;
use crate::stats::{HistogramStats, NoopStats, ReadKind, StatsCollector};
use crate::transport::Transport;
use crate::url::{parse_url, ParsedUrl};

/// Largest address the driver accepts.
pub const MAX_ADDR: u64 = i64::MAX as u64;

bitflags! {
    /// File access mode requested at open. Read-only is the empty set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const RDWR = 0x0001;
        const TRUNC = 0x0002;
        const EXCL = 0x0004;
        const CREAT = 0x0010;
    }
}

bitflags! {
    /// Optimizations the layer above may apply to this driver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DriverFeatures: u32 {
        const AGGREGATE_METADATA = 0x0001;
        const ACCUMULATE_METADATA = 0x0002;
        const DATA_SIEVE = 0x0004;
        const AGGREGATE_SMALLDATA = 0x0008;
    }
}

/// Storage backend contract.
pub trait FileDriver: Sized {
    type Config;

    fn open(name: &str, flags: AccessFlags, config: &Self::Config, max_addr: u64) -> Result<Self>;

    /// Release the file. Failures are logged, never returned.
    fn close(self);

    fn read(&mut self, kind: ReadKind, addr: u64, buf: &mut [u8]) -> Result<()>;

    fn write(&mut self, kind: ReadKind, addr: u64, buf: &[u8]) -> Result<()>;

    fn get_eof(&self) -> u64;

    fn get_eoa(&self) -> u64;

    fn set_eoa(&mut self, addr: u64) -> Result<()>;

    /// `Equal` only for two opens of the same file with the same access
    /// configuration.
    fn cmp(&self, other: &Self) -> Ordering;

    fn query(&self) -> DriverFeatures;
}

/// Access configuration plus driver settings, as passed to [`Ros3File::open`].
#[derive(Debug, Clone, Default)]
pub struct DriverConfig {
    pub fapl: Ros3Config,
    pub settings: DriverSettings,
}

impl DriverConfig {
    pub fn new(fapl: Ros3Config, settings: DriverSettings) -> Self {
        Self { fapl, settings }
    }
}

/// URL components followed by the access configuration.
type Identity<'a> = (
    (&'a str, &'a str, Option<&'a str>, Option<&'a str>, Option<&'a str>),
    (bool, &'a str, &'a str, &'a str),
);

/// A remote object opened read-only through the driver contract.
pub struct Ros3File {
    reader: CachingReader,
    fapl: Ros3Config,
    eoa: u64,
    stats: Box<dyn StatsCollector>,
}

impl fmt::Debug for Ros3File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ros3File")
            .field("url", &self.url().to_url_string())
            .field("eof", &self.get_eof())
            .field("eoa", &self.eoa)
            .finish()
    }
}

fn check_open_args(name: &str, flags: AccessFlags, config: &DriverConfig, max_addr: u64) -> Result<()> {
    if !flags.is_empty() {
        return Err(Ros3Error::Unsupported(format!(
            "the ros3 driver only opens files read-only (flags {flags:?})"
        )));
    }
    if max_addr == 0 || max_addr > MAX_ADDR {
        return Err(Ros3Error::Unsupported(format!(
            "bogus maximum address {max_addr}"
        )));
    }
    parse_url(name)?;
    config.fapl.ensure_valid()
}

impl Ros3File {
    /// Open over a caller-supplied transport.
    pub fn open_with_transport(
        name: &str,
        flags: AccessFlags,
        config: &DriverConfig,
        max_addr: u64,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        check_open_args(name, flags, config, max_addr)?;
        let credentials = config.fapl.credentials(Utc::now())?;
        let handle = RemoteObject::open_with_transport(name, credentials, transport)?;
        Self::from_handle(handle, config)
    }

    fn from_handle(handle: RemoteObject, config: &DriverConfig) -> Result<Self> {
        let reader = CachingReader::new(handle, config.settings.cache.effective_max_bytes())?;
        let stats: Box<dyn StatsCollector> = if config.settings.stats.enabled {
            Box::new(HistogramStats::new())
        } else {
            Box::new(NoopStats)
        };
        Ok(Self {
            reader,
            fapl: config.fapl.clone(),
            eoa: 0,
            stats,
        })
    }

    pub fn url(&self) -> &ParsedUrl {
        self.reader.handle().url()
    }

    pub fn cache_size(&self) -> u64 {
        self.reader.cache_size()
    }

    /// Rendered read statistics, when collection is enabled.
    pub fn stats_report(&self) -> Option<String> {
        self.stats.report()
    }

    fn identity(&self) -> Identity<'_> {
        let url = self.url();
        (
            (
                url.scheme.as_str(),
                url.host.as_str(),
                url.port.as_deref(),
                url.path.as_deref(),
                url.query.as_deref(),
            ),
            (
                self.fapl.authenticate,
                self.fapl.aws_region.as_str(),
                self.fapl.secret_id.as_str(),
                self.fapl.secret_key.as_str(),
            ),
        )
    }
}

impl FileDriver for Ros3File {
    type Config = DriverConfig;

    fn open(name: &str, flags: AccessFlags, config: &DriverConfig, max_addr: u64) -> Result<Self> {
        check_open_args(name, flags, config, max_addr)?;
        let credentials = config.fapl.credentials(Utc::now())?;
        let handle = RemoteObject::open(name, credentials, &config.settings.transport)?;
        Self::from_handle(handle, config)
    }

    fn close(self) {
        if let Some(report) = self.stats.report() {
            info!(url = %self.url(), "read statistics\n{report}");
        }
        debug!(url = %self.url(), "closing ros3 file");
        self.reader.close();
    }

    fn read(&mut self, kind: ReadKind, addr: u64, buf: &mut [u8]) -> Result<()> {
        let size = buf.len() as u64;
        let eof = self.get_eof();
        if addr.checked_add(size).map_or(true, |end| end > eof) {
            return Err(Ros3Error::RangeExceedsFile {
                offset: addr,
                length: size,
                file_size: eof,
            });
        }
        if self.reader.read(addr, buf)? == ReadSource::Remote {
            self.stats.record(kind, size);
        }
        Ok(())
    }

    fn write(&mut self, _kind: ReadKind, addr: u64, buf: &[u8]) -> Result<()> {
        warn!(addr, len = buf.len(), "write attempted on read-only ros3 file");
        Err(Ros3Error::ReadOnly)
    }

    fn get_eof(&self) -> u64 {
        self.reader.file_size()
    }

    fn get_eoa(&self) -> u64 {
        self.eoa
    }

    fn set_eoa(&mut self, addr: u64) -> Result<()> {
        if addr > MAX_ADDR {
            return Err(Ros3Error::Unsupported(format!("address {addr} out of range")));
        }
        self.eoa = addr;
        Ok(())
    }

    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }

    fn query(&self) -> DriverFeatures {
        DriverFeatures::DATA_SIEVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    const URL: &str = "https://bucket.example.com/data.h5";

    fn object(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 199) as u8).collect()
    }

    fn open_with(config: &DriverConfig, url: &str, data: &[u8]) -> (Ros3File, MockTransport) {
        let mock = MockTransport::new(data.to_vec());
        let file = Ros3File::open_with_transport(
            url,
            AccessFlags::empty(),
            config,
            MAX_ADDR,
            Box::new(mock.clone()),
        )
        .unwrap();
        (file, mock)
    }

    fn small_cache_config(cache: u64, stats: bool) -> DriverConfig {
        let mut config = DriverConfig::default();
        config.settings.cache.max_bytes = cache;
        config.settings.stats.enabled = stats;
        config
    }

    // ── open ────────────────────────────────────────────────────────

    #[test]
    fn test_open_rejects_write_modes() {
        let config = DriverConfig::default();
        for flags in [AccessFlags::RDWR, AccessFlags::CREAT | AccessFlags::TRUNC, AccessFlags::EXCL] {
            let mock = MockTransport::new(object(10));
            let err = Ros3File::open_with_transport(URL, flags, &config, MAX_ADDR, Box::new(mock.clone()))
                .unwrap_err();
            assert_eq!(err.code(), "Unsupported");
            assert_eq!(mock.request_count(), 0);
        }
    }

    #[test]
    fn test_open_rejects_bad_max_addr() {
        let config = DriverConfig::default();
        for max_addr in [0, u64::MAX] {
            let mock = MockTransport::new(object(10));
            let err = Ros3File::open_with_transport(
                URL,
                AccessFlags::empty(),
                &config,
                max_addr,
                Box::new(mock),
            )
            .unwrap_err();
            assert_eq!(err.code(), "Unsupported");
        }
    }

    #[test]
    fn test_open_rejects_invalid_config_before_network() {
        let config = DriverConfig::new(
            Ros3Config::authenticated("", "id", "secret"),
            DriverSettings::default(),
        );
        let mock = MockTransport::new(object(10));
        let err = Ros3File::open_with_transport(
            URL,
            AccessFlags::empty(),
            &config,
            MAX_ADDR,
            Box::new(mock.clone()),
        )
        .unwrap_err();
        assert_eq!(err.code(), "InvalidConfig");
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_open_malformed_url() {
        let mock = MockTransport::new(object(10));
        let err = Ros3File::open_with_transport(
            "bucket/data.h5",
            AccessFlags::empty(),
            &DriverConfig::default(),
            MAX_ADDR,
            Box::new(mock),
        )
        .unwrap_err();
        assert_eq!(err.code(), "MalformedUrl");
    }

    // ── read / eof / eoa ────────────────────────────────────────────

    #[test]
    fn test_eof_and_eoa() {
        let (mut file, _) = open_with(&DriverConfig::default(), URL, &object(1_048_576));
        assert_eq!(file.get_eof(), 1_048_576);
        assert_eq!(file.get_eoa(), 0);
        file.set_eoa(4096).unwrap();
        assert_eq!(file.get_eoa(), 4096);
        assert_eq!(file.get_eof(), 1_048_576);
        assert!(file.set_eoa(u64::MAX).is_err());
    }

    #[test]
    fn test_read_from_cache_and_remote() {
        let data = object(8192);
        let (mut file, mock) = open_with(&small_cache_config(1024, true), URL, &data);
        let mut buf = [0u8; 100];
        file.read(ReadKind::Metadata, 0, &mut buf).unwrap();
        assert_eq!(&buf[..], &data[..100]);
        assert_eq!(mock.request_count(), 2);

        let mut buf = vec![0u8; 2000];
        file.read(ReadKind::Raw, 5000, &mut buf).unwrap();
        assert_eq!(&buf[..], &data[5000..7000]);
        assert_eq!(mock.request_count(), 3);

        let report = file.stats_report().unwrap();
        assert!(report.contains("TOTAL READS: 1 (0 meta, 1 raw)"));
        file.close();
    }

    #[test]
    fn test_read_past_eof() {
        let (mut file, _) = open_with(&DriverConfig::default(), URL, &object(100));
        let mut buf = [0u8; 10];
        assert_eq!(file.read(ReadKind::Raw, 95, &mut buf).unwrap_err().code(), "RangeExceedsFile");
        assert_eq!(
            file.read(ReadKind::Raw, u64::MAX - 2, &mut buf).unwrap_err().code(),
            "RangeExceedsFile"
        );
        file.read(ReadKind::Raw, 90, &mut buf).unwrap();
    }

    #[test]
    fn test_write_is_read_only() {
        let (mut file, _) = open_with(&DriverConfig::default(), URL, &object(100));
        assert_eq!(file.write(ReadKind::Raw, 0, b"x").unwrap_err().code(), "ReadOnly");
    }

    #[test]
    fn test_query_features() {
        let (file, _) = open_with(&DriverConfig::default(), URL, &object(100));
        assert_eq!(file.query(), DriverFeatures::DATA_SIEVE);
        assert!(file.stats_report().is_none());
    }

    // ── cmp ─────────────────────────────────────────────────────────

    #[test]
    fn test_cmp() {
        let config = DriverConfig::default();
        let data = object(64);
        let (a, _) = open_with(&config, "http://h/p", &data);
        let (b, _) = open_with(&config, "http://h/p", &data);
        let (c, _) = open_with(&config, "http://h/p?x=1", &data);
        let (d, _) = open_with(&config, "http://h:80/p", &data);
        assert_eq!(FileDriver::cmp(&a, &b), Ordering::Equal);
        assert_ne!(FileDriver::cmp(&a, &c), Ordering::Equal);
        assert_ne!(FileDriver::cmp(&a, &d), Ordering::Equal);
        assert_eq!(FileDriver::cmp(&a, &c), FileDriver::cmp(&c, &a).reverse());
    }

    #[test]
    fn test_cmp_access_config() {
        let data = object(64);
        let anon = DriverConfig::default();
        let signed = DriverConfig::new(
            Ros3Config::authenticated("us-east-1", "id", "secret"),
            DriverSettings::default(),
        );
        let other_key = DriverConfig::new(
            Ros3Config::authenticated("us-east-1", "id", "other"),
            DriverSettings::default(),
        );
        let (a, _) = open_with(&anon, "http://h/p", &data);
        let (b, _) = open_with(&signed, "http://h/p", &data);
        let (c, _) = open_with(&other_key, "http://h/p", &data);
        let (d, _) = open_with(&signed, "http://h/p", &data);
        assert_ne!(FileDriver::cmp(&a, &b), Ordering::Equal);
        assert_ne!(FileDriver::cmp(&b, &c), Ordering::Equal);
        assert_eq!(FileDriver::cmp(&b, &d), Ordering::Equal);
    }
}
