//! Front-of-file read cache.
//!
//! Container formats keep their superblock and most metadata near the
//! start of the file, so the first `min(file_size, max_bytes)` bytes are
//! fetched once at open and every read that falls inside them is served
//! from memory. The object cannot change under an open handle, so the
//! cache is never refreshed.

use tracing::debug;

use crate::errors::{Result, Ros3Error};
use crate::handle::RemoteObject;

/// Default upper bound on the cached prefix: 16 MiB.
pub const MAX_CACHE_BYTES: u64 = 16 * 1024 * 1024;

/// Where the bytes of a read came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Cache,
    Remote,
}

/// A [`RemoteObject`] with its leading bytes held in memory.
#[derive(Debug)]
pub struct CachingReader {
    handle: RemoteObject,
    cache: Vec<u8>,
}

impl CachingReader {
    /// Prime the cache with one read of `min(file_size, max_bytes)` bytes.
    /// A `max_bytes` of zero disables caching.
    pub fn new(mut handle: RemoteObject, max_bytes: u64) -> Result<Self> {
        let cache_size = handle.file_size().min(max_bytes);
        let cache = if cache_size == 0 {
            Vec::new()
        } else {
            handle.read_vec(0, cache_size)?
        };
        debug!(cache_size, "read cache primed");
        Ok(Self { handle, cache })
    }

    pub fn cache_size(&self) -> u64 {
        self.cache.len() as u64
    }

    pub fn file_size(&self) -> u64 {
        self.handle.file_size()
    }

    pub fn handle(&self) -> &RemoteObject {
        &self.handle
    }

    pub fn into_inner(self) -> RemoteObject {
        self.handle
    }

    /// Fill `dest` with the bytes starting at `offset`.
    pub fn read(&mut self, offset: u64, dest: &mut [u8]) -> Result<ReadSource> {
        let length = dest.len() as u64;
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= self.file_size())
            .ok_or(Ros3Error::RangeExceedsFile {
                offset,
                length,
                file_size: self.file_size(),
            })?;

        if end <= self.cache_size() {
            // Bounded by the cache length, so both fit in usize.
            let start = offset as usize;
            dest.copy_from_slice(&self.cache[start..end as usize]);
            crate::metrics::record_cache_hit();
            return Ok(ReadSource::Cache);
        }

        // A zero length means "to end of file" to the handle, which is
        // never what an empty destination asks for.
        if length == 0 {
            return Ok(ReadSource::Cache);
        }
        self.handle.read(offset, length, Some(dest))?;
        Ok(ReadSource::Remote)
    }

    pub fn close(self) {
        self.handle.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn object(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    fn reader(data: &[u8], max_bytes: u64) -> (CachingReader, MockTransport) {
        let mock = MockTransport::new(data.to_vec());
        let handle = RemoteObject::open_with_transport(
            "https://bucket.example.com/data.h5",
            None,
            Box::new(mock.clone()),
        )
        .unwrap();
        (CachingReader::new(handle, max_bytes).unwrap(), mock)
    }

    #[test]
    fn test_cache_size_is_bounded() {
        let (small, _) = reader(&object(100), MAX_CACHE_BYTES);
        assert_eq!(small.cache_size(), 100);
        let (large, _) = reader(&object(10_000), 4096);
        assert_eq!(large.cache_size(), 4096);
    }

    #[test]
    fn test_cache_hit_skips_transport() {
        let data = object(1_048_576);
        let (mut r, mock) = reader(&data, MAX_CACHE_BYTES);
        // HEAD plus the priming GET.
        assert_eq!(mock.request_count(), 2);
        let mut buf = [0u8; 100];
        assert_eq!(r.read(0, &mut buf).unwrap(), ReadSource::Cache);
        assert_eq!(&buf[..], &data[..100]);
        assert_eq!(mock.request_count(), 2);
    }

    #[test]
    fn test_miss_delegates() {
        let data = object(10_000);
        let (mut r, mock) = reader(&data, 1024);
        let mut buf = [0u8; 64];
        assert_eq!(r.read(1000, &mut buf).unwrap(), ReadSource::Remote);
        assert_eq!(&buf[..], &data[1000..1064]);
        let log = mock.requests();
        assert_eq!(log.last().unwrap().header("range"), Some("bytes=1000-1063"));
    }

    #[test]
    fn test_matches_uncached_reads() {
        let data = object(8192);
        let (mut cached, _) = reader(&data, 4096);
        let (mut direct, _) = reader(&data, 0);
        assert_eq!(direct.cache_size(), 0);
        for (offset, len) in [(0u64, 1usize), (17, 300), (4000, 96), (4095, 1), (0, 4096)] {
            let mut a = vec![0u8; len];
            let mut b = vec![0u8; len];
            assert_eq!(cached.read(offset, &mut a).unwrap(), ReadSource::Cache);
            assert_eq!(direct.read(offset, &mut b).unwrap(), ReadSource::Remote);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_out_of_range() {
        let (mut r, mock) = reader(&object(1000), MAX_CACHE_BYTES);
        let mut buf = [0u8; 10];
        let err = r.read(995, &mut buf).unwrap_err();
        assert_eq!(err.code(), "RangeExceedsFile");
        let err = r.read(2_000_000, &mut buf).unwrap_err();
        assert_eq!(err.code(), "RangeExceedsFile");
        assert_eq!(mock.request_count(), 2);
    }

    #[test]
    fn test_empty_read_without_cache() {
        let (mut r, mock) = reader(&object(1000), 0);
        assert_eq!(r.read(500, &mut []).unwrap(), ReadSource::Cache);
        assert_eq!(mock.request_count(), 1);
        r.close();
    }
}
