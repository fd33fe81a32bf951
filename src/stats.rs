//! Per-handle read statistics.
//!
//! Every read that reaches the network is classified by kind (metadata
//! or raw data) and by size into power-of-two bins starting at 1 KiB,
//! with a final overflow bin for anything larger. Cache hits are not
//! recorded.

use std::fmt::Write as _;

/// Number of bounded bins; bin `i` holds reads of at most `2^(10+i)` bytes.
pub const BIN_COUNT: usize = 16;

/// Logical category of a read, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadKind {
    Metadata,
    Raw,
}

/// Counters for one size bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsBin {
    pub count: u64,
    pub bytes: u64,
    pub min: u64,
    pub max: u64,
}

impl StatsBin {
    fn record(&mut self, size: u64) {
        if self.count == 0 || size < self.min {
            self.min = size;
        }
        if size > self.max {
            self.max = size;
        }
        self.count += 1;
        self.bytes += size;
    }
}

/// Sink for transport-backed read sizes.
pub trait StatsCollector: Send {
    fn record(&mut self, kind: ReadKind, size: u64);

    /// Human-readable summary; `None` when collection is disabled.
    fn report(&self) -> Option<String>;
}

/// Collector that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStats;

impl StatsCollector for NoopStats {
    fn record(&mut self, _kind: ReadKind, _size: u64) {}

    fn report(&self) -> Option<String> {
        None
    }
}

/// Size histogram per read kind.
#[derive(Debug, Clone)]
pub struct HistogramStats {
    boundaries: [u64; BIN_COUNT],
    meta: [StatsBin; BIN_COUNT + 1],
    raw: [StatsBin; BIN_COUNT + 1],
}

impl Default for HistogramStats {
    fn default() -> Self {
        Self::new()
    }
}

impl HistogramStats {
    pub fn new() -> Self {
        let mut boundaries = [0u64; BIN_COUNT];
        for (i, bound) in boundaries.iter_mut().enumerate() {
            *bound = 1u64 << (10 + i);
        }
        Self {
            boundaries,
            meta: [StatsBin::default(); BIN_COUNT + 1],
            raw: [StatsBin::default(); BIN_COUNT + 1],
        }
    }

    /// Upper bound of each bounded bin, ascending.
    pub fn boundaries(&self) -> &[u64; BIN_COUNT] {
        &self.boundaries
    }

    /// Index of the bin that holds a read of `size` bytes; `BIN_COUNT`
    /// is the overflow bin.
    pub fn bin_index(&self, size: u64) -> usize {
        self.boundaries.partition_point(|&bound| bound < size)
    }

    pub fn bins(&self, kind: ReadKind) -> &[StatsBin; BIN_COUNT + 1] {
        match kind {
            ReadKind::Metadata => &self.meta,
            ReadKind::Raw => &self.raw,
        }
    }

    /// Aggregate over every bin of one kind.
    pub fn totals(&self, kind: ReadKind) -> StatsBin {
        let mut total = StatsBin::default();
        for bin in self.bins(kind).iter().filter(|b| b.count > 0) {
            if total.count == 0 || bin.min < total.min {
                total.min = bin.min;
            }
            total.max = total.max.max(bin.max);
            total.count += bin.count;
            total.bytes += bin.bytes;
        }
        total
    }

    fn render(&self) -> String {
        let meta = self.totals(ReadKind::Metadata);
        let raw = self.totals(ReadKind::Raw);
        let mut out = String::new();

        let _ = writeln!(out, "TOTAL READS: {} ({} meta, {} raw)", meta.count + raw.count, meta.count, raw.count);
        let _ = writeln!(
            out,
            "TOTAL BYTES: {} ({} meta, {} raw)",
            meta.bytes + raw.bytes,
            meta.bytes,
            raw.bytes
        );
        if meta.count + raw.count == 0 {
            return out;
        }

        let _ = writeln!(out, "SIZES     meta      raw");
        for (label, pick) in [("  min", 0usize), ("  avg", 1), ("  max", 2)] {
            let cell = |t: &StatsBin| -> String {
                if t.count == 0 {
                    return "-".to_string();
                }
                let value = match pick {
                    0 => t.min as f64,
                    1 => t.bytes as f64 / t.count as f64,
                    _ => t.max as f64,
                };
                format_binary_size(value)
            };
            let _ = writeln!(out, "{label}  {:>8} {:>8}", cell(&meta), cell(&raw));
        }

        let _ = writeln!(out, "BINS              meta count     raw count");
        for i in 0..=BIN_COUNT {
            let (m, r) = (self.meta[i], self.raw[i]);
            if m.count == 0 && r.count == 0 {
                continue;
            }
            let label = if i < BIN_COUNT {
                format!("<= {}", format_binary_size(self.boundaries[i] as f64))
            } else {
                format!(" > {}", format_binary_size(self.boundaries[BIN_COUNT - 1] as f64))
            };
            let _ = writeln!(out, "  {label:<12} {:>12} {:>13}", m.count, r.count);
        }
        out
    }
}

impl StatsCollector for HistogramStats {
    fn record(&mut self, kind: ReadKind, size: u64) {
        let index = self.bin_index(size);
        match kind {
            ReadKind::Metadata => self.meta[index].record(size),
            ReadKind::Raw => self.raw[index].record(size),
        }
    }

    fn report(&self) -> Option<String> {
        Some(self.render())
    }
}

/// Format a byte count with a binary-prefix suffix (k, M, G, T, P),
/// one decimal place once a suffix applies.
pub fn format_binary_size(bytes: f64) -> String {
    const SUFFIXES: [&str; 5] = ["k", "M", "G", "T", "P"];
    if bytes < 1024.0 {
        return format!("{bytes:.0}");
    }
    let mut value = bytes;
    let mut suffix = SUFFIXES[0];
    for s in SUFFIXES {
        value /= 1024.0;
        suffix = s;
        if value < 1024.0 {
            break;
        }
    }
    format!("{value:.1}{suffix}")
}
