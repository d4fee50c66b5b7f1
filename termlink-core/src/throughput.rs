//! Data rate measurement.

use parking_lot::Mutex;
use std::fmt;
use std::time::Instant;

/// Unit a throughput value is expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ByteUnit {
    #[default]
    BytesPerSec,
    KilobytesPerSec,
    MegabytesPerSec,
}

impl ByteUnit {
    /// Number of bytes per second one unit stands for.
    pub fn divisor(self) -> u32 {
        match self {
            ByteUnit::BytesPerSec => 1,
            ByteUnit::KilobytesPerSec => 1024,
            ByteUnit::MegabytesPerSec => 1_048_576,
        }
    }

    /// Picks the largest unit the rate exceeds.
    pub fn for_rate(bytes_per_sec: f64) -> Self {
        if bytes_per_sec > ByteUnit::MegabytesPerSec.divisor() as f64 {
            ByteUnit::MegabytesPerSec
        } else if bytes_per_sec > ByteUnit::KilobytesPerSec.divisor() as f64 {
            ByteUnit::KilobytesPerSec
        } else {
            ByteUnit::BytesPerSec
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            ByteUnit::BytesPerSec => "B/s",
            ByteUnit::KilobytesPerSec => "KB/s",
            ByteUnit::MegabytesPerSec => "MB/s",
        }
    }
}

/// A measured data rate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Throughput {
    pub value: f64,
    pub unit: ByteUnit,
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.value, self.unit.suffix())
    }
}

#[derive(Default)]
struct Inner {
    started_at: Option<Instant>,
    bytes: u64,
}

/// Average data rate since `start`.
#[derive(Default)]
pub struct ThroughputCalculator {
    inner: Mutex<Inner>,
}

impl ThroughputCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts measuring. Does nothing if already started.
    pub fn start(&self) {
        let mut inner = self.inner.lock();
        if inner.started_at.is_none() {
            inner.started_at = Some(Instant::now());
            inner.bytes = 0;
        }
    }

    /// Stops measuring and forgets everything reported.
    pub fn reset(&self) {
        *self.inner.lock() = Inner::default();
    }

    /// Accounts `bytes`; ignored until `start` is called.
    pub fn report_bytes(&self, bytes: usize) {
        let mut inner = self.inner.lock();
        if inner.started_at.is_some() {
            inner.bytes += bytes as u64;
        }
    }

    pub fn is_started(&self) -> bool {
        self.inner.lock().started_at.is_some()
    }

    /// Returns the average rate since `start`.
    pub fn get(&self) -> Throughput {
        self.get_at(Instant::now())
    }

    fn get_at(&self, now: Instant) -> Throughput {
        let inner = self.inner.lock();
        let Some(started_at) = inner.started_at else {
            return Throughput::default();
        };

        let elapsed_ms = now.saturating_duration_since(started_at).as_millis();
        if elapsed_ms == 0 || inner.bytes == 0 {
            return Throughput::default();
        }

        let rate = inner.bytes as f64 / elapsed_ms as f64 * 1000.0;
        let unit = ByteUnit::for_rate(rate);
        Throughput {
            value: rate / unit.divisor() as f64,
            unit,
        }
    }
}
