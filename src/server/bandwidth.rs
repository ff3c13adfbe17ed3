//! Byte accounting shared by all request workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Point-in-time view of transfer totals and derived rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthSnapshot {
    pub download_bytes: u64,
    pub upload_bytes: u64,
    /// Bytes per second since the tracking origin. 0 when elapsed <= 0.
    pub download_rate: f64,
    pub upload_rate: f64,
    pub elapsed_secs: f64,
}

/// Lock-free byte counters plus a resettable elapsed-time origin.
///
/// Counters only move forward between resets; concurrent increments from any
/// number of serving tasks never lose updates.
pub struct BandwidthTracker {
    download_bytes: AtomicU64,
    upload_bytes: AtomicU64,
    // Origin is swapped wholesale on reset, so a plain mutex is enough.
    origin: Mutex<Instant>,
}

impl BandwidthTracker {
    pub fn new() -> Self {
        Self {
            download_bytes: AtomicU64::new(0),
            upload_bytes: AtomicU64::new(0),
            origin: Mutex::new(Instant::now()),
        }
    }

    pub fn add_download(&self, bytes: u64) {
        self.download_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_upload(&self, bytes: u64) {
        self.upload_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BandwidthSnapshot {
        let origin = match self.origin.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        let elapsed = origin.elapsed().as_secs_f64();
        let download_bytes = self.download_bytes.load(Ordering::Relaxed);
        let upload_bytes = self.upload_bytes.load(Ordering::Relaxed);

        let rate = |bytes: u64| {
            if elapsed > 0.0 {
                bytes as f64 / elapsed
            } else {
                0.0
            }
        };

        BandwidthSnapshot {
            download_bytes,
            upload_bytes,
            download_rate: rate(download_bytes),
            upload_rate: rate(upload_bytes),
            elapsed_secs: elapsed,
        }
    }

    /// Zeroes both counters and restarts the elapsed origin.
    pub fn reset(&self) {
        let mut origin = match self.origin.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.download_bytes.store(0, Ordering::Relaxed);
        self.upload_bytes.store(0, Ordering::Relaxed);
        *origin = Instant::now();
    }
}

impl Default for BandwidthTracker {
    fn default() -> Self {
        Self::new()
    }
}
