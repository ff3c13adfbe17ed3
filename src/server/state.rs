//! Shared state handed to every request worker.

use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::server::auth::AccessGuard;
use crate::server::bandwidth::BandwidthTracker;

/// Fire-and-forget notification sink owned by the caller (e.g. a UI log).
pub type ActivityCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Download count and unique-client set for one session.
///
/// Both only move forward within a session; `reset` runs atomically with
/// session start.
pub struct ShareCounters {
    downloads: AtomicU64,
    unique_clients: DashMap<String, ()>,
}

impl ShareCounters {
    pub fn new() -> Self {
        Self {
            downloads: AtomicU64::new(0),
            unique_clients: DashMap::new(),
        }
    }

    /// Counts one completed download for `client_id`. Returns the new total.
    pub fn record_download(&self, client_id: &str) -> u64 {
        self.unique_clients.insert(client_id.to_string(), ());
        self.downloads.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn downloads(&self) -> u64 {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn unique_clients(&self) -> usize {
        self.unique_clients.len()
    }

    pub fn reset(&self) {
        self.downloads.store(0, Ordering::SeqCst);
        self.unique_clients.clear();
    }
}

impl Default for ShareCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a handler needs, cheap to clone per request.
#[derive(Clone)]
pub struct ShareState {
    /// Resolved, ordered list of files being served. Fixed at session start.
    pub files: Arc<Vec<PathBuf>>,
    pub guard: Arc<AccessGuard>,
    pub bandwidth: Arc<BandwidthTracker>,
    pub counters: Arc<ShareCounters>,
    pub started_at: Instant,
    activity: Option<ActivityCallback>,
}

impl ShareState {
    pub fn new(
        files: Arc<Vec<PathBuf>>,
        guard: Arc<AccessGuard>,
        bandwidth: Arc<BandwidthTracker>,
        counters: Arc<ShareCounters>,
        activity: Option<ActivityCallback>,
    ) -> Self {
        Self {
            files,
            guard,
            bandwidth,
            counters,
            started_at: Instant::now(),
            activity,
        }
    }

    /// Side-effect-free observability hook, called once per request.
    pub fn report_activity(&self, method: &str, path: &str) {
        if let Some(callback) = &self.activity {
            callback(method, path);
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
