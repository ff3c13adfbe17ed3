//! Share-session lifecycle: start, active, expiry, stop.
//!
//! One `ShareSession` value owns the listener handle, the optional tunnel,
//! the expiry clock, and the counters. Request workers only ever see the
//! `Arc`-shared pieces (guard, tracker, counters), so stopping concurrently
//! with in-flight requests is safe: the graceful-shutdown grace period lets
//! them drain, then remaining connections are closed.

use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use crate::common::{config::AppConfig, ShareError};
use crate::server::auth::AccessGuard;
use crate::server::bandwidth::{BandwidthSnapshot, BandwidthTracker};
use crate::server::routes;
use crate::server::state::{ActivityCallback, ShareCounters, ShareState};
use crate::transport::local::{bind_first_free, get_local_ip, start_listener};
use crate::transport::tunnel::TunnelBinding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Active,
    Stopping,
    /// Equivalent to `Idle` for the next cycle.
    Stopped,
}

impl SessionState {
    fn can_start(self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Stopped)
    }
}

/// How the session is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
    Lan,
    Internet,
}

/// Caller-selected options for one sharing cycle.
pub struct SessionOptions {
    /// Files or directories to expose. Directories expand to their files.
    pub paths: Vec<PathBuf>,
    /// Preferred port; probing starts here, falling back to the configured range.
    pub port: Option<u16>,
    pub password: Option<String>,
    /// Countdown until auto-stop. `None` disables expiry; zero expires on the
    /// next tick.
    pub expire_minutes: Option<u64>,
    pub lan_only: bool,
}

/// Snapshot of session facts for the caller to display or persist.
/// The core itself never writes history.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub paths: Vec<PathBuf>,
    pub file_count: usize,
    pub total_bytes: u64,
    pub local_url: String,
    pub public_url: Option<String>,
    pub mode: ShareMode,
    pub started_at: DateTime<Local>,
}

struct ActiveShare {
    handle: axum_server::Handle,
    port: u16,
    tunnel: Option<Box<dyn TunnelBinding>>,
    expires_at: Option<Instant>,
    summary: SessionSummary,
}

pub struct ShareSession {
    config: AppConfig,
    state: SessionState,
    guard: Arc<AccessGuard>,
    bandwidth: Arc<BandwidthTracker>,
    counters: Arc<ShareCounters>,
    activity: Option<ActivityCallback>,
    active: Option<ActiveShare>,
}

impl ShareSession {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            // Placeholder guard; replaced on every start.
            guard: Arc::new(AccessGuard::open_access()),
            bandwidth: Arc::new(BandwidthTracker::new()),
            counters: Arc::new(ShareCounters::new()),
            activity: None,
            active: None,
        }
    }

    /// Installs the caller's activity sink (fire and forget, UI log etc).
    pub fn with_activity(mut self, callback: ActivityCallback) -> Self {
        self.activity = Some(callback);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn bandwidth(&self) -> BandwidthSnapshot {
        self.bandwidth.snapshot()
    }

    pub fn downloads(&self) -> u64 {
        self.counters.downloads()
    }

    pub fn unique_clients(&self) -> usize {
        self.counters.unique_clients()
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.active.as_ref().map(|a| &a.summary)
    }

    pub fn port(&self) -> Option<u16> {
        self.active.as_ref().map(|a| a.port)
    }

    /// Seconds until auto-stop, if a countdown is armed.
    pub fn remaining_secs(&self) -> Option<u64> {
        let expires_at = self.active.as_ref()?.expires_at?;
        Some(expires_at.saturating_duration_since(Instant::now()).as_secs())
    }

    /// Starts sharing. The listener is bound and accepting before this
    /// returns and before the expiry countdown is armed, so a tick can never
    /// fire against a half-started session. Any failure rolls the session
    /// back to Idle with nothing bound.
    pub async fn start(
        &mut self,
        opts: SessionOptions,
        tunnel: Option<Box<dyn TunnelBinding>>,
    ) -> Result<&SessionSummary, ShareError> {
        if !self.state.can_start() {
            return Err(ShareError::AlreadyActive);
        }

        let (files, total_bytes) = resolve_paths(&opts.paths)?;
        if files.is_empty() {
            return Err(ShareError::NoFiles);
        }

        let guard = Arc::new(AccessGuard::new(opts.password.as_deref())?);

        self.state = SessionState::Starting;
        self.bandwidth.reset();
        self.counters.reset();
        self.guard = guard;

        let port_start = opts.port.unwrap_or(self.config.server.port_start);
        let listener = match bind_first_free(port_start, self.config.server.port_range) {
            Ok(listener) => listener,
            Err(err) => {
                self.state = SessionState::Idle;
                return Err(err);
            }
        };

        let share_state = ShareState::new(
            Arc::new(files),
            Arc::clone(&self.guard),
            Arc::clone(&self.bandwidth),
            Arc::clone(&self.counters),
            self.activity.clone(),
        );
        let app = routes::create_share_router(&share_state);

        let (port, handle) = match start_listener(app, listener) {
            Ok(result) => result,
            Err(err) => {
                self.state = SessionState::Idle;
                return Err(ShareError::Listener(err));
            }
        };

        let local_ip = get_local_ip().unwrap_or_else(|_| "127.0.0.1".to_string());
        let local_url = format!("http://{}:{}", local_ip, port);

        // Tunnel failure falls open to LAN-only; it never aborts the start.
        let mut public_url = None;
        let tunnel = match (opts.lan_only, tunnel) {
            (true, _) | (false, None) => None,
            (false, Some(mut binding)) => match binding.open(port).await {
                Ok(url) => {
                    public_url = Some(url);
                    Some(binding)
                }
                Err(err) => {
                    tracing::warn!("tunnel unavailable, falling back to LAN only: {}", err);
                    None
                }
            },
        };

        let expires_at = opts
            .expire_minutes
            .map(|minutes| Instant::now() + Duration::from_secs(minutes.saturating_mul(60)));

        let mode = if public_url.is_some() {
            ShareMode::Internet
        } else {
            ShareMode::Lan
        };

        let summary = SessionSummary {
            paths: opts.paths,
            file_count: share_state.files.len(),
            total_bytes,
            local_url,
            public_url,
            mode,
            started_at: Local::now(),
        };

        tracing::info!(
            port,
            files = summary.file_count,
            bytes = summary.total_bytes,
            mode = ?summary.mode,
            "sharing started"
        );

        self.state = SessionState::Active;
        let active = self.active.insert(ActiveShare {
            handle,
            port,
            tunnel,
            expires_at,
            summary,
        });

        Ok(&active.summary)
    }

    /// Periodic (~1 Hz) expiry check. The only automatic-transition driver:
    /// nothing else stops a session behind the caller's back.
    pub async fn tick(&mut self) {
        if self.state != SessionState::Active {
            return;
        }

        let expired = self
            .active
            .as_ref()
            .and_then(|a| a.expires_at)
            .is_some_and(|at| Instant::now() >= at);

        if expired {
            tracing::info!("share expired, stopping");
            self.stop().await;
        }
    }

    /// Stops sharing: drains the listener within the grace period, tears the
    /// tunnel down, and clears all client auth state. No-op when already
    /// stopped.
    pub async fn stop(&mut self) {
        if !matches!(self.state, SessionState::Active | SessionState::Starting) {
            return;
        }
        self.state = SessionState::Stopping;

        if let Some(mut active) = self.active.take() {
            let grace = Duration::from_secs(self.config.server.shutdown_grace_secs);
            active.handle.graceful_shutdown(Some(grace));

            if let Some(tunnel) = active.tunnel.as_mut() {
                if let Err(err) = tunnel.close().await {
                    tracing::warn!("tunnel teardown failed: {}", err);
                }
            }

            tracing::info!(port = active.port, "sharing stopped");
        }

        self.guard.revoke_all();
        self.state = SessionState::Stopped;
    }
}

/// Expands selected paths into the ordered file list served this session.
/// Every selected path must exist up front; files inside a directory are
/// best-effort at serving time.
fn resolve_paths(paths: &[PathBuf]) -> Result<(Vec<PathBuf>, u64), ShareError> {
    let mut files = Vec::new();
    let mut total = 0u64;

    for path in paths {
        if !path.exists() {
            return Err(ShareError::PathNotFound(path.clone()));
        }

        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
            {
                if let Ok(meta) = entry.metadata() {
                    total += meta.len();
                }
                files.push(entry.path().to_path_buf());
            }
        } else {
            if let Ok(meta) = path.metadata() {
                total += meta.len();
            }
            files.push(path.clone());
        }
    }

    Ok((files, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn resolve_rejects_missing_path() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("missing.txt");

        match resolve_paths(&[gone.clone()]) {
            Err(ShareError::PathNotFound(p)) => assert_eq!(p, gone),
            other => panic!("expected PathNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn resolve_expands_directories_in_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), b"bb").unwrap();
        fs::write(dir.path().join("a.txt"), b"aaa").unwrap();

        let (files, total) = resolve_paths(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();

        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(total, 5);
    }

    #[test]
    fn resolve_sums_plain_file_sizes() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x.bin");
        fs::write(&file, vec![0u8; 42]).unwrap();

        let (files, total) = resolve_paths(&[file.clone()]).unwrap();
        assert_eq!(files, vec![file]);
        assert_eq!(total, 42);
    }
}
