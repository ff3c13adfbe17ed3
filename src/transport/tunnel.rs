//! Public-tunnel collaborator: maps the local port to a public URL.
//!
//! The session only depends on `open`/`close`; the concrete provider is an
//! implementation detail behind the trait, and every failure here is
//! best-effort; sharing falls back to LAN-only.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tracing::{info, warn};

use crate::common::TunnelError;

const TUNNEL_URL_TIMEOUT: Duration = Duration::from_secs(15);
const TUNNEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Optional public exposure of the bound port. Owned by the session; never
/// outlives it.
#[async_trait]
pub trait TunnelBinding: Send {
    /// Opens the tunnel for `port` and returns the public URL.
    async fn open(&mut self, port: u16) -> Result<String, TunnelError>;

    /// Tears the tunnel down. Idempotent; failures are logged, not fatal.
    async fn close(&mut self) -> Result<(), TunnelError>;
}

#[derive(Deserialize)]
struct QuickTunnelResponse {
    hostname: String,
}

/// `cloudflared` quick-tunnel provider.
pub struct CloudflareTunnel {
    process: Option<Child>,
}

impl CloudflareTunnel {
    pub fn new() -> Self {
        Self { process: None }
    }
}

impl Default for CloudflareTunnel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TunnelBinding for CloudflareTunnel {
    async fn open(&mut self, port: u16) -> Result<String, TunnelError> {
        let metrics_port = get_available_port()
            .ok_or_else(|| TunnelError::Spawn("no free port for tunnel metrics".to_string()))?;

        let mut child = Command::new("cloudflared")
            .args([
                "tunnel",
                "--url",
                &format!("http://localhost:{}", port),
                "--metrics",
                &format!("localhost:{}", metrics_port),
                "--no-autoupdate",
                "--protocol",
                "http2",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TunnelError::Spawn(e.to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(log_stderr(stderr));
        }

        let url = match wait_for_url(metrics_port).await {
            Ok(url) => url,
            Err(e) => {
                if let Err(kill_err) = child.kill().await {
                    warn!("failed to kill tunnel process: {}", kill_err);
                }
                return Err(e);
            }
        };

        info!(url = %url, "tunnel established");
        self.process = Some(child);
        Ok(url)
    }

    async fn close(&mut self) -> Result<(), TunnelError> {
        let Some(mut process) = self.process.take() else {
            return Ok(());
        };

        if let Err(e) = process.kill().await {
            // A failed kill usually means the process is already dead.
            warn!("failed to signal tunnel process: {}", e);
            return Ok(());
        }

        match tokio::time::timeout(Duration::from_secs(5), process.wait()).await {
            Ok(Ok(status)) => {
                info!("tunnel process exited with status: {}", status);
                Ok(())
            }
            Ok(Err(e)) => Err(TunnelError::Shutdown(e.to_string())),
            Err(_) => {
                warn!("tunnel process did not exit after 5 seconds");
                Ok(())
            }
        }
    }
}

async fn wait_for_url(metrics_port: u16) -> Result<String, TunnelError> {
    let client = reqwest::Client::new();
    let api_url = format!("http://localhost:{}/quicktunnel", metrics_port);

    let deadline = tokio::time::Instant::now() + TUNNEL_URL_TIMEOUT;

    while tokio::time::Instant::now() < deadline {
        // Errors are expected while cloudflared is still initializing.
        if let Ok(res) = client.get(&api_url).send().await {
            if let Ok(json) = res.json::<QuickTunnelResponse>().await {
                if !json.hostname.is_empty() {
                    return Ok(format!("https://{}", json.hostname));
                }
            }
        }

        tokio::time::sleep(TUNNEL_POLL_INTERVAL).await;
    }

    Err(TunnelError::UrlTimeout)
}

fn get_available_port() -> Option<u16> {
    std::net::TcpListener::bind("127.0.0.1:0")
        .ok()
        .and_then(|l| l.local_addr().ok())
        .map(|a| a.port())
}

// cloudflared uses stderr for both logs and errors; surface only failures.
async fn log_stderr(stderr: ChildStderr) {
    let reader = BufReader::new(stderr);
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.ok().flatten() {
        let lowercase_line = line.to_lowercase();
        if lowercase_line.contains("error") || lowercase_line.contains("fatal") {
            tracing::error!("cloudflared stderr: {}", line);
        }
    }
}
