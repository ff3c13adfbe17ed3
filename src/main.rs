use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use sharefast::common::config::{apply_overrides, load_config, ConfigOverrides};
use sharefast::server::session::{SessionOptions, SessionState, ShareSession};
use sharefast::transport::tunnel::{CloudflareTunnel, TunnelBinding};
use sharefast::ui::web::format_bytes;

#[derive(Parser)]
#[command(name = "sharefast")]
#[command(about = "Share local files over HTTP on the LAN or through a public tunnel")]
struct Cli {
    #[arg(required = true, help = "Files or directories to share")]
    paths: Vec<PathBuf>,

    #[arg(short, long, help = "Preferred port (probes upward when busy)")]
    port: Option<u16>,

    #[arg(long, help = "Require this password before serving downloads")]
    password: Option<String>,

    #[arg(long, help = "Auto-stop after this many minutes")]
    expire: Option<u64>,

    #[arg(long, help = "Never auto-stop")]
    no_expire: bool,

    #[arg(long, help = "Skip the public tunnel and stay LAN-only")]
    lan_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        port: cli.port,
        expire_minutes: cli.expire,
    };
    let config = apply_overrides(load_config()?, &overrides);
    config.validate()?;

    let expire_minutes = if cli.no_expire {
        None
    } else {
        Some(config.session.expire_minutes)
    };

    let mut session = ShareSession::new(config).with_activity(Arc::new(|method, path| {
        tracing::info!(method, path, "request");
    }));

    let tunnel: Option<Box<dyn TunnelBinding>> = if cli.lan_only {
        None
    } else {
        Some(Box::new(CloudflareTunnel::new()))
    };

    let opts = SessionOptions {
        paths: cli.paths,
        port: None, // already folded into config via --port
        password: cli.password,
        expire_minutes,
        lan_only: cli.lan_only,
    };

    let summary = session.start(opts, tunnel).await?.clone();

    println!(
        "Sharing {} file(s), {} total",
        summary.file_count,
        format_bytes(summary.total_bytes)
    );
    println!("LAN URL:    {}", summary.local_url);
    if let Some(url) = &summary.public_url {
        println!("Public URL: {}", url);
    }
    if let Some(secs) = session.remaining_secs() {
        println!("Auto-stop in {} minute(s). Ctrl+C to stop sooner.", secs / 60);
    } else {
        println!("No auto-stop. Ctrl+C to stop.");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_err() {
                    tracing::error!("failed to listen for Ctrl+C");
                }
                tracing::info!("Ctrl+C received, stopping share");
                break;
            }
            _ = ticker.tick() => {
                session.tick().await;
                if session.state() == SessionState::Stopped {
                    println!("Share expired.");
                    break;
                }
            }
        }
    }

    session.stop().await;

    let stats = session.bandwidth();
    println!(
        "Served {} download(s) to {} client(s), {} sent.",
        session.downloads(),
        session.unique_clients(),
        format_bytes(stats.download_bytes)
    );

    Ok(())
}
