//! Listener bootstrap: port probing and background server startup.
//!
//! The listener binds all interfaces so LAN devices can reach it; public
//! exposure beyond the LAN goes through the tunnel collaborator.

use anyhow::{Context, Result};
use std::net::{SocketAddr, TcpListener, UdpSocket};

use crate::common::ShareError;

/// Probes `count` consecutive ports starting at `start` and returns the first
/// listener that binds. The whole range being busy is the one unrecoverable
/// startup failure.
pub fn bind_first_free(start: u16, count: u16) -> Result<TcpListener, ShareError> {
    let end = start.saturating_add(count);
    for port in start..end {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match TcpListener::bind(addr) {
            Ok(listener) => {
                tracing::debug!(port, "bound listener");
                return Ok(listener);
            }
            Err(_) => continue,
        }
    }
    Err(ShareError::NoPortAvailable { start, end })
}

/// Starts the Axum server on an already-bound listener and returns
/// `(bound_port, handle)`. The server runs as a background task; the handle
/// drives graceful shutdown.
pub fn start_listener(
    app: axum::Router,
    listener: TcpListener,
) -> Result<(u16, axum_server::Handle)> {
    listener
        .set_nonblocking(true)
        .context("Failed to set listener to non-blocking mode")?;

    let port = listener.local_addr()?.port();

    let server_handle = axum_server::Handle::new();
    let server_handle_clone = server_handle.clone();

    tokio::spawn(async move {
        if let Err(e) = axum_server::from_tcp(listener)
            .handle(server_handle_clone)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
        {
            tracing::error!("server error: {}", e);
        }
    });

    Ok((port, server_handle))
}

/// Best-effort local non-loopback IP discovery for the shareable URL.
pub fn get_local_ip() -> Result<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to bind socket for IP detection")?;

    socket
        .connect("8.8.8.8:80")
        .context("Failed to connect socket for IP detection")?;

    let local_addr = socket.local_addr().context("Failed to get local address")?;

    Ok(local_addr.ip().to_string())
}
