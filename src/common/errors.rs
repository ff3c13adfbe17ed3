//! Error taxonomy for session startup and the HTTP boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a session start attempt. The session rolls back to
/// Idle on any of these so the caller can fix the input and retry.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("share path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("a share session is already running")]
    AlreadyActive,

    #[error("no files to share")]
    NoFiles,

    #[error("no free port in range {start}..{end}")]
    NoPortAvailable { start: u16, end: u16 },

    #[error("failed to start listener: {0}")]
    Listener(anyhow::Error),

    #[error("failed to prepare password: {0}")]
    Credential(String),
}

/// Tunnel setup/teardown failures. Never fatal to the session; callers log
/// a warning and continue LAN-only.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("tunnel process failed to start: {0}")]
    Spawn(String),

    #[error("timed out waiting for tunnel URL")]
    UrlTimeout,

    #[error("tunnel shutdown failed: {0}")]
    Shutdown(String),
}

/// Zip construction failures. Local to one request; the listener survives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("no files could be added to the archive")]
    Empty,

    #[error("failed to write archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to finalize archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// HTTP-boundary error with a status mapping. Handlers return this so one
/// failed request never takes the listener down.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!("request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, message).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
