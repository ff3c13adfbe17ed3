//! HTTP handlers for the index page, login form, and downloads.

use axum::{
    body::Body,
    extract::{ConnectInfo, Form, State},
    http::{header, HeaderMap, Response, StatusCode},
    response::{IntoResponse, Redirect, Response as AxumResponse},
};
use chrono::Local;
use futures_util::TryStreamExt;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::common::{AppError, ArchiveError};
use crate::server::archive;
use crate::server::auth::{AccessDecision, AuthCookie, AUTH_COOKIE};
use crate::server::state::ShareState;
use crate::ui::web::{self, FileRow, ListingStats};

#[derive(Deserialize)]
pub struct LoginForm {
    password: String,
}

fn basic_credential(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

fn listing_stats(state: &ShareState) -> ListingStats {
    ListingStats {
        downloads: state.counters.downloads(),
        unique_clients: state.counters.unique_clients(),
        uptime_secs: state.uptime_secs(),
    }
}

/// `GET /`: login challenge for unauthenticated clients, file listing otherwise.
pub async fn index(
    AuthCookie(token): AuthCookie,
    headers: HeaderMap,
    State(state): State<ShareState>,
) -> AxumResponse {
    state.report_activity("GET", "/");

    let decision = state.guard.check(token.as_deref(), basic_credential(&headers));
    if decision != AccessDecision::Allow {
        return web::render_login(None).into_response();
    }

    let files: Vec<FileRow> = state
        .files
        .iter()
        .filter_map(|path| {
            let meta = std::fs::metadata(path).ok()?;
            Some(FileRow {
                name: base_name(path),
                size: meta.len(),
            })
        })
        .collect();

    web::render_listing(&files, &listing_stats(&state)).into_response()
}

/// `POST /`: password form submission. Correct password grants an auth
/// cookie and redirects home; a wrong one re-renders the form with an error.
pub async fn login(
    State(state): State<ShareState>,
    Form(form): Form<LoginForm>,
) -> AxumResponse {
    state.report_activity("POST", "/");

    if !state.guard.password_required() {
        return Redirect::to("/").into_response();
    }

    if state.guard.verify(&form.password) {
        let token = state.guard.grant();
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", AUTH_COOKIE, token);
        return ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response();
    }

    tracing::warn!("rejected login attempt");
    web::render_login(Some("Incorrect password")).into_response()
}

/// `GET /download`: single file streamed as-is, multiple files zipped.
pub async fn download(
    AuthCookie(token): AuthCookie,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<ShareState>,
) -> Result<AxumResponse, AppError> {
    state.report_activity("GET", "/download");

    let decision = state.guard.check(token.as_deref(), basic_credential(&headers));
    if decision != AccessDecision::Allow {
        return Ok(Redirect::to("/").into_response());
    }

    if state.files.is_empty() {
        return Err(AppError::NotFound("no files available".to_string()));
    }

    let client_id = addr.ip().to_string();

    let response = if state.files.len() == 1 {
        serve_single_file(&state, &state.files[0]).await?
    } else {
        serve_archive(&state).await?
    };

    // Counted before the body finishes streaming; a mid-stream disconnect
    // still counts as one download attempt, matching the session contract.
    let total = state.counters.record_download(&client_id);
    tracing::info!(client = %client_id, downloads = total, "download started");

    Ok(response)
}

/// Streams one file as an attachment, counting bytes as they go out.
async fn serve_single_file(state: &ShareState, path: &PathBuf) -> Result<AxumResponse, AppError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|_| AppError::NotFound("file not found".to_string()))?;
    let size = file
        .metadata()
        .await
        .map_err(|e| AppError::Internal(format!("failed to stat file: {e}")))?
        .len();

    let tracker = Arc::clone(&state.bandwidth);
    // Client disconnects surface as stream errors inside hyper and are
    // swallowed there; nothing to handle here.
    let stream =
        ReaderStream::new(file).inspect_ok(move |chunk| tracker.add_download(chunk.len() as u64));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", base_name(path)),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("failed to build response: {e}")))?;

    Ok(response)
}

/// Zips every shared file that still exists and serves the bundle.
async fn serve_archive(state: &ShareState) -> Result<AxumResponse, AppError> {
    let paths: Vec<PathBuf> = state.files.as_ref().clone();
    let bytes = tokio::task::spawn_blocking(move || archive::build_zip(&paths))
        .await
        .map_err(|e| AppError::Internal(format!("archive task failed: {e}")))?
        .map_err(|err| match err {
            ArchiveError::Empty => AppError::NotFound("no files available".to_string()),
            other => AppError::Internal(format!("failed to build archive: {other}")),
        })?;

    state.bandwidth.add_download(bytes.len() as u64);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                archive::archive_name(Local::now())
            ),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(format!("failed to build response: {e}")))?;

    Ok(response)
}

fn base_name(path: &PathBuf) -> String {
    path.file_name()
        .and_then(|x| x.to_str())
        .unwrap_or("file")
        .to_string()
}
