//! Router definition for the sharing surface.

use axum::{routing::get, Router};

use crate::server::{handlers, state::ShareState};

/// Builds the share router. `/` serves the listing (or the login form),
/// `/download` serves the file or archive.
pub fn create_share_router(state: &ShareState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/", get(handlers::index).post(handlers::login))
        .route("/download", get(handlers::download))
        .with_state(state.clone())
}
