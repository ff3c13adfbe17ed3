#![allow(dead_code)]

use axum::extract::connect_info::MockConnectInfo;
use axum::{body::Body, http::Request, Router};
use std::fs::File;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use sharefast::server::auth::AccessGuard;
use sharefast::server::bandwidth::BandwidthTracker;
use sharefast::server::routes;
use sharefast::server::state::{ShareCounters, ShareState};

pub const CLIENT_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 41234);

pub fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).expect("create test file");
    file.write_all(contents).expect("write test file");
    path
}

/// Builds a router plus the state it serves, with a fixed mock peer address.
pub fn create_test_app(files: Vec<PathBuf>, password: Option<&str>) -> (Router, ShareState) {
    let state = ShareState::new(
        Arc::new(files),
        Arc::new(AccessGuard::new(password).expect("guard")),
        Arc::new(BandwidthTracker::new()),
        Arc::new(ShareCounters::new()),
        None,
    );
    let app = routes::create_share_router(&state)
        .layer(MockConnectInfo(SocketAddr::from(CLIENT_ADDR)));
    (app, state)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("cookie", cookie)
        .body(Body::empty())
        .expect("build request")
}

pub fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("build request")
}
