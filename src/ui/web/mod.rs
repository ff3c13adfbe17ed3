//! Minimal HTML surface: login form and file listing.

use axum::http::header;
use axum::response::{Html, IntoResponse};

const STYLE: &str = "body{font-family:sans-serif;max-width:640px;margin:2em auto;padding:0 1em}\
table{width:100%;border-collapse:collapse}td,th{text-align:left;padding:.3em .5em;border-bottom:1px solid #ddd}\
.stats{color:#666;font-size:.9em}.error{color:#c0392b}\
.btn{display:inline-block;padding:.5em 1.5em;background:#4CAF50;color:#fff;text-decoration:none;border:none;border-radius:4px;font-size:1em}";

fn hardening_headers() -> [(header::HeaderName, &'static str); 3] {
    [
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::REFERRER_POLICY, "no-referrer"),
    ]
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title}</title><style>{STYLE}</style></head><body>{body}</body></html>"
    )
}

/// One row of the index listing.
pub struct FileRow {
    pub name: String,
    pub size: u64,
}

/// Live numbers shown on the index page.
pub struct ListingStats {
    pub downloads: u64,
    pub unique_clients: usize,
    pub uptime_secs: u64,
}

pub fn render_login(error: Option<&str>) -> impl IntoResponse {
    let error_html = error
        .map(|msg| format!("<p class=\"error\">{}</p>", escape(msg)))
        .unwrap_or_default();
    let body = format!(
        "<h1>Shared files</h1>{error_html}\
         <form method=\"post\" action=\"/\">\
         <input type=\"password\" name=\"password\" placeholder=\"Enter password\" required autofocus>\
         <button class=\"btn\" type=\"submit\">Unlock</button></form>"
    );
    (hardening_headers(), Html(page("Shared files", &body)))
}

pub fn render_listing(files: &[FileRow], stats: &ListingStats) -> impl IntoResponse {
    let mut rows = String::new();
    for file in files {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>",
            escape(&file.name),
            format_bytes(file.size)
        ));
    }

    let body = format!(
        "<h1>Shared files</h1>\
         <p class=\"stats\">{count} file(s) &middot; {downloads} download(s) &middot; \
         {users} user(s) &middot; up {uptime}</p>\
         <table><tr><th>Name</th><th>Size</th></tr>{rows}</table>\
         <p><a class=\"btn\" href=\"/download\">Download</a></p>",
        count = files.len(),
        downloads = stats.downloads,
        users = stats.unique_clients,
        uptime = format_time(stats.uptime_secs),
    );
    (hardening_headers(), Html(page("Shared files", &body)))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Human-readable byte count, 1024-based.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} PB", value)
}

/// Human-readable duration: seconds, minutes+seconds, or hours+minutes.
pub fn format_time(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
