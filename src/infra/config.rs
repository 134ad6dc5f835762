//! Centralized configuration (environment variables + defaults).

use anyhow::Context;
use std::net::SocketAddr;

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Address the api_server binds to.
pub fn bind_addr() -> anyhow::Result<SocketAddr> {
    let raw = var_or("BIND_ADDR", "0.0.0.0:3000");
    raw.parse()
        .with_context(|| format!("BIND_ADDR must be a socket address, got '{}'", raw))
}

/// Database URL. When unset the server falls back to in-memory storage.
pub fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty())
}

/// Table (and resource name) served by the api_server.
pub fn resource_table() -> String {
    var_or("RESOURCE_TABLE", "users")
}

/// Root folder of the HTML views (`<VIEWS_DIR>/<resource>/<view>.html`).
pub fn views_dir() -> String {
    var_or("VIEWS_DIR", "views")
}

/// Mount prefix of the JSON controller.
pub fn api_prefix() -> String {
    var_or("API_PREFIX", "/api")
}

/// Mount prefix of the HTML controller.
pub fn html_prefix() -> String {
    var_or("HTML_PREFIX", "")
}
