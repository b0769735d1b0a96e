//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use becoming_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_SESSION_TTL_HOURS};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:5000`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./becoming.db`
    pub database_path: PathBuf,

    /// Ed25519 secret used to sign session tokens (hex-encoded, 64 chars).
    /// Env: `SESSION_SIGNING_KEY`
    /// Default: none, a random key is generated at startup.
    pub session_signing_key: Option<String>,

    /// Session lifetime.
    /// Env: `SESSION_TTL_HOURS`
    /// Default: 168 (one week)
    pub session_ttl: chrono::Duration,

    // -- Summarizer --

    /// generateContent-style endpoint.
    /// Env: `SUMMARIZER_URL`
    pub summarizer_url: Option<String>,

    /// Env: `SUMMARIZER_API_KEY`
    pub summarizer_api_key: Option<String>,

    /// Env: `SUMMARIZER_TIMEOUT_SECS`
    /// Default: 10
    pub summarizer_timeout: Duration,

    // -- Rate limiting --

    /// Sustained requests per second per client IP.
    /// Env: `RATE_LIMIT_PER_SEC`
    pub rate_limit_per_sec: f64,

    /// Burst capacity per client IP.
    /// Env: `RATE_LIMIT_BURST`
    pub rate_limit_burst: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./becoming.db"),
            session_signing_key: None,
            session_ttl: chrono::Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            summarizer_url: None,
            summarizer_api_key: None,
            summarizer_timeout: Duration::from_secs(10),
            rate_limit_per_sec: 10.0,
            rate_limit_burst: 30.0,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("session_signing_key", &redact(&self.session_signing_key))
            .field("session_ttl_hours", &self.session_ttl.num_hours())
            .field("summarizer_url", &self.summarizer_url)
            .field("summarizer_api_key", &redact(&self.summarizer_api_key))
            .field("summarizer_timeout", &self.summarizer_timeout)
            .field("rate_limit_per_sec", &self.rate_limit_per_sec)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .finish()
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(path) = lookup("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database_path = PathBuf::from(path);
        }

        config.session_signing_key = non_empty(lookup("SESSION_SIGNING_KEY"));

        if let Some(val) = lookup("SESSION_TTL_HOURS") {
            match val.parse::<i64>() {
                Ok(hours) if hours > 0 => config.session_ttl = chrono::Duration::hours(hours),
                _ => tracing::warn!(value = %val, "Invalid SESSION_TTL_HOURS, using default"),
            }
        }

        // -- Summarizer --

        config.summarizer_url = non_empty(lookup("SUMMARIZER_URL"));
        config.summarizer_api_key = non_empty(lookup("SUMMARIZER_API_KEY"));

        if let Some(val) = lookup("SUMMARIZER_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.summarizer_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid SUMMARIZER_TIMEOUT_SECS, using default"),
            }
        }

        // -- Rate limiting --

        if let Some(val) = lookup("RATE_LIMIT_PER_SEC") {
            match positive_f64(&val) {
                Some(rate) => config.rate_limit_per_sec = rate,
                None => tracing::warn!(value = %val, "Invalid RATE_LIMIT_PER_SEC, using default"),
            }
        }

        if let Some(val) = lookup("RATE_LIMIT_BURST") {
            match positive_f64(&val) {
                Some(burst) if burst >= 1.0 => config.rate_limit_burst = burst,
                _ => tracing::warn!(value = %val, "Invalid RATE_LIMIT_BURST, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn positive_f64(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}
