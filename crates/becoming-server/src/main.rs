//! # becoming-server
//!
//! HTTP API for the Becoming habit tracker.
//!
//! This binary provides:
//! - **Habit engine**: weekly schedules, an idempotent completion ledger,
//!   streaks and analytics recomputed from the ledger on every read
//! - **Boost router** that delivers anonymous boosts to other users
//!   pursuing the same identity
//! - **REST API** (axum) under `/api` with signed bearer-token sessions
//! - **Per-IP rate limiting** to protect against abuse

mod api;
mod auth;
mod config;
mod engine;
mod error;
mod habit_locks;
mod rate_limit;
mod store;
mod summarizer;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::auth::Sessions;
use crate::config::ServerConfig;
use crate::engine::Engine;
use crate::rate_limit::RateLimiter;
use crate::store::Store;
use crate::summarizer::Summarizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,becoming_server=debug")),
        )
        .init();

    info!("Starting Becoming server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Database (creates the file and runs migrations if needed)
    let store = Store::open(&config.database_path)?;

    let summarizer = Arc::new(Summarizer::from_config(&config)?);
    info!(enabled = summarizer.is_enabled(), "Reflection summarizer");

    let engine = Engine::new(store, summarizer);
    let sessions = Sessions::from_config(&config);
    let rate_limiter = RateLimiter::new(config.rate_limit_per_sec, config.rate_limit_burst);

    let app_state = AppState {
        engine: engine.clone(),
        sessions,
        rate_limiter: rate_limiter.clone(),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    let rl = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale(Duration::from_secs(600)).await;
        }
    });

    // Periodic cleanup of per-habit locks nobody holds
    let locks = engine.habit_locks().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            locks.purge_idle().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
