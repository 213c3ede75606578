//! HTTP server wiring: shared state, routes, background sweep

use anyhow::{Context, Result};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use triecache::TrieCache;

use crate::auth::{self, TokenIssuer};
use crate::config::Config;
use crate::handlers;
use crate::logging;
use crate::rate_limit::{self, ClientRateLimiter};
use crate::users::UserManager;

/// State shared by every request
pub struct AppState {
    /// Word index behind its lookup cache
    pub store: Arc<TrieCache>,
    /// Accounts allowed to obtain tokens
    pub users: UserManager,
    /// Token signer and verifier
    pub tokens: TokenIssuer,
    /// Per-client request limits
    pub limiter: ClientRateLimiter,
    /// Longest accepted word, in code points
    pub max_word_len: usize,
}

impl AppState {
    /// Build fresh state from validated settings
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            store: Arc::new(TrieCache::new(config.cache)),
            users: UserManager::from_config(config)?,
            tokens: TokenIssuer::new(&config.secret_key, config.token_ttl),
            limiter: ClientRateLimiter::new(config.rate_per_second, config.rate_burst),
            max_word_len: config.max_word_len,
        })
    }
}

/// Build the router
///
/// `/api/login` is public; every `/api/v1` route requires a bearer token.
/// All routes are rate limited and logged.
pub fn router(state: Arc<AppState>) -> Router {
    let v1 = Router::new()
        .route("/api/v1", get(handlers::root))
        .route("/api/v1/", get(handlers::root))
        .route(
            "/api/v1/words",
            get(handlers::list_words)
                .post(handlers::add_words)
                .delete(handlers::delete_words),
        )
        .route("/api/v1/words/exists", get(handlers::word_exists))
        .route("/api/v1/stats", get(handlers::stats))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_bearer,
        ));

    Router::new()
        .route("/api/login", post(handlers::login))
        .merge(v1)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            rate_limit::limit_per_client,
        ))
        .layer(middleware::from_fn(logging::log_requests))
        .with_state(state)
}

/// Periodically drop expired cache entries and idle rate limit buckets
pub fn spawn_sweeper(state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let purged = state.store.purge_expired();
            state.limiter.prune();
            debug!(
                "Sweep removed {} expired cache entries, tracking {} clients",
                purged,
                state.limiter.len()
            );
        }
    })
}

/// Serve until Ctrl+C
pub async fn run(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(&config)?);
    let sweeper = spawn_sweeper(Arc::clone(&state), config.sweep_interval);

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    sweeper.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
