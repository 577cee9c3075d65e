// This is the entry point of the moderation service.
//
// **Architecture Overview:**
// - `core/` = Business logic (no HTTP, no SQL)
// - `infra/` = Implementations of core traits (SQLite, backend REST, JWT)
// - `api/` = HTTP adapters (routes, extractors, error envelope)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Start the background sweeps
// 4. Serve the HTTP API

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "api/api_layer.rs"]
mod api;
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::AppConfig;
use crate::infra::backend::BackendClient;
use crate::infra::identity::JwtIdentityProvider;

const PRUNE_INTERVAL: StdDuration = StdDuration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let pool = infra::sqlite_support::connect(&config.database_url).await?;
    let backend = BackendClient::new(
        &config.backend_url,
        &config.backend_service_key,
        config.backend_timeout,
    )?;
    let identity = Arc::new(JwtIdentityProvider::new(&config.jwt_secret));

    let state = AppState::build(
        pool,
        backend,
        identity,
        config.moderation(),
        config.classifier_api_key.clone(),
        config.trusted_proxies.clone(),
    )
    .await?;

    if state.classifier_key.is_none() {
        tracing::warn!("CLASSIFIER_API_KEY not set; classifier ingestion is disabled");
    }

    // ========================================================================
    // BACKGROUND SWEEPS
    // ========================================================================

    // Finish (or discard) dispositions interrupted between the backend delete
    // and the flag update.
    {
        let moderation = Arc::clone(&state.moderation);
        let interval = config.reconcile_interval;
        tokio::spawn(async move {
            loop {
                if let Err(e) = moderation.reconcile_dispositions().await {
                    tracing::error!(error = %e, "Reconciliation pass failed");
                }
                sleep(interval).await;
            }
        });
    }

    // Drop rate limit events that can no longer count against any window.
    {
        let limiter = Arc::clone(&state.limiter);
        let window = config.report_policy().window;
        tokio::spawn(async move {
            loop {
                sleep(PRUNE_INTERVAL).await;
                match limiter.prune_expired(window).await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed, "Pruned expired rate limit events"),
                    Err(e) => tracing::warn!(error = %e, "Rate limit prune failed"),
                }
            }
        });
    }

    // ========================================================================
    // HTTP
    // ========================================================================

    let app = api::router(state);

    tracing::info!(addr = %config.bind_addr, "moderation service starting");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
