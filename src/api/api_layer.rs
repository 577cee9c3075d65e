// The api module is the HTTP surface of the moderation service.
//
// Handlers stay thin: extract the caller, call one core operation, wrap the
// result in the response envelope. Errors convert through `ApiError`.

#[path = "error.rs"]
pub mod error;

#[path = "extract.rs"]
pub mod extract;

#[path = "routes/mod.rs"]
pub mod routes;

use axum::routing::{get, post};
use axum::Router;
use sqlx::{Pool, Sqlite};
use std::net::IpAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::audit::AuditService;
use crate::core::identity::IdentityProvider;
use crate::core::moderation::{ModerationConfig, ModerationService};
use crate::core::rate_limit::RateLimiter;
use crate::infra::audit::SqliteAuditStore;
use crate::infra::backend::BackendClient;
use crate::infra::moderation::SqliteModerationStore;
use crate::infra::rate_limit::SqliteRateLimitStore;

pub type Moderation =
    ModerationService<SqliteModerationStore, BackendClient, SqliteAuditStore, SqliteRateLimitStore>;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub moderation: Arc<Moderation>,
    pub audit: Arc<AuditService<SqliteAuditStore, BackendClient>>,
    pub limiter: Arc<RateLimiter<SqliteRateLimitStore>>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Shared key for classifier ingestion; `None` disables the endpoint
    pub classifier_key: Option<Arc<str>>,
    /// Peers whose `X-Forwarded-For` header is believed
    pub trusted_proxies: Arc<[IpAddr]>,
}

impl AppState {
    /// Wire the services over one SQLite pool, creating tables as needed.
    pub async fn build(
        pool: Pool<Sqlite>,
        backend: BackendClient,
        identity: Arc<dyn IdentityProvider>,
        config: ModerationConfig,
        classifier_key: Option<String>,
        trusted_proxies: Vec<IpAddr>,
    ) -> anyhow::Result<Self> {
        let moderation_store = SqliteModerationStore::new(pool.clone());
        moderation_store.migrate().await?;
        let audit_store = SqliteAuditStore::new(pool.clone());
        audit_store.migrate().await?;
        let rate_limit_store = SqliteRateLimitStore::new(pool);
        rate_limit_store.migrate().await?;

        let backend = Arc::new(backend);
        let audit = Arc::new(AuditService::new(audit_store, Arc::clone(&backend)));
        let limiter = Arc::new(RateLimiter::new(rate_limit_store));
        let moderation = Arc::new(ModerationService::new(
            moderation_store,
            backend,
            Arc::clone(&audit),
            Arc::clone(&limiter),
            config,
        ));

        Ok(Self {
            moderation,
            audit,
            limiter,
            identity,
            classifier_key: classifier_key.map(Arc::from),
            trusted_proxies: trusted_proxies.into(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/reports", post(routes::reports::file_report))
        .route("/reports/quota", get(routes::reports::quota))
        .route("/internal/flags", post(routes::classifier::ingest_flag))
        .nest("/admin", routes::admin::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
