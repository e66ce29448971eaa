use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::api::handlers::{
    activity_stats_handler, cleanup_tokens_handler, clean_activity_logs_handler,
    debug_token_handler, entity_activity_handler, health_handler, list_activity_logs_handler,
    logout_handler, readiness_handler, refresh_token_handler, show_activity_log_handler,
    validate_token_handler,
};
use crate::api::middleware::{auth, cors, request_context};
use crate::api::openapi::swagger_ui;
use crate::application::capture::{EntityChangeScopes, ManualAuditHelper, SecurityEventCapture};
use crate::application::use_cases::{AuditQueryService, CsrfTokenLedger};
use crate::config::Config;
use crate::domain::tracking::KindRegistry;
use crate::infrastructure::session::SessionRegistry;

/// Admin forms and token calls are small JSON documents
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Application state container
#[derive(Clone)]
pub struct AppState {
    /// `None` when the activity log is kept in memory
    pub pool: Option<Arc<PgPool>>,
    pub queries: Arc<AuditQueryService>,
    /// Opens the per-request capture scope; see [`RequestContext`](crate::api::middleware::request_context::RequestContext)
    pub entity_changes: Arc<EntityChangeScopes>,
    pub security_events: Arc<SecurityEventCapture>,
    pub manual_audit: Arc<ManualAuditHelper>,
    pub csrf_ledger: Arc<CsrfTokenLedger>,
    pub sessions: Arc<SessionRegistry>,
    pub kinds: Arc<KindRegistry>,
    pub config: Arc<Config>,
}

/// Create router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/activity-logs", get(list_activity_logs_handler))
        .route("/activity-logs/stats", get(activity_stats_handler))
        .route("/activity-logs/clean", post(clean_activity_logs_handler))
        .route(
            "/activity-logs/entity/{entity_type}/{entity_id}",
            get(entity_activity_handler),
        )
        .route("/activity-logs/{id}", get(show_activity_log_handler))
        .route("/csrf/refresh/{token_id}", post(refresh_token_handler))
        .route("/csrf/validate/{token_id}", post(validate_token_handler))
        .route("/csrf/debug/{token_id}", get(debug_token_handler))
        .route("/csrf/cleanup", post(cleanup_tokens_handler));

    let cors_layer = cors::create_cors_layer(&state.config.allowed_origins);

    Router::new()
        .nest("/admin", admin)
        .route("/logout", get(logout_handler).post(logout_handler))
        // Session + identity aware routes end here
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            request_context::request_context_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        // Health checks (no auth, no session)
        .route("/health", get(health_handler))
        .route("/health/ready", get(readiness_handler))
        .merge(swagger_ui())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(cors_layer)
        .with_state(state)
}
