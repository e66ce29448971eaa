use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use tracing::{info, warn};

use crate::api::errors::ApiError;
use crate::api::middleware::validation::validate_and_respond;
use crate::api::middleware::RequestContext;
use crate::api::router::AppState;
use crate::application::dto::{
    ActivityLogIndexResponse, ActivityLogQuery, AuditRecordDto, CleanLogsRequest,
    CleanLogsResponse,
};
use crate::application::ports::ActivityStat;
use crate::domain::authorization::admin_only;
use crate::domain::value_objects::AuditAction;

/// Token id the retention form is issued under
pub const CLEAN_LOGS_TOKEN_ID: &str = "clean_activity_logs";

/// GET /admin/activity-logs
/// Paged, filtered activity log with statistics
#[utoipa::path(
    get,
    path = "/admin/activity-logs",
    tag = "activity-logs",
    params(
        ("page" = Option<u32>, Query, description = "1-based page (default: 1)"),
        ("per_page" = Option<u32>, Query, description = "Records per page (default: 50, max: 500)"),
        ("search" = Option<String>, Query, description = "Case-insensitive substring"),
        ("action" = Option<String>, Query, description = "Exact action"),
        ("entity_type" = Option<String>, Query, description = "Exact entity type")
    ),
    responses(
        (status = 200, description = "Activity page", body = ActivityLogIndexResponse),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "ROLE_ADMIN required"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_activity_logs_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ActivityLogQuery>,
) -> Result<Json<ActivityLogIndexResponse>, ApiError> {
    ApiError::authorize(admin_only(ctx.identity.as_ref()))?;

    let page = state.queries.browse(query).await?;
    let stats = state.queries.activity_stats().await?;

    Ok(Json(ActivityLogIndexResponse {
        page,
        stats,
        actions: AuditAction::FILTERABLE
            .iter()
            .map(|a| a.as_str().to_string())
            .collect(),
        entity_types: state
            .kinds
            .entity_types()
            .into_iter()
            .map(str::to_string)
            .collect(),
    }))
}

/// GET /admin/activity-logs/{id}
#[utoipa::path(
    get,
    path = "/admin/activity-logs/{id}",
    tag = "activity-logs",
    params(("id" = i64, Path, description = "Activity record id")),
    responses(
        (status = 200, description = "Activity record", body = AuditRecordDto),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "ROLE_ADMIN required"),
        (status = 404, description = "Activity log not found")
    )
)]
pub async fn show_activity_log_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Json<AuditRecordDto>, ApiError> {
    ApiError::authorize(admin_only(ctx.identity.as_ref()))?;

    state
        .queries
        .find(id)
        .await?
        .map(|record| Json(record.into()))
        .ok_or_else(|| ApiError::not_found("Activity log not found"))
}

/// GET /admin/activity-logs/entity/{entity_type}/{entity_id}
/// Full history of one entity, newest first
#[utoipa::path(
    get,
    path = "/admin/activity-logs/entity/{entity_type}/{entity_id}",
    tag = "activity-logs",
    params(
        ("entity_type" = String, Path, description = "Entity type, e.g. Hotel"),
        ("entity_id" = i64, Path, description = "Entity id")
    ),
    responses(
        (status = 200, description = "Entity history", body = [AuditRecordDto]),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "ROLE_ADMIN required")
    )
)]
pub async fn entity_activity_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((entity_type, entity_id)): Path<(String, i64)>,
) -> Result<Json<Vec<AuditRecordDto>>, ApiError> {
    ApiError::authorize(admin_only(ctx.identity.as_ref()))?;

    let history = state.queries.entity_activity(&entity_type, entity_id).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

/// GET /admin/activity-logs/stats
#[utoipa::path(
    get,
    path = "/admin/activity-logs/stats",
    tag = "activity-logs",
    responses(
        (status = 200, description = "Counts per action and entity type", body = [ActivityStat]),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "ROLE_ADMIN required")
    )
)]
pub async fn activity_stats_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Vec<ActivityStat>>, ApiError> {
    ApiError::authorize(admin_only(ctx.identity.as_ref()))?;

    Ok(Json(state.queries.activity_stats().await?))
}

/// POST /admin/activity-logs/clean
/// Delete records older than `days_to_keep` days
#[utoipa::path(
    post,
    path = "/admin/activity-logs/clean",
    tag = "activity-logs",
    request_body = CleanLogsRequest,
    responses(
        (status = 200, description = "Old records deleted", body = CleanLogsResponse),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "ROLE_ADMIN required or invalid CSRF token"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn clean_activity_logs_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(request): Json<CleanLogsRequest>,
) -> Result<Json<CleanLogsResponse>, ApiError> {
    ApiError::authorize(admin_only(ctx.identity.as_ref()))?;
    validate_and_respond(&request)?;

    let scope = ctx.token_scope();
    if !state
        .csrf_ledger
        .check_token_validity(&scope, CLEAN_LOGS_TOKEN_ID, Some(&request.token))
    {
        warn!("Rejected activity log cleanup: invalid CSRF token");
        return Err(ApiError::forbidden("Invalid CSRF token."));
    }

    let deleted_count = state.queries.clean_old_logs(request.days_to_keep).await?;
    info!(
        "Cleaned up {} old activity logs (older than {} days)",
        deleted_count, request.days_to_keep
    );

    Ok(Json(CleanLogsResponse {
        deleted_count,
        days_to_keep: request.days_to_keep,
    }))
}
