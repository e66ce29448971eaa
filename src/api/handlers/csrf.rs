use axum::{
    extract::{Extension, Path, State},
    response::Json,
};
use tracing::debug;

use crate::api::errors::ApiError;
use crate::api::middleware::RequestContext;
use crate::api::router::AppState;
use crate::application::dto::{
    ActiveTokenDto, CleanupTokensResponse, RefreshTokenResponse, TokenDebugResponse,
    ValidateTokenRequest, ValidateTokenResponse,
};
use crate::application::use_cases::is_reserved_token_id;
use crate::domain::authorization::staff_only;

/// POST /admin/csrf/refresh/{token_id}
/// Issue a fresh token, then drop expired ones
#[utoipa::path(
    post,
    path = "/admin/csrf/refresh/{token_id}",
    tag = "csrf",
    params(("token_id" = String, Path, description = "Token purpose, e.g. clean_activity_logs")),
    responses(
        (status = 200, description = "Token issued", body = RefreshTokenResponse),
        (status = 400, description = "Reserved token id"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "ROLE_STAFF required")
    )
)]
pub async fn refresh_token_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(token_id): Path<String>,
) -> Result<Json<RefreshTokenResponse>, ApiError> {
    ApiError::authorize(staff_only(ctx.identity.as_ref()))?;
    if is_reserved_token_id(&token_id) {
        return Err(ApiError::bad_request(format!("Token id {} is reserved", token_id)));
    }

    let scope = ctx.token_scope();
    let token = state.csrf_ledger.generate_token(&scope, &token_id);
    let cleaned_count = state.csrf_ledger.cleanup_expired_tokens(&scope);
    debug!(
        "Refreshed token {} ({}) for session {}",
        token_id,
        token.fingerprint(),
        ctx.session_id
    );

    Ok(Json(RefreshTokenResponse {
        token: token.into_string(),
        token_id,
        cleaned_count,
    }))
}

/// POST /admin/csrf/validate/{token_id}
#[utoipa::path(
    post,
    path = "/admin/csrf/validate/{token_id}",
    tag = "csrf",
    params(("token_id" = String, Path, description = "Token purpose")),
    request_body = ValidateTokenRequest,
    responses(
        (status = 200, description = "Validation result", body = ValidateTokenResponse),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "ROLE_STAFF required")
    )
)]
pub async fn validate_token_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(token_id): Path<String>,
    Json(request): Json<ValidateTokenRequest>,
) -> Result<Json<ValidateTokenResponse>, ApiError> {
    ApiError::authorize(staff_only(ctx.identity.as_ref()))?;

    let valid = state.csrf_ledger.check_token_validity(
        &ctx.token_scope(),
        &token_id,
        Some(request.csrf_token.as_str()),
    );

    Ok(Json(ValidateTokenResponse { valid, token_id }))
}

/// GET /admin/csrf/debug/{token_id}
/// Active tokens of this session (fingerprints only) and request details
#[utoipa::path(
    get,
    path = "/admin/csrf/debug/{token_id}",
    tag = "csrf",
    params(("token_id" = String, Path, description = "Token purpose")),
    responses(
        (status = 200, description = "Debug information", body = TokenDebugResponse),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "ROLE_STAFF required")
    )
)]
pub async fn debug_token_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(token_id): Path<String>,
) -> Result<Json<TokenDebugResponse>, ApiError> {
    ApiError::authorize(staff_only(ctx.identity.as_ref()))?;

    let active = state.csrf_ledger.get_active_tokens(&ctx.token_scope());
    let has_token = active.contains_key(&token_id);
    let active_tokens = active
        .into_iter()
        .map(|(id, entry)| {
            (
                id,
                ActiveTokenDto {
                    fingerprint: entry.token.fingerprint(),
                    metadata: entry.metadata,
                },
            )
        })
        .collect();

    Ok(Json(TokenDebugResponse {
        token_id,
        session_id: Some(ctx.session_id.clone()),
        has_token,
        active_tokens,
        ip_address: ctx.request.ip_address.clone(),
        user_agent: ctx.request.user_agent.clone(),
        host: ctx.request.host.clone(),
        tunneled: ctx.request.is_tunneled(),
    }))
}

/// POST /admin/csrf/cleanup
#[utoipa::path(
    post,
    path = "/admin/csrf/cleanup",
    tag = "csrf",
    responses(
        (status = 200, description = "Expired tokens removed", body = CleanupTokensResponse),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "ROLE_STAFF required")
    )
)]
pub async fn cleanup_tokens_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<CleanupTokensResponse>, ApiError> {
    ApiError::authorize(staff_only(ctx.identity.as_ref()))?;

    let cleaned_count = state.csrf_ledger.cleanup_expired_tokens(&ctx.token_scope());
    Ok(Json(CleanupTokensResponse { cleaned_count }))
}
