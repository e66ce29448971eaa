use axum::{
    extract::{Extension, State},
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::api::middleware::request_context::SESSION_COOKIE;
use crate::api::middleware::RequestContext;
use crate::api::router::AppState;

/// GET|POST /logout
/// End the session and record the logout
#[utoipa::path(
    post,
    path = "/logout",
    tag = "session",
    responses(
        (status = 204, description = "Session ended")
    )
)]
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> impl IntoResponse {
    state
        .security_events
        .on_logout(&ctx.session_id, ctx.identity.as_ref(), &ctx.actor_context())
        .await;

    state.sessions.destroy(&ctx.session_id);
    state.security_events.forget_session(&ctx.session_id);

    (
        StatusCode::NO_CONTENT,
        [(
            header::SET_COOKIE,
            format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE),
        )],
    )
}
