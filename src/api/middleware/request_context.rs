use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::api::middleware::auth::CurrentIdentity;
use crate::api::router::AppState;
use crate::application::capture::EntityChangeCapture;
use crate::application::ports::SessionStore;
use crate::application::use_cases::TokenScope;
use crate::domain::value_objects::{Actor, ActorContext, RequestMetadata};
use crate::infrastructure::session::InMemorySession;

pub const SESSION_COOKIE: &str = "session_id";
pub const SESSION_HEADER: &str = "x-session-id";

const LOGOUT_ROUTE: &str = "app_logout";

/// Route names for paths that security capture cares about
const ROUTE_NAMES: &[(&str, &str)] = &[
    ("/logout", LOGOUT_ROUTE),
    ("/admin/activity-logs", "admin_activity_logs_index"),
    ("/admin/activity-logs/clean", "admin_activity_logs_clean"),
];

/// Per-request session, identity and client metadata
#[derive(Clone)]
pub struct RequestContext {
    pub session_id: String,
    pub session: Arc<InMemorySession>,
    pub request: RequestMetadata,
    pub identity: Option<Actor>,
    /// Entity change capture scoped to this request
    pub entity_changes: Arc<EntityChangeCapture>,
}

impl RequestContext {
    pub fn actor_context(&self) -> ActorContext {
        ActorContext::new(self.identity.clone(), Some(self.request.clone()))
    }

    pub fn token_scope(&self) -> TokenScope {
        let session: Arc<dyn SessionStore> = self.session.clone();
        TokenScope::new(Some(session), Some(self.request.clone()))
    }
}

/// Attach a [`RequestContext`] and feed the request to security capture.
///
/// Must run inside `auth_middleware` so the identity is already resolved.
/// A request without a known session gets a fresh one via `Set-Cookie`,
/// except on logout, which only sees a throwaway session. The request's
/// entity change scope is closed once the response is ready.
pub async fn request_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let route = route_name(request.uri().path());
    let (session, issued) = match session_id_from(headers).and_then(|id| state.sessions.get(&id))
    {
        Some(session) => (session, false),
        None if route == LOGOUT_ROUTE => (state.sessions.transient(), false),
        None => (state.sessions.create(), true),
    };
    let session_id = session.id();

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let mut metadata = RequestMetadata::new(
        client_ip(headers, state.config.trust_forwarded_headers).or(peer),
        header_str(headers, header::USER_AGENT.as_str()),
    )
    .with_route(route);
    if let Some(host) = header_str(headers, header::HOST.as_str()) {
        metadata = metadata.with_host(host);
    }

    let identity = request
        .extensions()
        .get::<CurrentIdentity>()
        .and_then(|current| current.0.clone());

    let ctx = RequestContext {
        session_id: session_id.clone(),
        session,
        request: metadata,
        identity,
        entity_changes: state.entity_changes.begin(),
    };
    let entity_changes = Arc::clone(&ctx.entity_changes);
    let actor_ctx = ctx.actor_context();
    state
        .security_events
        .on_request(&session_id, actor_ctx.route(), &actor_ctx)
        .await;

    request.extensions_mut().insert(ctx);
    let mut response = next.run(request).await;
    entity_changes.finish_scope();

    if issued {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, session_id
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Could not issue session cookie: {}", e),
        }
    }
    response
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Session id from the `session_id` cookie, else the `X-Session-Id` header
pub fn session_id_from(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty());
    from_cookie.or_else(|| header_str(headers, SESSION_HEADER))
}

/// Client address as reported by a trusted proxy or tunnel.
///
/// Only well-formed addresses are accepted; anything else leaves the caller
/// to fall back to the peer address.
pub fn client_ip(headers: &HeaderMap, trust_forwarded: bool) -> Option<String> {
    if !trust_forwarded {
        return None;
    }
    header_str(headers, "x-forwarded-for")
        .and_then(|chain| chain.split(',').next().and_then(parse_ip))
        .or_else(|| header_str(headers, "x-real-ip").and_then(|v| parse_ip(&v)))
}

fn parse_ip(value: &str) -> Option<String> {
    value
        .trim()
        .parse::<IpAddr>()
        .ok()
        .map(|ip| ip.to_string())
}

pub fn route_name(path: &str) -> String {
    let trimmed = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    ROUTE_NAMES
        .iter()
        .find(|(route_path, _)| *route_path == trimmed)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}
