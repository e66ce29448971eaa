use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::router::AppState;
use crate::domain::value_objects::Actor;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User id
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: usize,
}

/// Identity resolved from the bearer token; `None` for anonymous requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentIdentity(pub Option<Actor>);

/// Resolve `Authorization: Bearer <jwt>` into a [`CurrentIdentity`].
///
/// A missing header means anonymous. A present but invalid token is 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let identity = match headers.get("Authorization") {
        None => None,
        Some(value) => {
            let auth_header = value.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or(StatusCode::UNAUTHORIZED)?;
            let secret = state
                .config
                .jwt_secret
                .as_deref()
                .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
            Some(validate_jwt(token, secret)?)
        }
    };

    request.extensions_mut().insert(CurrentIdentity(identity));
    Ok(next.run(request).await)
}

/// Validate JWT token and map its claims onto an [`Actor`]
pub fn validate_jwt(token: &str, secret: &str) -> Result<Actor, StatusCode> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    let claims = token_data.claims;
    let id: i64 = claims.sub.parse().map_err(|_| StatusCode::UNAUTHORIZED)?;
    let mut actor = Actor::new(id, claims.email).with_roles(claims.roles);
    if let Some(name) = claims.name {
        actor = actor.with_display_name(name);
    }
    Ok(actor)
}
