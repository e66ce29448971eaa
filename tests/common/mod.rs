//! Shared fixtures for the integration tests
//!
//! Every test builds its own in-memory application so records never leak
//! between tests.

#![allow(dead_code)]

use jsonwebtoken::{encode, EncodingKey, Header};

use travel_audit::api::middleware::auth::Claims;
use travel_audit::api::router::AppState;
use travel_audit::value_objects::{Actor, ActorContext, RequestMetadata};
use travel_audit::{ApplicationBuilder, Config};

pub const JWT_SECRET: &str = "integration-test-secret";

/// Configuration for tests: in-memory everything, known JWT secret
pub fn test_config() -> Config {
    Config {
        jwt_secret: Some(JWT_SECRET.to_string()),
        ..Default::default()
    }
}

/// Application state backed by an in-memory activity log
pub fn in_memory_state() -> AppState {
    in_memory_state_with(test_config())
}

pub fn in_memory_state_with(config: Config) -> AppState {
    ApplicationBuilder::new(config)
        .with_in_memory_log()
        .build()
        .expect("in-memory application should build")
}

pub fn admin() -> Actor {
    Actor::new(1, "admin@example.com")
        .with_display_name("Ada Admin")
        .with_roles(vec!["ROLE_ADMIN".to_string(), "ROLE_USER".to_string()])
}

pub fn staff() -> Actor {
    Actor::new(2, "staff@example.com")
        .with_display_name("Sam Staff")
        .with_roles(vec!["ROLE_STAFF".to_string()])
}

pub fn customer() -> Actor {
    Actor::new(3, "user@example.com").with_roles(vec!["ROLE_USER".to_string()])
}

/// Acting context as a browser request would produce it
pub fn request_ctx(actor: Option<Actor>) -> ActorContext {
    ActorContext::new(
        actor,
        Some(RequestMetadata::new(
            Some("203.0.113.7".to_string()),
            Some("Mozilla/5.0 (integration)".to_string()),
        )),
    )
}

/// Signed bearer token for `actor`, valid for ten minutes
pub fn bearer_for(actor: &Actor) -> String {
    let claims = Claims {
        sub: actor.id.to_string(),
        email: actor.email.clone(),
        name: actor.display_name.clone(),
        roles: actor.roles.clone(),
        exp: (chrono::Utc::now().timestamp() + 600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token should encode");
    format!("Bearer {}", token)
}
