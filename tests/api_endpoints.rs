//! API endpoint tests
//!
//! The router runs against an in-memory activity log; requests go through
//! the full middleware stack via `tower::ServiceExt::oneshot`.

mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use travel_audit::api::create_router;
use travel_audit::api::router::AppState;
use travel_audit::entities::AuditRecord;
use travel_audit::infrastructure::persistence::InMemoryAuditRecordRepository;
use travel_audit::ports::AuditRecordRepository;
use travel_audit::value_objects::{Actor, AuditAction};
use travel_audit::ApplicationBuilder;

use common::{admin, bearer_for, customer, in_memory_state, staff, test_config};

fn request(
    method: Method,
    uri: &str,
    actor: Option<&Actor>,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(header::AUTHORIZATION, bearer_for(actor));
    }
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(data) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(data.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `session_id=...` pair from the response's Set-Cookie header
fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("session cookie issued")
        .to_string()
}

fn app_with(state: &AppState) -> Router {
    create_router(state.clone())
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_needs_no_session() {
        let app = app_with(&in_memory_state());

        let response = send(&app, request(Method::GET, "/health", None, None, None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = json_body(response).await;
        assert_eq!(body["service"], "travel_audit");
    }

    #[tokio::test]
    async fn test_readiness_without_database() {
        let app = app_with(&in_memory_state());

        let response = send(&app, request(Method::GET, "/health/ready", None, None, None)).await;

        assert_eq!(response.status(), StatusCode::OK);
    }
}

mod activity_logs {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_is_unauthorized() {
        let app = app_with(&in_memory_state());

        let response = send(
            &app,
            request(Method::GET, "/admin/activity-logs", None, None, None),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_bearer_is_unauthorized() {
        let app = app_with(&in_memory_state());
        let bad = Request::builder()
            .uri("/admin/activity-logs")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();

        let response = send(&app, bad).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let app = app_with(&in_memory_state());

        let response = send(
            &app,
            request(Method::GET, "/admin/activity-logs", Some(&customer()), None, None),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_index_lists_records_with_filters() {
        let state = in_memory_state();
        state
            .security_events
            .on_login_failure("intruder@example.com", &common::request_ctx(None))
            .await;
        let app = app_with(&state);

        let response = send(
            &app,
            request(
                Method::GET,
                "/admin/activity-logs?action=LOGIN_FAILED&per_page=10",
                Some(&admin()),
                None,
                None,
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["per_page"], 10);
        assert_eq!(body["records"][0]["action"], "LOGIN_FAILED");
        assert_eq!(body["records"][0]["entityName"], "intruder@example.com");
        assert!(body["actions"]
            .as_array()
            .unwrap()
            .contains(&json!("LOGIN_FAILED")));
        assert!(body["entity_types"]
            .as_array()
            .unwrap()
            .contains(&json!("Hotel")));
    }

    #[tokio::test]
    async fn test_show_unknown_record_is_not_found() {
        let app = app_with(&in_memory_state());

        let response = send(
            &app,
            request(Method::GET, "/admin/activity-logs/999", Some(&admin()), None, None),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Activity log not found");
    }

    #[tokio::test]
    async fn test_clean_rejects_token_from_nowhere() {
        let app = app_with(&in_memory_state());

        let response = send(
            &app,
            request(
                Method::POST,
                "/admin/activity-logs/clean",
                Some(&admin()),
                None,
                Some(json!({"days_to_keep": 30, "_token": "forged"})),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Invalid CSRF token.");
    }

    #[tokio::test]
    async fn test_clean_rejects_out_of_range_days() {
        let app = app_with(&in_memory_state());

        let response = send(
            &app,
            request(
                Method::POST,
                "/admin/activity-logs/clean",
                Some(&admin()),
                None,
                Some(json!({"days_to_keep": 0, "_token": "anything"})),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_refresh_then_clean_deletes_old_records() {
        let repo = Arc::new(InMemoryAuditRecordRepository::new());
        let old = AuditRecord::builder(AuditAction::Create, "Hotel")
            .description("Created hotel: Old Inn in Rome")
            .created_at(Utc::now() - Duration::days(200))
            .build();
        repo.store(old).await.unwrap();
        let shared: Arc<dyn AuditRecordRepository> = repo.clone();
        let state = ApplicationBuilder::new(test_config())
            .with_repository(shared)
            .build()
            .unwrap();
        let app = app_with(&state);

        let refreshed = send(
            &app,
            request(
                Method::POST,
                "/admin/csrf/refresh/clean_activity_logs",
                Some(&admin()),
                None,
                None,
            ),
        )
        .await;
        assert_eq!(refreshed.status(), StatusCode::OK);
        let cookie = session_cookie(&refreshed);
        let token = json_body(refreshed).await["token"]
            .as_str()
            .unwrap()
            .to_string();

        let cleaned = send(
            &app,
            request(
                Method::POST,
                "/admin/activity-logs/clean",
                Some(&admin()),
                Some(&cookie),
                Some(json!({"days_to_keep": 90, "_token": token})),
            ),
        )
        .await;

        assert_eq!(cleaned.status(), StatusCode::OK);
        let body = json_body(cleaned).await;
        assert_eq!(body["deleted_count"], 1);
        assert_eq!(body["days_to_keep"], 90);
        assert!(repo.is_empty());
    }
}

mod csrf {
    use super::*;

    #[tokio::test]
    async fn test_customer_cannot_issue_tokens() {
        let app = app_with(&in_memory_state());

        let response = send(
            &app,
            request(Method::POST, "/admin/csrf/refresh/submit", Some(&customer()), None, None),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_reserved_token_id_is_rejected() {
        let app = app_with(&in_memory_state());

        let response = send(
            &app,
            request(Method::POST, "/admin/csrf/refresh/metadata_submit", Some(&staff()), None, None),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_staff_token_validates_within_session_only() {
        let app = app_with(&in_memory_state());

        let refreshed = send(
            &app,
            request(Method::POST, "/admin/csrf/refresh/submit", Some(&staff()), None, None),
        )
        .await;
        assert_eq!(refreshed.status(), StatusCode::OK);
        let cookie = session_cookie(&refreshed);
        let token = json_body(refreshed).await["token"]
            .as_str()
            .unwrap()
            .to_string();

        let same_session = send(
            &app,
            request(
                Method::POST,
                "/admin/csrf/validate/submit",
                Some(&staff()),
                Some(&cookie),
                Some(json!({"_csrf_token": token})),
            ),
        )
        .await;
        assert_eq!(json_body(same_session).await["valid"], true);

        let other_session = send(
            &app,
            request(
                Method::POST,
                "/admin/csrf/validate/submit",
                Some(&staff()),
                None,
                Some(json!({"_csrf_token": token})),
            ),
        )
        .await;
        assert_eq!(json_body(other_session).await["valid"], false);
    }

    #[tokio::test]
    async fn test_debug_never_exposes_raw_tokens() {
        let app = app_with(&in_memory_state());

        let refreshed = send(
            &app,
            request(Method::POST, "/admin/csrf/refresh/submit", Some(&staff()), None, None),
        )
        .await;
        let cookie = session_cookie(&refreshed);
        let token = json_body(refreshed).await["token"]
            .as_str()
            .unwrap()
            .to_string();

        let response = send(
            &app,
            request(
                Method::GET,
                "/admin/csrf/debug/submit",
                Some(&staff()),
                Some(&cookie),
                None,
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["has_token"], true);
        assert!(!body.to_string().contains(&token));
        assert!(body["active_tokens"]["submit"]["fingerprint"].is_string());
    }
}

mod session {
    use super::*;

    async fn logout_count(state: &AppState) -> usize {
        state
            .queries
            .recent_activity(50, None, Some("User"))
            .await
            .unwrap()
            .iter()
            .filter(|r| r.action() == &AuditAction::Logout)
            .count()
    }

    #[tokio::test]
    async fn test_logout_records_once_per_session() {
        let state = in_memory_state();
        let app = app_with(&state);

        let visit = send(
            &app,
            request(Method::GET, "/admin/activity-logs", Some(&admin()), None, None),
        )
        .await;
        assert_eq!(visit.status(), StatusCode::OK);
        let cookie = session_cookie(&visit);

        let logout = send(&app, request(Method::POST, "/logout", None, Some(&cookie), None)).await;
        assert_eq!(logout.status(), StatusCode::NO_CONTENT);
        assert_eq!(logout_count(&state).await, 1);

        let again = send(&app, request(Method::POST, "/logout", None, Some(&cookie), None)).await;
        assert_eq!(again.status(), StatusCode::NO_CONTENT);
        assert_eq!(logout_count(&state).await, 1);

        let record = state
            .queries
            .recent_activity(1, Some(1), Some("User"))
            .await
            .unwrap();
        assert_eq!(record[0].description(), Some("User logged out: admin@example.com"));
    }

    #[tokio::test]
    async fn test_anonymous_logout_records_nothing() {
        let state = in_memory_state();
        let app = app_with(&state);

        let response = send(&app, request(Method::GET, "/logout", None, None, None)).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(logout_count(&state).await, 0);

        let cookies: Vec<&str> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].contains("Max-Age=0"));
        assert!(state.sessions.is_empty());
    }
}
