use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers::health::{HealthResponse, ReadinessResponse};
use crate::application::dto::{
    ActiveTokenDto, ActivityLogIndexResponse, ActivityLogPage, ActivityLogQuery, AuditRecordDto,
    CleanLogsRequest, CleanLogsResponse, CleanupTokensResponse, RefreshTokenResponse,
    TokenDebugResponse, ValidateTokenRequest, ValidateTokenResponse,
};
use crate::application::ports::ActivityStat;
use crate::domain::value_objects::TokenMetadata;

/// OpenAPI specification for the activity-audit admin API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Travel Admin Activity API",
        version = "1.0.0",
        description = "Activity log browsing, retention and anti-forgery tokens for the travel admin back office"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        crate::api::handlers::health::health_handler,
        crate::api::handlers::health::readiness_handler,
        crate::api::handlers::activity_logs::list_activity_logs_handler,
        crate::api::handlers::activity_logs::show_activity_log_handler,
        crate::api::handlers::activity_logs::entity_activity_handler,
        crate::api::handlers::activity_logs::activity_stats_handler,
        crate::api::handlers::activity_logs::clean_activity_logs_handler,
        crate::api::handlers::csrf::refresh_token_handler,
        crate::api::handlers::csrf::validate_token_handler,
        crate::api::handlers::csrf::debug_token_handler,
        crate::api::handlers::csrf::cleanup_tokens_handler,
        crate::api::handlers::session::logout_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadinessResponse,
            AuditRecordDto,
            ActivityLogQuery,
            ActivityLogPage,
            ActivityLogIndexResponse,
            ActivityStat,
            CleanLogsRequest,
            CleanLogsResponse,
            ValidateTokenRequest,
            ValidateTokenResponse,
            RefreshTokenResponse,
            CleanupTokensResponse,
            ActiveTokenDto,
            TokenDebugResponse,
            TokenMetadata,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "activity-logs", description = "Admin activity log"),
        (name = "csrf", description = "Anti-forgery token management"),
        (name = "session", description = "Session lifecycle")
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI route
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
