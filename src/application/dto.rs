use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::ports::ActivityStat;
use crate::domain::entities::AuditRecord;
use crate::domain::value_objects::TokenMetadata;

/// Default page size of the admin activity screen
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Default retention when the clean form omits `days_to_keep`
pub const DEFAULT_DAYS_TO_KEEP: i64 = 90;

/// DTO for activity record responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecordDto {
    pub id: Option<i64>,
    #[schema(example = "UPDATE")]
    pub action: String,
    #[schema(example = "Hotel")]
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub entity_name: Option<String>,
    pub user_id: Option<i64>,
    pub user_email: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub old_data: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub new_data: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl From<AuditRecord> for AuditRecordDto {
    fn from(record: AuditRecord) -> Self {
        Self {
            id: record.id(),
            action: record.action().to_string(),
            entity_type: record.entity_type().to_string(),
            entity_id: record.entity_id(),
            entity_name: record.entity_name().map(str::to_string),
            user_id: record.user_id(),
            user_email: record.user_email().map(str::to_string),
            description: record.description().map(str::to_string),
            old_data: record.old_data().map(|s| s.to_value()),
            new_data: record.new_data().map(|s| s.to_value()),
            ip_address: record.ip_address().map(str::to_string),
            user_agent: record.user_agent().map(str::to_string),
            created_at: record.created_at().to_rfc3339(),
        }
    }
}

/// Filters and paging for the admin activity screen
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct ActivityLogQuery {
    /// 1-based page number (default: 1)
    pub page: Option<u32>,
    /// Records per page (default: 50, max: 500)
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
}

/// One page of activity records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivityLogPage {
    pub records: Vec<AuditRecordDto>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

/// Admin index response: page plus statistics and filter vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivityLogIndexResponse {
    #[serde(flatten)]
    pub page: ActivityLogPage,
    pub stats: Vec<ActivityStat>,
    pub actions: Vec<String>,
    pub entity_types: Vec<String>,
}

/// DTO for the retention form
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CleanLogsRequest {
    #[validate(range(min = 1, max = 36500, message = "days_to_keep must be between 1 and 36500"))]
    #[serde(default = "default_days_to_keep")]
    pub days_to_keep: i64,
    /// Anti-forgery token for `clean_activity_logs`
    #[serde(rename = "_token")]
    #[validate(length(min = 1, message = "_token is required"))]
    pub token: String,
}

fn default_days_to_keep() -> i64 {
    DEFAULT_DAYS_TO_KEEP
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CleanLogsResponse {
    pub deleted_count: u64,
    pub days_to_keep: i64,
}

/// DTO for anti-forgery token validation
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ValidateTokenRequest {
    #[serde(rename = "_csrf_token", default)]
    pub csrf_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub token_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenResponse {
    pub token: String,
    pub token_id: String,
    pub cleaned_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CleanupTokensResponse {
    pub cleaned_count: usize,
}

/// Token as reported by the debug view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActiveTokenDto {
    /// Log-safe fingerprint, never the token itself
    pub fingerprint: String,
    pub metadata: Option<TokenMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenDebugResponse {
    pub token_id: String,
    pub session_id: Option<String>,
    pub has_token: bool,
    pub active_tokens: std::collections::BTreeMap<String, ActiveTokenDto>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub host: Option<String>,
    pub tunneled: bool,
}
