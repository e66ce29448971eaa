use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::entities::AuditRecord;
use crate::domain::value_objects::AuditAction;
#[cfg(test)]
use mockall::{automock, predicate::*};

/// Repository for storing and retrieving activity records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditRecordRepository: Send + Sync {
    /// Insert a record in its own write; returns it with the assigned id
    async fn store(&self, record: AuditRecord) -> Result<AuditRecord, AuditRepositoryError>;

    /// Find one record by id
    async fn find_by_id(&self, id: i64) -> Result<Option<AuditRecord>, AuditRepositoryError>;

    /// Query records newest-first; `limit = None` means unbounded
    async fn query(
        &self,
        filter: &AuditQueryFilter,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<AuditRecord>, AuditRepositoryError>;

    /// Count records matching a filter
    async fn count(&self, filter: &AuditQueryFilter) -> Result<i64, AuditRepositoryError>;

    /// Record counts grouped by (action, entity type), largest first
    async fn stats(&self) -> Result<Vec<ActivityStat>, AuditRepositoryError>;

    /// Delete records created strictly before `cutoff` (retention policy)
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditRepositoryError>;
}

/// Filter for querying activity records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQueryFilter {
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub user_id: Option<i64>,
    /// Case-insensitive substring over action, entity type, description,
    /// entity name and user email
    pub search: Option<String>,
}

impl AuditQueryFilter {
    /// Whether a record satisfies every set criterion
    pub fn matches(&self, record: &AuditRecord) -> bool {
        self.action.as_ref().map_or(true, |a| record.action() == a)
            && self
                .entity_type
                .as_deref()
                .map_or(true, |t| record.entity_type() == t)
            && self.entity_id.map_or(true, |id| record.entity_id() == Some(id))
            && self.user_id.map_or(true, |id| record.user_id() == Some(id))
            && self
                .search
                .as_deref()
                .map_or(true, |term| record.matches_term(term))
    }
}

/// One row of the activity statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStat {
    #[schema(value_type = String, example = "LOGIN")]
    pub action: AuditAction,
    pub entity_type: String,
    pub count: i64,
}

/// Error type for audit repository operations
#[derive(Debug, thiserror::Error)]
pub enum AuditRepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
