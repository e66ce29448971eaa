//! Error types for the audit services

use thiserror::Error;

use crate::application::ports::AuditRepositoryError;
use crate::domain::errors::DomainError;

/// Why an audit record could not be written.
///
/// Returned by capture and the manual helper; never escalated into the
/// caller's own operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuditFailure {
    #[error("Audit storage failed: {0}")]
    Storage(String),

    #[error("Audit snapshot failed: {0}")]
    Snapshot(String),
}

impl From<AuditRepositoryError> for AuditFailure {
    fn from(err: AuditRepositoryError) -> Self {
        match err {
            AuditRepositoryError::Serialization(e) => AuditFailure::Snapshot(e.to_string()),
            other => AuditFailure::Storage(other.to_string()),
        }
    }
}

impl From<DomainError> for AuditFailure {
    fn from(err: DomainError) -> Self {
        AuditFailure::Snapshot(err.to_string())
    }
}

/// Errors surfaced to admin readers of the activity log
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Repository error: {0}")]
    Repository(#[from] AuditRepositoryError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
